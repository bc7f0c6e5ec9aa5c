//! Building element trees from markup nodes
//!
//! The markup parser is an outside collaborator; what it hands over is a
//! [`UiNode`] tree. The [`BuilderRegistry`] maps each tag to a factory that
//! turns a node into an element and builds its children.
//!
//! Every built-in factory follows the same order:
//!
//! 1. Common attributes (`Id`, `Class`, sizes, box model, alignment, flags)
//!    are assigned through the property registry
//! 2. An element without an `Id` gets a generated one
//! 3. The stylesheet is applied, so styles win over common attributes
//! 4. Widget attributes (`BackgroundColor`, `Text`, `Orientation`, ...) are
//!    assigned, so they win over styles
//! 5. Children are built and attached
//!
//! Attribute values of the form `{Binding ...}` or `{Command ...}` are not
//! assigned; they are moved to the element's markup expressions for the
//! [`BindingEngine`](crate::binding::BindingEngine) to resolve.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::OnceLock;

use calyx_core::{UniqueRegistry, ViewModel};
use indexmap::IndexMap;
use regex::Regex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::element::Widget;
use crate::error::{LayoutError, Result};
use crate::style::{apply_style, validate_stylesheet, StyleContext, Stylesheet};
use crate::tree::{ElementId, ElementTree};

/// Attributes assigned before the stylesheet is applied
const COMMON_ATTRIBUTES: &[&str] = &[
    "Id",
    "Class",
    "Width",
    "Height",
    "PositionX",
    "PositionY",
    "Padding",
    "Margin",
    "HorizontalAlignment",
    "VerticalAlignment",
    "IsVisible",
    "IsEnabled",
    "IsFocusable",
    "IsDraggable",
];

/// Page attribute naming a stylesheet file
const STYLESHEET_ATTRIBUTE: &str = "Stylesheet";

/// Button attributes that belong to its label
const BUTTON_LABEL_ATTRIBUTES: &[&str] = &["Text", "Font", "Foreground"];

// =============================================================================
// UiNode
// =============================================================================

/// One node of parsed markup
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UiNode {
    pub tag: String,
    /// Attributes in document order
    pub attributes: IndexMap<String, String>,
    pub children: Vec<UiNode>,
    pub inner_text: Option<String>,
}

impl UiNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.inner_text = Some(text.into());
        self
    }

    pub fn child(mut self, child: UiNode) -> Self {
        self.children.push(child);
        self
    }

    /// Attribute value, matching the name case-insensitively
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Whether an attribute value is a `{Binding ...}` or `{Command ...}` expression
pub fn is_markup_expression(value: &str) -> bool {
    static EXPRESSION: OnceLock<Option<Regex>> = OnceLock::new();
    EXPRESSION
        .get_or_init(|| Regex::new(r"(?i)^\s*\{\s*(Binding|Command)\b[^{}]*\}\s*$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(value))
}

fn is_one_of(name: &str, names: &[&str]) -> bool {
    names.iter().any(|n| n.eq_ignore_ascii_case(name))
}

// =============================================================================
// Build session
// =============================================================================

/// State shared by the factories while one tree is built
pub struct BuildSession<'a> {
    pub tree: &'a mut ElementTree,
    pub style: &'a mut StyleContext,
    pub view_model: Option<Rc<dyn ViewModel>>,
    registry: &'a BuilderRegistry,
}

impl BuildSession<'_> {
    /// Build a child node with the registry that started this session
    pub fn build_child(&mut self, node: &UiNode) -> Result<ElementId> {
        let registry = self.registry;
        registry.build_node(self, node)
    }

    /// Build every child node and attach it to `parent`
    pub fn build_children(&mut self, parent: ElementId, node: &UiNode) -> Result<()> {
        for child in &node.children {
            let id = self.build_child(child)?;
            self.tree.add_child(parent, id)?;
        }
        Ok(())
    }

    /// Common attributes, generated id, data context and style
    ///
    /// Attributes listed in `skip` are left for the caller.
    pub fn prepare(&mut self, id: ElementId, node: &UiNode, skip: &[&str]) -> Result<()> {
        self.tree.element_mut(id)?.data_context = self.view_model.clone();

        for (name, raw) in &node.attributes {
            if is_one_of(name, COMMON_ATTRIBUTES) && !is_one_of(name, skip) {
                self.assign_attribute(id, name, raw)?;
            }
        }

        let element = self.tree.element_mut(id)?;
        if element.id.is_none() {
            element.id = Some(self.registry.next_generated_id());
        }

        apply_style(self.tree, id, self.style, None)?;
        Ok(())
    }

    /// Assign every attribute that is neither common nor listed in `skip`
    pub fn assign_widget_attributes(&mut self, id: ElementId, node: &UiNode, skip: &[&str]) -> Result<()> {
        for (name, raw) in &node.attributes {
            if is_one_of(name, COMMON_ATTRIBUTES)
                || is_one_of(name, skip)
                || name.eq_ignore_ascii_case(STYLESHEET_ATTRIBUTE)
            {
                continue;
            }
            self.assign_attribute(id, name, raw)?;
        }
        Ok(())
    }

    /// Assign one attribute by name
    ///
    /// Expressions go to the markup expressions. Unknown attributes and
    /// values of the wrong kind are skipped; malformed colors and
    /// thicknesses are errors.
    pub fn assign_attribute(&mut self, id: ElementId, name: &str, raw: &str) -> Result<()> {
        if is_markup_expression(raw) {
            trace!(element = ?id, attribute = name, expression = raw, "deferred to binding");
            self.tree
                .element_mut(id)?
                .markup_expressions
                .insert(name.to_string(), raw.trim().to_string());
            return Ok(());
        }

        let kind = self.tree.element(id)?.kind();
        let Some(descriptor) = self.style.properties.lookup(kind, name) else {
            debug!(element = ?id, attribute = name, "no such property, attribute ignored");
            return Ok(());
        };
        match self.style.converters.convert(descriptor.kind, raw)? {
            Some(value) => {
                self.tree.assign_property(id, &self.style.properties, name, value)?;
            }
            None => debug!(element = ?id, attribute = name, value = raw, "attribute not convertible, ignored"),
        }
        Ok(())
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Factory turning a node into an element
pub type Factory = Box<dyn Fn(&mut BuildSession<'_>, &UiNode) -> Result<ElementId>>;

/// Tag to factory mapping
pub struct BuilderRegistry {
    tags: UniqueRegistry<String>,
    factories: FxHashMap<String, Factory>,
    id_prefix: String,
    generated: Cell<u64>,
}

impl std::fmt::Debug for BuilderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuilderRegistry")
            .field("tags", &self.tags.iter().collect::<Vec<_>>())
            .field("id_prefix", &self.id_prefix)
            .field("generated", &self.generated.get())
            .finish()
    }
}

impl Default for BuilderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BuilderRegistry {
    /// Registry with the built-in widget factories
    pub fn new() -> Self {
        let mut registry = Self::empty();
        let builtins: [(&str, Factory); 7] = [
            ("Page", Box::new(build_page)),
            ("Panel", Box::new(build_panel)),
            ("RoundPanel", Box::new(build_round_panel)),
            ("StackPanel", Box::new(build_stack_panel)),
            ("Button", Box::new(build_button)),
            ("TextBlock", Box::new(build_text_block)),
            ("LineEdit", Box::new(build_line_edit)),
        ];
        for (tag, factory) in builtins {
            if let Err(err) = registry.register_boxed(tag, factory) {
                warn!(tag, error = %err, "built-in factory not registered");
            }
        }
        registry
    }

    /// Registry without any factories
    pub fn empty() -> Self {
        Self {
            tags: UniqueRegistry::new(),
            factories: FxHashMap::default(),
            id_prefix: "ui-".to_string(),
            generated: Cell::new(0),
        }
    }

    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = prefix.into();
        self
    }

    /// Register a factory for `tag`
    ///
    /// Tags are case-insensitive. Registering the same tag twice is an error.
    pub fn register<F>(&mut self, tag: &str, factory: F) -> Result<()>
    where
        F: Fn(&mut BuildSession<'_>, &UiNode) -> Result<ElementId> + 'static,
    {
        self.register_boxed(tag, Box::new(factory))
    }

    fn register_boxed(&mut self, tag: &str, factory: Factory) -> Result<()> {
        let key = tag.to_ascii_lowercase();
        self.tags.register(key.clone())?;
        self.factories.insert(key, factory);
        Ok(())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(&tag.to_ascii_lowercase())
    }

    /// Registered tags, lowercased, in registration order
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    fn next_generated_id(&self) -> String {
        let n = self.generated.get() + 1;
        self.generated.set(n);
        format!("{}{}", self.id_prefix, n)
    }

    /// Build `node` and its descendants into `tree`
    ///
    /// A `Page` node may replace the stylesheet in `style`. The result is
    /// detached; bindings are not wired up yet.
    pub fn build(
        &self,
        tree: &mut ElementTree,
        style: &mut StyleContext,
        node: &UiNode,
        view_model: Option<Rc<dyn ViewModel>>,
    ) -> Result<ElementId> {
        let mut session = BuildSession {
            tree,
            style,
            view_model,
            registry: self,
        };
        self.build_node(&mut session, node)
    }

    fn build_node(&self, session: &mut BuildSession<'_>, node: &UiNode) -> Result<ElementId> {
        let Some(factory) = self.factories.get(&node.tag.to_ascii_lowercase()) else {
            warn!(tag = %node.tag, "no builder registered for tag");
            return Err(LayoutError::UnknownTag(node.tag.clone()));
        };
        let id = factory(session, node)?;
        trace!(tag = %node.tag, element = ?id, "built element");
        Ok(id)
    }
}

// =============================================================================
// Built-in factories
// =============================================================================

fn build_page(s: &mut BuildSession<'_>, node: &UiNode) -> Result<ElementId> {
    if let Some(path) = node.attribute(STYLESHEET_ATTRIBUTE) {
        let stylesheet = Stylesheet::from_file(path)?;
        validate_stylesheet(&stylesheet, s.style).map_err(|e| e.in_file(path))?;
        s.style.set_stylesheet(stylesheet);
    }

    let page = s.tree.create(Widget::page());
    s.prepare(page, node, &[])?;
    s.assign_widget_attributes(page, node, &[])?;
    s.build_children(page, node)?;
    s.tree.register_focusables(page);
    Ok(page)
}

fn build_panel(s: &mut BuildSession<'_>, node: &UiNode) -> Result<ElementId> {
    build_single_child(s, node, Widget::Panel)
}

fn build_round_panel(s: &mut BuildSession<'_>, node: &UiNode) -> Result<ElementId> {
    build_single_child(s, node, Widget::RoundPanel)
}

fn build_single_child(s: &mut BuildSession<'_>, node: &UiNode, widget: Widget) -> Result<ElementId> {
    let panel = s.tree.create(widget);
    s.prepare(panel, node, &[])?;
    s.assign_widget_attributes(panel, node, &[])?;
    if node.children.len() > 1 {
        warn!(tag = %node.tag, children = node.children.len(), "single-child container, keeping the last child");
    }
    s.build_children(panel, node)?;
    Ok(panel)
}

fn build_stack_panel(s: &mut BuildSession<'_>, node: &UiNode) -> Result<ElementId> {
    let panel = s.tree.create(Widget::stack_panel(Default::default()));
    s.prepare(panel, node, &[])?;
    s.assign_widget_attributes(panel, node, &[])?;
    s.build_children(panel, node)?;
    Ok(panel)
}

fn build_button(s: &mut BuildSession<'_>, node: &UiNode) -> Result<ElementId> {
    let text = node.inner_text.as_deref().map(str::trim).unwrap_or_default();
    let button = s.tree.create_button(if is_markup_expression(text) { "" } else { text })?;
    s.prepare(button, node, BUTTON_LABEL_ATTRIBUTES)?;
    s.assign_widget_attributes(button, node, BUTTON_LABEL_ATTRIBUTES)?;

    if let Some(label) = s.tree.content(button) {
        apply_style(s.tree, label, s.style, None)?;
        if is_markup_expression(text) {
            s.assign_attribute(label, "Text", text)?;
        }
        for (name, raw) in &node.attributes {
            if is_one_of(name, BUTTON_LABEL_ATTRIBUTES) {
                s.assign_attribute(label, name, raw)?;
            }
        }
    }

    // A child node replaces the label
    s.build_children(button, node)?;
    Ok(button)
}

fn build_text_block(s: &mut BuildSession<'_>, node: &UiNode) -> Result<ElementId> {
    let text = node.inner_text.as_deref().map(str::trim).unwrap_or_default();
    let block = s.tree.create(Widget::text_block(""));
    s.prepare(block, node, &[])?;
    if !text.is_empty() {
        s.assign_attribute(block, "Text", text)?;
    }
    s.assign_widget_attributes(block, node, &[])?;
    Ok(block)
}

fn build_line_edit(s: &mut BuildSession<'_>, node: &UiNode) -> Result<ElementId> {
    let placeholder = node
        .attribute("Placeholder")
        .filter(|p| !is_markup_expression(p))
        .unwrap_or_default();
    let edit = s.tree.create_line_edit(placeholder)?;
    s.prepare(edit, node, &[])?;
    s.assign_widget_attributes(edit, node, &[])?;
    if let Some(inner) = s.tree.content(edit) {
        apply_style(s.tree, inner, s.style, None)?;
    }
    Ok(edit)
}
