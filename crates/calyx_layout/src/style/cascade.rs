//! Style cascade
//!
//! Applies every matching rule to an element in ascending precedence, so
//! later and more specific rules overwrite earlier ones. Values are
//! converted to the target property's kind; anything that can't be
//! converted is skipped and leaves the property as it was. Nothing is ever
//! reverted: a property keeps the last value a rule assigned until another
//! rule assigns it again.

use tracing::{debug, trace};

use super::selector::Selector;
use super::stylesheet::Stylesheet;
use super::StyleContext;
use crate::element::{Element, WidgetKind};
use crate::error::Result;
use crate::tree::{ElementId, ElementTree};

/// Pseudo-class forced on disabled elements
pub const DISABLED: &str = "disabled";

/// The selector describing an element as it currently is
///
/// Tag is the widget type, classes come from the `Class` string and
/// pseudo-classes are the applied set plus `pseudo_override`.
pub fn element_selector(element: &Element, pseudo_override: Option<&str>) -> Selector {
    let mut selector = Selector::default().tag(element.kind().tag());
    if let Some(id) = &element.id {
        selector = selector.id(id.clone());
    }
    for class in element.class_names() {
        selector = selector.class(class);
    }
    for pseudo in element.pseudo_classes() {
        selector = selector.pseudo_class(pseudo);
    }
    if let Some(pseudo) = pseudo_override {
        selector = selector.pseudo_class(pseudo);
    }
    selector
}

/// Apply the context's stylesheet to one element
///
/// `pseudo` adds a transient pseudo-class such as `hover`; a disabled
/// element always gets `disabled` instead. Returns the number of property
/// assignments that changed a value.
pub fn apply_style(
    tree: &mut ElementTree,
    id: ElementId,
    ctx: &StyleContext,
    pseudo: Option<&str>,
) -> Result<usize> {
    let element = tree.element(id)?;
    let kind = element.kind();
    let pseudo = if element.is_enabled { pseudo } else { Some(DISABLED) };
    let candidate = element_selector(element, pseudo);

    let mut assignments = Vec::new();
    for rule in ctx.stylesheet.matching(&candidate) {
        for (name, raw) in &rule.declarations {
            let Some(descriptor) = ctx.properties.lookup(kind, name) else {
                trace!(element = ?id, property = %name, "no such property, skipped");
                continue;
            };
            match ctx.converters.convert(descriptor.kind, raw) {
                Ok(Some(value)) => assignments.push((name.as_str(), value)),
                Ok(None) => debug!(
                    element = ?id,
                    property = %name,
                    value = %raw,
                    kind = %descriptor.kind,
                    "style value not convertible, skipped"
                ),
                Err(err) => debug!(
                    element = ?id,
                    property = %name,
                    value = %raw,
                    error = %err,
                    "malformed style value, skipped"
                ),
            }
        }
    }

    let mut changed = 0;
    for (name, value) in assignments {
        match tree.assign_property(id, &ctx.properties, name, value) {
            Ok(true) => changed += 1,
            Ok(false) => {}
            Err(err) => debug!(element = ?id, property = %name, error = %err, "style assignment failed"),
        }
    }
    trace!(element = ?id, selector = %candidate, changed, "applied style");
    Ok(changed)
}

/// Apply styles to `root` and every descendant
pub fn apply_style_tree(tree: &mut ElementTree, root: ElementId, ctx: &StyleContext) -> Result<()> {
    apply_style(tree, root, ctx, None)?;
    for id in tree.descendants(root) {
        apply_style(tree, id, ctx, None)?;
    }
    Ok(())
}

/// Check every declaration whose property can be resolved
///
/// Reports the first malformed color or thickness literal. Values that are
/// merely the wrong kind for a property are left to the cascade, which
/// skips them.
pub fn validate_stylesheet(sheet: &Stylesheet, ctx: &StyleContext) -> Result<()> {
    for rule in sheet.rules() {
        let kinds: Vec<WidgetKind> = match rule.selector.tag.as_deref().and_then(WidgetKind::from_tag) {
            Some(kind) => vec![kind],
            None => WidgetKind::ALL.to_vec(),
        };
        for (name, raw) in &rule.declarations {
            let Some(descriptor) = kinds.iter().find_map(|k| ctx.properties.lookup(*k, name)) else {
                continue;
            };
            ctx.converters.convert(descriptor.kind, raw)?;
        }
    }
    Ok(())
}
