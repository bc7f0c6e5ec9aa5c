//! Set element properties by name
//!
//! Styles and bindings address properties by their markup name
//! (`BackgroundColor`, `Text`, ...). The [`PropertyRegistry`] maps each name
//! to a typed getter/setter pair and the invalidation the change requires,
//! so assignment by name goes through the same dirty-flag path as a typed
//! assignment.
//!
//! Names are matched case-insensitively with `-` ignored, so
//! `background-color` and `BackgroundColor` are the same property.
//! Widget-specific properties shadow common ones.

use std::fmt;

use calyx_core::{CoreError, Value, ValueKind};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::element::{Element, Widget, WidgetKind};
use crate::error::{LayoutError, Result};
use crate::style::{apply_style, StyleContext};
use crate::tree::{ElementId, ElementTree};

/// What must be recomputed after a property changes
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Invalidation {
    None,
    Visual,
    Arrange,
    Measure,
}

pub type Getter = fn(&Element) -> Option<Value>;
/// Returns whether the stored value changed
pub type Setter = fn(&mut Element, Value) -> bool;

/// A named, typed property
#[derive(Clone, Copy)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub kind: ValueKind,
    pub invalidation: Invalidation,
    get: Getter,
    set: Setter,
}

impl PropertyDescriptor {
    pub const fn new(
        name: &'static str,
        kind: ValueKind,
        invalidation: Invalidation,
        get: Getter,
        set: Setter,
    ) -> Self {
        Self {
            name,
            kind,
            invalidation,
            get,
            set,
        }
    }

    pub fn get(&self, element: &Element) -> Option<Value> {
        (self.get)(element)
    }

    /// Coerce `value` to this property's kind and store it
    pub fn set(&self, element: &mut Element, value: Value) -> Result<bool> {
        let value = value.coerce(self.kind)?;
        Ok((self.set)(element, value))
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("invalidation", &self.invalidation)
            .finish()
    }
}

/// Property lookup table
#[derive(Clone, Debug)]
pub struct PropertyRegistry {
    common: FxHashMap<String, PropertyDescriptor>,
    widget: FxHashMap<(WidgetKind, String), PropertyDescriptor>,
}

impl Default for PropertyRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for descriptor in common_properties() {
            registry
                .common
                .insert(normalize(descriptor.name), descriptor);
        }
        for (kind, descriptor) in widget_properties() {
            registry
                .widget
                .insert((kind, normalize(descriptor.name)), descriptor);
        }
        registry
    }
}

impl PropertyRegistry {
    /// Registry with the built-in properties
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with no properties at all
    pub fn empty() -> Self {
        Self {
            common: FxHashMap::default(),
            widget: FxHashMap::default(),
        }
    }

    /// Add a property; `kind` restricts it to one widget
    pub fn register(&mut self, kind: Option<WidgetKind>, descriptor: PropertyDescriptor) -> Result<()> {
        let key = normalize(descriptor.name);
        let taken = match kind {
            Some(kind) => self.widget.contains_key(&(kind, key.clone())),
            None => self.common.contains_key(&key),
        };
        if taken {
            return Err(CoreError::DuplicateRegistration(descriptor.name.to_string()).into());
        }
        match kind {
            Some(kind) => self.widget.insert((kind, key), descriptor),
            None => self.common.insert(key, descriptor),
        };
        Ok(())
    }

    pub fn lookup(&self, kind: WidgetKind, name: &str) -> Option<&PropertyDescriptor> {
        let key = normalize(name);
        self.widget
            .get(&(kind, key.clone()))
            .or_else(|| self.common.get(&key))
    }
}

/// Canonical property key: lowercase with `-` removed
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

impl ElementTree {
    /// Read a property by name
    pub fn get_property(&self, id: ElementId, registry: &PropertyRegistry, name: &str) -> Option<Value> {
        let element = self.get(id)?;
        registry.lookup(element.kind(), name)?.get(element)
    }

    /// Store a property by name and apply its invalidation
    ///
    /// Returns `Ok(false)` if the element has no such property or the
    /// value was unchanged. A value of the wrong kind is an error.
    pub(crate) fn assign_property(
        &mut self,
        id: ElementId,
        registry: &PropertyRegistry,
        name: &str,
        value: Value,
    ) -> Result<bool> {
        let element = self.get_mut(id).ok_or(LayoutError::UnknownElement(id))?;
        let Some(descriptor) = registry.lookup(element.kind(), name).copied() else {
            trace!(element = ?id, property = name, "no such property");
            return Ok(false);
        };
        if !descriptor.set(element, value)? {
            return Ok(false);
        }

        match descriptor.invalidation {
            Invalidation::None => {}
            Invalidation::Visual => self.invalidate_visual(id),
            Invalidation::Arrange => {
                self.invalidate_arrange(id);
                self.invalidate_visual(id);
            }
            Invalidation::Measure => {
                self.invalidate_measure(id);
                self.invalidate_visual(id);
            }
        }
        Ok(true)
    }

    /// Set a property by name
    ///
    /// Changing `IsEnabled` reapplies the element's style so `:disabled`
    /// rules take effect.
    pub fn set_property(
        &mut self,
        id: ElementId,
        ctx: &StyleContext,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<bool> {
        let changed = self.assign_property(id, &ctx.properties, name, value.into())?;
        if changed && normalize(name) == "isenabled" {
            debug!(element = ?id, "enabled state changed, restyling");
            apply_style(self, id, ctx, None)?;
        }
        Ok(changed)
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

// =============================================================================
// Built-in properties
// =============================================================================

fn common_properties() -> Vec<PropertyDescriptor> {
    use Invalidation as I;
    use ValueKind as K;

    vec![
        PropertyDescriptor::new(
            "Id",
            K::Str,
            I::None,
            |e| e.id.clone().map(Value::Str),
            |e, v| match v {
                Value::Str(s) => replace(&mut e.id, Some(s)),
                _ => false,
            },
        ),
        PropertyDescriptor::new(
            "Class",
            K::Str,
            I::Visual,
            |e| e.class.clone().map(Value::Str),
            |e, v| match v {
                Value::Str(s) => replace(&mut e.class, Some(s)),
                _ => false,
            },
        ),
        PropertyDescriptor::new(
            "Width",
            K::OptionalInt,
            I::Measure,
            |e| Some(Value::OptionalInt(e.width)),
            |e, v| match v {
                Value::OptionalInt(w) => replace(&mut e.width, w),
                _ => false,
            },
        ),
        PropertyDescriptor::new(
            "Height",
            K::OptionalInt,
            I::Measure,
            |e| Some(Value::OptionalInt(e.height)),
            |e, v| match v {
                Value::OptionalInt(h) => replace(&mut e.height, h),
                _ => false,
            },
        ),
        PropertyDescriptor::new(
            "PositionX",
            K::OptionalInt,
            I::Arrange,
            |e| Some(Value::OptionalInt(e.position_x)),
            |e, v| match v {
                Value::OptionalInt(x) => replace(&mut e.position_x, x),
                _ => false,
            },
        ),
        PropertyDescriptor::new(
            "PositionY",
            K::OptionalInt,
            I::Arrange,
            |e| Some(Value::OptionalInt(e.position_y)),
            |e, v| match v {
                Value::OptionalInt(y) => replace(&mut e.position_y, y),
                _ => false,
            },
        ),
        PropertyDescriptor::new(
            "Padding",
            K::Thickness,
            I::Measure,
            |e| Some(Value::Thickness(e.padding)),
            |e, v| match v {
                Value::Thickness(t) => replace(&mut e.padding, t),
                _ => false,
            },
        ),
        PropertyDescriptor::new(
            "Margin",
            K::Thickness,
            I::Measure,
            |e| Some(Value::Thickness(e.margin)),
            |e, v| match v {
                Value::Thickness(t) => replace(&mut e.margin, t),
                _ => false,
            },
        ),
        PropertyDescriptor::new(
            "BorderThickness",
            K::Thickness,
            I::Measure,
            |e| Some(Value::Thickness(e.border_thickness)),
            |e, v| match v {
                Value::Thickness(t) => replace(&mut e.border_thickness, t),
                _ => false,
            },
        ),
        PropertyDescriptor::new(
            "BorderColor",
            K::Color,
            I::Visual,
            |e| e.border_color.map(Value::Color),
            |e, v| match v {
                Value::Color(c) => replace(&mut e.border_color, Some(c)),
                _ => false,
            },
        ),
        PropertyDescriptor::new(
            "BackgroundColor",
            K::Color,
            I::Visual,
            |e| e.background_color.map(Value::Color),
            |e, v| match v {
                Value::Color(c) => replace(&mut e.background_color, Some(c)),
                _ => false,
            },
        ),
        PropertyDescriptor::new(
            "HorizontalAlignment",
            K::HorizontalAlignment,
            I::Arrange,
            |e| Some(Value::HorizontalAlignment(e.horizontal_alignment)),
            |e, v| match v {
                Value::HorizontalAlignment(a) => replace(&mut e.horizontal_alignment, a),
                _ => false,
            },
        ),
        PropertyDescriptor::new(
            "VerticalAlignment",
            K::VerticalAlignment,
            I::Arrange,
            |e| Some(Value::VerticalAlignment(e.vertical_alignment)),
            |e, v| match v {
                Value::VerticalAlignment(a) => replace(&mut e.vertical_alignment, a),
                _ => false,
            },
        ),
        PropertyDescriptor::new(
            "IsVisible",
            K::Bool,
            I::Measure,
            |e| Some(Value::Bool(e.is_visible)),
            |e, v| match v {
                Value::Bool(b) => replace(&mut e.is_visible, b),
                _ => false,
            },
        ),
        PropertyDescriptor::new(
            "IsEnabled",
            K::Bool,
            I::Visual,
            |e| Some(Value::Bool(e.is_enabled)),
            |e, v| match v {
                Value::Bool(b) => replace(&mut e.is_enabled, b),
                _ => false,
            },
        ),
        PropertyDescriptor::new(
            "IsFocusable",
            K::Bool,
            I::None,
            |e| Some(Value::Bool(e.is_focusable)),
            |e, v| match v {
                Value::Bool(b) => replace(&mut e.is_focusable, b),
                _ => false,
            },
        ),
        PropertyDescriptor::new(
            "IsDraggable",
            K::Bool,
            I::None,
            |e| Some(Value::Bool(e.is_draggable)),
            |e, v| match v {
                Value::Bool(b) => replace(&mut e.is_draggable, b),
                _ => false,
            },
        ),
    ]
}

fn widget_properties() -> Vec<(WidgetKind, PropertyDescriptor)> {
    use Invalidation as I;
    use ValueKind as K;

    vec![
        (
            WidgetKind::TextBlock,
            PropertyDescriptor::new(
                "Text",
                K::Str,
                I::Measure,
                |e| match e.widget() {
                    Widget::TextBlock(s) => Some(Value::Str(s.text.clone())),
                    _ => None,
                },
                |e, v| match (e.widget_mut(), v) {
                    (Widget::TextBlock(s), Value::Str(t)) => replace(&mut s.text, t),
                    _ => false,
                },
            ),
        ),
        (
            WidgetKind::TextBlock,
            PropertyDescriptor::new(
                "Font",
                K::Font,
                I::Measure,
                |e| match e.widget() {
                    Widget::TextBlock(s) => s.font.clone().map(Value::Font),
                    _ => None,
                },
                |e, v| match (e.widget_mut(), v) {
                    (Widget::TextBlock(s), Value::Font(f)) => replace(&mut s.font, Some(f)),
                    _ => false,
                },
            ),
        ),
        (
            WidgetKind::TextBlock,
            PropertyDescriptor::new(
                "Foreground",
                K::Color,
                I::Visual,
                |e| match e.widget() {
                    Widget::TextBlock(s) => Some(Value::Color(s.foreground)),
                    _ => None,
                },
                |e, v| match (e.widget_mut(), v) {
                    (Widget::TextBlock(s), Value::Color(c)) => replace(&mut s.foreground, c),
                    _ => false,
                },
            ),
        ),
        (
            WidgetKind::LineEdit,
            PropertyDescriptor::new(
                "Text",
                K::Str,
                I::Measure,
                |e| match e.widget() {
                    Widget::LineEdit(s) => Some(Value::Str(s.text.clone())),
                    _ => None,
                },
                |e, v| match (e.widget_mut(), v) {
                    (Widget::LineEdit(s), Value::Str(t)) => replace(&mut s.text, t),
                    _ => false,
                },
            ),
        ),
        (
            WidgetKind::LineEdit,
            PropertyDescriptor::new(
                "Placeholder",
                K::Str,
                I::Measure,
                |e| match e.widget() {
                    Widget::LineEdit(s) => Some(Value::Str(s.placeholder.clone())),
                    _ => None,
                },
                |e, v| match (e.widget_mut(), v) {
                    (Widget::LineEdit(s), Value::Str(t)) => replace(&mut s.placeholder, t),
                    _ => false,
                },
            ),
        ),
        (
            WidgetKind::StackPanel,
            PropertyDescriptor::new(
                "Orientation",
                K::Orientation,
                I::Measure,
                |e| match e.widget() {
                    Widget::StackPanel { orientation } => Some(Value::Orientation(*orientation)),
                    _ => None,
                },
                |e, v| match (e.widget_mut(), v) {
                    (Widget::StackPanel { orientation }, Value::Orientation(o)) => {
                        replace(orientation, o)
                    }
                    _ => false,
                },
            ),
        ),
    ]
}
