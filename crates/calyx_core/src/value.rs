//! Dynamically typed property values
//!
//! Style application, markup attributes and data binding all set element
//! properties by name. [`Value`] is the currency they exchange, and
//! [`ValueKind`] is the type tag a property declares so converters know what
//! to produce from a raw string.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{CoreError, Result};
use crate::geometry::Thickness;

/// Horizontal placement within a slot
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HorizontalAlignment {
    #[default]
    Left,
    Center,
    Right,
    Stretch,
}

/// Vertical placement within a slot
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerticalAlignment {
    #[default]
    Top,
    Center,
    Bottom,
    Stretch,
}

/// Stacking axis
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Vertical,
    Horizontal,
}

/// Opaque font reference handed to the text measurer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FontRef {
    pub name: String,
    pub size: f32,
}

impl FontRef {
    pub fn new(name: impl Into<String>, size: f32) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// Type tag for [`Value`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int,
    /// An integer that may be unset (fixed width, fixed position)
    OptionalInt,
    Str,
    Color,
    Thickness,
    HorizontalAlignment,
    VerticalAlignment,
    Orientation,
    Font,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::OptionalInt => "int?",
            ValueKind::Str => "string",
            ValueKind::Color => "color",
            ValueKind::Thickness => "thickness",
            ValueKind::HorizontalAlignment => "horizontal alignment",
            ValueKind::VerticalAlignment => "vertical alignment",
            ValueKind::Orientation => "orientation",
            ValueKind::Font => "font",
        };
        f.write_str(name)
    }
}

/// A property value
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i32),
    OptionalInt(Option<i32>),
    Str(String),
    Color(Color),
    Thickness(Thickness),
    HorizontalAlignment(HorizontalAlignment),
    VerticalAlignment(VerticalAlignment),
    Orientation(Orientation),
    Font(FontRef),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::OptionalInt(_) => ValueKind::OptionalInt,
            Value::Str(_) => ValueKind::Str,
            Value::Color(_) => ValueKind::Color,
            Value::Thickness(_) => ValueKind::Thickness,
            Value::HorizontalAlignment(_) => ValueKind::HorizontalAlignment,
            Value::VerticalAlignment(_) => ValueKind::VerticalAlignment,
            Value::Orientation(_) => ValueKind::Orientation,
            Value::Font(_) => ValueKind::Font,
        }
    }

    /// Coerce into `kind`, allowing the lossless widenings bindings rely on
    ///
    /// `Int` widens to `OptionalInt`, and any value can become a `Str` for
    /// text properties. Everything else must already match.
    pub fn coerce(self, kind: ValueKind) -> Result<Value> {
        if self.kind() == kind {
            return Ok(self);
        }
        match (self, kind) {
            (Value::Int(v), ValueKind::OptionalInt) => Ok(Value::OptionalInt(Some(v))),
            (Value::OptionalInt(Some(v)), ValueKind::Int) => Ok(Value::Int(v)),
            (v, ValueKind::Str) => Ok(Value::Str(v.to_string())),
            (v, kind) => Err(CoreError::TypeMismatch {
                expected: kind,
                found: v.kind(),
            }),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            Value::OptionalInt(v) => *v,
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            Value::Color(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::OptionalInt(Some(v)) => write!(f, "{}", v),
            Value::OptionalInt(None) => Ok(()),
            Value::Str(v) => f.write_str(v),
            Value::Color(c) => write!(
                f,
                "#{:02X}{:02X}{:02X}{:02X}",
                (c.r * 255.0).round() as u8,
                (c.g * 255.0).round() as u8,
                (c.b * 255.0).round() as u8,
                (c.a * 255.0).round() as u8
            ),
            Value::Thickness(t) => write!(f, "{},{},{},{}", t.left, t.top, t.right, t.bottom),
            Value::HorizontalAlignment(v) => write!(f, "{:?}", v),
            Value::VerticalAlignment(v) => write!(f, "{:?}", v),
            Value::Orientation(v) => write!(f, "{:?}", v),
            Value::Font(font) => write!(f, "{} {}", font.name, font.size),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Color> for Value {
    fn from(v: Color) -> Self {
        Value::Color(v)
    }
}

impl From<Thickness> for Value {
    fn from(v: Thickness) -> Self {
        Value::Thickness(v)
    }
}

impl From<HorizontalAlignment> for Value {
    fn from(v: HorizontalAlignment) -> Self {
        Value::HorizontalAlignment(v)
    }
}

impl From<VerticalAlignment> for Value {
    fn from(v: VerticalAlignment) -> Self {
        Value::VerticalAlignment(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_same_kind() {
        let v = Value::Bool(true).coerce(ValueKind::Bool).unwrap();
        assert_eq!(v, Value::Bool(true));
    }

    #[test]
    fn test_coerce_widenings() {
        assert_eq!(
            Value::Int(5).coerce(ValueKind::OptionalInt).unwrap(),
            Value::OptionalInt(Some(5))
        );
        assert_eq!(
            Value::Int(5).coerce(ValueKind::Str).unwrap(),
            Value::Str("5".into())
        );
    }

    #[test]
    fn test_coerce_mismatch() {
        let err = Value::Str("x".into()).coerce(ValueKind::Color).unwrap_err();
        assert!(matches!(
            err,
            CoreError::TypeMismatch {
                expected: ValueKind::Color,
                found: ValueKind::Str
            }
        ));
    }

    #[test]
    fn test_display_color() {
        assert_eq!(Value::Color(Color::RED).to_string(), "#FF0000FF");
    }
}
