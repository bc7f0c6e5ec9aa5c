//! String to value converters
//!
//! Style declarations and markup attributes are raw strings. A
//! [`ConverterRegistry`] turns them into [`Value`]s of the kind a property
//! declares. A converter returns `Ok(None)` when the text simply isn't a
//! value of its kind; malformed color and thickness literals are errors,
//! because they point at a broken asset rather than a mismatched property.

use std::fmt;

use calyx_core::{
    Color, FontRef, HorizontalAlignment, Orientation, Thickness, Value, ValueKind,
    VerticalAlignment,
};
use nom::{
    bytes::complete::{tag_no_case, take_while1},
    character::complete::char,
    combinator::opt,
    error::ParseError as NomParseError,
    number::complete::float,
    IResult,
};
use rustc_hash::FxHashMap;

use super::stylesheet::ws;
use crate::error::{LayoutError, Result};

/// Converts raw text into a value of one kind
pub type Converter = Box<dyn Fn(&str) -> Result<Option<Value>>>;

/// Converters keyed by target value kind
pub struct ConverterRegistry {
    converters: FxHashMap<ValueKind, Converter>,
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(ValueKind::Bool, |s| Ok(parse_bool(s).map(Value::Bool)));
        registry.register(ValueKind::Int, |s| Ok(parse_int(s).map(Value::Int)));
        registry.register(ValueKind::OptionalInt, |s| {
            Ok(parse_optional_int(s).map(Value::OptionalInt))
        });
        registry.register(ValueKind::Str, |s| Ok(Some(Value::Str(unquote(s).to_string()))));
        registry.register(ValueKind::Thickness, |s| parse_thickness(s).map(|t| Some(Value::Thickness(t))));
        registry.register(ValueKind::Color, |s| parse_color(s).map(|c| Some(Value::Color(c))));
        registry.register(ValueKind::HorizontalAlignment, |s| {
            Ok(parse_horizontal_alignment(s).map(Value::HorizontalAlignment))
        });
        registry.register(ValueKind::VerticalAlignment, |s| {
            Ok(parse_vertical_alignment(s).map(Value::VerticalAlignment))
        });
        registry.register(ValueKind::Orientation, |s| {
            Ok(parse_orientation(s).map(Value::Orientation))
        });
        registry.register(ValueKind::Font, |s| Ok(parse_font(s).map(Value::Font)));
        registry
    }
}

impl ConverterRegistry {
    /// Registry with the built-in converters
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self {
            converters: FxHashMap::default(),
        }
    }

    /// Install a converter, replacing any existing one for `kind`
    pub fn register<F>(&mut self, kind: ValueKind, converter: F)
    where
        F: Fn(&str) -> Result<Option<Value>> + 'static,
    {
        self.converters.insert(kind, Box::new(converter));
    }

    pub fn has_converter(&self, kind: ValueKind) -> bool {
        self.converters.contains_key(&kind)
    }

    /// Convert `raw` to a value of `kind`
    ///
    /// `Ok(None)` if there is no converter for `kind` or the text is not a
    /// value of that kind.
    pub fn convert(&self, kind: ValueKind, raw: &str) -> Result<Option<Value>> {
        match self.converters.get(&kind) {
            Some(converter) => converter(raw.trim()),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("kinds", &self.converters.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// Scalars
// ============================================================================

fn unquote(s: &str) -> &str {
    let s = s.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|r| r.strip_suffix(quote)) {
            return inner;
        }
    }
    s
}

pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// An integer, optionally suffixed with `px`
pub fn parse_int(s: &str) -> Option<i32> {
    let s = s.trim();
    let s = s.strip_suffix("px").unwrap_or(s);
    s.trim().parse().ok()
}

/// `auto` / `none` clear the value
pub fn parse_optional_int(s: &str) -> Option<Option<i32>> {
    match s.trim().to_ascii_lowercase().as_str() {
        "" | "auto" | "none" => Some(None),
        other => parse_int(other).map(Some),
    }
}

/// `"10"` (uniform), `"h,v"` or `"left,top,right,bottom"`
///
/// Commas or whitespace separate the parts.
pub fn parse_thickness(s: &str) -> Result<Thickness> {
    let parts: Vec<i32> = s
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .map(|p| parse_int(p).ok_or_else(|| LayoutError::InvalidThickness(s.to_string())))
        .collect::<Result<_>>()?;

    match parts.as_slice() {
        [all] => Ok(Thickness::uniform(*all)),
        [h, v] => Ok(Thickness::new(*h, *v, *h, *v)),
        [l, t, r, b] => Ok(Thickness::new(*l, *t, *r, *b)),
        _ => Err(LayoutError::InvalidThickness(s.to_string())),
    }
}

pub fn parse_horizontal_alignment(s: &str) -> Option<HorizontalAlignment> {
    match s.trim().to_ascii_lowercase().as_str() {
        "left" => Some(HorizontalAlignment::Left),
        "center" => Some(HorizontalAlignment::Center),
        "right" => Some(HorizontalAlignment::Right),
        "stretch" => Some(HorizontalAlignment::Stretch),
        _ => None,
    }
}

pub fn parse_vertical_alignment(s: &str) -> Option<VerticalAlignment> {
    match s.trim().to_ascii_lowercase().as_str() {
        "top" => Some(VerticalAlignment::Top),
        "center" => Some(VerticalAlignment::Center),
        "bottom" => Some(VerticalAlignment::Bottom),
        "stretch" => Some(VerticalAlignment::Stretch),
        _ => None,
    }
}

pub fn parse_orientation(s: &str) -> Option<Orientation> {
    match s.trim().to_ascii_lowercase().as_str() {
        "vertical" => Some(Orientation::Vertical),
        "horizontal" => Some(Orientation::Horizontal),
        _ => None,
    }
}

/// `name` or `name size`; the size defaults to 16
pub fn parse_font(s: &str) -> Option<FontRef> {
    let s = unquote(s);
    if s.is_empty() {
        return None;
    }
    match s.rsplit_once(char::is_whitespace) {
        Some((name, size)) => match size.trim_end_matches("px").parse::<f32>() {
            Ok(size) if size > 0.0 => Some(FontRef::new(unquote(name), size)),
            _ => Some(FontRef::new(s, DEFAULT_FONT_SIZE)),
        },
        None => Some(FontRef::new(s, DEFAULT_FONT_SIZE)),
    }
}

const DEFAULT_FONT_SIZE: f32 = 16.0;

// ============================================================================
// Color Parsing
// ============================================================================

/// Parse `#RGB`, `#RRGGBB`, `#RRGGBBAA`, `rgb(...)`, `rgba(...)` or a name
pub fn parse_color(input: &str) -> Result<Color> {
    let input = input.trim();
    let unknown = || LayoutError::UnknownColor(input.to_string());

    if input.starts_with('#') {
        return match parse_hex_color::<nom::error::Error<&str>>(input) {
            Ok(("", color)) => Ok(color),
            _ => Err(unknown()),
        };
    }
    if input.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("rgb")) {
        return match parse_rgb_function::<nom::error::Error<&str>>(input) {
            Ok((rest, color)) if rest.trim().is_empty() => Ok(color),
            _ => Err(unknown()),
        };
    }
    Color::named(input).ok_or_else(unknown)
}

fn hex_byte(hex: &str) -> Option<u8> {
    u8::from_str_radix(hex, 16).ok()
}

fn parse_hex_color<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, Color, E> {
    let (rest, _) = char('#')(input)?;
    let (rest, hex) = take_while1(|c: char| c.is_ascii_hexdigit())(rest)?;
    let bad = || nom::Err::Error(E::from_error_kind(input, nom::error::ErrorKind::HexDigit));

    let channels: Option<Vec<u8>> = match hex.len() {
        3 => hex
            .chars()
            .map(|c| hex_byte(&c.to_string().repeat(2)))
            .collect(),
        6 | 8 => (0..hex.len())
            .step_by(2)
            .map(|i| hex_byte(&hex[i..i + 2]))
            .collect(),
        _ => None,
    };

    let color = match channels.ok_or_else(bad)?.as_slice() {
        [r, g, b] => Color::from_rgba8(*r, *g, *b, 255),
        [r, g, b, a] => Color::from_rgba8(*r, *g, *b, *a),
        _ => return Err(bad()),
    };
    Ok((rest, color))
}

/// `rgb(r, g, b)` or `rgba(r, g, b, a)`; channels above 1 are 0-255
fn parse_rgb_function<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, Color, E> {
    let (input, _) = tag_no_case("rgb")(input)?;
    let (input, _) = opt(tag_no_case("a"))(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = char('(')(input)?;
    let (input, _) = ws(input)?;
    let (input, r) = float(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = char(',')(input)?;
    let (input, _) = ws(input)?;
    let (input, g) = float(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = char(',')(input)?;
    let (input, _) = ws(input)?;
    let (input, b) = float(input)?;
    let (input, _) = ws(input)?;
    let (input, a) = opt(|i| {
        let (i, _) = char(',')(i)?;
        let (i, _) = ws(i)?;
        let (i, a) = float(i)?;
        let (i, _) = ws(i)?;
        Ok((i, a))
    })(input)?;
    let (input, _) = char(')')(input)?;

    // Normalize if values are 0-255 range
    let (r, g, b) = if r > 1.0 || g > 1.0 || b > 1.0 {
        (r / 255.0, g / 255.0, b / 255.0)
    } else {
        (r, g, b)
    };
    let a = match a {
        Some(a) if a > 1.0 => a / 255.0,
        Some(a) => a,
        None => 1.0,
    };

    Ok((input, Color::rgba(r, g, b, a)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_colors() {
        assert_eq!(parse_color("#FF0000").unwrap(), Color::RED);
        assert_eq!(parse_color("#00f").unwrap(), Color::BLUE);
        let translucent = parse_color("#FFFFFF80").unwrap();
        assert_eq!(translucent.r, 1.0);
        assert!((translucent.a - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_rgb_functions() {
        assert_eq!(parse_color("rgb(255, 0, 0)").unwrap(), Color::RED);
        assert_eq!(parse_color("RGBA(0, 0, 1, 0.5)").unwrap(), Color::rgba(0.0, 0.0, 1.0, 0.5));
    }

    #[test]
    fn test_named_and_unknown_colors() {
        assert_eq!(parse_color("White").unwrap(), Color::WHITE);
        assert!(matches!(parse_color("blurple"), Err(LayoutError::UnknownColor(_))));
        assert!(matches!(parse_color("#12345"), Err(LayoutError::UnknownColor(_))));
        assert!(matches!(parse_color("#GG0000"), Err(LayoutError::UnknownColor(_))));
    }

    #[test]
    fn test_thickness_forms() {
        assert_eq!(parse_thickness("10").unwrap(), Thickness::uniform(10));
        assert_eq!(parse_thickness("1,2,3,4").unwrap(), Thickness::new(1, 2, 3, 4));
        assert_eq!(parse_thickness("4 8").unwrap(), Thickness::new(4, 8, 4, 8));
        assert!(matches!(parse_thickness("1,2,3"), Err(LayoutError::InvalidThickness(_))));
        assert!(matches!(parse_thickness("wide"), Err(LayoutError::InvalidThickness(_))));
    }

    #[test]
    fn test_registry_soft_failures() {
        let registry = ConverterRegistry::new();
        assert_eq!(registry.convert(ValueKind::Bool, "TRUE").unwrap(), Some(Value::Bool(true)));
        assert_eq!(registry.convert(ValueKind::Bool, "maybe").unwrap(), None);
        assert_eq!(registry.convert(ValueKind::OptionalInt, "auto").unwrap(), Some(Value::OptionalInt(None)));
        assert_eq!(registry.convert(ValueKind::OptionalInt, "40px").unwrap(), Some(Value::OptionalInt(Some(40))));
        assert_eq!(
            registry.convert(ValueKind::HorizontalAlignment, " center ").unwrap(),
            Some(Value::HorizontalAlignment(HorizontalAlignment::Center))
        );
        assert!(registry.convert(ValueKind::Color, "nope").is_err());

        let empty = ConverterRegistry::empty();
        assert_eq!(empty.convert(ValueKind::Bool, "true").unwrap(), None);
    }

    #[test]
    fn test_font_forms() {
        assert_eq!(parse_font("Arial"), Some(FontRef::new("Arial", 16.0)));
        assert_eq!(parse_font("Open Sans 12"), Some(FontRef::new("Open Sans", 12.0)));
        assert_eq!(parse_font("'Mono' 9px"), Some(FontRef::new("Mono", 9.0)));
        assert_eq!(parse_font(""), None);
    }

    #[test]
    fn test_custom_converter_replaces_builtin() {
        let mut registry = ConverterRegistry::new();
        registry.register(ValueKind::Bool, |s| Ok(Some(Value::Bool(s == "yes"))));
        assert_eq!(registry.convert(ValueKind::Bool, "yes").unwrap(), Some(Value::Bool(true)));
    }
}
