//! Stylesheet parser
//!
//! Parses a small CSS-like language into an ordered list of [`StyleRule`]s:
//!
//! ```text
//! /* comments are allowed anywhere */
//! Button, .toolbar Button { BackgroundColor: #336699; Padding: 4,2,4,2; }
//! Button:hover            { BackgroundColor: rgb(80, 120, 200); }
//! ```
//!
//! Values are kept as raw strings; they are converted to typed values when a
//! rule is applied to an element, because only then is the target
//! property's type known.
//!
//! # Error Handling
//!
//! Parsing is tolerant. A malformed rule is recorded as a diagnostic and
//! skipped, and parsing resumes after the next `}`. Diagnostics carry the
//! line and column of the failure and are logged via tracing at DEBUG level.
//! A rule that can't be recovered from (no closing brace before the end of
//! input) is an error; everything else is a warning.

use std::fmt;
use std::path::{Path, PathBuf};

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{char, multispace1},
    combinator::{opt, value},
    error::{context, ParseError as NomParseError, VerboseError, VerboseErrorKind},
    multi::many0,
    IResult,
};
use tracing::debug;

use super::selector::{Selector, Specificity};
use crate::error::{LayoutError, Result};

/// Parser result type using VerboseError for diagnostics
pub(crate) type ParseResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

/// Severity level for parse diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The stylesheet is unusable past this point
    Error,
    /// A rule or declaration was skipped
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A stylesheet diagnostic with position information
#[derive(Debug, Clone)]
pub struct ParseError {
    pub severity: Severity,
    pub message: String,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
    /// Input near the failure
    pub fragment: String,
    /// Context stack from nom's VerboseError
    pub contexts: Vec<String>,
    /// The selector or property involved, if any
    pub property: Option<String>,
    pub value: Option<String>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stylesheet {}: line {}, column {}: {}",
            self.severity, self.line, self.column, self.message
        )?;
        if let Some(ref prop) = self.property {
            if let Some(ref val) = self.value {
                write!(f, " ({}:{})", prop, val)?;
            } else {
                write!(f, " ({})", prop)?;
            }
        }
        if !self.contexts.is_empty() {
            write!(f, "\n  Context: {}", self.contexts.join(" > "))?;
        }
        if !self.fragment.is_empty() && self.fragment.len() < 50 {
            write!(f, "\n  Near: \"{}\"", self.fragment)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    pub fn new(severity: Severity, message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            severity,
            message: message.into(),
            line,
            column,
            fragment: String::new(),
            contexts: Vec::new(),
            property: None,
            value: None,
        }
    }

    /// A declaration whose value is empty
    pub fn invalid_value(property: &str, value: &str, line: usize, column: usize) -> Self {
        Self {
            severity: Severity::Warning,
            message: format!("Invalid value for '{}': '{}'", property, value),
            line,
            column,
            fragment: String::new(),
            contexts: vec!["property value".to_string()],
            property: Some(property.to_string()),
            value: Some(value.to_string()),
        }
    }

    fn from_verbose(input: &str, err: VerboseError<&str>, severity: Severity) -> Self {
        let (line, column, fragment) = if let Some((frag, _)) = err.errors.first() {
            calculate_position(input, frag)
        } else {
            (1, 1, String::new())
        };

        let contexts: Vec<String> = err
            .errors
            .iter()
            .filter_map(|(_, kind)| match kind {
                VerboseErrorKind::Context(ctx) => Some((*ctx).to_string()),
                _ => None,
            })
            .collect();

        Self {
            severity,
            message: format_verbose_error(&err),
            line,
            column,
            fragment,
            contexts,
            property: None,
            value: None,
        }
    }
}

/// Result of parsing a stylesheet with diagnostics
#[derive(Debug, Clone)]
pub struct StylesheetParseResult {
    /// Every rule that parsed, in source order
    pub stylesheet: Stylesheet,
    pub errors: Vec<ParseError>,
}

impl StylesheetParseResult {
    /// Whether any diagnostic is an error (not just a warning)
    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(|e| e.severity == Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.errors.iter().any(|e| e.severity == Severity::Warning)
    }

    /// Log all diagnostics via tracing
    pub fn log_diagnostics(&self) {
        for err in &self.errors {
            match err.severity {
                Severity::Error => debug!(
                    severity = "error",
                    line = err.line,
                    column = err.column,
                    message = %err.message,
                    property = ?err.property,
                    value = ?err.value,
                    "stylesheet parse error"
                ),
                Severity::Warning => debug!(
                    severity = "warning",
                    line = err.line,
                    column = err.column,
                    message = %err.message,
                    property = ?err.property,
                    value = ?err.value,
                    "stylesheet parse warning"
                ),
                Severity::Info => debug!(
                    severity = "info",
                    line = err.line,
                    column = err.column,
                    message = %err.message,
                    "stylesheet parse info"
                ),
            }
        }
    }
}

fn format_verbose_error(err: &VerboseError<&str>) -> String {
    let mut parts = Vec::new();

    for (input, kind) in &err.errors {
        match kind {
            VerboseErrorKind::Context(ctx) => {
                parts.push(format!("in {}", ctx));
            }
            VerboseErrorKind::Char(c) => {
                let preview: String = input.chars().take(20).collect();
                parts.push(format!("expected '{}' near \"{}\"", c, preview));
            }
            VerboseErrorKind::Nom(ek) => {
                parts.push(format!("{:?}", ek));
            }
        }
    }

    if parts.is_empty() {
        "unknown parse error".to_string()
    } else {
        parts.join(", ")
    }
}

// ============================================================================
// Rules
// ============================================================================

/// One compiled selector with its declarations
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    /// Selector text as written
    pub selector_text: String,
    pub selector: Selector,
    pub specificity: Specificity,
    /// Property name and raw value, in declaration order
    pub declarations: Vec<(String, String)>,
    /// Position in the stylesheet; breaks specificity ties
    pub order: usize,
}

impl StyleRule {
    pub fn declaration(&self, name: &str) -> Option<&str> {
        self.declarations
            .iter()
            .rev()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An ordered list of style rules
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    rules: Vec<StyleRule>,
    source: Option<PathBuf>,
}

impl Stylesheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule; returns its order index
    pub fn add_rule<N, V>(&mut self, selector_text: &str, declarations: impl IntoIterator<Item = (N, V)>) -> usize
    where
        N: Into<String>,
        V: Into<String>,
    {
        let selector = Selector::parse(selector_text);
        let order = self.rules.len();
        self.rules.push(StyleRule {
            selector_text: selector_text.trim().to_string(),
            specificity: selector.specificity(),
            selector,
            declarations: declarations
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
            order,
        });
        order
    }

    pub fn rules(&self) -> &[StyleRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// File this stylesheet was loaded from
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Rules matching `candidate`, lowest precedence first
    ///
    /// Ties in specificity keep source order, so a later rule is applied
    /// after (and overrides) an earlier one.
    pub fn matching(&self, candidate: &Selector) -> Vec<&StyleRule> {
        let mut matched: Vec<&StyleRule> = self
            .rules
            .iter()
            .filter(|r| r.selector.matches(candidate))
            .collect();
        matched.sort_by_key(|r| (r.specificity, r.order));
        matched
    }

    /// Parse stylesheet text, collecting diagnostics
    ///
    /// Always returns the rules that parsed, even if some were skipped.
    pub fn parse_with_errors(css: &str) -> StylesheetParseResult {
        let mut errors = Vec::new();
        let mut stylesheet = Stylesheet::new();

        for (selector, declarations) in parse_stylesheet_with_errors(css, &mut errors) {
            stylesheet.add_rule(selector, declarations);
        }

        StylesheetParseResult { stylesheet, errors }
    }

    /// Parse stylesheet text
    ///
    /// Diagnostics are logged via tracing. Returns the first error-severity
    /// diagnostic if there is one; skipped rules alone don't fail the parse.
    pub fn parse(css: &str) -> std::result::Result<Self, ParseError> {
        let result = Self::parse_with_errors(css);
        result.log_diagnostics();

        match result
            .errors
            .into_iter()
            .find(|e| e.severity == Severity::Error)
        {
            Some(err) => Err(err),
            None => Ok(result.stylesheet),
        }
    }

    /// Parse stylesheet text, falling back to an empty stylesheet on error
    pub fn parse_or_empty(css: &str) -> Self {
        Self::parse(css).unwrap_or_default()
    }

    /// Load and parse a stylesheet file
    ///
    /// Read failures and parse errors are reported as
    /// [`LayoutError::ContentLoad`] naming the file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content_load = |message: String| LayoutError::ContentLoad {
            path: path.display().to_string(),
            message,
        };

        let css = std::fs::read_to_string(path).map_err(|e| content_load(e.to_string()))?;
        let mut stylesheet = Self::parse(&css).map_err(|e| content_load(e.to_string()))?;
        debug!(path = %path.display(), rules = stylesheet.len(), "loaded stylesheet");
        stylesheet.source = Some(path.to_path_buf());
        Ok(stylesheet)
    }
}

// ============================================================================
// Nom parsers
// ============================================================================

/// Line, column and a preview of `fragment`, a suffix of `original`
fn calculate_position(original: &str, fragment: &str) -> (usize, usize, String) {
    let offset = original.len().saturating_sub(fragment.len());
    let consumed = &original[..offset];

    let line = consumed.matches('\n').count() + 1;
    let column = consumed
        .rfind('\n')
        .map(|pos| offset - pos)
        .unwrap_or(offset + 1);

    let preview: String = fragment.chars().take(30).collect();
    (line, column, preview)
}

/// Whitespace and comments
pub(crate) fn ws<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, (), E> {
    value(
        (),
        many0(alt((value((), multispace1), value((), parse_comment)))),
    )(input)
}

/// A block comment /* ... */
fn parse_comment<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, &'a str, E> {
    let (input, _) = tag("/*")(input)?;
    let (input, body) = take_until("*/")(input)?;
    let (input, _) = tag("*/")(input)?;
    Ok((input, body))
}

/// An identifier (alphanumeric, hyphen, underscore)
pub(crate) fn identifier<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, &'a str, E> {
    take_while1(|c: char| c.is_alphanumeric() || c == '-' || c == '_')(input)
}

/// Comma-separated selectors up to the opening brace
fn selector_group(input: &str) -> ParseResult<'_, Vec<&str>> {
    let (input, text) = context(
        "selector",
        take_while1(|c: char| c != '{' && c != '}' && c != ';'),
    )(input)?;
    let selectors = text
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    Ok((input, selectors))
}

fn property_value(input: &str) -> ParseResult<'_, &str> {
    let (input, value) = context(
        "property value",
        take_while(|c: char| c != ';' && c != '}'),
    )(input)?;
    Ok((input, value.trim()))
}

/// A single declaration: name: value;
fn property_declaration(input: &str) -> ParseResult<'_, (&str, &str)> {
    let (input, _) = ws(input)?;
    let (input, name) = context("property name", identifier)(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = context("colon after property name", char(':'))(input)?;
    let (input, _) = ws(input)?;
    let (input, value) = context("property value", property_value)(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = opt(char(';'))(input)?;
    Ok((input, (name, value)))
}

/// A rule block: { name: value; ... }
fn rule_block(input: &str) -> ParseResult<'_, Vec<(&str, &str)>> {
    let (input, _) = ws(input)?;
    let (input, _) = context("opening brace", char('{'))(input)?;
    let (input, _) = ws(input)?;
    let (input, properties) = many0(property_declaration)(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = context("closing brace", char('}'))(input)?;
    Ok((input, properties))
}

fn style_rule(input: &str) -> ParseResult<'_, (Vec<&str>, Vec<(&str, &str)>)> {
    let (input, _) = ws(input)?;
    let (input, selectors) = context("rule selector", selector_group)(input)?;
    let (input, properties) = context("rule block", rule_block)(input)?;
    Ok((input, (selectors, properties)))
}

type ParsedRule<'a> = (&'a str, Vec<(&'a str, &'a str)>);

/// Parse every rule, recording diagnostics for the ones that fail
fn parse_stylesheet_with_errors<'a>(css: &'a str, errors: &mut Vec<ParseError>) -> Vec<ParsedRule<'a>> {
    let mut rules = Vec::new();
    let mut remaining = css;

    loop {
        let trimmed = match ws::<VerboseError<&str>>(remaining) {
            Ok((rest, _)) => rest,
            Err(_) => remaining,
        };
        if trimmed.trim().is_empty() {
            break;
        }

        match style_rule(trimmed) {
            Ok((rest, (selectors, properties))) => {
                let declarations = validated_declarations(css, rest, properties, errors);
                if selectors.is_empty() {
                    let (line, column, fragment) = calculate_position(css, trimmed);
                    let mut err = ParseError::new(Severity::Warning, "Rule without a selector (ignored)", line, column);
                    err.fragment = fragment;
                    errors.push(err);
                }
                for selector in selectors {
                    rules.push((selector, declarations.clone()));
                }
                remaining = rest;
            }
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                // Resume after the next closing brace
                match trimmed.find('}') {
                    Some(end) => {
                        errors.push(ParseError::from_verbose(css, e, Severity::Warning));
                        remaining = &trimmed[end + 1..];
                    }
                    None => {
                        errors.push(ParseError::from_verbose(css, e, Severity::Error));
                        break;
                    }
                }
            }
            Err(nom::Err::Incomplete(_)) => break,
        }
    }

    rules
}

/// Drop declarations with empty values, recording a warning for each
fn validated_declarations<'a>(
    css: &str,
    position: &str,
    properties: Vec<(&'a str, &'a str)>,
    errors: &mut Vec<ParseError>,
) -> Vec<(&'a str, &'a str)> {
    properties
        .into_iter()
        .filter(|(name, value)| {
            if value.is_empty() {
                let (line, column, _) = calculate_position(css, position);
                errors.push(ParseError::invalid_value(name, value, line, column));
                false
            } else {
                true
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rules_in_order() {
        let css = r#"
            Button { BackgroundColor: #336699; Padding: 4; }
            Button:hover { BackgroundColor: red }
        "#;
        let sheet = Stylesheet::parse(css).unwrap();
        assert_eq!(sheet.len(), 2);

        let first = &sheet.rules()[0];
        assert_eq!(first.selector_text, "Button");
        assert_eq!(first.declaration("backgroundcolor"), Some("#336699"));
        assert_eq!(first.declaration("Padding"), Some("4"));
        assert_eq!(first.order, 0);

        let second = &sheet.rules()[1];
        assert_eq!(second.selector.pseudo_classes.as_slice(), &["hover".to_string()]);
        assert_eq!(second.order, 1);
    }

    #[test]
    fn test_comments_and_selector_groups() {
        let css = r#"
            /* shared chrome */
            Panel, .card, #main { Margin: 2; /* trailing */ }
        "#;
        let sheet = Stylesheet::parse(css).unwrap();
        let selectors: Vec<&str> = sheet.rules().iter().map(|r| r.selector_text.as_str()).collect();
        assert_eq!(selectors, vec!["Panel", ".card", "#main"]);
        assert!(sheet.rules().iter().all(|r| r.declaration("Margin") == Some("2")));
    }

    #[test]
    fn test_malformed_rule_is_skipped() {
        let css = "Button { Width 10; }\nPanel { Height: 20; }";
        let result = Stylesheet::parse_with_errors(css);

        assert!(!result.has_errors());
        assert!(result.has_warnings());
        assert_eq!(result.stylesheet.len(), 1);
        assert_eq!(result.stylesheet.rules()[0].selector_text, "Panel");
        assert_eq!(result.errors[0].line, 1);
    }

    #[test]
    fn test_unterminated_rule_is_an_error() {
        let css = "Panel { Height: 20; }\n\nButton { Width: 10;";
        let result = Stylesheet::parse_with_errors(css);
        assert!(result.has_errors());
        assert_eq!(result.stylesheet.len(), 1);

        let err = Stylesheet::parse(css).unwrap_err();
        assert_eq!(err.severity, Severity::Error);
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_empty_value_is_dropped() {
        let result = Stylesheet::parse_with_errors("Panel { Width: ; Height: 5 }");
        let rule = &result.stylesheet.rules()[0];
        assert_eq!(rule.declarations, vec![("Height".to_string(), "5".to_string())]);
    }

    #[test]
    fn test_matching_sorted_by_specificity_then_order() {
        let sheet = Stylesheet::parse(
            "#ok { A: 1 } .primary { A: 2 } Button { A: 3 } Button { A: 4 } * { A: 5 }",
        )
        .unwrap();
        let candidate = Selector::default().tag("Button").id("ok").class("primary");
        let values: Vec<&str> = sheet
            .matching(&candidate)
            .iter()
            .filter_map(|r| r.declaration("A"))
            .collect();
        assert_eq!(values, vec!["5", "3", "4", "2", "1"]);
    }

    #[test]
    fn test_position_calculation() {
        let css = "a\nbc\ndef";
        assert_eq!(calculate_position(css, "ef").0, 3);
        assert_eq!(calculate_position(css, "ef").1, 2);
        assert_eq!(calculate_position(css, css).1, 1);
    }

    #[test]
    fn test_from_file_names_path() {
        let err = Stylesheet::from_file("/nonexistent/calyx/theme.css").unwrap_err();
        match err {
            LayoutError::ContentLoad { path, .. } => assert!(path.ends_with("theme.css")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
