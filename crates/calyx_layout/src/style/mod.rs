//! Styling
//!
//! - [`selector`]: simple selectors and specificity
//! - [`stylesheet`]: the tolerant stylesheet parser
//! - [`convert`]: raw string to typed value converters
//! - [`cascade`]: applying matching rules to elements
//!
//! All lookup tables live in a [`StyleContext`] that the caller constructs
//! and passes down explicitly.

pub mod cascade;
pub mod convert;
pub mod selector;
pub mod stylesheet;

pub use cascade::{apply_style, apply_style_tree, element_selector, validate_stylesheet};
pub use convert::{Converter, ConverterRegistry};
pub use selector::{implies, Selector, Specificity};
pub use stylesheet::{ParseError, Severity, StyleRule, Stylesheet, StylesheetParseResult};

use crate::properties::PropertyRegistry;

/// Stylesheet plus the registries used to apply it
#[derive(Debug, Default)]
pub struct StyleContext {
    pub stylesheet: Stylesheet,
    pub converters: ConverterRegistry,
    pub properties: PropertyRegistry,
}

impl StyleContext {
    /// Context with the built-in converters and properties
    pub fn new(stylesheet: Stylesheet) -> Self {
        Self {
            stylesheet,
            ..Self::default()
        }
    }

    pub fn set_stylesheet(&mut self, stylesheet: Stylesheet) {
        self.stylesheet = stylesheet;
    }
}
