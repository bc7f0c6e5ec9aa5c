//! Error types for calyx_layout

use calyx_core::CoreError;
use thiserror::Error;

use crate::tree::ElementId;

/// Errors that can occur while building, styling or laying out a tree
#[derive(Error, Debug)]
pub enum LayoutError {
    /// Attempted to attach a child that is still attached elsewhere
    #[error("Element {0:?} already has a parent")]
    AlreadyParented(ElementId),

    /// Attempted to attach an element underneath itself
    #[error("Element {0:?} cannot be attached to its own descendant")]
    CyclicAttachment(ElementId),

    /// Attempted to add children to an element that cannot hold them
    #[error("Element {0:?} cannot hold children")]
    NotAContainer(ElementId),

    /// The id does not refer to a live element
    #[error("Unknown element {0:?}")]
    UnknownElement(ElementId),

    /// No builder is registered for a markup tag
    #[error("Unknown element tag: {0}")]
    UnknownTag(String),

    /// Malformed thickness literal
    #[error("Invalid thickness: {0}")]
    InvalidThickness(String),

    /// Malformed or unknown color literal
    #[error("Unknown color: {0}")]
    UnknownColor(String),

    /// A style or markup asset could not be loaded
    #[error("Failed to load {path}: {message}")]
    ContentLoad { path: String, message: String },

    /// Invalid configuration file
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O failure while reading an asset
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Error from calyx_core
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl LayoutError {
    /// Whether this error means a style or markup asset is malformed
    pub fn is_content_load(&self) -> bool {
        matches!(
            self,
            LayoutError::InvalidThickness(_)
                | LayoutError::UnknownColor(_)
                | LayoutError::ContentLoad { .. }
        )
    }

    /// Attach the asset path to a malformed-literal error
    pub fn in_file(self, path: &str) -> LayoutError {
        match self {
            LayoutError::InvalidThickness(_) | LayoutError::UnknownColor(_) => LayoutError::ContentLoad {
                path: path.to_string(),
                message: self.to_string(),
            },
            other => other,
        }
    }
}

/// Result type for calyx_layout operations
pub type Result<T> = std::result::Result<T, LayoutError>;
