//! Runtime configuration
//!
//! Loaded from TOML; every field is optional:
//!
//! ```toml
//! cursor_blink_ms = 300
//! default_font_size = 16.0
//! id_prefix = "ui-"
//!
//! [viewport]
//! width = 800
//! height = 600
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use calyx_core::Size;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LayoutError, Result};

/// Settings for a [`UiSystem`](crate::ui::UiSystem)
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct UiConfig {
    /// LineEdit cursor blink interval
    #[serde(default = "default_cursor_blink_ms")]
    pub cursor_blink_ms: u64,
    /// Font size for text elements without a font
    #[serde(default = "default_font_size")]
    pub default_font_size: f32,
    #[serde(default)]
    pub viewport: ViewportConfig,
    /// Prefix for generated element ids
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ViewportConfig {
    #[serde(default = "default_viewport_width")]
    pub width: i32,
    #[serde(default = "default_viewport_height")]
    pub height: i32,
}

fn default_cursor_blink_ms() -> u64 {
    300
}

fn default_font_size() -> f32 {
    16.0
}

fn default_id_prefix() -> String {
    "ui-".to_string()
}

fn default_viewport_width() -> i32 {
    800
}

fn default_viewport_height() -> i32 {
    600
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: default_viewport_width(),
            height: default_viewport_height(),
        }
    }
}

impl ViewportConfig {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            cursor_blink_ms: default_cursor_blink_ms(),
            default_font_size: default_font_size(),
            viewport: ViewportConfig::default(),
            id_prefix: default_id_prefix(),
        }
    }
}

impl UiConfig {
    /// Parse from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| LayoutError::Config(e.to_string()))
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "loaded ui config");
        Ok(config)
    }

    pub fn cursor_blink(&self) -> Duration {
        Duration::from_millis(self.cursor_blink_ms)
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| LayoutError::Config(e.to_string()))
    }
}
