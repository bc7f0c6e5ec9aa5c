//! Calyx Layout Engine
//!
//! Retained-mode element tree with two-pass layout, a CSS-like style
//! cascade, per-frame input handling and view-model binding.
//!
//! # Example
//!
//! ```rust
//! use calyx_layout::prelude::*;
//!
//! let stylesheet = Stylesheet::parse("Button:hover { BackgroundColor: #FF0000 }").unwrap();
//! let mut ui = UiSystem::default().with_stylesheet(stylesheet);
//!
//! let page = UiNode::new("Page").child(
//!     UiNode::new("Button")
//!         .attr("Id", "ok")
//!         .attr("Width", "100")
//!         .attr("Height", "30")
//!         .attr("PositionX", "0")
//!         .attr("PositionY", "0")
//!         .text("OK"),
//! );
//! let root = ui.load(&page, None).unwrap();
//!
//! let mut draw = RecordingContext::new();
//! ui.frame(&UiInputData::at(Point::new(50, 15)), Duration::from_millis(16), &mut draw);
//!
//! let button = ui.tree().find_by_name(root, "ok").unwrap();
//! assert_eq!(ui.tree().get(button).unwrap().background_color(), Some(Color::RED));
//! ```

pub mod binding;
pub mod builder;
pub mod config;
pub mod draw;
pub mod element;
pub mod error;
pub mod interaction;
pub mod layout;
pub mod page;
pub mod properties;
pub mod style;
pub mod text;
pub mod tree;
pub mod ui;
pub mod widgets;

// Core types
pub use element::{Children, DirtyFlags, Element, LayoutKind, Widget, WidgetKind};
pub use error::{LayoutError, Result};
pub use tree::{ElementId, ElementTree, LayoutStats};

// Styling and properties
pub use properties::{Invalidation, PropertyDescriptor, PropertyRegistry};
pub use style::{ConverterRegistry, Selector, Specificity, StyleContext, StyleRule, Stylesheet};

// Interaction
pub use interaction::{ElementEvent, EventArgs, EventHandler, FrameTime, InteractionState, UpdateContext};
pub use page::PageState;
pub use widgets::{ButtonVisualState, LineEditState, TextBlockState};

// Markup and binding
pub use binding::{BindingEngine, MarkupExpression};
pub use builder::{BuildSession, BuilderRegistry, UiNode};

// Host integration
pub use config::UiConfig;
pub use draw::{DrawCommand, DrawContext, RecordingContext};
pub use text::{EstimatedTextMeasurer, MonospaceMeasurer, TextMeasurer};
pub use ui::UiSystem;

/// Everything a host needs to build and drive a UI
pub mod prelude {
    pub use crate::binding::BindingEngine;
    pub use crate::builder::{BuilderRegistry, UiNode};
    pub use crate::config::UiConfig;
    pub use crate::draw::{DrawCommand, DrawContext, RecordingContext};
    pub use crate::element::{Element, Widget, WidgetKind};
    pub use crate::error::{LayoutError, Result};
    pub use crate::interaction::ElementEvent;
    pub use crate::style::{StyleContext, Stylesheet};
    pub use crate::tree::{ElementId, ElementTree};
    pub use crate::ui::UiSystem;

    pub use calyx_core::{
        Color, MouseState, ObservableObject, Orientation, Point, Rect, Size, TextInput, Thickness,
        UiInputData, Value, ViewModel,
    };
    pub use std::time::Duration;
}
