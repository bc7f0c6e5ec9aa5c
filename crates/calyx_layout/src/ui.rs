//! Per-frame driver
//!
//! [`UiSystem`] owns the element tree together with everything that acts on
//! it and runs one frame at a time:
//!
//! 1. pull queued binding updates into the tree
//! 2. measure against the viewport, then arrange at `(0, 0, w, h)`
//! 3. run the interaction pass with the frame's input
//! 4. draw
//!
//! Text entry arrives separately through [`UiSystem::handle_text_input`]
//! and goes to the focused element of the root page.

use std::rc::Rc;
use std::time::Duration;

use calyx_core::{FontRef, Rect, Size, TextInput, UiInputData, ViewModel};
use tracing::{debug, trace};

use crate::binding::BindingEngine;
use crate::builder::{BuilderRegistry, UiNode};
use crate::config::UiConfig;
use crate::draw::DrawContext;
use crate::error::Result;
use crate::interaction::{ElementEvent, FrameTime, UpdateContext};
use crate::style::{StyleContext, Stylesheet};
use crate::tree::{ElementId, ElementTree};

/// Element tree, styles, bindings and builders driven one frame at a time
pub struct UiSystem {
    tree: ElementTree,
    style: StyleContext,
    bindings: BindingEngine,
    builders: BuilderRegistry,
    config: UiConfig,
    root: Option<ElementId>,
    viewport: Size,
    elapsed: Duration,
}

impl std::fmt::Debug for UiSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiSystem")
            .field("elements", &self.tree.len())
            .field("rules", &self.style.stylesheet.len())
            .field("bindings", &self.bindings.binding_count())
            .field("builders", &self.builders)
            .field("config", &self.config)
            .field("root", &self.root)
            .field("viewport", &self.viewport)
            .field("elapsed", &self.elapsed)
            .finish()
    }
}

impl Default for UiSystem {
    fn default() -> Self {
        Self::new(UiConfig::default())
    }
}

impl UiSystem {
    pub fn new(config: UiConfig) -> Self {
        let mut tree = ElementTree::new();
        tree.set_default_font(FontRef::new("default", config.default_font_size));
        Self {
            tree,
            style: StyleContext::default(),
            bindings: BindingEngine::new(),
            builders: BuilderRegistry::new().with_id_prefix(config.id_prefix.clone()),
            viewport: config.viewport.size(),
            config,
            root: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn with_stylesheet(mut self, stylesheet: Stylesheet) -> Self {
        self.style.set_stylesheet(stylesheet);
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn tree(&self) -> &ElementTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ElementTree {
        &mut self.tree
    }

    pub fn style(&self) -> &StyleContext {
        &self.style
    }

    pub fn style_mut(&mut self) -> &mut StyleContext {
        &mut self.style
    }

    pub fn bindings(&self) -> &BindingEngine {
        &self.bindings
    }

    /// Registry used by [`load`](Self::load), for custom tags
    pub fn builders_mut(&mut self) -> &mut BuilderRegistry {
        &mut self.builders
    }

    pub fn config(&self) -> &UiConfig {
        &self.config
    }

    pub fn root(&self) -> Option<ElementId> {
        self.root
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Change the viewport; the next frame lays out against it
    pub fn resize(&mut self, viewport: Size) {
        if viewport != self.viewport {
            debug!(width = viewport.width, height = viewport.height, "viewport resized");
            self.viewport = viewport;
            if let Some(root) = self.root.filter(|r| self.tree.contains(*r)) {
                self.tree.invalidate_measure(root);
            }
        }
    }

    // =========================================================================
    // Content
    // =========================================================================

    /// Build `node` into the tree, wire up its bindings and make it the root
    ///
    /// Replaces and destroys the previous root.
    pub fn load(&mut self, node: &UiNode, view_model: Option<Rc<dyn ViewModel>>) -> Result<ElementId> {
        let root = self
            .builders
            .build(&mut self.tree, &mut self.style, node, view_model)?;
        self.set_root(root)?;
        Ok(root)
    }

    /// Make an already built element the root and wire up its bindings
    ///
    /// Setting the current root again changes nothing.
    pub fn set_root(&mut self, root: ElementId) -> Result<()> {
        self.tree.element(root)?;
        if self.root == Some(root) {
            return Ok(());
        }
        if let Some(previous) = self.root.take().filter(|p| *p != root) {
            self.bindings.clear();
            self.tree.remove(previous)?;
        }
        let bound = self.bindings.wire_up(&mut self.tree, root, &self.style)?;
        debug!(root = ?root, bound, "root set");
        self.root = Some(root);
        Ok(())
    }

    // =========================================================================
    // Frame
    // =========================================================================

    /// Run one frame and return the events it raised
    pub fn frame(
        &mut self,
        input: &UiInputData,
        delta: Duration,
        draw: &mut dyn DrawContext,
    ) -> Vec<(ElementId, ElementEvent)> {
        self.elapsed += delta;
        let applied = self.bindings.apply_pending(&mut self.tree, &self.style);

        let Some(root) = self.root.filter(|r| self.tree.contains(*r)) else {
            return Vec::new();
        };

        self.tree.measure(root, self.viewport);
        self.tree
            .arrange(root, Rect::new(0, 0, self.viewport.width, self.viewport.height));

        let ctx = UpdateContext::new(input, FrameTime::new(self.elapsed, delta), &self.style)
            .with_cursor_blink(self.config.cursor_blink());
        let events = self.tree.update(root, &ctx);

        self.tree.draw(root, draw);
        trace!(applied, events = events.len(), "frame");
        events
    }

    /// Deliver a text-entry event to the focused element
    ///
    /// Returns whether it changed anything.
    pub fn handle_text_input(&mut self, input: TextInput) -> bool {
        let Some(focused) = self.root.and_then(|r| self.tree.focused(r)) else {
            trace!(?input, "text input without a focused element");
            return false;
        };
        self.tree.handle_text_input(focused, input)
    }
}
