//! Drawing
//!
//! The tree never rasterizes anything itself; it walks visible elements and
//! issues primitive calls to a [`DrawContext`] supplied by the host.
//! [`RecordingContext`] captures those calls as [`DrawCommand`]s, which is
//! what tests and headless hosts use.

use calyx_core::{Color, FontRef, Point, Rect, Thickness};

use crate::element::{Widget, WidgetKind};
use crate::tree::{ElementId, ElementTree};

/// Drawing capability consumed by the tree
pub trait DrawContext {
    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Draw a border of per-side `thickness` just inside `rect`
    fn stroke_rect(&mut self, rect: Rect, color: Color, thickness: Thickness);

    fn draw_text(&mut self, text: &str, origin: Point, font: &FontRef, color: Color);
}

/// A recorded draw call
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    FillRect {
        rect: Rect,
        color: Color,
    },
    StrokeRect {
        rect: Rect,
        color: Color,
        thickness: Thickness,
    },
    DrawText {
        text: String,
        origin: Point,
        font: FontRef,
        color: Color,
    },
}

/// A draw context that records commands
#[derive(Clone, Debug, Default)]
pub struct RecordingContext {
    commands: Vec<DrawCommand>,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl DrawContext for RecordingContext {
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, thickness: Thickness) {
        self.commands.push(DrawCommand::StrokeRect {
            rect,
            color,
            thickness,
        });
    }

    fn draw_text(&mut self, text: &str, origin: Point, font: &FontRef, color: Color) {
        self.commands.push(DrawCommand::DrawText {
            text: text.to_string(),
            origin,
            font: font.clone(),
            color,
        });
    }
}

/// Width of the LineEdit text cursor
const CURSOR_WIDTH: i32 = 1;

impl ElementTree {
    /// Draw the subtree at `id`, clearing visual dirty flags as it goes
    pub fn draw(&mut self, id: ElementId, ctx: &mut dyn DrawContext) {
        let Some(element) = self.get_mut(id) else { return };
        if !element.is_visible {
            return;
        }
        element.dirty.visual = false;
        let kind = element.kind();

        self.draw_element(id, ctx);

        let children = match kind {
            WidgetKind::Page => self.draw_order(id),
            _ => self.children(id).to_vec(),
        };
        for child in children {
            self.draw(child, ctx);
        }

        if kind == WidgetKind::LineEdit {
            self.draw_cursor(id, ctx);
        }
    }

    fn draw_element(&self, id: ElementId, ctx: &mut dyn DrawContext) {
        let Some(element) = self.get(id) else { return };
        let bounds = element.bounds;

        match element.widget() {
            Widget::RoundPanel => {
                ctx.fill_rect(bounds, element.border_color.unwrap_or(Color::BLACK));
                if let Some(background) = element.background_color {
                    ctx.fill_rect(bounds.deflate(element.border_thickness), background);
                }
            }
            Widget::TextBlock(state) => {
                if let Some(background) = element.background_color {
                    ctx.fill_rect(bounds, background);
                }
                let font = state.font.as_ref().unwrap_or(&self.default_font);
                let origin = bounds.deflate(element.padding).origin();
                ctx.draw_text(&state.text, origin, font, state.foreground);
            }
            _ => {
                if let Some(background) = element.background_color {
                    ctx.fill_rect(bounds, background);
                }
                if let Some(border) = element.border_color {
                    if element.border_thickness != Thickness::ZERO {
                        ctx.stroke_rect(bounds, border, element.border_thickness);
                    }
                }
            }
        }
    }

    fn draw_cursor(&self, id: ElementId, ctx: &mut dyn DrawContext) {
        let Some(element) = self.get(id) else { return };
        let Widget::LineEdit(state) = element.widget() else {
            return;
        };
        if !element.has_focus() || !state.cursor_visible {
            return;
        }
        let Some(inner) = self.content(id).and_then(|c| self.get(c)) else {
            return;
        };
        let color = match inner.widget() {
            Widget::TextBlock(text) => text.foreground,
            _ => Color::BLACK,
        };
        let text_area = inner.bounds.deflate(inner.padding);
        let text_width = inner.size.width - inner.padding.horizontal();
        let cursor = Rect::new(
            text_area.x + text_width.max(0),
            text_area.y,
            CURSOR_WIDTH,
            text_area.height,
        );
        ctx.fill_rect(cursor, color);
    }
}
