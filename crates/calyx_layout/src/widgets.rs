//! Built-in widget state and per-frame behavior
//!
//! Widgets are plain state carried inside [`Widget`]; their behavior lives
//! on [`ElementTree`] so it can reach children, styles and events.
//!
//! - **Button**: tracks a visual state (normal / hover / active), reapplies
//!   styles with the matching pseudo-class when it changes, raises `Click`
//! - **TextBlock**: leaf text with an optional font and a foreground color
//! - **LineEdit**: focusable text entry showing a placeholder while empty
//!   and unfocused, with a blinking cursor

use std::time::Duration;

use calyx_core::{Color, FontRef, Key, TextInput};
use tracing::{debug, warn};

use crate::element::{Element, Widget};
use crate::error::Result;
use crate::interaction::{ElementEvent, UpdateContext};
use crate::style::apply_style;
use crate::tree::{ElementId, ElementTree};

// =============================================================================
// Button
// =============================================================================

/// Button visual states
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ButtonVisualState {
    #[default]
    Normal,
    Hover,
    Active,
}

impl ButtonVisualState {
    /// Pseudo-class applied while in this state
    pub fn pseudo_class(&self) -> Option<&'static str> {
        match self {
            ButtonVisualState::Normal => None,
            ButtonVisualState::Hover => Some("hover"),
            ButtonVisualState::Active => Some("active"),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ButtonState {
    pub visual: ButtonVisualState,
}

// =============================================================================
// TextBlock
// =============================================================================

#[derive(Clone, Debug)]
pub struct TextBlockState {
    pub text: String,
    /// Falls back to the tree's default font
    pub font: Option<FontRef>,
    pub foreground: Color,
}

impl TextBlockState {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: None,
            foreground: Color::BLACK,
        }
    }
}

// =============================================================================
// LineEdit
// =============================================================================

#[derive(Clone, Debug)]
pub struct LineEditState {
    pub text: String,
    pub placeholder: String,
    pub cursor_visible: bool,
    last_toggle: Duration,
}

impl LineEditState {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            placeholder: placeholder.into(),
            cursor_visible: false,
            last_toggle: Duration::ZERO,
        }
    }

    /// Text the inner TextBlock shows
    pub fn display_text(&self, focused: bool) -> &str {
        if focused || !self.text.is_empty() {
            &self.text
        } else {
            &self.placeholder
        }
    }

    /// Apply a text-entry event; returns whether the text changed
    pub fn apply_input(&mut self, input: TextInput) -> bool {
        match input.key {
            Some(Key::Backspace) => self.text.pop().is_some(),
            Some(Key::Enter) => {
                self.text.push('\n');
                true
            }
            Some(_) => false,
            None if input.character.is_control() => false,
            None => {
                self.text.push(input.character);
                true
            }
        }
    }
}

impl ElementTree {
    /// Create a detached Button whose content is a TextBlock showing `text`
    pub fn create_button(&mut self, text: impl Into<String>) -> Result<ElementId> {
        let button = self.create(Widget::button());
        let label = self.create(Widget::text_block(text));
        self.add_child(button, label)?;
        Ok(button)
    }

    /// Create a detached LineEdit with its inner TextBlock
    pub fn create_line_edit(&mut self, placeholder: impl Into<String>) -> Result<ElementId> {
        let placeholder = placeholder.into();
        let edit = self.insert(Element::new(Widget::line_edit(placeholder.clone())));
        let inner = self.insert(Element::new(Widget::text_block(placeholder)).with_class("line-edit"));
        self.add_child(edit, inner)?;
        Ok(edit)
    }

    /// Text typed into a LineEdit
    pub fn line_edit_text(&self, id: ElementId) -> Option<&str> {
        match self.get(id)?.widget() {
            Widget::LineEdit(state) => Some(&state.text),
            _ => None,
        }
    }

    /// Deliver a text-entry event to `id`; returns whether it was consumed
    pub fn handle_text_input(&mut self, id: ElementId, input: TextInput) -> bool {
        let Some(element) = self.get_mut(id) else {
            return false;
        };
        if !element.is_enabled {
            return false;
        }
        let changed = match &mut element.widget {
            Widget::LineEdit(state) => state.apply_input(input),
            _ => return false,
        };
        if changed {
            debug!(element = ?id, "text input");
            self.sync_line_edit_display(id);
            self.invalidate_measure(id);
            self.invalidate_visual(id);
        }
        true
    }

    pub(crate) fn update_button(&mut self, id: ElementId, ctx: &UpdateContext<'_>) {
        let Some(element) = self.get_mut(id) else { return };
        let hovering = element.interaction.hovering;
        let left = ctx.input.left;
        let next = match (hovering, left.down) {
            (true, true) => ButtonVisualState::Active,
            (true, false) => ButtonVisualState::Hover,
            _ => ButtonVisualState::Normal,
        };

        let changed = match &mut element.widget {
            Widget::Button(state) if state.visual != next => {
                state.visual = next;
                true
            }
            _ => false,
        };
        if changed {
            if let Err(err) = apply_style(self, id, ctx.style, next.pseudo_class()) {
                warn!(element = ?id, error = %err, "failed to restyle button");
            }
        }

        if hovering && left.released {
            self.raise(id, ElementEvent::Click, &ctx.command_args());
        }
    }

    pub(crate) fn update_line_edit(&mut self, id: ElementId, ctx: &UpdateContext<'_>) {
        let Some(element) = self.get_mut(id) else { return };
        let focused = element.interaction.has_focus;
        let pseudo_changed = if focused {
            element.add_pseudo_class("focus")
        } else {
            element.remove_pseudo_class("focus")
        };

        let total = ctx.time.total;
        let blinked = match &mut element.widget {
            Widget::LineEdit(state) if focused => {
                if total.saturating_sub(state.last_toggle) > ctx.cursor_blink {
                    state.cursor_visible = !state.cursor_visible;
                    state.last_toggle = total;
                    true
                } else {
                    false
                }
            }
            Widget::LineEdit(state) if state.cursor_visible => {
                state.cursor_visible = false;
                true
            }
            _ => false,
        };

        if pseudo_changed {
            if let Err(err) = apply_style(self, id, ctx.style, None) {
                warn!(element = ?id, error = %err, "failed to restyle line edit");
            }
        }
        if blinked {
            self.invalidate_visual(id);
        }
        self.sync_line_edit_display(id);
    }

    /// Push the LineEdit's text (or placeholder) into its inner TextBlock
    fn sync_line_edit_display(&mut self, id: ElementId) {
        let Some(element) = self.get(id) else { return };
        let display = match element.widget() {
            Widget::LineEdit(state) => state.display_text(element.has_focus()).to_string(),
            _ => return,
        };
        let Some(inner) = self.content(id) else { return };
        let changed = match self.get_mut(inner).map(|e| &mut e.widget) {
            Some(Widget::TextBlock(text)) if text.text != display => {
                text.text = display;
                true
            }
            _ => false,
        };
        if changed {
            self.invalidate_measure(inner);
            self.invalidate_visual(inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::FrameTime;
    use crate::style::{StyleContext, Stylesheet};
    use calyx_core::{Point, Rect, UiInputData};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn page_with(tree: &mut ElementTree, child: ElementId, rect: Rect) -> ElementId {
        let page = tree.create(Widget::page());
        tree.get_mut(page).unwrap().bounds = Rect::new(0, 0, 800, 600);
        tree.add_child(page, child).unwrap();
        tree.get_mut(child).unwrap().bounds = rect;
        page
    }

    fn run(tree: &mut ElementTree, page: ElementId, input: &UiInputData, style: &StyleContext, ms: u64) {
        let ctx = UpdateContext::new(
            input,
            FrameTime::new(Duration::from_millis(ms), Duration::from_millis(16)),
            style,
        );
        tree.update(page, &ctx);
    }

    #[test]
    fn test_button_click_on_release_while_hovering() {
        let mut tree = ElementTree::new();
        let button = tree.create_button("OK").unwrap();
        let page = page_with(&mut tree, button, Rect::new(0, 0, 100, 30));
        let style = StyleContext::default();

        let clicks = Rc::new(RefCell::new(0));
        let clicks_clone = Rc::clone(&clicks);
        tree.on(button, ElementEvent::Click, move |_| {
            *clicks_clone.borrow_mut() += 1;
            Ok(())
        });

        let mut input = UiInputData::at(Point::new(10, 10));
        input.left.down = true;
        input.left.pressed = true;
        run(&mut tree, page, &input, &style, 0);
        assert_eq!(*clicks.borrow(), 0);

        let mut input = UiInputData::at(Point::new(10, 10));
        input.left.released = true;
        run(&mut tree, page, &input, &style, 16);
        assert_eq!(*clicks.borrow(), 1);
    }

    #[test]
    fn test_button_visual_state_applies_pseudo_styles() {
        let sheet = Stylesheet::parse(
            "Button:hover { BackgroundColor: #00FF00 } Button:active { BackgroundColor: #0000FF }",
        )
        .unwrap();
        let style = StyleContext::new(sheet);
        let mut tree = ElementTree::new();
        let button = tree.create_button("OK").unwrap();
        let page = page_with(&mut tree, button, Rect::new(0, 0, 100, 30));

        run(&mut tree, page, &UiInputData::at(Point::new(10, 10)), &style, 0);
        assert_eq!(tree.get(button).unwrap().background_color, Some(Color::GREEN));

        let mut input = UiInputData::at(Point::new(10, 10));
        input.left.down = true;
        run(&mut tree, page, &input, &style, 16);
        assert_eq!(tree.get(button).unwrap().background_color, Some(Color::BLUE));
    }

    #[test]
    fn test_line_edit_input_editing() {
        let mut state = LineEditState::new("name");
        assert!(state.apply_input(TextInput::char('a')));
        assert!(state.apply_input(TextInput::char('b')));
        assert!(!state.apply_input(TextInput::char('\u{7}')));
        assert!(state.apply_input(TextInput::key(Key::Backspace)));
        assert!(state.apply_input(TextInput::key(Key::Enter)));
        assert_eq!(state.text, "a\n");
        assert!(!state.apply_input(TextInput::key(Key::Escape)));
    }

    #[test]
    fn test_line_edit_placeholder_swap() {
        let mut tree = ElementTree::new();
        let edit = tree.create_line_edit("Your name").unwrap();
        let page = page_with(&mut tree, edit, Rect::new(0, 0, 200, 30));
        let inner = tree.content(edit).unwrap();
        let style = StyleContext::default();

        run(&mut tree, page, &UiInputData::at(Point::new(500, 500)), &style, 0);
        assert_eq!(tree.get(inner).unwrap().text(), Some("Your name"));

        let mut click = UiInputData::at(Point::new(10, 10));
        click.left.down = true;
        click.left.pressed = true;
        run(&mut tree, page, &click, &style, 16);
        run(&mut tree, page, &UiInputData::at(Point::new(10, 10)), &style, 32);
        assert!(tree.get(edit).unwrap().has_focus());
        assert!(tree.get(edit).unwrap().has_pseudo_class("focus"));
        assert_eq!(tree.get(inner).unwrap().text(), Some(""));

        assert!(tree.handle_text_input(edit, TextInput::char('J')));
        assert_eq!(tree.line_edit_text(edit), Some("J"));
        assert_eq!(tree.get(inner).unwrap().text(), Some("J"));
    }

    #[test]
    fn test_line_edit_cursor_blinks_only_when_focused() {
        let mut tree = ElementTree::new();
        let edit = tree.create_line_edit("").unwrap();
        let page = page_with(&mut tree, edit, Rect::new(0, 0, 200, 30));
        let style = StyleContext::default();
        let away = UiInputData::at(Point::new(500, 500));

        let cursor = |tree: &ElementTree| match tree.get(edit).unwrap().widget() {
            Widget::LineEdit(state) => state.cursor_visible,
            _ => unreachable!(),
        };

        run(&mut tree, page, &away, &style, 1000);
        assert!(!cursor(&tree));

        assert!(tree.request_focus(edit));
        run(&mut tree, page, &away, &style, 1100);
        assert!(cursor(&tree));
        run(&mut tree, page, &away, &style, 1200);
        assert!(cursor(&tree));
        run(&mut tree, page, &away, &style, 1500);
        assert!(!cursor(&tree));
    }

    #[test]
    fn test_text_input_ignored_by_other_widgets() {
        let mut tree = ElementTree::new();
        let panel = tree.create(Widget::Panel);
        assert!(!tree.handle_text_input(panel, TextInput::char('x')));
    }
}
