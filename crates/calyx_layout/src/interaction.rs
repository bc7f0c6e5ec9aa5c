//! Pointer interaction: hover, press, focus and drag
//!
//! Every frame the tree is walked once with the frame's [`UiInputData`].
//! Each element keeps a small [`InteractionState`] and raises
//! [`ElementEvent`]s on transitions:
//!
//! ```text
//! not hovering ∧ hit   → MouseEnter
//! hovering ∧ hit       → MouseOver
//! hovering ∧ ¬hit      → MouseLeave (also clears the press latch)
//! hit ∧ ¬pressed ∧ down → MouseDown
//! pressed ∧ released ∧ hit → MouseUp
//! ```
//!
//! Press, focus and drag are only evaluated along the topmost hit path of a
//! page, deepest element first. Every raised event is dispatched to the
//! handlers registered with [`ElementTree::on`] and to the command bound in
//! the element's matching slot, if its guard allows it.

use std::time::Duration;

use calyx_core::{try_execute, CommandArgs, Point, UiInputData};
use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use crate::element::{Children, WidgetKind};
use crate::style::StyleContext;
use crate::tree::{ElementId, ElementTree};

/// Interaction events raised by elements
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementEvent {
    MouseEnter,
    MouseOver,
    MouseLeave,
    MouseDown,
    MouseUp,
    Click,
    FocusEnter,
    FocusLeave,
    DragEnter,
    DragMove,
    DragLeave,
}

impl ElementEvent {
    pub const ALL: [ElementEvent; 11] = [
        ElementEvent::MouseEnter,
        ElementEvent::MouseOver,
        ElementEvent::MouseLeave,
        ElementEvent::MouseDown,
        ElementEvent::MouseUp,
        ElementEvent::Click,
        ElementEvent::FocusEnter,
        ElementEvent::FocusLeave,
        ElementEvent::DragEnter,
        ElementEvent::DragMove,
        ElementEvent::DragLeave,
    ];

    /// Name of the command slot that fires with this event (`OnClick`, ...)
    pub fn command_name(&self) -> &'static str {
        match self {
            ElementEvent::MouseEnter => "OnMouseEnter",
            ElementEvent::MouseOver => "OnMouseOver",
            ElementEvent::MouseLeave => "OnMouseLeave",
            ElementEvent::MouseDown => "OnMouseDown",
            ElementEvent::MouseUp => "OnMouseUp",
            ElementEvent::Click => "OnClick",
            ElementEvent::FocusEnter => "OnFocusEnter",
            ElementEvent::FocusLeave => "OnFocusLeave",
            ElementEvent::DragEnter => "OnDragEnter",
            ElementEvent::DragMove => "OnDragMove",
            ElementEvent::DragLeave => "OnDragLeave",
        }
    }

    pub fn from_command_name(name: &str) -> Option<ElementEvent> {
        ElementEvent::ALL
            .into_iter()
            .find(|e| e.command_name().eq_ignore_ascii_case(name))
    }
}

/// Arguments handed to event handlers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventArgs {
    pub element: ElementId,
    pub event: ElementEvent,
    /// Pointer position when the event was raised
    pub position: Point,
}

/// Callback for element events
///
/// An `Err` is logged and does not stop the remaining handlers.
pub type EventHandler = Box<dyn FnMut(&EventArgs) -> anyhow::Result<()>>;

/// Handlers indexed by element
#[derive(Default)]
pub struct HandlerTable {
    handlers: FxHashMap<ElementId, Vec<(ElementEvent, EventHandler)>>,
}

impl HandlerTable {
    pub fn add(&mut self, element: ElementId, event: ElementEvent, handler: EventHandler) {
        self.handlers
            .entry(element)
            .or_default()
            .push((event, handler));
    }

    /// Drop every handler registered for `element`
    pub fn remove_element(&mut self, element: ElementId) {
        self.handlers.remove(&element);
    }

    pub fn has_handlers(&self, element: ElementId) -> bool {
        self.handlers.get(&element).is_some_and(|h| !h.is_empty())
    }

    /// Run every handler for `args.event` on `args.element`
    ///
    /// Returns the number of handlers that failed.
    pub fn dispatch(&mut self, args: &EventArgs) -> usize {
        let Some(handlers) = self.handlers.get_mut(&args.element) else {
            return 0;
        };
        let mut failures = 0;
        for (event, handler) in handlers.iter_mut() {
            if *event != args.event {
                continue;
            }
            if let Err(err) = handler(args) {
                failures += 1;
                warn!(element = ?args.element, event = ?args.event, error = %err, "event handler failed");
            }
        }
        failures
    }
}

/// Per-element pointer state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InteractionState {
    pub hovering: bool,
    /// Mouse-down latch, set on `MouseDown` and cleared on `MouseUp`/`MouseLeave`
    pub pressed: bool,
    pub has_focus: bool,
    pub dragging: bool,
    /// Pointer position relative to the element's top-left when the drag began
    pub drag_offset: Point,
}

/// Frame clock
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameTime {
    /// Time since the UI started
    pub total: Duration,
    /// Time since the previous frame
    pub delta: Duration,
}

impl FrameTime {
    pub fn new(total: Duration, delta: Duration) -> Self {
        Self { total, delta }
    }
}

/// Everything an update pass reads
pub struct UpdateContext<'a> {
    pub input: &'a UiInputData,
    pub time: FrameTime,
    pub style: &'a StyleContext,
    pub cursor_blink: Duration,
}

impl<'a> UpdateContext<'a> {
    pub fn new(input: &'a UiInputData, time: FrameTime, style: &'a StyleContext) -> Self {
        Self {
            input,
            time,
            style,
            cursor_blink: Duration::from_millis(300),
        }
    }

    pub fn with_cursor_blink(mut self, interval: Duration) -> Self {
        self.cursor_blink = interval;
        self
    }

    pub(crate) fn command_args(&self) -> CommandArgs {
        CommandArgs::from_input(self.input)
    }
}

impl ElementTree {
    // =========================================================================
    // Events
    // =========================================================================

    /// Raise `event` on `id`: record it, run handlers, then the bound command
    pub(crate) fn raise(&mut self, id: ElementId, event: ElementEvent, args: &CommandArgs) {
        trace!(element = ?id, event = ?event, "raise");
        self.frame_events.push((id, event));

        let event_args = EventArgs {
            element: id,
            event,
            position: args.position,
        };
        self.handlers.dispatch(&event_args);

        if let Some(command) = self.get(id).and_then(|e| e.command(event)) {
            let sender = self.sender(id);
            try_execute(command.as_ref(), &sender, args);
        }
    }

    /// Events raised during the last [`update`](Self::update), in order
    pub fn frame_events(&self) -> &[(ElementId, ElementEvent)] {
        &self.frame_events
    }

    // =========================================================================
    // Update pass
    // =========================================================================

    /// Run one interaction pass over the subtree at `root`
    ///
    /// Returns the events raised during the pass.
    pub fn update(&mut self, root: ElementId, ctx: &UpdateContext<'_>) -> Vec<(ElementId, ElementEvent)> {
        self.frame_events.clear();
        self.update_element(root, ctx);
        self.frame_events.clone()
    }

    fn update_element(&mut self, id: ElementId, ctx: &UpdateContext<'_>) {
        let Some(element) = self.get(id) else { return };
        let active = element.is_visible && element.is_enabled;
        let hit = element.hit_test(ctx.input.mouse_position);
        let hovering = element.interaction.hovering;

        if active {
            if !hovering && hit {
                if let Some(e) = self.get_mut(id) {
                    e.interaction.hovering = true;
                }
                self.raise(id, ElementEvent::MouseEnter, &ctx.command_args());
            } else if hovering && hit {
                self.raise(id, ElementEvent::MouseOver, &ctx.command_args());
            } else if hovering {
                self.leave(id, ctx);
            }

            self.update_widget(id, ctx);
        } else if hovering {
            self.leave(id, ctx);
        }

        for child in self.children(id) {
            self.update_element(child, ctx);
        }
    }

    fn leave(&mut self, id: ElementId, ctx: &UpdateContext<'_>) {
        if let Some(e) = self.get_mut(id) {
            e.interaction.hovering = false;
            e.interaction.pressed = false;
        }
        self.raise(id, ElementEvent::MouseLeave, &ctx.command_args());
    }

    fn update_widget(&mut self, id: ElementId, ctx: &UpdateContext<'_>) {
        let Some(kind) = self.get(id).map(|e| e.kind()) else {
            return;
        };
        match kind {
            WidgetKind::Page => self.update_page(id, ctx),
            WidgetKind::Button => self.update_button(id, ctx),
            WidgetKind::LineEdit => self.update_line_edit(id, ctx),
            _ => {}
        }
    }

    // =========================================================================
    // Press / focus / drag
    // =========================================================================

    /// Press, focus and drag handling along the topmost hit path
    ///
    /// Descendants are handled before `id`, so the deepest element under
    /// the pointer sees the press first. The walk stops at a nested page:
    /// its subtree is handled by that page's own update.
    pub(crate) fn handle_input(&mut self, id: ElementId, page: ElementId, ctx: &UpdateContext<'_>) {
        let point = ctx.input.mouse_position;
        let nested_page = id != page && self.get(id).is_some_and(|e| e.kind() == WidgetKind::Page);
        let next = self.get(id).filter(|_| !nested_page).and_then(|e| match &e.children {
            Children::Content(Some(child)) => Some(*child),
            Children::Items(items) => items
                .iter()
                .rev()
                .copied()
                .find(|c| self.get(*c).is_some_and(|c| c.hit_test(point))),
            _ => None,
        });
        if let Some(child) = next {
            if self.get(child).is_some_and(|c| c.hit_test(point)) {
                self.handle_input(child, page, ctx);
            }
        }

        let Some(element) = self.get(id) else { return };
        if !element.is_visible || !element.is_enabled {
            return;
        }
        let hit = element.hit_test(point);
        let state = element.interaction;
        let focusable = element.is_focusable;
        let draggable = element.is_draggable;
        let origin = element.bounds.origin();
        let left = ctx.input.left;

        if hit && !state.pressed && left.down {
            if let Some(e) = self.get_mut(id) {
                e.interaction.pressed = true;
            }
            self.raise(id, ElementEvent::MouseDown, &ctx.command_args());
        } else if state.pressed && left.released && hit {
            if let Some(e) = self.get_mut(id) {
                e.interaction.pressed = false;
            }
            self.raise(id, ElementEvent::MouseUp, &ctx.command_args());
        }

        if focusable && !state.has_focus && hit && left.down {
            self.focus_element(id, &ctx.command_args());
        }

        if draggable && hit && left.down && self.drag_target(page).is_none() {
            self.begin_drag(page, id, point - origin, &ctx.command_args());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Widget;
    use calyx_core::{Rect, RelayCommand};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn frame(tree: &mut ElementTree, root: ElementId, input: UiInputData) -> Vec<(ElementId, ElementEvent)> {
        let style = StyleContext::default();
        let ctx = UpdateContext::new(&input, FrameTime::default(), &style);
        tree.update(root, &ctx)
    }

    fn panel_at(tree: &mut ElementTree, page: ElementId, rect: Rect) -> ElementId {
        let id = tree.create(Widget::Panel);
        tree.add_child(page, id).unwrap();
        tree.get_mut(id).unwrap().bounds = rect;
        id
    }

    fn page() -> (ElementTree, ElementId) {
        let mut tree = ElementTree::new();
        let page = tree.create(Widget::page());
        tree.get_mut(page).unwrap().bounds = Rect::new(0, 0, 800, 600);
        (tree, page)
    }

    fn events_for(events: &[(ElementId, ElementEvent)], id: ElementId) -> Vec<ElementEvent> {
        events
            .iter()
            .filter(|(e, _)| *e == id)
            .map(|(_, ev)| *ev)
            .collect()
    }

    #[test]
    fn test_hover_enter_over_leave() {
        let (mut tree, page) = page();
        let panel = panel_at(&mut tree, page, Rect::new(0, 0, 100, 30));

        let mut seen = Vec::new();
        for pos in [(500, 500), (10, 10), (20, 10), (30, 10), (500, 500), (600, 500)] {
            let events = frame(&mut tree, page, UiInputData::at(Point::new(pos.0, pos.1)));
            seen.extend(events_for(&events, panel));
        }

        assert_eq!(
            seen,
            vec![
                ElementEvent::MouseEnter,
                ElementEvent::MouseOver,
                ElementEvent::MouseOver,
                ElementEvent::MouseLeave,
            ]
        );
    }

    #[test]
    fn test_invisible_element_leaves_and_ignores_pointer() {
        let (mut tree, page) = page();
        let panel = panel_at(&mut tree, page, Rect::new(0, 0, 100, 30));
        frame(&mut tree, page, UiInputData::at(Point::new(10, 10)));

        tree.get_mut(panel).unwrap().is_visible = false;
        let events = frame(&mut tree, page, UiInputData::at(Point::new(10, 10)));
        assert_eq!(events_for(&events, panel), vec![ElementEvent::MouseLeave]);

        let events = frame(&mut tree, page, UiInputData::at(Point::new(10, 10)));
        assert!(events_for(&events, panel).is_empty());
    }

    #[test]
    fn test_press_and_release_latch() {
        let (mut tree, page) = page();
        let panel = panel_at(&mut tree, page, Rect::new(0, 0, 100, 30));

        let mut down = UiInputData::at(Point::new(10, 10));
        down.left.down = true;
        down.left.pressed = true;
        let events = frame(&mut tree, page, down.clone());
        assert!(events_for(&events, panel).contains(&ElementEvent::MouseDown));
        assert!(tree.get(panel).unwrap().interaction().pressed);

        // Holding doesn't raise again
        down.left.pressed = false;
        let events = frame(&mut tree, page, down);
        assert!(!events_for(&events, panel).contains(&ElementEvent::MouseDown));

        let mut up = UiInputData::at(Point::new(10, 10));
        up.left.released = true;
        let events = frame(&mut tree, page, up);
        assert!(events_for(&events, panel).contains(&ElementEvent::MouseUp));
        assert!(!tree.get(panel).unwrap().interaction().pressed);
    }

    #[test]
    fn test_leave_clears_press_latch() {
        let (mut tree, page) = page();
        let panel = panel_at(&mut tree, page, Rect::new(0, 0, 100, 30));

        let mut down = UiInputData::at(Point::new(10, 10));
        down.left.down = true;
        down.left.pressed = true;
        frame(&mut tree, page, down);

        let mut away = UiInputData::at(Point::new(300, 300));
        away.left.down = true;
        frame(&mut tree, page, away);
        assert!(!tree.get(panel).unwrap().interaction().pressed);
    }

    #[test]
    fn test_handlers_run_and_errors_do_not_stop_siblings() {
        let (mut tree, page) = page();
        let panel = panel_at(&mut tree, page, Rect::new(0, 0, 100, 30));

        let log = Rc::new(RefCell::new(Vec::new()));
        tree.on(panel, ElementEvent::MouseEnter, |_| Err(anyhow::anyhow!("broken handler")));
        let log_clone = Rc::clone(&log);
        tree.on(panel, ElementEvent::MouseEnter, move |args| {
            log_clone.borrow_mut().push(args.position);
            Ok(())
        });

        frame(&mut tree, page, UiInputData::at(Point::new(5, 6)));
        assert_eq!(*log.borrow(), vec![Point::new(5, 6)]);
    }

    #[test]
    fn test_bound_command_respects_guard() {
        let (mut tree, page) = page();
        let panel = panel_at(&mut tree, page, Rect::new(0, 0, 100, 30));

        let runs = Rc::new(RefCell::new(0));
        let allowed = Rc::new(RefCell::new(false));
        let runs_clone = Rc::clone(&runs);
        let allowed_clone = Rc::clone(&allowed);
        let command = RelayCommand::new(move |_, _| *runs_clone.borrow_mut() += 1)
            .with_guard(move |_, _| *allowed_clone.borrow())
            .into_rc();
        tree.get_mut(panel)
            .unwrap()
            .set_command(ElementEvent::MouseEnter, command);

        frame(&mut tree, page, UiInputData::at(Point::new(10, 10)));
        frame(&mut tree, page, UiInputData::at(Point::new(500, 500)));
        assert_eq!(*runs.borrow(), 0);

        *allowed.borrow_mut() = true;
        frame(&mut tree, page, UiInputData::at(Point::new(10, 10)));
        assert_eq!(*runs.borrow(), 1);
    }

    #[test]
    fn test_nested_page_owns_drag_capture() {
        let (mut tree, outer) = page();
        let inner = tree.create(Widget::page());
        tree.add_child(outer, inner).unwrap();
        tree.get_mut(inner).unwrap().bounds = Rect::new(0, 0, 400, 300);
        let card = panel_at(&mut tree, inner, Rect::new(10, 10, 100, 60));
        tree.get_mut(card).unwrap().is_draggable = true;

        let mut input = UiInputData::at(Point::new(20, 20));
        input.left.down = true;
        input.left.pressed = true;
        let events = frame(&mut tree, outer, input);

        assert_eq!(tree.drag_target(inner), Some(card));
        assert_eq!(tree.drag_target(outer), None);
        let drag_enters = events
            .iter()
            .filter(|(_, ev)| *ev == ElementEvent::DragEnter)
            .count();
        assert_eq!(drag_enters, 1);
        assert_eq!(events_for(&events, card).iter().filter(|ev| **ev == ElementEvent::MouseDown).count(), 1);
    }

    #[test]
    fn test_command_name_lookup() {
        assert_eq!(
            ElementEvent::from_command_name("onclick"),
            Some(ElementEvent::Click)
        );
        assert_eq!(ElementEvent::DragMove.command_name(), "OnDragMove");
        assert_eq!(ElementEvent::from_command_name("OnTripleClick"), None);
    }
}
