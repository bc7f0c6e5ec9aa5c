//! Page: the root container
//!
//! A page fills its host and owns three single-holder resources for the
//! elements beneath it:
//!
//! - **Z-order**: a z-index per direct child (default 0). Drawing walks
//!   children by ascending `(z, insertion index)`, hit-testing by
//!   descending order. Pressing on a child brings it to the front.
//! - **Focus**: at most one focused element. Focusing an element clears
//!   focus on every other registered focusable in the same call.
//! - **Drag capture**: at most one drag target. While the left button stays
//!   down, pointer movement is forwarded to the target regardless of hover.

use calyx_core::{CommandArgs, Point, Rect};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::element::Widget;
use crate::interaction::{ElementEvent, UpdateContext};
use crate::tree::{ElementId, ElementTree};

/// Per-page bookkeeping
#[derive(Clone, Debug, Default)]
pub struct PageState {
    z_index: FxHashMap<ElementId, i32>,
    /// Explicit child rectangles, relative to the page's client area
    local_bounds: FxHashMap<ElementId, Rect>,
    focusables: Vec<ElementId>,
    focused: Option<ElementId>,
    drag_target: Option<ElementId>,
}

impl PageState {
    pub fn focused(&self) -> Option<ElementId> {
        self.focused
    }

    pub fn drag_target(&self) -> Option<ElementId> {
        self.drag_target
    }

    pub fn focusables(&self) -> &[ElementId] {
        &self.focusables
    }

    pub fn local_bounds(&self, child: ElementId) -> Option<Rect> {
        self.local_bounds.get(&child).copied()
    }

    pub fn z_index(&self, child: ElementId) -> i32 {
        self.z_index.get(&child).copied().unwrap_or(0)
    }

    fn forget(&mut self, ids: &[ElementId]) {
        for id in ids {
            self.z_index.remove(id);
            self.local_bounds.remove(id);
        }
        self.focusables.retain(|f| !ids.contains(f));
        if self.focused.is_some_and(|f| ids.contains(&f)) {
            self.focused = None;
        }
        if self.drag_target.is_some_and(|d| ids.contains(&d)) {
            self.drag_target = None;
        }
    }
}

impl ElementTree {
    pub fn page_state(&self, page: ElementId) -> Option<&PageState> {
        match self.get(page)?.widget() {
            Widget::Page(state) => Some(state),
            _ => None,
        }
    }

    fn page_state_mut(&mut self, page: ElementId) -> Option<&mut PageState> {
        match self.get_mut(page)?.widget_mut() {
            Widget::Page(state) => Some(state),
            _ => None,
        }
    }

    // =========================================================================
    // Z-order
    // =========================================================================

    pub fn set_z_index(&mut self, page: ElementId, child: ElementId, z: i32) {
        if let Some(state) = self.page_state_mut(page) {
            state.z_index.insert(child, z);
            self.invalidate_visual(page);
        }
    }

    pub fn z_index(&self, page: ElementId, child: ElementId) -> i32 {
        self.page_state(page).map_or(0, |s| s.z_index(child))
    }

    /// Give `child` a z-index one above the current maximum
    pub fn bring_to_front(&mut self, page: ElementId, child: ElementId) {
        let children = self.children(page);
        let Some(state) = self.page_state(page) else { return };
        let max = children.iter().map(|c| state.z_index(*c)).max().unwrap_or(0);
        if state.z_index(child) == max
            && children.iter().filter(|c| state.z_index(**c) == max).count() == 1
        {
            return;
        }
        self.set_z_index(page, child, max + 1);
        debug!(page = ?page, child = ?child, z = max + 1, "brought to front");
    }

    /// Children in draw order: ascending `(z, insertion index)`
    pub fn draw_order(&self, page: ElementId) -> Vec<ElementId> {
        let children = self.children(page);
        let Some(state) = self.page_state(page) else {
            return children.to_vec();
        };
        let mut ordered: Vec<(i32, usize, ElementId)> = children
            .iter()
            .enumerate()
            .map(|(i, c)| (state.z_index(*c), i, *c))
            .collect();
        ordered.sort_by_key(|(z, i, _)| (*z, *i));
        ordered.into_iter().map(|(_, _, c)| c).collect()
    }

    /// The visible child drawn on top at `point`
    pub fn topmost_child(&self, page: ElementId, point: Point) -> Option<ElementId> {
        self.draw_order(page)
            .into_iter()
            .rev()
            .find(|c| self.get(*c).is_some_and(|e| e.hit_test(point)))
    }

    // =========================================================================
    // Explicit placement
    // =========================================================================

    /// Place `child` at an explicit rectangle relative to the page
    ///
    /// A zero width or height takes the child's measured size.
    pub fn set_child_bounds(&mut self, page: ElementId, child: ElementId, bounds: Rect) {
        if let Some(state) = self.page_state_mut(page) {
            state.local_bounds.insert(child, bounds);
            self.invalidate_arrange(page);
        }
    }

    pub fn clear_child_bounds(&mut self, page: ElementId, child: ElementId) {
        if let Some(state) = self.page_state_mut(page) {
            if state.local_bounds.remove(&child).is_some() {
                self.invalidate_arrange(page);
            }
        }
    }

    // =========================================================================
    // Focus
    // =========================================================================

    /// Make `id` eligible for page-level focus exclusivity
    pub fn register_focusable(&mut self, page: ElementId, id: ElementId) {
        if let Some(state) = self.page_state_mut(page) {
            if !state.focusables.contains(&id) {
                state.focusables.push(id);
            }
        }
    }

    /// Register every focusable descendant of `page`
    pub fn register_focusables(&mut self, page: ElementId) {
        let focusable: Vec<ElementId> = self
            .descendants(page)
            .into_iter()
            .filter(|d| self.get(*d).is_some_and(|e| e.is_focusable))
            .collect();
        for id in focusable {
            self.register_focusable(page, id);
        }
    }

    /// Focused element of the page enclosing `id`
    pub fn focused(&self, id: ElementId) -> Option<ElementId> {
        self.page_state(self.page_of(id)?)?.focused
    }

    /// Give `id` focus
    ///
    /// Returns `false` when nothing changed: the element already has focus,
    /// is not focusable, visible and enabled, is not in a page, or a
    /// descendant of it holds focus (the deepest focused element wins).
    pub fn request_focus(&mut self, id: ElementId) -> bool {
        self.focus_element(id, &CommandArgs::default())
    }

    pub(crate) fn focus_element(&mut self, id: ElementId, args: &CommandArgs) -> bool {
        let Some(page) = self.page_of(id) else {
            return false;
        };
        let eligible = self
            .get(id)
            .is_some_and(|e| e.is_focusable && e.is_visible && e.is_enabled && !e.has_focus());
        if !eligible {
            debug!(element = ?id, "focus refused");
            return false;
        }
        let descendant_focused = self
            .descendants(id)
            .into_iter()
            .any(|d| self.get(d).is_some_and(|e| e.has_focus()));
        if descendant_focused {
            debug!(element = ?id, "focus kept by descendant");
            return false;
        }

        if let Some(e) = self.get_mut(id) {
            e.interaction.has_focus = true;
        }
        self.raise(id, ElementEvent::FocusEnter, args);

        let mut others: Vec<ElementId> = self
            .page_state(page)
            .map(|s| s.focusables.clone())
            .unwrap_or_default();
        if let Some(previous) = self.page_state(page).and_then(|s| s.focused) {
            others.push(previous);
        }
        for other in others {
            if other == id {
                continue;
            }
            let had_focus = match self.get_mut(other) {
                Some(e) if e.interaction.has_focus => {
                    e.interaction.has_focus = false;
                    true
                }
                _ => false,
            };
            if had_focus {
                self.raise(other, ElementEvent::FocusLeave, args);
                self.invalidate_visual(other);
            }
        }

        if let Some(state) = self.page_state_mut(page) {
            state.focused = Some(id);
            if !state.focusables.contains(&id) {
                state.focusables.push(id);
            }
        }
        debug!(page = ?page, element = ?id, "focus changed");
        self.invalidate_measure(page);
        self.invalidate_visual(page);
        true
    }

    /// Clear focus on the page enclosing `id`
    pub fn clear_focus(&mut self, id: ElementId) {
        let Some(page) = self.page_of(id) else { return };
        let Some(focused) = self.page_state_mut(page).and_then(|s| s.focused.take()) else {
            return;
        };
        if let Some(e) = self.get_mut(focused) {
            e.interaction.has_focus = false;
        }
        self.raise(focused, ElementEvent::FocusLeave, &CommandArgs::default());
        self.invalidate_visual(focused);
    }

    // =========================================================================
    // Drag capture
    // =========================================================================

    pub fn drag_target(&self, page: ElementId) -> Option<ElementId> {
        self.page_state(page)?.drag_target
    }

    pub(crate) fn begin_drag(&mut self, page: ElementId, id: ElementId, offset: Point, args: &CommandArgs) {
        let Some(state) = self.page_state_mut(page) else { return };
        if state.drag_target.is_some() {
            return;
        }
        state.drag_target = Some(id);
        if let Some(e) = self.get_mut(id) {
            e.interaction.dragging = true;
            e.interaction.drag_offset = offset;
        }
        debug!(page = ?page, element = ?id, ?offset, "drag started");
        self.raise(id, ElementEvent::DragEnter, args);
    }

    fn end_drag(&mut self, page: ElementId, args: &CommandArgs) {
        let Some(target) = self.page_state_mut(page).and_then(|s| s.drag_target.take()) else {
            return;
        };
        if let Some(e) = self.get_mut(target) {
            e.interaction.dragging = false;
        }
        debug!(page = ?page, element = ?target, "drag ended");
        self.raise(target, ElementEvent::DragLeave, args);
    }

    /// Move the drag target so the grabbed point follows the pointer
    ///
    /// The resulting position is clamped to `[-size / 2, page - size / 2]`
    /// on each axis so at least half of the element stays reachable.
    fn drag_move(&mut self, page: ElementId, target: ElementId, ctx: &UpdateContext<'_>) {
        let viewport = match self.get(page) {
            Some(p) => p.bounds.size(),
            None => return,
        };
        let Some(element) = self.get_mut(target) else { return };
        let size = element.bounds.size();
        let wanted = ctx.input.mouse_position - element.interaction.drag_offset;
        let x = clamp_axis(wanted.x, size.width, viewport.width);
        let y = clamp_axis(wanted.y, size.height, viewport.height);

        if element.position_x == Some(x) && element.position_y == Some(y) {
            return;
        }
        element.position_x = Some(x);
        element.position_y = Some(y);
        self.invalidate_arrange(target);
        self.invalidate_visual(target);
        self.raise(target, ElementEvent::DragMove, &ctx.command_args());
    }

    pub(crate) fn update_page(&mut self, page: ElementId, ctx: &UpdateContext<'_>) {
        let left = ctx.input.left;
        if let Some(target) = self.drag_target(page) {
            if left.down {
                self.drag_move(page, target, ctx);
            } else {
                self.end_drag(page, &ctx.command_args());
            }
        }

        if let Some(child) = self.topmost_child(page, ctx.input.mouse_position) {
            if left.pressed {
                self.bring_to_front(page, child);
            }
            self.handle_input(child, page, ctx);
        }
    }

    /// Drop page bookkeeping for `child` and its subtree
    ///
    /// Called whenever `child` leaves the tree under `parent`.
    pub(crate) fn forget_in_pages(&mut self, parent: ElementId, child: ElementId) {
        let mut ids = self.descendants(child);
        ids.push(child);
        let mut current = Some(parent);
        while let Some(c) = current {
            if let Some(state) = self.page_state_mut(c) {
                state.forget(&ids);
            }
            current = self.parent(c);
        }
    }
}

fn clamp_axis(wanted: i32, size: i32, viewport: i32) -> i32 {
    let half = size / 2;
    let min = -half;
    let max = (viewport - half).max(min);
    wanted.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::FrameTime;
    use crate::style::StyleContext;
    use calyx_core::UiInputData;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn page() -> (ElementTree, ElementId) {
        let mut tree = ElementTree::new();
        let page = tree.create(Widget::page());
        tree.get_mut(page).unwrap().bounds = Rect::new(0, 0, 800, 600);
        (tree, page)
    }

    fn child(tree: &mut ElementTree, page: ElementId, rect: Rect) -> ElementId {
        let id = tree.create(Widget::Panel);
        tree.add_child(page, id).unwrap();
        tree.get_mut(id).unwrap().bounds = rect;
        id
    }

    fn run(tree: &mut ElementTree, page: ElementId, input: UiInputData) -> Vec<(ElementId, ElementEvent)> {
        let style = StyleContext::default();
        let ctx = UpdateContext::new(&input, FrameTime::default(), &style);
        tree.update(page, &ctx)
    }

    fn pressed_at(x: i32, y: i32) -> UiInputData {
        let mut input = UiInputData::at(Point::new(x, y));
        input.left.down = true;
        input.left.pressed = true;
        input
    }

    fn held_at(x: i32, y: i32) -> UiInputData {
        let mut input = UiInputData::at(Point::new(x, y));
        input.left.down = true;
        input
    }

    #[test]
    fn test_draw_and_hit_order_follow_z_index() {
        let (mut tree, page) = page();
        let a = child(&mut tree, page, Rect::new(0, 0, 100, 100));
        let b = child(&mut tree, page, Rect::new(50, 50, 100, 100));

        assert_eq!(tree.draw_order(page), vec![a, b]);
        assert_eq!(tree.topmost_child(page, Point::new(60, 60)), Some(b));

        tree.set_z_index(page, a, 5);
        assert_eq!(tree.draw_order(page), vec![b, a]);
        assert_eq!(tree.topmost_child(page, Point::new(60, 60)), Some(a));
        assert_eq!(tree.topmost_child(page, Point::new(140, 140)), Some(b));
    }

    #[test]
    fn test_press_brings_child_to_front() {
        let (mut tree, page) = page();
        let a = child(&mut tree, page, Rect::new(0, 0, 100, 100));
        let b = child(&mut tree, page, Rect::new(200, 0, 100, 100));
        tree.set_z_index(page, b, 3);

        run(&mut tree, page, pressed_at(10, 10));
        assert_eq!(tree.z_index(page, a), 4);
        assert_eq!(tree.draw_order(page), vec![b, a]);
    }

    #[test]
    fn test_focus_is_exclusive() {
        let (mut tree, page) = page();
        let a = child(&mut tree, page, Rect::new(0, 0, 100, 30));
        let b = child(&mut tree, page, Rect::new(0, 100, 100, 30));
        for id in [a, b] {
            tree.get_mut(id).unwrap().is_focusable = true;
        }
        tree.register_focusables(page);

        let leaves = Rc::new(RefCell::new(Vec::new()));
        let leaves_clone = Rc::clone(&leaves);
        tree.on(a, ElementEvent::FocusLeave, move |args| {
            leaves_clone.borrow_mut().push(args.element);
            Ok(())
        });

        run(&mut tree, page, pressed_at(10, 10));
        assert!(tree.get(a).unwrap().has_focus());
        assert_eq!(tree.focused(page), Some(a));

        run(&mut tree, page, UiInputData::at(Point::new(10, 10)));
        run(&mut tree, page, pressed_at(10, 110));

        assert!(!tree.get(a).unwrap().has_focus());
        assert!(tree.get(b).unwrap().has_focus());
        assert_eq!(tree.focused(page), Some(b));
        assert_eq!(*leaves.borrow(), vec![a]);
        let focused_count = [a, b]
            .iter()
            .filter(|id| tree.get(**id).unwrap().has_focus())
            .count();
        assert_eq!(focused_count, 1);
    }

    #[test]
    fn test_focus_refused_for_unfocusable_disabled_or_hidden() {
        let (mut tree, page) = page();
        let a = child(&mut tree, page, Rect::new(0, 0, 100, 30));
        let plain = child(&mut tree, page, Rect::new(0, 40, 100, 30));
        let disabled = child(&mut tree, page, Rect::new(0, 80, 100, 30));
        let hidden = child(&mut tree, page, Rect::new(0, 120, 100, 30));
        for id in [a, disabled, hidden] {
            tree.get_mut(id).unwrap().is_focusable = true;
        }
        tree.get_mut(disabled).unwrap().is_enabled = false;
        tree.get_mut(hidden).unwrap().is_visible = false;
        tree.register_focusables(page);

        assert!(tree.request_focus(a));
        for id in [plain, disabled, hidden] {
            assert!(!tree.request_focus(id));
            assert!(!tree.get(id).unwrap().has_focus());
        }
        assert_eq!(tree.focused(page), Some(a));
        assert!(tree.get(a).unwrap().has_focus());

        // Pressing an ineligible element does not steal focus either
        run(&mut tree, page, pressed_at(10, 90));
        assert_eq!(tree.focused(page), Some(a));
    }

    #[test]
    fn test_focused_descendant_keeps_focus() {
        let (mut tree, page) = page();
        let outer = child(&mut tree, page, Rect::new(0, 0, 200, 200));
        let inner = tree.create(Widget::Panel);
        tree.add_child(outer, inner).unwrap();
        tree.get_mut(inner).unwrap().bounds = Rect::new(10, 10, 50, 50);
        for id in [outer, inner] {
            tree.get_mut(id).unwrap().is_focusable = true;
        }
        tree.register_focusables(page);

        // Deepest element handles the press first and takes focus
        let events = run(&mut tree, page, pressed_at(20, 20));
        assert!(tree.get(inner).unwrap().has_focus());
        assert!(!tree.get(outer).unwrap().has_focus());
        assert!(events.contains(&(inner, ElementEvent::FocusEnter)));
        assert!(!events.contains(&(outer, ElementEvent::FocusEnter)));

        assert!(!tree.request_focus(outer));
        assert_eq!(tree.focused(page), Some(inner));
    }

    #[test]
    fn test_drag_follows_pointer_and_clamps() {
        let (mut tree, page) = page();
        let card = child(&mut tree, page, Rect::new(100, 100, 100, 60));
        tree.get_mut(card).unwrap().is_draggable = true;

        let events = run(&mut tree, page, pressed_at(110, 120));
        assert!(events.contains(&(card, ElementEvent::DragEnter)));
        assert_eq!(tree.drag_target(page), Some(card));
        assert_eq!(tree.get(card).unwrap().interaction().drag_offset, Point::new(10, 20));

        run(&mut tree, page, held_at(310, 220));
        let e = tree.get(card).unwrap();
        assert_eq!((e.position_x, e.position_y), (Some(300), Some(200)));

        // Far outside the viewport: clamped to [-w/2, W - w/2]
        run(&mut tree, page, held_at(5000, -5000));
        let e = tree.get(card).unwrap();
        assert_eq!((e.position_x, e.position_y), (Some(750), Some(-30)));

        let events = run(&mut tree, page, UiInputData::at(Point::new(0, 0)));
        assert!(events.contains(&(card, ElementEvent::DragLeave)));
        assert_eq!(tree.drag_target(page), None);
        assert!(!tree.get(card).unwrap().interaction().dragging);
    }

    #[test]
    fn test_drag_capture_is_exclusive() {
        let (mut tree, page) = page();
        let a = child(&mut tree, page, Rect::new(0, 0, 100, 100));
        let b = child(&mut tree, page, Rect::new(0, 0, 100, 100));
        for id in [a, b] {
            tree.get_mut(id).unwrap().is_draggable = true;
        }

        run(&mut tree, page, pressed_at(10, 10));
        assert_eq!(tree.drag_target(page), Some(b));
        run(&mut tree, page, held_at(20, 20));
        assert_eq!(tree.drag_target(page), Some(b));
        assert!(!tree.get(a).unwrap().interaction().dragging);
    }

    #[test]
    fn test_removed_child_is_forgotten() {
        let (mut tree, page) = page();
        let a = child(&mut tree, page, Rect::new(0, 0, 100, 30));
        tree.get_mut(a).unwrap().is_focusable = true;
        tree.register_focusables(page);
        tree.request_focus(a);
        tree.set_z_index(page, a, 2);
        tree.set_child_bounds(page, a, Rect::new(5, 5, 0, 0));
        assert!(tree.children(page).contains(&a));

        tree.remove_child(page, a).unwrap();
        let state = tree.page_state(page).unwrap();
        assert_eq!(state.focused(), None);
        assert!(state.focusables().is_empty());
        assert_eq!(state.local_bounds(a), None);
        assert_eq!(state.z_index(a), 0);
    }

    #[test]
    fn test_clamp_axis() {
        assert_eq!(clamp_axis(-100, 40, 200), -20);
        assert_eq!(clamp_axis(500, 40, 200), 180);
        assert_eq!(clamp_axis(50, 40, 200), 50);
    }
}
