//! Element tree management
//!
//! The tree is an arena: elements live in a `SlotMap` and refer to each
//! other by [`ElementId`]. A container owns its children (removing a child
//! destroys its subtree); the parent link on each element is a plain id used
//! for invalidation and lookups, never for ownership.

use slotmap::{new_key_type, Key, SlotMap};
use smallvec::SmallVec;
use tracing::trace;

use calyx_core::{FontRef, Sender};

use crate::element::{Children, Element, LayoutKind, Widget, WidgetKind};
use crate::error::{LayoutError, Result};
use crate::interaction::{ElementEvent, EventHandler, HandlerTable};
use crate::text::{EstimatedTextMeasurer, TextMeasurer};

new_key_type! {
    pub struct ElementId;
}

impl ElementId {
    /// Convert to a raw u64 representation
    ///
    /// This is useful for storing element ids in type-erased contexts such
    /// as command senders.
    pub fn to_raw(self) -> u64 {
        self.data().as_ffi()
    }

    /// Create from a raw u64 representation
    pub fn from_raw(raw: u64) -> Self {
        Self::from(slotmap::KeyData::from_ffi(raw))
    }
}

/// Counters for layout hook invocations
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LayoutStats {
    /// Number of times a concrete measure algorithm ran
    pub measure_passes: u64,
    /// Number of times a concrete arrange algorithm ran
    pub arrange_passes: u64,
}

/// Arena of elements plus the per-tree services layout needs
pub struct ElementTree {
    elements: SlotMap<ElementId, Element>,
    pub(crate) handlers: HandlerTable,
    pub(crate) text_measurer: Box<dyn TextMeasurer>,
    pub(crate) default_font: FontRef,
    pub(crate) stats: LayoutStats,
    pub(crate) frame_events: Vec<(ElementId, ElementEvent)>,
}

impl Default for ElementTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementTree {
    pub fn new() -> Self {
        Self {
            elements: SlotMap::with_key(),
            handlers: HandlerTable::default(),
            text_measurer: Box::new(EstimatedTextMeasurer),
            default_font: FontRef::new("default", 16.0),
            stats: LayoutStats::default(),
            frame_events: Vec::new(),
        }
    }

    /// Replace the text measurer used by text elements
    pub fn set_text_measurer(&mut self, measurer: Box<dyn TextMeasurer>) {
        self.text_measurer = measurer;
    }

    /// Font used by text elements that don't set one
    pub fn set_default_font(&mut self, font: FontRef) {
        self.default_font = font;
    }

    pub fn stats(&self) -> LayoutStats {
        self.stats
    }

    // =========================================================================
    // Element access
    // =========================================================================

    /// Insert a detached element
    pub fn insert(&mut self, element: Element) -> ElementId {
        self.elements.insert(element)
    }

    /// Insert a detached element built from `widget`
    pub fn create(&mut self, widget: Widget) -> ElementId {
        self.insert(Element::new(widget))
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(id)
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id)
    }

    /// Like [`get`](Self::get), but a missing element is an error
    pub fn element(&self, id: ElementId) -> Result<&Element> {
        self.elements.get(id).ok_or(LayoutError::UnknownElement(id))
    }

    pub fn element_mut(&mut self, id: ElementId) -> Result<&mut Element> {
        self.elements
            .get_mut(id)
            .ok_or(LayoutError::UnknownElement(id))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Command sender describing `id`
    pub fn sender(&self, id: ElementId) -> Sender {
        Sender::new(id.to_raw(), self.get(id).and_then(|e| e.id.clone()))
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Attach `child` to `parent`
    ///
    /// Multi-child containers append; single-child containers take the child
    /// as their content, destroying any previous content. Fails if the child
    /// already has a parent, if the parent is a leaf, or if the child is an
    /// ancestor of the parent.
    pub fn add_child(&mut self, parent: ElementId, child: ElementId) -> Result<()> {
        self.check_attachable(parent, child)?;

        let previous = match &mut self.element_mut(parent)?.children {
            Children::None => return Err(LayoutError::NotAContainer(parent)),
            Children::Content(slot) => slot.replace(child),
            Children::Items(items) => {
                items.push(child);
                None
            }
        };
        if let Some(old) = previous {
            self.forget_in_pages(parent, old);
            self.destroy_subtree(old);
        }

        self.element_mut(child)?.parent = Some(parent);
        trace!(parent = ?parent, child = ?child, "attached child");
        self.invalidate_measure(parent);
        self.invalidate_visual(parent);
        Ok(())
    }

    /// Set or clear the content of a single-child container
    pub fn set_content(&mut self, parent: ElementId, child: Option<ElementId>) -> Result<()> {
        if self.element(parent)?.layout_kind() != LayoutKind::SingleChild {
            return Err(LayoutError::NotAContainer(parent));
        }
        match child {
            Some(child) => self.add_child(parent, child),
            None => {
                let old = match &mut self.element_mut(parent)?.children {
                    Children::Content(slot) => slot.take(),
                    _ => None,
                };
                if let Some(old) = old {
                    self.forget_in_pages(parent, old);
                    self.destroy_subtree(old);
                }
                self.invalidate_measure(parent);
                self.invalidate_visual(parent);
                Ok(())
            }
        }
    }

    /// Content of a single-child container
    pub fn content(&self, id: ElementId) -> Option<ElementId> {
        match self.get(id)?.children {
            Children::Content(slot) => slot,
            _ => None,
        }
    }

    /// Detach `child` from its parent without destroying it
    ///
    /// The element stays in the arena with no parent and may be attached
    /// elsewhere.
    pub fn detach(&mut self, child: ElementId) -> Result<()> {
        let Some(parent) = self.element(child)?.parent else {
            return Ok(());
        };
        if let Some(p) = self.elements.get_mut(parent) {
            match &mut p.children {
                Children::Content(slot) if *slot == Some(child) => *slot = None,
                Children::Items(items) => items.retain(|c| *c != child),
                _ => {}
            }
        }
        self.forget_in_pages(parent, child);
        self.element_mut(child)?.parent = None;
        self.invalidate_measure(parent);
        self.invalidate_visual(parent);
        Ok(())
    }

    /// Remove `child` from `parent` and destroy its subtree
    ///
    /// Returns `false` if `child` was not a child of `parent`.
    pub fn remove_child(&mut self, parent: ElementId, child: ElementId) -> Result<bool> {
        if self.element(child)?.parent != Some(parent) {
            return Ok(false);
        }
        self.detach(child)?;
        self.destroy_subtree(child);
        Ok(true)
    }

    /// Remove and destroy every child of `parent`
    pub fn clear_children(&mut self, parent: ElementId) -> Result<()> {
        let children = self.children(parent);
        for child in children {
            self.remove_child(parent, child)?;
        }
        Ok(())
    }

    /// Destroy a detached element and its subtree
    pub fn remove(&mut self, id: ElementId) -> Result<()> {
        self.detach(id)?;
        self.destroy_subtree(id);
        Ok(())
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.get(id)?.parent
    }

    /// Child ids in insertion order
    pub fn children(&self, id: ElementId) -> SmallVec<[ElementId; 8]> {
        self.get(id)
            .map(|e| e.children.ids())
            .unwrap_or_default()
    }

    /// All descendants in pre-order (content, then items), excluding `id`
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack: Vec<ElementId> = self.children(id).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).into_iter().rev());
        }
        out
    }

    /// Whether `ancestor` is a strict ancestor of `id`
    pub fn is_ancestor(&self, ancestor: ElementId, id: ElementId) -> bool {
        let mut current = self.parent(id);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent(p);
        }
        false
    }

    /// Nearest enclosing page, including `id` itself
    pub fn page_of(&self, id: ElementId) -> Option<ElementId> {
        let mut current = Some(id);
        while let Some(c) = current {
            let element = self.get(c)?;
            if element.kind() == WidgetKind::Page {
                return Some(c);
            }
            current = element.parent;
        }
        None
    }

    /// Find an element by its markup id within the subtree at `root`
    pub fn find_by_name(&self, root: ElementId, name: &str) -> Option<ElementId> {
        std::iter::once(root)
            .chain(self.descendants(root))
            .find(|id| {
                self.get(*id)
                    .and_then(|e| e.id.as_deref())
                    .is_some_and(|n| n.eq_ignore_ascii_case(name))
            })
    }

    fn check_attachable(&self, parent: ElementId, child: ElementId) -> Result<()> {
        self.element(parent)?;
        if self.element(child)?.parent.is_some() {
            return Err(LayoutError::AlreadyParented(child));
        }
        if parent == child || self.is_ancestor(child, parent) {
            return Err(LayoutError::CyclicAttachment(child));
        }
        Ok(())
    }

    fn destroy_subtree(&mut self, id: ElementId) {
        let mut doomed = self.descendants(id);
        doomed.push(id);
        for d in doomed {
            self.elements.remove(d);
            self.handlers.remove_element(d);
        }
    }

    // =========================================================================
    // Invalidation
    // =========================================================================

    /// Mark measure and arrange dirty on `id` and every ancestor
    pub fn invalidate_measure(&mut self, id: ElementId) {
        let mut current = Some(id);
        while let Some(c) = current {
            let Some(e) = self.elements.get_mut(c) else { break };
            e.dirty.measure = true;
            e.dirty.arrange = true;
            current = e.parent;
        }
    }

    /// Mark arrange dirty on `id` and every ancestor
    pub fn invalidate_arrange(&mut self, id: ElementId) {
        let mut current = Some(id);
        while let Some(c) = current {
            let Some(e) = self.elements.get_mut(c) else { break };
            e.dirty.arrange = true;
            current = e.parent;
        }
    }

    /// Mark visual dirty on `id` and every ancestor
    pub fn invalidate_visual(&mut self, id: ElementId) {
        let mut current = Some(id);
        while let Some(c) = current {
            let Some(e) = self.elements.get_mut(c) else { break };
            e.dirty.visual = true;
            current = e.parent;
        }
    }

    // =========================================================================
    // Event handlers
    // =========================================================================

    /// Subscribe to an interaction event on `id`
    pub fn on<F>(&mut self, id: ElementId, event: ElementEvent, handler: F)
    where
        F: FnMut(&crate::interaction::EventArgs) -> anyhow::Result<()> + 'static,
    {
        let handler: EventHandler = Box::new(handler);
        self.handlers.add(id, event, handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calyx_core::Orientation;

    fn clean(tree: &mut ElementTree, ids: &[ElementId]) {
        for id in ids {
            let e = tree.get_mut(*id).unwrap();
            e.dirty.measure = false;
            e.dirty.arrange = false;
            e.dirty.visual = false;
        }
    }

    #[test]
    fn test_add_child_sets_parent() {
        let mut tree = ElementTree::new();
        let stack = tree.create(Widget::stack_panel(Orientation::Vertical));
        let a = tree.create(Widget::Panel);
        let b = tree.create(Widget::Panel);

        tree.add_child(stack, a).unwrap();
        tree.add_child(stack, b).unwrap();

        assert_eq!(tree.parent(a), Some(stack));
        assert_eq!(tree.children(stack).as_slice(), &[a, b]);
    }

    #[test]
    fn test_reparent_without_detach_fails() {
        let mut tree = ElementTree::new();
        let first = tree.create(Widget::stack_panel(Orientation::Vertical));
        let second = tree.create(Widget::stack_panel(Orientation::Vertical));
        let child = tree.create(Widget::Panel);

        tree.add_child(first, child).unwrap();
        let err = tree.add_child(second, child).unwrap_err();
        assert!(matches!(err, LayoutError::AlreadyParented(id) if id == child));

        tree.detach(child).unwrap();
        tree.add_child(second, child).unwrap();
        assert_eq!(tree.parent(child), Some(second));
        assert!(tree.children(first).is_empty());
    }

    #[test]
    fn test_leaf_cannot_hold_children() {
        let mut tree = ElementTree::new();
        let text = tree.create(Widget::text_block("x"));
        let child = tree.create(Widget::Panel);

        let err = tree.add_child(text, child).unwrap_err();
        assert!(matches!(err, LayoutError::NotAContainer(_)));
        assert_eq!(tree.parent(child), None);
    }

    #[test]
    fn test_cyclic_attachment_rejected() {
        let mut tree = ElementTree::new();
        let outer = tree.create(Widget::Panel);
        let inner = tree.create(Widget::Panel);
        tree.add_child(outer, inner).unwrap();

        let err = tree.add_child(inner, outer).unwrap_err();
        assert!(matches!(err, LayoutError::CyclicAttachment(_)));
    }

    #[test]
    fn test_content_replacement_destroys_old_content() {
        let mut tree = ElementTree::new();
        let panel = tree.create(Widget::Panel);
        let old = tree.create(Widget::text_block("old"));
        let new = tree.create(Widget::text_block("new"));

        tree.set_content(panel, Some(old)).unwrap();
        tree.set_content(panel, Some(new)).unwrap();

        assert_eq!(tree.content(panel), Some(new));
        assert!(!tree.contains(old));
    }

    #[test]
    fn test_remove_and_clear_destroy_subtrees() {
        let mut tree = ElementTree::new();
        let stack = tree.create(Widget::stack_panel(Orientation::Vertical));
        let panel = tree.create(Widget::Panel);
        let text = tree.create(Widget::text_block("deep"));
        let other = tree.create(Widget::Panel);
        tree.add_child(stack, panel).unwrap();
        tree.add_child(panel, text).unwrap();
        tree.add_child(stack, other).unwrap();

        assert!(tree.remove_child(stack, panel).unwrap());
        assert!(!tree.contains(panel));
        assert!(!tree.contains(text));

        tree.clear_children(stack).unwrap();
        assert!(tree.children(stack).is_empty());
        assert!(!tree.contains(other));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_invalidate_measure_propagates_to_root() {
        let mut tree = ElementTree::new();
        let root = tree.create(Widget::page());
        let panel = tree.create(Widget::Panel);
        let text = tree.create(Widget::text_block("x"));
        tree.add_child(root, panel).unwrap();
        tree.add_child(panel, text).unwrap();
        clean(&mut tree, &[root, panel, text]);

        tree.invalidate_measure(text);

        for id in [root, panel, text] {
            let d = tree.get(id).unwrap().dirty();
            assert!(d.measure && d.arrange);
            assert!(!d.visual);
        }
    }

    #[test]
    fn test_invalidate_arrange_and_visual_are_independent() {
        let mut tree = ElementTree::new();
        let root = tree.create(Widget::page());
        let panel = tree.create(Widget::Panel);
        tree.add_child(root, panel).unwrap();
        clean(&mut tree, &[root, panel]);

        tree.invalidate_arrange(panel);
        let d = tree.get(root).unwrap().dirty();
        assert!(d.arrange && !d.measure && !d.visual);

        clean(&mut tree, &[root, panel]);
        tree.invalidate_visual(panel);
        let d = tree.get(root).unwrap().dirty();
        assert!(d.visual && !d.measure && !d.arrange);
    }

    #[test]
    fn test_descendants_preorder_and_lookup() {
        let mut tree = ElementTree::new();
        let root = tree.create(Widget::page());
        let panel = tree.insert(Element::new(Widget::Panel).with_id("card"));
        let text = tree.insert(Element::new(Widget::text_block("t")).with_id("label"));
        let side = tree.create(Widget::Panel);
        tree.add_child(root, panel).unwrap();
        tree.add_child(panel, text).unwrap();
        tree.add_child(root, side).unwrap();

        assert_eq!(tree.descendants(root), vec![panel, text, side]);
        assert_eq!(tree.find_by_name(root, "LABEL"), Some(text));
        assert_eq!(tree.page_of(text), Some(root));
        assert!(tree.is_ancestor(root, text));
        assert!(!tree.is_ancestor(text, root));
    }

    #[test]
    fn test_raw_id_round_trip() {
        let mut tree = ElementTree::new();
        let id = tree.create(Widget::Panel);
        assert_eq!(ElementId::from_raw(id.to_raw()), id);
    }
}
