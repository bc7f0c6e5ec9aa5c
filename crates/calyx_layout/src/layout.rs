//! Two-pass layout: measure, then arrange
//!
//! `measure` computes each element's desired size top-down from an
//! available size; `arrange` assigns final rectangles top-down. Both are
//! guarded by the element's dirty flags, so a clean subtree costs one flag
//! check. Fixed `width`/`height` constrain both passes.
//!
//! | Kind | Desired size | Arrangement |
//! |------|--------------|-------------|
//! | Leaf (TextBlock) | text + padding | - |
//! | Single child | child + margin + padding + border, clamped to available | child aligned in the padded slot |
//! | Stack | sum along the axis, max across, plus padding | cursor along the axis |
//! | Page | the full available size | explicit bounds, fixed position, or alignment |

use calyx_core::{HorizontalAlignment, Orientation, Rect, Size, Thickness, VerticalAlignment};
use tracing::trace;

use crate::element::{Children, Element, LayoutKind, Widget};
use crate::tree::{ElementId, ElementTree};

impl ElementTree {
    // =========================================================================
    // Measure
    // =========================================================================

    /// Compute the desired size of `id` within `available`
    ///
    /// A no-op returning the cached size when measure is clean.
    pub fn measure(&mut self, id: ElementId, available: Size) -> Size {
        let Some(element) = self.get_mut(id) else {
            return Size::ZERO;
        };
        if !element.dirty.measure {
            return element.size;
        }
        element.dirty.measure = false;

        let available = Size::new(available.width.max(0), available.height.max(0));
        let (fixed_w, fixed_h) = (element.width, element.height);
        let constrained = Size::new(
            fixed_w.map_or(available.width, |w| available.width.min(w.max(0))),
            fixed_h.map_or(available.height, |h| available.height.min(h.max(0))),
        );

        self.stats.measure_passes += 1;
        let desired = self.measure_widget(id, constrained);

        let size = Size::new(
            fixed_w.map_or(desired.width, |w| w.max(0).min(available.width)),
            fixed_h.map_or(desired.height, |h| h.max(0).min(available.height)),
        );
        trace!(element = ?id, ?available, ?size, "measured");
        if let Some(element) = self.get_mut(id) {
            element.size = size;
        }
        size
    }

    fn measure_widget(&mut self, id: ElementId, available: Size) -> Size {
        let Some(element) = self.get(id) else {
            return Size::ZERO;
        };
        match element.layout_kind() {
            LayoutKind::Leaf => self.measure_leaf(id),
            LayoutKind::SingleChild => self.measure_single(id, available),
            LayoutKind::MultiChild => self.measure_stack(id, available),
            LayoutKind::Root => self.measure_page(id, available),
        }
    }

    fn measure_leaf(&mut self, id: ElementId) -> Size {
        let Some(element) = self.get(id) else {
            return Size::ZERO;
        };
        let padding = element.padding;
        let Widget::TextBlock(state) = element.widget() else {
            return Size::new(padding.horizontal(), padding.vertical());
        };
        let font = state.font.as_ref().unwrap_or(&self.default_font);
        self.text_measurer.measure(&state.text, font).inflate(padding)
    }

    fn measure_single(&mut self, id: ElementId, available: Size) -> Size {
        let Some(element) = self.get(id) else {
            return Size::ZERO;
        };
        let chrome = chrome(element);
        let content = self.visible_content(id);

        let Some((child, margin)) = content else {
            return Size::new(
                available.width.min(chrome.horizontal()),
                available.height.min(chrome.vertical()),
            );
        };

        let child_size = self.measure(child, available.deflate(chrome).deflate(margin));
        child_size.inflate(margin).inflate(chrome).min(available)
    }

    fn measure_stack(&mut self, id: ElementId, available: Size) -> Size {
        let Some(element) = self.get(id) else {
            return Size::ZERO;
        };
        let padding = element.padding;
        let orientation = match element.widget() {
            Widget::StackPanel { orientation } => *orientation,
            _ => Orientation::Vertical,
        };
        let interior = available.deflate(padding);

        let mut along = 0;
        let mut across = 0;
        for (child, margin) in self.visible_items(id) {
            let size = self.measure(child, interior.deflate(margin)).inflate(margin);
            match orientation {
                Orientation::Vertical => {
                    along += size.height;
                    across = across.max(size.width);
                }
                Orientation::Horizontal => {
                    along += size.width;
                    across = across.max(size.height);
                }
            }
        }

        let content = match orientation {
            Orientation::Vertical => Size::new(across, along),
            Orientation::Horizontal => Size::new(along, across),
        };
        content.inflate(padding)
    }

    fn measure_page(&mut self, id: ElementId, available: Size) -> Size {
        let Some(element) = self.get(id) else {
            return Size::ZERO;
        };
        let client = available.deflate(element.padding);
        for (child, margin) in self.visible_items(id) {
            self.measure(child, client.deflate(margin));
        }
        available
    }

    // =========================================================================
    // Arrange
    // =========================================================================

    /// Position `id` at `final_rect`
    ///
    /// Fixed width/height replace the rect's size. When the resulting rect
    /// equals the current bounds and arrange is clean, nothing runs.
    pub fn arrange(&mut self, id: ElementId, final_rect: Rect) {
        let Some(element) = self.get_mut(id) else { return };
        let constrained = Rect::new(
            final_rect.x,
            final_rect.y,
            element.width.unwrap_or(final_rect.width).max(0),
            element.height.unwrap_or(final_rect.height).max(0),
        );
        let changed = element.bounds != constrained;
        element.bounds = constrained;
        if !element.dirty.arrange && !changed {
            return;
        }
        element.dirty.arrange = false;
        let kind = element.layout_kind();

        self.stats.arrange_passes += 1;
        trace!(element = ?id, bounds = ?constrained, "arranged");
        match kind {
            LayoutKind::Leaf => {}
            LayoutKind::SingleChild => self.arrange_single(id, constrained),
            LayoutKind::MultiChild => self.arrange_stack(id, constrained),
            LayoutKind::Root => self.arrange_page(id, constrained),
        }
    }

    fn arrange_single(&mut self, id: ElementId, bounds: Rect) {
        let Some(element) = self.get(id) else { return };
        let chrome = chrome(element);
        let Some((child, margin)) = self.visible_content(id) else {
            return;
        };
        let slot = bounds.deflate(chrome).deflate(margin);
        let rect = self.placed(child, slot);
        self.arrange(child, rect);
    }

    fn arrange_stack(&mut self, id: ElementId, bounds: Rect) {
        let Some(element) = self.get(id) else { return };
        let interior = bounds.deflate(element.padding);
        let orientation = match element.widget() {
            Widget::StackPanel { orientation } => *orientation,
            _ => Orientation::Vertical,
        };

        let mut cursor = match orientation {
            Orientation::Vertical => interior.y,
            Orientation::Horizontal => interior.x,
        };
        for (child, margin) in self.visible_items(id) {
            let Some(c) = self.get(child) else { continue };
            let size = c.size;
            let (h_align, v_align) = (c.horizontal_alignment, c.vertical_alignment);

            let rect = match orientation {
                Orientation::Vertical => {
                    let slot = Rect::new(
                        interior.x,
                        cursor,
                        interior.width,
                        size.height + margin.vertical(),
                    )
                    .deflate(margin);
                    cursor += size.height + margin.vertical();
                    let aligned = align(slot, size, h_align, VerticalAlignment::Top);
                    Rect::new(aligned.x, slot.y, aligned.width, size.height)
                }
                Orientation::Horizontal => {
                    let slot = Rect::new(
                        cursor,
                        interior.y,
                        size.width + margin.horizontal(),
                        interior.height,
                    )
                    .deflate(margin);
                    cursor += size.width + margin.horizontal();
                    let aligned = align(slot, size, HorizontalAlignment::Left, v_align);
                    Rect::new(slot.x, aligned.y, size.width, aligned.height)
                }
            };
            self.arrange(child, rect);
        }
    }

    fn arrange_page(&mut self, id: ElementId, bounds: Rect) {
        let Some(element) = self.get(id) else { return };
        let client = bounds.deflate(element.padding);
        let local: Vec<(ElementId, Thickness, Option<Rect>)> = self
            .visible_items(id)
            .into_iter()
            .map(|(child, margin)| {
                let local = self.page_state(id).and_then(|s| s.local_bounds(child));
                (child, margin, local)
            })
            .collect();

        for (child, margin, local) in local {
            let rect = match local {
                Some(local) => {
                    let Some(c) = self.get(child) else { continue };
                    let width = if local.width == 0 {
                        c.size.width
                    } else {
                        local.width - margin.horizontal()
                    };
                    let height = if local.height == 0 {
                        c.size.height
                    } else {
                        local.height - margin.vertical()
                    };
                    Rect::new(
                        c.position_x
                            .unwrap_or(client.x + local.x + margin.left),
                        c.position_y
                            .unwrap_or(client.y + local.y + margin.top),
                        width.max(0),
                        height.max(0),
                    )
                }
                None => self.placed(child, client.deflate(margin)),
            };
            self.arrange(child, rect);
        }
    }

    /// Alignment-based rect for `child` in `slot`, with fixed position taking precedence
    fn placed(&self, child: ElementId, slot: Rect) -> Rect {
        let Some(c) = self.get(child) else {
            return slot;
        };
        let aligned = align(slot, c.size, c.horizontal_alignment, c.vertical_alignment);
        Rect::new(
            c.position_x.unwrap_or(aligned.x),
            c.position_y.unwrap_or(aligned.y),
            aligned.width,
            aligned.height,
        )
    }

    fn visible_content(&self, id: ElementId) -> Option<(ElementId, Thickness)> {
        let child = match self.get(id)?.children() {
            Children::Content(Some(child)) => *child,
            _ => return None,
        };
        let c = self.get(child)?;
        c.is_visible.then_some((child, c.margin))
    }

    fn visible_items(&self, id: ElementId) -> Vec<(ElementId, Thickness)> {
        self.children(id)
            .into_iter()
            .filter_map(|child| {
                let c = self.get(child)?;
                c.is_visible.then_some((child, c.margin))
            })
            .collect()
    }
}

/// Padding plus border thickness
fn chrome(element: &Element) -> Thickness {
    element.padding + element.border_thickness
}

/// Place `size` inside `slot`; stretch fills the slot on that axis
pub fn align(
    slot: Rect,
    size: Size,
    horizontal: HorizontalAlignment,
    vertical: VerticalAlignment,
) -> Rect {
    let width = match horizontal {
        HorizontalAlignment::Stretch => slot.width,
        _ => size.width.min(slot.width),
    };
    let height = match vertical {
        VerticalAlignment::Stretch => slot.height,
        _ => size.height.min(slot.height),
    };
    let x = match horizontal {
        HorizontalAlignment::Left | HorizontalAlignment::Stretch => slot.x,
        HorizontalAlignment::Center => slot.x + (slot.width - width) / 2,
        HorizontalAlignment::Right => slot.right() - width,
    };
    let y = match vertical {
        VerticalAlignment::Top | VerticalAlignment::Stretch => slot.y,
        VerticalAlignment::Center => slot.y + (slot.height - height) / 2,
        VerticalAlignment::Bottom => slot.bottom() - height,
    };
    Rect::new(x, y, width.max(0), height.max(0))
}
