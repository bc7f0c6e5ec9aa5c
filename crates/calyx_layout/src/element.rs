//! Element node
//!
//! Every visual node is an [`Element`]: one struct carrying identity,
//! box model, alignment, flags, dirty state and interaction state, plus a
//! [`Widget`] tag that selects the concrete measure/arrange/draw/update
//! behavior. Children are owned by the tree arena; an element only stores
//! their ids and a non-owning parent id.

use std::rc::Rc;

use calyx_core::{
    Color, Command, HorizontalAlignment, Orientation, Point, Rect, Size, Thickness,
    VerticalAlignment, ViewModel,
};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::interaction::{ElementEvent, InteractionState};
use crate::page::PageState;
use crate::tree::ElementId;
use crate::widgets::{ButtonState, LineEditState, TextBlockState};

/// Concrete element behavior
#[derive(Debug)]
pub enum Widget {
    /// Root container with z-order, focus and drag capture
    Page(PageState),
    /// Single child with a background
    Panel,
    /// Panel with a border drawn around the content
    RoundPanel,
    /// Children laid out along one axis
    StackPanel { orientation: Orientation },
    /// Panel that reacts to hover/press and raises `Click`
    Button(ButtonState),
    /// Leaf text
    TextBlock(TextBlockState),
    /// Focusable single-line text entry
    LineEdit(LineEditState),
}

/// Data-free widget discriminant, used as the selector tag and registry key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    Page,
    Panel,
    RoundPanel,
    StackPanel,
    Button,
    TextBlock,
    LineEdit,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 7] = [
        WidgetKind::Page,
        WidgetKind::Panel,
        WidgetKind::RoundPanel,
        WidgetKind::StackPanel,
        WidgetKind::Button,
        WidgetKind::TextBlock,
        WidgetKind::LineEdit,
    ];

    /// Tag name used by selectors and markup
    pub fn tag(&self) -> &'static str {
        match self {
            WidgetKind::Page => "Page",
            WidgetKind::Panel => "Panel",
            WidgetKind::RoundPanel => "RoundPanel",
            WidgetKind::StackPanel => "StackPanel",
            WidgetKind::Button => "Button",
            WidgetKind::TextBlock => "TextBlock",
            WidgetKind::LineEdit => "LineEdit",
        }
    }

    pub fn from_tag(tag: &str) -> Option<WidgetKind> {
        WidgetKind::ALL
            .into_iter()
            .find(|k| k.tag().eq_ignore_ascii_case(tag))
    }

    pub fn layout_kind(&self) -> LayoutKind {
        match self {
            WidgetKind::Page => LayoutKind::Root,
            WidgetKind::StackPanel => LayoutKind::MultiChild,
            WidgetKind::TextBlock => LayoutKind::Leaf,
            WidgetKind::Panel
            | WidgetKind::RoundPanel
            | WidgetKind::Button
            | WidgetKind::LineEdit => LayoutKind::SingleChild,
        }
    }
}

impl Widget {
    pub fn kind(&self) -> WidgetKind {
        match self {
            Widget::Page(_) => WidgetKind::Page,
            Widget::Panel => WidgetKind::Panel,
            Widget::RoundPanel => WidgetKind::RoundPanel,
            Widget::StackPanel { .. } => WidgetKind::StackPanel,
            Widget::Button(_) => WidgetKind::Button,
            Widget::TextBlock(_) => WidgetKind::TextBlock,
            Widget::LineEdit(_) => WidgetKind::LineEdit,
        }
    }

    pub fn page() -> Self {
        Widget::Page(PageState::default())
    }

    pub fn stack_panel(orientation: Orientation) -> Self {
        Widget::StackPanel { orientation }
    }

    pub fn button() -> Self {
        Widget::Button(ButtonState::default())
    }

    pub fn text_block(text: impl Into<String>) -> Self {
        Widget::TextBlock(TextBlockState::new(text))
    }

    pub fn line_edit(placeholder: impl Into<String>) -> Self {
        Widget::LineEdit(LineEditState::new(placeholder))
    }
}

/// How an element holds children
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutKind {
    Leaf,
    SingleChild,
    MultiChild,
    Root,
}

/// Owned child slots
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Children {
    None,
    Content(Option<ElementId>),
    Items(Vec<ElementId>),
}

impl Children {
    fn for_kind(kind: LayoutKind) -> Self {
        match kind {
            LayoutKind::Leaf => Children::None,
            LayoutKind::SingleChild => Children::Content(None),
            LayoutKind::MultiChild | LayoutKind::Root => Children::Items(Vec::new()),
        }
    }

    /// Child ids in insertion order
    pub fn ids(&self) -> SmallVec<[ElementId; 8]> {
        match self {
            Children::None | Children::Content(None) => SmallVec::new(),
            Children::Content(Some(id)) => SmallVec::from_slice(&[*id]),
            Children::Items(items) => SmallVec::from_slice(items),
        }
    }
}

/// The three independent layout/visual dirty flags
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirtyFlags {
    pub measure: bool,
    pub arrange: bool,
    pub visual: bool,
}

impl Default for DirtyFlags {
    fn default() -> Self {
        Self {
            measure: true,
            arrange: true,
            visual: true,
        }
    }
}

/// A node in the UI tree
///
/// Layout and style fields are read through getters and written through
/// [`set_property`](crate::tree::ElementTree::set_property), which marks
/// the passes they affect dirty.
pub struct Element {
    pub(crate) widget: Widget,

    // Identity
    pub(crate) id: Option<String>,
    pub(crate) class: Option<String>,
    pub(crate) pseudo_classes: SmallVec<[String; 4]>,

    // Geometry
    pub(crate) bounds: Rect,
    pub(crate) size: Size,
    pub(crate) width: Option<i32>,
    pub(crate) height: Option<i32>,
    pub(crate) position_x: Option<i32>,
    pub(crate) position_y: Option<i32>,

    // Box model
    pub(crate) padding: Thickness,
    pub(crate) margin: Thickness,
    pub(crate) border_thickness: Thickness,
    pub(crate) border_color: Option<Color>,
    pub(crate) background_color: Option<Color>,

    pub(crate) horizontal_alignment: HorizontalAlignment,
    pub(crate) vertical_alignment: VerticalAlignment,

    // Flags
    pub(crate) is_visible: bool,
    pub(crate) is_enabled: bool,
    pub(crate) is_focusable: bool,
    pub(crate) is_draggable: bool,

    pub(crate) dirty: DirtyFlags,
    pub(crate) parent: Option<ElementId>,
    pub(crate) children: Children,

    pub data_context: Option<Rc<dyn ViewModel>>,
    /// Property name → `{Binding ...}` / `{Command ...}` expression
    pub markup_expressions: IndexMap<String, String>,

    pub(crate) interaction: InteractionState,
    pub(crate) commands: FxHashMap<ElementEvent, Rc<dyn Command>>,
}

impl Element {
    pub fn new(widget: Widget) -> Self {
        let kind = widget.kind();
        let (h_align, v_align) = match kind {
            WidgetKind::Page => (HorizontalAlignment::Stretch, VerticalAlignment::Stretch),
            _ => (HorizontalAlignment::Left, VerticalAlignment::Top),
        };
        let background = match kind {
            WidgetKind::Panel
            | WidgetKind::RoundPanel
            | WidgetKind::Button
            | WidgetKind::LineEdit => Some(Color::WHITE),
            _ => None,
        };

        Self {
            widget,
            id: None,
            class: None,
            pseudo_classes: SmallVec::new(),
            bounds: Rect::EMPTY,
            size: Size::ZERO,
            width: None,
            height: None,
            position_x: None,
            position_y: None,
            padding: Thickness::ZERO,
            margin: Thickness::ZERO,
            border_thickness: Thickness::ZERO,
            border_color: None,
            background_color: background,
            horizontal_alignment: h_align,
            vertical_alignment: v_align,
            is_visible: true,
            is_enabled: true,
            is_focusable: kind == WidgetKind::LineEdit,
            is_draggable: false,
            dirty: DirtyFlags::default(),
            parent: None,
            children: Children::for_kind(kind.layout_kind()),
            data_context: None,
            markup_expressions: IndexMap::new(),
            interaction: InteractionState::default(),
            commands: FxHashMap::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn widget(&self) -> &Widget {
        &self.widget
    }

    pub fn widget_mut(&mut self) -> &mut Widget {
        &mut self.widget
    }

    pub fn kind(&self) -> WidgetKind {
        self.widget.kind()
    }

    pub fn layout_kind(&self) -> LayoutKind {
        self.kind().layout_kind()
    }

    /// Resolved rectangle from the last arrange pass
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Desired size from the last measure pass
    pub fn size(&self) -> Size {
        self.size
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn children(&self) -> &Children {
        &self.children
    }

    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// Fixed width, if any
    pub fn width(&self) -> Option<i32> {
        self.width
    }

    /// Fixed height, if any
    pub fn height(&self) -> Option<i32> {
        self.height
    }

    /// Fixed position within the enclosing page
    pub fn position(&self) -> (Option<i32>, Option<i32>) {
        (self.position_x, self.position_y)
    }

    pub fn padding(&self) -> Thickness {
        self.padding
    }

    pub fn margin(&self) -> Thickness {
        self.margin
    }

    pub fn border_thickness(&self) -> Thickness {
        self.border_thickness
    }

    pub fn border_color(&self) -> Option<Color> {
        self.border_color
    }

    pub fn background_color(&self) -> Option<Color> {
        self.background_color
    }

    pub fn horizontal_alignment(&self) -> HorizontalAlignment {
        self.horizontal_alignment
    }

    pub fn vertical_alignment(&self) -> VerticalAlignment {
        self.vertical_alignment
    }

    pub fn is_visible(&self) -> bool {
        self.is_visible
    }

    pub fn is_enabled(&self) -> bool {
        self.is_enabled
    }

    pub fn is_focusable(&self) -> bool {
        self.is_focusable
    }

    pub fn is_draggable(&self) -> bool {
        self.is_draggable
    }

    pub fn has_fixed_position(&self) -> bool {
        self.position_x.is_some() || self.position_y.is_some()
    }

    /// Point in bounds and visible
    pub fn hit_test(&self, point: Point) -> bool {
        self.is_visible && self.bounds.contains(point)
    }

    /// Class names split on whitespace
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.class
            .as_deref()
            .unwrap_or("")
            .split_whitespace()
            .map(|c| c.trim_start_matches('.'))
    }

    pub fn pseudo_classes(&self) -> &[String] {
        &self.pseudo_classes
    }

    pub fn has_pseudo_class(&self, name: &str) -> bool {
        let name = name.trim_start_matches(':');
        self.pseudo_classes
            .iter()
            .any(|p| p.eq_ignore_ascii_case(name))
    }

    /// Add a pseudo-class to the applied set; returns `false` if already present
    pub fn add_pseudo_class(&mut self, name: &str) -> bool {
        if self.has_pseudo_class(name) {
            return false;
        }
        self.pseudo_classes
            .push(name.trim_start_matches(':').to_string());
        true
    }

    /// Remove a pseudo-class from the applied set; returns `false` if absent
    pub fn remove_pseudo_class(&mut self, name: &str) -> bool {
        let name = name.trim_start_matches(':');
        let before = self.pseudo_classes.len();
        self.pseudo_classes.retain(|p| !p.eq_ignore_ascii_case(name));
        before != self.pseudo_classes.len()
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    pub fn has_focus(&self) -> bool {
        self.interaction.has_focus
    }

    /// Bind a command to an interaction slot
    pub fn set_command(&mut self, slot: ElementEvent, command: Rc<dyn Command>) {
        self.commands.insert(slot, command);
    }

    pub fn command(&self, slot: ElementEvent) -> Option<Rc<dyn Command>> {
        self.commands.get(&slot).cloned()
    }

    /// Text of a TextBlock
    pub fn text(&self) -> Option<&str> {
        match &self.widget {
            Widget::TextBlock(state) => Some(&state.text),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element")
            .field("kind", &self.kind())
            .field("id", &self.id)
            .field("class", &self.class)
            .field("bounds", &self.bounds)
            .field("size", &self.size)
            .field("dirty", &self.dirty)
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_per_widget() {
        let page = Element::new(Widget::page());
        assert_eq!(page.horizontal_alignment, HorizontalAlignment::Stretch);
        assert_eq!(page.layout_kind(), LayoutKind::Root);
        assert!(page.background_color.is_none());

        let panel = Element::new(Widget::Panel);
        assert_eq!(panel.background_color, Some(Color::WHITE));
        assert_eq!(panel.children(), &Children::Content(None));

        let edit = Element::new(Widget::line_edit("type here"));
        assert!(edit.is_focusable);

        let text = Element::new(Widget::text_block("hi"));
        assert_eq!(text.children(), &Children::None);
        assert_eq!(text.text(), Some("hi"));
    }

    #[test]
    fn test_new_element_is_fully_dirty() {
        let e = Element::new(Widget::Panel);
        assert_eq!(e.dirty(), DirtyFlags::default());
        assert!(e.dirty().measure && e.dirty().arrange && e.dirty().visual);
    }

    #[test]
    fn test_hit_test_requires_visibility() {
        let mut e = Element::new(Widget::Panel);
        e.bounds = Rect::new(0, 0, 100, 30);
        assert!(e.hit_test(Point::new(50, 15)));

        e.is_visible = false;
        assert!(!e.hit_test(Point::new(50, 15)));
    }

    #[test]
    fn test_pseudo_class_set() {
        let mut e = Element::new(Widget::button());
        assert!(e.add_pseudo_class(":focus"));
        assert!(!e.add_pseudo_class("focus"));
        assert!(e.has_pseudo_class("FOCUS"));
        assert!(e.remove_pseudo_class("focus"));
        assert!(e.pseudo_classes().is_empty());
    }

    #[test]
    fn test_class_names_split_on_whitespace() {
        let e = Element::new(Widget::Panel).with_class("card  primary");
        assert_eq!(e.class_names().collect::<Vec<_>>(), vec!["card", "primary"]);
    }

    #[test]
    fn test_widget_kind_from_tag() {
        assert_eq!(WidgetKind::from_tag("button"), Some(WidgetKind::Button));
        assert_eq!(WidgetKind::from_tag("Grid"), None);
    }
}
