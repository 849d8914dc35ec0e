use std::fmt;
use std::rc::Rc;

use crate::color::ColorSet;
use crate::tui::{Point, Rect, WindowHandler};

/// Identity of a window inside its [`WindowTree`](crate::tui::WindowTree).
///
/// Ids are handed out in creation order and never reused, so they double as
/// the tie-break in [`Window::absolute_tab_index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowId(pub(crate) u32);

impl WindowId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a vertical scroll bar shows: the visible item range out of a total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollBounds {
    pub first_visible: usize,
    pub last_visible: usize,
    pub total: usize,
}

/// A node of the window tree.
///
/// The last entry of `children` is the child in focus relative to this
/// window, and also the one painted on top. There is no separate pointer.
pub struct Window {
    id: WindowId,
    pub(crate) parent: Option<WindowId>,
    pub(crate) children: Vec<WindowId>,
    pub(crate) handlers: Vec<Rc<dyn WindowHandler>>,
    pub(crate) invalidated: bool,
    pub(crate) sentinel: bool,
    pub(crate) visible: bool,
    pub(crate) tab_stop: bool,
    pub(crate) tab_index: i16,
    pub(crate) left: i16,
    pub(crate) top: i16,
    pub(crate) width: u16,
    pub(crate) height: u16,
    pub(crate) border: bool,
    pub(crate) caption: Option<String>,
    pub(crate) colors: ColorSet,
    pub(crate) cursor: Point,
    pub(crate) cursor_visible: bool,
    pub(crate) scroll_bar: bool,
    pub(crate) scroll_bounds: ScrollBounds,
}

impl Window {
    pub(crate) fn new(id: WindowId, colors: ColorSet) -> Self {
        Self {
            id,
            parent: None,
            children: Vec::new(),
            handlers: Vec::new(),
            invalidated: true,
            sentinel: false,
            visible: true,
            tab_stop: true,
            tab_index: 0,
            left: 0,
            top: 0,
            width: 0,
            height: 0,
            border: false,
            caption: None,
            colors,
            cursor: Point::default(),
            cursor_visible: false,
            scroll_bar: false,
            scroll_bounds: ScrollBounds::default(),
        }
    }

    /// The invisible, zero-size stand-in used to force validation
    pub(crate) fn new_sentinel(id: WindowId, colors: ColorSet) -> Self {
        Self {
            sentinel: true,
            visible: false,
            tab_stop: false,
            ..Self::new(id, colors)
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn parent(&self) -> Option<WindowId> {
        self.parent
    }

    pub fn children(&self) -> &[WindowId] {
        &self.children
    }

    /// The child holding focus relative to this window
    pub fn active_child(&self) -> Option<WindowId> {
        self.children.last().copied()
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    pub fn is_sentinel(&self) -> bool {
        self.sentinel
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_tab_stop(&self) -> bool {
        self.tab_stop
    }

    pub fn tab_index(&self) -> i16 {
        self.tab_index
    }

    /// Declared tab index in the high half, creation id in the low half.
    ///
    /// Orders keyboard navigation by tab index first and creation order second,
    /// independent of where the window sits in the tree.
    pub fn absolute_tab_index(&self) -> i32 {
        ((self.tab_index as i32) << 16) | (self.id.0 & 0xFFFF) as i32
    }

    pub fn left(&self) -> i16 {
        self.left
    }

    pub fn top(&self) -> i16 {
        self.top
    }

    /// Client width, not counting border or scroll bar
    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn has_border(&self) -> bool {
        self.border
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    pub fn colors(&self) -> &ColorSet {
        &self.colors
    }

    pub fn cursor(&self) -> Point {
        self.cursor
    }

    pub fn is_cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    pub fn has_scroll_bar(&self) -> bool {
        self.scroll_bar
    }

    pub fn scroll_bounds(&self) -> ScrollBounds {
        self.scroll_bounds
    }

    /// A caption is only drawn inside a border
    pub fn shows_caption(&self) -> bool {
        self.border && self.caption.is_some()
    }

    pub fn extra_top(&self) -> u16 {
        match (self.border, self.shows_caption()) {
            (true, true) => 3,
            (true, false) => 1,
            _ => 0,
        }
    }

    pub fn extra_left(&self) -> u16 {
        self.border as u16
    }

    /// Border plus, when enabled, the scroll bar rule and track
    pub fn extra_right(&self) -> u16 {
        self.border as u16 + if self.scroll_bar { 2 } else { 0 }
    }

    pub fn extra_bottom(&self) -> u16 {
        self.border as u16
    }

    pub fn total_width(&self) -> u16 {
        self.width
            .saturating_add(self.extra_left())
            .saturating_add(self.extra_right())
    }

    pub fn total_height(&self) -> u16 {
        self.height
            .saturating_add(self.extra_top())
            .saturating_add(self.extra_bottom())
    }

    /// Everything the window covers, in its parent's client coordinates
    pub fn outer_rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.total_width(), self.total_height())
    }

    /// The client area, in its parent's client coordinates
    pub fn client_rect(&self) -> Rect {
        Rect::new(
            self.left.saturating_add(self.extra_left() as i16),
            self.top.saturating_add(self.extra_top() as i16),
            self.width,
            self.height,
        )
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("visible", &self.visible)
            .field("invalidated", &self.invalidated)
            .field("outer", &self.outer_rect())
            .finish_non_exhaustive()
    }
}
