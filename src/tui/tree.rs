use std::rc::Rc;

use crossterm::event::{KeyEvent, KeyEventKind};
use thiserror::Error;
use tracing::{debug, trace};

use crate::color::ColorSet;
use crate::event::{KeyArgs, KeyBindings};
use crate::tui::{Point, ScrollBounds, Window, WindowHandler, WindowId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("window {0} does not exist")]
    UnknownWindow(WindowId),
    #[error("window {child} cannot be placed under {parent}, which it contains")]
    Cycle { child: WindowId, parent: WindowId },
    #[error("the application root {0} cannot be given a parent")]
    RootHasNoParent(WindowId),
}

/// Arena owning every window of an application.
///
/// Windows are addressed by [`WindowId`] and link to each other through ids,
/// never references, so handlers can restructure the tree from inside a
/// notification without invalidating anything the caller holds.
pub struct WindowTree {
    /// windows[i] is the window with id i, `None` once destroyed. Slot 0 is unused.
    windows: Vec<Option<Window>>,
    /// Root of the application focus chain
    root: WindowId,
    /// Last message a validator left for the user
    status: Option<String>,
    /// Detached sentinels waiting to be reused
    spare_sentinels: Vec<WindowId>,
    bindings: KeyBindings,
    default_colors: ColorSet,
}

impl WindowTree {
    pub fn new(width: u16, height: u16) -> Self {
        Self::with_colors(width, height, ColorSet::default())
    }

    pub fn with_colors(width: u16, height: u16, colors: ColorSet) -> Self {
        let root = WindowId(1);
        let mut window = Window::new(root, colors);
        window.width = width;
        window.height = height;
        window.tab_stop = false;
        Self {
            windows: vec![None, Some(window)],
            root,
            status: None,
            spare_sentinels: Vec::new(),
            bindings: KeyBindings::default(),
            default_colors: colors,
        }
    }

    pub fn root(&self) -> WindowId {
        self.root
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    pub fn set_bindings(&mut self, bindings: KeyBindings) {
        self.bindings = bindings;
    }

    /// Create a detached window
    pub fn create(&mut self) -> WindowId {
        let id = self.next_id();
        debug!("create: id={}", id);
        self.windows.push(Some(Window::new(id, self.default_colors)));
        id
    }

    /// Create a detached window with one handler already subscribed
    pub fn create_with(&mut self, handler: Rc<dyn WindowHandler>) -> WindowId {
        let id = self.create();
        self.add_handler(id, handler);
        id
    }

    pub fn add_handler(&mut self, id: WindowId, handler: Rc<dyn WindowHandler>) -> bool {
        match self.window_mut(id) {
            Some(window) => {
                window.handlers.push(handler);
                true
            }
            None => false,
        }
    }

    /// Detach `id` without asking anyone and free it together with its subtree
    pub fn destroy(&mut self, id: WindowId) -> bool {
        if id == self.root || !self.contains(id) {
            return false;
        }
        self.detach(id, false);
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(window) = self.windows.get_mut(next.0 as usize).and_then(Option::take) {
                debug!("destroy: id={}", next);
                pending.extend(window.children);
            }
        }
        self.spare_sentinels.retain(|spare| *spare != id);
        true
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.window(id).is_some()
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub(crate) fn window_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.windows.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub fn parent(&self, id: WindowId) -> Option<WindowId> {
        self.window(id).and_then(Window::parent)
    }

    pub fn children(&self, id: WindowId) -> &[WindowId] {
        self.window(id).map(Window::children).unwrap_or(&[])
    }

    pub fn active_child(&self, id: WindowId) -> Option<WindowId> {
        self.window(id).and_then(Window::active_child)
    }

    /// Whether `ancestor` is `id` itself or lies above it
    pub fn is_ancestor(&self, ancestor: WindowId, id: WindowId) -> bool {
        let mut current = Some(id);
        while let Some(next) = current {
            if next == ancestor {
                return true;
            }
            current = self.parent(next);
        }
        false
    }

    /// Ancestors of `id` from the topmost one down to `id` itself
    pub fn path_from_root(&self, id: WindowId) -> Vec<WindowId> {
        let mut path = Vec::new();
        let mut current = self.contains(id).then_some(id);
        while let Some(next) = current {
            path.push(next);
            current = self.parent(next);
        }
        path.reverse();
        path
    }

    /// `id` followed by its active child, that child's active child, and so on
    pub fn active_chain(&self, id: WindowId) -> Vec<WindowId> {
        let mut chain = Vec::new();
        let mut current = self.contains(id).then_some(id);
        while let Some(next) = current {
            chain.push(next);
            current = self.active_child(next);
        }
        chain
    }

    /// The application focus chain, root first
    pub fn focus_chain(&self) -> Vec<WindowId> {
        self.active_chain(self.root)
    }

    /// The deepest window of the application focus chain
    pub fn focused(&self) -> WindowId {
        self.focus_chain().last().copied().unwrap_or(self.root)
    }

    /// Whether `id` sits on the unbroken focus chain from the application root
    pub fn is_in_application_focus(&self, id: WindowId) -> bool {
        let path = self.path_from_root(id);
        path.first() == Some(&self.root)
            && path
                .windows(2)
                .all(|pair| self.active_child(pair[0]) == Some(pair[1]))
    }

    /// Descendants of `id` that have no children, in paint order
    pub fn leaves(&self, id: WindowId) -> Vec<WindowId> {
        let mut leaves = Vec::new();
        for child in self.children(id) {
            if self.children(*child).is_empty() {
                leaves.push(*child);
            } else {
                leaves.extend(self.leaves(*child));
            }
        }
        leaves
    }

    /// Sibling before `id`, wrapping around. A detached window is its own sibling.
    pub fn previous_sibling(&self, id: WindowId) -> WindowId {
        self.sibling(id, false)
    }

    /// Sibling after `id`, wrapping around. A detached window is its own sibling.
    pub fn next_sibling(&self, id: WindowId) -> WindowId {
        self.sibling(id, true)
    }

    fn sibling(&self, id: WindowId, forward: bool) -> WindowId {
        let Some(parent) = self.parent(id) else {
            return id;
        };
        let siblings = self.children(parent);
        let len = siblings.len();
        match siblings.iter().position(|sibling| *sibling == id) {
            Some(index) if forward => siblings[(index + 1) % len],
            Some(index) => siblings[(index + len - 1) % len],
            None => id,
        }
    }

    /// Attach, move or detach (`None`) a window.
    ///
    /// Returns whether the window ended up focused among its new siblings, or,
    /// when detaching, whether the removal went through. A window that leaves
    /// a focused subtree only goes once the departing windows validate.
    pub fn set_parent(
        &mut self,
        id: WindowId,
        parent: Option<WindowId>,
    ) -> Result<bool, TreeError> {
        if !self.contains(id) {
            return Err(TreeError::UnknownWindow(id));
        }
        let Some(parent) = parent else {
            return Ok(self.remove(id));
        };
        self.check_parent(id, parent)?;

        if self.parent(id) == Some(parent) {
            return Ok(self.focus(id));
        }
        if self.parent(id).is_some() && !self.remove(id) {
            return Ok(false);
        }

        // Validation hooks run during the removal may have moved things around
        self.check_parent(id, parent)?;
        match self.parent(id) {
            Some(current) if current == parent => return Ok(self.focus(id)),
            Some(_) => return Ok(false),
            None => {}
        }

        self.attach(id, parent);
        Ok(self.focus(id))
    }

    fn check_parent(&self, id: WindowId, parent: WindowId) -> Result<(), TreeError> {
        if id == self.root {
            return Err(TreeError::RootHasNoParent(id));
        }
        if !self.contains(parent) {
            return Err(TreeError::UnknownWindow(parent));
        }
        if self.is_ancestor(id, parent) {
            return Err(TreeError::Cycle { child: id, parent });
        }
        Ok(())
    }

    /// Insert as the oldest child of `parent`, behind all its siblings
    fn attach(&mut self, id: WindowId, parent: WindowId) {
        if let Some(window) = self.window_mut(parent) {
            window.children.insert(0, id);
        }
        if let Some(window) = self.window_mut(id) {
            window.parent = Some(parent);
            window.invalidated = true;
        }
        debug!("attach: id={} parent={}", id, parent);
        self.notify(id, |handler, tree| handler.load(tree, id));
    }

    /// Detach `id` from its parent, validating first if it holds focus
    pub fn remove(&mut self, id: WindowId) -> bool {
        self.detach(id, true)
    }

    pub(crate) fn detach(&mut self, id: WindowId, validate: bool) -> bool {
        if self.parent(id).is_none() {
            return self.contains(id);
        }

        if validate && self.is_in_application_focus(id) {
            let mut departing = self.active_chain(id);
            departing.reverse();
            if !self.validate(&departing) {
                debug!("remove: id={} vetoed", id);
                return false;
            }
        }

        // Recomputed: the validators may have detached or refocused it
        let Some(parent) = self.parent(id) else {
            return self.contains(id);
        };
        let had_focus = self.is_in_application_focus(id);
        let mut departing = if had_focus {
            self.active_chain(id)
        } else {
            Vec::new()
        };
        departing.reverse();

        let visible = self.window(id).is_some_and(Window::is_visible);
        if let Some(window) = self.window_mut(parent) {
            window.children.retain(|child| *child != id);
        }
        if let Some(window) = self.window_mut(id) {
            window.parent = None;
        }
        if visible {
            self.invalidate(parent);
        }
        debug!("detach: id={} parent={} had_focus={}", id, parent, had_focus);
        self.notify(id, |handler, tree| handler.unload(tree, id));

        if had_focus {
            // Focus falls back to whatever is now last under the parent, or
            // to the parent itself once it has no children left
            let mut gained = self.active_chain(parent);
            if gained.len() > 1 {
                gained.remove(0);
            }
            for window in gained {
                self.notify(window, |handler, tree| handler.got_focus(tree, window));
            }
            for window in departing {
                self.notify(window, |handler, tree| handler.lost_focus(tree, window));
            }
        }
        true
    }

    /// Find where keyboard navigation from `from` leads inside `container`.
    ///
    /// Candidates are the children of `container`, or all its leaf
    /// descendants when `nested`. The nearest candidate past `from` in
    /// [`Window::absolute_tab_index`] order wins; with `wrap` the search
    /// starts over once from the lowest (forward) or highest (backward) index.
    pub fn find_next_child(
        &self,
        container: WindowId,
        from: WindowId,
        forward: bool,
        tab_stop_only: bool,
        nested: bool,
        wrap: bool,
    ) -> Option<WindowId> {
        let candidates = if nested {
            self.leaves(container)
        } else {
            self.children(container).to_vec()
        };
        let position = candidates.iter().position(|candidate| *candidate == from)?;
        let current = self.window(from)?.absolute_tab_index();
        let len = candidates.len();

        let eligible = |id: WindowId| -> Option<i32> {
            let window = self.window(id)?;
            if window.is_sentinel() {
                return None;
            }
            if tab_stop_only && !(window.is_tab_stop() && self.is_shown_within(container, id)) {
                return None;
            }
            Some(window.absolute_tab_index())
        };
        let closer = |key: i32, best: Option<(i32, WindowId)>| match best {
            None => true,
            Some((best, _)) if forward => key < best,
            Some((best, _)) => key > best,
        };

        let mut best: Option<(i32, WindowId)> = None;
        for step in 1..len {
            let index = if forward {
                (position + step) % len
            } else {
                (position + len - step) % len
            };
            let candidate = candidates[index];
            let Some(key) = eligible(candidate) else {
                continue;
            };
            let ahead = if forward { key >= current } else { key <= current };
            if ahead && closer(key, best) {
                best = Some((key, candidate));
            }
        }

        if best.is_none() && wrap {
            for candidate in candidates.iter().copied() {
                if let Some(key) = eligible(candidate) {
                    if closer(key, best) {
                        best = Some((key, candidate));
                    }
                }
            }
        }

        trace!(
            "find_next_child: container={} from={} forward={} -> {:?}",
            container,
            from,
            forward,
            best.map(|(_, id)| id)
        );
        best.map(|(_, id)| id)
    }

    /// Move focus to whatever [`find_next_child`](Self::find_next_child) picks
    pub fn select_next_control(
        &mut self,
        container: WindowId,
        from: WindowId,
        forward: bool,
        tab_stop_only: bool,
        nested: bool,
        wrap: bool,
    ) -> bool {
        match self.find_next_child(container, from, forward, tab_stop_only, nested, wrap) {
            Some(target) => self.focus(target),
            None => false,
        }
    }

    /// Whether `id` and every ancestor below `container` are visible
    fn is_shown_within(&self, container: WindowId, id: WindowId) -> bool {
        let mut current = Some(id);
        while let Some(next) = current {
            if next == container {
                return true;
            }
            if !self.window(next).is_some_and(Window::is_visible) {
                return false;
            }
            current = self.parent(next);
        }
        true
    }

    pub fn invalidate(&mut self, id: WindowId) {
        if let Some(window) = self.window_mut(id) {
            if !window.invalidated {
                trace!("invalidate: id={}", id);
            }
            window.invalidated = true;
        }
    }

    /// Invalidate `id` and everything below it
    pub fn invalidate_all(&mut self, id: WindowId) {
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            self.invalidate(next);
            pending.extend_from_slice(self.children(next));
        }
    }

    /// Whether the next repaint would draw anything
    pub fn needs_repaint(&self) -> bool {
        let mut pending = vec![self.root];
        while let Some(next) = pending.pop() {
            let Some(window) = self.window(next) else {
                continue;
            };
            if !window.is_visible() {
                continue;
            }
            if window.is_invalidated() {
                return true;
            }
            pending.extend_from_slice(window.children());
        }
        false
    }

    /// Store `value` through `field`, invalidating the window if it changed
    fn set_property<T: PartialEq>(
        &mut self,
        id: WindowId,
        field: fn(&mut Window) -> &mut T,
        value: T,
    ) -> bool {
        let Some(window) = self.window_mut(id) else {
            return false;
        };
        let slot = field(window);
        if *slot == value {
            return false;
        }
        *slot = value;
        window.invalidated = true;
        true
    }

    /// Like `set_property`, for changes that also expose or cover parent area
    fn set_outer_property<T: PartialEq>(
        &mut self,
        id: WindowId,
        field: fn(&mut Window) -> &mut T,
        value: T,
    ) -> bool {
        let changed = self.set_property(id, field, value);
        if changed {
            if let Some(parent) = self.parent(id) {
                self.invalidate(parent);
            }
        }
        changed
    }

    pub fn set_visible(&mut self, id: WindowId, visible: bool) -> bool {
        self.set_outer_property(id, |window| &mut window.visible, visible)
    }

    pub fn set_tab_stop(&mut self, id: WindowId, tab_stop: bool) -> bool {
        self.set_property(id, |window| &mut window.tab_stop, tab_stop)
    }

    pub fn set_tab_index(&mut self, id: WindowId, tab_index: i16) -> bool {
        self.set_property(id, |window| &mut window.tab_index, tab_index)
    }

    pub fn set_position(&mut self, id: WindowId, left: i16, top: i16) -> bool {
        let moved_x = self.set_outer_property(id, |window| &mut window.left, left);
        let moved_y = self.set_outer_property(id, |window| &mut window.top, top);
        moved_x || moved_y
    }

    /// Set the client size, raising resize if it changed
    pub fn set_size(&mut self, id: WindowId, width: u16, height: u16) -> bool {
        let wider = self.set_outer_property(id, |window| &mut window.width, width);
        let taller = self.set_outer_property(id, |window| &mut window.height, height);
        if wider || taller {
            debug!("resize: id={} {}x{}", id, width, height);
            self.notify(id, |handler, tree| handler.resize(tree, id));
        }
        wider || taller
    }

    pub fn set_border(&mut self, id: WindowId, border: bool) -> bool {
        self.set_outer_property(id, |window| &mut window.border, border)
    }

    pub fn set_caption(&mut self, id: WindowId, caption: Option<String>) -> bool {
        self.set_outer_property(id, |window| &mut window.caption, caption)
    }

    pub fn set_colors(&mut self, id: WindowId, colors: ColorSet) -> bool {
        self.set_property(id, |window| &mut window.colors, colors)
    }

    pub fn set_scroll_bar(&mut self, id: WindowId, scroll_bar: bool) -> bool {
        self.set_outer_property(id, |window| &mut window.scroll_bar, scroll_bar)
    }

    pub fn set_scroll_bounds(&mut self, id: WindowId, bounds: ScrollBounds) -> bool {
        self.set_property(id, |window| &mut window.scroll_bounds, bounds)
    }

    // The cursor has its own pass, so moving it doesn't invalidate content

    pub fn set_cursor(&mut self, id: WindowId, at: Point) {
        if let Some(window) = self.window_mut(id) {
            window.cursor = at;
        }
    }

    pub fn set_cursor_visible(&mut self, id: WindowId, visible: bool) {
        if let Some(window) = self.window_mut(id) {
            window.cursor_visible = visible;
        }
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    pub(crate) fn take_status(&mut self) -> Option<String> {
        self.status.take()
    }

    pub(crate) fn restore_status(&mut self, status: Option<String>) {
        self.status = status;
    }

    /// Route a key through the focus chain.
    ///
    /// Key-down travels from the focused window up to the root until someone
    /// handles it, then after-key-down does the same. Only a key nobody
    /// claimed reaches the tree's own bindings. Returns whether anything
    /// handled the key.
    pub fn process_key(&mut self, event: KeyEvent) -> bool {
        if event.kind == KeyEventKind::Release {
            return false;
        }
        let mut args = KeyArgs::new(event);
        let chain = self.focus_chain();

        for id in chain.iter().rev().copied() {
            for handler in self.handlers(id) {
                handler.key_down(self, id, &mut args);
                if args.handled {
                    return true;
                }
            }
        }
        for id in chain.iter().rev().copied() {
            for handler in self.handlers(id) {
                handler.after_key_down(self, id, &mut args);
                if args.handled {
                    return true;
                }
            }
        }

        let root = self.root;
        if args.is(self.bindings.next_control) || args.is(self.bindings.previous_control) {
            let forward = args.is(self.bindings.next_control);
            let from = self.focused();
            self.select_next_control(root, from, forward, true, true, true);
            return true;
        }
        if args.is(self.bindings.repaint) {
            debug!("process_key: full repaint requested");
            self.invalidate_all(root);
            return true;
        }
        false
    }

    pub(crate) fn handlers(&self, id: WindowId) -> Vec<Rc<dyn WindowHandler>> {
        self.window(id)
            .map(|window| window.handlers.clone())
            .unwrap_or_default()
    }

    /// Call `f` for each handler of `id` in subscription order
    pub(crate) fn notify(
        &mut self,
        id: WindowId,
        mut f: impl FnMut(&dyn WindowHandler, &mut WindowTree),
    ) {
        for handler in self.handlers(id) {
            f(handler.as_ref(), self);
        }
    }

    /// A detached sentinel, reused from earlier calls when possible
    pub(crate) fn take_sentinel(&mut self) -> WindowId {
        if let Some(id) = self.spare_sentinels.pop() {
            return id;
        }
        let id = self.next_id();
        self.windows
            .push(Some(Window::new_sentinel(id, self.default_colors)));
        id
    }

    pub(crate) fn release_sentinel(&mut self, id: WindowId) {
        let reusable = self
            .window(id)
            .is_some_and(|window| window.is_sentinel() && window.parent().is_none());
        if reusable {
            self.spare_sentinels.push(id);
        }
    }

    fn next_id(&self) -> WindowId {
        WindowId(self.windows.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::KeyChord;
    use crate::tui::testing::{named, tree_with_log};
    use crossterm::event::{KeyCode, KeyModifiers};

    #[test]
    fn attach_makes_newcomer_active() {
        let mut tree = WindowTree::new(80, 24);
        let root = tree.root();
        let a = tree.create();
        let b = tree.create();
        assert_eq!(tree.set_parent(a, Some(root)), Ok(true));
        assert_eq!(tree.set_parent(b, Some(root)), Ok(true));
        assert_eq!(tree.children(root), &[a, b]);
        assert_eq!(tree.active_child(root), Some(b));
        assert_eq!(tree.focused(), b);
    }

    #[test]
    fn reattach_to_same_parent_is_a_focus_request() {
        let mut tree = WindowTree::new(80, 24);
        let root = tree.root();
        let a = tree.create();
        let b = tree.create();
        tree.set_parent(a, Some(root)).unwrap();
        tree.set_parent(b, Some(root)).unwrap();
        assert_eq!(tree.set_parent(a, Some(root)), Ok(true));
        assert_eq!(tree.children(root), &[b, a]);
    }

    #[test]
    fn rejects_cycles_and_unknown_windows() {
        let mut tree = WindowTree::new(80, 24);
        let root = tree.root();
        let outer = tree.create();
        let inner = tree.create();
        tree.set_parent(outer, Some(root)).unwrap();
        tree.set_parent(inner, Some(outer)).unwrap();

        assert_eq!(
            tree.set_parent(outer, Some(inner)),
            Err(TreeError::Cycle {
                child: outer,
                parent: inner
            })
        );
        assert_eq!(
            tree.set_parent(outer, Some(outer)),
            Err(TreeError::Cycle {
                child: outer,
                parent: outer
            })
        );
        let ghost = WindowId(99);
        assert_eq!(
            tree.set_parent(ghost, Some(root)),
            Err(TreeError::UnknownWindow(ghost))
        );
        assert_eq!(tree.children(inner), &[] as &[WindowId]);
    }

    #[test]
    fn root_cannot_be_given_a_parent() {
        let mut tree = WindowTree::new(80, 24);
        let root = tree.root();
        let detached = tree.create();

        assert_eq!(
            tree.set_parent(root, Some(detached)),
            Err(TreeError::RootHasNoParent(root))
        );
        assert_eq!(tree.parent(root), None);
        assert!(tree.children(detached).is_empty());
        assert!(tree.is_in_application_focus(root));
    }

    #[test]
    fn attach_loads_before_taking_focus() {
        let (mut tree, log) = tree_with_log();
        let root = tree.root();
        let (a, _) = named(&mut tree, &log, "a", root);
        log.borrow_mut().clear();

        let (x, _) = named(&mut tree, &log, "x", root);
        assert_eq!(
            *log.borrow(),
            ["load x", "validating a", "validated a", "got_focus x", "lost_focus a"]
        );
        assert_eq!(tree.children(root), &[a, x]);
    }

    #[test]
    fn vetoed_reparent_stays_put() {
        let (mut tree, log) = tree_with_log();
        let root = tree.root();
        let (left, _) = named(&mut tree, &log, "left", root);
        let (right, _) = named(&mut tree, &log, "right", root);
        let (item, recorder) = named(&mut tree, &log, "item", left);
        recorder.veto.set(true);
        let root_children = tree.children(root).to_vec();
        assert_eq!(root_children, [right, left]);
        log.borrow_mut().clear();

        assert_eq!(tree.set_parent(item, Some(right)), Ok(false));
        assert_eq!(tree.parent(item), Some(left));
        assert_eq!(tree.children(left), &[item]);
        assert!(tree.children(right).is_empty());
        assert_eq!(tree.children(root), root_children.as_slice());
        assert_eq!(tree.focused(), item);
        assert_eq!(*log.borrow(), ["validating item"]);
    }

    #[test]
    fn reparent_moves_between_lists() {
        let mut tree = WindowTree::new(80, 24);
        let root = tree.root();
        let left = tree.create();
        let right = tree.create();
        let item = tree.create();
        tree.set_parent(left, Some(root)).unwrap();
        tree.set_parent(right, Some(root)).unwrap();
        tree.set_parent(item, Some(left)).unwrap();

        assert_eq!(tree.set_parent(item, Some(right)), Ok(true));
        assert!(tree.children(left).is_empty());
        assert_eq!(tree.children(right), &[item]);
        assert_eq!(tree.parent(item), Some(right));
    }

    #[test]
    fn remove_falls_back_to_previous_sibling() {
        let (mut tree, log) = tree_with_log();
        let root = tree.root();
        let (a, _) = named(&mut tree, &log, "a", root);
        let (b, _) = named(&mut tree, &log, "b", root);
        log.borrow_mut().clear();

        assert!(tree.remove(b));
        assert_eq!(tree.parent(b), None);
        assert_eq!(tree.focused(), a);
        assert_eq!(
            *log.borrow(),
            ["validating b", "validated b", "unload b", "got_focus a", "lost_focus b"]
        );
        assert!(tree.window(root).unwrap().is_invalidated());
    }

    #[test]
    fn remove_of_unfocused_window_skips_validation() {
        let (mut tree, log) = tree_with_log();
        let root = tree.root();
        let (a, _) = named(&mut tree, &log, "a", root);
        let (_b, _) = named(&mut tree, &log, "b", root);
        log.borrow_mut().clear();

        assert!(tree.remove(a));
        assert_eq!(*log.borrow(), ["unload a"]);
    }

    #[test]
    fn vetoed_remove_changes_nothing() {
        let (mut tree, log) = tree_with_log();
        let root = tree.root();
        let (a, _) = named(&mut tree, &log, "a", root);
        let (b, recorder) = named(&mut tree, &log, "b", root);
        recorder.veto.set(true);
        log.borrow_mut().clear();

        assert!(!tree.remove(b));
        assert_eq!(tree.children(root), &[a, b]);
        assert_eq!(*log.borrow(), ["validating b"]);
    }

    #[test]
    fn removing_last_child_refocuses_parent() {
        let (mut tree, log) = tree_with_log();
        let root = tree.root();
        let (panel, _) = named(&mut tree, &log, "panel", root);
        let (field, _) = named(&mut tree, &log, "field", panel);
        log.borrow_mut().clear();

        assert!(tree.remove(field));
        assert_eq!(tree.focused(), panel);
        assert_eq!(
            *log.borrow(),
            [
                "validating field",
                "validated field",
                "unload field",
                "got_focus panel",
                "lost_focus field"
            ]
        );
    }

    #[test]
    fn siblings_wrap_and_detached_is_its_own_sibling() {
        let mut tree = WindowTree::new(80, 24);
        let root = tree.root();
        let ids: Vec<_> = (0..3).map(|_| tree.create()).collect();
        for id in &ids {
            tree.set_parent(*id, Some(root)).unwrap();
        }
        let order = tree.children(root).to_vec();
        assert_eq!(tree.next_sibling(order[2]), order[0]);
        assert_eq!(tree.previous_sibling(order[0]), order[2]);
        assert_eq!(tree.next_sibling(order[0]), order[1]);

        let loner = tree.create();
        assert_eq!(tree.next_sibling(loner), loner);
        assert_eq!(tree.previous_sibling(root), root);
    }

    #[test]
    fn leaves_in_paint_order() {
        let mut tree = WindowTree::new(80, 24);
        let root = tree.root();
        let panel = tree.create();
        let first = tree.create();
        let second = tree.create();
        let lone = tree.create();
        tree.set_parent(panel, Some(root)).unwrap();
        tree.set_parent(first, Some(panel)).unwrap();
        tree.set_parent(second, Some(panel)).unwrap();
        tree.set_parent(lone, Some(root)).unwrap();

        assert_eq!(tree.leaves(root), vec![first, second, lone]);
    }

    #[test]
    fn tab_navigation_between_two_children() {
        let mut tree = WindowTree::new(80, 24);
        let root = tree.root();
        let a = tree.create();
        let b = tree.create();
        tree.set_parent(a, Some(root)).unwrap();
        tree.set_parent(b, Some(root)).unwrap();

        assert_eq!(tree.find_next_child(root, b, true, true, false, true), Some(a));
        assert_eq!(tree.find_next_child(root, a, true, true, false, true), Some(b));
        assert_eq!(tree.find_next_child(root, b, true, true, false, false), None);
        assert_eq!(tree.find_next_child(root, a, false, true, false, false), None);
        assert_eq!(tree.find_next_child(root, a, false, true, false, true), Some(b));
    }

    #[test]
    fn tab_index_beats_creation_order() {
        let mut tree = WindowTree::new(80, 24);
        let root = tree.root();
        let first = tree.create();
        let second = tree.create();
        let third = tree.create();
        for id in [first, second, third] {
            tree.set_parent(id, Some(root)).unwrap();
        }
        tree.set_tab_index(first, 2);

        assert_eq!(tree.find_next_child(root, second, true, true, false, false), Some(third));
        assert_eq!(tree.find_next_child(root, third, true, true, false, false), Some(first));
        assert_eq!(tree.find_next_child(root, first, true, true, false, true), Some(second));
    }

    #[test]
    fn navigation_skips_non_tab_stops_and_hidden() {
        let mut tree = WindowTree::new(80, 24);
        let root = tree.root();
        let ids: Vec<_> = (0..4).map(|_| tree.create()).collect();
        for id in &ids {
            tree.set_parent(*id, Some(root)).unwrap();
        }
        tree.set_tab_stop(ids[1], false);
        tree.set_visible(ids[2], false);

        assert_eq!(tree.find_next_child(root, ids[0], true, true, false, false), Some(ids[3]));
        assert_eq!(tree.find_next_child(root, ids[0], true, false, false, false), Some(ids[1]));
    }

    #[test]
    fn navigation_from_unknown_origin_finds_nothing() {
        let mut tree = WindowTree::new(80, 24);
        let root = tree.root();
        let a = tree.create();
        tree.set_parent(a, Some(root)).unwrap();
        let stranger = tree.create();
        assert_eq!(tree.find_next_child(root, stranger, true, true, false, true), None);
    }

    #[test]
    fn single_tab_stop_wraps_to_itself() {
        let mut tree = WindowTree::new(80, 24);
        let root = tree.root();
        let a = tree.create();
        tree.set_parent(a, Some(root)).unwrap();
        assert_eq!(tree.find_next_child(root, a, true, true, false, true), Some(a));
        assert!(tree.select_next_control(root, a, true, true, false, true));
    }

    #[test]
    fn nested_navigation_crosses_containers() {
        let mut tree = WindowTree::new(80, 24);
        let root = tree.root();
        let left = tree.create();
        let right = tree.create();
        tree.set_parent(left, Some(root)).unwrap();
        tree.set_parent(right, Some(root)).unwrap();
        let a = tree.create();
        let b = tree.create();
        tree.set_parent(a, Some(left)).unwrap();
        tree.set_parent(b, Some(right)).unwrap();
        assert_eq!(tree.focused(), b);

        assert!(tree.select_next_control(root, b, true, true, true, true));
        assert_eq!(tree.focused(), a);
        assert_eq!(tree.active_child(root), Some(left));
    }

    #[test]
    fn setters_invalidate_only_on_change() {
        let mut tree = WindowTree::new(80, 24);
        let root = tree.root();
        let id = tree.create();
        tree.set_parent(id, Some(root)).unwrap();
        tree.window_mut(id).unwrap().invalidated = false;
        tree.window_mut(root).unwrap().invalidated = false;

        assert!(!tree.set_tab_stop(id, true));
        assert!(!tree.window(id).unwrap().is_invalidated());

        assert!(tree.set_caption(id, Some("Title".into())));
        assert!(tree.window(id).unwrap().is_invalidated());
        assert!(tree.window(root).unwrap().is_invalidated());

        tree.window_mut(id).unwrap().invalidated = false;
        tree.set_cursor(id, Point::new(3, 0));
        assert!(!tree.window(id).unwrap().is_invalidated());
    }

    #[test]
    fn resize_fires_once_per_change() {
        let (mut tree, log) = tree_with_log();
        let root = tree.root();
        let (id, _) = named(&mut tree, &log, "box", root);
        log.borrow_mut().clear();

        assert!(tree.set_size(id, 10, 2));
        assert!(!tree.set_size(id, 10, 2));
        assert_eq!(*log.borrow(), ["resize box"]);
    }

    #[test]
    fn destroy_frees_subtree() {
        let mut tree = WindowTree::new(80, 24);
        let root = tree.root();
        let panel = tree.create();
        let field = tree.create();
        tree.set_parent(panel, Some(root)).unwrap();
        tree.set_parent(field, Some(panel)).unwrap();

        assert!(tree.destroy(panel));
        assert!(!tree.contains(panel));
        assert!(!tree.contains(field));
        assert!(tree.children(root).is_empty());
        assert!(!tree.destroy(root));
        assert!(tree.create() > field);
    }

    #[test]
    fn unclaimed_tab_moves_focus() {
        let mut tree = WindowTree::new(80, 24);
        let root = tree.root();
        let a = tree.create();
        let b = tree.create();
        tree.set_parent(a, Some(root)).unwrap();
        tree.set_parent(b, Some(root)).unwrap();

        assert!(tree.process_key(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE)));
        assert_eq!(tree.focused(), a);
        assert!(tree.process_key(KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT)));
        assert_eq!(tree.focused(), b);
    }

    #[test]
    fn claimed_key_skips_after_key_down_and_defaults() {
        let (mut tree, log) = tree_with_log();
        let root = tree.root();
        let (a, _) = named(&mut tree, &log, "a", root);
        let (b, recorder) = named(&mut tree, &log, "b", root);
        recorder.claim_keys.set(true);
        log.borrow_mut().clear();

        assert!(tree.process_key(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE)));
        assert_eq!(tree.focused(), b);
        assert_eq!(*log.borrow(), ["key_down b"]);

        recorder.claim_keys.set(false);
        log.borrow_mut().clear();
        assert!(tree.process_key(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE)));
        assert_eq!(tree.focused(), a);
        assert_eq!(log.borrow()[..2], ["key_down b", "after_key_down b"]);
    }

    #[test]
    fn repaint_binding_invalidates_everything() {
        let mut tree = WindowTree::new(80, 24);
        let root = tree.root();
        let a = tree.create();
        tree.set_parent(a, Some(root)).unwrap();
        tree.window_mut(a).unwrap().invalidated = false;
        tree.window_mut(root).unwrap().invalidated = false;
        assert!(!tree.needs_repaint());

        assert!(tree.process_key(KeyEvent::new(KeyCode::Char('l'), KeyModifiers::CONTROL)));
        assert!(tree.window(a).unwrap().is_invalidated());
        assert!(tree.needs_repaint());
    }

    #[test]
    fn rebound_navigation_key() {
        let mut tree = WindowTree::new(80, 24);
        let root = tree.root();
        let a = tree.create();
        let b = tree.create();
        tree.set_parent(a, Some(root)).unwrap();
        tree.set_parent(b, Some(root)).unwrap();
        tree.set_bindings(KeyBindings {
            next_control: KeyChord::plain(KeyCode::F(2)),
            ..KeyBindings::default()
        });
        assert_eq!(tree.bindings().next_control, KeyChord::plain(KeyCode::F(2)));

        assert!(!tree.process_key(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE)));
        assert_eq!(tree.focused(), b);
        assert!(tree.process_key(KeyEvent::new(KeyCode::F(2), KeyModifiers::NONE)));
        assert_eq!(tree.focused(), a);
    }

    #[test]
    fn unbound_key_is_unhandled() {
        let mut tree = WindowTree::new(80, 24);
        assert!(!tree.process_key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE)));
    }
}
