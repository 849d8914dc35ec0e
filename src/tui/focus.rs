use tracing::{debug, trace, warn};

use crate::event::CancelArgs;
use crate::tui::{Window, WindowId, WindowTree};

impl WindowTree {
    /// Move focus to `id`, letting the windows that would lose it object.
    ///
    /// Departing windows validate first, then every level is rotated, then
    /// got-focus runs top-down and lost-focus deepest first. Returns `false`
    /// if a validator vetoed or `id` no longer exists. A window already on
    /// the focus chain of its topmost ancestor succeeds without notifications.
    pub fn focus(&mut self, id: WindowId) -> bool {
        self.request_focus(id, true)
    }

    /// Move focus to `id` without asking the departing windows
    pub fn focus_unvalidated(&mut self, id: WindowId) -> bool {
        self.request_focus(id, false)
    }

    fn request_focus(&mut self, id: WindowId, validate: bool) -> bool {
        if !self.contains(id) {
            return false;
        }
        let Some(pending) = self.pending_path(id) else {
            return true;
        };

        if validate {
            let departing = self.departing_from(pending[0]);
            if !self.validate(&departing) {
                debug!("focus: id={} vetoed", id);
                return false;
            }
            if !self.contains(id) {
                return false;
            }
        }

        // Fresh paths: validators may have moved focus or windows themselves
        let Some(pending) = self.pending_path(id) else {
            return true;
        };
        let departing = self.departing_from(pending[0]);
        self.rotate(&pending);
        debug!(
            "focus: id={} holder={} departing={:?}",
            id, pending[0], departing
        );

        let mut gained: Vec<WindowId> = pending[1..].to_vec();
        gained.extend(self.active_chain(id).into_iter().skip(1));
        for window in gained {
            self.notify(window, |handler, tree| handler.got_focus(tree, window));
        }
        for window in departing {
            self.notify(window, |handler, tree| handler.lost_focus(tree, window));
        }
        true
    }

    /// The part of the path to `id` whose child order has to change.
    ///
    /// Starts at the shallowest ancestor whose active child is off the path
    /// (the common focus holder) and ends at `id`. `None` when `id` already
    /// sits on the focus chain of its topmost ancestor.
    fn pending_path(&self, id: WindowId) -> Option<Vec<WindowId>> {
        let path = self.path_from_root(id);
        let start = path
            .windows(2)
            .position(|pair| self.active_child(pair[0]) != Some(pair[1]))?;
        Some(path[start..].to_vec())
    }

    /// What currently holds focus below `holder`, deepest first
    fn departing_from(&self, holder: WindowId) -> Vec<WindowId> {
        let mut departing = match self.active_child(holder) {
            Some(first) => self.active_chain(first),
            None => Vec::new(),
        };
        departing.reverse();
        departing
    }

    /// Make each window of `pending` the last child of the one before it.
    ///
    /// Children ahead of the promoted one are cycled to the back in order,
    /// leaving every other sibling where it was relative to the rest.
    fn rotate(&mut self, pending: &[WindowId]) {
        for pair in pending.windows(2) {
            let (ancestor, required) = (pair[0], pair[1]);
            let Some(window) = self.window_mut(ancestor) else {
                continue;
            };
            let Some(position) = window.children.iter().position(|child| *child == required)
            else {
                warn!("rotate: {} is not a child of {}", required, ancestor);
                continue;
            };
            let len = window.children.len();
            if position + 1 == len {
                continue;
            }

            let previous = window.children[len - 1];
            window.children.rotate_left(position + 1);
            let cycled = window.children[len - position - 1..].to_vec();
            trace!(
                "rotate: ancestor={} promoted={} cycled={:?}",
                ancestor, required, cycled
            );

            self.invalidate(previous);
            for child in cycled {
                self.invalidate(child);
            }
        }
    }

    /// Ask every window in `departing` whether it may lose focus.
    ///
    /// Validating goes to each window in order and stops at the first veto;
    /// validated follows only when nobody objected.
    pub(crate) fn validate(&mut self, departing: &[WindowId]) -> bool {
        for id in departing.iter().copied() {
            let mut args = CancelArgs::default();
            for handler in self.handlers(id) {
                handler.validating(self, id, &mut args);
                if args.cancel {
                    debug!("validate: id={} cancelled", id);
                    return false;
                }
            }
        }
        for id in departing.iter().copied() {
            self.notify(id, |handler, tree| handler.validated(tree, id));
        }
        true
    }

    /// Run `action` only if the focused window would currently let focus go.
    ///
    /// A hidden sentinel is attached next to the focused window and focused,
    /// which runs the full validation protocol against it. While the sentinel
    /// holds focus, `action` runs; the sentinel is then removed and focus
    /// falls back to where it was. A nested call made from inside `action`
    /// sees the sentinel focused and runs straight away. Any status message
    /// left by the attempt survives the teardown.
    pub fn if_validate_ok(&mut self, action: impl FnOnce(&mut WindowTree)) -> bool {
        let focused = self.focused();
        if self.window(focused).is_some_and(Window::is_sentinel) {
            trace!("if_validate_ok: already validated by sentinel {}", focused);
            action(self);
            return true;
        }
        let Some(parent) = self.parent(focused) else {
            action(self);
            return true;
        };

        let sentinel = self.take_sentinel();
        let accepted = match self.set_parent(sentinel, Some(parent)) {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!("if_validate_ok: {}", err);
                false
            }
        };
        debug!(
            "if_validate_ok: focused={} sentinel={} accepted={}",
            focused, sentinel, accepted
        );
        if accepted {
            action(self);
        }

        let status = self.take_status();
        self.detach(sentinel, false);
        self.restore_status(status);
        self.release_sentinel(sentinel);
        accepted
    }

    /// [`if_validate_ok`](Self::if_validate_ok) without an action
    pub fn validate_focused(&mut self) -> bool {
        self.if_validate_ok(|_| {})
    }
}
