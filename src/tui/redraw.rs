use std::rc::Rc;

use anyhow::Result;
use tracing::trace;

use crate::color::ColorSet;
use crate::event::DrawArgs;
use crate::tui::{Rect, ScrollBounds, Surface, Window, WindowHandler, WindowId, WindowTree};

impl WindowTree {
    /// Redraw every invalidated window. Returns whether anything was drawn.
    ///
    /// Once a window at some level is redrawn, every later sibling in paint
    /// order is redrawn too.
    pub fn repaint(&mut self, surface: &mut Surface) -> Result<bool> {
        let root = self.root();
        let painted = self.repaint_window(root, surface, true, false)?;
        if painted {
            trace!("repaint: done");
        }
        Ok(painted)
    }

    fn repaint_window(
        &mut self,
        id: WindowId,
        surface: &mut Surface,
        parent_has_focus: bool,
        force: bool,
    ) -> Result<bool> {
        let Some(window) = self.window(id) else {
            return Ok(false);
        };
        if !window.is_visible() {
            if let Some(window) = self.window_mut(id) {
                window.invalidated = false;
            }
            return Ok(false);
        }
        let has_focus = match window.parent() {
            None => true,
            Some(parent) => parent_has_focus && self.active_child(parent) == Some(id),
        };
        let redraw = window.is_invalidated() || force;

        if redraw {
            self.notify(id, |handler, tree| handler.auto_size(tree, id));
        }
        // auto_size may have resized or even removed the window
        let Some(window) = self.window(id) else {
            return Ok(false);
        };
        let client = window.client_rect();
        let colors = *window.colors();
        let children = window.children().to_vec();
        let handlers = self.handlers(id);

        let mut painted_children = false;
        {
            let mut scope = surface.clip(client);
            if redraw {
                trace!("repaint: id={} focus={}", id, has_focus);
                let mut colored = scope.with_colors(colors.content(has_focus));
                self.erase_background(id, &handlers, &mut colored, has_focus)?;
                let mut args = DrawArgs::new(&mut colored, has_focus);
                for handler in &handlers {
                    handler.draw_content(self, id, &mut args)?;
                }
                drop(colored);
                if let Some(window) = self.window_mut(id) {
                    window.invalidated = false;
                }
            }

            let mut force_children = redraw;
            for child in children {
                if self.parent(child) != Some(id) {
                    continue;
                }
                if self.repaint_window(child, &mut scope, has_focus, force_children)? {
                    force_children = true;
                    painted_children = true;
                }
            }
        }

        if redraw {
            self.draw_border(id, &handlers, surface, has_focus)?;
        }
        Ok(redraw || painted_children)
    }

    fn erase_background(
        &self,
        id: WindowId,
        handlers: &[Rc<dyn WindowHandler>],
        surface: &mut Surface,
        has_focus: bool,
    ) -> Result<()> {
        let mut args = DrawArgs::new(surface, has_focus);
        for handler in handlers {
            handler.erase_background(self, id, &mut args)?;
            if args.handled {
                return Ok(());
            }
        }
        args.surface.clear();
        Ok(())
    }

    fn draw_border(
        &self,
        id: WindowId,
        handlers: &[Rc<dyn WindowHandler>],
        surface: &mut Surface,
        has_focus: bool,
    ) -> Result<()> {
        let mut args = DrawArgs::new(surface, has_focus);
        for handler in handlers {
            handler.draw_border(self, id, &mut args)?;
            if args.handled {
                return Ok(());
            }
        }
        if let Some(window) = self.window(id) {
            draw_default_border(window, args.surface, has_focus);
        }
        Ok(())
    }

    /// Put the terminal cursor where the focused window wants it.
    ///
    /// Follows the active child chain from the root. Only the leaf decides;
    /// the cursor is hidden if that leaf hides it or it falls outside the
    /// leaf's visible area.
    pub fn repaint_cursor(&self, surface: &mut Surface) {
        surface.hide_cursor();
        self.place_cursor(self.root(), surface);
    }

    fn place_cursor(&self, id: WindowId, surface: &mut Surface) {
        let Some(window) = self.window(id) else {
            return;
        };
        if !window.is_visible() {
            return;
        }
        let mut scope = surface.clip(window.client_rect());
        match window.active_child() {
            Some(child) => self.place_cursor(child, &mut scope),
            None if window.is_cursor_visible() => {
                scope.set_cursor(window.cursor());
            }
            None => {}
        }
    }
}

/// Frame, caption strip and scroll bar around `window`.
///
/// `surface` is the parent's client area; the window's outer rectangle is
/// drawn in those coordinates.
pub fn draw_default_border(window: &Window, surface: &mut Surface, has_focus: bool) {
    let outer = window.outer_rect();
    let colors = window.colors();

    if window.has_border() {
        let mut framed = surface.with_colors(colors.frame(has_focus));
        framed.draw_box(outer);

        if let Some(caption) = window.caption().filter(|_| window.shows_caption()) {
            let (left, right) = (outer.x as i32, outer.right() - 1);
            let separator = outer.y as i32 + 2;
            framed
                .put_at(left, separator, '├')
                .hline(left + 1, separator, outer.width.saturating_sub(2), '─')
                .put_at(right, separator, '┤');

            let strip = Rect::new(
                outer.x.saturating_add(1),
                outer.y.saturating_add(1),
                outer.width.saturating_sub(2),
                1,
            );
            let mut titled = framed.with_colors(colors.title(has_focus));
            let mut title = titled.clip(strip);
            title.clear();
            title.move_to(1, 0).write(caption);
        }
    }

    if window.has_scroll_bar() {
        draw_scroll_bar(window, surface, colors, has_focus);
    }
}

/// A rule next to the client area, then a track with a thumb
fn draw_scroll_bar(window: &Window, surface: &mut Surface, colors: &ColorSet, has_focus: bool) {
    let client = window.client_rect();
    let (rule_x, top) = (client.right(), client.y as i32);
    let track_x = rule_x + 1;

    {
        let mut framed = surface.with_colors(colors.frame(has_focus));
        framed.vline(rule_x, top, client.height, '│');
        if window.has_border() {
            let outer = window.outer_rect();
            framed
                .put_at(rule_x, top - 1, '┬')
                .put_at(rule_x, outer.bottom() - 1, '┴');
        }
    }

    if client.height < 2 {
        let mut blank = surface.with_colors(colors.scroll_track);
        blank.vline(track_x, top, client.height, ' ');
        return;
    }

    let (start, end) = thumb(window.scroll_bounds(), client.height);
    for row in 0..client.height {
        let y = top + row as i32;
        if (start..end).contains(&row) {
            surface.with_colors(colors.scroll_thumb).put_at(track_x, y, '█');
        } else {
            surface.with_colors(colors.scroll_track).put_at(track_x, y, '░');
        }
    }
}

/// Rows `start..end` of a track `len` rows long covered by the thumb
fn thumb(bounds: ScrollBounds, len: u16) -> (u16, u16) {
    if bounds.total == 0 || bounds.last_visible < bounds.first_visible || len == 0 {
        return (0, len);
    }
    let total = bounds.total as u64;
    let len64 = len as u64;
    let first = (bounds.first_visible as u64).min(total);
    let last = (bounds.last_visible as u64 + 1).min(total);
    let start = ((first * len64) / total).min(len64 - 1) as u16;
    let end = (last * len64).div_ceil(total).min(len64) as u16;
    (start, end.max(start + 1))
}
