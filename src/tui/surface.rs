use std::io::Write;
use std::ops::{Deref, DerefMut};

use anyhow::Result;
use crossterm::QueueableCommand;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use unicode_width::UnicodeWidthChar;

use crate::color::ColorPair;
use crate::tui::{Point, Rect, Size};

/// Marks the second column of a double-width character
const CONTINUATION: char = '\0';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub fg: Color,
    pub bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::Reset,
            bg: Color::Reset,
        }
    }
}

/// A character grid the windows paint into.
///
/// All drawing goes through a clip rectangle and an origin offset, both in
/// absolute screen cells. Windows narrow them with [`Surface::clip`], which
/// hands back a guard that restores the previous clip when dropped, so an
/// early return from a draw hook can't leak a stale offset to its siblings.
pub struct Surface {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
    /// What the terminal is currently showing, `None` forces a full flush
    flushed: Option<Vec<Cell>>,
    clip: Rect,
    offset: Point,
    colors: ColorPair,
    /// Pen position in local coordinates, moved by `write` and `newline`
    pen: Point,
    cursor: Option<Point>,
}

impl Surface {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); width as usize * height as usize],
            flushed: None,
            clip: Rect::new(0, 0, width, height),
            offset: Point::default(),
            colors: ColorPair::new(Color::Reset, Color::Reset),
            pen: Point::default(),
            cursor: None,
        }
    }

    /// Reallocate for a new terminal size. Everything is flushed next time.
    pub fn resize(&mut self, width: u16, height: u16) {
        *self = Self::new(width, height);
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// The visible area in local coordinates
    pub fn clip_rect(&self) -> Rect {
        self.clip
            .translate(Point::new(-self.offset.x, -self.offset.y))
    }

    /// Absolute position of the local origin
    pub fn offset(&self) -> Point {
        self.offset
    }

    /// Narrow drawing to `rect` (local coordinates) and move the origin to its
    /// top-left corner until the returned scope is dropped.
    pub fn clip(&mut self, rect: Rect) -> ClipScope<'_> {
        let saved_clip = self.clip;
        let saved_offset = self.offset;
        let saved_pen = self.pen;
        let absolute = rect.translate(self.offset);
        self.clip = self.clip.intersect(&absolute);
        self.offset = absolute.origin();
        self.pen = Point::default();
        ClipScope {
            surface: self,
            clip: saved_clip,
            offset: saved_offset,
            pen: saved_pen,
        }
    }

    /// Paint with `colors` until the returned scope is dropped
    pub fn with_colors(&mut self, colors: ColorPair) -> ColorScope<'_> {
        let saved = self.colors;
        self.colors = colors;
        ColorScope {
            surface: self,
            colors: saved,
        }
    }

    pub fn colors(&self) -> ColorPair {
        self.colors
    }

    pub fn set_foreground(&mut self, color: Color) -> &mut Self {
        self.colors.foreground = color;
        self
    }

    pub fn set_background(&mut self, color: Color) -> &mut Self {
        self.colors.background = color;
        self
    }

    pub fn move_to(&mut self, x: i16, y: i16) -> &mut Self {
        self.pen = Point::new(x, y);
        self
    }

    pub fn pen(&self) -> Point {
        self.pen
    }

    /// Write `text` at the pen, advancing it by the display width written
    pub fn write(&mut self, text: &str) -> &mut Self {
        for ch in text.chars() {
            let width = ch.width().unwrap_or(0) as i16;
            if width == 0 {
                continue;
            }
            let at = self.pen;
            if width == 2 {
                let tail = Point::new(at.x.saturating_add(1), at.y);
                if self.visible(at) && self.visible(tail) {
                    self.put(at, ch);
                    self.put(tail, CONTINUATION);
                } else {
                    self.put(at, ' ');
                    self.put(tail, ' ');
                }
            } else {
                self.put(at, ch);
            }
            self.pen.x = self.pen.x.saturating_add(width);
        }
        self
    }

    pub fn writeln(&mut self, text: &str) -> &mut Self {
        self.write(text);
        self.newline()
    }

    pub fn newline(&mut self) -> &mut Self {
        self.pen = Point::new(0, self.pen.y.saturating_add(1));
        self
    }

    /// Set a single cell in local coordinates, silently dropped outside the clip
    pub fn put(&mut self, at: Point, ch: char) -> &mut Self {
        if let Some(index) = self.index_of(at) {
            self.cells[index] = Cell {
                ch,
                fg: self.colors.foreground,
                bg: self.colors.background,
            };
        }
        self
    }

    /// `put` for positions computed in wider arithmetic; anything past the
    /// `i16` range is off every surface and dropped
    pub fn put_at(&mut self, x: i32, y: i32, ch: char) -> &mut Self {
        if let (Ok(x), Ok(y)) = (i16::try_from(x), i16::try_from(y)) {
            self.put(Point::new(x, y), ch);
        }
        self
    }

    pub fn fill(&mut self, rect: Rect, ch: char) -> &mut Self {
        for y in rect.y as i32..rect.bottom() {
            for x in rect.x as i32..rect.right() {
                self.put_at(x, y, ch);
            }
        }
        self
    }

    /// Fill the whole visible area
    pub fn clear(&mut self) -> &mut Self {
        let area = self.clip_rect();
        self.fill(area, ' ')
    }

    pub fn hline(&mut self, x: i32, y: i32, len: u16, ch: char) -> &mut Self {
        for i in 0..len as i32 {
            self.put_at(x + i, y, ch);
        }
        self
    }

    pub fn vline(&mut self, x: i32, y: i32, len: u16, ch: char) -> &mut Self {
        for i in 0..len as i32 {
            self.put_at(x, y + i, ch);
        }
        self
    }

    /// Single-line box around `rect`, which must be at least 2x2 to show anything
    pub fn draw_box(&mut self, rect: Rect) -> &mut Self {
        if rect.width < 2 || rect.height < 2 {
            return self;
        }
        let (left, top) = (rect.x as i32, rect.y as i32);
        let (right, bottom) = (rect.right() - 1, rect.bottom() - 1);
        self.hline(left + 1, top, rect.width - 2, '─')
            .hline(left + 1, bottom, rect.width - 2, '─')
            .vline(left, top + 1, rect.height - 2, '│')
            .vline(right, top + 1, rect.height - 2, '│')
            .put_at(left, top, '┌')
            .put_at(right, top, '┐')
            .put_at(left, bottom, '└')
            .put_at(right, bottom, '┘')
    }

    /// Place the terminal cursor at a local position, hiding it if clipped
    pub fn set_cursor(&mut self, at: Point) -> &mut Self {
        let absolute = at.offset(self.offset);
        self.cursor = self.clip.contains(absolute).then_some(absolute);
        self
    }

    pub fn hide_cursor(&mut self) -> &mut Self {
        self.cursor = None;
        self
    }

    /// Absolute cursor position, if shown
    pub fn cursor(&self) -> Option<Point> {
        self.cursor
    }

    /// Cell at an absolute position
    pub fn cell(&self, x: u16, y: u16) -> Option<&Cell> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells.get(y as usize * self.width as usize + x as usize)
    }

    /// The characters of an absolute row, continuation cells dropped
    pub fn row_text(&self, y: u16) -> String {
        (0..self.width)
            .filter_map(|x| self.cell(x, y))
            .map(|cell| cell.ch)
            .filter(|ch| *ch != CONTINUATION)
            .collect()
    }

    /// Forget what the terminal shows so the next flush rewrites every cell
    pub fn force_full_flush(&mut self) {
        self.flushed = None;
    }

    /// Send the cells that changed since the last flush to `out`
    pub fn flush<W: Write>(&mut self, out: &mut W) -> Result<usize> {
        let mut written = 0;
        let mut pen: Option<(u16, u16)> = None;
        let mut fg: Option<Color> = None;
        let mut bg: Option<Color> = None;

        for y in 0..self.height {
            for x in 0..self.width {
                let index = y as usize * self.width as usize + x as usize;
                let cell = self.cells[index];
                let unchanged = self
                    .flushed
                    .as_ref()
                    .is_some_and(|flushed| flushed[index] == cell);
                if unchanged || cell.ch == CONTINUATION {
                    continue;
                }
                if pen != Some((x, y)) {
                    out.queue(MoveTo(x, y))?;
                }
                if fg != Some(cell.fg) {
                    out.queue(SetForegroundColor(cell.fg))?;
                    fg = Some(cell.fg);
                }
                if bg != Some(cell.bg) {
                    out.queue(SetBackgroundColor(cell.bg))?;
                    bg = Some(cell.bg);
                }
                out.queue(Print(cell.ch))?;
                let advance = cell.ch.width().unwrap_or(1).max(1) as u16;
                pen = Some((x.saturating_add(advance), y));
                written += 1;
            }
        }

        out.queue(ResetColor)?;
        match self.cursor {
            Some(at) if at.x >= 0 && at.y >= 0 => {
                out.queue(MoveTo(at.x as u16, at.y as u16))?.queue(Show)?;
            }
            _ => {
                out.queue(Hide)?;
            }
        }
        out.flush()?;

        self.flushed = Some(self.cells.clone());
        Ok(written)
    }

    fn visible(&self, at: Point) -> bool {
        self.index_of(at).is_some()
    }

    fn index_of(&self, at: Point) -> Option<usize> {
        let absolute = at.offset(self.offset);
        if !self.clip.contains(absolute) || absolute.x < 0 || absolute.y < 0 {
            return None;
        }
        let (x, y) = (absolute.x as u16, absolute.y as u16);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }
}

/// Restores the clip, origin and pen of a [`Surface`] when dropped
pub struct ClipScope<'a> {
    surface: &'a mut Surface,
    clip: Rect,
    offset: Point,
    pen: Point,
}

impl Deref for ClipScope<'_> {
    type Target = Surface;

    fn deref(&self) -> &Surface {
        self.surface
    }
}

impl DerefMut for ClipScope<'_> {
    fn deref_mut(&mut self) -> &mut Surface {
        self.surface
    }
}

impl Drop for ClipScope<'_> {
    fn drop(&mut self) {
        self.surface.clip = self.clip;
        self.surface.offset = self.offset;
        self.surface.pen = self.pen;
    }
}

/// Restores the paint colors of a [`Surface`] when dropped
pub struct ColorScope<'a> {
    surface: &'a mut Surface,
    colors: ColorPair,
}

impl Deref for ColorScope<'_> {
    type Target = Surface;

    fn deref(&self) -> &Surface {
        self.surface
    }
}

impl DerefMut for ColorScope<'_> {
    fn deref_mut(&mut self) -> &mut Surface {
        self.surface
    }
}

impl Drop for ColorScope<'_> {
    fn drop(&mut self) {
        self.surface.colors = self.colors;
    }
}
