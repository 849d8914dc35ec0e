pub mod focus;
pub mod handler;
pub mod redraw;
pub mod surface;
pub mod tree;
pub mod window;

#[cfg(test)]
pub(crate) mod testing;

pub use handler::WindowHandler;
pub use surface::Surface;
pub use tree::{TreeError, WindowTree};
pub use window::{ScrollBounds, Window, WindowId};

/// A position in cells, relative to whatever the current clip offset is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Point {
    pub x: i16,
    pub y: i16,
}

impl Point {
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    pub fn offset(self, by: Point) -> Point {
        Point {
            x: self.x.saturating_add(by.x),
            y: self.y.saturating_add(by.y),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Size {
    pub width: u16,
    pub height: u16,
}

impl Size {
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rect {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    pub const fn new(x: i16, y: i16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// One past the last column, widened so huge rects near `i16::MAX` don't wrap
    pub fn right(&self) -> i32 {
        self.x as i32 + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y as i32 + self.height as i32
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, point: Point) -> bool {
        let (x, y) = (point.x as i32, point.y as i32);
        x >= self.x as i32 && x < self.right() && y >= self.y as i32 && y < self.bottom()
    }

    pub fn translate(&self, by: Point) -> Rect {
        Rect {
            x: self.x.saturating_add(by.x),
            y: self.y.saturating_add(by.y),
            ..*self
        }
    }

    pub fn intersect(&self, other: &Rect) -> Rect {
        let left = (self.x as i32).max(other.x as i32);
        let top = (self.y as i32).max(other.y as i32);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return Rect::new(self.x, self.y, 0, 0);
        }
        Rect {
            x: left as i16,
            y: top as i16,
            width: (right - left) as u16,
            height: (bottom - top) as u16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersect_overlapping() {
        let a = Rect::new(0, 0, 10, 5);
        let b = Rect::new(4, 2, 10, 10);
        assert_eq!(a.intersect(&b), Rect::new(4, 2, 6, 3));
    }

    #[test]
    fn intersect_disjoint_is_empty() {
        let a = Rect::new(0, 0, 3, 3);
        let b = Rect::new(5, 5, 2, 2);
        assert!(a.intersect(&b).is_empty());
    }

    #[test]
    fn contains_excludes_far_edge() {
        let r = Rect::new(-2, 1, 4, 2);
        assert!(r.contains(Point::new(-2, 1)));
        assert!(r.contains(Point::new(1, 2)));
        assert!(!r.contains(Point::new(2, 2)));
        assert!(!r.contains(Point::new(0, 3)));
    }
}
