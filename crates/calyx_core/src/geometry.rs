//! Integer geometry and box-model arithmetic
//!
//! Layout works in whole pixels. `Thickness` describes padding, margin and
//! border widths; `deflate`/`inflate` shrink or grow a size or rectangle by
//! a thickness on every side. Deflating never produces a negative width or
//! height.

use serde::{Deserialize, Serialize};

/// A point in screen space
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

/// A width/height pair
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0,
        height: 0,
    };

    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Shrink by `t` on each side, flooring both dimensions at 0
    pub fn deflate(self, t: Thickness) -> Size {
        Size::new(
            (self.width - t.horizontal()).max(0),
            (self.height - t.vertical()).max(0),
        )
    }

    /// Grow by `t` on each side
    pub fn inflate(self, t: Thickness) -> Size {
        Size::new(self.width + t.horizontal(), self.height + t.vertical())
    }

    /// Component-wise minimum
    pub fn min(self, other: Size) -> Size {
        Size::new(self.width.min(other.width), self.height.min(other.height))
    }
}

/// An axis-aligned rectangle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const EMPTY: Rect = Rect {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Half-open containment: the right and bottom edges are outside
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    /// Move the origin inward by `t` and shrink the size, flooring at 0
    pub fn deflate(self, t: Thickness) -> Rect {
        Rect::new(
            self.x + t.left,
            self.y + t.top,
            (self.width - t.horizontal()).max(0),
            (self.height - t.vertical()).max(0),
        )
    }

    /// Move the origin outward by `t` and grow the size
    pub fn inflate(self, t: Thickness) -> Rect {
        Rect::new(
            self.x - t.left,
            self.y - t.top,
            self.width + t.horizontal(),
            self.height + t.vertical(),
        )
    }
}

/// Edge widths used for padding, margin and borders
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Thickness {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Thickness {
    pub const ZERO: Thickness = Thickness {
        left: 0,
        top: 0,
        right: 0,
        bottom: 0,
    };

    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Same width on all four sides
    pub const fn uniform(value: i32) -> Self {
        Self::new(value, value, value, value)
    }

    pub fn horizontal(&self) -> i32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> i32 {
        self.top + self.bottom
    }
}

impl std::ops::Add for Thickness {
    type Output = Thickness;

    fn add(self, rhs: Thickness) -> Thickness {
        Thickness::new(
            self.left + rhs.left,
            self.top + rhs.top,
            self.right + rhs.right,
            self.bottom + rhs.bottom,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_deflate_inflate_inverse() {
        let r = Rect::new(10, 20, 100, 50);
        let t = Thickness::new(1, 2, 3, 4);

        assert_eq!(r.inflate(t).deflate(t), r);
        assert_eq!(r.deflate(t).inflate(t), r);
    }

    #[test]
    fn test_size_deflate_inflate_inverse() {
        let s = Size::new(40, 30);
        let t = Thickness::uniform(5);

        assert_eq!(s.inflate(t).deflate(t), s);
        assert_eq!(s.deflate(t).inflate(t), s);
    }

    #[test]
    fn test_deflate_clamps_to_zero() {
        let t = Thickness::new(10, 10, 10, 10);

        let r = Rect::new(0, 0, 15, 5).deflate(t);
        assert_eq!(r.width, 0);
        assert_eq!(r.height, 0);
        assert_eq!(r.origin(), Point::new(10, 10));

        let s = Size::new(3, 100).deflate(t);
        assert_eq!(s, Size::new(0, 80));
    }

    #[test]
    fn test_contains_is_half_open() {
        let r = Rect::new(0, 0, 100, 30);
        assert!(r.contains(Point::new(0, 0)));
        assert!(r.contains(Point::new(50, 15)));
        assert!(!r.contains(Point::new(100, 15)));
        assert!(!r.contains(Point::new(50, 30)));
        assert!(!r.contains(Point::new(-1, 0)));
    }

    #[test]
    fn test_thickness_sums() {
        let t = Thickness::new(1, 2, 3, 4);
        assert_eq!(t.horizontal(), 4);
        assert_eq!(t.vertical(), 6);
        assert_eq!(t + Thickness::uniform(1), Thickness::new(2, 3, 4, 5));
    }
}
