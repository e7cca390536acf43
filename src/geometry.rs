//! Integer 2D geometry primitives
//!
//! The dispatch core works in integer pixels: hit testing, drag thresholds
//! and property interpolation all operate on these types. Wide (`i64`)
//! intermediates are used where products could overflow `i32`.

use serde::{Deserialize, Serialize};

/// A 2D point with integer pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self::new(0, 0)
    }

    /// Component-wise sum
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Vector from `other` to `self`
    pub fn delta(self, other: Point) -> Point {
        Self::new(self.x - other.x, self.y - other.y)
    }

    /// Largest per-axis absolute distance to `other`
    ///
    /// Drag-threshold tests compare each axis independently, so the
    /// Chebyshev distance is the one that matters here.
    pub fn axis_distance(self, other: Point) -> i32 {
        let dx = (self.x as i64 - other.x as i64).abs();
        let dy = (self.y as i64 - other.y as i64).abs();
        dx.max(dy) as i32
    }
}

impl std::ops::Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// A 2D size in integer pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn zero() -> Self {
        Self::new(0, 0)
    }

    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// A rectangle with integer origin and size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn zero() -> Self {
        Self {
            origin: Point::zero(),
            size: Size::zero(),
        }
    }

    pub fn x(&self) -> i32 {
        self.origin.x
    }

    pub fn y(&self) -> i32 {
        self.origin.y
    }

    pub fn width(&self) -> i32 {
        self.size.width
    }

    pub fn height(&self) -> i32 {
        self.size.height
    }

    pub fn max_x(&self) -> i32 {
        self.origin.x + self.size.width
    }

    pub fn max_y(&self) -> i32 {
        self.origin.y + self.size.height
    }

    /// Half-open containment: the right/bottom edges are exclusive, so
    /// adjacent components never both claim a shared edge pixel.
    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.x() && point.x < self.max_x() && point.y >= self.y() && point.y < self.max_y()
    }

    pub fn intersects(&self, other: Rect) -> bool {
        self.x() < other.max_x()
            && self.max_x() > other.x()
            && self.y() < other.max_y()
            && self.max_y() > other.y()
    }
}

/// Linear interpolation between two integer values at `progress` in [0,1].
///
/// Interpolation runs in `f64` and rounds to nearest on write-back so that
/// `progress == 1.0` lands exactly on `to`.
pub fn lerp(from: i32, to: i32, progress: f64) -> i32 {
    let v = from as f64 + (to as f64 - from as f64) * progress;
    v.round() as i32
}
