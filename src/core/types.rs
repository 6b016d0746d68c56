use serde::{Deserialize, Serialize};

/// Live anchor in chart space: an integer bar index plus a price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub tick: i64,
    pub value: f64,
}

impl Anchor {
    #[must_use]
    pub const fn new(tick: i64, value: f64) -> Self {
        Self { tick, value }
    }

    /// Returns this anchor shifted by the given deltas.
    #[must_use]
    pub fn offset(self, tick_delta: i64, value_delta: f64) -> Self {
        Self {
            tick: self.tick + tick_delta,
            value: self.value + value_delta,
        }
    }

    #[must_use]
    pub fn tick_f64(self) -> f64 {
        self.tick as f64
    }
}

/// Point in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    #[must_use]
    pub fn midpoint(self, other: Self) -> Self {
        Self::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// One step of a vector path in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo(Point),
    LineTo(Point),
    QuadTo { control: Point, to: Point },
    CubicTo { control1: Point, control2: Point, to: Point },
    /// Circular arc; angles in radians, measured clockwise in screen space.
    Arc { center: Point, radius: f64, start: f64, end: f64, anticlockwise: bool },
    Close,
}
