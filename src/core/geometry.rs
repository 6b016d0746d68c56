//! Pixel-space hit testing and clipping shared by every drawing.

use serde::{Deserialize, Serialize};

use crate::core::host::ChartHost;
use crate::core::pane::Panel;
use crate::core::types::{Anchor, Point};

/// How far a line through two points extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    /// Between the two points only.
    Segment,
    /// From the first point through the second, unbounded on that side.
    Ray,
    /// Unbounded in both directions.
    Line,
    /// Horizontal through the first point.
    Horizontal,
    /// Vertical through the first point.
    Vertical,
}

/// Axis-aligned pixel rectangle with `left <= right` and `top <= bottom`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl PixelRect {
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            right: a.x.max(b.x),
            bottom: a.y.max(b.y),
        }
    }

    #[must_use]
    pub fn of_panel(panel: &Panel) -> Self {
        Self {
            left: panel.left(),
            top: panel.top(),
            right: panel.right(),
            bottom: panel.bottom(),
        }
    }

    #[must_use]
    pub fn contains(self, point: Point) -> bool {
        point.x >= self.left && point.x <= self.right && point.y >= self.top && point.y <= self.bottom
    }

    #[must_use]
    pub fn width(self) -> f64 {
        self.right - self.left
    }

    #[must_use]
    pub fn height(self) -> f64 {
        self.bottom - self.top
    }
}

/// Pointer neighbourhood in chart units, built by the host around the cursor.
///
/// `value0` is the value at the upper pixel edge, so normally `value0 >= value1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitBox {
    pub tick0: f64,
    pub tick1: f64,
    pub value0: f64,
    pub value1: f64,
}

impl HitBox {
    #[must_use]
    pub const fn new(tick0: f64, tick1: f64, value0: f64, value1: f64) -> Self {
        Self {
            tick0,
            tick1,
            value0,
            value1,
        }
    }

    /// Box spanning `radius` pixels around a pixel position.
    #[must_use]
    pub fn around_pixel(host: &dyn ChartHost, panel: &Panel, at: Point, radius: f64) -> Self {
        Self {
            tick0: host.tick_from_pixel(at.x - radius) as f64,
            tick1: host.tick_from_pixel(at.x + radius) as f64,
            value0: host.value_from_pixel(panel, at.y - radius),
            value1: host.value_from_pixel(panel, at.y + radius),
        }
    }

    /// Box spanning `radius` pixels around a chart-space position.
    #[must_use]
    pub fn around_domain(host: &dyn ChartHost, panel: &Panel, tick: f64, value: f64, radius: f64) -> Self {
        let at = Point::new(host.pixel_from_tick(tick), host.pixel_from_value(panel, tick, value));
        Self::around_pixel(host, panel, at, radius)
    }

    #[must_use]
    pub fn to_pixels(self, host: &dyn ChartHost, panel: &Panel) -> PixelRect {
        let a = Point::new(
            host.pixel_from_tick(self.tick0),
            host.pixel_from_value(panel, self.tick0, self.value0),
        );
        let b = Point::new(
            host.pixel_from_tick(self.tick1),
            host.pixel_from_value(panel, self.tick1, self.value1),
        );
        PixelRect::from_corners(a, b)
    }
}

/// X where the line through `p0` and `p1` crosses height `y`.
///
/// Vertical lines return their x; horizontal lines never cross and yield NaN.
#[must_use]
pub fn x_intersection(p0: Point, p1: Point, y: f64) -> f64 {
    if p0.x == p1.x {
        return p0.x;
    }
    let slope = (p1.y - p0.y) / (p1.x - p0.x);
    if slope == 0.0 {
        return f64::NAN;
    }
    (y - p0.y) / slope + p0.x
}

/// Y of the line through `p0` and `p1` at `x`. Vertical lines yield NaN.
#[must_use]
pub fn y_intersection(p0: Point, p1: Point, x: f64) -> f64 {
    if p0.x == p1.x {
        return f64::NAN;
    }
    p0.y + (x - p0.x) * (p1.y - p0.y) / (p1.x - p0.x)
}

/// Parameter interval of the line `p0 + t * (p1 - p0)` that lies inside `rect`.
///
/// Horizontal and vertical kinds are not parametric and always return `None`;
/// use [`clip_to_rect`] for those.
#[must_use]
pub fn clip_parameters(rect: PixelRect, p0: Point, p1: Point, kind: LineKind) -> Option<(f64, f64)> {
    let (mut t0, mut t1) = match kind {
        LineKind::Segment => (0.0, 1.0),
        LineKind::Ray => (0.0, f64::INFINITY),
        LineKind::Line => (f64::NEG_INFINITY, f64::INFINITY),
        LineKind::Horizontal | LineKind::Vertical => return None,
    };
    let dx = p1.x - p0.x;
    let dy = p1.y - p0.y;
    if dx == 0.0 && dy == 0.0 {
        return rect.contains(p0).then_some((0.0, 0.0));
    }
    for (p, q) in [
        (-dx, p0.x - rect.left),
        (dx, rect.right - p0.x),
        (-dy, p0.y - rect.top),
        (dy, rect.bottom - p0.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    (t0 <= t1).then_some((t0, t1))
}

/// Visible piece of a line of the given kind inside `rect`.
#[must_use]
pub fn clip_to_rect(rect: PixelRect, p0: Point, p1: Point, kind: LineKind) -> Option<(Point, Point)> {
    match kind {
        LineKind::Horizontal => (p0.y >= rect.top && p0.y <= rect.bottom)
            .then(|| (Point::new(rect.left, p0.y), Point::new(rect.right, p0.y))),
        LineKind::Vertical => (p0.x >= rect.left && p0.x <= rect.right)
            .then(|| (Point::new(p0.x, rect.top), Point::new(p0.x, rect.bottom))),
        _ => {
            let (t0, t1) = clip_parameters(rect, p0, p1, kind)?;
            let at = |t: f64| Point::new(p0.x + t * (p1.x - p0.x), p0.y + t * (p1.y - p0.y));
            Some((at(t0), at(t1)))
        }
    }
}

/// Whether a line of the given kind touches `rect`.
#[must_use]
pub fn box_intersects(rect: PixelRect, p0: Point, p1: Point, kind: LineKind) -> bool {
    if !p0.is_finite() || !p1.is_finite() {
        return false;
    }
    match kind {
        LineKind::Horizontal => p0.y >= rect.top && p0.y <= rect.bottom,
        LineKind::Vertical => p0.x >= rect.left && p0.x <= rect.right,
        _ => clip_parameters(rect, p0, p1, kind).is_some(),
    }
}

/// Whether an anchor lies inside the hit box, compared in pixels.
#[must_use]
pub fn point_intersection(host: &dyn ChartHost, panel: &Panel, anchor: Anchor, hit_box: HitBox) -> bool {
    let rect = hit_box.to_pixels(host, panel);
    rect.contains(host.anchor_to_pixel(panel, anchor))
}

/// Whether the line through two chart-space points touches the hit box.
#[must_use]
pub fn line_intersection(
    host: &dyn ChartHost,
    panel: &Panel,
    hit_box: HitBox,
    kind: LineKind,
    a0: (f64, f64),
    a1: (f64, f64),
) -> bool {
    let p0 = Point::new(host.pixel_from_tick(a0.0), host.pixel_from_value(panel, a0.0, a0.1));
    let p1 = Point::new(host.pixel_from_tick(a1.0), host.pixel_from_value(panel, a1.0, a1.1));
    box_intersects(hit_box.to_pixels(host, panel), p0, p1, kind)
}

/// Same as [`line_intersection`] for points already in pixel space.
#[must_use]
pub fn pixel_line_intersection(
    host: &dyn ChartHost,
    panel: &Panel,
    hit_box: HitBox,
    kind: LineKind,
    p0: Point,
    p1: Point,
) -> bool {
    box_intersects(hit_box.to_pixels(host, panel), p0, p1, kind)
}

#[cfg(test)]
mod tests {
    use super::{LineKind, PixelRect, box_intersects, clip_to_rect, x_intersection};
    use crate::core::types::Point;

    fn unit_box() -> PixelRect {
        PixelRect::from_corners(Point::new(0.0, 0.0), Point::new(10.0, 10.0))
    }

    #[test]
    fn segment_short_of_box_misses_but_ray_hits() {
        let p0 = Point::new(-20.0, 5.0);
        let p1 = Point::new(-10.0, 5.0);
        assert!(!box_intersects(unit_box(), p0, p1, LineKind::Segment));
        assert!(box_intersects(unit_box(), p0, p1, LineKind::Ray));
        assert!(!box_intersects(unit_box(), p1, p0, LineKind::Ray));
        assert!(box_intersects(unit_box(), p1, p0, LineKind::Line));
    }

    #[test]
    fn zero_size_box_still_intersects() {
        let rect = PixelRect::from_corners(Point::new(5.0, 5.0), Point::new(5.0, 5.0));
        assert!(box_intersects(rect, Point::new(0.0, 0.0), Point::new(10.0, 10.0), LineKind::Segment));
        assert!(!box_intersects(rect, Point::new(0.0, 1.0), Point::new(10.0, 11.0), LineKind::Segment));
    }

    #[test]
    fn degenerate_segment_is_a_point() {
        let p = Point::new(3.0, 3.0);
        assert!(box_intersects(unit_box(), p, p, LineKind::Segment));
        let outside = Point::new(30.0, 3.0);
        assert!(!box_intersects(unit_box(), outside, outside, LineKind::Line));
    }

    #[test]
    fn horizontal_and_vertical_use_first_point() {
        let p0 = Point::new(100.0, 4.0);
        assert!(box_intersects(unit_box(), p0, p0, LineKind::Horizontal));
        assert!(!box_intersects(unit_box(), p0, p0, LineKind::Vertical));
        let clipped = clip_to_rect(unit_box(), p0, p0, LineKind::Horizontal).expect("clip");
        assert_eq!(clipped, (Point::new(0.0, 4.0), Point::new(10.0, 4.0)));
    }

    #[test]
    fn line_clip_spans_the_box() {
        let (a, b) = clip_to_rect(unit_box(), Point::new(4.0, 4.0), Point::new(5.0, 5.0), LineKind::Line)
            .expect("clip");
        assert_eq!(a, Point::new(0.0, 0.0));
        assert_eq!(b, Point::new(10.0, 10.0));
    }

    #[test]
    fn x_intersection_handles_vertical_and_flat_lines() {
        assert_eq!(x_intersection(Point::new(2.0, 0.0), Point::new(2.0, 9.0), 5.0), 2.0);
        assert!(x_intersection(Point::new(0.0, 1.0), Point::new(9.0, 1.0), 5.0).is_nan());
        assert_eq!(x_intersection(Point::new(0.0, 0.0), Point::new(10.0, 20.0), 10.0), 5.0);
    }

    #[test]
    fn non_finite_points_never_intersect() {
        let nan = Point::new(f64::NAN, 1.0);
        assert!(!box_intersects(unit_box(), nan, Point::new(1.0, 1.0), LineKind::Segment));
    }
}
