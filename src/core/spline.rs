use crate::core::types::{PathSegment, Point};

/// Control points around `p1` for a cardinal-style spline through `p0, p1, p2`.
///
/// Returns `(before, after)`. Coincident points collapse both controls onto `p1`.
#[must_use]
pub fn control_points(p0: Point, p1: Point, p2: Point, tension: f64) -> (Point, Point) {
    let d01 = p0.distance_to(p1);
    let d12 = p1.distance_to(p2);
    let total = d01 + d12;
    if total == 0.0 || !total.is_finite() {
        return (p1, p1);
    }
    let fa = tension * d01 / total;
    let fb = tension * d12 / total;
    let before = Point::new(p1.x - fa * (p2.x - p0.x), p1.y - fa * (p2.y - p0.y));
    let after = Point::new(p1.x + fb * (p2.x - p0.x), p1.y + fb * (p2.y - p0.y));
    (before, after)
}

/// Smooth path through `points`: a quadratic into the first interior point,
/// cubics between interior points and a quadratic out of the last one.
///
/// Fewer than three points or a negative tension produce a polyline.
#[must_use]
pub fn spline_path(points: &[Point], tension: f64) -> Vec<PathSegment> {
    let Some(first) = points.first() else {
        return Vec::new();
    };
    let mut path = Vec::with_capacity(points.len());
    path.push(PathSegment::MoveTo(*first));
    if points.len() < 3 || tension < 0.0 {
        path.extend(points.iter().skip(1).copied().map(PathSegment::LineTo));
        return path;
    }

    let controls: Vec<(Point, Point)> = points
        .windows(3)
        .map(|w| control_points(w[0], w[1], w[2], tension))
        .collect();
    let n = points.len();
    path.push(PathSegment::QuadTo {
        control: controls[0].0,
        to: points[1],
    });
    for i in 2..n - 1 {
        path.push(PathSegment::CubicTo {
            control1: controls[i - 2].1,
            control2: controls[i - 1].0,
            to: points[i],
        });
    }
    path.push(PathSegment::QuadTo {
        control: controls[n - 3].1,
        to: points[n - 1],
    });
    path
}

#[cfg(test)]
mod tests {
    use super::{control_points, spline_path};
    use crate::core::types::{PathSegment, Point};

    #[test]
    fn short_or_untensioned_input_is_a_polyline() {
        let points = [Point::new(0.0, 0.0), Point::new(5.0, 5.0), Point::new(10.0, 0.0)];
        let path = spline_path(&points, -1.0);
        assert!(path.iter().skip(1).all(|s| matches!(s, PathSegment::LineTo(_))));
        assert_eq!(spline_path(&points[..2], 0.5).len(), 2);
        assert!(spline_path(&[], 0.5).is_empty());
    }

    #[test]
    fn three_points_give_two_quadratics() {
        let points = [Point::new(0.0, 0.0), Point::new(5.0, 5.0), Point::new(10.0, 0.0)];
        let path = spline_path(&points, 0.5);
        assert_eq!(path.len(), 3);
        assert!(matches!(path[1], PathSegment::QuadTo { to, .. } if to == points[1]));
        assert!(matches!(path[2], PathSegment::QuadTo { to, .. } if to == points[2]));
    }

    #[test]
    fn interior_points_use_cubics() {
        let points: Vec<Point> = (0..5).map(|i| Point::new(f64::from(i) * 10.0, f64::from(i % 2) * 10.0)).collect();
        let path = spline_path(&points, 0.5);
        let cubics = path.iter().filter(|s| matches!(s, PathSegment::CubicTo { .. })).count();
        assert_eq!(cubics, 2);
    }

    #[test]
    fn symmetric_controls_on_straight_line() {
        let (before, after) = control_points(Point::new(0.0, 0.0), Point::new(5.0, 0.0), Point::new(10.0, 0.0), 0.5);
        assert_eq!(before, Point::new(2.5, 0.0));
        assert_eq!(after, Point::new(7.5, 0.0));
    }
}
