use smallvec::SmallVec;

use crate::core::types::{PathSegment, Point};
use crate::error::DrawingResult;
use crate::render::primitives::{Color, FontSpec, TextAlign, TextBaseline};

/// Affine transform `[a c e; b d f]`, applied as `x' = a*x + c*y + e`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    /// `self` followed by `next` in user space (canvas post-multiplication).
    #[must_use]
    pub fn then(self, next: Self) -> Self {
        Self {
            a: self.a * next.a + self.c * next.b,
            b: self.b * next.a + self.d * next.b,
            c: self.a * next.c + self.c * next.d,
            d: self.b * next.c + self.d * next.d,
            e: self.a * next.e + self.c * next.f + self.e,
            f: self.b * next.e + self.d * next.f + self.f,
        }
    }

    #[must_use]
    pub fn translation(dx: f64, dy: f64) -> Self {
        Self {
            e: dx,
            f: dy,
            ..Self::IDENTITY
        }
    }

    #[must_use]
    pub fn rotation(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    #[must_use]
    pub fn scaling(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::IDENTITY
        }
    }

    #[must_use]
    pub fn apply(self, point: Point) -> Point {
        Point::new(
            self.a * point.x + self.c * point.y + self.e,
            self.b * point.x + self.d * point.y + self.f,
        )
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Graphics state saved and restored by [`DrawingContext::save`] and
/// [`DrawingContext::restore`].
#[derive(Debug, Clone, PartialEq)]
pub struct ContextState {
    pub stroke_color: Color,
    pub fill_color: Color,
    pub line_width: f64,
    pub line_dash: SmallVec<[f64; 2]>,
    pub global_alpha: f64,
    pub font: FontSpec,
    pub text_align: TextAlign,
    pub text_baseline: TextBaseline,
    pub transform: Transform,
}

impl Default for ContextState {
    fn default() -> Self {
        Self {
            stroke_color: Color::rgb(0.0, 0.0, 0.0),
            fill_color: Color::rgb(0.0, 0.0, 0.0),
            line_width: 1.0,
            line_dash: SmallVec::new(),
            global_alpha: 1.0,
            font: FontSpec::default(),
            text_align: TextAlign::default(),
            text_baseline: TextBaseline::default(),
            transform: Transform::IDENTITY,
        }
    }
}

/// Immediate-mode 2D surface drawings paint on.
///
/// Path building is infallible; painting operations report backend failures.
pub trait DrawingContext {
    fn state(&self) -> &ContextState;

    fn state_mut(&mut self) -> &mut ContextState;

    fn save(&mut self);

    fn restore(&mut self);

    fn begin_path(&mut self);

    fn push_segment(&mut self, segment: PathSegment);

    fn stroke(&mut self) -> DrawingResult<()>;

    fn fill(&mut self) -> DrawingResult<()>;

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> DrawingResult<()>;

    /// Advance width of `text` in the current font.
    fn measure_text(&mut self, text: &str) -> f64;

    fn set_stroke_color(&mut self, color: Color) {
        self.state_mut().stroke_color = color;
    }

    fn set_fill_color(&mut self, color: Color) {
        self.state_mut().fill_color = color;
    }

    fn set_line_width(&mut self, width: f64) {
        if width.is_finite() && width > 0.0 {
            self.state_mut().line_width = width;
        }
    }

    fn set_line_dash(&mut self, dashes: &[f64]) {
        self.state_mut().line_dash = dashes.iter().copied().collect();
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        if (0.0..=1.0).contains(&alpha) {
            self.state_mut().global_alpha = alpha;
        }
    }

    fn set_font(&mut self, font: &FontSpec) {
        self.state_mut().font = font.clone();
    }

    fn set_text_align(&mut self, align: TextAlign) {
        self.state_mut().text_align = align;
    }

    fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.state_mut().text_baseline = baseline;
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        let state = self.state_mut();
        state.transform = state.transform.then(Transform::translation(dx, dy));
    }

    fn rotate(&mut self, angle: f64) {
        let state = self.state_mut();
        state.transform = state.transform.then(Transform::rotation(angle));
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        let state = self.state_mut();
        state.transform = state.transform.then(Transform::scaling(sx, sy));
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.push_segment(PathSegment::MoveTo(Point::new(x, y)));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.push_segment(PathSegment::LineTo(Point::new(x, y)));
    }

    fn quadratic_curve_to(&mut self, cx: f64, cy: f64, x: f64, y: f64) {
        self.push_segment(PathSegment::QuadTo {
            control: Point::new(cx, cy),
            to: Point::new(x, y),
        });
    }

    fn bezier_curve_to(&mut self, c1x: f64, c1y: f64, c2x: f64, c2y: f64, x: f64, y: f64) {
        self.push_segment(PathSegment::CubicTo {
            control1: Point::new(c1x, c1y),
            control2: Point::new(c2x, c2y),
            to: Point::new(x, y),
        });
    }

    fn arc(&mut self, cx: f64, cy: f64, radius: f64, start: f64, end: f64, anticlockwise: bool) {
        self.push_segment(PathSegment::Arc {
            center: Point::new(cx, cy),
            radius,
            start,
            end,
            anticlockwise,
        });
    }

    fn close_path(&mut self) {
        self.push_segment(PathSegment::Close);
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.move_to(x, y);
        self.line_to(x + width, y);
        self.line_to(x + width, y + height);
        self.line_to(x, y + height);
        self.close_path();
    }

    fn append_path(&mut self, path: &[PathSegment]) {
        for segment in path {
            self.push_segment(*segment);
        }
    }

    /// Fills a rectangle as a path of its own. The current path is discarded.
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) -> DrawingResult<()> {
        self.save();
        self.begin_path();
        self.rect(x, y, width, height);
        let result = self.fill();
        self.restore();
        result
    }
}
