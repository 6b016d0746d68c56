//! Stroke helpers shared by drawings: lines clipped to a panel, polylines,
//! splines, handles and axis labels.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::core::geometry::{LineKind, PixelRect, clip_to_rect};
use crate::core::host::HostTheme;
use crate::core::pane::Panel;
use crate::core::spline::spline_path;
use crate::core::types::Point;
use crate::error::DrawingResult;
use crate::render::context::DrawingContext;
use crate::render::primitives::{Color, LinePattern, TextAlign, TextBaseline};

/// Radius of anchor handles in pixels.
pub const HANDLE_RADIUS: f64 = 3.0;
const GLYPH_SIZE: f64 = 5.0;

/// Stroke parameters of one plotted line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub pattern: LinePattern,
    pub line_width: f64,
    pub opacity: f64,
}

impl LineStyle {
    #[must_use]
    pub const fn new(pattern: LinePattern, line_width: f64) -> Self {
        Self {
            pattern,
            line_width,
            opacity: 1.0,
        }
    }

    #[must_use]
    pub const fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    #[must_use]
    pub const fn with_pattern(mut self, pattern: LinePattern) -> Self {
        self.pattern = pattern;
        self
    }
}

impl Default for LineStyle {
    fn default() -> Self {
        Self::new(LinePattern::Solid, 1.0)
    }
}

/// Dash array for a line pattern at the given width.
#[must_use]
pub fn pattern_dash_array(pattern: LinePattern, line_width: f64) -> smallvec::SmallVec<[f64; 2]> {
    pattern.dash_array(line_width)
}

fn apply_line_style(ctx: &mut dyn DrawingContext, color: Color, style: LineStyle) {
    ctx.set_stroke_color(color);
    ctx.set_line_width(style.line_width);
    ctx.set_line_dash(&pattern_dash_array(style.pattern, style.line_width));
    ctx.set_global_alpha(style.opacity.clamp(0.0, 1.0));
}

/// Strokes a line of the given kind. Rays, lines and axis-parallel kinds
/// are clipped to the panel; a hidden pattern draws nothing.
pub fn plot_line(
    ctx: &mut dyn DrawingContext,
    panel: &Panel,
    p0: Point,
    p1: Point,
    color: Color,
    kind: LineKind,
    style: LineStyle,
) -> DrawingResult<()> {
    if style.pattern == LinePattern::None {
        return Ok(());
    }
    let (from, to) = match kind {
        LineKind::Segment => (p0, p1),
        _ => match clip_to_rect(PixelRect::of_panel(panel), p0, p1, kind) {
            Some(clipped) => clipped,
            None => return Ok(()),
        },
    };
    ctx.save();
    apply_line_style(ctx, color, style);
    ctx.begin_path();
    ctx.move_to(from.x, from.y);
    ctx.line_to(to.x, to.y);
    let result = ctx.stroke();
    ctx.restore();
    result
}

/// Strokes a polyline through `points`.
pub fn connect_the_dots(
    ctx: &mut dyn DrawingContext,
    points: &[Point],
    color: Color,
    style: LineStyle,
) -> DrawingResult<()> {
    if points.len() < 2 || style.pattern == LinePattern::None {
        return Ok(());
    }
    ctx.save();
    apply_line_style(ctx, color, style);
    ctx.begin_path();
    ctx.move_to(points[0].x, points[0].y);
    for point in &points[1..] {
        ctx.line_to(point.x, point.y);
    }
    let result = ctx.stroke();
    ctx.restore();
    result
}

/// Strokes a smooth curve through `points` with the given tension.
pub fn plot_spline(
    ctx: &mut dyn DrawingContext,
    points: &[Point],
    tension: f64,
    color: Color,
    style: LineStyle,
) -> DrawingResult<()> {
    if points.len() < 2 || style.pattern == LinePattern::None {
        return Ok(());
    }
    ctx.save();
    apply_line_style(ctx, color, style);
    ctx.begin_path();
    ctx.append_path(&spline_path(points, tension));
    let result = ctx.stroke();
    ctx.restore();
    result
}

/// Half circle around `centre` squeezed horizontally by `aspect`, the
/// chart's pixel slope, so it stays round in time/price units. The fill is
/// painted even when the stroke is hidden.
pub fn aspect_arc(
    ctx: &mut dyn DrawingContext,
    centre: Point,
    radius: f64,
    aspect: f64,
    anticlockwise: bool,
    stroke: Option<(Color, LineStyle)>,
    fill: (Color, f64),
) -> DrawingResult<()> {
    ctx.save();
    ctx.begin_path();
    ctx.scale(1.0 / aspect, 1.0);
    ctx.arc(centre.x * aspect, centre.y, radius, 0.0, PI, anticlockwise);
    let mut result = Ok(());
    if let Some((color, style)) = stroke.filter(|(_, style)| style.pattern != LinePattern::None) {
        apply_line_style(ctx, color, style);
        result = ctx.stroke();
    }
    if result.is_ok() {
        ctx.set_fill_color(fill.0);
        ctx.set_global_alpha(fill.1.clamp(0.0, 1.0));
        result = ctx.fill();
    }
    ctx.restore();
    result
}

/// Fills a closed polygon.
pub fn fill_polygon(ctx: &mut dyn DrawingContext, points: &[Point], color: Color, opacity: f64) -> DrawingResult<()> {
    let Some(first) = points.first() else {
        return Ok(());
    };
    ctx.save();
    ctx.set_fill_color(color);
    ctx.set_global_alpha(opacity.clamp(0.0, 1.0));
    ctx.begin_path();
    ctx.move_to(first.x, first.y);
    for point in &points[1..] {
        ctx.line_to(point.x, point.y);
    }
    ctx.close_path();
    let result = ctx.fill();
    ctx.restore();
    result
}

/// Anchor handle of `radius` pixels; filled with the highlight color when
/// `filled`.
pub fn little_circle(
    ctx: &mut dyn DrawingContext,
    theme: &HostTheme,
    at: Point,
    radius: f64,
    filled: bool,
) -> DrawingResult<()> {
    ctx.save();
    ctx.set_line_dash(&[]);
    ctx.set_line_width(1.0);
    ctx.set_fill_color(if filled {
        theme.highlight_color
    } else {
        theme.container_color
    });
    ctx.set_stroke_color(theme.highlight_color);
    ctx.begin_path();
    ctx.arc(at.x, at.y, radius, 0.0, 2.0 * PI, false);
    ctx.fill()?;
    let result = ctx.stroke();
    ctx.restore();
    result
}

/// Four-way arrow marking a whole-drawing move handle.
pub fn draw_mover(ctx: &mut dyn DrawingContext, theme: &HostTheme, at: Point, highlighted: bool) -> DrawingResult<()> {
    let s = GLYPH_SIZE;
    ctx.save();
    ctx.set_line_dash(&[]);
    ctx.set_line_width(if highlighted { 2.0 } else { 1.0 });
    ctx.set_stroke_color(theme.highlight_color);
    ctx.begin_path();
    ctx.move_to(at.x - s, at.y);
    ctx.line_to(at.x + s, at.y);
    ctx.move_to(at.x, at.y - s);
    ctx.line_to(at.x, at.y + s);
    for (dx, dy) in [(-1.0, 0.0), (1.0, 0.0), (0.0, -1.0), (0.0, 1.0)] {
        let tip = Point::new(at.x + dx * s, at.y + dy * s);
        let back = 2.0;
        ctx.move_to(tip.x - dx * back - dy * back, tip.y - dy * back - dx * back);
        ctx.line_to(tip.x, tip.y);
        ctx.line_to(tip.x - dx * back + dy * back, tip.y - dy * back + dx * back);
    }
    let result = ctx.stroke();
    ctx.restore();
    result
}

/// Diagonal double arrow marking a scale handle.
pub fn draw_resizer(ctx: &mut dyn DrawingContext, theme: &HostTheme, at: Point, highlighted: bool) -> DrawingResult<()> {
    let s = GLYPH_SIZE;
    ctx.save();
    ctx.set_line_dash(&[]);
    ctx.set_line_width(if highlighted { 2.0 } else { 1.0 });
    ctx.set_stroke_color(theme.highlight_color);
    ctx.begin_path();
    ctx.move_to(at.x - s, at.y + s);
    ctx.line_to(at.x + s, at.y - s);
    ctx.move_to(at.x + s - 3.0, at.y - s);
    ctx.line_to(at.x + s, at.y - s);
    ctx.line_to(at.x + s, at.y - s + 3.0);
    ctx.move_to(at.x - s, at.y + s - 3.0);
    ctx.line_to(at.x - s, at.y + s);
    ctx.line_to(at.x - s + 3.0, at.y + s);
    let result = ctx.stroke();
    ctx.restore();
    result
}

/// Three-quarter circular arrow marking a rotate handle.
pub fn draw_rotator(ctx: &mut dyn DrawingContext, theme: &HostTheme, at: Point, highlighted: bool) -> DrawingResult<()> {
    let s = GLYPH_SIZE;
    ctx.save();
    ctx.set_line_dash(&[]);
    ctx.set_line_width(if highlighted { 2.0 } else { 1.0 });
    ctx.set_stroke_color(theme.highlight_color);
    ctx.begin_path();
    ctx.arc(at.x, at.y, s, 0.0, 3.0 * FRAC_PI_2, false);
    ctx.move_to(at.x + 3.0, at.y - s - 2.0);
    ctx.line_to(at.x, at.y - s);
    ctx.line_to(at.x + 3.0, at.y - s + 2.0);
    let result = ctx.stroke();
    ctx.restore();
    result
}

/// Price label pinned to the right edge of the panel at height `y`.
pub fn axis_label(
    ctx: &mut dyn DrawingContext,
    panel: &Panel,
    theme: &HostTheme,
    text: &str,
    y: f64,
    background: Color,
) -> DrawingResult<()> {
    if y < panel.top() || y > panel.bottom() {
        return Ok(());
    }
    ctx.save();
    ctx.set_font(&theme.font);
    let width = ctx.measure_text(text) + 6.0;
    let height = theme.font.line_height();
    ctx.set_fill_color(background);
    ctx.fill_rect(panel.right() - width, y - height / 2.0, width, height)?;
    ctx.set_fill_color(theme.container_color);
    ctx.set_text_align(TextAlign::Right);
    ctx.set_text_baseline(TextBaseline::Middle);
    let result = ctx.fill_text(text, panel.right() - 3.0, y);
    ctx.restore();
    result
}

/// Date label pinned to the bottom edge of the panel, centred at `x`.
pub fn time_label(
    ctx: &mut dyn DrawingContext,
    panel: &Panel,
    theme: &HostTheme,
    text: &str,
    x: f64,
    background: Color,
) -> DrawingResult<()> {
    if x < panel.left() || x > panel.right() {
        return Ok(());
    }
    ctx.save();
    ctx.set_font(&theme.font);
    let width = ctx.measure_text(text) + 6.0;
    let height = theme.font.line_height();
    ctx.set_fill_color(background);
    ctx.fill_rect(x - width / 2.0, panel.bottom() - height, width, height)?;
    ctx.set_fill_color(theme.container_color);
    ctx.set_text_align(TextAlign::Center);
    ctx.set_text_baseline(TextBaseline::Middle);
    let result = ctx.fill_text(text, x, panel.bottom() - height / 2.0);
    ctx.restore();
    result
}

#[cfg(test)]
mod tests {
    use super::{LineStyle, aspect_arc, connect_the_dots, plot_line};
    use crate::core::geometry::LineKind;
    use crate::core::pane::Panel;
    use crate::core::scale::PriceAxis;
    use crate::core::types::{PathSegment, Point};
    use crate::render::primitives::{Color, LinePattern};
    use crate::render::recording::RecordingContext;

    fn panel() -> Panel {
        Panel::new("chart", 0.0, 100.0, PriceAxis::new(0.0, 100.0, 10.0, 0.0).expect("axis")).expect("panel")
    }

    #[test]
    fn rays_are_clipped_to_panel() {
        let mut ctx = RecordingContext::new();
        plot_line(
            &mut ctx,
            &panel(),
            Point::new(10.0, 50.0),
            Point::new(20.0, 50.0),
            Color::rgb(0.0, 0.0, 0.0),
            LineKind::Ray,
            LineStyle::default(),
        )
        .expect("plot");
        let stroke = ctx.strokes().next().expect("stroke");
        assert_eq!(stroke.segments[1], PathSegment::LineTo(Point::new(100.0, 50.0)));
        assert_eq!(ctx.save_depth(), 0);
    }

    #[test]
    fn hidden_pattern_draws_nothing() {
        let mut ctx = RecordingContext::new();
        let style = LineStyle::new(LinePattern::None, 1.0);
        plot_line(
            &mut ctx,
            &panel(),
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Color::rgb(0.0, 0.0, 0.0),
            LineKind::Segment,
            style,
        )
        .expect("plot");
        connect_the_dots(&mut ctx, &[Point::new(0.0, 0.0), Point::new(1.0, 1.0)], Color::rgb(0.0, 0.0, 0.0), style)
            .expect("dots");
        assert!(ctx.is_empty());
    }

    #[test]
    fn dashed_style_sets_dash_array() {
        let mut ctx = RecordingContext::new();
        plot_line(
            &mut ctx,
            &panel(),
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Color::rgb(0.0, 0.0, 0.0),
            LineKind::Segment,
            LineStyle::new(LinePattern::Dashed, 2.0),
        )
        .expect("plot");
        let stroke = ctx.strokes().next().expect("stroke");
        assert_eq!(stroke.dash.as_slice(), &[10.0, 10.0]);
    }

    #[test]
    fn aspect_arc_restores_the_transform() {
        let mut ctx = RecordingContext::new();
        let black = Color::rgb(0.0, 0.0, 0.0);
        aspect_arc(
            &mut ctx,
            Point::new(50.0, 50.0),
            20.0,
            0.5,
            false,
            Some((black, LineStyle::default())),
            (black, 0.1),
        )
        .expect("arc");
        assert_eq!(ctx.strokes().count(), 1);
        assert_eq!(ctx.fills().count(), 1);
        assert_eq!(ctx.save_depth(), 0);
    }
}
