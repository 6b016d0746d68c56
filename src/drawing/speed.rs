//! Speed resistance arcs and lines, Gann fan and time cycles.
//!
//! Each is defined by a trend from `p0` to `p1`; the derived rays are
//! recomputed from the anchors on every render and hit test.

use std::f64::consts::SQRT_2;

use tracing::trace;

use crate::core::geometry::{HitBox, LineKind, line_intersection, pixel_line_intersection, x_intersection};
use crate::core::host::ChartHost;
use crate::core::pane::Panel;
use crate::core::types::{Anchor, Point};
use crate::drawing::base::{DrawingBase, DrawingStyle};
use crate::drawing::descriptor::DrawingDescriptor;
use crate::drawing::kind::DrawingKind;
use crate::drawing::traits::{HitTestable, Renderable, Serializable};
use crate::drawing::two_point;
use crate::error::DrawingResult;
use crate::interaction::{AnchorSlot, Repositioner};
use crate::render::plot::{LineStyle, aspect_arc, fill_polygon, plot_line};
use crate::render::{Color, DrawingContext, TextAlign, TextBaseline};

const DEFAULT_OPACITY: f64 = 0.25;
const FILL_OPACITY: f64 = 0.1;
const GRID_OPACITY: f64 = 0.3;
const BAND_OPACITY: f64 = 0.05;
const LABEL_NUDGE: f64 = 5.0;
const CYCLE_LABEL_ROOM: f64 = 13.0;
const MAX_CYCLES: i64 = 10_000;

pub const SPEED_LINE_LEVELS: [(&str, f64); 5] = [("1", 1.0), ("2/3", 2.0 / 3.0), ("1/3", 1.0 / 3.0), ("3/2", 1.5), ("3", 3.0)];

pub const GANN_LEVELS: [(&str, f64); 9] = [
    ("1x1", 1.0),
    ("2x1", 2.0),
    ("3x1", 3.0),
    ("4x1", 4.0),
    ("8x1", 8.0),
    ("1x2", 0.5),
    ("1x3", 1.0 / 3.0),
    ("1x4", 0.25),
    ("1x8", 0.125),
];

/// A fan ray from `p0`, with where its label goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FanRay {
    pub label: &'static str,
    pub level: f64,
    pub end: Point,
    /// Crossing with the `p1` grid: a y for levels up to 1, an x beyond.
    pub grid: f64,
    pub label_at: Point,
}

fn trend_style(base: &DrawingBase) -> LineStyle {
    let opacity = if base.highlighted.is_active() { 1.0 } else { DEFAULT_OPACITY };
    base.line_style().with_opacity(opacity)
}

fn draw_text(
    ctx: &mut dyn DrawingContext,
    host: &dyn ChartHost,
    text: &str,
    at: Point,
    (align, baseline): (TextAlign, TextBaseline),
    color: Color,
) -> DrawingResult<()> {
    ctx.save();
    ctx.set_font(&host.theme().font);
    ctx.set_fill_color(color);
    ctx.set_text_align(align);
    ctx.set_text_baseline(baseline);
    let result = ctx.fill_text(text, at.x, at.y);
    ctx.restore();
    result
}

fn far_edge(panel: &Panel, a: Point, b: Point) -> f64 {
    if b.x > a.x { panel.right() } else { panel.left() }
}

/// Speed resistance lines. Levels above 1 only appear with `extension`; with
/// `confine_to_grid` rays stop at the `p0`-`p1` box instead of the panel edge.
#[must_use]
pub fn speed_rays(
    host: &dyn ChartHost,
    panel: &Panel,
    (p0, p1): (Anchor, Anchor),
    extension: bool,
    confine_to_grid: bool,
) -> Vec<FanRay> {
    let a = host.anchor_to_pixel(panel, p0);
    let b = host.anchor_to_pixel(panel, p1);
    if a.x == b.x {
        return Vec::new();
    }
    let nudge_x = if a.x > b.x { LABEL_NUDGE } else { -LABEL_NUDGE };
    let nudge_y = if a.y > b.y { -LABEL_NUDGE } else { LABEL_NUDGE };
    SPEED_LINE_LEVELS
        .iter()
        .filter(|(_, level)| *level <= 1.0 || extension)
        .map(|&(label, level)| {
            let y = host.pixel_from_value(panel, p0.tick_f64(), p0.value - (p0.value - p1.value) * level);
            let (grid, mut end, label_at) = if level > 1.0 {
                let x = x_intersection(a, Point::new(b.x, y), b.y);
                let nudge = if confine_to_grid { 0.0 } else { nudge_x };
                (x, Point::new(x, b.y), Point::new(x + nudge, b.y))
            } else {
                let nudge = if confine_to_grid { 0.0 } else { nudge_y };
                (y, Point::new(b.x, y), Point::new(b.x, y + nudge))
            };
            if !confine_to_grid {
                let far_x = far_edge(panel, a, b);
                end = Point::new(far_x, (far_x - a.x) * (y - a.y) / (b.x - a.x) + a.y);
            }
            FanRay {
                label,
                level,
                end,
                grid,
                label_at,
            }
        })
        .collect()
}

/// Gann fan rays at the slopes of [`GANN_LEVELS`], extended to the panel edge.
#[must_use]
pub fn gann_rays(host: &dyn ChartHost, panel: &Panel, (p0, p1): (Anchor, Anchor)) -> Vec<FanRay> {
    let a = host.anchor_to_pixel(panel, p0);
    let b = host.anchor_to_pixel(panel, p1);
    if a.x == b.x {
        return Vec::new();
    }
    let far_x = far_edge(panel, a, b);
    let nudge_x = if a.x > b.x { LABEL_NUDGE } else { -LABEL_NUDGE };
    let nudge_y = if a.y > b.y { LABEL_NUDGE } else { -LABEL_NUDGE };
    GANN_LEVELS
        .iter()
        .map(|&(label, level)| {
            let x = a.x + (b.x - a.x) / level;
            let y = a.y - level * (a.y - b.y);
            let label_at = if level > 1.0 {
                Point::new(x + nudge_x, b.y)
            } else {
                Point::new(b.x, y + nudge_y)
            };
            FanRay {
                label,
                level,
                end: Point::new(far_x, (far_x - a.x) * (y - a.y) / (b.x - a.x) + a.y),
                grid: if level > 1.0 { x } else { y },
                label_at,
            }
        })
        .collect()
}

/// Paints fan rays from `a` with the fill between each ray and the unit ray.
fn paint_fan(
    ctx: &mut dyn DrawingContext,
    base: &DrawingBase,
    host: &dyn ChartHost,
    a: Point,
    rays: &[FanRay],
    labels: (TextAlign, TextBaseline),
    label_unit: bool,
) -> DrawingResult<()> {
    let Some(panel) = base.panel(host) else {
        return Ok(());
    };
    let color = base.line_color(host);
    let fill = base.fill_or_default(host);
    let text = base.text_color(host);
    let style = trend_style(base);
    let unit = rays.iter().find(|ray| ray.level == 1.0).map(|ray| ray.end);
    for ray in rays {
        if ray.level != 1.0 || label_unit {
            draw_text(ctx, host, ray.label, ray.label_at, labels, text)?;
        }
        plot_line(ctx, panel, a, ray.end, color, LineKind::Segment, style)?;
        if let Some(unit) = unit {
            fill_polygon(ctx, &[ray.end, a, unit], fill, FILL_OPACITY)?;
        }
    }
    Ok(())
}

/// Speed resistance arcs at one and two thirds of the trend height.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedArc {
    base: DrawingBase,
}

impl SpeedArc {
    #[must_use]
    pub fn new(panel_name: impl Into<String>, style: DrawingStyle) -> Self {
        Self {
            base: DrawingBase::new(DrawingKind::SpeedArc, panel_name, style),
        }
    }
}

impl_anchored!(SpeedArc);
two_point_interactive!(SpeedArc);

impl Renderable for SpeedArc {
    fn render(&mut self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> DrawingResult<()> {
        let (Some(panel), Some((p0, p1))) = (self.base.panel(host), self.base.pair()) else {
            return Ok(());
        };
        let a = host.anchor_to_pixel(panel, p0);
        let b = host.anchor_to_pixel(panel, p1);
        let up = b.y < a.y;
        let factor = ((b.y - a.y) / (b.x - a.x)).abs();
        let color = self.base.line_color(host);
        let fill = self.base.fill_or_default(host);
        let style = trend_style(&self.base);

        if factor.is_finite() && factor > 0.0 {
            for step in 1..3 {
                let radius = (p1.value - p0.value).abs() * SQRT_2 * f64::from(step) / 3.0;
                let value = p1.value + if up { -radius } else { radius };
                let y = host.pixel_from_value(panel, p0.tick_f64(), value);
                aspect_arc(ctx, b, (y - b.y).abs(), factor, !up, Some((color, style)), (fill, FILL_OPACITY))?;
                let label = Point::new(b.x, (y - LABEL_NUDGE).round());
                draw_text(ctx, host, &format!("{step}/3"), label, (TextAlign::Center, TextBaseline::Alphabetic), color)?;
            }
        } else {
            trace!(kind = %self.base.kind(), "flat or vertical trend; arcs skipped");
        }
        plot_line(ctx, panel, a, b, color, LineKind::Segment, style)?;
        self.base
            .render_handles(ctx, host, &[(AnchorSlot::P0, a), (AnchorSlot::P1, b)])
    }
}

impl HitTestable for SpeedArc {
    fn intersected(
        &mut self,
        host: &dyn ChartHost,
        tick: i64,
        value: f64,
        hit_box: HitBox,
    ) -> Option<Repositioner> {
        if let Some(hit) = two_point::intersected(&mut self.base, host, tick, value, hit_box, LineKind::Segment) {
            return Some(hit);
        }
        let (p0, p1) = self.base.pair()?;
        // Box circumscribing the arcs.
        let left = p1.tick - (p0.tick - p1.tick);
        let right = p0.tick;
        let (low, high) = (p0.value.min(p1.value), p0.value.max(p1.value));
        let inside = tick >= left.min(right) && tick <= left.max(right) && value >= low && value <= high;
        inside.then(|| self.base.begin_move(tick, value))
    }
}

impl Serializable for SpeedArc {
    fn serialize(&self) -> DrawingDescriptor {
        two_point::serialize(&self.base)
    }

    fn reconstruct(host: &dyn ChartHost, desc: &DrawingDescriptor) -> DrawingResult<Self> {
        Ok(Self {
            base: two_point::reconstruct(DrawingKind::SpeedArc, host, desc)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeedLine {
    base: DrawingBase,
    extension: bool,
    confine_to_grid: bool,
}

impl SpeedLine {
    #[must_use]
    pub fn new(panel_name: impl Into<String>, style: DrawingStyle, extension: bool, confine_to_grid: bool) -> Self {
        Self {
            base: DrawingBase::new(DrawingKind::SpeedLine, panel_name, style),
            extension,
            confine_to_grid,
        }
    }

    #[must_use]
    pub fn extension(&self) -> bool {
        self.extension
    }

    #[must_use]
    pub fn confine_to_grid(&self) -> bool {
        self.confine_to_grid
    }

    fn paint_grid(&self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost, a: Point, b: Point, rays: &[FanRay]) -> DrawingResult<()> {
        ctx.save();
        ctx.set_stroke_color(self.base.line_color(host));
        ctx.set_line_width(self.base.style.line_width);
        ctx.set_global_alpha(GRID_OPACITY);
        ctx.begin_path();
        ctx.rect(a.x, a.y, b.x - a.x, b.y - a.y);
        for ray in rays {
            if ray.level < 1.0 {
                ctx.move_to(a.x, ray.grid);
                ctx.line_to(b.x, ray.grid);
            } else if ray.level > 1.0 {
                ctx.move_to(ray.grid, a.y);
                ctx.line_to(ray.grid, b.y);
            }
        }
        let result = ctx.stroke();
        ctx.restore();
        result
    }
}

impl_anchored!(SpeedLine);
two_point_interactive!(SpeedLine);

impl Renderable for SpeedLine {
    fn render(&mut self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> DrawingResult<()> {
        let (Some(panel), Some(pair)) = (self.base.panel(host), self.base.pair()) else {
            return Ok(());
        };
        let a = host.anchor_to_pixel(panel, pair.0);
        let b = host.anchor_to_pixel(panel, pair.1);
        let rays = speed_rays(host, panel, pair, self.extension, self.confine_to_grid);
        let align = if a.x > b.x { TextAlign::Right } else { TextAlign::Left };
        let baseline = if a.y > b.y { TextBaseline::Bottom } else { TextBaseline::Top };
        paint_fan(ctx, &self.base, host, a, &rays, (align, baseline), self.extension)?;
        if self.confine_to_grid {
            self.paint_grid(ctx, host, a, b, &rays)?;
        }
        self.base
            .render_handles(ctx, host, &[(AnchorSlot::P0, a), (AnchorSlot::P1, b)])
    }
}

impl HitTestable for SpeedLine {
    fn intersected(
        &mut self,
        host: &dyn ChartHost,
        tick: i64,
        value: f64,
        hit_box: HitBox,
    ) -> Option<Repositioner> {
        let panel = self.base.panel(host)?;
        let pair = self.base.pair()?;
        if let Some(hit) = self.base.hit_handles(host, panel, hit_box, &two_point::SLOTS, tick, value) {
            return Some(hit);
        }
        let a = host.anchor_to_pixel(panel, pair.0);
        let hit = speed_rays(host, panel, pair, self.extension, self.confine_to_grid)
            .iter()
            .any(|ray| pixel_line_intersection(host, panel, hit_box, LineKind::Ray, a, ray.end));
        hit.then(|| self.base.begin_move(tick, value))
    }
}

impl Serializable for SpeedLine {
    fn serialize(&self) -> DrawingDescriptor {
        let mut desc = two_point::serialize(&self.base);
        desc.ext = Some(self.extension);
        desc.grid = Some(self.confine_to_grid);
        desc
    }

    fn reconstruct(host: &dyn ChartHost, desc: &DrawingDescriptor) -> DrawingResult<Self> {
        Ok(Self {
            base: two_point::reconstruct(DrawingKind::SpeedLine, host, desc)?,
            extension: desc.ext.unwrap_or(false),
            confine_to_grid: desc.grid.unwrap_or(false),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GannFan {
    base: DrawingBase,
}

impl GannFan {
    #[must_use]
    pub fn new(panel_name: impl Into<String>, style: DrawingStyle) -> Self {
        Self {
            base: DrawingBase::new(DrawingKind::GannFan, panel_name, style),
        }
    }
}

impl_anchored!(GannFan);
two_point_interactive!(GannFan);

impl Renderable for GannFan {
    fn render(&mut self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> DrawingResult<()> {
        let (Some(panel), Some(pair)) = (self.base.panel(host), self.base.pair()) else {
            return Ok(());
        };
        let a = host.anchor_to_pixel(panel, pair.0);
        let b = host.anchor_to_pixel(panel, pair.1);
        let rays = gann_rays(host, panel, pair);
        let align = if a.x > b.x { TextAlign::Left } else { TextAlign::Right };
        let baseline = if a.y > b.y { TextBaseline::Top } else { TextBaseline::Bottom };
        paint_fan(ctx, &self.base, host, a, &rays, (align, baseline), true)?;
        self.base
            .render_handles(ctx, host, &[(AnchorSlot::P0, a), (AnchorSlot::P1, b)])
    }
}

impl HitTestable for GannFan {
    fn intersected(
        &mut self,
        host: &dyn ChartHost,
        tick: i64,
        value: f64,
        hit_box: HitBox,
    ) -> Option<Repositioner> {
        let panel = self.base.panel(host)?;
        let pair = self.base.pair()?;
        if let Some(hit) = self.base.hit_handles(host, panel, hit_box, &two_point::SLOTS, tick, value) {
            return Some(hit);
        }
        let a = host.anchor_to_pixel(panel, pair.0);
        let hit = gann_rays(host, panel, pair)
            .iter()
            .any(|ray| pixel_line_intersection(host, panel, hit_box, LineKind::Ray, a, ray.end));
        hit.then(|| self.base.begin_move(tick, value))
    }
}

impl Serializable for GannFan {
    fn serialize(&self) -> DrawingDescriptor {
        two_point::serialize(&self.base)
    }

    fn reconstruct(host: &dyn ChartHost, desc: &DrawingDescriptor) -> DrawingResult<Self> {
        Ok(Self {
            base: two_point::reconstruct(DrawingKind::GannFan, host, desc)?,
        })
    }
}

/// Cycle boundaries: every multiple of the `p0`-`p1` tick distance that
/// falls inside the panel, as `(cycle number, pixel x)`. Cycle numbers
/// start at 1 for `p0`.
#[must_use]
pub fn cycle_lines(host: &dyn ChartHost, panel: &Panel, p0: Anchor, p1: Anchor) -> Vec<(i64, f64)> {
    let span = p1.tick - p0.tick;
    let forward = p1.tick > p0.tick;
    let mut lines = Vec::new();
    for count in 0..MAX_CYCLES {
        let Some(tick) = count.checked_mul(span).and_then(|offset| p0.tick.checked_add(offset)) else {
            break;
        };
        let x = host.pixel_from_tick(tick as f64);
        if (forward && x > panel.right()) || (span < 0 && x < panel.left()) {
            break;
        }
        if x >= panel.left() && x <= panel.right() {
            lines.push((count + 1, x));
        }
        if span == 0 {
            break;
        }
    }
    lines
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeCycle {
    base: DrawingBase,
}

impl TimeCycle {
    #[must_use]
    pub fn new(panel_name: impl Into<String>, style: DrawingStyle) -> Self {
        Self {
            base: DrawingBase::new(DrawingKind::TimeCycle, panel_name, style),
        }
    }
}

impl_anchored!(TimeCycle);
two_point_interactive!(TimeCycle);

impl Renderable for TimeCycle {
    fn render(&mut self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> DrawingResult<()> {
        let (Some(panel), Some((p0, p1))) = (self.base.panel(host), self.base.pair()) else {
            return Ok(());
        };
        let a = host.anchor_to_pixel(panel, p0);
        let b = host.anchor_to_pixel(panel, p1);
        let color = self.base.line_color(host);
        let text = self.base.text_color(host);
        let fill = self.base.fill_or_default(host);
        let style = trend_style(&self.base);
        let top = panel.top();
        let far_y = panel.bottom() - CYCLE_LABEL_ROOM;
        let lines = cycle_lines(host, panel, p0, p1);

        for &(_, x) in &lines {
            let band = [Point::new(a.x, top), Point::new(x, top), Point::new(x, far_y), Point::new(a.x, far_y)];
            fill_polygon(ctx, &band, fill, BAND_OPACITY)?;
        }
        // Labels that do not fit the bar spacing borrow room from skipped neighbours.
        let candle_width = host.layout().candle_width();
        let mut slack = 0.0;
        for &(count, x) in &lines {
            plot_line(ctx, panel, Point::new(x, top), Point::new(x, far_y), color, LineKind::Segment, style)?;
            let label = count.to_string();
            ctx.save();
            ctx.set_font(&host.theme().font);
            let width = ctx.measure_text(&label) + 3.0;
            ctx.restore();
            if width < candle_width + slack {
                let at = Point::new(x, far_y + 7.0);
                draw_text(ctx, host, &label, at, (TextAlign::Center, TextBaseline::Middle), text)?;
                slack = 0.0;
            } else {
                slack += candle_width;
            }
        }
        plot_line(ctx, panel, a, b, color, LineKind::Segment, style)?;

        if self.base.highlighted.is_active() {
            return self
                .base
                .render_handles(ctx, host, &[(AnchorSlot::P0, a), (AnchorSlot::P1, b)]);
        }
        let centre = host.value_from_pixel(panel, (panel.top() + panel.bottom()) / 2.0);
        self.base.set_point(host, AnchorSlot::P0, p0.tick, centre);
        self.base.set_point(host, AnchorSlot::P1, p1.tick, centre);
        Ok(())
    }
}

impl HitTestable for TimeCycle {
    fn intersected(
        &mut self,
        host: &dyn ChartHost,
        tick: i64,
        value: f64,
        hit_box: HitBox,
    ) -> Option<Repositioner> {
        let panel = self.base.panel(host)?;
        let (p0, p1) = self.base.pair()?;
        if let Some(hit) = self.base.hit_handles(host, panel, hit_box, &two_point::SLOTS, tick, value) {
            return Some(hit);
        }
        let on_trend = line_intersection(
            host,
            panel,
            hit_box,
            LineKind::Segment,
            (p0.tick_f64(), p0.value),
            (p1.tick_f64(), p1.value),
        );
        let on_first = hit_box.tick0 <= p0.tick_f64() && hit_box.tick1 >= p0.tick_f64();
        (on_trend || on_first).then(|| self.base.begin_move(tick, value))
    }
}

impl Serializable for TimeCycle {
    fn serialize(&self) -> DrawingDescriptor {
        two_point::serialize(&self.base)
    }

    fn reconstruct(host: &dyn ChartHost, desc: &DrawingDescriptor) -> DrawingResult<Self> {
        Ok(Self {
            base: two_point::reconstruct(DrawingKind::TimeCycle, host, desc)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::{GannFan, SpeedArc, SpeedLine, TimeCycle, cycle_lines, gann_rays, speed_rays};
    use crate::core::geometry::HitBox;
    use crate::core::host::ChartHost;
    use crate::core::types::Anchor;
    use crate::drawing::base::DrawingStyle;
    use crate::drawing::traits::{Anchored, HitTestable, Interactive, Renderable, Serializable};
    use crate::interaction::{AnchorSlot, RepositionAction};
    use crate::render::RecordingContext;
    use crate::test_support::daily_host;

    fn trend() -> (Anchor, Anchor) {
        (Anchor::new(10, 100.0), Anchor::new(20, 130.0))
    }

    #[test]
    fn speed_lines_divide_the_trend_height() {
        let host = daily_host(40);
        let panel = host.panel("chart").expect("panel");
        let rays = speed_rays(&host, panel, trend(), false, true);
        let levels: Vec<&str> = rays.iter().map(|ray| ray.label).collect();
        assert_eq!(levels, vec!["1", "2/3", "1/3"]);
        assert_relative_eq!(rays[0].end.y, 70.0);
        assert_relative_eq!(rays[1].end.y, 80.0);
        assert_relative_eq!(rays[2].end.y, 90.0);
        assert!(rays.iter().all(|ray| (ray.end.x - 205.0).abs() < 1e-9));
    }

    #[test]
    fn extension_adds_steeper_rays() {
        let host = daily_host(40);
        let panel = host.panel("chart").expect("panel");
        let rays = speed_rays(&host, panel, trend(), true, true);
        assert_eq!(rays.len(), 5);
        let triple = rays.iter().find(|ray| ray.label == "3").expect("3");
        assert_relative_eq!(triple.grid, 105.0 + 100.0 / 3.0);

        let unconfined = speed_rays(&host, panel, trend(), true, false);
        assert!(unconfined.iter().all(|ray| (ray.end.x - panel.right()).abs() < 1e-9));
    }

    #[test]
    fn gann_rays_reach_the_panel_edge() {
        let host = daily_host(40);
        let panel = host.panel("chart").expect("panel");
        let rays = gann_rays(&host, panel, trend());
        assert_eq!(rays.len(), 9);
        let unit = rays[0];
        assert_eq!(unit.label, "1x1");
        assert_relative_eq!(unit.end.x, 500.0);
        assert_relative_eq!(unit.end.y, 100.0 - 0.3 * 395.0);
        assert!(gann_rays(&host, panel, (Anchor::new(10, 100.0), Anchor::new(10, 120.0))).is_empty());
    }

    #[test]
    fn speed_arc_paints_two_arcs_and_the_trend() {
        let host = daily_host(40);
        let mut arc = SpeedArc::new("chart", DrawingStyle::default());
        arc.click(&host, 10, 100.0);
        arc.click(&host, 20, 130.0);
        let mut ctx = RecordingContext::new();
        arc.render(&mut ctx, &host).expect("render");
        assert_eq!(ctx.strokes().count(), 3);
        assert_eq!(ctx.texts().count(), 2);
        let inside = arc
            .intersected(&host, 25, 120.0, HitBox::new(24.5, 25.5, 121.0, 119.0))
            .expect("inside box");
        assert_eq!(inside.action, RepositionAction::Move);
    }

    #[test]
    fn speed_line_persists_options() {
        let host = daily_host(40);
        let mut line = SpeedLine::new("chart", DrawingStyle::default(), true, false);
        line.click(&host, 10, 100.0);
        line.click(&host, 20, 130.0);
        let restored = SpeedLine::reconstruct(&host, &line.serialize()).expect("reconstruct");
        assert!(restored.extension());
        assert!(!restored.confine_to_grid());
        assert_eq!(restored.base().anchors(), line.base().anchors());
    }

    #[test]
    fn gann_fan_hits_its_rays() {
        let host = daily_host(40);
        let mut fan = GannFan::new("chart", DrawingStyle::default());
        fan.click(&host, 10, 100.0);
        fan.click(&host, 20, 130.0);
        // The 1x1 ray passes through (30, 160).
        let hit = fan
            .intersected(&host, 30, 160.0, HitBox::new(29.5, 30.5, 161.0, 159.0))
            .expect("ray");
        assert_eq!(hit.action, RepositionAction::Move);
    }

    #[test]
    fn cycles_repeat_until_the_edge() {
        let host = daily_host(40);
        let panel = host.panel("chart").expect("panel");
        let lines = cycle_lines(&host, panel, Anchor::new(5, 100.0), Anchor::new(15, 100.0));
        let numbers: Vec<i64> = lines.iter().map(|&(count, _)| count).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert_eq!(cycle_lines(&host, panel, Anchor::new(5, 100.0), Anchor::new(5, 90.0)).len(), 1);
    }

    #[test]
    fn time_cycle_recentres_its_anchors() {
        let host = daily_host(40);
        let mut cycle = TimeCycle::new("chart", DrawingStyle::default());
        cycle.click(&host, 5, 170.0);
        cycle.click(&host, 15, 170.0);
        let mut ctx = RecordingContext::new();
        cycle.render(&mut ctx, &host).expect("render");
        let p1 = cycle.base().anchor(AnchorSlot::P1).expect("p1");
        assert_relative_eq!(p1.value, 100.0);
        assert_eq!(ctx.strokes().count(), 6);
    }
}
