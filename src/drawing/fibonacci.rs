//! Fibonacci projection, arc, fan and time zone tools.
//!
//! All four share [`FibParameters`]: the level table, the trend line style,
//! label options and the time-zone line style. Level geometry comes from the
//! free functions below so rendering and hit testing agree.

use std::f64::consts::SQRT_2;

use tracing::{debug, trace};

use crate::core::geometry::{HitBox, LineKind, line_intersection, pixel_line_intersection, x_intersection, y_intersection};
use crate::core::host::ChartHost;
use crate::core::pane::Panel;
use crate::core::primitives::format_fixed;
use crate::core::types::{Anchor, Point};
use crate::drawing::base::{DrawingBase, DrawingStyle};
use crate::drawing::descriptor::DrawingDescriptor;
use crate::drawing::kind::DrawingKind;
use crate::drawing::params::{FibParameters, LineParameters};
use crate::drawing::traits::{HitTestable, Interactive, Renderable, Serializable};
use crate::drawing::two_point;
use crate::error::DrawingResult;
use crate::interaction::{AnchorSlot, ClickOutcome, Repositioner};
use crate::render::plot::{LineStyle, aspect_arc, axis_label, fill_polygon, plot_line};
use crate::render::{Color, DrawingContext, LinePattern, TextAlign, TextBaseline, cascade_color};

pub const PROJECTION_LEVELS: [f64; 7] = [0.0, 0.618, 1.0, 1.272, 1.618, 2.618, 4.236];
pub const ARC_LEVELS: [f64; 4] = [0.382, 0.5, 0.618, 1.0];
pub const FAN_LEVELS: [f64; 5] = [0.0, 0.382, 0.5, 0.618, 1.0];

const LABEL_SAMPLE: &str = "161.8%";
const LABEL_GAP: f64 = 5.0;
const BAND_OPACITY: f64 = 0.05;
const TIME_ZONE_LABEL_ROOM: f64 = 13.0;
const MAX_TIME_ZONES: usize = 48;

fn level_style(parameters: &LineParameters, highlighted: bool) -> LineStyle {
    let opacity = if highlighted { 1.0 } else { parameters.opacity };
    LineStyle::new(parameters.pattern, parameters.line_width).with_opacity(opacity)
}

/// Stroke and band fill of a level line.
fn level_colors(base: &DrawingBase, host: &dyn ChartHost, level_color: &str, trend: Color) -> (Color, Color) {
    let fallback = host.theme().default_color;
    let stroke = if base.highlighted.is_active() {
        trend
    } else {
        cascade_color(&[level_color, &base.style.color], fallback)
    };
    (stroke, cascade_color(&[level_color, &base.style.fill_color], fallback))
}

fn label_width(ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> f64 {
    ctx.save();
    ctx.set_font(&host.theme().font);
    let width = ctx.measure_text(LABEL_SAMPLE) + 10.0;
    ctx.restore();
    width
}

fn draw_label(
    ctx: &mut dyn DrawingContext,
    host: &dyn ChartHost,
    text: &str,
    at: Point,
    align: TextAlign,
    color: Color,
) -> DrawingResult<()> {
    ctx.save();
    ctx.set_font(&host.theme().font);
    ctx.set_fill_color(color);
    ctx.set_text_align(align);
    ctx.set_text_baseline(TextBaseline::Middle);
    let result = ctx.fill_text(text, at.x, at.y);
    ctx.restore();
    result
}

fn recommended(parameters: &FibParameters, levels: &[f64]) -> FibParameters {
    parameters.with_recommended(levels)
}

fn persisted_parameters(desc: &DrawingDescriptor, levels: &[f64]) -> FibParameters {
    desc.parameters
        .clone()
        .unwrap_or_else(|| recommended(&FibParameters::default(), levels))
}

/// Horizontal projection lines `(near, far)`, one per displayed level, with
/// the far end on the panel's right edge.
#[must_use]
pub fn projection_lines(
    host: &dyn ChartHost,
    panel: &Panel,
    anchors: [Anchor; 3],
    parameters: &FibParameters,
) -> Vec<(Point, Point)> {
    let [p0, p1, p2] = anchors;
    let distance = p1.value - p0.value;
    let near_x = if parameters.extend_left {
        panel.left()
    } else {
        host.pixel_from_tick(p0.tick_f64())
    };
    parameters
        .displayed()
        .map(|fib| {
            let y = host.pixel_from_value(panel, p2.tick_f64(), p2.value + distance * fib.level);
            (Point::new(near_x, y), Point::new(panel.right(), y))
        })
        .collect()
}

/// Segment opposite the arcs, from the mirrored `p0` to `p1`, in chart space.
#[must_use]
pub fn arc_outer(host: &dyn ChartHost, panel: &Panel, p0: Anchor, p1: Anchor) -> Option<(Anchor, Anchor)> {
    let a = host.anchor_to_pixel(panel, p0);
    let b = host.anchor_to_pixel(panel, p1);
    let y = 2.0 * a.y - b.y;
    let x = x_intersection(a, b, y);
    if !x.is_finite() {
        return None;
    }
    Some((Anchor::new(host.tick_from_pixel(x), host.value_from_pixel(panel, y)), p1))
}

/// Points each fan ray passes through on `p1`'s vertical, one per displayed
/// level. Rays start at `p0`. Empty when the anchors share a tick.
#[must_use]
pub fn fan_rays(host: &dyn ChartHost, panel: &Panel, p0: Anchor, p1: Anchor, parameters: &FibParameters) -> Vec<Point> {
    if p0.tick == p1.tick {
        return Vec::new();
    }
    let x = host.pixel_from_tick(p1.tick_f64());
    parameters
        .displayed()
        .map(|fib| {
            let value = (p0.value - p1.value) * fib.level + p1.value;
            Point::new(x, host.pixel_from_value(panel, p0.tick_f64(), value))
        })
        .collect()
}

/// Tick multiples of the time zones: 0, then the Fibonacci sequence
/// without the repeated 1.
pub fn time_zone_multiples() -> impl Iterator<Item = i64> {
    std::iter::once(0)
        .chain(
            std::iter::successors(Some((1_i64, 1_i64)), |&(a, b)| a.checked_add(b).map(|c| (b, c)))
                .map(|(_, b)| b),
        )
        .take(MAX_TIME_ZONES)
}

/// Fibonacci projection: a three-point swing projected from `p2`.
#[derive(Debug, Clone, PartialEq)]
pub struct FibProjection {
    base: DrawingBase,
    parameters: FibParameters,
}

impl FibProjection {
    #[must_use]
    pub fn new(panel_name: impl Into<String>, style: DrawingStyle, parameters: &FibParameters) -> Self {
        Self {
            base: DrawingBase::new(DrawingKind::FibProjection, panel_name, style),
            parameters: recommended(parameters, &PROJECTION_LEVELS),
        }
    }

    #[must_use]
    pub fn parameters(&self) -> &FibParameters {
        &self.parameters
    }

    fn complete_anchors(&self) -> Option<[Anchor; 3]> {
        let anchors = self.base.anchors();
        Some([anchors[0]?, anchors[1]?, anchors[2]?])
    }
}

impl_anchored!(FibProjection);

impl Interactive for FibProjection {
    fn click(&mut self, host: &dyn ChartHost, tick: i64, value: f64) -> ClickOutcome {
        if self.base.panel(host).is_none() {
            return ClickOutcome::Continue;
        }
        if !self.base.pen_down {
            self.base.set_point(host, AnchorSlot::P0, tick, value);
            self.base.clear(AnchorSlot::P1);
            self.base.clear(AnchorSlot::P2);
            self.base.pen_down = true;
            return ClickOutcome::Continue;
        }
        if self.base.accidental_click(host, tick, value) {
            debug!(kind = %self.base.kind(), "accidental click aborts construction");
            self.base.pen_down = false;
            return ClickOutcome::Abort;
        }
        if self.base.anchor(AnchorSlot::P2).is_some() {
            self.base.set_point(host, AnchorSlot::P2, tick, value);
            self.base.pen_down = false;
            debug!(kind = %self.base.kind(), "construction complete");
            return ClickOutcome::Complete;
        }
        self.base.set_point(host, AnchorSlot::P1, tick, value);
        self.base.set_live(AnchorSlot::P2, Some(Anchor::new(tick, value)));
        ClickOutcome::Continue
    }

    fn pointer_move(&mut self, _host: &dyn ChartHost, tick: i64, value: f64) {
        if !self.base.pen_down {
            return;
        }
        let slot = if self.base.anchor(AnchorSlot::P2).is_some() {
            AnchorSlot::P2
        } else {
            AnchorSlot::P1
        };
        self.base.set_live(slot, Some(Anchor::new(tick, value)));
    }

    fn reposition(&mut self, host: &dyn ChartHost, repositioner: &Repositioner, tick: i64, value: f64) {
        self.base
            .reposition_anchors(host, repositioner, tick, value, &AnchorSlot::ALL);
    }

    fn adjust(&mut self, host: &dyn ChartHost) {
        self.base.adjust_slots(host, &AnchorSlot::ALL);
    }
}

impl Renderable for FibProjection {
    fn render(&mut self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> DrawingResult<()> {
        let (Some(panel), Some((p0, p1))) = (self.base.panel(host), self.base.pair()) else {
            return Ok(());
        };
        let highlighted = self.base.highlighted.is_active();
        let a = host.anchor_to_pixel(panel, p0);
        let b = host.anchor_to_pixel(panel, p1);
        let trend_color = self.base.line_color_for(host, &self.parameters.trend.color);
        let trend_style = level_style(&self.parameters.trend.parameters, highlighted);
        let text_color = self.base.text_color(host);
        let mut handles = vec![(AnchorSlot::P0, a), (AnchorSlot::P1, b)];

        if let Some(anchors) = self.complete_anchors() {
            let c = host.anchor_to_pixel(panel, anchors[2]);
            let width = label_width(ctx, host);
            let lines = projection_lines(host, panel, anchors, &self.parameters);
            for (fib, (near, far)) in self.parameters.displayed().zip(lines) {
                let y = near.y;
                let mut far_x = far.x;
                if self.parameters.print_levels {
                    far_x -= width;
                    let reversed = far_x < near.x;
                    let align = if reversed { TextAlign::Right } else { TextAlign::Left };
                    draw_label(ctx, host, &fib.label(), Point::new(far_x, y), align, text_color)?;
                    far_x += if reversed { LABEL_GAP } else { -LABEL_GAP };
                }
                if self.parameters.print_values && x_intersection(a, b, y) < panel.right() {
                    let price = format_fixed(host.value_from_pixel(panel, y), 2);
                    axis_label(ctx, panel, host.theme(), &price, y, text_color)?;
                }
                let (stroke, fill) = level_colors(&self.base, host, &fib.color, trend_color);
                let end = Point::new(far_x, y);
                plot_line(ctx, panel, near, end, stroke, LineKind::Segment, level_style(&fib.parameters, highlighted))?;
                let band = [end, near, Point::new(near.x, c.y), Point::new(far_x, c.y)];
                fill_polygon(ctx, &band, fill, BAND_OPACITY)?;
            }
            plot_line(ctx, panel, b, c, trend_color, LineKind::Segment, trend_style)?;
            handles.push((AnchorSlot::P2, c));
        }
        plot_line(ctx, panel, a, b, trend_color, LineKind::Segment, trend_style)?;
        self.base.render_handles(ctx, host, &handles)
    }
}

impl HitTestable for FibProjection {
    fn intersected(
        &mut self,
        host: &dyn ChartHost,
        tick: i64,
        value: f64,
        hit_box: HitBox,
    ) -> Option<Repositioner> {
        let panel = self.base.panel(host)?;
        let anchors = self.complete_anchors()?;
        if let Some(hit) = self.base.hit_handles(host, panel, hit_box, &AnchorSlot::ALL, tick, value) {
            return Some(hit);
        }
        let [p0, p1, p2] = anchors;
        let domain = |a: Anchor| (a.tick_f64(), a.value);
        let on_trend = line_intersection(host, panel, hit_box, LineKind::Segment, domain(p0), domain(p1))
            || line_intersection(host, panel, hit_box, LineKind::Segment, domain(p1), domain(p2));
        let hit = on_trend
            || projection_lines(host, panel, anchors, &self.parameters)
                .into_iter()
                .any(|(near, far)| pixel_line_intersection(host, panel, hit_box, LineKind::Ray, near, far));
        hit.then(|| self.base.begin_move(tick, value))
    }
}

impl Serializable for FibProjection {
    fn serialize(&self) -> DrawingDescriptor {
        let mut desc = self.base.descriptor();
        self.base.write_anchors(&mut desc, &AnchorSlot::ALL);
        desc.parameters = Some(self.parameters.clone());
        desc
    }

    fn reconstruct(host: &dyn ChartHost, desc: &DrawingDescriptor) -> DrawingResult<Self> {
        for slot in AnchorSlot::ALL {
            desc.require_anchor(slot)?;
        }
        let mut projection = Self {
            base: DrawingBase::from_descriptor(DrawingKind::FibProjection, desc)?,
            parameters: persisted_parameters(desc, &PROJECTION_LEVELS),
        };
        projection.adjust(host);
        Ok(projection)
    }
}

/// Fibonacci arcs centred on `p1`, scaled so they stay circular in chart
/// space regardless of the pixel aspect.
#[derive(Debug, Clone, PartialEq)]
pub struct FibArc {
    base: DrawingBase,
    parameters: FibParameters,
}

impl FibArc {
    #[must_use]
    pub fn new(panel_name: impl Into<String>, style: DrawingStyle, parameters: &FibParameters) -> Self {
        Self {
            base: DrawingBase::new(DrawingKind::FibArc, panel_name, style),
            parameters: recommended(parameters, &ARC_LEVELS),
        }
    }

    #[must_use]
    pub fn parameters(&self) -> &FibParameters {
        &self.parameters
    }
}

impl_anchored!(FibArc);
two_point_interactive!(FibArc);

impl Renderable for FibArc {
    fn render(&mut self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> DrawingResult<()> {
        let (Some(panel), Some((p0, p1))) = (self.base.panel(host), self.base.pair()) else {
            return Ok(());
        };
        let highlighted = self.base.highlighted.is_active();
        let a = host.anchor_to_pixel(panel, p0);
        let b = host.anchor_to_pixel(panel, p1);
        let up = b.y < a.y;
        let factor = ((b.y - a.y) / (b.x - a.x)).abs();
        let trend_color = self.base.line_color_for(host, &self.parameters.trend.color);
        let text_color = self.base.text_color(host);

        if factor.is_finite() && factor > 0.0 {
            for fib in self.parameters.displayed().filter(|fib| fib.level >= 0.0) {
                let radius = (p1.value - p0.value).abs() * SQRT_2 * fib.level;
                let value = p1.value + if up { -radius } else { radius };
                let y = host.pixel_from_value(panel, p0.tick_f64(), value);
                if self.parameters.print_levels {
                    let at = Point::new(b.x, (y - LABEL_GAP).round());
                    draw_label(ctx, host, &fib.label(), at, TextAlign::Center, text_color)?;
                }
                if self.parameters.print_values && x_intersection(a, b, y) < panel.right() {
                    axis_label(ctx, panel, host.theme(), &format_fixed(value, 2), y, text_color)?;
                }
                let (stroke, fill) = level_colors(&self.base, host, &fib.color, trend_color);
                let style = level_style(&fib.parameters, highlighted);
                let line = (self.base.style.pattern != LinePattern::None).then_some((stroke, style));
                aspect_arc(ctx, b, (y - b.y).abs(), factor, !up, line, (fill, BAND_OPACITY))?;
            }
        } else {
            trace!("fib arc has no aspect; arcs skipped");
        }

        let trend_style = level_style(&self.parameters.trend.parameters, highlighted);
        let mirrored = Point::new(2.0 * a.x - b.x, 2.0 * a.y - b.y);
        plot_line(ctx, panel, b, mirrored, trend_color, LineKind::Segment, trend_style)?;
        self.base
            .render_handles(ctx, host, &[(AnchorSlot::P0, a), (AnchorSlot::P1, b)])
    }
}

impl HitTestable for FibArc {
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
        if let Some((outer0, outer1)) = arc_outer(host, panel, p0, p1) {
            let domain = |a: Anchor| (a.tick_f64(), a.value);
            if line_intersection(host, panel, hit_box, LineKind::Segment, domain(outer0), domain(outer1)) {
                return Some(self.base.begin_move(tick, value));
            }
        }
        // Box circumscribing the arcs on p1's side.
        let a = host.anchor_to_pixel(panel, p0);
        let b = host.anchor_to_pixel(panel, p1);
        let extend_x = SQRT_2 * (b.x - a.x).abs();
        let extend_y = SQRT_2 * (b.y - a.y).abs();
        let at = host.anchor_to_pixel(panel, Anchor::new(tick, value));
        if at.x < b.x - extend_x || at.x > b.x + extend_x || at.y < b.y - extend_y || at.y > b.y + extend_y {
            return None;
        }
        if (a.y < b.y && at.y > b.y) || (a.y > b.y && at.y < b.y) {
            return None;
        }
        Some(self.base.begin_move(tick, value))
    }
}

impl Serializable for FibArc {
    fn serialize(&self) -> DrawingDescriptor {
        let mut desc = two_point::serialize(&self.base);
        desc.parameters = Some(self.parameters.clone());
        desc
    }

    fn reconstruct(host: &dyn ChartHost, desc: &DrawingDescriptor) -> DrawingResult<Self> {
        Ok(Self {
            base: two_point::reconstruct(DrawingKind::FibArc, host, desc)?,
            parameters: persisted_parameters(desc, &ARC_LEVELS),
        })
    }
}

/// Fibonacci fan: rays from `p0` through the levels on `p1`'s vertical.
#[derive(Debug, Clone, PartialEq)]
pub struct FibFan {
    base: DrawingBase,
    parameters: FibParameters,
}

impl FibFan {
    #[must_use]
    pub fn new(panel_name: impl Into<String>, style: DrawingStyle, parameters: &FibParameters) -> Self {
        Self {
            base: DrawingBase::new(DrawingKind::FibFan, panel_name, style),
            parameters: recommended(parameters, &FAN_LEVELS),
        }
    }

    #[must_use]
    pub fn parameters(&self) -> &FibParameters {
        &self.parameters
    }
}

impl_anchored!(FibFan);
two_point_interactive!(FibFan);

impl Renderable for FibFan {
    fn render(&mut self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> DrawingResult<()> {
        let (Some(panel), Some((p0, p1))) = (self.base.panel(host), self.base.pair()) else {
            return Ok(());
        };
        let highlighted = self.base.highlighted.is_active();
        let a = host.anchor_to_pixel(panel, p0);
        let b = host.anchor_to_pixel(panel, p1);
        let rightward = b.x > a.x;
        let trend_color = self.base.line_color_for(host, &self.parameters.trend.color);
        let text_color = self.base.text_color(host);
        let width = label_width(ctx, host);
        let room = if self.parameters.print_levels { width + LABEL_GAP } else { 0.0 };
        let rays = fan_rays(host, panel, p0, p1, &self.parameters);

        for (fib, through) in self.parameters.displayed().zip(rays) {
            let mut far_x = if rightward { panel.right() } else { panel.left() };
            if (rightward && a.x > far_x - room) || (!rightward && a.x < far_x + room) {
                continue;
            }
            let along = |x: f64| y_intersection(a, through, x);
            if self.parameters.print_levels {
                let align = if rightward {
                    far_x -= width;
                    TextAlign::Left
                } else {
                    far_x += width;
                    TextAlign::Right
                };
                draw_label(ctx, host, &fib.label(), Point::new(far_x, along(far_x)), align, text_color)?;
                far_x += if rightward { -LABEL_GAP } else { LABEL_GAP };
            }
            if self.parameters.print_values && through.x < panel.right() {
                let price = format_fixed(host.value_from_pixel(panel, through.y), 2);
                axis_label(ctx, panel, host.theme(), &price, through.y, text_color)?;
            }
            let (stroke, fill) = level_colors(&self.base, host, &fib.color, trend_color);
            let far = Point::new(far_x, along(far_x));
            plot_line(ctx, panel, a, far, stroke, LineKind::Segment, level_style(&fib.parameters, highlighted))?;
            fill_polygon(ctx, &[far, a, Point::new(far.x, a.y)], fill, BAND_OPACITY)?;
        }
        self.base
            .render_handles(ctx, host, &[(AnchorSlot::P0, a), (AnchorSlot::P1, b)])
    }
}

impl HitTestable for FibFan {
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
        let a = host.anchor_to_pixel(panel, p0);
        let hit = fan_rays(host, panel, p0, p1, &self.parameters)
            .into_iter()
            .any(|through| pixel_line_intersection(host, panel, hit_box, LineKind::Ray, a, through));
        hit.then(|| self.base.begin_move(tick, value))
    }
}

impl Serializable for FibFan {
    fn serialize(&self) -> DrawingDescriptor {
        let mut desc = two_point::serialize(&self.base);
        desc.parameters = Some(self.parameters.clone());
        desc
    }

    fn reconstruct(host: &dyn ChartHost, desc: &DrawingDescriptor) -> DrawingResult<Self> {
        Ok(Self {
            base: two_point::reconstruct(DrawingKind::FibFan, host, desc)?,
            parameters: persisted_parameters(desc, &FAN_LEVELS),
        })
    }
}

/// Fibonacci time zones: verticals at Fibonacci multiples of the `p0`-`p1`
/// tick distance.
#[derive(Debug, Clone, PartialEq)]
pub struct FibTimeZone {
    base: DrawingBase,
    parameters: FibParameters,
}

impl FibTimeZone {
    #[must_use]
    pub fn new(panel_name: impl Into<String>, style: DrawingStyle, parameters: &FibParameters) -> Self {
        Self {
            base: DrawingBase::new(DrawingKind::FibTimeZone, panel_name, style),
            parameters: parameters.clone(),
        }
    }

    #[must_use]
    pub fn parameters(&self) -> &FibParameters {
        &self.parameters
    }
}

impl_anchored!(FibTimeZone);
two_point_interactive!(FibTimeZone);

impl Renderable for FibTimeZone {
    fn render(&mut self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> DrawingResult<()> {
        let (Some(panel), Some((p0, p1))) = (self.base.panel(host), self.base.pair()) else {
            return Ok(());
        };
        let highlighted = self.base.highlighted.is_active();
        let a = host.anchor_to_pixel(panel, p0);
        let b = host.anchor_to_pixel(panel, p1);
        let span = p1.tick - p0.tick;
        let trend_color = self.base.line_color_for(host, &self.parameters.trend.color);
        let zone = &self.parameters.timezone;
        let style = level_style(&zone.parameters, highlighted);
        let (stroke, fill) = level_colors(&self.base, host, &zone.color, trend_color);
        let text_color = self.base.text_color(host);
        let top = panel.top();
        let mut far_y = panel.bottom();
        if self.parameters.print_levels {
            far_y -= TIME_ZONE_LABEL_ROOM;
        }

        for multiple in time_zone_multiples() {
            let Some(tick) = multiple.checked_mul(span).and_then(|offset| p0.tick.checked_add(offset)) else {
                break;
            };
            let x = host.pixel_from_tick(tick as f64);
            if (a.x < b.x && x > panel.right()) || (a.x > b.x && x < panel.left()) {
                break;
            }
            if self.parameters.print_levels {
                let label = if b.x > a.x { multiple } else { -multiple };
                let at = Point::new(x, far_y + 7.0);
                draw_label(ctx, host, &label.to_string(), at, TextAlign::Center, text_color)?;
            }
            plot_line(ctx, panel, Point::new(x, top), Point::new(x, far_y), stroke, LineKind::Segment, style)?;
            let band = [Point::new(a.x, top), Point::new(x, top), Point::new(x, far_y), Point::new(a.x, far_y)];
            fill_polygon(ctx, &band, fill, BAND_OPACITY)?;
            if span == 0 {
                break;
            }
        }
        plot_line(ctx, panel, a, b, trend_color, LineKind::Segment, style)?;

        if highlighted {
            return self
                .base
                .render_handles(ctx, host, &[(AnchorSlot::P0, a), (AnchorSlot::P1, b)]);
        }
        // Keep the handles reachable at mid-panel.
        let centre = host.value_from_pixel(panel, (panel.top() + panel.bottom()) / 2.0);
        self.base.set_point(host, AnchorSlot::P0, p0.tick, centre);
        self.base.set_point(host, AnchorSlot::P1, p1.tick, centre);
        Ok(())
    }
}

impl HitTestable for FibTimeZone {
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
        let on_origin = hit_box.tick0 <= p0.tick_f64() && hit_box.tick1 >= p0.tick_f64();
        (on_trend || on_origin).then(|| self.base.begin_move(tick, value))
    }
}

impl Serializable for FibTimeZone {
    fn serialize(&self) -> DrawingDescriptor {
        let mut desc = two_point::serialize(&self.base);
        desc.parameters = Some(self.parameters.clone());
        desc
    }

    fn reconstruct(host: &dyn ChartHost, desc: &DrawingDescriptor) -> DrawingResult<Self> {
        Ok(Self {
            base: two_point::reconstruct(DrawingKind::FibTimeZone, host, desc)?,
            parameters: desc.parameters.clone().unwrap_or_default(),
        })
    }
}
