//! Glyph library: fixed outlines placed at one anchor, scaled on each axis
//! and rotated in 5 degree steps.
//!
//! Construction takes three clicks. The first drops the anchor, the second
//! fixes the scale measured from the pointer offset and the third fixes the
//! rotation.

use std::f64::consts::PI;

use tracing::debug;

use crate::core::geometry::HitBox;
use crate::core::host::ChartHost;
use crate::core::pane::Panel;
use crate::core::types::{Anchor, PathSegment, Point};
use crate::drawing::base::{DrawingBase, DrawingStyle};
use crate::drawing::descriptor::DrawingDescriptor;
use crate::drawing::kind::DrawingKind;
use crate::drawing::traits::{HitTestable, Interactive, Renderable, Serializable};
use crate::error::{DrawingError, DrawingResult};
use crate::interaction::{AnchorSlot, ClickOutcome, Highlight, RepositionAction, Repositioner};
use crate::render::plot::{draw_mover, draw_resizer, draw_rotator, little_circle};
use crate::render::{DrawingContext, LinePattern};

const DEFAULT_LINE_WIDTH: f64 = 1.1;
const ANGLE_STEP: f64 = 5.0;

/// One outline instruction in design units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutlineOp {
    Move(f64, f64),
    Line(f64, f64),
    Quad(f64, f64, f64, f64),
    Cubic(f64, f64, f64, f64, f64, f64),
}

use self::OutlineOp::{Cubic as B, Line as L, Move as M};

/// Design-space outline of a glyph. Each loop is closed when painted.
#[derive(Debug, PartialEq)]
pub struct ShapeOutline {
    pub width: f64,
    pub height: f64,
    pub loops: &'static [&'static [OutlineOp]],
}

static XCROSS: ShapeOutline = ShapeOutline {
    width: 7.0,
    height: 7.0,
    loops: &[&[
        M(1.0, 0.0),
        L(3.0, 2.0),
        L(5.0, 0.0),
        L(6.0, 1.0),
        L(4.0, 3.0),
        L(6.0, 5.0),
        L(5.0, 6.0),
        L(3.0, 4.0),
        L(1.0, 6.0),
        L(0.0, 5.0),
        L(2.0, 3.0),
        L(0.0, 1.0),
        L(1.0, 0.0),
    ]],
};

static ARROW: ShapeOutline = ShapeOutline {
    width: 11.0,
    height: 11.0,
    loops: &[&[
        M(3.0, 0.0),
        L(7.0, 0.0),
        L(7.0, 5.0),
        L(10.0, 5.0),
        L(5.0, 10.0),
        L(0.0, 5.0),
        L(3.0, 5.0),
        L(3.0, 0.0),
    ]],
};

static CHECK: ShapeOutline = ShapeOutline {
    width: 8.0,
    height: 9.0,
    loops: &[&[
        M(1.0, 5.0),
        L(0.0, 6.0),
        L(2.0, 8.0),
        L(7.0, 1.0),
        L(6.0, 0.0),
        L(2.0, 6.0),
        L(1.0, 5.0),
    ]],
};

static STAR: ShapeOutline = ShapeOutline {
    width: 12.0,
    height: 12.0,
    loops: &[&[
        M(0.0, 4.0),
        L(4.0, 4.0),
        L(5.5, 0.0),
        L(7.0, 4.0),
        L(11.0, 4.0),
        L(8.0, 7.0),
        L(9.0, 11.0),
        L(5.5, 9.0),
        L(2.0, 11.0),
        L(3.0, 7.0),
        L(0.0, 4.0),
    ]],
};

static HEART: ShapeOutline = ShapeOutline {
    width: 23.0,
    height: 20.0,
    loops: &[&[
        M(11.0, 3.0),
        B(11.0, 2.4, 10.0, 0.0, 6.0, 0.0),
        B(0.0, 0.0, 0.0, 7.5, 0.0, 7.5),
        B(0.0, 11.0, 4.0, 15.4, 11.0, 19.0),
        B(18.0, 15.4, 22.0, 11.0, 22.0, 7.5),
        B(22.0, 7.5, 22.0, 0.0, 16.0, 0.0),
        B(13.0, 0.0, 11.0, 2.4, 11.0, 3.0),
    ]],
};

static FOCUS_ARROW: ShapeOutline = ShapeOutline {
    width: 7.0,
    height: 5.0,
    loops: &[
        &[M(0.0, 0.0), L(2.0, 2.0), L(0.0, 4.0), L(0.0, 0.0)],
        &[M(6.0, 0.0), L(4.0, 2.0), L(6.0, 4.0), L(6.0, 0.0)],
    ],
};

impl ShapeOutline {
    #[must_use]
    pub fn for_kind(kind: DrawingKind) -> Option<&'static Self> {
        match kind {
            DrawingKind::XCross => Some(&XCROSS),
            DrawingKind::Arrow => Some(&ARROW),
            DrawingKind::Check => Some(&CHECK),
            DrawingKind::Star => Some(&STAR),
            DrawingKind::Heart => Some(&HEART),
            DrawingKind::FocusArrow => Some(&FOCUS_ARROW),
            _ => None,
        }
    }

    /// Closed paths centred on the origin.
    #[must_use]
    pub fn paths(&self) -> Vec<Vec<PathSegment>> {
        let cx = (self.width - 1.0) / 2.0;
        let cy = (self.height - 1.0) / 2.0;
        let at = |x: f64, y: f64| Point::new(x - cx, y - cy);
        self.loops
            .iter()
            .map(|ops| {
                let mut path: Vec<PathSegment> = ops
                    .iter()
                    .map(|op| match *op {
                        OutlineOp::Move(x, y) => PathSegment::MoveTo(at(x, y)),
                        OutlineOp::Line(x, y) => PathSegment::LineTo(at(x, y)),
                        OutlineOp::Quad(c1x, c1y, x, y) => PathSegment::QuadTo {
                            control: at(c1x, c1y),
                            to: at(x, y),
                        },
                        OutlineOp::Cubic(c1x, c1y, c2x, c2y, x, y) => PathSegment::CubicTo {
                            control1: at(c1x, c1y),
                            control2: at(c2x, c2y),
                            to: at(x, y),
                        },
                    })
                    .collect();
                path.push(PathSegment::Close);
                path
            })
            .collect()
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Angle in degrees of the pixel offset `(dx, dy)`, snapped to a multiple of
/// 5 in `0..360`.
#[must_use]
pub fn snap_angle(dx: f64, dy: f64) -> f64 {
    if dx == 0.0 && dy == 0.0 {
        return 0.0;
    }
    let mut radians = (dy / dx).atan();
    if dx < 0.0 {
        radians += PI;
    } else if dy < 0.0 {
        radians += 2.0 * PI;
    }
    ((radians * 36.0 / PI).round() * ANGLE_STEP).rem_euclid(360.0)
}

/// Scale factors while constructing: twice the pointer offset over the glyph
/// size, at least 1 in magnitude and signed by direction.
#[must_use]
pub fn construction_scale(dx: f64, dy: f64, outline: &ShapeOutline) -> (f64, f64) {
    let axis = |offset: f64, size: f64| {
        let scale = round_tenth((2.0 * offset / size).abs()).max(1.0);
        if offset < 0.0 { -scale } else { scale }
    };
    (axis(dx, outline.width), axis(dy, outline.height))
}

/// Scale factors from dragging the resize handle of a glyph rotated by
/// `radians`. Magnitudes below 1 snap to a unit scale of the same sign.
#[must_use]
pub fn handle_scale(dx: f64, dy: f64, radians: f64, outline: &ShapeOutline) -> (f64, f64) {
    let (sin, cos) = radians.sin_cos();
    let snap = |scale: f64| {
        if scale.abs() >= 1.0 {
            scale
        } else if scale < 0.0 {
            -1.0
        } else {
            1.0
        }
    };
    (
        snap(round_tenth((dx * cos + dy * sin) / (outline.width / 2.0))),
        snap(round_tenth((dy * cos - dx * sin) / (outline.height / 2.0))),
    )
}

/// A library glyph. `p0` is the centre; `p1` tracks the pointer during
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    base: DrawingBase,
    outline: &'static ShapeOutline,
    angle: f64,
    sx: f64,
    sy: f64,
    rotating: bool,
}

impl Shape {
    pub fn new(kind: DrawingKind, panel_name: impl Into<String>, style: DrawingStyle) -> DrawingResult<Self> {
        let outline = ShapeOutline::for_kind(kind).ok_or_else(|| DrawingError::UnknownDrawing(kind.to_string()))?;
        Ok(Self {
            base: DrawingBase::new(kind, panel_name, style),
            outline,
            angle: 0.0,
            sx: 1.0,
            sy: 1.0,
            rotating: false,
        })
    }

    /// Rotation in degrees.
    #[must_use]
    pub fn angle(&self) -> f64 {
        self.angle
    }

    #[must_use]
    pub fn scale(&self) -> (f64, f64) {
        (self.sx, self.sy)
    }

    #[must_use]
    pub fn outline(&self) -> &'static ShapeOutline {
        self.outline
    }

    #[must_use]
    pub fn is_rotating(&self) -> bool {
        self.rotating
    }

    fn radians(&self) -> f64 {
        self.angle.to_radians()
    }

    fn pointer_offset(&self, host: &dyn ChartHost, panel: &Panel, tick: i64, value: f64) -> Option<(f64, f64)> {
        let origin = self.base.pixel(host, panel, AnchorSlot::P0)?;
        let at = host.anchor_to_pixel(panel, Anchor::new(tick, value));
        Some((at.x - origin.x, at.y - origin.y))
    }

    /// Applies the construction gesture in progress to the pointer position.
    fn track(&mut self, host: &dyn ChartHost, tick: i64, value: f64) {
        let Some(panel) = self.base.panel(host) else {
            return;
        };
        let Some((dx, dy)) = self.pointer_offset(host, panel, tick, value) else {
            return;
        };
        if self.rotating {
            self.angle = snap_angle(dx, dy);
        } else {
            (self.sx, self.sy) = construction_scale(dx, dy, self.outline);
        }
    }

    fn paint_outline(&self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> DrawingResult<()> {
        let highlighted = self.base.highlighted.is_active();
        let mut pattern = self.base.style.pattern;
        let mut line_width = if self.base.style.line_width > 0.0 {
            self.base.style.line_width
        } else {
            DEFAULT_LINE_WIDTH
        };
        if highlighted && pattern == LinePattern::None {
            pattern = LinePattern::Solid;
        }
        // Cancel the scale transform so the stroke keeps its pixel width.
        line_width /= (self.sx * self.sy).abs() * 2.0 / (self.sx.abs() + self.sy.abs());
        let edge = self.base.line_color(host);
        let fill = self.base.fill_color();
        for path in self.outline.paths() {
            ctx.begin_path();
            ctx.append_path(&path);
            if let Some(fill) = fill {
                ctx.set_fill_color(fill);
                ctx.fill()?;
            }
            if pattern != LinePattern::None {
                ctx.set_stroke_color(edge);
                ctx.set_line_width(line_width);
                ctx.set_line_dash(&pattern.dash_array(line_width));
                ctx.stroke()?;
            }
        }
        Ok(())
    }

    fn paint_handles(&self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> DrawingResult<()> {
        let theme = host.theme();
        let corner = Point::new(self.sx * self.outline.width / 2.0, self.sy * self.outline.height / 2.0);
        let side = Point::new(corner.x, 0.0);
        if self.base.highlighted.is_active() {
            let radius = self.base.tolerances.handle_radius;
            let lit = |slot| self.base.highlighted == Highlight::Anchor(slot);
            for (slot, at) in [(AnchorSlot::P0, Point::default()), (AnchorSlot::P1, corner), (AnchorSlot::P2, side)] {
                little_circle(ctx, theme, at, radius, lit(slot))?;
            }
            draw_mover(ctx, theme, Point::default(), lit(AnchorSlot::P0))?;
            draw_resizer(ctx, theme, corner, lit(AnchorSlot::P1))?;
            return draw_rotator(ctx, theme, side, lit(AnchorSlot::P2));
        }
        if self.base.pen_down {
            if self.rotating {
                return draw_rotator(ctx, theme, side, true);
            }
            return draw_resizer(ctx, theme, corner, true);
        }
        Ok(())
    }
}

impl_anchored!(Shape);

impl Interactive for Shape {
    fn click(&mut self, host: &dyn ChartHost, tick: i64, value: f64) -> ClickOutcome {
        if self.base.panel(host).is_none() {
            return ClickOutcome::Continue;
        }
        if !self.base.pen_down {
            self.base.set_point(host, AnchorSlot::P0, tick, value);
            self.base.pen_down = true;
            self.rotating = false;
            return ClickOutcome::Continue;
        }
        self.track(host, tick, value);
        if self.rotating {
            self.base.clear(AnchorSlot::P1);
            self.base.pen_down = false;
            self.rotating = false;
            debug!(kind = %self.base.kind(), angle = self.angle, sx = self.sx, sy = self.sy, "shape placed");
            return ClickOutcome::Complete;
        }
        self.base.set_live(AnchorSlot::P1, Some(Anchor::new(tick, value)));
        self.rotating = true;
        ClickOutcome::Continue
    }

    fn pointer_move(&mut self, host: &dyn ChartHost, tick: i64, value: f64) {
        if !self.base.pen_down {
            return;
        }
        self.base.set_live(AnchorSlot::P1, Some(Anchor::new(tick, value)));
        self.track(host, tick, value);
    }

    fn reposition(&mut self, host: &dyn ChartHost, repositioner: &Repositioner, tick: i64, value: f64) {
        let Some(panel) = self.base.panel(host) else {
            return;
        };
        match repositioner.action {
            RepositionAction::Move => {
                let (dt, dv) = repositioner.delta(tick, value);
                if let Some(start) = repositioner.anchor(AnchorSlot::P0) {
                    self.base.set_point(host, AnchorSlot::P0, start.tick + dt, start.value + dv);
                }
            }
            RepositionAction::Scale => {
                if let Some((dx, dy)) = self.pointer_offset(host, panel, tick, value) {
                    (self.sx, self.sy) = handle_scale(dx, dy, self.radians(), self.outline);
                }
            }
            RepositionAction::Rotate => {
                if let Some((dx, dy)) = self.pointer_offset(host, panel, tick, value) {
                    let mut angle = snap_angle(dx, dy);
                    if self.sx < 0.0 {
                        angle = (angle + 180.0) % 360.0;
                    }
                    self.angle = angle;
                }
            }
            RepositionAction::Drag | RepositionAction::Select => {}
        }
    }

    fn adjust(&mut self, host: &dyn ChartHost) {
        self.base.adjust_slots(host, &[AnchorSlot::P0]);
    }
}

impl Renderable for Shape {
    fn render(&mut self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> DrawingResult<()> {
        let Some(panel) = self.base.panel(host) else {
            return Ok(());
        };
        let Some(origin) = self.base.pixel(host, panel, AnchorSlot::P0) else {
            return Ok(());
        };
        let radians = self.radians();

        ctx.save();
        ctx.translate(origin.x, origin.y);
        ctx.rotate(radians);
        ctx.scale(self.sx, self.sy);
        let painted = self.paint_outline(ctx, host);
        ctx.restore();
        painted?;

        ctx.save();
        ctx.translate(origin.x, origin.y);
        ctx.rotate(radians);
        let handles = self.paint_handles(ctx, host);
        ctx.restore();
        handles
    }
}

impl HitTestable for Shape {
    /// Picks the grab by proximity: the resize handle, the rotate handle,
    /// the centre, then anywhere within the glyph's circumscribed circle.
    fn intersected(
        &mut self,
        host: &dyn ChartHost,
        tick: i64,
        value: f64,
        _hit_box: HitBox,
    ) -> Option<Repositioner> {
        let panel = self.base.panel(host)?;
        let (dx, dy) = self.pointer_offset(host, panel, tick, value)?;
        let (sin, cos) = self.radians().sin_cos();
        let (sx, sy) = (self.sx, self.sy);
        let x = (cos * dx + sin * dy) / sx;
        let y = (cos * dy - sin * dx) / sy;
        let half_w = self.outline.width / 2.0;
        let half_h = self.outline.height / 2.0;

        let reach = (self.base.tolerances.hit_px + self.base.tolerances.handle_radius).powi(2);
        let scaled_reach = (reach / (sx * sy)).abs();
        let over_shape = half_w.powi(2) + half_h.powi(2) > x.powi(2) + y.powi(2);
        let near_move = (reach - ((x * sx).powi(2) + (y * sy).powi(2))) / (sx * sy).abs();
        let near_scale = scaled_reach - ((x - half_w).powi(2) + (y - half_h).powi(2));
        let near_rotate = scaled_reach - ((x - half_w).powi(2) + y.powi(2));

        let (highlight, action) = if near_scale > 0.0 && near_scale >= near_rotate && near_scale >= near_move {
            (Highlight::Anchor(AnchorSlot::P1), RepositionAction::Scale)
        } else if near_rotate > 0.0 && near_rotate >= near_scale && near_rotate >= near_move {
            (Highlight::Anchor(AnchorSlot::P2), RepositionAction::Rotate)
        } else if near_move > 0.0 && near_move >= near_scale && near_move >= near_rotate {
            (Highlight::Anchor(AnchorSlot::P0), RepositionAction::Move)
        } else if over_shape {
            (Highlight::Whole, RepositionAction::Select)
        } else {
            return None;
        };
        self.base.highlighted = highlight;
        Some(Repositioner::new(action, self.base.anchors(), tick, value))
    }
}

impl Serializable for Shape {
    fn serialize(&self) -> DrawingDescriptor {
        let mut desc = self.base.descriptor();
        self.base.write_anchors(&mut desc, &[AnchorSlot::P0]);
        desc.a = Some(self.angle);
        desc.sx = Some(self.sx);
        desc.sy = Some(self.sy);
        desc
    }

    fn reconstruct(host: &dyn ChartHost, desc: &DrawingDescriptor) -> DrawingResult<Self> {
        let kind: DrawingKind = desc.name.parse()?;
        let outline = ShapeOutline::for_kind(kind)
            .ok_or_else(|| DrawingError::descriptor(&desc.name, "not a library shape"))?;
        desc.require_anchor(AnchorSlot::P0)?;
        let factor = |scale: Option<f64>| scale.filter(|s| s.is_finite() && *s != 0.0).unwrap_or(1.0);
        let angle = desc
            .a
            .filter(|a| a.is_finite())
            .map_or(0.0, |a| ((a / ANGLE_STEP).round() * ANGLE_STEP).rem_euclid(360.0));
        let mut shape = Self {
            base: DrawingBase::from_descriptor(kind, desc)?,
            outline,
            angle,
            sx: factor(desc.sx),
            sy: factor(desc.sy),
            rotating: false,
        };
        shape.adjust(host);
        Ok(shape)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::{Shape, ShapeOutline, construction_scale, handle_scale, snap_angle};
    use crate::core::geometry::HitBox;
    use crate::core::types::PathSegment;
    use crate::drawing::base::DrawingStyle;
    use crate::drawing::kind::DrawingKind;
    use crate::drawing::traits::{Anchored, HitTestable, Interactive, Renderable, Serializable};
    use crate::interaction::{AnchorSlot, ClickOutcome, RepositionAction};
    use crate::render::RecordingContext;
    use crate::test_support::daily_host;

    fn no_box() -> HitBox {
        HitBox::new(0.0, 0.0, 0.0, 0.0)
    }

    #[test]
    fn angles_snap_to_five_degrees() {
        let (sin, cos) = 87.0_f64.to_radians().sin_cos();
        assert_relative_eq!(snap_angle(cos, sin), 85.0);
        assert_relative_eq!(snap_angle(-1.0, 0.0), 180.0);
        assert_relative_eq!(snap_angle(0.0, -1.0), 270.0);
        assert_relative_eq!(snap_angle(1.0, -0.01), 0.0);
        assert_relative_eq!(snap_angle(0.0, 0.0), 0.0);
    }

    #[test]
    fn construction_scale_is_signed_and_at_least_one() {
        let outline = ShapeOutline::for_kind(DrawingKind::Star).expect("star");
        let (sx, sy) = construction_scale(-30.0, 2.0, outline);
        assert_relative_eq!(sx, -5.0);
        assert_relative_eq!(sy, 1.0);
    }

    #[test]
    fn handle_scale_snaps_small_factors() {
        let outline = ShapeOutline::for_kind(DrawingKind::XCross).expect("xcross");
        let (sx, sy) = handle_scale(35.0, -1.0, 0.0, outline);
        assert_relative_eq!(sx, 10.0);
        assert_relative_eq!(sy, -1.0);
    }

    #[test]
    fn outlines_close_every_loop() {
        let outline = ShapeOutline::for_kind(DrawingKind::FocusArrow).expect("focus arrow");
        let paths = outline.paths();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|path| path.last() == Some(&PathSegment::Close)));
        assert!(ShapeOutline::for_kind(DrawingKind::Segment).is_none());
    }

    #[test]
    fn three_clicks_place_scale_and_rotate() {
        let host = daily_host(40);
        let mut shape = Shape::new(DrawingKind::Arrow, "chart", DrawingStyle::default()).expect("shape");
        assert_eq!(shape.click(&host, 0, 195.0), ClickOutcome::Continue);
        assert_eq!(shape.click(&host, 3, 175.0), ClickOutcome::Continue);
        assert!(shape.is_rotating());
        let (sx, sy) = shape.scale();
        assert_relative_eq!(sx, 5.5);
        assert_relative_eq!(sy, 3.6);

        let tilt = 10.0 * 87.0_f64.to_radians().tan();
        assert_eq!(shape.click(&host, 1, 195.0 - tilt), ClickOutcome::Complete);
        assert_relative_eq!(shape.angle(), 85.0);
        assert!(shape.base().anchor(AnchorSlot::P1).is_none());
    }

    #[test]
    fn grabs_resolve_by_handle_proximity() {
        let host = daily_host(40);
        let mut shape = Shape::new(DrawingKind::XCross, "chart", DrawingStyle::default()).expect("shape");
        shape.click(&host, 10, 100.0);
        shape.click(&host, 11, 100.0);
        shape.click(&host, 12, 100.0);
        // Scale (2.9, 1) at 0 degrees.
        let centre = shape.intersected(&host, 10, 100.0, no_box()).expect("centre");
        assert_eq!(centre.action, RepositionAction::Move);
        let far = shape.intersected(&host, 30, 20.0, no_box());
        assert!(far.is_none());

        let mut ctx = RecordingContext::new();
        shape.render(&mut ctx, &host).expect("render");
        assert_eq!(ctx.save_depth(), 0);
        assert!(ctx.strokes().count() >= 1);
    }

    #[test]
    fn serialization_keeps_angle_and_scale() {
        let host = daily_host(40);
        let mut shape = Shape::new(DrawingKind::Heart, "chart", DrawingStyle::default()).expect("shape");
        shape.click(&host, 10, 100.0);
        shape.click(&host, 14, 80.0);
        shape.click(&host, 10, 90.0);
        let desc = shape.serialize();
        assert_eq!(desc.name, "heart");
        let restored = Shape::reconstruct(&host, &desc).expect("reconstruct");
        assert_eq!(restored.scale(), shape.scale());
        assert_relative_eq!(restored.angle(), shape.angle());
        assert_eq!(restored.base().anchor(AnchorSlot::P0), shape.base().anchor(AnchorSlot::P0));
    }
}
