//! Gartley harmonic pattern: five vertices joined by four legs, each leg
//! validated against the harmonic ratio bands before it is accepted.

use tracing::{debug, trace};

use crate::core::anchor::DurableAnchor;
use crate::core::geometry::{HitBox, LineKind, line_intersection};
use crate::core::host::ChartHost;
use crate::core::types::{Anchor, Point};
use crate::drawing::base::{DrawingBase, DrawingStyle};
use crate::drawing::descriptor::DrawingDescriptor;
use crate::drawing::kind::DrawingKind;
use crate::drawing::traits::{HitTestable, Interactive, Renderable, Serializable};
use crate::error::{DrawingError, DrawingResult};
use crate::interaction::{AnchorSlot, ClickOutcome, RepositionAction, Repositioner};
use crate::render::DrawingContext;
use crate::render::plot::{fill_polygon, plot_line};

const MAX_SEGMENTS: usize = 4;
const VERTEX_COUNT: usize = MAX_SEGMENTS + 1;
const FILL_OPACITY: f64 = 0.2;
const RETRACE_LOW: f64 = 0.618;
const RETRACE_HIGH: f64 = 0.786;
const PROJECTION_LOW: f64 = 1.27;
const PROJECTION_HIGH: f64 = 1.618;

/// Orientation locked in by the first leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GartleyShape {
    /// First leg rises.
    M,
    /// First leg falls.
    W,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gartley {
    base: DrawingBase,
    points: Vec<Anchor>,
    /// Durable mirrors of `points`.
    durable_points: Vec<DurableAnchor>,
    /// Leg under construction, 1 through 4; 5 once complete.
    segment: usize,
    shape: Option<GartleyShape>,
}

impl Gartley {
    #[must_use]
    pub fn new(panel_name: impl Into<String>, style: DrawingStyle) -> Self {
        Self {
            base: DrawingBase::new(DrawingKind::Gartley, panel_name, style),
            points: Vec::new(),
            durable_points: Vec::new(),
            segment: 0,
            shape: None,
        }
    }

    #[must_use]
    pub fn points(&self) -> &[Anchor] {
        &self.points
    }

    #[must_use]
    pub fn shape(&self) -> Option<GartleyShape> {
        self.shape
    }

    #[must_use]
    pub fn segment(&self) -> usize {
        self.segment
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.points.len() == VERTEX_COUNT
    }

    /// Validates the leg `first -> second` for the current segment. The
    /// first leg fixes the pattern's shape.
    fn check(&mut self, first: Anchor, second: Anchor) -> bool {
        if first.tick >= second.tick || first.value == second.value {
            return false;
        }
        let (a, b) = (first.value, second.value);
        let shape = self.shape;
        let in_band = |ratio: f64, low: f64, high: f64| ratio >= low && ratio < high;
        match self.segment {
            1 => {
                self.shape = Some(if a < b { GartleyShape::M } else { GartleyShape::W });
                true
            }
            2 | 3 => {
                let against = match shape {
                    Some(GartleyShape::M) => (self.segment == 2) == (a < b),
                    Some(GartleyShape::W) => (self.segment == 2) == (a > b),
                    None => true,
                };
                let Some(pivot) = self.points.get(self.segment - 2) else {
                    return false;
                };
                !against && in_band((b - a) / (pivot.value - a), RETRACE_LOW, RETRACE_HIGH)
            }
            4 => {
                let (Some(x), Some(pa), Some(pb)) = (self.points.first(), self.points.get(1), self.points.get(2)) else {
                    return false;
                };
                let against = match shape {
                    Some(GartleyShape::M) => a < b || b < x.value,
                    Some(GartleyShape::W) => a > b || b > x.value,
                    None => true,
                };
                !against && in_band((pa.value - b) / (pa.value - pb.value), PROJECTION_LOW, PROJECTION_HIGH)
            }
            _ => true,
        }
    }

    /// Price band the next vertex must land in, as `(bound1, bound2)`.
    fn drop_zone(&self) -> Option<(f64, f64)> {
        let p0 = self.base.anchor(AnchorSlot::P0)?;
        match self.segment {
            2 => {
                let x = self.points.first()?.value;
                Some((RETRACE_LOW * x + (1.0 - RETRACE_LOW) * p0.value, RETRACE_HIGH * x + (1.0 - RETRACE_HIGH) * p0.value))
            }
            3 => {
                let a = self.points.get(1)?.value;
                Some((RETRACE_LOW * a + (1.0 - RETRACE_LOW) * p0.value, RETRACE_HIGH * a + (1.0 - RETRACE_HIGH) * p0.value))
            }
            4 => {
                let (x, a, b) = (self.points.first()?.value, self.points.get(1)?.value, self.points.get(2)?.value);
                let bound = PROJECTION_HIGH * b - (PROJECTION_HIGH - 1.0) * a;
                let bound = match self.shape {
                    Some(GartleyShape::M) => bound.max(x),
                    _ => bound.min(x),
                };
                Some((bound, PROJECTION_LOW * b - (PROJECTION_LOW - 1.0) * a))
            }
            _ => None,
        }
    }

    /// Whether `(tick, value)` is inside the pattern's bounding box.
    fn box_intersection(&self, tick: i64, value: f64) -> bool {
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return false;
        };
        if tick > first.tick.max(last.tick) || tick < first.tick.min(last.tick) {
            return false;
        }
        let low = self.points.iter().map(|p| p.value).fold(f64::INFINITY, f64::min);
        let high = self.points.iter().map(|p| p.value).fold(f64::NEG_INFINITY, f64::max);
        (low..=high).contains(&value)
    }

    fn capture_points(&mut self, host: &dyn ChartHost) {
        self.durable_points = self
            .points
            .iter()
            .filter_map(|p| DurableAnchor::capture(host, p.tick, p.value))
            .collect();
    }

    fn encode_points(&self) -> Option<String> {
        let inner = self.durable_points.get(1..self.durable_points.len().checked_sub(1)?)?;
        Some(
            inner
                .iter()
                .map(|d| format!("{},{},{}", d.date_string(), d.utc_offset_minutes, d.value))
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    fn decode_points(desc: &DrawingDescriptor) -> DrawingResult<Vec<DurableAnchor>> {
        let text = desc
            .pts
            .as_deref()
            .ok_or_else(|| DrawingError::descriptor(&desc.name, "missing pts"))?;
        let fields: Vec<&str> = text.split(',').map(str::trim).collect();
        if fields.len() % 3 != 0 {
            return Err(DrawingError::descriptor(&desc.name, "pts must hold d,tzo,v triples"));
        }
        fields
            .chunks(3)
            .map(|triple| {
                let offset = triple[1]
                    .parse::<i32>()
                    .map_err(|err| DrawingError::descriptor(&desc.name, format!("bad pts offset: {err}")))?;
                let value = triple[2]
                    .parse::<f64>()
                    .map_err(|err| DrawingError::descriptor(&desc.name, format!("bad pts value: {err}")))?;
                DurableAnchor::from_parts(triple[0], offset, value)
            })
            .collect()
    }
}

impl_anchored!(Gartley);

impl Interactive for Gartley {
    fn click(&mut self, host: &dyn ChartHost, tick: i64, value: f64) -> ClickOutcome {
        if self.base.panel(host).is_none() {
            return ClickOutcome::Continue;
        }
        if !self.base.pen_down {
            self.base.set_point(host, AnchorSlot::P0, tick, value);
            self.base.clear(AnchorSlot::P1);
            self.points.clear();
            self.durable_points.clear();
            self.shape = None;
            self.segment = 1;
            self.base.pen_down = true;
            return ClickOutcome::Continue;
        }
        if self.base.accidental_click(host, tick, value) {
            return ClickOutcome::Continue;
        }
        let Some(p0) = self.base.anchor(AnchorSlot::P0) else {
            return ClickOutcome::Continue;
        };
        let candidate = Anchor::new(tick, value);
        if !self.check(p0, candidate) {
            trace!(segment = self.segment, tick, value, "harmonic leg rejected");
            return ClickOutcome::Continue;
        }
        if self.segment == 1 {
            self.points.push(p0);
        }
        self.points.push(candidate);
        self.base.set_point(host, AnchorSlot::P1, tick, value);
        self.segment += 1;
        if self.segment > MAX_SEGMENTS {
            let first = self.points[0];
            self.base.set_point(host, AnchorSlot::P0, first.tick, first.value);
            self.capture_points(host);
            self.base.pen_down = false;
            debug!(shape = ?self.shape, "gartley complete");
            return ClickOutcome::Complete;
        }
        self.base.set_point(host, AnchorSlot::P0, tick, value);
        ClickOutcome::Continue
    }

    fn pointer_move(&mut self, _host: &dyn ChartHost, tick: i64, value: f64) {
        if self.base.pen_down {
            self.base.set_live(AnchorSlot::P1, Some(Anchor::new(tick, value)));
        }
    }

    fn reposition(&mut self, host: &dyn ChartHost, repositioner: &Repositioner, tick: i64, value: f64) {
        if repositioner.action != RepositionAction::Move || repositioner.points.len() != VERTEX_COUNT {
            return;
        }
        let (dt, dv) = repositioner.delta(tick, value);
        self.points = repositioner.points.iter().map(|p| p.offset(dt, dv)).collect();
        self.capture_points(host);
        let (first, last) = (self.points[0], self.points[VERTEX_COUNT - 1]);
        self.base.set_point(host, AnchorSlot::P0, first.tick, first.value);
        self.base.set_point(host, AnchorSlot::P1, last.tick, last.value);
    }

    fn adjust(&mut self, host: &dyn ChartHost) {
        if self.base.panel(host).is_none() || self.durable_points.len() != VERTEX_COUNT {
            return;
        }
        self.base.adjust_slots(host, &[AnchorSlot::P0, AnchorSlot::P1]);
        let resolved: Option<Vec<Anchor>> = self
            .durable_points
            .iter()
            .map(|d| d.resolve(host).map(|tick| Anchor::new(tick, d.value)))
            .collect();
        match resolved {
            Some(points) => self.points = points,
            None => {
                trace!("gartley vertex does not resolve");
                self.points.clear();
            }
        }
    }
}

impl Renderable for Gartley {
    fn render(&mut self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> DrawingResult<()> {
        let Some(panel) = self.base.panel(host) else {
            return Ok(());
        };
        let Some(p0) = self.base.anchor(AnchorSlot::P0) else {
            return Ok(());
        };
        let start = host.anchor_to_pixel(panel, p0);

        if let Some((bound1, bound2)) = self.drop_zone().filter(|_| self.base.pen_down) {
            let y0 = host.pixel_from_value(panel, p0.tick_f64(), bound1);
            let y1 = host.pixel_from_value(panel, p0.tick_f64(), bound2);
            ctx.save();
            ctx.set_fill_color(host.theme().drop_zone_color);
            ctx.set_global_alpha(FILL_OPACITY);
            let result = ctx.fill_rect(start.x, y0, panel.right() - start.x, y1 - y0);
            ctx.restore();
            result?;
        }

        let color = self.base.line_color(host);
        let style = self.base.line_style();
        let leg_end = self.base.anchor(AnchorSlot::P1).map(|p1| host.anchor_to_pixel(panel, p1));
        if let Some(end) = leg_end.filter(|_| self.segment <= MAX_SEGMENTS) {
            plot_line(ctx, panel, start, end, color, LineKind::Segment, style)?;
        }

        if self.points.is_empty() {
            return Ok(());
        }
        let pixels: Vec<Point> = self
            .points
            .iter()
            .take(VERTEX_COUNT)
            .map(|&p| host.anchor_to_pixel(panel, p))
            .collect();
        for pair in pixels.windows(2) {
            plot_line(ctx, panel, pair[0], pair[1], color, LineKind::Segment, style)?;
        }
        if let Some(fill) = self.base.fill_color() {
            let mut outline = pixels.clone();
            if let Some(end) = leg_end.filter(|_| matches!(pixels.len(), 2 | 4)) {
                outline.push(end);
            }
            if let Some(&b) = pixels.get(2) {
                outline.push(b);
            }
            fill_polygon(ctx, &outline, fill, FILL_OPACITY)?;
        }
        Ok(())
    }
}

impl HitTestable for Gartley {
    fn intersected(
        &mut self,
        host: &dyn ChartHost,
        tick: i64,
        value: f64,
        hit_box: HitBox,
    ) -> Option<Repositioner> {
        let panel = self.base.panel(host)?;
        if !self.is_complete() {
            return None;
        }
        let on_leg = self.points.windows(2).any(|pair| {
            line_intersection(
                host,
                panel,
                hit_box,
                LineKind::Segment,
                (pair[0].tick_f64(), pair[0].value),
                (pair[1].tick_f64(), pair[1].value),
            )
        });
        if !on_leg && !self.box_intersection(tick, value) {
            return None;
        }
        let points = self.points.clone();
        Some(self.base.begin_move(tick, value).with_points(&points))
    }
}

impl Serializable for Gartley {
    fn serialize(&self) -> DrawingDescriptor {
        let mut desc = self.base.descriptor();
        self.base
            .write_anchors(&mut desc, &[AnchorSlot::P0, AnchorSlot::P1]);
        desc.pts = self.encode_points();
        desc
    }

    fn reconstruct(host: &dyn ChartHost, desc: &DrawingDescriptor) -> DrawingResult<Self> {
        let first = desc.require_anchor(AnchorSlot::P0)?;
        let last = desc.require_anchor(AnchorSlot::P1)?;
        let inner = Self::decode_points(desc)?;
        if inner.len() != VERTEX_COUNT - 2 {
            return Err(DrawingError::descriptor(
                &desc.name,
                format!("expected {} intermediate points, found {}", VERTEX_COUNT - 2, inner.len()),
            ));
        }
        let mut durable_points = Vec::with_capacity(VERTEX_COUNT);
        durable_points.push(first);
        durable_points.extend(inner);
        durable_points.push(last);
        let mut gartley = Self {
            base: DrawingBase::from_descriptor(DrawingKind::Gartley, desc)?,
            points: Vec::new(),
            durable_points,
            segment: VERTEX_COUNT,
            shape: None,
        };
        gartley.adjust(host);
        gartley.shape = match gartley.points.as_slice() {
            [x, a, ..] if x.value < a.value => Some(GartleyShape::M),
            [_, _, ..] => Some(GartleyShape::W),
            _ => None,
        };
        Ok(gartley)
    }
}

#[cfg(test)]
mod tests {
    use super::{Gartley, GartleyShape};
    use crate::core::geometry::HitBox;
    use crate::drawing::base::DrawingStyle;
    use crate::drawing::traits::{Anchored, HitTestable, Interactive, Renderable, Serializable};
    use crate::interaction::ClickOutcome;
    use crate::render::RecordingContext;
    use crate::test_support::daily_host;

    fn clicks(gartley: &mut Gartley, host: &crate::core::host::StaticChartHost, steps: &[(i64, f64)]) -> ClickOutcome {
        let mut outcome = ClickOutcome::Continue;
        for &(tick, value) in steps {
            gartley.pointer_move(host, tick, value);
            outcome = gartley.click(host, tick, value);
        }
        outcome
    }

    // AB retraces 0.64 of XA, BC 0.69 of AB and CD projects 1.41 of BC.
    const VALID: [(i64, f64); 5] = [(2, 100.0), (6, 150.0), (10, 118.0), (14, 140.0), (18, 105.0)];

    #[test]
    fn valid_pattern_completes_as_m() {
        let host = daily_host(40);
        let mut gartley = Gartley::new("chart", DrawingStyle::default());
        assert_eq!(clicks(&mut gartley, &host, &VALID), ClickOutcome::Complete);
        assert_eq!(gartley.shape(), Some(GartleyShape::M));
        assert!(gartley.is_complete());
        assert!(!gartley.base().pen_down);
    }

    #[test]
    fn half_retracement_is_rejected() {
        let host = daily_host(40);
        let mut gartley = Gartley::new("chart", DrawingStyle::default());
        clicks(&mut gartley, &host, &VALID[..2]);
        assert_eq!(gartley.segment(), 2);
        assert_eq!(gartley.click(&host, 10, 125.0), ClickOutcome::Continue);
        assert_eq!(gartley.segment(), 2);
        assert_eq!(gartley.points().len(), 2);
    }

    #[test]
    fn completed_pattern_moves_and_round_trips() {
        let host = daily_host(40);
        let mut gartley = Gartley::new("chart", DrawingStyle::default());
        clicks(&mut gartley, &host, &VALID);
        let hit = gartley
            .intersected(&host, 4, 125.0, HitBox::new(4.0, 4.0, 125.0, 125.0))
            .expect("hit");
        gartley.reposition(&host, &hit, 5, 130.0);
        assert_eq!(gartley.points()[0].tick, 3);
        assert_eq!(gartley.points()[4].value, 110.0);

        let desc = gartley.serialize();
        assert_eq!(desc.pts.as_deref().map(|p| p.split(',').count()), Some(9));
        let restored = Gartley::reconstruct(&host, &desc).expect("reconstruct");
        assert_eq!(restored.points(), gartley.points());
        assert_eq!(restored.shape(), Some(GartleyShape::M));

        let mut ctx = RecordingContext::new();
        let mut restored = restored;
        restored.render(&mut ctx, &host).expect("render");
        assert_eq!(ctx.strokes().count(), 4);
        assert_eq!(ctx.fills().count(), 1);
    }
}
