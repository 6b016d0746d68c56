//! Andrews' pitchfork: a median ray from `p0` through the midpoint of
//! `p1`-`p2` and two parallel rails from `p1` and `p2`.

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::core::geometry::{HitBox, LineKind, pixel_line_intersection};
use crate::core::host::ChartHost;
use crate::core::types::{Anchor, Point};
use crate::drawing::base::{DrawingBase, DrawingStyle};
use crate::drawing::descriptor::DrawingDescriptor;
use crate::drawing::kind::DrawingKind;
use crate::drawing::traits::{HitTestable, Interactive, Renderable, Serializable};
use crate::error::DrawingResult;
use crate::interaction::{AnchorSlot, ClickOutcome, Repositioner};
use crate::render::DrawingContext;
use crate::render::plot::plot_line;

/// Pixel run used to give the rails their direction.
const RAIL_RUN: f64 = 50.0;

/// Pixel lines of a pitchfork: the `p1`-`p2` segment first, then rays.
#[must_use]
pub fn pitchfork_rays(p0: Point, p1: Point, p2: Point) -> SmallVec<[(Point, Point); 4]> {
    let mut rays: SmallVec<[(Point, Point); 4]> = SmallVec::new();
    rays.push((p1, p2));
    rays.push((p0, p1.midpoint(p2)));
    if p1 == p2 {
        return rays;
    }
    let denom = 2.0 * p0.x - p1.x - p2.x;
    let run = if denom < 0.0 { -RAIL_RUN } else { RAIL_RUN };
    let rise = (2.0 * p0.y - p1.y - p2.y) * run / denom;
    if !rise.is_finite() {
        trace!("pitchfork rails are degenerate");
        return rays;
    }
    rays.push((p1, Point::new(p1.x - run, p1.y - rise)));
    rays.push((p2, Point::new(p2.x - run, p2.y - rise)));
    rays
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pitchfork {
    base: DrawingBase,
}

impl Pitchfork {
    #[must_use]
    pub fn new(panel_name: impl Into<String>, style: DrawingStyle) -> Self {
        Self {
            base: DrawingBase::new(DrawingKind::Pitchfork, panel_name, style),
        }
    }

    fn pixels(&self, host: &dyn ChartHost) -> Option<[Point; 3]> {
        let panel = self.base.panel(host)?;
        let (p0, p1) = self.base.pair()?;
        let p2 = self.base.anchor(AnchorSlot::P2).unwrap_or(p1);
        Some([
            host.anchor_to_pixel(panel, p0),
            host.anchor_to_pixel(panel, p1),
            host.anchor_to_pixel(panel, p2),
        ])
    }
}

impl_anchored!(Pitchfork);

impl Interactive for Pitchfork {
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
        if self.base.anchor(AnchorSlot::P0).is_some_and(|p0| p0.tick == tick) {
            trace!("vertical pitchfork handle rejected");
            self.base.clear(AnchorSlot::P1);
            return ClickOutcome::Continue;
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

impl Renderable for Pitchfork {
    fn render(&mut self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> DrawingResult<()> {
        let (Some(panel), Some([a, b, c])) = (self.base.panel(host), self.pixels(host)) else {
            return Ok(());
        };
        let color = self.base.line_color(host);
        let style = self.base.line_style();
        for (i, (from, to)) in pitchfork_rays(a, b, c).into_iter().enumerate() {
            let kind = if i == 0 { LineKind::Segment } else { LineKind::Ray };
            plot_line(ctx, panel, from, to, color, kind, style)?;
        }
        self.base.render_handles(
            ctx,
            host,
            &[(AnchorSlot::P0, a), (AnchorSlot::P1, b), (AnchorSlot::P2, c)],
        )
    }
}

impl HitTestable for Pitchfork {
    fn intersected(
        &mut self,
        host: &dyn ChartHost,
        tick: i64,
        value: f64,
        hit_box: HitBox,
    ) -> Option<Repositioner> {
        let panel = self.base.panel(host)?;
        self.base.anchor(AnchorSlot::P2)?;
        let [a, b, c] = self.pixels(host)?;
        if let Some(hit) = self.base.hit_handles(host, panel, hit_box, &AnchorSlot::ALL, tick, value) {
            return Some(hit);
        }
        let hit = pitchfork_rays(a, b, c).into_iter().enumerate().any(|(i, (from, to))| {
            let kind = if i == 0 { LineKind::Segment } else { LineKind::Ray };
            pixel_line_intersection(host, panel, hit_box, kind, from, to)
        });
        hit.then(|| self.base.begin_move(tick, value))
    }
}

impl Serializable for Pitchfork {
    fn serialize(&self) -> DrawingDescriptor {
        let mut desc = self.base.descriptor();
        desc.fc = None;
        self.base.write_anchors(&mut desc, &AnchorSlot::ALL);
        desc
    }

    fn reconstruct(host: &dyn ChartHost, desc: &DrawingDescriptor) -> DrawingResult<Self> {
        for slot in AnchorSlot::ALL {
            desc.require_anchor(slot)?;
        }
        let mut pitchfork = Self {
            base: DrawingBase::from_descriptor(DrawingKind::Pitchfork, desc)?,
        };
        pitchfork.adjust(host);
        Ok(pitchfork)
    }
}
