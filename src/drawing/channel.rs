//! Two parallel rails. `p2` always shares `p1`'s tick; only its value,
//! the far end of the second rail, is free.

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

const FILL_OPACITY: f64 = 0.2;

#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    base: DrawingBase,
}

impl Channel {
    #[must_use]
    pub fn new(panel_name: impl Into<String>, style: DrawingStyle) -> Self {
        Self {
            base: DrawingBase::new(DrawingKind::Channel, panel_name, style),
        }
    }

    /// Value offset of the second rail from the baseline.
    fn rail_offset(&self) -> Option<f64> {
        Some(self.base.anchor(AnchorSlot::P2)?.value - self.base.anchor(AnchorSlot::P1)?.value)
    }

    /// Re-pins `p2` to `p1`'s tick, keeping the rail offset.
    fn pin_rail(&mut self, host: &dyn ChartHost, offset: f64) {
        if let Some(p1) = self.base.anchor(AnchorSlot::P1) {
            self.base.set_point(host, AnchorSlot::P2, p1.tick, p1.value + offset);
        }
    }

    /// Whether `(tick, value)` lies strictly between the rails and inside
    /// the baseline's tick span.
    fn box_intersection(&self, tick: i64, value: f64) -> bool {
        let anchors = self.base.anchors();
        let (Some(p0), Some(p1), Some(p2)) = (anchors[0], anchors[1], anchors[2]) else {
            return false;
        };
        if tick > p0.tick.max(p1.tick) || tick < p0.tick.min(p1.tick) {
            return false;
        }
        let (t, v) = (tick as f64, value);
        let (t0, t1, t2) = (p0.tick_f64(), p1.tick_f64(), p2.tick_f64());
        let s1 = (t1 - t0) * (v - p0.value) - (p1.value - p0.value) * (t - t0);
        let s2 = (t2 - t0) * (v - (p0.value + p2.value - p1.value)) - (p1.value - p0.value) * (t - t0);
        s1 * s2 < 0.0
    }
}

impl_anchored!(Channel);

impl Interactive for Channel {
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
        if let Some(p2) = self.base.anchor(AnchorSlot::P2) {
            self.base.set_point(host, AnchorSlot::P2, p2.tick, p2.value);
            self.base.pen_down = false;
            debug!(kind = %self.base.kind(), "construction complete");
            return ClickOutcome::Complete;
        }
        let Some(p0) = self.base.anchor(AnchorSlot::P0) else {
            return ClickOutcome::Continue;
        };
        if p0.tick == tick {
            trace!("vertical channel baseline rejected");
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
        let anchors = *self.base.anchors();
        match (anchors[0], anchors[1], anchors[2]) {
            (Some(p0), Some(p1), Some(_)) if p1.tick != p0.tick => {
                let slope = (p1.value - p0.value) / (p1.tick - p0.tick) as f64;
                let rail = value - slope * (tick - p1.tick) as f64;
                self.base.set_live(AnchorSlot::P2, Some(Anchor::new(p1.tick, rail)));
            }
            (_, _, None) => self.base.set_live(AnchorSlot::P1, Some(Anchor::new(tick, value))),
            _ => {}
        }
    }

    fn reposition(&mut self, host: &dyn ChartHost, repositioner: &Repositioner, tick: i64, value: f64) {
        let Some(offset) = self.rail_offset() else {
            return;
        };
        match (repositioner.action, repositioner.point) {
            (RepositionAction::Drag, Some(AnchorSlot::P2)) => {
                let (Some(p0), Some(p1)) = (self.base.anchor(AnchorSlot::P0), self.base.anchor(AnchorSlot::P1)) else {
                    return;
                };
                // The rail end slides along p1's tick.
                let rail = if p1.tick == p0.tick {
                    value
                } else {
                    let slope = (p1.value - p0.value) / (p1.tick - p0.tick) as f64;
                    value - slope * (tick - p1.tick) as f64
                };
                self.base.set_point(host, AnchorSlot::P2, p1.tick, rail);
            }
            (RepositionAction::Drag, Some(_)) => {
                self.base.reposition_anchors(host, repositioner, tick, value, &[AnchorSlot::P0, AnchorSlot::P1]);
                self.pin_rail(host, offset);
            }
            _ => self.base.reposition_anchors(host, repositioner, tick, value, &AnchorSlot::ALL),
        }
    }

    fn adjust(&mut self, host: &dyn ChartHost) {
        self.base.adjust_slots(host, &AnchorSlot::ALL);
    }
}

impl Renderable for Channel {
    fn render(&mut self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> DrawingResult<()> {
        let Some(panel) = self.base.panel(host) else {
            return Ok(());
        };
        let Some((p0, p1)) = self.base.pair() else {
            return Ok(());
        };
        let a = host.anchor_to_pixel(panel, p0);
        let b = host.anchor_to_pixel(panel, p1);
        let rail_end = self.base.anchor(AnchorSlot::P2).map(|p2| host.anchor_to_pixel(panel, p2));
        let color = self.base.line_color(host);
        let style = self.base.line_style();

        if let (Some(c), Some(fill)) = (rail_end, self.base.fill_color()) {
            let quad = [a, b, c, Point::new(a.x, a.y + (c.y - b.y))];
            fill_polygon(ctx, &quad, fill, FILL_OPACITY)?;
        }
        plot_line(ctx, panel, a, b, color, LineKind::Segment, style)?;
        let mut handles = vec![(AnchorSlot::P0, a), (AnchorSlot::P1, b)];
        if let Some(c) = rail_end {
            let rail_start = Point::new(a.x, a.y + (c.y - b.y));
            plot_line(ctx, panel, rail_start, c, color, LineKind::Segment, style)?;
            handles.push((AnchorSlot::P2, c));
        }
        self.base.render_handles(ctx, host, &handles)
    }
}

impl HitTestable for Channel {
    fn intersected(
        &mut self,
        host: &dyn ChartHost,
        tick: i64,
        value: f64,
        hit_box: HitBox,
    ) -> Option<Repositioner> {
        let panel = self.base.panel(host)?;
        let anchors = *self.base.anchors();
        let (p0, p1, p2) = (anchors[0]?, anchors[1]?, anchors[2]?);
        if let Some(hit) = self.base.hit_handles(host, panel, hit_box, &AnchorSlot::ALL, tick, value) {
            return Some(hit);
        }
        let rail_start = (p0.tick_f64(), p0.value + p2.value - p1.value);
        let on_rails = line_intersection(
            host,
            panel,
            hit_box,
            LineKind::Segment,
            (p0.tick_f64(), p0.value),
            (p1.tick_f64(), p1.value),
        ) || line_intersection(host, panel, hit_box, LineKind::Segment, rail_start, (p2.tick_f64(), p2.value));
        (on_rails || self.box_intersection(tick, value)).then(|| self.base.begin_move(tick, value))
    }
}

impl Serializable for Channel {
    fn serialize(&self) -> DrawingDescriptor {
        let mut desc = self.base.descriptor();
        self.base.write_anchors(&mut desc, &[AnchorSlot::P0, AnchorSlot::P1]);
        desc.v2 = self.base.durable(AnchorSlot::P2).map(|d| d.value);
        desc
    }

    fn reconstruct(host: &dyn ChartHost, desc: &DrawingDescriptor) -> DrawingResult<Self> {
        desc.require_anchor(AnchorSlot::P0)?;
        let d1 = desc.require_anchor(AnchorSlot::P1)?;
        let v2 = desc
            .v2
            .ok_or_else(|| DrawingError::descriptor(&desc.name, "missing rail value v2"))?;
        let mut base = DrawingBase::from_descriptor(DrawingKind::Channel, desc)?;
        base.set_durable(AnchorSlot::P2, Some(DurableAnchor { value: v2, ..d1 }));
        let mut channel = Self { base };
        channel.adjust(host);
        Ok(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::Channel;
    use crate::core::geometry::HitBox;
    use crate::drawing::base::DrawingStyle;
    use crate::drawing::traits::{Anchored, HitTestable, Interactive, Serializable};
    use crate::interaction::{AnchorSlot, ClickOutcome, RepositionAction};
    use crate::test_support::daily_host;

    fn built(host: &crate::core::host::StaticChartHost) -> Channel {
        let mut channel = Channel::new("chart", DrawingStyle::default());
        assert_eq!(channel.click(host, 10, 100.0), ClickOutcome::Continue);
        channel.pointer_move(host, 20, 110.0);
        assert_eq!(channel.click(host, 20, 110.0), ClickOutcome::Continue);
        channel.pointer_move(host, 25, 95.0);
        assert_eq!(channel.click(host, 25, 95.0), ClickOutcome::Complete);
        channel
    }

    #[test]
    fn rail_end_follows_baseline_slope() {
        let host = daily_host(40);
        let channel = built(&host);
        let p2 = channel.base().anchor(AnchorSlot::P2).expect("p2");
        assert_eq!(p2.tick, 20);
        assert!((p2.value - 90.0).abs() < 1e-9);
    }

    #[test]
    fn vertical_baseline_is_rejected() {
        let host = daily_host(40);
        let mut channel = Channel::new("chart", DrawingStyle::default());
        channel.click(&host, 10, 100.0);
        assert_eq!(channel.click(&host, 10, 150.0), ClickOutcome::Continue);
        assert_eq!(channel.base().anchor(AnchorSlot::P1), None);
        assert!(channel.base().pen_down);
    }

    #[test]
    fn inside_the_rails_moves_the_channel() {
        let host = daily_host(40);
        let mut channel = built(&host);
        let hit = channel
            .intersected(&host, 15, 100.0, HitBox::new(15.0, 15.0, 100.0, 100.0))
            .expect("hit");
        assert_eq!(hit.action, RepositionAction::Move);
        assert!(channel
            .intersected(&host, 30, 100.0, HitBox::new(30.0, 30.0, 100.0, 100.0))
            .is_none());
    }

    #[test]
    fn round_trip_keeps_rail_value() {
        let host = daily_host(40);
        let channel = built(&host);
        let desc = channel.serialize();
        assert!(desc.d2.is_none());
        assert_eq!(desc.v2, Some(90.0));
        let restored = Channel::reconstruct(&host, &desc).expect("reconstruct");
        assert_eq!(restored.base().anchors(), channel.base().anchors());
    }
}
