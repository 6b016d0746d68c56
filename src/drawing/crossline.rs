use tracing::debug;

use crate::core::geometry::{HitBox, LineKind, line_intersection, point_intersection};
use crate::core::host::ChartHost;
use crate::core::layout::Interval;
use crate::core::primitives::format_fixed;
use crate::core::types::{Anchor, Point};
use crate::drawing::base::{DrawingBase, DrawingStyle};
use crate::drawing::descriptor::DrawingDescriptor;
use crate::drawing::kind::DrawingKind;
use crate::drawing::traits::{HitTestable, Interactive, Renderable, Serializable};
use crate::error::DrawingResult;
use crate::interaction::{AnchorSlot, ClickOutcome, Highlight, Repositioner};
use crate::render::DrawingContext;
use crate::render::plot::{axis_label, plot_line, time_label};

const SLOTS: [AnchorSlot; 1] = [AnchorSlot::P0];

/// Horizontal and vertical lines through a single anchor, optionally with
/// price and date labels on the axes.
#[derive(Debug, Clone, PartialEq)]
pub struct Crossline {
    base: DrawingBase,
    axis_label: bool,
}

impl Crossline {
    #[must_use]
    pub fn new(panel_name: impl Into<String>, style: DrawingStyle, axis_label: bool) -> Self {
        Self {
            base: DrawingBase::new(DrawingKind::Crossline, panel_name, style),
            axis_label,
        }
    }

    #[must_use]
    pub fn axis_label(&self) -> bool {
        self.axis_label
    }

    fn date_text(host: &dyn ChartHost, tick: i64) -> Option<String> {
        let date = host.date_from_tick(tick)?;
        let pattern = match host.layout().interval {
            Interval::Minutes(_) => "%m-%d %H:%M",
            Interval::Day | Interval::Week | Interval::Month => "%Y-%m-%d",
        };
        Some(date.format(pattern).to_string())
    }
}

impl_anchored!(Crossline);

impl Interactive for Crossline {
    /// One click places the cross.
    fn click(&mut self, host: &dyn ChartHost, tick: i64, value: f64) -> ClickOutcome {
        if self.base.panel(host).is_none() {
            return ClickOutcome::Continue;
        }
        self.base.set_point(host, AnchorSlot::P0, tick, value);
        self.base.pen_down = false;
        debug!(kind = %self.base.kind(), tick, value, "crossline placed");
        ClickOutcome::Complete
    }

    fn pointer_move(&mut self, _host: &dyn ChartHost, tick: i64, value: f64) {
        if self.base.pen_down {
            self.base.set_live(AnchorSlot::P0, Some(Anchor::new(tick, value)));
        }
    }

    fn reposition(&mut self, host: &dyn ChartHost, repositioner: &Repositioner, tick: i64, value: f64) {
        self.base
            .reposition_anchors(host, repositioner, tick, value, &SLOTS);
    }

    fn adjust(&mut self, host: &dyn ChartHost) {
        self.base.adjust_slots(host, &SLOTS);
    }
}

impl Renderable for Crossline {
    fn render(&mut self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> DrawingResult<()> {
        let Some(panel) = self.base.panel(host) else {
            return Ok(());
        };
        let Some(p0) = self.base.anchor(AnchorSlot::P0) else {
            return Ok(());
        };
        let at = host.anchor_to_pixel(panel, p0);
        let color = self.base.line_color(host);
        let style = self.base.line_style();
        plot_line(ctx, panel, at, Point::new(at.x + 100.0, at.y), color, LineKind::Horizontal, style)?;
        plot_line(ctx, panel, at, Point::new(at.x, at.y + 100.0), color, LineKind::Vertical, style)?;

        if self.axis_label {
            axis_label(ctx, panel, host.theme(), &format_fixed(p0.value, 2), at.y, color)?;
            if p0.tick >= 0 {
                if let Some(text) = Self::date_text(host, p0.tick) {
                    time_label(ctx, panel, host.theme(), &text, at.x, color)?;
                }
            }
        }
        self.base.render_handles(ctx, host, &[(AnchorSlot::P0, at)])
    }
}

impl HitTestable for Crossline {
    fn intersected(
        &mut self,
        host: &dyn ChartHost,
        tick: i64,
        value: f64,
        hit_box: HitBox,
    ) -> Option<Repositioner> {
        let panel = self.base.panel(host)?;
        let p0 = self.base.anchor(AnchorSlot::P0)?;
        let origin = (p0.tick_f64(), p0.value);
        let hit = line_intersection(host, panel, hit_box, LineKind::Line, origin, (p0.tick_f64() + 1.0, p0.value))
            || line_intersection(host, panel, hit_box, LineKind::Line, origin, (p0.tick_f64(), p0.value + 1.0));
        if !hit {
            return None;
        }
        let repositioner = self.base.begin_move(tick, value);
        if point_intersection(host, panel, p0, hit_box) {
            self.base.highlighted = Highlight::Anchor(AnchorSlot::P0);
        }
        Some(repositioner)
    }
}

impl Serializable for Crossline {
    fn serialize(&self) -> DrawingDescriptor {
        let mut desc = self.base.descriptor();
        self.base.write_anchors(&mut desc, &SLOTS);
        desc.al = self.axis_label.then_some(true);
        desc
    }

    fn reconstruct(host: &dyn ChartHost, desc: &DrawingDescriptor) -> DrawingResult<Self> {
        desc.require_anchor(AnchorSlot::P0)?;
        let mut crossline = Self {
            base: DrawingBase::from_descriptor(DrawingKind::Crossline, desc)?,
            axis_label: desc.al.unwrap_or(false),
        };
        crossline.adjust(host);
        Ok(crossline)
    }
}
