//! Quadrant lines and Tirone levels: the close range between the anchors
//! split into quarters or thirds.

use ordered_float::OrderedFloat;
use tracing::trace;

use crate::core::geometry::{HitBox, LineKind, point_intersection};
use crate::core::host::ChartHost;
use crate::core::types::Point;
use crate::drawing::base::{DrawingBase, DrawingStyle};
use crate::drawing::descriptor::DrawingDescriptor;
use crate::drawing::kind::DrawingKind;
use crate::drawing::statistics::closes_between;
use crate::drawing::traits::{HitTestable, Renderable, Serializable};
use crate::drawing::two_point;
use crate::error::{DrawingError, DrawingResult};
use crate::interaction::{AnchorSlot, Highlight, Repositioner};
use crate::render::DrawingContext;
use crate::render::plot::plot_line;

const FILL_OPACITY: f64 = 0.1;
const TIRONE_MEAN_OPACITY: f64 = 0.2;

/// Highest and lowest close over a tick span, with the derived levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeSplit {
    pub high: f64,
    pub low: f64,
}

impl RangeSplit {
    #[must_use]
    pub fn from_closes(closes: &[f64]) -> Option<Self> {
        let high = closes.iter().copied().map(OrderedFloat).max()?;
        let low = closes.iter().copied().map(OrderedFloat).min()?;
        Some(Self {
            high: high.into_inner(),
            low: low.into_inner(),
        })
    }

    #[must_use]
    pub fn mean(self) -> f64 {
        (self.high + self.low) / 2.0
    }

    /// Inner partition lines: quartiles for quadrant lines, thirds for
    /// Tirone levels.
    #[must_use]
    pub fn inner_levels(self, kind: DrawingKind) -> [f64; 2] {
        let (high, low) = (self.high, self.low);
        if kind == DrawingKind::Tirone {
            [(2.0 * high + low) / 3.0, (high + 2.0 * low) / 3.0]
        } else {
            let mean = self.mean();
            [(high + mean) / 2.0, (low + mean) / 2.0]
        }
    }
}

/// One struct serves both tools; the kind picks the partition.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeLevels {
    base: DrawingBase,
    /// Range from the last render, used to bound hits.
    range: Option<RangeSplit>,
}

impl RangeLevels {
    pub fn new(kind: DrawingKind, panel_name: impl Into<String>, style: DrawingStyle) -> DrawingResult<Self> {
        if !matches!(kind, DrawingKind::Quadrant | DrawingKind::Tirone) {
            return Err(DrawingError::UnknownDrawing(kind.to_string()));
        }
        Ok(Self {
            base: DrawingBase::new(kind, panel_name, style),
            range: None,
        })
    }

    #[must_use]
    pub fn range(&self, host: &dyn ChartHost) -> Option<RangeSplit> {
        let (p0, p1) = self.base.pair()?;
        RangeSplit::from_closes(&closes_between(host, p0.tick, p1.tick))
    }

    fn box_contains(&self, tick: i64, value: f64) -> bool {
        let Some((p0, p1)) = self.base.pair() else {
            return false;
        };
        if tick < p0.tick.min(p1.tick) || tick > p0.tick.max(p1.tick) {
            return false;
        }
        self.range
            .is_some_and(|range| value >= range.low && value <= range.high)
    }
}

impl_anchored!(RangeLevels);
two_point_interactive!(RangeLevels);

impl Renderable for RangeLevels {
    fn render(&mut self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> DrawingResult<()> {
        let (Some(panel), Some((p0, p1))) = (self.base.panel(host), self.base.pair()) else {
            return Ok(());
        };
        let x0 = host.pixel_from_tick(p0.tick_f64());
        let x1 = host.pixel_from_tick(p1.tick_f64());
        if (x0 < panel.left() && x1 < panel.left()) || (x0 > panel.right() && x1 > panel.right()) {
            return Ok(());
        }
        let Some(range) = self.range(host) else {
            trace!(kind = %self.base.kind(), "no closes in range");
            return Ok(());
        };
        self.range = Some(range);

        let y_of = |value: f64| host.pixel_from_value(panel, p0.tick_f64(), value);
        let top = y_of(range.high);
        let bottom = y_of(range.low);
        let middle = y_of(range.mean());
        let [upper, lower] = range.inner_levels(self.base.kind()).map(y_of);
        let color = self.base.line_color(host);
        let style = self.base.line_style();

        for y in [top, bottom, upper, lower] {
            plot_line(ctx, panel, Point::new(x0, y), Point::new(x1, y), color, LineKind::Segment, style)?;
        }
        for x in [x0, x1] {
            plot_line(ctx, panel, Point::new(x, top), Point::new(x, bottom), color, LineKind::Segment, style)?;
        }
        let mean_style = if self.base.kind() == DrawingKind::Tirone {
            style.with_opacity(TIRONE_MEAN_OPACITY)
        } else {
            style.with_opacity(1.0)
        };
        plot_line(ctx, panel, Point::new(x0, middle), Point::new(x1, middle), color, LineKind::Segment, mean_style)?;

        ctx.save();
        ctx.set_fill_color(self.base.fill_or_default(host));
        ctx.set_global_alpha(FILL_OPACITY);
        let filled = ctx
            .fill_rect(x0, top, x1 - x0, bottom - top)
            .and_then(|()| ctx.fill_rect(x0, upper, x1 - x0, lower - upper));
        ctx.restore();
        filled?;

        if self.base.highlighted.is_active() {
            self.base.render_handles(
                ctx,
                host,
                &[(AnchorSlot::P0, Point::new(x0, middle)), (AnchorSlot::P1, Point::new(x1, middle))],
            )
        } else {
            self.base.set_point(host, AnchorSlot::P0, p0.tick, range.mean());
            self.base.set_point(host, AnchorSlot::P1, p1.tick, range.mean());
            Ok(())
        }
    }
}

impl HitTestable for RangeLevels {
    fn intersected(
        &mut self,
        host: &dyn ChartHost,
        tick: i64,
        value: f64,
        hit_box: HitBox,
    ) -> Option<Repositioner> {
        let panel = self.base.panel(host)?;
        let (p0, p1) = self.base.pair()?;
        for (slot, anchor) in [(AnchorSlot::P0, p0), (AnchorSlot::P1, p1)] {
            if point_intersection(host, panel, anchor, hit_box) {
                self.base.highlighted = Highlight::Anchor(slot);
                return Some(Repositioner::drag(slot, self.base.anchors(), tick, value));
            }
        }
        self.box_contains(tick, value)
            .then(|| self.base.begin_move(tick, value))
    }
}

impl Serializable for RangeLevels {
    fn serialize(&self) -> DrawingDescriptor {
        two_point::serialize(&self.base)
    }

    fn reconstruct(host: &dyn ChartHost, desc: &DrawingDescriptor) -> DrawingResult<Self> {
        let kind: DrawingKind = desc.name.parse()?;
        let mut levels = Self::new(kind, desc.pnl.clone().unwrap_or_default(), DrawingStyle::default())?;
        levels.base = two_point::reconstruct(kind, host, desc)?;
        Ok(levels)
    }
}
