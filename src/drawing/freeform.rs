//! Drag-to-draw freehand curve.
//!
//! Nodes are pixel offsets from the start anchor captured at the candle
//! width, y multiplier and interval in effect while drawing; rendering
//! rescales them to the current chart.

use tracing::{debug, trace};

use crate::core::geometry::HitBox;
use crate::core::host::ChartHost;
use crate::core::layout::{Interval, interval_ratio};
use crate::core::pane::Panel;
use crate::core::primitives::round_to;
use crate::core::types::Point;
use crate::drawing::base::{DrawingBase, DrawingStyle};
use crate::drawing::descriptor::DrawingDescriptor;
use crate::drawing::kind::DrawingKind;
use crate::drawing::traits::{HitTestable, Interactive, Renderable, Serializable};
use crate::error::{DrawingError, DrawingResult};
use crate::interaction::{AnchorSlot, ClickOutcome, RepositionAction, Repositioner};
use crate::render::DrawingContext;
use crate::render::plot::{connect_the_dots, plot_spline};

/// Scale in effect when the nodes were captured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureScale {
    pub candle_width: f64,
    pub multiplier: f64,
    pub interval: Interval,
    pub periodicity: u32,
}

/// Extent of the nodes in captured pixel offsets. Y is reversed: `low_y`
/// is the largest offset, the lowest price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeExtent {
    pub low_x: f64,
    pub high_x: f64,
    pub low_y: f64,
    pub high_y: f64,
}

/// Chart-space bounding box of the curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeformBounds {
    pub low_tick: i64,
    pub high_tick: i64,
    pub low_value: f64,
    pub high_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Freeform {
    base: DrawingBase,
    start: Point,
    nodes: Vec<Point>,
    capture: Option<CaptureScale>,
    spline_tension: f64,
}

impl Freeform {
    #[must_use]
    pub fn new(panel_name: impl Into<String>, style: DrawingStyle, spline_tension: f64) -> Self {
        Self {
            base: DrawingBase::new(DrawingKind::Freeform, panel_name, style),
            start: Point::default(),
            nodes: Vec::new(),
            capture: None,
            spline_tension,
        }
    }

    #[must_use]
    pub fn nodes(&self) -> &[Point] {
        &self.nodes
    }

    /// Tension used for painting; splines are suspended while capturing.
    #[must_use]
    pub fn effective_tension(&self) -> f64 {
        if self.base.pen_down { -1.0 } else { self.spline_tension }
    }

    #[must_use]
    pub fn node_extent(&self) -> Option<NodeExtent> {
        let first = self.nodes.first()?;
        Some(self.nodes.iter().skip(1).fold(
            NodeExtent {
                low_x: first.x,
                high_x: first.x,
                low_y: first.y,
                high_y: first.y,
            },
            |extent, node| NodeExtent {
                low_x: extent.low_x.min(node.x),
                high_x: extent.high_x.max(node.x),
                low_y: extent.low_y.max(node.y),
                high_y: extent.high_y.min(node.y),
            },
        ))
    }

    /// Horizontal and vertical rescale factors plus the start pixel under
    /// the host's current scale. `None` when the interval conversion is
    /// undefined.
    fn rescale(&self, host: &dyn ChartHost, panel: &Panel) -> Option<(f64, f64, Point)> {
        let capture = self.capture?;
        let layout = host.layout();
        let ratio = interval_ratio(
            capture.interval,
            layout.interval,
            capture.periodicity,
            layout.periodicity,
            layout.forex,
        );
        if ratio == 0.0 {
            trace!(from = ?capture.interval, to = ?layout.interval, "freeform interval ratio undefined");
            return None;
        }
        let sx = ratio * layout.candle_width() / capture.candle_width;
        let sy = panel.y_axis.multiplier() / capture.multiplier;
        let origin = host.anchor_to_pixel(panel, self.base.anchor(AnchorSlot::P0)?);
        Some((sx, sy, origin))
    }

    /// Chart-space bounds of the curve under the host's current scale.
    #[must_use]
    pub fn bounds(&self, host: &dyn ChartHost) -> Option<FreeformBounds> {
        let panel = self.base.panel(host)?;
        let extent = self.node_extent()?;
        let (sx, sy, origin) = self.rescale(host, panel)?;
        Some(FreeformBounds {
            low_tick: host.tick_from_pixel((sx * extent.low_x).floor() + origin.x),
            high_tick: host.tick_from_pixel((sx * extent.high_x).ceil() + origin.x),
            low_value: host.value_from_pixel(panel, (sy * extent.low_y).floor() + origin.y),
            high_value: host.value_from_pixel(panel, (sy * extent.high_y).ceil() + origin.y),
        })
    }

    fn push_node(&mut self, node: Point) {
        let n = self.nodes.len();
        if n > 2 {
            let (a, b) = (self.nodes[n - 2], self.nodes[n - 1]);
            if (node.x == a.x && node.x == b.x) || (node.y == a.y && node.y == b.y) {
                self.nodes.pop();
            }
        }
        self.nodes.push(node);
    }
}

impl_anchored!(Freeform);

impl Interactive for Freeform {
    fn click(&mut self, host: &dyn ChartHost, tick: i64, value: f64) -> ClickOutcome {
        let Some(panel) = self.base.panel(host) else {
            return ClickOutcome::Continue;
        };
        if self.base.pen_down {
            self.base.pen_down = false;
            debug!(nodes = self.nodes.len(), "freeform capture complete");
            return ClickOutcome::Complete;
        }
        let layout = host.layout();
        self.capture = Some(CaptureScale {
            candle_width: layout.candle_width(),
            multiplier: panel.y_axis.multiplier(),
            interval: layout.interval,
            periodicity: layout.periodicity,
        });
        self.base.set_point(host, AnchorSlot::P0, tick, value);
        self.start = Point::new(
            host.pixel_from_tick(tick as f64),
            host.pixel_from_value(panel, tick as f64, value),
        );
        self.nodes = vec![Point::default()];
        self.base.pen_down = true;
        ClickOutcome::Continue
    }

    fn pointer_move(&mut self, host: &dyn ChartHost, tick: i64, value: f64) {
        if !self.base.pen_down {
            return;
        }
        let Some(panel) = self.base.panel(host) else {
            return;
        };
        let at = Point::new(
            host.pixel_from_tick(tick as f64),
            host.pixel_from_value(panel, tick as f64, value),
        );
        let node = Point::new(at.x - self.start.x, at.y - self.start.y);
        if self.nodes.last() == Some(&node) {
            return;
        }
        self.push_node(node);
    }

    fn reposition(&mut self, host: &dyn ChartHost, repositioner: &Repositioner, tick: i64, value: f64) {
        if repositioner.action != RepositionAction::Move {
            return;
        }
        self.base
            .reposition_anchors(host, repositioner, tick, value, &[AnchorSlot::P0]);
    }

    fn adjust(&mut self, host: &dyn ChartHost) {
        self.base.adjust_slots(host, &[AnchorSlot::P0]);
    }
}

impl Renderable for Freeform {
    fn render(&mut self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> DrawingResult<()> {
        let Some(panel) = self.base.panel(host) else {
            return Ok(());
        };
        let Some((sx, sy, origin)) = self.rescale(host, panel) else {
            return Ok(());
        };
        let points: Vec<Point> = self
            .nodes
            .iter()
            .map(|node| Point::new(sx * node.x + origin.x, sy * node.y + origin.y))
            .collect();
        let color = self.base.line_color(host);
        let style = self.base.line_style();
        let tension = self.effective_tension();
        if tension < 0.0 {
            connect_the_dots(ctx, &points, color, style)
        } else {
            plot_spline(ctx, &points, tension, color, style)
        }
    }
}

impl HitTestable for Freeform {
    fn intersected(
        &mut self,
        host: &dyn ChartHost,
        tick: i64,
        value: f64,
        _hit_box: HitBox,
    ) -> Option<Repositioner> {
        let bounds = self.bounds(host)?;
        let inside = (bounds.low_tick..=bounds.high_tick).contains(&tick)
            && value >= bounds.low_value
            && value <= bounds.high_value;
        inside.then(|| self.base.begin_move(tick, value))
    }
}

impl Serializable for Freeform {
    fn serialize(&self) -> DrawingDescriptor {
        let mut desc = self.base.descriptor();
        desc.fc = None;
        self.base.write_anchors(&mut desc, &[AnchorSlot::P0]);
        if let Some(capture) = self.capture {
            desc.cw = Some(round_to(capture.candle_width, 4));
            desc.mlt = Some(round_to(capture.multiplier, 4));
            desc.inter = Some(capture.interval);
            desc.pd = Some(capture.periodicity);
        }
        desc.nodes = Some(self.nodes.iter().flat_map(|node| [node.x, node.y]).collect());
        desc
    }

    fn reconstruct(host: &dyn ChartHost, desc: &DrawingDescriptor) -> DrawingResult<Self> {
        desc.require_anchor(AnchorSlot::P0)?;
        let missing = |field: &str| DrawingError::descriptor(&desc.name, format!("missing {field}"));
        let candle_width = desc.cw.ok_or_else(|| missing("cw"))?;
        let multiplier = desc.mlt.ok_or_else(|| missing("mlt"))?;
        if candle_width <= 0.0 || multiplier <= 0.0 {
            return Err(DrawingError::descriptor(&desc.name, "cw and mlt must be positive"));
        }
        let flat = desc.nodes.as_deref().ok_or_else(|| missing("nodes"))?;
        if flat.is_empty() || flat.len() % 2 != 0 {
            return Err(DrawingError::descriptor(&desc.name, "nodes must hold x,y pairs"));
        }
        let mut freeform = Self {
            base: DrawingBase::from_descriptor(DrawingKind::Freeform, desc)?,
            start: Point::default(),
            nodes: flat.chunks(2).map(|pair| Point::new(pair[0], pair[1])).collect(),
            capture: Some(CaptureScale {
                candle_width,
                multiplier,
                interval: desc.inter.ok_or_else(|| missing("inter"))?,
                periodicity: desc.pd.unwrap_or(1).max(1),
            }),
            spline_tension: crate::drawing::params::VectorParameters::default().spline_tension,
        };
        freeform.adjust(host);
        Ok(freeform)
    }
}

#[cfg(test)]
mod tests {
    use super::Freeform;
    use crate::core::types::Point;
    use crate::drawing::base::DrawingStyle;
    use crate::drawing::traits::{Anchored, Interactive, Renderable, Serializable};
    use crate::interaction::ClickOutcome;
    use crate::render::RecordingContext;
    use crate::test_support::daily_host;

    #[test]
    fn collinear_nodes_are_pruned() {
        let host = daily_host(40);
        let mut freeform = Freeform::new("chart", DrawingStyle::default(), 0.3);
        freeform.click(&host, 5, 100.0);
        for tick in 6..10 {
            freeform.pointer_move(&host, tick, 100.0);
        }
        assert_eq!(freeform.nodes().len(), 3);
        assert_eq!(freeform.nodes()[2], Point::new(40.0, 0.0));
        assert_eq!(freeform.effective_tension(), -1.0);
        assert_eq!(freeform.click(&host, 9, 100.0), ClickOutcome::Complete);
        assert_eq!(freeform.effective_tension(), 0.3);
    }

    #[test]
    fn bounds_cover_the_curve() {
        let host = daily_host(40);
        let mut freeform = Freeform::new("chart", DrawingStyle::default(), 0.3);
        freeform.click(&host, 5, 100.0);
        freeform.pointer_move(&host, 8, 120.0);
        freeform.pointer_move(&host, 10, 90.0);
        freeform.click(&host, 10, 90.0);
        let bounds = freeform.bounds(&host).expect("bounds");
        assert_eq!((bounds.low_tick, bounds.high_tick), (5, 10));
        assert!(bounds.low_value <= 90.0 && bounds.high_value >= 120.0);
    }

    #[test]
    fn capture_then_round_trip_renders_spline() {
        let host = daily_host(40);
        let mut freeform = Freeform::new("chart", DrawingStyle::default(), 0.3);
        freeform.click(&host, 5, 100.0);
        freeform.pointer_move(&host, 8, 120.0);
        freeform.pointer_move(&host, 10, 90.0);
        freeform.click(&host, 10, 90.0);
        let desc = freeform.serialize();
        assert_eq!(desc.nodes.as_ref().map(Vec::len), Some(6));
        let mut restored = Freeform::reconstruct(&host, &desc).expect("reconstruct");
        assert_eq!(restored.base().anchors(), freeform.base().anchors());
        let mut ctx = RecordingContext::new();
        restored.render(&mut ctx, &host).expect("render");
        assert_eq!(ctx.strokes().count(), 1);
    }

    #[test]
    fn node_extent_reverses_the_y_axis() {
        let host = daily_host(40);
        let mut freeform = Freeform::new("chart", DrawingStyle::default(), 0.3);
        freeform.click(&host, 5, 100.0);
        freeform.pointer_move(&host, 8, 120.0);
        freeform.click(&host, 8, 120.0);
        let mut desc = freeform.serialize();
        desc.nodes = Some(vec![0.0, 0.0, 10.0, 0.0, 10.0, 10.0]);

        let restored = Freeform::reconstruct(&host, &desc).expect("reconstruct");
        let extent = restored.node_extent().expect("extent");
        assert_eq!((extent.low_x, extent.high_x), (0.0, 10.0));
        assert_eq!((extent.low_y, extent.high_y), (10.0, 0.0));
    }
}
