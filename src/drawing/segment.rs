use crate::core::geometry::{HitBox, LineKind};
use crate::core::host::ChartHost;
use crate::drawing::base::{DrawingBase, DrawingStyle};
use crate::drawing::descriptor::DrawingDescriptor;
use crate::drawing::kind::DrawingKind;
use crate::drawing::traits::{HitTestable, Renderable, Serializable};
use crate::drawing::two_point;
use crate::error::DrawingResult;
use crate::interaction::{AnchorSlot, Repositioner};
use crate::render::DrawingContext;
use crate::render::plot::plot_line;

/// Straight line between two anchors.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    base: DrawingBase,
}

impl Segment {
    #[must_use]
    pub fn new(panel_name: impl Into<String>, style: DrawingStyle) -> Self {
        Self {
            base: DrawingBase::new(DrawingKind::Segment, panel_name, style),
        }
    }
}

impl_anchored!(Segment);
two_point_interactive!(Segment);

impl Renderable for Segment {
    fn render(&mut self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> DrawingResult<()> {
        let Some(panel) = self.base.panel(host) else {
            return Ok(());
        };
        let Some((p0, p1)) = self.base.pair() else {
            return Ok(());
        };
        let a = host.anchor_to_pixel(panel, p0);
        let b = host.anchor_to_pixel(panel, p1);
        plot_line(
            ctx,
            panel,
            a,
            b,
            self.base.line_color(host),
            LineKind::Segment,
            self.base.line_style(),
        )?;
        self.base
            .render_handles(ctx, host, &[(AnchorSlot::P0, a), (AnchorSlot::P1, b)])
    }
}

impl HitTestable for Segment {
    fn intersected(
        &mut self,
        host: &dyn ChartHost,
        tick: i64,
        value: f64,
        hit_box: HitBox,
    ) -> Option<Repositioner> {
        two_point::intersected(&mut self.base, host, tick, value, hit_box, LineKind::Segment)
    }
}

impl Serializable for Segment {
    fn serialize(&self) -> DrawingDescriptor {
        two_point::serialize(&self.base)
    }

    fn reconstruct(host: &dyn ChartHost, desc: &DrawingDescriptor) -> DrawingResult<Self> {
        Ok(Self {
            base: two_point::reconstruct(DrawingKind::Segment, host, desc)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Segment;
    use crate::core::geometry::HitBox;
    use crate::drawing::base::DrawingStyle;
    use crate::drawing::traits::{Anchored, HitTestable, Interactive, Renderable, Serializable};
    use crate::interaction::{AnchorSlot, ClickOutcome, Highlight, RepositionAction};
    use crate::render::RecordingContext;
    use crate::test_support::daily_host;

    fn built(host: &crate::core::host::StaticChartHost) -> Segment {
        let mut segment = Segment::new("chart", DrawingStyle::default());
        assert_eq!(segment.click(host, 10, 100.0), ClickOutcome::Continue);
        assert_eq!(segment.click(host, 20, 110.0), ClickOutcome::Complete);
        segment
    }

    #[test]
    fn hit_on_the_line_moves_the_drawing() {
        let host = daily_host(40);
        let mut segment = built(&host);
        let hit = segment
            .intersected(&host, 15, 105.0, HitBox::new(14.0, 16.0, 106.0, 104.0))
            .expect("hit");
        assert_eq!(hit.action, RepositionAction::Move);
        assert_eq!(segment.base().highlighted, Highlight::Whole);
        assert!(segment
            .intersected(&host, 15, 200.0, HitBox::new(14.0, 16.0, 201.0, 199.0))
            .is_none());
    }

    #[test]
    fn handle_hit_drags_that_anchor() {
        let host = daily_host(40);
        let mut segment = built(&host);
        let hit = segment
            .intersected(&host, 20, 110.0, HitBox::new(19.0, 21.0, 111.0, 109.0))
            .expect("hit");
        assert_eq!(hit.action, RepositionAction::Drag);
        assert_eq!(hit.point, Some(AnchorSlot::P1));
        segment.reposition(&host, &hit, 25, 90.0);
        let p1 = segment.base().anchor(AnchorSlot::P1).expect("p1");
        assert_eq!((p1.tick, p1.value), (25, 90.0));
        assert_eq!(segment.base().durable(AnchorSlot::P1).and_then(|d| d.resolve(&host)), Some(25));
    }

    #[test]
    fn move_translates_both_anchors() {
        let host = daily_host(40);
        let mut segment = built(&host);
        let hit = segment
            .intersected(&host, 15, 105.0, HitBox::new(14.0, 16.0, 106.0, 104.0))
            .expect("hit");
        segment.reposition(&host, &hit, 18, 100.0);
        let p0 = segment.base().anchor(AnchorSlot::P0).expect("p0");
        let p1 = segment.base().anchor(AnchorSlot::P1).expect("p1");
        assert_eq!((p0.tick, p0.value), (13, 95.0));
        assert_eq!((p1.tick, p1.value), (23, 105.0));
    }

    #[test]
    fn renders_one_stroke_and_round_trips() {
        let host = daily_host(40);
        let mut segment = built(&host);
        let mut ctx = RecordingContext::new();
        segment.render(&mut ctx, &host).expect("render");
        assert_eq!(ctx.strokes().count(), 1);
        assert_eq!(ctx.save_depth(), 0);

        let restored = Segment::reconstruct(&host, &segment.serialize()).expect("reconstruct");
        assert_eq!(restored.base().anchors(), segment.base().anchors());
    }
}
