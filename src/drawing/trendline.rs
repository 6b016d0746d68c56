//! Segment annotated with its price change and bar count in a callout that
//! follows the segment.

use tracing::warn;

use crate::core::geometry::{HitBox, LineKind};
use crate::core::host::ChartHost;
use crate::core::pane::Panel;
use crate::core::primitives::format_fixed;
use crate::core::types::{Anchor, Point};
use crate::drawing::base::{DrawingBase, DrawingStyle, InteractionTolerances};
use crate::drawing::callout::{Callout, StemColumn, StemEntry};
use crate::drawing::descriptor::DrawingDescriptor;
use crate::drawing::kind::DrawingKind;
use crate::drawing::traits::{Anchored, HitTestable, Interactive, Renderable, Serializable};
use crate::drawing::two_point;
use crate::error::DrawingResult;
use crate::interaction::{AnchorSlot, ClickOutcome, Highlight, Repositioner};
use crate::render::plot::plot_line;
use crate::render::{DrawingContext, FontSpec};

/// Extra callout distance unless the stem enters through the middle column.
const OFF_CENTRE_STEM_ROOM: f64 = 50.0;
/// Spans shorter than this place the stem on the drawn line.
const INTERPOLATED_STEM_SPAN: i64 = 20;

/// `Δ (Δ%) N Bars`; the percentage is left out when `p0` sits at zero.
#[must_use]
pub fn trend_text(p0: Anchor, p1: Anchor) -> String {
    let delta = p1.value - p0.value;
    let percent = if p0.value == 0.0 {
        " ".to_owned()
    } else {
        format!(" ({}%) ", format_fixed(100.0 * delta / p0.value, 2))
    };
    format!("{}{percent}{} Bars", format_fixed(delta, 2), (p1.tick - p0.tick).abs())
}

/// Point `distance` pixels from the midpoint of `a`-`b` along its normal;
/// above a rising segment, below a falling one.
#[must_use]
pub fn callout_centre(a: Point, b: Point, distance: f64, falling: bool) -> Point {
    let mid = Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
    let length = a.distance_to(b);
    let direction = if falling { 1.0 } else { -1.0 };
    let scalar = distance / if length > 0.0 { length } else { distance } * direction;
    Point::new(-(b.y - mid.y) * scalar + mid.x, (b.x - mid.x) * scalar + mid.y)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trendline {
    base: DrawingBase,
    font: FontSpec,
    callout: Callout,
}

impl Trendline {
    #[must_use]
    pub fn new(panel_name: impl Into<String>, style: DrawingStyle, font: FontSpec) -> Self {
        let base = DrawingBase::new(DrawingKind::Trendline, panel_name, style);
        let callout = Self::owned_callout(&base, &font);
        Self { base, font, callout }
    }

    fn owned_callout(base: &DrawingBase, font: &FontSpec) -> Callout {
        let mut callout = Callout::new(base.panel_name(), base.style.clone(), font.clone());
        callout.hide_handles();
        callout
    }

    #[must_use]
    pub fn callout(&self) -> &Callout {
        &self.callout
    }

    #[must_use]
    pub fn font(&self) -> &FontSpec {
        &self.font
    }

    pub fn set_tolerances(&mut self, tolerances: InteractionTolerances) {
        self.base.tolerances = tolerances;
        self.callout.base_mut().tolerances = tolerances;
    }

    /// Stem tip at the midpoint tick; short spans read the value off the
    /// drawn line since the floored tick can sit off centre.
    fn stem(host: &dyn ChartHost, panel: &Panel, (p0, p1): (Anchor, Anchor), (a, b): (Point, Point)) -> Anchor {
        let mid_tick = (p0.tick + p1.tick).div_euclid(2);
        let mid_y = (a.y + b.y) / 2.0;
        let span = (p0.tick - p1.tick).abs();
        let value = if span > 1 && span < INTERPOLATED_STEM_SPAN {
            let x = host.pixel_from_tick(mid_tick as f64);
            let y = a.y + (b.y - a.y) / (b.x - a.x) * (x - a.x);
            Some(host.value_from_pixel(panel, y)).filter(|v| v.is_finite())
        } else {
            None
        };
        Anchor::new(mid_tick, value.unwrap_or_else(|| host.value_from_pixel(panel, mid_y)))
    }

    fn sync_callout(&mut self) {
        let highlighted = if self.base.highlighted.is_active() {
            Highlight::Whole
        } else {
            Highlight::None
        };
        let callout_base = self.callout.base_mut();
        callout_base.style = self.base.style.clone();
        callout_base.highlighted = highlighted;
        self.callout.set_border_color(self.base.style.color.clone());
        self.callout.set_font(self.font.clone());
    }
}

impl_anchored!(Trendline);

impl Interactive for Trendline {
    fn click(&mut self, host: &dyn ChartHost, tick: i64, value: f64) -> ClickOutcome {
        two_point::click(&mut self.base, host, tick, value)
    }

    fn pointer_move(&mut self, _host: &dyn ChartHost, tick: i64, value: f64) {
        two_point::pointer_move(&mut self.base, tick, value);
    }

    fn reposition(&mut self, host: &dyn ChartHost, repositioner: &Repositioner, tick: i64, value: f64) {
        two_point::reposition(&mut self.base, host, repositioner, tick, value);
    }

    fn adjust(&mut self, host: &dyn ChartHost) {
        two_point::adjust(&mut self.base, host);
        self.callout.adjust(host);
    }
}

impl Renderable for Trendline {
    fn render(&mut self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> DrawingResult<()> {
        let (Some(panel), Some((p0, p1))) = (self.base.panel(host), self.base.pair()) else {
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
        if !a.y.is_finite() || !b.y.is_finite() {
            return Ok(());
        }

        self.sync_callout();
        self.callout.set_text(trend_text(p0, p1));
        let (width, height) = self.callout.measure(ctx);
        let stem = Self::stem(host, panel, (p0, p1), (a, b));
        let tip = host.anchor_to_pixel(panel, stem);
        let falling = p1.value < p0.value;
        let snapped = |distance: f64| {
            let centre = callout_centre(a, b, distance, falling);
            Anchor::new(host.tick_from_pixel(centre.x), host.value_from_pixel(panel, centre.y))
        };
        let near = snapped(width * 1.2);
        let entry = StemEntry::classify(tip, host.anchor_to_pixel(panel, near), width / 2.0, height / 2.0);
        let centre = if entry.column == StemColumn::Center {
            near
        } else {
            snapped(width * 1.2 + OFF_CENTRE_STEM_ROOM)
        };
        self.callout.place(host, centre, stem);
        self.callout.render(ctx, host)?;

        self.base
            .render_handles(ctx, host, &[(AnchorSlot::P0, a), (AnchorSlot::P1, b)])
    }
}

impl HitTestable for Trendline {
    /// Segment hits behave as usual; a hit on the callout moves the segment.
    fn intersected(
        &mut self,
        host: &dyn ChartHost,
        tick: i64,
        value: f64,
        hit_box: HitBox,
    ) -> Option<Repositioner> {
        let callout_hit = self.callout.intersected(host, tick, value, hit_box);
        let segment_hit = two_point::intersected(&mut self.base, host, tick, value, hit_box, LineKind::Segment);
        self.callout.base_mut().highlighted = if callout_hit.is_some() || segment_hit.is_some() {
            Highlight::Whole
        } else {
            Highlight::None
        };
        if segment_hit.is_some() {
            return segment_hit;
        }
        callout_hit.map(|_| self.base.begin_move(tick, value))
    }
}

impl Serializable for Trendline {
    fn serialize(&self) -> DrawingDescriptor {
        let mut desc = two_point::serialize(&self.base);
        desc.fnt = Some(self.font.clone());
        desc.callout = Some(Box::new(self.callout.serialize()));
        desc
    }

    fn reconstruct(host: &dyn ChartHost, desc: &DrawingDescriptor) -> DrawingResult<Self> {
        let base = two_point::reconstruct(DrawingKind::Trendline, host, desc)?;
        let font = desc.fnt.clone().unwrap_or_default();
        let restored = desc.callout.as_deref().map(|nested| Callout::reconstruct(host, nested));
        let callout = match restored {
            Some(Ok(mut callout)) => {
                callout.hide_handles();
                callout
            }
            Some(Err(err)) => {
                warn!(error = %err, "trendline callout rebuilt from the segment");
                Self::owned_callout(&base, &font)
            }
            None => Self::owned_callout(&base, &font),
        };
        Ok(Self { base, font, callout })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::{Trendline, callout_centre, trend_text};
    use crate::core::geometry::HitBox;
    use crate::core::types::{Anchor, Point};
    use crate::drawing::base::DrawingStyle;
    use crate::drawing::traits::{Anchored, HitTestable, Interactive, Renderable, Serializable};
    use crate::interaction::{AnchorSlot, Highlight, RepositionAction};
    use crate::render::{FontSpec, RecordingContext};
    use crate::test_support::daily_host;

    fn rendered(host: &crate::core::host::StaticChartHost) -> Trendline {
        let mut trendline = Trendline::new("chart", DrawingStyle::default(), FontSpec::default());
        trendline.click(host, 10, 100.0);
        trendline.click(host, 20, 110.0);
        trendline
            .render(&mut RecordingContext::new(), host)
            .expect("render");
        trendline
    }

    #[test]
    fn text_reports_change_and_bars() {
        assert_eq!(trend_text(Anchor::new(0, 100.0), Anchor::new(10, 110.0)), "10.00 (10.00%) 10 Bars");
        assert_eq!(trend_text(Anchor::new(5, 0.0), Anchor::new(2, 5.0)), "5.00 3 Bars");
    }

    #[test]
    fn callout_sits_above_a_rising_segment() {
        let centre = callout_centre(Point::new(0.0, 100.0), Point::new(100.0, 100.0), 60.0, false);
        assert_relative_eq!(centre.x, 50.0);
        assert_relative_eq!(centre.y, 70.0);
        let below = callout_centre(Point::new(0.0, 100.0), Point::new(100.0, 100.0), 60.0, true);
        assert_relative_eq!(below.y, 130.0);
    }

    #[test]
    fn stem_points_at_the_segment_midpoint() {
        let host = daily_host(40);
        let trendline = rendered(&host);
        let stem = trendline.callout().stem().expect("stem");
        assert_eq!(stem.tick, 15);
        assert_relative_eq!(stem.value, 105.0, epsilon = 1e-9);
        assert_eq!(trendline.callout().text(), "10.00 (10.00%) 10 Bars");
    }

    #[test]
    fn callout_hit_moves_the_segment() {
        let host = daily_host(40);
        let mut trendline = rendered(&host);
        let centre = trendline.callout().base().anchor(AnchorSlot::P0).expect("centre");
        let t = centre.tick as f64;
        let hit = trendline
            .intersected(&host, centre.tick, centre.value, HitBox::new(t - 0.2, t + 0.2, centre.value + 0.5, centre.value - 0.5))
            .expect("hit");
        assert_eq!(hit.action, RepositionAction::Move);
        assert_eq!(trendline.base().highlighted, Highlight::Whole);
        assert_eq!(trendline.callout().base().highlighted, Highlight::Whole);
    }

    fn frame(trendline: &mut Trendline, host: &crate::core::host::StaticChartHost) -> Vec<crate::render::DrawCommand> {
        let mut ctx = RecordingContext::new();
        trendline.render(&mut ctx, host).expect("render");
        ctx.commands().to_vec()
    }

    #[test]
    fn first_frame_matches_the_steady_frame() {
        let host = daily_host(40);
        let mut trendline = Trendline::new("chart", DrawingStyle::default(), FontSpec::default());
        trendline.click(&host, 4, 100.0);
        trendline.click(&host, 12, 140.0);
        let first = frame(&mut trendline, &host);
        let steady = frame(&mut trendline, &host);
        assert_eq!(first, steady);

        let mut restored = Trendline::reconstruct(&host, &trendline.serialize()).expect("reconstruct");
        assert_eq!(frame(&mut restored, &host), steady);
        assert_eq!(restored.callout().base().anchors(), trendline.callout().base().anchors());
    }

    #[test]
    fn round_trips_with_the_nested_callout() {
        let host = daily_host(40);
        let trendline = rendered(&host);
        let desc = trendline.serialize();
        assert!(desc.callout.is_some());
        let restored = Trendline::reconstruct(&host, &desc).expect("reconstruct");
        assert_eq!(restored.base().anchors(), trendline.base().anchors());
        assert_eq!(restored.callout().stem(), trendline.callout().stem());
    }
}
