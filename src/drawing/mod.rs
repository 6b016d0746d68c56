//! Drawing tools: shared state, capability traits and one struct per tool,
//! unified by the [`Drawing`] enum.

/// Implements [`traits::Anchored`] for a variant holding `base: DrawingBase`.
macro_rules! impl_anchored {
    ($ty:ty) => {
        impl $crate::drawing::traits::Anchored for $ty {
            fn base(&self) -> &$crate::drawing::base::DrawingBase {
                &self.base
            }

            fn base_mut(&mut self) -> &mut $crate::drawing::base::DrawingBase {
                &mut self.base
            }
        }
    };
}

/// Click-click construction and anchor editing from [`two_point`].
macro_rules! two_point_interactive {
    ($ty:ty) => {
        impl $crate::drawing::traits::Interactive for $ty {
            fn click(
                &mut self,
                host: &dyn $crate::core::host::ChartHost,
                tick: i64,
                value: f64,
            ) -> $crate::interaction::ClickOutcome {
                $crate::drawing::two_point::click(&mut self.base, host, tick, value)
            }

            fn pointer_move(&mut self, _host: &dyn $crate::core::host::ChartHost, tick: i64, value: f64) {
                $crate::drawing::two_point::pointer_move(&mut self.base, tick, value);
            }

            fn reposition(
                &mut self,
                host: &dyn $crate::core::host::ChartHost,
                repositioner: &$crate::interaction::Repositioner,
                tick: i64,
                value: f64,
            ) {
                $crate::drawing::two_point::reposition(&mut self.base, host, repositioner, tick, value);
            }

            fn adjust(&mut self, host: &dyn $crate::core::host::ChartHost) {
                $crate::drawing::two_point::adjust(&mut self.base, host);
            }
        }
    };
}

pub mod base;
pub mod callout;
pub mod channel;
pub mod crossline;
pub mod descriptor;
pub mod fibonacci;
pub mod freeform;
pub mod gartley;
pub mod kind;
pub mod levels;
pub mod params;
pub mod pitchfork;
pub mod segment;
pub mod shape;
pub mod speed;
pub mod statistics;
pub mod traits;
pub mod trendline;
pub mod two_point;

use tracing::debug;

use crate::core::geometry::HitBox;
use crate::core::host::ChartHost;
use crate::error::DrawingResult;
use crate::interaction::{ClickOutcome, Repositioner};
use crate::render::DrawingContext;

pub use base::{DrawingBase, DrawingStyle, InteractionTolerances};
pub use callout::Callout;
pub use channel::Channel;
pub use crossline::Crossline;
pub use descriptor::DrawingDescriptor;
pub use fibonacci::{FibArc, FibFan, FibProjection, FibTimeZone};
pub use freeform::Freeform;
pub use gartley::Gartley;
pub use kind::DrawingKind;
pub use levels::RangeLevels;
pub use params::{DeviationBand, FibLevel, FibLine, FibParameters, LineParameters, VectorParameters};
pub use pitchfork::Pitchfork;
pub use segment::Segment;
pub use shape::Shape;
pub use speed::{GannFan, SpeedArc, SpeedLine, TimeCycle};
pub use statistics::{Average, Regression};
pub use traits::{Anchored, HitTestable, Interactive, Renderable, Serializable};
pub use trendline::Trendline;

/// Any drawing tool.
#[derive(Debug, Clone, PartialEq)]
pub enum Drawing {
    Segment(Segment),
    Channel(Channel),
    Pitchfork(Pitchfork),
    Gartley(Gartley),
    Freeform(Freeform),
    Callout(Callout),
    FibProjection(FibProjection),
    FibArc(FibArc),
    FibFan(FibFan),
    FibTimeZone(FibTimeZone),
    Shape(Shape),
    Crossline(Crossline),
    SpeedArc(SpeedArc),
    SpeedLine(SpeedLine),
    GannFan(GannFan),
    TimeCycle(TimeCycle),
    Regression(Regression),
    Trendline(Trendline),
    Average(Average),
    /// Quadrant lines or Tirone levels.
    RangeLevels(RangeLevels),
}

macro_rules! dispatch {
    ($self:expr, $drawing:ident => $body:expr) => {
        match $self {
            Drawing::Segment($drawing) => $body,
            Drawing::Channel($drawing) => $body,
            Drawing::Pitchfork($drawing) => $body,
            Drawing::Gartley($drawing) => $body,
            Drawing::Freeform($drawing) => $body,
            Drawing::Callout($drawing) => $body,
            Drawing::FibProjection($drawing) => $body,
            Drawing::FibArc($drawing) => $body,
            Drawing::FibFan($drawing) => $body,
            Drawing::FibTimeZone($drawing) => $body,
            Drawing::Shape($drawing) => $body,
            Drawing::Crossline($drawing) => $body,
            Drawing::SpeedArc($drawing) => $body,
            Drawing::SpeedLine($drawing) => $body,
            Drawing::GannFan($drawing) => $body,
            Drawing::TimeCycle($drawing) => $body,
            Drawing::Regression($drawing) => $body,
            Drawing::Trendline($drawing) => $body,
            Drawing::Average($drawing) => $body,
            Drawing::RangeLevels($drawing) => $body,
        }
    };
}

impl Drawing {
    /// New drawing of `kind` on `panel_name`, styled from the current
    /// parameters. The style is captured here and not shared afterwards.
    pub fn create(kind: DrawingKind, panel_name: impl Into<String>, params: &VectorParameters) -> DrawingResult<Self> {
        let panel_name = panel_name.into();
        let style = DrawingStyle::from_parameters(params);
        debug!(kind = %kind, panel = %panel_name, "creating drawing");
        let drawing = match kind {
            DrawingKind::Segment => Self::Segment(Segment::new(panel_name, style)),
            DrawingKind::Channel => Self::Channel(Channel::new(panel_name, style)),
            DrawingKind::Pitchfork => Self::Pitchfork(Pitchfork::new(panel_name, style)),
            DrawingKind::Gartley => Self::Gartley(Gartley::new(panel_name, style)),
            DrawingKind::Freeform => Self::Freeform(Freeform::new(panel_name, style, params.spline_tension)),
            DrawingKind::Callout => Self::Callout(Callout::new(panel_name, style, params.font.clone())),
            DrawingKind::FibProjection => {
                Self::FibProjection(FibProjection::new(panel_name, style, &params.fibonacci))
            }
            DrawingKind::FibArc => Self::FibArc(FibArc::new(panel_name, style, &params.fibonacci)),
            DrawingKind::FibFan => Self::FibFan(FibFan::new(panel_name, style, &params.fibonacci)),
            DrawingKind::FibTimeZone => Self::FibTimeZone(FibTimeZone::new(panel_name, style, &params.fibonacci)),
            DrawingKind::XCross
            | DrawingKind::Arrow
            | DrawingKind::Check
            | DrawingKind::Star
            | DrawingKind::Heart
            | DrawingKind::FocusArrow => Self::Shape(Shape::new(kind, panel_name, style)?),
            DrawingKind::Crossline => Self::Crossline(Crossline::new(panel_name, style, params.axis_label)),
            DrawingKind::SpeedArc => Self::SpeedArc(SpeedArc::new(panel_name, style)),
            DrawingKind::SpeedLine => Self::SpeedLine(SpeedLine::new(
                panel_name,
                style,
                params.speedline_extension,
                params.speedline_confine_to_grid,
            )),
            DrawingKind::GannFan => Self::GannFan(GannFan::new(panel_name, style)),
            DrawingKind::TimeCycle => Self::TimeCycle(TimeCycle::new(panel_name, style)),
            DrawingKind::Regression => Self::Regression(Regression::new(panel_name, style)),
            DrawingKind::Trendline => Self::Trendline(Trendline::new(panel_name, style, params.font.clone())),
            DrawingKind::Average => Self::Average(Average::new(
                panel_name,
                style,
                params.deviations.clone(),
                params.axis_label,
            )),
            DrawingKind::Quadrant | DrawingKind::Tirone => {
                Self::RangeLevels(RangeLevels::new(kind, panel_name, style)?)
            }
        };
        Ok(drawing)
    }

    #[must_use]
    pub fn kind(&self) -> DrawingKind {
        self.base().kind()
    }

    #[must_use]
    pub fn panel_name(&self) -> &str {
        self.base().panel_name()
    }

    /// Applies pointer tolerances to the drawing and any drawing it owns.
    pub fn set_tolerances(&mut self, tolerances: InteractionTolerances) {
        match self {
            Self::Trendline(trendline) => trendline.set_tolerances(tolerances),
            other => other.base_mut().tolerances = tolerances,
        }
    }
}

impl Anchored for Drawing {
    fn base(&self) -> &DrawingBase {
        dispatch!(self, drawing => drawing.base())
    }

    fn base_mut(&mut self) -> &mut DrawingBase {
        dispatch!(self, drawing => drawing.base_mut())
    }
}

impl Interactive for Drawing {
    fn click(&mut self, host: &dyn ChartHost, tick: i64, value: f64) -> ClickOutcome {
        dispatch!(self, drawing => drawing.click(host, tick, value))
    }

    fn pointer_move(&mut self, host: &dyn ChartHost, tick: i64, value: f64) {
        dispatch!(self, drawing => drawing.pointer_move(host, tick, value));
    }

    fn reposition(&mut self, host: &dyn ChartHost, repositioner: &Repositioner, tick: i64, value: f64) {
        dispatch!(self, drawing => drawing.reposition(host, repositioner, tick, value));
    }

    fn adjust(&mut self, host: &dyn ChartHost) {
        dispatch!(self, drawing => drawing.adjust(host));
    }
}

impl Renderable for Drawing {
    fn render(&mut self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> DrawingResult<()> {
        dispatch!(self, drawing => drawing.render(ctx, host))
    }
}

impl HitTestable for Drawing {
    fn intersected(
        &mut self,
        host: &dyn ChartHost,
        tick: i64,
        value: f64,
        hit_box: HitBox,
    ) -> Option<Repositioner> {
        dispatch!(self, drawing => drawing.intersected(host, tick, value, hit_box))
    }
}

impl Serializable for Drawing {
    fn serialize(&self) -> DrawingDescriptor {
        dispatch!(self, drawing => drawing.serialize())
    }

    /// Dispatches on the descriptor `name`.
    fn reconstruct(host: &dyn ChartHost, desc: &DrawingDescriptor) -> DrawingResult<Self> {
        let kind: DrawingKind = desc.name.parse()?;
        let drawing = match kind {
            DrawingKind::Segment => Self::Segment(Segment::reconstruct(host, desc)?),
            DrawingKind::Channel => Self::Channel(Channel::reconstruct(host, desc)?),
            DrawingKind::Pitchfork => Self::Pitchfork(Pitchfork::reconstruct(host, desc)?),
            DrawingKind::Gartley => Self::Gartley(Gartley::reconstruct(host, desc)?),
            DrawingKind::Freeform => Self::Freeform(Freeform::reconstruct(host, desc)?),
            DrawingKind::Callout => Self::Callout(Callout::reconstruct(host, desc)?),
            DrawingKind::FibProjection => Self::FibProjection(FibProjection::reconstruct(host, desc)?),
            DrawingKind::FibArc => Self::FibArc(FibArc::reconstruct(host, desc)?),
            DrawingKind::FibFan => Self::FibFan(FibFan::reconstruct(host, desc)?),
            DrawingKind::FibTimeZone => Self::FibTimeZone(FibTimeZone::reconstruct(host, desc)?),
            DrawingKind::XCross
            | DrawingKind::Arrow
            | DrawingKind::Check
            | DrawingKind::Star
            | DrawingKind::Heart
            | DrawingKind::FocusArrow => Self::Shape(Shape::reconstruct(host, desc)?),
            DrawingKind::Crossline => Self::Crossline(Crossline::reconstruct(host, desc)?),
            DrawingKind::SpeedArc => Self::SpeedArc(SpeedArc::reconstruct(host, desc)?),
            DrawingKind::SpeedLine => Self::SpeedLine(SpeedLine::reconstruct(host, desc)?),
            DrawingKind::GannFan => Self::GannFan(GannFan::reconstruct(host, desc)?),
            DrawingKind::TimeCycle => Self::TimeCycle(TimeCycle::reconstruct(host, desc)?),
            DrawingKind::Regression => Self::Regression(Regression::reconstruct(host, desc)?),
            DrawingKind::Trendline => Self::Trendline(Trendline::reconstruct(host, desc)?),
            DrawingKind::Average => Self::Average(Average::reconstruct(host, desc)?),
            DrawingKind::Quadrant | DrawingKind::Tirone => Self::RangeLevels(RangeLevels::reconstruct(host, desc)?),
        };
        Ok(drawing)
    }
}

#[cfg(test)]
mod tests {
    use super::{Drawing, DrawingKind, VectorParameters};
    use crate::drawing::traits::{Interactive, Serializable};
    use crate::interaction::ClickOutcome;
    use crate::test_support::daily_host;

    #[test]
    fn every_kind_is_creatable() {
        let params = VectorParameters::default();
        for kind in DrawingKind::ALL {
            let drawing = Drawing::create(kind, "chart", &params).expect("create");
            assert_eq!(drawing.kind(), kind);
            assert_eq!(drawing.panel_name(), "chart");
        }
    }

    #[test]
    fn serialized_drawing_rebuilds_the_same_variant() {
        let host = daily_host(40);
        let mut drawing = Drawing::create(DrawingKind::GannFan, "chart", &VectorParameters::default()).expect("create");
        drawing.click(&host, 4, 100.0);
        assert_eq!(drawing.click(&host, 12, 120.0), ClickOutcome::Complete);
        let desc = drawing.serialize();
        assert_eq!(desc.name, "gannfan");
        let restored = Drawing::reconstruct(&host, &desc).expect("reconstruct");
        assert!(matches!(restored, Drawing::GannFan(_)));
    }

    #[test]
    fn unknown_names_are_rejected() {
        let host = daily_host(10);
        let desc = crate::drawing::DrawingDescriptor::new("spirograph");
        assert!(Drawing::reconstruct(&host, &desc).is_err());
    }
}
