use std::fmt;
use std::str::FromStr;

use crate::error::DrawingError;

/// Tool name of every drawing variant, as persisted in the descriptor's
/// `name` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawingKind {
    Segment,
    Channel,
    Pitchfork,
    Gartley,
    Freeform,
    Callout,
    FibProjection,
    FibArc,
    FibFan,
    FibTimeZone,
    XCross,
    Arrow,
    Check,
    Star,
    Heart,
    FocusArrow,
    Crossline,
    SpeedArc,
    SpeedLine,
    GannFan,
    TimeCycle,
    Regression,
    Trendline,
    Average,
    Quadrant,
    Tirone,
}

impl DrawingKind {
    pub const ALL: [Self; 26] = [
        Self::Segment,
        Self::Channel,
        Self::Pitchfork,
        Self::Gartley,
        Self::Freeform,
        Self::Callout,
        Self::FibProjection,
        Self::FibArc,
        Self::FibFan,
        Self::FibTimeZone,
        Self::XCross,
        Self::Arrow,
        Self::Check,
        Self::Star,
        Self::Heart,
        Self::FocusArrow,
        Self::Crossline,
        Self::SpeedArc,
        Self::SpeedLine,
        Self::GannFan,
        Self::TimeCycle,
        Self::Regression,
        Self::Trendline,
        Self::Average,
        Self::Quadrant,
        Self::Tirone,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Segment => "segment",
            Self::Channel => "channel",
            Self::Pitchfork => "pitchfork",
            Self::Gartley => "gartley",
            Self::Freeform => "freeform",
            Self::Callout => "callout",
            Self::FibProjection => "fibprojection",
            Self::FibArc => "fibarc",
            Self::FibFan => "fibfan",
            Self::FibTimeZone => "fibtimezone",
            Self::XCross => "xcross",
            Self::Arrow => "arrow",
            Self::Check => "check",
            Self::Star => "star",
            Self::Heart => "heart",
            Self::FocusArrow => "focusarrow",
            Self::Crossline => "crossline",
            Self::SpeedArc => "speedarc",
            Self::SpeedLine => "speedline",
            Self::GannFan => "gannfan",
            Self::TimeCycle => "timecycle",
            Self::Regression => "regression",
            Self::Trendline => "trendline",
            Self::Average => "average",
            Self::Quadrant => "quadrant",
            Self::Tirone => "tirone",
        }
    }

    /// Tools built by a continuous drag rather than click-click.
    #[must_use]
    pub const fn drag_to_draw(self) -> bool {
        matches!(self, Self::Freeform)
    }

    /// Tools that read closes from the data set and only live on the main
    /// chart panel's positive ticks.
    #[must_use]
    pub const fn charts_only(self) -> bool {
        matches!(
            self,
            Self::Regression | Self::Average | Self::Quadrant | Self::Tirone
        )
    }

    #[must_use]
    pub const fn is_shape(self) -> bool {
        matches!(
            self,
            Self::XCross | Self::Arrow | Self::Check | Self::Star | Self::Heart | Self::FocusArrow
        )
    }
}

impl fmt::Display for DrawingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrawingKind {
    type Err = DrawingError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| DrawingError::UnknownDrawing(name.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::DrawingKind;

    #[test]
    fn names_round_trip() {
        for kind in DrawingKind::ALL {
            assert_eq!(kind.as_str().parse::<DrawingKind>().expect("parse"), kind);
        }
    }

    #[test]
    fn generic_shape_is_not_a_tool() {
        assert!("shape".parse::<DrawingKind>().is_err());
        assert!("annotation".parse::<DrawingKind>().is_err());
    }
}
