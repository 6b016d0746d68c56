use std::fmt;

use chrono::{DateTime, Datelike, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::core::scale::TimeAxis;
use crate::error::{DrawingError, DrawingResult};

const WEEKS_IN_MONTH: f64 = 5.0;
const DAYS_IN_WEEK: f64 = 5.0;
const DAYS_IN_MONTH: f64 = 30.0;
const EQUITY_MINUTES_PER_DAY: f64 = 390.0;
const FOREX_MINUTES_PER_DAY: f64 = 1440.0;

/// Bar interval of the chart. Serialized as a minute count or as
/// `"day"`, `"week"` or `"month"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "IntervalRepr", into = "IntervalRepr")]
pub enum Interval {
    Minutes(u32),
    Day,
    Week,
    Month,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum IntervalRepr {
    Minutes(u32),
    Named(String),
}

impl TryFrom<IntervalRepr> for Interval {
    type Error = DrawingError;

    fn try_from(repr: IntervalRepr) -> DrawingResult<Self> {
        match repr {
            IntervalRepr::Minutes(0) => Err(DrawingError::InvalidData(
                "interval minutes must be > 0".to_owned(),
            )),
            IntervalRepr::Minutes(minutes) => Ok(Self::Minutes(minutes)),
            IntervalRepr::Named(name) => match name.as_str() {
                "day" => Ok(Self::Day),
                "week" => Ok(Self::Week),
                "month" => Ok(Self::Month),
                other => other
                    .parse::<u32>()
                    .ok()
                    .filter(|minutes| *minutes > 0)
                    .map(Self::Minutes)
                    .ok_or_else(|| DrawingError::InvalidData(format!("unknown interval `{other}`"))),
            },
        }
    }
}

impl From<Interval> for IntervalRepr {
    fn from(interval: Interval) -> Self {
        match interval {
            Interval::Minutes(minutes) => Self::Minutes(minutes),
            Interval::Day => Self::Named("day".to_owned()),
            Interval::Week => Self::Named("week".to_owned()),
            Interval::Month => Self::Named("month".to_owned()),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minutes(minutes) => write!(f, "{minutes}"),
            Self::Day => f.write_str("day"),
            Self::Week => f.write_str("week"),
            Self::Month => f.write_str("month"),
        }
    }
}

impl Interval {
    #[must_use]
    pub fn is_intraday(self) -> bool {
        matches!(self, Self::Minutes(_))
    }

    /// Advances `date` by `steps` bars of `periodicity` intervals each.
    ///
    /// Returns `None` on calendar overflow.
    #[must_use]
    pub fn advance(self, date: DateTime<Utc>, steps: i64, periodicity: u32) -> Option<DateTime<Utc>> {
        let units = steps.checked_mul(i64::from(periodicity.max(1)))?;
        match self {
            Self::Minutes(minutes) => {
                date.checked_add_signed(Duration::try_minutes(units.checked_mul(i64::from(minutes))?)?)
            }
            Self::Day => date.checked_add_signed(Duration::try_days(units)?),
            Self::Week => date.checked_add_signed(Duration::try_weeks(units)?),
            Self::Month => {
                let months = u32::try_from(units.unsigned_abs()).ok()?;
                if units >= 0 {
                    date.checked_add_months(Months::new(months))
                } else {
                    date.checked_sub_months(Months::new(months))
                }
            }
        }
    }

    /// Whole bars from `from` to `to`, rounded toward negative infinity.
    #[must_use]
    pub fn steps_between(self, from: DateTime<Utc>, to: DateTime<Utc>, periodicity: u32) -> i64 {
        let periodicity = i64::from(periodicity.max(1));
        let units = match self {
            Self::Minutes(minutes) => {
                let span = (to - from).num_seconds();
                span.div_euclid(60 * i64::from(minutes))
            }
            Self::Day => (to - from).num_seconds().div_euclid(86_400),
            Self::Week => (to - from).num_seconds().div_euclid(7 * 86_400),
            Self::Month => {
                let months = i64::from(to.year() - from.year()) * 12 + i64::from(to.month())
                    - i64::from(from.month());
                let anchor = if months >= 0 {
                    from.checked_add_months(Months::new(months.unsigned_abs() as u32))
                } else {
                    from.checked_sub_months(Months::new(months.unsigned_abs() as u32))
                };
                match anchor {
                    Some(anchor) if anchor > to => months - 1,
                    _ => months,
                }
            }
        };
        units.div_euclid(periodicity)
    }
}

/// Ratio between a bar of the capture interval and a bar of the current one.
///
/// Returns `0.0` when the pair is undefined (a mixed daily pair missing from
/// the table below). Calendar lengths are approximated with 5 weeks per month,
/// 5 trading days per week, 30 days per month and 390 minutes per trading day
/// (1440 for forex symbols).
#[must_use]
pub fn interval_ratio(
    old_interval: Interval,
    new_interval: Interval,
    old_periodicity: u32,
    new_periodicity: u32,
    forex: bool,
) -> f64 {
    let minutes_per_day = if forex {
        FOREX_MINUTES_PER_DAY
    } else {
        EQUITY_MINUTES_PER_DAY
    };
    let ratio = if old_interval == new_interval {
        1.0
    } else {
        match (old_interval, new_interval) {
            (Interval::Minutes(old), Interval::Minutes(new)) => f64::from(old) / f64::from(new),
            (Interval::Month, Interval::Week) => WEEKS_IN_MONTH,
            (Interval::Month, Interval::Day) => DAYS_IN_MONTH,
            (Interval::Month, Interval::Minutes(new)) => DAYS_IN_MONTH * minutes_per_day / f64::from(new),
            (Interval::Week, Interval::Month) => 1.0 / WEEKS_IN_MONTH,
            (Interval::Week, Interval::Day) => DAYS_IN_WEEK,
            (Interval::Week, Interval::Minutes(new)) => DAYS_IN_WEEK * minutes_per_day / f64::from(new),
            (Interval::Day, Interval::Week) => 1.0 / DAYS_IN_WEEK,
            (Interval::Day, Interval::Month) => 1.0 / DAYS_IN_MONTH,
            (Interval::Day, Interval::Minutes(new)) => minutes_per_day / f64::from(new),
            (Interval::Minutes(old), Interval::Month) => f64::from(old) / (DAYS_IN_MONTH * minutes_per_day),
            (Interval::Minutes(old), Interval::Week) => f64::from(old) / (DAYS_IN_WEEK * minutes_per_day),
            (Interval::Minutes(old), Interval::Day) => f64::from(old) / minutes_per_day,
            _ => 0.0,
        }
    };
    ratio * f64::from(old_periodicity.max(1)) / f64::from(new_periodicity.max(1))
}

/// Chart-wide layout: the horizontal axis plus the bar interval in effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartLayout {
    pub time_axis: TimeAxis,
    pub interval: Interval,
    pub periodicity: u32,
    pub symbol: String,
    /// Forex symbols trade around the clock (1440 minutes per day).
    pub forex: bool,
}

impl ChartLayout {
    #[must_use]
    pub fn new(time_axis: TimeAxis, interval: Interval) -> Self {
        Self {
            time_axis,
            interval,
            periodicity: 1,
            symbol: String::new(),
            forex: false,
        }
    }

    #[must_use]
    pub fn with_periodicity(mut self, periodicity: u32) -> Self {
        self.periodicity = periodicity.max(1);
        self
    }

    #[must_use]
    pub fn with_symbol(mut self, symbol: impl Into<String>, forex: bool) -> Self {
        self.symbol = symbol.into();
        self.forex = forex;
        self
    }

    #[must_use]
    pub fn candle_width(&self) -> f64 {
        self.time_axis.candle_width()
    }
}
