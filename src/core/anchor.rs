use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::core::host::ChartHost;
use crate::core::pane::Panel;
use crate::error::{DrawingError, DrawingResult};

const DATE_FORMAT: &str = "%Y%m%d%H%M%S%3f";

/// Anchor that survives data reloads and interval changes: a display-time
/// date, the display offset from UTC in minutes and a price.
///
/// `utc_offset_minutes` follows the "minutes to add to reach UTC" convention,
/// so a display zone five hours behind UTC stores `300`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurableAnchor {
    pub date: NaiveDateTime,
    pub utc_offset_minutes: i32,
    pub value: f64,
}

impl DurableAnchor {
    #[must_use]
    pub fn from_utc(utc: DateTime<Utc>, utc_offset_minutes: i32, value: f64) -> Self {
        let date = utc.naive_utc() - Duration::minutes(i64::from(utc_offset_minutes));
        Self {
            date,
            utc_offset_minutes,
            value,
        }
    }

    /// Captures the durable form of a live anchor. Returns `None` when the host
    /// cannot map the tick to a date (empty data set).
    #[must_use]
    pub fn capture(host: &dyn ChartHost, tick: i64, value: f64) -> Option<Self> {
        let utc = host.date_from_tick(tick)?;
        Some(Self::from_utc(utc, host.display_offset_minutes(), value))
    }

    #[must_use]
    pub fn to_utc(self) -> DateTime<Utc> {
        (self.date + Duration::minutes(i64::from(self.utc_offset_minutes))).and_utc()
    }

    /// Tick of this anchor under the host's current data set.
    #[must_use]
    pub fn resolve(self, host: &dyn ChartHost) -> Option<i64> {
        host.tick_from_date(self.to_utc())
    }

    /// Compact 17-digit form `yyyymmddhhmmssmmm`.
    #[must_use]
    pub fn date_string(self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }

    pub fn from_parts(date: &str, utc_offset_minutes: i32, value: f64) -> DrawingResult<Self> {
        if !value.is_finite() {
            return Err(DrawingError::InvalidData(
                "anchor value must be finite".to_owned(),
            ));
        }
        Ok(Self {
            date: parse_compact_date(date)?,
            utc_offset_minutes,
            value,
        })
    }
}

/// Per-frame view of a durable anchor: its tick and pixel position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewAnchor {
    pub tick: i64,
    pub pixel_x: f64,
    pub pixel_y: f64,
}

/// Resolves a durable anchor against the host's current data set and panel.
///
/// Returns `None` when the date cannot be mapped to a tick.
#[must_use]
pub fn resolve(durable: DurableAnchor, host: &dyn ChartHost, panel: &Panel) -> Option<ViewAnchor> {
    let tick = durable.resolve(host)?;
    let tick_f64 = tick as f64;
    Some(ViewAnchor {
        tick,
        pixel_x: host.pixel_from_tick(tick_f64),
        pixel_y: host.pixel_from_value(panel, tick_f64, durable.value),
    })
}

/// Parses `yyyymmdd`, `yyyymmddhhmm`, `yyyymmddhhmmss` or
/// `yyyymmddhhmmssmmm`.
pub fn parse_compact_date(text: &str) -> DrawingResult<NaiveDateTime> {
    let invalid = || DrawingError::InvalidData(format!("invalid compact date `{text}`"));
    if !text.bytes().all(|b| b.is_ascii_digit()) || !matches!(text.len(), 8 | 12 | 14 | 17) {
        return Err(invalid());
    }
    let field = |range: std::ops::Range<usize>| -> u32 {
        text.get(range)
            .and_then(|digits| digits.parse().ok())
            .unwrap_or(0)
    };
    let year = text
        .get(0..4)
        .and_then(|digits| digits.parse::<i32>().ok())
        .ok_or_else(invalid)?;
    let date = NaiveDate::from_ymd_opt(year, field(4..6), field(6..8)).ok_or_else(invalid)?;
    date.and_hms_milli_opt(field(8..10), field(10..12), field(12..14), field(14..17))
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Timelike, Utc};

    use super::{DurableAnchor, parse_compact_date};

    #[test]
    fn compact_date_round_trips_with_milliseconds() {
        let utc = Utc
            .with_ymd_and_hms(2024, 3, 5, 14, 30, 0)
            .single()
            .expect("date")
            .with_nanosecond(250_000_000)
            .expect("ms");
        let anchor = DurableAnchor::from_utc(utc, 300, 101.5);
        assert_eq!(anchor.date_string(), "20240305093000250");
        let parsed = DurableAnchor::from_parts(&anchor.date_string(), 300, 101.5).expect("parse");
        assert_eq!(parsed.to_utc(), utc);
    }

    #[test]
    fn short_forms_parse() {
        let date = parse_compact_date("20240102").expect("date only");
        assert_eq!(date.format("%Y-%m-%d %H:%M").to_string(), "2024-01-02 00:00");
        let minutes = parse_compact_date("202401021530").expect("minutes");
        assert_eq!(minutes.format("%H:%M").to_string(), "15:30");
    }

    #[test]
    fn malformed_dates_are_rejected() {
        assert!(parse_compact_date("2024-01-02").is_err());
        assert!(parse_compact_date("20241302").is_err());
        assert!(parse_compact_date("2024010").is_err());
        assert!(DurableAnchor::from_parts("20240102", 0, f64::NAN).is_err());
    }
}
