use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::primitives::decimal_to_f64;
use crate::error::{DrawingError, DrawingResult};

/// One record of the host data set. Its position in the data set is its tick.
///
/// Prices are optional so gap records (no trading in the interval) keep their
/// slot on the time line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcRecord {
    pub date: DateTime<Utc>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
}

impl OhlcRecord {
    /// Builds a validated record.
    ///
    /// Invariants:
    /// - all values are finite
    /// - `low <= high`
    /// - `open` and `close` are within `[low, high]`
    pub fn new(date: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> DrawingResult<Self> {
        if !open.is_finite() || !high.is_finite() || !low.is_finite() || !close.is_finite() {
            return Err(DrawingError::InvalidData(
                "ohlc values must be finite".to_owned(),
            ));
        }
        if low > high {
            return Err(DrawingError::InvalidData(
                "ohlc low must be <= high".to_owned(),
            ));
        }
        if open < low || open > high || close < low || close > high {
            return Err(DrawingError::InvalidData(
                "ohlc open/close must be within low/high range".to_owned(),
            ));
        }
        Ok(Self {
            date,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
        })
    }

    pub fn from_decimal(
        date: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
    ) -> DrawingResult<Self> {
        Self::new(
            date,
            decimal_to_f64(open, "open")?,
            decimal_to_f64(high, "high")?,
            decimal_to_f64(low, "low")?,
            decimal_to_f64(close, "close")?,
        )
    }

    /// Record with a date and no prices.
    #[must_use]
    pub const fn gap(date: DateTime<Utc>) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close: None,
        }
    }

    /// Close price, skipping gaps and non-finite values.
    #[must_use]
    pub fn finite_close(&self) -> Option<f64> {
        self.close.filter(|close| close.is_finite())
    }
}

/// Checks that record dates are strictly increasing.
pub fn validate_data_set(records: &[OhlcRecord]) -> DrawingResult<()> {
    for (index, pair) in records.windows(2).enumerate() {
        if pair[1].date <= pair[0].date {
            return Err(DrawingError::InvalidData(format!(
                "data set dates must be strictly increasing (record {})",
                index + 1
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{OhlcRecord, validate_data_set};

    #[test]
    fn record_rejects_inverted_range() {
        let date = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).single().expect("date");
        assert!(OhlcRecord::new(date, 10.0, 9.0, 11.0, 10.0).is_err());
        assert!(OhlcRecord::new(date, 10.0, 11.0, 9.0, f64::NAN).is_err());
    }

    #[test]
    fn gap_has_no_close() {
        let date = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).single().expect("date");
        assert_eq!(OhlcRecord::gap(date).finite_close(), None);
    }

    #[test]
    fn unsorted_data_set_is_rejected() {
        let a = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).single().expect("date");
        let b = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("date");
        assert!(validate_data_set(&[OhlcRecord::gap(a), OhlcRecord::gap(b)]).is_err());
        assert!(validate_data_set(&[OhlcRecord::gap(b), OhlcRecord::gap(a)]).is_ok());
    }
}
