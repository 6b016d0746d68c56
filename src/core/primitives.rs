use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use crate::error::{DrawingError, DrawingResult};

pub fn decimal_to_f64(value: Decimal, field_name: &str) -> DrawingResult<f64> {
    value.to_f64().ok_or_else(|| {
        DrawingError::InvalidData(format!("{field_name} cannot be represented as f64"))
    })
}

/// Rounds `value` to `places` decimals with half-away-from-zero rounding.
///
/// Non-finite inputs are returned unchanged.
#[must_use]
pub fn round_to(value: f64, places: u32) -> f64 {
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(places, rust_decimal::RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

/// Formats `value` with exactly `places` decimals, like a fixed-point label.
#[must_use]
pub fn format_fixed(value: f64, places: u32) -> String {
    match Decimal::from_f64(value) {
        Some(d) => {
            let rounded =
                d.round_dp_with_strategy(places, rust_decimal::RoundingStrategy::MidpointAwayFromZero);
            format!("{rounded:.prec$}", prec = places as usize)
        }
        None => format!("{value:.prec$}", prec = places as usize),
    }
}

/// Formats `value` with at most `places` decimals and no trailing zeros.
#[must_use]
pub fn format_trimmed(value: f64, places: u32) -> String {
    match Decimal::from_f64(value) {
        Some(d) => d
            .round_dp_with_strategy(places, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
            .normalize()
            .to_string(),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{format_fixed, format_trimmed, round_to};

    #[test]
    fn fixed_format_pads_and_rounds() {
        assert_eq!(format_fixed(10.0, 2), "10.00");
        assert_eq!(format_fixed(-2.345, 2), "-2.35");
        assert_eq!(format_fixed(0.5, 0), "1");
    }

    #[test]
    fn trimmed_format_drops_trailing_zeros() {
        assert_eq!(format_trimmed(61.8, 1), "61.8");
        assert_eq!(format_trimmed(100.0, 1), "100");
        assert_eq!(format_trimmed(0.0, 1), "0");
    }

    #[test]
    fn round_to_places() {
        assert_eq!(round_to(1.25, 1), 1.3);
        assert_eq!(round_to(3.14159, 4), 3.1416);
    }
}
