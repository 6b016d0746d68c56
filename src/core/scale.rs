use serde::{Deserialize, Serialize};

use crate::error::{DrawingError, DrawingResult};

/// Vertical price mapping of one panel.
///
/// Pixel y grows downward, so `high` maps to `top` and `low` maps to `bottom`.
/// Prices outside `low..=high` extrapolate linearly instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceAxis {
    top: f64,
    bottom: f64,
    high: f64,
    low: f64,
}

impl PriceAxis {
    pub fn new(top: f64, bottom: f64, high: f64, low: f64) -> DrawingResult<Self> {
        if !top.is_finite() || !bottom.is_finite() || bottom <= top {
            return Err(DrawingError::InvalidData(
                "price axis pixel range must be finite with bottom > top".to_owned(),
            ));
        }
        let mut axis = Self {
            top,
            bottom,
            high: 1.0,
            low: 0.0,
        };
        axis.set_range(high, low)?;
        Ok(axis)
    }

    pub fn set_range(&mut self, high: f64, low: f64) -> DrawingResult<()> {
        if !high.is_finite() || !low.is_finite() || high <= low {
            return Err(DrawingError::InvalidData(
                "price axis range must be finite with high > low".to_owned(),
            ));
        }
        self.high = high;
        self.low = low;
        Ok(())
    }

    #[must_use]
    pub fn top(self) -> f64 {
        self.top
    }

    #[must_use]
    pub fn bottom(self) -> f64 {
        self.bottom
    }

    #[must_use]
    pub fn high(self) -> f64 {
        self.high
    }

    #[must_use]
    pub fn low(self) -> f64 {
        self.low
    }

    #[must_use]
    pub fn height(self) -> f64 {
        self.bottom - self.top
    }

    /// Pixels per price unit.
    #[must_use]
    pub fn multiplier(self) -> f64 {
        self.height() / (self.high - self.low)
    }

    #[must_use]
    pub fn pixel_from_price(self, price: f64) -> f64 {
        self.top + (self.high - price) * self.multiplier()
    }

    #[must_use]
    pub fn price_from_pixel(self, y: f64) -> f64 {
        self.high - (y - self.top) / self.multiplier()
    }
}

/// Horizontal tick mapping shared by every panel of a chart.
///
/// Tick `first_visible_tick` occupies the leftmost candle slot; a tick maps to
/// the center of its slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeAxis {
    left: f64,
    width: f64,
    candle_width: f64,
    first_visible_tick: i64,
}

impl TimeAxis {
    pub fn new(left: f64, width: f64, candle_width: f64, first_visible_tick: i64) -> DrawingResult<Self> {
        if !left.is_finite() || !width.is_finite() || width <= 0.0 {
            return Err(DrawingError::InvalidData(
                "time axis must have a finite left edge and width > 0".to_owned(),
            ));
        }
        if !candle_width.is_finite() || candle_width <= 0.0 {
            return Err(DrawingError::InvalidData(
                "candle width must be finite and > 0".to_owned(),
            ));
        }
        Ok(Self {
            left,
            width,
            candle_width,
            first_visible_tick,
        })
    }

    #[must_use]
    pub fn left(self) -> f64 {
        self.left
    }

    #[must_use]
    pub fn right(self) -> f64 {
        self.left + self.width
    }

    #[must_use]
    pub fn width(self) -> f64 {
        self.width
    }

    #[must_use]
    pub fn candle_width(self) -> f64 {
        self.candle_width
    }

    #[must_use]
    pub fn first_visible_tick(self) -> i64 {
        self.first_visible_tick
    }

    pub fn set_candle_width(&mut self, candle_width: f64) -> DrawingResult<()> {
        if !candle_width.is_finite() || candle_width <= 0.0 {
            return Err(DrawingError::InvalidData(
                "candle width must be finite and > 0".to_owned(),
            ));
        }
        self.candle_width = candle_width;
        Ok(())
    }

    pub fn scroll_to(&mut self, first_visible_tick: i64) {
        self.first_visible_tick = first_visible_tick;
    }

    #[must_use]
    pub fn pixel_from_tick(self, tick: f64) -> f64 {
        self.left + (tick - self.first_visible_tick as f64 + 0.5) * self.candle_width
    }

    #[must_use]
    pub fn tick_from_pixel(self, x: f64) -> i64 {
        ((x - self.left) / self.candle_width).floor() as i64 + self.first_visible_tick
    }

    /// Number of whole candle slots that fit in the axis.
    #[must_use]
    pub fn visible_ticks(self) -> i64 {
        (self.width / self.candle_width).floor() as i64
    }
}
