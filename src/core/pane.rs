use serde::{Deserialize, Serialize};

use crate::core::scale::PriceAxis;
use crate::core::types::Point;
use crate::error::{DrawingError, DrawingResult};

/// Named chart region with its own price axis. Drawings attach to panels by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    name: String,
    left: f64,
    right: f64,
    pub y_axis: PriceAxis,
}

impl Panel {
    pub fn new(name: impl Into<String>, left: f64, right: f64, y_axis: PriceAxis) -> DrawingResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(DrawingError::InvalidData(
                "panel name must not be empty".to_owned(),
            ));
        }
        if !left.is_finite() || !right.is_finite() || right <= left {
            return Err(DrawingError::InvalidData(format!(
                "panel `{name}` must have finite edges with right > left"
            )));
        }
        Ok(Self {
            name,
            left,
            right,
            y_axis,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn left(&self) -> f64 {
        self.left
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.right
    }

    #[must_use]
    pub fn top(&self) -> f64 {
        self.y_axis.top()
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y_axis.bottom()
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.y_axis.height()
    }

    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        (self.left..=self.right).contains(&point.x) && (self.top()..=self.bottom()).contains(&point.y)
    }
}
