//! chart-drawings: geometric annotation tools for candlestick charts.
//!
//! Drawings are anchored in chart space (tick and price) and keep a
//! date-based copy of every anchor so they survive data reloads and
//! periodicity changes. The host chart is reached through
//! [`core::ChartHost`]; painting goes through [`render::DrawingContext`],
//! with a Cairo backend behind the `cairo-backend` feature.

pub mod api;
pub mod core;
pub mod drawing;
pub mod error;
pub mod interaction;
pub mod render;
pub mod telemetry;

#[cfg(test)]
mod test_support;

pub use api::{DrawingConfig, DrawingId, DrawingLayer, PointerOutcome};
pub use drawing::{Drawing, DrawingKind};
pub use error::{DrawingError, DrawingResult};
