//! Host-facing surface: configuration and the layer that owns drawings.

mod drawing_config;
mod drawing_layer;

pub use drawing_config::DrawingConfig;
pub use drawing_layer::{DrawingId, DrawingLayer, PointerOutcome};
