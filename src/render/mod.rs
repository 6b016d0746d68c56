mod context;
pub mod plot;
mod primitives;
mod recording;

pub use context::{ContextState, DrawingContext, Transform};
pub use plot::LineStyle;
pub use primitives::{Color, FontSpec, LinePattern, TextAlign, TextBaseline, cascade_color, resolve_style_color};
pub use recording::{DrawCommand, PaintedPath, PaintedText, RecordingContext};

#[cfg(feature = "cairo-backend")]
mod cairo_backend;
#[cfg(feature = "cairo-backend")]
pub use cairo_backend::{CairoDrawingContext, CairoPaintStats};
