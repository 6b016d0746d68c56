//! Capability traits every drawing variant implements.

use crate::core::geometry::HitBox;
use crate::core::host::ChartHost;
use crate::drawing::base::DrawingBase;
use crate::drawing::descriptor::DrawingDescriptor;
use crate::error::DrawingResult;
use crate::interaction::{ClickOutcome, Repositioner};
use crate::render::DrawingContext;

/// Access to the shared anchor, style and interaction state.
pub trait Anchored {
    fn base(&self) -> &DrawingBase;

    fn base_mut(&mut self) -> &mut DrawingBase;
}

/// Pointer-driven construction and editing.
pub trait Interactive: Anchored {
    /// Feeds a construction click.
    fn click(&mut self, host: &dyn ChartHost, tick: i64, value: f64) -> ClickOutcome;

    /// Updates the preview while the pen is down. Repeated calls with the
    /// same coordinates leave the same state.
    fn pointer_move(&mut self, host: &dyn ChartHost, tick: i64, value: f64);

    /// Applies a gesture started by a hit.
    fn reposition(&mut self, host: &dyn ChartHost, repositioner: &Repositioner, tick: i64, value: f64);

    /// Re-derives live anchors from durable ones after a data or panel change.
    fn adjust(&mut self, host: &dyn ChartHost);
}

pub trait Renderable {
    /// Paints the drawing. A missing panel or missing anchors paint nothing;
    /// errors only come from the context backend.
    fn render(&mut self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> DrawingResult<()>;
}

pub trait HitTestable {
    /// Hit test; on a hit the drawing highlights itself and returns the
    /// gesture to apply.
    fn intersected(&mut self, host: &dyn ChartHost, tick: i64, value: f64, hit_box: HitBox)
    -> Option<Repositioner>;
}

pub trait Serializable: Sized {
    fn serialize(&self) -> DrawingDescriptor;

    /// Rebuilds a drawing from its descriptor and resolves it against `host`.
    fn reconstruct(host: &dyn ChartHost, desc: &DrawingDescriptor) -> DrawingResult<Self>;
}
