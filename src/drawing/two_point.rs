//! Behaviour shared by every drawing defined by anchors `p0` and `p1`.
//!
//! Variants compose these functions instead of inheriting from a segment.

use tracing::{debug, trace};

use crate::core::geometry::{HitBox, LineKind, line_intersection};
use crate::core::host::ChartHost;
use crate::core::types::Anchor;
use crate::drawing::base::DrawingBase;
use crate::drawing::descriptor::DrawingDescriptor;
use crate::drawing::kind::DrawingKind;
use crate::error::DrawingResult;
use crate::interaction::{AnchorSlot, ClickOutcome, Repositioner};

pub const SLOTS: [AnchorSlot; 2] = [AnchorSlot::P0, AnchorSlot::P1];

/// Click-click construction: the first click drops `p0`, the second `p1`.
/// A second click on top of `p0` aborts.
pub fn click(base: &mut DrawingBase, host: &dyn ChartHost, tick: i64, value: f64) -> ClickOutcome {
    if base.panel(host).is_none() {
        return ClickOutcome::Continue;
    }
    if base.kind().charts_only() && tick < 0 {
        trace!(kind = %base.kind(), tick, "click before the first bar ignored");
        return ClickOutcome::Continue;
    }
    if !base.pen_down {
        base.set_point(host, AnchorSlot::P0, tick, value);
        base.clear(AnchorSlot::P1);
        base.pen_down = true;
        return ClickOutcome::Continue;
    }
    if base.accidental_click(host, tick, value) {
        debug!(kind = %base.kind(), "accidental click aborts construction");
        base.pen_down = false;
        return ClickOutcome::Abort;
    }
    base.set_point(host, AnchorSlot::P1, tick, value);
    base.pen_down = false;
    debug!(kind = %base.kind(), "construction complete");
    ClickOutcome::Complete
}

/// Previews `p1` at the pointer while the pen is down.
pub fn pointer_move(base: &mut DrawingBase, tick: i64, value: f64) {
    if !base.pen_down {
        return;
    }
    if base.kind().charts_only() && tick < 0 {
        return;
    }
    base.set_live(AnchorSlot::P1, Some(Anchor::new(tick, value)));
}

/// Handle hits drag that anchor; a hit on the line of `kind` moves the whole
/// drawing.
pub fn intersected(
    base: &mut DrawingBase,
    host: &dyn ChartHost,
    tick: i64,
    value: f64,
    hit_box: HitBox,
    kind: LineKind,
) -> Option<Repositioner> {
    let panel = base.panel(host)?;
    let (p0, p1) = base.pair()?;
    if let Some(hit) = base.hit_handles(host, panel, hit_box, &SLOTS, tick, value) {
        return Some(hit);
    }
    let hit = line_intersection(
        host,
        panel,
        hit_box,
        kind,
        (p0.tick_f64(), p0.value),
        (p1.tick_f64(), p1.value),
    );
    hit.then(|| base.begin_move(tick, value))
}

pub fn reposition(base: &mut DrawingBase, host: &dyn ChartHost, repositioner: &Repositioner, tick: i64, value: f64) {
    base.reposition_anchors(host, repositioner, tick, value, &SLOTS);
}

pub fn adjust(base: &mut DrawingBase, host: &dyn ChartHost) {
    base.adjust_slots(host, &SLOTS);
}

#[must_use]
pub fn serialize(base: &DrawingBase) -> DrawingDescriptor {
    let mut desc = base.descriptor();
    base.write_anchors(&mut desc, &SLOTS);
    desc
}

/// Base of a persisted two-point drawing; both anchors are required.
pub fn reconstruct(kind: DrawingKind, host: &dyn ChartHost, desc: &DrawingDescriptor) -> DrawingResult<DrawingBase> {
    desc.require_anchor(AnchorSlot::P0)?;
    desc.require_anchor(AnchorSlot::P1)?;
    let mut base = DrawingBase::from_descriptor(kind, desc)?;
    adjust(&mut base, host);
    Ok(base)
}
