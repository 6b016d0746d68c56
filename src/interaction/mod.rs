use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::types::Anchor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputDevice {
    #[default]
    Mouse,
    Touch,
}

/// Pixel tolerances used to build hit boxes around the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitTolerance {
    #[serde(default = "default_mouse_px")]
    pub mouse_px: f64,
    #[serde(default = "default_touch_px")]
    pub touch_px: f64,
}

fn default_mouse_px() -> f64 {
    5.0
}

fn default_touch_px() -> f64 {
    25.0
}

impl Default for HitTolerance {
    fn default() -> Self {
        Self {
            mouse_px: default_mouse_px(),
            touch_px: default_touch_px(),
        }
    }
}

impl HitTolerance {
    #[must_use]
    pub fn for_device(self, device: InputDevice) -> f64 {
        match device {
            InputDevice::Mouse => self.mouse_px,
            InputDevice::Touch => self.touch_px,
        }
    }
}

/// Named anchor slot of a drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnchorSlot {
    P0,
    P1,
    P2,
}

impl AnchorSlot {
    pub const ALL: [Self; 3] = [Self::P0, Self::P1, Self::P2];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::P0 => 0,
            Self::P1 => 1,
            Self::P2 => 2,
        }
    }

    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::P0),
            1 => Some(Self::P1),
            2 => Some(Self::P2),
            _ => None,
        }
    }
}

/// Selection state of a drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Highlight {
    #[default]
    None,
    Whole,
    Anchor(AnchorSlot),
}

impl Highlight {
    #[must_use]
    pub fn is_active(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Gesture a hit selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepositionAction {
    /// Translate every anchor.
    Move,
    /// Move one anchor (or the callout stem).
    Drag,
    Scale,
    Rotate,
    /// Highlight only; the pointer grabbed nothing movable.
    Select,
}

/// Captured state a later [`crate::drawing::Drawing::reposition`] call
/// applies a pointer delta to.
#[derive(Debug, Clone, PartialEq)]
pub struct Repositioner {
    pub action: RepositionAction,
    /// Dragged anchor, for [`RepositionAction::Drag`].
    pub point: Option<AnchorSlot>,
    /// Anchors as they were when the gesture started.
    pub anchors: SmallVec<[Option<Anchor>; 3]>,
    /// Callout stem at gesture start, when the drawing has one.
    pub stem: Option<Anchor>,
    /// Vertex snapshot for drawings with more than three points.
    pub points: Vec<Anchor>,
    pub tick: i64,
    pub value: f64,
}

impl Repositioner {
    #[must_use]
    pub fn new(action: RepositionAction, anchors: &[Option<Anchor>], tick: i64, value: f64) -> Self {
        Self {
            action,
            point: None,
            anchors: anchors.iter().copied().collect(),
            stem: None,
            points: Vec::new(),
            tick,
            value,
        }
    }

    #[must_use]
    pub fn drag(slot: AnchorSlot, anchors: &[Option<Anchor>], tick: i64, value: f64) -> Self {
        Self {
            point: Some(slot),
            ..Self::new(RepositionAction::Drag, anchors, tick, value)
        }
    }

    #[must_use]
    pub fn with_stem(mut self, stem: Option<Anchor>) -> Self {
        self.stem = stem;
        self
    }

    #[must_use]
    pub fn with_points(mut self, points: &[Anchor]) -> Self {
        self.points = points.to_vec();
        self
    }

    /// Snapshot of the anchor in `slot` when the gesture started.
    #[must_use]
    pub fn anchor(&self, slot: AnchorSlot) -> Option<Anchor> {
        self.anchors.get(slot.index()).copied().flatten()
    }

    /// Pointer travel since the gesture started, as `(ticks, value)`.
    #[must_use]
    pub fn delta(&self, tick: i64, value: f64) -> (i64, f64) {
        (tick - self.tick, value - self.value)
    }
}

/// Result of feeding a click to a drawing under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClickOutcome {
    /// More anchors are needed.
    Continue,
    /// Construction finished; the host should commit the drawing.
    Complete,
    /// Construction abandoned; the host should discard the drawing.
    Abort,
}

impl ClickOutcome {
    #[must_use]
    pub fn is_finished(self) -> bool {
        !matches!(self, Self::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::{AnchorSlot, ClickOutcome, HitTolerance, InputDevice, Repositioner};
    use crate::core::types::Anchor;

    #[test]
    fn touch_tolerance_is_wider() {
        let tolerance = HitTolerance::default();
        assert_eq!(tolerance.for_device(InputDevice::Mouse), 5.0);
        assert_eq!(tolerance.for_device(InputDevice::Touch), 25.0);
    }

    #[test]
    fn slots_round_trip_through_index() {
        for slot in AnchorSlot::ALL {
            assert_eq!(AnchorSlot::from_index(slot.index()), Some(slot));
        }
        assert_eq!(AnchorSlot::from_index(3), None);
    }

    #[test]
    fn repositioner_reports_delta_and_snapshot() {
        let anchors = [Some(Anchor::new(10, 100.0)), None, None];
        let rep = Repositioner::drag(AnchorSlot::P0, &anchors, 12, 101.0);
        assert_eq!(rep.delta(15, 104.0), (3, 3.0));
        assert_eq!(rep.anchor(AnchorSlot::P0), Some(Anchor::new(10, 100.0)));
        assert_eq!(rep.anchor(AnchorSlot::P1), None);
    }

    #[test]
    fn abort_and_complete_both_finish() {
        assert!(ClickOutcome::Complete.is_finished());
        assert!(ClickOutcome::Abort.is_finished());
        assert!(!ClickOutcome::Continue.is_finished());
    }
}
