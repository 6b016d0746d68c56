use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::core::geometry::HitBox;
use crate::core::host::ChartHost;
use crate::core::types::Point;
use crate::drawing::{
    Anchored, Drawing, DrawingDescriptor, DrawingKind, HitTestable, Interactive, Renderable, Serializable,
};
use crate::error::{DrawingError, DrawingResult};
use crate::interaction::{ClickOutcome, Highlight, Repositioner};
use crate::render::DrawingContext;

use super::DrawingConfig;

/// Stable handle of a committed drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DrawingId(u64);

impl DrawingId {
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DrawingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "drawing#{}", self.0)
    }
}

/// What a pointer event did to the tool under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerOutcome {
    /// No tool was active.
    Idle,
    /// The tool needs more input.
    Constructing,
    /// The tool finished and joined the layer.
    Committed(DrawingId),
    /// The tool was abandoned.
    Aborted,
}

#[derive(Debug, Clone, PartialEq)]
struct ActiveGesture {
    id: DrawingId,
    repositioner: Repositioner,
}

/// Ordered set of drawings over one chart, plus the tool being drawn and
/// the gesture being dragged.
///
/// Pointer positions are pixels; each drawing converts them through its
/// own panel.
#[derive(Debug, Clone, Default)]
pub struct DrawingLayer {
    config: DrawingConfig,
    drawings: IndexMap<DrawingId, Drawing>,
    next_id: u64,
    pending: Option<Drawing>,
    active: Option<ActiveGesture>,
}

/// Chart coordinates of a pixel inside `drawing`'s panel.
fn domain_at(host: &dyn ChartHost, drawing: &Drawing, at: Point) -> Option<(i64, f64)> {
    let panel = host.panel(drawing.panel_name())?;
    Some((host.tick_from_pixel(at.x), host.value_from_pixel(panel, at.y)))
}

impl DrawingLayer {
    #[must_use]
    pub fn new(config: DrawingConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn config(&self) -> &DrawingConfig {
        &self.config
    }

    /// Replaces the configuration; committed drawings keep their style and
    /// pick up the new tolerances.
    pub fn set_config(&mut self, config: DrawingConfig) {
        let tolerances = config.tolerances();
        for drawing in self.drawings.values_mut() {
            drawing.set_tolerances(tolerances);
        }
        self.config = config;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.drawings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drawings.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: DrawingId) -> Option<&Drawing> {
        self.drawings.get(&id)
    }

    pub fn get_mut(&mut self, id: DrawingId) -> Option<&mut Drawing> {
        self.drawings.get_mut(&id)
    }

    /// Drawings in z-order, bottom first.
    pub fn iter(&self) -> impl Iterator<Item = (DrawingId, &Drawing)> {
        self.drawings.iter().map(|(id, drawing)| (*id, drawing))
    }

    #[must_use]
    pub fn pending(&self) -> Option<&Drawing> {
        self.pending.as_ref()
    }

    #[must_use]
    pub fn active(&self) -> Option<DrawingId> {
        self.active.as_ref().map(|gesture| gesture.id)
    }

    /// Arms `kind` on `panel_name`; the next pointer down starts it.
    pub fn begin_tool(&mut self, kind: DrawingKind, panel_name: &str) -> DrawingResult<()> {
        let mut drawing = Drawing::create(kind, panel_name, &self.config.vector)?;
        drawing.set_tolerances(self.config.tolerances());
        if self.pending.replace(drawing).is_some() {
            debug!(kind = %kind, "previous tool replaced before completion");
        }
        Ok(())
    }

    pub fn cancel_tool(&mut self) -> Option<Drawing> {
        self.pending.take()
    }

    /// Feeds a click to the tool under construction.
    pub fn pointer_down(&mut self, host: &dyn ChartHost, at: Point) -> PointerOutcome {
        let Some(pending) = self.pending.as_mut() else {
            return PointerOutcome::Idle;
        };
        let Some((tick, value)) = domain_at(host, pending, at) else {
            trace!(panel = %pending.panel_name(), "pointer down without a panel");
            return PointerOutcome::Constructing;
        };
        let outcome = pending.click(host, tick, value);
        self.settle(outcome)
    }

    /// Previews the tool under construction, or drags the active gesture.
    pub fn pointer_move(&mut self, host: &dyn ChartHost, at: Point) {
        if let Some(pending) = self.pending.as_mut() {
            if let Some((tick, value)) = domain_at(host, pending, at) {
                pending.pointer_move(host, tick, value);
            }
            return;
        }
        self.reposition_active(host, at);
    }

    /// Finishes drag-drawn tools and ends the active gesture.
    pub fn pointer_up(&mut self, host: &dyn ChartHost, at: Point) -> PointerOutcome {
        if let Some(pending) = self.pending.as_mut() {
            if !pending.kind().drag_to_draw() || !pending.base().pen_down {
                return PointerOutcome::Constructing;
            }
            let Some((tick, value)) = domain_at(host, pending, at) else {
                return PointerOutcome::Constructing;
            };
            let outcome = pending.click(host, tick, value);
            return self.settle(outcome);
        }
        self.end_reposition();
        PointerOutcome::Idle
    }

    fn settle(&mut self, outcome: ClickOutcome) -> PointerOutcome {
        match outcome {
            ClickOutcome::Continue => PointerOutcome::Constructing,
            ClickOutcome::Abort => {
                self.pending = None;
                PointerOutcome::Aborted
            }
            ClickOutcome::Complete => match self.pending.take() {
                Some(drawing) => PointerOutcome::Committed(self.push(drawing)),
                None => PointerOutcome::Idle,
            },
        }
    }

    /// Appends a finished drawing on top.
    pub fn push(&mut self, drawing: Drawing) -> DrawingId {
        let id = DrawingId(self.next_id);
        self.next_id += 1;
        debug!(%id, kind = %drawing.kind(), "drawing committed");
        self.drawings.insert(id, drawing);
        id
    }

    /// Hit tests from the top of the z-order down. Every other drawing
    /// loses its highlight.
    pub fn find_intersected(&mut self, host: &dyn ChartHost, at: Point) -> Option<(DrawingId, Repositioner)> {
        let radius = self.config.hit_px();
        let mut found = None;
        for (id, drawing) in self.drawings.iter_mut().rev() {
            if found.is_some() {
                drawing.base_mut().highlighted = Highlight::None;
                continue;
            }
            let Some(panel) = host.panel(drawing.panel_name()) else {
                continue;
            };
            let tick = host.tick_from_pixel(at.x);
            let value = host.value_from_pixel(panel, at.y);
            let hit_box = HitBox::around_pixel(host, panel, at, radius);
            match drawing.intersected(host, tick, value, hit_box) {
                Some(repositioner) => found = Some((*id, repositioner)),
                None => drawing.base_mut().highlighted = Highlight::None,
            }
        }
        found
    }

    /// Starts dragging whatever is under the pointer.
    pub fn begin_reposition(&mut self, host: &dyn ChartHost, at: Point) -> Option<DrawingId> {
        let (id, repositioner) = self.find_intersected(host, at)?;
        debug!(%id, action = ?repositioner.action, "reposition started");
        self.active = Some(ActiveGesture { id, repositioner });
        Some(id)
    }

    pub fn reposition_active(&mut self, host: &dyn ChartHost, at: Point) {
        let Some(gesture) = self.active.as_ref() else {
            return;
        };
        let Some(drawing) = self.drawings.get_mut(&gesture.id) else {
            return;
        };
        if let Some((tick, value)) = domain_at(host, drawing, at) {
            drawing.reposition(host, &gesture.repositioner, tick, value);
        }
    }

    pub fn end_reposition(&mut self) -> Option<DrawingId> {
        self.active.take().map(|gesture| gesture.id)
    }

    pub fn clear_highlights(&mut self) {
        for drawing in self.drawings.values_mut() {
            drawing.base_mut().highlighted = Highlight::None;
        }
    }

    /// Re-derives live anchors after the data set or a panel changed.
    pub fn adjust_all(&mut self, host: &dyn ChartHost) {
        for drawing in self.drawings.values_mut() {
            drawing.adjust(host);
        }
        if let Some(pending) = self.pending.as_mut() {
            pending.adjust(host);
        }
    }

    /// Paints every drawing bottom first, then the tool under construction.
    /// A backend failure skips that drawing; returns how many painted.
    pub fn render_all(&mut self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> usize {
        let mut painted = 0;
        for drawing in self.drawings.values_mut().chain(self.pending.as_mut()) {
            match drawing.render(ctx, host) {
                Ok(()) => painted += 1,
                Err(err) => warn!(kind = %drawing.kind(), error = %err, "drawing failed to render"),
            }
        }
        painted
    }

    #[must_use]
    pub fn descriptors(&self) -> Vec<DrawingDescriptor> {
        self.drawings.values().map(Serializable::serialize).collect()
    }

    /// Committed drawings as a JSON array of descriptors.
    pub fn serialize_all(&self) -> DrawingResult<String> {
        serde_json::to_string(&self.descriptors())
            .map_err(|e| DrawingError::Codec(format!("failed to serialize drawings: {e}")))
    }

    /// Appends drawings from a JSON array. Entries that do not parse or
    /// reconstruct are skipped; returns how many were restored.
    pub fn restore_all(&mut self, host: &dyn ChartHost, json: &str) -> DrawingResult<usize> {
        let entries: Vec<serde_json::Value> = serde_json::from_str(json)
            .map_err(|e| DrawingError::Codec(format!("drawing list is not a JSON array: {e}")))?;
        let tolerances = self.config.tolerances();
        let mut restored = 0;
        for (index, entry) in entries.into_iter().enumerate() {
            let drawing = serde_json::from_value::<DrawingDescriptor>(entry)
                .map_err(|e| DrawingError::Codec(e.to_string()))
                .and_then(|desc| Drawing::reconstruct(host, &desc));
            match drawing {
                Ok(mut drawing) => {
                    drawing.set_tolerances(tolerances);
                    self.push(drawing);
                    restored += 1;
                }
                Err(err) => warn!(index, error = %err, "skipping persisted drawing"),
            }
        }
        debug!(restored, total = self.drawings.len(), "drawings restored");
        Ok(restored)
    }

    pub fn remove(&mut self, id: DrawingId) -> Option<Drawing> {
        if self.active() == Some(id) {
            self.active = None;
        }
        self.drawings.shift_remove(&id)
    }

    pub fn clear(&mut self) {
        self.drawings.clear();
        self.pending = None;
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::{DrawingLayer, PointerOutcome};
    use crate::api::DrawingConfig;
    use crate::core::types::Point;
    use crate::drawing::{Anchored, DrawingKind};
    use crate::interaction::{AnchorSlot, Highlight};
    use crate::render::RecordingContext;
    use crate::test_support::daily_host;

    /// Pixel of `(tick, value)` on the test panel.
    fn px(tick: i64, value: f64) -> Point {
        Point::new(10.0 * tick as f64 + 5.0, 200.0 - value)
    }

    fn layer_with_segment(host: &crate::core::host::StaticChartHost) -> (DrawingLayer, super::DrawingId) {
        let mut layer = DrawingLayer::new(DrawingConfig::default());
        layer.begin_tool(DrawingKind::Segment, "chart").expect("tool");
        assert_eq!(layer.pointer_down(host, px(4, 100.0)), PointerOutcome::Constructing);
        layer.pointer_move(host, px(8, 120.0));
        let PointerOutcome::Committed(id) = layer.pointer_down(host, px(12, 140.0)) else {
            panic!("segment should commit on the second click");
        };
        (layer, id)
    }

    #[test]
    fn idle_without_a_tool() {
        let host = daily_host(40);
        let mut layer = DrawingLayer::default();
        assert_eq!(layer.pointer_down(&host, px(4, 100.0)), PointerOutcome::Idle);
        assert!(layer.is_empty());
    }

    #[test]
    fn two_clicks_commit_a_segment() {
        let host = daily_host(40);
        let (layer, id) = layer_with_segment(&host);
        assert_eq!(layer.len(), 1);
        assert!(layer.pending().is_none());
        let segment = layer.get(id).expect("segment");
        let p1 = segment.base().anchor(AnchorSlot::P1).expect("p1");
        assert_eq!(p1.tick, 12);
        assert!((p1.value - 140.0).abs() < 1e-9);
    }

    #[test]
    fn accidental_second_click_aborts() {
        let host = daily_host(40);
        let mut layer = DrawingLayer::default();
        layer.begin_tool(DrawingKind::Segment, "chart").expect("tool");
        layer.pointer_down(&host, px(4, 100.0));
        assert_eq!(layer.pointer_down(&host, px(4, 101.0)), PointerOutcome::Aborted);
        assert!(layer.pending().is_none());
        assert!(layer.is_empty());
    }

    #[test]
    fn freeform_commits_on_pointer_up() {
        let host = daily_host(40);
        let mut layer = DrawingLayer::default();
        layer.begin_tool(DrawingKind::Freeform, "chart").expect("tool");
        assert_eq!(layer.pointer_up(&host, px(2, 100.0)), PointerOutcome::Constructing);
        layer.pointer_down(&host, px(2, 100.0));
        layer.pointer_move(&host, px(5, 110.0));
        layer.pointer_move(&host, px(9, 105.0));
        assert!(matches!(layer.pointer_up(&host, px(9, 105.0)), PointerOutcome::Committed(_)));
    }

    #[test]
    fn hits_pick_the_topmost_drawing_and_drag_it() {
        let host = daily_host(40);
        let (mut layer, first) = layer_with_segment(&host);
        layer.begin_tool(DrawingKind::Segment, "chart").expect("tool");
        layer.pointer_down(&host, px(4, 100.0));
        let PointerOutcome::Committed(second) = layer.pointer_down(&host, px(12, 140.0)) else {
            panic!("second segment");
        };

        assert_eq!(layer.begin_reposition(&host, px(8, 120.0)), Some(second));
        assert_eq!(layer.get(first).map(|d| d.base().highlighted), Some(Highlight::None));
        assert!(layer.get(second).is_some_and(|d| d.base().highlighted.is_active()));

        layer.pointer_move(&host, px(10, 130.0));
        assert_eq!(layer.pointer_up(&host, px(10, 130.0)), PointerOutcome::Idle);
        assert!(layer.active().is_none());
        let moved = layer.get(second).and_then(|d| d.base().anchor(AnchorSlot::P0)).expect("p0");
        assert_eq!(moved.tick, 6);
        let untouched = layer.get(first).and_then(|d| d.base().anchor(AnchorSlot::P0)).expect("p0");
        assert_eq!(untouched.tick, 4);
    }

    #[test]
    fn empty_space_hits_nothing() {
        let host = daily_host(40);
        let (mut layer, _) = layer_with_segment(&host);
        assert!(layer.find_intersected(&host, px(30, 20.0)).is_none());
    }

    #[test]
    fn render_all_paints_committed_and_pending() {
        let host = daily_host(40);
        let (mut layer, _) = layer_with_segment(&host);
        layer.begin_tool(DrawingKind::Crossline, "chart").expect("tool");
        layer.pointer_down(&host, px(20, 120.0));
        let mut ctx = RecordingContext::new();
        assert_eq!(layer.render_all(&mut ctx, &host), 2);
        assert!(ctx.strokes().count() >= 1);
    }

    #[test]
    fn restore_skips_broken_entries() {
        let host = daily_host(40);
        let (layer, _) = layer_with_segment(&host);
        let json = layer.serialize_all().expect("serialize");
        let mut entries: Vec<serde_json::Value> = serde_json::from_str(&json).expect("array");
        entries.push(serde_json::json!({ "name": "spirograph" }));
        entries.push(serde_json::json!(42));
        let mixed = serde_json::to_string(&entries).expect("json");

        let mut restored = DrawingLayer::default();
        assert_eq!(restored.restore_all(&host, &mixed).expect("restore"), 1);
        assert_eq!(restored.len(), 1);
        assert!(restored.restore_all(&host, "{}").is_err());
    }

    #[test]
    fn remove_keeps_z_order() {
        let host = daily_host(40);
        let (mut layer, first) = layer_with_segment(&host);
        layer.begin_tool(DrawingKind::GannFan, "chart").expect("tool");
        layer.pointer_down(&host, px(4, 100.0));
        layer.pointer_down(&host, px(12, 140.0));
        layer.begin_tool(DrawingKind::SpeedArc, "chart").expect("tool");
        layer.pointer_down(&host, px(4, 100.0));
        layer.pointer_down(&host, px(12, 140.0));

        assert!(layer.remove(first).is_some());
        let kinds: Vec<DrawingKind> = layer.iter().map(|(_, d)| d.kind()).collect();
        assert_eq!(kinds, [DrawingKind::GannFan, DrawingKind::SpeedArc]);
        layer.clear();
        assert!(layer.is_empty());
    }

    fn callout_tolerances(layer: &DrawingLayer) -> Vec<crate::drawing::InteractionTolerances> {
        layer
            .iter()
            .filter_map(|(_, drawing)| match drawing {
                crate::drawing::Drawing::Trendline(trendline) => Some(trendline.callout().base().tolerances),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn touch_tolerances_reach_the_trendline_callout() {
        let host = daily_host(40);
        let touch = DrawingConfig::from_json_str(r#"{"input_device":"touch"}"#).expect("parse");
        let mut layer = DrawingLayer::new(touch.clone());
        layer.begin_tool(DrawingKind::Trendline, "chart").expect("tool");
        layer.pointer_down(&host, px(4, 100.0));
        layer.pointer_down(&host, px(12, 140.0));
        assert_eq!(callout_tolerances(&layer), [touch.tolerances()]);

        let mut restored = DrawingLayer::new(touch.clone());
        restored
            .restore_all(&host, &layer.serialize_all().expect("serialize"))
            .expect("restore");
        assert_eq!(callout_tolerances(&restored), [touch.tolerances()]);

        restored.set_config(DrawingConfig::default());
        assert_eq!(callout_tolerances(&restored), [DrawingConfig::default().tolerances()]);
        assert_ne!(touch.tolerances(), DrawingConfig::default().tolerances());
    }
}
