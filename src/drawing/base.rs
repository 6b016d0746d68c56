//! State every drawing carries: tool kind, panel reference, captured style,
//! interaction flags and up to three anchors with their durable mirrors.

use tracing::trace;

use crate::core::anchor::DurableAnchor;
use crate::core::geometry::{HitBox, point_intersection};
use crate::core::host::ChartHost;
use crate::core::pane::Panel;
use crate::core::types::{Anchor, Point};
use crate::drawing::descriptor::DrawingDescriptor;
use crate::drawing::kind::DrawingKind;
use crate::drawing::params::VectorParameters;
use crate::error::DrawingResult;
use crate::interaction::{AnchorSlot, Highlight, RepositionAction, Repositioner};
use crate::render::plot::{HANDLE_RADIUS, LineStyle, little_circle};
use crate::render::{Color, DrawingContext, LinePattern, resolve_style_color};

/// Pixel distances that govern pointer interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionTolerances {
    /// A second click closer than this to the first anchor is accidental.
    pub click_px: f64,
    /// Half size of the pointer hit box.
    pub hit_px: f64,
    pub handle_radius: f64,
}

impl Default for InteractionTolerances {
    fn default() -> Self {
        Self {
            click_px: 5.0,
            hit_px: 5.0,
            handle_radius: HANDLE_RADIUS,
        }
    }
}

/// Style attributes captured when the drawing is created.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingStyle {
    pub color: String,
    /// Empty when the drawing has no fill.
    pub fill_color: String,
    pub line_width: f64,
    pub pattern: LinePattern,
}

impl DrawingStyle {
    #[must_use]
    pub fn from_parameters(params: &VectorParameters) -> Self {
        Self {
            color: params.current_color.clone(),
            fill_color: params.fill_color.clone(),
            line_width: params.line_width,
            pattern: params.pattern,
        }
    }

    fn from_descriptor(desc: &DrawingDescriptor) -> Self {
        Self {
            color: desc.col.clone().unwrap_or_else(|| "auto".to_owned()),
            fill_color: desc.fc.clone().unwrap_or_default(),
            line_width: desc.lw.filter(|w| w.is_finite() && *w > 0.0).unwrap_or(1.0),
            pattern: desc.ptrn.unwrap_or_default(),
        }
    }
}

impl Default for DrawingStyle {
    fn default() -> Self {
        Self::from_parameters(&VectorParameters::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawingBase {
    kind: DrawingKind,
    panel_name: String,
    pub style: DrawingStyle,
    /// Construction in progress.
    pub pen_down: bool,
    pub highlighted: Highlight,
    pub tolerances: InteractionTolerances,
    anchors: [Option<Anchor>; 3],
    durable: [Option<DurableAnchor>; 3],
}

impl DrawingBase {
    #[must_use]
    pub fn new(kind: DrawingKind, panel_name: impl Into<String>, style: DrawingStyle) -> Self {
        Self {
            kind,
            panel_name: panel_name.into(),
            style,
            pen_down: false,
            highlighted: Highlight::None,
            tolerances: InteractionTolerances::default(),
            anchors: [None; 3],
            durable: [None; 3],
        }
    }

    /// Style and durable anchors of a persisted drawing. Live anchors stay
    /// unset until [`Self::adjust_slots`] resolves them.
    pub fn from_descriptor(kind: DrawingKind, desc: &DrawingDescriptor) -> DrawingResult<Self> {
        let mut base = Self::new(kind, desc.panel_name()?, DrawingStyle::from_descriptor(desc));
        for slot in AnchorSlot::ALL {
            base.durable[slot.index()] = desc.anchor(slot)?;
        }
        Ok(base)
    }

    #[must_use]
    pub fn kind(&self) -> DrawingKind {
        self.kind
    }

    #[must_use]
    pub fn panel_name(&self) -> &str {
        &self.panel_name
    }

    #[must_use]
    pub fn anchor(&self, slot: AnchorSlot) -> Option<Anchor> {
        self.anchors[slot.index()]
    }

    #[must_use]
    pub fn anchors(&self) -> &[Option<Anchor>; 3] {
        &self.anchors
    }

    #[must_use]
    pub fn durable(&self, slot: AnchorSlot) -> Option<DurableAnchor> {
        self.durable[slot.index()]
    }

    /// `p0` and `p1` when both are set.
    #[must_use]
    pub fn pair(&self) -> Option<(Anchor, Anchor)> {
        Some((self.anchors[0]?, self.anchors[1]?))
    }

    /// Resolves the drawing's panel, logging when it has gone away.
    pub fn panel<'h>(&self, host: &'h dyn ChartHost) -> Option<&'h Panel> {
        let panel = host.panel(&self.panel_name);
        if panel.is_none() {
            trace!(kind = %self.kind, panel = %self.panel_name, "drawing panel is missing");
        }
        panel
    }

    /// Sets a live anchor and captures its durable mirror.
    pub fn set_point(&mut self, host: &dyn ChartHost, slot: AnchorSlot, tick: i64, value: f64) {
        self.anchors[slot.index()] = Some(Anchor::new(tick, value));
        self.durable[slot.index()] = DurableAnchor::capture(host, tick, value);
    }

    /// Sets a live anchor only; used for previews.
    pub fn set_live(&mut self, slot: AnchorSlot, anchor: Option<Anchor>) {
        self.anchors[slot.index()] = anchor;
    }

    pub fn set_durable(&mut self, slot: AnchorSlot, anchor: Option<DurableAnchor>) {
        self.durable[slot.index()] = anchor;
    }

    pub fn clear(&mut self, slot: AnchorSlot) {
        self.anchors[slot.index()] = None;
        self.durable[slot.index()] = None;
    }

    /// Re-captures the durable mirrors of the given slots from their live anchors.
    pub fn recapture(&mut self, host: &dyn ChartHost, slots: &[AnchorSlot]) {
        for &slot in slots {
            if let Some(anchor) = self.anchor(slot) {
                self.set_point(host, slot, anchor.tick, anchor.value);
            }
        }
    }

    /// Re-derives live ticks from durable dates. No-op without a panel; an
    /// unresolvable date leaves the anchor unset.
    pub fn adjust_slots(&mut self, host: &dyn ChartHost, slots: &[AnchorSlot]) {
        if self.panel(host).is_none() {
            return;
        }
        for &slot in slots {
            let Some(durable) = self.durable[slot.index()] else {
                continue;
            };
            let resolved = durable.resolve(host).map(|tick| Anchor::new(tick, durable.value));
            if resolved.is_none() {
                trace!(kind = %self.kind, slot = slot.index(), "durable anchor does not resolve");
            }
            self.anchors[slot.index()] = resolved;
        }
    }

    /// Pixel position of an anchor slot.
    #[must_use]
    pub fn pixel(&self, host: &dyn ChartHost, panel: &Panel, slot: AnchorSlot) -> Option<Point> {
        self.anchor(slot).map(|anchor| host.anchor_to_pixel(panel, anchor))
    }

    /// Whether a click lands within the click tolerance of `p0`.
    #[must_use]
    pub fn accidental_click(&self, host: &dyn ChartHost, tick: i64, value: f64) -> bool {
        if self.kind.drag_to_draw() {
            return false;
        }
        let (Some(panel), Some(p0)) = (host.panel(&self.panel_name), self.anchors[0]) else {
            return false;
        };
        let from = host.anchor_to_pixel(panel, p0);
        let to = host.anchor_to_pixel(panel, Anchor::new(tick, value));
        from.distance_to(to) < self.tolerances.click_px
    }

    /// Stroke color: highlight while selected, otherwise the style color with
    /// `auto` and transparent falling back to the host default.
    #[must_use]
    pub fn line_color(&self, host: &dyn ChartHost) -> Color {
        self.line_color_for(host, &self.style.color)
    }

    #[must_use]
    pub fn line_color_for(&self, host: &dyn ChartHost, color: &str) -> Color {
        let theme = host.theme();
        if self.highlighted.is_active() {
            return theme.highlight_color;
        }
        resolve_style_color(color, theme.default_color).unwrap_or(theme.default_color)
    }

    /// Style color ignoring the highlight.
    #[must_use]
    pub fn text_color(&self, host: &dyn ChartHost) -> Color {
        let fallback = host.theme().default_color;
        resolve_style_color(&self.style.color, fallback).unwrap_or(fallback)
    }

    /// Explicit fill color; `None` when unset, `auto` or transparent.
    #[must_use]
    pub fn fill_color(&self) -> Option<Color> {
        let fill = self.style.fill_color.trim();
        if fill.is_empty() || fill.eq_ignore_ascii_case("auto") {
            return None;
        }
        Color::parse_css(fill).ok().filter(|color| !color.is_transparent())
    }

    /// Fill color with `auto` and transparent falling back to the host default.
    #[must_use]
    pub fn fill_or_default(&self, host: &dyn ChartHost) -> Color {
        let fallback = host.theme().default_color;
        resolve_style_color(&self.style.fill_color, fallback).unwrap_or(fallback)
    }

    /// Stroke style; a hidden pattern turns dotted while under construction
    /// or selected so the drawing stays visible.
    #[must_use]
    pub fn line_style(&self) -> LineStyle {
        let style = self.plain_line_style();
        if (self.pen_down || self.highlighted.is_active()) && self.style.pattern == LinePattern::None {
            return style.with_pattern(LinePattern::Dotted);
        }
        style
    }

    #[must_use]
    pub fn plain_line_style(&self) -> LineStyle {
        LineStyle::new(self.style.pattern, self.style.line_width)
    }

    /// Draws handle circles while highlighted; the highlighted anchor is filled.
    pub fn render_handles(
        &self,
        ctx: &mut dyn DrawingContext,
        host: &dyn ChartHost,
        handles: &[(AnchorSlot, Point)],
    ) -> DrawingResult<()> {
        if !self.highlighted.is_active() {
            return Ok(());
        }
        for &(slot, at) in handles {
            let filled = self.highlighted == Highlight::Anchor(slot);
            little_circle(ctx, host.theme(), at, self.tolerances.handle_radius, filled)?;
        }
        Ok(())
    }

    /// Tests the given anchors against the hit box; a hit highlights that
    /// anchor and starts a drag.
    pub fn hit_handles(
        &mut self,
        host: &dyn ChartHost,
        panel: &Panel,
        hit_box: HitBox,
        slots: &[AnchorSlot],
        tick: i64,
        value: f64,
    ) -> Option<Repositioner> {
        let slot = slots.iter().copied().find(|&slot| {
            self.anchor(slot)
                .is_some_and(|anchor| point_intersection(host, panel, anchor, hit_box))
        })?;
        self.highlighted = Highlight::Anchor(slot);
        Some(Repositioner::drag(slot, &self.anchors, tick, value))
    }

    /// Highlights the whole drawing and snapshots its anchors for a move.
    pub fn begin_move(&mut self, tick: i64, value: f64) -> Repositioner {
        self.highlighted = Highlight::Whole;
        Repositioner::new(RepositionAction::Move, &self.anchors, tick, value)
    }

    /// Applies a move (snapshot plus pointer delta) or a single-anchor drag.
    pub fn reposition_anchors(
        &mut self,
        host: &dyn ChartHost,
        repositioner: &Repositioner,
        tick: i64,
        value: f64,
        slots: &[AnchorSlot],
    ) {
        match repositioner.action {
            RepositionAction::Move => {
                let (dt, dv) = repositioner.delta(tick, value);
                for &slot in slots {
                    if let Some(start) = repositioner.anchor(slot) {
                        self.set_point(host, slot, start.tick + dt, start.value + dv);
                    }
                }
            }
            RepositionAction::Drag => {
                if let Some(point) = repositioner.point {
                    self.set_live(point, Some(Anchor::new(tick, value)));
                    self.recapture(host, slots);
                }
            }
            RepositionAction::Scale | RepositionAction::Rotate | RepositionAction::Select => {}
        }
    }

    /// Descriptor with the common keys filled in.
    #[must_use]
    pub fn descriptor(&self) -> DrawingDescriptor {
        let mut desc = DrawingDescriptor::new(self.kind.as_str());
        desc.pnl = Some(self.panel_name.clone());
        desc.col = Some(self.style.color.clone());
        desc.fc = (!self.style.fill_color.is_empty()).then(|| self.style.fill_color.clone());
        desc.ptrn = Some(self.style.pattern);
        desc.lw = Some(self.style.line_width);
        desc
    }

    pub fn write_anchors(&self, desc: &mut DrawingDescriptor, slots: &[AnchorSlot]) {
        for &slot in slots {
            desc.set_anchor(slot, self.durable(slot));
        }
    }
}
