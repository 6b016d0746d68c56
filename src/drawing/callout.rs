//! Text box with a stem pointing at a chart location.
//!
//! `p0` is the centre of the box and slot `p1` holds the stem tip. The side
//! the stem enters through is derived from the tip's pixel position and
//! decides where the outline breaks out to meet it.

use tracing::{debug, trace};

use crate::core::anchor::DurableAnchor;
use crate::core::geometry::{HitBox, LineKind, pixel_line_intersection};
use crate::core::host::ChartHost;
use crate::core::types::{Anchor, PathSegment, Point};
use crate::drawing::base::{DrawingBase, DrawingStyle};
use crate::drawing::descriptor::{DrawingDescriptor, StemDescriptor};
use crate::drawing::kind::DrawingKind;
use crate::drawing::traits::{HitTestable, Interactive, Renderable, Serializable};
use crate::error::{DrawingError, DrawingResult};
use crate::interaction::{AnchorSlot, ClickOutcome, Highlight, RepositionAction, Repositioner};
use crate::render::plot::little_circle;
use crate::render::{DrawingContext, FontSpec, LinePattern, TextAlign, TextBaseline, resolve_style_color};

const PADDING: f64 = 4.0;
const DEFAULT_HALF_WIDTH: f64 = 50.0;
const DEFAULT_HALF_HEIGHT: f64 = 10.0;
const MAX_CORNER_RADIUS: f64 = 8.0;
const FILL_OPACITY: f64 = 0.4;
const FALLBACK_LINE_WIDTH: f64 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StemColumn {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StemRow {
    Top,
    Middle,
    Bottom,
}

/// Region of the box edge the stem enters through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StemEntry {
    pub column: StemColumn,
    pub row: StemRow,
}

impl StemEntry {
    /// Classifies a stem tip against a box centred on `centre` with the
    /// given half extents.
    #[must_use]
    pub fn classify(tip: Point, centre: Point, half_width: f64, half_height: f64) -> Self {
        let column = if tip.x >= centre.x + half_width {
            StemColumn::Right
        } else if tip.x > centre.x - half_width {
            StemColumn::Center
        } else {
            StemColumn::Left
        };
        let row = if tip.y >= centre.y + half_height {
            StemRow::Bottom
        } else if tip.y > centre.y - half_height {
            StemRow::Middle
        } else {
            StemRow::Top
        };
        Self { column, row }
    }

    /// Tip is underneath the box.
    #[must_use]
    pub fn is_inside(self) -> bool {
        self.column == StemColumn::Center && self.row == StemRow::Middle
    }

    /// Point on the box edge the stem line starts from.
    #[must_use]
    pub fn edge_point(self, centre: Point, half_width: f64, half_height: f64) -> Point {
        let x = match self.column {
            StemColumn::Left => centre.x - half_width,
            StemColumn::Center => centre.x,
            StemColumn::Right => centre.x + half_width,
        };
        let y = match self.row {
            StemRow::Top => centre.y - half_height,
            StemRow::Middle => centre.y,
            StemRow::Bottom => centre.y + half_height,
        };
        Point::new(x, y)
    }

    fn is(self, column: StemColumn, row: StemRow) -> bool {
        self.column == column && self.row == row
    }
}

/// Rounded box outline, clockwise from the top edge, detouring to `stem`
/// at the edge region it enters through.
#[must_use]
pub fn outline_path(centre: Point, half_width: f64, half_height: f64, stem: Option<(Point, StemEntry)>) -> Vec<PathSegment> {
    use PathSegment::{LineTo, MoveTo, QuadTo};
    use StemColumn::{Center, Left, Right};
    use StemRow::{Bottom, Middle, Top};

    let (x, y, w, h) = (centre.x, centre.y, half_width, half_height);
    let r = (w.min(h) / 2.0).min(MAX_CORNER_RADIUS);
    let enters = |column, row| stem.filter(|(_, entry)| entry.is(column, row)).map(|(tip, _)| tip);
    let p = Point::new;
    let mut path = Vec::with_capacity(24);

    path.push(MoveTo(p(x + w - r, y - h)));
    match enters(Right, Top) {
        Some(tip) => path.extend([LineTo(tip), LineTo(p(x + w, y - h + r))]),
        None => path.push(QuadTo { control: p(x + w, y - h), to: p(x + w, y - h + r) }),
    }
    path.push(LineTo(p(x + w, y - r / 2.0)));
    path.extend(enters(Right, Middle).map(LineTo));
    path.push(LineTo(p(x + w, y + r / 2.0)));
    path.push(LineTo(p(x + w, y + h - r)));
    match enters(Right, Bottom) {
        Some(tip) => path.extend([LineTo(tip), LineTo(p(x + w - r, y + h))]),
        None => path.push(QuadTo { control: p(x + w, y + h), to: p(x + w - r, y + h) }),
    }
    path.push(LineTo(p(x + r / 2.0, y + h)));
    path.extend(enters(Center, Bottom).map(LineTo));
    path.push(LineTo(p(x - r / 2.0, y + h)));
    path.push(LineTo(p(x - w + r, y + h)));
    match enters(Left, Bottom) {
        Some(tip) => path.extend([LineTo(tip), LineTo(p(x - w, y + h - r))]),
        None => path.push(QuadTo { control: p(x - w, y + h), to: p(x - w, y + h - r) }),
    }
    path.push(LineTo(p(x - w, y + r / 2.0)));
    path.extend(enters(Left, Middle).map(LineTo));
    path.push(LineTo(p(x - w, y - r / 2.0)));
    path.push(LineTo(p(x - w, y - h + r)));
    match enters(Left, Top) {
        Some(tip) => path.extend([LineTo(tip), LineTo(p(x - w + r, y - h))]),
        None => path.push(QuadTo { control: p(x - w, y - h), to: p(x - w + r, y - h) }),
    }
    path.push(LineTo(p(x - r / 2.0, y - h)));
    path.extend(enters(Center, Top).map(LineTo));
    path.push(LineTo(p(x + r / 2.0, y - h)));
    path.push(LineTo(p(x + w - r, y - h)));
    path
}

#[derive(Debug, Clone, PartialEq)]
pub struct Callout {
    base: DrawingBase,
    text: String,
    font: FontSpec,
    border_color: String,
    /// Full box size from the last layout pass.
    size: (f64, f64),
    stem_entry: Option<StemEntry>,
    show_handles: bool,
}

impl Callout {
    #[must_use]
    pub fn new(panel_name: impl Into<String>, style: DrawingStyle, font: FontSpec) -> Self {
        let border_color = style.color.clone();
        Self {
            base: DrawingBase::new(DrawingKind::Callout, panel_name, style),
            text: String::new(),
            font,
            border_color,
            size: (2.0 * DEFAULT_HALF_WIDTH, 2.0 * DEFAULT_HALF_HEIGHT),
            stem_entry: None,
            show_handles: true,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    #[must_use]
    pub fn font(&self) -> &FontSpec {
        &self.font
    }

    pub fn set_font(&mut self, font: FontSpec) {
        self.font = font;
    }

    pub fn set_border_color(&mut self, color: impl Into<String>) {
        self.border_color = color.into();
    }

    /// Full width and height of the box as last laid out.
    #[must_use]
    pub fn size(&self) -> (f64, f64) {
        self.size
    }

    #[must_use]
    pub fn stem_entry(&self) -> Option<StemEntry> {
        self.stem_entry
    }

    #[must_use]
    pub fn stem(&self) -> Option<Anchor> {
        self.base.anchor(AnchorSlot::P1)
    }

    pub(crate) fn hide_handles(&mut self) {
        self.show_handles = false;
    }

    /// Places the box and the stem tip.
    pub(crate) fn place(&mut self, host: &dyn ChartHost, centre: Anchor, stem: Anchor) {
        self.base.set_point(host, AnchorSlot::P0, centre.tick, centre.value);
        self.base.set_point(host, AnchorSlot::P1, stem.tick, stem.value);
    }

    /// Lays the box out against `ctx` without painting it, so a caller can
    /// position the box from its size within the same frame.
    pub(crate) fn measure(&mut self, ctx: &mut dyn DrawingContext) -> (f64, f64) {
        ctx.save();
        ctx.set_font(&self.font);
        self.layout(ctx);
        ctx.restore();
        self.size
    }

    fn half_extent(&self) -> (f64, f64) {
        (self.size.0 / 2.0, self.size.1 / 2.0)
    }

    /// Sizes the box from the text; defaults while drawing or when empty.
    fn layout(&mut self, ctx: &mut dyn DrawingContext) {
        if self.base.pen_down || self.text.is_empty() {
            self.size = (2.0 * DEFAULT_HALF_WIDTH, 2.0 * DEFAULT_HALF_HEIGHT);
            return;
        }
        let widest = self
            .text
            .lines()
            .map(|line| ctx.measure_text(line))
            .fold(0.0_f64, f64::max);
        let lines = self.text.lines().count().max(1) as f64;
        self.size = (widest + 2.0 * PADDING, lines * self.font.size_px + 2.0 * PADDING);
    }

    fn box_contains(&self, centre: Point, at: Point) -> bool {
        let (w, h) = self.half_extent();
        at.x >= centre.x - w && at.x <= centre.x + w && at.y >= centre.y - h && at.y <= centre.y + h
    }
}

impl_anchored!(Callout);

impl Interactive for Callout {
    fn click(&mut self, host: &dyn ChartHost, tick: i64, value: f64) -> ClickOutcome {
        let Some(panel) = self.base.panel(host) else {
            return ClickOutcome::Continue;
        };
        if !panel.contains(host.anchor_to_pixel(panel, Anchor::new(tick, value))) {
            trace!("callout click outside the panel ignored");
            return ClickOutcome::Continue;
        }
        self.base.set_point(host, AnchorSlot::P0, tick, value);
        if !self.base.pen_down {
            self.base.set_point(host, AnchorSlot::P1, tick, value);
            self.base.pen_down = true;
            return ClickOutcome::Continue;
        }
        self.base.pen_down = false;
        debug!(kind = %self.base.kind(), "construction complete");
        ClickOutcome::Complete
    }

    fn pointer_move(&mut self, _host: &dyn ChartHost, tick: i64, value: f64) {
        if self.base.pen_down {
            self.base.set_live(AnchorSlot::P0, Some(Anchor::new(tick, value)));
        }
    }

    fn reposition(&mut self, host: &dyn ChartHost, repositioner: &Repositioner, tick: i64, value: f64) {
        match repositioner.action {
            RepositionAction::Drag => {
                self.base.set_point(host, AnchorSlot::P1, tick, value);
            }
            RepositionAction::Move if repositioner.stem.is_some() => {
                self.base
                    .reposition_anchors(host, repositioner, tick, value, &[AnchorSlot::P0, AnchorSlot::P1]);
            }
            _ => self
                .base
                .reposition_anchors(host, repositioner, tick, value, &[AnchorSlot::P0]),
        }
    }

    fn adjust(&mut self, host: &dyn ChartHost) {
        self.base.adjust_slots(host, &[AnchorSlot::P0, AnchorSlot::P1]);
    }
}

impl Renderable for Callout {
    fn render(&mut self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> DrawingResult<()> {
        let Some(panel) = self.base.panel(host) else {
            return Ok(());
        };
        let Some(centre) = self.base.pixel(host, panel, AnchorSlot::P0) else {
            return Ok(());
        };
        if !centre.y.is_finite() {
            return Ok(());
        }
        let theme = host.theme();
        ctx.save();
        ctx.set_font(&self.font);
        self.layout(ctx);
        let (w, h) = self.half_extent();

        let stem = self.base.pixel(host, panel, AnchorSlot::P1).map(|tip| {
            let entry = StemEntry::classify(tip, centre, w, h);
            let tip = if entry.is_inside() {
                tip
            } else {
                Point::new(tip.x.round(), tip.y.round())
            };
            (tip, entry)
        });
        self.stem_entry = stem.map(|(_, entry)| entry);

        let highlighted = self.base.highlighted.is_active();
        let line_width = if self.base.style.line_width > 0.0 {
            self.base.style.line_width
        } else {
            FALLBACK_LINE_WIDTH
        };
        let border = if highlighted {
            theme.highlight_color
        } else {
            resolve_style_color(&self.border_color, theme.default_color).unwrap_or(theme.default_color)
        };
        let fill = if highlighted {
            Some((theme.container_color, 1.0))
        } else if let Some(fill) = self.base.fill_color() {
            Some((fill, FILL_OPACITY))
        } else {
            stem.map(|_| (theme.container_color, 1.0))
        };

        ctx.begin_path();
        ctx.append_path(&outline_path(centre, w, h, stem));
        if let Some((color, alpha)) = fill {
            ctx.set_fill_color(color);
            ctx.set_global_alpha(alpha);
            ctx.fill()?;
            ctx.set_global_alpha(1.0);
        }
        if self.base.style.pattern != LinePattern::None {
            ctx.set_stroke_color(border);
            ctx.set_line_width(line_width);
            ctx.set_line_dash(&self.base.style.pattern.dash_array(line_width));
            ctx.stroke()?;
        }

        ctx.set_fill_color(if highlighted {
            theme.highlight_color
        } else {
            self.base.text_color(host)
        });
        ctx.set_text_align(TextAlign::Left);
        ctx.set_text_baseline(TextBaseline::Top);
        let mut y = centre.y - h + PADDING;
        for line in self.text.lines() {
            ctx.fill_text(line, centre.x - w + PADDING, y)?;
            y += self.font.size_px;
        }
        ctx.restore();

        if highlighted && self.show_handles {
            if let Some((tip, _)) = stem {
                let filled = self.base.highlighted == Highlight::Anchor(AnchorSlot::P1);
                little_circle(ctx, theme, tip, self.base.tolerances.handle_radius, filled)?;
            }
        }
        Ok(())
    }
}

impl HitTestable for Callout {
    fn intersected(
        &mut self,
        host: &dyn ChartHost,
        tick: i64,
        value: f64,
        hit_box: HitBox,
    ) -> Option<Repositioner> {
        let panel = self.base.panel(host)?;
        let centre = self.base.pixel(host, panel, AnchorSlot::P0)?;
        if let Some(hit) = self.base.hit_handles(host, panel, hit_box, &[AnchorSlot::P1], tick, value) {
            return Some(hit.with_stem(self.stem()));
        }
        let at = host.anchor_to_pixel(panel, Anchor::new(tick, value));
        if self.box_contains(centre, at) {
            return Some(self.base.begin_move(tick, value));
        }
        let tip = self.base.pixel(host, panel, AnchorSlot::P1)?;
        let (w, h) = self.half_extent();
        let entry = self
            .stem_entry
            .unwrap_or_else(|| StemEntry::classify(tip, centre, w, h));
        let from = entry.edge_point(centre, w, h);
        if pixel_line_intersection(host, panel, hit_box, LineKind::Segment, from, tip) {
            let stem = self.stem();
            return Some(self.base.begin_move(tick, value).with_stem(stem));
        }
        None
    }
}

impl Serializable for Callout {
    fn serialize(&self) -> DrawingDescriptor {
        let mut desc = self.base.descriptor();
        self.base.write_anchors(&mut desc, &[AnchorSlot::P0]);
        desc.bc = Some(self.border_color.clone());
        desc.text = Some(self.text.clone());
        desc.fnt = Some(self.font.clone());
        desc.stem = self.base.durable(AnchorSlot::P1).map(|stem| StemDescriptor {
            d: stem.date_string(),
            tzo: stem.utc_offset_minutes,
            v: stem.value,
        });
        desc
    }

    fn reconstruct(host: &dyn ChartHost, desc: &DrawingDescriptor) -> DrawingResult<Self> {
        let centre = desc.require_anchor(AnchorSlot::P0)?;
        let stem = match &desc.stem {
            Some(stem) => DurableAnchor::from_parts(&stem.d, stem.tzo, stem.v)
                .map_err(|err| DrawingError::descriptor(&desc.name, err.to_string()))?,
            None => centre,
        };
        let mut base = DrawingBase::from_descriptor(DrawingKind::Callout, desc)?;
        base.set_durable(AnchorSlot::P1, Some(stem));
        let border_color = desc.bc.clone().unwrap_or_else(|| base.style.color.clone());
        let mut callout = Self {
            base,
            text: desc.text.clone().unwrap_or_default(),
            font: desc.fnt.clone().unwrap_or_default(),
            border_color,
            size: (2.0 * DEFAULT_HALF_WIDTH, 2.0 * DEFAULT_HALF_HEIGHT),
            stem_entry: None,
            show_handles: true,
        };
        callout.adjust(host);
        Ok(callout)
    }
}

#[cfg(test)]
mod tests {
    use super::{Callout, StemColumn, StemEntry, StemRow, outline_path};
    use crate::core::geometry::HitBox;
    use crate::core::types::{PathSegment, Point};
    use crate::drawing::base::DrawingStyle;
    use crate::drawing::traits::{Anchored, HitTestable, Interactive, Renderable, Serializable};
    use crate::interaction::{AnchorSlot, ClickOutcome, RepositionAction};
    use crate::render::{FontSpec, RecordingContext};
    use crate::test_support::daily_host;

    fn built(host: &crate::core::host::StaticChartHost) -> Callout {
        let mut callout = Callout::new("chart", DrawingStyle::default(), FontSpec::default());
        assert_eq!(callout.click(host, 10, 100.0), ClickOutcome::Continue);
        callout.pointer_move(host, 20, 150.0);
        assert_eq!(callout.click(host, 20, 150.0), ClickOutcome::Complete);
        callout.set_text("Hi\nthere");
        let mut ctx = RecordingContext::new();
        callout.render(&mut ctx, host).expect("render");
        callout
    }

    #[test]
    fn stem_entry_covers_nine_regions() {
        let centre = Point::new(100.0, 100.0);
        let classify = |x, y| StemEntry::classify(Point::new(x, y), centre, 50.0, 10.0);
        assert_eq!(classify(200.0, 100.0), StemEntry { column: StemColumn::Right, row: StemRow::Middle });
        assert_eq!(classify(100.0, 150.0), StemEntry { column: StemColumn::Center, row: StemRow::Bottom });
        assert_eq!(classify(10.0, 50.0), StemEntry { column: StemColumn::Left, row: StemRow::Top });
        assert!(classify(120.0, 95.0).is_inside());
    }

    #[test]
    fn outline_detours_to_the_stem() {
        let centre = Point::new(100.0, 100.0);
        let tip = Point::new(200.0, 100.0);
        let entry = StemEntry::classify(tip, centre, 50.0, 10.0);
        let with_stem = outline_path(centre, 50.0, 10.0, Some((tip, entry)));
        assert!(with_stem.contains(&PathSegment::LineTo(tip)));
        let plain = outline_path(centre, 50.0, 10.0, None);
        assert_eq!(with_stem.len(), plain.len() + 1);
        let corners = plain.iter().filter(|s| matches!(s, PathSegment::QuadTo { .. })).count();
        assert_eq!(corners, 4);
    }

    #[test]
    fn box_is_sized_from_text() {
        let host = daily_host(40);
        let callout = built(&host);
        let (w, h) = callout.size();
        assert!((w - 47.0).abs() < 1e-9);
        assert!((h - 34.0).abs() < 1e-9);
        assert_eq!(
            callout.stem_entry(),
            Some(StemEntry { column: StemColumn::Left, row: StemRow::Bottom })
        );
    }

    #[test]
    fn box_hit_moves_only_the_box() {
        let host = daily_host(40);
        let mut callout = built(&host);
        let hit = callout
            .intersected(&host, 20, 150.0, HitBox::new(19.5, 20.5, 150.5, 149.5))
            .expect("hit");
        assert_eq!(hit.action, RepositionAction::Move);
        assert!(hit.stem.is_none());
        callout.reposition(&host, &hit, 22, 155.0);
        let p0 = callout.base().anchor(AnchorSlot::P0).expect("p0");
        assert_eq!((p0.tick, p0.value), (22, 155.0));
        let stem = callout.stem().expect("stem");
        assert_eq!((stem.tick, stem.value), (10, 100.0));
    }

    #[test]
    fn stem_tip_drags_and_stem_line_moves_both() {
        let host = daily_host(40);
        let mut callout = built(&host);
        let drag = callout
            .intersected(&host, 10, 100.0, HitBox::new(9.5, 10.5, 100.5, 99.5))
            .expect("tip");
        assert_eq!(drag.action, RepositionAction::Drag);
        assert_eq!(drag.point, Some(AnchorSlot::P1));

        let line = callout
            .intersected(&host, 13, 113.0, HitBox::new(12.5, 13.5, 115.0, 111.0))
            .expect("stem line");
        assert_eq!(line.action, RepositionAction::Move);
        assert!(line.stem.is_some());
        callout.reposition(&host, &line, 15, 113.0);
        let stem = callout.stem().expect("stem");
        assert_eq!(stem.tick, 12);
    }

    #[test]
    fn round_trip_keeps_text_and_stem() {
        let host = daily_host(40);
        let callout = built(&host);
        let desc = callout.serialize();
        assert_eq!(desc.text.as_deref(), Some("Hi\nthere"));
        assert!(desc.stem.is_some());
        let restored = Callout::reconstruct(&host, &desc).expect("reconstruct");
        assert_eq!(restored.stem(), callout.stem());
        assert_eq!(restored.base().anchor(AnchorSlot::P0), callout.base().anchor(AnchorSlot::P0));
    }
}
