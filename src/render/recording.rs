use smallvec::SmallVec;
use tracing::trace;

use crate::core::types::PathSegment;
use crate::error::DrawingResult;
use crate::render::context::{ContextState, DrawingContext, Transform};
use crate::render::primitives::{Color, FontSpec, TextAlign, TextBaseline};

/// Approximate glyph advance as a fraction of the font size.
const GLYPH_ADVANCE_RATIO: f64 = 0.6;

/// Stroked or filled path captured with the state in effect when painted.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintedPath {
    pub segments: Vec<PathSegment>,
    pub color: Color,
    pub alpha: f64,
    pub line_width: f64,
    pub dash: SmallVec<[f64; 2]>,
    pub transform: Transform,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaintedText {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub color: Color,
    pub alpha: f64,
    pub font: FontSpec,
    pub align: TextAlign,
    pub baseline: TextBaseline,
    pub transform: Transform,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Stroke(PaintedPath),
    Fill(PaintedPath),
    Text(PaintedText),
}

/// Headless context that records paint operations.
///
/// Paths containing non-finite coordinates are dropped the way a browser
/// canvas ignores them, so drawings never abort a pass over one bad point.
#[derive(Debug, Default)]
pub struct RecordingContext {
    state: ContextState,
    saved: Vec<ContextState>,
    path: Vec<PathSegment>,
    commands: Vec<DrawCommand>,
}

impl RecordingContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Depth of the save stack; zero after balanced save/restore pairs.
    #[must_use]
    pub fn save_depth(&self) -> usize {
        self.saved.len()
    }

    pub fn strokes(&self) -> impl Iterator<Item = &PaintedPath> {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Stroke(path) => Some(path),
            _ => None,
        })
    }

    pub fn fills(&self) -> impl Iterator<Item = &PaintedPath> {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Fill(path) => Some(path),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &PaintedText> {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Text(text) => Some(text),
            _ => None,
        })
    }

    fn painted(&self, color: Color) -> Option<PaintedPath> {
        if self.path.is_empty() || !self.path.iter().all(segment_is_finite) {
            trace!(segments = self.path.len(), "skip empty or non-finite path");
            return None;
        }
        Some(PaintedPath {
            segments: self.path.clone(),
            color,
            alpha: self.state.global_alpha,
            line_width: self.state.line_width,
            dash: self.state.line_dash.clone(),
            transform: self.state.transform,
        })
    }
}

fn segment_is_finite(segment: &PathSegment) -> bool {
    match *segment {
        PathSegment::MoveTo(p) | PathSegment::LineTo(p) => p.is_finite(),
        PathSegment::QuadTo { control, to } => control.is_finite() && to.is_finite(),
        PathSegment::CubicTo {
            control1,
            control2,
            to,
        } => control1.is_finite() && control2.is_finite() && to.is_finite(),
        PathSegment::Arc {
            center,
            radius,
            start,
            end,
            ..
        } => center.is_finite() && radius.is_finite() && start.is_finite() && end.is_finite(),
        PathSegment::Close => true,
    }
}

impl DrawingContext for RecordingContext {
    fn state(&self) -> &ContextState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ContextState {
        &mut self.state
    }

    fn save(&mut self) {
        self.saved.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(state) = self.saved.pop() {
            self.state = state;
        }
    }

    fn begin_path(&mut self) {
        self.path.clear();
    }

    fn push_segment(&mut self, segment: PathSegment) {
        self.path.push(segment);
    }

    fn stroke(&mut self) -> DrawingResult<()> {
        if let Some(path) = self.painted(self.state.stroke_color) {
            self.commands.push(DrawCommand::Stroke(path));
        }
        Ok(())
    }

    fn fill(&mut self) -> DrawingResult<()> {
        if let Some(path) = self.painted(self.state.fill_color) {
            self.commands.push(DrawCommand::Fill(path));
        }
        Ok(())
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> DrawingResult<()> {
        if text.is_empty() || !x.is_finite() || !y.is_finite() {
            return Ok(());
        }
        self.commands.push(DrawCommand::Text(PaintedText {
            text: text.to_owned(),
            x,
            y,
            color: self.state.fill_color,
            alpha: self.state.global_alpha,
            font: self.state.font.clone(),
            align: self.state.text_align,
            baseline: self.state.text_baseline,
            transform: self.state.transform,
        }));
        Ok(())
    }

    fn measure_text(&mut self, text: &str) -> f64 {
        text.chars().count() as f64 * self.state.font.size_px * GLYPH_ADVANCE_RATIO
    }
}

#[cfg(test)]
mod tests {
    use super::{DrawCommand, RecordingContext};
    use crate::render::context::DrawingContext;
    use crate::render::primitives::Color;

    #[test]
    fn records_stroke_with_state() {
        let mut ctx = RecordingContext::new();
        ctx.save();
        ctx.set_stroke_color(Color::rgb(1.0, 0.0, 0.0));
        ctx.set_line_width(2.0);
        ctx.begin_path();
        ctx.move_to(0.0, 0.0);
        ctx.line_to(10.0, 10.0);
        ctx.stroke().expect("stroke");
        ctx.restore();

        assert_eq!(ctx.save_depth(), 0);
        let stroke = ctx.strokes().next().expect("one stroke");
        assert_eq!(stroke.color, Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(stroke.line_width, 2.0);
        assert_eq!(ctx.state().line_width, 1.0);
    }

    #[test]
    fn non_finite_paths_are_dropped() {
        let mut ctx = RecordingContext::new();
        ctx.begin_path();
        ctx.move_to(f64::NAN, 0.0);
        ctx.line_to(1.0, 1.0);
        ctx.stroke().expect("stroke");
        assert!(ctx.is_empty());
    }

    #[test]
    fn unbalanced_restore_is_ignored() {
        let mut ctx = RecordingContext::new();
        ctx.restore();
        ctx.fill_text("x", 1.0, 2.0).expect("text");
        assert!(matches!(ctx.commands(), [DrawCommand::Text(_)]));
    }
}
