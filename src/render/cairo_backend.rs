use cairo::{Context, Format, ImageSurface};
use pango::FontDescription;

use crate::core::types::PathSegment;
use crate::error::{DrawingError, DrawingResult};
use crate::render::context::{ContextState, DrawingContext, Transform};
use crate::render::primitives::{Color, TextAlign, TextBaseline};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CairoPaintStats {
    pub strokes: usize,
    pub fills: usize,
    pub texts: usize,
}

/// Cairo + Pango + PangoCairo drawing context.
///
/// Wraps either an external Cairo context (for example a GTK `DrawingArea`
/// callback) or an offscreen image surface created by [`Self::offscreen`].
#[derive(Debug)]
pub struct CairoDrawingContext {
    context: Context,
    state: ContextState,
    saved: Vec<ContextState>,
    stats: CairoPaintStats,
}

impl CairoDrawingContext {
    #[must_use]
    pub fn new(context: Context) -> Self {
        Self {
            context,
            state: ContextState::default(),
            saved: Vec::new(),
            stats: CairoPaintStats::default(),
        }
    }

    pub fn offscreen(width: i32, height: i32) -> DrawingResult<Self> {
        if width <= 0 || height <= 0 {
            return Err(DrawingError::InvalidData(
                "cairo surface size must be > 0".to_owned(),
            ));
        }
        let surface = ImageSurface::create(Format::ARgb32, width, height)
            .map_err(|err| map_backend_error("failed to create cairo surface", err))?;
        let context = Context::new(&surface)
            .map_err(|err| map_backend_error("failed to create cairo context", err))?;
        Ok(Self::new(context))
    }

    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        "cairo+pango+pangocairo"
    }

    #[must_use]
    pub fn cairo(&self) -> &Context {
        &self.context
    }

    #[must_use]
    pub fn stats(&self) -> CairoPaintStats {
        self.stats
    }

    pub fn clear(&mut self, color: Color) -> DrawingResult<()> {
        color.validate()?;
        self.context.save().map_err(|err| map_backend_error("failed to save state", err))?;
        self.context.identity_matrix();
        apply_color(&self.context, color, 1.0);
        self.context
            .paint()
            .map_err(|err| map_backend_error("failed to clear surface", err))?;
        self.context
            .restore()
            .map_err(|err| map_backend_error("failed to restore state", err))
    }

    fn apply_stroke_state(&self) {
        apply_color(&self.context, self.state.stroke_color, self.state.global_alpha);
        self.context.set_line_width(self.state.line_width);
        self.context.set_dash(&self.state.line_dash, 0.0);
    }

    fn create_layout(&self, text: &str) -> pango::Layout {
        let layout = pangocairo::functions::create_layout(&self.context);
        let mut description = FontDescription::new();
        description.set_family(&self.state.font.family);
        description.set_absolute_size(self.state.font.size_px * f64::from(pango::SCALE));
        if self.state.font.bold {
            description.set_weight(pango::Weight::Bold);
        }
        if self.state.font.italic {
            description.set_style(pango::Style::Italic);
        }
        layout.set_font_description(Some(&description));
        layout.set_text(text);
        layout
    }
}

impl DrawingContext for CairoDrawingContext {
    fn state(&self) -> &ContextState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ContextState {
        &mut self.state
    }

    fn save(&mut self) {
        self.saved.push(self.state.clone());
        let _ = self.context.save();
    }

    fn restore(&mut self) {
        if let Some(state) = self.saved.pop() {
            self.state = state;
            let _ = self.context.restore();
        }
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.state.transform = self.state.transform.then(Transform::translation(dx, dy));
        self.context.translate(dx, dy);
    }

    fn rotate(&mut self, angle: f64) {
        self.state.transform = self.state.transform.then(Transform::rotation(angle));
        self.context.rotate(angle);
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.state.transform = self.state.transform.then(Transform::scaling(sx, sy));
        self.context.scale(sx, sy);
    }

    fn begin_path(&mut self) {
        self.context.new_path();
    }

    fn push_segment(&mut self, segment: PathSegment) {
        match segment {
            PathSegment::MoveTo(p) => self.context.move_to(p.x, p.y),
            PathSegment::LineTo(p) => self.context.line_to(p.x, p.y),
            PathSegment::QuadTo { control, to } => {
                let (x0, y0) = self.context.current_point().unwrap_or((control.x, control.y));
                self.context.curve_to(
                    x0 + 2.0 / 3.0 * (control.x - x0),
                    y0 + 2.0 / 3.0 * (control.y - y0),
                    to.x + 2.0 / 3.0 * (control.x - to.x),
                    to.y + 2.0 / 3.0 * (control.y - to.y),
                    to.x,
                    to.y,
                );
            }
            PathSegment::CubicTo {
                control1,
                control2,
                to,
            } => self
                .context
                .curve_to(control1.x, control1.y, control2.x, control2.y, to.x, to.y),
            PathSegment::Arc {
                center,
                radius,
                start,
                end,
                anticlockwise,
            } => {
                if anticlockwise {
                    self.context.arc_negative(center.x, center.y, radius, start, end);
                } else {
                    self.context.arc(center.x, center.y, radius, start, end);
                }
            }
            PathSegment::Close => self.context.close_path(),
        }
    }

    fn stroke(&mut self) -> DrawingResult<()> {
        self.apply_stroke_state();
        self.context
            .stroke_preserve()
            .map_err(|err| map_backend_error("failed to stroke path", err))?;
        self.stats.strokes += 1;
        Ok(())
    }

    fn fill(&mut self) -> DrawingResult<()> {
        apply_color(&self.context, self.state.fill_color, self.state.global_alpha);
        self.context
            .fill_preserve()
            .map_err(|err| map_backend_error("failed to fill path", err))?;
        self.stats.fills += 1;
        Ok(())
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> DrawingResult<()> {
        if text.is_empty() {
            return Ok(());
        }
        let layout = self.create_layout(text);
        let (width, height) = layout.pixel_size();
        let (width, height) = (f64::from(width), f64::from(height));
        let left = match self.state.text_align {
            TextAlign::Left => x,
            TextAlign::Center => x - width / 2.0,
            TextAlign::Right => x - width,
        };
        let top = match self.state.text_baseline {
            TextBaseline::Top => y,
            TextBaseline::Middle => y - height / 2.0,
            TextBaseline::Alphabetic => y - f64::from(layout.baseline()) / f64::from(pango::SCALE),
            TextBaseline::Bottom => y - height,
        };
        apply_color(&self.context, self.state.fill_color, self.state.global_alpha);
        self.context.move_to(left, top);
        pangocairo::functions::show_layout(&self.context, &layout);
        self.context.new_path();
        self.stats.texts += 1;
        Ok(())
    }

    fn measure_text(&mut self, text: &str) -> f64 {
        let (width, _height) = self.create_layout(text).pixel_size();
        f64::from(width)
    }
}

fn apply_color(context: &Context, color: Color, global_alpha: f64) {
    context.set_source_rgba(color.red, color.green, color.blue, color.alpha * global_alpha);
}

fn map_backend_error(prefix: &str, err: cairo::Error) -> DrawingError {
    DrawingError::InvalidData(format!("{prefix}: {err}"))
}
