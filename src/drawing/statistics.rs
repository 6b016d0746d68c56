//! Drawings computed from the closes between their two anchors: the
//! least-squares regression line and the average with deviation bands.
//!
//! Both snap their anchors onto the computed line whenever they are not
//! highlighted, so dragging an anchor only changes the tick range.

use tracing::trace;

use crate::core::geometry::{HitBox, LineKind, line_intersection};
use crate::core::host::ChartHost;
use crate::core::pane::Panel;
use crate::core::primitives::format_fixed;
use crate::core::types::{Anchor, Point};
use crate::drawing::base::{DrawingBase, DrawingStyle};
use crate::drawing::descriptor::DrawingDescriptor;
use crate::drawing::kind::DrawingKind;
use crate::drawing::params::DeviationBand;
use crate::drawing::traits::{HitTestable, Renderable, Serializable};
use crate::drawing::two_point;
use crate::error::DrawingResult;
use crate::interaction::{AnchorSlot, Repositioner};
use crate::render::plot::{LineStyle, axis_label, plot_line};
use crate::render::{Color, DrawingContext, LinePattern, TextAlign, TextBaseline};

const REGRESSION_TAIL: f64 = 20.0;
const AVERAGE_TAIL: f64 = 20.0;
const BAND_TAIL: f64 = 10.0;
const LABEL_GAP: f64 = 5.0;

/// Closed-form least-squares fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionFit {
    pub slope: f64,
    pub intercept: f64,
}

/// Fits `prices` against weights `1..=n`. Needs at least two prices.
#[must_use]
pub fn regression_fit(prices: &[f64]) -> Option<RegressionFit> {
    if prices.len() < 2 {
        return None;
    }
    let n = prices.len() as f64;
    let (sum_prices, sum_weighted) = prices
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sum, weighted), (i, &price)| {
            (sum + price, weighted + (i + 1) as f64 * price)
        });
    let sum_weights = n * (n + 1.0) / 2.0;
    let sum_squared_weights = sum_weights * (2.0 * n + 1.0) / 3.0;
    let slope = (n * sum_weighted - sum_weights * sum_prices) / (n * sum_squared_weights - sum_weights * sum_weights);
    Some(RegressionFit {
        slope,
        intercept: (sum_prices - slope * sum_weights) / n,
    })
}

/// Mean and population standard deviation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AverageStats {
    pub mean: f64,
    pub deviation: f64,
}

#[must_use]
pub fn average_stats(prices: &[f64]) -> Option<AverageStats> {
    if prices.is_empty() {
        return None;
    }
    let n = prices.len() as f64;
    let mean = prices.iter().sum::<f64>() / n;
    let variance = prices.iter().map(|price| (price - mean).powi(2)).sum::<f64>() / n;
    Some(AverageStats {
        mean,
        deviation: variance.sqrt(),
    })
}

/// Finite closes from the earlier to the later tick, inclusive.
#[must_use]
pub fn closes_between(host: &dyn ChartHost, t0: i64, t1: i64) -> Vec<f64> {
    let last = host.data_set().len() as i64 - 1;
    (t0.min(t1).max(0)..=t0.max(t1).min(last))
        .filter_map(|tick| host.close_at(tick))
        .collect()
}

/// Regression values at the two anchors' ticks, in anchor order.
#[must_use]
pub fn regression_endpoints(host: &dyn ChartHost, p0: Anchor, p1: Anchor) -> Option<(f64, f64)> {
    let fit = regression_fit(&closes_between(host, p0.tick, p1.tick))?;
    let raw_ticks = (p1.tick - p0.tick).abs() + 1;
    let start = fit.intercept;
    let end = fit.slope * raw_ticks as f64 + fit.intercept;
    Some(if p0.tick <= p1.tick { (start, end) } else { (end, start) })
}

/// Whether both ticks sit on one side outside the panel.
fn off_panel(panel: &Panel, x0: f64, x1: f64) -> bool {
    (x0 < panel.left() && x1 < panel.left()) || (x0 > panel.right() && x1 > panel.right())
}

/// Horizontal segment with short vertical tails at both ends.
fn tailed_segment(
    ctx: &mut dyn DrawingContext,
    panel: &Panel,
    (a, b): (Point, Point),
    tail: f64,
    color: Color,
    style: LineStyle,
) -> DrawingResult<()> {
    plot_line(ctx, panel, a, b, color, LineKind::Segment, style)?;
    for end in [a, b] {
        plot_line(
            ctx,
            panel,
            Point::new(end.x, end.y - tail),
            Point::new(end.x, end.y + tail),
            color,
            LineKind::Segment,
            style,
        )?;
    }
    Ok(())
}

/// Linear regression of the closes between the anchors.
#[derive(Debug, Clone, PartialEq)]
pub struct Regression {
    base: DrawingBase,
}

impl Regression {
    #[must_use]
    pub fn new(panel_name: impl Into<String>, style: DrawingStyle) -> Self {
        Self {
            base: DrawingBase::new(DrawingKind::Regression, panel_name, style),
        }
    }

    #[must_use]
    pub fn fit(&self, host: &dyn ChartHost) -> Option<RegressionFit> {
        let (p0, p1) = self.base.pair()?;
        regression_fit(&closes_between(host, p0.tick, p1.tick))
    }
}

impl_anchored!(Regression);
two_point_interactive!(Regression);

impl Renderable for Regression {
    fn render(&mut self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> DrawingResult<()> {
        let (Some(panel), Some((p0, p1))) = (self.base.panel(host), self.base.pair()) else {
            return Ok(());
        };
        if p0.tick < 0 || p1.tick < 0 {
            return Ok(());
        }
        let x0 = host.pixel_from_tick(p0.tick_f64());
        let x1 = host.pixel_from_tick(p1.tick_f64());
        if off_panel(panel, x0, x1) {
            return Ok(());
        }
        let Some((v0, v1)) = regression_endpoints(host, p0, p1) else {
            trace!(kind = %self.base.kind(), "fewer than two closes in range");
            return Ok(());
        };
        let a = Point::new(x0, host.pixel_from_value(panel, p0.tick_f64(), v0));
        let b = Point::new(x1, host.pixel_from_value(panel, p1.tick_f64(), v1));
        let color = self.base.line_color(host);
        tailed_segment(ctx, panel, (a, b), REGRESSION_TAIL, color, self.base.line_style())?;

        if self.base.highlighted.is_active() {
            self.base
                .render_handles(ctx, host, &[(AnchorSlot::P0, a), (AnchorSlot::P1, b)])
        } else {
            self.base.set_point(host, AnchorSlot::P0, p0.tick, v0);
            self.base.set_point(host, AnchorSlot::P1, p1.tick, v1);
            Ok(())
        }
    }
}

impl HitTestable for Regression {
    fn intersected(
        &mut self,
        host: &dyn ChartHost,
        tick: i64,
        value: f64,
        hit_box: HitBox,
    ) -> Option<Repositioner> {
        two_point::intersected(&mut self.base, host, tick, value, hit_box, LineKind::Segment)
    }
}

impl Serializable for Regression {
    fn serialize(&self) -> DrawingDescriptor {
        two_point::serialize(&self.base)
    }

    fn reconstruct(host: &dyn ChartHost, desc: &DrawingDescriptor) -> DrawingResult<Self> {
        Ok(Self {
            base: two_point::reconstruct(DrawingKind::Regression, host, desc)?,
        })
    }
}

/// Average of the closes between the anchors with up to three symmetric
/// standard deviation bands.
#[derive(Debug, Clone, PartialEq)]
pub struct Average {
    base: DrawingBase,
    bands: [DeviationBand; 3],
    axis_label: bool,
    /// Band values from the last render, used for hit testing.
    band_values: Vec<f64>,
}

impl Average {
    #[must_use]
    pub fn new(panel_name: impl Into<String>, style: DrawingStyle, bands: [DeviationBand; 3], axis_label: bool) -> Self {
        Self {
            base: DrawingBase::new(DrawingKind::Average, panel_name, style),
            bands,
            axis_label,
            band_values: Vec::new(),
        }
    }

    #[must_use]
    pub fn bands(&self) -> &[DeviationBand; 3] {
        &self.bands
    }

    #[must_use]
    pub fn axis_label(&self) -> bool {
        self.axis_label
    }

    #[must_use]
    pub fn stats(&self, host: &dyn ChartHost) -> Option<AverageStats> {
        let (p0, p1) = self.base.pair()?;
        average_stats(&closes_between(host, p0.tick, p1.tick))
    }

    /// Active band values as `(label, value, band)`, above then below the
    /// mean for each multiple.
    #[must_use]
    pub fn band_levels(&self, stats: AverageStats) -> Vec<(String, f64, &DeviationBand)> {
        self.bands
            .iter()
            .enumerate()
            .filter(|(_, band)| band.active)
            .flat_map(|(i, band)| {
                let multiple = (i + 1) as f64;
                let label = format!("{}\u{3c3}", i + 1);
                [
                    (label.clone(), stats.mean + multiple * stats.deviation, band),
                    (label, stats.mean - multiple * stats.deviation, band),
                ]
            })
            .collect()
    }

    fn paint_level(
        &self,
        ctx: &mut dyn DrawingContext,
        host: &dyn ChartHost,
        panel: &Panel,
        (x0, x1): (f64, f64),
        (label, value, y): (&str, f64, f64),
        (tail, color, style): (f64, Color, LineStyle),
    ) -> DrawingResult<()> {
        tailed_segment(ctx, panel, (Point::new(x0, y), Point::new(x1, y)), tail, color, style)?;
        if !label.is_empty() {
            ctx.save();
            ctx.set_font(&host.theme().font);
            ctx.set_fill_color(color);
            ctx.set_text_align(TextAlign::Left);
            ctx.set_text_baseline(TextBaseline::Middle);
            let result = ctx.fill_text(label, x0.max(x1) + LABEL_GAP, y);
            ctx.restore();
            result?;
        }
        let on_panel = (panel.left()..=panel.right()).contains(&x0) || (panel.left()..=panel.right()).contains(&x1);
        if self.axis_label && !self.base.highlighted.is_active() && !self.base.pen_down && on_panel {
            axis_label(ctx, panel, host.theme(), &format_fixed(value, 2), y, color)?;
        }
        Ok(())
    }
}

impl_anchored!(Average);
two_point_interactive!(Average);

impl Renderable for Average {
    fn render(&mut self, ctx: &mut dyn DrawingContext, host: &dyn ChartHost) -> DrawingResult<()> {
        let (Some(panel), Some((p0, p1))) = (self.base.panel(host), self.base.pair()) else {
            return Ok(());
        };
        if p0.tick < 0 || p1.tick < 0 {
            return Ok(());
        }
        let x0 = host.pixel_from_tick(p0.tick_f64());
        let x1 = host.pixel_from_tick(p1.tick_f64());
        if off_panel(panel, x0, x1) {
            return Ok(());
        }
        let Some(stats) = self.stats(host) else {
            trace!(kind = %self.base.kind(), "no closes in range");
            return Ok(());
        };

        let levels: Vec<(String, f64, Color, LineStyle)> = self
            .band_levels(stats)
            .into_iter()
            .map(|(label, value, band)| {
                let color = self.base.line_color_for(host, &band.color);
                (label, value, color, LineStyle::new(band.pattern, band.line_width))
            })
            .collect();
        let y_of = |value: f64| host.pixel_from_value(panel, p0.tick_f64(), value);
        for (label, value, color, style) in &levels {
            self.paint_level(ctx, host, panel, (x0, x1), (label.as_str(), *value, y_of(*value)), (BAND_TAIL, *color, *style))?;
        }
        let color = self.base.line_color(host);
        let style = self.base.line_style();
        let y = y_of(stats.mean);
        self.paint_level(ctx, host, panel, (x0, x1), ("", stats.mean, y), (AVERAGE_TAIL, color, style))?;
        self.band_values = levels.into_iter().map(|(_, value, _, _)| value).collect();

        if self.base.highlighted.is_active() {
            self.base.render_handles(
                ctx,
                host,
                &[(AnchorSlot::P0, Point::new(x0, y)), (AnchorSlot::P1, Point::new(x1, y))],
            )
        } else {
            self.base.set_point(host, AnchorSlot::P0, p0.tick, stats.mean);
            self.base.set_point(host, AnchorSlot::P1, p1.tick, stats.mean);
            Ok(())
        }
    }
}

impl HitTestable for Average {
    fn intersected(
        &mut self,
        host: &dyn ChartHost,
        tick: i64,
        value: f64,
        hit_box: HitBox,
    ) -> Option<Repositioner> {
        if let Some(hit) = two_point::intersected(&mut self.base, host, tick, value, hit_box, LineKind::Segment) {
            return Some(hit);
        }
        let panel = self.base.panel(host)?;
        let (p0, p1) = self.base.pair()?;
        let on_band = self.band_values.iter().any(|&level| {
            line_intersection(
                host,
                panel,
                hit_box,
                LineKind::Segment,
                (p0.tick_f64(), level),
                (p1.tick_f64(), level),
            )
        });
        on_band.then(|| self.base.begin_move(tick, value))
    }
}

impl Serializable for Average {
    fn serialize(&self) -> DrawingDescriptor {
        let mut desc = two_point::serialize(&self.base);
        let [b1, b2, b3] = &self.bands;
        desc.dev1 = Some(b1.active);
        desc.dev2 = Some(b2.active);
        desc.dev3 = Some(b3.active);
        desc.col1 = Some(b1.color.clone());
        desc.col2 = Some(b2.color.clone());
        desc.col3 = Some(b3.color.clone());
        desc.ptrn1 = Some(b1.pattern);
        desc.ptrn2 = Some(b2.pattern);
        desc.ptrn3 = Some(b3.pattern);
        desc.lw1 = Some(b1.line_width);
        desc.lw2 = Some(b2.line_width);
        desc.lw3 = Some(b3.line_width);
        desc.al = Some(self.axis_label);
        desc
    }

    fn reconstruct(host: &dyn ChartHost, desc: &DrawingDescriptor) -> DrawingResult<Self> {
        let band = |active: Option<bool>, color: &Option<String>, pattern: Option<LinePattern>, line_width: Option<f64>| {
            let mut band = DeviationBand::new(active.unwrap_or(false));
            if let Some(color) = color {
                band.color.clone_from(color);
            }
            band.pattern = pattern.unwrap_or(band.pattern);
            band.line_width = line_width.unwrap_or(band.line_width);
            band
        };
        Ok(Self {
            base: two_point::reconstruct(DrawingKind::Average, host, desc)?,
            bands: [
                band(desc.dev1, &desc.col1, desc.ptrn1, desc.lw1),
                band(desc.dev2, &desc.col2, desc.ptrn2, desc.lw2),
                band(desc.dev3, &desc.col3, desc.ptrn3, desc.lw3),
            ],
            axis_label: desc.al.unwrap_or(false),
            band_values: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::{Average, Regression, average_stats, regression_fit};
    use crate::core::geometry::HitBox;
    use crate::core::types::Anchor;
    use crate::drawing::base::DrawingStyle;
    use crate::drawing::params::DeviationBand;
    use crate::drawing::traits::{Anchored, HitTestable, Interactive, Renderable, Serializable};
    use crate::interaction::{AnchorSlot, ClickOutcome};
    use crate::render::RecordingContext;
    use crate::test_support::{daily_host, host_with_closes, stroked_points};

    #[test]
    fn fit_of_unit_steps_has_unit_slope() {
        let prices: Vec<f64> = (0..10).map(|i| 100.0 + f64::from(i)).collect();
        let fit = regression_fit(&prices).expect("fit");
        assert_relative_eq!(fit.slope, 1.0, epsilon = 1e-9);
        assert_relative_eq!(fit.intercept, 99.0, epsilon = 1e-9);
        assert!(regression_fit(&[5.0]).is_none());
    }

    #[test]
    fn stats_use_population_deviation() {
        let stats = average_stats(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).expect("stats");
        assert_relative_eq!(stats.mean, 5.0);
        assert_relative_eq!(stats.deviation, 2.0);
        assert!(average_stats(&[]).is_none());
    }

    #[test]
    fn regression_snaps_anchors_onto_the_line() {
        let host = daily_host(40);
        let mut regression = Regression::new("chart", DrawingStyle::default());
        regression.click(&host, 0, 150.0);
        assert_eq!(regression.click(&host, 9, 20.0), ClickOutcome::Complete);
        let mut ctx = RecordingContext::new();
        regression.render(&mut ctx, &host).expect("render");
        assert_eq!(stroked_points(&ctx).len(), 3);
        let p0 = regression.base().anchor(AnchorSlot::P0).expect("p0");
        let p1 = regression.base().anchor(AnchorSlot::P1).expect("p1");
        assert_relative_eq!(p0.value, 99.0, epsilon = 1e-9);
        assert_relative_eq!(p1.value, 109.0, epsilon = 1e-9);
    }

    #[test]
    fn regression_ignores_clicks_before_the_data() {
        let host = daily_host(40);
        let mut regression = Regression::new("chart", DrawingStyle::default());
        assert_eq!(regression.click(&host, -2, 100.0), ClickOutcome::Continue);
        assert!(regression.base().anchor(AnchorSlot::P0).is_none());
    }

    #[test]
    fn average_bands_sit_one_deviation_from_the_mean() {
        let host = host_with_closes(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let bands = [DeviationBand::new(true), DeviationBand::new(false), DeviationBand::new(false)];
        let mut average = Average::new("chart", DrawingStyle::default(), bands, false);
        average.click(&host, 0, 50.0);
        average.click(&host, 7, 50.0);
        let mut ctx = RecordingContext::new();
        average.render(&mut ctx, &host).expect("render");

        let horizontal_ys: Vec<f64> = stroked_points(&ctx)
            .into_iter()
            .filter(|line| line.len() == 2 && (line[0].y - line[1].y).abs() < 1e-9)
            .map(|line| line[0].y)
            .collect();
        assert_eq!(horizontal_ys.len(), 3);
        assert_relative_eq!(horizontal_ys[0], 200.0 - 7.0, epsilon = 1e-9);
        assert_relative_eq!(horizontal_ys[1], 200.0 - 3.0, epsilon = 1e-9);
        assert_relative_eq!(horizontal_ys[2], 200.0 - 5.0, epsilon = 1e-9);
        assert_eq!(ctx.texts().count(), 2);
        assert_eq!(average.base().anchor(AnchorSlot::P0), Some(Anchor::new(0, 5.0)));
    }

    #[test]
    fn band_flags_do_not_change_the_statistics() {
        let host = daily_host(20);
        let mut all = Average::new("chart", DrawingStyle::default(), std::array::from_fn(|_| DeviationBand::new(true)), true);
        let mut none = Average::new("chart", DrawingStyle::default(), std::array::from_fn(|_| DeviationBand::new(false)), true);
        for drawing in [&mut all, &mut none] {
            drawing.click(&host, 2, 100.0);
            drawing.click(&host, 12, 100.0);
        }
        assert_eq!(all.stats(&host), none.stats(&host));
        let stats = all.stats(&host).expect("stats");
        assert_eq!(all.band_levels(stats).len(), 6);
        assert!(none.band_levels(stats).is_empty());
    }

    #[test]
    fn band_lines_move_the_drawing() {
        let host = host_with_closes(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let bands = [DeviationBand::new(true), DeviationBand::new(false), DeviationBand::new(false)];
        let mut average = Average::new("chart", DrawingStyle::default(), bands, false);
        average.click(&host, 0, 50.0);
        average.click(&host, 7, 50.0);
        average.render(&mut RecordingContext::new(), &host).expect("render");
        let hit = average.intersected(&host, 4, 7.0, HitBox::new(3.5, 4.5, 8.0, 6.0));
        assert!(hit.is_some());
        assert!(average.intersected(&host, 4, 60.0, HitBox::new(3.5, 4.5, 61.0, 59.0)).is_none());
    }

    #[test]
    fn average_round_trips_band_settings() {
        let host = daily_host(20);
        let mut band = DeviationBand::new(true);
        band.color = "#ff0000".to_owned();
        band.line_width = 2.0;
        let bands = [band, DeviationBand::new(false), DeviationBand::new(true)];
        let mut average = Average::new("chart", DrawingStyle::default(), bands, true);
        average.click(&host, 2, 100.0);
        average.click(&host, 12, 100.0);
        let restored = Average::reconstruct(&host, &average.serialize()).expect("reconstruct");
        assert_eq!(restored.bands(), average.bands());
        assert!(restored.axis_label());
    }
}
