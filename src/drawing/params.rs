use serde::{Deserialize, Serialize};

use crate::render::{FontSpec, LinePattern};

/// Stroke parameters of a single fibonacci level, trend or time-zone line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineParameters {
    #[serde(default)]
    pub pattern: LinePattern,
    #[serde(default = "default_line_opacity")]
    pub opacity: f64,
    #[serde(default = "default_line_width")]
    pub line_width: f64,
}

fn default_line_opacity() -> f64 {
    0.25
}

fn default_line_width() -> f64 {
    1.0
}

impl Default for LineParameters {
    fn default() -> Self {
        Self {
            pattern: LinePattern::Solid,
            opacity: default_line_opacity(),
            line_width: default_line_width(),
        }
    }
}

/// One retracement or projection level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibLevel {
    pub level: f64,
    #[serde(default)]
    pub display: bool,
    #[serde(default = "default_auto_color")]
    pub color: String,
    #[serde(default)]
    pub parameters: LineParameters,
}

impl FibLevel {
    #[must_use]
    pub fn new(level: f64, display: bool) -> Self {
        Self {
            level,
            display,
            color: default_auto_color(),
            parameters: LineParameters::default(),
        }
    }

    /// Label text, e.g. `61.8%`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}%", crate::core::primitives::format_trimmed(self.level * 100.0, 1))
    }
}

/// Color plus stroke parameters of an auxiliary fibonacci line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibLine {
    #[serde(default = "default_auto_color")]
    pub color: String,
    #[serde(default)]
    pub parameters: LineParameters,
}

impl Default for FibLine {
    fn default() -> Self {
        Self {
            color: default_auto_color(),
            parameters: LineParameters::default(),
        }
    }
}

fn default_auto_color() -> String {
    "auto".to_owned()
}

/// Settings shared by the fibonacci family. Persisted verbatim under the
/// descriptor's `parameters` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FibParameters {
    #[serde(default = "default_fibs")]
    pub fibs: Vec<FibLevel>,
    #[serde(default)]
    pub trend: FibLine,
    #[serde(default)]
    pub extend_left: bool,
    #[serde(default = "default_true")]
    pub print_levels: bool,
    #[serde(default)]
    pub print_values: bool,
    #[serde(default)]
    pub timezone: FibLine,
}

fn default_true() -> bool {
    true
}

fn default_fibs() -> Vec<FibLevel> {
    [
        (-0.618, false),
        (-0.382, false),
        (0.0, true),
        (0.382, true),
        (0.5, true),
        (0.618, true),
        (0.786, false),
        (1.0, true),
        (1.382, false),
        (1.618, false),
        (2.618, false),
        (4.236, false),
    ]
    .into_iter()
    .map(|(level, display)| FibLevel::new(level, display))
    .collect()
}

impl Default for FibParameters {
    fn default() -> Self {
        Self {
            fibs: default_fibs(),
            trend: FibLine::default(),
            extend_left: false,
            print_levels: true,
            print_values: false,
            timezone: FibLine::default(),
        }
    }
}

impl FibParameters {
    /// Copy of these parameters showing exactly `levels`. Levels missing from
    /// the table are inserted in order.
    #[must_use]
    pub fn with_recommended(&self, levels: &[f64]) -> Self {
        let mut out = self.clone();
        for &level in levels {
            if !out.fibs.iter().any(|fib| same_level(fib.level, level)) {
                out.fibs.push(FibLevel::new(level, true));
            }
        }
        out.fibs.sort_by(|a, b| a.level.total_cmp(&b.level));
        for fib in &mut out.fibs {
            fib.display = levels.iter().any(|&level| same_level(fib.level, level));
        }
        out
    }

    /// Levels currently displayed.
    pub fn displayed(&self) -> impl Iterator<Item = &FibLevel> {
        self.fibs.iter().filter(|fib| fib.display)
    }
}

fn same_level(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// Style of one standard-deviation band of the average tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviationBand {
    #[serde(default)]
    pub active: bool,
    #[serde(default = "default_auto_color")]
    pub color: String,
    #[serde(default = "default_line_width")]
    pub line_width: f64,
    #[serde(default = "default_band_pattern")]
    pub pattern: LinePattern,
}

fn default_band_pattern() -> LinePattern {
    LinePattern::Dashed
}

impl DeviationBand {
    #[must_use]
    pub fn new(active: bool) -> Self {
        Self {
            active,
            color: default_auto_color(),
            line_width: default_line_width(),
            pattern: default_band_pattern(),
        }
    }
}

fn default_deviations() -> [DeviationBand; 3] {
    [
        DeviationBand::new(true),
        DeviationBand::new(true),
        DeviationBand::new(false),
    ]
}

/// Tool-bar style state captured once when a drawing is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorParameters {
    #[serde(default = "default_auto_color")]
    pub current_color: String,
    #[serde(default = "default_fill_color")]
    pub fill_color: String,
    #[serde(default = "default_line_width")]
    pub line_width: f64,
    #[serde(default)]
    pub pattern: LinePattern,
    #[serde(default)]
    pub font: FontSpec,
    #[serde(default = "default_true")]
    pub axis_label: bool,
    #[serde(default = "default_deviations")]
    pub deviations: [DeviationBand; 3],
    #[serde(default)]
    pub fibonacci: FibParameters,
    #[serde(default = "default_spline_tension")]
    pub spline_tension: f64,
    /// Speed lines also draw the 3/2 and 3 levels.
    #[serde(default)]
    pub speedline_extension: bool,
    /// Speed lines stop at the anchor box instead of the panel edge.
    #[serde(default)]
    pub speedline_confine_to_grid: bool,
}

fn default_fill_color() -> String {
    "#7da6f5".to_owned()
}

fn default_spline_tension() -> f64 {
    0.3
}

impl Default for VectorParameters {
    fn default() -> Self {
        Self {
            current_color: default_auto_color(),
            fill_color: default_fill_color(),
            line_width: default_line_width(),
            pattern: LinePattern::Solid,
            font: FontSpec::default(),
            axis_label: true,
            deviations: default_deviations(),
            fibonacci: FibParameters::default(),
            spline_tension: default_spline_tension(),
            speedline_extension: false,
            speedline_confine_to_grid: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FibParameters, VectorParameters};

    #[test]
    fn recommended_levels_drive_display_flags() {
        let fib = FibParameters::default().with_recommended(&[0.382, 0.5, 0.618, 1.0]);
        let shown: Vec<f64> = fib.displayed().map(|level| level.level).collect();
        assert_eq!(shown, vec![0.382, 0.5, 0.618, 1.0]);
    }

    #[test]
    fn recommended_levels_insert_missing_entries() {
        let fib = FibParameters::default().with_recommended(&[1.272]);
        assert!(fib.fibs.iter().any(|level| level.level == 1.272 && level.display));
        assert!(fib.fibs.windows(2).all(|pair| pair[0].level <= pair[1].level));
    }

    #[test]
    fn level_labels_trim_trailing_zeros() {
        let fib = FibParameters::default().with_recommended(&[0.618, 1.0]);
        let labels: Vec<String> = fib.displayed().map(super::FibLevel::label).collect();
        assert_eq!(labels, vec!["61.8%".to_owned(), "100%".to_owned()]);
    }

    #[test]
    fn fib_parameters_use_camel_case_keys() {
        let json = serde_json::to_value(FibParameters::default()).expect("serialize");
        assert!(json.get("printLevels").is_some());
        assert!(json.get("extendLeft").is_some());
        assert!(json["trend"]["parameters"].get("lineWidth").is_some());
    }

    #[test]
    fn empty_json_yields_defaults() {
        let params: VectorParameters = serde_json::from_str("{}").expect("parse");
        assert_eq!(params, VectorParameters::default());
    }
}
