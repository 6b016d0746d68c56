use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};

use crate::error::{DrawingError, DrawingResult};

/// RGBA color in normalized 0..=1 channel values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Color {
    #[must_use]
    pub const fn rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    #[must_use]
    pub const fn rgb(red: f64, green: f64, blue: f64) -> Self {
        Self::rgba(red, green, blue, 1.0)
    }

    #[must_use]
    pub fn with_alpha(self, alpha: f64) -> Self {
        Self { alpha, ..self }
    }

    #[must_use]
    pub fn is_transparent(self) -> bool {
        self.alpha <= 0.0
    }

    pub fn validate(self) -> DrawingResult<()> {
        for (channel, value) in [
            ("red", self.red),
            ("green", self.green),
            ("blue", self.blue),
            ("alpha", self.alpha),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(DrawingError::InvalidData(format!(
                    "color channel `{channel}` must be finite and in [0, 1]"
                )));
            }
        }
        Ok(())
    }

    /// Parses `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(..)`, `rgba(..)` and a
    /// handful of CSS color names.
    pub fn parse_css(text: &str) -> DrawingResult<Self> {
        let trimmed = text.trim();
        let invalid = || DrawingError::InvalidData(format!("unsupported color `{text}`"));
        if let Some(hex) = trimmed.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(invalid);
        }
        let lower = trimmed.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_rgb_function(args).ok_or_else(invalid);
        }
        named_color(&lower).ok_or_else(invalid)
    }

    /// `#rrggbb`, or `rgba(..)` when partially transparent.
    #[must_use]
    pub fn to_css(self) -> String {
        let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        if self.alpha >= 1.0 {
            format!(
                "#{:02x}{:02x}{:02x}",
                channel(self.red),
                channel(self.green),
                channel(self.blue)
            )
        } else {
            format!(
                "rgba({},{},{},{})",
                channel(self.red),
                channel(self.green),
                channel(self.blue),
                self.alpha
            )
        }
    }
}

/// Resolves a drawing style color string.
///
/// `auto`, empty and unparseable values fall back to `fallback`; fully
/// transparent colors resolve to `None` so callers skip the paint.
#[must_use]
pub fn resolve_style_color(style: &str, fallback: Color) -> Option<Color> {
    let trimmed = style.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
        return Some(fallback);
    }
    match Color::parse_css(trimmed) {
        Ok(color) if color.is_transparent() => None,
        Ok(color) => Some(color),
        Err(_) => Some(fallback),
    }
}

/// First candidate that names a concrete, visible color; `auto`, empty,
/// unparseable and transparent candidates defer to the next one.
#[must_use]
pub fn cascade_color(candidates: &[&str], fallback: Color) -> Color {
    candidates
        .iter()
        .map(|candidate| candidate.trim())
        .filter(|candidate| !candidate.is_empty() && !candidate.eq_ignore_ascii_case("auto"))
        .find_map(|candidate| Color::parse_css(candidate).ok().filter(|color| !color.is_transparent()))
        .unwrap_or(fallback)
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let byte = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| f64::from(v) / 255.0);
    match hex.len() {
        3 => {
            let expand = |i: usize| {
                let digit = hex.get(i..=i)?;
                byte(&digit.repeat(2))
            };
            Some(Color::rgb(expand(0)?, expand(1)?, expand(2)?))
        }
        6 | 8 => {
            let alpha = if hex.len() == 8 { byte(hex.get(6..8)?)? } else { 1.0 };
            Some(Color::rgba(
                byte(hex.get(0..2)?)?,
                byte(hex.get(2..4)?)?,
                byte(hex.get(4..6)?)?,
                alpha,
            ))
        }
        _ => None,
    }
}

fn parse_rgb_function(args: &str) -> Option<Color> {
    let parts: SmallVec<[f64; 4]> = args
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    let channel = |v: f64| (0.0..=255.0).contains(&v).then_some(v / 255.0);
    match parts.as_slice() {
        [r, g, b] => Some(Color::rgb(channel(*r)?, channel(*g)?, channel(*b)?)),
        [r, g, b, a] if (0.0..=1.0).contains(a) => {
            Some(Color::rgba(channel(*r)?, channel(*g)?, channel(*b)?, *a))
        }
        _ => None,
    }
}

fn named_color(name: &str) -> Option<Color> {
    let color = match name {
        "black" => Color::rgb(0.0, 0.0, 0.0),
        "white" => Color::rgb(1.0, 1.0, 1.0),
        "red" => Color::rgb(1.0, 0.0, 0.0),
        "green" => Color::rgb(0.0, 128.0 / 255.0, 0.0),
        "blue" => Color::rgb(0.0, 0.0, 1.0),
        "yellow" => Color::rgb(1.0, 1.0, 0.0),
        "orange" => Color::rgb(1.0, 165.0 / 255.0, 0.0),
        "gray" | "grey" => Color::rgb(128.0 / 255.0, 128.0 / 255.0, 128.0 / 255.0),
        "transparent" => Color::rgba(0.0, 0.0, 0.0, 0.0),
        _ => return None,
    };
    Some(color)
}

/// Stroke pattern of a drawing line. `None` hides the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinePattern {
    #[default]
    Solid,
    Dashed,
    Dotted,
    None,
}

impl LinePattern {
    /// Canvas dash array for a stroke of `line_width` pixels.
    #[must_use]
    pub fn dash_array(self, line_width: f64) -> SmallVec<[f64; 2]> {
        match self {
            Self::Dotted => smallvec![line_width, line_width * 2.0],
            Self::Dashed => smallvec![line_width * 5.0, line_width * 5.0],
            Self::Solid | Self::None => SmallVec::new(),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Solid => "solid",
            Self::Dashed => "dashed",
            Self::Dotted => "dotted",
            Self::None => "none",
        }
    }
}

/// Font used for drawing text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    #[serde(default = "default_font_size")]
    pub size_px: f64,
    #[serde(default = "default_font_family")]
    pub family: String,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub bold: bool,
}

fn default_font_size() -> f64 {
    13.0
}

fn default_font_family() -> String {
    "sans-serif".to_owned()
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            size_px: default_font_size(),
            family: default_font_family(),
            italic: false,
            bold: false,
        }
    }
}

impl FontSpec {
    /// Line height used for box layout, 1.2 times the font size.
    #[must_use]
    pub fn line_height(&self) -> f64 {
        self.size_px * 1.2
    }
}

impl fmt::Display for FontSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}px {}",
            if self.italic { "italic" } else { "normal" },
            if self.bold { "bold" } else { "normal" },
            self.size_px,
            self.family
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextBaseline {
    Top,
    Middle,
    #[default]
    Alphabetic,
    Bottom,
}
