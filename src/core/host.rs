use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::layout::ChartLayout;
use crate::core::ohlc::{OhlcRecord, validate_data_set};
use crate::core::pane::Panel;
use crate::core::types::{Anchor, Point};
use crate::error::DrawingResult;
use crate::render::{Color, FontSpec};

/// Colors and fonts the host supplies to drawings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostTheme {
    /// Stroke color used when a drawing's color is `auto`.
    #[serde(default = "default_line_color")]
    pub default_color: Color,
    #[serde(default = "default_highlight_color")]
    pub highlight_color: Color,
    /// Chart background, used to hollow out handles and label boxes.
    #[serde(default = "default_container_color")]
    pub container_color: Color,
    #[serde(default = "default_drop_zone_color")]
    pub drop_zone_color: Color,
    #[serde(default)]
    pub font: FontSpec,
}

fn default_line_color() -> Color {
    Color::rgb(0.0, 0.0, 0.0)
}

fn default_highlight_color() -> Color {
    Color::rgb(1.0, 0.6, 0.0)
}

fn default_container_color() -> Color {
    Color::rgb(1.0, 1.0, 1.0)
}

fn default_drop_zone_color() -> Color {
    Color::rgb(0.0, 128.0 / 255.0, 0.0)
}

impl Default for HostTheme {
    fn default() -> Self {
        Self {
            default_color: default_line_color(),
            highlight_color: default_highlight_color(),
            container_color: default_container_color(),
            drop_zone_color: default_drop_zone_color(),
            font: FontSpec::default(),
        }
    }
}

/// Chart services drawings depend on.
///
/// Implementors provide panels, layout, data and theme; coordinate and date
/// conversions have default implementations built on those.
pub trait ChartHost {
    fn panel(&self, name: &str) -> Option<&Panel>;

    fn layout(&self) -> &ChartLayout;

    fn data_set(&self) -> &[OhlcRecord];

    fn theme(&self) -> &HostTheme;

    /// Minutes to add to display time to reach UTC.
    fn display_offset_minutes(&self) -> i32 {
        0
    }

    fn pixel_from_tick(&self, tick: f64) -> f64 {
        self.layout().time_axis.pixel_from_tick(tick)
    }

    fn tick_from_pixel(&self, x: f64) -> i64 {
        self.layout().time_axis.tick_from_pixel(x)
    }

    /// Pixel y of `value` in `panel`. `tick` lets hosts apply per-bar
    /// transforms such as percentage comparisons.
    fn pixel_from_value(&self, panel: &Panel, _tick: f64, value: f64) -> f64 {
        panel.y_axis.pixel_from_price(value)
    }

    fn value_from_pixel(&self, panel: &Panel, y: f64) -> f64 {
        panel.y_axis.price_from_pixel(y)
    }

    fn anchor_to_pixel(&self, panel: &Panel, anchor: Anchor) -> Point {
        Point::new(
            self.pixel_from_tick(anchor.tick_f64()),
            self.pixel_from_value(panel, anchor.tick_f64(), anchor.value),
        )
    }

    /// Date of `tick`, extrapolated by the layout interval outside the data set.
    fn date_from_tick(&self, tick: i64) -> Option<DateTime<Utc>> {
        let data = self.data_set();
        let layout = self.layout();
        let first = data.first()?;
        let last_index = data.len() as i64 - 1;
        if tick < 0 {
            return layout.interval.advance(first.date, tick, layout.periodicity);
        }
        if tick > last_index {
            let last = data.last()?;
            return layout
                .interval
                .advance(last.date, tick - last_index, layout.periodicity);
        }
        usize::try_from(tick).ok().and_then(|index| data.get(index)).map(|record| record.date)
    }

    /// Tick of the last record at or before `date`, extrapolated outside the
    /// data set.
    fn tick_from_date(&self, date: DateTime<Utc>) -> Option<i64> {
        let data = self.data_set();
        let layout = self.layout();
        let first = data.first()?;
        let last = data.last()?;
        if date < first.date {
            return Some(layout.interval.steps_between(first.date, date, layout.periodicity));
        }
        if date > last.date {
            let last_index = data.len() as i64 - 1;
            return Some(last_index + layout.interval.steps_between(last.date, date, layout.periodicity));
        }
        let after = data.partition_point(|record| record.date <= date);
        Some(after as i64 - 1)
    }

    fn close_at(&self, tick: i64) -> Option<f64> {
        usize::try_from(tick)
            .ok()
            .and_then(|index| self.data_set().get(index))
            .and_then(OhlcRecord::finite_close)
    }
}

/// In-memory host for headless use and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticChartHost {
    panels: IndexMap<String, Panel>,
    layout: ChartLayout,
    data: Vec<OhlcRecord>,
    theme: HostTheme,
    display_offset_minutes: i32,
}

impl StaticChartHost {
    pub fn new(layout: ChartLayout, data: Vec<OhlcRecord>) -> DrawingResult<Self> {
        validate_data_set(&data)?;
        Ok(Self {
            panels: IndexMap::new(),
            layout,
            data,
            theme: HostTheme::default(),
            display_offset_minutes: 0,
        })
    }

    #[must_use]
    pub fn with_panel(mut self, panel: Panel) -> Self {
        self.add_panel(panel);
        self
    }

    #[must_use]
    pub fn with_theme(mut self, theme: HostTheme) -> Self {
        self.theme = theme;
        self
    }

    #[must_use]
    pub fn with_display_offset_minutes(mut self, minutes: i32) -> Self {
        self.display_offset_minutes = minutes;
        self
    }

    /// Adds or replaces a panel, returning the replaced one.
    pub fn add_panel(&mut self, panel: Panel) -> Option<Panel> {
        debug!(panel = panel.name(), "add panel");
        self.panels.insert(panel.name().to_owned(), panel)
    }

    pub fn remove_panel(&mut self, name: &str) -> Option<Panel> {
        debug!(panel = name, "remove panel");
        self.panels.shift_remove(name)
    }

    pub fn panel_mut(&mut self, name: &str) -> Option<&mut Panel> {
        self.panels.get_mut(name)
    }

    pub fn layout_mut(&mut self) -> &mut ChartLayout {
        &mut self.layout
    }

    pub fn set_data(&mut self, data: Vec<OhlcRecord>) -> DrawingResult<()> {
        validate_data_set(&data)?;
        debug!(records = data.len(), "replace data set");
        self.data = data;
        Ok(())
    }
}

impl ChartHost for StaticChartHost {
    fn panel(&self, name: &str) -> Option<&Panel> {
        self.panels.get(name)
    }

    fn layout(&self) -> &ChartLayout {
        &self.layout
    }

    fn data_set(&self) -> &[OhlcRecord] {
        &self.data
    }

    fn theme(&self) -> &HostTheme {
        &self.theme
    }

    fn display_offset_minutes(&self) -> i32 {
        self.display_offset_minutes
    }
}
