use chrono::{Duration, TimeZone, Utc};

use crate::core::host::StaticChartHost;
use crate::core::layout::{ChartLayout, Interval};
use crate::core::ohlc::OhlcRecord;
use crate::core::pane::Panel;
use crate::core::scale::{PriceAxis, TimeAxis};
use crate::core::types::Point;
use crate::render::RecordingContext;

/// Daily host with one panel, `chart`, 500 x 200 px showing prices 0..200.
/// Tick `t` sits at x = `10t + 5` and price `v` at y = `200 - v`.
pub(crate) fn host_with_closes(closes: &[f64]) -> StaticChartHost {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("start");
    let data = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            OhlcRecord::new(start + Duration::days(i as i64), close, close, close, close).expect("record")
        })
        .collect();
    let axis = TimeAxis::new(0.0, 500.0, 10.0, 0).expect("time axis");
    let panel = Panel::new("chart", 0.0, 500.0, PriceAxis::new(0.0, 200.0, 200.0, 0.0).expect("price axis"))
        .expect("panel");
    StaticChartHost::new(ChartLayout::new(axis, Interval::Day), data)
        .expect("host")
        .with_panel(panel)
}

/// Host whose closes rise by one per bar from 100.
pub(crate) fn daily_host(count: usize) -> StaticChartHost {
    let closes: Vec<f64> = (0..count).map(|i| 100.0 + i as f64).collect();
    host_with_closes(&closes)
}

pub(crate) fn stroked_points(ctx: &RecordingContext) -> Vec<Vec<Point>> {
    use crate::core::types::PathSegment;
    ctx.strokes()
        .map(|path| {
            path.segments
                .iter()
                .filter_map(|segment| match *segment {
                    PathSegment::MoveTo(p) | PathSegment::LineTo(p) => Some(p),
                    _ => None,
                })
                .collect()
        })
        .collect()
}
