use approx::assert_relative_eq;
use chart_drawings::core::{
    Anchor, ChartLayout, Interval, OhlcRecord, Panel, PriceAxis, StaticChartHost, TimeAxis,
};
use chart_drawings::drawing::shape::snap_angle;
use chart_drawings::drawing::statistics::{average_stats, regression_endpoints, regression_fit};
use chart_drawings::drawing::{
    Anchored, Drawing, DrawingKind, Interactive, Renderable, Serializable, VectorParameters,
};
use chart_drawings::interaction::{AnchorSlot, ClickOutcome};
use chart_drawings::render::{DrawCommand, RecordingContext};
use chrono::{Duration, TimeZone, Utc};

fn host_without_panel(closes: &[f64]) -> StaticChartHost {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("start");
    let data = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            OhlcRecord::new(start + Duration::days(i as i64), close, close, close, close).expect("record")
        })
        .collect();
    let axis = TimeAxis::new(0.0, 500.0, 10.0, 0).expect("time axis");
    StaticChartHost::new(ChartLayout::new(axis, Interval::Day), data).expect("host")
}

fn host_with_closes(closes: &[f64]) -> StaticChartHost {
    let panel = Panel::new("chart", 0.0, 500.0, PriceAxis::new(0.0, 200.0, 200.0, 0.0).expect("price axis"))
        .expect("panel");
    host_without_panel(closes).with_panel(panel)
}

fn rising(count: usize) -> StaticChartHost {
    let closes: Vec<f64> = (0..count).map(|i| 100.0 + i as f64).collect();
    host_with_closes(&closes)
}

fn create(kind: DrawingKind) -> Drawing {
    Drawing::create(kind, "chart", &VectorParameters::default()).expect("create")
}

fn construct(drawing: &mut Drawing, host: &StaticChartHost, clicks: &[(i64, f64)]) -> ClickOutcome {
    let mut outcome = ClickOutcome::Continue;
    for &(tick, value) in clicks {
        drawing.pointer_move(host, tick, value);
        outcome = drawing.click(host, tick, value);
        if outcome.is_finished() {
            break;
        }
    }
    outcome
}

#[test]
fn regression_of_a_linear_series_has_unit_slope() {
    let fit = regression_fit(&[104.0, 105.0, 106.0, 107.0, 108.0]).expect("fit");
    assert_relative_eq!(fit.slope, 1.0, epsilon = 1e-12);
    assert_relative_eq!(fit.intercept, 103.0, epsilon = 1e-12);
    assert!(regression_fit(&[42.0]).is_none());

    let host = rising(40);
    let (start, end) = regression_endpoints(&host, Anchor::new(4, 0.0), Anchor::new(12, 0.0)).expect("endpoints");
    assert_relative_eq!(start, 103.0, epsilon = 1e-9);
    assert_relative_eq!(end, 112.0, epsilon = 1e-9);
    let (reversed_start, reversed_end) =
        regression_endpoints(&host, Anchor::new(12, 0.0), Anchor::new(4, 0.0)).expect("endpoints");
    assert_relative_eq!(reversed_start, end, epsilon = 1e-9);
    assert_relative_eq!(reversed_end, start, epsilon = 1e-9);
}

#[test]
fn regression_of_a_flat_series_is_horizontal() {
    let host = host_with_closes(&[50.0; 30]);
    let mut regression = create(DrawingKind::Regression);
    assert_eq!(construct(&mut regression, &host, &[(5, 10.0), (15, 90.0)]), ClickOutcome::Complete);
    regression.render(&mut RecordingContext::new(), &host).expect("render");
    let p0 = regression.base().anchor(AnchorSlot::P0).expect("p0");
    let p1 = regression.base().anchor(AnchorSlot::P1).expect("p1");
    assert_relative_eq!(p0.value, 50.0, epsilon = 1e-9);
    assert_relative_eq!(p1.value, 50.0, epsilon = 1e-9);
}

#[test]
fn average_bands_sit_at_whole_deviations() {
    let stats = average_stats(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).expect("stats");
    assert_relative_eq!(stats.mean, 5.0);
    assert_relative_eq!(stats.deviation, 2.0);
    assert!(average_stats(&[]).is_none());

    let host = host_with_closes(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
    let mut drawing = create(DrawingKind::Average);
    construct(&mut drawing, &host, &[(0, 150.0), (7, 150.0)]);
    let Drawing::Average(average) = &drawing else {
        panic!("average variant");
    };
    let levels: Vec<(String, f64)> = average
        .band_levels(average.stats(&host).expect("stats"))
        .into_iter()
        .map(|(label, value, _)| (label, value))
        .collect();
    let values: Vec<f64> = levels.iter().map(|(_, value)| *value).collect();
    assert_eq!(values, [7.0, 3.0, 9.0, 1.0]);
    assert_eq!(levels[2].0, "2\u{3c3}");
}

#[test]
fn chart_only_tools_ignore_clicks_before_the_first_bar() {
    let host = rising(40);
    for kind in [DrawingKind::Regression, DrawingKind::Average, DrawingKind::Quadrant, DrawingKind::Tirone] {
        let mut drawing = create(kind);
        assert_eq!(drawing.click(&host, -3, 100.0), ClickOutcome::Continue);
        assert!(drawing.base().anchor(AnchorSlot::P0).is_none(), "{kind}");
    }
}

#[test]
fn shape_rotation_snaps_to_five_degrees() {
    assert_relative_eq!(snap_angle(1.0, 1.0), 45.0);
    assert_relative_eq!(snap_angle(1.0, 0.05), 5.0);

    let host = rising(40);
    let mut drawing = create(DrawingKind::Star);
    assert_eq!(construct(&mut drawing, &host, &[(10, 100.0), (13, 80.0)]), ClickOutcome::Continue);
    drawing.pointer_move(&host, 14, 60.0);
    assert_eq!(drawing.click(&host, 14, 60.0), ClickOutcome::Complete);
    let Drawing::Shape(shape) = &drawing else {
        panic!("shape variant");
    };
    assert_relative_eq!(shape.angle(), 45.0);
}

#[test]
fn freeform_bounds_cover_the_captured_path() {
    let host = rising(40);
    let mut drawing = create(DrawingKind::Freeform);
    drawing.click(&host, 2, 100.0);
    for &(tick, value) in &[(4, 120.0), (6, 90.0), (9, 130.0), (11, 110.0)] {
        drawing.pointer_move(&host, tick, value);
    }
    assert_eq!(drawing.click(&host, 11, 110.0), ClickOutcome::Complete);
    let Drawing::Freeform(freeform) = &drawing else {
        panic!("freeform variant");
    };
    let bounds = freeform.bounds(&host).expect("bounds");
    assert!(bounds.low_tick <= 2 && bounds.high_tick >= 11);
    assert!(bounds.low_value <= 90.0 + 1.0 && bounds.high_value >= 130.0 - 1.0);
}

/// Builds a finished drawing of `kind` with a click sequence it accepts.
fn finished(kind: DrawingKind, host: &StaticChartHost) -> Drawing {
    let mut drawing = create(kind);
    let outcome = match kind {
        DrawingKind::Gartley => construct(
            &mut drawing,
            host,
            &[(2, 100.0), (6, 150.0), (10, 118.0), (14, 140.0), (18, 105.0)],
        ),
        DrawingKind::Freeform => {
            drawing.click(host, 2, 100.0);
            for &(tick, value) in &[(4, 120.0), (6, 90.0), (9, 130.0)] {
                drawing.pointer_move(host, tick, value);
            }
            drawing.click(host, 9, 130.0)
        }
        _ => construct(&mut drawing, host, &[(4, 100.0), (12, 140.0), (18, 120.0)]),
    };
    assert_eq!(outcome, ClickOutcome::Complete, "{kind}");
    drawing
}

fn frame(drawing: &mut Drawing, host: &StaticChartHost) -> Vec<DrawCommand> {
    let mut ctx = RecordingContext::new();
    drawing.render(&mut ctx, host).expect("render");
    ctx.commands().to_vec()
}

#[test]
fn every_tool_renders_the_same_after_a_round_trip() {
    let host = rising(40);
    for kind in DrawingKind::ALL {
        let mut drawing = finished(kind, &host);
        let first = frame(&mut drawing, &host);
        let steady = frame(&mut drawing, &host);
        assert!(!steady.is_empty(), "{kind} painted nothing");
        assert_eq!(first, steady, "{kind} first frame");

        let desc = drawing.serialize();
        assert_eq!(desc.name, kind.to_string());
        let mut restored = Drawing::reconstruct(&host, &desc).unwrap_or_else(|e| panic!("{kind}: {e}"));
        assert_eq!(restored.kind(), kind);
        assert_eq!(restored.base().anchors(), drawing.base().anchors(), "{kind} anchors");
        assert_eq!(frame(&mut restored, &host), steady, "{kind} restored frame");
    }
}

#[test]
fn every_tool_skips_a_missing_panel() {
    let host = rising(40);
    let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
    let bare = host_without_panel(&closes);
    for kind in DrawingKind::ALL {
        let mut drawing = finished(kind, &host);
        let anchors = *drawing.base().anchors();
        let mut ctx = RecordingContext::new();
        drawing.render(&mut ctx, &bare).expect("render");
        assert!(ctx.is_empty(), "{kind} painted without its panel");
        assert_eq!(*drawing.base().anchors(), anchors, "{kind} anchors moved");
    }
}
