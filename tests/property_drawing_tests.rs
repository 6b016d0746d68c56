use chart_drawings::core::{ChartLayout, Interval, OhlcRecord, Panel, PriceAxis, StaticChartHost, TimeAxis};
use chart_drawings::drawing::{
    Anchored, Drawing, DrawingDescriptor, DrawingKind, Interactive, Serializable, VectorParameters,
};
use chart_drawings::interaction::{AnchorSlot, ClickOutcome, Repositioner};
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

fn host() -> StaticChartHost {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("start");
    let data = (0..50)
        .map(|i| {
            let close = 100.0 + f64::from(i);
            OhlcRecord::new(start + Duration::days(i64::from(i)), close, close, close, close).expect("record")
        })
        .collect();
    let axis = TimeAxis::new(0.0, 500.0, 10.0, 0).expect("time axis");
    let panel = Panel::new("chart", 0.0, 500.0, PriceAxis::new(0.0, 200.0, 200.0, 0.0).expect("price axis"))
        .expect("panel");
    StaticChartHost::new(ChartLayout::new(axis, Interval::Day), data)
        .expect("host")
        .with_panel(panel)
}

proptest! {
    #[test]
    fn time_axis_round_trips_ticks(tick in -10_000i64..10_000, candle_width in 1.0f64..40.0) {
        let axis = TimeAxis::new(0.0, 800.0, candle_width, 0).expect("time axis");
        prop_assert_eq!(axis.tick_from_pixel(axis.pixel_from_tick(tick as f64)), tick);
    }

    #[test]
    fn price_axis_round_trips_values(low in -1_000.0f64..1_000.0, span in 0.01f64..1_000.0, factor in 0.0f64..1.0) {
        let axis = PriceAxis::new(0.0, 400.0, low + span, low).expect("price axis");
        let value = low + factor * span;
        let recovered = axis.price_from_pixel(axis.pixel_from_price(value));
        prop_assert!((recovered - value).abs() <= 1e-7 * span.max(1.0));
    }

    #[test]
    fn channel_rail_stays_parallel(
        t0 in 0i64..20,
        dt in 1i64..20,
        v0 in 20.0f64..180.0,
        v1 in 20.0f64..180.0,
        t2 in 0i64..45,
        v2 in 20.0f64..180.0,
        shift in -5i64..5,
        lift in -10.0f64..10.0,
    ) {
        prop_assume!(t2 != t0);
        let host = host();
        let t1 = t0 + dt;
        let mut channel = Drawing::create(DrawingKind::Channel, "chart", &VectorParameters::default()).expect("create");
        channel.click(&host, t0, v0);
        channel.pointer_move(&host, t1, v1);
        channel.click(&host, t1, v1);
        channel.pointer_move(&host, t2, v2);
        prop_assert_eq!(channel.click(&host, t2, v2), ClickOutcome::Complete);

        let p1 = channel.base().anchor(AnchorSlot::P1).expect("p1");
        let p2 = channel.base().anchor(AnchorSlot::P2).expect("p2");
        prop_assert_eq!(p2.tick, p1.tick);
        let offset = p2.value - p1.value;

        let drag = Repositioner::drag(AnchorSlot::P0, channel.base().anchors(), t0, v0);
        channel.reposition(&host, &drag, t0 + shift, v0 + lift);
        let p1 = channel.base().anchor(AnchorSlot::P1).expect("p1");
        let p2 = channel.base().anchor(AnchorSlot::P2).expect("p2");
        prop_assert_eq!(p2.tick, p1.tick);
        prop_assert!((p2.value - p1.value - offset).abs() < 1e-9);
    }

    #[test]
    fn segment_descriptor_survives_json(
        t0 in 0i64..50,
        t1 in 0i64..50,
        v0 in 1.0f64..199.0,
        v1 in 1.0f64..199.0,
    ) {
        prop_assume!(t0 != t1);
        let host = host();
        let mut segment = Drawing::create(DrawingKind::Segment, "chart", &VectorParameters::default()).expect("create");
        segment.click(&host, t0, v0);
        prop_assert_eq!(segment.click(&host, t1, v1), ClickOutcome::Complete);

        let json = serde_json::to_string(&segment.serialize()).expect("json");
        let desc: DrawingDescriptor = serde_json::from_str(&json).expect("descriptor");
        let restored = Drawing::reconstruct(&host, &desc).expect("reconstruct");
        for slot in [AnchorSlot::P0, AnchorSlot::P1] {
            let before = segment.base().anchor(slot).expect("before");
            let after = restored.base().anchor(slot).expect("after");
            prop_assert_eq!(after.tick, before.tick);
            prop_assert!((after.value - before.value).abs() <= 1e-9 * before.value.abs());
        }
    }
}
