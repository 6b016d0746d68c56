//! Telemetry helpers for applications embedding `chart-drawings`.
//!
//! Drawing operations log through `tracing`; nothing is emitted until the
//! host installs a subscriber. Hosts can call `init_default_tracing` or wire
//! their own subscriber and filters (target `chart_drawings`).

/// Default filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "chart_drawings=info";

/// Initializes a compact `tracing` subscriber when the `telemetry` feature is enabled.
///
/// Returns `false` when the feature is disabled or a global subscriber is
/// already installed.
#[must_use]
pub fn init_default_tracing() -> bool {
    #[cfg(feature = "telemetry")]
    {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER));
        return tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .try_init()
            .is_ok();
    }

    #[cfg(not(feature = "telemetry"))]
    {
        false
    }
}
