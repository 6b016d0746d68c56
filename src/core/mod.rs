pub mod anchor;
pub mod geometry;
pub mod host;
pub mod layout;
pub mod ohlc;
pub mod pane;
pub mod primitives;
pub mod scale;
pub mod spline;
pub mod types;

pub use anchor::{DurableAnchor, ViewAnchor, resolve};
pub use geometry::{HitBox, LineKind, PixelRect};
pub use host::{ChartHost, HostTheme, StaticChartHost};
pub use layout::{ChartLayout, Interval, interval_ratio};
pub use ohlc::OhlcRecord;
pub use pane::Panel;
pub use scale::{PriceAxis, TimeAxis};
pub use types::{Anchor, PathSegment, Point};
