//! Smoothed scalar line chart.
//!
//! Architecture:
//! ```text
//!   host widget (SmoothedSeriesChart)
//!     │  config setters ──► DebounceTimer ──tick()──► build
//!     │  SeriesCache (data, metadata, visible set)
//!     ▼
//!   LineChart (rebuilt on axis / accessor / scale / columns / color changes)
//!     │  smoothing, domain, tooltip rows
//!     ▼
//!   ChartSurface (egui scene)
//! ```
use thiserror::Error;

pub mod axis;
pub mod cache;
pub mod domain;
pub mod format;
pub mod host;
pub mod line_chart;
pub mod smoothing;
pub mod surface;
pub mod timer;
pub mod tooltip;

pub use host::{ChartEvent, ChartState, SmoothedSeriesChart};
pub use surface::SurfaceError;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("rendering surface failed: {0}")]
    Surface(#[from] SurfaceError),
}
