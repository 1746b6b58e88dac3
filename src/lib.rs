//! Client for an urban vegetation-health monitoring service.
//!
//! Points carry a year-over-year NDVI delta. They are classified into health
//! categories, drawn as map layers, and can be stepped through in distance
//! order. Citizens file reports with an optional photo; the backend analyses
//! them asynchronously and the client polls for the result.

pub mod api;
pub mod chart;
pub mod classify;
pub mod config;
pub mod form;
pub mod gui_app;
pub mod layers;
pub mod lifecycle;
pub mod model;
pub mod session;
pub mod spatial;

pub use api::{ApiClient, ApiError, Decoded};
pub use classify::{Classification, HealthCategory, classify, classify_point};
pub use config::{AppConfig, RetryPolicy};
pub use model::{CitizenReport, Coordinates, MonitoredPoint, ReportStatus};

/// Installs the `tracing` subscriber used by both binaries.
///
/// `RUST_LOG` wins; otherwise this crate logs at `info`.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("canopy_watch=info"));
    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}
