//! Location acquisition for the report form.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::model::Coordinates;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocationMode {
    #[default]
    CurrentDevice,
    MapPick,
}

impl LocationMode {
    pub fn label(&self) -> &'static str {
        match self {
            LocationMode::CurrentDevice => "Use current location",
            LocationMode::MapPick => "Pick on map",
        }
    }
}

/// The fixed set of causes a position lookup can fail with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GeolocationError {
    #[error("Location permission was denied.")]
    PermissionDenied,
    #[error("Current position is unavailable.")]
    PositionUnavailable,
    #[error("Timed out while getting the current position.")]
    Timeout,
    #[error("An unknown error occurred while getting the current position.")]
    Unknown,
}

/// One-shot source of the device position.
pub trait LocationProvider {
    fn locate(&self) -> impl Future<Output = Result<Coordinates, GeolocationError>> + Send;
}

/// Provider answering a preconfigured position, or "unavailable" when none is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLocation(pub Option<Coordinates>);

impl LocationProvider for FixedLocation {
    async fn locate(&self) -> Result<Coordinates, GeolocationError> {
        self.0.ok_or(GeolocationError::PositionUnavailable)
    }
}

/// Runs one lookup bounded by `timeout`.
pub async fn acquire<P: LocationProvider>(
    provider: &P,
    timeout: Duration,
) -> Result<Coordinates, GeolocationError> {
    let position = tokio::time::timeout(timeout, provider.locate())
        .await
        .map_err(|_| GeolocationError::Timeout)??;
    if !position.is_finite() || !position.in_wgs84_range() {
        debug!(%position, "provider answered an invalid position");
        return Err(GeolocationError::PositionUnavailable);
    }
    Ok(position)
}
