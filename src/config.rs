//! Runtime configuration shared by the GUI and CLI front ends.

use std::time::Duration;

use crate::model::Coordinates;

const API_BASE: &str = "http://127.0.0.1:5000";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const MAP_CENTER_LAT: f64 = 35.6895;
const MAP_CENTER_LON: f64 = 139.6917;
const FIT_PADDING: f64 = 0.1;
const GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INITIAL_DELAY: Duration = Duration::from_millis(3000);
const POLL_MULTIPLIER: f64 = 2.0;
const POLL_MAX_DELAY: Duration = Duration::from_secs(30);
const POLL_MAX_ATTEMPTS: u32 = 6;

/// Backoff schedule for analysis-result polling.
///
/// Attempt `k` (zero based) waits `initial_delay * multiplier^k`, capped at
/// `max_delay`. After `max_attempts` unanswered polls the report is reported
/// as still analyzing and tracking stops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: POLL_INITIAL_DELAY,
            multiplier: POLL_MULTIPLIER,
            max_delay: POLL_MAX_DELAY,
            max_attempts: POLL_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait before poll number `attempt`, or `None` once the budget is spent.
    ///
    /// The budget is never below one poll, so every tracked report reaches a terminal state.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts.max(1) {
            return None;
        }
        let factor = self.multiplier.max(1.0).powi(attempt as i32);
        let millis = (self.initial_delay.as_millis() as f64 * factor)
            .min(self.max_delay.as_millis() as f64);
        Some(Duration::from_millis(millis.round() as u64))
    }
}

/// Configuration for talking to the monitoring backend and laying out the map.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base: String,
    pub request_timeout: Duration,
    pub map_center: Coordinates,
    pub fit_padding: f64,
    pub geolocation_timeout: Duration,
    /// Fixed position answered by the device-location provider, if any.
    pub device_location: Option<Coordinates>,
    pub retry: RetryPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: API_BASE.to_string(),
            request_timeout: REQUEST_TIMEOUT,
            map_center: Coordinates::new(MAP_CENTER_LAT, MAP_CENTER_LON),
            fit_padding: FIT_PADDING,
            geolocation_timeout: GEOLOCATION_TIMEOUT,
            device_location: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Defaults overlaid with `CANOPY_*` environment variables.
    ///
    /// Values that fail to parse are ignored rather than rejected.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("CANOPY_API_URL")
            && !url.trim().is_empty()
        {
            config.api_base = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(secs) = env_parse::<u64>("CANOPY_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs.max(1));
        }
        if let (Some(lat), Some(lon)) = (
            env_parse::<f64>("CANOPY_MAP_LAT"),
            env_parse::<f64>("CANOPY_MAP_LON"),
        ) {
            config.map_center = Coordinates::new(lat, lon);
        }
        if let (Some(lat), Some(lon)) = (
            env_parse::<f64>("CANOPY_DEVICE_LAT"),
            env_parse::<f64>("CANOPY_DEVICE_LON"),
        ) {
            config.device_location = Some(Coordinates::new(lat, lon));
        }
        if let Some(attempts) = env_parse::<u32>("CANOPY_POLL_ATTEMPTS") {
            config.retry.max_attempts = attempts.max(1);
        }

        config
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Some(Duration::from_millis(3000)));
        assert_eq!(policy.delay_for(1), Some(Duration::from_millis(6000)));
        assert_eq!(policy.delay_for(2), Some(Duration::from_millis(12000)));
        assert_eq!(policy.delay_for(4), Some(Duration::from_secs(30)));
        assert_eq!(policy.delay_for(6), None);
    }

    #[test]
    fn zero_attempt_budget_still_polls_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for(0), Some(Duration::from_millis(3000)));
        assert_eq!(policy.delay_for(1), None);
    }

    #[test]
    fn api_base_trailing_slash_is_dropped() {
        let config = AppConfig::default().with_api_base("http://example.test/");
        assert_eq!(config.api_base, "http://example.test");
    }
}
