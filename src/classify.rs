//! Maps a year-over-year NDVI delta onto a health category.
//!
//! The same threshold table drives marker colors, aggregate statistics and
//! the alert list, so the map and the statistics panel always agree.

use palette::Srgb;

use crate::model::MonitoredPoint;

/// Lower bound (inclusive) of the strong-increase band.
pub const STRONG_INCREASE_MIN: f64 = 0.10;
/// Lower bound (inclusive) of the stable band.
pub const STABLE_MIN: f64 = -0.10;
/// Lower bound (inclusive) of the decrease band; anything below is critical.
pub const DECREASE_MIN: f64 = -0.50;
/// Default cut-off for [`alerts`].
pub const DEFAULT_ALERT_THRESHOLD: f64 = -0.10;

const COLOR_NO_DATA: Srgb<u8> = Srgb::new(158, 158, 158);
const COLOR_STRONG_INCREASE: Srgb<u8> = Srgb::new(0, 200, 83);
const COLOR_STABLE: Srgb<u8> = Srgb::new(255, 214, 0);
const COLOR_DECREASE: Srgb<u8> = Srgb::new(255, 145, 0);
const COLOR_CRITICAL: Srgb<u8> = Srgb::new(213, 0, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HealthCategory {
    NoData,
    StrongIncrease,
    Stable,
    Decrease,
    CriticalDecrease,
}

impl HealthCategory {
    pub const ALL: [HealthCategory; 5] = [
        HealthCategory::NoData,
        HealthCategory::StrongIncrease,
        HealthCategory::Stable,
        HealthCategory::Decrease,
        HealthCategory::CriticalDecrease,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            HealthCategory::NoData => "no-data",
            HealthCategory::StrongIncrease => "strong-increase",
            HealthCategory::Stable => "stable",
            HealthCategory::Decrease => "decrease",
            HealthCategory::CriticalDecrease => "critical-decrease",
        }
    }

    pub fn color(&self) -> Srgb<u8> {
        match self {
            HealthCategory::NoData => COLOR_NO_DATA,
            HealthCategory::StrongIncrease => COLOR_STRONG_INCREASE,
            HealthCategory::Stable => COLOR_STABLE,
            HealthCategory::Decrease => COLOR_DECREASE,
            HealthCategory::CriticalDecrease => COLOR_CRITICAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub category: HealthCategory,
    pub color: Srgb<u8>,
}

/// Classifies an NDVI delta. Total: `None` and NaN both map to no-data.
pub fn classify(delta: Option<f64>) -> Classification {
    let category = match delta {
        None => HealthCategory::NoData,
        Some(d) if d.is_nan() => HealthCategory::NoData,
        Some(d) if d >= STRONG_INCREASE_MIN => HealthCategory::StrongIncrease,
        Some(d) if d >= STABLE_MIN => HealthCategory::Stable,
        Some(d) if d >= DECREASE_MIN => HealthCategory::Decrease,
        Some(_) => HealthCategory::CriticalDecrease,
    };
    Classification {
        category,
        color: category.color(),
    }
}

pub fn classify_point(point: &MonitoredPoint) -> Classification {
    classify(point.ndvi_delta)
}

/// Aggregate figures for the statistics panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetStats {
    pub total_points: usize,
    /// Points carrying a delta.
    pub processed_points: usize,
    pub increase_count: usize,
    pub stable_count: usize,
    /// Decrease plus critical decrease.
    pub decrease_count: usize,
    pub critical_count: usize,
    pub no_data_count: usize,
    pub mean_delta: Option<f64>,
}

impl DatasetStats {
    pub fn from_points<'a, I>(points: I) -> Self
    where
        I: IntoIterator<Item = &'a MonitoredPoint>,
    {
        let mut stats = DatasetStats::default();
        let mut delta_sum = 0.0;

        for point in points {
            stats.total_points += 1;
            match classify_point(point).category {
                HealthCategory::NoData => stats.no_data_count += 1,
                HealthCategory::StrongIncrease => stats.increase_count += 1,
                HealthCategory::Stable => stats.stable_count += 1,
                HealthCategory::Decrease => stats.decrease_count += 1,
                HealthCategory::CriticalDecrease => {
                    stats.decrease_count += 1;
                    stats.critical_count += 1;
                }
            }
            if let Some(d) = point.ndvi_delta.filter(|d| !d.is_nan()) {
                stats.processed_points += 1;
                delta_sum += d;
            }
        }

        if stats.processed_points > 0 {
            stats.mean_delta = Some(delta_sum / stats.processed_points as f64);
        }
        stats
    }

    pub fn count(&self, category: HealthCategory) -> usize {
        match category {
            HealthCategory::NoData => self.no_data_count,
            HealthCategory::StrongIncrease => self.increase_count,
            HealthCategory::Stable => self.stable_count,
            HealthCategory::Decrease => self.decrease_count - self.critical_count,
            HealthCategory::CriticalDecrease => self.critical_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSeverity {
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub point_id: String,
    pub species: Option<String>,
    pub ndvi_delta: f64,
    pub severity: AlertSeverity,
}

/// Points whose delta fell below `threshold`, worst first.
///
/// Severity is high once the delta is below twice the threshold.
pub fn alerts<'a, I>(points: I, threshold: f64) -> Vec<Alert>
where
    I: IntoIterator<Item = &'a MonitoredPoint>,
{
    let mut out: Vec<Alert> = points
        .into_iter()
        .filter_map(|p| {
            let delta = p.ndvi_delta.filter(|d| !d.is_nan())?;
            if delta >= threshold {
                return None;
            }
            let severity = if delta < threshold * 2.0 {
                AlertSeverity::High
            } else {
                AlertSeverity::Medium
            };
            Some(Alert {
                point_id: p.id.clone(),
                species: p.species.clone(),
                ndvi_delta: delta,
                severity,
            })
        })
        .collect();
    out.sort_by(|a, b| a.ndvi_delta.total_cmp(&b.ndvi_delta));
    out
}
