//! Domain records consumed from the monitoring backend.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Planar distance in degree space.
    ///
    /// Only meaningful over city-sized areas; it is not a geodesic distance.
    pub fn planar_distance(&self, other: &Coordinates) -> f64 {
        let dlat = self.lat - other.lat;
        let dlon = self.lon - other.lon;
        (dlat * dlat + dlon * dlon).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    pub fn in_wgs84_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lon)
    }
}

/// A tree or park location carrying vegetation-index measurements.
///
/// Immutable for the session; a dataset refresh replaces the whole collection.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredPoint {
    pub id: String,
    pub tree_id: Option<String>,
    pub species: Option<String>,
    pub coordinates: Coordinates,
    pub ndvi_current: Option<f64>,
    pub ndvi_previous_year: Option<f64>,
    /// Upstream-computed `current - previous`; absence means no data.
    pub ndvi_delta: Option<f64>,
}

impl MonitoredPoint {
    /// Minimal point used when a selection refers to something not in the loaded dataset.
    pub fn placeholder(id: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            id: id.into(),
            tree_id: None,
            species: None,
            coordinates,
            ndvi_current: None,
            ndvi_previous_year: None,
            ndvi_delta: None,
        }
    }

    /// Identifier used for follow-up reports and history lookups.
    pub fn history_key(&self) -> &str {
        self.tree_id.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Submitted,
    Analyzing,
    Completed,
}

impl ReportStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ReportStatus::Submitted => "submitted",
            ReportStatus::Analyzing => "analyzing",
            ReportStatus::Completed => "completed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "submitted" => Some(ReportStatus::Submitted),
            "analyzing" | "analysing" => Some(ReportStatus::Analyzing),
            "completed" => Some(ReportStatus::Completed),
            _ => None,
        }
    }
}

/// A citizen observation as stored by the server.
///
/// The client never writes `status`; it only observes it.
#[derive(Debug, Clone, PartialEq)]
pub struct CitizenReport {
    pub id: String,
    /// Absent for reports that create a new point.
    pub tree_id: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub severity: u8,
    pub description: Option<String>,
    pub image_ref: Option<String>,
    pub report_type: Option<String>,
    pub status: ReportStatus,
    pub timestamp: Option<String>,
    pub ai_prediction: Option<String>,
    pub ai_confidence: Option<f64>,
    pub health_score: Option<f64>,
    pub health_status: Option<String>,
}

impl CitizenReport {
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }
}

/// Accepts `YYYY-MM-DD HH:MM:SS` (as stored by the backend) and RFC 3339.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_utc()))
}

/// Newest first; entries without a parsable timestamp go last, keeping their order.
pub fn sort_newest_first(reports: &mut [CitizenReport]) {
    reports.sort_by(|a, b| match (a.parsed_timestamp(), b.parsed_timestamp()) {
        (Some(ta), Some(tb)) => tb.cmp(&ta),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

/// Outcome of the server-side photo analysis.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub tree_species: Option<String>,
    #[serde(default)]
    pub species_confidence: Option<f64>,
    #[serde(default)]
    pub health_status: Option<String>,
    #[serde(default)]
    pub health_score: Option<f64>,
    #[serde(default)]
    pub issues_detected: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub analysis_date: Option<String>,
}

impl AnalysisResult {
    /// Multi-line summary shown once a report completes.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Species: {}\n",
            self.tree_species.as_deref().unwrap_or("unknown")
        ));
        match self.species_confidence {
            Some(c) => out.push_str(&format!("Confidence: {:.0}%\n", c * 100.0)),
            None => out.push_str("Confidence: --\n"),
        }
        match self.health_score {
            Some(score) => out.push_str(&format!(
                "Health score: {:.1} ({})\n",
                score,
                self.health_status.as_deref().unwrap_or("n/a")
            )),
            None => out.push_str("Health score: --\n"),
        }
        if self.issues_detected.is_empty() {
            out.push_str("Issues: none detected\n");
        } else {
            out.push_str("Issues:\n");
            for issue in &self.issues_detected {
                out.push_str(&format!("  - {issue}\n"));
            }
        }
        if !self.recommendations.is_empty() {
            out.push_str("Recommendations:\n");
            for rec in &self.recommendations {
                out.push_str(&format!("  - {rec}\n"));
            }
        }
        out
    }
}

/// Creation acknowledgment returned by the submit endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitAck {
    pub report_id: String,
    pub message: Option<String>,
    pub estimated_analysis_time: Option<String>,
}

/// Park polygon from the legacy park view, reduced to its centroid.
#[derive(Debug, Clone, PartialEq)]
pub struct Park {
    pub id: String,
    pub name: String,
    pub centroid: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TimeseriesSample {
    pub date: NaiveDate,
    pub ndvi: f64,
    pub ndre: f64,
    pub psri: f64,
}
