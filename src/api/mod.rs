//! HTTP boundary to the monitoring backend.

pub mod geojson;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::form::ReportSubmission;
use crate::model::{
    AnalysisResult, CitizenReport, Coordinates, MonitoredPoint, Park, ReportStatus, SubmitAck,
    TimeseriesSample, sort_newest_first,
};

use geojson::id_string;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid API base URL: {0}")]
    BaseUrl(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server answered {status}{}", status_detail(.message))]
    Status { status: u16, message: Option<String> },

    #[error("server rejected the request: {0}")]
    Rejected(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

fn status_detail(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

/// Items that decoded, plus how many were skipped as malformed.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub items: Vec<T>,
    pub skipped: usize,
}

impl<T> Default for Decoded<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            skipped: 0,
        }
    }
}

/// Answer of the analysis-result endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisPoll {
    Complete(AnalysisResult),
    Pending,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    http: Client,
}

impl ApiClient {
    pub fn new(config: &AppConfig) -> Result<Self, ApiError> {
        let base = Url::parse(&config.api_base).map_err(|e| ApiError::BaseUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::BaseUrl(config.api_base.clone()));
        }
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { base, http })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // `new` rejects cannot-be-a-base URLs, so segments are always available.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").extend(segments);
        }
        url
    }

    async fn get_json(&self, segments: &[&str]) -> Result<Value, ApiError> {
        let url = self.endpoint(segments);
        debug!(%url, "GET");
        let response = self.http.get(url).send().await?;
        let response = ensure_success(response).await?;
        Ok(response.json::<Value>().await?)
    }

    /// Monitored points with their NDVI measurements.
    pub async fn ndvi_points(&self) -> Result<Decoded<MonitoredPoint>, ApiError> {
        let body = self.get_json(&["ndvi-points"]).await?;
        let decoded = geojson::decode_points(&body)?;
        info!(points = decoded.items.len(), skipped = decoded.skipped, "loaded NDVI points");
        Ok(decoded)
    }

    pub async fn parks(&self) -> Result<Decoded<Park>, ApiError> {
        let body = self.get_json(&["parks"]).await?;
        geojson::decode_parks(&body)
    }

    pub async fn timeseries(&self, park_id: &str) -> Result<Vec<TimeseriesSample>, ApiError> {
        let body = self.get_json(&["timeseries", park_id]).await?;
        let mut samples: Vec<TimeseriesSample> = serde_json::from_value(body)?;
        samples.sort_by_key(|s| s.date);
        Ok(samples)
    }

    pub async fn citizen_reports(&self) -> Result<Decoded<CitizenReport>, ApiError> {
        let body = self.get_json(&["citizen-reports"]).await?;
        let decoded = decode_reports(&body)?;
        info!(reports = decoded.items.len(), skipped = decoded.skipped, "loaded citizen reports");
        Ok(decoded)
    }

    /// Report history for one tree, newest first.
    ///
    /// A non-OK status is treated as "no history" rather than an error.
    pub async fn tree_reports(&self, tree_id: &str) -> Result<Vec<CitizenReport>, ApiError> {
        let url = self.endpoint(&["tree-reports", tree_id]);
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            debug!(tree_id, status = response.status().as_u16(), "no report history");
            return Ok(Vec::new());
        }
        let body = response.json::<Value>().await?;
        let mut reports = decode_reports(&body)?.items;
        sort_newest_first(&mut reports);
        Ok(reports)
    }

    /// Photo attached to a report, as raw image bytes.
    ///
    /// Accepts either a binary body or a JSON body carrying a base64 data URL.
    pub async fn image(&self, report_id: &str) -> Result<Vec<u8>, ApiError> {
        let url = self.endpoint(&["image", report_id]);
        let response = ensure_success(self.http.get(url).send().await?).await?;
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("json"));

        if !is_json {
            return Ok(response.bytes().await?.to_vec());
        }

        let body = response.json::<Value>().await?;
        let data_url = body["image_data"]
            .as_str()
            .ok_or_else(|| ApiError::Decode("image response without image_data".into()))?;
        decode_data_url(data_url)
    }

    pub async fn submit(&self, submission: &ReportSubmission) -> Result<SubmitAck, ApiError> {
        let url = self.endpoint(&["submit"]);
        let form = multipart_form(submission)?;
        info!(
            tree_id = submission.existing_tree_id.as_deref().unwrap_or("-"),
            severity = submission.severity,
            with_image = submission.image.is_some(),
            "submitting citizen report"
        );
        let response = ensure_success(self.http.post(url).multipart(form).send().await?).await?;
        let wire: SubmitWire = response.json().await?;

        if wire.success == Some(false) || wire.error.is_some() {
            return Err(ApiError::Rejected(
                wire.error.unwrap_or_else(|| "submission was not accepted".to_string()),
            ));
        }
        let report_id = wire
            .report_id
            .as_ref()
            .and_then(id_string)
            .ok_or_else(|| ApiError::Decode("acknowledgment without report_id".into()))?;

        Ok(SubmitAck {
            report_id,
            message: wire.message,
            estimated_analysis_time: wire.estimated_analysis_time,
        })
    }

    pub async fn analysis_result(&self, report_id: &str) -> Result<AnalysisPoll, ApiError> {
        let body = self.get_json(&["get_analysis_result", report_id]).await?;
        let wire: AnalysisWire = serde_json::from_value(body)?;
        if !wire.success.unwrap_or(true) || !wire.analysis_complete {
            return Ok(AnalysisPoll::Pending);
        }
        wire.result
            .map(AnalysisPoll::Complete)
            .ok_or_else(|| ApiError::Decode("analysis marked complete without a result".into()))
    }
}

async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| v["error"].as_str().map(str::to_string));
    warn!(status = status.as_u16(), ?message, "request failed");
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

fn multipart_form(submission: &ReportSubmission) -> Result<Form, ApiError> {
    let mut form = Form::new()
        .text("severity", submission.severity.to_string())
        .text("report_type", submission.report_type.clone())
        .text("description", submission.description.clone());

    if let Some(coords) = submission.coordinates {
        form = form
            .text("latitude", coords.lat.to_string())
            .text("longitude", coords.lon.to_string());
    }
    if let Some(tree_id) = &submission.existing_tree_id {
        form = form.text("existing_tree_id", tree_id.clone());
    }
    if let Some(image) = &submission.image {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.filename.clone())
            .mime_str(&image.mime)?;
        form = form.part("image", part);
    }
    Ok(form)
}

fn decode_data_url(data_url: &str) -> Result<Vec<u8>, ApiError> {
    let payload = match data_url.split_once(";base64,") {
        Some((_, payload)) => payload,
        None => data_url,
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|e| ApiError::Decode(format!("bad base64 image: {e}")))
}

#[derive(Debug, Deserialize)]
struct SubmitWire {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    report_id: Option<Value>,
    #[serde(default)]
    estimated_analysis_time: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnalysisWire {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    analysis_complete: bool,
    #[serde(default)]
    result: Option<AnalysisResult>,
}

#[derive(Debug, Deserialize)]
struct ReportWire {
    #[serde(default)]
    id: Value,
    #[serde(default, alias = "existing_tree_id")]
    tree_id: Value,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    severity: Option<i64>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "image_filename")]
    image_ref: Option<String>,
    #[serde(default)]
    report_type: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    tree_species: Option<String>,
    #[serde(default)]
    species_confidence: Option<f64>,
    #[serde(default)]
    health_score: Option<f64>,
    #[serde(default)]
    health_status: Option<String>,
}

impl TryFrom<ReportWire> for CitizenReport {
    type Error = String;

    fn try_from(wire: ReportWire) -> Result<Self, Self::Error> {
        let id = id_string(&wire.id).ok_or("report has no id")?;
        let severity = wire
            .severity
            .filter(|s| (1..=5).contains(s))
            .ok_or("severity missing or outside 1-5")? as u8;
        let status = match wire.status.as_deref() {
            None => ReportStatus::Submitted,
            Some(raw) => ReportStatus::parse(raw).ok_or_else(|| format!("unknown status {raw:?}"))?,
        };
        let coordinates = match (wire.latitude, wire.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)).filter(Coordinates::in_wgs84_range),
            _ => None,
        };

        Ok(CitizenReport {
            id,
            tree_id: id_string(&wire.tree_id),
            coordinates,
            severity,
            description: wire.description.filter(|d| !d.is_empty()),
            image_ref: wire.image_ref,
            report_type: wire.report_type,
            status,
            timestamp: wire.timestamp,
            ai_prediction: wire.tree_species,
            ai_confidence: wire.species_confidence,
            health_score: wire.health_score,
            health_status: wire.health_status,
        })
    }
}

/// Decodes a JSON array of report objects, skipping malformed entries.
pub fn decode_reports(body: &Value) -> Result<Decoded<CitizenReport>, ApiError> {
    let entries = body
        .as_array()
        .ok_or_else(|| ApiError::Decode("expected an array of reports".into()))?;

    let mut decoded = Decoded::default();
    for (index, entry) in entries.iter().enumerate() {
        let report = serde_json::from_value::<ReportWire>(entry.clone())
            .map_err(|e| e.to_string())
            .and_then(CitizenReport::try_from);
        match report {
            Ok(report) => decoded.items.push(report),
            Err(reason) => {
                warn!(index, %reason, "skipping malformed report");
                decoded.skipped += 1;
            }
        }
    }
    Ok(decoded)
}
