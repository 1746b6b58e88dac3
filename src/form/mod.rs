//! State of the report form: location choice, optional photo, validation,
//! and the hand-off to analysis tracking once the backend accepts a report.
//!
//! The map-pick location mode owns a dedicated picker map. It is created the
//! first time the mode is entered after being absent, and dropped as soon as
//! the mode is left, so at most one picker exists at a time.

pub mod location;
pub mod preview;

use std::fmt;

use tracing::{debug, info};

use crate::config::RetryPolicy;
use crate::layers::{LayerManager, LayerName, MapView, PickedLocation, ScreenPoint};
use crate::lifecycle::ReportLifecycle;
use crate::model::{Coordinates, SubmitAck};

pub use location::{GeolocationError, LocationMode, LocationProvider};
pub use preview::{Attachment, ImagePreview, PreviewError};

pub const DEFAULT_REPORT_TYPE: &str = "health-check";
pub const SEVERITY_RANGE: std::ops::RangeInclusive<u8> = 1..=5;
const DEFAULT_SEVERITY: u8 = 3;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Choose a location: use your current position or pick a point on the map.")]
    MissingLocation,

    #[error("Location {0} is outside the valid latitude/longitude range.")]
    OutOfRange(Coordinates),

    #[error("Severity must be between 1 and 5 (got {0}).")]
    Severity(u8),
}

/// A validated report, ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSubmission {
    pub existing_tree_id: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub severity: u8,
    pub report_type: String,
    pub description: String,
    pub image: Option<Attachment>,
}

/// Inline status line under the form.
#[derive(Debug, Clone, PartialEq)]
pub enum FormStatus {
    Info(String),
    Error(String),
}

impl fmt::Display for FormStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormStatus::Info(text) | FormStatus::Error(text) => f.write_str(text),
        }
    }
}

#[derive(Debug)]
pub struct FormController {
    picker_center: Coordinates,
    mode: LocationMode,
    coordinates: Option<Coordinates>,
    existing_tree_id: Option<String>,
    severity: u8,
    report_type: String,
    description: String,
    preview: Option<ImagePreview>,
    status: Option<FormStatus>,
    submitting: bool,
    picker: Option<LayerManager<MapView>>,
    pickers_created: u64,
}

impl FormController {
    pub fn new(picker_center: Coordinates) -> Self {
        Self {
            picker_center,
            mode: LocationMode::default(),
            coordinates: None,
            existing_tree_id: None,
            severity: DEFAULT_SEVERITY,
            report_type: DEFAULT_REPORT_TYPE.to_string(),
            description: String::new(),
            preview: None,
            status: None,
            submitting: false,
            picker: None,
            pickers_created: 0,
        }
    }

    pub fn mode(&self) -> LocationMode {
        self.mode
    }

    /// Switches the location mode, creating or dropping the picker map.
    ///
    /// A position acquired in one mode never carries over into the other.
    pub fn set_mode(&mut self, mode: LocationMode) {
        let previous = if mode != self.mode {
            self.status = None;
            self.coordinates.take()
        } else {
            self.coordinates
        };
        self.mode = mode;
        match mode {
            LocationMode::MapPick => {
                if self.picker.is_none() {
                    // Start near the last chosen position, else the map default.
                    let center = previous.unwrap_or(self.picker_center);
                    self.picker = Some(LayerManager::new(MapView::new(center)));
                    self.pickers_created += 1;
                    debug!(instance = self.pickers_created, "picker map created");
                }
            }
            LocationMode::CurrentDevice => {
                if self.picker.take().is_some() {
                    debug!("picker map dropped");
                }
            }
        }
    }

    pub fn picker(&self) -> Option<&LayerManager<MapView>> {
        self.picker.as_ref()
    }

    pub fn picker_mut(&mut self) -> Option<&mut LayerManager<MapView>> {
        self.picker.as_mut()
    }

    /// How many picker maps have been created over the form's lifetime.
    pub fn pickers_created(&self) -> u64 {
        self.pickers_created
    }

    /// Handles a click on the picker map. Ignored when no picker is open.
    pub fn pick_on_map(&mut self, point: ScreenPoint) -> Option<Coordinates> {
        let position = self.picker.as_ref()?.surface().unproject(point);
        self.pick(position)
    }

    /// Places the picker marker at `position`. Ignored when no picker is open.
    pub fn pick(&mut self, position: Coordinates) -> Option<Coordinates> {
        let picker = self.picker.as_mut()?;
        picker.set_layer(LayerName::LocationPicker, [PickedLocation(position)]);
        self.coordinates = Some(position);
        self.status = Some(FormStatus::Info(format!("Selected location: {position}")));
        Some(position)
    }

    /// Applies the result of a device-location lookup. Failures only set the status line.
    pub fn apply_device_location(&mut self, result: Result<Coordinates, GeolocationError>) {
        match result {
            Ok(position) => {
                self.coordinates = Some(position);
                self.status = Some(FormStatus::Info(format!("Current location: {position}")));
            }
            Err(err) => {
                info!(error = %err, "device location unavailable");
                self.status = Some(FormStatus::Error(err.to_string()));
            }
        }
    }

    /// Opens the form as a follow-up on an existing tree.
    pub fn start_follow_up(&mut self, tree_id: impl Into<String>) {
        self.existing_tree_id = Some(tree_id.into());
    }

    pub fn clear_follow_up(&mut self) {
        self.existing_tree_id = None;
    }

    pub fn existing_tree_id(&self) -> Option<&str> {
        self.existing_tree_id.as_deref()
    }

    /// Location fields are only shown for reports on new trees.
    pub fn requires_location(&self) -> bool {
        self.existing_tree_id.is_none()
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    pub fn set_severity(&mut self, severity: u8) {
        self.severity = severity;
    }

    pub fn severity(&self) -> u8 {
        self.severity
    }

    pub fn set_report_type(&mut self, report_type: impl Into<String>) {
        self.report_type = report_type.into();
    }

    pub fn report_type(&self) -> &str {
        &self.report_type
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn attach_preview(&mut self, preview: ImagePreview) {
        self.preview = Some(preview);
    }

    pub fn clear_image(&mut self) {
        self.preview = None;
    }

    pub fn preview(&self) -> Option<&ImagePreview> {
        self.preview.as_ref()
    }

    pub fn status(&self) -> Option<&FormStatus> {
        self.status.as_ref()
    }

    pub fn set_status(&mut self, status: FormStatus) {
        self.status = Some(status);
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Checks the current values. Location checks are skipped for follow-ups.
    pub fn validate(&self) -> Result<ReportSubmission, ValidationError> {
        if !SEVERITY_RANGE.contains(&self.severity) {
            return Err(ValidationError::Severity(self.severity));
        }

        let coordinates = if self.requires_location() {
            let position = self.coordinates.ok_or(ValidationError::MissingLocation)?;
            if !position.is_finite() || !position.in_wgs84_range() {
                return Err(ValidationError::OutOfRange(position));
            }
            Some(position)
        } else {
            None
        };

        Ok(ReportSubmission {
            existing_tree_id: self.existing_tree_id.clone(),
            coordinates,
            severity: self.severity,
            report_type: self.report_type.clone(),
            description: self.description.trim().to_string(),
            image: self.preview.as_ref().map(|p| p.attachment.clone()),
        })
    }

    /// Validates and disables the submit action until the request settles.
    pub fn begin_submit(&mut self) -> Result<ReportSubmission, ValidationError> {
        match self.validate() {
            Ok(submission) => {
                self.submitting = true;
                self.status = Some(FormStatus::Info("Submitting report...".to_string()));
                Ok(submission)
            }
            Err(err) => {
                self.status = Some(FormStatus::Error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Resets the form after the backend accepted `submission` and starts tracking it.
    pub fn submit_succeeded(
        &mut self,
        submission: &ReportSubmission,
        ack: SubmitAck,
        policy: RetryPolicy,
    ) -> ReportLifecycle {
        let message = ack
            .message
            .clone()
            .unwrap_or_else(|| "Report submitted. Analysis in progress.".to_string());
        let lifecycle = ReportLifecycle::from_submission(submission, ack, policy);
        self.reset();
        self.status = Some(FormStatus::Info(message));
        lifecycle
    }

    /// Keeps every entered value and re-enables submit.
    pub fn submit_failed(&mut self, reason: impl fmt::Display) {
        self.submitting = false;
        self.status = Some(FormStatus::Error(format!("Submission failed: {reason}")));
    }

    /// Clears entered values, the preview, and the picker marker.
    pub fn reset(&mut self) {
        self.coordinates = None;
        self.existing_tree_id = None;
        self.severity = DEFAULT_SEVERITY;
        self.report_type = DEFAULT_REPORT_TYPE.to_string();
        self.description.clear();
        self.preview = None;
        self.status = None;
        self.submitting = false;
        if let Some(picker) = self.picker.as_mut() {
            picker.teardown(LayerName::LocationPicker);
        }
    }
}
