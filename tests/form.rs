use std::future::Future;
use std::io::Cursor;
use std::time::Duration;

use canopy_watch::config::RetryPolicy;
use canopy_watch::form::location::{FixedLocation, acquire};
use canopy_watch::form::{
    FormController, FormStatus, GeolocationError, ImagePreview, LocationMode, LocationProvider,
    ValidationError,
};
use canopy_watch::layers::{LayerName, ScreenPoint, ScreenSize};
use canopy_watch::lifecycle::TrackingStatus;
use canopy_watch::model::{Coordinates, SubmitAck};

fn form() -> FormController {
    FormController::new(Coordinates::new(35.68, 139.76))
}

fn ack() -> SubmitAck {
    SubmitAck {
        report_id: "rep-1".to_string(),
        message: Some("Report received".to_string()),
        estimated_analysis_time: None,
    }
}

fn png_preview() -> ImagePreview {
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image::RgbaImage::new(8, 8))
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    ImagePreview::from_bytes("bark.png", bytes).expect("preview")
}

#[test]
fn new_tree_report_requires_location() {
    let mut form = form();
    assert_eq!(form.begin_submit(), Err(ValidationError::MissingLocation));
    assert!(!form.is_submitting());
    assert!(matches!(form.status(), Some(FormStatus::Error(_))));
}

#[test]
fn out_of_range_location_is_rejected() {
    let mut form = form();
    form.apply_device_location(Ok(Coordinates::new(91.0, 10.0)));
    assert_eq!(
        form.validate(),
        Err(ValidationError::OutOfRange(Coordinates::new(91.0, 10.0)))
    );
}

#[test]
fn follow_up_skips_location_and_sends_none() {
    let mut form = form();
    form.start_follow_up("T-42");
    assert!(!form.requires_location());

    let submission = form.begin_submit().expect("follow-up is valid without a location");
    assert_eq!(submission.existing_tree_id.as_deref(), Some("T-42"));
    assert_eq!(submission.coordinates, None);
    assert!(form.is_submitting());
}

#[test]
fn map_pick_sets_coordinates_from_click() {
    let mut form = form();
    form.set_mode(LocationMode::MapPick);
    let picker = form.picker_mut().expect("picker");
    picker.surface_mut().resize(ScreenSize::new(400.0, 300.0));

    let picked = form
        .pick_on_map(ScreenPoint::new(200.0, 150.0))
        .expect("click on open picker");
    assert!((picked.lat - 35.68).abs() < 1e-9);
    assert!((picked.lon - 139.76).abs() < 1e-9);
    assert_eq!(form.coordinates(), Some(picked));

    form.pick(Coordinates::new(35.7, 139.8));
    let surface = form.picker().expect("picker").surface();
    assert_eq!(surface.overlay_count(LayerName::LocationPicker), 1);
}

#[test]
fn success_resets_values_and_picker_marker() {
    let mut form = form();
    form.set_mode(LocationMode::MapPick);
    form.pick(Coordinates::new(35.7, 139.8));
    form.set_severity(5);
    form.set_description("  bark split  ");
    form.attach_preview(png_preview());

    let submission = form.begin_submit().expect("valid");
    assert_eq!(submission.description, "bark split");
    assert_eq!(submission.image.as_ref().map(|i| i.mime.as_str()), Some("image/png"));

    let lifecycle = form.submit_succeeded(&submission, ack(), RetryPolicy::default());
    assert_eq!(lifecycle.report_id(), "rep-1");
    assert_eq!(lifecycle.status(), TrackingStatus::Pending);
    assert_eq!(lifecycle.report().image_ref.as_deref(), Some("bark.png"));

    assert_eq!(form.coordinates(), None);
    assert_eq!(form.severity(), 3);
    assert_eq!(form.description(), "");
    assert!(form.preview().is_none());
    assert!(!form.is_submitting());
    assert_eq!(form.status(), Some(&FormStatus::Info("Report received".to_string())));
    let surface = form.picker().expect("picker stays open").surface();
    assert_eq!(surface.overlay_count(LayerName::LocationPicker), 0);
}

#[test]
fn failure_keeps_entered_values() {
    let mut form = form();
    form.apply_device_location(Ok(Coordinates::new(35.0, 139.0)));
    form.set_severity(4);
    form.set_description("fungus at base");
    form.begin_submit().expect("valid");

    form.submit_failed("backend unreachable");

    assert!(!form.is_submitting());
    assert_eq!(form.coordinates(), Some(Coordinates::new(35.0, 139.0)));
    assert_eq!(form.severity(), 4);
    assert_eq!(form.description(), "fungus at base");
    assert!(matches!(form.status(), Some(FormStatus::Error(msg)) if msg.contains("backend unreachable")));
}

#[test]
fn switching_modes_drops_the_abandoned_position() {
    let mut form = form();
    form.set_mode(LocationMode::MapPick);
    form.pick(Coordinates::new(35.70, 139.70)).expect("picker open");

    form.set_mode(LocationMode::CurrentDevice);
    form.apply_device_location(Err(GeolocationError::PermissionDenied));

    assert!(form.picker().is_none());
    assert_eq!(form.coordinates(), None);
    assert_eq!(form.validate(), Err(ValidationError::MissingLocation));

    form.apply_device_location(Ok(Coordinates::new(35.0, 139.0)));
    form.set_mode(LocationMode::MapPick);
    assert_eq!(form.coordinates(), None);
    let picker = form.picker().expect("fresh picker").surface();
    assert_eq!(picker.overlay_count(LayerName::LocationPicker), 0);
}

struct Never;

impl LocationProvider for Never {
    fn locate(&self) -> impl Future<Output = Result<Coordinates, GeolocationError>> + Send {
        std::future::pending()
    }
}

#[tokio::test(start_paused = true)]
async fn lookup_is_bounded_by_timeout() {
    let result = acquire(&Never, Duration::from_secs(10)).await;
    assert_eq!(result, Err(GeolocationError::Timeout));
}

#[tokio::test]
async fn fixed_provider_answers_or_reports_unavailable() {
    let here = Coordinates::new(35.6, 139.7);
    assert_eq!(acquire(&FixedLocation(Some(here)), Duration::from_secs(1)).await, Ok(here));
    assert_eq!(
        acquire(&FixedLocation(None), Duration::from_secs(1)).await,
        Err(GeolocationError::PositionUnavailable)
    );
    assert_eq!(
        acquire(&FixedLocation(Some(Coordinates::new(0.0, 200.0))), Duration::from_secs(1)).await,
        Err(GeolocationError::PositionUnavailable)
    );
}
