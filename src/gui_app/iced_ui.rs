use std::path::PathBuf;
use std::time::Duration;

use iced::widget::{
    Canvas, button, column, container, image, pane_grid, radio, row, scrollable, slider, text,
    text_input,
};
use iced::{Color, Element, Length, Size, Task};
use tracing::{debug, info, warn};

use super::map_canvas::{self, MapCanvas, MapEvent, to_color};
use crate::api::{ApiClient, Decoded};
use crate::chart::render_timeseries_rgba;
use crate::classify::{DEFAULT_ALERT_THRESHOLD, HealthCategory, classify_point};
use crate::config::AppConfig;
use crate::form::location::{self, FixedLocation};
use crate::form::preview::load_preview;
use crate::form::{FormStatus, GeolocationError, ImagePreview, LocationMode, ReportSubmission};
use crate::layers::MarkerKind;
use crate::lifecycle::{AnalysisSource, PollOutcome, TrackingStatus};
use crate::model::{CitizenReport, Coordinates, MonitoredPoint, Park, SubmitAck, TimeseriesSample};
use crate::session::{FollowUp, RequestTag, Session, build_neighbors_blocking};
use crate::spatial::{NavigationState, RebuildTicket};

const CHART_SIZE: (u32, u32) = (360, 180);

pub fn run_iced_app(config: AppConfig) -> iced::Result {
    iced::application(move || CanopyApp::new(config.clone()), CanopyApp::update, CanopyApp::view)
        .title("Canopy Watch")
        .window_size(Size::new(1280.0, 820.0))
        .run()
}

struct CanopyApp {
    session: Session,
    api: Option<ApiClient>,
    locator: FixedLocation,
    panes: pane_grid::State<Pane>,
    is_loading: bool,
    preview_handle: Option<image::Handle>,
    selected_report: Option<CitizenReport>,
    report_image: Option<image::Handle>,
    parks: Vec<Park>,
    selected_park: Option<String>,
    chart: Option<image::Handle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pane {
    Map,
    Details,
    Report,
}

#[derive(Debug, Clone)]
enum Message {
    Reload,
    DatasetLoaded(Result<Decoded<MonitoredPoint>, String>),
    ReportsLoaded(Result<Vec<CitizenReport>, String>),
    DismissBanner,
    MainMap(MapEvent),
    PickerMap(MapEvent),
    SelectionBuilt(RebuildTicket, Option<NavigationState>),
    NextNeighbor,
    PreviousNeighbor,
    HistoryLoaded(RequestTag, Result<Vec<CitizenReport>, String>),
    ReportImageLoaded(String, Result<Vec<u8>, String>),
    ModeChanged(LocationMode),
    DeviceLocated(Result<Coordinates, GeolocationError>),
    ReportTypeChanged(String),
    SeverityChanged(u8),
    DescriptionChanged(String),
    AttachPressed,
    FilePicked(Option<PathBuf>),
    PreviewLoaded(Result<ImagePreview, String>),
    ClearImage,
    FollowUpPressed,
    CancelFollowUp,
    SubmitPressed,
    Submitted(ReportSubmission, Result<SubmitAck, String>),
    Polled(String, PollOutcome),
    DismissNotice(usize),
    ParksLoaded(Result<Vec<Park>, String>),
    ParkSelected(String),
    TimeseriesLoaded(String, Result<Vec<TimeseriesSample>, String>),
    PaneResized(pane_grid::ResizeEvent),
}

impl CanopyApp {
    fn new(config: AppConfig) -> (Self, Task<Message>) {
        let (mut panes, map_pane) = pane_grid::State::new(Pane::Map);
        if let Some((details_pane, split)) = panes.split(pane_grid::Axis::Vertical, map_pane, Pane::Details) {
            panes.resize(split, 0.55);
            panes.split(pane_grid::Axis::Vertical, details_pane, Pane::Report);
        }

        let locator = FixedLocation(config.device_location);
        let mut session = Session::new(config.clone());
        let api = match ApiClient::new(&config) {
            Ok(api) => Some(api),
            Err(err) => {
                session.load_failed(&err);
                None
            }
        };

        let mut app = CanopyApp {
            session,
            api,
            locator,
            panes,
            is_loading: false,
            preview_handle: None,
            selected_report: None,
            report_image: None,
            parks: Vec::new(),
            selected_park: None,
            chart: None,
        };
        let boot = Task::batch([app.load_all(), app.locate_device(), app.load_parks()]);
        (app, boot)
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Reload => {
                self.session.dismiss_banner();
                self.load_all()
            }
            Message::DatasetLoaded(Ok(decoded)) => {
                self.is_loading = false;
                self.session.load_dataset(decoded);
                // A displayed point that survived the reload gets fresh history.
                match self.session.displayed().map(|p| p.history_key().to_string()) {
                    Some(key) => self.fetch_history(&key),
                    None => Task::none(),
                }
            }
            Message::DatasetLoaded(Err(err)) => {
                self.is_loading = false;
                self.session.load_failed(err);
                Task::none()
            }
            Message::ReportsLoaded(Ok(reports)) => {
                self.session.load_reports(reports);
                Task::none()
            }
            Message::ReportsLoaded(Err(err)) => {
                self.session.load_failed(err);
                Task::none()
            }
            Message::DismissBanner => {
                self.session.dismiss_banner();
                Task::none()
            }
            Message::MainMap(event) => {
                let Some(click) = map_canvas::apply(self.session.map_mut().surface_mut(), event) else {
                    return Task::none();
                };
                let Some(marker) = self.session.map().surface().marker_at(click).cloned() else {
                    return Task::none();
                };
                match marker.kind {
                    MarkerKind::MonitoredPoint => self.select_point(&marker.id),
                    MarkerKind::CitizenReport => self.show_report(&marker.id),
                    MarkerKind::PickedLocation => Task::none(),
                }
            }
            Message::PickerMap(event) => {
                let click = self
                    .session
                    .form_mut()
                    .picker_mut()
                    .and_then(|picker| map_canvas::apply(picker.surface_mut(), event));
                if let Some(point) = click {
                    self.session.form_mut().pick_on_map(point);
                }
                Task::none()
            }
            Message::SelectionBuilt(ticket, Some(state)) => {
                if !self.session.finish_selection(&ticket, state) {
                    debug!(reference = ticket.reference_id(), "selection superseded");
                }
                Task::none()
            }
            Message::SelectionBuilt(ticket, None) => {
                warn!(reference = ticket.reference_id(), "neighbor ordering task failed");
                self.session.abandon_selection(&ticket);
                Task::none()
            }
            Message::NextNeighbor => match self.session.step_next() {
                Some(point) => self.display_neighbor(&point),
                None => Task::none(),
            },
            Message::PreviousNeighbor => match self.session.step_previous() {
                Some(point) => self.display_neighbor(&point),
                None => Task::none(),
            },
            Message::HistoryLoaded(tag, result) => {
                self.session.apply_history(&tag, result);
                Task::none()
            }
            Message::ReportImageLoaded(report_id, result) => {
                let still_shown = self.selected_report.as_ref().is_some_and(|r| r.id == report_id);
                if still_shown {
                    self.report_image = result.ok().map(image::Handle::from_bytes);
                }
                Task::none()
            }
            Message::ModeChanged(mode) => {
                self.session.form_mut().set_mode(mode);
                match mode {
                    LocationMode::CurrentDevice => self.locate_device(),
                    LocationMode::MapPick => Task::none(),
                }
            }
            Message::DeviceLocated(result) => {
                if self.session.form().mode() == LocationMode::CurrentDevice {
                    self.session.form_mut().apply_device_location(result);
                }
                Task::none()
            }
            Message::ReportTypeChanged(value) => {
                self.session.form_mut().set_report_type(value);
                Task::none()
            }
            Message::SeverityChanged(value) => {
                self.session.form_mut().set_severity(value);
                Task::none()
            }
            Message::DescriptionChanged(value) => {
                self.session.form_mut().set_description(value);
                Task::none()
            }
            Message::AttachPressed => {
                let dialog = rfd::AsyncFileDialog::new()
                    .add_filter("Images", &["png", "jpg", "jpeg", "gif", "bmp", "webp"])
                    .pick_file();
                Task::perform(dialog, |result| {
                    Message::FilePicked(result.map(|file| file.path().to_path_buf()))
                })
            }
            Message::FilePicked(Some(path)) => Task::perform(
                async move { load_preview(path).await.map_err(|e| e.to_string()) },
                Message::PreviewLoaded,
            ),
            Message::FilePicked(None) => Task::none(),
            Message::PreviewLoaded(Ok(preview)) => {
                self.preview_handle = Some(image::Handle::from_rgba(
                    preview.thumbnail_width,
                    preview.thumbnail_height,
                    preview.pixels.clone(),
                ));
                self.session.form_mut().attach_preview(preview);
                Task::none()
            }
            Message::PreviewLoaded(Err(err)) => {
                self.session
                    .form_mut()
                    .set_status(FormStatus::Error(format!("Could not attach image: {err}")));
                Task::none()
            }
            Message::ClearImage => {
                self.preview_handle = None;
                self.session.form_mut().clear_image();
                Task::none()
            }
            Message::FollowUpPressed => {
                if let Some(key) = self.session.displayed().map(|p| p.history_key().to_string()) {
                    self.session.form_mut().start_follow_up(key);
                }
                Task::none()
            }
            Message::CancelFollowUp => {
                self.session.form_mut().clear_follow_up();
                Task::none()
            }
            Message::SubmitPressed => {
                if self.session.form().is_submitting() {
                    return Task::none();
                }
                let Some(api) = self.api.clone() else {
                    return Task::none();
                };
                match self.session.form_mut().begin_submit() {
                    Ok(submission) => Task::perform(
                        async move {
                            let result = api.submit(&submission).await.map_err(|e| e.to_string());
                            (submission, result)
                        },
                        |(submission, result)| Message::Submitted(submission, result),
                    ),
                    Err(_) => Task::none(),
                }
            }
            Message::Submitted(submission, Ok(ack)) => {
                let policy = self.session.config().retry;
                let lifecycle = self.session.form_mut().submit_succeeded(&submission, ack, policy);
                self.preview_handle = None;
                let report_id = lifecycle.report_id().to_string();
                let delay = lifecycle.next_poll_delay();
                let follow_ups = self.session.report_accepted(lifecycle);
                let mut tasks = self.run_follow_ups(follow_ups);
                tasks.push(self.schedule_poll(report_id, delay));
                Task::batch(tasks)
            }
            Message::Submitted(_, Err(err)) => {
                self.session.form_mut().submit_failed(err);
                Task::none()
            }
            Message::Polled(report_id, outcome) => {
                let follow_ups = self.session.apply_poll(&report_id, outcome);
                let mut tasks = self.run_follow_ups(follow_ups);
                let delay = self
                    .session
                    .lifecycle(&report_id)
                    .and_then(|l| l.next_poll_delay());
                tasks.push(self.schedule_poll(report_id, delay));
                Task::batch(tasks)
            }
            Message::DismissNotice(index) => {
                self.session.dismiss_notice(index);
                Task::none()
            }
            Message::ParksLoaded(Ok(parks)) => {
                self.parks = parks;
                Task::none()
            }
            Message::ParksLoaded(Err(err)) => {
                // Park mode is optional; log and move on.
                info!(error = %err, "park list unavailable");
                Task::none()
            }
            Message::ParkSelected(park_id) => {
                self.selected_park = Some(park_id.clone());
                self.chart = None;
                let Some(api) = self.api.clone() else {
                    return Task::none();
                };
                let id = park_id.clone();
                Task::perform(
                    async move { api.timeseries(&id).await.map_err(|e| e.to_string()) },
                    move |result| Message::TimeseriesLoaded(park_id, result),
                )
            }
            Message::TimeseriesLoaded(park_id, result) => {
                if self.selected_park.as_deref() != Some(park_id.as_str()) {
                    return Task::none();
                }
                let (width, height) = CHART_SIZE;
                self.chart = result
                    .ok()
                    .and_then(|samples| render_timeseries_rgba(width, height, &samples).ok())
                    .map(|pixels| image::Handle::from_rgba(width, height, pixels));
                Task::none()
            }
            Message::PaneResized(event) => {
                self.panes.resize(event.split, event.ratio);
                Task::none()
            }
        }
    }

    fn load_all(&mut self) -> Task<Message> {
        if self.is_loading {
            return Task::none();
        }
        let Some(api) = self.api.clone() else {
            return Task::none();
        };
        self.is_loading = true;
        let points = Task::perform(
            async move { api.ndvi_points().await.map_err(|e| e.to_string()) },
            Message::DatasetLoaded,
        );
        Task::batch([points, self.load_reports()])
    }

    fn load_reports(&self) -> Task<Message> {
        let Some(api) = self.api.clone() else {
            return Task::none();
        };
        Task::perform(
            async move {
                api.citizen_reports()
                    .await
                    .map(|decoded| decoded.items)
                    .map_err(|e| e.to_string())
            },
            Message::ReportsLoaded,
        )
    }

    fn load_parks(&self) -> Task<Message> {
        let Some(api) = self.api.clone() else {
            return Task::none();
        };
        Task::perform(
            async move { api.parks().await.map(|d| d.items).map_err(|e| e.to_string()) },
            Message::ParksLoaded,
        )
    }

    fn locate_device(&self) -> Task<Message> {
        let locator = self.locator;
        let timeout = self.session.config().geolocation_timeout;
        Task::perform(
            async move { location::acquire(&locator, timeout).await },
            Message::DeviceLocated,
        )
    }

    fn select_point(&mut self, point_id: &str) -> Task<Message> {
        let Some((ticket, dataset, reference)) = self.session.begin_selection(point_id) else {
            return Task::none();
        };
        let history = self.fetch_history(reference.history_key());
        let rebuild = Task::perform(build_neighbors_blocking(dataset, reference), move |state| {
            Message::SelectionBuilt(ticket, state)
        });
        Task::batch([rebuild, history])
    }

    fn display_neighbor(&mut self, point: &MonitoredPoint) -> Task<Message> {
        self.session.map_mut().surface_mut().recenter(point.coordinates);
        self.fetch_history(point.history_key())
    }

    fn show_report(&mut self, report_id: &str) -> Task<Message> {
        let Some(report) = self.session.reports().iter().find(|r| r.id == report_id).cloned() else {
            return Task::none();
        };
        self.report_image = None;
        let has_image = report.image_ref.is_some();
        self.selected_report = Some(report);
        match (&self.api, has_image) {
            (Some(api), true) => {
                let api = api.clone();
                let id = report_id.to_string();
                let fetch_id = id.clone();
                Task::perform(
                    async move { api.image(&fetch_id).await.map_err(|e| e.to_string()) },
                    move |result| Message::ReportImageLoaded(id, result),
                )
            }
            _ => Task::none(),
        }
    }

    fn run_follow_ups(&mut self, follow_ups: Vec<FollowUp>) -> Vec<Task<Message>> {
        follow_ups
            .into_iter()
            .map(|follow_up| match follow_up {
                FollowUp::ReloadReports => self.load_reports(),
                FollowUp::ReloadHistory(tree_id) => self.fetch_history(&tree_id),
            })
            .collect()
    }

    fn fetch_history(&mut self, tree_id: &str) -> Task<Message> {
        let tag = self.session.request_history(tree_id);
        let Some(api) = self.api.clone() else {
            return Task::none();
        };
        let tree_id = tree_id.to_string();
        Task::perform(
            async move { api.tree_reports(&tree_id).await.map_err(|e| e.to_string()) },
            move |result| Message::HistoryLoaded(tag, result),
        )
    }

    fn schedule_poll(&self, report_id: String, delay: Option<Duration>) -> Task<Message> {
        let (Some(api), Some(delay)) = (self.api.clone(), delay) else {
            return Task::none();
        };
        let id = report_id.clone();
        Task::perform(
            async move {
                tokio::time::sleep(delay).await;
                api.fetch_analysis(&id).await
            },
            move |outcome| Message::Polled(report_id, outcome),
        )
    }

    fn view(&self) -> Element<'_, Message> {
        let panes = pane_grid::PaneGrid::new(&self.panes, |_, pane, _| match pane {
            Pane::Map => pane_grid::Content::new(self.map_section()),
            Pane::Details => pane_grid::Content::new(self.details_section()),
            Pane::Report => pane_grid::Content::new(self.report_section()),
        })
        .width(Length::Fill)
        .height(Length::Fill)
        .on_resize(10, Message::PaneResized);

        match self.session.banner() {
            Some(banner) => column![self.banner(banner), panes].into(),
            None => panes.into(),
        }
    }

    fn banner<'a>(&self, message: &'a str) -> Element<'a, Message> {
        container(
            row![
                text(message).size(14).width(Length::Fill),
                button(text("Reload")).on_press(Message::Reload),
                button(text("Dismiss")).on_press(Message::DismissBanner),
            ]
            .spacing(12),
        )
        .padding(10)
        .width(Length::Fill)
        .style(|_| container::Style {
            background: Some(Color::from_rgb8(120, 30, 30).into()),
            text_color: Some(Color::WHITE),
            ..Default::default()
        })
        .into()
    }

    fn map_section(&self) -> Element<'_, Message> {
        let highlighted = self.session.displayed().map(|p| p.id.as_str());
        let canvas = Canvas::new(MapCanvas {
            view: self.session.map().surface(),
            highlighted,
            on_event: Message::MainMap,
        })
        .width(Length::Fill)
        .height(Length::Fill);

        container(canvas)
            .width(Length::Fill)
            .height(Length::Fill)
            .clip(true)
            .into()
    }

    fn details_section(&self) -> Element<'_, Message> {
        let mut content = column![legend(" Statistics ", self.stats_view())].spacing(16);

        if let Some(point) = self.session.displayed() {
            content = content.push(legend(" Selected point ", self.point_view(point)));
        }
        if let Some(history) = self.session.history() {
            let body: Element<'_, Message> = if history.loading {
                text("Loading history...").size(12).into()
            } else if history.reports.is_empty() {
                text("No reports for this tree yet.").size(12).into()
            } else {
                column(history.reports.iter().map(report_line)).spacing(6).into()
            };
            content = content.push(legend(" Report history ", body));
        }
        if let Some(report) = &self.selected_report {
            let mut body = column![report_line(report)].spacing(8);
            if let Some(handle) = &self.report_image {
                body = body.push(image(handle.clone()).width(Length::Fixed(240.0)));
            }
            content = content.push(legend(" Citizen report ", body.into()));
        }
        if !self.parks.is_empty() {
            content = content.push(legend(" Parks ", self.parks_view()));
        }

        scrollable(container(content).padding(16).width(Length::Fill)).into()
    }

    fn stats_view(&self) -> Element<'_, Message> {
        let stats = self.session.stats();
        let mut lines = column![
            text(format!(
                "Points: {} ({} with data)",
                stats.total_points, stats.processed_points
            ))
            .size(13)
        ]
        .spacing(4);
        for category in HealthCategory::ALL {
            lines = lines.push(
                text(format!("{}: {}", category.label(), stats.count(category)))
                    .size(12)
                    .color(to_color(category.color())),
            );
        }
        if let Some(mean) = stats.mean_delta {
            lines = lines.push(text(format!("Mean NDVI change: {mean:+.3}")).size(12));
        }
        let alerts = self.session.alerts(DEFAULT_ALERT_THRESHOLD);
        if !alerts.is_empty() {
            lines = lines.push(text(format!("Alerts: {}", alerts.len())).size(12));
        }
        if self.session.skipped_features() > 0 {
            lines = lines.push(
                text(format!("{} malformed features skipped", self.session.skipped_features())).size(11),
            );
        }
        lines.into()
    }

    fn point_view<'a>(&'a self, point: &'a MonitoredPoint) -> Element<'a, Message> {
        let classification = classify_point(point);
        let fmt = |v: Option<f64>| v.map(|v| format!("{v:.3}")).unwrap_or_else(|| "--".to_string());

        let position = match self.session.navigation() {
            Some(nav) if !nav.is_empty() => format!("Neighbour {} of {}", nav.cursor() + 1, nav.len()),
            _ => "No neighbours".to_string(),
        };
        let stepping = !self.session.is_rebuilding();

        column![
            text(format!("ID: {}", point.id)).size(13),
            text(format!("Species: {}", point.species.as_deref().unwrap_or("unknown"))).size(12),
            text(format!(
                "NDVI: {}   previous year: {}",
                fmt(point.ndvi_current),
                fmt(point.ndvi_previous_year)
            ))
            .size(12),
            text(format!(
                "Change: {}  ({})",
                fmt(point.ndvi_delta),
                classification.category.label()
            ))
            .size(12)
            .color(to_color(classification.color)),
            text(position).size(12),
            row![
                button(text("Previous")).on_press_maybe(stepping.then_some(Message::PreviousNeighbor)),
                button(text("Next")).on_press_maybe(stepping.then_some(Message::NextNeighbor)),
                button(text("Report on this tree")).on_press(Message::FollowUpPressed),
            ]
            .spacing(8),
        ]
        .spacing(6)
        .into()
    }

    fn parks_view(&self) -> Element<'_, Message> {
        let mut body = column(self.parks.iter().map(|park| {
            let label = if self.selected_park.as_deref() == Some(park.id.as_str()) {
                format!("> {}", park.name)
            } else {
                park.name.clone()
            };
            button(text(label).size(12))
                .on_press(Message::ParkSelected(park.id.clone()))
                .width(Length::Fill)
                .into()
        }))
        .spacing(4);
        if let Some(chart) = &self.chart {
            body = body.push(text("NDVI (green), NDRE (blue), PSRI (orange)").size(11));
            body = body.push(image(chart.clone()));
        }
        body.into()
    }

    fn report_section(&self) -> Element<'_, Message> {
        let form = self.session.form();

        let location: Element<'_, Message> = match form.existing_tree_id() {
            Some(tree_id) => row![
                text(format!("Follow-up on tree {tree_id}")).size(13).width(Length::Fill),
                button(text("Cancel")).on_press(Message::CancelFollowUp),
            ]
            .spacing(8)
            .into(),
            None => {
                let mode = Some(form.mode());
                let mut body = column![
                    radio(
                        LocationMode::CurrentDevice.label(),
                        LocationMode::CurrentDevice,
                        mode,
                        Message::ModeChanged
                    ),
                    radio(
                        LocationMode::MapPick.label(),
                        LocationMode::MapPick,
                        mode,
                        Message::ModeChanged
                    ),
                ]
                .spacing(6);
                if let Some(picker) = form.picker() {
                    body = body.push(
                        Canvas::new(MapCanvas {
                            view: picker.surface(),
                            highlighted: None,
                            on_event: Message::PickerMap,
                        })
                        .width(Length::Fill)
                        .height(Length::Fixed(220.0)),
                    );
                }
                let chosen = form
                    .coordinates()
                    .map(|c| format!("Location: {c}"))
                    .unwrap_or_else(|| "Location: not set".to_string());
                body.push(text(chosen).size(12)).into()
            }
        };

        let mut attachment = column![
            row![
                button(text("Attach photo")).on_press(Message::AttachPressed),
                button(text("Remove")).on_press_maybe(form.preview().map(|_| Message::ClearImage)),
            ]
            .spacing(8)
        ]
        .spacing(6);
        if let (Some(handle), Some(preview)) = (&self.preview_handle, form.preview()) {
            attachment = attachment.push(image(handle.clone()));
            attachment = attachment.push(text(preview.caption()).size(11));
        }

        let submit_label = if form.is_submitting() { "Submitting..." } else { "Submit report" };
        let mut fields = column![
            location,
            text_input("Report type", form.report_type()).on_input(Message::ReportTypeChanged),
            text(format!("Severity: {}", form.severity())).size(12),
            slider(1..=5, form.severity(), Message::SeverityChanged),
            text_input("Description", form.description()).on_input(Message::DescriptionChanged),
            attachment,
            button(text(submit_label))
                .on_press_maybe((!form.is_submitting()).then_some(Message::SubmitPressed))
                .width(Length::Fill),
        ]
        .spacing(10);
        if let Some(status) = form.status() {
            let color = match status {
                FormStatus::Info(_) => Color::from_rgb8(200, 200, 200),
                FormStatus::Error(_) => Color::from_rgb8(240, 110, 110),
            };
            fields = fields.push(text(status.to_string()).size(12).color(color));
        }

        let mut content = column![legend(" New report ", fields.into())].spacing(16);

        if !self.session.tracked().is_empty() {
            let tracked = column(self.session.tracked().iter().map(|l| {
                let state = match l.status() {
                    TrackingStatus::Pending => format!("analyzing (poll {})", l.attempts()),
                    TrackingStatus::Completed => "analysis complete".to_string(),
                    TrackingStatus::TimedOut => "still analyzing, check later".to_string(),
                };
                text(format!("{}: {state}", l.report_id())).size(12).into()
            }))
            .spacing(4);
            content = content.push(legend(" Submitted reports ", tracked.into()));
        }

        if !self.session.notices().is_empty() {
            let notices = column(self.session.notices().iter().enumerate().map(|(i, notice)| {
                column![
                    text(notice.as_str()).size(12),
                    button(text("Dismiss").size(11)).on_press(Message::DismissNotice(i)),
                ]
                .spacing(4)
                .into()
            }))
            .spacing(10);
            content = content.push(legend(" Analysis results ", notices.into()));
        }

        scrollable(container(content).padding(16).width(Length::Fill)).into()
    }
}

fn report_line(report: &CitizenReport) -> Element<'_, Message> {
    let mut line = format!(
        "{}  {}  severity {}",
        report.timestamp.as_deref().unwrap_or("(no time)"),
        report.status.label(),
        report.severity
    );
    if let Some(species) = &report.ai_prediction {
        line.push_str(&format!("  {species}"));
    }
    if let Some(score) = report.health_score {
        line.push_str(&format!("  health {score:.1}"));
    }
    text(line).size(12).into()
}

/// Titled frame around a block, in the style of a fieldset legend.
fn legend<'a>(title: &'a str, body: Element<'a, Message>) -> Element<'a, Message> {
    column![
        container(text(title).size(12)),
        container(body)
            .padding(10)
            .width(Length::Fill)
            .style(|_| container::Style {
                border: iced::border::Border {
                    color: Color::from_rgb8(100, 100, 100),
                    width: 1.0,
                    radius: 4.0.into(),
                },
                ..Default::default()
            }),
    ]
    .spacing(0)
    .into()
}
