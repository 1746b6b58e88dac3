//! Everything one running client knows: the loaded dataset, what is on the
//! map, which point is displayed, and which requests are still worth
//! applying when they come back.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::Decoded;
use crate::classify::{Alert, DatasetStats, alerts};
use crate::config::AppConfig;
use crate::form::FormController;
use crate::layers::{LayerManager, LayerName, MapView};
use crate::lifecycle::{LifecycleEffect, PollOutcome, ReportLifecycle};
use crate::model::{CitizenReport, MonitoredPoint};
use crate::spatial::{NavigationState, Navigator, Neighbor, RebuildTicket, build_neighbors};

/// Tag carried by an in-flight request so its response can be matched to the latest ask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTag {
    target: String,
    seq: u64,
}

impl RequestTag {
    pub fn target(&self) -> &str {
        &self.target
    }
}

/// Latest-wins bookkeeping per request target.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: HashMap<String, u64>,
    next_seq: u64,
}

impl RequestTracker {
    pub fn issue(&mut self, target: impl Into<String>) -> RequestTag {
        self.next_seq += 1;
        let target = target.into();
        self.latest.insert(target.clone(), self.next_seq);
        RequestTag {
            target,
            seq: self.next_seq,
        }
    }

    pub fn is_current(&self, tag: &RequestTag) -> bool {
        self.latest.get(&tag.target) == Some(&tag.seq)
    }

    /// Consumes `tag` if it is current. Returns whether the response should be applied.
    pub fn complete(&mut self, tag: &RequestTag) -> bool {
        if !self.is_current(tag) {
            return false;
        }
        self.latest.remove(&tag.target);
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPanel {
    pub tree_id: String,
    pub loading: bool,
    pub reports: Vec<CitizenReport>,
}

/// Work a caller must start after the session handled a poll result.
#[derive(Debug, Clone, PartialEq)]
pub enum FollowUp {
    ReloadReports,
    ReloadHistory(String),
}

pub struct Session {
    config: AppConfig,
    dataset: Vec<Arc<MonitoredPoint>>,
    skipped_features: usize,
    stats: DatasetStats,
    navigator: Navigator,
    map: LayerManager<MapView>,
    displayed: Option<Arc<MonitoredPoint>>,
    reports: Vec<CitizenReport>,
    history: Option<HistoryPanel>,
    requests: RequestTracker,
    tracked: Vec<ReportLifecycle>,
    notices: Vec<String>,
    form: FormController,
    banner: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("points", &self.dataset.len())
            .field("reports", &self.reports.len())
            .field("displayed", &self.displayed.as_ref().map(|p| p.id.as_str()))
            .field("tracked", &self.tracked.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(config: AppConfig) -> Self {
        let map = LayerManager::new(MapView::new(config.map_center)).with_fit_padding(config.fit_padding);
        let form = FormController::new(config.map_center);
        Self {
            config,
            dataset: Vec::new(),
            skipped_features: 0,
            stats: DatasetStats::default(),
            navigator: Navigator::new(),
            map,
            displayed: None,
            reports: Vec::new(),
            history: None,
            requests: RequestTracker::default(),
            tracked: Vec::new(),
            notices: Vec::new(),
            form,
            banner: None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Replaces the dataset wholesale and re-derives everything built from it.
    pub fn load_dataset(&mut self, decoded: Decoded<MonitoredPoint>) {
        self.dataset = decoded.items.into_iter().map(Arc::new).collect();
        self.skipped_features = decoded.skipped;
        self.stats = DatasetStats::from_points(self.dataset.iter().map(Arc::as_ref));
        self.map.set_layer(LayerName::Points, self.dataset.iter());
        self.banner = None;
        info!(points = self.dataset.len(), skipped = self.skipped_features, "dataset loaded");

        match self.displayed.clone() {
            Some(displayed) => {
                // Same id in the new data wins; otherwise keep the old record as a synthetic reference.
                let reference = self
                    .point(&displayed.id)
                    .cloned()
                    .unwrap_or(displayed);
                self.displayed = Some(Arc::clone(&reference));
                self.navigator.rebuild_now(&self.dataset, &reference);
            }
            None => self.navigator.clear(),
        }
    }

    /// Records a failed primary load; the previous dataset stays in place.
    pub fn load_failed(&mut self, error: impl fmt::Display) {
        warn!(%error, "dataset load failed");
        self.banner = Some(format!("Could not load monitoring data: {error}"));
    }

    pub fn load_reports(&mut self, reports: Vec<CitizenReport>) {
        self.map.set_layer(LayerName::Reports, reports.iter());
        self.reports = reports;
    }

    pub fn dataset(&self) -> &[Arc<MonitoredPoint>] {
        &self.dataset
    }

    pub fn skipped_features(&self) -> usize {
        self.skipped_features
    }

    pub fn point(&self, id: &str) -> Option<&Arc<MonitoredPoint>> {
        self.dataset.iter().find(|p| p.id == id)
    }

    pub fn stats(&self) -> &DatasetStats {
        &self.stats
    }

    pub fn alerts(&self, threshold: f64) -> Vec<Alert> {
        alerts(self.dataset.iter().map(Arc::as_ref), threshold)
    }

    pub fn reports(&self) -> &[CitizenReport] {
        &self.reports
    }

    pub fn map(&self) -> &LayerManager<MapView> {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut LayerManager<MapView> {
        &mut self.map
    }

    pub fn form(&self) -> &FormController {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormController {
        &mut self.form
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    pub fn displayed(&self) -> Option<&Arc<MonitoredPoint>> {
        self.displayed.as_ref()
    }

    pub fn navigation(&self) -> Option<&NavigationState> {
        self.navigator.state()
    }

    pub fn is_rebuilding(&self) -> bool {
        self.navigator.is_rebuilding()
    }

    /// Selects `point_id` and orders its neighbours in the same turn.
    pub fn select(&mut self, point_id: &str) -> Option<&Neighbor> {
        let reference = Arc::clone(self.point(point_id)?);
        self.displayed = Some(Arc::clone(&reference));
        self.navigator.rebuild_now(&self.dataset, &reference);
        self.navigator.current()
    }

    /// First half of a deferred selection. The ordering is built by the
    /// caller (off the UI thread) and handed back to [`Self::finish_selection`].
    pub fn begin_selection(
        &mut self,
        point_id: &str,
    ) -> Option<(RebuildTicket, Vec<Arc<MonitoredPoint>>, Arc<MonitoredPoint>)> {
        let reference = Arc::clone(self.point(point_id)?);
        self.displayed = Some(Arc::clone(&reference));
        let ticket = self.navigator.begin_rebuild(reference.id.clone());
        Some((ticket, self.dataset.clone(), reference))
    }

    pub fn finish_selection(&mut self, ticket: &RebuildTicket, state: NavigationState) -> bool {
        self.navigator.finish_rebuild(ticket, state)
    }

    /// Gives up on a deferred selection whose ordering could not be built.
    pub fn abandon_selection(&mut self, ticket: &RebuildTicket) -> bool {
        self.navigator.abandon_rebuild(ticket)
    }

    /// Steps to the next neighbour and displays it. No-op while a rebuild is in flight.
    pub fn step_next(&mut self) -> Option<Arc<MonitoredPoint>> {
        let point = Arc::clone(&self.navigator.next()?.point);
        self.displayed = Some(Arc::clone(&point));
        Some(point)
    }

    pub fn step_previous(&mut self) -> Option<Arc<MonitoredPoint>> {
        let point = Arc::clone(&self.navigator.previous()?.point);
        self.displayed = Some(Arc::clone(&point));
        Some(point)
    }

    pub fn clear_selection(&mut self) {
        self.displayed = None;
        self.history = None;
        self.navigator.clear();
    }

    /// Opens the history panel for `tree_id` and tags the fetch that will fill it.
    pub fn request_history(&mut self, tree_id: &str) -> RequestTag {
        self.history = Some(HistoryPanel {
            tree_id: tree_id.to_string(),
            loading: true,
            reports: Vec::new(),
        });
        self.requests.issue(format!("history:{tree_id}"))
    }

    /// Applies a history response if it is the latest for a tree still on display.
    pub fn apply_history<E: fmt::Display>(
        &mut self,
        tag: &RequestTag,
        result: Result<Vec<CitizenReport>, E>,
    ) -> bool {
        if !self.requests.complete(tag) {
            debug!(target = tag.target(), "discarding superseded history response");
            return false;
        }
        let Some(panel) = self.history.as_mut() else {
            return false;
        };
        if tag.target() != format!("history:{}", panel.tree_id) {
            debug!(target = tag.target(), "discarding history for a tree no longer displayed");
            return false;
        }

        panel.loading = false;
        panel.reports = match result {
            Ok(reports) => reports,
            Err(error) => {
                warn!(tree_id = %panel.tree_id, %error, "history fetch failed; showing none");
                Vec::new()
            }
        };
        true
    }

    pub fn history(&self) -> Option<&HistoryPanel> {
        self.history.as_ref()
    }

    pub fn track(&mut self, lifecycle: ReportLifecycle) {
        self.tracked.retain(|l| l.report_id() != lifecycle.report_id());
        self.tracked.push(lifecycle);
    }

    /// Starts tracking a report the backend just accepted.
    ///
    /// The reports layer is always reloaded. A follow-up on the tree whose
    /// history is open also reloads that history, so the new entry shows up
    /// whether or not its analysis ever completes.
    pub fn report_accepted(&mut self, lifecycle: ReportLifecycle) -> Vec<FollowUp> {
        let mut follow_ups = vec![FollowUp::ReloadReports];
        if let Some(tree_id) = lifecycle.tree_id() {
            if self.history.as_ref().is_some_and(|h| h.tree_id == tree_id) {
                follow_ups.push(FollowUp::ReloadHistory(tree_id.to_string()));
            }
        }
        self.track(lifecycle);
        follow_ups
    }

    pub fn tracked(&self) -> &[ReportLifecycle] {
        &self.tracked
    }

    pub fn lifecycle(&self, report_id: &str) -> Option<&ReportLifecycle> {
        self.tracked.iter().find(|l| l.report_id() == report_id)
    }

    /// Feeds one poll result into the matching lifecycle and translates its effects.
    pub fn apply_poll(&mut self, report_id: &str, outcome: PollOutcome) -> Vec<FollowUp> {
        let Some(lifecycle) = self.tracked.iter_mut().find(|l| l.report_id() == report_id) else {
            debug!(report_id, "poll result for an untracked report");
            return Vec::new();
        };

        let mut follow_ups = Vec::new();
        for effect in lifecycle.apply(outcome) {
            match effect {
                LifecycleEffect::ShowSummary(summary) => self.notices.push(summary),
                LifecycleEffect::ShowStillAnalyzing => self.notices.push(format!(
                    "Report {report_id} is still being analyzed. Check back later."
                )),
                LifecycleEffect::RefreshReportLayer => follow_ups.push(FollowUp::ReloadReports),
                LifecycleEffect::RefreshHistory(tree_id) => {
                    let on_display = self.history.as_ref().is_some_and(|h| h.tree_id == tree_id);
                    if on_display {
                        follow_ups.push(FollowUp::ReloadHistory(tree_id));
                    }
                }
            }
        }
        follow_ups
    }

    /// Messages produced by finished analyses, oldest first.
    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    pub fn dismiss_notice(&mut self, index: usize) {
        if index < self.notices.len() {
            self.notices.remove(index);
        }
    }
}

/// Builds the neighbour ordering for a deferred selection on the blocking pool.
pub async fn build_neighbors_blocking(
    dataset: Vec<Arc<MonitoredPoint>>,
    reference: Arc<MonitoredPoint>,
) -> Option<NavigationState> {
    tokio::task::spawn_blocking(move || build_neighbors(&dataset, &reference))
        .await
        .ok()
}
