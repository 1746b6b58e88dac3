//! Client-side view of one submitted report's analysis.
//!
//! The server owns the report status. The client starts in `Submitted` after
//! the creation acknowledgment, infers `Analyzing` while no completed result
//! has been seen, and only moves to `Completed` after a result fetch that
//! says so. Polls follow a bounded backoff; once the budget is spent the
//! report is left in `TimedOut` ("still analyzing, check later").
//!
//! A failed result fetch and a "not complete yet" answer drive the same
//! transition. The failure is logged, never shown.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::api::{AnalysisPoll, ApiClient, ApiError};
use crate::config::RetryPolicy;
use crate::form::ReportSubmission;
use crate::model::{AnalysisResult, CitizenReport, ReportStatus, SubmitAck};

#[derive(Debug, Clone, PartialEq)]
pub enum ReportState {
    Submitted,
    Analyzing { attempts: u32 },
    Completed(AnalysisResult),
    TimedOut { attempts: u32 },
}

/// What the UI shows for a tracked report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingStatus {
    Pending,
    Completed,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Complete(AnalysisResult),
    NotReady,
    Failed(String),
}

impl From<Result<AnalysisPoll, ApiError>> for PollOutcome {
    fn from(result: Result<AnalysisPoll, ApiError>) -> Self {
        match result {
            Ok(AnalysisPoll::Complete(result)) => PollOutcome::Complete(result),
            Ok(AnalysisPoll::Pending) => PollOutcome::NotReady,
            Err(err) => PollOutcome::Failed(err.to_string()),
        }
    }
}

/// Side effects requested by a transition, carried out by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEffect {
    ShowSummary(String),
    RefreshReportLayer,
    /// Reload the report history of this tree.
    RefreshHistory(String),
    ShowStillAnalyzing,
}

#[derive(Debug, Clone)]
pub struct ReportLifecycle {
    report: CitizenReport,
    estimated_analysis_time: Option<String>,
    state: ReportState,
    policy: RetryPolicy,
    attempts: u32,
}

impl ReportLifecycle {
    /// Starts tracking after a successful creation acknowledgment.
    pub fn from_submission(submission: &ReportSubmission, ack: SubmitAck, policy: RetryPolicy) -> Self {
        info!(report_id = %ack.report_id, "report accepted, awaiting analysis");
        let report = CitizenReport {
            id: ack.report_id,
            tree_id: submission.existing_tree_id.clone(),
            coordinates: submission.coordinates,
            severity: submission.severity,
            description: Some(submission.description.clone()).filter(|d| !d.is_empty()),
            image_ref: submission.image.as_ref().map(|i| i.filename.clone()),
            report_type: Some(submission.report_type.clone()),
            status: ReportStatus::Submitted,
            timestamp: None,
            ai_prediction: None,
            ai_confidence: None,
            health_score: None,
            health_status: None,
        };
        Self {
            report,
            estimated_analysis_time: ack.estimated_analysis_time,
            state: ReportState::Submitted,
            policy,
            attempts: 0,
        }
    }

    pub fn report_id(&self) -> &str {
        &self.report.id
    }

    pub fn tree_id(&self) -> Option<&str> {
        self.report.tree_id.as_deref()
    }

    /// The report as last observed.
    pub fn report(&self) -> &CitizenReport {
        &self.report
    }

    pub fn estimated_analysis_time(&self) -> Option<&str> {
        self.estimated_analysis_time.as_deref()
    }

    pub fn state(&self) -> &ReportState {
        &self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, ReportState::Completed(_) | ReportState::TimedOut { .. })
    }

    pub fn status(&self) -> TrackingStatus {
        match self.state {
            ReportState::Submitted | ReportState::Analyzing { .. } => TrackingStatus::Pending,
            ReportState::Completed(_) => TrackingStatus::Completed,
            ReportState::TimedOut { .. } => TrackingStatus::TimedOut,
        }
    }

    /// How long to wait before the next result fetch; `None` when tracking is over.
    pub fn next_poll_delay(&self) -> Option<Duration> {
        if self.is_terminal() {
            return None;
        }
        self.policy.delay_for(self.attempts)
    }

    /// Applies one poll result. Outcomes arriving after a terminal state are ignored.
    pub fn apply(&mut self, outcome: PollOutcome) -> Vec<LifecycleEffect> {
        if self.is_terminal() {
            debug!(report_id = %self.report.id, "ignoring poll result after terminal state");
            return Vec::new();
        }
        self.attempts += 1;

        match outcome {
            PollOutcome::Complete(result) => {
                info!(report_id = %self.report.id, attempts = self.attempts, "analysis complete");
                self.report.status = ReportStatus::Completed;
                self.report.ai_prediction = result.tree_species.clone();
                self.report.ai_confidence = result.species_confidence;
                self.report.health_score = result.health_score;
                self.report.health_status = result.health_status.clone();

                let mut effects = vec![
                    LifecycleEffect::ShowSummary(result.summary()),
                    LifecycleEffect::RefreshReportLayer,
                ];
                if let Some(tree_id) = &self.report.tree_id {
                    effects.push(LifecycleEffect::RefreshHistory(tree_id.clone()));
                }
                self.state = ReportState::Completed(result);
                effects
            }
            PollOutcome::NotReady | PollOutcome::Failed(_) => {
                if let PollOutcome::Failed(reason) = &outcome {
                    warn!(report_id = %self.report.id, %reason, "analysis result fetch failed; treating as not ready");
                }
                self.report.status = ReportStatus::Analyzing;
                if self.policy.delay_for(self.attempts).is_none() {
                    info!(report_id = %self.report.id, attempts = self.attempts, "giving up polling; still analyzing");
                    self.state = ReportState::TimedOut {
                        attempts: self.attempts,
                    };
                    vec![LifecycleEffect::ShowStillAnalyzing]
                } else {
                    self.state = ReportState::Analyzing {
                        attempts: self.attempts,
                    };
                    Vec::new()
                }
            }
        }
    }
}

/// Where analysis results are fetched from.
pub trait AnalysisSource {
    fn fetch_analysis(&self, report_id: &str) -> impl Future<Output = PollOutcome> + Send;
}

impl AnalysisSource for ApiClient {
    async fn fetch_analysis(&self, report_id: &str) -> PollOutcome {
        self.analysis_result(report_id).await.into()
    }
}

/// Polls until the lifecycle reaches a terminal state, collecting every effect.
pub async fn track<S: AnalysisSource>(
    lifecycle: &mut ReportLifecycle,
    source: &S,
) -> Vec<LifecycleEffect> {
    let mut effects = Vec::new();
    while let Some(delay) = lifecycle.next_poll_delay() {
        tokio::time::sleep(delay).await;
        let outcome = source.fetch_analysis(lifecycle.report_id()).await;
        effects.extend(lifecycle.apply(outcome));
    }
    effects
}
