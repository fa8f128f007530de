//! Concurrent analysis runs.
//!
//! One run fans a [`Submission`] out to every agent in [`ROSTER`]. Each agent
//! executes on tokio's blocking pool under an async supervisor in a
//! `JoinSet`; the supervisor enforces the agent's deadline, publishes its
//! lifecycle events and turns panics into error results. The run suspends
//! only while joining supervisors, then hands the results to [`aggregate`].
//!
//! ```text
//! submission ──► supervisor ×7 ──► spawn_blocking(agent) ──► AgentResult
//!                    │                                          │
//!                    └── StatusEvent (pending/running/terminal) ▼
//!                                                          aggregate ──► AnalysisReport
//! ```

pub mod status;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::aggregate::{AnalysisReport, aggregate};
use crate::agents::{AgentContext, AgentId, ROSTER};
use crate::config::SwarmConfig;
use crate::error::{AgentFailure, SubmissionError};
use crate::types::{AgentResult, AgentStatus, Submission};

pub use status::{AgentState, ChannelPublisher, NullPublisher, StatusEvent, StatusPublisher};

/// Overall state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    /// Every agent succeeded
    Completed,
    /// At least one agent errored and at least one succeeded
    Partial,
    /// No agent succeeded
    Failed,
    /// At least one agent was stopped by run cancellation
    Cancelled,
}

impl RunStatus {
    /// Terminal status from agent statuses alone; findings are never consulted.
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a AgentResult>) -> Self {
        let (mut ok, mut errored, mut cancelled) = (0usize, 0usize, 0usize);
        for result in results {
            match result.status {
                AgentStatus::Completed => ok += 1,
                AgentStatus::Error => errored += 1,
                AgentStatus::Cancelled => cancelled += 1,
            }
        }
        match (ok, errored, cancelled) {
            (_, _, c) if c > 0 => Self::Cancelled,
            (0, _, _) => Self::Failed,
            (_, 0, _) => Self::Completed,
            _ => Self::Partial,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry point for analysis runs. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    config: Arc<SwarmConfig>,
}

impl Orchestrator {
    pub fn new(config: SwarmConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    /// Reject submissions that must never reach an agent.
    pub fn validate(&self, submission: &Submission) -> Result<(), SubmissionError> {
        if submission.code.trim().is_empty() {
            return Err(SubmissionError::EmptyCode);
        }
        let limit = self.config.limits.max_code_bytes;
        if submission.code.len() > limit {
            return Err(SubmissionError::TooLarge {
                size: submission.code.len(),
                limit,
            });
        }
        Ok(())
    }

    /// Run every agent and wait for the report.
    pub async fn submit_analysis(
        &self,
        submission: Submission,
    ) -> Result<AnalysisReport, SubmissionError> {
        self.validate(&submission)?;
        let run_id = Uuid::new_v4();
        Ok(execute(
            run_id,
            Arc::new(submission),
            Arc::clone(&self.config),
            Arc::new(NullPublisher),
            CancellationToken::new(),
        )
        .await)
    }

    /// Start a run in the background; events stream through the handle.
    pub fn spawn_run(&self, submission: Submission) -> Result<RunHandle, SubmissionError> {
        self.validate(&submission)?;
        let run_id = Uuid::new_v4();
        let (publisher, events) = ChannelPublisher::new();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(execute(
            run_id,
            Arc::new(submission),
            Arc::clone(&self.config),
            Arc::new(publisher),
            cancel.clone(),
        ));
        Ok(RunHandle {
            run_id,
            events,
            _cancel_on_drop: cancel.clone().drop_guard(),
            cancel,
            task,
        })
    }
}

/// A run in flight.
///
/// `events` closes once every agent has reached a terminal state, so
/// draining it to the end and then calling [`RunHandle::wait`] never blocks
/// on a lost event. Dropping the handle cancels the run.
pub struct RunHandle {
    run_id: Uuid,
    pub events: mpsc::UnboundedReceiver<StatusEvent>,
    cancel: CancellationToken,
    _cancel_on_drop: DropGuard,
    task: JoinHandle<AnalysisReport>,
}

impl RunHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Stop every agent at its next checkpoint. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn next_event(&mut self) -> Option<StatusEvent> {
        self.events.recv().await
    }

    pub async fn wait(self) -> AnalysisReport {
        match self.task.await {
            Ok(report) => report,
            Err(err) => {
                error!(run_id = %self.run_id, "run task failed: {err}");
                let detail = format!("run task failed: {err}");
                let results = ROSTER
                    .into_iter()
                    .map(|id| (id, AgentResult::failed(id, detail.clone())))
                    .collect();
                aggregate(self.run_id, results)
            }
        }
    }
}

async fn execute(
    run_id: Uuid,
    submission: Arc<Submission>,
    config: Arc<SwarmConfig>,
    publisher: Arc<dyn StatusPublisher>,
    cancel: CancellationToken,
) -> AnalysisReport {
    let started = Instant::now();
    info!(
        %run_id,
        language = %submission.language,
        bytes = submission.code.len(),
        "analysis run started"
    );

    for id in ROSTER {
        publisher.publish(StatusEvent::new(run_id, id, AgentState::Pending));
    }

    let mut supervisors = JoinSet::new();
    for id in ROSTER {
        let token = cancel.child_token();
        let timeout = config.agents.timeout_for(id);
        let ctx = AgentContext::new(token.clone(), timeout, &config);
        supervisors.spawn(supervise(
            run_id,
            id,
            Arc::clone(&submission),
            ctx,
            token,
            timeout,
            Arc::clone(&publisher),
        ));
    }

    let mut results: BTreeMap<AgentId, AgentResult> = BTreeMap::new();
    while let Some(joined) = supervisors.join_next().await {
        match joined {
            Ok(result) => {
                results.insert(result.agent_id, result);
            }
            Err(err) => error!(%run_id, "agent supervisor failed: {err}"),
        }
    }
    for id in ROSTER {
        results.entry(id).or_insert_with(|| {
            publisher.publish(
                StatusEvent::new(run_id, id, AgentState::Errored)
                    .with_detail(Some("no result reported".to_string())),
            );
            AgentResult::failed(id, "agent task did not report a result")
        });
    }

    let report = aggregate(run_id, results);
    info!(
        %run_id,
        status = %report.status,
        findings = report.summary.total_findings,
        quality_score = report.summary.quality_score,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "analysis run finished"
    );
    report
}

async fn supervise(
    run_id: Uuid,
    id: AgentId,
    submission: Arc<Submission>,
    ctx: AgentContext,
    token: CancellationToken,
    timeout: Duration,
    publisher: Arc<dyn StatusPublisher>,
) -> AgentResult {
    publisher.publish(StatusEvent::new(run_id, id, AgentState::Running));
    debug!(%run_id, agent = %id, timeout_ms = timeout.as_millis() as u64, "agent started");

    let started = Instant::now();
    let worker = tokio::task::spawn_blocking(move || id.run(&submission, &ctx));
    let result = match tokio::time::timeout(timeout, worker).await {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => {
            warn!(%run_id, agent = %id, "agent task aborted: {err}");
            let detail = if err.is_panic() {
                "agent panicked".to_string()
            } else {
                format!("agent task aborted: {err}")
            };
            AgentResult::failed(id, detail)
        }
        Err(_) => {
            // The worker keeps its thread until the next checkpoint.
            token.cancel();
            let after_ms = started.elapsed().as_millis() as u64;
            warn!(%run_id, agent = %id, after_ms, "agent timed out");
            let mut result = AgentResult::failed(id, AgentFailure::TimedOut { after_ms }.to_string());
            result.elapsed_ms = after_ms;
            result
        }
    };

    let state = if result.is_success() {
        AgentState::Completed
    } else {
        AgentState::Errored
    };
    debug!(%run_id, agent = %id, status = ?result.status, elapsed_ms = result.elapsed_ms, "agent finished");
    publisher.publish(
        StatusEvent::new(run_id, id, state).with_detail(result.error_detail.clone()),
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: AgentId, status: AgentStatus) -> AgentResult {
        let mut r = AgentResult::completed(id, Vec::new());
        r.status = status;
        r
    }

    #[test]
    fn run_status_from_agent_statuses() {
        use AgentStatus::*;
        let all_ok = [result(AgentId::ErrorDetector, Completed), result(AgentId::FixSuggester, Completed)];
        assert_eq!(RunStatus::from_results(&all_ok), RunStatus::Completed);

        let mixed = [result(AgentId::ErrorDetector, Completed), result(AgentId::FixSuggester, Error)];
        assert_eq!(RunStatus::from_results(&mixed), RunStatus::Partial);

        let none_ok = [result(AgentId::ErrorDetector, Error), result(AgentId::FixSuggester, Error)];
        assert_eq!(RunStatus::from_results(&none_ok), RunStatus::Failed);

        let stopped = [result(AgentId::ErrorDetector, Completed), result(AgentId::FixSuggester, Cancelled)];
        assert_eq!(RunStatus::from_results(&stopped), RunStatus::Cancelled);
    }

    #[test]
    fn oversized_submission_is_rejected() {
        let mut config = SwarmConfig::default();
        config.limits.max_code_bytes = 8;
        let orchestrator = Orchestrator::new(config);
        let submission = Submission::new(
            "print('hello world')",
            crate::types::Language::Python,
            Default::default(),
        )
        .expect("valid");
        assert_eq!(
            orchestrator.validate(&submission),
            Err(SubmissionError::TooLarge { size: 20, limit: 8 })
        );
    }
}
