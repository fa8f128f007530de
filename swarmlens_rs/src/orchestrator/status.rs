//! Agent lifecycle events and the sinks that receive them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::agents::AgentId;

/// Per-agent lifecycle. Every agent moves `Pending -> Running -> terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    Pending,
    Running,
    Completed,
    Errored,
}

impl AgentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Errored)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub run_id: Uuid,
    pub agent_id: AgentId,
    pub state: AgentState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl StatusEvent {
    pub fn new(run_id: Uuid, agent_id: AgentId, state: AgentState) -> Self {
        Self {
            run_id,
            agent_id,
            state,
            detail: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_detail(mut self, detail: Option<String>) -> Self {
        self.detail = detail;
        self
    }
}

/// Receives lifecycle events as they happen. Must not block.
pub trait StatusPublisher: Send + Sync {
    fn publish(&self, event: StatusEvent);
}

/// Discards everything.
pub struct NullPublisher;

impl StatusPublisher for NullPublisher {
    fn publish(&self, _event: StatusEvent) {}
}

/// Forwards events into an unbounded channel.
pub struct ChannelPublisher {
    tx: mpsc::UnboundedSender<StatusEvent>,
}

impl ChannelPublisher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StatusEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StatusPublisher for ChannelPublisher {
    fn publish(&self, event: StatusEvent) {
        // receiver may already be gone; the run does not care
        self.tx.send(event).ok();
    }
}
