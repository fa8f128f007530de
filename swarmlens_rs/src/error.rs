//! Error taxonomy.
//!
//! - [`SubmissionError`] rejects a request before any agent task starts.
//! - [`AgentFailure`] is isolated to one agent and recorded in its result.
//! - [`SimulationError`] is raised by the simulation engine and surfaces as
//!   the visualizer agent's own failure.
//!
//! An ambiguous classification is not an error: it is `None`.

use thiserror::Error;

use crate::simulation::Visualization;
use crate::types::Language;

/// Reasons a submission is rejected outright.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmissionError {
    #[error("code is required")]
    EmptyCode,

    #[error("language '{given}' not supported{}", did_you_mean(.suggestion))]
    UnsupportedLanguage {
        given: String,
        suggestion: Option<Language>,
    },

    #[error("code size {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: usize, limit: usize },
}

fn did_you_mean(suggestion: &Option<Language>) -> String {
    suggestion
        .map(|s| format!(" (did you mean '{s}'?)"))
        .unwrap_or_default()
}

/// Failure of a single agent. Never crosses the agent's task boundary.
#[derive(Error, Debug)]
pub enum AgentFailure {
    #[error("{0}")]
    Internal(String),

    #[error("cancelled")]
    Cancelled { partial: Option<Box<Visualization>> },

    #[error("timed out after {after_ms} ms")]
    TimedOut { after_ms: u64 },

    #[error("simulation failed: {0}")]
    Simulation(#[from] SimulationError),
}

/// Bounded-execution and input errors from the simulation engine.
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("unknown algorithm '{0}'")]
    UnknownAlgorithm(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("simulation cancelled after {} frames", .partial.frames.len())]
    Cancelled { partial: Box<Visualization> },

    #[error("simulation exceeded its deadline")]
    TimedOut,
}

impl AgentFailure {
    /// Lift simulation-level interruptions to agent-level ones so the
    /// orchestrator sees a uniform cancelled / timed out state.
    pub fn from_simulation(err: SimulationError, elapsed_ms: u64) -> Self {
        match err {
            SimulationError::Cancelled { partial } => Self::Cancelled {
                partial: Some(partial),
            },
            SimulationError::TimedOut => Self::TimedOut {
                after_ms: elapsed_ms,
            },
            other => Self::Simulation(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_language_message_includes_suggestion() {
        let err = SubmissionError::UnsupportedLanguage {
            given: "jav".into(),
            suggestion: Some(Language::Java),
        };
        assert_eq!(
            err.to_string(),
            "language 'jav' not supported (did you mean 'java'?)"
        );

        let err = SubmissionError::UnsupportedLanguage {
            given: "cobol".into(),
            suggestion: None,
        };
        assert_eq!(err.to_string(), "language 'cobol' not supported");
    }

    #[test]
    fn simulation_timeout_becomes_agent_timeout() {
        let failure = AgentFailure::from_simulation(SimulationError::TimedOut, 42);
        assert!(matches!(failure, AgentFailure::TimedOut { after_ms: 42 }));

        let failure =
            AgentFailure::from_simulation(SimulationError::InvalidInput("empty".into()), 1);
        assert!(matches!(
            failure,
            AgentFailure::Simulation(SimulationError::InvalidInput(_))
        ));
    }
}
