//! # swarmlens
//!
//! **Multi-agent code analysis** - one snippet, seven independent analyzers,
//! one consistent report.
//!
//! A submission is fanned out to a fixed roster of agents running
//! concurrently. Each agent may fail, time out or be cancelled without
//! affecting the others; their results are folded into an
//! [`AnalysisReport`] with severity counts and a quality score.
//!
//! ## Features
//!
//! - **Error detection** - bracket balance, language-specific runtime and logic errors
//! - **Complexity** - cyclomatic complexity, loop nesting, Big-O estimate
//! - **Memory, security, quality** - regex/heuristic rule tables per language
//! - **Fix suggestions** - concrete fixes with code examples
//! - **Algorithm simulation** - classify a snippet as a known algorithm and
//!   record a deterministic, replayable frame-by-frame trace
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,no_run
//! use swarmlens::{Orchestrator, Submission, SwarmConfig};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let code = "def f(xs):\n    return sorted(xs)\n";
//! let submission = Submission::parse(code, "python", Default::default())?;
//! let report = Orchestrator::new(SwarmConfig::default())
//!     .submit_analysis(submission)
//!     .await?;
//! println!("quality score: {}", report.summary.quality_score);
//! # Ok(())
//! # }
//! ```
//!
//! ## Simulating an Algorithm Directly
//!
//! ```rust
//! use swarmlens::simulation::{Algorithm, SimulationRequest, Unbounded, simulate};
//! use swarmlens::config::SimulationConfig;
//!
//! let request = SimulationRequest::new(Algorithm::BubbleSort);
//! let vis = simulate(&request, &SimulationConfig::default(), &Unbounded).unwrap();
//! assert_eq!(vis.metrics.comparisons, 21);
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! slens analyze sort.py              # Human-readable report
//! slens analyze sort.py --json       # Full report as JSON
//! slens classify sort.py             # Which algorithm is this?
//! slens simulate quick_sort --data 5,3,8,1
//! ```

// ============================================================================
// Core Modules
// ============================================================================

/// Agent contract, roster and the seven analysis agents.
pub mod agents;

/// Report aggregation and quality scoring.
pub mod aggregate;

/// Configuration loaded from `.swarmlens/config.toml`.
pub mod config;

/// Error types for submissions, agents and simulations.
pub mod error;

/// Run orchestration, lifecycle events and run handles.
pub mod orchestrator;

/// Pattern classifier and algorithm simulation engine.
pub mod simulation;

/// Line- and token-level source heuristics shared by agents.
pub mod source;

/// Submissions, findings and agent results.
pub mod types;

// ============================================================================
// CLI Support
// ============================================================================

/// `slens` command surface.
pub mod cli;

/// ANSI coloring for human-readable output.
pub mod colors;

// ============================================================================
// Re-exports
// ============================================================================

pub use agents::{AgentId, AgentInfo, ROSTER, list_agents};
pub use aggregate::{AnalysisReport, Summary, aggregate};
pub use config::SwarmConfig;
pub use error::{AgentFailure, SimulationError, SubmissionError};
pub use orchestrator::{Orchestrator, RunHandle, RunStatus, StatusEvent};
pub use simulation::{ClassificationResult, Visualization, classify, simulate};
pub use types::{AgentResult, AgentStatus, Finding, Language, Severity, Submission};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Every language the agents accept, in declaration order.
pub fn list_languages() -> &'static [Language] {
    &Language::ALL
}
