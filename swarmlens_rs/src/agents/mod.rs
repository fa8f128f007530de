//! Analysis agents.
//!
//! Every agent is a stateless unit struct implementing [`Agent`]. The set is
//! closed: [`ROSTER`] lists every agent in report order and [`AgentId`]
//! dispatches to the implementation. Agents never see each other's output.
//!
//! | Agent | Concern |
//! |-------|---------|
//! | `error_detector` | bracket balance, language-specific runtime and logic errors |
//! | `complexity_analyzer` | cyclomatic complexity, loop nesting, Big-O estimate |
//! | `memory_profiler` | leaks and retention patterns |
//! | `security_analyzer` | injection, secrets, XSS, insecure randomness |
//! | `quality_checker` | code smells, naming, documentation |
//! | `algorithm_visualizer` | classification + replayable simulation |
//! | `fix_suggester` | concrete fixes with code examples |

mod complexity;
mod error_detector;
mod fix_suggester;
mod memory;
mod quality;
mod security;
mod visualizer;

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::config::{ClassifierConfig, SimulationConfig, SwarmConfig};
use crate::error::AgentFailure;
use crate::simulation::{Interrupt, StepGuard, Visualization};
use crate::types::{AgentResult, Finding, Submission};

/// Stable identifier of a roster entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentId {
    ErrorDetector,
    ComplexityAnalyzer,
    MemoryProfiler,
    SecurityAnalyzer,
    QualityChecker,
    AlgorithmVisualizer,
    FixSuggester,
}

/// Every agent, in report order.
pub const ROSTER: [AgentId; 7] = [
    AgentId::ErrorDetector,
    AgentId::ComplexityAnalyzer,
    AgentId::MemoryProfiler,
    AgentId::SecurityAnalyzer,
    AgentId::QualityChecker,
    AgentId::AlgorithmVisualizer,
    AgentId::FixSuggester,
];

impl AgentId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ErrorDetector => "error_detector",
            Self::ComplexityAnalyzer => "complexity_analyzer",
            Self::MemoryProfiler => "memory_profiler",
            Self::SecurityAnalyzer => "security_analyzer",
            Self::QualityChecker => "quality_checker",
            Self::AlgorithmVisualizer => "algorithm_visualizer",
            Self::FixSuggester => "fix_suggester",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ErrorDetector => "Error Detector",
            Self::ComplexityAnalyzer => "Complexity Analyzer",
            Self::MemoryProfiler => "Memory Profiler",
            Self::SecurityAnalyzer => "Security Analyzer",
            Self::QualityChecker => "Quality Checker",
            Self::AlgorithmVisualizer => "Algorithm Visualizer",
            Self::FixSuggester => "Fix Suggester",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ErrorDetector => "Detects syntax, runtime and logic errors",
            Self::ComplexityAnalyzer => "Estimates cyclomatic complexity and Big-O time",
            Self::MemoryProfiler => "Finds memory leaks and retention patterns",
            Self::SecurityAnalyzer => "Scans for injection, secrets and unsafe APIs",
            Self::QualityChecker => "Checks code smells, naming and documentation",
            Self::AlgorithmVisualizer => {
                "Detects known algorithms and records a step-by-step simulation"
            }
            Self::FixSuggester => "Suggests concrete fixes with code examples",
        }
    }

    /// Findings from these agents carry severities that feed the summary
    /// counts and the quality score.
    pub fn is_severity_bearing(&self) -> bool {
        matches!(
            self,
            Self::ErrorDetector | Self::SecurityAnalyzer | Self::QualityChecker
        )
    }

    fn agent(&self) -> &'static dyn Agent {
        match self {
            Self::ErrorDetector => &error_detector::ErrorDetector,
            Self::ComplexityAnalyzer => &complexity::ComplexityAnalyzer,
            Self::MemoryProfiler => &memory::MemoryProfiler,
            Self::SecurityAnalyzer => &security::SecurityAnalyzer,
            Self::QualityChecker => &quality::QualityChecker,
            Self::AlgorithmVisualizer => &visualizer::AlgorithmVisualizer,
            Self::FixSuggester => &fix_suggester::FixSuggester,
        }
    }

    /// Run the agent and fold any failure into its result.
    pub fn run(self, submission: &Submission, ctx: &AgentContext) -> AgentResult {
        let started = Instant::now();
        let outcome = ctx
            .checkpoint()
            .and_then(|()| self.agent().analyze(submission, ctx));

        let mut result = match outcome {
            Ok(output) => {
                let mut result = AgentResult::completed(self, output.findings);
                result.visualization = output.visualization;
                result.metadata = output.metadata;
                result
            }
            Err(AgentFailure::Cancelled { partial }) => {
                AgentResult::cancelled(self, partial.map(|vis| *vis))
            }
            Err(failure) => AgentResult::failed(self, failure.to_string()),
        };
        result.elapsed_ms = started.elapsed().as_millis() as u64;
        result
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ROSTER
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("unknown agent '{s}'"))
    }
}

/// Roster entry as exposed to callers.
#[derive(Debug, Clone, Serialize)]
pub struct AgentInfo {
    pub agent_id: AgentId,
    pub display_name: &'static str,
    pub description: &'static str,
}

pub fn list_agents() -> Vec<AgentInfo> {
    ROSTER
        .into_iter()
        .map(|agent_id| AgentInfo {
            agent_id,
            display_name: agent_id.display_name(),
            description: agent_id.description(),
        })
        .collect()
}

/// What an agent hands back on success.
#[derive(Debug, Default)]
pub struct AgentOutput {
    pub findings: Vec<Finding>,
    pub visualization: Option<Visualization>,
    pub metadata: Map<String, Value>,
}

impl AgentOutput {
    pub fn new(findings: Vec<Finding>) -> Self {
        Self {
            findings,
            ..Self::default()
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// A single analysis unit.
pub trait Agent: Send + Sync {
    fn id(&self) -> AgentId;

    fn analyze(
        &self,
        submission: &Submission,
        ctx: &AgentContext,
    ) -> Result<AgentOutput, AgentFailure>;
}

/// Per-task execution bounds: cancellation, deadline and engine limits.
#[derive(Debug, Clone)]
pub struct AgentContext {
    cancel: CancellationToken,
    started: Instant,
    deadline: Option<Instant>,
    pub simulation: SimulationConfig,
    pub classifier: ClassifierConfig,
}

impl AgentContext {
    pub fn new(cancel: CancellationToken, timeout: Duration, config: &SwarmConfig) -> Self {
        let started = Instant::now();
        Self {
            cancel,
            started,
            deadline: started.checked_add(timeout),
            simulation: config.simulation,
            classifier: config.classifier,
        }
    }

    /// No deadline and a token nobody cancels.
    pub fn unbounded(config: &SwarmConfig) -> Self {
        Self {
            cancel: CancellationToken::new(),
            started: Instant::now(),
            deadline: None,
            simulation: config.simulation,
            classifier: config.classifier,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn interrupt(&self) -> Option<Interrupt> {
        if self.cancel.is_cancelled() {
            return Some(Interrupt::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Interrupt::TimedOut),
            _ => None,
        }
    }

    /// Call between rule groups.
    pub fn checkpoint(&self) -> Result<(), AgentFailure> {
        match self.interrupt() {
            None => Ok(()),
            Some(Interrupt::Cancelled) => Err(AgentFailure::Cancelled { partial: None }),
            Some(Interrupt::TimedOut) => Err(AgentFailure::TimedOut {
                after_ms: self.elapsed_ms(),
            }),
        }
    }
}

impl StepGuard for AgentContext {
    fn check(&self) -> Result<(), Interrupt> {
        self.interrupt().map_or(Ok(()), Err)
    }
}
