//! Configuration file support for swarmlens.
//!
//! Loads optional `.swarmlens/config.toml` from the working directory. Every
//! field has a default, so a partial (or missing) file is always valid.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::agents::AgentId;

pub const DEFAULT_MAX_CODE_BYTES: usize = 1024 * 1024;
pub const DEFAULT_AGENT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_FRAMES: usize = 1000;
pub const DEFAULT_SAMPLING_THRESHOLD: usize = 100;
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.3;

/// Root configuration structure
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    pub limits: LimitsConfig,
    pub agents: AgentsConfig,
    pub simulation: SimulationConfig,
    pub classifier: ClassifierConfig,
}

/// Submission acceptance limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest accepted snippet, in bytes
    pub max_code_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_code_bytes: DEFAULT_MAX_CODE_BYTES,
        }
    }
}

/// Per-agent soft deadlines
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    /// Default deadline for every agent, in milliseconds
    pub timeout_ms: u64,
    /// Overrides keyed by agent id, e.g. `algorithm_visualizer = 2000`
    pub timeouts: BTreeMap<String, u64>,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_AGENT_TIMEOUT_MS,
            timeouts: BTreeMap::new(),
        }
    }
}

impl AgentsConfig {
    pub fn timeout_for(&self, agent: AgentId) -> Duration {
        let ms = self
            .timeouts
            .get(agent.as_str())
            .copied()
            .unwrap_or(self.timeout_ms);
        Duration::from_millis(ms)
    }
}

/// Simulation engine bounds
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Frames stored per visualization; later steps are only counted
    pub max_frames: usize,
    /// Inputs longer than this are truncated before simulation
    pub sampling_threshold: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_frames: DEFAULT_MAX_FRAMES,
            sampling_threshold: DEFAULT_SAMPLING_THRESHOLD,
        }
    }
}

/// Pattern classifier policy
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Minimum confidence (0.0 - 1.0) for a classification to produce a visualization
    pub min_confidence: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl SwarmConfig {
    /// Load config from `.swarmlens/config.toml` in the given root directory.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(".swarmlens").join("config.toml");
        Self::load_from_path(&config_path)
    }

    /// Load config from a specific path.
    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!("failed to parse {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("failed to read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}
