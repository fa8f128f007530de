//! Report aggregation.
//!
//! Pure reduction of per-agent results into one [`AnalysisReport`]. Severity
//! counts and the quality score only consider agents whose findings carry a
//! real severity (see [`AgentId::is_severity_bearing`]); every finding counts
//! toward `total_findings`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::agents::{AgentId, ROSTER};
use crate::orchestrator::RunStatus;
use crate::simulation::Visualization;
use crate::types::{AgentResult, Finding, Severity};

const CRITICAL_PENALTY: u32 = 15;
const ERROR_PENALTY: u32 = 8;
const WARNING_PENALTY: u32 = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_findings: usize,
    pub critical_issues: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    /// 0..=100, higher is better
    pub quality_score: u32,
    /// Complexity analyzer metadata; empty when that agent did not complete
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub complexity: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub summary: Summary,
    /// Keyed and ordered by roster position
    pub agent_results: BTreeMap<AgentId, AgentResult>,
    pub visualizations: Vec<Visualization>,
    pub generated_at: DateTime<Utc>,
}

impl AnalysisReport {
    /// All findings in roster order.
    pub fn findings(&self) -> impl Iterator<Item = (AgentId, &Finding)> {
        self.agent_results
            .iter()
            .flat_map(|(id, result)| result.findings.iter().map(move |f| (*id, f)))
    }
}

/// 100 minus 15 per critical, 8 per error, 3 per warning; floored at 0.
pub fn quality_score<'a>(findings: impl IntoIterator<Item = &'a Finding>) -> u32 {
    let penalty: u32 = findings
        .into_iter()
        .map(|f| match f.severity {
            Severity::Critical => CRITICAL_PENALTY,
            Severity::Error => ERROR_PENALTY,
            Severity::Warning => WARNING_PENALTY,
            Severity::Info => 0,
        })
        .sum();
    100u32.saturating_sub(penalty)
}

pub fn aggregate(run_id: Uuid, results: BTreeMap<AgentId, AgentResult>) -> AnalysisReport {
    let mut summary = Summary {
        total_findings: results.values().map(|r| r.findings.len()).sum(),
        ..Summary::default()
    };

    let scored: Vec<&Finding> = results
        .iter()
        .filter(|(id, _)| id.is_severity_bearing())
        .flat_map(|(_, r)| r.findings.iter())
        .collect();
    for finding in &scored {
        match finding.severity {
            Severity::Critical => summary.critical_issues += 1,
            Severity::Error => summary.errors += 1,
            Severity::Warning => summary.warnings += 1,
            Severity::Info => summary.infos += 1,
        }
    }
    summary.quality_score = quality_score(scored);
    summary.complexity = results
        .get(&AgentId::ComplexityAnalyzer)
        .filter(|r| r.is_success())
        .map(|r| r.metadata.clone())
        .unwrap_or_default();

    let visualizations = ROSTER
        .iter()
        .filter_map(|id| results.get(id))
        .filter(|r| r.is_success())
        .filter_map(|r| r.visualization.clone())
        .collect();

    AnalysisReport {
        run_id,
        status: RunStatus::from_results(results.values()),
        summary,
        agent_results: results,
        visualizations,
        generated_at: Utc::now(),
    }
}
