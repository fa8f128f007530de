//! Run-level contract of the orchestrator: roster coverage, summary sums,
//! status rules, deadlines, cancellation and lifecycle event order.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use swarmlens::orchestrator::{AgentState, RunHandle, StatusEvent};
use swarmlens::simulation::Algorithm;
use swarmlens::{
    AgentId, AgentStatus, Orchestrator, ROSTER, RunStatus, Severity, Submission, SubmissionError,
    SwarmConfig,
};
use tempfile::TempDir;
use tokio::sync::mpsc;

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read_to_string(&path).expect("fixture readable")
}

fn submission(name: &str, language: &str) -> Submission {
    Submission::parse(fixture(name), language, Default::default()).expect("valid submission")
}

/// Bubble sort over a long reversed input; runs for seconds unless stopped.
fn long_bubble_sort() -> Submission {
    let data: Vec<i64> = (0..20_000).rev().collect();
    let mut context = serde_json::Map::new();
    context.insert("input_data".to_string(), serde_json::json!(data));
    Submission::parse(fixture("bubble_sort.py"), "python", context).expect("valid submission")
}

fn long_simulation_config() -> SwarmConfig {
    config_from("[simulation]\nsampling_threshold = 20000\nmax_frames = 50\n")
}

async fn wait_for(
    events: &mut mpsc::UnboundedReceiver<StatusEvent>,
    agent: AgentId,
    state: AgentState,
) -> StatusEvent {
    let found = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(event) = events.recv().await {
            if event.agent_id == agent && event.state == state {
                return Some(event);
            }
        }
        None
    })
    .await;
    match found {
        Ok(Some(event)) => event,
        Ok(None) => panic!("event stream closed before {agent} reached {state:?}"),
        Err(_) => panic!("{agent} never reached {state:?}"),
    }
}

fn take_events(handle: &mut RunHandle) -> mpsc::UnboundedReceiver<StatusEvent> {
    let (_tx, placeholder) = mpsc::unbounded_channel();
    std::mem::replace(&mut handle.events, placeholder)
}

fn config_from(toml: &str) -> SwarmConfig {
    let dir = TempDir::new().expect("temp dir");
    let swarm_dir = dir.path().join(".swarmlens");
    std::fs::create_dir_all(&swarm_dir).expect("config dir");
    std::fs::write(swarm_dir.join("config.toml"), toml).expect("write config");
    SwarmConfig::load(dir.path())
}

#[tokio::test]
async fn every_roster_agent_reports_exactly_once() {
    let report = Orchestrator::default()
        .submit_analysis(submission("bubble_sort.py", "python"))
        .await
        .expect("accepted");

    let keys: Vec<AgentId> = report.agent_results.keys().copied().collect();
    assert_eq!(keys, ROSTER.to_vec());
    for (id, result) in &report.agent_results {
        assert_eq!(result.agent_id, *id);
    }

    let total: usize = report
        .agent_results
        .values()
        .map(|r| r.findings.len())
        .sum();
    assert_eq!(report.summary.total_findings, total);
}

#[tokio::test]
async fn bubble_sort_produces_a_visualization() {
    let report = Orchestrator::default()
        .submit_analysis(submission("bubble_sort.py", "python"))
        .await
        .expect("accepted");

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.visualizations.len(), 1);
    let vis = &report.visualizations[0];
    assert_eq!(vis.algorithm, Algorithm::BubbleSort);
    assert_eq!(vis.metrics.comparisons, 21);
    assert_eq!(vis.metrics.swaps, Some(14));
    assert_eq!(
        report.summary.complexity.get("big_o"),
        report.agent_results[&AgentId::ComplexityAnalyzer]
            .metadata
            .get("big_o")
    );
    assert!(report.summary.complexity.contains_key("big_o"));
}

#[tokio::test]
async fn severity_counts_come_from_severity_bearing_agents() {
    let report = Orchestrator::default()
        .submit_analysis(submission("vulnerable.py", "python"))
        .await
        .expect("accepted");

    let mut expected: BTreeMap<Severity, usize> = BTreeMap::new();
    for (id, result) in &report.agent_results {
        if id.is_severity_bearing() {
            for finding in &result.findings {
                *expected.entry(finding.severity).or_default() += 1;
            }
        }
    }
    let count = |s: Severity| expected.get(&s).copied().unwrap_or(0);
    assert_eq!(report.summary.critical_issues, count(Severity::Critical));
    assert_eq!(report.summary.errors, count(Severity::Error));
    assert_eq!(report.summary.warnings, count(Severity::Warning));
    assert_eq!(report.summary.infos, count(Severity::Info));
    assert!(report.summary.critical_issues >= 2);
    assert!(report.summary.quality_score < 100);

    let fixes = &report.agent_results[&AgentId::FixSuggester];
    assert!(fixes.findings.iter().all(|f| f.code_example.is_some()));
    assert!(!fixes.findings.is_empty());
}

#[tokio::test]
async fn zero_timeout_fails_every_agent() {
    let config = config_from("[agents]\ntimeout_ms = 0\n");
    let report = Orchestrator::new(config)
        .submit_analysis(submission("bubble_sort.py", "python"))
        .await
        .expect("accepted");

    assert_eq!(report.status, RunStatus::Failed);
    for result in report.agent_results.values() {
        assert_eq!(result.status, AgentStatus::Error);
        assert!(
            result
                .error_detail
                .as_deref()
                .is_some_and(|d| d.contains("timed out")),
            "{}: {:?}",
            result.agent_id,
            result.error_detail
        );
    }
    assert!(report.visualizations.is_empty());
}

#[tokio::test]
async fn one_timed_out_agent_makes_a_partial_run() {
    let config = config_from("[agents.timeouts]\nfix_suggester = 0\n");
    let report = Orchestrator::new(config)
        .submit_analysis(submission("bubble_sort.py", "python"))
        .await
        .expect("accepted");

    assert_eq!(report.status, RunStatus::Partial);
    for (id, result) in &report.agent_results {
        let expected = if *id == AgentId::FixSuggester {
            AgentStatus::Error
        } else {
            AgentStatus::Completed
        };
        assert_eq!(result.status, expected, "{id}");
    }
}

#[tokio::test]
async fn lifecycle_events_are_ordered_per_agent() {
    let orchestrator = Orchestrator::default();
    let mut handle = orchestrator
        .spawn_run(submission("binary_search.js", "javascript"))
        .expect("accepted");
    let run_id = handle.run_id();

    let mut seen: BTreeMap<AgentId, Vec<AgentState>> = BTreeMap::new();
    while let Some(event) = handle.next_event().await {
        assert_eq!(event.run_id, run_id);
        seen.entry(event.agent_id).or_default().push(event.state);
    }
    let report = handle.wait().await;
    assert_eq!(report.run_id, run_id);

    assert_eq!(seen.len(), ROSTER.len());
    for (id, states) in &seen {
        assert_eq!(states.len(), 3, "{id}: {states:?}");
        assert_eq!(states[0], AgentState::Pending);
        assert_eq!(states[1], AgentState::Running);
        assert!(states[2].is_terminal());
        let ok = report.agent_results[id].status == AgentStatus::Completed;
        assert_eq!(states[2] == AgentState::Completed, ok);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelling_mid_simulation_marks_the_visualizer_cancelled() {
    let orchestrator = Orchestrator::new(long_simulation_config());
    let mut handle = orchestrator.spawn_run(long_bubble_sort()).expect("accepted");

    wait_for(
        &mut handle.events,
        AgentId::AlgorithmVisualizer,
        AgentState::Running,
    )
    .await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.cancel();

    let report = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .expect("cancelled run finishes promptly");

    assert_eq!(report.status, RunStatus::Cancelled);
    let vis_result = &report.agent_results[&AgentId::AlgorithmVisualizer];
    assert_eq!(vis_result.status, AgentStatus::Cancelled);
    assert!(report.visualizations.is_empty());

    if let Some(partial) = &vis_result.visualization {
        assert!(!partial.frames.is_empty());
        assert!(partial.frames.len() <= 50);
        for (idx, frame) in partial.frames.iter().enumerate() {
            assert_eq!(frame.step(), idx);
        }
        assert!(partial.metrics.comparisons < 20_000 * 19_999 / 2);
    }
    for result in report.agent_results.values() {
        assert!(
            matches!(result.status, AgentStatus::Completed | AgentStatus::Cancelled),
            "{}: {:?}",
            result.agent_id,
            result.status
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropping_the_handle_cancels_the_run() {
    let orchestrator = Orchestrator::new(long_simulation_config());
    let mut handle = orchestrator.spawn_run(long_bubble_sort()).expect("accepted");
    let mut events = take_events(&mut handle);

    wait_for(&mut events, AgentId::AlgorithmVisualizer, AgentState::Running).await;
    drop(handle);

    let terminal = wait_for(&mut events, AgentId::AlgorithmVisualizer, AgentState::Errored).await;
    assert!(
        terminal
            .detail
            .as_deref()
            .is_some_and(|d| d.contains("cancelled")),
        "{:?}",
        terminal.detail
    );

    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        while events.recv().await.is_some() {}
    })
    .await;
    assert!(closed.is_ok(), "run kept going after its handle was dropped");
}

#[tokio::test]
async fn repeated_runs_are_deterministic() {
    let orchestrator = Orchestrator::default();
    let a = orchestrator
        .submit_analysis(submission("bubble_sort.py", "python"))
        .await
        .expect("accepted");
    let b = orchestrator
        .submit_analysis(submission("bubble_sort.py", "python"))
        .await
        .expect("accepted");

    assert_ne!(a.run_id, b.run_id);
    assert_eq!(a.summary, b.summary);
    assert_eq!(
        serde_json::to_vec(&a.visualizations).expect("serialize"),
        serde_json::to_vec(&b.visualizations).expect("serialize")
    );
    for id in ROSTER {
        assert_eq!(
            a.agent_results[&id].findings,
            b.agent_results[&id].findings
        );
    }
}

#[tokio::test]
async fn oversized_submission_never_starts_a_run() {
    let config = config_from("[limits]\nmax_code_bytes = 16\n");
    let err = Orchestrator::new(config)
        .submit_analysis(submission("bubble_sort.py", "python"))
        .await
        .expect_err("rejected");
    assert!(matches!(err, SubmissionError::TooLarge { limit: 16, .. }));
}
