//! End-to-end tests for the `slens` binary.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn slens() -> Command {
    let mut cmd = cargo_bin_cmd!("slens");
    cmd.env_remove("RUST_LOG").arg("--color").arg("never");
    cmd
}

fn parse_stdout(output: &[u8]) -> serde_json::Value {
    serde_json::from_slice(output).expect("stdout is JSON")
}

mod cli_basics {
    use super::*;

    #[test]
    fn shows_help() {
        slens()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("analyze"))
            .stdout(predicate::str::contains("simulate"));
    }

    #[test]
    fn shows_version() {
        slens()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn lists_agents_in_roster_order() {
        let output = slens()
            .args(["agents", "--json"])
            .output()
            .expect("runs");
        assert!(output.status.success());
        let agents = parse_stdout(&output.stdout);
        assert_eq!(agents.as_array().map(Vec::len), Some(7));
        assert_eq!(agents[0]["agent_id"], "error_detector");
        assert_eq!(agents[6]["agent_id"], "fix_suggester");
    }

    #[test]
    fn lists_languages() {
        slens()
            .arg("languages")
            .assert()
            .success()
            .stdout(predicate::str::contains("python"))
            .stdout(predicate::str::contains("rust"))
            .stdout(predicate::str::contains("php"));
    }
}

mod analyze {
    use super::*;

    #[test]
    fn json_report_for_bubble_sort() {
        let output = slens()
            .arg("analyze")
            .arg(fixtures_path().join("bubble_sort.py"))
            .arg("--json")
            .output()
            .expect("runs");
        assert!(output.status.success());

        let report = parse_stdout(&output.stdout);
        assert_eq!(report["status"], "completed");
        assert_eq!(
            report["agent_results"].as_object().map(|m| m.len()),
            Some(7)
        );
        assert_eq!(report["visualizations"][0]["algorithm"], "bubble_sort");
        assert_eq!(report["visualizations"][0]["metrics"]["comparisons"], 21);
    }

    #[test]
    fn human_report_shows_summary_and_findings() {
        slens()
            .arg("analyze")
            .arg(fixtures_path().join("vulnerable.py"))
            .assert()
            .success()
            .stdout(predicate::str::contains("quality score"))
            .stdout(predicate::str::contains("Security Analyzer"))
            .stdout(predicate::str::contains("critical"));
    }

    #[test]
    fn reads_stdin_with_explicit_language() {
        slens()
            .args(["analyze", "-", "--language", "js", "--json"])
            .write_stdin("var x = 1;\nconsole.log(x);\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("qa/var-declaration"));
    }

    #[test]
    fn context_input_flows_into_the_simulation() {
        let output = slens()
            .arg("analyze")
            .arg(fixtures_path().join("bubble_sort.py"))
            .args(["--json", "--context", r#"{"input_data": [3, 1, 2]}"#])
            .output()
            .expect("runs");
        assert!(output.status.success());
        let report = parse_stdout(&output.stdout);
        assert_eq!(
            report["visualizations"][0]["input"],
            serde_json::json!([3, 1, 2])
        );
    }

    #[test]
    fn events_stream_to_stderr() {
        let output = slens()
            .arg("analyze")
            .arg(fixtures_path().join("binary_search.js"))
            .args(["--json", "--events"])
            .output()
            .expect("runs");
        assert!(output.status.success());

        let stderr = String::from_utf8_lossy(&output.stderr);
        let events: Vec<serde_json::Value> = stderr
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        assert_eq!(events.len(), 21);
        assert!(events.iter().take(7).all(|e| e["state"] == "pending"));
    }

    #[test]
    fn failed_report_exits_with_2() {
        let dir = TempDir::new().expect("temp dir");
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "[agents]\ntimeout_ms = 0\n").expect("write config");

        slens()
            .arg("--config")
            .arg(&config)
            .arg("analyze")
            .arg(fixtures_path().join("bubble_sort.py"))
            .arg("--json")
            .assert()
            .code(2)
            .stdout(predicate::str::contains("\"failed\""));
    }

    #[test]
    fn unknown_extension_needs_language() {
        slens()
            .arg("analyze")
            .arg(fixtures_path().join("notes.txt"))
            .assert()
            .code(1)
            .stderr(predicate::str::contains("--language"));
    }

    #[test]
    fn oversized_code_is_rejected() {
        let dir = TempDir::new().expect("temp dir");
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "[limits]\nmax_code_bytes = 8\n").expect("write config");

        slens()
            .arg("--config")
            .arg(&config)
            .arg("analyze")
            .arg(fixtures_path().join("bubble_sort.py"))
            .assert()
            .code(1)
            .stderr(predicate::str::contains("exceeds limit"));
    }

    #[test]
    fn misspelled_language_gets_a_suggestion() {
        slens()
            .arg("analyze")
            .arg(fixtures_path().join("bubble_sort.py"))
            .args(["--language", "pyhton"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("did you mean 'python'"));
    }
}

mod classify_and_simulate {
    use super::*;

    #[test]
    fn classifies_binary_search() {
        let output = slens()
            .arg("classify")
            .arg(fixtures_path().join("binary_search.js"))
            .arg("--json")
            .output()
            .expect("runs");
        assert!(output.status.success());
        let body = parse_stdout(&output.stdout);
        assert_eq!(body["result"]["category"], "searching");
        assert_eq!(body["result"]["algorithm"], "binary_search");
    }

    #[test]
    fn unclassified_snippet_is_not_an_error() {
        slens()
            .arg("classify")
            .arg(fixtures_path().join("notes.txt"))
            .args(["--language", "python"])
            .assert()
            .success()
            .stdout(predicate::str::contains("no known algorithm"));
    }

    #[test]
    fn simulates_binary_search_with_custom_target() {
        let output = slens()
            .args(["simulate", "binary_search", "--target", "34", "--json"])
            .output()
            .expect("runs");
        assert!(output.status.success());
        let vis = parse_stdout(&output.stdout);
        let frames = vis["frames"].as_array().expect("frames");
        assert_eq!(frames.last().map(|f| f["found"].clone()), Some(4.into()));
    }

    #[test]
    fn simulate_prints_frames_for_humans() {
        slens()
            .args(["simulate", "quick_sort", "--data", "5,3,8,1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Quick Sort"))
            .stdout(predicate::str::contains("[1, 3, 5, 8]"));
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        slens()
            .args(["simulate", "bogo_sort"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("bogo_sort"));
    }
}
