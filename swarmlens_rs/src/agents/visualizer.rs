//! Algorithm detection + step-by-step simulation.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::AgentFailure;
use crate::simulation::{self, Classifier, Graph, InputData, SimulationRequest};
use crate::source;
use crate::types::{Context, Finding, Severity, Submission};

use super::{Agent, AgentContext, AgentId, AgentOutput};

/// Typed field from the submission context; malformed values are ignored.
fn context_field<T: DeserializeOwned>(context: &Context, key: &str) -> Option<T> {
    context
        .get(key)
        .filter(|v| !v.is_null())
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

/// Context wins over literals in the code; anything still missing falls back
/// to the engine defaults.
fn input_for(submission: &Submission) -> InputData {
    let context = &submission.context;
    InputData {
        data: context_field::<Vec<i64>>(context, "input_data")
            .or_else(|| source::numeric_list_literal(&submission.code)),
        target: context_field(context, "target"),
        graph: context_field::<Graph>(context, "graph"),
        start: context_field(context, "start"),
    }
}

pub struct AlgorithmVisualizer;

impl Agent for AlgorithmVisualizer {
    fn id(&self) -> AgentId {
        AgentId::AlgorithmVisualizer
    }

    fn analyze(
        &self,
        submission: &Submission,
        ctx: &AgentContext,
    ) -> Result<AgentOutput, AgentFailure> {
        let classifier = Classifier::new(ctx.classifier.min_confidence);
        let Some(detected) = classifier.classify(&submission.code, submission.language) else {
            return Ok(AgentOutput::new(vec![Finding::new(
                Severity::Info,
                "algorithm",
                "viz/no-algorithm",
                "No known algorithm detected",
            )])
            .with_metadata("detected", false));
        };
        ctx.checkpoint()?;

        let request = SimulationRequest::new(detected.algorithm).with_input(input_for(submission));
        let visualization = simulation::simulate(&request, &ctx.simulation, ctx)
            .map_err(|err| AgentFailure::from_simulation(err, ctx.elapsed_ms()))?;

        let finding = Finding::new(
            Severity::Info,
            "algorithm",
            "viz/detected",
            format!(
                "Detected {} ({} algorithm, {:.0}% confidence), {} frames recorded",
                detected.algorithm.display_name(),
                detected.category.as_str(),
                detected.confidence * 100.0,
                visualization.frames.len()
            ),
        );

        let mut output = AgentOutput::new(vec![finding])
            .with_metadata("detected", true)
            .with_metadata("category", detected.category.as_str())
            .with_metadata("algorithm", detected.algorithm.as_str())
            .with_metadata("confidence", Value::from(f64::from(detected.confidence)))
            .with_metadata("frames", visualization.frames.len());
        output.visualization = Some(visualization);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    use crate::config::SwarmConfig;
    use crate::simulation::{Algorithm, Category, Frame};
    use crate::types::Language;

    const PY_BUBBLE: &str = "\
def bubble_sort(arr):
    n = len(arr)
    for i in range(n):
        for j in range(0, n - i - 1):
            if arr[j] > arr[j + 1]:
                arr[j], arr[j + 1] = arr[j + 1], arr[j]
    return arr
";

    fn run(code: &str, context: Context) -> Result<AgentOutput, AgentFailure> {
        let submission = Submission::new(code, Language::Python, context).expect("valid");
        let ctx = AgentContext::unbounded(&SwarmConfig::default());
        AlgorithmVisualizer.analyze(&submission, &ctx)
    }

    #[test]
    fn bubble_sort_is_simulated_with_default_input() {
        let output = run(PY_BUBBLE, Context::new()).expect("analysis succeeds");
        let vis = output.visualization.expect("visualization");
        assert_eq!(vis.category, Category::Sorting);
        assert_eq!(vis.algorithm, Algorithm::BubbleSort);
        assert_eq!(vis.metrics.comparisons, 21);
        assert_eq!(output.metadata["algorithm"], "bubble_sort");
        assert!(output.findings[0].message.contains("Bubble Sort"));
    }

    #[test]
    fn context_input_overrides_defaults() {
        let mut context = Context::new();
        context.insert("input_data".into(), json!([3, 1, 2]));
        let output = run(PY_BUBBLE, context).expect("analysis succeeds");
        let vis = output.visualization.expect("visualization");
        assert_eq!(vis.input, Some(vec![3, 1, 2]));
        let Some(Frame::Sorting(last)) = vis.frames.last() else {
            panic!("expected a sorting frame");
        };
        assert_eq!(last.array, vec![1, 2, 3]);
    }

    #[test]
    fn literal_in_code_is_used_when_context_is_silent() {
        let code = format!("{PY_BUBBLE}\nprint(bubble_sort([9, 8, 7, 6]))\n");
        let output = run(&code, Context::new()).expect("analysis succeeds");
        let vis = output.visualization.expect("visualization");
        assert_eq!(vis.input, Some(vec![9, 8, 7, 6]));
    }

    #[test]
    fn unclassified_code_completes_without_visualization() {
        let output = run("x = 1\nprint(x)\n", Context::new()).expect("analysis succeeds");
        assert!(output.visualization.is_none());
        assert_eq!(output.findings[0].rule, "viz/no-algorithm");
        assert_eq!(output.metadata["detected"], false);
    }

    #[test]
    fn cancellation_surfaces_as_cancelled_failure() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = AgentContext::new(token, Duration::from_secs(5), &SwarmConfig::default());
        let submission = Submission::new(PY_BUBBLE, Language::Python, Context::new()).expect("valid");
        let err = AlgorithmVisualizer
            .analyze(&submission, &ctx)
            .expect_err("cancelled");
        assert!(matches!(err, AgentFailure::Cancelled { .. }));
    }
}
