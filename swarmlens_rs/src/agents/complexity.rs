//! Complexity estimation: cyclomatic complexity, loop nesting, Big-O.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::AgentFailure;
use crate::source;
use crate::types::{Finding, Severity, Submission};

use super::{Agent, AgentContext, AgentId, AgentOutput};

static BRANCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:if|elif|elsif|for|foreach|while|until|case|catch|except|rescue|and|or)\b|&&|\|\|")
        .expect("valid branch regex")
});

/// Big-O notation for a loop nesting depth.
pub(crate) fn big_o(depth: usize) -> String {
    match depth {
        0 => "O(1)".to_string(),
        1 => "O(n)".to_string(),
        k => format!("O(n^{k})"),
    }
}

fn cyclomatic(code: &str) -> usize {
    1 + BRANCH.find_iter(code).count()
}

fn cyclomatic_severity(value: usize) -> Severity {
    match value {
        0..=5 => Severity::Info,
        6..=10 => Severity::Warning,
        _ => Severity::Error,
    }
}

fn depth_severity(depth: usize) -> Severity {
    match depth {
        0 | 1 => Severity::Info,
        2 => Severity::Warning,
        _ => Severity::Error,
    }
}

pub struct ComplexityAnalyzer;

impl Agent for ComplexityAnalyzer {
    fn id(&self) -> AgentId {
        AgentId::ComplexityAnalyzer
    }

    fn analyze(
        &self,
        submission: &Submission,
        ctx: &AgentContext,
    ) -> Result<AgentOutput, AgentFailure> {
        let language = submission.language;
        let code = source::strip_comments(&submission.code, language);
        let functions = source::functions(&code, language);
        let mut findings = Vec::new();

        for def in &functions {
            let body = source::body_of(&code, def).join("\n");
            let value = cyclomatic(&body);
            let mut finding = Finding::new(
                cyclomatic_severity(value),
                "cyclomatic_complexity",
                "cx/cyclomatic",
                format!("{} has cyclomatic complexity of {value}", def.name),
            )
            .at_line(def.line);
            if value > 10 {
                finding = finding.with_suggestion("Consider breaking down into smaller functions");
            }
            findings.push(finding);
        }
        ctx.checkpoint()?;

        let depth = source::loop_depth(&code, language);
        let notation = big_o(depth);
        let explanation = match depth {
            0 => "Constant time - no loops detected".to_string(),
            1 => "Linear time - single loop".to_string(),
            2 => "Quadratic time - nested loops".to_string(),
            k => format!("Polynomial time with {k} nested loops"),
        };
        let mut estimate = Finding::new(
            depth_severity(depth),
            "time_complexity",
            "cx/time-complexity",
            format!("Estimated time complexity {notation}: {explanation}"),
        );
        if depth >= 2 {
            estimate = estimate.with_suggestion(
                "Replace nested loops with a hash-based lookup or a sort-then-scan approach",
            );
        }
        findings.push(estimate);

        let recursive = source::recursive_functions(&code, language);
        for name in &recursive {
            let line = functions
                .iter()
                .find(|def| &def.name == name)
                .map_or(0, |def| def.line);
            findings.push(
                Finding::new(
                    Severity::Warning,
                    "time_complexity",
                    "cx/recursion",
                    format!("{name} is recursive - may have exponential complexity"),
                )
                .at_line(line)
                .with_suggestion("Memoize repeated subproblems or convert to iteration"),
            );
        }
        ctx.checkpoint()?;

        let total = cyclomatic(&code);
        let max_cyclomatic = functions
            .iter()
            .map(|def| cyclomatic(&source::body_of(&code, def).join("\n")))
            .max()
            .unwrap_or(total);

        Ok(AgentOutput::new(findings)
            .with_metadata("cyclomatic", total)
            .with_metadata("max_cyclomatic", max_cyclomatic)
            .with_metadata("loop_depth", depth)
            .with_metadata("big_o", notation)
            .with_metadata("functions", functions.len())
            .with_metadata("recursive_functions", recursive))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SwarmConfig;
    use crate::types::{Context, Language};

    fn analyze(code: &str, language: Language) -> AgentOutput {
        let submission = Submission::new(code, language, Context::new()).expect("valid");
        let ctx = AgentContext::unbounded(&SwarmConfig::default());
        ComplexityAnalyzer
            .analyze(&submission, &ctx)
            .expect("analysis succeeds")
    }

    #[test]
    fn nested_loops_are_quadratic() {
        let code = "\
def pairs(items):
    out = []
    for a in items:
        for b in items:
            if a != b:
                out.append((a, b))
    return out
";
        let output = analyze(code, Language::Python);
        assert_eq!(output.metadata["big_o"], "O(n^2)");
        assert_eq!(output.metadata["loop_depth"], 2);
        assert_eq!(output.metadata["functions"], 1);
        let estimate = output
            .findings
            .iter()
            .find(|f| f.rule == "cx/time-complexity")
            .expect("estimate");
        assert_eq!(estimate.severity, Severity::Warning);
        assert!(estimate.suggestion.is_some());
    }

    #[test]
    fn straight_line_code_is_constant() {
        let output = analyze("const x = 1;\nconst y = x + 2;\n", Language::Javascript);
        assert_eq!(output.metadata["big_o"], "O(1)");
        assert_eq!(output.metadata["cyclomatic"], 1);
    }

    #[test]
    fn recursion_is_flagged() {
        let code = "\
fn fib(n: u64) -> u64 {
    if n < 2 { return n; }
    fib(n - 1) + fib(n - 2)
}
";
        let output = analyze(code, Language::Rust);
        let recursion = output
            .findings
            .iter()
            .find(|f| f.rule == "cx/recursion")
            .expect("recursion finding");
        assert_eq!(recursion.line, Some(1));
        assert_eq!(output.metadata["recursive_functions"][0], "fib");
    }

    #[test]
    fn cyclomatic_counts_branches() {
        assert_eq!(cyclomatic("if a and b:\n    pass\nelif c or d:\n    pass\n"), 5);
        assert_eq!(cyclomatic("if (a && b || c) {}"), 4);
        assert_eq!(big_o(3), "O(n^3)");
    }
}
