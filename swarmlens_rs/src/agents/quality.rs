//! Code quality: smells, naming conventions, documentation and style.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::AgentFailure;
use crate::source::{self, FunctionDef};
use crate::types::{Finding, Language, Severity, Submission};

use super::{Agent, AgentContext, AgentId, AgentOutput};

const MAX_FUNCTION_LINES: usize = 50;
const MAX_PARAMETERS: usize = 5;
const MAX_NESTING: usize = 3;
const MAX_CONSOLE_LOGS: usize = 3;
const MAX_LINE_CHARS: usize = 120;

static SNAKE_CASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("valid snake_case regex"));

static PASCAL_CASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][a-zA-Z0-9]*$").expect("valid PascalCase regex"));

static PY_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*class\s+(\w+)").expect("valid class regex"));

static JS_VAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bvar\s+").expect("valid var regex"));

static CONSOLE_LOG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"console\.log\s*\(").expect("valid console.log regex"));

/// 100 minus 10 per error, 5 per warning, 2 per info, clamped to 0..=100.
fn quality_score(findings: &[Finding]) -> u32 {
    let penalty: u32 = findings
        .iter()
        .map(|f| match f.severity {
            Severity::Critical | Severity::Error => 10,
            Severity::Warning => 5,
            Severity::Info => 2,
        })
        .sum();
    100u32.saturating_sub(penalty)
}

fn has_docstring(lines: &[&str], def: &FunctionDef) -> bool {
    lines
        .iter()
        .skip(def.line)
        .take(def.end_line.saturating_sub(def.line))
        .map(|l| l.trim_start())
        .find(|l| !l.is_empty())
        .is_some_and(|first| first.trim_start_matches(['r', 'u']).starts_with(['"', '\'']))
}

fn check_python(code: &str, findings: &mut Vec<Finding>) {
    let lines: Vec<&str> = code.lines().collect();
    for def in source::functions(code, Language::Python) {
        let len = def.len_lines();
        if len > MAX_FUNCTION_LINES {
            findings.push(
                Finding::new(
                    Severity::Warning,
                    "code_smell",
                    "qa/long-function",
                    format!("Function \"{}\" is too long ({len} lines)", def.name),
                )
                .at_line(def.line)
                .with_suggestion("Break down into smaller functions"),
            );
        }
        if def.params > MAX_PARAMETERS {
            findings.push(
                Finding::new(
                    Severity::Warning,
                    "code_smell",
                    "qa/too-many-parameters",
                    format!("Function \"{}\" has {} parameters", def.name, def.params),
                )
                .at_line(def.line)
                .with_suggestion("Consider using a config object or class"),
            );
        }
        if !has_docstring(&lines, &def) {
            findings.push(
                Finding::new(
                    Severity::Info,
                    "best_practice",
                    "qa/missing-docstring",
                    format!("Function \"{}\" missing docstring", def.name),
                )
                .at_line(def.line)
                .with_suggestion("Add docstring to document function purpose"),
            );
        }
        if !SNAKE_CASE.is_match(&def.name) {
            findings.push(
                Finding::new(
                    Severity::Info,
                    "best_practice",
                    "qa/function-naming",
                    format!("Function \"{}\" should use snake_case", def.name),
                )
                .at_line(def.line)
                .with_suggestion("Use lowercase with underscores"),
            );
        }
    }

    for (idx, line) in lines.iter().enumerate() {
        let Some(name) = PY_CLASS.captures(line).and_then(|c| c.get(1)) else {
            continue;
        };
        if !PASCAL_CASE.is_match(name.as_str()) {
            findings.push(
                Finding::new(
                    Severity::Info,
                    "best_practice",
                    "qa/class-naming",
                    format!("Class \"{}\" should use PascalCase", name.as_str()),
                )
                .at_line(idx + 1)
                .with_suggestion("Start with uppercase letter"),
            );
        }
    }

    let (depth, line) = source::deepest_control(code, Language::Python);
    if depth > MAX_NESTING {
        findings.push(
            Finding::new(
                Severity::Warning,
                "code_smell",
                "qa/deep-nesting",
                format!("Deep nesting detected (depth: {depth})"),
            )
            .at_line(line)
            .with_suggestion("Extract nested logic into separate functions"),
        );
    }
}

fn check_javascript(code: &str, findings: &mut Vec<Finding>) {
    if let Some(m) = JS_VAR.find(code) {
        findings.push(
            Finding::new(
                Severity::Info,
                "best_practice",
                "qa/var-declaration",
                "Use let/const instead of var",
            )
            .at_line(source::line_of(code, m.start()))
            .with_suggestion("Replace var with let or const"),
        );
    }
    let logs = CONSOLE_LOG.find_iter(code).count();
    if logs > MAX_CONSOLE_LOGS {
        findings.push(
            Finding::new(
                Severity::Info,
                "code_smell",
                "qa/console-log",
                format!("Multiple console.log statements ({logs})"),
            )
            .with_suggestion("Remove console.log or use proper logging"),
        );
    }
}

fn check_line_length(code: &str, findings: &mut Vec<Finding>) {
    for (idx, line) in code.lines().enumerate() {
        let chars = line.chars().count();
        if chars > MAX_LINE_CHARS {
            findings.push(
                Finding::new(
                    Severity::Info,
                    "style",
                    "qa/line-too-long",
                    format!("Line is {chars} characters long (limit {MAX_LINE_CHARS})"),
                )
                .at_line(idx + 1)
                .with_suggestion("Wrap the expression or extract a named variable"),
            );
        }
    }
}

pub struct QualityChecker;

impl Agent for QualityChecker {
    fn id(&self) -> AgentId {
        AgentId::QualityChecker
    }

    fn analyze(
        &self,
        submission: &Submission,
        ctx: &AgentContext,
    ) -> Result<AgentOutput, AgentFailure> {
        let language = submission.language;
        let code = source::strip_comments(&submission.code, language);
        let mut findings = Vec::new();

        match language {
            Language::Python => check_python(&code, &mut findings),
            Language::Javascript | Language::Typescript => check_javascript(&code, &mut findings),
            _ => {}
        }
        ctx.checkpoint()?;
        // Raw text: a long comment line is still a long line.
        check_line_length(&submission.code, &mut findings);

        let score = quality_score(&findings);
        let code_smells = findings.iter().filter(|f| f.category == "code_smell").count();
        let best_practices = findings
            .iter()
            .filter(|f| f.category == "best_practice")
            .count();
        let total = findings.len();
        Ok(AgentOutput::new(findings)
            .with_metadata("quality_score", score)
            .with_metadata("total_issues", total)
            .with_metadata("code_smells", code_smells)
            .with_metadata("best_practices", best_practices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SwarmConfig;
    use crate::types::Context;

    fn check(code: &str, language: Language) -> AgentOutput {
        let submission = Submission::new(code, language, Context::new()).expect("valid");
        let ctx = AgentContext::unbounded(&SwarmConfig::default());
        QualityChecker
            .analyze(&submission, &ctx)
            .expect("analysis succeeds")
    }

    fn rules(output: &AgentOutput) -> Vec<&str> {
        output.findings.iter().map(|f| f.rule.as_str()).collect()
    }

    #[test]
    fn documented_snake_case_function_is_clean() {
        let code = "def add(a, b):\n    \"\"\"Sum two numbers.\"\"\"\n    return a + b\n";
        let output = check(code, Language::Python);
        assert!(output.findings.is_empty());
        assert_eq!(output.metadata["quality_score"], 100);
    }

    #[test]
    fn python_smells() {
        let code = "\
class my_thing:
    pass

def DoWork(a, b, c, d, e, f):
    return a
";
        let output = check(code, Language::Python);
        assert_eq!(
            rules(&output),
            vec![
                "qa/too-many-parameters",
                "qa/missing-docstring",
                "qa/function-naming",
                "qa/class-naming",
            ]
        );
        // one warning (5) + three infos (2 each)
        assert_eq!(output.metadata["quality_score"], 89);
        assert_eq!(output.metadata["code_smells"], 1);
        assert_eq!(output.metadata["best_practices"], 3);
    }

    #[test]
    fn deep_nesting_reports_the_deepest_line() {
        let code = "\
def walk(grid):
    \"\"\"Walk.\"\"\"
    for row in grid:
        for cell in row:
            if cell:
                while cell > 0:
                    cell -= 1
";
        let output = check(code, Language::Python);
        let nesting = output
            .findings
            .iter()
            .find(|f| f.rule == "qa/deep-nesting")
            .expect("deep nesting finding");
        assert_eq!(nesting.line, Some(6));
        assert!(nesting.message.contains("depth: 4"));
    }

    #[test]
    fn long_python_function() {
        let mut code = String::from("def long_one():\n    \"\"\"Doc.\"\"\"\n");
        for i in 0..55 {
            code.push_str(&format!("    x{i} = {i}\n"));
        }
        let output = check(&code, Language::Python);
        assert_eq!(rules(&output), vec!["qa/long-function"]);
    }

    #[test]
    fn javascript_var_and_console_logs() {
        let code = "var a = 1;\nconsole.log(a);\nconsole.log(a);\nconsole.log(a);\nconsole.log(a);\n";
        let output = check(code, Language::Javascript);
        assert_eq!(rules(&output), vec!["qa/var-declaration", "qa/console-log"]);
        assert_eq!(output.findings[0].line, Some(1));
    }

    #[test]
    fn long_lines_in_any_language() {
        let code = format!("let x = \"{}\";\n", "a".repeat(130));
        let output = check(&code, Language::Rust);
        assert_eq!(rules(&output), vec!["qa/line-too-long"]);
        assert_eq!(output.findings[0].line, Some(1));
    }
}
