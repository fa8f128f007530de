//! Syntax, runtime and logic error detection.
//!
//! # Rules
//!
//! | Rule ID | Languages | Severity |
//! |---------|-----------|----------|
//! | `err/unbalanced-delimiter` | all | error |
//! | `err/division-by-zero` | all | error |
//! | `err/missing-colon` | python | error |
//! | `err/infinite-loop` | python | warning |
//! | `err/none-comparison` | python | info |
//! | `err/null-dereference` | c, cpp | error |
//! | `err/new-without-delete` | cpp | warning |
//! | `err/uninitialized` | c, cpp | warning |
//! | `err/missing-semicolon` | c, cpp, java | warning |
//! | `err/using-namespace-std` | cpp | info |
//! | `err/null-comparison` | java | info |
//! | `err/unclosed-resource` | java | warning |

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::AgentFailure;
use crate::source;
use crate::types::{Finding, Language, Severity, Submission};

use super::{Agent, AgentContext, AgentId, AgentOutput};

static DOUBLE_QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""(?:[^"\\\n]|\\.)*""#).expect("valid string regex"));

static SINGLE_QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'(?:[^'\\\n]|\\.)*'").expect("valid char regex"));

static DIVISION_BY_ZERO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/{1,2}\s*(0+(?:\.0+)?)").expect("valid division regex"));

static PY_BLOCK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(def|class|if|elif|else|for|while|try|except|finally|with)\b")
        .expect("valid block header regex")
});

static PY_WHILE_TRUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*while\s+(?:True|1)\s*:").expect("valid while regex"));

static PY_NONE_EQ: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[!=]=\s*None\b").expect("valid none regex"));

static NULL_DEREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\s*\(?\s*(?:NULL|nullptr)\b").expect("valid null deref regex"));

static CPP_NEW: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bnew\s+\w").expect("valid new regex"));

static CPP_DELETE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bdelete\b").expect("valid delete regex"));

static C_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:int|float|double|char|bool|long|short)\s+(\w+)\s*;")
        .expect("valid declaration regex")
});

static MISSING_SEMICOLON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:return|break|continue)\b[^;{}]*[^;{}\s]\s*$").expect("valid semicolon regex")
});

static JAVA_NULL_EQ: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[!=]=\s*null\b").expect("valid java null regex"));

static JAVA_RESOURCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"new\s+(FileInputStream|FileOutputStream|BufferedReader|FileReader|FileWriter|Scanner)\b")
        .expect("valid resource regex")
});

pub struct ErrorDetector;

impl Agent for ErrorDetector {
    fn id(&self) -> AgentId {
        AgentId::ErrorDetector
    }

    fn analyze(
        &self,
        submission: &Submission,
        ctx: &AgentContext,
    ) -> Result<AgentOutput, AgentFailure> {
        let language = submission.language;
        let code = source::strip_comments(&submission.code, language);
        let mut findings = Vec::new();

        check_delimiters(&blank_strings(&code, language), &mut findings);
        check_division_by_zero(&code, &mut findings);
        ctx.checkpoint()?;

        match language {
            Language::Python => check_python(&code, &mut findings),
            Language::C | Language::Cpp => check_c_family(&code, language, &mut findings),
            Language::Java => check_java(&code, &mut findings),
            _ => {}
        }
        ctx.checkpoint()?;

        let count = |category: &str| findings.iter().filter(|f| f.category == category).count();
        let (syntax, runtime, logical) = (count("syntax"), count("runtime"), count("logical"));
        let total = findings.len();
        Ok(AgentOutput::new(findings)
            .with_metadata("total_errors", total)
            .with_metadata("syntax_errors", syntax)
            .with_metadata("runtime_errors", runtime)
            .with_metadata("logical_errors", logical))
    }
}

/// Replace string literal contents with spaces so delimiters inside them
/// do not count.
fn blank_strings(code: &str, language: Language) -> String {
    let blank = |m: &regex::Captures<'_>| " ".repeat(m[0].len());
    let code = DOUBLE_QUOTED.replace_all(code, blank).into_owned();
    // Rust lifetimes look like unterminated char literals.
    if language == Language::Rust {
        return code;
    }
    SINGLE_QUOTED.replace_all(&code, blank).into_owned()
}

fn check_delimiters(code: &str, findings: &mut Vec<Finding>) {
    for (open, close, name) in [('(', ')', "parenthesis"), ('{', '}', "brace"), ('[', ']', "bracket")] {
        let mut open_lines: Vec<usize> = Vec::new();
        for (idx, line) in code.lines().enumerate() {
            for ch in line.chars() {
                if ch == open {
                    open_lines.push(idx + 1);
                } else if ch == close && open_lines.pop().is_none() {
                    findings.push(
                        Finding::new(
                            Severity::Error,
                            "syntax",
                            "err/unbalanced-delimiter",
                            format!("Unmatched closing {name} '{close}'"),
                        )
                        .at_line(idx + 1)
                        .with_suggestion(format!("Remove the extra '{close}' or add the missing '{open}'")),
                    );
                }
            }
        }
        if let Some(first) = open_lines.first() {
            findings.push(
                Finding::new(
                    Severity::Error,
                    "syntax",
                    "err/unbalanced-delimiter",
                    format!("Mismatched {name}: {} '{open}' never closed", open_lines.len()),
                )
                .at_line(*first)
                .with_suggestion(format!("Add the missing '{close}'")),
            );
        }
    }
}

fn check_division_by_zero(code: &str, findings: &mut Vec<Finding>) {
    for caps in DIVISION_BY_ZERO.captures_iter(code) {
        let (Some(whole), Some(zero)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let next = code[zero.end()..].chars().next();
        if next.is_some_and(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_') {
            continue;
        }
        findings.push(
            Finding::new(
                Severity::Error,
                "runtime",
                "err/division-by-zero",
                "Division by zero detected",
            )
            .at_line(source::line_of(code, whole.start()))
            .with_suggestion("Add zero check before division"),
        );
    }
}

fn check_python(code: &str, findings: &mut Vec<Finding>) {
    for (idx, line) in code.lines().enumerate() {
        let trimmed = line.trim();
        let line_no = idx + 1;

        if PY_BLOCK_HEADER.is_match(trimmed)
            && !trimmed.ends_with(':')
            && !trimmed.ends_with(['(', ',', '\\', '['])
            && trimmed.matches('(').count() <= trimmed.matches(')').count()
            && !is_inline_block(trimmed)
        {
            findings.push(
                Finding::new(
                    Severity::Error,
                    "syntax",
                    "err/missing-colon",
                    "Syntax Error: expected ':' at end of block header",
                )
                .at_line(line_no)
                .with_suggestion("Add ':' at the end of the line"),
            );
        }

        if PY_WHILE_TRUE.is_match(line) {
            findings.push(
                Finding::new(
                    Severity::Warning,
                    "logical",
                    "err/infinite-loop",
                    "Potential infinite loop detected (while True)",
                )
                .at_line(line_no)
                .with_suggestion("Ensure loop has proper exit condition"),
            );
        }

        if PY_NONE_EQ.is_match(line) {
            findings.push(
                Finding::new(
                    Severity::Info,
                    "logical",
                    "err/none-comparison",
                    "Use \"is None\" instead of \"== None\"",
                )
                .at_line(line_no)
                .with_suggestion("Replace == with is for None comparison"),
            );
        }
    }
}

/// `if x: return y` style one-liners already contain the colon mid-line.
fn is_inline_block(line: &str) -> bool {
    line.contains(": ") || line.contains(":\t")
}

fn check_c_family(code: &str, language: Language, findings: &mut Vec<Finding>) {
    let has_delete = CPP_DELETE.is_match(code);
    for (idx, line) in code.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();

        if language == Language::Cpp && !has_delete && CPP_NEW.is_match(line) {
            findings.push(
                Finding::new(
                    Severity::Warning,
                    "memory",
                    "err/new-without-delete",
                    "Memory allocation without visible delete - potential memory leak",
                )
                .at_line(line_no)
                .with_suggestion("Ensure memory is freed with delete or use smart pointers"),
            );
        }

        if NULL_DEREF.is_match(line) {
            findings.push(
                Finding::new(
                    Severity::Error,
                    "runtime",
                    "err/null-dereference",
                    "Potential null pointer dereference",
                )
                .at_line(line_no)
                .with_suggestion("Check the pointer before dereferencing it"),
            );
        }

        if MISSING_SEMICOLON.is_match(trimmed) {
            findings.push(missing_semicolon(line_no));
        }

        if language == Language::Cpp && trimmed.starts_with("using namespace std") {
            findings.push(
                Finding::new(
                    Severity::Info,
                    "quality",
                    "err/using-namespace-std",
                    "Using namespace std pollutes global namespace",
                )
                .at_line(line_no)
                .with_suggestion("Consider using std:: prefix instead"),
            );
        }
    }

    for caps in C_DECL.captures_iter(code) {
        let (Some(decl), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Ok(assigned) = Regex::new(&format!(
            r"(?:\b{0}\s*(?:[-+*/%|&^]?=[^=]|\+\+|--)|(?:\+\+|--)\s*{0}\b|&\s*{0}\b)",
            regex::escape(name.as_str())
        )) else {
            continue;
        };
        if !assigned.is_match(code) {
            findings.push(
                Finding::new(
                    Severity::Warning,
                    "runtime",
                    "err/uninitialized",
                    format!("Variable \"{}\" may be uninitialized", name.as_str()),
                )
                .at_line(source::line_of(code, decl.start()))
                .with_suggestion("Initialize variables at declaration"),
            );
        }
    }
}

fn missing_semicolon(line: usize) -> Finding {
    Finding::new(
        Severity::Warning,
        "syntax",
        "err/missing-semicolon",
        "Possible missing semicolon",
    )
    .at_line(line)
    .with_suggestion("Terminate the statement with ';'")
}

fn check_java(code: &str, findings: &mut Vec<Finding>) {
    let closes_resources = code.contains(".close()") || code.contains("try (");
    for (idx, line) in code.lines().enumerate() {
        let line_no = idx + 1;

        if JAVA_NULL_EQ.is_match(line) {
            findings.push(
                Finding::new(
                    Severity::Info,
                    "quality",
                    "err/null-comparison",
                    "Consider using Objects.isNull() or Objects.nonNull()",
                )
                .at_line(line_no),
            );
        }

        if MISSING_SEMICOLON.is_match(line.trim()) {
            findings.push(missing_semicolon(line_no));
        }

        if !closes_resources && let Some(caps) = JAVA_RESOURCE.captures(line) {
            findings.push(
                Finding::new(
                    Severity::Warning,
                    "resource",
                    "err/unclosed-resource",
                    format!("{} may not be properly closed", &caps[1]),
                )
                .at_line(line_no)
                .with_suggestion("Use try-with-resources or ensure .close() is called"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SwarmConfig;
    use crate::types::Context;

    fn detect(code: &str, language: Language) -> Vec<Finding> {
        let submission = Submission::new(code, language, Context::new()).expect("valid");
        let ctx = AgentContext::unbounded(&SwarmConfig::default());
        ErrorDetector
            .analyze(&submission, &ctx)
            .expect("analysis succeeds")
            .findings
    }

    fn rules(findings: &[Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.rule.as_str()).collect()
    }

    #[test]
    fn clean_python_has_no_findings() {
        let code = "def add(a, b):\n    return a + b\n";
        assert!(detect(code, Language::Python).is_empty());
    }

    #[test]
    fn unbalanced_delimiters_report_line() {
        let findings = detect("function f() {\n  return (1 + 2;\n}\n", Language::Javascript);
        assert_eq!(rules(&findings), vec!["err/unbalanced-delimiter"]);
        assert_eq!(findings[0].line, Some(2));
        assert_eq!(findings[0].severity, Severity::Error);
    }

    #[test]
    fn delimiters_inside_strings_are_ignored() {
        let findings = detect("s = \"(((\"\nt = ')'\n", Language::Python);
        assert!(findings.is_empty(), "{findings:?}");
    }

    #[test]
    fn rust_lifetimes_do_not_confuse_balance() {
        let code = "fn first<'a>(s: &'a str) -> &'a str {\n    &s[..1]\n}\n";
        assert!(detect(code, Language::Rust).is_empty());
    }

    #[test]
    fn python_rules() {
        let code = "\
def loop(x)
    while True:
        if x == None:
            return 1 / 0
";
        let findings = detect(code, Language::Python);
        let found = rules(&findings);
        assert!(found.contains(&"err/missing-colon"));
        assert!(found.contains(&"err/infinite-loop"));
        assert!(found.contains(&"err/none-comparison"));
        assert!(found.contains(&"err/division-by-zero"));
        let div = findings
            .iter()
            .find(|f| f.rule == "err/division-by-zero")
            .expect("division finding");
        assert_eq!(div.line, Some(4));
    }

    #[test]
    fn division_by_nonzero_literal_is_fine() {
        assert!(detect("x = y / 0.5\nz = y / 10\n", Language::Python).is_empty());
    }

    #[test]
    fn cpp_rules() {
        let code = "\
using namespace std;
int main() {
    int count;
    int *p = new int(5);
    int v = *NULL;
    return 0
}
";
        let found = rules(&detect(code, Language::Cpp)).join(",");
        assert!(found.contains("err/using-namespace-std"));
        assert!(found.contains("err/uninitialized"));
        assert!(found.contains("err/new-without-delete"));
        assert!(found.contains("err/null-dereference"));
        assert!(found.contains("err/missing-semicolon"));
    }

    #[test]
    fn assigned_c_variable_is_not_uninitialized() {
        let code = "int main() {\n    int n;\n    n = 3;\n    return n;\n}\n";
        assert!(!rules(&detect(code, Language::C)).contains(&"err/uninitialized"));
    }

    #[test]
    fn java_rules() {
        let code = "\
class A {
    void read() throws Exception {
        Scanner in = new Scanner(System.in);
        if (in == null) { return; }
    }
}
";
        let binding = detect(code, Language::Java);
        let found = rules(&binding);
        assert!(found.contains(&"err/unclosed-resource"));
        assert!(found.contains(&"err/null-comparison"));
    }
}
