//! Security scanning: injection, hardcoded credentials, XSS sinks, weak randomness.
//!
//! Patterns match case-insensitively against the raw submission so that
//! secrets hidden in comments are still reported.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::AgentFailure;
use crate::source;
use crate::types::{Finding, Severity, Submission};

use super::{Agent, AgentContext, AgentId, AgentOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vulnerability {
    SqlInjection,
    CommandInjection,
    HardcodedSecret,
    Xss,
    InsecureRandom,
}

impl Vulnerability {
    /// Scan order; findings are grouped by vulnerability in this order.
    pub const ALL: [Vulnerability; 5] = [
        Self::SqlInjection,
        Self::CommandInjection,
        Self::HardcodedSecret,
        Self::Xss,
        Self::InsecureRandom,
    ];

    pub fn category(&self) -> &'static str {
        match self {
            Self::SqlInjection => "sql_injection",
            Self::CommandInjection => "command_injection",
            Self::HardcodedSecret => "hardcoded_secrets",
            Self::Xss => "xss",
            Self::InsecureRandom => "insecure_random",
        }
    }

    pub fn rule(&self) -> &'static str {
        match self {
            Self::SqlInjection => "sec/sql-injection",
            Self::CommandInjection => "sec/command-injection",
            Self::HardcodedSecret => "sec/hardcoded-secret",
            Self::Xss => "sec/xss",
            Self::InsecureRandom => "sec/insecure-random",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::SqlInjection | Self::CommandInjection => Severity::Critical,
            Self::HardcodedSecret | Self::Xss => Severity::Error,
            Self::InsecureRandom => Severity::Warning,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::SqlInjection => "Potential SQL injection vulnerability detected",
            Self::CommandInjection => "Command injection vulnerability detected",
            Self::HardcodedSecret => "Hardcoded credential detected",
            Self::Xss => "Potential XSS vulnerability detected",
            Self::InsecureRandom => "Insecure random number generation",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::SqlInjection => "Use parameterized queries or ORM instead of string formatting",
            Self::CommandInjection => "Avoid shell=True, use subprocess with list arguments",
            Self::HardcodedSecret => "Use environment variables or secret management systems",
            Self::Xss => "Sanitize user input and use textContent instead of innerHTML",
            Self::InsecureRandom => "Use the secrets module or a CSPRNG for security-sensitive values",
        }
    }

    fn patterns(&self) -> &'static [Regex] {
        match self {
            Self::SqlInjection => &SQL_INJECTION,
            Self::CommandInjection => &COMMAND_INJECTION,
            Self::HardcodedSecret => &HARDCODED_SECRET,
            Self::Xss => &XSS,
            Self::InsecureRandom => &INSECURE_RANDOM,
        }
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){p}")).expect("valid security regex"))
        .collect()
}

static SQL_INJECTION: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r#"execute\s*\(\s*["'].*%s.*["']\s*%"#,
        r#"execute\s*\(\s*["'].*["']\s*\+"#,
        r"\.format\s*\(.*\).*execute",
        r#"execute\s*\(\s*f["'].*\{.*\}"#,
        r#"f".*\{.*\}.*".*execute"#,
    ])
});

static COMMAND_INJECTION: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"os\.system\s*\(",
        r"subprocess\.(?:call|run|Popen)\s*\(.*shell\s*=\s*True",
        r"child_process\.exec\s*\(",
        r"Runtime\.getRuntime\(\)\.exec\s*\(",
    ])
});

static HARDCODED_SECRET: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r#"\bpassword\s*=\s*["'][^"']+["']"#,
        r#"\bapi_?key\s*=\s*["'][^"']+["']"#,
        r#"\bsecret\s*=\s*["'][^"']+["']"#,
        r#"\btoken\s*=\s*["'][^"']+["']"#,
    ])
});

static XSS: Lazy<Vec<Regex>> =
    Lazy::new(|| compile(&[r"innerHTML\s*=", r"document\.write\s*\(", r"\beval\s*\("]));

static INSECURE_RANDOM: Lazy<Vec<Regex>> =
    Lazy::new(|| compile(&[r"random\.random\s*\(\s*\)", r"Math\.random\s*\(\s*\)"]));

/// One finding per (vulnerability, line); several patterns hitting the same
/// line collapse into one.
fn scan(code: &str, vuln: Vulnerability, findings: &mut Vec<Finding>) {
    let mut lines: Vec<usize> = vuln
        .patterns()
        .iter()
        .flat_map(|re| re.find_iter(code))
        .map(|m| source::line_of(code, m.start()))
        .collect();
    lines.sort_unstable();
    lines.dedup();

    findings.extend(lines.into_iter().map(|line| {
        Finding::new(vuln.severity(), vuln.category(), vuln.rule(), vuln.message())
            .at_line(line)
            .with_suggestion(vuln.recommendation())
    }));
}

pub struct SecurityAnalyzer;

impl Agent for SecurityAnalyzer {
    fn id(&self) -> AgentId {
        AgentId::SecurityAnalyzer
    }

    fn analyze(
        &self,
        submission: &Submission,
        ctx: &AgentContext,
    ) -> Result<AgentOutput, AgentFailure> {
        let mut findings = Vec::new();
        for vuln in Vulnerability::ALL {
            ctx.checkpoint()?;
            scan(&submission.code, vuln, &mut findings);
        }

        let count = |severity: Severity| findings.iter().filter(|f| f.severity == severity).count();
        let (critical, errors, warnings) = (
            count(Severity::Critical),
            count(Severity::Error),
            count(Severity::Warning),
        );
        let total = findings.len();
        Ok(AgentOutput::new(findings)
            .with_metadata("total_vulnerabilities", total)
            .with_metadata("critical", critical)
            .with_metadata("error", errors)
            .with_metadata("warning", warnings))
    }
}
