//! Concrete fixes with code examples.
//!
//! Agents never see each other's output, so this one re-detects the defects
//! it knows how to fix instead of post-processing other findings. Every
//! suggestion is `info`: the defect itself is already scored by the agent
//! that owns it.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::AgentFailure;
use crate::source;
use crate::types::{Finding, Language, Severity, Submission};

use super::{Agent, AgentContext, AgentId, AgentOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fix {
    ParameterizedQuery,
    EnvironmentSecret,
    ArgumentList,
    ZeroGuard,
    HashLookup,
}

impl Fix {
    fn category(&self) -> &'static str {
        match self {
            Self::ParameterizedQuery | Self::EnvironmentSecret | Self::ArgumentList => {
                "security_fix"
            }
            Self::ZeroGuard => "error_fix",
            Self::HashLookup => "optimization",
        }
    }

    fn rule(&self) -> &'static str {
        match self {
            Self::ParameterizedQuery => "fix/parameterized-query",
            Self::EnvironmentSecret => "fix/environment-secret",
            Self::ArgumentList => "fix/argument-list",
            Self::ZeroGuard => "fix/zero-guard",
            Self::HashLookup => "fix/hash-lookup",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Self::ParameterizedQuery => "SQL injection vulnerability: build the query with bound parameters",
            Self::EnvironmentSecret => "Hardcoded credentials: read the secret from the environment",
            Self::ArgumentList => "Command injection: pass arguments as a list without a shell",
            Self::ZeroGuard => "Division by zero: guard the divisor",
            Self::HashLookup => "Quadratic time complexity: replace the inner loop with a hash lookup",
        }
    }

    fn suggestion(&self) -> &'static str {
        match self {
            Self::ParameterizedQuery => "Use parameterized queries",
            Self::EnvironmentSecret => "Use environment variables",
            Self::ArgumentList => "Avoid the shell and pass a fixed argument vector",
            Self::ZeroGuard => "Add zero check before division",
            Self::HashLookup => "Consider using hash table for O(n) lookup",
        }
    }

    fn code_example(&self, language: Language) -> &'static str {
        use Language::*;
        match (self, language) {
            (Self::ParameterizedQuery, Javascript | Typescript) => {
                "db.query('SELECT * FROM users WHERE id = $1', [userId]);"
            }
            (Self::ParameterizedQuery, Java) => {
                "PreparedStatement st = conn.prepareStatement(\"SELECT * FROM users WHERE id = ?\");\nst.setInt(1, userId);"
            }
            (Self::ParameterizedQuery, Php) => {
                "$st = $pdo->prepare('SELECT * FROM users WHERE id = ?');\n$st->execute([$userId]);"
            }
            (Self::ParameterizedQuery, _) => {
                "cursor.execute(\"SELECT * FROM users WHERE id = ?\", (user_id,))"
            }
            (Self::EnvironmentSecret, Javascript | Typescript) => {
                "const password = process.env.DB_PASSWORD;"
            }
            (Self::EnvironmentSecret, Java) => "String password = System.getenv(\"DB_PASSWORD\");",
            (Self::EnvironmentSecret, Go) => "password := os.Getenv(\"DB_PASSWORD\")",
            (Self::EnvironmentSecret, Rust) => "let password = std::env::var(\"DB_PASSWORD\")?;",
            (Self::EnvironmentSecret, _) => "password = os.environ.get(\"DB_PASSWORD\")",
            (Self::ArgumentList, Javascript | Typescript) => {
                "execFile('ls', ['-l', dir], callback);"
            }
            (Self::ArgumentList, Java) => "new ProcessBuilder(\"ls\", \"-l\", dir).start();",
            (Self::ArgumentList, _) => "subprocess.run([\"ls\", \"-l\", path], check=True)",
            (Self::ZeroGuard, Python) => "if divisor != 0:\n    result = numerator / divisor",
            (Self::ZeroGuard, _) => "if (divisor != 0) {\n    result = numerator / divisor;\n}",
            (Self::HashLookup, Python) => {
                "seen = set(items)\nmatches = [x for x in others if x in seen]"
            }
            (Self::HashLookup, Javascript | Typescript) => {
                "const seen = new Set(items);\nconst matches = others.filter(x => seen.has(x));"
            }
            (Self::HashLookup, _) => {
                "std::unordered_set<int> seen(items.begin(), items.end());\nfor (int x : others) if (seen.count(x)) matches.push_back(x);"
            }
        }
    }

    fn finding(&self, language: Language, line: usize) -> Finding {
        Finding::new(Severity::Info, self.category(), self.rule(), self.message())
            .at_line(line)
            .with_suggestion(self.suggestion())
            .with_code_example(self.code_example(language))
    }
}

static SQL_CONCAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)execute\s*\(\s*(?:f["']|["'][^"']*["']\s*(?:%|\+|\.format))|\.format\s*\(.*\).*execute|query\s*\(\s*["'`][^"'`]*["'`]\s*\+"#,
    )
    .expect("valid sql concat regex")
});

static SECRET_ASSIGN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:password|passwd|api_?key|secret|token)\s*=\s*["'][^"']+["']"#)
        .expect("valid secret regex")
});

static SHELL_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"os\.system\s*\(|subprocess\.(?:call|run|Popen)\s*\(.*shell\s*=\s*True|child_process\.exec\s*\(|\bexec\s*\(\s*`|Runtime\.getRuntime\(\)\.exec\s*\(",
    )
    .expect("valid shell call regex")
});

static LITERAL_ZERO_DIVISOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^/*]/{1,2}\s*0+(?:\.0+)?").expect("valid zero divisor regex"));

fn matching_lines(re: &Regex, code: &str) -> Vec<usize> {
    let mut lines: Vec<usize> = re
        .find_iter(code)
        .map(|m| source::line_of(code, m.start()))
        .collect();
    lines.dedup();
    lines
}

fn zero_divisor_lines(code: &str) -> Vec<usize> {
    let mut lines: Vec<usize> = LITERAL_ZERO_DIVISOR
        .find_iter(code)
        .filter(|m| {
            let next = code[m.end()..].chars().next();
            !next.is_some_and(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
        })
        .map(|m| source::line_of(code, m.start() + 1))
        .collect();
    lines.dedup();
    lines
}

pub struct FixSuggester;

impl Agent for FixSuggester {
    fn id(&self) -> AgentId {
        AgentId::FixSuggester
    }

    fn analyze(
        &self,
        submission: &Submission,
        ctx: &AgentContext,
    ) -> Result<AgentOutput, AgentFailure> {
        let language = submission.language;
        let raw = &submission.code;
        let code = source::strip_comments(raw, language);
        let mut findings = Vec::new();

        let detections = [
            (Fix::ParameterizedQuery, matching_lines(&SQL_CONCAT, raw)),
            (Fix::EnvironmentSecret, matching_lines(&SECRET_ASSIGN, raw)),
            (Fix::ArgumentList, matching_lines(&SHELL_CALL, raw)),
            (Fix::ZeroGuard, zero_divisor_lines(&code)),
        ];
        for (fix, lines) in detections {
            findings.extend(lines.into_iter().map(|line| fix.finding(language, line)));
        }
        ctx.checkpoint()?;

        // Whole-snippet property, so no line.
        if source::loop_depth(&code, language) >= 2 {
            findings.push(Fix::HashLookup.finding(language, 0));
        }

        let total = findings.len();
        let security = findings
            .iter()
            .filter(|f| f.category == "security_fix")
            .count();
        Ok(AgentOutput::new(findings)
            .with_metadata("total_suggestions", total)
            .with_metadata("security_fixes", security))
    }
}
