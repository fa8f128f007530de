//! Core value types shared by agents, the orchestrator and the aggregator.
//!
//! Everything here is an immutable value once built: a [`Submission`] is
//! shared read-only across agent tasks, and each agent produces exactly one
//! [`AgentResult`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strsim::levenshtein;

use crate::agents::AgentId;
use crate::error::SubmissionError;
use crate::simulation::Visualization;

/// Opaque key-value context attached to a submission.
pub type Context = Map<String, Value>;

/// Languages accepted by the analysis pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Javascript,
    Typescript,
    Java,
    Cpp,
    C,
    Go,
    Rust,
    Ruby,
    Php,
}

impl Language {
    pub const ALL: [Language; 10] = [
        Language::Python,
        Language::Javascript,
        Language::Typescript,
        Language::Java,
        Language::Cpp,
        Language::C,
        Language::Go,
        Language::Rust,
        Language::Ruby,
        Language::Php,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Javascript => "javascript",
            Self::Typescript => "typescript",
            Self::Java => "java",
            Self::Cpp => "cpp",
            Self::C => "c",
            Self::Go => "go",
            Self::Rust => "rust",
            Self::Ruby => "ruby",
            Self::Php => "php",
        }
    }

    /// Block structure is expressed with indentation (or `end` keywords)
    /// rather than braces.
    pub fn is_indent_scoped(&self) -> bool {
        matches!(self, Self::Python | Self::Ruby)
    }

    pub fn is_c_family(&self) -> bool {
        matches!(self, Self::C | Self::Cpp)
    }

    pub fn is_js_family(&self) -> bool {
        matches!(self, Self::Javascript | Self::Typescript)
    }

    /// Line comment marker used by the language.
    pub fn line_comment(&self) -> &'static str {
        match self {
            Self::Python | Self::Ruby => "#",
            _ => "//",
        }
    }

    /// Map a file extension to a language.
    pub fn from_extension(ext: &str) -> Option<Language> {
        match ext.to_ascii_lowercase().as_str() {
            "py" | "pyw" => Some(Self::Python),
            "js" | "jsx" | "mjs" | "cjs" => Some(Self::Javascript),
            "ts" | "tsx" | "mts" | "cts" => Some(Self::Typescript),
            "java" => Some(Self::Java),
            "cpp" | "cc" | "cxx" | "hpp" | "hh" => Some(Self::Cpp),
            "c" | "h" => Some(Self::C),
            "go" => Some(Self::Go),
            "rs" => Some(Self::Rust),
            "rb" => Some(Self::Ruby),
            "php" => Some(Self::Php),
            _ => None,
        }
    }

    /// Closest supported language name (Levenshtein distance <= 2).
    pub fn suggest(input: &str) -> Option<Language> {
        let lower = input.to_ascii_lowercase();
        let mut best: Option<(Language, usize)> = None;
        for lang in Self::ALL {
            let distance = levenshtein(&lower, lang.as_str());
            if distance <= 2 && best.is_none_or(|(_, d)| distance < d) {
                best = Some((lang, distance));
            }
        }
        best.map(|(lang, _)| lang)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = SubmissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lang = match s.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Self::Python,
            "javascript" | "js" => Self::Javascript,
            "typescript" | "ts" => Self::Typescript,
            "java" => Self::Java,
            "cpp" | "c++" | "cxx" => Self::Cpp,
            "c" => Self::C,
            "go" | "golang" => Self::Go,
            "rust" | "rs" => Self::Rust,
            "ruby" | "rb" => Self::Ruby,
            "php" => Self::Php,
            _ => {
                return Err(SubmissionError::UnsupportedLanguage {
                    given: s.to_string(),
                    suggestion: Self::suggest(s.trim()),
                });
            }
        };
        Ok(lang)
    }
}

/// A code snippet accepted for analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub code: String,
    pub language: Language,
    #[serde(default)]
    pub context: Context,
}

impl Submission {
    /// Build a submission from raw request parts.
    ///
    /// Rejects empty code and unsupported languages. Size limits are a
    /// deployment policy and are enforced by the orchestrator.
    pub fn parse(
        code: impl Into<String>,
        language: &str,
        context: Context,
    ) -> Result<Self, SubmissionError> {
        let language = language.parse()?;
        Self::new(code, language, context)
    }

    pub fn new(
        code: impl Into<String>,
        language: Language,
        context: Context,
    ) -> Result<Self, SubmissionError> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(SubmissionError::EmptyCode);
        }
        Ok(Self {
            code,
            language,
            context,
        })
    }
}

/// Finding severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single issue or note produced by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    /// Rule family, e.g. "syntax", "sql_injection", "code_smell"
    pub category: String,
    /// Stable rule identifier, e.g. "sec/sql-injection"
    pub rule: String,
    pub message: String,
    /// Line number (1-indexed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_example: Option<String>,
}

impl Finding {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        rule: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            rule: rule.into(),
            message: message.into(),
            line: None,
            suggestion: None,
            code_example: None,
        }
    }

    /// Attach a 1-indexed line number. Zero is treated as "no line".
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = u32::try_from(line).ok().filter(|l| *l >= 1);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_code_example(mut self, example: impl Into<String>) -> Self {
        self.code_example = Some(example.into());
        self
    }
}

/// Terminal status of one agent for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Completed,
    Error,
    Cancelled,
}

/// The outcome of running one agent against one submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent_id: AgentId,
    pub status: AgentStatus,
    pub findings: Vec<Finding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualization: Option<Visualization>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    pub elapsed_ms: u64,
}

impl AgentResult {
    pub fn completed(agent_id: AgentId, findings: Vec<Finding>) -> Self {
        Self {
            agent_id,
            status: AgentStatus::Completed,
            findings,
            error_detail: None,
            visualization: None,
            metadata: Map::new(),
            elapsed_ms: 0,
        }
    }

    pub fn failed(agent_id: AgentId, detail: impl Into<String>) -> Self {
        Self {
            agent_id,
            status: AgentStatus::Error,
            findings: Vec::new(),
            error_detail: Some(detail.into()),
            visualization: None,
            metadata: Map::new(),
            elapsed_ms: 0,
        }
    }

    pub fn cancelled(agent_id: AgentId, partial: Option<Visualization>) -> Self {
        Self {
            agent_id,
            status: AgentStatus::Cancelled,
            findings: Vec::new(),
            error_detail: Some("cancelled before completion".to_string()),
            visualization: partial,
            metadata: Map::new(),
            elapsed_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == AgentStatus::Completed
    }
}
