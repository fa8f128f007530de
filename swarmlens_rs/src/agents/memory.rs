//! Memory leak and retention detection
//!
//! # Rules
//!
//! | Rule ID | Languages | Pattern | Severity |
//! |---------|-----------|---------|----------|
//! | `mem/list-over-range` | python | list comprehension over `range()` | info |
//! | `mem/global-state` | python | `global` statement | warning |
//! | `mem/unmanaged-file` | python | `open()` outside `with` | warning |
//! | `mem/malloc-without-free` | c, cpp | `malloc`/`calloc`/`realloc` and no `free` | warning |
//! | `mem/global-interval` | js, ts | `setInterval` without `clearInterval` nearby | warning |
//! | `mem/event-listener` | js, ts | `addEventListener` without removal nearby | warning |
//! | `mem/module-cache-unbounded` | js, ts | module-level `Map`/`Set` without size limit | warning |
//!
//! # Example
//!
//! ```ignore
//! // BAD: grows forever
//! const cache = new Map();  // mem/module-cache-unbounded
//!
//! // GOOD: bounded
//! const cache = new LRUCache({ max: 100 });
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::AgentFailure;
use crate::source;
use crate::types::{Finding, Language, Severity, Submission};

use super::{Agent, AgentContext, AgentId, AgentOutput};

/// Maximum indentation (spaces) to consider a declaration at module level.
const MAX_MODULE_LEVEL_INDENT: usize = 4;

/// Lines scanned around a setInterval/addEventListener for its cleanup.
const CLEANUP_CONTEXT_WINDOW: usize = 30;

/// Memory rule identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryRule {
    ListOverRange,
    GlobalState,
    UnmanagedFile,
    MallocWithoutFree,
    GlobalInterval,
    EventListener,
    ModuleCacheUnbounded,
}

impl MemoryRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListOverRange => "mem/list-over-range",
            Self::GlobalState => "mem/global-state",
            Self::UnmanagedFile => "mem/unmanaged-file",
            Self::MallocWithoutFree => "mem/malloc-without-free",
            Self::GlobalInterval => "mem/global-interval",
            Self::EventListener => "mem/event-listener",
            Self::ModuleCacheUnbounded => "mem/module-cache-unbounded",
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::ListOverRange => "optimization",
            _ => "memory_leak",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::ListOverRange => Severity::Info,
            _ => Severity::Warning,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::ListOverRange => {
                "Consider using generators instead of list comprehensions for large datasets"
            }
            Self::GlobalState => "Global variables detected - may cause memory retention",
            Self::UnmanagedFile => "File opened without context manager - may leak file handles",
            Self::MallocWithoutFree => "Heap allocation without visible free - potential memory leak",
            Self::GlobalInterval => "setInterval without clearInterval keeps its closure alive",
            Self::EventListener => "addEventListener without removeEventListener - listener is never released",
            Self::ModuleCacheUnbounded => "Module-level Map/Set without size limit can grow unbounded",
        }
    }

    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::ListOverRange => "Use (x for x in ...) instead of [x for x in ...]",
            Self::GlobalState => "Consider using local variables or class instances",
            Self::UnmanagedFile => "Use \"with open(...) as f:\" to ensure proper cleanup",
            Self::MallocWithoutFree => "Pair every allocation with free() on all exit paths",
            Self::GlobalInterval => "Store interval ID and call clearInterval() in cleanup logic",
            Self::EventListener => {
                "Ensure removeEventListener is called when listener is no longer needed"
            }
            Self::ModuleCacheUnbounded => {
                "Consider using LRU cache with max size, or implement eviction logic"
            }
        }
    }

    fn finding(&self, line: usize) -> Finding {
        Finding::new(self.severity(), self.category(), self.as_str(), self.message())
            .at_line(line)
            .with_suggestion(self.suggestion())
    }
}

static LIST_OVER_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[[^\]]*\bfor\b[^\]]*\bin\s+range\s*\(").expect("valid list comprehension regex")
});

static GLOBAL_STMT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*global\s+\w+").expect("valid global regex"));

static OPEN_CALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bopen\s*\(").expect("valid open regex"));

static WITH_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:async\s+)?with\b").expect("valid with regex"));

static C_ALLOC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:malloc|calloc|realloc)\s*\(").expect("valid alloc regex"));

static C_FREE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bfree\s*\(").expect("valid free regex"));

static SET_INTERVAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bsetInterval\s*\(").expect("valid setInterval regex"));

static CLEAR_INTERVAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bclearInterval\s*\(").expect("valid clearInterval regex"));

static ADD_LISTENER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.addEventListener\s*\(").expect("valid addEventListener regex"));

static REMOVE_LISTENER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\.removeEventListener\s*\(|\bAbortController\b").expect("valid removal regex")
});

static MODULE_CACHE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:const|let|var)\s+\w+\s*=\s*new\s+(?:Map|Set)\s*\(\s*\)")
        .expect("valid module cache regex")
});

/// Check for LRU or bounded cache patterns
fn has_cache_limit_pattern(content: &str) -> bool {
    let lower = content.to_lowercase();
    lower.contains("lru")
        || lower.contains("maxsize")
        || lower.contains("max_size")
        || lower.contains("maxentries")
        || lower.contains("max_entries")
        || lower.contains(".delete(")
        || lower.contains(".clear(")
}

/// Lines `[line - 5, line + window)` joined for a nearby-cleanup check.
fn context_around(lines: &[&str], line_idx: usize, window: usize) -> String {
    let start = line_idx.saturating_sub(5);
    let end = (line_idx + window).min(lines.len());
    lines[start..end].join("\n")
}

pub struct MemoryProfiler;

impl Agent for MemoryProfiler {
    fn id(&self) -> AgentId {
        AgentId::MemoryProfiler
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
            Language::C | Language::Cpp => check_c_family(&code, &mut findings),
            Language::Javascript | Language::Typescript => {
                check_intervals(&code, &mut findings);
                ctx.checkpoint()?;
                check_event_listeners(&code, &mut findings);
                ctx.checkpoint()?;
                check_module_cache(&code, &mut findings);
            }
            _ => {}
        }
        ctx.checkpoint()?;

        let potential_leaks = findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
            .count();
        let optimizations = findings
            .iter()
            .filter(|f| f.category == "optimization")
            .count();
        Ok(AgentOutput::new(findings)
            .with_metadata("potential_leaks", potential_leaks)
            .with_metadata("optimizations", optimizations))
    }
}

fn check_python(code: &str, findings: &mut Vec<Finding>) {
    for (idx, line) in code.lines().enumerate() {
        if LIST_OVER_RANGE.is_match(line) {
            findings.push(MemoryRule::ListOverRange.finding(idx + 1));
        }
        if GLOBAL_STMT.is_match(line) {
            findings.push(MemoryRule::GlobalState.finding(idx + 1));
        }
        if OPEN_CALL.is_match(line) && !WITH_OPEN.is_match(line) {
            findings.push(MemoryRule::UnmanagedFile.finding(idx + 1));
        }
    }
}

fn check_c_family(code: &str, findings: &mut Vec<Finding>) {
    if C_FREE.is_match(code) {
        return;
    }
    for (idx, line) in code.lines().enumerate() {
        if C_ALLOC.is_match(line) {
            findings.push(MemoryRule::MallocWithoutFree.finding(idx + 1));
        }
    }
}

fn check_intervals(code: &str, findings: &mut Vec<Finding>) {
    let lines: Vec<&str> = code.lines().collect();
    for (idx, line) in lines.iter().enumerate() {
        if SET_INTERVAL.is_match(line)
            && !CLEAR_INTERVAL.is_match(&context_around(&lines, idx, CLEANUP_CONTEXT_WINDOW))
        {
            findings.push(MemoryRule::GlobalInterval.finding(idx + 1));
        }
    }
}

fn check_event_listeners(code: &str, findings: &mut Vec<Finding>) {
    let lines: Vec<&str> = code.lines().collect();
    for (idx, line) in lines.iter().enumerate() {
        if ADD_LISTENER.is_match(line)
            && !REMOVE_LISTENER.is_match(&context_around(&lines, idx, CLEANUP_CONTEXT_WINDOW))
        {
            findings.push(MemoryRule::EventListener.finding(idx + 1));
        }
    }
}

fn check_module_cache(code: &str, findings: &mut Vec<Finding>) {
    if has_cache_limit_pattern(code) {
        return;
    }
    for (idx, line) in code.lines().enumerate() {
        let trimmed = line.trim_start();
        if line.len() - trimmed.len() > MAX_MODULE_LEVEL_INDENT {
            continue;
        }
        if MODULE_CACHE.is_match(line) {
            findings.push(MemoryRule::ModuleCacheUnbounded.finding(idx + 1));
        }
    }
}
