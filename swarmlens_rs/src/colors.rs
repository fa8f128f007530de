//! ANSI coloring for the human-readable `slens` output.

use std::fmt::Display;
use std::io::IsTerminal;

use clap::ValueEnum;

use crate::orchestrator::RunStatus;
use crate::types::{AgentStatus, Severity};

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const BLUE: &str = "\x1b[34m";
pub const MAGENTA: &str = "\x1b[35m";

pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const RESET: &str = "\x1b[0m";

pub const BRIGHT_RED: &str = "\x1b[91m";
pub const BRIGHT_CYAN: &str = "\x1b[96m";

/// When to emit ANSI escapes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Only when stdout is a terminal
    #[default]
    Auto,
    Always,
    Never,
}

pub fn is_enabled(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => std::io::stdout().is_terminal(),
    }
}

/// Colorizer passed to the report formatters.
#[derive(Clone, Copy)]
pub struct Painter {
    enabled: bool,
}

impl Painter {
    pub fn new(mode: ColorMode) -> Self {
        Self {
            enabled: is_enabled(mode),
        }
    }

    pub fn header(&self, s: &str) -> String {
        self.wrap(s, BOLD)
    }

    pub fn dim(&self, s: &str) -> String {
        self.wrap(s, DIM)
    }

    /// Agent and algorithm identifiers
    pub fn symbol(&self, s: &str) -> String {
        self.wrap(s, MAGENTA)
    }

    pub fn number(&self, n: impl Display) -> String {
        self.wrap(&n.to_string(), BRIGHT_CYAN)
    }

    /// Severity label, padded for column alignment before coloring.
    pub fn severity(&self, severity: Severity) -> String {
        let label = format!("{:<8}", severity.as_str());
        match severity {
            Severity::Critical => self.wrap_both(&label, BOLD, BRIGHT_RED),
            Severity::Error => self.wrap(&label, RED),
            Severity::Warning => self.wrap(&label, YELLOW),
            Severity::Info => self.wrap(&label, BLUE),
        }
    }

    pub fn agent_status(&self, status: AgentStatus) -> String {
        match status {
            AgentStatus::Completed => self.wrap("[OK]", GREEN),
            AgentStatus::Error => self.wrap("[ERROR]", RED),
            AgentStatus::Cancelled => self.wrap("[CANCELLED]", YELLOW),
        }
    }

    pub fn run_status(&self, status: RunStatus) -> String {
        let code = match status {
            RunStatus::Completed => GREEN,
            RunStatus::Partial | RunStatus::Cancelled => YELLOW,
            RunStatus::Failed => RED,
            RunStatus::Pending | RunStatus::Running => DIM,
        };
        self.wrap(status.as_str(), code)
    }

    /// Quality score, green from 80, yellow from 50, red below.
    pub fn score(&self, score: u32) -> String {
        let code = match score {
            80.. => GREEN,
            50..=79 => YELLOW,
            _ => RED,
        };
        self.wrap_both(&score.to_string(), BOLD, code)
    }

    pub fn wrap(&self, s: &str, code: &str) -> String {
        if self.enabled {
            format!("{code}{s}{RESET}")
        } else {
            s.to_string()
        }
    }

    pub fn wrap_both(&self, s: &str, code1: &str, code2: &str) -> String {
        if self.enabled {
            format!("{code1}{code2}{s}{RESET}")
        } else {
            s.to_string()
        }
    }
}
