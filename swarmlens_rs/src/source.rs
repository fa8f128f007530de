//! Lexical helpers shared by the agents and the pattern classifier.
//!
//! None of this is a parser. These are line- and token-level heuristics that
//! work the same way across all supported languages, which is what the rule
//! tables need: cheap, deterministic signals.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::Language;

static BRACE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(for|while|loop|do|if|switch|match)\b|[(){};]").expect("valid brace token regex")
});

static INDENT_LOOP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(for|while|until)\b|\.(each|times|upto|downto)\b.*\bdo\b")
        .expect("valid indent loop regex")
});

static INDENT_CONTROL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(if|elif|else|unless|for|while|until|try|with|case)\b")
        .expect("valid indent control regex")
});

static NUMERIC_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\[{]\s*(-?\d+(?:\s*,\s*-?\d+){2,})\s*,?\s*[\]}]")
        .expect("valid numeric list regex")
});

static PY_DEF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*def\s+(\w+)\s*\(([^)]*)\)").expect("valid python def regex"));

static RUBY_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*def\s+(?:self\.)?(\w+[?!]?)(?:\s*\(([^)]*)\))?").expect("valid ruby def regex")
});

static JS_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:function\s*\*?\s*(\w+)\s*\(([^)]*)\))|(?:(?:const|let|var)\s+(\w+)\s*=\s*(?:async\s*)?\(([^)]*)\)\s*=>)",
    )
    .expect("valid js def regex")
});

static GO_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*func\s+(?:\([^)]*\)\s*)?(\w+)\s*\(([^)]*)\)").expect("valid go def regex")
});

static RUST_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:const\s+)?(?:unsafe\s+)?fn\s+(\w+)\s*(?:<[^>]*>)?\s*\(([^)]*)\)")
        .expect("valid rust def regex")
});

static PHP_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"function\s+&?(\w+)\s*\(([^)]*)\)").expect("valid php def regex")
});

static C_LIKE_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:(?:public|private|protected|static|final|inline|virtual|const|unsigned|signed|synchronized|abstract)\s+)*[\w:<>\[\],]+[\s*&]+(\w+)\s*\(([^)]*)\)\s*(?:const\s*)?(?:throws\s+[\w.,\s]+)?\{?\s*$",
    )
    .expect("valid c-like def regex")
});

const NOT_FUNCTION_NAMES: &[&str] = &[
    "if", "for", "while", "switch", "return", "catch", "else", "new", "sizeof", "delete", "throw",
];

/// A function definition found in a snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: String,
    /// First line of the definition (1-indexed)
    pub line: usize,
    /// Last line of the body (1-indexed, inclusive)
    pub end_line: usize,
    pub params: usize,
}

impl FunctionDef {
    pub fn len_lines(&self) -> usize {
        self.end_line.saturating_sub(self.line)
    }
}

/// Replace line comments with whitespace, preserving line numbering.
///
/// String literals are not tracked, so a comment marker inside a string cuts
/// the line short. Good enough for heuristics, not for rewriting code.
pub fn strip_comments(code: &str, language: Language) -> String {
    let marker = language.line_comment();
    let mut out = String::with_capacity(code.len());
    let mut in_block = false;

    for line in code.lines() {
        let mut kept = String::new();
        let mut rest = line;
        loop {
            if in_block {
                match rest.find("*/") {
                    Some(end) => {
                        rest = &rest[end + 2..];
                        in_block = false;
                    }
                    None => break,
                }
            } else if language.line_comment() == "//"
                && let Some(start) = rest.find("/*")
                && rest.find(marker).is_none_or(|m| start < m)
            {
                kept.push_str(&rest[..start]);
                rest = &rest[start + 2..];
                in_block = true;
            } else {
                match rest.find(marker) {
                    Some(pos) => kept.push_str(&rest[..pos]),
                    None => kept.push_str(rest),
                }
                break;
            }
        }
        out.push_str(&kept);
        out.push('\n');
    }
    out
}

/// 1-indexed line number of a byte offset.
pub fn line_of(code: &str, offset: usize) -> usize {
    let end = offset.min(code.len());
    code.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
}

/// Maximum nesting depth of loops.
pub fn loop_depth(code: &str, language: Language) -> usize {
    let code = strip_comments(code, language);
    let (depth, _) = if language.is_indent_scoped() {
        indent_depth(&code, &INDENT_LOOP)
    } else {
        brace_depth(&code, true)
    };
    depth
}

/// Maximum nesting depth of control-flow blocks (conditionals and loops).
pub fn control_depth(code: &str, language: Language) -> usize {
    deepest_control(code, language).0
}

/// Maximum control-flow nesting depth and the 1-indexed line where it is
/// first reached (0 when there is no control flow at all).
pub fn deepest_control(code: &str, language: Language) -> (usize, usize) {
    let code = strip_comments(code, language);
    if language.is_indent_scoped() {
        indent_depth(&code, &INDENT_CONTROL)
    } else {
        brace_depth(&code, false)
    }
}

fn indent_depth(code: &str, opener: &Regex) -> (usize, usize) {
    let mut open: Vec<usize> = Vec::new();
    let mut max = (0, 0);
    for (idx, line) in code.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            continue;
        }
        let indent = line.len() - trimmed.len();
        while open.last().is_some_and(|top| indent <= *top) {
            open.pop();
        }
        if opener.is_match(trimmed) {
            open.push(indent);
            if open.len() > max.0 {
                max = (open.len(), idx + 1);
            }
        }
    }
    max
}

#[derive(Clone, Copy, PartialEq)]
enum Block {
    Loop,
    Control,
    Plain,
}

fn brace_depth(code: &str, loops_only: bool) -> (usize, usize) {
    let mut stack: Vec<Block> = Vec::new();
    let mut pending: Option<Block> = None;
    let mut parens = 0usize;
    let mut max = (0, 0);

    for token in BRACE_TOKEN.find_iter(code) {
        match token.as_str() {
            "(" => parens += 1,
            ")" => parens = parens.saturating_sub(1),
            ";" if parens == 0 => pending = None,
            ";" => {}
            "{" => {
                stack.push(pending.take().unwrap_or(Block::Plain));
                let depth = stack
                    .iter()
                    .filter(|b| match b {
                        Block::Loop => true,
                        Block::Control => !loops_only,
                        Block::Plain => false,
                    })
                    .count();
                if depth > max.0 {
                    max = (depth, line_of(code, token.start()));
                }
            }
            "}" => {
                stack.pop();
            }
            "for" | "while" | "loop" | "do" => pending = Some(Block::Loop),
            _ => pending = Some(Block::Control),
        }
    }
    max
}

/// Function definitions, in source order.
pub fn functions(code: &str, language: Language) -> Vec<FunctionDef> {
    let stripped = strip_comments(code, language);
    let lines: Vec<&str> = stripped.lines().collect();
    let mut defs = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let Some((name, params)) = match_def(line, language) else {
            continue;
        };
        if NOT_FUNCTION_NAMES.contains(&name.as_str()) {
            continue;
        }
        let end = if language.is_indent_scoped() {
            indent_block_end(&lines, idx)
        } else {
            brace_block_end(&lines, idx)
        };
        defs.push(FunctionDef {
            name,
            line: idx + 1,
            end_line: end + 1,
            params,
        });
    }
    defs
}

fn match_def(line: &str, language: Language) -> Option<(String, usize)> {
    let re: &Regex = match language {
        Language::Python => &PY_DEF,
        Language::Ruby => &RUBY_DEF,
        Language::Javascript | Language::Typescript => &JS_DEF,
        Language::Go => &GO_DEF,
        Language::Rust => &RUST_DEF,
        Language::Php => &PHP_DEF,
        Language::C | Language::Cpp | Language::Java => &C_LIKE_DEF,
    };
    let caps = re.captures(line)?;
    // JS has two alternatives; pick whichever matched.
    let (name, params) = match (caps.get(1), caps.get(3)) {
        (Some(name), _) => (name.as_str(), caps.get(2).map_or("", |m| m.as_str())),
        (None, Some(name)) => (name.as_str(), caps.get(4).map_or("", |m| m.as_str())),
        (None, None) => return None,
    };
    let count = params.split(',').filter(|p| !p.trim().is_empty()).count();
    Some((name.to_string(), count))
}

fn indent_block_end(lines: &[&str], start: usize) -> usize {
    let head = lines[start];
    let base = head.len() - head.trim_start().len();
    let mut end = start;
    for (idx, line) in lines.iter().enumerate().skip(start + 1) {
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            continue;
        }
        let indent = line.len() - trimmed.len();
        if indent <= base {
            // Ruby closes with `end` on the def's own indentation.
            if trimmed == "end" {
                end = idx;
            }
            break;
        }
        end = idx;
    }
    end
}

fn brace_block_end(lines: &[&str], start: usize) -> usize {
    let mut depth = 0usize;
    let mut opened = false;
    for (idx, line) in lines.iter().enumerate().skip(start) {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => {
                    depth = depth.saturating_sub(1);
                    if opened && depth == 0 {
                        return idx;
                    }
                }
                _ => {}
            }
        }
        // A declaration that never opens a body (prototype) ends on its line.
        if !opened && line.trim_end().ends_with(';') {
            return idx;
        }
    }
    lines.len().saturating_sub(1)
}

/// Body text of a function (lines after the definition line).
pub fn body_of<'a>(code: &'a str, def: &FunctionDef) -> Vec<&'a str> {
    code.lines()
        .skip(def.line)
        .take(def.end_line.saturating_sub(def.line))
        .collect()
}

/// Names of functions that call themselves.
pub fn recursive_functions(code: &str, language: Language) -> Vec<String> {
    let stripped = strip_comments(code, language);
    functions(&stripped, language)
        .into_iter()
        .filter(|def| {
            let Ok(call) = Regex::new(&format!(r"\b{}\s*\(", regex::escape(&def.name))) else {
                return false;
            };
            body_of(&stripped, def)
                .iter()
                .any(|line| call.is_match(line))
        })
        .map(|def| def.name)
        .collect()
}

/// First literal list of at least three integers, e.g. `[5, 3, 9]` or `{5, 3, 9}`.
pub fn numeric_list_literal(code: &str) -> Option<Vec<i64>> {
    let caps = NUMERIC_LIST.captures(code)?;
    caps.get(1)?
        .as_str()
        .split(',')
        .map(|n| n.trim().parse::<i64>().ok())
        .collect()
}
