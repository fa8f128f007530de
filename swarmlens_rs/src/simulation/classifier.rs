//! Pattern classifier: which canonical algorithm does a snippet implement?
//!
//! Signals are scored independently per category with integer weights:
//!
//! | Category  | Signals |
//! |-----------|---------|
//! | sorting   | `sort` identifiers, nested loops, swaps, adjacent compares, pivot/partition, merge, heapify |
//! | searching | `search`/`find` identifiers, target/needle, halving arithmetic, low/high bounds |
//! | graph     | adjacency/neighbors vocabulary, `visited`, queue/stack, distances/priority queues |
//! | tree      | `node`/`root`, `.left`/`.right` member access, `tree`/`bst` identifiers, recursion |
//! | array     | numeric list literals, indexing, `array`/`list` identifiers, append/push |
//!
//! The highest score wins; ties resolve by [`Category::ALL`] order. Confidence
//! is `min(1, score / 10)`. Below the configured minimum the snippet is
//! unclassified, which is not an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::config::DEFAULT_MIN_CONFIDENCE;
use crate::source;
use crate::types::Language;

use super::{Algorithm, Category};

const FULL_CONFIDENCE_SCORE: f32 = 10.0;

static IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z_]\w*").expect("valid ident regex"));

static TUPLE_SWAP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\w+\[[^\]]+\]\s*,\s*\w+\[[^\]]+\]\s*=\s*\w+\[[^\]]+\]\s*,\s*\w+\[[^\]]+\]")
        .expect("valid tuple swap regex")
});

static TEMP_SWAP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:temp|tmp|t)\s*=\s*\w+\[[^\]]+\]").expect("valid temp swap regex")
});

static SWAP_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bswap\s*\(|\.swap\s*\(").expect("valid swap call regex"));

static ADJACENT_INDEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\s*\w+\s*\+\s*1\s*\]").expect("valid adjacent index regex"));

static SHIFT_ASSIGN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\w+\[\s*\w+\s*\+\s*1\s*\]\s*=\s*\w+\[\s*\w+\s*\]").expect("valid shift regex")
});

static HALVING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"//\s*2\b|/\s*2\b|>>\s*1\b|>>>\s*1\b").expect("valid halving regex")
});

static MEMBER_CHILD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\.|->)(?:left|right)\b").expect("valid member regex"));

static INDEXING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w+\[\s*\w+\s*\]").expect("valid indexing regex"));

static QUEUE_OPS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bpopleft\b|\bdeque\b|\.shift\s*\(|\bqueue\b|\bQueue\b|\bVecDeque\b")
        .expect("valid queue regex")
});

/// Outcome of a successful classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub category: Category,
    pub algorithm: Algorithm,
    pub confidence: f32,
    pub score: u32,
}

/// Raw per-category scores, in precedence order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryScores {
    pub sorting: u32,
    pub searching: u32,
    pub graph: u32,
    pub tree: u32,
    pub array: u32,
}

impl CategoryScores {
    pub fn get(&self, category: Category) -> u32 {
        match category {
            Category::Sorting => self.sorting,
            Category::Searching => self.searching,
            Category::Graph => self.graph,
            Category::Tree => self.tree,
            Category::Array => self.array,
        }
    }

    /// Highest-scoring category; the earliest category wins a tie.
    pub fn best(&self) -> (Category, u32) {
        let mut best = (Category::Sorting, self.sorting);
        for category in Category::ALL {
            let score = self.get(category);
            if score > best.1 {
                best = (category, score);
            }
        }
        best
    }
}

/// Lexical facts extracted once and shared by every scorer.
struct Signals {
    idents: Vec<String>,
    text: String,
    loop_depth: usize,
    recursive: bool,
}

impl Signals {
    fn extract(code: &str, language: Language) -> Self {
        let text = source::strip_comments(code, language);
        let idents = IDENT
            .find_iter(&text)
            .map(|m| m.as_str().to_ascii_lowercase())
            .collect();
        Self {
            idents,
            loop_depth: source::loop_depth(code, language),
            recursive: !source::recursive_functions(code, language).is_empty(),
            text,
        }
    }

    /// Some identifier contains any of the fragments.
    fn mentions(&self, fragments: &[&str]) -> bool {
        self.idents
            .iter()
            .any(|id| fragments.iter().any(|f| id.contains(f)))
    }

    /// Some identifier equals any of the words.
    fn names(&self, words: &[&str]) -> bool {
        self.idents.iter().any(|id| words.contains(&id.as_str()))
    }

    fn matches(&self, re: &Regex) -> bool {
        re.is_match(&self.text)
    }
}

fn weight(cond: bool, points: u32) -> u32 {
    if cond { points } else { 0 }
}

fn score_sorting(s: &Signals) -> u32 {
    weight(s.mentions(&["sort"]), 4)
        + weight(s.loop_depth >= 2, 2)
        + weight(
            s.matches(&TUPLE_SWAP) || s.matches(&SWAP_CALL) || s.matches(&TEMP_SWAP),
            3,
        )
        + weight(s.matches(&ADJACENT_INDEX), 1)
        + weight(s.mentions(&["pivot", "partition"]), 3)
        + weight(s.mentions(&["merge"]), 2)
        + weight(s.mentions(&["heapify"]), 3)
}

fn score_searching(s: &Signals) -> u32 {
    let bounds = s.names(&["low", "lo", "left", "l"]) && s.names(&["high", "hi", "right", "r"]);
    weight(s.mentions(&["search", "find", "index_of", "indexof"]), 3)
        + weight(s.names(&["target", "needle", "key", "x"]), 2)
        + weight(s.matches(&HALVING) && s.names(&["mid", "middle", "m"]), 3)
        + weight(bounds, 2)
        + weight(s.loop_depth == 1 || s.recursive, 1)
}

fn score_graph(s: &Signals) -> u32 {
    weight(
        s.mentions(&["graph", "adj", "neighbor", "neighbour", "edges", "vertex", "vertices"]),
        3,
    ) + weight(s.mentions(&["visited", "seen"]), 3)
        + weight(s.matches(&QUEUE_OPS), 2)
        + weight(s.names(&["stack"]), 1)
        + weight(s.mentions(&["dist", "heapq", "priority"]), 2)
        + weight(s.mentions(&["bfs", "dfs", "dijkstra"]), 3)
}

fn score_tree(s: &Signals) -> u32 {
    weight(s.mentions(&["node"]), 2)
        + weight(s.matches(&MEMBER_CHILD), 4)
        + weight(s.names(&["root"]), 2)
        + weight(s.mentions(&["tree", "bst"]), 3)
        + weight(s.mentions(&["insert"]), 1)
        + weight(s.recursive, 1)
}

fn score_array(s: &Signals) -> u32 {
    weight(source::numeric_list_literal(&s.text).is_some(), 2)
        + weight(s.matches(&INDEXING), 1)
        + weight(s.mentions(&["array", "arr", "list", "vec"]), 1)
        + weight(s.names(&["append", "push", "push_back", "add"]), 1)
}

/// Pick the most specific algorithm within a category.
fn pick_algorithm(category: Category, s: &Signals) -> Algorithm {
    let candidates: Vec<(Algorithm, u32)> = match category {
        Category::Sorting => vec![
            (
                Algorithm::BubbleSort,
                weight(s.mentions(&["bubble"]), 5) + weight(s.matches(&ADJACENT_INDEX), 2),
            ),
            (
                Algorithm::SelectionSort,
                weight(s.mentions(&["selection"]), 5)
                    + weight(s.mentions(&["min_idx", "min_index", "minidx", "smallest"]), 3),
            ),
            (
                Algorithm::InsertionSort,
                weight(s.mentions(&["insertion"]), 5)
                    + weight(s.matches(&SHIFT_ASSIGN) && s.names(&["key"]), 3),
            ),
            (
                Algorithm::MergeSort,
                weight(s.mentions(&["merge"]), 5) + weight(s.recursive, 1),
            ),
            (
                Algorithm::QuickSort,
                weight(s.mentions(&["quick"]), 5) + weight(s.mentions(&["pivot", "partition"]), 4),
            ),
            (
                Algorithm::HeapSort,
                weight(s.mentions(&["heap"]), 5) + weight(s.mentions(&["heapify"]), 3),
            ),
        ],
        Category::Searching => vec![
            (
                Algorithm::LinearSearch,
                weight(s.mentions(&["linear"]), 5)
                    + weight(s.loop_depth == 1 && !s.matches(&HALVING), 2),
            ),
            (
                Algorithm::BinarySearch,
                weight(s.mentions(&["binary"]), 5)
                    + weight(s.matches(&HALVING), 3)
                    + weight(s.names(&["mid", "middle"]), 2),
            ),
        ],
        Category::Graph => vec![
            (
                Algorithm::Bfs,
                weight(s.mentions(&["bfs", "breadth"]), 5) + weight(s.matches(&QUEUE_OPS), 3),
            ),
            (
                Algorithm::Dfs,
                weight(s.mentions(&["dfs", "depth_first", "depthfirst"]), 5)
                    + weight(s.recursive, 2)
                    + weight(s.names(&["stack"]), 2),
            ),
            (
                Algorithm::Dijkstra,
                weight(s.mentions(&["dijkstra"]), 6)
                    + weight(s.mentions(&["dist"]), 3)
                    + weight(s.mentions(&["heapq", "priority"]), 2),
            ),
        ],
        Category::Tree => vec![(Algorithm::BinarySearchTree, 0)],
        Category::Array => vec![(Algorithm::StaticArray, 0)],
    };

    let mut best = (category.canonical(), 0);
    for (algorithm, score) in candidates {
        if score > best.1 {
            best = (algorithm, score);
        }
    }
    best.0
}

/// Scores every category without applying the confidence threshold.
pub fn score(code: &str, language: Language) -> CategoryScores {
    scores_from(&Signals::extract(code, language))
}

fn scores_from(s: &Signals) -> CategoryScores {
    CategoryScores {
        sorting: score_sorting(s),
        searching: score_searching(s),
        graph: score_graph(s),
        tree: score_tree(s),
        array: score_array(s),
    }
}

/// Deterministic classifier with a configurable confidence floor.
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    pub min_confidence: f32,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl Classifier {
    pub fn new(min_confidence: f32) -> Self {
        Self { min_confidence }
    }

    pub fn classify(&self, code: &str, language: Language) -> Option<ClassificationResult> {
        let signals = Signals::extract(code, language);
        let (category, score) = scores_from(&signals).best();
        let confidence = (score as f32 / FULL_CONFIDENCE_SCORE).min(1.0);
        if score == 0 || confidence < self.min_confidence {
            return None;
        }
        Some(ClassificationResult {
            category,
            algorithm: pick_algorithm(category, &signals),
            confidence,
            score,
        })
    }
}

/// Classify with the default confidence floor.
pub fn classify(code: &str, language: Language) -> Option<ClassificationResult> {
    Classifier::default().classify(code, language)
}
