//! Algorithm simulation engine.
//!
//! Given an [`Algorithm`] and optional input, runs an instrumented reference
//! implementation and records one [`Frame`] per significant operation
//! (comparison, swap, write, probe, node visit). Frames are owned snapshots
//! stored in a `Vec`, so replay and seek through a [`FrameCursor`] are O(1).
//!
//! The engine reproduces the canonical algorithm, not the submitted code.
//! Classification of arbitrary source into an algorithm lives in
//! [`classifier`].
//!
//! Execution is bounded: a [`StepGuard`] is consulted before every frame.
//! Past `max_frames` the recorder stops storing frames but the run keeps
//! counting, and the terminal frame always replaces the last stored one.

pub mod classifier;
mod graph;
mod searching;
mod sorting;
mod static_data;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::SimulationConfig;
use crate::error::SimulationError;

pub use classifier::{ClassificationResult, Classifier, classify};

/// Algorithm family. Declaration order is the classifier's tie precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Sorting,
    Searching,
    Graph,
    Tree,
    Array,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Sorting,
        Category::Searching,
        Category::Graph,
        Category::Tree,
        Category::Array,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sorting => "sorting",
            Self::Searching => "searching",
            Self::Graph => "graph",
            Self::Tree => "tree",
            Self::Array => "array",
        }
    }

    /// Algorithm used when a category is detected but no specific
    /// algorithm stands out.
    pub fn canonical(&self) -> Algorithm {
        match self {
            Self::Sorting => Algorithm::BubbleSort,
            Self::Searching => Algorithm::BinarySearch,
            Self::Graph => Algorithm::Bfs,
            Self::Tree => Algorithm::BinarySearchTree,
            Self::Array => Algorithm::StaticArray,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of reference implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    BubbleSort,
    SelectionSort,
    InsertionSort,
    MergeSort,
    QuickSort,
    HeapSort,
    LinearSearch,
    BinarySearch,
    Bfs,
    Dfs,
    Dijkstra,
    BinarySearchTree,
    StaticArray,
}

impl Algorithm {
    pub const ALL: [Algorithm; 13] = [
        Algorithm::BubbleSort,
        Algorithm::SelectionSort,
        Algorithm::InsertionSort,
        Algorithm::MergeSort,
        Algorithm::QuickSort,
        Algorithm::HeapSort,
        Algorithm::LinearSearch,
        Algorithm::BinarySearch,
        Algorithm::Bfs,
        Algorithm::Dfs,
        Algorithm::Dijkstra,
        Algorithm::BinarySearchTree,
        Algorithm::StaticArray,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BubbleSort => "bubble_sort",
            Self::SelectionSort => "selection_sort",
            Self::InsertionSort => "insertion_sort",
            Self::MergeSort => "merge_sort",
            Self::QuickSort => "quick_sort",
            Self::HeapSort => "heap_sort",
            Self::LinearSearch => "linear_search",
            Self::BinarySearch => "binary_search",
            Self::Bfs => "bfs",
            Self::Dfs => "dfs",
            Self::Dijkstra => "dijkstra",
            Self::BinarySearchTree => "binary_search_tree",
            Self::StaticArray => "array",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::BubbleSort => "Bubble Sort",
            Self::SelectionSort => "Selection Sort",
            Self::InsertionSort => "Insertion Sort",
            Self::MergeSort => "Merge Sort",
            Self::QuickSort => "Quick Sort",
            Self::HeapSort => "Heap Sort",
            Self::LinearSearch => "Linear Search",
            Self::BinarySearch => "Binary Search",
            Self::Bfs => "Breadth-First Search",
            Self::Dfs => "Depth-First Search",
            Self::Dijkstra => "Dijkstra's Shortest Path",
            Self::BinarySearchTree => "Binary Search Tree",
            Self::StaticArray => "Array",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Self::BubbleSort
            | Self::SelectionSort
            | Self::InsertionSort
            | Self::MergeSort
            | Self::QuickSort
            | Self::HeapSort => Category::Sorting,
            Self::LinearSearch | Self::BinarySearch => Category::Searching,
            Self::Bfs | Self::Dfs | Self::Dijkstra => Category::Graph,
            Self::BinarySearchTree => Category::Tree,
            Self::StaticArray => Category::Array,
        }
    }

    pub fn time_complexity(&self) -> &'static str {
        match self {
            Self::BubbleSort | Self::SelectionSort | Self::InsertionSort => "O(n^2)",
            Self::MergeSort | Self::HeapSort => "O(n log n)",
            Self::QuickSort => "O(n log n) average, O(n^2) worst",
            Self::LinearSearch => "O(n)",
            Self::BinarySearch => "O(log n)",
            Self::Bfs | Self::Dfs => "O(V + E)",
            Self::Dijkstra => "O(V^2)",
            Self::BinarySearchTree => "O(log n) average per operation",
            Self::StaticArray => "O(1) access",
        }
    }

    pub fn space_complexity(&self) -> &'static str {
        match self {
            Self::MergeSort => "O(n)",
            Self::QuickSort => "O(log n)",
            Self::Bfs | Self::Dfs | Self::Dijkstra => "O(V)",
            Self::BinarySearchTree | Self::StaticArray => "O(n)",
            _ => "O(1)",
        }
    }

    /// Sequential access over contiguous memory.
    pub fn cache_friendly(&self) -> bool {
        matches!(
            self,
            Self::BubbleSort
                | Self::SelectionSort
                | Self::InsertionSort
                | Self::MergeSort
                | Self::QuickSort
                | Self::LinearSearch
                | Self::StaticArray
        )
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let alg = match normalized.as_str() {
            "bubble" | "bubble_sort" => Self::BubbleSort,
            "selection" | "selection_sort" => Self::SelectionSort,
            "insertion" | "insertion_sort" => Self::InsertionSort,
            "merge" | "merge_sort" => Self::MergeSort,
            "quick" | "quick_sort" | "quicksort" => Self::QuickSort,
            "heap" | "heap_sort" | "heapsort" => Self::HeapSort,
            "linear" | "linear_search" => Self::LinearSearch,
            "binary" | "binary_search" => Self::BinarySearch,
            "bfs" | "breadth_first" => Self::Bfs,
            "dfs" | "depth_first" => Self::Dfs,
            "dijkstra" => Self::Dijkstra,
            "bst" | "tree" | "binary_search_tree" => Self::BinarySearchTree,
            "array" | "static_array" => Self::StaticArray,
            _ => return Err(SimulationError::UnknownAlgorithm(s.to_string())),
        };
        Ok(alg)
    }
}

// ============================================================================
// Frames
// ============================================================================

/// One recorded step of a sorting run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortingFrame {
    pub step: usize,
    pub array: Vec<i64>,
    pub comparing: BTreeSet<usize>,
    pub swapping: BTreeSet<usize>,
    /// Indices already in their final position
    pub sorted: BTreeSet<usize>,
    pub message: String,
}

/// One probe of a searching run. `left`/`right` are signed because binary
/// search may close the window with `right = -1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchingFrame {
    pub step: usize,
    pub array: Vec<i64>,
    pub left: i64,
    pub right: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mid: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found: Option<usize>,
    pub target: i64,
    pub message: String,
}

/// One node visit of a graph traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphFrame {
    pub step: usize,
    pub current_node: usize,
    /// Visit order
    pub visited: Vec<usize>,
    /// Pending frontier (queue, stack or priority order depending on traversal)
    pub queue: Vec<usize>,
    /// Tentative distances; `None` is unreachable so far
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distances: Option<BTreeMap<usize, Option<u64>>>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Frame {
    Sorting(SortingFrame),
    Searching(SearchingFrame),
    Graph(GraphFrame),
}

impl Frame {
    pub fn step(&self) -> usize {
        match self {
            Self::Sorting(f) => f.step,
            Self::Searching(f) => f.step,
            Self::Graph(f) => f.step,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Sorting(f) => &f.message,
            Self::Searching(f) => &f.message,
            Self::Graph(f) => &f.message,
        }
    }
}

// ============================================================================
// Visualization
// ============================================================================

/// Aggregate counters collected while the simulation runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub comparisons: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swaps: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes_visited: Option<u64>,
    pub time_complexity: String,
    pub space_complexity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryAnalysis {
    pub space_complexity: String,
    pub in_place: bool,
    pub cache_friendly: bool,
    pub recommendation: String,
}

/// Adjacency list keyed by node id, with optional undirected edge weights.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub adjacency: BTreeMap<usize, Vec<usize>>,
    /// `(from, to, weight)`; applies in both directions. Missing edges weigh 1.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weights: Vec<(usize, usize, u64)>,
}

impl Graph {
    /// Six-node sample graph used when no graph is supplied.
    pub fn sample() -> Self {
        let adjacency = BTreeMap::from([
            (0, vec![1, 2]),
            (1, vec![0, 3, 4]),
            (2, vec![0, 5]),
            (3, vec![1]),
            (4, vec![1, 5]),
            (5, vec![2, 4]),
        ]);
        Self {
            adjacency,
            weights: Vec::new(),
        }
    }

    /// Sample graph with fixed weights for shortest-path runs.
    pub fn weighted_sample() -> Self {
        Self {
            weights: vec![(0, 1, 4), (0, 2, 1), (1, 3, 1), (1, 4, 5), (2, 5, 2), (4, 5, 3)],
            ..Self::sample()
        }
    }

    pub fn weight(&self, from: usize, to: usize) -> u64 {
        self.weights
            .iter()
            .find(|(a, b, _)| (*a == from && *b == to) || (*a == to && *b == from))
            .map_or(1, |(_, _, w)| *w)
    }

    pub fn neighbors(&self, node: usize) -> &[usize] {
        self.adjacency
            .get(&node)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every node id, including ones only referenced as neighbors.
    pub fn nodes(&self) -> BTreeSet<usize> {
        self.adjacency
            .iter()
            .flat_map(|(node, edges)| std::iter::once(*node).chain(edges.iter().copied()))
            .collect()
    }
}

/// Complete, replayable output of one simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visualization {
    pub category: Category,
    pub algorithm: Algorithm,
    pub algorithm_name: String,
    pub frames: Vec<Frame>,
    pub metrics: Metrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_analysis: Option<MemoryAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<Graph>,
}

impl Visualization {
    pub fn cursor(&self) -> FrameCursor<'_> {
        FrameCursor::new(&self.frames)
    }
}

/// Random-access playback over a frame arena.
#[derive(Debug, Clone)]
pub struct FrameCursor<'a> {
    frames: &'a [Frame],
    pos: usize,
}

impl<'a> FrameCursor<'a> {
    pub fn new(frames: &'a [Frame]) -> Self {
        Self { frames, pos: 0 }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn current(&self) -> Option<&'a Frame> {
        self.frames.get(self.pos)
    }

    /// Advance one frame; stays on the last frame at the end.
    pub fn forward(&mut self) -> Option<&'a Frame> {
        if self.pos + 1 < self.frames.len() {
            self.pos += 1;
        }
        self.current()
    }

    /// Step back one frame; stays on the first frame at the start.
    pub fn back(&mut self) -> Option<&'a Frame> {
        self.pos = self.pos.saturating_sub(1);
        self.current()
    }

    /// Jump to an arbitrary frame, clamped to the last one.
    pub fn seek(&mut self, index: usize) -> Option<&'a Frame> {
        self.pos = index.min(self.frames.len().saturating_sub(1));
        self.current()
    }
}

// ============================================================================
// Bounded execution
// ============================================================================

/// Why a guard stopped a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Cancelled,
    TimedOut,
}

/// Consulted before every frame is recorded.
pub trait StepGuard {
    fn check(&self) -> Result<(), Interrupt>;
}

/// Guard that never interrupts. Used by the CLI `simulate` command and tests.
pub struct Unbounded;

impl StepGuard for Unbounded {
    fn check(&self) -> Result<(), Interrupt> {
        Ok(())
    }
}

/// Internal stop reason threaded through the algorithm implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Halt {
    Interrupted(Interrupt),
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Counters {
    pub comparisons: u64,
    pub swaps: u64,
    pub writes: u64,
    pub nodes_visited: u64,
}

/// Append-only frame arena plus operation counters.
pub(crate) struct FrameRecorder<'g> {
    guard: &'g dyn StepGuard,
    max_frames: usize,
    frames: Vec<Frame>,
    truncated: bool,
    pub counters: Counters,
    aux_live: usize,
    aux_peak: usize,
}

impl<'g> FrameRecorder<'g> {
    pub fn new(guard: &'g dyn StepGuard, max_frames: usize) -> Self {
        Self {
            guard,
            max_frames,
            frames: Vec::new(),
            truncated: false,
            counters: Counters::default(),
            aux_live: 0,
            aux_peak: 0,
        }
    }

    /// Record a frame. The builder receives the frame's step index and is
    /// only invoked when the frame will be stored.
    pub fn push(&mut self, build: impl FnOnce(usize) -> Frame) -> Result<(), Halt> {
        self.guard.check().map_err(Halt::Interrupted)?;
        if self.frames.len() >= self.max_frames {
            self.truncated = true;
            return Ok(());
        }
        let step = self.frames.len();
        self.frames.push(build(step));
        Ok(())
    }

    /// Record the terminal frame. When the arena is full it takes the place
    /// of the last stored frame so the final state is always visible.
    pub fn push_final(&mut self, build: impl FnOnce(usize) -> Frame) -> Result<(), Halt> {
        self.guard.check().map_err(Halt::Interrupted)?;
        if self.max_frames == 0 {
            self.truncated = true;
            return Ok(());
        }
        if self.frames.len() >= self.max_frames {
            self.truncated = true;
            self.frames.pop();
        }
        let step = self.frames.len();
        self.frames.push(build(step));
        Ok(())
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Track auxiliary cells allocated outside the input buffer.
    pub fn allocate(&mut self, cells: usize) {
        self.aux_live += cells;
        self.aux_peak = self.aux_peak.max(self.aux_live);
    }

    pub fn release(&mut self, cells: usize) {
        self.aux_live = self.aux_live.saturating_sub(cells);
    }

    pub fn aux_peak(&self) -> usize {
        self.aux_peak
    }

    fn into_frames(self) -> Vec<Frame> {
        self.frames
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Caller-supplied input; every field falls back to the algorithm's default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<Graph>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRequest {
    pub algorithm: Algorithm,
    pub input: InputData,
}

impl SimulationRequest {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            input: InputData::default(),
        }
    }

    pub fn with_input(mut self, input: InputData) -> Self {
        self.input = input;
        self
    }
}

pub const DEFAULT_SORT_INPUT: [i64; 7] = [64, 34, 25, 12, 22, 11, 90];
pub const DEFAULT_SEARCH_INPUT: [i64; 7] = [11, 12, 22, 25, 34, 64, 90];
pub const DEFAULT_SEARCH_TARGET: i64 = 25;

/// Run a reference implementation and record its trace.
pub fn simulate(
    request: &SimulationRequest,
    limits: &SimulationConfig,
    guard: &dyn StepGuard,
) -> Result<Visualization, SimulationError> {
    let algorithm = request.algorithm;
    let mut recorder = FrameRecorder::new(guard, limits.max_frames);
    let mut notes: Vec<String> = Vec::new();

    let mut data = request.input.data.clone();
    if let Some(values) = data.as_mut()
        && values.len() > limits.sampling_threshold
    {
        notes.push(format!(
            "input truncated to {} of {} elements",
            limits.sampling_threshold,
            values.len()
        ));
        values.truncate(limits.sampling_threshold);
    }

    let mut vis = Visualization {
        category: algorithm.category(),
        algorithm,
        algorithm_name: algorithm.display_name().to_string(),
        frames: Vec::new(),
        metrics: Metrics {
            comparisons: 0,
            swaps: None,
            writes: None,
            nodes_visited: None,
            time_complexity: algorithm.time_complexity().to_string(),
            space_complexity: algorithm.space_complexity().to_string(),
        },
        memory_analysis: None,
        sample_data: None,
        message: None,
        input: None,
        target: None,
        graph: None,
    };

    let outcome = match algorithm.category() {
        Category::Sorting => {
            let input = data.unwrap_or_else(|| DEFAULT_SORT_INPUT.to_vec());
            if input.is_empty() {
                return Err(SimulationError::InvalidInput(
                    "sorting needs at least one element".into(),
                ));
            }
            vis.input = Some(input.clone());
            sorting::run(algorithm, &mut recorder, input)
        }
        Category::Searching => {
            let (input, target) = searching::resolve_input(data, request.input.target)?;
            vis.input = Some(input.clone());
            vis.target = Some(target);
            searching::run(algorithm, &mut recorder, input, target)
        }
        Category::Graph => {
            let graph = match request.input.graph.clone() {
                Some(graph) => graph,
                None if algorithm == Algorithm::Dijkstra => Graph::weighted_sample(),
                None => Graph::sample(),
            };
            let start = request.input.start.unwrap_or(0);
            graph::validate(&graph, start)?;
            let outcome = graph::run(algorithm, &mut recorder, &graph, start);
            vis.graph = Some(graph);
            outcome
        }
        Category::Tree => {
            let (sample, message) = static_data::tree(data.as_deref(), &mut recorder.counters);
            vis.sample_data = Some(sample);
            notes.insert(0, message);
            Ok(())
        }
        Category::Array => {
            let (sample, message) = static_data::array(data.as_deref());
            vis.sample_data = Some(sample);
            notes.insert(0, message);
            Ok(())
        }
    };

    let counters = recorder.counters;
    let in_place = recorder.aux_peak() == 0;
    if recorder.truncated() {
        notes.push(format!("frames truncated at {}", limits.max_frames));
    }
    vis.frames = recorder.into_frames();
    vis.metrics.comparisons = counters.comparisons;
    match algorithm.category() {
        Category::Sorting => {
            vis.metrics.swaps = Some(counters.swaps);
            vis.metrics.writes = Some(counters.writes);
        }
        Category::Graph => vis.metrics.nodes_visited = Some(counters.nodes_visited),
        _ => {}
    }
    if matches!(
        algorithm.category(),
        Category::Sorting | Category::Searching | Category::Graph
    ) {
        vis.memory_analysis = Some(memory_analysis(algorithm, in_place));
    }
    if !notes.is_empty() {
        vis.message = Some(notes.join("; "));
    }

    match outcome {
        Ok(()) => Ok(vis),
        Err(Halt::Interrupted(Interrupt::Cancelled)) => Err(SimulationError::Cancelled {
            partial: Box::new(vis),
        }),
        Err(Halt::Interrupted(Interrupt::TimedOut)) => Err(SimulationError::TimedOut),
    }
}

fn memory_analysis(algorithm: Algorithm, in_place: bool) -> MemoryAnalysis {
    let cache_friendly = algorithm.cache_friendly();
    let recommendation = match (in_place, cache_friendly) {
        (true, true) => "Operates in place with sequential access; memory footprint is minimal",
        (true, false) => {
            "In place, but access jumps across the buffer; expect cache misses on large inputs"
        }
        (false, true) => {
            "Allocates auxiliary buffers; consider an in-place variant when memory is tight"
        }
        (false, false) => {
            "Auxiliary structures grow with the input; prefer compact index-based storage"
        }
    };
    MemoryAnalysis {
        space_complexity: algorithm.space_complexity().to_string(),
        in_place,
        cache_friendly,
        recommendation: recommendation.to_string(),
    }
}
