//! Instrumented graph traversals. One frame per visited node.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::error::SimulationError;

use super::{Algorithm, Frame, FrameRecorder, Graph, GraphFrame, Halt};

pub(super) fn validate(graph: &Graph, start: usize) -> Result<(), SimulationError> {
    if graph.adjacency.is_empty() {
        return Err(SimulationError::InvalidInput("graph has no nodes".into()));
    }
    if !graph.nodes().contains(&start) {
        return Err(SimulationError::InvalidInput(format!(
            "start node {start} is not in the graph"
        )));
    }
    Ok(())
}

pub(super) fn run(
    algorithm: Algorithm,
    rec: &mut FrameRecorder<'_>,
    graph: &Graph,
    start: usize,
) -> Result<(), Halt> {
    match algorithm {
        Algorithm::Dfs => dfs(rec, graph, start),
        Algorithm::Dijkstra => dijkstra(rec, graph, start),
        _ => bfs(rec, graph, start),
    }
}

fn visit(
    rec: &mut FrameRecorder<'_>,
    current: usize,
    visited: &[usize],
    queue: Vec<usize>,
    distances: Option<BTreeMap<usize, Option<u64>>>,
    message: String,
) -> Result<(), Halt> {
    rec.push(|step| {
        Frame::Graph(GraphFrame {
            step,
            current_node: current,
            visited: visited.to_vec(),
            queue,
            distances,
            message,
        })
    })?;
    rec.counters.nodes_visited += 1;
    Ok(())
}

/// `visited` only holds dequeued nodes; `discovered` keeps the queue free of
/// duplicates. Each frame is taken as a node leaves the queue, before its
/// neighbors are enqueued.
fn bfs(rec: &mut FrameRecorder<'_>, graph: &Graph, start: usize) -> Result<(), Halt> {
    let mut visited: Vec<usize> = Vec::new();
    let mut discovered = BTreeSet::from([start]);
    let mut queue = VecDeque::from([start]);
    rec.allocate(2);

    while let Some(node) = queue.pop_front() {
        visited.push(node);
        visit(
            rec,
            node,
            &visited,
            queue.iter().copied().collect(),
            None,
            format!("Visiting node {node}"),
        )?;
        for &next in graph.neighbors(node) {
            rec.counters.comparisons += 1;
            if discovered.insert(next) {
                queue.push_back(next);
                rec.allocate(2);
            }
        }
    }
    Ok(())
}

fn dfs(rec: &mut FrameRecorder<'_>, graph: &Graph, start: usize) -> Result<(), Halt> {
    let mut visited: Vec<usize> = Vec::new();
    let mut stack = vec![start];
    rec.allocate(1);

    while let Some(node) = stack.pop() {
        if visited.contains(&node) {
            continue;
        }
        visited.push(node);
        rec.allocate(1);
        // Push in reverse so the lowest neighbor is explored first.
        for &next in graph.neighbors(node).iter().rev() {
            rec.counters.comparisons += 1;
            if !visited.contains(&next) {
                stack.push(next);
                rec.allocate(1);
            }
        }
        visit(
            rec,
            node,
            &visited,
            pending_frontier(&stack, &visited),
            None,
            format!("Visiting node {node}"),
        )?;
    }
    Ok(())
}

/// Stack top first; stale entries and repeats are hidden.
fn pending_frontier(stack: &[usize], visited: &[usize]) -> Vec<usize> {
    let mut seen = BTreeSet::new();
    stack
        .iter()
        .rev()
        .copied()
        .filter(|node| !visited.contains(node) && seen.insert(*node))
        .collect()
}

/// O(V^2) Dijkstra: the frontier is scanned for the closest unsettled node,
/// lowest id first on ties.
fn dijkstra(rec: &mut FrameRecorder<'_>, graph: &Graph, start: usize) -> Result<(), Halt> {
    let mut dist: BTreeMap<usize, Option<u64>> =
        graph.nodes().into_iter().map(|n| (n, None)).collect();
    dist.insert(start, Some(0));
    rec.allocate(dist.len());
    let mut settled: Vec<usize> = Vec::new();

    loop {
        let next = dist
            .iter()
            .filter(|(node, d)| d.is_some() && !settled.contains(node))
            .min_by_key(|(node, d)| (**d, **node))
            .map(|(node, d)| (*node, d.unwrap_or(0)));
        let Some((node, base)) = next else {
            break;
        };
        settled.push(node);

        for &neighbor in graph.neighbors(node) {
            if settled.contains(&neighbor) {
                continue;
            }
            rec.counters.comparisons += 1;
            let candidate = base.saturating_add(graph.weight(node, neighbor));
            let entry = dist.entry(neighbor).or_insert(None);
            if entry.is_none_or(|current| candidate < current) {
                *entry = Some(candidate);
            }
        }

        let mut frontier: Vec<(u64, usize)> = dist
            .iter()
            .filter(|(n, _)| !settled.contains(n))
            .filter_map(|(n, d)| d.map(|d| (d, *n)))
            .collect();
        frontier.sort_unstable();
        visit(
            rec,
            node,
            &settled,
            frontier.into_iter().map(|(_, n)| n).collect(),
            Some(dist.clone()),
            format!("Settled node {node} at distance {base}"),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::simulation::{InputData, SimulationRequest, Unbounded, Visualization, simulate};

    fn traverse(alg: Algorithm) -> Visualization {
        simulate(
            &SimulationRequest::new(alg),
            &SimulationConfig::default(),
            &Unbounded,
        )
        .expect("traverses")
    }

    fn last_graph(vis: &Visualization) -> &GraphFrame {
        match vis.frames.last() {
            Some(Frame::Graph(frame)) => frame,
            other => panic!("expected graph frame, got {other:?}"),
        }
    }

    #[test]
    fn bfs_visits_level_by_level() {
        let vis = traverse(Algorithm::Bfs);
        assert_eq!(vis.frames.len(), 6);
        assert_eq!(vis.metrics.nodes_visited, Some(6));
        assert_eq!(last_graph(&vis).visited, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn bfs_frames_only_count_dequeued_nodes_as_visited() {
        let vis = traverse(Algorithm::Bfs);
        let frames: Vec<&GraphFrame> = vis
            .frames
            .iter()
            .map(|f| match f {
                Frame::Graph(frame) => frame,
                other => panic!("expected graph frame, got {other:?}"),
            })
            .collect();

        assert_eq!(frames[0].current_node, 0);
        assert_eq!(frames[0].visited, vec![0]);
        assert!(frames[0].queue.is_empty());

        assert_eq!(frames[1].current_node, 1);
        assert_eq!(frames[1].visited, vec![0, 1]);
        assert_eq!(frames[1].queue, vec![2]);

        for frame in &frames {
            assert!(frame.queue.iter().all(|n| !frame.visited.contains(n)));
            assert_eq!(frame.visited.last(), Some(&frame.current_node));
        }
    }

    #[test]
    fn dfs_frontier_has_no_repeats_or_visited_nodes() {
        let vis = traverse(Algorithm::Dfs);
        for frame in &vis.frames {
            let Frame::Graph(frame) = frame else {
                panic!("graph frame expected");
            };
            let unique: BTreeSet<usize> = frame.queue.iter().copied().collect();
            assert_eq!(unique.len(), frame.queue.len(), "{:?}", frame.queue);
            assert!(frame.queue.iter().all(|n| !frame.visited.contains(n)));
        }
    }

    #[test]
    fn huge_weights_saturate_instead_of_overflowing() {
        let graph = Graph {
            adjacency: BTreeMap::from([(0, vec![1]), (1, vec![0, 2]), (2, vec![1])]),
            weights: vec![(0, 1, u64::MAX), (1, 2, u64::MAX)],
        };
        let request = SimulationRequest::new(Algorithm::Dijkstra).with_input(InputData {
            graph: Some(graph),
            ..InputData::default()
        });
        let vis = simulate(&request, &SimulationConfig::default(), &Unbounded).expect("runs");
        let distances = last_graph(&vis).distances.clone().expect("distances recorded");
        assert_eq!(distances.get(&1), Some(&Some(u64::MAX)));
        assert_eq!(distances.get(&2), Some(&Some(u64::MAX)));
        assert_eq!(last_graph(&vis).visited.len(), 3);
    }

    #[test]
    fn dfs_goes_deep_first() {
        let vis = traverse(Algorithm::Dfs);
        assert_eq!(last_graph(&vis).visited, vec![0, 1, 3, 4, 5, 2]);
        assert_eq!(vis.metrics.nodes_visited, Some(6));
    }

    #[test]
    fn dijkstra_settles_shortest_distances() {
        let vis = traverse(Algorithm::Dijkstra);
        let last = last_graph(&vis);
        let distances = last.distances.as_ref().expect("distances recorded");
        assert_eq!(distances.get(&0), Some(&Some(0)));
        assert_eq!(distances.get(&2), Some(&Some(1)));
        assert_eq!(distances.get(&5), Some(&Some(3)));
        assert_eq!(distances.get(&1), Some(&Some(4)));
        assert_eq!(distances.get(&3), Some(&Some(5)));
        assert_eq!(distances.get(&4), Some(&Some(6)));
        assert_eq!(last.visited, vec![0, 2, 5, 1, 3, 4]);
        assert!(last.queue.is_empty());
    }

    #[test]
    fn unknown_start_node_is_rejected() {
        let request = SimulationRequest::new(Algorithm::Bfs).with_input(InputData {
            start: Some(42),
            ..InputData::default()
        });
        let err = simulate(&request, &SimulationConfig::default(), &Unbounded)
            .expect_err("invalid start");
        assert!(matches!(err, SimulationError::InvalidInput(_)));
    }

    #[test]
    fn disconnected_nodes_stay_unvisited() {
        let graph = Graph {
            adjacency: BTreeMap::from([(0, vec![1]), (1, vec![0]), (7, vec![])]),
            weights: Vec::new(),
        };
        let request = SimulationRequest::new(Algorithm::Bfs).with_input(InputData {
            graph: Some(graph),
            ..InputData::default()
        });
        let vis = simulate(&request, &SimulationConfig::default(), &Unbounded).expect("runs");
        assert_eq!(last_graph(&vis).visited, vec![0, 1]);
    }
}
