//! Hierarchical layout oracle backed by the ascii-dag crate.
//!
//! ascii-dag runs the Sugiyama pipeline (layer assignment, crossing
//! minimization, coordinate assignment) for character grids. We only keep
//! the level of every node and its order within the level, then re-space
//! the nodes using the abstract sizes and gaps from the [`LayoutRequest`]:
//!
//! - the rank axis (y for `TB`, x for `LR`) advances one level at a time by
//!   the thickest node on that level plus `rank_sep`
//! - the cross axis packs the nodes of a level in ascii-dag order separated
//!   by `node_sep`, and every level is centred on the widest one
use std::collections::{HashMap, HashSet};

use ascii_dag::DAG;

use crate::graph::{Direction, LayoutError, LayoutOracle, LayoutRequest, Point};

/// Default [`LayoutOracle`] implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiDagOracle;

impl AsciiDagOracle {
    pub fn new() -> Self {
        Self
    }
}

/// Detect back-edges using an iterative DFS.
///
/// A back-edge points from a node to one of its ancestors in the DFS tree.
/// They are dropped before the graph is handed to ascii-dag, which expects
/// an acyclic input.
fn detect_back_edges(node_count: usize, edges: &[(usize, usize)]) -> HashSet<(usize, usize)> {
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut in_degree: Vec<usize> = vec![0; node_count];
    for &(from, to) in edges {
        adj[from].push(to);
        in_degree[to] += 1;
    }

    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Unvisited,
        InStack,
        Finished,
    }

    let mut state = vec![State::Unvisited; node_count];
    let mut back_edges: HashSet<(usize, usize)> = HashSet::new();

    // Sources first, then whatever is left (components that are pure cycles)
    let starts = (0..node_count)
        .filter(|&n| in_degree[n] == 0)
        .chain(0..node_count);

    for start in starts {
        if state[start] != State::Unvisited {
            continue;
        }
        // (node, index of the next successor to visit)
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        state[start] = State::InStack;

        while let Some((node, idx)) = stack.pop() {
            let Some(&next) = adj[node].get(idx) else {
                state[node] = State::Finished;
                continue;
            };
            stack.push((node, idx + 1));
            match state[next] {
                State::InStack => {
                    back_edges.insert((node, next));
                }
                State::Unvisited => {
                    state[next] = State::InStack;
                    stack.push((next, 0));
                }
                State::Finished => {}
            }
        }
    }

    back_edges
}

impl LayoutOracle for AsciiDagOracle {
    fn layout(&self, request: &LayoutRequest) -> Result<HashMap<String, Point>, LayoutError> {
        if request.nodes.is_empty() {
            return Ok(HashMap::new());
        }

        // Numeric ids follow request order so identical requests give identical layouts
        let id_to_num: HashMap<&str, usize> = request
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        let mut all_edges: Vec<(usize, usize)> = Vec::with_capacity(request.edges.len());
        for (source, target) in &request.edges {
            let from = *id_to_num
                .get(source.as_str())
                .ok_or_else(|| LayoutError::UnknownNode(source.clone()))?;
            let to = *id_to_num
                .get(target.as_str())
                .ok_or_else(|| LayoutError::UnknownNode(target.clone()))?;
            all_edges.push((from, to));
        }

        let back_edge_set = detect_back_edges(request.nodes.len(), &all_edges);
        if !back_edge_set.is_empty() {
            tracing::debug!(count = back_edge_set.len(), "dropping back-edges before layout");
        }
        let edges_for_dag: Vec<(usize, usize)> = all_edges
            .iter()
            .copied()
            .filter(|e| !back_edge_set.contains(e))
            .collect();

        let nodes_for_dag: Vec<(usize, &str)> = request
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (i, n.id.as_str()))
            .collect();

        let dag = DAG::from_edges(&nodes_for_dag, &edges_for_dag);
        let ir = dag.compute_layout();

        // Group by level, ordered by ascii-dag's column within the level
        let mut levels: Vec<Vec<(usize, usize)>> = Vec::new(); // level -> [(x, num)]
        for node in ir.nodes() {
            if node.id >= request.nodes.len() {
                continue;
            }
            if levels.len() <= node.level {
                levels.resize_with(node.level + 1, Vec::new);
            }
            levels[node.level].push((node.x, node.id));
        }
        for level in &mut levels {
            level.sort();
        }

        // (cross, rank) extent of a node for the requested direction
        let extent = |num: usize| -> (f64, f64) {
            let n = &request.nodes[num];
            match request.direction {
                Direction::TopBottom => (n.width, n.height),
                Direction::LeftRight => (n.height, n.width),
            }
        };

        let level_span = |level: &[(usize, usize)]| -> f64 {
            let sizes: f64 = level.iter().map(|&(_, num)| extent(num).0).sum();
            sizes + request.node_sep * level.len().saturating_sub(1) as f64
        };
        let widest = levels
            .iter()
            .map(|l| level_span(l))
            .fold(0.0_f64, f64::max);

        let mut centers: HashMap<String, Point> = HashMap::new();
        let mut rank_pos = 0.0;
        for level in levels.iter().filter(|l| !l.is_empty()) {
            let thickness = level
                .iter()
                .map(|&(_, num)| extent(num).1)
                .fold(0.0_f64, f64::max);
            let mut cross_pos = (widest - level_span(level)) / 2.0;

            for &(_, num) in level {
                let (cross, _) = extent(num);
                let cross_center = cross_pos + cross / 2.0;
                let rank_center = rank_pos + thickness / 2.0;
                let point = match request.direction {
                    Direction::TopBottom => Point {
                        x: cross_center,
                        y: rank_center,
                    },
                    Direction::LeftRight => Point {
                        x: rank_center,
                        y: cross_center,
                    },
                };
                centers.insert(request.nodes[num].id.clone(), point);
                cross_pos += cross + request.node_sep;
            }
            rank_pos += thickness + request.rank_sep;
        }

        Ok(centers)
    }
}
