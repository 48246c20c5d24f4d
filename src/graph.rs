//! Dependency graph preparation
//!
//! Turns a [`PromiseTree`] into abstract nodes and edges, hands node sizes
//! and edges to a [`LayoutOracle`], and converts the centers it returns into
//! top-left anchored positions. The positioning algorithm lives entirely
//! behind the oracle; see [`crate::layout::AsciiDagOracle`] for the default.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::config::GraphConfig;
use crate::record::{Health, Promise, PromiseState, Role, TAG_TIMEOUT, function_name};
use crate::status::subtree_statuses;
use crate::tree::{PromiseTree, promise_label};

/// Flow direction of the hierarchical layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Direction {
    /// Levels stack downward
    #[default]
    #[serde(rename = "TB")]
    TopBottom,
    /// Levels stack rightward
    #[serde(rename = "LR")]
    LeftRight,
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tb" | "td" | "top-bottom" => Ok(Direction::TopBottom),
            "lr" | "left-right" => Ok(Direction::LeftRight),
            _ => Err(format!("Unknown direction: {}. Use 'tb' or 'lr'.", s)),
        }
    }
}

/// A 2D point in layout units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// A graph node ready for layout
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub promise: Promise,
    pub subtree_status: Health,
    /// Completed duration in ms; `None` while pending
    pub duration: Option<i64>,
    pub role: Role,
    pub child_count: usize,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_duration: Option<i64>,
    /// Top-left corner, filled by [`layout_graph`]
    pub position: Option<Point>,
}

/// Parent to child edge, styled by the child
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub state: PromiseState,
    pub subtree_status: Health,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Abstract size of a node submitted to the oracle
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSize {
    pub id: String,
    pub width: f64,
    pub height: f64,
}

/// Everything the oracle sees
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutRequest {
    pub nodes: Vec<NodeSize>,
    /// (source id, target id)
    pub edges: Vec<(String, String)>,
    pub direction: Direction,
    /// Gap between levels
    pub rank_sep: f64,
    /// Gap between siblings on a level
    pub node_sep: f64,
}

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Edge references unknown node: {0}")]
    UnknownNode(String),
    #[error("Layout failed: {0}")]
    Failed(String),
}

/// A hierarchical positioning algorithm.
///
/// Returns the center point of every node it was able to place. Implementations
/// must be deterministic for identical requests.
pub trait LayoutOracle {
    fn layout(&self, request: &LayoutRequest) -> Result<HashMap<String, Point>, LayoutError>;
}

/// Positioned graph handed to a renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphLayout {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub direction: Direction,
    /// Ids the oracle did not place; their `position` is `None`
    pub unplaced: Vec<String>,
}

/// Sleep duration: numeric timeout tag, else the record's timeout field.
fn sleep_duration(p: &Promise) -> i64 {
    p.tag(TAG_TIMEOUT)
        .and_then(|t| t.trim().parse::<i64>().ok())
        .unwrap_or(p.timeout)
}

/// Build graph nodes and edges in depth-first order.
pub fn tree_to_graph_data(tree: &PromiseTree) -> GraphData {
    let statuses = subtree_statuses(tree);
    let mut nodes = Vec::with_capacity(tree.len());
    let mut edges = Vec::with_capacity(tree.len().saturating_sub(1));

    for (id, node) in tree.iter() {
        let p = &node.promise;
        let role = p.role();
        nodes.push(GraphNode {
            id: p.id.clone(),
            promise: p.clone(),
            subtree_status: statuses[id.0],
            duration: p.duration(),
            role,
            child_count: node.children.len(),
            label: promise_label(p),
            function_name: function_name(p),
            sleep_duration: (role == Role::Sleep).then(|| sleep_duration(p)),
            position: None,
        });

        for (child_id, child) in tree.children(id) {
            edges.push(GraphEdge {
                id: format!("{}->{}", p.id, child.promise.id),
                source: p.id.clone(),
                target: child.promise.id.clone(),
                state: child.promise.state,
                subtree_status: statuses[child_id.0],
            });
        }
    }

    GraphData { nodes, edges }
}

/// Position the graph through `oracle`.
///
/// Nodes the oracle fails to place keep `position: None` and are listed in
/// [`GraphLayout::unplaced`]; an oracle error leaves every node unplaced.
pub fn layout_graph<O: LayoutOracle + ?Sized>(
    data: GraphData,
    oracle: &O,
    config: &GraphConfig,
) -> GraphLayout {
    let GraphData { mut nodes, edges } = data;

    let request = LayoutRequest {
        nodes: nodes
            .iter()
            .map(|n| NodeSize {
                id: n.id.clone(),
                width: config.node_width,
                height: config.node_height,
            })
            .collect(),
        edges: edges
            .iter()
            .map(|e| (e.source.clone(), e.target.clone()))
            .collect(),
        direction: config.direction,
        rank_sep: config.rank_sep,
        node_sep: config.node_sep,
    };

    let centers = if nodes.is_empty() {
        HashMap::new()
    } else {
        oracle.layout(&request).unwrap_or_else(|e| {
            tracing::warn!(error = %e, nodes = nodes.len(), "graph layout failed");
            HashMap::new()
        })
    };

    let mut unplaced = Vec::new();
    for node in &mut nodes {
        match centers.get(&node.id) {
            Some(center) => {
                node.position = Some(Point {
                    x: center.x - config.node_width / 2.0,
                    y: center.y - config.node_height / 2.0,
                });
            }
            None => unplaced.push(node.id.clone()),
        }
    }

    if !unplaced.is_empty() {
        tracing::warn!(count = unplaced.len(), "layout oracle left nodes unplaced");
    }

    GraphLayout {
        nodes,
        edges,
        direction: config.direction,
        unplaced,
    }
}
