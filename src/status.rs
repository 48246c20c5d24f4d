//! Bottom-up subtree health

use crate::record::Health;
use crate::tree::{NodeId, PromiseTree};

/// Worst health of a node and all of its descendants.
pub fn compute_subtree_status(tree: &PromiseTree, id: NodeId) -> Health {
    let mut worst = tree.node(id).promise.health();
    let mut stack: Vec<NodeId> = tree.node(id).children.clone();
    while let Some(next) = stack.pop() {
        let node = tree.node(next);
        worst = worst.max(node.promise.health());
        if worst == Health::Rejected {
            break;
        }
        stack.extend(node.children.iter().copied());
    }
    worst
}

/// Subtree health of every node, indexed by `NodeId`.
///
/// The arena is in pre-order, so walking it backwards visits every child
/// before its parent.
pub fn subtree_statuses(tree: &PromiseTree) -> Vec<Health> {
    let mut statuses: Vec<Health> = tree.iter().map(|(_, n)| n.promise.health()).collect();
    for i in (0..tree.len()).rev() {
        let worst_child = tree
            .node(NodeId(i))
            .children
            .iter()
            .map(|c| statuses[c.0])
            .max();
        if let Some(child) = worst_child {
            statuses[i] = statuses[i].max(child);
        }
    }
    statuses
}
