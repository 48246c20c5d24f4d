//! Execution tree reconstruction
//!
//! Promises arrive as a flat list. Parent links come from the
//! `resonate:parent` tag when present, otherwise from the dotted id
//! structure (`job-1.2.1` is a child of `job-1.2`). The resulting tree is
//! stored as an arena in depth-first pre-order, so a parent always sits at a
//! lower index than its children and every pass over the tree can be a plain
//! loop instead of recursion.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::record::{Promise, TAG_INVOKE, TAG_PARENT};

/// Index of a node inside a [`PromiseTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

/// A promise together with its ordered children
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub promise: Promise,
    /// Ascending `createdOn`, ties in input order
    pub children: Vec<NodeId>,
    /// UI flag, not read by the layout code
    pub expanded: bool,
}

/// Execution tree rooted at a single promise
#[derive(Debug, Clone, PartialEq)]
pub struct PromiseTree {
    nodes: Vec<TreeNode>,
    parents: Vec<Option<NodeId>>,
}

impl PromiseTree {
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn root_node(&self) -> &TreeNode {
        &self.nodes[0]
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Never true: the root always exists, real or placeholder.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &TreeNode)> + '_ {
        self.nodes[id.0]
            .children
            .iter()
            .map(move |&child| (child, &self.nodes[child.0]))
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.parents[id.0]
    }

    /// All nodes in depth-first pre-order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TreeNode)> + '_ {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Look up a node by promise id
    pub fn find(&self, promise_id: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.promise.id == promise_id)
            .map(NodeId)
    }

    /// Depth of every node (root = 0), indexed by `NodeId`.
    pub fn depths(&self) -> Vec<usize> {
        let mut depths = vec![0; self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            for child in &node.children {
                depths[child.0] = depths[i] + 1;
            }
        }
        depths
    }

    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) {
        self.nodes[id.0].expanded = expanded;
    }

    /// Pre-order list of nodes whose ancestors are all expanded.
    pub fn flatten_visible(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            out.push(id);
            let node = &self.nodes[id.0];
            if node.expanded {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }
}

/// Parent id from the `resonate:parent` tag, ignoring self references.
pub fn explicit_parent(promise: &Promise) -> Option<&str> {
    promise.tag(TAG_PARENT).filter(|p| *p != promise.id)
}

/// Parent id inferred from the dotted id: everything before the last `.`.
pub fn structural_parent(id: &str) -> Option<&str> {
    let (parent, _) = id.rsplit_once('.')?;
    (parent != id).then_some(parent)
}

/// Resolve the parent of a promise. The tag wins over the id structure even
/// when the two disagree.
pub fn parent_id(promise: &Promise) -> Option<&str> {
    explicit_parent(promise).or_else(|| structural_parent(&promise.id))
}

/// True when neither the tag nor the id structure names a parent.
pub fn is_root(promise: &Promise) -> bool {
    parent_id(promise).is_none()
}

/// True when the promise has no parent tag and no other promise in `all`
/// has an id that is a dotted prefix of this one.
pub fn is_root_in_set(promise: &Promise, all: &[Promise]) -> bool {
    if explicit_parent(promise).is_some() {
        return false;
    }
    !all.iter().any(|other| {
        other.id != promise.id
            && promise
                .id
                .strip_prefix(other.id.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
    })
}

/// Short display label: the invoke tag, else the most informative id segment.
pub fn promise_label(promise: &Promise) -> String {
    if let Some(invoke) = promise.tag(TAG_INVOKE) {
        return invoke.to_string();
    }
    let segments: Vec<&str> = promise.id.split('.').collect();
    let segment = match segments.as_slice() {
        [] | [_] => None,
        [.., prev, last] if is_numeric(last) => Some(*prev),
        [.., last] => Some(*last),
    };
    match segment {
        Some(segment) if !segment.is_empty() => segment.to_string(),
        _ => promise.id.clone(),
    }
}

fn is_numeric(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Reconstruct the tree rooted at `root_id` from a flat record list.
///
/// Records that cannot be linked to the root are dropped. When the root
/// itself is missing a placeholder with state `UNKNOWN` stands in for it.
pub fn build_tree(root_id: &str, promises: &[Promise]) -> PromiseTree {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut children_of: HashMap<&str, Vec<usize>> = HashMap::new();

    for (i, p) in promises.iter().enumerate() {
        index.insert(p.id.as_str(), i);
        if let Some(parent) = parent_id(p) {
            children_of.entry(parent).or_default().push(i);
        }
    }

    for kids in children_of.values_mut() {
        kids.sort_by_key(|&i| promises[i].created_on.unwrap_or(0));
    }

    // Scratch index `promises.len()` stands for a synthesized placeholder root.
    let placeholder = promises.len();
    let root_src = index.get(root_id).copied().unwrap_or(placeholder);
    let promise_at = |src: usize| -> Promise {
        if src == placeholder {
            Promise::placeholder(root_id)
        } else {
            promises[src].clone()
        }
    };

    let mut nodes: Vec<TreeNode> = Vec::new();
    let mut parents: Vec<Option<NodeId>> = Vec::new();
    let mut attached: HashSet<usize> = HashSet::from([root_src]);
    let mut stack: Vec<(usize, Option<NodeId>)> = vec![(root_src, None)];

    while let Some((src, parent)) = stack.pop() {
        let id = NodeId(nodes.len());
        nodes.push(TreeNode {
            promise: promise_at(src),
            children: Vec::new(),
            expanded: true,
        });
        parents.push(parent);
        if let Some(parent) = parent {
            nodes[parent.0].children.push(id);
        }

        let key: &str = if src == placeholder {
            root_id
        } else {
            &promises[src].id
        };
        let kids: Vec<usize> = children_of
            .get(key)
            .map(|kids| {
                kids.iter()
                    .copied()
                    .filter(|&k| attached.insert(k))
                    .collect()
            })
            .unwrap_or_default();
        stack.extend(kids.into_iter().rev().map(|k| (k, Some(id))));
    }

    let dropped = promises.len() + usize::from(root_src == placeholder) - nodes.len();
    tracing::debug!(
        root = root_id,
        attached = nodes.len(),
        dropped,
        placeholder = root_src == placeholder,
        "built promise tree"
    );

    PromiseTree { nodes, parents }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::PromiseState;

    fn promise(id: &str, created: Option<i64>) -> Promise {
        Promise {
            id: id.to_string(),
            state: PromiseState::Resolved,
            created_on: created,
            ..Promise::default()
        }
    }

    fn with_parent(mut p: Promise, parent: &str) -> Promise {
        p.tags.insert(TAG_PARENT.to_string(), parent.to_string());
        p
    }

    fn child_ids(tree: &PromiseTree, id: NodeId) -> Vec<String> {
        tree.children(id).map(|(_, n)| n.promise.id.clone()).collect()
    }

    #[test]
    fn test_structural_parent() {
        assert_eq!(structural_parent("job-1.2.1"), Some("job-1.2"));
        assert_eq!(structural_parent("job-1"), None);
        assert_eq!(structural_parent("a."), Some("a"));
    }

    #[test]
    fn test_self_parent_tag_falls_back_to_structure() {
        let p = with_parent(promise("a.1", None), "a.1");
        assert_eq!(parent_id(&p), Some("a"));
        let root = with_parent(promise("a", None), "a");
        assert!(is_root(&root));
    }

    #[test]
    fn test_tag_wins_over_structure() {
        let p = with_parent(promise("a.1", None), "b");
        assert_eq!(parent_id(&p), Some("b"));
    }

    #[test]
    fn test_children_sorted_by_created_on_with_stable_ties() {
        let records = vec![
            promise("r", Some(0)),
            promise("r.c", Some(30)),
            promise("r.a", Some(10)),
            promise("r.x", None),
            promise("r.b1", Some(10)),
        ];
        let tree = build_tree("r", &records);
        assert_eq!(child_ids(&tree, tree.root()), vec!["r.x", "r.a", "r.b1", "r.c"]);
    }

    #[test]
    fn test_arena_is_preorder() {
        let records = vec![
            promise("r", Some(0)),
            promise("r.2", Some(2)),
            promise("r.1", Some(1)),
            promise("r.1.1", Some(3)),
        ];
        let tree = build_tree("r", &records);
        let order: Vec<&str> = tree.iter().map(|(_, n)| n.promise.id.as_str()).collect();
        assert_eq!(order, vec!["r", "r.1", "r.1.1", "r.2"]);
        assert_eq!(tree.depths(), vec![0, 1, 2, 1]);
        let r11 = tree.find("r.1.1").unwrap();
        assert_eq!(tree.parent_of(r11), tree.find("r.1"));
    }

    #[test]
    fn test_cycle_reachable_from_root_terminates() {
        // root claims a descendant as its parent
        let records = vec![
            with_parent(promise("a", Some(0)), "a.1"),
            promise("a.1", Some(1)),
        ];
        let tree = build_tree("a", &records);
        assert_eq!(tree.len(), 2);
        assert_eq!(child_ids(&tree, tree.root()), vec!["a.1"]);
        let a1 = tree.find("a.1").unwrap();
        assert!(tree.node(a1).children.is_empty());
    }

    #[test]
    fn test_detached_cycle_is_dropped() {
        let records = vec![
            promise("a", Some(0)),
            with_parent(promise("x", Some(1)), "y"),
            with_parent(promise("y", Some(2)), "x"),
        ];
        let tree = build_tree("a", &records);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_flatten_visible_respects_expanded() {
        let records = vec![
            promise("r", Some(0)),
            promise("r.1", Some(1)),
            promise("r.1.1", Some(2)),
            promise("r.2", Some(3)),
        ];
        let mut tree = build_tree("r", &records);
        assert_eq!(tree.flatten_visible().len(), 4);
        let r1 = tree.find("r.1").unwrap();
        tree.set_expanded(r1, false);
        let visible: Vec<&str> = tree
            .flatten_visible()
            .into_iter()
            .map(|id| tree.node(id).promise.id.as_str())
            .collect();
        assert_eq!(visible, vec!["r", "r.1", "r.2"]);
    }

    #[test]
    fn test_promise_label_segments() {
        assert_eq!(promise_label(&promise("order.2.3", None)), "2");
        assert_eq!(promise_label(&promise("job-1.2", None)), "job-1");
        assert_eq!(promise_label(&promise("job-1.charge", None)), "charge");
        assert_eq!(promise_label(&promise("plain", None)), "plain");
        assert_eq!(promise_label(&promise("12", None)), "12");
    }

    #[test]
    fn test_promise_label_empty_segment_uses_whole_id() {
        assert_eq!(promise_label(&promise("a.", None)), "a.");
        assert_eq!(promise_label(&promise(".7", None)), ".7");
        assert_eq!(promise_label(&promise("..", None)), "..");
        assert_eq!(promise_label(&promise("job..3", None)), "job..3");
    }
}
