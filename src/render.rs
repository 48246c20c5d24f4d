//! Plain-text rendering of a promise tree, and root discovery and filtering
//! over a record dump

use std::cmp::Ordering;
use std::fmt;

use crate::record::{Promise, PromiseState, Role, function_name};
use crate::tree::{NodeId, PromiseTree, TreeNode, is_root_in_set};

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const CONTINUATION: &str = "│   ";
const BLANK: &str = "    ";

pub fn status_dot(state: PromiseState) -> &'static str {
    match state {
        PromiseState::Resolved => "●",
        PromiseState::Pending => "◐",
        PromiseState::Rejected
        | PromiseState::RejectedCanceled
        | PromiseState::RejectedTimedout => "✗",
        PromiseState::Unknown => "○",
    }
}

/// Role and function name in parentheses, empty for an unnamed root.
pub fn node_details(promise: &Promise) -> String {
    let func = function_name(promise);
    match (promise.role(), func) {
        (Role::Sleep, _) => "(sleep)".to_string(),
        (role @ (Role::Rpc | Role::Run), Some(func)) => format!("({} {})", role, func),
        (role @ (Role::Rpc | Role::Run), None) => format!("({})", role),
        (Role::Root, Some(func)) => format!("({})", func),
        (Role::Root, None) => String::new(),
    }
}

fn render_line(node: &TreeNode, prefix: &str, connector: &str) -> String {
    let icon = match (node.children.is_empty(), node.expanded) {
        (true, _) => "  ",
        (false, true) => "▼ ",
        (false, false) => "▶ ",
    };
    let line = format!(
        "{}{}{}{} {} {}",
        prefix,
        connector,
        icon,
        status_dot(node.promise.state),
        node.promise.id,
        node_details(&node.promise)
    );
    line.trim_end().to_string()
}

/// Render every visible node, one per line. Children of collapsed nodes are
/// skipped.
pub fn render_tree(tree: &PromiseTree) -> String {
    let mut lines = Vec::with_capacity(tree.len());
    // (node, prefix for this line, is last sibling, is root)
    let mut stack: Vec<(NodeId, String, bool, bool)> =
        vec![(tree.root(), String::new(), true, true)];

    while let Some((id, prefix, is_last, is_root)) = stack.pop() {
        let node = tree.node(id);
        let connector = match (is_root, is_last) {
            (true, _) => "",
            (false, false) => BRANCH,
            (false, true) => LAST_BRANCH,
        };
        lines.push(render_line(node, &prefix, connector));

        if !node.expanded {
            continue;
        }
        let child_prefix = match (is_root, is_last) {
            (true, _) => prefix.clone(),
            (false, false) => format!("{}{}", prefix, CONTINUATION),
            (false, true) => format!("{}{}", prefix, BLANK),
        };
        let count = node.children.len();
        for (i, child) in node.children.iter().enumerate().rev() {
            stack.push((*child, child_prefix.clone(), i + 1 == count, false));
        }
    }

    lines.join("\n")
}

/// Records that look like call roots within `records`, in input order.
pub fn root_candidates(records: &[Promise]) -> Vec<&Promise> {
    records.iter().filter(|p| is_root_in_set(p, records)).collect()
}

/// Coarse state filter for the forest listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFilter {
    Pending,
    Resolved,
    /// Every REJECTED* state
    Rejected,
}

impl StateFilter {
    pub fn matches(&self, state: PromiseState) -> bool {
        match self {
            StateFilter::Pending => state == PromiseState::Pending,
            StateFilter::Resolved => state == PromiseState::Resolved,
            StateFilter::Rejected => state.is_rejected(),
        }
    }
}

impl std::str::FromStr for StateFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(StateFilter::Pending),
            "resolved" => Ok(StateFilter::Resolved),
            "rejected" => Ok(StateFilter::Rejected),
            _ => Err(format!("Unknown state: {}. Use 'pending', 'resolved' or 'rejected'.", s)),
        }
    }
}

/// Ordering of the forest listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Newest first
    #[default]
    CreatedDesc,
    CreatedAsc,
    /// Most recently completed first
    ResolvedDesc,
    ResolvedAsc,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::CreatedDesc => "created-desc",
            SortMode::CreatedAsc => "created-asc",
            SortMode::ResolvedDesc => "resolved-desc",
            SortMode::ResolvedAsc => "resolved-asc",
        }
    }

    fn sort(&self, promises: &mut [&Promise]) {
        let by_created = matches!(self, SortMode::CreatedDesc | SortMode::CreatedAsc);
        let descending = matches!(self, SortMode::CreatedDesc | SortMode::ResolvedDesc);
        let key = |p: &Promise| if by_created { p.created_on } else { p.completed_on };
        // Records without the timestamp go last in both directions
        promises.sort_by(|a, b| match (key(*a), key(*b)) {
            (Some(x), Some(y)) if descending => y.cmp(&x),
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortMode::CreatedDesc => "Created ↓",
            SortMode::CreatedAsc => "Created ↑",
            SortMode::ResolvedDesc => "Resolved ↓",
            SortMode::ResolvedAsc => "Resolved ↑",
        })
    }
}

impl std::str::FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created-desc" | "newest" => Ok(SortMode::CreatedDesc),
            "created-asc" | "oldest" => Ok(SortMode::CreatedAsc),
            "resolved-desc" => Ok(SortMode::ResolvedDesc),
            "resolved-asc" => Ok(SortMode::ResolvedAsc),
            _ => Err(format!(
                "Unknown sort: {}. Use created-desc, created-asc, resolved-desc or resolved-asc.",
                s
            )),
        }
    }
}

/// Selection applied by [`select_roots`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ForestFilter {
    pub state: Option<StateFilter>,
    /// With a role, every promise of that role is listed instead of only roots
    pub role: Option<Role>,
    pub sort: SortMode,
}

/// Forest listing: root candidates (or all promises of `filter.role`),
/// narrowed by state and sorted.
pub fn select_roots<'a>(records: &'a [Promise], filter: &ForestFilter) -> Vec<&'a Promise> {
    let mut selected: Vec<&Promise> = match filter.role {
        Some(role) => records.iter().filter(|p| p.role() == role).collect(),
        None => root_candidates(records),
    };
    if let Some(state) = filter.state {
        selected.retain(|p| state.matches(p.state));
    }
    filter.sort.sort(&mut selected);
    selected
}
