use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use promise_tree::config::Config;
use promise_tree::record::{Health, PromiseState, Role};
use promise_tree::render::render_tree;
use promise_tree::status::subtree_statuses;
use promise_tree::tree::promise_label;

/// JSON output row for one tree node
#[derive(Debug, Serialize)]
struct TreeEntry {
    id: String,
    label: String,
    state: PromiseState,
    role: Role,
    depth: usize,
    subtree_status: Health,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<String>,
    children: usize,
}

pub fn run(input: &Path, root: &str, config: &Config, json: bool) -> Result<()> {
    let tree = super::load_tree(input, root, config)?;

    if json {
        let depths = tree.depths();
        let statuses = subtree_statuses(&tree);
        let entries: Vec<TreeEntry> = tree
            .iter()
            .map(|(id, node)| TreeEntry {
                id: node.promise.id.clone(),
                label: promise_label(&node.promise),
                state: node.promise.state,
                role: node.promise.role(),
                depth: depths[id.0],
                subtree_status: statuses[id.0],
                parent: tree
                    .parent_of(id)
                    .map(|p| tree.node(p).promise.id.clone()),
                children: node.children.len(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("{}", render_tree(&tree));
    let statuses = subtree_statuses(&tree);
    println!();
    println!(
        "{} promises, overall status: {}",
        tree.len(),
        statuses[tree.root().0]
    );
    Ok(())
}
