use anyhow::Result;
use std::path::Path;

use promise_tree::config::Config;
use promise_tree::graph::{Direction, GraphLayout, layout_graph, tree_to_graph_data};
use promise_tree::layout::AsciiDagOracle;

fn build_layout(
    input: &Path,
    root: &str,
    config: &Config,
    direction: Option<Direction>,
) -> Result<GraphLayout> {
    let tree = super::load_tree(input, root, config)?;
    let mut graph_config = config.graph.clone();
    if let Some(direction) = direction {
        graph_config.direction = direction;
    }
    let data = tree_to_graph_data(&tree);
    Ok(layout_graph(data, &AsciiDagOracle::new(), &graph_config))
}

pub fn run(
    input: &Path,
    root: &str,
    config: &Config,
    direction: Option<Direction>,
    json: bool,
) -> Result<()> {
    let layout = build_layout(input, root, config, direction)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&layout)?);
        return Ok(());
    }

    println!("Nodes ({}):", layout.nodes.len());
    for node in &layout.nodes {
        let position = match node.position {
            Some(p) => format!("({:>7.1}, {:>7.1})", p.x, p.y),
            None => format!("{:>18}", "unplaced"),
        };
        let func = node
            .function_name
            .as_deref()
            .map(|f| format!(" {}", f))
            .unwrap_or_default();
        println!(
            "  {} {:<10} {:<6} {}{} [{}]",
            position,
            node.subtree_status.as_str(),
            node.role.as_str(),
            node.label,
            func,
            node.id
        );
    }

    println!();
    println!("Edges ({}):", layout.edges.len());
    for edge in &layout.edges {
        println!("  {} -> {} ({})", edge.source, edge.target, edge.subtree_status);
    }

    if !layout.unplaced.is_empty() {
        eprintln!(
            "Warning: {} node(s) could not be placed: {}",
            layout.unplaced.len(),
            layout.unplaced.join(", ")
        );
    }
    Ok(())
}
