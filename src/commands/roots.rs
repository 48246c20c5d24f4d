use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use promise_tree::record::{PromiseState, Role, function_name};
use promise_tree::render::{ForestFilter, SortMode, StateFilter, select_roots, status_dot};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RootEntry {
    id: String,
    state: PromiseState,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_on: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_on: Option<i64>,
}

pub fn run(
    input: &Path,
    state: Option<StateFilter>,
    role: Option<Role>,
    sort: SortMode,
    json: bool,
) -> Result<()> {
    let records = super::load_input(input)?;
    let filter = ForestFilter { state, role, sort };
    let roots = select_roots(&records, &filter);

    if json {
        let entries: Vec<RootEntry> = roots
            .iter()
            .map(|p| RootEntry {
                id: p.id.clone(),
                state: p.state,
                function_name: function_name(p),
                created_on: p.created_on,
                completed_on: p.completed_on,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if roots.is_empty() {
        match role {
            Some(role) => println!("No {} promises found", role),
            None => println!("No root promises found"),
        }
        return Ok(());
    }
    println!("Sorted by {}", sort);
    for p in &roots {
        match function_name(p) {
            Some(func) => println!("{} {} ({})", status_dot(p.state), p.id, func),
            None => println!("{} {}", status_dot(p.state), p.id),
        }
    }
    Ok(())
}
