pub mod config_cmd;
pub mod graph;
pub mod roots;
pub mod show;
pub mod stats;
pub mod timeline;
pub mod tree;

use std::path::Path;

use anyhow::{Context, Result};
use promise_tree::config::Config;
use promise_tree::fetch::fetch_tree_promises;
use promise_tree::parser::load_records;
use promise_tree::record::Promise;
use promise_tree::store::RecordStore;
use promise_tree::tree::{PromiseTree, build_tree};

/// Load every record from the input file.
pub fn load_input(input: &Path) -> Result<Vec<Promise>> {
    if !input.exists() {
        anyhow::bail!("Records file not found: {}", input.display());
    }
    load_records(input).with_context(|| format!("Failed to load records from {}", input.display()))
}

/// Collect the promises of `root` through the paginated search and build its tree.
pub fn load_tree(input: &Path, root: &str, config: &Config) -> Result<PromiseTree> {
    let store = RecordStore::new(load_input(input)?, config.fetch.page_size);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let promises = runtime
        .block_on(fetch_tree_promises(root, &store, config.fetch.page_size))
        .context("Failed to collect tree promises")?;
    if promises.is_empty() {
        tracing::warn!(root, "no promises found for root");
    }
    Ok(build_tree(root, &promises))
}
