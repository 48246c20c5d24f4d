use anyhow::Result;
use chrono::Utc;
use std::path::Path;

use promise_tree::detail::{PromiseDetail, render_detail};
use promise_tree::record::Promise;

fn find<'a>(records: &'a [Promise], id: &str) -> Result<&'a Promise> {
    records
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| anyhow::anyhow!("Promise not found: {}", id))
}

pub fn run(input: &Path, id: &str, json: bool) -> Result<()> {
    let records = super::load_input(input)?;
    let promise = find(&records, id)?;

    if json {
        let detail = PromiseDetail::from_promise(promise);
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    print!("{}", render_detail(promise, Utc::now().timestamp_millis()));
    Ok(())
}
