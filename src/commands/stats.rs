use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

use promise_tree::record::Promise;
use promise_tree::stats::{PromiseStats, active_pending, compute_stats, recent_failures};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsOutput<'a> {
    #[serde(flatten)]
    stats: PromiseStats,
    recent_failures: Vec<&'a Promise>,
    active_pending: Vec<&'a Promise>,
}

fn format_timestamp(ms: Option<i64>) -> String {
    ms.and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn run(input: &Path, limit: usize, json: bool) -> Result<()> {
    let records = super::load_input(input)?;
    let now = Utc::now().timestamp_millis();
    let stats = compute_stats(&records, now);
    let failures = recent_failures(&records, limit);
    let pending = active_pending(&records, limit);

    if json {
        let output = StatsOutput {
            stats,
            recent_failures: failures,
            active_pending: pending,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Promises: {}", stats.total);
    println!("  pending:   {}", stats.pending);
    println!("  resolved:  {}", stats.resolved);
    println!(
        "  rejected:  {} (canceled {}, timed out {})",
        stats.rejected, stats.rejected_canceled, stats.rejected_timed_out
    );
    println!("Throughput: {:.2}/min (last hour)", stats.throughput_per_min);
    println!("Error rate: {:.1}%", stats.error_rate);

    if !failures.is_empty() {
        println!();
        println!("Recent failures:");
        for p in &failures {
            println!(
                "  {:<19} {:<18} {}",
                format_timestamp(p.completed_on.or(p.created_on)),
                p.state.as_str(),
                p.id
            );
        }
    }

    if !pending.is_empty() {
        println!();
        println!("Oldest pending:");
        for p in &pending {
            let age = p
                .created_on
                .map(|c| format!("{}s", (now - c) / 1000))
                .unwrap_or_else(|| "-".to_string());
            println!("  {:>8} {}", age, p.id);
        }
    }

    Ok(())
}
