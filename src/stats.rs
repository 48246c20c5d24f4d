//! Dashboard statistics over a flat promise list

use serde::Serialize;

use crate::record::{Promise, PromiseState};

const HOUR_MS: i64 = 60 * 60 * 1000;

/// Aggregate counts and rates
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromiseStats {
    pub total: usize,
    pub pending: usize,
    pub resolved: usize,
    /// Every REJECTED* state
    pub rejected: usize,
    pub rejected_canceled: usize,
    pub rejected_timed_out: usize,
    /// Resolved per minute over the last hour
    pub throughput_per_min: f64,
    /// Percentage of completed promises that were rejected
    pub error_rate: f64,
}

pub fn compute_stats(promises: &[Promise], now: i64) -> PromiseStats {
    let mut stats = PromiseStats {
        total: promises.len(),
        ..PromiseStats::default()
    };
    let hour_ago = now - HOUR_MS;
    let mut resolved_last_hour = 0usize;

    for p in promises {
        match p.state {
            PromiseState::Pending => stats.pending += 1,
            PromiseState::Resolved => {
                stats.resolved += 1;
                if p.completed_on.is_some_and(|t| t >= hour_ago) {
                    resolved_last_hour += 1;
                }
            }
            PromiseState::Rejected => stats.rejected += 1,
            PromiseState::RejectedCanceled => {
                stats.rejected += 1;
                stats.rejected_canceled += 1;
            }
            PromiseState::RejectedTimedout => {
                stats.rejected += 1;
                stats.rejected_timed_out += 1;
            }
            PromiseState::Unknown => {}
        }
    }

    stats.throughput_per_min = resolved_last_hour as f64 / 60.0;
    let completed = stats.resolved + stats.rejected;
    if completed > 0 {
        stats.error_rate = stats.rejected as f64 / completed as f64 * 100.0;
    }
    stats
}

/// Most recently finished rejected promises first.
pub fn recent_failures(promises: &[Promise], limit: usize) -> Vec<&Promise> {
    let mut failures: Vec<&Promise> = promises.iter().filter(|p| p.state.is_rejected()).collect();
    failures.sort_by_key(|p| std::cmp::Reverse(p.completed_on.or(p.created_on).unwrap_or(0)));
    failures.truncate(limit);
    failures
}

/// Oldest pending promises first.
pub fn active_pending(promises: &[Promise], limit: usize) -> Vec<&Promise> {
    let mut pending: Vec<&Promise> = promises
        .iter()
        .filter(|p| p.state == PromiseState::Pending)
        .collect();
    pending.sort_by_key(|p| p.created_on.unwrap_or(0));
    pending.truncate(limit);
    pending
}
