//! Timeline layout
//!
//! Every promise in the tree becomes a horizontal bar on a shared time axis.
//! Bars are packed into lanes so that no two bars in the same lane overlap:
//! sorted by start time (longer bars first on ties), each bar takes the first
//! lane whose previous bar has already ended, or opens a new lane.

use serde::Serialize;

use crate::config::TimelineConfig;
use crate::record::{Promise, PromiseState, Role, TAG_INVOKE, function_name};
use crate::tree::{PromiseTree, promise_label};

/// A single bar on the time axis
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineBar {
    pub id: String,
    pub label: String,
    pub role: Role,
    pub state: PromiseState,
    pub start_time: i64,
    /// `None` when the promise is neither completed nor pending
    pub end_time: Option<i64>,
    pub depth: usize,
    pub lane: usize,
    /// Vertical offset of the lane
    pub y: f64,
}

impl TimelineBar {
    /// End used for packing: a bar with no end occupies no time.
    pub fn effective_end(&self) -> i64 {
        self.end_time.unwrap_or(self.start_time)
    }

    pub fn duration(&self) -> i64 {
        self.effective_end() - self.start_time
    }
}

/// Bars plus the overall time window
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineData {
    pub bars: Vec<TimelineBar>,
    /// Earliest start in ms
    pub min_time: i64,
    /// Latest end in ms (now for pending promises)
    pub max_time: i64,
    pub duration: i64,
    pub lane_count: usize,
}

impl TimelineData {
    pub fn empty() -> Self {
        Self {
            bars: Vec::new(),
            min_time: 0,
            max_time: 0,
            duration: 0,
            lane_count: 0,
        }
    }
}

/// Lay out the tree against the current wall clock.
pub fn tree_to_timeline_data(tree: &PromiseTree, config: &TimelineConfig) -> TimelineData {
    tree_to_timeline_data_at(tree, config, chrono::Utc::now().timestamp_millis())
}

/// Lay out the tree, treating `now` as the end of every pending promise.
pub fn tree_to_timeline_data_at(
    tree: &PromiseTree,
    config: &TimelineConfig,
    now: i64,
) -> TimelineData {
    let end_of = |p: &Promise| -> Option<i64> {
        p.completed_on
            .or_else(|| (p.state == PromiseState::Pending).then_some(now))
    };

    let min_time = tree.iter().filter_map(|(_, n)| n.promise.created_on).min();
    let max_time = tree.iter().filter_map(|(_, n)| end_of(&n.promise)).max();
    let (Some(min_time), Some(max_time)) = (min_time, max_time) else {
        return TimelineData::empty();
    };

    let depths = tree.depths();
    let mut bars: Vec<TimelineBar> = tree
        .iter()
        .map(|(id, node)| {
            let p = &node.promise;
            let role = p.role();
            TimelineBar {
                id: p.id.clone(),
                label: timeline_label(p, role),
                role,
                state: p.state,
                start_time: p.created_on.unwrap_or(min_time),
                end_time: end_of(p),
                depth: depths[id.0],
                lane: 0,
                y: 0.0,
            }
        })
        .collect();

    let lane_count = assign_lanes(&mut bars, config);

    TimelineData {
        bars,
        min_time,
        max_time,
        duration: max_time - min_time,
        lane_count,
    }
}

/// "RPC charge" style label for calls that carry a function name.
fn timeline_label(p: &Promise, role: Role) -> String {
    if p.tag(TAG_INVOKE).is_none() && role != Role::Root {
        if let Some(func) = function_name(p) {
            return format!("{} {}", role.as_str().to_uppercase(), func);
        }
    }
    promise_label(p)
}

/// Greedy first-fit lane packing. Returns the number of lanes used.
pub fn assign_lanes(bars: &mut [TimelineBar], config: &TimelineConfig) -> usize {
    let mut order: Vec<usize> = (0..bars.len()).collect();
    order.sort_by(|&a, &b| {
        bars[a]
            .start_time
            .cmp(&bars[b].start_time)
            .then_with(|| bars[b].duration().cmp(&bars[a].duration()))
    });

    // End time of the last bar placed in each lane
    let mut lanes: Vec<i64> = Vec::new();
    let row = config.bar_height + config.bar_spacing;

    for i in order {
        let bar = &mut bars[i];
        let lane = match lanes.iter().position(|&end| end <= bar.start_time) {
            Some(lane) => {
                lanes[lane] = bar.effective_end();
                lane
            }
            None => {
                lanes.push(bar.effective_end());
                lanes.len() - 1
            }
        };
        bar.lane = lane;
        bar.y = lane as f64 * row;
    }

    lanes.len()
}

/// Map a timestamp onto `[0, width]`.
pub fn time_to_x(time: i64, min_time: i64, max_time: i64, width: f64) -> f64 {
    if max_time == min_time {
        return 0.0;
    }
    (time - min_time) as f64 / (max_time - min_time) as f64 * width
}

/// Axis label for `time` relative to `min_time`, in the coarsest unit.
pub fn format_relative_time(time: i64, min_time: i64) -> String {
    let delta = time - min_time;
    if delta < 1_000 {
        format!("{}ms", delta)
    } else if delta < 60_000 {
        format!("{:.1}s", delta as f64 / 1_000.0)
    } else if delta < 3_600_000 {
        format!("{:.1}m", delta as f64 / 60_000.0)
    } else {
        format!("{:.1}h", delta as f64 / 3_600_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(id: &str, start: i64, end: Option<i64>) -> TimelineBar {
        TimelineBar {
            id: id.to_string(),
            label: id.to_string(),
            role: Role::Root,
            state: PromiseState::Resolved,
            start_time: start,
            end_time: end,
            depth: 0,
            lane: 0,
            y: 0.0,
        }
    }

    #[test]
    fn test_first_fit_reuses_freed_lane() {
        let mut bars = vec![
            bar("1", 0, Some(10)),
            bar("2", 5, Some(15)),
            bar("3", 10, Some(20)),
        ];
        let lanes = assign_lanes(&mut bars, &TimelineConfig::default());
        assert_eq!(lanes, 2);
        assert_eq!(bars[0].lane, 0);
        assert_eq!(bars[1].lane, 1);
        assert_eq!(bars[2].lane, 0);
        assert_eq!(bars[1].y, 28.0);
    }

    #[test]
    fn test_ties_place_longer_bar_first() {
        let mut bars = vec![bar("short", 0, Some(5)), bar("long", 0, Some(50))];
        assign_lanes(&mut bars, &TimelineConfig::default());
        assert_eq!(bars[1].lane, 0);
        assert_eq!(bars[0].lane, 1);
    }

    #[test]
    fn test_open_ended_bar_takes_no_time() {
        let mut bars = vec![bar("a", 0, None), bar("b", 0, Some(10))];
        let lanes = assign_lanes(&mut bars, &TimelineConfig::default());
        // b sorts first (longer); a starts at 0 but lane 0 is busy until 10
        assert_eq!(lanes, 2);
        assert_eq!(bars[0].duration(), 0);
    }

    #[test]
    fn test_custom_geometry() {
        let config = TimelineConfig {
            bar_height: 10.0,
            bar_spacing: 2.0,
        };
        let mut bars = vec![bar("a", 0, Some(10)), bar("b", 1, Some(2)), bar("c", 1, Some(3))];
        assign_lanes(&mut bars, &config);
        assert_eq!(bars[2].y, 12.0);
        assert_eq!(bars[1].y, 24.0);
    }

    #[test]
    fn test_time_to_x() {
        assert_eq!(time_to_x(5, 0, 10, 200.0), 100.0);
        assert_eq!(time_to_x(0, 0, 10, 200.0), 0.0);
        assert_eq!(time_to_x(10, 0, 10, 200.0), 200.0);
        assert_eq!(time_to_x(7, 7, 7, 200.0), 0.0);
    }

    #[test]
    fn test_format_relative_time_units() {
        assert_eq!(format_relative_time(999, 0), "999ms");
        assert_eq!(format_relative_time(1_000, 0), "1.0s");
        assert_eq!(format_relative_time(1_500, 500), "1.0s");
        assert_eq!(format_relative_time(12_340, 0), "12.3s");
        assert_eq!(format_relative_time(90_000, 0), "1.5m");
        assert_eq!(format_relative_time(5_400_000, 0), "1.5h");
    }
}
