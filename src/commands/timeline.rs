use anyhow::Result;
use std::path::Path;

use promise_tree::config::Config;
use promise_tree::record::PromiseState;
use promise_tree::timeline::{TimelineBar, format_relative_time, time_to_x, tree_to_timeline_data};

const LABEL_WIDTH: usize = 32;

fn bar_char(state: PromiseState) -> char {
    match state {
        PromiseState::Resolved => '█',
        PromiseState::Pending => '▒',
        PromiseState::Rejected
        | PromiseState::RejectedCanceled
        | PromiseState::RejectedTimedout => '▓',
        PromiseState::Unknown => '░',
    }
}

fn render_bar(bar: &TimelineBar, min_time: i64, max_time: i64, width: usize) -> String {
    let start = time_to_x(bar.start_time, min_time, max_time, width as f64).round() as usize;
    let end = time_to_x(bar.effective_end(), min_time, max_time, width as f64).round() as usize;
    let start = start.min(width.saturating_sub(1));
    // Zero-length bars still get one cell
    let len = end.saturating_sub(start).max(1).min(width - start);

    let mut row = String::with_capacity(width * 3);
    row.push_str(&" ".repeat(start));
    row.extend(std::iter::repeat_n(bar_char(bar.state), len));
    row.push_str(&" ".repeat(width.saturating_sub(start + len)));
    row
}

pub fn run(input: &Path, root: &str, config: &Config, width: usize, json: bool) -> Result<()> {
    let tree = super::load_tree(input, root, config)?;
    let data = tree_to_timeline_data(&tree, &config.timeline);

    if json {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if data.bars.is_empty() {
        println!("No timed promises under {}", root);
        return Ok(());
    }

    let width = width.max(10);
    for bar in &data.bars {
        let mut label = format!("{}{}", "  ".repeat(bar.depth), bar.label);
        if label.chars().count() > LABEL_WIDTH {
            label = label.chars().take(LABEL_WIDTH - 1).collect::<String>() + "…";
        }
        println!(
            "{:<width_l$} |{}| {:>8} lane {}",
            label,
            render_bar(bar, data.min_time, data.max_time, width),
            format_relative_time(bar.start_time, data.min_time),
            bar.lane,
            width_l = LABEL_WIDTH
        );
    }
    println!(
        "{:<width_l$}  0{:>w$}",
        "",
        format_relative_time(data.max_time, data.min_time),
        width_l = LABEL_WIDTH,
        w = width
    );
    println!("{} bars in {} lanes", data.bars.len(), data.lane_count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use promise_tree::record::Role;

    fn bar(start: i64, end: Option<i64>) -> TimelineBar {
        TimelineBar {
            id: "b".to_string(),
            label: "b".to_string(),
            role: Role::Run,
            state: PromiseState::Resolved,
            start_time: start,
            end_time: end,
            depth: 0,
            lane: 0,
            y: 0.0,
        }
    }

    #[test]
    fn test_render_bar_spans_window() {
        let row = render_bar(&bar(0, Some(100)), 0, 100, 10);
        assert_eq!(row, "█".repeat(10));
    }

    #[test]
    fn test_render_bar_half() {
        let row = render_bar(&bar(50, Some(100)), 0, 100, 10);
        assert_eq!(row, format!("{}{}", " ".repeat(5), "█".repeat(5)));
    }

    #[test]
    fn test_zero_length_bar_at_end_is_visible() {
        let row = render_bar(&bar(100, None), 0, 100, 10);
        assert_eq!(row.chars().count(), 10);
        assert!(row.ends_with('█'));
    }
}
