pub mod config;
pub mod detail;
pub mod fetch;
pub mod graph;
pub mod layout;
pub mod parser;
pub mod record;
pub mod render;
pub mod stats;
pub mod status;
pub mod store;
pub mod timeline;
pub mod tree;

pub use config::{Config, FetchConfig, GraphConfig, TimelineConfig};
pub use detail::{DataView, PromiseDetail, ValueDetail, format_timeout, render_detail};
pub use fetch::{FetchError, Page, PageFetcher, SearchFilter, fetch_tree_promises};
pub use graph::{
    Direction, GraphData, GraphEdge, GraphLayout, GraphNode, LayoutError, LayoutOracle,
    LayoutRequest, NodeSize, Point, layout_graph, tree_to_graph_data,
};
pub use layout::AsciiDagOracle;
pub use parser::{ParseError, load_records, parse_records};
pub use record::{Health, Promise, PromiseState, Role, Value, function_name};
pub use render::{ForestFilter, SortMode, StateFilter, render_tree, root_candidates, select_roots};
pub use stats::{PromiseStats, active_pending, compute_stats, recent_failures};
pub use status::{compute_subtree_status, subtree_statuses};
pub use store::RecordStore;
pub use timeline::{
    TimelineBar, TimelineData, assign_lanes, format_relative_time, time_to_x,
    tree_to_timeline_data, tree_to_timeline_data_at,
};
pub use tree::{
    NodeId, PromiseTree, TreeNode, build_tree, is_root, is_root_in_set, parent_id, promise_label,
};
