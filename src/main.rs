use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use promise_tree::config::Config;
use promise_tree::graph::Direction;
use promise_tree::record::Role;
use promise_tree::render::{SortMode, StateFilter};

mod commands;

#[derive(Parser)]
#[command(name = "ptree")]
#[command(about = "Inspect durable promise call trees: tree, timeline and dependency graph")]
#[command(version)]
struct Cli {
    /// Path to a config file (default: ~/.config/promise-tree/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output as JSON for machine consumption
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the call tree below a root promise
    Tree {
        /// Root promise ID
        root: String,

        /// Records file (JSON array, search response, or JSONL)
        #[arg(long, short)]
        input: PathBuf,
    },

    /// Print execution bars packed into lanes
    Timeline {
        /// Root promise ID
        root: String,

        /// Records file (JSON array, search response, or JSONL)
        #[arg(long, short)]
        input: PathBuf,

        /// Width of the bar area in characters
        #[arg(long, default_value = "60")]
        width: usize,
    },

    /// Print the positioned dependency graph
    Graph {
        /// Root promise ID
        root: String,

        /// Records file (JSON array, search response, or JSONL)
        #[arg(long, short)]
        input: PathBuf,

        /// Layout direction: tb or lr (default from config)
        #[arg(long)]
        direction: Option<Direction>,
    },

    /// Show counts, throughput and error rate over all records
    Stats {
        /// Records file (JSON array, search response, or JSONL)
        #[arg(long, short)]
        input: PathBuf,

        /// Number of recent failures and oldest pending promises to list
        #[arg(long, default_value = "5")]
        limit: usize,
    },

    /// List promises that look like call roots
    Roots {
        /// Records file (JSON array, search response, or JSONL)
        #[arg(long, short)]
        input: PathBuf,

        /// Only list promises in this state: pending, resolved or rejected
        #[arg(long)]
        state: Option<StateFilter>,

        /// List every promise of this role (root, rpc, run, sleep) instead of only roots
        #[arg(long)]
        role: Option<Role>,

        /// Order: created-desc, created-asc, resolved-desc or resolved-asc
        #[arg(long, default_value = "created-desc")]
        sort: SortMode,
    },

    /// Show every field of a single promise
    Show {
        /// Promise ID
        id: String,

        /// Records file (JSON array, search response, or JSONL)
        #[arg(long, short)]
        input: PathBuf,
    },

    /// Show the effective configuration
    Config {
        /// Write a default config file (to --config or the global path)
        #[arg(long)]
        init: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Config { init } = cli.command {
        return if init {
            commands::config_cmd::init(cli.config.as_deref())
        } else {
            commands::config_cmd::show(cli.config.as_deref(), cli.json)
        };
    }

    let config = Config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Tree { root, input } => commands::tree::run(&input, &root, &config, cli.json),
        Commands::Timeline { root, input, width } => {
            commands::timeline::run(&input, &root, &config, width, cli.json)
        }
        Commands::Graph {
            root,
            input,
            direction,
        } => commands::graph::run(&input, &root, &config, direction, cli.json),
        Commands::Stats { input, limit } => commands::stats::run(&input, limit, cli.json),
        Commands::Roots {
            input,
            state,
            role,
            sort,
        } => commands::roots::run(&input, state, role, sort, cli.json),
        Commands::Show { id, input } => commands::show::run(&input, &id, cli.json),
        Commands::Config { .. } => Ok(()),
    }
}
