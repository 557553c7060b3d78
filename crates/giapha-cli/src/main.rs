use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use giapha_engine::events::{check_upcoming_events_with_options, partition_by_category};
use giapha_engine::forest::Forest;
use giapha_engine::lunar::solar_to_lunar_with_options;
use giapha_engine::model::{parse_iso_date, FamilyTree};
use giapha_engine::roster::Roster;
use giapha_engine::store::{load_or_seed, select_tree, EventStore, JsonFileStore, TreeStore};
use giapha_engine::EngineConfig;

#[derive(Parser)]
#[command(
    name = "giapha",
    version,
    about = "Family-tree reconstruction and lunar event reminders"
)]
struct Cli {
    /// Engine configuration file (JSON). Defaults come from GIAPHA_* variables.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log engine decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the store file with a default tree if it holds none
    Init {
        /// Store file (JSON)
        store: PathBuf,
    },
    /// Reconstruct the family forest of a tree
    Forest {
        /// Store file (JSON)
        store: PathBuf,
        /// Tree id (default: first tree)
        #[arg(long)]
        tree: Option<String>,
    },
    /// Members by generation with age and spouse/child counts
    Generations {
        /// Store file (JSON)
        store: PathBuf,
        #[arg(long)]
        tree: Option<String>,
        /// Case-insensitive name filter
        #[arg(long, default_value = "")]
        search: String,
        /// Reference date for ages (YYYY-MM-DD, default: today)
        #[arg(long)]
        today: Option<String>,
    },
    /// Convert a solar date to the lunar calendar
    Lunar {
        /// Date (YYYY-MM-DD)
        date: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Events due today or tomorrow
    Upcoming {
        /// Store file (JSON)
        store: PathBuf,
        #[arg(long)]
        tree: Option<String>,
        /// Reference date (YYYY-MM-DD, default: today in the configured zone)
        #[arg(long)]
        today: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Init { store } => {
            let mut store = JsonFileStore::new(store);
            let trees = load_or_seed(&mut store)
                .with_context(|| format!("failed to initialize {}", store.path().display()))?;
            let summary: Vec<_> = trees
                .iter()
                .map(|t| json!({ "id": t.id, "name": t.name, "members": t.members.len() }))
                .collect();
            print_json(&summary)?;
        }
        Commands::Forest { store, tree } => {
            let trees = read_trees(&store)?;
            let tree = select_tree(&trees, tree.as_deref())?;
            let forest = Forest::build(&tree.members);
            print_json(&json!({
                "tree": { "id": tree.id, "name": tree.name },
                "roots": forest.roots,
                "unplaced": forest.unplaced.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            }))?;
        }
        Commands::Generations {
            store,
            tree,
            search,
            today,
        } => {
            let trees = read_trees(&store)?;
            let tree = select_tree(&trees, tree.as_deref())?;
            let today = reference_date(today.as_deref(), &config)?;
            print_json(&Roster::build(&tree.members, &search, today))?;
        }
        Commands::Lunar { date, json } => {
            let date = parse_iso_date(&date)?;
            let lunar = solar_to_lunar_with_options(date, &config.lunar_options());
            if json {
                print_json(&lunar)?;
            } else {
                println!("{lunar}");
            }
        }
        Commands::Upcoming { store, tree, today } => {
            let file = JsonFileStore::new(&store);
            let trees = read_trees(&store)?;
            let tree: &FamilyTree = select_tree(&trees, tree.as_deref())?;
            let events = file
                .list_for_tree(&tree.id)
                .with_context(|| format!("failed to read events from {}", store.display()))?;
            let today = reference_date(today.as_deref(), &config)?;
            let options = config.lunar_options();
            let due = check_upcoming_events_with_options(&events, today, &options);
            debug!(tree = %tree.id, %today, due = due.len(), "upcoming events");
            print_json(&json!({
                "today": today.format("%Y-%m-%d").to_string(),
                "lunarToday": solar_to_lunar_with_options(today, &options),
                "due": due,
                "groups": partition_by_category(&events, today, config.soon_days),
            }))?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => EngineConfig::from_env().context("invalid GIAPHA_* environment"),
    }
}

fn read_trees(path: &Path) -> Result<Vec<FamilyTree>> {
    JsonFileStore::new(path)
        .read_all()
        .with_context(|| format!("failed to read {}", path.display()))
}

fn reference_date(today: Option<&str>, config: &EngineConfig) -> Result<NaiveDate> {
    match today {
        Some(s) => Ok(parse_iso_date(s)?),
        None => Ok(config.local_date(Utc::now())?),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{}", output);
    Ok(())
}
