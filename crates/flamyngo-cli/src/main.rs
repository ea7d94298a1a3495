//! # Flamyngo CLI
//!
//! Command-line interface for browsing document collections through their
//! Flamyngo settings.
//!
//! ## Commands
//!
//! - `flamyngo collections` - List configured collections
//! - `flamyngo query <collection> [search]` - Run a summary query
//! - `flamyngo complete <collection> <partial>` - Autocomplete a search string
//! - `flamyngo doc <collection> <uid>` - Fetch one document by unique key
//! - `flamyngo dump <collection>` - Print every document of a collection
//! - `flamyngo plot <collection> <search> --x <field> --y <field>` - Extract plot data
//! - `flamyngo check` - Validate the settings file
//!
//! ## Example Usage
//!
//! ```bash
//! # Materials whose formula starts with "MoS"
//! flamyngo -c flamyngo.toml query materials MoS
//!
//! # A query object; braces are optional
//! flamyngo query materials '"Band gap": {"$gt": 1.5}'
//!
//! # Complete a key name
//! flamyngo complete materials '{"form'
//! ```

mod app;
mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Flamyngo - configuration-driven document browser
#[derive(Parser)]
#[command(name = "flamyngo")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the settings file
    #[arg(short, long, global = true, env = "FLAMYNGO")]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured collections
    Collections,

    /// Run a summary query against a collection
    Query {
        /// Collection name
        collection: String,

        /// Search string (empty matches everything)
        #[arg(default_value = "")]
        search: String,

        /// Maximum number of rows to show
        #[arg(short, long, default_value = "100")]
        limit: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Suggest completions for a partial search string
    #[command(alias = "c")]
    Complete {
        /// Collection name
        collection: String,

        /// Partially typed search string
        partial: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Fetch a single document by its unique key
    Doc {
        /// Collection name
        collection: String,

        /// Unique key value
        uid: String,
    },

    /// Print every document in a collection as JSON
    Dump {
        /// Collection name
        collection: String,
    },

    /// Extract (x, y) pairs for plotting
    Plot {
        /// Collection name
        collection: String,

        /// Search string
        search: String,

        /// Field or display name for the x axis
        #[arg(short, long)]
        x: String,

        /// Field or display name for the y axis
        #[arg(short, long)]
        y: String,
    },

    /// Validate the settings file and summarize each collection
    Check,
}

#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();

    // Load configuration
    let config = match &cli.config {
        Some(path) => flamyngo_core::ConfigStore::load_from(path)?,
        None => flamyngo_core::ConfigStore::load()?,
    };

    // Execute command
    match cli.command {
        Commands::Check => commands::check::run(&config),
        command => execute(&app::App::new(config)?, command),
    }
}

fn execute(app: &app::App, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Collections => commands::collections::run(app),
        Commands::Query {
            collection,
            search,
            limit,
            output,
        } => commands::query::run(app, &collection, &search, limit, output),
        Commands::Complete {
            collection,
            partial,
            output,
        } => commands::complete::run(app, &collection, &partial, output),
        Commands::Doc { collection, uid } => commands::doc::run(app, &collection, &uid),
        Commands::Dump { collection } => commands::dump::run(app, &collection),
        Commands::Plot {
            collection,
            search,
            x,
            y,
        } => commands::plot::run(app, &collection, &search, &x, &y),
        Commands::Check => commands::check::run(&app.config),
    }
}
