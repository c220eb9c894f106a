//! Prose CLI
//!
//! Command-line interface for Prose - ordered markdown documents.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use prose_core::{Config, DropPosition, StoreHandle};

mod commands;
mod editor;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "prose")]
#[command(about = "Prose - minimal markdown notes, in the order you choose")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List documents in display order
    #[command(alias = "ls")]
    List,
    /// Show a document
    Show {
        /// Document ID (full UUID or prefix)
        id: String,
    },
    /// Create a document at the top of the list
    #[command(alias = "add")]
    New {
        /// Set the title by hand instead of using the first line
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// Document body (reads stdin or opens editor if not provided)
        #[arg(short, long)]
        body: Option<String>,
    },
    /// Replace a document's content
    Edit {
        /// Document ID (full UUID or prefix)
        id: String,
        /// New body (reads stdin or opens editor if not provided)
        #[arg(short, long)]
        body: Option<String>,
    },
    /// Set a document's title by hand
    Rename {
        /// Document ID (full UUID or prefix)
        id: String,
        /// New title
        title: String,
    },
    /// Delete a document
    #[command(alias = "rm")]
    Delete {
        /// Document ID (full UUID or prefix)
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Move a document before or after another one
    #[command(alias = "mv")]
    Move {
        /// Document to move
        id: String,
        #[command(flatten)]
        target: MoveTarget,
    },
    /// Show configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct MoveTarget {
    /// Place it directly above this document
    #[arg(long, value_name = "TARGET")]
    before: Option<String>,
    /// Place it directly below this document
    #[arg(long, value_name = "TARGET")]
    after: Option<String>,
}

impl MoveTarget {
    fn into_parts(self) -> Option<(String, DropPosition)> {
        match (self.before, self.after) {
            (Some(target), _) => Some((target, DropPosition::Before)),
            (None, Some(target)) => Some((target, DropPosition::After)),
            (None, None) => None,
        }
    }
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config doesn't need the store
    if let Commands::Config { command } = &cli.command {
        return match command {
            Some(ConfigCommands::Show) | None => commands::config::show(&output),
        };
    }

    let config = Config::load().context("Failed to load configuration")?;
    let api = StoreHandle::open(&config).context("Failed to open document store")?;

    match cli.command {
        Commands::List => commands::document::list(&api, &output).await,
        Commands::Show { id } => commands::document::show(&api, id, &output).await,
        Commands::New { title, body } => {
            commands::document::create(&api, title, body, &output).await
        }
        Commands::Edit { id, body } => {
            commands::document::edit(&api, id, body, config.autosave_debounce(), &output).await
        }
        Commands::Rename { id, title } => {
            commands::document::rename(&api, id, title, &output).await
        }
        Commands::Delete { id, yes } => commands::document::delete(&api, id, yes, &output).await,
        Commands::Move { id, target } => {
            let (target, position) = target
                .into_parts()
                .context("Specify --before or --after")?;
            commands::document::move_document(&api, id, target, position, &output).await
        }
        Commands::Config { .. } => Ok(()),
    }
}

/// Log to stderr, filtered by PROSE_LOG or RUST_LOG (default: warn)
fn init_logging() {
    let filter = EnvFilter::try_from_env("PROSE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
