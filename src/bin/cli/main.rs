mod app;
mod commands;
mod render;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dutchcards-cli", about = "Import Anki decks and inspect the card database", version)]
struct Cli {
    /// Config file (default: ./dutchcards.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Import an Anki .apkg deck, replacing all cards, and extract its mp3 files
    Import {
        /// Path to the .apkg file
        #[arg(long)]
        apkg: PathBuf,
        /// SQLite database file (overrides the configured database)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Directory to extract mp3 files into (overrides the configured one)
        #[arg(long)]
        media_dir: Option<PathBuf>,
        /// Only report what the deck contains
        #[arg(long)]
        dry_run: bool,
        /// Fail on notes that do not have exactly eight fields
        #[arg(long)]
        strict_fields: bool,
    },

    /// Create the cards table and add missing translation columns
    Migrate,

    /// Fill missing Russian/Ukrainian translations through the translation API
    Backfill {
        /// Maximum number of batches to run
        #[arg(long, default_value = "1")]
        rounds: usize,
        /// Cards per batch (overrides the configured batch size)
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// List cards, optionally filtered by a search query
    Search {
        /// Case-insensitive substring of word, dutch, english or definition
        query: Option<String>,
        /// Maximum results
        #[arg(long, default_value = "50")]
        limit: i64,
        /// Results to skip
        #[arg(long, default_value = "0")]
        offset: i64,
    },

    /// Show a single card
    Show {
        /// Card id
        id: i64,
    },

    /// Show a random card
    Random,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && std::io::stdout().is_terminal();
    let app = app::App::new(cli.config.as_deref())?;

    match cli.command {
        Command::Import { apkg, db, media_dir, dry_run, strict_fields } => {
            commands::import::run(
                &app,
                &apkg,
                db.as_deref(),
                media_dir.as_deref(),
                dry_run,
                strict_fields,
                &cli.format,
            )?;
        }
        Command::Migrate => {
            commands::migrate::run(&app, &cli.format)?;
        }
        Command::Backfill { rounds, batch_size } => {
            commands::backfill::run(&app, rounds, batch_size, &cli.format)?;
        }
        Command::Search { query, limit, offset } => {
            commands::search::run(&app, query, limit, offset, &cli.format, use_color)?;
        }
        Command::Show { id } => {
            commands::show::run(&app, id, &cli.format, use_color)?;
        }
        Command::Random => {
            commands::show::run_random(&app, &cli.format, use_color)?;
        }
    }

    Ok(())
}
