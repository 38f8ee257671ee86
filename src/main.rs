mod commands;
mod config;
mod cooccur;
mod csv;
mod dates;
mod db;
mod entities;
mod error;
mod fetcher;
mod models;
mod normalize;
mod pages;
mod processor;
mod seasons;
mod store;
mod sync;
#[cfg(test)]
mod testing;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::io::BufReader;

use crate::{
    config::Config,
    fetcher::{PageFetcher, WebFetcher},
    pages::SourceUrls,
    store::SqlGraphStore,
    sync::SyncEngine,
};

/// Builds a crew graph of people, shows, seasons and episodes from scraped
/// filmography pages.
#[derive(Parser)]
#[command(name = "crewgraph")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the fixed genre vocabulary
    SeedGenres,

    /// Import people from `external_person_id, full_name` rows
    AddPeople { csv: PathBuf },

    /// Scrape each listed person's credits into `<csv>_results.csv`
    ExtractCredits {
        csv: PathBuf,
        /// Leading rows to skip, header included
        #[arg(long, default_value_t = 1)]
        skip: usize,
    },

    /// Link people to shows and seasons from a person-season list
    AddWorkedOn {
        csv: PathBuf,
        /// Leading rows to skip, header included
        #[arg(long, default_value_t = 1)]
        skip: usize,
    },

    /// Link people who share at least one season
    DeriveWorkedWith {
        /// Recompute links that already exist
        #[arg(long)]
        refresh: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,crewgraph=debug,sqlx=warn".to_string()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let store = SqlGraphStore::open(&config.database_url).await?;
    let urls = SourceUrls::new(&config.source_base_url);
    let mut stdin = BufReader::new(tokio::io::stdin());

    match cli.command {
        Command::SeedGenres => {
            commands::seed_genres(&store).await?;
        },
        Command::AddPeople { csv } => {
            let (_, rows) = commands::read_input(&csv, &mut stdin).await?;
            commands::add_people(&store, &rows).await?;
        },
        Command::ExtractCredits { csv, skip } => {
            let (path, rows) = commands::read_input(&csv, &mut stdin).await?;
            let mut fetcher = WebFetcher::new(&config)?;
            fetcher.authenticate().await?;
            let (out, _) =
                commands::extract_credits(&store, &fetcher, &urls, &path, &rows, skip).await?;
            tracing::info!(output = %out.display(), "results written");
        },
        Command::AddWorkedOn { csv, skip } => {
            let (_, rows) = commands::read_input(&csv, &mut stdin).await?;
            let mut fetcher = WebFetcher::new(&config)?;
            fetcher.authenticate().await?;
            let engine = SyncEngine::new(&store, &fetcher, &urls, &config.excluded_title_ids);
            commands::add_worked_on(&engine, &rows, skip).await?;
        },
        Command::DeriveWorkedWith { refresh } => {
            commands::derive_worked_with(&store, refresh).await?;
        },
    }

    Ok(())
}
