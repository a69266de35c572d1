//! # Quarry CLI (`qry`)
//!
//! The `qry` binary is the interface to the retrieval pipeline: database
//! initialization, incremental indexing, hybrid queries, and index stats.
//!
//! ## Usage
//!
//! ```bash
//! qry --config ./config/qry.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `qry init` | Create the SQLite database and run schema migrations |
//! | `qry index` | Index new and changed corpus documents |
//! | `qry query "<text>"` | Hybrid retrieval with re-ranking |
//! | `qry stats` | Show document/chunk counts and embedding coverage |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! qry init --config ./config/qry.toml
//!
//! # Index the corpus (only changed files are re-processed)
//! qry index --config ./config/qry.toml
//!
//! # Re-index everything, ignoring fingerprints
//! qry index --force
//!
//! # Ask a question
//! qry query "What is the capital of France?" --top-k 5
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use quarry::{config, index, migrate, query, stats};

/// Quarry CLI — a local-first hybrid retrieval pipeline.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/qry.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "qry",
    about = "Quarry — a local-first hybrid retrieval pipeline with incremental indexing",
    version,
    long_about = "Quarry indexes a directory of documents (PDF, Markdown, plain text) into \
    SQLite incrementally and answers queries by fusing lexical and vector similarity scores, \
    then re-ranking the best candidates with a pairwise relevance model."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/qry.toml`. Corpus, database, retrieval,
    /// embedding, and re-ranking settings are read from this file.
    #[arg(long, global = true, default_value = "./config/qry.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (documents, chunks, chunk_vectors). Idempotent — running it
    /// multiple times is safe.
    Init,

    /// Index new and changed corpus documents.
    ///
    /// Scans the corpus root, compares content fingerprints against the
    /// database, and re-processes only documents whose content changed.
    /// A document that fails (corrupt PDF, no extractable text) is
    /// reported and retried on the next run; the rest of the corpus is
    /// unaffected.
    Index {
        /// Re-index every document regardless of fingerprint.
        #[arg(long)]
        force: bool,

        /// Show what would be indexed without writing to the database.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of changed documents to index this run.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Query the indexed corpus.
    ///
    /// Fuses lexical keyword scores with vector similarity, re-ranks the
    /// best candidates with the configured relevance model, and prints
    /// ranked passages. Degrades to lexical-only results when the
    /// embedding provider or search backend is unavailable.
    Query {
        /// The query text.
        query: String,

        /// Number of results to return (overrides config).
        #[arg(long)]
        top_k: Option<usize>,

        /// Print results as JSON instead of formatted text.
        #[arg(long)]
        json: bool,
    },

    /// Show index statistics.
    ///
    /// Document and chunk counts, embedding coverage, and a per-document
    /// breakdown.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Index {
            force,
            dry_run,
            limit,
        } => {
            index::run_index(&cfg, force, dry_run, limit).await?;
        }
        Commands::Query { query, top_k, json } => {
            query::run_query(&cfg, &query, top_k, json).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
