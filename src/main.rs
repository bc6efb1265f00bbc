//! CLI entry point for the retrieval service.
//!
//! Provides commands for configuring, serving, and querying a vector store.
//! `ingest`, `search` and `info` work against the journal so their results
//! persist between invocations.

use anyhow::{Context, bail};
use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use retriever::display::{create_hits_table, create_info_table, create_ingest_table};
use retriever::{Document, RetrievalPipeline, Settings, VectorDimension};
use serde::Deserialize;
use std::path::{Path, PathBuf};

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Vector similarity retrieval service
#[derive(Parser)]
#[command(
    name = "retriever",
    version = env!("CARGO_PKG_VERSION"),
    about = "Vector similarity retrieval service",
    long_about = "Store embedded documents and find the ones nearest to a query embedding.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Initialize project
    #[command(about = "Set up .retriever directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings as TOML")]
    Config,

    /// Run the HTTP service
    #[command(
        about = "Start the HTTP retrieval service",
        after_help = "Endpoints:\n  POST /add-documents  [{text, metadata, embedding}]\n  POST /search         {query_embedding, top_k?, threshold?}\n  GET  /info\n  GET  /health"
    )]
    Serve {
        /// Address to bind (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,

        /// Embedding dimension (overrides store.dimension)
        #[arg(long)]
        dimension: Option<usize>,
    },

    /// Add documents from a JSON file
    #[command(
        about = "Ingest a JSON array of documents into the journaled store",
        after_help = "File format:\n  [{\"text\": \"...\", \"metadata\": {...}, \"embedding\": [0.1, ...]}]"
    )]
    Ingest {
        /// JSON file holding an array of documents
        file: PathBuf,

        /// Journal directory (enables the journal for this run)
        #[arg(long)]
        journal: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Search with a query embedding from a JSON file
    #[command(
        about = "Find the documents nearest to a query embedding",
        after_help = "File format:\n  [0.1, 0.2, ...]  or  {\"query_embedding\": [0.1, 0.2, ...]}"
    )]
    Search {
        /// JSON file holding the query embedding
        file: PathBuf,

        /// Maximum number of results (defaults to search.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Minimum similarity score (defaults to search.threshold)
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Journal directory (enables the journal for this run)
        #[arg(long)]
        journal: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Describe the store
    #[command(about = "Show dimension, document count and last update")]
    Info {
        /// Journal directory (enables the journal for this run)
        #[arg(long)]
        journal: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QueryFile {
    Bare(Vec<f32>),
    Wrapped { query_embedding: Vec<f32> },
}

impl QueryFile {
    fn into_embedding(self) -> Vec<f32> {
        match self {
            Self::Bare(embedding) | Self::Wrapped { query_embedding: embedding } => embedding,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = if let Some(config_path) = &cli.config {
        Settings::load_from(config_path).unwrap_or_else(|e| {
            eprintln!(
                "Configuration error loading from {}: {}",
                config_path.display(),
                e
            );
            std::process::exit(1);
        })
    } else {
        Settings::load().unwrap_or_else(|e| {
            eprintln!("Configuration error: {e}");
            Settings::default()
        })
    };

    if let Err(e) = retriever::logging::init(&config) {
        eprintln!("Warning: {e}");
    }

    if let Err(e) = run(cli, config).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mut config: Settings) -> anyhow::Result<()> {
    if !matches!(cli.command, Commands::Init { .. } | Commands::Config) && cli.config.is_none() {
        if let Err(warning) = Settings::check_init() {
            eprintln!("Warning: {warning}");
            eprintln!("Using default configuration for now.");
        }
    }

    match cli.command {
        Commands::Init { force } => {
            let path = Settings::init_config_file(force)
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            if force {
                println!("Overwrote configuration at: {}", path.display());
            } else {
                println!("Created configuration file at: {}", path.display());
            }
            println!("Edit this file to customize your settings.");
        }

        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }

        Commands::Serve { bind, dimension } => {
            if let Some(dimension) = dimension {
                config.store.dimension = dimension;
            }
            config.validate().map_err(anyhow::Error::msg)?;
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            serve(config, bind).await?;
        }

        Commands::Ingest {
            file,
            journal,
            json,
        } => {
            let documents: Vec<Document> = read_json(&file)?;
            let pipeline = open_journaled(&mut config, journal)?;

            let receipt = pipeline.ingest(documents)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&receipt)?);
            } else {
                println!("{}", create_ingest_table(&receipt));
            }
        }

        Commands::Search {
            file,
            top_k,
            threshold,
            journal,
            json,
        } => {
            let query = read_json::<QueryFile>(&file)?.into_embedding();
            let top_k = top_k.unwrap_or(config.search.top_k);
            if top_k > config.search.max_top_k {
                bail!(
                    "top_k {top_k} exceeds search.max_top_k ({})",
                    config.search.max_top_k
                );
            }
            let threshold = threshold.unwrap_or(config.search.threshold);
            let pipeline = open_journaled(&mut config, journal)?;

            let hits = pipeline.search(&query, top_k, threshold)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else if hits.is_empty() {
                println!("No documents scored at or above {threshold}");
            } else {
                println!("{}", create_hits_table(&hits));
            }
        }

        Commands::Info { journal, json } => {
            if let Some(dir) = journal {
                config.journal.enabled = true;
                config.journal.path = dir;
            }
            let pipeline = RetrievalPipeline::from_settings(&config)?;
            let info = pipeline.describe();

            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                let journal_path = config.journal.path.display().to_string();
                let journal = pipeline.is_journaled().then_some(journal_path.as_str());
                println!("{}", create_info_table(&info, journal));
            }
        }
    }

    Ok(())
}

/// Opens the store through its journal; without one the CLI would forget everything on exit.
fn open_journaled(config: &mut Settings, journal: Option<PathBuf>) -> anyhow::Result<RetrievalPipeline> {
    if let Some(dir) = journal {
        config.journal.enabled = true;
        config.journal.path = dir;
    }
    if !config.journal.enabled {
        bail!(
            "This command needs the journal. Set journal.enabled = true in settings.toml or pass --journal <DIR>"
        );
    }

    let dimension = VectorDimension::new(config.store.dimension)?;
    RetrievalPipeline::open(dimension, &config.journal.path, config.journal.sync)
        .with_context(|| format!("Failed to open journal at {}", config.journal.path.display()))
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

#[cfg(feature = "http-server")]
async fn serve(config: Settings, bind: String) -> anyhow::Result<()> {
    retriever::server::serve_http(config, bind).await
}

#[cfg(not(feature = "http-server"))]
async fn serve(_config: Settings, _bind: String) -> anyhow::Result<()> {
    eprintln!("HTTP server support is not compiled in.");
    eprintln!("Please rebuild with: cargo build --features http-server");
    std::process::exit(1);
}
