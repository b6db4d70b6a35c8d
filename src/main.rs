//! # knowledge-agent CLI (`ka`)
//!
//! The `ka` binary drives the knowledge base: database initialization,
//! source ingestion, question answering, and the HTTP API server.
//!
//! ## Usage
//!
//! ```bash
//! ka --config ./knowledge-agent.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ka init` | Create the SQLite database and schema |
//! | `ka ingest web <url>` | Ingest a web page |
//! | `ka ingest youtube <url>` | Ingest a YouTube transcript |
//! | `ka ingest file <path>` | Ingest a PDF, DOCX, or TXT file |
//! | `ka sources` | List ingested sources |
//! | `ka ask "<question>"` | Answer a question with citations |
//! | `ka clear` | Remove everything from the knowledge base |
//! | `ka serve` | Start the HTTP JSON API |
//!
//! `OPENAI_API_KEY` must be set (a `.env` file is honored) for any
//! command that reaches the OpenAI API — that is, `ingest` and `ask`
//! on a non-empty knowledge base.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use knowledge_agent::answer::answer_question;
use knowledge_agent::chat::OpenAiChat;
use knowledge_agent::chunk::Chunker;
use knowledge_agent::config::{load_config, Config};
use knowledge_agent::embedding::OpenAiEmbedder;
use knowledge_agent::ingest::ingest_source;
use knowledge_agent::models::LoadedSource;
use knowledge_agent::store::VectorStore;
use knowledge_agent::{db, loader_file, loader_web, loader_youtube, migrate, server, sources};

/// knowledge-agent — a local RAG knowledge base with cited answers.
///
/// All commands accept a `--config` flag pointing to a TOML
/// configuration file; every setting has a default, so the file is
/// optional.
#[derive(Parser)]
#[command(
    name = "ka",
    about = "knowledge-agent — ingest web pages, transcripts, and documents, then ask cited questions",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Optional — defaults apply
    /// when the file does not exist.
    #[arg(long, global = true, default_value = "./knowledge-agent.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables.
    /// Idempotent — running it multiple times is safe.
    Init,

    /// Ingest a source into the knowledge base.
    ///
    /// Fetches or reads the source, splits it into overlapping token
    /// chunks, embeds them, and stores everything. Re-ingesting the
    /// same URL or filename replaces its previous chunks.
    Ingest {
        #[command(subcommand)]
        what: IngestWhat,
    },

    /// List ingested sources.
    Sources,

    /// Answer a question from the ingested sources, with citations.
    ///
    /// Retrieves the most similar chunks and forwards them with the
    /// question to the chat model. With nothing ingested, reports that
    /// no relevant context exists without calling any API.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Remove all sources, chunks, and vectors from the knowledge base.
    Clear,

    /// Start the HTTP JSON API used by the browser UI.
    ///
    /// Binds to the address configured in `[server].bind`.
    Serve,
}

/// Ingestion subcommands, one per source type.
#[derive(Subcommand)]
enum IngestWhat {
    /// Ingest the readable text of a web page.
    Web {
        /// Page URL, e.g. `https://example.com/article`.
        url: String,
    },
    /// Ingest the transcript of a YouTube video.
    Youtube {
        /// Video URL, e.g. `https://www.youtube.com/watch?v=...`.
        url: String,
    },
    /// Ingest an uploaded file (PDF, DOCX, or TXT).
    File {
        /// Path to the file.
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("knowledge_agent=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&config).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { what } => {
            let loaded = match what {
                IngestWhat::Web { url } => loader_web::load_webpage(&url).await?,
                IngestWhat::Youtube { url } => loader_youtube::load_transcript(&url).await?,
                IngestWhat::File { path } => {
                    let bytes = std::fs::read(&path)?;
                    let filename = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string());
                    loader_file::load_file(&filename, &bytes)?
                }
            };
            run_ingest(&config, loaded).await?;
        }
        Commands::Sources => {
            sources::run_sources(&config).await?;
        }
        Commands::Ask { question } => {
            run_ask(&config, &question).await?;
        }
        Commands::Clear => {
            let pool = db::connect(&config).await?;
            migrate::apply_schema(&pool).await?;
            let store = VectorStore::new(pool.clone(), config.storage.collection.clone());
            store.clear().await?;
            pool.close().await;
            println!("Knowledge base cleared.");
        }
        Commands::Serve => {
            server::run_server(&config).await?;
        }
    }

    Ok(())
}

async fn run_ingest(config: &Config, loaded: LoadedSource) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::apply_schema(&pool).await?;
    let store = VectorStore::new(pool.clone(), config.storage.collection.clone());

    let embedder = OpenAiEmbedder::new(&config.openai)?;
    let chunker = Chunker::new(config.chunking.max_tokens, config.chunking.overlap_tokens)?;

    let report = ingest_source(&store, &embedder, &chunker, loaded).await?;

    println!(
        "Ingested {} chunk(s) from {} ({}).",
        report.chunks, report.origin, report.kind
    );

    pool.close().await;
    Ok(())
}

async fn run_ask(config: &Config, question: &str) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::apply_schema(&pool).await?;
    let store = VectorStore::new(pool.clone(), config.storage.collection.clone());

    // An empty knowledge base answers immediately, with no API key needed.
    if store.count_chunks().await? == 0 {
        println!("{}", knowledge_agent::answer::NO_CONTEXT_ANSWER);
        pool.close().await;
        return Ok(());
    }

    let embedder = OpenAiEmbedder::new(&config.openai)?;
    let chat = OpenAiChat::new(&config.openai)?;
    let chunker = Chunker::new(config.chunking.max_tokens, config.chunking.overlap_tokens)?;

    let answer = answer_question(
        &store,
        &embedder,
        &chat,
        &chunker,
        &config.retrieval,
        question,
    )
    .await?;

    println!("{}", answer.text);
    if !answer.citations.is_empty() {
        println!();
        println!("Citations:");
        for citation in &answer.citations {
            println!("- {}", citation.label());
        }
    }

    pool.close().await;
    Ok(())
}
