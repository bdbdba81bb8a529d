use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use geokb_chunk::{ChunkRecord, TextLoader};
use geokb_core::Config;
use geokb_core::bootstrap::{
    create_chunk_store, create_chunker, create_in_memory_knowledge_base, resolve_config_path,
};
use geokb_retrieval::PreparedQuery;

/// Structure-aware chunking and retrieval over geoscience documents.
#[derive(Parser, Debug)]
#[command(name = "geokb", version, about)]
struct Cli {
    /// Path to the TOML config file (defaults to `GEOKB_CONFIG`, then
    /// `config/default.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chunk one document and write its chunk store.
    Split {
        file: PathBuf,
    },
    /// Index a directory of documents and retrieve context for a question.
    Query {
        /// Directory of `.txt`/`.md` documents to index.
        #[arg(long)]
        docs: PathBuf,
        question: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.clone());
    init_subscriber(&config_path);

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;

    match cli.command {
        Command::Split { file } => {
            let (path, records) = split_file(&config, &file).await?;
            print!("{}", render_split_summary(&path, &records));
        }
        Command::Query { docs, question } => {
            let kb = create_in_memory_knowledge_base(&config)?;
            let indexed = kb
                .add_dir(&docs)
                .await
                .with_context(|| format!("failed to index {}", docs.display()))?;
            tracing::info!(chunks = indexed, "documents indexed");
            let prepared = kb.prepare(&question).await?;
            print!("{}", render_query(&prepared));
        }
    }
    Ok(())
}

async fn split_file(config: &Config, file: &Path) -> anyhow::Result<(PathBuf, Vec<ChunkRecord>)> {
    let document = TextLoader::default()
        .load(file)
        .await
        .with_context(|| format!("failed to load {}", file.display()))?;
    let chunker = create_chunker(config)?;
    let store = create_chunk_store(config);
    let (path, records) = chunker.ingest(&document, &store).await?;
    Ok((path, records))
}

fn render_split_summary(path: &Path, records: &[ChunkRecord]) -> String {
    let mut out = format!("{} chunks -> {}\n", records.len(), path.display());
    for r in records {
        let _ = writeln!(
            out,
            "  [{}] {} / {} ({} tokens)",
            r.index,
            if r.section.is_empty() { "-" } else { r.section.as_str() },
            if r.subsection.is_empty() { "-" } else { r.subsection.as_str() },
            r.length
        );
    }
    out
}

fn render_query(prepared: &PreparedQuery) -> String {
    if prepared.docs.is_empty() {
        return "no supporting context found\n".to_owned();
    }
    let mut out = String::new();
    for (rank, doc) in prepared.docs.iter().enumerate() {
        let _ = writeln!(
            out,
            "#{rank} score={:.3} {} [{}] window={:?}",
            doc.score, doc.record.source, doc.record.section, doc.window
        );
        let _ = writeln!(out, "{}\n", doc.text);
    }
    let _ = writeln!(out, "--- prompt ---\n{}", prepared.prompt);
    out
}

fn init_subscriber(config_path: &Path) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_file = Config::load(config_path)
        .ok()
        .and_then(|c| c.observability.log_file);
    if let Some(path) = log_file {
        match std::fs::OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file))
                    .init();
                return;
            }
            Err(e) => eprintln!("cannot open log file {}, logging to stderr: {e}", path.display()),
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
