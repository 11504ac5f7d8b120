use anyhow::{Context, Result};
use bookrank_core::asset::AssetStore;
use bookrank_core::pipeline::{rebuild, BuildConfig, RawDocument};
use bookrank_core::{CentralityConfig, GraphConfig, SignatureConfig};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs;
use std::path::Path;

#[derive(Parser)]
#[command(name = "bookrank-builder")]
#[command(about = "Build and publish book ranking assets (similarity graph + centrality)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the ranking asset from a corpus directory of .txt files
    /// (book id = file stem) and publish it atomically.
    Build {
        /// Corpus directory
        #[arg(long)]
        input: String,
        /// Asset store root
        #[arg(long)]
        output: String,
        /// Minimum Jaccard similarity for an edge
        #[arg(long, default_value_t = 0.15)]
        threshold: f64,
        /// Random-walk damping factor
        #[arg(long, default_value_t = 0.85)]
        damping: f64,
        /// L1 convergence tolerance
        #[arg(long, default_value_t = 1e-9)]
        tolerance: f64,
        /// Centrality iteration cap
        #[arg(long, default_value_t = 100)]
        max_iterations: usize,
        /// Minimum word count for corpus admission
        #[arg(long, default_value_t = 10_000)]
        min_words: usize,
        /// Pair evaluations per similarity worker chunk
        #[arg(long, default_value_t = 50_000)]
        chunk_size: u64,
        /// Asset version; defaults to the build's unix timestamp
        #[arg(long)]
        version: Option<u64>,
    },
    /// Print the metadata of the currently published asset.
    Inspect {
        /// Asset store root
        #[arg(long)]
        store: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            output,
            threshold,
            damping,
            tolerance,
            max_iterations,
            min_words,
            chunk_size,
            version,
        } => {
            let now = time::OffsetDateTime::now_utc();
            let config = BuildConfig {
                signature: SignatureConfig {
                    min_word_count: min_words,
                    min_token_len: 3,
                },
                graph: GraphConfig {
                    threshold,
                    chunk_size,
                    max_chunk_retries: 2,
                },
                centrality: CentralityConfig {
                    damping,
                    tolerance,
                    max_iterations,
                },
                version: version.unwrap_or(now.unix_timestamp() as u64),
                created_at: now
                    .format(&time::format_description::well_known::Rfc3339)
                    .unwrap_or_else(|_| "".into()),
            };
            build(&input, &output, &config)
        }
        Commands::Inspect { store } => inspect(&store),
    }
}

fn load_corpus(input: &Path) -> Result<Vec<RawDocument>> {
    let mut docs = Vec::new();
    for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
        let p = entry.path();
        if !p.is_file() || p.extension().and_then(|s| s.to_str()) != Some("txt") {
            continue;
        }
        let id = match p.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem.to_string(),
            None => continue,
        };
        match fs::read_to_string(p) {
            Ok(text) => docs.push(RawDocument { id, text }),
            Err(err) => tracing::warn!(path = %p.display(), %err, "skipping unreadable book"),
        }
    }
    Ok(docs)
}

fn build(input: &str, output: &str, config: &BuildConfig) -> Result<()> {
    let start = std::time::Instant::now();
    let docs = load_corpus(Path::new(input))
        .with_context(|| format!("reading corpus from {input}"))?;
    anyhow::ensure!(!docs.is_empty(), "no .txt books found under {input}");
    tracing::info!(num_books = docs.len(), "corpus loaded");

    let asset = rebuild(docs, config)?;
    let store = AssetStore::new(output);
    let dir = store.publish(&asset)?;
    tracing::info!(
        version = asset.meta.version,
        num_nodes = asset.meta.num_nodes,
        num_edges = asset.meta.num_edges,
        converged = asset.meta.converged,
        elapsed_s = start.elapsed().as_secs_f64(),
        dir = %dir.display(),
        "build complete"
    );
    Ok(())
}

fn inspect(store_root: &str) -> Result<()> {
    let store = AssetStore::new(store_root);
    let asset = store
        .load_current()
        .with_context(|| format!("loading current asset from {store_root}"))?;
    println!("{}", serde_json::to_string_pretty(&asset.meta)?);
    Ok(())
}
