use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use trigram_suggest::config::{DEFAULT_HOST, DEFAULT_MAX_SUGGESTIONS, DEFAULT_PORT, DEFAULT_SIMILARITY_THRESHOLD, ServerConfig};
use trigram_suggest::logging::init_logger;
use trigram_suggest::metrics::metrics;
use trigram_suggest::server::SuggestServer;
use trigram_suggest::vocabulary::TrigramVocabulary;

#[derive(Parser, Debug)]
#[command(name = "trigram-suggest")]
#[command(about = "WebSocket word-suggestion server with trigram fuzzy matching")]
#[command(version)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port to listen on (0 picks a free port)
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Word list, one word per line; defaults to the built-in seed words
    #[arg(long)]
    vocabulary: Option<PathBuf>,

    /// Minimum trigram similarity for a fuzzy match
    #[arg(long, default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
    similarity_threshold: f32,

    /// Maximum suggestions per query
    #[arg(long, default_value_t = DEFAULT_MAX_SUGGESTIONS)]
    max_suggestions: usize,

    /// Log level for stderr (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,

    /// Disable ANSI colors in stderr output
    #[arg(long)]
    no_color: bool,

    /// Do not write a session log to the cache directory
    #[arg(long)]
    no_file_logging: bool,

    /// Record every protocol frame to a wire log
    #[arg(long)]
    wire_log: bool,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (_guard, wire_logger) = init_logger(
        args.no_color,
        args.log_level.as_deref(),
        !args.no_file_logging,
        args.wire_log,
    )
    .context("failed to initialize logging")?;

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        similarity_threshold: args.similarity_threshold,
        max_suggestions: args.max_suggestions,
    };

    let vocabulary = match &args.vocabulary {
        Some(path) => TrigramVocabulary::from_path(path, config.similarity_threshold)
            .with_context(|| format!("failed to load vocabulary from {:?}", path))?,
        None => {
            warn!("No vocabulary file given, serving the built-in seed words");
            TrigramVocabulary::with_seed_words(config.similarity_threshold)
        }
    };
    if vocabulary.is_empty() {
        warn!("Vocabulary is empty; every query will get an empty list");
    }
    info!(
        "Vocabulary ready: {} words, similarity threshold {}",
        vocabulary.len(),
        vocabulary.threshold()
    );

    let server = SuggestServer::bind(&config, Arc::new(vocabulary), wire_logger).await?;

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown requested");
        shutdown.shutdown();
    });

    server.serve().await;

    let summary = metrics().summary();
    info!("Final metrics: {:?}", summary);
    if let Some(stats) = metrics().operation_stats("rank") {
        info!(
            "Ranking latency: {} queries, p50 {}us, p95 {}us, p99 {}us",
            stats.count, stats.p50_micros, stats.p95_micros, stats.p99_micros
        );
    }

    Ok(())
}
