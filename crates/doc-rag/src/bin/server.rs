//! Document Q&A server binary
//!
//! Run with: cargo run -p doc-rag --bin doc-rag-server -- --config doc-rag.toml

use clap::Parser;
use doc_rag::{config::RagConfig, server::RagServer, types::Kind};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Upload a document, then ask questions about it
#[derive(Debug, Parser)]
#[command(name = "doc-rag-server", version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "DOC_RAG_CONFIG")]
    config: Option<PathBuf>,

    /// Override the bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                        Doc RAG                            ║
║          Upload a document, ask it questions              ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    let mut config = RagConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Configuration loaded");
    tracing::info!(
        "  - Max upload: {:.1} GB",
        config.server.max_upload_size as f64 / (1024.0 * 1024.0 * 1024.0)
    );
    tracing::info!(
        "  - Chunk size: {} (overlap {})",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    tracing::info!("  - Embedding cap: {:?}", config.chunking.embed_cap());
    for kind in Kind::SUPPORTED {
        if let Ok(profile) = config.dispatch.profile(kind) {
            tracing::info!(
                "  - {}: loader={}, store={}, embed={}, llm={}",
                kind.display_name(),
                profile.loader,
                profile.vector_store,
                profile.embedding_model,
                profile.llm_model
            );
        }
    }

    let server = RagServer::new(config)?;

    match server.state().embedding_provider().health_check().await {
        Ok(true) => tracing::info!("Embedding provider is reachable"),
        _ => {
            tracing::warn!(
                "Ollama not available at {}",
                server.state().config().ollama.base_url
            );
            tracing::warn!("  Start it with `ollama serve` and pull the embedding models");
        }
    }

    println!("\nServer starting...");
    println!("  Health:  http://{}/", server.address());
    println!("  Web UI:  http://{}/ui", server.address());
    println!("\nEndpoints:");
    println!("  POST /upload             - Upload and index a file");
    println!("  POST /upload-background  - Upload, index in background");
    println!("  GET  /status/{{job_id}}    - Background job status");
    println!("  POST /query/invoke       - Ask a question");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
