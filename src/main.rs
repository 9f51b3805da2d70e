use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use voicelink::{
    create_router, AppState, Config, FileKnowledgeStore, KnowledgeStore, NoSummary,
    SessionTransport, SummaryService, WebSocketTransport,
};

#[derive(Parser, Debug)]
#[command(name = "voicelink", about = "Duplex live-audio session service")]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(short, long, default_value = "config/voicelink")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Arc::new(Config::load(&args.config)?);

    info!("voicelink v0.1.0");
    info!("Loaded config: {}", cfg.service.name);

    let transport: Arc<dyn SessionTransport> = Arc::new(WebSocketTransport::from_settings(
        &cfg.transport.url,
        cfg.transport.api_key_env.as_deref(),
    ));
    let knowledge: Arc<dyn KnowledgeStore> =
        Arc::new(FileKnowledgeStore::new(cfg.knowledge.path.clone()));
    let summary: Arc<dyn SummaryService> = Arc::new(NoSummary);

    let state = AppState::new(Arc::clone(&cfg), transport, knowledge, summary);
    let router = create_router(state.clone());

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP control API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    Ok(())
}

/// Wait for Ctrl-C, then tear the active session down before the server
/// stops accepting requests.
async fn shutdown_signal(state: AppState) {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutting down");

    if let Some(session) = state.session.write().await.take() {
        session.disconnect().await;
    }
}
