use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kbcheck_api::{create_router, AccessGate, AnalysisServices, AppState, ServerConfig};
use kbcheck_core::defaults::ENV_CHAT_INCLUDE_HISTORY;
use kbcheck_core::{KnowledgeStore, RemoteAnalysisClient};
use kbcheck_inference::GeminiClient;
use kbcheck_jobs::LifecycleConfig;

const DEFAULT_LOG_FILTER: &str =
    "kbcheck_api=debug,kbcheck_jobs=debug,kbcheck_inference=info,tower_http=debug";

/// Set up the subscriber from `LOG_FORMAT` (json|text), `LOG_FILE` (daily
/// rolling file instead of stdout), `LOG_ANSI` and `RUST_LOG`.
///
/// The returned guard must live until shutdown or buffered file output is lost.
fn init_tracing() -> Option<WorkerGuard> {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json");
    let log_file = std::env::var("LOG_FILE").ok();
    let ansi_override = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (writer, guard) = match log_file.as_deref().map(Path::new) {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .and_then(|f| f.to_str())
                .unwrap_or("kbcheck-api.log");
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name));
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };

    // Log files stay free of escape codes unless LOG_ANSI asks for them.
    let ansi = ansi_override.unwrap_or(guard.is_none());
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi);
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(layer.json()).init();
    } else {
        registry.with(layer).init();
    }

    info!(
        json,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );
    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let _log_guard = init_tracing();

    let server = ServerConfig::from_env();
    let knowledge = KnowledgeStore::from_env();
    let lifecycle = LifecycleConfig::from_env();
    let include_history = std::env::var(ENV_CHAT_INCLUDE_HISTORY)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    let services = match GeminiClient::from_env() {
        Ok(client) => {
            let client: Arc<dyn RemoteAnalysisClient> = Arc::new(client);
            Some(AnalysisServices::new(
                client,
                knowledge.clone(),
                lifecycle.clone(),
                include_history,
            ))
        }
        Err(e) => {
            warn!(error = %e, "Analysis service not configured; check, chat and models will return 503");
            None
        }
    };

    let gate = AccessGate::from_env();
    if !gate.is_configured() {
        warn!("ACCESS_PASSPHRASE not set; every gated request will be denied");
    }

    info!(
        knowledge_path = %knowledge.path().display(),
        poll_interval_secs = lifecycle.poll_interval.as_secs(),
        max_poll_attempts = lifecycle.max_poll_attempts,
        quota_backoff_secs = lifecycle.quota_backoff.as_secs(),
        include_history,
        max_upload_bytes = server.max_upload_bytes,
        session_idle_ttl_secs = server.session_idle_ttl.as_secs(),
        "Configuration loaded"
    );

    let state = AppState::new(services, gate)
        .with_max_upload_bytes(server.max_upload_bytes)
        .with_session_idle_ttl(server.session_idle_ttl);

    // Periodic sweep; get_or_create also sweeps on every session lookup.
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sessions.idle_ttl());
        loop {
            ticker.tick().await;
            sessions.evict_idle().await;
        }
    });

    let app = create_router(state);

    let addr: SocketAddr = server.bind_addr().parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
