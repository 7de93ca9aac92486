//! docbridge - Paperless webhook bridge for Ollama field extraction

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docbridge_api::{router, AppConfig, AppState};
use docbridge_core::{DocumentStore, ExtractionBackend};
use docbridge_inference::OllamaBackend;
use docbridge_jobs::{EntryProcessor, ProcessingConfig, ProcessingQueue, QueueWorker};
use docbridge_store::{MetadataCache, PaperlessClient, TagResolver};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: derived from LOG_LEVEL)
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let level = config.log_level.as_filter();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("{level},tower_http={level}").into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("docbridge.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        log_level = level,
        "Logging initialized"
    );

    // Paperless
    let paperless = Arc::new(PaperlessClient::new(
        &config.paperless_base_url,
        &config.auth_token,
    )?);
    match paperless.test_connection().await {
        Ok(()) => info!(base_url = %paperless.base_url(), "Connected to Paperless"),
        Err(e) => warn!(
            base_url = %paperless.base_url(),
            error = %e,
            "Paperless is not reachable, continuing anyway"
        ),
    }
    let store: Arc<dyn DocumentStore> = paperless;
    let cache = MetadataCache::with_ttl_minutes(store.clone(), config.cache_time_minutes);

    // Ollama
    let backend = Arc::new(OllamaBackend::with_timeout(
        &config.ollama_host,
        &config.ollama_model,
        config.ollama_timeout_secs,
    )?);
    match backend.self_check().await {
        Ok(true) => info!(model = %config.ollama_model, "Ollama model ready"),
        Ok(false) => {
            error!(model = %config.ollama_model, "Ollama model could not be pulled");
            anyhow::bail!("Ollama model '{}' is not available", config.ollama_model);
        }
        Err(e) => {
            error!(model = %config.ollama_model, error = %e, "Ollama self-check failed");
            return Err(e.into());
        }
    }

    // Worker
    let (queue, receiver) = ProcessingQueue::channel();
    let processor = EntryProcessor::new(
        store.clone(),
        backend,
        TagResolver::new(store.clone(), cache.clone()),
        ProcessingConfig::new(&config.processing_tag, &config.error_tag),
    );
    let worker = QueueWorker::new(receiver, processor).start();

    // Start server
    let addr = config.listen_addr()?;
    let debug_enabled = config.debug;
    // Room for the entry in flight to finish its inference call
    let worker_grace = Duration::from_secs(config.ollama_timeout_secs.saturating_mul(2));
    let state = AppState::new(config, store, cache, queue);
    let app = router(state);

    info!(debug_endpoint = debug_enabled, "Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("HTTP server stopped, waiting for queue worker");
    match tokio::time::timeout(worker_grace, worker.shutdown()).await {
        Ok(result) => result?,
        Err(_) => warn!("Queue worker did not stop in time"),
    }

    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
