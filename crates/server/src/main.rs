//! ARN Assistant Server Entry Point

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use arn_assistant_config::{load_settings, Settings};
use arn_assistant_core::{NarrativeEnricher, RegulatoryDataSource};
use arn_assistant_llm::{ChatCompletionEnricher, LlmConfig};
use arn_assistant_server::{create_router, init_metrics, AppState, InMemoryDataSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Priority: env vars > config/{env}.yaml > config/default.yaml > defaults
    let env = std::env::var("ARN_ASSISTANT_ENV").ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => {
            // tracing is not initialized yet
            eprintln!(
                "Loaded configuration from files (env: {})",
                env.as_deref().unwrap_or("default")
            );
            settings
        }
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        }
    };

    init_tracing(&config);

    tracing::info!("Starting ARN Assistant Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config_path = env.as_deref().unwrap_or("default"),
        intents = config.intents.len(),
        operators = config.operators.len(),
        "Configuration loaded"
    );

    let source = load_dataset(&config)?;
    let enricher = init_enricher(&config);

    let mut state = AppState::build(config.clone(), source, enricher)
        .context("Failed to initialize assistant")?;

    if config.observability.metrics_enabled {
        let handle = init_metrics()?;
        state = state.with_metrics(handle);
        tracing::info!("Initialized Prometheus metrics at /metrics");
    }

    let session_shutdown = state.assistant.sessions().start_cleanup_task();
    let cache_shutdown = state
        .assistant
        .cache()
        .start_purge_task(Duration::from_secs(config.cache.purge_interval_seconds.max(1)));

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.server.host, config.server.port))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = session_shutdown.send(true);
    let _ = cache_shutdown.send(true);

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Load the regulatory dataset, or start empty when none is configured
fn load_dataset(config: &Settings) -> anyhow::Result<Arc<dyn RegulatoryDataSource>> {
    match &config.data.dataset_path {
        Some(path) => {
            let source = InMemoryDataSource::from_path(path)
                .with_context(|| format!("Failed to load dataset {}", path))?;
            Ok(Arc::new(source))
        }
        None => {
            tracing::warn!("No dataset configured; every data question will report missing data");
            Ok(Arc::new(InMemoryDataSource::default()))
        }
    }
}

/// Build the narrative enricher when enabled; a broken client disables it
fn init_enricher(config: &Settings) -> Option<Arc<dyn NarrativeEnricher>> {
    if !config.enrichment.enabled {
        tracing::info!("Narrative enrichment disabled");
        return None;
    }

    match ChatCompletionEnricher::new(LlmConfig::from(&config.enrichment)) {
        Ok(enricher) => {
            tracing::info!(
                endpoint = %config.enrichment.endpoint,
                model = %config.enrichment.model,
                timeout_ms = config.enrichment.timeout_ms,
                "Narrative enrichment enabled"
            );
            Some(Arc::new(enricher))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to create enrichment client; continuing without it");
            None
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("arn_assistant={},tower_http=debug", level).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
