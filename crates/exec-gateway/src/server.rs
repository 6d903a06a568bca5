//! Wiring of the gateway: engine client, catalog, dispatcher, tools and HTTP routes.

use crate::catalog::RuntimeCatalog;
use crate::config::GatewayConfig;
use crate::dispatcher::ExecutionDispatcher;
use crate::engine::EngineClient;
use crate::tools::register_execution_tools;
use anyhow::Context as _;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use toolhub_tool_registry::ToolRegistry;

/// Tool server routes plus `GET /runtimes`.
pub fn router(registry: Arc<ToolRegistry>, catalog: RuntimeCatalog) -> Router {
    let runtimes = Router::new()
        .route("/runtimes", get(runtimes_summary))
        .with_state(catalog);
    toolhub_tool_registry::server::router(registry).merge(runtimes)
}

async fn runtimes_summary(State(catalog): State<RuntimeCatalog>) -> Json<Value> {
    let snapshot = catalog.snapshot();
    let languages: BTreeMap<&str, Vec<&str>> = snapshot
        .entries
        .iter()
        .map(|(lang, versions)| {
            (
                lang.as_str(),
                versions.iter().map(|v| v.version.as_str()).collect(),
            )
        })
        .collect();
    Json(json!({
        "fetchedAt": snapshot.fetched_at,
        "stale": snapshot.stale,
        "generation": snapshot.generation,
        "languages": languages,
        "aliases": snapshot.aliases,
    }))
}

/// Build every component from `config`.
///
/// # Errors
///
/// Returns an error if the engine client cannot be constructed or tool registration fails.
pub fn build(config: &GatewayConfig) -> anyhow::Result<(Router, RuntimeCatalog)> {
    let engine = EngineClient::new(config.engine_url.clone(), config.catalog.listing_timeout)
        .context("build engine client")?;
    let catalog = RuntimeCatalog::new(Arc::new(engine.clone()));
    let dispatcher = Arc::new(ExecutionDispatcher::new(
        catalog.clone(),
        engine,
        config.dispatch.clone(),
    ));

    let mut registry = ToolRegistry::new();
    register_execution_tools(&mut registry, dispatcher).context("register execution tools")?;

    Ok((router(Arc::new(registry), catalog.clone()), catalog))
}

/// Serve until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn run(config: GatewayConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let (app, catalog) = build(&config)?;
    let refresh = catalog.spawn_refresh_loop(config.catalog.refresh_interval, shutdown.clone());

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("bind {}", config.bind))?;
    tracing::info!(
        bind = %config.bind,
        engine = %crate::engine::redact_url(&config.engine_url),
        "execution gateway listening"
    );

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
        .await
        .context("serve")?;

    shutdown.cancel();
    if let Err(e) = refresh.await {
        tracing::warn!(error = %e, "refresh loop task failed");
    }
    Ok(())
}
