// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use anyhow::Context;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::surface_service::SurfaceService;
use crate::infrastructure::config::load_dashboard_config;
use crate::infrastructure::http_repository::HttpTelemetryRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    close_surface, health_check, open_surface, surface_events, update_selection, update_window,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_dashboard_config().context("failed to load dashboard configuration")?;

    // Create repository (infrastructure layer)
    let repository = Arc::new(HttpTelemetryRepository::new(
        config.api.base_url.clone(),
        config.api.token.clone(),
    ));

    // Create services (application layer)
    let surface_service = SurfaceService::new(repository, config.surface_configs());

    let state = Arc::new(AppState {
        surface_service: surface_service.clone(),
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/surfaces", post(open_surface))
        .route("/surfaces/:id", delete(close_surface))
        .route("/surfaces/:id/events", get(surface_events))
        .route("/surfaces/:id/selection", put(update_selection))
        .route("/surfaces/:id/window", put(update_window))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind))?;
    tracing::info!(%addr, store = %config.api.base_url, "starting electric dashboard service");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    surface_service.close_all().await;
    tracing::info!("all surfaces closed");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
