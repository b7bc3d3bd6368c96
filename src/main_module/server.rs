//! HTTP server initialization and routing

use axum::{body::Body, http::Request, routing::get, Router};
use log::{error, info};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::core::shared::state::AppState;
use crate::forum::configure_forum_routes;
use crate::security::create_cors_layer;

use super::{health_check, health_check_simple, shutdown_signal};

/// Full application router with middleware applied.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    let cors = create_cors_layer(&app_state.config.cors_origins);

    Router::new()
        .route("/health", get(health_check_simple))
        .route("/api/health", get(health_check))
        .merge(configure_forum_routes())
        .with_state(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                    tracing::info_span!("request", method = %req.method(), path = %req.uri().path())
                }))
                .layer(cors),
        )
}

pub async fn run_axum_server(app_state: Arc<AppState>) -> std::io::Result<()> {
    let addr = app_state.config.server.bind_address();
    let app = build_router(app_state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(
                "Failed to bind to {}: {} - is another instance running?",
                addr, e
            );
            return Err(e);
        }
    };
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(std::io::Error::other)?;

    info!("Server stopped");
    Ok(())
}
