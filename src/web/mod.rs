//! Web server module.

mod handlers;

use crate::config::ServerConfig;
use crate::scheduler::{Clock, RefreshTrigger, SharedDashboard};
use crate::telemetry::DeriveOptions;

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub options: Arc<DeriveOptions>,
    pub dashboard: SharedDashboard,
    pub trigger: RefreshTrigger,
    pub clock: Arc<dyn Clock>,
}

/// Web server for WaterMonitor.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes.
    fn routes(&self) -> Router {
        let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

        Router::new()
            .route("/api/dashboard", get(handlers::handle_dashboard))
            .route("/api/sensors", get(handlers::handle_get_sensors))
            .route("/api/sensors/{id}", get(handlers::handle_get_sensor))
            .route("/api/gateway", get(handlers::handle_get_gateway))
            .route("/api/logs", get(handlers::handle_get_logs))
            .route("/api/refresh", post(handlers::handle_refresh))
            .route(
                "/api/selection",
                get(handlers::handle_get_selection)
                    .put(handlers::handle_put_selection)
                    .delete(handlers::handle_delete_selection),
            )
            .route("/healthz", get(handlers::handle_health))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let router = self.routes();

        tracing::info!("Web server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
