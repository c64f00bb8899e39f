use std::net::SocketAddr;

use axum::{routing::get, Router};
use sitebench_core::Workbench;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "sitebench_host=debug,sitebench_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from_env();
    let workbench = Workbench::open(config.core.clone()).await?;

    let state = AppState {
        workbench: workbench.clone(),
    };

    let app = Router::new()
        .route("/health", get(health_check))
        .nest("/projects", routes::projects::router())
        .nest("/preview", routes::preview::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // Loopback only.
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    tracing::info!("Starting preview host on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    workbench.close().await;
    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
    }
}

#[derive(Clone)]
pub struct AppState {
    pub workbench: Workbench,
}
