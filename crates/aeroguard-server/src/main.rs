//! AeroGuard Server - telemetry ingestion and pre-flight risk fusion

use aeroguard_core::RiskEngine;
use aeroguard_server::{api, config::Config, link, loops, state::AppState};
use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("aeroguard_server=debug".parse()?),
        )
        .init();

    tracing::info!("Starting AeroGuard Server...");

    let config = Config::from_env();
    let port = config.server_port;
    let link_addr = config.link_addr.clone();

    let rules = config.load_rules()?;
    let engine = RiskEngine::new(rules)?;
    let state = Arc::new(AppState::new(config, engine));

    // Start background tasks
    tokio::spawn(loops::staleness_loop::run_staleness_loop(state.clone()));
    if let Some(addr) = link_addr {
        let link_state = state.clone();
        tokio::spawn(async move {
            if let Err(err) = link::run_link_listener(link_state, addr).await {
                tracing::error!("Vehicle link stopped: {}", err);
            }
        });
    }

    // Build the app
    let app = api::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Run server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
