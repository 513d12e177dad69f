//! Telemetry gateway - ingests UDP telemetry and routes it to WebSocket viewers
//!
//! Receives JSON packet envelopes from the local receiver daemons over UDP,
//! keeps the latest known state per telemetry source, pushes named events to
//! every connected WebSocket viewer and answers snapshot queries over HTTP.

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod broadcaster;
mod config;
mod ingest;
mod link_state;
mod telemetry;
mod udp_listener;
mod ws_handler;

use broadcaster::EventBroadcaster;
use config::Config;
use link_state::LinkStateStore;
use telemetry::ReceivedPacket;

/// Capacity of the listener-to-ingest packet channel
const PACKET_CHANNEL_CAPACITY: usize = 1000;

/// Capacity of the viewer broadcast ring; lagging viewers drop oldest frames
const BROADCAST_CAPACITY: usize = 1000;

/// Shared application state
pub struct AppState {
    pub store: Arc<LinkStateStore>,
    pub broadcaster: EventBroadcaster,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("telemetry_gateway=info".parse().unwrap())
                .add_directive("tower_http=info".parse().unwrap()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("===========================================");
    info!("   Telemetry Gateway");
    info!("===========================================");

    let config = Config::from_env();
    info!("Configuration:");
    info!("  UDP telemetry port: {}", config.udp_port);
    info!("  HTTP/WS port: {}", config.http_port);
    info!("  Static files: {}", config.static_dir);

    let store = Arc::new(LinkStateStore::new());
    let broadcaster = EventBroadcaster::new(BROADCAST_CAPACITY);

    // Channel between the UDP listener and the ingest driver
    let (packet_tx, packet_rx) = mpsc::channel::<ReceivedPacket>(PACKET_CHANNEL_CAPACITY);

    // Start the UDP listener
    let udp_port = config.udp_port;
    let udp_task = tokio::spawn(async move {
        if let Err(e) = udp_listener::run(udp_port, packet_tx).await {
            error!("UDP listener failed: {}", e);
        }
    });

    // Start the ingest driver
    let ingest_task = tokio::spawn(ingest::run(
        packet_rx,
        store.clone(),
        broadcaster.clone(),
    ));

    // Create shared app state
    let app_state = Arc::new(AppState { store, broadcaster });

    // Build HTTP/WebSocket router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        // WebSocket endpoint
        .route("/ws", get(ws_handler::ws_handler))
        // Snapshot queries
        .route("/current_lora", get(get_link_state))
        .route("/current_ozimux", get(get_position_sources))
        .route("/health", get(health_check))
        // Static console assets
        .nest_service("/", ServeDir::new(&config.static_dir))
        .layer(cors)
        .with_state(app_state);

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    info!("Starting HTTP/WebSocket server on {}", http_addr);

    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    let http_server = axum::serve(listener, app);

    tokio::select! {
        result = http_server => {
            if let Err(e) = result {
                error!("HTTP server error: {}", e);
            }
        }
        _ = udp_task => {
            error!("UDP listener task ended");
        }
        _ = ingest_task => {
            error!("Ingest task ended");
        }
    }

    Ok(())
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Current aggregate link state
async fn get_link_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.snapshot_link_state())
}

/// Current external position sources
async fn get_position_sources(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.snapshot_position_sources())
}
