mod api;
mod config;
mod errors;
mod pipeline;
mod quotes;
mod store;
mod websocket;

use std::time::Duration;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::time::interval;
use log::{info, error};
use tower_http::cors::CorsLayer;

use crate::config::{Config, PROVIDER_BASE_URL, STATS_INTERVAL_SECS, UPDATE_CHANNEL_SIZE};
use crate::pipeline::{update_channel, Broadcaster, Poller};
use crate::quotes::AlphaVantageClient;
use crate::store::{RankedStore, RedisRankedStore};
use crate::websocket::{SubscriberRegistry, WebSocketHandler};
use crate::api::{ApiState, create_api_router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    config.log_config();

    // No provider key, no listeners
    let provider_key = match config.validate() {
        Ok(key) => key,
        Err(e) => {
            error!("Configuration validation failed: {}", e);
            return Err(e.into());
        }
    };

    let quote_client = Arc::new(AlphaVantageClient::new(
        PROVIDER_BASE_URL,
        provider_key,
        config.fetch_timeout,
    )?);
    let store: Arc<dyn RankedStore> = Arc::new(RedisRankedStore::new(
        &config.redis_url,
        &config.leaderboard_key,
    )?);
    let registry = SubscriberRegistry::new();
    let (update_tx, update_rx) = update_channel(UPDATE_CHANNEL_SIZE);

    // Start background tasks
    Broadcaster::new(update_rx, registry.clone()).start();
    Poller::new(
        quote_client,
        store.clone(),
        update_tx,
        config.symbols.clone(),
        config.poll_interval,
    ).start();
    start_stats_task(registry.clone());

    // Bound first so the API can report the actual WebSocket port
    let ws_listener = TcpListener::bind(&config.bind_address).await?;
    let websocket_port = ws_listener.local_addr()?.port();
    info!("WebSocket server running at ws://{}{}", config.bind_address, websocket::handler::WEBSOCKET_PATH);

    // Start API server
    let api_state = ApiState {
        store: store.clone(),
        registry: registry.clone(),
        websocket_port,
    };

    let api_router = create_api_router(api_state, &config.index_file)
        .layer(CorsLayer::permissive());

    let api_listener = TcpListener::bind(&config.api_bind_address).await?;
    info!("HTTP API server running at http://{}", config.api_bind_address);

    let api_server = axum::serve(api_listener, api_router);

    // Start WebSocket server
    let websocket_server = async move {
        while let Ok((stream, addr)) = ws_listener.accept().await {
            let handler = WebSocketHandler::new(registry.clone(), addr.to_string());
            tokio::spawn(handler.handle_connection(stream));
        }
    };

    tokio::select! {
        result = api_server => {
            error!("API server stopped: {:?}", result);
        }
        _ = websocket_server => {
            error!("WebSocket server stopped");
        }
    }

    Ok(())
}

fn start_stats_task(registry: SubscriberRegistry) {
    tokio::spawn(async move {
        let mut interval_timer = interval(Duration::from_secs(STATS_INTERVAL_SECS));

        loop {
            interval_timer.tick().await;
            let count = registry.len().await;
            if count > 0 {
                info!("Stats - Subscribers: {}", count);
            }
        }
    });
}
