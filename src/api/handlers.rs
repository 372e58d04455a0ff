use std::sync::Arc;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use tower_http::services::ServeFile;
use log::error;

use crate::store::{LeaderboardEntry, RankedStore};
use crate::websocket::handler::WEBSOCKET_PATH;
use crate::websocket::SubscriberRegistry;

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn RankedStore>,
    pub registry: SubscriberRegistry,
    pub websocket_port: u16,
}

// GET /leaderboard - All symbols, highest percent change first
pub async fn get_leaderboard(
    State(state): State<ApiState>,
) -> Result<Json<Vec<LeaderboardEntry>>, (StatusCode, Json<serde_json::Value>)> {
    match state.store.read_all_descending().await {
        Ok(entries) => Ok(Json(entries)),
        Err(e) => {
            error!("Failed to read leaderboard: {}", e);
            Err((StatusCode::BAD_GATEWAY, Json(serde_json::json!({
                "error": e.to_string()
            }))))
        }
    }
}

// GET /api/health - Health check endpoint
pub async fn health_check(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "stock_leaderboard",
        "timestamp": chrono::Utc::now(),
        "subscribers": state.registry.len().await,
        "websocket_port": state.websocket_port,
        "websocket_path": WEBSOCKET_PATH,
    }))
}

// Create the API router
pub fn create_api_router(state: ApiState, index_file: &str) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check));

    Router::new()
        .route_service("/", ServeFile::new(index_file))
        .route("/leaderboard", get(get_leaderboard))
        .nest("/api", api_routes)
        .with_state(state)
}
