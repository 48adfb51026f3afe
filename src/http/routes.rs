//! HTTP route definitions

use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::matchmaking::status::LobbyEntry;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;
use crate::ws::protocol::MatchResult;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/lobby", get(lobby_handler))
        .route("/lobby/:player_id", get(lobby_player_handler))
        .route("/matches/recent", get(recent_matches_handler))
        .route("/ws", get(ws_handler))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.client_origin))
        .with_state(state)
}

/// CORS from CLIENT_ORIGIN: `*` or a comma-separated origin list
fn cors_layer(client_origin: &str) -> CorsLayer {
    let origin = if client_origin.trim() == "*" {
        AllowOrigin::from(Any)
    } else {
        let allowed: Vec<HeaderValue> = client_origin
            .split(',')
            .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
            .collect();
        AllowOrigin::list(allowed)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_matches: usize,
    active_players: usize,
    connected_players: usize,
    queue_size: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let queue_size = state.matchmaking.queue_size().await;

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_matches: state.match_registry.active_matches(),
        active_players: state.match_registry.total_players(),
        connected_players: state.matchmaking.connected_players(),
        queue_size,
    })
}

// ============================================================================
// Lobby endpoints
// ============================================================================

async fn lobby_handler(State(state): State<AppState>) -> Json<Vec<LobbyEntry>> {
    Json(state.lobby.entries())
}

async fn lobby_player_handler(
    State(state): State<AppState>,
    Path(player_id): Path<Uuid>,
) -> Result<Json<LobbyEntry>, AppError> {
    let status = state
        .lobby
        .status(&player_id)
        .ok_or_else(|| AppError::NotFound(format!("player {player_id}")))?;

    Ok(Json(LobbyEntry { player_id, status }))
}

async fn recent_matches_handler(State(state): State<AppState>) -> Json<Vec<MatchResult>> {
    Json(state.lobby.recent_results())
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        };

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::game::PlayerStatusSink;
    use crate::ws::protocol::PlayerStatus;

    fn app() -> (AppState, Router) {
        let config = Config::from_lookup(|_| None).unwrap();
        let state = AppState::new(config);
        let router = build_router(state.clone());
        (state, router)
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_counts() {
        let (_, router) = app();
        let (status, body) = get_json(router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["active_matches"], 0);
        assert_eq!(body["queue_size"], 0);
    }

    #[tokio::test]
    async fn lobby_lookup_uses_display_status() {
        let (state, router) = app();
        let id = Uuid::new_v4();
        state.lobby.set_player_status(id, PlayerStatus::InQueue);

        let (status, body) = get_json(router.clone(), &format!("/lobby/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "In Queue");

        let (status, body) = get_json(router, &format!("/lobby/{}", Uuid::new_v4())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().starts_with("Not found"));
    }

    #[tokio::test]
    async fn recent_matches_start_empty() {
        let (_, router) = app();
        let (status, body) = get_json(router, "/matches/recent").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }
}
