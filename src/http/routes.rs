//! HTTP route definitions

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
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::app::AppState;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/rooms", get(rooms_handler))
        .route("/rooms/:code", get(room_handler))
        .route("/ws", get(ws_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.client_origin))
        .with_state(state)
}

/// CORS from CLIENT_ORIGIN: comma-separated origins, or `*` for any
fn cors_layer(client_origin: &str) -> CorsLayer {
    let origin = if client_origin.trim() == "*" {
        AllowOrigin::any()
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
    active_rooms: usize,
    open_rooms: usize,
    active_players: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_rooms: state.rooms.active_rooms(),
        open_rooms: state.rooms.open_rooms(),
        active_players: state.rooms.total_players(),
    })
}

// ============================================================================
// Room lookup
// ============================================================================

#[derive(Serialize)]
struct RoomSummary {
    code: String,
    players: usize,
    open: bool,
}

#[derive(Serialize)]
struct RoomsResponse {
    rooms: Vec<RoomSummary>,
    max_players: usize,
}

async fn rooms_handler(State(state): State<AppState>) -> Json<RoomsResponse> {
    let mut rooms: Vec<RoomSummary> = state
        .rooms
        .handles()
        .into_iter()
        .map(|h| RoomSummary {
            players: h.player_count(),
            open: h.is_open(),
            code: h.code,
        })
        .collect();
    rooms.sort_by(|a, b| a.code.cmp(&b.code));

    Json(RoomsResponse {
        rooms,
        max_players: state.config.game.max_players,
    })
}

async fn room_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<RoomSummary>, AppError> {
    let handle = state
        .rooms
        .get(&code.to_ascii_uppercase())
        .ok_or_else(|| AppError::NotFound(format!("room {}", code)))?;

    Ok(Json(RoomSummary {
        players: handle.player_count(),
        open: handle.is_open(),
        code: handle.code,
    }))
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
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
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

    use crate::config::{Config, GameSettings};

    fn state() -> AppState {
        AppState::new(Config {
            server_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "info".to_string(),
            log_json: false,
            client_origin: "*".to_string(),
            game: GameSettings::default(),
        })
        .unwrap()
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
    async fn test_health_reports_ok() {
        let (status, body) = get_json(build_router(state()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["active_rooms"], 0);
    }

    #[tokio::test]
    async fn test_rooms_lists_live_rooms() {
        let state = state();
        let room = state.rooms.create_room();
        let (status, body) = get_json(build_router(state.clone()), "/rooms").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rooms"][0]["code"], room.code.as_str());
        assert_eq!(body["max_players"], 4);

        let uri = format!("/rooms/{}", room.code.to_ascii_lowercase());
        let (status, body) = get_json(build_router(state), &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["open"], true);
    }

    #[tokio::test]
    async fn test_unknown_room_is_404() {
        let (status, body) = get_json(build_router(state()), "/rooms/NOPE1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("NOPE1"));
    }
}
