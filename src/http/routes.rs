//! HTTP route definitions

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::app::AppState;
use crate::game::arbiter::MoveRequest;
use crate::game::grid::BoardSnapshot;
use crate::game::{GameError, MatchPhase, Projectile, Tank};
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let origin = state.config.client_origin.trim();
    let cors = if origin == "*" {
        CorsLayer::new().allow_origin(Any)
    } else {
        // Comma-separated list of exact origins
        let allowed_origins: Vec<header::HeaderValue> = origin
            .split(',')
            .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(allowed_origins)
            .allow_credentials(true)
    };
    let cors = cors
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let api_routes = Router::new()
        .route("/tanks", get(tanks_handler))
        .route("/tanks/login", post(login_handler))
        .route("/tanks/:id", get(tank_handler))
        .route("/tanks/:id/move", put(move_handler))
        .route("/tanks/:id/shoot", post(shoot_handler))
        .route("/board", get(board_handler))
        .route("/projectiles/:id", get(projectile_handler))
        .route("/reset", post(reset_handler));

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .nest("/api", api_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    tanks: usize,
    capacity: usize,
    open_spawns: usize,
    live_projectiles: usize,
    phase: MatchPhase,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        tanks: state.arena.tank_count(),
        capacity: state.arena.capacity(),
        open_spawns: state.arena.open_spawns(),
        live_projectiles: state.arena.live_projectiles(),
        phase: state.arena.phase(),
    })
}

// ============================================================================
// Tank endpoints
// ============================================================================

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    proof: String,
}

async fn login_handler(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<(StatusCode, Json<Tank>), AppError> {
    let tank = state.arena.join(&req.username, &req.proof)?;
    Ok((StatusCode::CREATED, Json(tank)))
}

async fn tanks_handler(State(state): State<AppState>) -> Json<Vec<Tank>> {
    Json(state.arena.tanks())
}

async fn tank_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Tank>, AppError> {
    Ok(Json(state.arena.tank(&id)?))
}

async fn move_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<Tank>, AppError> {
    Ok(Json(state.arena.move_tank(&id, req)?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShootRequest {
    #[serde(alias = "bulletId")]
    shot_id: String,
}

async fn shoot_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ShootRequest>,
) -> Result<(StatusCode, Json<Projectile>), AppError> {
    let projectile = state.arena.fire(&id, &req.shot_id)?;
    Ok((StatusCode::CREATED, Json(projectile)))
}

// ============================================================================
// Board and projectile queries
// ============================================================================

async fn board_handler(State(state): State<AppState>) -> Json<BoardSnapshot> {
    Json(state.arena.board())
}

async fn projectile_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Projectile>, AppError> {
    Ok(Json(state.arena.projectile(&id)?))
}

// ============================================================================
// Match control
// ============================================================================

#[derive(Serialize)]
struct ResetResponse {
    status: &'static str,
}

async fn reset_handler(State(state): State<AppState>) -> Json<ResetResponse> {
    info!("Match reset requested over HTTP");
    state.arena.reset();
    Json(ResetResponse { status: "ok" })
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Game(#[from] GameError),
}

/// HTTP status for each engine failure
pub fn game_error_status(err: &GameError) -> StatusCode {
    match err {
        GameError::InvalidProof => StatusCode::UNAUTHORIZED,
        GameError::TankNotFound(_) | GameError::ProjectileNotFound(_) => StatusCode::NOT_FOUND,
        GameError::InvalidIdentifier(_)
        | GameError::OutOfBounds { .. }
        | GameError::InvalidHeading(_) => StatusCode::BAD_REQUEST,
        GameError::RoomFull
        | GameError::TankExists(_)
        | GameError::NoSpawnAvailable
        | GameError::MatchResolved
        | GameError::StalePosition
        | GameError::Occupied { .. }
        | GameError::ProjectileExists(_)
        | GameError::SameCell => StatusCode::CONFLICT,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match &self {
            AppError::Game(err) => (game_error_status(err), err.code(), err.to_string()),
        };

        let body = serde_json::json!({
            "error": message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::admission::HmacGate;
    use crate::config::Config;

    const SECRET: &str = "test_secret";

    fn test_router() -> Router {
        let config = Config {
            server_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "info".into(),
            admission_secret: SECRET.into(),
            client_origin: "*".into(),
            projectile_tick: Duration::from_millis(500),
            allow_join_after_victory: true,
        };
        build_router(AppState::new(config))
    }

    async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn login(router: &Router, username: &str) -> (StatusCode, Value) {
        let proof = HmacGate::new(SECRET).sign(username);
        send(
            router,
            Method::POST,
            "/api/tanks/login",
            Some(json!({ "username": username, "proof": proof })),
        )
        .await
    }

    #[tokio::test]
    async fn test_health() {
        let router = test_router();
        let (status, body) = send(&router, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["tanks"], 0);
        assert_eq!(body["capacity"], 3);
        assert_eq!(body["open_spawns"], 4);
        assert_eq!(body["phase"], "active");
    }

    #[tokio::test]
    async fn test_login_places_tank() {
        let router = test_router();
        let (status, tank) = login(&router, "Alice").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(tank["id"], "Alice");
        assert_eq!((tank["x"].as_i64(), tank["y"].as_i64()), (Some(1), Some(8)));
        assert_eq!(tank["color"], "#fa0a0a");
        assert_eq!(tank["rotation"], 0);

        let (status, board) = send(&router, Method::GET, "/api/board", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(board[8][1], "Alice");
        assert_eq!(board[0][0], "1");
    }

    #[tokio::test]
    async fn test_login_with_bad_proof_is_unauthorized() {
        let router = test_router();
        let (status, body) = send(
            &router,
            Method::POST,
            "/api/tanks/login",
            Some(json!({ "username": "Alice", "proof": "deadbeef" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "invalid_proof");

        let (_, tanks) = send(&router, Method::GET, "/api/tanks", None).await;
        assert_eq!(tanks, json!([]));
    }

    #[tokio::test]
    async fn test_fourth_login_conflicts() {
        let router = test_router();
        for name in ["Alice", "Bob", "Carol"] {
            assert_eq!(login(&router, name).await.0, StatusCode::CREATED);
        }
        let (status, body) = login(&router, "Dave").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "room_full");
    }

    #[tokio::test]
    async fn test_move_then_stale_move() {
        let router = test_router();
        login(&router, "Alice").await;

        let request = json!({ "fromX": 1, "fromY": 8, "toX": 2, "toY": 8, "newHeading": 0 });
        let (status, tank) = send(&router, Method::PUT, "/api/tanks/Alice/move", Some(request.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tank["x"], 2);

        let (status, body) = send(&router, Method::PUT, "/api/tanks/Alice/move", Some(request)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "stale_position");
    }

    #[tokio::test]
    async fn test_move_out_of_bounds_is_bad_request() {
        let router = test_router();
        login(&router, "Alice").await;

        let request = json!({ "fromX": 1, "fromY": 8, "toX": 1, "toY": 42, "newHeading": 90 });
        let (status, body) = send(&router, Method::PUT, "/api/tanks/Alice/move", Some(request)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "out_of_bounds");
    }

    #[tokio::test]
    async fn test_unknown_tank_and_projectile_are_not_found() {
        let router = test_router();
        let (status, _) = send(&router, Method::GET, "/api/tanks/ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, body) = send(&router, Method::GET, "/api/projectiles/s1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "projectile_not_found");
    }

    #[tokio::test]
    async fn test_shoot_then_poll() {
        let router = test_router();
        login(&router, "Alice").await;

        let (status, shot) = send(
            &router,
            Method::POST,
            "/api/tanks/Alice/shoot",
            Some(json!({ "shotId": "s1" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(shot["ownerId"], "Alice");
        assert_eq!(shot["alive"], true);

        let (status, polled) = send(&router, Method::GET, "/api/projectiles/s1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(polled["id"], "s1");
    }

    #[tokio::test]
    async fn test_reset_clears_roster() {
        let router = test_router();
        login(&router, "Alice").await;

        let (status, body) = send(&router, Method::POST, "/api/reset", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));

        let (_, tanks) = send(&router, Method::GET, "/api/tanks", None).await;
        assert_eq!(tanks, json!([]));
        let (_, health) = send(&router, Method::GET, "/health", None).await;
        assert_eq!(health["phase"], "idle");
    }
}
