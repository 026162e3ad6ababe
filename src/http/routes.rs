//! HTTP route definitions

use std::sync::atomic::Ordering;

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, patch},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::app::AppState;
use crate::game::session::SessionError;
use crate::game::store::{
    Coordinate, GameSession, GameZone, JoinOutcome, NewPlayer, Player, Role, StoreError,
    CURRENT_SESSION_ID,
};
use crate::game::wheel::WheelError;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let cors = if state.config.client_origin.trim() == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        let allowed_origins: Vec<header::HeaderValue> = state
            .config
            .client_origin
            .split(',')
            .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(allowed_origins)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .route("/", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/players", get(list_players_handler).post(create_player_handler))
        .route("/players/active", get(list_active_players_handler))
        .route("/players/:id/position", patch(update_position_handler))
        .route("/players/:id/role", patch(update_role_handler))
        .route("/players/:id/color", patch(update_color_handler))
        .route("/players/:id/disconnect", patch(disconnect_handler))
        .route("/zones", get(list_zones_handler).post(create_zone_handler))
        .route("/session", get(get_session_handler))
        .route("/session/:id", patch(update_session_handler))
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
    total_players: usize,
    active_players: usize,
    zones: usize,
    game_running: bool,
    connected_viewers: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let players = state.store.get_players();
    let active = players.iter().filter(|p| p.is_active).count();

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        total_players: players.len(),
        active_players: active,
        zones: state.store.get_game_zones().len(),
        game_running: state
            .store
            .get_game_session(CURRENT_SESSION_ID)
            .map(|s| s.is_running)
            .unwrap_or(false),
        connected_viewers: state.viewers.load(Ordering::Relaxed),
    })
}

// ============================================================================
// Player endpoints
// ============================================================================

const USERNAME_MIN: usize = 4;
const USERNAME_MAX: usize = 16;

/// Join request body. Fields are optional so malformed payloads surface as
/// 400s with a message instead of the framework's rejection.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePlayerRequest {
    username: Option<String>,
    role: Option<String>,
    latitude: Option<String>,
    longitude: Option<String>,
    is_active: Option<bool>,
}

async fn list_players_handler(State(state): State<AppState>) -> Json<Vec<Player>> {
    Json(state.store.get_players())
}

async fn list_active_players_handler(State(state): State<AppState>) -> Json<Vec<Player>> {
    Json(state.store.get_active_players())
}

async fn create_player_handler(
    State(state): State<AppState>,
    Json(req): Json<CreatePlayerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let username = req
        .username
        .ok_or_else(|| AppError::Validation("username is required".to_string()))?;

    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(AppError::Validation(format!(
            "username must be {} to {} characters",
            USERNAME_MIN, USERNAME_MAX
        )));
    }

    let role = match req.role.as_deref() {
        None => Role::default(),
        Some(label) => Role::from_label(label)
            .ok_or_else(|| AppError::Validation(r#"Role must be "cat" or "mouse""#.to_string()))?,
    };

    let (latitude, longitude) = match (req.latitude, req.longitude) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => {
            return Err(AppError::Validation(
                "Latitude and longitude are required".to_string(),
            ))
        }
    };

    let outcome = state.store.create_player(NewPlayer {
        username,
        role,
        latitude,
        longitude,
        is_active: req.is_active.unwrap_or(true),
    })?;

    Ok(match outcome {
        JoinOutcome::Created(player) => (StatusCode::CREATED, Json(player)),
        JoinOutcome::Rejoined(player) => (StatusCode::OK, Json(player)),
    })
}

#[derive(Deserialize)]
struct PositionRequest {
    latitude: Option<String>,
    longitude: Option<String>,
}

async fn update_position_handler(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(req): Json<PositionRequest>,
) -> Result<Json<Player>, AppError> {
    let (latitude, longitude) = match (req.latitude, req.longitude) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => {
            return Err(AppError::Validation(
                "Latitude and longitude are required".to_string(),
            ))
        }
    };

    let player = state.store.update_player_position(id, &latitude, &longitude)?;
    Ok(Json(player))
}

#[derive(Deserialize)]
struct RoleRequest {
    role: Option<String>,
}

async fn update_role_handler(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(req): Json<RoleRequest>,
) -> Result<Json<Player>, AppError> {
    // The enum is validated here; the store only ever sees a valid role
    let role = req
        .role
        .as_deref()
        .and_then(Role::from_label)
        .ok_or_else(|| AppError::Validation(r#"Role must be "cat" or "mouse""#.to_string()))?;

    let player = state.store.update_player_role(id, role)?;
    Ok(Json(player))
}

#[derive(Deserialize)]
struct ColorRequest {
    color: Option<String>,
}

async fn update_color_handler(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(req): Json<ColorRequest>,
) -> Result<Json<Player>, AppError> {
    let color = req
        .color
        .ok_or_else(|| AppError::Validation("Color is required".to_string()))?;

    let player = state.store.update_player_color(id, &color)?;
    Ok(Json(player))
}

async fn disconnect_handler(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Player>, AppError> {
    let player = state.store.deactivate_player(id)?;
    Ok(Json(player))
}

// ============================================================================
// Zone endpoints
// ============================================================================

#[derive(Deserialize)]
struct CreateZoneRequest {
    name: Option<String>,
    /// JSON text of an ordered coordinate list, stored verbatim
    coordinates: Option<String>,
}

async fn list_zones_handler(State(state): State<AppState>) -> Json<Vec<GameZone>> {
    Json(state.store.get_game_zones())
}

async fn create_zone_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateZoneRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = req
        .name
        .ok_or_else(|| AppError::Validation("name is required".to_string()))?;
    let coordinates = req
        .coordinates
        .ok_or_else(|| AppError::Validation("coordinates are required".to_string()))?;

    // Advisory schema check only: the payload must parse as a coordinate
    // list, but polygon geometry (point count, winding) is the client's
    // concern.
    serde_json::from_str::<Vec<Coordinate>>(&coordinates).map_err(|_| {
        AppError::Validation(
            "coordinates must be a JSON array of latitude/longitude pairs".to_string(),
        )
    })?;

    let zone = state.store.create_game_zone(&name, &coordinates);
    Ok((StatusCode::CREATED, Json(zone)))
}

// ============================================================================
// Session endpoints
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateSessionRequest {
    is_running: Option<bool>,
}

async fn get_session_handler(State(state): State<AppState>) -> Json<GameSession> {
    Json(state.store.get_or_create_game_session())
}

async fn update_session_handler(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(req): Json<UpdateSessionRequest>,
) -> Result<Json<GameSession>, AppError> {
    let is_running = req
        .is_running
        .ok_or_else(|| AppError::Validation("isRunning is required".to_string()))?;

    let session = state.session.set_running(id, is_running)?;
    Ok(Json(session))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UsernameTaken(_) => {
                Self::Conflict("Player with this username already exists".to_string())
            }
            StoreError::PlayerNotFound(_) => Self::NotFound("Player not found".to_string()),
            StoreError::SessionNotFound(_) => {
                Self::NotFound("Game session not found".to_string())
            }
        }
    }
}

impl From<WheelError> for AppError {
    fn from(err: WheelError) -> Self {
        match err {
            WheelError::NotEnoughPlayers => Self::Validation(err.to_string()),
            WheelError::SpinInProgress => Self::Conflict(err.to_string()),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Store(e) => e.into(),
            SessionError::Wheel(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = serde_json::json!({
            "message": message
        });

        (status, Json(body)).into_response()
    }
}
