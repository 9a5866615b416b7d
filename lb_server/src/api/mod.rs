//! HTTP/WebSocket API for the bingo server.
//!
//! # Modules
//!
//! - [`sessions`]: session lifecycle, calling, bingo checks, and audits
//! - [`jackpot`]: jackpot record, awards, and ledger management
//! - [`websocket`]: per-tenant realtime event stream
//!
//! # Endpoints Overview
//!
//! ```text
//! GET    /health                                  - Health check
//! POST   /api/v1/sessions                         - Create session
//! GET    /api/v1/sessions?tenant_id=<uuid>        - List tenant sessions
//! GET    /api/v1/sessions/{id}                    - Session details
//! POST   /api/v1/sessions/{id}/start              - pending -> active
//! POST   /api/v1/sessions/{id}/pause              - active -> paused
//! POST   /api/v1/sessions/{id}/resume             - paused -> active
//! POST   /api/v1/sessions/{id}/finish             - terminate without winner
//! POST   /api/v1/sessions/{id}/call               - call the next number
//! POST   /api/v1/sessions/{id}/check              - bingo check for a card
//! POST   /api/v1/sessions/{id}/schedule           - schedule an auto-call
//! DELETE /api/v1/sessions/{id}/schedule           - cancel the auto-call
//! GET    /api/v1/sessions/{id}/audits             - call audit log
//! POST   /api/v1/audits/purge                     - purge expired audits
//! GET    /api/v1/jackpot/{tenant_id}              - jackpot record
//! PUT    /api/v1/jackpot/{tenant_id}/amount       - set amount and ceiling
//! POST   /api/v1/jackpot/{tenant_id}/toggle       - enable/disable
//! POST   /api/v1/jackpot/{tenant_id}/award        - award a draw
//! GET    /api/v1/jackpot/{tenant_id}/log          - ledger entries
//! PATCH  /api/v1/jackpot/log/{entry_id}           - correct a ledger entry
//! DELETE /api/v1/jackpot/log/{entry_id}           - delete a ledger entry
//! GET    /ws/{tenant_id}                          - realtime event stream
//! ```
//!
//! CORS is configured permissively for development.

pub mod jackpot;
pub mod sessions;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

use live_bingo::engine::SessionService;
use live_bingo::game::errors::{CallRejection, GameError};
use live_bingo::jackpot::JackpotError;
use live_bingo::store::Database;

use crate::config::SessionDefaultsConfig;

/// Application state shared across all HTTP handlers and WebSocket
/// connections. Cloned per request; everything inside is shared.
#[derive(Clone)]
pub struct AppState {
    pub service: SessionService,
    pub db: Database,
    pub defaults: SessionDefaultsConfig,
}

/// Error payload returned for every non-2xx response. `remaining_forced` is
/// populated for forced-sequence call conflicts so operator consoles can
/// show what is still owed.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub tag: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remaining_forced: Vec<u8>,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn game_error(err: &GameError) -> ApiError {
    let status = match err {
        GameError::SessionNotFound(_) | GameError::CardNotFound(_) => StatusCode::NOT_FOUND,
        GameError::InvalidState { .. }
        | GameError::AlreadyCalled { .. }
        | GameError::NotInForcedSequence { .. }
        | GameError::CallInProgress(_)
        | GameError::Exhausted => StatusCode::CONFLICT,
        GameError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    let rejection = CallRejection::from(err);
    (
        status,
        Json(ErrorResponse {
            error: rejection.message,
            tag: rejection.tag,
            remaining_forced: rejection.remaining_forced,
        }),
    )
}

pub fn jackpot_error(err: &JackpotError) -> ApiError {
    let (status, tag) = match err {
        JackpotError::RecordNotFound(_) => (StatusCode::NOT_FOUND, "record_not_found"),
        JackpotError::EntryNotFound(_) => (StatusCode::NOT_FOUND, "entry_not_found"),
        JackpotError::ConstraintViolation { .. } => {
            (StatusCode::CONFLICT, "constraint_violation")
        }
        JackpotError::Disabled(_) => (StatusCode::CONFLICT, "disabled"),
        JackpotError::CashierEntryImmutable(_) => {
            (StatusCode::FORBIDDEN, "cashier_entry_immutable")
        }
        JackpotError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "invalid_amount"),
        JackpotError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage"),
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            tag: tag.to_string(),
            remaining_forced: Vec::new(),
        }),
    )
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router();

    let root_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ws/{tenant_id}", get(websocket::websocket_handler));

    Router::new()
        .merge(root_routes)
        .nest("/api/v1", v1_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(sessions::create_session))
        .route("/sessions", get(sessions::list_sessions))
        .route("/sessions/{session_id}", get(sessions::get_session))
        .route("/sessions/{session_id}/start", post(sessions::start_session))
        .route("/sessions/{session_id}/pause", post(sessions::pause_session))
        .route("/sessions/{session_id}/resume", post(sessions::resume_session))
        .route("/sessions/{session_id}/finish", post(sessions::finish_session))
        .route("/sessions/{session_id}/call", post(sessions::call_number))
        .route("/sessions/{session_id}/check", post(sessions::check_bingo))
        .route("/sessions/{session_id}/schedule", post(sessions::schedule_call))
        .route(
            "/sessions/{session_id}/schedule",
            delete(sessions::cancel_scheduled_call),
        )
        .route("/sessions/{session_id}/audits", get(sessions::list_audits))
        .route("/audits/purge", post(sessions::purge_audits))
        .route("/jackpot/{tenant_id}", get(jackpot::get_record))
        .route("/jackpot/{tenant_id}/amount", put(jackpot::set_amount))
        .route("/jackpot/{tenant_id}/toggle", post(jackpot::toggle))
        .route("/jackpot/{tenant_id}/award", post(jackpot::award))
        .route("/jackpot/{tenant_id}/log", get(jackpot::list_log))
        .route("/jackpot/log/{entry_id}", axum::routing::patch(jackpot::correct_log))
        .route("/jackpot/log/{entry_id}", delete(jackpot::delete_log))
}

#[cfg(test)]
mod tests {
    use super::*;
    use live_bingo::game::entities::GameStatus;
    use uuid::Uuid;

    #[test]
    fn missing_resources_map_to_not_found() {
        let (status, _) = game_error(&GameError::SessionNotFound(Uuid::new_v4()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = game_error(&GameError::CardNotFound(42));
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn call_conflicts_map_to_conflict_and_keep_the_forced_snapshot() {
        let err = GameError::NotInForcedSequence {
            number: 33,
            remaining_forced: vec![5, 12, 40],
        };
        let (status, Json(body)) = game_error(&err);
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.tag, "not_in_forced_sequence");
        assert_eq!(body.remaining_forced, vec![5, 12, 40]);
    }

    #[test]
    fn invalid_state_is_a_conflict() {
        let err = GameError::InvalidState {
            status: GameStatus::Paused,
            required: "active",
        };
        let (status, _) = game_error(&err);
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[test]
    fn immutable_ledger_entries_are_forbidden() {
        let (status, Json(body)) =
            jackpot_error(&JackpotError::CashierEntryImmutable(Uuid::new_v4()));
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.tag, "cashier_entry_immutable");
    }
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the database answers, `503` otherwise.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = state.db.health_check().await.is_ok();

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
