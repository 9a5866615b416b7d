//! Session management API handlers.
//!
//! Covers the full operator surface: creating sessions, driving the
//! lifecycle, calling numbers, checking cards, scheduling auto-calls, and
//! reading the call audit log.
//!
//! Session reads deliberately omit the forced call sequence and the rig
//! target; those only surface indirectly through the `remaining_forced`
//! field of call rejections.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use live_bingo::game::calling::CallAuditRecord;
use live_bingo::game::entities::{
    CallSource, Economics, GameSession, GameStatus, MarkedGrid, PatternChoice, Winner,
};
use live_bingo::engine::CreateSession;

use super::{ApiError, AppState, game_error};
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub tenant_id: Uuid,
    pub bet_amount: Decimal,
    /// Falls back to the configured house default.
    pub house_fee_percentage: Option<Decimal>,
    /// Pattern name, e.g. `cross`, `line`, `diagonal`, `x_pattern`, `all`.
    pub pattern: String,
    pub card_ids: Vec<i64>,
    pub rig_card_id: Option<i64>,
    #[serde(default = "default_true")]
    pub jackpot_enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Session representation returned by every session endpoint.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub session_number: i64,
    pub status: GameStatus,
    pub pattern: String,
    pub economics: Economics,
    pub card_ids: Vec<i64>,
    pub called_numbers: Vec<u8>,
    pub winner: Option<Winner>,
    pub jackpot_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&GameSession> for SessionView {
    fn from(s: &GameSession) -> Self {
        Self {
            id: s.id,
            tenant_id: s.tenant_id,
            session_number: s.session_number,
            status: s.status,
            pattern: s.pattern.to_string(),
            economics: s.economics,
            card_ids: s.selected_cards.iter().map(|c| c.id).collect(),
            called_numbers: s.called_numbers.clone(),
            winner: s.winner.clone(),
            jackpot_enabled: s.jackpot_enabled,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TenantQuery {
    pub tenant_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CallRequest {
    #[serde(default = "default_operator")]
    pub operator: String,
    /// Manual number; omitted means forced-head or random selection.
    pub number: Option<u8>,
}

fn default_operator() -> String {
    "operator".to_string()
}

#[derive(Debug, Serialize)]
pub struct CallResponse {
    pub number: u8,
    pub source: CallSource,
    pub called_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub card_id: i64,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub wins: bool,
    pub completed_lines: u32,
    pub marked_grid: MarkedGrid,
    /// Name of the pattern the card was evaluated against.
    pub pattern: String,
    pub winner: Option<Winner>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jackpot_error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub delay_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PurgeRequest {
    pub retention_days: Option<i64>,
}

/// Create a new session in `pending`.
///
/// The pattern is given by name; `all` defers the concrete pattern to the
/// rig. Responds `201 Created` with the session view.
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let pattern: PatternChoice = req.pattern.parse().map_err(|e| game_error(&e))?;
    let session = state
        .service
        .create_session(CreateSession {
            tenant_id: req.tenant_id,
            bet_amount: req.bet_amount,
            house_fee_percentage: req
                .house_fee_percentage
                .unwrap_or(state.defaults.house_fee_percentage),
            pattern,
            card_ids: req.card_ids,
            rig_card_id: req.rig_card_id,
            jackpot_enabled: req.jackpot_enabled,
        })
        .await
        .map_err(|e| game_error(&e))?;
    metrics::sessions_created_total();
    Ok((StatusCode::CREATED, Json(SessionView::from(&session))))
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<TenantQuery>,
) -> Result<Json<Vec<SessionView>>, ApiError> {
    let sessions = state
        .service
        .list_sessions(query.tenant_id)
        .await
        .map_err(|e| game_error(&e))?;
    Ok(Json(sessions.iter().map(SessionView::from).collect()))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let session = state
        .service
        .get_session(session_id)
        .await
        .map_err(|e| game_error(&e))?;
    Ok(Json(SessionView::from(&session)))
}

pub async fn start_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let session = state
        .service
        .start_session(session_id)
        .await
        .map_err(|e| game_error(&e))?;
    Ok(Json(SessionView::from(&session)))
}

pub async fn pause_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let session = state
        .service
        .pause_session(session_id)
        .await
        .map_err(|e| game_error(&e))?;
    Ok(Json(SessionView::from(&session)))
}

pub async fn resume_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let session = state
        .service
        .resume_session(session_id)
        .await
        .map_err(|e| game_error(&e))?;
    Ok(Json(SessionView::from(&session)))
}

pub async fn finish_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let session = state
        .service
        .finish_session(session_id)
        .await
        .map_err(|e| game_error(&e))?;
    Ok(Json(SessionView::from(&session)))
}

/// Call the next number.
///
/// With a `number` in the body the call is manual; otherwise the head of
/// the forced sequence or a uniform random draw is used. Conflicts return
/// `409` with the remaining forced numbers.
pub async fn call_number(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<CallRequest>,
) -> Result<Json<CallResponse>, ApiError> {
    match state
        .service
        .call_number(session_id, &req.operator, req.number)
        .await
    {
        Ok(outcome) => {
            metrics::calls_total(&outcome.source.to_string(), "ok");
            let session = state
                .service
                .get_session(session_id)
                .await
                .map_err(|e| game_error(&e))?;
            Ok(Json(CallResponse {
                number: outcome.number,
                source: outcome.source,
                called_count: session.called_numbers.len(),
            }))
        }
        Err(err) => {
            metrics::calls_total("none", err.tag());
            Err(game_error(&err))
        }
    }
}

/// Check a card for bingo. A winning check completes the session.
pub async fn check_bingo(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<CheckRequest>,
) -> Result<Json<CheckResponse>, ApiError> {
    let check = state
        .service
        .check_bingo(session_id, req.card_id)
        .await
        .map_err(|e| game_error(&e))?;
    if check.wins {
        metrics::wins_total();
        metrics::jackpot_awards_total(check.jackpot_error.is_none());
    }
    Ok(Json(CheckResponse {
        wins: check.wins,
        completed_lines: check.completed_lines,
        marked_grid: check.marked_grid,
        pattern: check.pattern.to_string(),
        winner: check.winner,
        jackpot_error: check.jackpot_error,
    }))
}

/// Schedule an automatic call, replacing any pending one.
pub async fn schedule_call(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<ScheduleRequest>,
) -> Result<StatusCode, ApiError> {
    // Reject scheduling for unknown sessions up front.
    state
        .service
        .get_session(session_id)
        .await
        .map_err(|e| game_error(&e))?;
    let delay = req
        .delay_secs
        .unwrap_or(state.defaults.auto_call_interval_secs);
    state
        .service
        .schedule_next_call(session_id, Duration::from_secs(delay));
    Ok(StatusCode::ACCEPTED)
}

pub async fn cancel_scheduled_call(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> StatusCode {
    state.service.cancel_next_call(session_id);
    StatusCode::NO_CONTENT
}

pub async fn list_audits(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Vec<CallAuditRecord>>, ApiError> {
    let audits = state
        .service
        .list_call_audits(session_id)
        .await
        .map_err(|e| game_error(&e))?;
    Ok(Json(audits))
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub purged: u64,
}

/// Purge call audits older than the retention window.
pub async fn purge_audits(
    State(state): State<AppState>,
    Json(req): Json<PurgeRequest>,
) -> Result<Json<PurgeResponse>, ApiError> {
    let days = req
        .retention_days
        .unwrap_or(state.defaults.audit_retention_days);
    let purged = state
        .service
        .purge_call_audits(Some(days))
        .await
        .map_err(|e| game_error(&e))?;
    Ok(Json(PurgeResponse { purged }))
}
