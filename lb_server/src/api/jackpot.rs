//! Jackpot management API handlers.
//!
//! Moderator surface for the per-tenant jackpot: reading the record,
//! setting the amount, enabling/disabling, awarding draws, and managing the
//! ledger. An award targeting a session number that does not exist yet is
//! parked as a future winner configuration and consumed when that session
//! is created.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use live_bingo::game::entities::PatternChoice;
use live_bingo::jackpot::models::{AwardTarget, JackpotLedgerEntry, JackpotRecord};

use super::{ApiError, AppState, game_error, jackpot_error};
use crate::metrics;

pub async fn get_record(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<JackpotRecord>, ApiError> {
    let record = state
        .service
        .jackpot()
        .get(tenant_id)
        .await
        .map_err(|e| jackpot_error(&e))?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct SetAmountRequest {
    pub amount: Decimal,
}

/// Set the jackpot balance and ceiling, logging the signed delta.
pub async fn set_amount(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Json(req): Json<SetAmountRequest>,
) -> Result<Json<JackpotRecord>, ApiError> {
    let record = state
        .service
        .jackpot()
        .set_amount(tenant_id, req.amount)
        .await
        .map_err(|e| jackpot_error(&e))?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub enabled: bool,
}

pub async fn toggle(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Json(req): Json<ToggleRequest>,
) -> Result<Json<JackpotRecord>, ApiError> {
    let record = state
        .service
        .jackpot()
        .toggle(tenant_id, req.enabled)
        .await
        .map_err(|e| jackpot_error(&e))?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct AwardRequest {
    pub session_number: i64,
    pub card_id: i64,
    pub amount: Decimal,
    #[serde(default)]
    pub message: String,
    /// Pattern for a future-session rig; defaults to `all`.
    pub pattern: Option<String>,
}

/// Award a jackpot draw.
///
/// When the session number already exists for the tenant, the draw debits
/// the balance immediately. Otherwise a rig is built for the card and the
/// award waits for the matching session to be created.
pub async fn award(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Json(req): Json<AwardRequest>,
) -> Result<Json<JackpotRecord>, ApiError> {
    let existing = state
        .service
        .get_session_by_number(tenant_id, req.session_number)
        .await
        .map_err(|e| game_error(&e))?;

    let target = match existing {
        Some(session) => {
            if session.card(req.card_id).is_none() {
                return Err(game_error(
                    &live_bingo::GameError::CardNotFound(req.card_id),
                ));
            }
            AwardTarget::Existing {
                session_number: req.session_number,
            }
        }
        None => {
            let choice: PatternChoice = match &req.pattern {
                Some(name) => name.parse().map_err(|e| game_error(&e))?,
                None => PatternChoice::Auto,
            };
            let card = state
                .service
                .catalog_card(req.card_id)
                .await
                .map_err(|e| game_error(&e))?;
            let config = state
                .service
                .build_future_config(
                    tenant_id,
                    req.session_number,
                    &card,
                    choice,
                    Some(req.amount),
                    Some(req.message.clone()),
                )
                .map_err(|e| game_error(&e))?;
            AwardTarget::Future(config)
        }
    };

    let result = state
        .service
        .award_jackpot(tenant_id, req.card_id, req.amount, req.message, target)
        .await;
    metrics::jackpot_awards_total(result.is_ok());
    let record = result.map_err(|e| jackpot_error(&e))?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub limit: Option<usize>,
}

pub async fn list_log(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<JackpotLedgerEntry>>, ApiError> {
    let entries = state
        .service
        .jackpot()
        .list_entries(tenant_id, query.limit.unwrap_or(100))
        .await
        .map_err(|e| jackpot_error(&e))?;
    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
pub struct CorrectLogRequest {
    pub amount: Decimal,
    pub winner_card_id: Option<i64>,
    #[serde(default)]
    pub message: String,
}

/// Correct a moderator-created ledger entry. Cashier entries return `403`.
pub async fn correct_log(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
    Json(req): Json<CorrectLogRequest>,
) -> Result<Json<JackpotRecord>, ApiError> {
    let record = state
        .service
        .jackpot()
        .correct_log_entry(entry_id, req.amount, req.winner_card_id, req.message)
        .await
        .map_err(|e| jackpot_error(&e))?;
    Ok(Json(record))
}

/// Delete a moderator-created ledger entry, reversing its balance delta.
pub async fn delete_log(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
) -> Result<(StatusCode, Json<JackpotRecord>), ApiError> {
    let record = state
        .service
        .jackpot()
        .delete_log_entry(entry_id)
        .await
        .map_err(|e| jackpot_error(&e))?;
    Ok((StatusCode::OK, Json(record)))
}
