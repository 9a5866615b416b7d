//! Session orchestration.
//!
//! `SessionService` is the single entry point the API layer talks to. It
//! owns the call guard, the scheduler, and the realtime dispatcher, and
//! wires session mutations to persistence, auditing, and event fan-out.

use chrono::{Duration as ChronoDuration, Utc};
use log::{error, info, warn};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

use crate::game::calling::{self, CallAuditRecord, CallOutcome};
use crate::game::constants::DEFAULT_AUDIT_RETENTION_DAYS;
use crate::game::entities::{
    Card, CardId, Economics, GameSession, JackpotDraw, MarkedGrid, Pattern, PatternChoice,
    SessionId, TenantId, Winner,
};
use crate::game::errors::{GameError, GameResult};
use crate::game::patterns;
use crate::game::rigging::SequenceRigger;
use crate::game::session::NewSession;
use crate::jackpot::models::{AwardTarget, JackpotRecord};
use crate::jackpot::{JackpotManager, JackpotResult};
use crate::realtime::{RealtimeDispatcher, RealtimeEvent};
use crate::store::{AuditRepository, CardRepository, SessionRepository};

use super::guard::CallGuard;
use super::scheduler::CallScheduler;

/// Request to create a session.
#[derive(Clone, Debug)]
pub struct CreateSession {
    pub tenant_id: TenantId,
    pub bet_amount: Decimal,
    pub house_fee_percentage: Decimal,
    pub pattern: PatternChoice,
    pub card_ids: Vec<CardId>,
    /// Covert rig target; the card must be part of the selection.
    pub rig_card_id: Option<CardId>,
    pub jackpot_enabled: bool,
}

/// Result of a bingo check. A losing check carries the evaluation only; a
/// winning check also carries the recorded winner and, when a jackpot draw
/// was attached and its settlement failed, the settlement error.
#[derive(Clone, Debug)]
pub struct BingoCheck {
    pub wins: bool,
    pub completed_lines: u32,
    /// The card's grid as marked by the session's call history.
    pub marked_grid: MarkedGrid,
    /// The pattern the card was evaluated against.
    pub pattern: PatternChoice,
    pub winner: Option<Winner>,
    pub jackpot_error: Option<String>,
}

/// The orchestrator. Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct SessionService {
    sessions: Arc<dyn SessionRepository>,
    cards: Arc<dyn CardRepository>,
    audits: Arc<dyn AuditRepository>,
    jackpot: JackpotManager,
    dispatcher: RealtimeDispatcher,
    guard: CallGuard,
    scheduler: CallScheduler,
    rigger: SequenceRigger,
}

impl SessionService {
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        cards: Arc<dyn CardRepository>,
        audits: Arc<dyn AuditRepository>,
        jackpot: JackpotManager,
        dispatcher: RealtimeDispatcher,
    ) -> Self {
        Self {
            sessions,
            cards,
            audits,
            jackpot,
            dispatcher,
            guard: CallGuard::new(),
            scheduler: CallScheduler::new(),
            rigger: SequenceRigger::default(),
        }
    }

    pub fn dispatcher(&self) -> &RealtimeDispatcher {
        &self.dispatcher
    }

    pub fn jackpot(&self) -> &JackpotManager {
        &self.jackpot
    }

    /// Create a session in `pending`.
    ///
    /// Resolution order for rigging: a pre-registered future winner config
    /// for the allocated session number wins over an explicit rig request;
    /// with neither, the session runs unrigged. The jackpot contribution is
    /// booked after the session is persisted; a contribution failure is
    /// logged and never rolls the session back.
    pub async fn create_session(&self, req: CreateSession) -> GameResult<GameSession> {
        let selected_cards = self.load_cards(&req.card_ids).await?;

        // Everything fallible about the request is checked before the
        // session number is allocated: a rejected request must not burn a
        // pre-registered future winner config.
        let economics = Economics::compute(
            req.bet_amount,
            selected_cards.len(),
            req.house_fee_percentage,
            req.jackpot_enabled,
        )?;
        let mut ids = req.card_ids.clone();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != req.card_ids.len() {
            return Err(GameError::Validation(
                "duplicate card in selection".to_string(),
            ));
        }
        for card in &selected_cards {
            card.grid.validate()?;
        }
        if let Some(target) = req.rig_card_id
            && !selected_cards.iter().any(|c| c.id == target)
        {
            return Err(GameError::CardNotFound(target));
        }

        let session_number = self.sessions.next_session_number(req.tenant_id).await?;

        let mut forced_call_sequence = Vec::new();
        let mut rigged_winner_card_id = None;
        let mut forced_pattern = None;
        let mut jackpot_draw = None;

        let future = self
            .jackpot
            .take_future_config(req.tenant_id, session_number)
            .await
            .map_err(|e| GameError::Validation(e.to_string()))?;
        match future {
            Some(cfg) if selected_cards.iter().any(|c| c.id == cfg.card_id) => {
                info!(
                    "session {session_number} applies future winner config for card {}",
                    cfg.card_id
                );
                forced_call_sequence = cfg.forced_call_sequence;
                rigged_winner_card_id = Some(cfg.card_id);
                if matches!(req.pattern, PatternChoice::Auto) {
                    forced_pattern = cfg.pattern;
                }
                if let Some(amount) = cfg.jackpot_amount {
                    jackpot_draw = Some(JackpotDraw {
                        amount,
                        message: cfg.jackpot_message.unwrap_or_default(),
                    });
                }
            }
            Some(cfg) => {
                // The config was consumed but its card is not on the floor;
                // the session proceeds unrigged.
                warn!(
                    "future winner config for session {session_number} targets card {} \
                     outside the selection, skipping",
                    cfg.card_id
                );
            }
            None => {
                if let Some(target) = req.rig_card_id {
                    let card = selected_cards
                        .iter()
                        .find(|c| c.id == target)
                        .ok_or(GameError::CardNotFound(target))?;
                    let rig = {
                        let mut rng = rand::rng();
                        self.rigger.build(card, req.pattern, &[], &mut rng)?
                    };
                    forced_call_sequence = rig.sequence;
                    rigged_winner_card_id = Some(rig.target_card_id);
                    // Only `all` persists the resolution; a `diagonal`
                    // session still accepts either diagonal at check time.
                    if matches!(req.pattern, PatternChoice::Auto) {
                        forced_pattern = rig.resolved_pattern;
                    }
                }
            }
        }

        let session = GameSession::create(NewSession {
            tenant_id: req.tenant_id,
            session_number,
            economics,
            pattern: req.pattern,
            forced_pattern,
            selected_cards,
            forced_call_sequence,
            rigged_winner_card_id,
            jackpot_enabled: req.jackpot_enabled,
            jackpot_draw,
        })?;
        self.sessions.insert_session(&session).await?;
        info!(
            "created session {} (#{session_number}) for tenant {}",
            session.id, session.tenant_id
        );

        if session.economics.jackpot_contribution > Decimal::ZERO {
            if let Err(e) = self
                .jackpot
                .contribute(
                    session.tenant_id,
                    session.economics.jackpot_contribution,
                    session_number,
                )
                .await
            {
                error!("jackpot contribution for session {session_number} failed: {e}");
            }
        }
        Ok(session)
    }

    pub async fn start_session(&self, id: SessionId) -> GameResult<GameSession> {
        self.transition(id, GameSession::start).await
    }

    pub async fn pause_session(&self, id: SessionId) -> GameResult<GameSession> {
        self.cancel_next_call(id);
        self.transition(id, GameSession::pause).await
    }

    pub async fn resume_session(&self, id: SessionId) -> GameResult<GameSession> {
        self.transition(id, GameSession::resume).await
    }

    /// Finish without a winner. Any pending auto-call is cancelled.
    pub async fn finish_session(&self, id: SessionId) -> GameResult<GameSession> {
        self.cancel_next_call(id);
        self.transition(id, GameSession::finish).await
    }

    async fn transition(
        &self,
        id: SessionId,
        op: fn(&mut GameSession) -> GameResult<()>,
    ) -> GameResult<GameSession> {
        // Transitions write the whole session back, so they take the same
        // per-session permit as the call path; losers get a retryable
        // `CallInProgress` instead of clobbering an in-flight call's write.
        let _permit = self.guard.try_acquire(id)?;
        let mut session = self.load_session(id).await?;
        op(&mut session)?;
        self.sessions.update_session(&session).await?;
        self.dispatcher.publish(
            session.tenant_id,
            RealtimeEvent::SessionStatusChanged {
                session_id: session.id,
                session_number: session.session_number,
                status: session.status,
            },
        );
        Ok(session)
    }

    /// Call the next number, serialized per session by the call guard.
    ///
    /// Every processed request leaves an audit record, success or domain
    /// rejection. A rejection from the forced-queue path may still have
    /// advanced the queue; that mutation is persisted before the error
    /// propagates so the operator's retry sees the advanced state.
    pub async fn call_number(
        &self,
        session_id: SessionId,
        operator: &str,
        manual: Option<u8>,
    ) -> GameResult<CallOutcome> {
        let _permit = self.guard.try_acquire(session_id)?;
        let mut session = self.load_session(session_id).await?;
        let forced_before = session.forced_call_sequence.len();

        let result = {
            let mut rng = rand::rng();
            calling::select_next(&mut session, manual, &mut rng)
        };

        match result {
            Ok(outcome) => {
                self.sessions.update_session(&session).await?;
                let audit = CallAuditRecord::success(&session, operator, outcome);
                self.audits.append_audit(&audit).await?;
                self.dispatcher.publish(
                    session.tenant_id,
                    RealtimeEvent::NumberCalled {
                        session_id: session.id,
                        session_number: session.session_number,
                        number: outcome.number,
                        source: outcome.source,
                        called_numbers: session.called_numbers.clone(),
                    },
                );
                Ok(outcome)
            }
            Err(err) => {
                if session.forced_call_sequence.len() != forced_before {
                    self.sessions.update_session(&session).await?;
                }
                let audit = CallAuditRecord::failure(&session, operator, &err);
                self.audits.append_audit(&audit).await?;
                Err(err)
            }
        }
    }

    /// Evaluate a card against the session's effective pattern. A winning
    /// check completes the session and records the winner; the attached
    /// jackpot draw, if any, is settled afterwards and its failure is
    /// reported without undoing the completion.
    ///
    /// The check holds the per-session call permit, so a call that is
    /// already in flight rejects the check with a retryable
    /// `CallInProgress` rather than racing the completion write.
    pub async fn check_bingo(
        &self,
        session_id: SessionId,
        card_id: CardId,
    ) -> GameResult<BingoCheck> {
        let _permit = self.guard.try_acquire(session_id)?;
        let mut session = self.load_session(session_id).await?;
        let card = session
            .card(card_id)
            .ok_or(GameError::CardNotFound(card_id))?;

        let marked = card.grid.mark(&session.called_set());
        let choice = session.effective_pattern();
        let outcome = patterns::evaluate(&marked, choice);
        if !outcome.wins {
            return Ok(BingoCheck {
                wins: false,
                completed_lines: outcome.completed_lines,
                marked_grid: marked,
                pattern: choice,
                winner: None,
                jackpot_error: None,
            });
        }

        let pattern = winning_pattern(&marked, choice);
        session.complete_with_winner(card_id, session.economics.prize_pool, pattern)?;
        self.sessions.update_session(&session).await?;
        self.cancel_next_call(session_id);

        self.dispatcher.publish(
            session.tenant_id,
            RealtimeEvent::WinnerDeclared {
                session_id: session.id,
                session_number: session.session_number,
                card_id,
                prize: session.economics.prize_pool,
                pattern,
            },
        );
        self.dispatcher.publish(
            session.tenant_id,
            RealtimeEvent::SessionStatusChanged {
                session_id: session.id,
                session_number: session.session_number,
                status: session.status,
            },
        );

        let jackpot_error = self.settle_jackpot_draw(&session, card_id).await;
        Ok(BingoCheck {
            wins: true,
            completed_lines: outcome.completed_lines,
            marked_grid: marked,
            pattern: choice,
            winner: session.winner.clone(),
            jackpot_error,
        })
    }

    /// Settle the pre-configured jackpot draw for the winning card.
    /// Settlement is deliberately decoupled from completion: the winner
    /// stands even when the ledger rejects the draw.
    async fn settle_jackpot_draw(
        &self,
        session: &GameSession,
        card_id: CardId,
    ) -> Option<String> {
        let draw = session.jackpot_draw.as_ref()?;
        if session.rigged_winner_card_id != Some(card_id) {
            return None;
        }

        let result = self
            .jackpot
            .award(
                session.tenant_id,
                card_id,
                draw.amount,
                draw.message.clone(),
                AwardTarget::Existing {
                    session_number: session.session_number,
                },
            )
            .await;
        match result {
            Ok(_) => {
                self.dispatcher.publish(
                    session.tenant_id,
                    RealtimeEvent::JackpotAwarded {
                        session_id: session.id,
                        session_number: session.session_number,
                        card_id,
                        amount: draw.amount,
                        message: draw.message.clone(),
                    },
                );
                None
            }
            Err(e) => {
                error!(
                    "jackpot draw settlement failed for session {}: {e}",
                    session.session_number
                );
                Some(e.to_string())
            }
        }
    }

    /// Award a jackpot draw on a moderator's behalf. An award that debits
    /// an existing session's tenant is broadcast to the tenant's viewers;
    /// a parked future award stays silent until its session plays out.
    pub async fn award_jackpot(
        &self,
        tenant_id: TenantId,
        card_id: CardId,
        amount: Decimal,
        message: String,
        target: AwardTarget,
    ) -> JackpotResult<JackpotRecord> {
        let existing = match &target {
            AwardTarget::Existing { session_number } => Some(*session_number),
            AwardTarget::Future(_) => None,
        };
        let record = self
            .jackpot
            .award(tenant_id, card_id, amount, message.clone(), target)
            .await?;
        if let Some(session_number) = existing {
            let session = self
                .get_session_by_number(tenant_id, session_number)
                .await
                .ok()
                .flatten();
            if let Some(session) = session {
                self.dispatcher.publish(
                    tenant_id,
                    RealtimeEvent::JackpotAwarded {
                        session_id: session.id,
                        session_number,
                        card_id,
                        amount,
                        message,
                    },
                );
            }
        }
        Ok(record)
    }

    /// Schedule an automatic call after `delay`, replacing any pending one.
    pub fn schedule_next_call(&self, session_id: SessionId, delay: Duration) {
        let service = self.clone();
        self.scheduler.schedule(session_id, delay, async move {
            if let Err(e) = service.call_number(session_id, "scheduler", None).await {
                warn!("scheduled call for session {session_id} failed: {e}");
            }
        });
    }

    /// Cancel the pending automatic call, if any. Idempotent.
    pub fn cancel_next_call(&self, session_id: SessionId) {
        self.scheduler.cancel(session_id);
    }

    pub async fn get_session(&self, id: SessionId) -> GameResult<GameSession> {
        self.load_session(id).await
    }

    pub async fn get_session_by_number(
        &self,
        tenant_id: TenantId,
        session_number: i64,
    ) -> GameResult<Option<GameSession>> {
        Ok(self
            .sessions
            .get_session_by_number(tenant_id, session_number)
            .await?)
    }

    pub async fn list_sessions(&self, tenant_id: TenantId) -> GameResult<Vec<GameSession>> {
        Ok(self.sessions.list_sessions(tenant_id).await?)
    }

    pub async fn list_call_audits(
        &self,
        session_id: SessionId,
    ) -> GameResult<Vec<CallAuditRecord>> {
        Ok(self.audits.list_audits_for_session(session_id).await?)
    }

    /// Drop audit records older than the retention window.
    pub async fn purge_call_audits(&self, retention_days: Option<i64>) -> GameResult<u64> {
        let days = retention_days.unwrap_or(DEFAULT_AUDIT_RETENTION_DAYS);
        let cutoff = Utc::now() - ChronoDuration::days(days);
        let purged = self.audits.purge_audits_before(cutoff).await?;
        if purged > 0 {
            info!("purged {purged} call audit records older than {days} days");
        }
        Ok(purged)
    }

    /// Fetch a card from the catalog.
    pub async fn catalog_card(&self, id: CardId) -> GameResult<Card> {
        self.cards
            .get_card(id)
            .await?
            .ok_or(GameError::CardNotFound(id))
    }

    /// Build a future winner configuration for a session number that does
    /// not exist yet: the rig is computed now, against an empty call
    /// history, and parked until that session is created.
    pub fn build_future_config(
        &self,
        tenant_id: TenantId,
        session_number: i64,
        card: &Card,
        choice: PatternChoice,
        jackpot_amount: Option<Decimal>,
        jackpot_message: Option<String>,
    ) -> GameResult<crate::jackpot::models::FutureWinnerConfig> {
        let rig = {
            let mut rng = rand::rng();
            self.rigger.build(card, choice, &[], &mut rng)?
        };
        let pattern = match choice {
            PatternChoice::Declared(p) => Some(p),
            _ => rig.resolved_pattern,
        };
        Ok(crate::jackpot::models::FutureWinnerConfig {
            tenant_id,
            session_number,
            card_id: card.id,
            pattern,
            required_numbers: rig.required,
            forced_call_sequence: rig.sequence,
            jackpot_amount,
            jackpot_message,
            used: false,
            created_at: Utc::now(),
        })
    }

    async fn load_session(&self, id: SessionId) -> GameResult<GameSession> {
        self.sessions
            .get_session(id)
            .await?
            .ok_or(GameError::SessionNotFound(id))
    }

    async fn load_cards(&self, ids: &[CardId]) -> GameResult<Vec<Card>> {
        let cards = self.cards.get_cards(ids).await?;
        if let Some(missing) = ids.iter().find(|id| !cards.iter().any(|c| c.id == **id)) {
            return Err(GameError::CardNotFound(*missing));
        }
        Ok(cards)
    }
}

/// Resolve the concrete pattern to record for a winning grid. For the
/// multi-pattern choices the first matching concrete pattern in declaration
/// order is recorded.
fn winning_pattern(marked: &MarkedGrid, choice: PatternChoice) -> Pattern {
    match choice {
        PatternChoice::Declared(p) => p,
        PatternChoice::AnyDiagonal | PatternChoice::BothDiagonals => {
            if patterns::evaluate(marked, PatternChoice::Declared(Pattern::MainDiagonal)).wins
            {
                Pattern::MainDiagonal
            } else {
                Pattern::OtherDiagonal
            }
        }
        PatternChoice::Auto => Pattern::ALL
            .into_iter()
            .find(|p| patterns::evaluate(marked, PatternChoice::Declared(*p)).wins)
            .unwrap_or(Pattern::HorizontalLine),
    }
}
