//! Number selection for active sessions.
//!
//! Selection precedence: operator-supplied manual number, then the head of
//! the forced sequence, then a uniform draw over the remaining domain. The
//! forced queue is the only place a rig leaks into the call path, and it is
//! consumed destructively so operators can pull forced numbers out of order.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::constants::BINGO_MAX_NUMBER;
use super::entities::{CallSource, GameSession, GameStatus, SessionId, TenantId};
use super::errors::{GameError, GameResult};

/// A successfully selected call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CallOutcome {
    pub number: u8,
    pub source: CallSource,
}

/// Select the next number for `session` and append it to the call history.
///
/// On `Ok` the session has been mutated (number appended, forced queue
/// drained of the number where applicable). The forced-head path can also
/// mutate the queue on failure: a head that was already called is dropped
/// before the error is returned, so the caller's immediate retry succeeds.
pub fn select_next<R: Rng + ?Sized>(
    session: &mut GameSession,
    manual: Option<u8>,
    rng: &mut R,
) -> GameResult<CallOutcome> {
    if session.status != GameStatus::Active {
        return Err(GameError::InvalidState {
            status: session.status,
            required: "active",
        });
    }

    let outcome = match manual {
        Some(number) => select_manual(session, number)?,
        None if !session.forced_call_sequence.is_empty() => select_forced_head(session)?,
        None => select_random(session, rng)?,
    };

    session.called_numbers.push(outcome.number);
    session.updated_at = Utc::now();
    Ok(outcome)
}

fn select_manual(session: &mut GameSession, number: u8) -> GameResult<CallOutcome> {
    if number < 1 || number > BINGO_MAX_NUMBER {
        return Err(GameError::NumberOutOfRange(number));
    }
    if session.called_numbers.contains(&number) {
        return Err(GameError::AlreadyCalled {
            number,
            remaining_forced: forced_snapshot(session),
        });
    }
    if !session.forced_call_sequence.is_empty() {
        if !session.forced_call_sequence.contains(&number) {
            return Err(GameError::NotInForcedSequence {
                number,
                remaining_forced: forced_snapshot(session),
            });
        }
        // Pull the number out of the queue wherever it occurs, so an
        // operator can play forced numbers out of order.
        session.forced_call_sequence.retain(|n| *n != number);
    }
    Ok(CallOutcome {
        number,
        source: CallSource::Manual,
    })
}

fn select_forced_head(session: &mut GameSession) -> GameResult<CallOutcome> {
    let number = session
        .forced_call_sequence
        .pop_front()
        .expect("caller checked the queue is non-empty");
    if session.called_numbers.contains(&number) {
        // A manual call consumed this number earlier. The queue has already
        // advanced past it; the operator retries and gets the next one.
        return Err(GameError::AlreadyCalled {
            number,
            remaining_forced: forced_snapshot(session),
        });
    }
    Ok(CallOutcome {
        number,
        source: CallSource::Forced,
    })
}

fn select_random<R: Rng + ?Sized>(
    session: &GameSession,
    rng: &mut R,
) -> GameResult<CallOutcome> {
    let candidates: Vec<u8> = (1..=BINGO_MAX_NUMBER)
        .filter(|n| !session.called_numbers.contains(n))
        .collect();
    let number = *candidates.choose(rng).ok_or(GameError::Exhausted)?;
    Ok(CallOutcome {
        number,
        source: CallSource::Random,
    })
}

fn forced_snapshot(session: &GameSession) -> Vec<u8> {
    session.forced_call_sequence.iter().copied().collect()
}

/// Audit record written for every processed call request, success or
/// terminal rejection, capturing the full state the operator saw.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CallAuditRecord {
    pub id: Uuid,
    pub session_id: SessionId,
    pub tenant_id: TenantId,
    pub operator: String,
    pub number: Option<u8>,
    pub source: Option<CallSource>,
    /// `ok`, or the rejection tag of the failed call.
    pub outcome: String,
    pub forced_remaining: Vec<u8>,
    pub called_numbers: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl CallAuditRecord {
    #[must_use]
    pub fn success(session: &GameSession, operator: &str, outcome: CallOutcome) -> Self {
        Self::build(session, operator, Some(outcome.number), Some(outcome.source), "ok")
    }

    #[must_use]
    pub fn failure(session: &GameSession, operator: &str, err: &GameError) -> Self {
        Self::build(session, operator, None, None, err.tag())
    }

    fn build(
        session: &GameSession,
        operator: &str,
        number: Option<u8>,
        source: Option<CallSource>,
        outcome: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session.id,
            tenant_id: session.tenant_id,
            operator: operator.to_string(),
            number,
            source,
            outcome: outcome.to_string(),
            forced_remaining: forced_snapshot(session),
            called_numbers: session.called_numbers.clone(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{Card, Economics, PatternChoice};
    use crate::game::session::NewSession;
    use rust_decimal_macros::dec;

    fn session_with_forced(forced: Vec<u8>) -> GameSession {
        let mut rng = rand::rng();
        let mut session = GameSession::create(NewSession {
            tenant_id: Uuid::new_v4(),
            session_number: 1,
            economics: Economics::compute(dec!(10), 1, dec!(15), false).unwrap(),
            pattern: PatternChoice::Auto,
            forced_pattern: None,
            selected_cards: vec![Card::generate(1, &mut rng)],
            forced_call_sequence: forced,
            rigged_winner_card_id: None,
            jackpot_enabled: false,
            jackpot_draw: None,
        })
        .unwrap();
        session.start().unwrap();
        session
    }

    #[test]
    fn calls_require_an_active_session() {
        let mut session = session_with_forced(vec![]);
        session.pause().unwrap();
        let mut rng = rand::rng();
        assert!(matches!(
            select_next(&mut session, None, &mut rng),
            Err(GameError::InvalidState { .. })
        ));
    }

    #[test]
    fn forced_sequence_is_consumed_front_to_back() {
        let mut session = session_with_forced(vec![5, 12, 40]);
        let mut rng = rand::rng();

        let first = select_next(&mut session, None, &mut rng).unwrap();
        assert_eq!(first, CallOutcome { number: 5, source: CallSource::Forced });
        let second = select_next(&mut session, None, &mut rng).unwrap();
        assert_eq!(second.number, 12);
        assert_eq!(session.called_numbers, vec![5, 12]);
        assert_eq!(session.forced_call_sequence, vec![40]);
    }

    #[test]
    fn manual_call_pulls_from_anywhere_in_the_queue() {
        let mut session = session_with_forced(vec![5, 12, 40]);
        let mut rng = rand::rng();

        let outcome = select_next(&mut session, Some(40), &mut rng).unwrap();
        assert_eq!(outcome.source, CallSource::Manual);
        assert_eq!(session.forced_call_sequence, vec![5, 12]);
    }

    #[test]
    fn manual_call_outside_forced_sequence_is_rejected() {
        let mut session = session_with_forced(vec![5, 12, 40]);
        let mut rng = rand::rng();

        match select_next(&mut session, Some(33), &mut rng) {
            Err(GameError::NotInForcedSequence {
                number,
                remaining_forced,
            }) => {
                assert_eq!(number, 33);
                assert_eq!(remaining_forced, vec![5, 12, 40]);
            }
            other => panic!("expected NotInForcedSequence, got {other:?}"),
        }
        assert!(session.called_numbers.is_empty());
    }

    #[test]
    fn forced_head_already_called_advances_and_fails_once() {
        let mut session = session_with_forced(vec![5, 12, 40]);
        let mut rng = rand::rng();

        // Manual call consumes 12 from the middle of the queue.
        select_next(&mut session, Some(12), &mut rng).unwrap();
        select_next(&mut session, None, &mut rng).unwrap(); // pops 5

        // Simulate a stale queue head: 12 re-enters but was already called.
        session.forced_call_sequence.push_front(12);
        match select_next(&mut session, None, &mut rng) {
            Err(GameError::AlreadyCalled { number, remaining_forced }) => {
                assert_eq!(number, 12);
                assert_eq!(remaining_forced, vec![40], "queue advanced past the dup");
            }
            other => panic!("expected AlreadyCalled, got {other:?}"),
        }
        // Retry succeeds immediately.
        let outcome = select_next(&mut session, None, &mut rng).unwrap();
        assert_eq!(outcome.number, 40);
    }

    #[test]
    fn manual_range_and_duplicate_validation() {
        let mut session = session_with_forced(vec![]);
        let mut rng = rand::rng();

        assert!(matches!(
            select_next(&mut session, Some(0), &mut rng),
            Err(GameError::NumberOutOfRange(0))
        ));
        assert!(matches!(
            select_next(&mut session, Some(76), &mut rng),
            Err(GameError::NumberOutOfRange(76))
        ));

        select_next(&mut session, Some(42), &mut rng).unwrap();
        assert!(matches!(
            select_next(&mut session, Some(42), &mut rng),
            Err(GameError::AlreadyCalled { number: 42, .. })
        ));
    }

    #[test]
    fn random_calls_exhaust_the_domain_without_duplicates() {
        let mut session = session_with_forced(vec![]);
        let mut rng = rand::rng();

        for _ in 0..75 {
            select_next(&mut session, None, &mut rng).unwrap();
        }
        let mut seen = session.called_numbers.clone();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 75);
        assert!(matches!(
            select_next(&mut session, None, &mut rng),
            Err(GameError::Exhausted)
        ));
    }
}
