//! Jackpot ledger rules over the in-memory store.

use chrono::Utc;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

use live_bingo::engine::{CreateSession, SessionService};
use live_bingo::game::entities::{Pattern, PatternChoice};
use live_bingo::game::errors::GameError;
use live_bingo::game::rigging::SequenceRigger;
use live_bingo::jackpot::models::{AwardTarget, FutureWinnerConfig};
use live_bingo::jackpot::{JackpotError, JackpotManager};
use live_bingo::realtime::{RealtimeDispatcher, RealtimeEvent};
use live_bingo::store::{CardRepository, MemoryStore};

fn setup() -> (Arc<MemoryStore>, JackpotManager, SessionService) {
    let store = Arc::new(MemoryStore::new());
    store.seed_generated_cards(10);
    let manager = JackpotManager::new(store.clone());
    let service = SessionService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        manager.clone(),
        RealtimeDispatcher::new(),
    );
    (store, manager, service)
}

#[tokio::test]
async fn set_amount_logs_the_signed_delta() {
    let (_, manager, _) = setup();
    let tenant = Uuid::new_v4();

    let record = manager.set_amount(tenant, dec!(100)).await.unwrap();
    assert_eq!(record.amount, dec!(100));
    assert_eq!(record.base_amount, dec!(100));

    manager.set_amount(tenant, dec!(60)).await.unwrap();
    let entries = manager.list_entries(tenant, 10).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].delta, dec!(-40), "second set logs the decrease");
    assert_eq!(entries[1].delta, dec!(100));

    assert!(matches!(
        manager.set_amount(tenant, dec!(-1)).await,
        Err(JackpotError::InvalidAmount(_))
    ));
}

#[tokio::test]
async fn award_debits_the_balance_atomically() {
    let (_, manager, _) = setup();
    let tenant = Uuid::new_v4();
    manager.set_amount(tenant, dec!(100)).await.unwrap();

    let record = manager
        .award(
            tenant,
            7,
            dec!(30),
            "lucky night".to_string(),
            AwardTarget::Existing { session_number: 4 },
        )
        .await
        .unwrap();
    assert_eq!(record.amount, dec!(70));
    assert_eq!(record.base_amount, dec!(100), "ceiling is untouched");
    let last = record.last_award.unwrap();
    assert_eq!(last.card_id, 7);
    assert_eq!(last.amount, dec!(30));

    let entries = manager.list_entries(tenant, 10).await.unwrap();
    let award = &entries[0];
    assert!(award.is_award);
    assert_eq!(award.delta, dec!(-30));
    assert_eq!(award.winner_card_id, Some(7));
    assert_eq!(award.session_number, Some(4));
    assert!(!award.triggered_by_cashier);
}

#[tokio::test]
async fn rejected_awards_leave_balance_and_ledger_untouched() {
    let (_, manager, _) = setup();
    let tenant = Uuid::new_v4();
    manager.set_amount(tenant, dec!(50)).await.unwrap();
    manager
        .award(
            tenant,
            1,
            dec!(40),
            "first".to_string(),
            AwardTarget::Existing { session_number: 1 },
        )
        .await
        .unwrap();
    let entries_before = manager.list_entries(tenant, 10).await.unwrap().len();

    // Balance is 10, ceiling is 50: a 20 draw passes the ceiling but fails
    // the balance.
    let err = manager
        .award(
            tenant,
            1,
            dec!(20),
            "too much".to_string(),
            AwardTarget::Existing { session_number: 2 },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        JackpotError::ConstraintViolation { kind: "balance", .. }
    ));

    // A draw over the ceiling fails regardless of balance.
    let err = manager
        .award(
            tenant,
            1,
            dec!(60),
            "over ceiling".to_string(),
            AwardTarget::Existing { session_number: 2 },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        JackpotError::ConstraintViolation { kind: "ceiling", .. }
    ));

    let record = manager.get(tenant).await.unwrap();
    assert_eq!(record.amount, dec!(10));
    assert_eq!(
        manager.list_entries(tenant, 10).await.unwrap().len(),
        entries_before
    );
}

#[tokio::test]
async fn disabled_jackpot_rejects_awards_but_accepts_contributions() {
    let (_, manager, _) = setup();
    let tenant = Uuid::new_v4();
    manager.set_amount(tenant, dec!(100)).await.unwrap();
    manager.toggle(tenant, false).await.unwrap();

    assert!(matches!(
        manager
            .award(
                tenant,
                1,
                dec!(10),
                "nope".to_string(),
                AwardTarget::Existing { session_number: 1 },
            )
            .await,
        Err(JackpotError::Disabled(_))
    ));

    let record = manager.contribute(tenant, dec!(5), 9).await.unwrap();
    assert_eq!(record.amount, dec!(105));
}

#[tokio::test]
async fn cashier_entries_are_immutable() {
    let (_, manager, _) = setup();
    let tenant = Uuid::new_v4();
    manager.contribute(tenant, dec!(3), 1).await.unwrap();
    let entry = manager.list_entries(tenant, 1).await.unwrap().remove(0);

    assert!(matches!(
        manager.delete_log_entry(entry.id).await,
        Err(JackpotError::CashierEntryImmutable(_))
    ));
    assert!(matches!(
        manager
            .correct_log_entry(entry.id, dec!(5), None, "edit".to_string())
            .await,
        Err(JackpotError::CashierEntryImmutable(_))
    ));
    assert_eq!(manager.get(tenant).await.unwrap().amount, dec!(3));
}

#[tokio::test]
async fn deleting_an_award_restores_the_balance() {
    let (_, manager, _) = setup();
    let tenant = Uuid::new_v4();
    manager.set_amount(tenant, dec!(100)).await.unwrap();
    manager
        .award(
            tenant,
            2,
            dec!(25),
            "mistake".to_string(),
            AwardTarget::Existing { session_number: 1 },
        )
        .await
        .unwrap();

    let award = manager.list_entries(tenant, 1).await.unwrap().remove(0);
    let record = manager.delete_log_entry(award.id).await.unwrap();
    assert_eq!(record.amount, dec!(100), "reversing -25 adds 25 back");
    assert!(manager
        .list_entries(tenant, 10)
        .await
        .unwrap()
        .iter()
        .all(|e| e.id != award.id));
}

#[tokio::test]
async fn correcting_an_award_reapplies_the_delta() {
    let (_, manager, _) = setup();
    let tenant = Uuid::new_v4();
    manager.set_amount(tenant, dec!(100)).await.unwrap();
    manager
        .award(
            tenant,
            2,
            dec!(25),
            "typo".to_string(),
            AwardTarget::Existing { session_number: 1 },
        )
        .await
        .unwrap();
    let award = manager.list_entries(tenant, 1).await.unwrap().remove(0);

    let record = manager
        .correct_log_entry(award.id, dec!(10), Some(3), "fixed".to_string())
        .await
        .unwrap();
    assert_eq!(record.amount, dec!(90), "75 + 25 back - 10 new");

    let corrected = manager.list_entries(tenant, 1).await.unwrap().remove(0);
    assert_eq!(corrected.delta, dec!(-10));
    assert_eq!(corrected.winner_card_id, Some(3));
    assert_eq!(corrected.reason, "fixed");
}

#[tokio::test]
async fn future_award_is_consumed_by_the_matching_session() {
    let (store, manager, service) = setup();
    let tenant = Uuid::new_v4();
    manager.set_amount(tenant, dec!(100)).await.unwrap();

    // Rig card 2 for a cross win in the next session (number 1).
    let card = store.get_card(2).await.unwrap().unwrap();
    let rig = {
        let mut rng = rand::rng();
        SequenceRigger::default()
            .build(&card, PatternChoice::Declared(Pattern::Cross), &[], &mut rng)
            .unwrap()
    };
    let config = FutureWinnerConfig {
        tenant_id: tenant,
        session_number: 1,
        card_id: 2,
        pattern: Some(Pattern::Cross),
        required_numbers: rig.required.clone(),
        forced_call_sequence: rig.sequence.clone(),
        jackpot_amount: Some(dec!(40)),
        jackpot_message: Some("congratulations".to_string()),
        used: false,
        created_at: Utc::now(),
    };
    let record = manager
        .award(
            tenant,
            2,
            dec!(40),
            "congratulations".to_string(),
            AwardTarget::Future(config),
        )
        .await
        .unwrap();
    assert_eq!(record.amount, dec!(100), "future awards do not debit yet");

    let session = service
        .create_session(CreateSession {
            tenant_id: tenant,
            bet_amount: dec!(10),
            house_fee_percentage: dec!(15),
            pattern: PatternChoice::Auto,
            card_ids: vec![1, 2, 3],
            rig_card_id: None,
            jackpot_enabled: true,
        })
        .await
        .unwrap();
    assert_eq!(session.rigged_winner_card_id, Some(2));
    assert_eq!(session.forced_pattern, Some(Pattern::Cross));
    let draw = session.jackpot_draw.clone().unwrap();
    assert_eq!(draw.amount, dec!(40));

    // Play the rig out and settle the draw on the winning check.
    service.start_session(session.id).await.unwrap();
    for _ in 0..rig.sequence.len() {
        service.call_number(session.id, "op", None).await.unwrap();
    }
    let check = service.check_bingo(session.id, 2).await.unwrap();
    assert!(check.wins);
    assert_eq!(check.pattern, PatternChoice::Declared(Pattern::Cross));
    assert!(check.jackpot_error.is_none());

    let record = manager.get(tenant).await.unwrap();
    // 100 + 3 contribution - 40 draw.
    assert_eq!(record.amount, dec!(63));
    assert_eq!(record.last_award.unwrap().card_id, 2);

    // The config is single-use: the next session runs unrigged.
    let next = service
        .create_session(CreateSession {
            tenant_id: tenant,
            bet_amount: dec!(10),
            house_fee_percentage: dec!(15),
            pattern: PatternChoice::Auto,
            card_ids: vec![1, 2, 3],
            rig_card_id: None,
            jackpot_enabled: false,
        })
        .await
        .unwrap();
    assert!(next.forced_call_sequence.is_empty());
    assert!(next.rigged_winner_card_id.is_none());
}

#[tokio::test]
async fn rejected_creation_leaves_the_future_config_parked() {
    let (store, manager, service) = setup();
    let tenant = Uuid::new_v4();
    manager.set_amount(tenant, dec!(100)).await.unwrap();

    let card = store.get_card(2).await.unwrap().unwrap();
    let rig = {
        let mut rng = rand::rng();
        SequenceRigger::default()
            .build(&card, PatternChoice::Declared(Pattern::Cross), &[], &mut rng)
            .unwrap()
    };
    let config = FutureWinnerConfig {
        tenant_id: tenant,
        session_number: 1,
        card_id: 2,
        pattern: Some(Pattern::Cross),
        required_numbers: rig.required.clone(),
        forced_call_sequence: rig.sequence.clone(),
        jackpot_amount: Some(dec!(40)),
        jackpot_message: Some("hold tight".to_string()),
        used: false,
        created_at: Utc::now(),
    };
    manager
        .award(
            tenant,
            2,
            dec!(40),
            "hold tight".to_string(),
            AwardTarget::Future(config),
        )
        .await
        .unwrap();

    // A request that fails validation must not consume the parked config
    // or the session number it is waiting for.
    let err = service
        .create_session(CreateSession {
            tenant_id: tenant,
            bet_amount: dec!(0),
            house_fee_percentage: dec!(15),
            pattern: PatternChoice::Auto,
            card_ids: vec![1, 2, 3],
            rig_card_id: None,
            jackpot_enabled: true,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::InvalidEconomics(_)));

    let err = service
        .create_session(CreateSession {
            tenant_id: tenant,
            bet_amount: dec!(10),
            house_fee_percentage: dec!(15),
            pattern: PatternChoice::Auto,
            card_ids: vec![1, 999],
            rig_card_id: None,
            jackpot_enabled: true,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::CardNotFound(999)));

    // The next valid creation is still session 1 and picks up the rig.
    let session = service
        .create_session(CreateSession {
            tenant_id: tenant,
            bet_amount: dec!(10),
            house_fee_percentage: dec!(15),
            pattern: PatternChoice::Auto,
            card_ids: vec![1, 2, 3],
            rig_card_id: None,
            jackpot_enabled: true,
        })
        .await
        .unwrap();
    assert_eq!(session.session_number, 1);
    assert_eq!(session.rigged_winner_card_id, Some(2));
    assert_eq!(session.jackpot_draw.unwrap().amount, dec!(40));
}

#[tokio::test]
async fn awarding_against_an_existing_session_is_broadcast() {
    let (_, manager, service) = setup();
    let tenant = Uuid::new_v4();
    manager.set_amount(tenant, dec!(100)).await.unwrap();

    let session = service
        .create_session(CreateSession {
            tenant_id: tenant,
            bet_amount: dec!(10),
            house_fee_percentage: dec!(15),
            pattern: PatternChoice::Auto,
            card_ids: vec![1, 2],
            rig_card_id: None,
            jackpot_enabled: false,
        })
        .await
        .unwrap();
    let mut events = service.dispatcher().subscribe(tenant);

    let record = service
        .award_jackpot(
            tenant,
            1,
            dec!(30),
            "big draw".to_string(),
            AwardTarget::Existing {
                session_number: session.session_number,
            },
        )
        .await
        .unwrap();
    assert_eq!(record.amount, dec!(70));

    match events.recv().await.unwrap() {
        RealtimeEvent::JackpotAwarded {
            session_id,
            card_id,
            amount,
            message,
            ..
        } => {
            assert_eq!(session_id, session.id);
            assert_eq!(card_id, 1);
            assert_eq!(amount, dec!(30));
            assert_eq!(message, "big draw");
        }
        other => panic!("expected a jackpot broadcast, got {other:?}"),
    }
}

#[tokio::test]
async fn audit_purge_honors_the_retention_cutoff() {
    let (_, _, service) = setup();
    let tenant = Uuid::new_v4();
    let session = service
        .create_session(CreateSession {
            tenant_id: tenant,
            bet_amount: dec!(10),
            house_fee_percentage: dec!(15),
            pattern: PatternChoice::Auto,
            card_ids: vec![1, 2],
            rig_card_id: None,
            jackpot_enabled: false,
        })
        .await
        .unwrap();
    service.start_session(session.id).await.unwrap();
    service.call_number(session.id, "op", None).await.unwrap();

    // Fresh records survive the default 90-day window.
    let purged = service.purge_call_audits(None).await.unwrap();
    assert_eq!(purged, 0);
    assert_eq!(service.list_call_audits(session.id).await.unwrap().len(), 1);

    // A zero-day window purges everything older than now.
    let purged = service.purge_call_audits(Some(0)).await.unwrap();
    assert_eq!(purged, 1);
    assert!(service.list_call_audits(session.id).await.unwrap().is_empty());
}
