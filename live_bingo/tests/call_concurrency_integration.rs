//! Serialization of concurrent calls and auto-call scheduling.

use async_trait::async_trait;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use live_bingo::engine::{CreateSession, SessionService};
use live_bingo::game::entities::{GameSession, GameStatus, PatternChoice, SessionId, TenantId};
use live_bingo::game::errors::GameError;
use live_bingo::jackpot::JackpotManager;
use live_bingo::realtime::RealtimeDispatcher;
use live_bingo::store::{MemoryStore, SessionRepository, StoreResult};

/// Session repository whose reads block on a test-held lock, pinning a call
/// in flight so the guard's rejection path can be observed deterministically.
struct GatedSessions {
    inner: Arc<MemoryStore>,
    gate: Arc<Mutex<()>>,
}

#[async_trait]
impl SessionRepository for GatedSessions {
    async fn next_session_number(&self, tenant_id: TenantId) -> StoreResult<i64> {
        self.inner.next_session_number(tenant_id).await
    }

    async fn insert_session(&self, session: &GameSession) -> StoreResult<()> {
        self.inner.insert_session(session).await
    }

    async fn update_session(&self, session: &GameSession) -> StoreResult<()> {
        self.inner.update_session(session).await
    }

    async fn get_session(&self, id: SessionId) -> StoreResult<Option<GameSession>> {
        let _held = self.gate.lock().await;
        self.inner.get_session(id).await
    }

    async fn get_session_by_number(
        &self,
        tenant_id: TenantId,
        session_number: i64,
    ) -> StoreResult<Option<GameSession>> {
        self.inner.get_session_by_number(tenant_id, session_number).await
    }

    async fn list_sessions(&self, tenant_id: TenantId) -> StoreResult<Vec<GameSession>> {
        self.inner.list_sessions(tenant_id).await
    }
}

fn request(tenant: Uuid) -> CreateSession {
    CreateSession {
        tenant_id: tenant,
        bet_amount: dec!(10),
        house_fee_percentage: dec!(15),
        pattern: PatternChoice::Auto,
        card_ids: vec![1, 2],
        rig_card_id: None,
        jackpot_enabled: false,
    }
}

#[tokio::test]
async fn concurrent_calls_are_rejected_while_one_is_in_flight() {
    let store = Arc::new(MemoryStore::new());
    store.seed_generated_cards(5);
    let gate = Arc::new(Mutex::new(()));
    let sessions = Arc::new(GatedSessions {
        inner: store.clone(),
        gate: gate.clone(),
    });
    let service = SessionService::new(
        sessions,
        store.clone(),
        store.clone(),
        JackpotManager::new(store.clone()),
        RealtimeDispatcher::new(),
    );

    let session = service.create_session(request(Uuid::new_v4())).await.unwrap();
    service.start_session(session.id).await.unwrap();

    // Hold the gate so the first call parks inside its session read with
    // the permit already claimed.
    let held = gate.lock().await;
    let first = tokio::spawn({
        let service = service.clone();
        let id = session.id;
        async move { service.call_number(id, "op-a", None).await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let second = service.call_number(session.id, "op-b", None).await;
    assert!(matches!(second, Err(GameError::CallInProgress(_))));
    assert!(second.as_ref().err().unwrap().is_retryable());

    drop(held);
    let first = first.await.unwrap();
    assert!(first.is_ok(), "the in-flight call completes normally");

    // The permit was released; a fresh call goes through.
    assert!(service.call_number(session.id, "op-b", None).await.is_ok());
    let current = service.get_session(session.id).await.unwrap();
    assert_eq!(current.called_numbers.len(), 2);
}

#[tokio::test]
async fn checks_and_transitions_are_serialized_against_in_flight_calls() {
    let store = Arc::new(MemoryStore::new());
    store.seed_generated_cards(5);
    let gate = Arc::new(Mutex::new(()));
    let sessions = Arc::new(GatedSessions {
        inner: store.clone(),
        gate: gate.clone(),
    });
    let service = SessionService::new(
        sessions,
        store.clone(),
        store.clone(),
        JackpotManager::new(store.clone()),
        RealtimeDispatcher::new(),
    );

    let session = service.create_session(request(Uuid::new_v4())).await.unwrap();
    service.start_session(session.id).await.unwrap();

    // Pin a call between its session read and its write.
    let held = gate.lock().await;
    let call = tokio::spawn({
        let service = service.clone();
        let id = session.id;
        async move { service.call_number(id, "op-a", None).await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    // A bingo check or a transition racing the call would write a session
    // snapshot the call is about to overwrite; both are rejected instead.
    assert!(matches!(
        service.check_bingo(session.id, 1).await,
        Err(GameError::CallInProgress(_))
    ));
    assert!(matches!(
        service.pause_session(session.id).await,
        Err(GameError::CallInProgress(_))
    ));

    drop(held);
    call.await.unwrap().unwrap();

    // With the permit released the check goes through and the call's write
    // stands.
    let check = service.check_bingo(session.id, 1).await.unwrap();
    assert!(!check.wins, "one call cannot complete any pattern");
    assert_eq!(check.pattern, PatternChoice::Auto, "losing checks still report the pattern");
    let current = service.get_session(session.id).await.unwrap();
    assert_eq!(current.status, GameStatus::Active);
    assert_eq!(current.called_numbers.len(), 1);
}

fn plain_service() -> (Arc<MemoryStore>, SessionService) {
    let store = Arc::new(MemoryStore::new());
    store.seed_generated_cards(5);
    let service = SessionService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        JackpotManager::new(store.clone()),
        RealtimeDispatcher::new(),
    );
    (store, service)
}

#[tokio::test]
async fn scheduled_call_fires_and_is_audited() {
    let (_, service) = plain_service();
    let session = service.create_session(request(Uuid::new_v4())).await.unwrap();
    service.start_session(session.id).await.unwrap();

    service.schedule_next_call(session.id, Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(80)).await;

    let current = service.get_session(session.id).await.unwrap();
    assert_eq!(current.called_numbers.len(), 1);
    let audits = service.list_call_audits(session.id).await.unwrap();
    assert_eq!(audits[0].operator, "scheduler");
}

#[tokio::test]
async fn cancelling_a_scheduled_call_is_idempotent() {
    let (_, service) = plain_service();
    let session = service.create_session(request(Uuid::new_v4())).await.unwrap();
    service.start_session(session.id).await.unwrap();

    service.schedule_next_call(session.id, Duration::from_millis(30));
    service.cancel_next_call(session.id);
    service.cancel_next_call(session.id);
    // Cancelling a session that never scheduled is also fine.
    service.cancel_next_call(Uuid::new_v4());

    tokio::time::sleep(Duration::from_millis(80)).await;
    let current = service.get_session(session.id).await.unwrap();
    assert!(current.called_numbers.is_empty());
}

#[tokio::test]
async fn pausing_cancels_the_pending_auto_call() {
    let (_, service) = plain_service();
    let session = service.create_session(request(Uuid::new_v4())).await.unwrap();
    service.start_session(session.id).await.unwrap();

    service.schedule_next_call(session.id, Duration::from_millis(30));
    service.pause_session(session.id).await.unwrap();

    tokio::time::sleep(Duration::from_millis(80)).await;
    let current = service.get_session(session.id).await.unwrap();
    assert!(current.called_numbers.is_empty());
}
