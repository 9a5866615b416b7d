//! In-memory store for tests and local development.
//!
//! Implements every repository trait over mutex-guarded maps. Atomicity of
//! the coarse jackpot operations falls out of holding the lock for the
//! whole mutation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::repository::{
    AuditRepository, CardRepository, JackpotRepository, SessionRepository,
};
use super::StoreResult;
use crate::game::calling::CallAuditRecord;
use crate::game::entities::{Card, CardId, GameSession, SessionId, TenantId};
use crate::jackpot::models::{FutureWinnerConfig, JackpotLedgerEntry, JackpotRecord};

#[derive(Default)]
struct Inner {
    sessions: HashMap<SessionId, GameSession>,
    session_numbers: HashMap<(TenantId, i64), SessionId>,
    counters: HashMap<TenantId, i64>,
    cards: HashMap<CardId, Card>,
    records: HashMap<TenantId, JackpotRecord>,
    entries: Vec<JackpotLedgerEntry>,
    future_configs: Vec<FutureWinnerConfig>,
    audits: Vec<CallAuditRecord>,
}

/// Shared in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load cards into the read-only catalog.
    pub fn seed_cards(&self, cards: impl IntoIterator<Item = Card>) {
        let mut inner = self.inner.lock().unwrap();
        for card in cards {
            inner.cards.insert(card.id, card);
        }
    }

    /// Generate and seed `count` random catalog cards with ids `1..=count`.
    pub fn seed_generated_cards(&self, count: usize) {
        let mut rng = rand::rng();
        let cards: Vec<Card> = (1..=count as CardId)
            .map(|id| Card::generate(id, &mut rng))
            .collect();
        self.seed_cards(cards);
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn next_session_number(&self, tenant_id: TenantId) -> StoreResult<i64> {
        let mut inner = self.inner.lock().unwrap();
        let counter = inner.counters.entry(tenant_id).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn insert_session(&self, session: &GameSession) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .session_numbers
            .insert((session.tenant_id, session.session_number), session.id);
        inner.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn update_session(&self, session: &GameSession) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> StoreResult<Option<GameSession>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.sessions.get(&id).cloned())
    }

    async fn get_session_by_number(
        &self,
        tenant_id: TenantId,
        session_number: i64,
    ) -> StoreResult<Option<GameSession>> {
        let inner = self.inner.lock().unwrap();
        let id = inner.session_numbers.get(&(tenant_id, session_number));
        Ok(id.and_then(|id| inner.sessions.get(id)).cloned())
    }

    async fn list_sessions(&self, tenant_id: TenantId) -> StoreResult<Vec<GameSession>> {
        let inner = self.inner.lock().unwrap();
        let mut sessions: Vec<GameSession> = inner
            .sessions
            .values()
            .filter(|s| s.tenant_id == tenant_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.session_number);
        Ok(sessions)
    }
}

#[async_trait]
impl CardRepository for MemoryStore {
    async fn get_card(&self, id: CardId) -> StoreResult<Option<Card>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.cards.get(&id).cloned())
    }

    async fn get_cards(&self, ids: &[CardId]) -> StoreResult<Vec<Card>> {
        let inner = self.inner.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| inner.cards.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl JackpotRepository for MemoryStore {
    async fn get_record(&self, tenant_id: TenantId) -> StoreResult<Option<JackpotRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.records.get(&tenant_id).cloned())
    }

    async fn save_record_with_entry(
        &self,
        record: &JackpotRecord,
        entry: Option<&JackpotLedgerEntry>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.records.insert(record.tenant_id, record.clone());
        if let Some(entry) = entry {
            inner.entries.push(entry.clone());
        }
        Ok(())
    }

    async fn get_entry(&self, id: Uuid) -> StoreResult<Option<JackpotLedgerEntry>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.entries.iter().find(|e| e.id == id).cloned())
    }

    async fn list_entries(
        &self,
        tenant_id: TenantId,
        limit: usize,
    ) -> StoreResult<Vec<JackpotLedgerEntry>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .entries
            .iter()
            .rev()
            .filter(|e| e.tenant_id == tenant_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update_entry_with_record(
        &self,
        entry: &JackpotLedgerEntry,
        record: &JackpotRecord,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.entries.iter_mut().find(|e| e.id == entry.id) {
            *existing = entry.clone();
        }
        inner.records.insert(record.tenant_id, record.clone());
        Ok(())
    }

    async fn delete_entry_with_record(
        &self,
        entry_id: Uuid,
        record: &JackpotRecord,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.retain(|e| e.id != entry_id);
        inner.records.insert(record.tenant_id, record.clone());
        Ok(())
    }

    async fn insert_future_config(&self, config: &FutureWinnerConfig) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.future_configs.push(config.clone());
        Ok(())
    }

    async fn take_future_config(
        &self,
        tenant_id: TenantId,
        session_number: i64,
    ) -> StoreResult<Option<FutureWinnerConfig>> {
        let mut inner = self.inner.lock().unwrap();
        let found = inner.future_configs.iter_mut().find(|c| {
            c.tenant_id == tenant_id && c.session_number == session_number && !c.used
        });
        Ok(found.map(|config| {
            config.used = true;
            config.clone()
        }))
    }
}

#[async_trait]
impl AuditRepository for MemoryStore {
    async fn append_audit(&self, record: &CallAuditRecord) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.audits.push(record.clone());
        Ok(())
    }

    async fn list_audits_for_session(
        &self,
        session_id: SessionId,
    ) -> StoreResult<Vec<CallAuditRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .audits
            .iter()
            .filter(|a| a.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn purge_audits_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.audits.len();
        inner.audits.retain(|a| a.created_at >= cutoff);
        Ok((before - inner.audits.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn session_numbers_increment_atomically() {
        let store = MemoryStore::new();
        let tenant = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert_eq!(store.next_session_number(tenant).await.unwrap(), 1);
        assert_eq!(store.next_session_number(tenant).await.unwrap(), 2);
        assert_eq!(store.next_session_number(other).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn future_config_is_consumed_once() {
        let store = MemoryStore::new();
        let tenant = Uuid::new_v4();
        let config = FutureWinnerConfig {
            tenant_id: tenant,
            session_number: 5,
            card_id: 1,
            pattern: None,
            required_numbers: vec![1, 2],
            forced_call_sequence: vec![1, 2, 3],
            jackpot_amount: None,
            jackpot_message: None,
            used: false,
            created_at: Utc::now(),
        };
        store.insert_future_config(&config).await.unwrap();

        let taken = store.take_future_config(tenant, 5).await.unwrap();
        assert!(taken.is_some());
        let again = store.take_future_config(tenant, 5).await.unwrap();
        assert!(again.is_none(), "config is marked used after the first take");
    }
}
