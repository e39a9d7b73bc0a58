//! In-memory store implementation
//!
//! Backs the server and the test suite. DashMap entry locks give the
//! per-invoice atomicity the serialized-update contract requires; the
//! optimistic `expected_outstanding` check rejects interleaved writers.

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use shared::models::{
    AuditRecord, Game, GameSession, GameSpace, Invoice, InvoiceStatus, SessionStatus, Settlement,
};
use std::sync::RwLock;

use super::{AuditStore, InvoiceStore, SessionStore, SettlementStore, StoreError};

/// In-memory backing store for all record types
#[derive(Debug, Default)]
pub struct MemoryStore {
    invoices: DashMap<String, Invoice>,
    settlements: RwLock<Vec<Settlement>>,
    audits: RwLock<Vec<AuditRecord>>,
    spaces: DashMap<String, GameSpace>,
    games: DashMap<String, Game>,
    sessions: DashMap<String, GameSession>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Audit records written so far (test inspection)
    #[cfg(test)]
    pub fn audit_records(&self) -> Vec<AuditRecord> {
        self.audits.read().expect("audit lock poisoned").clone()
    }
}

#[async_trait]
impl InvoiceStore for MemoryStore {
    async fn insert(&self, invoice: Invoice) -> Result<(), StoreError> {
        self.invoices.insert(invoice.id.clone(), invoice);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Invoice>, StoreError> {
        Ok(self.invoices.get(id).map(|inv| inv.clone()))
    }

    async fn find_exact_open(
        &self,
        id: &str,
        amount: Decimal,
    ) -> Result<Option<Invoice>, StoreError> {
        Ok(self
            .invoices
            .get(id)
            .filter(|inv| inv.is_open() && inv.outstanding == amount)
            .map(|inv| inv.clone()))
    }

    async fn list_open_fifo(&self) -> Result<Vec<Invoice>, StoreError> {
        let mut open: Vec<Invoice> = self
            .invoices
            .iter()
            .filter(|inv| inv.is_open())
            .map(|inv| inv.clone())
            .collect();
        open.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(open)
    }

    async fn list_created_between(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Invoice>, StoreError> {
        let mut rows: Vec<Invoice> = self
            .invoices
            .iter()
            .filter(|inv| inv.created_at >= start_ms && inv.created_at < end_ms)
            .map(|inv| inv.clone())
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(rows)
    }

    async fn apply_settlement(
        &self,
        invoice_id: &str,
        amount: Decimal,
        expected_outstanding: Decimal,
    ) -> Result<Decimal, StoreError> {
        // Entry lock holds the whole read-modify-write for this invoice
        let mut entry = self
            .invoices
            .get_mut(invoice_id)
            .ok_or_else(|| StoreError::NotFound(format!("invoice {}", invoice_id)))?;

        if !entry.is_open() {
            return Err(StoreError::Conflict(format!(
                "invoice {} is already paid",
                invoice_id
            )));
        }
        if entry.outstanding != expected_outstanding {
            return Err(StoreError::Conflict(format!(
                "invoice {} outstanding changed (expected {}, found {})",
                invoice_id, expected_outstanding, entry.outstanding
            )));
        }

        let after = (entry.outstanding - amount).max(Decimal::ZERO);
        entry.outstanding = after;
        if after == Decimal::ZERO {
            entry.status = InvoiceStatus::Paid;
        }
        Ok(after)
    }
}

#[async_trait]
impl SettlementStore for MemoryStore {
    async fn insert(&self, settlement: Settlement) -> Result<(), StoreError> {
        self.settlements
            .write()
            .map_err(|_| StoreError::Unavailable("settlement lock poisoned".into()))?
            .push(settlement);
        Ok(())
    }

    async fn history_for_invoice(&self, invoice_id: &str) -> Result<Vec<Settlement>, StoreError> {
        let mut rows: Vec<Settlement> = self
            .settlements
            .read()
            .map_err(|_| StoreError::Unavailable("settlement lock poisoned".into()))?
            .iter()
            .filter(|s| s.invoice_id == invoice_id)
            .cloned()
            .collect();
        // Newest first; reverse before the stable sort so same-millisecond
        // settlements keep reverse insertion order
        rows.reverse();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn insert(&self, record: AuditRecord) -> Result<(), StoreError> {
        self.audits
            .write()
            .map_err(|_| StoreError::Unavailable("audit lock poisoned".into()))?
            .push(record);
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn upsert_space(&self, space: GameSpace) -> Result<(), StoreError> {
        self.spaces.insert(space.id.clone(), space);
        Ok(())
    }

    async fn get_space(&self, id: &str) -> Result<Option<GameSpace>, StoreError> {
        Ok(self.spaces.get(id).map(|s| s.clone()))
    }

    async fn set_space_occupied(&self, id: &str, occupied: bool) -> Result<(), StoreError> {
        let mut space = self
            .spaces
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("game space {}", id)))?;
        space.occupied = occupied;
        Ok(())
    }

    async fn upsert_game(&self, game: Game) -> Result<(), StoreError> {
        self.games.insert(game.id.clone(), game);
        Ok(())
    }

    async fn get_game(&self, id: &str) -> Result<Option<Game>, StoreError> {
        Ok(self.games.get(id).map(|g| g.clone()))
    }

    async fn insert_session(&self, session: GameSession) -> Result<(), StoreError> {
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<GameSession>, StoreError> {
        Ok(self.sessions.get(id).map(|s| s.clone()))
    }

    async fn find_open_by_space(
        &self,
        space_id: &str,
    ) -> Result<Option<GameSession>, StoreError> {
        Ok(self
            .sessions
            .iter()
            .find(|s| s.space_id == space_id && s.is_open())
            .map(|s| s.clone()))
    }

    async fn finalize_session(&self, session: GameSession) -> Result<(), StoreError> {
        let mut entry = self
            .sessions
            .get_mut(&session.id)
            .ok_or_else(|| StoreError::NotFound(format!("session {}", session.id)))?;
        if entry.status == SessionStatus::Closed {
            return Err(StoreError::Conflict(format!(
                "session {} is already closed",
                session.id
            )));
        }
        *entry = session;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // Only InvoiceStore here: a glob would pull in the other store traits
    // and make the `insert` calls ambiguous
    use super::{InvoiceStore, MemoryStore, SessionStore, StoreError};
    use rust_decimal::Decimal;
    use shared::models::{
        AuditRecord, GameSession, Invoice, InvoiceStatus, SessionStatus, Settlement,
    };
    use shared::util::now_millis;

    fn invoice(id: &str, outstanding: i64, created_at: i64) -> Invoice {
        Invoice {
            id: id.to_string(),
            customer: "Walkin".to_string(),
            total: Decimal::from(outstanding),
            outstanding: Decimal::from(outstanding),
            status: InvoiceStatus::Open,
            created_at,
        }
    }

    #[tokio::test]
    async fn record_inserts_resolve_per_trait() {
        let store = MemoryStore::new();
        store.insert(invoice("INV-1", 100, 1)).await.unwrap();
        super::SettlementStore::insert(
            &store,
            Settlement {
                id: "S-1".to_string(),
                invoice_id: "INV-1".to_string(),
                trans_id: "TX1".to_string(),
                amount: Decimal::from(100),
                paid_from: "0712345678".to_string(),
                outstanding_after: Decimal::ZERO,
                created_at: 1,
            },
        )
        .await
        .unwrap();
        super::AuditStore::insert(
            &store,
            AuditRecord {
                id: "A-1".to_string(),
                trans_id: "TX1".to_string(),
                trans_time: "2026-08-01 12:00:00".to_string(),
                amount: Decimal::from(100),
                bill_ref: Some("INV-1".to_string()),
                msisdn: "0712345678".to_string(),
                unallocated: Decimal::ZERO,
                actor: "system".to_string(),
                created_at: 1,
            },
        )
        .await
        .unwrap();

        // Each record landed in its own collection
        assert!(store.get("INV-1").await.unwrap().is_some());
        let history = super::SettlementStore::history_for_invoice(&store, "INV-1")
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(store.audit_records().len(), 1);
    }

    #[tokio::test]
    async fn fifo_orders_by_creation_then_id() {
        let store = MemoryStore::new();
        store.insert(invoice("INV-B", 100, 200)).await.unwrap();
        store.insert(invoice("INV-C", 100, 100)).await.unwrap();
        store.insert(invoice("INV-A", 100, 200)).await.unwrap();

        let open = store.list_open_fifo().await.unwrap();
        let ids: Vec<&str> = open.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["INV-C", "INV-A", "INV-B"]);
    }

    #[tokio::test]
    async fn apply_settlement_checks_expected_outstanding() {
        let store = MemoryStore::new();
        store.insert(invoice("INV-1", 500, now_millis())).await.unwrap();

        // Stale expectation is rejected without a write
        let err = store
            .apply_settlement("INV-1", Decimal::from(100), Decimal::from(400))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        let inv = store.get("INV-1").await.unwrap().unwrap();
        assert_eq!(inv.outstanding, Decimal::from(500));

        // Matching expectation decrements and flips to paid at zero
        let after = store
            .apply_settlement("INV-1", Decimal::from(500), Decimal::from(500))
            .await
            .unwrap();
        assert_eq!(after, Decimal::ZERO);
        let inv = store.get("INV-1").await.unwrap().unwrap();
        assert_eq!(inv.status, InvoiceStatus::Paid);

        // Paid invoices reject further settlements
        let err = store
            .apply_settlement("INV-1", Decimal::from(1), Decimal::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn exact_match_requires_equality() {
        let store = MemoryStore::new();
        store.insert(invoice("INV-1", 500, now_millis())).await.unwrap();

        assert!(store
            .find_exact_open("INV-1", Decimal::from(500))
            .await
            .unwrap()
            .is_some());
        // A <= match is not an exact match
        assert!(store
            .find_exact_open("INV-1", Decimal::from(300))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn closed_sessions_are_immutable() {
        let store = MemoryStore::new();
        let mut session = GameSession {
            id: "GS-1".to_string(),
            space_id: "SP-1".to_string(),
            game_id: "G-1".to_string(),
            started_at: 0,
            ended_at: None,
            duration_secs: None,
            status: SessionStatus::Open,
            invoice_id: None,
            created_by: "op".to_string(),
        };
        store.insert_session(session.clone()).await.unwrap();

        session.status = SessionStatus::Closed;
        session.ended_at = Some(60_000);
        session.duration_secs = Some(60);
        store.finalize_session(session.clone()).await.unwrap();

        // Second close is rejected
        let err = store.finalize_session(session).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
