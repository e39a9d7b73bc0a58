//! Store collaborator boundary
//!
//! Invoice, settlement, audit and session records live in an external
//! persistence collaborator; the billing core only speaks to it through
//! these traits. `InvoiceStore::apply_settlement` is the serialized-update
//! contract: read-decrement-write of one invoice's outstanding balance is
//! atomic per invoice, guarded by an optimistic check on the expected
//! balance.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{AuditRecord, Game, GameSession, GameSpace, Invoice, Settlement};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    /// Optimistic-concurrency check failed on an invoice update
    #[error("concurrent update on {0}")]
    Conflict(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for shared::ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(resource) => shared::ApiError::not_found(resource),
            StoreError::Conflict(resource) => shared::ApiError::conflict(resource),
            StoreError::Unavailable(message) => shared::ApiError::storage(message),
        }
    }
}

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn insert(&self, invoice: Invoice) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<Invoice>, StoreError>;

    /// Exact-match lookup for phase 1 allocation: id equals the reference,
    /// outstanding equals the payment amount, status is not paid.
    async fn find_exact_open(
        &self,
        id: &str,
        amount: Decimal,
    ) -> Result<Option<Invoice>, StoreError>;

    /// Open invoices ordered by creation time ascending, ties broken by
    /// identifier ascending.
    async fn list_open_fifo(&self) -> Result<Vec<Invoice>, StoreError>;

    /// Invoices created in `[start_ms, end_ms)`, for reporting
    async fn list_created_between(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Invoice>, StoreError>;

    /// Decrement the outstanding balance by `amount`, atomically per
    /// invoice. `expected_outstanding` is the balance the caller read;
    /// a mismatch fails with [`StoreError::Conflict`] and no write.
    /// Returns the outstanding balance after the decrement.
    async fn apply_settlement(
        &self,
        invoice_id: &str,
        amount: Decimal,
        expected_outstanding: Decimal,
    ) -> Result<Decimal, StoreError>;
}

#[async_trait]
pub trait SettlementStore: Send + Sync {
    async fn insert(&self, settlement: Settlement) -> Result<(), StoreError>;

    /// Settlements against one invoice, newest first
    async fn history_for_invoice(&self, invoice_id: &str) -> Result<Vec<Settlement>, StoreError>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn insert(&self, record: AuditRecord) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn upsert_space(&self, space: GameSpace) -> Result<(), StoreError>;
    async fn get_space(&self, id: &str) -> Result<Option<GameSpace>, StoreError>;
    async fn set_space_occupied(&self, id: &str, occupied: bool) -> Result<(), StoreError>;

    async fn upsert_game(&self, game: Game) -> Result<(), StoreError>;
    async fn get_game(&self, id: &str) -> Result<Option<Game>, StoreError>;

    async fn insert_session(&self, session: GameSession) -> Result<(), StoreError>;
    async fn get_session(&self, id: &str) -> Result<Option<GameSession>, StoreError>;
    async fn find_open_by_space(&self, space_id: &str)
    -> Result<Option<GameSession>, StoreError>;

    /// Replace a session record with its closed form. Fails if the stored
    /// session is already closed; closed sessions are immutable.
    async fn finalize_session(&self, session: GameSession) -> Result<(), StoreError>;
}
