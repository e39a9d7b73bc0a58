//! Invoice model
//!
//! Invoices live in the external accounting collaborator; this is the
//! referenced shape the billing core reads and settles against. The
//! outstanding balance is the one piece of mutable shared state and is
//! only written through the store's serialized-update contract.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Open,
    Paid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub customer: String,
    pub total: Decimal,
    pub outstanding: Decimal,
    pub status: InvoiceStatus,
    /// Unix millis, FIFO allocation key
    pub created_at: i64,
}

impl Invoice {
    pub fn is_open(&self) -> bool {
        self.status != InvoiceStatus::Paid
    }
}
