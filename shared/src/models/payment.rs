//! Payment event, settlement and gateway payload models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An incoming mobile-money payment notification, validated at the boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    /// Gateway transaction id, used as the settlement reference
    pub trans_id: String,
    /// ISO `YYYY-MM-DD HH:MM:SS`, converted from the gateway's compact form
    pub trans_time: String,
    pub amount: Decimal,
    /// Optional invoice identifier hint
    pub bill_ref: Option<String>,
    /// Sender phone number
    pub msisdn: String,
}

/// One settlement record linking a payment to one invoice.
///
/// Created only by the allocator, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub id: String,
    pub invoice_id: String,
    pub trans_id: String,
    pub amount: Decimal,
    /// Originating account (sender phone)
    pub paid_from: String,
    /// Invoice outstanding balance after this settlement
    pub outstanding_after: Decimal,
    /// Unix millis
    pub created_at: i64,
}

/// Audit record summarizing one processed payment event.
///
/// Written once per `allocate()` call, whether or not any settlement
/// succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: String,
    pub trans_id: String,
    pub trans_time: String,
    pub amount: Decimal,
    pub bill_ref: Option<String>,
    pub msisdn: String,
    /// Remainder the sweep could not place
    pub unallocated: Decimal,
    /// Acting identity from the execution context
    pub actor: String,
    /// Unix millis
    pub created_at: i64,
}

/// Gateway polling status payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayStatus {
    /// 0/1 completion flag
    pub is_complete: u8,
    pub amount: Decimal,
    pub msisdn: String,
    #[serde(default)]
    pub sync_status: Option<String>,
    pub external_reference: String,
    #[serde(default)]
    pub mpesa_receipt: Option<String>,
    #[serde(default)]
    pub link_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl GatewayStatus {
    pub fn is_confirmed(&self) -> bool {
        self.is_complete == 1
    }
}

/// Entry in the payment-history view for one invoice (newest first)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentHistoryEntry {
    pub invoice_id: String,
    pub trans_id: String,
    /// ISO timestamp of the settlement
    pub trans_time: String,
    pub amount: Decimal,
    pub paid_from: String,
    pub outstanding_after: Decimal,
}
