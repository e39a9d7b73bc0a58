//! Payment routes
//!
//! # Route list
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /api/payments/mpesa/confirm | POST | Gateway confirmation webhook |
//! | /api/payments/mpesa/stk | POST | Initiate STK push + reconciliation |
//! | /api/payments/history/{invoice_id} | GET | Settlement history, newest first |
//!
//! The confirmation webhook answers in the gateway's result format:
//! `ResultCode` stays 0 even when partial failures occurred; failures
//! surface only in `Errors`.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use shared::models::{PaymentEvent, PaymentHistoryEntry};
use shared::money::to_decimal;
use shared::{ApiError, ApiResponse, ApiResult, ExecutionContext};

use crate::core::ServerState;
use crate::store::{InvoiceStore, SettlementStore};

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/payments/mpesa/confirm", post(confirm_mpesa))
        .route("/api/payments/mpesa/stk", post(initiate_stk))
        .route("/api/payments/history/{invoice_id}", get(payment_history))
}

// ============================================================================
// Confirmation webhook
// ============================================================================

/// Inbound confirmation payload, field names fixed by the gateway
#[derive(Debug, Deserialize)]
pub struct MpesaConfirmation {
    #[serde(rename = "TransTime")]
    pub trans_time: String,
    #[serde(rename = "TransAmount")]
    pub trans_amount: f64,
    #[serde(rename = "BillRefNumber", default)]
    pub bill_ref_number: Option<String>,
    #[serde(rename = "TransID")]
    pub trans_id: String,
    #[serde(rename = "MSISDN")]
    pub msisdn: String,
}

#[derive(Debug, Serialize)]
pub struct MpesaConfirmResponse {
    #[serde(rename = "ResultCode")]
    pub result_code: i32,
    #[serde(rename = "ResultDesc")]
    pub result_desc: String,
    #[serde(rename = "PaymentEntriesCreated")]
    pub payment_entries_created: Vec<String>,
    #[serde(rename = "Errors")]
    pub errors: Vec<String>,
}

/// Convert the gateway's compact `YYYYMMDDHHMMSS` timestamp to ISO form.
/// An invalid format is a fatal input error for the call.
fn convert_trans_time(raw: &str) -> ApiResult<String> {
    NaiveDateTime::parse_from_str(raw, "%Y%m%d%H%M%S")
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .map_err(|_| ApiError::validation(format!("Invalid transaction time format: {}", raw)))
}

pub async fn confirm_mpesa(
    State(state): State<ServerState>,
    Json(payload): Json<MpesaConfirmation>,
) -> ApiResult<Json<MpesaConfirmResponse>> {
    // Input validation is fatal; no partial processing afterwards
    let trans_time = convert_trans_time(&payload.trans_time)?;
    if !payload.trans_amount.is_finite() || payload.trans_amount <= 0.0 {
        return Err(ApiError::validation(format!(
            "Transaction amount must be positive, got {}",
            payload.trans_amount
        )));
    }

    let payment = PaymentEvent {
        trans_id: payload.trans_id,
        trans_time,
        amount: to_decimal(payload.trans_amount),
        bill_ref: payload.bill_ref_number.filter(|s| !s.is_empty()),
        msisdn: payload.msisdn,
    };

    let result = state
        .allocator
        .allocate(&ExecutionContext::system(), &payment)
        .await;

    Ok(Json(MpesaConfirmResponse {
        result_code: 0,
        result_desc: "Transaction successfully processed".to_string(),
        payment_entries_created: result.settlements.iter().map(|s| s.id.clone()).collect(),
        errors: result.errors,
    }))
}

// ============================================================================
// STK push initiation
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StkPushRequest {
    pub phone: String,
    pub amount: f64,
    pub invoice_id: String,
}

#[derive(Debug, Serialize)]
pub struct StkPushResponse {
    pub request_id: String,
    /// Reference the reconciler polls; equals the invoice id
    pub external_reference: String,
}

pub async fn initiate_stk(
    State(state): State<ServerState>,
    Json(payload): Json<StkPushRequest>,
) -> ApiResult<Json<ApiResponse<StkPushResponse>>> {
    if !payload.amount.is_finite() || payload.amount <= 0.0 {
        return Err(ApiError::validation(format!(
            "Amount must be positive, got {}",
            payload.amount
        )));
    }
    let invoice = state
        .store
        .get(&payload.invoice_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("invoice {}", payload.invoice_id)))?;

    let request_id = state
        .gateway
        .initiate_stk_push(&payload.phone, to_decimal(payload.amount), &invoice.id)
        .await
        .map_err(|e| ApiError::gateway(e.to_string()))?;

    tracing::info!(
        invoice_id = %invoice.id,
        request_id = %request_id,
        "STK push initiated, scheduling reconciliation"
    );
    state
        .reconciler
        .spawn(invoice.id.clone(), state.shutdown.child_token());

    Ok(Json(ApiResponse::ok(StkPushResponse {
        request_id,
        external_reference: invoice.id,
    })))
}

// ============================================================================
// Payment history
// ============================================================================

pub async fn payment_history(
    State(state): State<ServerState>,
    Path(invoice_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Vec<PaymentHistoryEntry>>>> {
    let settlements = state.store.history_for_invoice(&invoice_id).await?;

    let entries = settlements
        .into_iter()
        .map(|s| PaymentHistoryEntry {
            invoice_id: s.invoice_id,
            trans_id: s.trans_id,
            trans_time: DateTime::from_timestamp_millis(s.created_at)
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
            amount: s.amount,
            paid_from: s.paid_from,
            outstanding_after: s.outstanding_after,
        })
        .collect();

    Ok(Json(ApiResponse::ok(entries)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trans_time_conversion() {
        assert_eq!(
            convert_trans_time("20260801143000").unwrap(),
            "2026-08-01 14:30:00"
        );
    }

    #[test]
    fn invalid_trans_time_is_fatal() {
        assert!(convert_trans_time("2026-08-01").is_err());
        assert!(convert_trans_time("not-a-time").is_err());
        // 13th month
        assert!(convert_trans_time("20261301143000").is_err());
    }
}
