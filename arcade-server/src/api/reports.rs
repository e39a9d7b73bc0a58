//! Reporting routes
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /api/reports/daily | GET | Billing summary for one UTC day |

use axum::{Json, Router, extract::Query, extract::State, routing::get};
use chrono::{NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{Invoice, InvoiceStatus};
use shared::{ApiError, ApiResponse, ApiResult};

use crate::core::ServerState;
use crate::store::InvoiceStore;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/reports/daily", get(daily_report))
}

#[derive(Debug, Deserialize)]
pub struct DailyReportQuery {
    /// `YYYY-MM-DD`, defaults to today (UTC)
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DailyReport {
    pub date: String,
    pub invoice_count: usize,
    pub paid_count: usize,
    /// Sum of invoice totals issued on the day
    pub total_expected: Decimal,
    /// Collected so far against the day's invoices
    pub total_paid: Decimal,
    /// Still outstanding
    pub total_unpaid: Decimal,
    pub invoices: Vec<Invoice>,
}

pub async fn daily_report(
    State(state): State<ServerState>,
    Query(query): Query<DailyReportQuery>,
) -> ApiResult<Json<ApiResponse<DailyReport>>> {
    let date = match query.date {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map_err(|_| ApiError::validation(format!("Invalid date: {}", raw)))?,
        None => Utc::now().date_naive(),
    };

    let start_ms = date.and_time(NaiveTime::MIN).and_utc().timestamp_millis();
    let end_ms = start_ms + 24 * 60 * 60 * 1000;

    let invoices = state.store.list_created_between(start_ms, end_ms).await?;

    let mut total_expected = Decimal::ZERO;
    let mut total_unpaid = Decimal::ZERO;
    let mut paid_count = 0;
    for invoice in &invoices {
        total_expected += invoice.total;
        total_unpaid += invoice.outstanding;
        if invoice.status == InvoiceStatus::Paid {
            paid_count += 1;
        }
    }

    Ok(Json(ApiResponse::ok(DailyReport {
        date: date.format("%Y-%m-%d").to_string(),
        invoice_count: invoices.len(),
        paid_count,
        total_expected,
        total_paid: total_expected - total_unpaid,
        total_unpaid,
        invoices,
    })))
}
