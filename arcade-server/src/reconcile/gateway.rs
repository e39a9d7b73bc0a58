//! Payment gateway client
//!
//! Boundary to the TinyPesa-style mobile-money gateway: STK push
//! initiation and transaction status polling. Only the payload shapes and
//! the retry contract matter here; the gateway's own transaction
//! lifecycle stays on its side.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::models::GatewayStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway transport failure: {0}")]
    Transport(String),
    #[error("gateway rejected request: {0}")]
    Rejected(String),
}

/// Result of one status poll
#[derive(Debug)]
pub enum PollOutcome {
    /// Transaction complete, payload carries the confirmed amount
    Confirmed(GatewayStatus),
    /// Transaction known but not complete yet
    Incomplete,
    /// Transport failure or non-success response
    Unavailable(String),
}

#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Poll transaction status by external reference
    async fn poll_status(&self, external_ref: &str) -> PollOutcome;

    /// Initiate an STK push; returns the gateway request id
    async fn initiate_stk_push(
        &self,
        phone: &str,
        amount: Decimal,
        invoice_id: &str,
    ) -> Result<String, GatewayError>;
}

/// Normalize a phone number to the local `07XXXXXXXX` form the gateway
/// expects (`+2547XXXXXXXX` -> `07XXXXXXXX`)
pub fn normalize_msisdn(phone: &str) -> String {
    match phone.strip_prefix("+254") {
        Some(rest) => format!("0{}", rest),
        None => phone.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct InitializeResponse {
    success: Option<String>,
    request_id: Option<String>,
}

/// HTTP client for the TinyPesa express API
#[derive(Debug, Clone)]
pub struct TinyPesaClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl TinyPesaClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl GatewayClient for TinyPesaClient {
    async fn poll_status(&self, external_ref: &str) -> PollOutcome {
        let url = format!("{}/express/get_status/{}/", self.base_url, external_ref);
        let response = match self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .header("ApiKey", &self.api_key)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return PollOutcome::Unavailable(e.to_string()),
        };

        if !response.status().is_success() {
            return PollOutcome::Unavailable(format!("status {}", response.status()));
        }

        match response.json::<GatewayStatus>().await {
            Ok(status) if status.is_confirmed() => PollOutcome::Confirmed(status),
            Ok(_) => PollOutcome::Incomplete,
            Err(e) => PollOutcome::Unavailable(format!("invalid status payload: {}", e)),
        }
    }

    async fn initiate_stk_push(
        &self,
        phone: &str,
        amount: Decimal,
        invoice_id: &str,
    ) -> Result<String, GatewayError> {
        let msisdn = normalize_msisdn(phone);
        let url = format!("{}/express/initialize", self.base_url);

        let response = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .header("ApiKey", &self.api_key)
            .form(&[
                ("amount", amount.to_string()),
                ("msisdn", msisdn),
                ("account_no", invoice_id.to_string()),
            ])
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected(format!("{}: {}", status, body)));
        }

        let parsed: InitializeResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if parsed.success.as_deref() == Some("true") {
            parsed
                .request_id
                .ok_or_else(|| GatewayError::Rejected("missing request_id".into()))
        } else {
            Err(GatewayError::Rejected(format!(
                "initialization not accepted (success={:?})",
                parsed.success
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_international_prefix() {
        assert_eq!(normalize_msisdn("+254712345678"), "0712345678");
        assert_eq!(normalize_msisdn("0712345678"), "0712345678");
    }
}
