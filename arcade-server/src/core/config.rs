//! Server configuration

use std::time::Duration;

use crate::reconcile::ReconcileConfig;

/// Configuration for the billing server
#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub environment: String,

    // Payment gateway
    pub gateway_base_url: String,
    pub gateway_api_key: String,

    // Reconciliation polling
    pub pending_poll_secs: u64,
    pub error_poll_secs: u64,
    pub reconcile_max_attempts: u32,

    // Logging
    pub log_dir: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            gateway_base_url: std::env::var("GATEWAY_BASE_URL")
                .unwrap_or_else(|_| "https://tinypesa.com/api/v1".into()),
            gateway_api_key: std::env::var("GATEWAY_API_KEY").unwrap_or_default(),
            pending_poll_secs: std::env::var("PENDING_POLL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            error_poll_secs: std::env::var("ERROR_POLL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            reconcile_max_attempts: std::env::var("RECONCILE_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            log_dir: std::env::var("LOG_DIR").ok(),
        }
    }

    /// Retry timing for the polling reconciler
    pub fn reconcile_config(&self) -> ReconcileConfig {
        ReconcileConfig {
            pending_delay: Duration::from_secs(self.pending_poll_secs),
            error_delay: Duration::from_secs(self.error_poll_secs),
            max_attempts: self.reconcile_max_attempts,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
