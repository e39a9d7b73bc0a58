//! Receipt notification boundary
//!
//! One receipt per successful settlement. Delivery is handled by an
//! external mail collaborator; a failed send is recorded by the caller and
//! never affects the committed allocation.

use async_trait::async_trait;
use shared::models::Settlement;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification dispatch failed: {0}")]
    Dispatch(String),
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Send a payment receipt for one settlement
    async fn send_receipt(&self, settlement: &Settlement) -> Result<(), NotifyError>;
}

/// Logs receipts instead of dispatching them.
///
/// Stands in for the external email collaborator; the allocation path only
/// cares that sends are attempted and that failures stay non-fatal.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSender for LogNotifier {
    async fn send_receipt(&self, settlement: &Settlement) -> Result<(), NotifyError> {
        tracing::info!(
            invoice_id = %settlement.invoice_id,
            trans_id = %settlement.trans_id,
            amount = %settlement.amount,
            "Payment receipt for settlement {}",
            settlement.id
        );
        Ok(())
    }
}
