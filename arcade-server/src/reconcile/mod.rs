//! Polling Reconciler
//!
//! Asynchronously confirms a gateway transaction and hands the confirmed
//! amount to the payment allocator. State machine per external reference:
//!
//! ```text
//! PENDING --poll complete--------> CONFIRMED (terminal, allocates)
//! PENDING --poll incomplete------> PENDING (reschedule, short delay)
//! PENDING --transport failure----> PENDING (reschedule, long delay)
//! PENDING --max attempts reached-> FAILED (terminal, surfaced to operator)
//! ```
//!
//! Attempt count and the retry cap are explicit; the task never retries
//! forever. Each task is an independent tokio task keyed by the external
//! reference, cancellation-token aware.

mod gateway;

pub use gateway::{GatewayClient, GatewayError, PollOutcome, TinyPesaClient, normalize_msisdn};

use chrono::Utc;
use shared::ExecutionContext;
use shared::models::{GatewayStatus, PaymentEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::allocation::{AllocationResult, PaymentAllocator};

/// Retry timing and cap for reconciliation polling
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Delay after a clean "not complete yet" poll
    pub pending_delay: Duration,
    /// Delay after a transport failure or non-success response
    pub error_delay: Duration,
    /// Attempts before giving up with a terminal failure
    pub max_attempts: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            pending_delay: Duration::from_secs(30),
            error_delay: Duration::from_secs(60),
            max_attempts: 20,
        }
    }
}

/// Terminal (or interrupted) state of one reconciliation task
#[derive(Debug, PartialEq, Eq)]
pub enum TaskState {
    /// Interrupted by shutdown before reaching a terminal state
    Pending { attempts: u32 },
    Confirmed,
    Failed { reason: String },
}

/// Result of a single poll step
#[derive(Debug)]
pub enum PollStep {
    /// Gateway confirmed; allocation has been executed
    Confirmed(AllocationResult),
    /// Try again after the given delay
    Retry(Duration),
}

#[derive(Clone)]
pub struct Reconciler {
    gateway: Arc<dyn GatewayClient>,
    allocator: PaymentAllocator,
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(
        gateway: Arc<dyn GatewayClient>,
        allocator: PaymentAllocator,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            gateway,
            allocator,
            config,
        }
    }

    /// One poll of the gateway; allocates on confirmation.
    ///
    /// Transient gateway failures are never surfaced to a caller, they
    /// only select the retry delay.
    pub async fn poll_once(&self, external_ref: &str) -> PollStep {
        match self.gateway.poll_status(external_ref).await {
            PollOutcome::Confirmed(status) => {
                tracing::info!(
                    external_ref = %external_ref,
                    amount = %status.amount,
                    "Gateway confirmed transaction"
                );
                let payment = payment_from_status(external_ref, status);
                let result = self
                    .allocator
                    .allocate(&ExecutionContext::system(), &payment)
                    .await;
                PollStep::Confirmed(result)
            }
            PollOutcome::Incomplete => {
                tracing::debug!(external_ref = %external_ref, "Transaction not complete yet");
                PollStep::Retry(self.config.pending_delay)
            }
            PollOutcome::Unavailable(reason) => {
                tracing::warn!(
                    external_ref = %external_ref,
                    reason = %reason,
                    "Gateway unavailable, retrying with long delay"
                );
                PollStep::Retry(self.config.error_delay)
            }
        }
    }

    /// Poll until confirmed, failed, or shut down.
    pub async fn run(&self, external_ref: String, shutdown: CancellationToken) -> TaskState {
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            match self.poll_once(&external_ref).await {
                PollStep::Confirmed(result) => {
                    if !result.errors.is_empty() {
                        tracing::warn!(
                            external_ref = %external_ref,
                            errors = ?result.errors,
                            "Confirmed payment allocated with caveats"
                        );
                    }
                    return TaskState::Confirmed;
                }
                PollStep::Retry(delay) => {
                    if attempts >= self.config.max_attempts {
                        tracing::error!(
                            external_ref = %external_ref,
                            attempts,
                            "Reconciliation gave up, operator attention required"
                        );
                        return TaskState::Failed {
                            reason: "timeout".to_string(),
                        };
                    }
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.cancelled() => {
                            tracing::info!(
                                external_ref = %external_ref,
                                "Reconciliation interrupted by shutdown"
                            );
                            return TaskState::Pending { attempts };
                        }
                    }
                }
            }
        }
    }

    /// Spawn a detached reconciliation task for one external reference
    pub fn spawn(&self, external_ref: String, shutdown: CancellationToken) {
        let reconciler = self.clone();
        tokio::spawn(async move {
            let state = reconciler.run(external_ref.clone(), shutdown).await;
            tracing::info!(external_ref = %external_ref, state = ?state, "Reconciliation finished");
        });
    }
}

/// Build the payment event handed to the allocator on confirmation.
///
/// The STK push used the invoice id as the external reference, so the
/// reference doubles as the bill reference hint.
fn payment_from_status(external_ref: &str, status: GatewayStatus) -> PaymentEvent {
    let trans_id = status
        .mpesa_receipt
        .clone()
        .or_else(|| status.link_id.clone())
        .unwrap_or_else(|| external_ref.to_string());
    let trans_time = status
        .created_at
        .clone()
        .unwrap_or_else(|| Utc::now().format("%Y-%m-%d %H:%M:%S").to_string());

    PaymentEvent {
        trans_id,
        trans_time,
        amount: status.amount,
        bill_ref: Some(status.external_reference.clone()),
        msisdn: status.msisdn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::LogNotifier;
    use crate::store::{InvoiceStore, MemoryStore};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use shared::models::{Invoice, InvoiceStatus};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a scripted sequence of poll outcomes
    struct ScriptedGateway {
        outcomes: Mutex<VecDeque<PollOutcome>>,
        polls: Mutex<u32>,
    }

    impl ScriptedGateway {
        fn new(outcomes: Vec<PollOutcome>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                polls: Mutex::new(0),
            }
        }

        fn poll_count(&self) -> u32 {
            *self.polls.lock().unwrap()
        }
    }

    #[async_trait]
    impl GatewayClient for ScriptedGateway {
        async fn poll_status(&self, _external_ref: &str) -> PollOutcome {
            *self.polls.lock().unwrap() += 1;
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(PollOutcome::Incomplete)
        }

        async fn initiate_stk_push(
            &self,
            _phone: &str,
            _amount: Decimal,
            _invoice_id: &str,
        ) -> Result<String, GatewayError> {
            unimplemented!("not used in reconciler tests")
        }
    }

    fn confirmed_status(external_ref: &str, amount: i64) -> GatewayStatus {
        GatewayStatus {
            is_complete: 1,
            amount: Decimal::from(amount),
            msisdn: "0712345678".to_string(),
            sync_status: Some("synced".to_string()),
            external_reference: external_ref.to_string(),
            mpesa_receipt: Some("QLX123".to_string()),
            link_id: None,
            created_at: Some("2026-08-01 10:00:00".to_string()),
        }
    }

    fn fixture(
        outcomes: Vec<PollOutcome>,
        config: ReconcileConfig,
    ) -> (Reconciler, Arc<ScriptedGateway>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let allocator = PaymentAllocator::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(LogNotifier),
        );
        let gateway = Arc::new(ScriptedGateway::new(outcomes));
        let reconciler = Reconciler::new(gateway.clone(), allocator, config);
        (reconciler, gateway, store)
    }

    #[tokio::test]
    async fn incomplete_poll_retries_with_short_delay() {
        let config = ReconcileConfig::default();
        let (reconciler, _, _) = fixture(vec![PollOutcome::Incomplete], config.clone());

        match reconciler.poll_once("INV-1").await {
            PollStep::Retry(delay) => assert_eq!(delay, config.pending_delay),
            other => panic!("expected retry, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn transport_failure_retries_with_long_delay() {
        let config = ReconcileConfig::default();
        let (reconciler, _, _) = fixture(
            vec![PollOutcome::Unavailable("status 500".into())],
            config.clone(),
        );

        match reconciler.poll_once("INV-1").await {
            PollStep::Retry(delay) => assert_eq!(delay, config.error_delay),
            other => panic!("expected retry, got {:?}", other),
        }
        assert!(config.error_delay > config.pending_delay);
    }

    #[tokio::test]
    async fn confirmation_is_terminal_and_allocates() {
        let config = ReconcileConfig {
            pending_delay: Duration::from_millis(1),
            error_delay: Duration::from_millis(1),
            max_attempts: 10,
        };
        let (reconciler, gateway, store) = fixture(
            vec![
                PollOutcome::Incomplete,
                PollOutcome::Unavailable("status 502".into()),
                PollOutcome::Confirmed(confirmed_status("INV-1", 500)),
            ],
            config,
        );

        store
            .insert(Invoice {
                id: "INV-1".to_string(),
                customer: "Walkin".to_string(),
                total: Decimal::from(500),
                outstanding: Decimal::from(500),
                status: InvoiceStatus::Open,
                created_at: 1,
            })
            .await
            .unwrap();

        let state = reconciler
            .run("INV-1".to_string(), CancellationToken::new())
            .await;
        assert_eq!(state, TaskState::Confirmed);
        // Terminal: polled exactly three times, never rescheduled after confirm
        assert_eq!(gateway.poll_count(), 3);

        // The confirmed amount reached the allocator and settled the invoice
        let invoice = store.get("INV-1").await.unwrap().unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert_eq!(invoice.outstanding, Decimal::ZERO);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let config = ReconcileConfig {
            pending_delay: Duration::from_millis(1),
            error_delay: Duration::from_millis(1),
            max_attempts: 3,
        };
        // Never confirms
        let (reconciler, gateway, _) = fixture(vec![], config);

        let state = reconciler
            .run("INV-GONE".to_string(), CancellationToken::new())
            .await;
        assert_eq!(
            state,
            TaskState::Failed {
                reason: "timeout".to_string()
            }
        );
        assert_eq!(gateway.poll_count(), 3);
    }

    #[tokio::test]
    async fn shutdown_interrupts_between_polls() {
        let config = ReconcileConfig {
            pending_delay: Duration::from_secs(3600),
            error_delay: Duration::from_secs(3600),
            max_attempts: 10,
        };
        let (reconciler, _, _) = fixture(vec![], config);

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let state = reconciler.run("INV-1".to_string(), shutdown).await;
        assert_eq!(state, TaskState::Pending { attempts: 1 });
    }
}
