//! Payment Allocator
//!
//! Two-phase allocation of one payment event across outstanding invoices.
//!
//! Phase 1 (exact match): a bill reference matches only when the referenced
//! invoice is open and its outstanding balance *equals* the payment amount.
//! A reference with a differing balance is not matched and falls through
//! with the full amount.
//!
//! Phase 2 (FIFO sweep): open invoices in creation order, ties by id,
//! excluding an invoice consumed in phase 1; each receives
//! `min(outstanding, remaining)` until the payment is exhausted.
//!
//! Allocation is best-effort per invoice, never transactional across
//! invoices: one invoice's settlement failure is recorded and the sweep
//! continues. A remainder that no invoice can absorb is a valid terminal
//! state, reported as data. One audit record is written per payment event
//! regardless of outcome, and one receipt notification is attempted per
//! successful settlement.

use rust_decimal::Decimal;
use shared::ExecutionContext;
use shared::models::{AuditRecord, Invoice, PaymentEvent, Settlement};
use shared::util::now_millis;
use std::sync::Arc;
use uuid::Uuid;

use crate::notify::NotificationSender;
use crate::store::{AuditStore, InvoiceStore, SettlementStore};

/// Outcome of one `allocate()` call.
///
/// The caller distinguishes "fully processed", "partially processed with
/// caveats" and "hard failure" from `errors` and `unallocated`; nothing
/// downstream of input validation is raised.
#[derive(Debug)]
pub struct AllocationResult {
    /// Settlement records created, in application order
    pub settlements: Vec<Settlement>,
    /// Remainder no open invoice could absorb (overpayment or empty set)
    pub unallocated: Decimal,
    /// Per-invoice and notification failures, non-fatal
    pub errors: Vec<String>,
}

enum SettleOutcome {
    /// Funds applied and settlement recorded
    Applied(Settlement),
    /// Funds applied but the settlement record write failed; the decrement
    /// is already committed (at-least-once semantics)
    AppliedUnrecorded(String),
    /// Nothing applied
    Failed(String),
}

#[derive(Clone)]
pub struct PaymentAllocator {
    invoices: Arc<dyn InvoiceStore>,
    settlements: Arc<dyn SettlementStore>,
    audit: Arc<dyn AuditStore>,
    notifier: Arc<dyn NotificationSender>,
}

impl PaymentAllocator {
    pub fn new(
        invoices: Arc<dyn InvoiceStore>,
        settlements: Arc<dyn SettlementStore>,
        audit: Arc<dyn AuditStore>,
        notifier: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            invoices,
            settlements,
            audit,
            notifier,
        }
    }

    /// Allocate one validated payment event across outstanding invoices.
    ///
    /// Runs with elevated privilege; the caller identity from `ctx` is
    /// retained for the audit record. Allocations are applied strictly
    /// sequentially so each outstanding-balance read stays consistent.
    pub async fn allocate(
        &self,
        ctx: &ExecutionContext,
        payment: &PaymentEvent,
    ) -> AllocationResult {
        let ctx = ctx.elevated();

        let mut remaining = payment.amount;
        let mut settlements: Vec<Settlement> = Vec::new();
        let mut errors: Vec<String> = Vec::new();
        let mut exact_consumed: Option<String> = None;

        // Phase 1: exact match on the bill reference
        if let Some(bill_ref) = &payment.bill_ref {
            match self.invoices.find_exact_open(bill_ref, payment.amount).await {
                Ok(Some(invoice)) => {
                    let amount = remaining.min(invoice.outstanding);
                    match self.settle_one(payment, &invoice, amount).await {
                        SettleOutcome::Applied(settlement) => {
                            remaining -= amount;
                            exact_consumed = Some(invoice.id.clone());
                            settlements.push(settlement);
                        }
                        SettleOutcome::AppliedUnrecorded(msg) => {
                            remaining -= amount;
                            exact_consumed = Some(invoice.id.clone());
                            errors.push(msg);
                        }
                        SettleOutcome::Failed(msg) => errors.push(msg),
                    }
                }
                // Mismatched balance or unknown reference: fall through
                Ok(None) => {
                    tracing::debug!(
                        bill_ref = %bill_ref,
                        amount = %payment.amount,
                        "No exact invoice match, falling through to FIFO"
                    );
                }
                Err(e) => {
                    errors.push(format!("Exact-match lookup for {} failed: {}", bill_ref, e));
                }
            }
        }

        // Phase 2: FIFO sweep over remaining open invoices
        if remaining > Decimal::ZERO {
            match self.invoices.list_open_fifo().await {
                Ok(candidates) => {
                    for invoice in candidates {
                        if remaining <= Decimal::ZERO {
                            break;
                        }
                        if exact_consumed.as_deref() == Some(invoice.id.as_str()) {
                            continue;
                        }
                        if invoice.outstanding <= Decimal::ZERO {
                            continue;
                        }

                        let amount = invoice.outstanding.min(remaining);
                        match self.settle_one(payment, &invoice, amount).await {
                            SettleOutcome::Applied(settlement) => {
                                remaining -= amount;
                                settlements.push(settlement);
                            }
                            SettleOutcome::AppliedUnrecorded(msg) => {
                                remaining -= amount;
                                errors.push(msg);
                            }
                            // Best-effort: keep sweeping with the same remainder
                            SettleOutcome::Failed(msg) => errors.push(msg),
                        }
                    }
                }
                Err(e) => errors.push(format!("Failed to list open invoices: {}", e)),
            }
        }

        // Overpayment or no open invoices: valid terminal state, not an error
        if remaining > Decimal::ZERO {
            tracing::warn!(
                trans_id = %payment.trans_id,
                amount = %payment.amount,
                unallocated = %remaining,
                "Payment not fully allocated"
            );
        }

        // One audit record per payment event, success or not
        let record = AuditRecord {
            id: Uuid::new_v4().to_string(),
            trans_id: payment.trans_id.clone(),
            trans_time: payment.trans_time.clone(),
            amount: payment.amount,
            bill_ref: payment.bill_ref.clone(),
            msisdn: payment.msisdn.clone(),
            unallocated: remaining,
            actor: ctx.actor.clone(),
            created_at: now_millis(),
        };
        if let Err(e) = self.audit.insert(record).await {
            let msg = format!("Failed to write audit record for {}: {}", payment.trans_id, e);
            tracing::error!("{}", msg);
            errors.push(msg);
        }

        // Receipts: independently failable, never invalidate the allocation
        for settlement in &settlements {
            if let Err(e) = self.notifier.send_receipt(settlement).await {
                let msg = format!(
                    "Failed to send receipt for settlement {} (invoice {}): {}",
                    settlement.id, settlement.invoice_id, e
                );
                tracing::error!("{}", msg);
                errors.push(msg);
            }
        }

        AllocationResult {
            settlements,
            unallocated: remaining,
            errors,
        }
    }

    /// Apply one allocation: serialized outstanding decrement, then the
    /// settlement record write.
    async fn settle_one(
        &self,
        payment: &PaymentEvent,
        invoice: &Invoice,
        amount: Decimal,
    ) -> SettleOutcome {
        let outstanding_after = match self
            .invoices
            .apply_settlement(&invoice.id, amount, invoice.outstanding)
            .await
        {
            Ok(after) => after,
            Err(e) => {
                let msg = format!("Failed to settle invoice {}: {}", invoice.id, e);
                tracing::error!("{}", msg);
                return SettleOutcome::Failed(msg);
            }
        };

        let settlement = Settlement {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice.id.clone(),
            trans_id: payment.trans_id.clone(),
            amount,
            paid_from: payment.msisdn.clone(),
            outstanding_after,
            created_at: now_millis(),
        };

        if let Err(e) = self.settlements.insert(settlement.clone()).await {
            let msg = format!(
                "Settled invoice {} but failed to record settlement: {}",
                invoice.id, e
            );
            tracing::error!("{}", msg);
            return SettleOutcome::AppliedUnrecorded(msg);
        }

        tracing::info!(
            invoice_id = %invoice.id,
            trans_id = %payment.trans_id,
            amount = %amount,
            outstanding_after = %outstanding_after,
            "Settlement recorded"
        );
        SettleOutcome::Applied(settlement)
    }
}
