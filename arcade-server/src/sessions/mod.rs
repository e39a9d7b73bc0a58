//! Session lifecycle
//!
//! A game space holds at most one open session. Closing a session happens
//! exactly once: the duration is fixed, priced under the game's policy,
//! and exactly one invoice is created. Closed sessions are immutable.

use shared::models::{
    GameSession, Invoice, InvoiceStatus, SessionOpen, SessionOpened, SessionStatus,
};
use shared::util::{now_millis, snowflake_id};
use shared::{ApiError, ApiResult, ExecutionContext};
use std::sync::Arc;

use crate::pricing::{self, PricingError};
use crate::store::{InvoiceStore, SessionStore};

/// Default customer for walk-in cafe sessions
const WALK_IN_CUSTOMER: &str = "Walkin";

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    invoices: Arc<dyn InvoiceStore>,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>, invoices: Arc<dyn InvoiceStore>) -> Self {
        Self { store, invoices }
    }

    /// Open a session on a free game space
    pub async fn open_session(
        &self,
        ctx: &ExecutionContext,
        input: SessionOpen,
    ) -> ApiResult<SessionOpened> {
        let space = self
            .store
            .get_space(&input.space_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("game space {}", input.space_id)))?;
        if space.occupied {
            return Err(ApiError::business_rule(format!(
                "game space {} is already occupied",
                space.id
            )));
        }

        let game = self
            .store
            .get_game(&input.game_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("game {}", input.game_id)))?;

        let session = GameSession {
            id: format!("GS-{}", snowflake_id()),
            space_id: space.id.clone(),
            game_id: game.id.clone(),
            started_at: now_millis(),
            ended_at: None,
            duration_secs: None,
            status: SessionStatus::Open,
            invoice_id: None,
            created_by: ctx.actor.clone(),
        };
        self.store.insert_session(session.clone()).await?;
        self.store.set_space_occupied(&space.id, true).await?;

        tracing::info!(
            session_id = %session.id,
            space_id = %space.id,
            game = %game.name,
            "Game session opened"
        );

        Ok(SessionOpened {
            session_id: session.id,
            space_id: space.id,
            game_name: game.name,
            started_at: session.started_at,
        })
    }

    /// Close the open session on a space and bill it
    pub async fn close_session(
        &self,
        ctx: &ExecutionContext,
        space_id: &str,
    ) -> ApiResult<Invoice> {
        self.close_session_at(ctx, space_id, now_millis()).await
    }

    /// Close at an explicit end time (test seam; `ended_at` in Unix millis)
    pub async fn close_session_at(
        &self,
        ctx: &ExecutionContext,
        space_id: &str,
        ended_at: i64,
    ) -> ApiResult<Invoice> {
        let _ctx = ctx.elevated();

        let mut session = self
            .store
            .find_open_by_space(space_id)
            .await?
            .ok_or_else(|| {
                ApiError::not_found(format!("active game session for space {}", space_id))
            })?;

        let duration_secs = (ended_at - session.started_at) / 1000;
        let game = self
            .store
            .get_game(&session.game_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("game {}", session.game_id)))?;

        let quote = pricing::price(duration_secs, &game.policy).map_err(|e| match e {
            PricingError::InvalidDuration(_) => ApiError::validation(e.to_string()),
            PricingError::InvalidPolicy(_) => ApiError::business_rule(e.to_string()),
        })?;

        let invoice = Invoice {
            id: format!("INV-{}", snowflake_id()),
            customer: WALK_IN_CUSTOMER.to_string(),
            total: quote.amount,
            outstanding: quote.amount,
            status: InvoiceStatus::Open,
            created_at: now_millis(),
        };
        self.invoices.insert(invoice.clone()).await?;

        // Duration and invoice are fixed exactly once, at closure
        session.ended_at = Some(ended_at);
        session.duration_secs = Some(duration_secs);
        session.status = SessionStatus::Closed;
        session.invoice_id = Some(invoice.id.clone());
        self.store.finalize_session(session.clone()).await?;
        self.store.set_space_occupied(space_id, false).await?;

        tracing::info!(
            session_id = %session.id,
            invoice_id = %invoice.id,
            duration_secs,
            increments = quote.increments,
            amount = %quote.amount,
            "Game session closed and billed"
        );

        Ok(invoice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;
    use shared::models::{Game, GameSpace, PricingPolicy};

    async fn fixture() -> (SessionService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store
            .upsert_space(GameSpace {
                id: "SP-1".to_string(),
                label: "Console 1".to_string(),
                occupied: false,
            })
            .await
            .unwrap();
        store
            .upsert_game(Game {
                id: "G-1".to_string(),
                name: "FIFA 26".to_string(),
                policy: PricingPolicy::PerFifteenMinutes {
                    price_per_block: Decimal::from(50),
                },
            })
            .await
            .unwrap();
        (SessionService::new(store.clone(), store.clone()), store)
    }

    #[tokio::test]
    async fn open_then_close_produces_one_invoice() {
        let (service, store) = fixture().await;
        let ctx = ExecutionContext::operator("attendant");

        let opened = service
            .open_session(
                &ctx,
                SessionOpen {
                    space_id: "SP-1".to_string(),
                    game_id: "G-1".to_string(),
                },
            )
            .await
            .unwrap();

        let space = store.get_space("SP-1").await.unwrap().unwrap();
        assert!(space.occupied);

        // 40 minutes -> 3 quarter-hour blocks at 50
        let ended_at = opened.started_at + 40 * 60 * 1000;
        let invoice = service
            .close_session_at(&ctx, "SP-1", ended_at)
            .await
            .unwrap();
        assert_eq!(invoice.total, Decimal::from(150));
        assert_eq!(invoice.outstanding, Decimal::from(150));

        let session = store.get_session(&opened.session_id).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Closed);
        assert_eq!(session.duration_secs, Some(40 * 60));
        assert_eq!(session.invoice_id, Some(invoice.id));

        let space = store.get_space("SP-1").await.unwrap().unwrap();
        assert!(!space.occupied);
    }

    #[tokio::test]
    async fn occupied_space_rejects_second_session() {
        let (service, _) = fixture().await;
        let ctx = ExecutionContext::operator("attendant");
        let open = SessionOpen {
            space_id: "SP-1".to_string(),
            game_id: "G-1".to_string(),
        };

        service.open_session(&ctx, open.clone()).await.unwrap();
        let err = service.open_session(&ctx, open).await.unwrap_err();
        assert!(matches!(err, ApiError::BusinessRule { .. }));
    }

    #[tokio::test]
    async fn close_without_open_session_is_not_found() {
        let (service, _) = fixture().await;
        let err = service
            .close_session(&ExecutionContext::operator("attendant"), "SP-1")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }));
    }

    #[tokio::test]
    async fn close_happens_exactly_once() {
        let (service, _) = fixture().await;
        let ctx = ExecutionContext::operator("attendant");

        let opened = service
            .open_session(
                &ctx,
                SessionOpen {
                    space_id: "SP-1".to_string(),
                    game_id: "G-1".to_string(),
                },
            )
            .await
            .unwrap();

        service
            .close_session_at(&ctx, "SP-1", opened.started_at + 60_000)
            .await
            .unwrap();
        // The space no longer has an open session
        let err = service
            .close_session_at(&ctx, "SP-1", opened.started_at + 120_000)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }));
    }

    #[tokio::test]
    async fn end_before_start_is_rejected() {
        let (service, _) = fixture().await;
        let ctx = ExecutionContext::operator("attendant");

        let opened = service
            .open_session(
                &ctx,
                SessionOpen {
                    space_id: "SP-1".to_string(),
                    game_id: "G-1".to_string(),
                },
            )
            .await
            .unwrap();

        let err = service
            .close_session_at(&ctx, "SP-1", opened.started_at - 1000)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation { .. }));
    }
}
