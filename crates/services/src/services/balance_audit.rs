//! Background reconciliation of stored seller balances against the ledger.
//!
//! Balances are always written transactionally with the ledger, so drift
//! means a bug or manual edit. The auditor recomputes every seller from the
//! ledger and payout history, corrects the stored row and logs what it found.

use std::time::Duration;

use db::{
    DBService,
    models::{balance::SellerBalance, ledger::LedgerEntry, payout::Payout},
};
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::time::interval;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BalanceAuditError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Background service recomputing seller balances from the ledger.
pub struct BalanceAuditService {
    db: DBService,
    poll_interval: Duration,
}

impl BalanceAuditService {
    /// Spawn the background audit loop.
    pub async fn spawn(db: DBService, poll_interval_secs: u64) -> tokio::task::JoinHandle<()> {
        let service = Self {
            db,
            poll_interval: Duration::from_secs(poll_interval_secs),
        };
        tokio::spawn(async move {
            service.start().await;
        })
    }

    async fn start(&self) {
        info!(
            "Starting balance audit service with interval {:?}",
            self.poll_interval
        );

        let mut interval = interval(self.poll_interval);

        loop {
            interval.tick().await;
            match audit_once(&self.db.pool).await {
                Ok(0) => debug!("Balance audit: all seller balances consistent"),
                Ok(fixed) => warn!(fixed = fixed, "Balance audit: corrected drifted balances"),
                Err(e) => error!("Balance audit cycle failed: {}", e),
            }
        }
    }
}

/// Recompute every seller with ledger activity. Returns how many stored rows
/// had drifted and were corrected.
pub async fn audit_once(pool: &SqlitePool) -> Result<usize, BalanceAuditError> {
    let sellers = LedgerEntry::distinct_sellers(pool).await?;
    let mut fixed = 0;

    for seller_id in sellers {
        if audit_seller(pool, seller_id).await? {
            fixed += 1;
        }
    }

    Ok(fixed)
}

async fn audit_seller(pool: &SqlitePool, seller_id: Uuid) -> Result<bool, BalanceAuditError> {
    let mut tx = pool.begin().await?;

    let lifetime_net = LedgerEntry::seller_net_total(&mut *tx, seller_id).await?;
    let outstanding = Payout::outstanding_total(&mut *tx, seller_id).await?;
    let pending = Payout::pending_total(&mut *tx, seller_id).await?;
    let expected_available = lifetime_net - outstanding;

    let stored = sqlx::query_as::<_, SellerBalance>(
        r#"SELECT seller_id, available_cents, pending_payout_cents, lifetime_net_cents, updated_at
           FROM seller_balances
           WHERE seller_id = $1"#,
    )
    .bind(seller_id)
    .fetch_optional(&mut *tx)
    .await?;

    let drifted = match &stored {
        Some(balance) => {
            balance.available_cents != expected_available
                || balance.pending_payout_cents != pending
                || balance.lifetime_net_cents != lifetime_net
        }
        None => true,
    };

    if drifted {
        warn!(
            seller_id = %seller_id,
            stored_available = stored.as_ref().map(|b| b.available_cents),
            expected_available = expected_available,
            "Balance audit: drift detected, correcting"
        );
        SellerBalance::upsert(&mut *tx, seller_id, expected_available, pending, lifetime_net)
            .await?;
    }

    tx.commit().await?;
    Ok(drifted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        services::checkout::{CheckoutService, split_fees},
        test_support::*,
    };

    #[tokio::test]
    async fn test_audit_detects_and_fixes_drift() {
        let db = test_db().await;
        let seller = create_seller(&db, "seller@test.com").await;
        let buyer = create_user(&db, "buyer@test.com").await;
        let prompt = published_prompt(&db, &seller, "Prompt A", 10_000).await;
        cart_with(&db, &buyer, &[&prompt]).await;

        let checkout = CheckoutService::new(db.clone(), StubGateway::ok());
        let order = checkout.create_order(buyer.id).await.unwrap();
        let payment = checkout.start_payment(buyer.id, order.order.id).await.unwrap();
        checkout.capture_payment(buyer.id, payment.id).await.unwrap();

        // Balances are consistent right after capture.
        assert_eq!(audit_once(&db.pool).await.unwrap(), 0);

        // Corrupt the stored row.
        sqlx::query("UPDATE seller_balances SET available_cents = 1 WHERE seller_id = $1")
            .bind(seller.id)
            .execute(&db.pool)
            .await
            .unwrap();

        assert_eq!(audit_once(&db.pool).await.unwrap(), 1);

        let balance = SellerBalance::find(&db.pool, seller.id).await.unwrap().unwrap();
        assert_eq!(balance.available_cents, split_fees(10_000).seller_net);

        // And it converges: a second run finds nothing.
        assert_eq!(audit_once(&db.pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_audit_recreates_missing_row() {
        let db = test_db().await;
        let seller = create_seller(&db, "seller@test.com").await;
        let buyer = create_user(&db, "buyer@test.com").await;
        let prompt = published_prompt(&db, &seller, "Prompt A", 5000).await;
        cart_with(&db, &buyer, &[&prompt]).await;

        let checkout = CheckoutService::new(db.clone(), StubGateway::ok());
        let order = checkout.create_order(buyer.id).await.unwrap();
        let payment = checkout.start_payment(buyer.id, order.order.id).await.unwrap();
        checkout.capture_payment(buyer.id, payment.id).await.unwrap();

        sqlx::query("DELETE FROM seller_balances WHERE seller_id = $1")
            .bind(seller.id)
            .execute(&db.pool)
            .await
            .unwrap();

        assert_eq!(audit_once(&db.pool).await.unwrap(), 1);
        let balance = SellerBalance::find(&db.pool, seller.id).await.unwrap().unwrap();
        assert_eq!(balance.lifetime_net_cents, split_fees(5000).seller_net);
    }
}
