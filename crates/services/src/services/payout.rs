//! Seller payouts, gated on the recomputed ledger balance.

use chrono::Utc;
use db::{
    DBService,
    models::{
        admin_action::{AdminAction, AdminActionKind},
        balance::SellerBalance,
        ledger::LedgerEntry,
        payout::{Payout, PayoutStatus},
    },
};
use thiserror::Error;
use tracing::info;
use utils::pagination::{PageQuery, Paged};
use uuid::Uuid;

use super::checkout::recompute_seller_balance;

#[derive(Debug, Error)]
pub enum PayoutError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("payout amount is below the minimum of {0} cents")]
    BelowMinimum(i64),
    #[error("insufficient balance: {available} cents available")]
    InsufficientBalance { available: i64 },
    #[error("payout not found")]
    PayoutNotFound,
    #[error("payout is not in a processable state")]
    InvalidState,
}

#[derive(Clone)]
pub struct PayoutService {
    db: DBService,
    min_payout_cents: i64,
}

impl PayoutService {
    pub fn new(db: DBService, min_payout_cents: i64) -> Self {
        Self {
            db,
            min_payout_cents,
        }
    }

    /// Request a payout. The balance gate and the payout insert share one
    /// transaction, so two concurrent requests cannot both pass the check.
    pub async fn request(&self, seller_id: Uuid, amount_cents: i64) -> Result<Payout, PayoutError> {
        if amount_cents < self.min_payout_cents {
            return Err(PayoutError::BelowMinimum(self.min_payout_cents));
        }

        let mut tx = self.db.pool.begin().await?;

        let lifetime_net = LedgerEntry::seller_net_total(&mut *tx, seller_id).await?;
        let outstanding = Payout::outstanding_total(&mut *tx, seller_id).await?;
        let available = lifetime_net - outstanding;
        if amount_cents > available {
            return Err(PayoutError::InsufficientBalance { available });
        }

        let payout = Payout::create(&mut *tx, Uuid::new_v4(), seller_id, amount_cents).await?;
        recompute_seller_balance(&mut tx, seller_id).await?;

        tx.commit().await?;

        info!(
            payout_id = %payout.id,
            seller_id = %seller_id,
            amount_cents = amount_cents,
            "payout requested"
        );

        Ok(payout)
    }

    pub async fn approve(&self, admin_id: Uuid, payout_id: Uuid) -> Result<Payout, PayoutError> {
        let mut tx = self.db.pool.begin().await?;
        let flipped = Payout::transition(
            &mut *tx,
            payout_id,
            PayoutStatus::Requested,
            PayoutStatus::Approved,
            Some(admin_id),
        )
        .await?;
        if flipped == 0 {
            return Err(PayoutError::InvalidState);
        }
        AdminAction::record(&mut *tx, admin_id, AdminActionKind::ApprovePayout, payout_id, None)
            .await?;
        tx.commit().await?;

        self.find(payout_id).await
    }

    /// Mark a requested or approved payout as paid out.
    pub async fn complete(&self, admin_id: Uuid, payout_id: Uuid) -> Result<Payout, PayoutError> {
        let payout = self.find(payout_id).await?;
        let from = match payout.status {
            PayoutStatus::Requested | PayoutStatus::Approved => payout.status,
            _ => return Err(PayoutError::InvalidState),
        };

        let mut tx = self.db.pool.begin().await?;
        let flipped =
            Payout::transition(&mut *tx, payout.id, from, PayoutStatus::Paid, Some(admin_id))
                .await?;
        if flipped == 0 {
            return Err(PayoutError::InvalidState);
        }
        AdminAction::record(&mut *tx, admin_id, AdminActionKind::CompletePayout, payout.id, None)
            .await?;
        recompute_seller_balance(&mut tx, payout.seller_id).await?;
        tx.commit().await?;

        info!(payout_id = %payout.id, admin_id = %admin_id, "payout completed");
        self.find(payout_id).await
    }

    /// Reject a payout; the reserved amount returns to the seller's available
    /// balance via recompute.
    pub async fn reject(&self, admin_id: Uuid, payout_id: Uuid) -> Result<Payout, PayoutError> {
        let payout = self.find(payout_id).await?;
        let from = match payout.status {
            PayoutStatus::Requested | PayoutStatus::Approved => payout.status,
            _ => return Err(PayoutError::InvalidState),
        };

        let mut tx = self.db.pool.begin().await?;
        let flipped =
            Payout::transition(&mut *tx, payout.id, from, PayoutStatus::Rejected, Some(admin_id))
                .await?;
        if flipped == 0 {
            return Err(PayoutError::InvalidState);
        }
        AdminAction::record(&mut *tx, admin_id, AdminActionKind::RejectPayout, payout.id, None)
            .await?;
        recompute_seller_balance(&mut tx, payout.seller_id).await?;
        tx.commit().await?;

        info!(payout_id = %payout.id, admin_id = %admin_id, "payout rejected");
        self.find(payout_id).await
    }

    /// The seller's balance row; sellers with no sales yet read as zero.
    pub async fn balance(&self, seller_id: Uuid) -> Result<SellerBalance, PayoutError> {
        if let Some(balance) = SellerBalance::find(&self.db.pool, seller_id).await? {
            return Ok(balance);
        }
        Ok(SellerBalance {
            seller_id,
            available_cents: 0,
            pending_payout_cents: 0,
            lifetime_net_cents: 0,
            updated_at: Utc::now(),
        })
    }

    pub async fn list_mine(&self, seller_id: Uuid) -> Result<Vec<Payout>, PayoutError> {
        Ok(Payout::list_for_seller(&self.db.pool, seller_id).await?)
    }

    pub async fn list_by_status(
        &self,
        status: PayoutStatus,
        page: &PageQuery,
    ) -> Result<Paged<Payout>, PayoutError> {
        let payouts =
            Payout::list_by_status(&self.db.pool, status, page.per_page(), page.offset()).await?;
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM payouts WHERE status = $1")
            .bind(status)
            .fetch_one(&self.db.pool)
            .await?;
        Ok(Paged::new(payouts, page, total))
    }

    async fn find(&self, payout_id: Uuid) -> Result<Payout, PayoutError> {
        Payout::find_by_id(&self.db.pool, payout_id)
            .await?
            .ok_or(PayoutError::PayoutNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        services::checkout::{CheckoutService, split_fees},
        test_support::*,
    };

    /// Seed a seller with one captured sale and return their net.
    async fn seller_with_sale(db: &DBService, price_cents: i64) -> (db::models::user::User, i64) {
        let seller = create_seller(db, "seller@test.com").await;
        let buyer = create_user(db, "buyer@test.com").await;
        let prompt = published_prompt(db, &seller, "Sold Prompt", price_cents).await;
        cart_with(db, &buyer, &[&prompt]).await;

        let checkout = CheckoutService::new(db.clone(), StubGateway::ok());
        let order = checkout.create_order(buyer.id).await.unwrap();
        let payment = checkout.start_payment(buyer.id, order.order.id).await.unwrap();
        checkout.capture_payment(buyer.id, payment.id).await.unwrap();

        (seller, split_fees(price_cents).seller_net)
    }

    #[tokio::test]
    async fn test_request_below_minimum_rejected() {
        let db = test_db().await;
        let (seller, _) = seller_with_sale(&db, 10_000).await;

        let payouts = PayoutService::new(db, 1000);
        assert!(matches!(
            payouts.request(seller.id, 500).await,
            Err(PayoutError::BelowMinimum(1000))
        ));
    }

    #[tokio::test]
    async fn test_request_above_balance_rejected() {
        let db = test_db().await;
        let (seller, net) = seller_with_sale(&db, 10_000).await;

        let payouts = PayoutService::new(db, 1000);
        let result = payouts.request(seller.id, net + 1).await;
        assert!(matches!(
            result,
            Err(PayoutError::InsufficientBalance { available }) if available == net
        ));
    }

    #[tokio::test]
    async fn test_request_reserves_balance() {
        let db = test_db().await;
        let (seller, net) = seller_with_sale(&db, 10_000).await;

        let payouts = PayoutService::new(db.clone(), 1000);
        let payout = payouts.request(seller.id, net).await.unwrap();
        assert_eq!(payout.status, PayoutStatus::Requested);

        let balance = payouts.balance(seller.id).await.unwrap();
        assert_eq!(balance.available_cents, 0);
        assert_eq!(balance.pending_payout_cents, net);
        assert_eq!(balance.lifetime_net_cents, net);

        // Nothing left for a second request.
        assert!(matches!(
            payouts.request(seller.id, 1000).await,
            Err(PayoutError::InsufficientBalance { available: 0 })
        ));
    }

    #[tokio::test]
    async fn test_complete_keeps_amount_spent() {
        let db = test_db().await;
        let admin = create_admin(&db, "admin@test.com").await;
        let (seller, net) = seller_with_sale(&db, 10_000).await;

        let payouts = PayoutService::new(db.clone(), 1000);
        let payout = payouts.request(seller.id, net).await.unwrap();
        let payout = payouts.approve(admin.id, payout.id).await.unwrap();
        assert_eq!(payout.status, PayoutStatus::Approved);
        let payout = payouts.complete(admin.id, payout.id).await.unwrap();
        assert_eq!(payout.status, PayoutStatus::Paid);

        let balance = payouts.balance(seller.id).await.unwrap();
        assert_eq!(balance.available_cents, 0);
        assert_eq!(balance.pending_payout_cents, 0);
        assert_eq!(balance.lifetime_net_cents, net);

        // A paid payout cannot be completed or rejected again.
        assert!(matches!(
            payouts.complete(admin.id, payout.id).await,
            Err(PayoutError::InvalidState)
        ));
        assert!(matches!(
            payouts.reject(admin.id, payout.id).await,
            Err(PayoutError::InvalidState)
        ));
    }

    #[tokio::test]
    async fn test_reject_restores_availability() {
        let db = test_db().await;
        let admin = create_admin(&db, "admin@test.com").await;
        let (seller, net) = seller_with_sale(&db, 10_000).await;

        let payouts = PayoutService::new(db.clone(), 1000);
        let payout = payouts.request(seller.id, net).await.unwrap();
        let payout = payouts.reject(admin.id, payout.id).await.unwrap();
        assert_eq!(payout.status, PayoutStatus::Rejected);

        let balance = payouts.balance(seller.id).await.unwrap();
        assert_eq!(balance.available_cents, net);
        assert_eq!(balance.pending_payout_cents, 0);
    }

    #[tokio::test]
    async fn test_balance_defaults_to_zero() {
        let db = test_db().await;
        let seller = create_seller(&db, "fresh@test.com").await;

        let payouts = PayoutService::new(db, 1000);
        let balance = payouts.balance(seller.id).await.unwrap();
        assert_eq!(balance.available_cents, 0);
        assert_eq!(balance.lifetime_net_cents, 0);
    }

    #[tokio::test]
    async fn test_admin_queue_listing() {
        let db = test_db().await;
        let (seller, net) = seller_with_sale(&db, 10_000).await;

        let payouts = PayoutService::new(db, 1000);
        payouts.request(seller.id, net).await.unwrap();

        let queue = payouts
            .list_by_status(PayoutStatus::Requested, &PageQuery::default())
            .await
            .unwrap();
        assert_eq!(queue.total, 1);
        assert_eq!(queue.items[0].amount_cents, net);
    }
}
