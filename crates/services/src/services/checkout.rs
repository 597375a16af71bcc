//! The order-to-payment pipeline: order creation from a cart, payment
//! capture, fee/ledger splitting, entitlement grants and refunds.
//!
//! Every multi-row step runs inside a single database transaction so the
//! books cannot end up half-written: a capture either records the payment,
//! the paid order, the entitlements, the ledger rows and the refreshed
//! seller balances, or none of them.

use std::{collections::BTreeSet, sync::Arc};

use db::{
    DBService,
    models::{
        admin_action::{AdminAction, AdminActionKind},
        cart::Cart,
        entitlement::Entitlement,
        ledger::{LedgerEntry, LedgerEntryType},
        order::{Order, OrderItem, OrderStatus, OrderWithItems},
        payment::{Payment, PaymentStatus},
        payout::Payout,
        prompt::{Prompt, PromptStatus},
    },
};
use sqlx::SqliteConnection;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::gateway::{ChargeOutcome, GatewayError, PaymentGateway};

/// Card processing fee, basis points of gross.
pub const PAYMENT_FEE_BPS: i64 = 360;
/// Marketplace commission, basis points of gross.
pub const PLATFORM_FEE_BPS: i64 = 2000;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("payment provider error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("cart is empty")]
    EmptyCart,
    #[error("prompt is not available for purchase")]
    PromptUnavailable(Uuid),
    #[error("cannot buy your own prompt")]
    OwnPrompt(Uuid),
    #[error("prompt already purchased")]
    AlreadyOwned(Uuid),
    #[error("order not found")]
    OrderNotFound,
    #[error("order belongs to another account")]
    NotOrderOwner,
    #[error("order is not pending")]
    OrderNotPending,
    #[error("payment not found")]
    PaymentNotFound,
    #[error("a payment for this order is already in flight")]
    PaymentInFlight,
    #[error("payment is not pending")]
    PaymentNotPending,
    #[error("payment was already captured")]
    AlreadyCaptured,
    #[error("payment is not captured")]
    PaymentNotCaptured,
    #[error("payment declined: {0}")]
    Declined(String),
}

/// Integer fee breakdown of one order item's gross price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplit {
    pub gross: i64,
    pub payment_fee: i64,
    pub platform_fee: i64,
    pub seller_net: i64,
}

/// Split a gross amount into its ledger components. Each fee rounds half-up;
/// the seller takes the exact remainder, so
/// `gross - payment_fee - platform_fee - seller_net == 0` always holds.
pub fn split_fees(gross: i64) -> FeeSplit {
    let payment_fee = bps_of(gross, PAYMENT_FEE_BPS);
    let platform_fee = bps_of(gross, PLATFORM_FEE_BPS);
    FeeSplit {
        gross,
        payment_fee,
        platform_fee,
        seller_net: gross - payment_fee - platform_fee,
    }
}

fn bps_of(amount: i64, bps: i64) -> i64 {
    (amount * bps + 5_000) / 10_000
}

#[derive(Clone)]
pub struct CheckoutService {
    db: DBService,
    gateway: Arc<dyn PaymentGateway>,
}

impl CheckoutService {
    pub fn new(db: DBService, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { db, gateway }
    }

    /// Turn the buyer's cart into a pending order with per-item price
    /// snapshots.
    pub async fn create_order(&self, buyer_id: Uuid) -> Result<OrderWithItems, CheckoutError> {
        let cart = Cart::find_by_user(&self.db.pool, buyer_id)
            .await?
            .ok_or(CheckoutError::EmptyCart)?;
        let cart_items = Cart::items(&self.db.pool, cart.id).await?;
        if cart_items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut tx = self.db.pool.begin().await?;

        // Re-read each prompt inside the transaction: the price written to the
        // order item is the price the buyer is charged.
        let mut snapshots = Vec::with_capacity(cart_items.len());
        for cart_item in &cart_items {
            let prompt = Prompt::find_by_id(&mut *tx, cart_item.prompt_id)
                .await?
                .ok_or(CheckoutError::PromptUnavailable(cart_item.prompt_id))?;
            if prompt.status != PromptStatus::Published {
                return Err(CheckoutError::PromptUnavailable(prompt.id));
            }
            if prompt.seller_id == buyer_id {
                return Err(CheckoutError::OwnPrompt(prompt.id));
            }
            if Entitlement::find_active(&mut *tx, buyer_id, prompt.id)
                .await?
                .is_some()
            {
                return Err(CheckoutError::AlreadyOwned(prompt.id));
            }
            snapshots.push(prompt);
        }

        let total_cents: i64 = snapshots.iter().map(|p| p.price_cents).sum();
        let order = Order::create(&mut *tx, Uuid::new_v4(), buyer_id, total_cents).await?;

        let mut items = Vec::with_capacity(snapshots.len());
        for prompt in &snapshots {
            let item = OrderItem::create(
                &mut *tx,
                Uuid::new_v4(),
                order.id,
                prompt.id,
                prompt.seller_id,
                prompt.price_cents,
            )
            .await?;
            items.push(item);
        }

        tx.commit().await?;

        info!(
            order_id = %order.id,
            buyer_id = %buyer_id,
            total_cents = total_cents,
            item_count = items.len(),
            "order created"
        );

        Ok(OrderWithItems { order, items })
    }

    /// Create a provider payment intent and the matching pending payment row.
    pub async fn start_payment(
        &self,
        buyer_id: Uuid,
        order_id: Uuid,
    ) -> Result<Payment, CheckoutError> {
        let order = self.owned_order(buyer_id, order_id).await?;
        if order.status != OrderStatus::Pending {
            return Err(CheckoutError::OrderNotPending);
        }
        if Payment::find_live_by_order(&self.db.pool, order.id)
            .await?
            .is_some()
        {
            return Err(CheckoutError::PaymentInFlight);
        }

        let intent = self
            .gateway
            .create_intent(order.total_cents, "usd", &order.id.to_string())
            .await?;

        let payment = Payment::create(
            &self.db.pool,
            Uuid::new_v4(),
            order.id,
            order.total_cents,
            Some(&intent.provider_ref),
        )
        .await?;

        info!(
            order_id = %order.id,
            payment_id = %payment.id,
            provider_ref = %intent.provider_ref,
            "payment started"
        );

        Ok(payment)
    }

    /// Confirm the charge with the provider and settle the order: payment
    /// captured, order paid, entitlements granted, ledger written, seller
    /// balances recomputed, cart cleared. One transaction.
    pub async fn capture_payment(
        &self,
        buyer_id: Uuid,
        payment_id: Uuid,
    ) -> Result<Payment, CheckoutError> {
        let payment = Payment::find_by_id(&self.db.pool, payment_id)
            .await?
            .ok_or(CheckoutError::PaymentNotFound)?;
        let order = self.owned_order(buyer_id, payment.order_id).await?;

        let provider_ref = payment.provider_ref.clone().unwrap_or_default();
        match self.gateway.confirm_intent(&provider_ref).await? {
            ChargeOutcome::Captured => {}
            ChargeOutcome::Declined(reason) => {
                warn!(
                    payment_id = %payment.id,
                    order_id = %order.id,
                    reason = %reason,
                    "payment declined by provider"
                );
                self.mark_failed(&payment, &order).await?;
                return Err(CheckoutError::Declined(reason));
            }
        }

        let buyer_cart = Cart::find_by_user(&self.db.pool, buyer_id).await?;

        let mut tx = self.db.pool.begin().await?;

        // The conditional flip is the double-capture guard: a concurrent or
        // repeated capture sees zero rows affected and stops here.
        let flipped =
            Payment::transition(&mut *tx, payment.id, PaymentStatus::Pending, PaymentStatus::Captured)
                .await?;
        if flipped == 0 {
            return Err(CheckoutError::AlreadyCaptured);
        }

        Order::update_status(&mut *tx, order.id, OrderStatus::Paid).await?;

        let items = OrderItem::for_order(&mut *tx, order.id).await?;
        let mut sellers = BTreeSet::new();
        for item in &items {
            Entitlement::grant(&mut *tx, buyer_id, item.prompt_id, order.id).await?;

            let split = split_fees(item.unit_price_cents);
            LedgerEntry::insert(
                &mut *tx,
                order.id,
                item.id,
                item.seller_id,
                LedgerEntryType::SaleGross,
                split.gross,
            )
            .await?;
            LedgerEntry::insert(
                &mut *tx,
                order.id,
                item.id,
                item.seller_id,
                LedgerEntryType::PaymentFee,
                -split.payment_fee,
            )
            .await?;
            LedgerEntry::insert(
                &mut *tx,
                order.id,
                item.id,
                item.seller_id,
                LedgerEntryType::PlatformFee,
                -split.platform_fee,
            )
            .await?;
            LedgerEntry::insert(
                &mut *tx,
                order.id,
                item.id,
                item.seller_id,
                LedgerEntryType::SellerNet,
                -split.seller_net,
            )
            .await?;

            sellers.insert(item.seller_id);
        }

        for seller_id in &sellers {
            recompute_seller_balance(&mut tx, *seller_id).await?;
        }

        if let Some(cart) = &buyer_cart {
            Cart::clear(&mut *tx, cart.id).await?;
        }

        tx.commit().await?;

        info!(
            payment_id = %payment.id,
            order_id = %order.id,
            amount_cents = payment.amount_cents,
            seller_count = sellers.len(),
            "payment captured"
        );

        Payment::find_by_id(&self.db.pool, payment.id)
            .await?
            .ok_or(CheckoutError::PaymentNotFound)
    }

    /// Mark a pending payment (and its order) as failed.
    pub async fn fail_payment(
        &self,
        buyer_id: Uuid,
        payment_id: Uuid,
    ) -> Result<Payment, CheckoutError> {
        let payment = Payment::find_by_id(&self.db.pool, payment_id)
            .await?
            .ok_or(CheckoutError::PaymentNotFound)?;
        let order = self.owned_order(buyer_id, payment.order_id).await?;

        self.mark_failed(&payment, &order).await?;

        Payment::find_by_id(&self.db.pool, payment.id)
            .await?
            .ok_or(CheckoutError::PaymentNotFound)
    }

    /// Refund a captured payment (admin operation): reversing ledger rows are
    /// appended, the order's entitlements revoked, seller balances recomputed
    /// and the audit row written. The original rows are never rewritten.
    pub async fn refund_payment(
        &self,
        admin_id: Uuid,
        payment_id: Uuid,
        note: Option<&str>,
    ) -> Result<Payment, CheckoutError> {
        let payment = Payment::find_by_id(&self.db.pool, payment_id)
            .await?
            .ok_or(CheckoutError::PaymentNotFound)?;
        if payment.status != PaymentStatus::Captured {
            return Err(CheckoutError::PaymentNotCaptured);
        }

        let provider_ref = payment.provider_ref.clone().unwrap_or_default();
        self.gateway.refund_charge(&provider_ref).await?;

        let original_entries = LedgerEntry::for_order(&self.db.pool, payment.order_id).await?;

        let mut tx = self.db.pool.begin().await?;

        let flipped = Payment::transition(
            &mut *tx,
            payment.id,
            PaymentStatus::Captured,
            PaymentStatus::Refunded,
        )
        .await?;
        if flipped == 0 {
            return Err(CheckoutError::PaymentNotCaptured);
        }

        Order::update_status(&mut *tx, payment.order_id, OrderStatus::Refunded).await?;
        Entitlement::revoke_for_order(&mut *tx, payment.order_id).await?;

        let mut sellers = BTreeSet::new();
        for entry in &original_entries {
            LedgerEntry::insert(
                &mut *tx,
                entry.order_id,
                entry.order_item_id,
                entry.seller_id,
                entry.entry_type,
                -entry.amount_cents,
            )
            .await?;
            sellers.insert(entry.seller_id);
        }

        for seller_id in &sellers {
            recompute_seller_balance(&mut tx, *seller_id).await?;
        }

        AdminAction::record(
            &mut *tx,
            admin_id,
            AdminActionKind::RefundPayment,
            payment.id,
            note,
        )
        .await?;

        tx.commit().await?;

        info!(
            payment_id = %payment.id,
            order_id = %payment.order_id,
            amount_cents = payment.amount_cents,
            admin_id = %admin_id,
            "payment refunded"
        );

        Payment::find_by_id(&self.db.pool, payment.id)
            .await?
            .ok_or(CheckoutError::PaymentNotFound)
    }

    pub async fn get_order(
        &self,
        buyer_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderWithItems, CheckoutError> {
        let order = self.owned_order(buyer_id, order_id).await?;
        let items = OrderItem::for_order(&self.db.pool, order.id).await?;
        Ok(OrderWithItems { order, items })
    }

    pub async fn list_orders(&self, buyer_id: Uuid) -> Result<Vec<Order>, CheckoutError> {
        Ok(Order::list_for_buyer(&self.db.pool, buyer_id).await?)
    }

    async fn owned_order(&self, buyer_id: Uuid, order_id: Uuid) -> Result<Order, CheckoutError> {
        let order = Order::find_by_id(&self.db.pool, order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound)?;
        if order.buyer_id != buyer_id {
            return Err(CheckoutError::NotOrderOwner);
        }
        Ok(order)
    }

    async fn mark_failed(&self, payment: &Payment, order: &Order) -> Result<(), CheckoutError> {
        let mut tx = self.db.pool.begin().await?;
        let flipped =
            Payment::transition(&mut *tx, payment.id, PaymentStatus::Pending, PaymentStatus::Failed)
                .await?;
        if flipped == 0 {
            return Err(CheckoutError::PaymentNotPending);
        }
        Order::update_status(&mut *tx, order.id, OrderStatus::Failed).await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Re-derive a seller's balance from the ledger and payout history. Always a
/// full recompute; nothing is incremented in place.
pub(crate) async fn recompute_seller_balance(
    conn: &mut SqliteConnection,
    seller_id: Uuid,
) -> Result<(), sqlx::Error> {
    let lifetime_net = LedgerEntry::seller_net_total(&mut *conn, seller_id).await?;
    let outstanding = Payout::outstanding_total(&mut *conn, seller_id).await?;
    let pending = Payout::pending_total(&mut *conn, seller_id).await?;

    db::models::balance::SellerBalance::upsert(
        &mut *conn,
        seller_id,
        lifetime_net - outstanding,
        pending,
        lifetime_net,
    )
    .await
}

#[cfg(test)]
mod tests {
    use db::models::balance::SellerBalance;

    use super::*;
    use crate::test_support::*;

    #[test]
    fn test_split_fees_round_amount() {
        let split = split_fees(1000);
        assert_eq!(split.payment_fee, 36);
        assert_eq!(split.platform_fee, 200);
        assert_eq!(split.seller_net, 764);
    }

    #[test]
    fn test_split_fees_always_balances() {
        for gross in [0, 1, 7, 99, 999, 1001, 123_456, 9_999_999] {
            let split = split_fees(gross);
            assert_eq!(
                split.gross - split.payment_fee - split.platform_fee - split.seller_net,
                0,
                "gross {gross} did not balance"
            );
        }
    }

    #[tokio::test]
    async fn test_create_order_rejects_empty_cart() {
        let db = test_db().await;
        let buyer = create_user(&db, "buyer@test.com").await;
        let checkout = CheckoutService::new(db.clone(), StubGateway::ok());

        // No cart at all.
        assert!(matches!(
            checkout.create_order(buyer.id).await,
            Err(CheckoutError::EmptyCart)
        ));

        // Cart exists but has no items.
        cart_with(&db, &buyer, &[]).await;
        assert!(matches!(
            checkout.create_order(buyer.id).await,
            Err(CheckoutError::EmptyCart)
        ));
    }

    #[tokio::test]
    async fn test_create_order_totals_match_item_snapshots() {
        let db = test_db().await;
        let seller = create_seller(&db, "seller@test.com").await;
        let buyer = create_user(&db, "buyer@test.com").await;
        let a = published_prompt(&db, &seller, "Prompt A", 1000).await;
        let b = published_prompt(&db, &seller, "Prompt B", 2500).await;
        cart_with(&db, &buyer, &[&a, &b]).await;

        let checkout = CheckoutService::new(db.clone(), StubGateway::ok());
        let order = checkout.create_order(buyer.id).await.unwrap();

        assert_eq!(order.order.status, OrderStatus::Pending);
        assert_eq!(order.items.len(), 2);
        let item_sum: i64 = order.items.iter().map(|i| i.unit_price_cents).sum();
        assert_eq!(order.order.total_cents, item_sum);
        assert_eq!(order.order.total_cents, 3500);
    }

    #[tokio::test]
    async fn test_create_order_rejects_own_prompt() {
        let db = test_db().await;
        let seller = create_seller(&db, "seller@test.com").await;
        let prompt = published_prompt(&db, &seller, "Own Prompt", 500).await;
        cart_with(&db, &seller, &[&prompt]).await;

        let checkout = CheckoutService::new(db.clone(), StubGateway::ok());
        assert!(matches!(
            checkout.create_order(seller.id).await,
            Err(CheckoutError::OwnPrompt(id)) if id == prompt.id
        ));
    }

    #[tokio::test]
    async fn test_create_order_rejects_unpublished_prompt() {
        let db = test_db().await;
        let seller = create_seller(&db, "seller@test.com").await;
        let buyer = create_user(&db, "buyer@test.com").await;
        let prompt = published_prompt(&db, &seller, "Gone Prompt", 500).await;
        cart_with(&db, &buyer, &[&prompt]).await;
        Prompt::update_status(&db.pool, prompt.id, PromptStatus::Suspended)
            .await
            .unwrap();

        let checkout = CheckoutService::new(db.clone(), StubGateway::ok());
        assert!(matches!(
            checkout.create_order(buyer.id).await,
            Err(CheckoutError::PromptUnavailable(id)) if id == prompt.id
        ));
    }

    async fn paid_order(checkout: &CheckoutService, buyer_id: Uuid) -> (OrderWithItems, Payment) {
        let order = checkout.create_order(buyer_id).await.unwrap();
        let payment = checkout.start_payment(buyer_id, order.order.id).await.unwrap();
        let payment = checkout.capture_payment(buyer_id, payment.id).await.unwrap();
        let order = checkout.get_order(buyer_id, order.order.id).await.unwrap();
        (order, payment)
    }

    #[tokio::test]
    async fn test_capture_settles_order_atomically() {
        let db = test_db().await;
        let seller = create_seller(&db, "seller@test.com").await;
        let buyer = create_user(&db, "buyer@test.com").await;
        let a = published_prompt(&db, &seller, "Prompt A", 1000).await;
        let b = published_prompt(&db, &seller, "Prompt B", 2500).await;
        cart_with(&db, &buyer, &[&a, &b]).await;

        let checkout = CheckoutService::new(db.clone(), StubGateway::ok());
        let (order, payment) = paid_order(&checkout, buyer.id).await;

        assert_eq!(payment.status, PaymentStatus::Captured);
        assert_eq!(order.order.status, OrderStatus::Paid);

        // Four signed rows per item, netting to zero for the order.
        let entries = LedgerEntry::for_order(&db.pool, order.order.id).await.unwrap();
        assert_eq!(entries.len(), order.items.len() * 4);
        assert_eq!(
            LedgerEntry::sum_for_order(&db.pool, order.order.id).await.unwrap(),
            0
        );

        // Entitlements granted for both prompts.
        for prompt_id in [a.id, b.id] {
            assert!(
                Entitlement::find_active(&db.pool, buyer.id, prompt_id)
                    .await
                    .unwrap()
                    .is_some()
            );
        }

        // Cart cleared.
        let cart = Cart::find_by_user(&db.pool, buyer.id).await.unwrap().unwrap();
        assert!(Cart::items(&db.pool, cart.id).await.unwrap().is_empty());

        // Seller balance equals the summed nets.
        let expected_net = split_fees(1000).seller_net + split_fees(2500).seller_net;
        let balance = SellerBalance::find(&db.pool, seller.id).await.unwrap().unwrap();
        assert_eq!(balance.available_cents, expected_net);
        assert_eq!(balance.lifetime_net_cents, expected_net);
        assert_eq!(balance.pending_payout_cents, 0);
    }

    #[tokio::test]
    async fn test_double_capture_rejected() {
        let db = test_db().await;
        let seller = create_seller(&db, "seller@test.com").await;
        let buyer = create_user(&db, "buyer@test.com").await;
        let prompt = published_prompt(&db, &seller, "Prompt A", 1000).await;
        cart_with(&db, &buyer, &[&prompt]).await;

        let checkout = CheckoutService::new(db.clone(), StubGateway::ok());
        let (order, payment) = paid_order(&checkout, buyer.id).await;

        assert!(matches!(
            checkout.capture_payment(buyer.id, payment.id).await,
            Err(CheckoutError::AlreadyCaptured)
        ));

        // The second attempt wrote nothing.
        let entries = LedgerEntry::for_order(&db.pool, order.order.id).await.unwrap();
        assert_eq!(entries.len(), 4);
    }

    #[tokio::test]
    async fn test_declined_payment_fails_order_without_side_effects() {
        let db = test_db().await;
        let seller = create_seller(&db, "seller@test.com").await;
        let buyer = create_user(&db, "buyer@test.com").await;
        let prompt = published_prompt(&db, &seller, "Prompt A", 1000).await;
        cart_with(&db, &buyer, &[&prompt]).await;

        let checkout = CheckoutService::new(db.clone(), StubGateway::declining());
        let order = checkout.create_order(buyer.id).await.unwrap();
        let payment = checkout.start_payment(buyer.id, order.order.id).await.unwrap();

        assert!(matches!(
            checkout.capture_payment(buyer.id, payment.id).await,
            Err(CheckoutError::Declined(_))
        ));

        let payment = Payment::find_by_id(&db.pool, payment.id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Failed);
        let order = Order::find_by_id(&db.pool, order.order.id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Failed);

        assert!(LedgerEntry::for_order(&db.pool, order.id).await.unwrap().is_empty());
        assert!(
            Entitlement::find_active(&db.pool, buyer.id, prompt.id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_start_payment_guards() {
        let db = test_db().await;
        let seller = create_seller(&db, "seller@test.com").await;
        let buyer = create_user(&db, "buyer@test.com").await;
        let other = create_user(&db, "other@test.com").await;
        let prompt = published_prompt(&db, &seller, "Prompt A", 1000).await;
        cart_with(&db, &buyer, &[&prompt]).await;

        let checkout = CheckoutService::new(db.clone(), StubGateway::ok());
        let order = checkout.create_order(buyer.id).await.unwrap();

        assert!(matches!(
            checkout.start_payment(other.id, order.order.id).await,
            Err(CheckoutError::NotOrderOwner)
        ));

        checkout.start_payment(buyer.id, order.order.id).await.unwrap();
        assert!(matches!(
            checkout.start_payment(buyer.id, order.order.id).await,
            Err(CheckoutError::PaymentInFlight)
        ));
    }

    #[tokio::test]
    async fn test_refund_reverses_ledger_and_revokes_entitlements() {
        let db = test_db().await;
        let admin = create_admin(&db, "admin@test.com").await;
        let seller = create_seller(&db, "seller@test.com").await;
        let buyer = create_user(&db, "buyer@test.com").await;
        let prompt = published_prompt(&db, &seller, "Prompt A", 1000).await;
        cart_with(&db, &buyer, &[&prompt]).await;

        let checkout = CheckoutService::new(db.clone(), StubGateway::ok());
        let (order, payment) = paid_order(&checkout, buyer.id).await;

        let refunded = checkout
            .refund_payment(admin.id, payment.id, Some("chargeback"))
            .await
            .unwrap();
        assert_eq!(refunded.status, PaymentStatus::Refunded);

        let order = Order::find_by_id(&db.pool, order.order.id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Refunded);

        // Original four rows plus four reversing rows, netting to zero.
        let entries = LedgerEntry::for_order(&db.pool, order.id).await.unwrap();
        assert_eq!(entries.len(), 8);
        assert_eq!(LedgerEntry::sum_for_order(&db.pool, order.id).await.unwrap(), 0);

        assert!(
            Entitlement::find_active(&db.pool, buyer.id, prompt.id)
                .await
                .unwrap()
                .is_none()
        );

        let balance = SellerBalance::find(&db.pool, seller.id).await.unwrap().unwrap();
        assert_eq!(balance.available_cents, 0);
        assert_eq!(balance.lifetime_net_cents, 0);

        // Audit trail row was written with the action.
        let actions = AdminAction::list(&db.pool, 10, 0).await.unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action, AdminActionKind::RefundPayment);
        assert_eq!(actions[0].target_id, payment.id);

        // Refunding twice is rejected.
        assert!(matches!(
            checkout.refund_payment(admin.id, payment.id, None).await,
            Err(CheckoutError::PaymentNotCaptured)
        ));
    }

    #[tokio::test]
    async fn test_rebuy_after_refund_reactivates_entitlement() {
        let db = test_db().await;
        let admin = create_admin(&db, "admin@test.com").await;
        let seller = create_seller(&db, "seller@test.com").await;
        let buyer = create_user(&db, "buyer@test.com").await;
        let prompt = published_prompt(&db, &seller, "Prompt A", 1000).await;
        cart_with(&db, &buyer, &[&prompt]).await;

        let checkout = CheckoutService::new(db.clone(), StubGateway::ok());
        let (_, payment) = paid_order(&checkout, buyer.id).await;
        checkout.refund_payment(admin.id, payment.id, None).await.unwrap();

        // Buy it again.
        let cart = Cart::find_by_user(&db.pool, buyer.id).await.unwrap().unwrap();
        Cart::add_item(&db.pool, cart.id, prompt.id).await.unwrap();
        let (_, payment) = paid_order(&checkout, buyer.id).await;
        assert_eq!(payment.status, PaymentStatus::Captured);

        assert!(
            Entitlement::find_active(&db.pool, buyer.id, prompt.id)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_create_order_rejects_already_owned_prompt() {
        let db = test_db().await;
        let seller = create_seller(&db, "seller@test.com").await;
        let buyer = create_user(&db, "buyer@test.com").await;
        let prompt = published_prompt(&db, &seller, "Prompt A", 1000).await;
        cart_with(&db, &buyer, &[&prompt]).await;

        let checkout = CheckoutService::new(db.clone(), StubGateway::ok());
        let (_, _) = paid_order(&checkout, buyer.id).await;

        let cart = Cart::find_by_user(&db.pool, buyer.id).await.unwrap().unwrap();
        Cart::add_item(&db.pool, cart.id, prompt.id).await.unwrap();

        assert!(matches!(
            checkout.create_order(buyer.id).await,
            Err(CheckoutError::AlreadyOwned(id)) if id == prompt.id
        ));
    }
}
