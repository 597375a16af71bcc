//! Shared fixtures for service tests: in-memory database, seeded rows and a
//! stub payment gateway.

use std::sync::Arc;

use async_trait::async_trait;
use db::{
    DBService,
    models::{
        cart::Cart,
        prompt::{CreatePrompt, Prompt, PromptStatus},
        user::{User, UserRole},
    },
};
use uuid::Uuid;

use crate::services::gateway::{ChargeOutcome, GatewayError, PaymentGateway, PaymentIntent};

pub(crate) async fn test_db() -> DBService {
    DBService::new_in_memory().await.expect("in-memory database")
}

pub(crate) async fn create_user(db: &DBService, email: &str) -> User {
    User::create(&db.pool, Uuid::new_v4(), email, "not-a-real-hash", "Test User")
        .await
        .expect("create user")
}

pub(crate) async fn create_seller(db: &DBService, email: &str) -> User {
    let user = create_user(db, email).await;
    User::set_role(&db.pool, user.id, UserRole::Seller)
        .await
        .expect("set role");
    User::find_by_id(&db.pool, user.id).await.unwrap().unwrap()
}

pub(crate) async fn create_admin(db: &DBService, email: &str) -> User {
    let user = create_user(db, email).await;
    User::set_role(&db.pool, user.id, UserRole::Admin)
        .await
        .expect("set role");
    User::find_by_id(&db.pool, user.id).await.unwrap().unwrap()
}

pub(crate) async fn published_prompt(
    db: &DBService,
    seller: &User,
    title: &str,
    price_cents: i64,
) -> Prompt {
    let data = CreatePrompt {
        title: title.to_string(),
        description: Some("A very useful prompt".to_string()),
        body: "You are a helpful assistant specialized in the task.".to_string(),
        price_cents,
        category_id: None,
        visibility: None,
        tags: None,
    };
    let prompt = Prompt::create(
        &db.pool,
        Uuid::new_v4(),
        seller.id,
        &utils::text::slugify(title),
        &data,
    )
    .await
    .expect("create prompt");
    Prompt::update_status(&db.pool, prompt.id, PromptStatus::Published)
        .await
        .expect("publish prompt");
    Prompt::find_by_id(&db.pool, prompt.id).await.unwrap().unwrap()
}

/// User cart preloaded with the given prompts.
pub(crate) async fn cart_with(db: &DBService, buyer: &User, prompts: &[&Prompt]) -> Cart {
    let cart = Cart::create_for_user(&db.pool, buyer.id)
        .await
        .expect("create cart");
    for prompt in prompts {
        Cart::add_item(&db.pool, cart.id, prompt.id)
            .await
            .expect("add cart item");
    }
    cart
}

/// Gateway double: captures unless told to decline, never touches the network.
pub(crate) struct StubGateway {
    pub decline: bool,
}

impl StubGateway {
    pub(crate) fn ok() -> Arc<Self> {
        Arc::new(Self { decline: false })
    }

    pub(crate) fn declining() -> Arc<Self> {
        Arc::new(Self { decline: true })
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_intent(
        &self,
        _amount_cents: i64,
        _currency: &str,
        reference: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        Ok(PaymentIntent {
            provider_ref: format!("pi_{reference}"),
            client_secret: Some("cs_test".to_string()),
        })
    }

    async fn confirm_intent(&self, _provider_ref: &str) -> Result<ChargeOutcome, GatewayError> {
        if self.decline {
            Ok(ChargeOutcome::Declined("card_declined".to_string()))
        } else {
            Ok(ChargeOutcome::Captured)
        }
    }

    async fn refund_charge(&self, _provider_ref: &str) -> Result<(), GatewayError> {
        Ok(())
    }
}
