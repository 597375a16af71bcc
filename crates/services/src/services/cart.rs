//! Cart handling for authenticated users and anonymous visitors.

use db::{
    DBService,
    models::{
        cart::{Cart, CartItemDetail},
        entitlement::Entitlement,
        prompt::{Prompt, PromptStatus},
    },
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CartError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("prompt is not available")]
    PromptUnavailable,
    #[error("cannot add your own prompt to the cart")]
    OwnPrompt,
    #[error("prompt already purchased")]
    AlreadyOwned,
    #[error("prompt is already in the cart")]
    AlreadyInCart,
    #[error("prompt is not in the cart")]
    NotInCart,
}

/// Who the cart belongs to: a logged-in user or a cookie-held anonymous key.
#[derive(Debug, Clone)]
pub enum CartOwner {
    User(Uuid),
    Anonymous(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CartView {
    pub cart_id: Uuid,
    pub items: Vec<CartItemDetail>,
    pub total_cents: i64,
}

#[derive(Clone)]
pub struct CartService {
    db: DBService,
}

impl CartService {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    pub async fn get_cart(&self, owner: &CartOwner) -> Result<CartView, CartError> {
        let cart = self.find_or_create(owner).await?;
        self.view(cart.id).await
    }

    pub async fn add_item(&self, owner: &CartOwner, prompt_id: Uuid) -> Result<CartView, CartError> {
        let prompt = Prompt::find_by_id(&self.db.pool, prompt_id)
            .await?
            .ok_or(CartError::PromptUnavailable)?;
        if prompt.status != PromptStatus::Published {
            return Err(CartError::PromptUnavailable);
        }

        if let CartOwner::User(user_id) = owner {
            if prompt.seller_id == *user_id {
                return Err(CartError::OwnPrompt);
            }
            if Entitlement::find_active(&self.db.pool, *user_id, prompt.id)
                .await?
                .is_some()
            {
                return Err(CartError::AlreadyOwned);
            }
        }

        let cart = self.find_or_create(owner).await?;
        if !Cart::add_item(&self.db.pool, cart.id, prompt.id).await? {
            return Err(CartError::AlreadyInCart);
        }

        self.view(cart.id).await
    }

    pub async fn remove_item(
        &self,
        owner: &CartOwner,
        prompt_id: Uuid,
    ) -> Result<CartView, CartError> {
        let cart = self.find_or_create(owner).await?;
        if Cart::remove_item(&self.db.pool, cart.id, prompt_id).await? == 0 {
            return Err(CartError::NotInCart);
        }
        self.view(cart.id).await
    }

    /// Fold an anonymous cart into the user's cart after login. Items the
    /// user already has in their cart collapse; the anonymous cart is
    /// deleted.
    pub async fn merge_into_user(&self, anon_key: &str, user_id: Uuid) -> Result<CartView, CartError> {
        let user_cart = Cart::create_for_user(&self.db.pool, user_id).await?;

        if let Some(anon_cart) = Cart::find_by_anon_key(&self.db.pool, anon_key).await? {
            let items = Cart::items(&self.db.pool, anon_cart.id).await?;

            let mut tx = self.db.pool.begin().await?;
            for item in &items {
                Cart::add_item(&mut *tx, user_cart.id, item.prompt_id).await?;
            }
            Cart::delete(&mut *tx, anon_cart.id).await?;
            tx.commit().await?;

            info!(
                user_id = %user_id,
                merged_items = items.len(),
                "anonymous cart merged"
            );
        }

        self.view(user_cart.id).await
    }

    async fn find_or_create(&self, owner: &CartOwner) -> Result<Cart, CartError> {
        let cart = match owner {
            CartOwner::User(user_id) => Cart::create_for_user(&self.db.pool, *user_id).await?,
            CartOwner::Anonymous(key) => Cart::create_for_anon_key(&self.db.pool, key).await?,
        };
        Ok(cart)
    }

    async fn view(&self, cart_id: Uuid) -> Result<CartView, CartError> {
        let items = Cart::items(&self.db.pool, cart_id).await?;
        let total_cents = items.iter().map(|i| i.price_cents).sum();
        Ok(CartView {
            cart_id,
            items,
            total_cents,
        })
    }
}
