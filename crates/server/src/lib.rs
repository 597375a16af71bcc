pub mod auth;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use db::DBService;
use services::services::{
    auth::AuthService, cart::CartService, catalog::CatalogService, checkout::CheckoutService,
    config::Config, gateway::PaymentGateway, moderation::ModerationService, payout::PayoutService,
    review::ReviewService,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    db: DBService,
    auth: AuthService,
    cart: CartService,
    catalog: CatalogService,
    checkout: CheckoutService,
    payouts: PayoutService,
    reviews: ReviewService,
    moderation: ModerationService,
}

impl AppState {
    pub fn new(db: DBService, config: &Config, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            auth: AuthService::new(db.clone(), &config.jwt_secret, config.token_ttl_hours),
            cart: CartService::new(db.clone()),
            catalog: CatalogService::new(db.clone()),
            checkout: CheckoutService::new(db.clone(), gateway),
            payouts: PayoutService::new(db.clone(), config.min_payout_cents),
            reviews: ReviewService::new(db.clone()),
            moderation: ModerationService::new(db.clone()),
            db,
        }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn cart(&self) -> &CartService {
        &self.cart
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    pub fn checkout(&self) -> &CheckoutService {
        &self.checkout
    }

    pub fn payouts(&self) -> &PayoutService {
        &self.payouts
    }

    pub fn reviews(&self) -> &ReviewService {
        &self.reviews
    }

    pub fn moderation(&self) -> &ModerationService {
        &self.moderation
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(routes::health::router())
                .merge(routes::auth::router())
                .merge(routes::prompts::router())
                .merge(routes::taxonomy::router())
                .merge(routes::cart::router())
                .merge(routes::orders::router())
                .merge(routes::payments::router())
                .merge(routes::entitlements::router())
                .merge(routes::payouts::router())
                .merge(routes::reviews::router())
                .merge(routes::admin::router()),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
