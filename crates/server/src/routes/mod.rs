pub mod admin;
pub mod auth;
pub mod cart;
pub mod entitlements;
pub mod health;
pub mod orders;
pub mod payments;
pub mod payouts;
pub mod prompts;
pub mod reviews;
pub mod taxonomy;
