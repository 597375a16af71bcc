use std::sync::Arc;

use db::DBService;
use server::{AppState, router};
use services::services::{
    balance_audit::BalanceAuditService,
    config::Config,
    gateway::{HttpPaymentGateway, PaymentGateway},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();

    let db = DBService::new(&config.database_url).await?;
    info!(database_url = %config.database_url, "database ready");

    let gateway: Arc<dyn PaymentGateway> = Arc::new(HttpPaymentGateway::new(
        config.payment_provider_url.clone(),
        config.payment_provider_secret.clone(),
    )?);

    BalanceAuditService::spawn(db.clone(), config.balance_audit_interval_secs).await;

    let state = AppState::new(db, &config, gateway);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
