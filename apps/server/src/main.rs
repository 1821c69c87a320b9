//! Campus Market server entry point.
//!
//! Wires configuration, tracing, the database, the checkout provider, and
//! the axum router together.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use market_db::{Database, DbConfig};
use market_pay::HostedCheckout;
use market_server::routes;
use market_server::{AppState, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env is optional; real deployments set the environment directly
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::load()?;
    info!(port = config.http_port, "Starting Campus Market server");

    let db = Database::new(DbConfig::new(&config.database_path)).await?;

    let provider = Arc::new(HostedCheckout::new(
        config.checkout_base_url.clone(),
        config.checkout_api_key.clone(),
    ));

    let state = AppState::new(db, provider, config.success_url(), config.cancel_url());
    let app = routes::router(state);

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Listening");

    axum::serve(listener, app).await?;
    Ok(())
}
