//! fx-wallet - Multi-currency wallet service
//!
//! Entry point. Architecture:
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────┐    ┌──────────┐
//! │  Config  │───▶│ Postgres │───▶│ Services │───▶│ Gateway  │
//! │  (YAML)  │    │ (schema) │    │(fx/wallet)│   │ (axum)   │
//! └──────────┘    └──────────┘    └──────────┘    └──────────┘
//! ```
//!
//! A background task refreshes the full rate table on a fixed interval;
//! individual lookups fall back to on-demand pair fetches.

use std::sync::Arc;
use std::time::Duration;

use fx_wallet::auth::AuthService;
use fx_wallet::config::AppConfig;
use fx_wallet::db::Database;
use fx_wallet::fx::{ExchangeRateApi, FxService, PgRateStore};
use fx_wallet::gateway::{self, state::AppState};
use fx_wallet::wallet::WalletService;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    std::env::var("APP_ENV").unwrap_or_else(|_| "default".to_string())
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let mut config = AppConfig::load(&env);
    if let Some(port) = get_port_override() {
        config.gateway.port = port;
    }

    let _log_guard = fx_wallet::logging::init_logging(&config);
    tracing::info!(
        "Starting fx-wallet {} ({}) in {} mode",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env
    );

    // Postgres: wallets, rates, ledger, idempotency keys
    let db = Arc::new(Database::connect(&config.postgres_url).await?);
    db.ensure_schema().await?;
    tracing::info!("Database connected and schema ensured");

    // FX service: Postgres-backed rate store + external rate source
    let source = Arc::new(ExchangeRateApi::new(&config.fx));
    let store = Arc::new(PgRateStore::new(db.pool().clone()));
    let fx = Arc::new(FxService::new(store, source, &config.fx));

    // Warm the rate cache; a cold start is fine, lookups fetch on demand
    fx.refresh_all().await;

    // Scheduled full refresh
    let refresh_fx = fx.clone();
    let refresh_interval = Duration::from_secs(config.fx.refresh_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(refresh_interval);
        ticker.tick().await; // first tick fires immediately, already warmed above
        loop {
            ticker.tick().await;
            refresh_fx.refresh_all().await;
        }
    });

    let wallets = Arc::new(WalletService::new(db.pool().clone(), fx.clone()));
    let auth = Arc::new(AuthService::new(config.jwt_secret.clone()));

    let state = Arc::new(AppState::new(db, auth, fx, wallets));
    gateway::run_server(&config.gateway, state).await?;

    Ok(())
}
