pub mod state;
pub mod types;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::auth::middleware::jwt_auth_middleware;
use crate::config::GatewayConfig;
use crate::{fx, transaction, wallet};
use state::AppState;
use types::{ApiResponse, error_codes};

/// GET /health - database probe
async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<&'static str>>, (StatusCode, Json<ApiResponse<()>>)> {
    state.db.health_check().await.map_err(|e| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::<()>::error(
                error_codes::SERVICE_UNAVAILABLE,
                e.to_string(),
            )),
        )
    })?;
    Ok(Json(ApiResponse::success("ok")))
}

/// Build the full application router
pub fn build_router(state: Arc<AppState>) -> Router {
    let wallet_routes = Router::new()
        .route("/", get(wallet::handlers::get_wallets))
        .route("/fund", post(wallet::handlers::fund_wallet))
        .route("/trade", post(wallet::handlers::trade_funds))
        .route("/convert", post(wallet::handlers::trade_funds))
        .route(
            "/transfer-with-idempotency",
            post(wallet::handlers::transfer_with_idempotency),
        )
        .route(
            "/generate-idempotency-key",
            get(wallet::handlers::generate_idempotency_key),
        );

    let fx_routes = Router::new()
        .route("/rates", get(fx::handlers::get_all_rates))
        .route("/rates/{from}/{to}", get(fx::handlers::get_rate))
        .route(
            "/currencies",
            get(fx::handlers::get_currencies).post(fx::handlers::add_currency),
        );

    let transaction_routes = Router::new()
        .route("/", get(transaction::handlers::get_user_transactions))
        .route("/{id}", get(transaction::handlers::get_transaction_by_id));

    let protected = Router::new()
        .nest("/wallet", wallet_routes)
        .nest("/fx", fx_routes)
        .nest("/transactions", transaction_routes)
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected)
        .with_state(state)
}

/// Start the HTTP gateway server
pub async fn run_server(config: &GatewayConfig, state: Arc<AppState>) -> std::io::Result<()> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Gateway listening on http://{}", addr);
    axum::serve(listener, app).await
}
