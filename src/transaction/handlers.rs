use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

use super::ledger::TransactionLedger;
use super::types::Transaction;
use crate::auth::Claims;
use crate::gateway::{
    state::AppState,
    types::{ApiResponse, error_codes},
};

type Rejection = (StatusCode, Json<ApiResponse<()>>);

fn internal(e: sqlx::Error) -> Rejection {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::error(
            error_codes::INTERNAL_ERROR,
            e.to_string(),
        )),
    )
}

/// GET /transactions - caller's movement history, newest first
pub async fn get_user_transactions(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<Vec<Transaction>>>, Rejection> {
    let transactions = TransactionLedger::list_for_user(state.db.pool(), claims.user_id())
        .await
        .map_err(internal)?;
    Ok(Json(ApiResponse::success(transactions)))
}

/// GET /transactions/{id}
pub async fn get_transaction_by_id(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Transaction>>, Rejection> {
    let not_found = || {
        (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<()>::error(
                error_codes::NOT_FOUND,
                format!("Transaction {} not found", id),
            )),
        )
    };

    let transaction = TransactionLedger::get(state.db.pool(), id)
        .await
        .map_err(internal)?
        .ok_or_else(not_found)?;

    // A transaction is visible only to the user it belongs to
    if transaction.user_id != claims.user_id() {
        return Err(not_found());
    }

    Ok(Json(ApiResponse::success(transaction)))
}
