use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::error::FxError;
use crate::gateway::{
    state::AppState,
    types::{ApiResponse, error_codes},
};

type Rejection = (StatusCode, Json<ApiResponse<()>>);

fn reject(e: FxError) -> Rejection {
    let (status, code) = match &e {
        FxError::RateUnavailable(_, _) => (StatusCode::NOT_FOUND, error_codes::NOT_FOUND),
        FxError::Source(_) => (StatusCode::BAD_GATEWAY, error_codes::UPSTREAM_ERROR),
        FxError::CurrencyExists(_) => (StatusCode::CONFLICT, error_codes::CURRENCY_EXISTS),
        FxError::Database(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_codes::INTERNAL_ERROR,
        ),
    };
    (status, Json(ApiResponse::<()>::error(code, e.to_string())))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateData {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct AddCurrencyRequest {
    pub currency: String,
}

/// GET /fx/rates
pub async fn get_all_rates(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<BTreeMap<String, BTreeMap<String, Decimal>>>>, Rejection> {
    let matrix = state.fx.get_all_rates().await.map_err(reject)?;
    Ok(Json(ApiResponse::success(matrix)))
}

/// GET /fx/rates/{from}/{to}
pub async fn get_rate(
    State(state): State<Arc<AppState>>,
    Path((from, to)): Path<(String, String)>,
) -> Result<Json<ApiResponse<RateData>>, Rejection> {
    let rate = state.fx.get_rate(&from, &to).await.map_err(reject)?;
    Ok(Json(ApiResponse::success(RateData {
        from_currency: from.to_uppercase(),
        to_currency: to.to_uppercase(),
        rate,
    })))
}

/// GET /fx/currencies
pub async fn get_currencies(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<Vec<String>>> {
    Json(ApiResponse::success(state.fx.supported_currencies()))
}

/// POST /fx/currencies - register a new supported currency
pub async fn add_currency(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddCurrencyRequest>,
) -> Result<Json<ApiResponse<Vec<String>>>, Rejection> {
    if req.currency.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error(
                error_codes::INVALID_PARAMETER,
                "currency must not be empty",
            )),
        ));
    }

    let currencies = state.fx.add_currency(&req.currency).map_err(reject)?;
    Ok(Json(ApiResponse::success(currencies)))
}
