use axum::{Extension, Json, extract::State, http::StatusCode};
use std::sync::Arc;

use super::error::WalletError;
use super::types::{
    ConversionOutcome, FundRequest, IdempotencyKeyResponse, TradeRequest,
    TransferWithIdempotencyRequest, Wallet,
};
use crate::auth::Claims;
use crate::fx::FxError;
use crate::gateway::{
    state::AppState,
    types::{ApiResponse, error_codes},
};
use crate::transaction::{IdempotencyError, idempotency};

type Rejection = (StatusCode, Json<ApiResponse<()>>);

/// Map a wallet error onto the response envelope
fn reject(e: WalletError) -> Rejection {
    let (status, code) = match &e {
        WalletError::SameCurrency | WalletError::InvalidAmount => {
            (StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER)
        }
        WalletError::InsufficientFunds(_) => {
            (StatusCode::BAD_REQUEST, error_codes::INSUFFICIENT_BALANCE)
        }
        WalletError::Fx(FxError::RateUnavailable(_, _)) => {
            (StatusCode::NOT_FOUND, error_codes::NOT_FOUND)
        }
        WalletError::Fx(FxError::Source(_)) => {
            (StatusCode::BAD_GATEWAY, error_codes::UPSTREAM_ERROR)
        }
        WalletError::Fx(FxError::CurrencyExists(_)) => {
            (StatusCode::CONFLICT, error_codes::CURRENCY_EXISTS)
        }
        WalletError::Idempotency(IdempotencyError::InFlight(_)) => {
            (StatusCode::CONFLICT, error_codes::DUPLICATE_REQUEST)
        }
        WalletError::Database(_)
        | WalletError::Fx(FxError::Database(_))
        | WalletError::Idempotency(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_codes::INTERNAL_ERROR,
        ),
    };
    (status, Json(ApiResponse::<()>::error(code, e.to_string())))
}

/// GET /wallet
pub async fn get_wallets(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<Vec<Wallet>>>, Rejection> {
    let wallets = state
        .wallets
        .list_wallets(claims.user_id())
        .await
        .map_err(reject)?;
    Ok(Json(ApiResponse::success(wallets)))
}

/// POST /wallet/fund
pub async fn fund_wallet(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<FundRequest>,
) -> Result<Json<ApiResponse<Wallet>>, Rejection> {
    let wallet = state
        .wallets
        .fund(claims.user_id(), &req.currency, req.amount.inner())
        .await
        .map_err(reject)?;
    Ok(Json(ApiResponse::success(wallet)))
}

/// POST /wallet/trade (alias /wallet/convert)
pub async fn trade_funds(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<TradeRequest>,
) -> Result<Json<ApiResponse<ConversionOutcome>>, Rejection> {
    let outcome = state
        .wallets
        .convert(
            claims.user_id(),
            &req.from_currency,
            &req.to_currency,
            req.amount.inner(),
        )
        .await
        .map_err(reject)?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// POST /wallet/transfer-with-idempotency
pub async fn transfer_with_idempotency(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<TransferWithIdempotencyRequest>,
) -> Result<Json<ApiResponse<ConversionOutcome>>, Rejection> {
    if req.idempotency_key.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error(
                error_codes::INVALID_PARAMETER,
                "idempotencyKey must not be empty",
            )),
        ));
    }

    let outcome = state
        .wallets
        .convert_with_idempotency(
            claims.user_id(),
            &req.from_currency,
            &req.to_currency,
            req.amount.inner(),
            &req.idempotency_key,
        )
        .await
        .map_err(reject)?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// GET /wallet/generate-idempotency-key
pub async fn generate_idempotency_key() -> Json<ApiResponse<IdempotencyKeyResponse>> {
    Json(ApiResponse::success(IdempotencyKeyResponse {
        idempotency_key: idempotency::generate_key(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_funds_maps_to_bad_request() {
        let (status, body) = reject(WalletError::InsufficientFunds("NGN".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, error_codes::INSUFFICIENT_BALANCE);
        assert!(body.msg.contains("NGN"));
    }

    #[test]
    fn in_flight_key_maps_to_conflict() {
        let (status, body) = reject(WalletError::Idempotency(IdempotencyError::InFlight(
            "k1".to_string(),
        )));
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.code, error_codes::DUPLICATE_REQUEST);
    }

    #[test]
    fn missing_rate_maps_to_not_found() {
        let (status, body) = reject(WalletError::Fx(FxError::RateUnavailable(
            "NGN".to_string(),
            "JPY".to_string(),
        )));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, error_codes::NOT_FOUND);
    }
}
