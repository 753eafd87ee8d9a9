use thiserror::Error;

use crate::fx::FxError;
use crate::transaction::IdempotencyError;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("From and To currencies must be different")]
    SameCurrency,

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Insufficient {0} balance")]
    InsufficientFunds(String),

    #[error(transparent)]
    Fx(#[from] FxError),

    #[error(transparent)]
    Idempotency(#[from] IdempotencyError),
}
