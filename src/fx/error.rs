use thiserror::Error;

#[derive(Error, Debug)]
pub enum FxError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Rate source error: {0}")]
    Source(String),

    #[error("Could not determine exchange rate from {0} to {1} at the moment")]
    RateUnavailable(String, String),

    #[error("Currency {0} already exists")]
    CurrencyExists(String),
}

impl From<reqwest::Error> for FxError {
    fn from(e: reqwest::Error) -> Self {
        FxError::Source(e.to_string())
    }
}
