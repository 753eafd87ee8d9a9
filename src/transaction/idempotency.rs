//! Idempotency-key protocol
//!
//! States per key: absent -> processing -> completed (terminal, response
//! cached) or back to a retryable non-processing state on failure. For a
//! fixed key the wrapped operation's side effects execute at most once
//! across any number of concurrent or sequential calls.
//!
//! The serialization point is the table's primary key: concurrent claimants
//! race through `INSERT .. ON CONFLICT DO NOTHING` and exactly one wins; the
//! loser re-reads the row and either replays the cached response, reports
//! Conflict, or re-claims a released key with a conditional update.

use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::{PgPool, Row};
use std::future::Future;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum IdempotencyError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Request with idempotency key {0} is already being processed")]
    InFlight(String),

    #[error("Failed to encode cached response: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Ties a cached response back to the ledger row it produced
pub trait LinkedTransaction {
    fn transaction_id(&self) -> Option<Uuid>;
}

/// Fresh client token for `GET /wallet/generate-idempotency-key`
pub fn generate_key() -> Uuid {
    Uuid::new_v4()
}

/// Execute `op` at most once for the given key.
///
/// A completed key replays the stored response without re-executing `op`.
/// A key currently in flight fails with `InFlight`. A key released by an
/// earlier failure is re-claimed and retried. Only a failed `op` releases
/// the key; failures while recording a success leave it claimed.
pub async fn process<T, E, F, Fut>(pool: &PgPool, key: &str, op: F) -> Result<T, E>
where
    T: Serialize + DeserializeOwned + LinkedTransaction,
    E: From<IdempotencyError>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let db = |e: sqlx::Error| E::from(IdempotencyError::from(e));

    // Claim the key. The insert commits before `op` runs, so a concurrent
    // caller observes "processing" immediately.
    let claimed = sqlx::query(
        "INSERT INTO idempotency_keys_tb (key, is_processing) VALUES ($1, true)
         ON CONFLICT (key) DO NOTHING",
    )
    .bind(key)
    .execute(pool)
    .await
    .map_err(db)?
    .rows_affected()
        == 1;

    if !claimed {
        let row = sqlx::query("SELECT response, is_processing FROM idempotency_keys_tb WHERE key = $1")
            .bind(key)
            .fetch_optional(pool)
            .await
            .map_err(db)?;

        if let Some(row) = row {
            let response: Option<serde_json::Value> = row.try_get("response").map_err(db)?;
            let is_processing: bool = row.try_get("is_processing").map_err(db)?;

            if !is_processing && let Some(cached) = response {
                tracing::info!(key, "Idempotent replay: returning cached response");
                return serde_json::from_value(cached)
                    .map_err(|e| E::from(IdempotencyError::Codec(e)));
            }
            if is_processing {
                return Err(E::from(IdempotencyError::InFlight(key.to_string())));
            }
        }

        // Key was released by a failed attempt (or the row vanished between
        // reads). Re-claim it; losing this conditional update means another
        // caller got there first.
        let reclaimed = sqlx::query(
            "UPDATE idempotency_keys_tb SET is_processing = true
             WHERE key = $1 AND is_processing = false AND response IS NULL",
        )
        .bind(key)
        .execute(pool)
        .await
        .map_err(db)?
        .rows_affected()
            == 1;

        if !reclaimed {
            return Err(E::from(IdempotencyError::InFlight(key.to_string())));
        }
    }

    match op().await {
        Ok(value) => {
            // The operation has committed. From here the key must never
            // become retryable again: a released key would let a retry
            // execute the body a second time. If recording fails the key
            // stays claimed, so later calls see InFlight instead of a
            // replay, but the committed result is still returned here.
            match serde_json::to_value(&value) {
                Ok(response) => {
                    if let Err(e) = sqlx::query(
                        "UPDATE idempotency_keys_tb
                         SET response = $2, transaction_id = $3, is_processing = false
                         WHERE key = $1",
                    )
                    .bind(key)
                    .bind(&response)
                    .bind(value.transaction_id())
                    .execute(pool)
                    .await
                    {
                        tracing::error!(key, error = %e, "Failed to record idempotent response");
                    }
                }
                Err(e) => {
                    tracing::error!(key, error = %e, "Failed to encode idempotent response");
                    link_transaction(pool, key, value.transaction_id()).await;
                }
            }

            Ok(value)
        }
        Err(e) => {
            // Leave the key retryable; the operation's error wins.
            release(pool, key).await;
            Err(e)
        }
    }
}

/// Best-effort link from a claimed key to the ledger row it produced when
/// the response itself could not be cached
async fn link_transaction(pool: &PgPool, key: &str, transaction_id: Option<Uuid>) {
    let Some(transaction_id) = transaction_id else {
        return;
    };
    if let Err(e) = sqlx::query("UPDATE idempotency_keys_tb SET transaction_id = $2 WHERE key = $1")
        .bind(key)
        .bind(transaction_id)
        .execute(pool)
        .await
    {
        tracing::error!(key, error = %e, "Failed to link transaction to idempotency key");
    }
}

async fn release(pool: &PgPool, key: &str) {
    if let Err(e) = sqlx::query(
        "UPDATE idempotency_keys_tb SET is_processing = false
         WHERE key = $1 AND response IS NULL",
    )
    .bind(key)
    .execute(pool)
    .await
    {
        tracing::error!(key, error = %e, "Failed to release idempotency key");
    }
}
