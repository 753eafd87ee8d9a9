//! Persisted exchange rate rows
//!
//! One row per ordered (base, target) pair. Rows are directional: (A,B) and
//! (B,A) are distinct and not guaranteed to be exact reciprocals.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::error::FxError;

#[async_trait]
pub trait RateStore: Send + Sync {
    /// Exact row lookup for the ordered pair
    async fn get(&self, base: &str, target: &str) -> Result<Option<Decimal>, FxError>;

    /// Insert or overwrite the rate for the ordered pair
    async fn upsert(&self, base: &str, target: &str, rate: Decimal) -> Result<(), FxError>;
}

/// PostgreSQL-backed rate store
pub struct PgRateStore {
    pool: PgPool,
}

impl PgRateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateStore for PgRateStore {
    async fn get(&self, base: &str, target: &str) -> Result<Option<Decimal>, FxError> {
        let row = sqlx::query(
            "SELECT rate FROM exchange_rates_tb
             WHERE base_currency = $1 AND target_currency = $2",
        )
        .bind(base)
        .bind(target)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get::<Decimal, _>("rate")))
    }

    async fn upsert(&self, base: &str, target: &str, rate: Decimal) -> Result<(), FxError> {
        sqlx::query(
            "INSERT INTO exchange_rates_tb (id, base_currency, target_currency, rate, updated_at)
             VALUES ($1, $2, $3, $4, NOW())
             ON CONFLICT (base_currency, target_currency)
             DO UPDATE SET rate = EXCLUDED.rate, updated_at = NOW()",
        )
        .bind(Uuid::new_v4())
        .bind(base)
        .bind(target)
        .bind(rate)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// In-memory rate store for tests
#[derive(Default)]
pub struct MemoryRateStore {
    rates: Mutex<HashMap<(String, String), Decimal>>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(self, base: &str, target: &str, rate: Decimal) -> Self {
        self.rates
            .lock()
            .unwrap()
            .insert((base.to_string(), target.to_string()), rate);
        self
    }

    pub fn len(&self) -> usize {
        self.rates.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    async fn get(&self, base: &str, target: &str) -> Result<Option<Decimal>, FxError> {
        Ok(self
            .rates
            .lock()
            .unwrap()
            .get(&(base.to_string(), target.to_string()))
            .copied())
    }

    async fn upsert(&self, base: &str, target: &str, rate: Decimal) -> Result<(), FxError> {
        self.rates
            .lock()
            .unwrap()
            .insert((base.to_string(), target.to_string()), rate);
        Ok(())
    }
}
