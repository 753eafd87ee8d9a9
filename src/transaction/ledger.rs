use sqlx::PgPool;
use uuid::Uuid;

use super::types::{NewTransaction, Transaction};

/// Append-only transaction ledger
pub struct TransactionLedger;

impl TransactionLedger {
    /// Append a movement record. Called inside the movement's own database
    /// transaction so the ledger row commits together with the wallet writes.
    pub async fn insert<'e, E>(executor: E, new: &NewTransaction) -> Result<Transaction, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions_tb
                (id, user_id, tx_type, status, amount, from_currency, to_currency, exchange_rate, created_at)
            VALUES
                ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            RETURNING id, user_id, tx_type, status, amount, from_currency, to_currency, exchange_rate, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(new.tx_type.as_str())
        .bind(new.status.as_str())
        .bind(new.amount)
        .bind(&new.from_currency)
        .bind(&new.to_currency)
        .bind(new.exchange_rate)
        .fetch_one(executor)
        .await
    }

    /// All movements for a user, newest first
    pub async fn list_for_user(pool: &PgPool, user_id: i64) -> Result<Vec<Transaction>, sqlx::Error> {
        sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, user_id, tx_type, status, amount, from_currency, to_currency, exchange_rate, created_at
            FROM transactions_tb
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<Transaction>, sqlx::Error> {
        sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, user_id, tx_type, status, amount, from_currency, to_currency, exchange_rate, created_at
            FROM transactions_tb
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
