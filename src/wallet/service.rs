//! Transfer orchestration
//!
//! Three movement kinds (fund, convert, convert-with-idempotency) share one
//! mutation protocol: all wallet and ledger writes for a movement commit in
//! a single database transaction or not at all.

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction as PgTransaction};
use std::sync::Arc;
use uuid::Uuid;

use super::error::WalletError;
use super::types::{ConversionOutcome, Wallet};
use crate::fx::FxService;
use crate::transaction::{
    NewTransaction, TransactionLedger, TransactionStatus, TransactionType, idempotency,
};

pub struct WalletService {
    pool: PgPool,
    fx: Arc<FxService>,
}

impl WalletService {
    pub fn new(pool: PgPool, fx: Arc<FxService>) -> Self {
        Self { pool, fx }
    }

    /// All wallets for a user, ordered by currency
    pub async fn list_wallets(&self, user_id: i64) -> Result<Vec<Wallet>, WalletError> {
        let wallets = sqlx::query_as::<_, Wallet>(
            "SELECT id, user_id, currency, balance, created_at, updated_at
             FROM wallets_tb
             WHERE user_id = $1
             ORDER BY currency ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(wallets)
    }

    /// Upsert-on-read: a wallet the user has never held is created with
    /// balance 0, not reported as an error
    pub async fn get_or_create(&self, user_id: i64, currency: &str) -> Result<Wallet, WalletError> {
        let currency = currency.to_uppercase();
        Self::ensure_wallet(&self.pool, user_id, &currency).await?;

        let wallet = sqlx::query_as::<_, Wallet>(
            "SELECT id, user_id, currency, balance, created_at, updated_at
             FROM wallets_tb
             WHERE user_id = $1 AND currency = $2",
        )
        .bind(user_id)
        .bind(&currency)
        .fetch_one(&self.pool)
        .await?;

        Ok(wallet)
    }

    /// Deposit into a wallet, creating it on first touch
    pub async fn fund(
        &self,
        user_id: i64,
        currency: &str,
        amount: Decimal,
    ) -> Result<Wallet, WalletError> {
        if amount <= Decimal::ZERO {
            return Err(WalletError::InvalidAmount);
        }
        let currency = currency.to_uppercase();

        let mut tx = self.pool.begin().await?;

        Self::ensure_wallet(&mut *tx, user_id, &currency).await?;

        // The UPDATE takes the row lock; concurrent movements on this wallet
        // serialize their read-modify-write here
        let wallet = sqlx::query_as::<_, Wallet>(
            "UPDATE wallets_tb
             SET balance = balance + $3, updated_at = NOW()
             WHERE user_id = $1 AND currency = $2
             RETURNING id, user_id, currency, balance, created_at, updated_at",
        )
        .bind(user_id)
        .bind(&currency)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await?;

        TransactionLedger::insert(
            &mut *tx,
            &NewTransaction {
                user_id,
                tx_type: TransactionType::Funding,
                status: TransactionStatus::Completed,
                amount,
                from_currency: currency.clone(),
                to_currency: currency,
                exchange_rate: Decimal::ONE, // same currency, 1:1
            },
        )
        .await?;

        tx.commit().await?;
        Ok(wallet)
    }

    /// Same-user currency conversion
    pub async fn convert(
        &self,
        user_id: i64,
        from: &str,
        to: &str,
        amount: Decimal,
    ) -> Result<ConversionOutcome, WalletError> {
        self.execute_conversion(user_id, from, to, amount).await
    }

    /// Conversion gated by the idempotency coordinator: at most one
    /// execution per key, cached replay afterwards
    pub async fn convert_with_idempotency(
        &self,
        user_id: i64,
        from: &str,
        to: &str,
        amount: Decimal,
        key: &str,
    ) -> Result<ConversionOutcome, WalletError> {
        idempotency::process(&self.pool, key, || {
            self.execute_conversion(user_id, from, to, amount)
        })
        .await
    }

    async fn execute_conversion(
        &self,
        user_id: i64,
        from: &str,
        to: &str,
        amount: Decimal,
    ) -> Result<ConversionOutcome, WalletError> {
        let from = from.to_uppercase();
        let to = to.to_uppercase();

        if from == to {
            return Err(WalletError::SameCurrency);
        }
        if amount <= Decimal::ZERO {
            return Err(WalletError::InvalidAmount);
        }

        // Resolve the rate before taking any row lock: resolution may block
        // on an outbound fetch and must not hold wallet locks while it does
        let exchange_rate = self.fx.get_rate(&from, &to).await?;
        let converted_amount = amount * exchange_rate;

        let mut tx = self.pool.begin().await?;

        // Create-then-lock both wallets in lexicographic currency order so
        // opposite-direction transfers between the same pair cannot deadlock
        let (first, second) = if from < to { (&from, &to) } else { (&to, &from) };
        Self::ensure_wallet(&mut *tx, user_id, first).await?;
        Self::ensure_wallet(&mut *tx, user_id, second).await?;

        let first_wallet = Self::lock_wallet(&mut tx, user_id, first).await?;
        let second_wallet = Self::lock_wallet(&mut tx, user_id, second).await?;
        let source = if first_wallet.currency == from {
            first_wallet
        } else {
            second_wallet
        };

        if source.balance < amount {
            // Dropping the transaction rolls everything back
            return Err(WalletError::InsufficientFunds(from));
        }

        let source_wallet = sqlx::query_as::<_, Wallet>(
            "UPDATE wallets_tb
             SET balance = balance - $3, updated_at = NOW()
             WHERE user_id = $1 AND currency = $2
             RETURNING id, user_id, currency, balance, created_at, updated_at",
        )
        .bind(user_id)
        .bind(&from)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await?;

        let dest_wallet = sqlx::query_as::<_, Wallet>(
            "UPDATE wallets_tb
             SET balance = balance + $3, updated_at = NOW()
             WHERE user_id = $1 AND currency = $2
             RETURNING id, user_id, currency, balance, created_at, updated_at",
        )
        .bind(user_id)
        .bind(&to)
        .bind(converted_amount)
        .fetch_one(&mut *tx)
        .await?;

        let transaction = TransactionLedger::insert(
            &mut *tx,
            &NewTransaction {
                user_id,
                tx_type: TransactionType::Conversion,
                status: TransactionStatus::Completed,
                amount,
                from_currency: from,
                to_currency: to,
                exchange_rate,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            transaction_id = %transaction.id,
            user_id,
            %exchange_rate,
            "Conversion committed: {} {} -> {} {}",
            amount,
            transaction.from_currency,
            converted_amount,
            transaction.to_currency,
        );

        Ok(ConversionOutcome {
            transaction,
            source_wallet,
            dest_wallet,
            converted_amount,
            exchange_rate,
        })
    }

    async fn ensure_wallet<'e, E>(executor: E, user_id: i64, currency: &str) -> Result<(), sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query(
            "INSERT INTO wallets_tb (id, user_id, currency, balance)
             VALUES ($1, $2, $3, 0)
             ON CONFLICT (user_id, currency) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(currency)
        .execute(executor)
        .await?;
        Ok(())
    }

    async fn lock_wallet(
        tx: &mut PgTransaction<'_, Postgres>,
        user_id: i64,
        currency: &str,
    ) -> Result<Wallet, sqlx::Error> {
        sqlx::query_as::<_, Wallet>(
            "SELECT id, user_id, currency, balance, created_at, updated_at
             FROM wallets_tb
             WHERE user_id = $1 AND currency = $2
             FOR UPDATE",
        )
        .bind(user_id)
        .bind(currency)
        .fetch_one(&mut **tx)
        .await
    }
}
