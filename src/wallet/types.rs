use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::gateway::types::StrictDecimal;
use crate::transaction::{LinkedTransaction, Transaction};

/// Per-(user, currency) balance record. Created lazily with balance 0 on
/// first touch; mutated only inside an atomic movement operation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: i64,
    pub currency: String,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Requests ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundRequest {
    pub currency: String,
    /// Format validated at the Serde layer; must be > 0
    pub amount: StrictDecimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRequest {
    pub from_currency: String,
    pub to_currency: String,
    pub amount: StrictDecimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferWithIdempotencyRequest {
    pub from_currency: String,
    pub to_currency: String,
    pub amount: StrictDecimal,
    /// Unique client token; repeated requests with the same key execute once
    pub idempotency_key: String,
}

// --- Responses ---

/// Result bundle of a successful conversion: the ledger row plus both
/// wallets with post-mutation balances
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOutcome {
    pub transaction: Transaction,
    pub source_wallet: Wallet,
    pub dest_wallet: Wallet,
    pub converted_amount: Decimal,
    pub exchange_rate: Decimal,
}

impl LinkedTransaction for ConversionOutcome {
    fn transaction_id(&self) -> Option<Uuid> {
        Some(self.transaction.id)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdempotencyKeyResponse {
    pub idempotency_key: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{TransactionStatus, TransactionType};
    use std::str::FromStr;

    fn sample_wallet(currency: &str, balance: &str) -> Wallet {
        Wallet {
            id: Uuid::new_v4(),
            user_id: 1001,
            currency: currency.to_string(),
            balance: Decimal::from_str(balance).unwrap(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn deserialize_trade_request() {
        let json = r#"{"fromCurrency":"NGN","toCurrency":"USD","amount":"100"}"#;
        let req: TradeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.from_currency, "NGN");
        assert_eq!(*req.amount, Decimal::from(100));
    }

    #[test]
    fn deserialize_transfer_request_requires_key() {
        let json = r#"{"fromCurrency":"NGN","toCurrency":"USD","amount":"100"}"#;
        let result: Result<TransferWithIdempotencyRequest, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn outcome_roundtrips_through_json() {
        // The idempotency coordinator caches outcomes as JSON and replays
        // them; the serialized form must deserialize back unchanged.
        let outcome = ConversionOutcome {
            transaction: Transaction {
                id: Uuid::new_v4(),
                user_id: 1001,
                tx_type: TransactionType::Conversion,
                status: TransactionStatus::Completed,
                amount: Decimal::from(100),
                from_currency: "NGN".to_string(),
                to_currency: "USD".to_string(),
                exchange_rate: Decimal::from_str("0.0013").unwrap(),
                created_at: Utc::now(),
            },
            source_wallet: sample_wallet("NGN", "900"),
            dest_wallet: sample_wallet("USD", "0.13"),
            converted_amount: Decimal::from_str("0.13").unwrap(),
            exchange_rate: Decimal::from_str("0.0013").unwrap(),
        };

        let json = serde_json::to_value(&outcome).unwrap();
        let back: ConversionOutcome = serde_json::from_value(json.clone()).unwrap();

        assert_eq!(back.transaction.id, outcome.transaction.id);
        assert_eq!(back.converted_amount, outcome.converted_amount);
        assert_eq!(back.transaction_id(), Some(outcome.transaction.id));
        assert_eq!(json["sourceWallet"]["currency"], "NGN");
    }
}
