use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::postgres::PgRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Funding,
    Conversion,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Funding => "FUNDING",
            TransactionType::Conversion => "CONVERSION",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FUNDING" => Ok(TransactionType::Funding),
            "CONVERSION" => Ok(TransactionType::Conversion),
            other => Err(format!("unknown transaction type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TransactionStatus::Pending),
            "COMPLETED" => Ok(TransactionStatus::Completed),
            "FAILED" => Ok(TransactionStatus::Failed),
            other => Err(format!("unknown transaction status: {}", other)),
        }
    }
}

/// Completed or failed money movement. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: i64,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub status: TransactionStatus,
    pub amount: Decimal,
    pub from_currency: String,
    pub to_currency: String,
    /// 1 for FUNDING movements
    pub exchange_rate: Decimal,
    pub created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for Transaction {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let tx_type: String = row.try_get("tx_type")?;
        let status: String = row.try_get("status")?;

        let decode = |field: &'static str, e: String| sqlx::Error::ColumnDecode {
            index: field.to_string(),
            source: e.into(),
        };

        Ok(Transaction {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            tx_type: tx_type.parse().map_err(|e| decode("tx_type", e))?,
            status: status.parse().map_err(|e| decode("status", e))?,
            amount: row.try_get("amount")?,
            from_currency: row.try_get("from_currency")?,
            to_currency: row.try_get("to_currency")?,
            exchange_rate: row.try_get("exchange_rate")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Fields for a ledger append; id and created_at are assigned on insert
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: i64,
    pub tx_type: TransactionType,
    pub status: TransactionStatus,
    pub amount: Decimal,
    pub from_currency: String,
    pub to_currency: String,
    pub exchange_rate: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_roundtrip() {
        assert_eq!(
            "FUNDING".parse::<TransactionType>().unwrap(),
            TransactionType::Funding
        );
        assert_eq!(TransactionType::Conversion.as_str(), "CONVERSION");
        assert!("TRANSFER".parse::<TransactionType>().is_err());
    }

    #[test]
    fn status_roundtrip() {
        assert_eq!(
            "COMPLETED".parse::<TransactionStatus>().unwrap(),
            TransactionStatus::Completed
        );
        assert!("DONE".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn transaction_serializes_camel_case() {
        let txn = Transaction {
            id: Uuid::new_v4(),
            user_id: 1001,
            tx_type: TransactionType::Funding,
            status: TransactionStatus::Completed,
            amount: Decimal::new(100000, 2),
            from_currency: "NGN".to_string(),
            to_currency: "NGN".to_string(),
            exchange_rate: Decimal::ONE,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&txn).unwrap();
        assert_eq!(json["type"], "FUNDING");
        assert_eq!(json["status"], "COMPLETED");
        assert_eq!(json["fromCurrency"], "NGN");
        assert!(json.get("tx_type").is_none());
    }
}
