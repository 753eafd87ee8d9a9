//! Transaction ledger and idempotency coordination
//!
//! The ledger is append-only: a row is written only after a movement has
//! mutated the wallets it names, and is never updated afterwards.

pub mod handlers;
pub mod idempotency;
pub mod ledger;
pub mod types;

pub use idempotency::{IdempotencyError, LinkedTransaction};
pub use ledger::TransactionLedger;
pub use types::{NewTransaction, Transaction, TransactionStatus, TransactionType};
