//! Wallet ledger and transfer orchestration

pub mod error;
pub mod handlers;
pub mod service;
pub mod types;

pub use error::WalletError;
pub use service::WalletService;
pub use types::{ConversionOutcome, Wallet};
