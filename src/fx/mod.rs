//! FX rate resolution
//!
//! The sole source of conversion factors for the wallet ledger. Rates come
//! from a tiered lookup: in-memory cache, persisted rate rows, reciprocal of
//! the reverse row, anchor-currency triangulation, and finally an on-demand
//! fetch from the external source.

pub mod error;
pub mod handlers;
pub mod service;
pub mod source;
pub mod store;

pub use error::FxError;
pub use service::FxService;
pub use source::{ExchangeRateApi, MockRateSource, RateSource};
pub use store::{MemoryRateStore, PgRateStore, RateStore};
