//! Tiered FX rate resolution

use dashmap::DashMap;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use super::error::FxError;
use super::source::RateSource;
use super::store::RateStore;
use crate::config::FxConfig;

/// Resolves conversion factors for the wallet ledger.
///
/// Resolution order for `get_rate(base, target)`:
/// 1. base == target -> 1
/// 2. in-memory cache hit
/// 3. exact stored row
/// 4. reciprocal of the reverse stored row
/// 5. triangulation through the anchor currency (two direct lookups, one hop)
/// 6. synchronous pair refresh from the external source, then cache re-check
pub struct FxService {
    store: Arc<dyn RateStore>,
    source: Arc<dyn RateSource>,
    /// Per-base cache row: base -> (target -> rate). Read-through accelerator,
    /// never the sole source of truth.
    cache: DashMap<String, HashMap<String, Decimal>>,
    /// Supported currency set; extended only via `add_currency`
    currencies: RwLock<Vec<String>>,
    anchor: String,
}

impl FxService {
    pub fn new(store: Arc<dyn RateStore>, source: Arc<dyn RateSource>, config: &FxConfig) -> Self {
        let mut currencies: Vec<String> = Vec::with_capacity(config.currencies.len());
        for code in &config.currencies {
            let code = code.to_uppercase();
            if !currencies.contains(&code) {
                currencies.push(code);
            }
        }

        Self {
            store,
            source,
            cache: DashMap::new(),
            currencies: RwLock::new(currencies),
            anchor: config.anchor_currency.to_uppercase(),
        }
    }

    /// Snapshot of the supported currency list
    pub fn supported_currencies(&self) -> Vec<String> {
        self.currencies.read().unwrap().clone()
    }

    /// Register a new supported currency; Conflict if already present
    pub fn add_currency(&self, code: &str) -> Result<Vec<String>, FxError> {
        let code = code.to_uppercase();
        let mut currencies = self.currencies.write().unwrap();
        if currencies.contains(&code) {
            return Err(FxError::CurrencyExists(code));
        }
        currencies.push(code);
        Ok(currencies.clone())
    }

    fn cached(&self, base: &str, target: &str) -> Option<Decimal> {
        self.cache
            .get(base)
            .and_then(|row| row.get(target).copied())
    }

    /// Tiers 2-4: cache, stored row, reciprocal of the reverse row.
    /// Used directly by `get_rate` and for each triangulation leg, which
    /// bounds resolution at one anchor hop instead of recursing.
    async fn lookup_direct(&self, base: &str, target: &str) -> Result<Option<Decimal>, FxError> {
        if let Some(rate) = self.cached(base, target) {
            return Ok(Some(rate));
        }

        if let Some(rate) = self.store.get(base, target).await? {
            self.cache
                .entry(base.to_string())
                .or_default()
                .insert(target.to_string(), rate);
            return Ok(Some(rate));
        }

        if let Some(reverse) = self.store.get(target, base).await?
            && reverse > Decimal::ZERO
        {
            return Ok(Some(Decimal::ONE / reverse));
        }

        Ok(None)
    }

    /// Get exchange rate between two currencies
    pub async fn get_rate(&self, base: &str, target: &str) -> Result<Decimal, FxError> {
        let base = base.to_uppercase();
        let target = target.to_uppercase();

        if base == target {
            return Ok(Decimal::ONE);
        }

        if let Some(rate) = self.lookup_direct(&base, &target).await? {
            return Ok(rate);
        }

        // Triangulate via the anchor when neither side is the anchor itself
        if base != self.anchor && target != self.anchor {
            let to_anchor = self.lookup_direct(&base, &self.anchor).await?;
            let from_anchor = self.lookup_direct(&self.anchor, &target).await?;
            if let (Some(x), Some(y)) = (to_anchor, from_anchor) {
                return Ok(x * y);
            }
        }

        // Last resort: fetch the missing pair, then re-check the cache.
        // Source errors propagate; there is no implicit default rate.
        self.refresh_pair(&base, &target).await?;

        self.cached(&base, &target)
            .ok_or_else(|| FxError::RateUnavailable(base, target))
    }

    /// Fetch exactly one directed rate and update both store and cache
    pub async fn refresh_pair(&self, base: &str, target: &str) -> Result<(), FxError> {
        let base = base.to_uppercase();
        let target = target.to_uppercase();

        tracing::info!(%base, %target, "Refreshing exchange rate pair");
        let rate = self.source.fetch_pair(&base, &target).await?;
        if rate <= Decimal::ZERO {
            return Err(FxError::Source(format!(
                "Non-positive rate {} for {}/{}",
                rate, base, target
            )));
        }

        self.store.upsert(&base, &target, rate).await?;
        self.cache.entry(base).or_default().insert(target, rate);
        Ok(())
    }

    /// Full refresh: fetch a complete table for every supported base currency.
    ///
    /// Each base is independent and best-effort; one failing base is logged
    /// and does not abort the others. Runs at startup and on a schedule.
    pub async fn refresh_all(&self) {
        tracing::info!("Updating exchange rates...");
        let mut failed = 0usize;

        for base in self.supported_currencies() {
            if let Err(e) = self.refresh_base(&base).await {
                failed += 1;
                tracing::warn!(%base, error = %e, "Failed to refresh rates for base currency");
            }
        }

        if failed == 0 {
            tracing::info!("Exchange rates updated successfully");
        } else {
            tracing::warn!(failed, "Exchange rate refresh finished with failures");
        }
    }

    async fn refresh_base(&self, base: &str) -> Result<(), FxError> {
        let table = self.source.fetch_table(base).await?;
        let mut row = HashMap::new();

        for target in self.supported_currencies() {
            if target == base {
                continue;
            }
            if let Some(&rate) = table.get(&target)
                && rate > Decimal::ZERO
            {
                self.store.upsert(base, &target, rate).await?;
                row.insert(target, rate);
            }
        }

        // Replace this base's cache row wholesale
        self.cache.insert(base.to_string(), row);
        Ok(())
    }

    /// Pairwise rate matrix over the supported currency set
    pub async fn get_all_rates(
        &self,
    ) -> Result<BTreeMap<String, BTreeMap<String, Decimal>>, FxError> {
        let currencies = self.supported_currencies();
        let mut matrix = BTreeMap::new();

        for base in &currencies {
            let mut row = BTreeMap::new();
            for target in &currencies {
                if base != target {
                    row.insert(target.clone(), self.get_rate(base, target).await?);
                }
            }
            matrix.insert(base.clone(), row);
        }

        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::source::MockRateSource;
    use crate::fx::store::MemoryRateStore;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn service(store: Arc<MemoryRateStore>, source: MockRateSource) -> FxService {
        FxService::new(store, Arc::new(source), &FxConfig::default())
    }

    #[tokio::test]
    async fn same_currency_rate_is_one() {
        let fx = service(Arc::new(MemoryRateStore::new()), MockRateSource::new());
        let rate = fx.get_rate("USD", "USD").await.unwrap();
        assert_eq!(rate, Decimal::ONE);
    }

    #[tokio::test]
    async fn stored_row_resolves() {
        let store = Arc::new(MemoryRateStore::new().with_rate("NGN", "USD", dec("0.0013")));
        let fx = service(store, MockRateSource::new());
        assert_eq!(fx.get_rate("NGN", "USD").await.unwrap(), dec("0.0013"));
        // Second resolution comes from the populated cache
        assert_eq!(fx.cached("NGN", "USD"), Some(dec("0.0013")));
    }

    #[tokio::test]
    async fn reverse_row_is_inverted() {
        let store = Arc::new(MemoryRateStore::new().with_rate("USD", "NGN", dec("800")));
        let fx = service(store, MockRateSource::new());
        let rate = fx.get_rate("NGN", "USD").await.unwrap();
        assert_eq!(rate, Decimal::ONE / dec("800"));
    }

    #[tokio::test]
    async fn triangulates_via_anchor() {
        // Only the anchor legs exist; (NGN, EUR) is absent everywhere.
        let store = Arc::new(
            MemoryRateStore::new()
                .with_rate("NGN", "USD", dec("0.0013"))
                .with_rate("USD", "EUR", dec("0.9")),
        );
        // Empty source: reaching tier 6 would error, so success proves tier 5
        let fx = service(store, MockRateSource::new());
        assert_eq!(fx.get_rate("NGN", "EUR").await.unwrap(), dec("0.00117"));
    }

    #[tokio::test]
    async fn falls_back_to_pair_refresh() {
        let store = Arc::new(MemoryRateStore::new());
        let source = MockRateSource::new().with_rate("NGN", "GBP", dec("0.001"));
        let fx = service(store.clone(), source);

        assert_eq!(fx.get_rate("NGN", "GBP").await.unwrap(), dec("0.001"));
        // The on-demand refresh persisted the fetched pair
        assert_eq!(store.get("NGN", "GBP").await.unwrap(), Some(dec("0.001")));
    }

    #[tokio::test]
    async fn source_failure_propagates() {
        let fx = service(
            Arc::new(MemoryRateStore::new()),
            MockRateSource::new().failing_for("NGN"),
        );
        let err = fx.get_rate("NGN", "GBP").await.unwrap_err();
        assert!(matches!(err, FxError::Source(_)));
    }

    #[tokio::test]
    async fn refresh_all_skips_failing_base() {
        let store = Arc::new(MemoryRateStore::new());
        let source = MockRateSource::new()
            .with_rate("USD", "EUR", dec("0.9"))
            .with_rate("USD", "GBP", dec("0.75"))
            .with_rate("USD", "NGN", dec("800"))
            .failing_for("NGN")
            .failing_for("EUR")
            .failing_for("GBP");
        let fx = service(store.clone(), source);

        fx.refresh_all().await;

        // USD table landed despite the other bases failing
        assert_eq!(store.get("USD", "EUR").await.unwrap(), Some(dec("0.9")));
        assert_eq!(store.get("USD", "NGN").await.unwrap(), Some(dec("800")));
        assert_eq!(store.get("EUR", "USD").await.unwrap(), None);
    }

    #[test]
    fn config_duplicates_collapse_to_one_entry() {
        let mut config = FxConfig::default();
        config.currencies = vec!["usd".to_string(), "NGN".to_string(), "USD".to_string()];
        let fx = FxService::new(
            Arc::new(MemoryRateStore::new()),
            Arc::new(MockRateSource::new()),
            &config,
        );
        assert_eq!(
            fx.supported_currencies(),
            vec!["USD".to_string(), "NGN".to_string()]
        );
    }

    #[tokio::test]
    async fn add_currency_rejects_duplicate() {
        let fx = service(Arc::new(MemoryRateStore::new()), MockRateSource::new());
        let err = fx.add_currency("ngn").unwrap_err();
        assert!(matches!(err, FxError::CurrencyExists(_)));

        let updated = fx.add_currency("JPY").unwrap();
        assert!(updated.contains(&"JPY".to_string()));
    }

    #[tokio::test]
    async fn all_rates_builds_full_matrix() {
        let store = Arc::new(
            MemoryRateStore::new()
                .with_rate("USD", "EUR", dec("0.9"))
                .with_rate("USD", "GBP", dec("0.75"))
                .with_rate("USD", "NGN", dec("800")),
        );
        let fx = service(store, MockRateSource::new());

        let matrix = fx.get_all_rates().await.unwrap();
        assert_eq!(matrix.len(), 4);
        // Direct, inverted, and triangulated entries all present
        assert_eq!(matrix["USD"]["NGN"], dec("800"));
        assert_eq!(matrix["EUR"]["USD"], Decimal::ONE / dec("0.9"));
        assert_eq!(
            matrix["NGN"]["GBP"],
            (Decimal::ONE / dec("800")) * dec("0.75")
        );
        assert!(matrix["USD"].get("USD").is_none());
    }
}
