//! External rate source adapters

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

use super::error::FxError;
use crate::config::FxConfig;

/// Outbound rate fetch seam
///
/// `fetch_table` returns the full conversion table for one base currency;
/// `fetch_pair` returns exactly one directed rate. Errors propagate to the
/// caller - there is no implicit hardcoded-default tier.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_table(&self, base: &str) -> Result<HashMap<String, Decimal>, FxError>;
    async fn fetch_pair(&self, base: &str, target: &str) -> Result<Decimal, FxError>;
}

/// exchangerate-api.com v6 client
pub struct ExchangeRateApi {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

/// Wire format shared by the `/latest` and `/pair` endpoints
#[derive(Debug, Deserialize)]
struct RateApiResponse {
    result: String,
    #[serde(rename = "error-type", default)]
    error_type: Option<String>,
    #[serde(default)]
    conversion_rates: Option<HashMap<String, Decimal>>,
    #[serde(default)]
    conversion_rate: Option<Decimal>,
}

impl ExchangeRateApi {
    pub fn new(config: &FxConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    async fn get(&self, path: &str) -> Result<RateApiResponse, FxError> {
        let url = format!("{}/{}/{}", self.api_url, self.api_key, path);
        tracing::debug!(path, "Fetching external rates");

        let body: RateApiResponse = self.client.get(&url).send().await?.json().await?;

        if body.result != "success" {
            return Err(FxError::Source(format!(
                "Error fetching external rates: {}",
                body.error_type.as_deref().unwrap_or("unknown")
            )));
        }
        Ok(body)
    }
}

#[async_trait]
impl RateSource for ExchangeRateApi {
    async fn fetch_table(&self, base: &str) -> Result<HashMap<String, Decimal>, FxError> {
        let body = self.get(&format!("latest/{}", base)).await?;
        body.conversion_rates
            .ok_or_else(|| FxError::Source("Missing conversion_rates in response".to_string()))
    }

    async fn fetch_pair(&self, base: &str, target: &str) -> Result<Decimal, FxError> {
        let body = self.get(&format!("pair/{}/{}", base, target)).await?;
        body.conversion_rate
            .ok_or_else(|| FxError::Source("Missing conversion_rate in response".to_string()))
    }
}

/// In-memory rate source for tests and offline development
#[derive(Default)]
pub struct MockRateSource {
    tables: HashMap<String, HashMap<String, Decimal>>,
    failing_bases: Vec<String>,
}

impl MockRateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, base: &str, target: &str, rate: Decimal) -> Self {
        self.tables
            .entry(base.to_string())
            .or_default()
            .insert(target.to_string(), rate);
        self
    }

    /// Make every fetch for this base currency fail
    pub fn failing_for(mut self, base: &str) -> Self {
        self.failing_bases.push(base.to_string());
        self
    }
}

#[async_trait]
impl RateSource for MockRateSource {
    async fn fetch_table(&self, base: &str) -> Result<HashMap<String, Decimal>, FxError> {
        if self.failing_bases.iter().any(|b| b == base) {
            return Err(FxError::Source(format!("simulated outage for {}", base)));
        }
        self.tables
            .get(base)
            .cloned()
            .ok_or_else(|| FxError::Source(format!("no table for {}", base)))
    }

    async fn fetch_pair(&self, base: &str, target: &str) -> Result<Decimal, FxError> {
        if self.failing_bases.iter().any(|b| b == base) {
            return Err(FxError::Source(format!("simulated outage for {}", base)));
        }
        self.tables
            .get(base)
            .and_then(|t| t.get(target))
            .copied()
            .ok_or_else(|| FxError::Source(format!("no rate for {}/{}", base, target)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_latest_response() {
        let json = r#"{
            "result": "success",
            "conversion_rates": {"USD": "0.0013", "EUR": "0.0011"}
        }"#;
        let body: RateApiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.result, "success");
        assert_eq!(body.conversion_rates.unwrap().len(), 2);
    }

    #[test]
    fn parse_pair_response() {
        let json = r#"{"result": "success", "conversion_rate": 0.0013}"#;
        let body: RateApiResponse = serde_json::from_str(json).unwrap();
        assert!(body.conversion_rate.is_some());
    }

    #[test]
    fn parse_error_response() {
        let json = r#"{"result": "error", "error-type": "invalid-key"}"#;
        let body: RateApiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.result, "error");
        assert_eq!(body.error_type.as_deref(), Some("invalid-key"));
    }
}
