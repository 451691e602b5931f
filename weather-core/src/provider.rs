use crate::{Config, error::BatchFailure, model::WeatherObservation};
use async_trait::async_trait;
use serde_json::Value;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

pub use openweather::OpenWeatherProvider;

/// Result of one upstream bulk request.
pub type BatchResult = Result<Vec<WeatherObservation>, BatchFailure>;

/// A bulk weather source that answers for many cities per request.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Most city ids accepted in a single request.
    fn max_ids_per_request(&self) -> usize;

    /// Most requests allowed in a rolling one-minute window.
    fn max_requests_per_minute(&self) -> usize;

    /// Fetch one batch. Failures come back as a value so the caller can keep
    /// scheduling the remaining batches.
    async fn fetch_batch(&self, city_ids: &[Value]) -> BatchResult;
}

/// Construct the configured provider.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    if !config.is_provider_configured() {
        anyhow::bail!(
            "No API key configured for the weather provider.\n\
             Hint: run `weather configure` or set OPEN_WEATHER_API_KEY."
        );
    }

    let api_key = config.provider.api_key.clone().unwrap_or_default();
    let provider = OpenWeatherProvider::new(&config.provider, api_key)?;
    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = provider_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("No API key configured"));
        assert!(err.to_string().contains("Hint: run `weather configure`"));
    }

    #[test]
    fn provider_from_config_rejects_empty_key() {
        let mut cfg = Config::default();
        cfg.set_api_key(String::new());
        assert!(provider_from_config(&cfg).is_err());
    }

    #[test]
    fn provider_from_config_carries_limits() {
        let mut cfg = Config::default();
        cfg.set_api_key("KEY".to_string());
        cfg.provider.max_ids_per_request = 5;
        cfg.provider.max_requests_per_minute = 7;

        let provider = provider_from_config(&cfg).expect("provider should build");
        assert_eq!(provider.max_ids_per_request(), 5);
        assert_eq!(provider.max_requests_per_minute(), 7);
    }
}
