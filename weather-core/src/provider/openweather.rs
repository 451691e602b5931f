use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::{
    config::ProviderConfig,
    error::{BatchFailure, ProviderError},
    model::WeatherObservation,
};

use super::{BatchResult, WeatherProvider};

const GROUP_ENDPOINT: &str = "/group";

/// Client for the OpenWeather `group` endpoint, which returns current weather
/// for a comma-separated list of city ids.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    base_url: String,
    api_key: String,
    units: String,
    max_ids_per_request: usize,
    max_requests_per_minute: usize,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(config: &ProviderConfig, api_key: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client for OpenWeather")?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            units: config.units.clone(),
            max_ids_per_request: config.max_ids_per_request,
            max_requests_per_minute: config.max_requests_per_minute,
            http,
        })
    }

    /// Join city ids into the provider's comma-separated form.
    pub fn format_identifiers(city_ids: &[Value]) -> Result<String, ProviderError> {
        let ids = city_ids
            .iter()
            .map(Value::as_str)
            .collect::<Option<Vec<&str>>>();

        match ids {
            Some(ids) => Ok(ids.join(",")),
            None => {
                error!(city_ids = ?city_ids, "city_ids list must be string");
                Err(ProviderError::NonStringIdentifier(city_ids.to_vec()))
            }
        }
    }

    /// Map one entry of the response `list` into an observation.
    pub fn extract_observation(raw: &Value) -> Result<WeatherObservation, ProviderError> {
        let city_id = field(raw, raw.get("id").and_then(Value::as_i64), "id")?;
        let main = field(raw, raw.get("main"), "main")?;
        let temperature = field(raw, main.get("temp").and_then(Value::as_f64), "main.temp")?;
        let humidity = field(
            raw,
            main.get("humidity").and_then(Value::as_f64),
            "main.humidity",
        )?;

        Ok(WeatherObservation {
            city_id,
            temperature,
            humidity,
        })
    }

    /// Parse a successful `group` response body.
    pub fn parse_group_body(body: &Value) -> Result<Vec<WeatherObservation>, ProviderError> {
        let list = body
            .get("list")
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::MissingField {
                field: "list",
                record: body.clone(),
            })?;

        list.iter().map(Self::extract_observation).collect()
    }

    async fn try_fetch(&self, city_ids: &[Value]) -> BatchResult {
        let ids = Self::format_identifiers(city_ids)?;
        debug!(cities = city_ids.len(), "requesting OpenWeather group");
        let body = self.request_group(&ids).await?;
        Ok(Self::parse_group_body(&body)?)
    }

    async fn request_group(&self, ids: &str) -> Result<Value, BatchFailure> {
        let url = format!("{}{}", self.base_url, GROUP_ENDPOINT);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("id", ids),
                ("appid", self.api_key.as_str()),
                ("units", self.units.as_str()),
            ])
            .send()
            .await
            .map_err(transport_failure)?;

        let status = res.status();
        if status != StatusCode::OK {
            // The body only feeds the message; an unreadable one still
            // reports the status.
            let body = res.text().await.unwrap_or_default();
            return Err(BatchFailure::Status {
                status: status.as_u16(),
                message: server_message(status, &body),
            });
        }

        let body = res.text().await.map_err(transport_failure)?;

        serde_json::from_str(&body).map_err(|e| {
            BatchFailure::Transport(format!(
                "Failed to parse OpenWeather group JSON: {e}: {}",
                truncate_body(&body)
            ))
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    fn max_ids_per_request(&self) -> usize {
        self.max_ids_per_request
    }

    fn max_requests_per_minute(&self) -> usize {
        self.max_requests_per_minute
    }

    async fn fetch_batch(&self, city_ids: &[Value]) -> BatchResult {
        let result = self.try_fetch(city_ids).await;

        if let Err(failure) = &result {
            match failure {
                BatchFailure::Status { .. } | BatchFailure::Timeout(_) => error!("{failure}"),
                BatchFailure::Transport(_) => error!(error = ?failure, "An error occurred"),
                BatchFailure::Invalid(_) => warn!("batch aborted: {failure}"),
            }
        }

        result
    }
}

/// A required field of a `list` entry, or the error naming it.
fn field<T>(record: &Value, value: Option<T>, name: &'static str) -> Result<T, ProviderError> {
    value.ok_or_else(|| {
        error!(record = %record, field = name, "Incorrect fields provided in response");
        ProviderError::MissingField {
            field: name,
            record: record.clone(),
        }
    })
}

fn transport_failure(err: reqwest::Error) -> BatchFailure {
    if err.is_timeout() {
        BatchFailure::Timeout(err.to_string())
    } else {
        BatchFailure::Transport(format!("{err:?}"))
    }
}

/// OpenWeather reports errors as `{"cod": "...", "message": "..."}`; fall
/// back to the raw body, then the reason phrase.
fn server_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_owned));

    match from_json {
        Some(message) => message,
        None if !body.trim().is_empty() => truncate_body(body),
        None => status.canonical_reason().unwrap_or("Unknown").to_string(),
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> OpenWeatherProvider {
        let config = ProviderConfig {
            base_url: server.uri(),
            request_timeout_secs: 1,
            ..ProviderConfig::default()
        };
        OpenWeatherProvider::new(&config, "KEY".to_string()).expect("client should build")
    }

    fn ids(raw: &[&str]) -> Vec<Value> {
        raw.iter().map(|id| json!(id)).collect()
    }

    #[test]
    fn format_identifiers_joins_with_commas() {
        let formatted = OpenWeatherProvider::format_identifiers(&ids(&["123", "456", "789"]));
        assert_eq!(formatted.unwrap(), "123,456,789");
    }

    #[test]
    fn format_identifiers_rejects_non_strings() {
        let err = OpenWeatherProvider::format_identifiers(&[json!("1"), json!(2)]).unwrap_err();
        assert!(matches!(err, ProviderError::NonStringIdentifier(list) if list.len() == 2));
    }

    #[test]
    fn extract_observation_maps_fields() {
        let raw = json!({"id": 123, "main": {"temp": 25, "humidity": 80}});
        let obs = OpenWeatherProvider::extract_observation(&raw).unwrap();
        assert_eq!(
            obs,
            WeatherObservation {
                city_id: 123,
                temperature: 25.0,
                humidity: 80.0,
            }
        );
    }

    #[test]
    fn extract_observation_reports_missing_field() {
        let raw = json!({"id": 123, "main": {}});
        let err = OpenWeatherProvider::extract_observation(&raw).unwrap_err();
        assert!(matches!(err, ProviderError::MissingField { field: "main.temp", .. }));
    }

    #[test]
    fn parse_group_body_aborts_whole_batch_on_bad_entry() {
        let body = json!({"list": [
            {"id": 1, "main": {"temp": 1.5, "humidity": 10}},
            {"id": 2}
        ]});
        assert!(OpenWeatherProvider::parse_group_body(&body).is_err());
    }

    #[tokio::test]
    async fn fetch_batch_returns_observations_in_provider_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/group"))
            .and(query_param("id", "2,1"))
            .and(query_param("appid", "KEY"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "cnt": 3,
                "list": [
                    {"id": 2, "main": {"temp": 10.0, "humidity": 50}},
                    {"id": 1, "main": {"temp": 20.0, "humidity": 60}},
                    {"id": 2, "main": {"temp": 10.0, "humidity": 50}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let observations = provider.fetch_batch(&ids(&["2", "1"])).await.unwrap();

        let order: Vec<i64> = observations.iter().map(|o| o.city_id).collect();
        assert_eq!(order, vec![2, 1, 2]);
    }

    #[tokio::test]
    async fn fetch_batch_non_200_is_batch_failure_with_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/group"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({"cod": "404", "message": "city not found"})),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let failure = provider.fetch_batch(&ids(&["1"])).await.unwrap_err();

        match &failure {
            BatchFailure::Status { status, message } => {
                assert_eq!(*status, 404);
                assert_eq!(message, "city not found");
            }
            other => panic!("unexpected failure: {other:?}"),
        }
        assert!(failure.to_string().contains("Status code: 404"));
        assert!(failure.to_string().contains("Message: city not found"));
    }

    #[tokio::test]
    async fn fetch_batch_non_200_without_body_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/group"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let failure = provider.fetch_batch(&ids(&["1"])).await.unwrap_err();

        match failure {
            BatchFailure::Status { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "Service Unavailable");
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_batch_timeout_is_batch_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/group"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"list": []}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let failure = provider.fetch_batch(&ids(&["1"])).await.unwrap_err();
        assert!(matches!(failure, BatchFailure::Timeout(_)));
    }

    #[tokio::test]
    async fn fetch_batch_with_non_string_ids_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let failure = provider.fetch_batch(&[json!(1), json!(2)]).await.unwrap_err();
        assert!(matches!(
            failure,
            BatchFailure::Invalid(ProviderError::NonStringIdentifier(_))
        ));
    }

    #[tokio::test]
    async fn fetch_batch_malformed_record_fails_batch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/group"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"list": [{"id": 1, "main": {}}]})),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let failure = provider.fetch_batch(&ids(&["1"])).await.unwrap_err();
        assert!(matches!(
            failure,
            BatchFailure::Invalid(ProviderError::MissingField { .. })
        ));
    }

    #[test]
    fn server_message_falls_back_to_reason_phrase() {
        assert_eq!(server_message(StatusCode::BAD_GATEWAY, ""), "Bad Gateway");
        assert_eq!(server_message(StatusCode::BAD_GATEWAY, "upstream down"), "upstream down");
    }
}
