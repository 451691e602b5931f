use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Caller-assigned key for one upload -> fetch -> progress lifecycle.
pub type ProcessId = i64;

/// Format of `ProcessRecord::request_datetime`.
pub const REQUEST_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Weather for one city as returned by the upstream bulk endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub city_id: i64,
    pub temperature: f64,
    pub humidity: f64,
}

/// The persisted state of one process id.
///
/// City identifiers are kept as raw JSON values: upload accepts whatever the
/// caller sent, and non-string ids are rejected per batch when the upstream
/// request is formatted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub process_id: ProcessId,
    #[serde(default)]
    pub request_datetime: Option<String>,
    #[serde(default)]
    pub cities_ids: Option<Vec<Value>>,
    #[serde(default)]
    pub total_cities: Option<usize>,
    #[serde(default)]
    pub results: Option<Vec<WeatherObservation>>,
}

impl ProcessRecord {
    /// Record as written by the upload stage.
    pub fn uploaded(process_id: ProcessId, cities_ids: Vec<Value>) -> Self {
        Self {
            process_id,
            request_datetime: None,
            cities_ids: Some(cities_ids),
            total_cities: None,
            results: None,
        }
    }

    /// Reset the record for a new fetch run: stamp the request time, derive
    /// the city count and drop results left over from an earlier run.
    pub fn begin_fetch(&mut self, request_datetime: String) {
        self.request_datetime = Some(request_datetime);
        self.total_cities = Some(self.city_ids().len());
        self.results = Some(Vec::new());
    }

    pub fn city_ids(&self) -> &[Value] {
        self.cities_ids.as_deref().unwrap_or_default()
    }

    pub fn results(&self) -> &[WeatherObservation] {
        self.results.as_deref().unwrap_or_default()
    }

    pub fn append_results(&mut self, observations: impl IntoIterator<Item = WeatherObservation>) {
        self.results.get_or_insert_with(Vec::new).extend(observations);
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.total_cities, Some(total) if total == self.results().len())
    }
}

/// Progress payload returned by the progress-read stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub process_id: ProcessId,
    pub request_datetime: Option<String>,
    pub total_cities: usize,
    pub progress_percent: String,
    pub results: Vec<WeatherObservation>,
}

/// Current local time in the stored request-datetime format.
pub fn request_datetime_now() -> String {
    Local::now().format(REQUEST_DATETIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn uploaded_record_serializes_with_null_optionals() {
        let record = ProcessRecord::uploaded(1, vec![json!("1"), json!("2")]);
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(
            value,
            json!({
                "process_id": 1,
                "request_datetime": null,
                "cities_ids": ["1", "2"],
                "total_cities": null,
                "results": null,
            })
        );
    }

    #[test]
    fn begin_fetch_derives_total_and_clears_results() {
        let mut record = ProcessRecord::uploaded(7, vec![json!("1"), json!("2"), json!("3")]);
        record.results = Some(vec![WeatherObservation {
            city_id: 1,
            temperature: 1.0,
            humidity: 1.0,
        }]);

        record.begin_fetch("2024-01-01 00:00:00".into());

        assert_eq!(record.total_cities, Some(3));
        assert!(record.results().is_empty());
        assert_eq!(record.request_datetime.as_deref(), Some("2024-01-01 00:00:00"));
    }

    #[test]
    fn is_complete_when_results_match_total() {
        let mut record = ProcessRecord::uploaded(1, vec![json!("1")]);
        record.begin_fetch(request_datetime_now());
        assert!(!record.is_complete());

        record.append_results([WeatherObservation {
            city_id: 1,
            temperature: 20.5,
            humidity: 40.0,
        }]);
        assert!(record.is_complete());
    }

    #[test]
    fn missing_fields_deserialize_as_none() {
        let record: ProcessRecord = serde_json::from_value(json!({ "process_id": 3 })).unwrap();
        assert_eq!(record.process_id, 3);
        assert!(record.city_ids().is_empty());
        assert!(record.results().is_empty());
    }
}
