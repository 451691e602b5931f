//! The three pipeline stages: upload, fetch-and-store, progress read.
//!
//! All stages share one [`ProcessRecord`] per process id. Store failures are
//! logged here with their full cause chain; callers only get the
//! [`ProcessError`] kind and a public message.

use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span, warn};

use crate::{
    batching::{partition, window_count, windows},
    error::ProcessError,
    model::{ProcessId, ProcessRecord, ProgressReport, request_datetime_now},
    provider::WeatherProvider,
    store::ProcessStore,
    throttle::Throttle,
};

pub const UPLOADED_MESSAGE: &str = "Data Uploaded successfully.";
pub const PROCESS_FINISHED_MESSAGE: &str = "Process finished successfully.";
pub const DATA_FETCHED_MESSAGE: &str = "Data fetched successfully.";
pub const NO_DATA_FOUND: &str = "No data found.";
pub const NO_PROCESSED_DATA_FOUND: &str = "No processed data found.";

/// Store the city list for `process_id`, replacing any earlier record.
pub async fn upload_city_list(
    store: &dyn ProcessStore,
    process_id: ProcessId,
    cities_ids: Vec<Value>,
) -> Result<(), ProcessError> {
    let record = ProcessRecord::uploaded(process_id, cities_ids);

    match store.save_record(process_id, &record).await {
        Ok(()) => {
            info!(process_id, cities = record.city_ids().len(), "{UPLOADED_MESSAGE}");
            Ok(())
        }
        Err(e) => {
            error!(process_id, error = ?e, "An error occurred while uploading city list");
            Err(e.into())
        }
    }
}

/// Load the record for `process_id` and report how far its fetch has got.
pub async fn read_progress(
    store: &dyn ProcessStore,
    process_id: ProcessId,
) -> Result<ProgressReport, ProcessError> {
    let record = store.fetch_record(process_id).await.map_err(|e| {
        error!(process_id, error = ?e, "An error occurred while reading progress");
        ProcessError::from(e)
    })?;

    let report = record.as_ref().and_then(progress_report);

    match report {
        Some(report) => {
            info!(process_id, progress = %report.progress_percent, "{DATA_FETCHED_MESSAGE}");
            Ok(report)
        }
        None => {
            warn!(process_id, "{NO_PROCESSED_DATA_FOUND}");
            Err(ProcessError::NotFound {
                process_id,
                message: NO_PROCESSED_DATA_FOUND,
            })
        }
    }
}

/// Build the progress payload; `None` when there is nothing to report yet or
/// the city count is missing or zero.
pub fn progress_report(record: &ProcessRecord) -> Option<ProgressReport> {
    let total_cities = record.total_cities.filter(|total| *total > 0)?;
    let results = record.results();
    if results.is_empty() {
        return None;
    }

    let percent = results.len() as f64 / total_cities as f64 * 100.0;

    Some(ProgressReport {
        process_id: record.process_id,
        request_datetime: record.request_datetime.clone(),
        total_cities,
        progress_percent: format!("{percent:.2}%"),
        results: results.to_vec(),
    })
}

/// Counters from one completed fetch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchSummary {
    pub total_cities: usize,
    pub fetched: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub windows: usize,
}

/// Fetches weather for every stored city of a process, one rate-limited
/// window at a time, persisting after each window.
///
/// Callers must not run two fetches for the same process id at once: the
/// record is read and overwritten without any locking.
#[derive(Debug, Clone)]
pub struct FetchAndStore {
    store: Arc<dyn ProcessStore>,
    provider: Arc<dyn WeatherProvider>,
    throttle: Arc<dyn Throttle>,
}

impl FetchAndStore {
    pub fn new(
        store: Arc<dyn ProcessStore>,
        provider: Arc<dyn WeatherProvider>,
        throttle: Arc<dyn Throttle>,
    ) -> Self {
        Self {
            store,
            provider,
            throttle,
        }
    }

    pub async fn run(&self, process_id: ProcessId) -> Result<FetchSummary, ProcessError> {
        let result = self.execute(process_id).await;

        if let Err(ProcessError::Store(e)) = &result {
            error!(process_id, error = ?e, "An error occurred, fetch aborted");
        }

        result
    }

    async fn execute(&self, process_id: ProcessId) -> Result<FetchSummary, ProcessError> {
        info!(process_id, "Starting process.");

        let mut record = match self.store.fetch_record(process_id).await? {
            Some(record) if !record.city_ids().is_empty() => record,
            _ => {
                warn!(process_id, "No stored city list found");
                return Err(ProcessError::NotFound {
                    process_id,
                    message: NO_DATA_FOUND,
                });
            }
        };

        record.begin_fetch(request_datetime_now());
        let total_cities = record.city_ids().len();

        let per_window = self.provider.max_requests_per_minute();
        let batches = partition(record.city_ids(), self.provider.max_ids_per_request());
        let window_total = window_count(batches.len(), per_window);

        info!(
            process_id,
            total_cities,
            batches = batches.len(),
            windows = window_total,
            "cities found to process"
        );

        let mut summary = FetchSummary {
            total_cities,
            batches: batches.len(),
            windows: window_total,
            ..FetchSummary::default()
        };

        for (index, window) in windows(&batches, per_window).enumerate() {
            let calls = window.iter().enumerate().map(|(batch, city_ids)| {
                self.provider
                    .fetch_batch(city_ids)
                    .instrument(info_span!("batch", process_id, window = index, batch))
            });

            // join_all yields in input order, whatever order the calls finish in.
            for outcome in join_all(calls).await {
                match outcome {
                    Ok(observations) => record.append_results(observations),
                    Err(_) => summary.failed_batches += 1,
                }
            }

            self.store.save_record(process_id, &record).await?;

            info!(
                process_id,
                processed = record.results().len(),
                total_cities,
                "window {}/{} stored",
                index + 1,
                window_total
            );

            if index + 1 < window_total {
                info!(process_id, "Waiting before next window...");
                self.throttle.wait().await;
            }
        }

        summary.fetched = record.results().len();
        info!(
            process_id,
            fetched = summary.fetched,
            failed_batches = summary.failed_batches,
            "{PROCESS_FINISHED_MESSAGE}"
        );

        Ok(summary)
    }
}
