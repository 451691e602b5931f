//! Core library for the weather fetch pipeline.
//!
//! This crate defines:
//! - Configuration loading (TOML file plus environment overrides)
//! - The persisted per-process record and its stores
//! - Abstraction over bulk weather providers
//! - The upload, fetch-and-store and progress stages
//!
//! It is used by `weather-server` and `weather-cli`.

pub mod batching;
pub mod config;
pub mod error;
pub mod model;
pub mod process;
pub mod provider;
pub mod store;
pub mod throttle;

pub use config::{Config, ProviderConfig, ServerConfig, StoreBackend, StoreConfig};
pub use error::{BatchFailure, Outcome, ProcessError, ProviderError, StoreError};
pub use model::{ProcessId, ProcessRecord, ProgressReport, WeatherObservation};
pub use process::{FetchAndStore, FetchSummary, read_progress, upload_city_list};
pub use provider::{WeatherProvider, provider_from_config};
pub use store::{ProcessStore, store_from_config};
pub use throttle::{FixedInterval, NoDelay, Throttle};
