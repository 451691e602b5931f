use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select};
use serde_json::Value;

use weather_core::{
    Config, FetchAndStore, FixedInterval, ProcessError, ProcessId, ProgressReport, StoreBackend,
    provider_from_config, read_progress, store_from_config, upload_city_list,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Bulk weather fetch pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the provider API key and the store backend.
    Configure,

    /// Store a list of city ids under a process id.
    Upload {
        process_id: ProcessId,

        /// City ids, comma- or space-separated.
        #[arg(value_delimiter = ',', num_args = 0..)]
        cities: Vec<String>,

        /// Read city ids from a JSON array file instead.
        #[arg(long, conflicts_with = "cities")]
        from_file: Option<PathBuf>,
    },

    /// Fetch weather for every city stored under a process id.
    Fetch { process_id: ProcessId },

    /// Show progress of a fetch.
    Progress {
        process_id: ProcessId,

        /// Print the raw JSON payload.
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Upload {
                process_id,
                cities,
                from_file,
            } => {
                let cities_ids = match from_file {
                    Some(path) => read_city_file(&path)?,
                    None => cities.into_iter().map(Value::String).collect(),
                };
                if cities_ids.is_empty() {
                    return Err(anyhow!("No city ids given."));
                }

                let config = Config::load()?;
                let store = store_from_config(&config.store).await?;
                let count = cities_ids.len();

                upload_city_list(store.as_ref(), process_id, cities_ids)
                    .await
                    .map_err(report)?;
                println!("Uploaded {count} cities for process {process_id}.");
                Ok(())
            }
            Command::Fetch { process_id } => {
                let config = Config::load()?;
                let store = store_from_config(&config.store).await?;
                let provider = provider_from_config(&config)?;
                let throttle = Arc::new(FixedInterval::new(config.throttle_interval()));

                let summary = FetchAndStore::new(store, provider, throttle)
                    .run(process_id)
                    .await
                    .map_err(report)?;

                println!(
                    "Fetched {}/{} cities in {} window(s); {} of {} batch(es) failed.",
                    summary.fetched,
                    summary.total_cities,
                    summary.windows,
                    summary.failed_batches,
                    summary.batches
                );
                Ok(())
            }
            Command::Progress { process_id, json } => {
                let config = Config::load()?;
                let store = store_from_config(&config.store).await?;

                let progress = read_progress(store.as_ref(), process_id)
                    .await
                    .map_err(report)?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&progress)?);
                } else {
                    print_progress(&progress);
                }
                Ok(())
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let backends = vec![StoreBackend::File, StoreBackend::Redis, StoreBackend::Memory];
    let backend = Select::new("Store backend:", backends)
        .prompt()
        .context("Failed to read store backend")?;

    config.set_api_key(api_key);
    config.store.backend = backend;

    let path = config.save()?;
    println!("Configuration saved to {}", path.display());
    Ok(())
}

fn read_city_file(path: &Path) -> anyhow::Result<Vec<Value>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read city file: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("City file must hold a JSON array: {}", path.display()))
}

/// Turn a stage error into the message shown to the user.
fn report(err: ProcessError) -> anyhow::Error {
    anyhow!(err.public_message())
}

fn print_progress(progress: &ProgressReport) {
    println!("Process:   {}", progress.process_id);
    if let Some(requested) = &progress.request_datetime {
        println!("Requested: {requested}");
    }
    println!("Cities:    {}", progress.total_cities);
    println!("Progress:  {}", progress.progress_percent);
    println!();
    println!("{:>10}  {:>8}  {:>8}", "city", "temp", "humidity");
    for obs in &progress.results {
        println!(
            "{:>10}  {:>8.1}  {:>7.0}%",
            obs.city_id, obs.temperature, obs.humidity
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_accepts_comma_separated_cities() {
        let cli = Cli::try_parse_from(["weather", "upload", "1", "10,20,30"]).unwrap();
        match cli.command {
            Command::Upload {
                process_id, cities, ..
            } => {
                assert_eq!(process_id, 1);
                assert_eq!(cities, vec!["10", "20", "30"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn upload_file_conflicts_with_inline_cities() {
        let res = Cli::try_parse_from(["weather", "upload", "1", "10", "--from-file", "c.json"]);
        assert!(res.is_err());
    }

    #[test]
    fn progress_json_flag() {
        let cli = Cli::try_parse_from(["weather", "progress", "5", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Progress {
                process_id: 5,
                json: true
            }
        ));
    }

    #[test]
    fn report_hides_internal_detail() {
        let err = ProcessError::from(weather_core::StoreError::from(std::io::Error::other(
            "connection refused",
        )));
        assert_eq!(report(err).to_string(), "An internal error occurred.");
    }
}
