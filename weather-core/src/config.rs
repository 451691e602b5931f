use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf, str::FromStr, time::Duration};

/// Environment variable pointing at an explicit config file.
pub const CONFIG_PATH_ENV: &str = "WEATHER_FETCHER_CONFIG";

/// Upstream provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Unit system passed through to the provider, e.g. "metric".
    pub units: String,
    /// Provider cap on city ids in one bulk request.
    pub max_ids_per_request: usize,
    /// Provider cap on requests in a rolling minute.
    pub max_requests_per_minute: usize,
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openweathermap.org/data/2.5".to_string(),
            api_key: None,
            units: "metric".to_string(),
            max_ids_per_request: 20,
            max_requests_per_minute: 60,
            request_timeout_secs: 30,
        }
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    #[default]
    File,
    Redis,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Memory => "memory",
            StoreBackend::File => "file",
            StoreBackend::Redis => "redis",
        }
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "file" => Ok(StoreBackend::File),
            "redis" => Ok(StoreBackend::Redis),
            _ => Err(anyhow!(
                "Unknown store backend '{value}'. Supported backends: memory, file, redis."
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub redis_url: String,
    /// Directory for the file backend; the platform data dir when unset.
    pub data_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
            data_dir: None,
        }
    }
}

impl StoreConfig {
    pub fn resolved_data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(project_dirs()?.data_dir().join("processes")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Overall wall-clock limit on the bulk fetch route.
    pub route_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            route_timeout_secs: 600,
        }
    }
}

impl ServerConfig {
    pub fn route_timeout(&self) -> Duration {
        Duration::from_secs(self.route_timeout_secs)
    }
}

/// Top-level configuration, built once at startup and passed down explicitly.
///
/// Example TOML:
/// ```toml
/// throttle_interval_secs = 60
///
/// [provider]
/// api_key = "..."
/// max_ids_per_request = 20
///
/// [store]
/// backend = "redis"
/// redis_url = "redis://localhost:6379/0"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub store: StoreConfig,
    pub server: ServerConfig,
    /// Pause between fetch windows.
    pub throttle_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            store: StoreConfig::default(),
            server: ServerConfig::default(),
            throttle_interval_secs: 60,
        }
    }
}

impl Config {
    /// Load config from disk (or defaults on first run), then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        let mut cfg = Self::load_from(&path)?;
        cfg.apply_env(|key| env::var(key).ok())?;
        cfg.validate()?;

        Ok(cfg)
    }

    /// Read a TOML config file, or return an empty default if it doesn't exist yet.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(path)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Overlay values from the environment. `lookup` is `std::env::var` outside tests.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("OPEN_WEATHER_BASE_URL") {
            self.provider.base_url = url;
        }
        if let Some(key) = lookup("OPEN_WEATHER_API_KEY") {
            self.provider.api_key = Some(key);
        }
        if let Some(units) = lookup("OPEN_WEATHER_UNITS") {
            self.provider.units = units;
        }
        if let Some(v) = lookup("MAX_IDS_PER_REQUEST") {
            self.provider.max_ids_per_request = parse_var("MAX_IDS_PER_REQUEST", &v)?;
        }
        if let Some(v) = lookup("MAX_REQUESTS_PER_MINUTE") {
            self.provider.max_requests_per_minute = parse_var("MAX_REQUESTS_PER_MINUTE", &v)?;
        }
        if let Some(v) = lookup("STORE_BACKEND") {
            self.store.backend = v.parse()?;
        }

        if let Some(url) = lookup("REDIS_URL") {
            self.store.redis_url = url;
        } else if let Some(host) = lookup("REDIS_HOST") {
            let port = lookup("REDIS_PORT").unwrap_or_else(|| "6379".to_string());
            let db = lookup("REDIS_DB").unwrap_or_else(|| "0".to_string());
            self.store.redis_url = format!("redis://{host}:{port}/{db}");
        }

        if let Some(v) = lookup("ROUTE_TIMEOUT_IN_SECONDS") {
            self.server.route_timeout_secs = parse_var("ROUTE_TIMEOUT_IN_SECONDS", &v)?;
        }
        if let Some(v) = lookup("THROTTLE_INTERVAL_SECS") {
            self.throttle_interval_secs = parse_var("THROTTLE_INTERVAL_SECS", &v)?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.provider.max_ids_per_request == 0 {
            bail!("provider.max_ids_per_request must be at least 1");
        }
        if self.provider.max_requests_per_minute == 0 {
            bail!("provider.max_requests_per_minute must be at least 1");
        }
        Ok(())
    }

    pub fn throttle_interval(&self) -> Duration {
        Duration::from_secs(self.throttle_interval_secs)
    }

    /// Set/replace the provider API key.
    pub fn set_api_key(&mut self, api_key: String) {
        self.provider.api_key = Some(api_key);
    }

    pub fn is_provider_configured(&self) -> bool {
        self.provider.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "weather-fetcher", "weather-fetcher")
        .ok_or_else(|| anyhow!("Could not determine platform config directory"))
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {name}: '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_provider_limits() {
        let cfg = Config::default();
        assert_eq!(cfg.provider.max_ids_per_request, 20);
        assert_eq!(cfg.provider.max_requests_per_minute, 60);
        assert_eq!(cfg.provider.units, "metric");
        assert_eq!(cfg.server.route_timeout_secs, 600);
        assert!(!cfg.is_provider_configured());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg = Config::default();
        cfg.apply_env(lookup(&[
            ("OPEN_WEATHER_API_KEY", "KEY"),
            ("MAX_IDS_PER_REQUEST", "2"),
            ("MAX_REQUESTS_PER_MINUTE", "1"),
            ("STORE_BACKEND", "Redis"),
            ("ROUTE_TIMEOUT_IN_SECONDS", "5"),
        ]))
        .unwrap();

        assert!(cfg.is_provider_configured());
        assert_eq!(cfg.provider.max_ids_per_request, 2);
        assert_eq!(cfg.provider.max_requests_per_minute, 1);
        assert_eq!(cfg.store.backend, StoreBackend::Redis);
        assert_eq!(cfg.server.route_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn redis_url_built_from_host_parts() {
        let mut cfg = Config::default();
        cfg.apply_env(lookup(&[("REDIS_HOST", "cache"), ("REDIS_DB", "3")]))
            .unwrap();
        assert_eq!(cfg.store.redis_url, "redis://cache:6379/3");
    }

    #[test]
    fn invalid_numeric_env_is_rejected() {
        let mut cfg = Config::default();
        let err = cfg
            .apply_env(lookup(&[("MAX_IDS_PER_REQUEST", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("MAX_IDS_PER_REQUEST"));
    }

    #[test]
    fn zero_caps_fail_validation() {
        let mut cfg = Config::default();
        cfg.provider.max_requests_per_minute = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [provider]
            api_key = "OPEN_KEY"

            [store]
            backend = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.provider.api_key.as_deref(), Some("OPEN_KEY"));
        assert_eq!(cfg.provider.max_ids_per_request, 20);
        assert_eq!(cfg.store.backend, StoreBackend::Memory);
        assert_eq!(cfg.throttle_interval_secs, 60);
    }

    #[test]
    fn load_from_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.store.backend, StoreBackend::File);
    }
}
