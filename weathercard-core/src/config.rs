use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf};

use crate::provider::cwa::CwaClient;

pub const DEFAULT_BASE_URL: &str = "https://opendata.cwa.gov.tw/api";

/// Dataset ids on the CWA open-data platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Datasets {
    /// Automatic station observations.
    pub current: String,
    /// 36-hour county forecast.
    pub forecast: String,
    /// Sunrise/sunset almanac.
    pub sun: String,
}

impl Default for Datasets {
    fn default() -> Self {
        Self {
            current: "O-A0003-001".to_string(),
            forecast: "F-C0032-001".to_string(),
            sun: "A-B0062-001".to_string(),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "CWA-..."
/// station_id = "466920"
/// location_name = "臺北市"
///
/// [datasets]
/// current = "O-A0003-001"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,

    /// Observation station id for current conditions.
    pub station_id: String,

    /// Location name used for the forecast.
    pub location_name: String,

    /// County used for the sunrise/sunset lookup; falls back to `location_name`.
    pub sun_location: Option<String>,

    pub base_url: String,

    pub datasets: Datasets,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            station_id: "466920".to_string(),
            location_name: "臺北市".to_string(),
            sun_location: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            datasets: Datasets::default(),
        }
    }
}

impl Config {
    /// Load config from disk, or return the defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
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

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weathercard", "weathercard")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Override fields from `WEATHERCARD_*` environment variables
    /// (`API_KEY`, `STATION_ID`, `LOCATION`, `SUN_LOCATION`, `BASE_URL`).
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("WEATHERCARD_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(station) = get("WEATHERCARD_STATION_ID") {
            self.station_id = station;
        }
        if let Some(location) = get("WEATHERCARD_LOCATION") {
            self.location_name = location;
        }
        if let Some(county) = get("WEATHERCARD_SUN_LOCATION") {
            self.sun_location = Some(county);
        }
        if let Some(url) = get("WEATHERCARD_BASE_URL") {
            self.base_url = url;
        }
    }

    pub fn sun_location(&self) -> &str {
        self.sun_location.as_deref().unwrap_or(&self.location_name)
    }

    /// Returns the API key, if one is configured.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    /// Build the CWA client described by this config.
    pub fn client(&self) -> Result<CwaClient> {
        let api_key = self.api_key().ok_or_else(|| {
            anyhow!(
                "No API key configured.\n\
                 Hint: run `weathercard configure` or set WEATHERCARD_API_KEY."
            )
        })?;

        CwaClient::from_config(api_key.to_owned(), self)
            .context("Failed to build the CWA HTTP client")
    }
}
