// src/config.rs
use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Site used when suggesting a web search for a folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SearchSite {
    #[default]
    Audible,
    Goodreads,
}

/// Exponential backoff applied to transient fetch errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    pub initial_delay_secs: f64,
    pub multiplier: f64,
    /// Total time spent sleeping before giving up
    pub budget_secs: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            initial_delay_secs: 2.0,
            multiplier: 1.5,
            budget_secs: 10.0,
        }
    }
}

impl RetrySettings {
    /// Swap out values that would stall the backoff or overflow it.
    ///
    /// The delay has to be positive and never shrink, otherwise the sleep
    /// budget is never reached.
    pub fn validated(self) -> Self {
        let defaults = Self::default();
        let mut checked = self;

        if !(checked.initial_delay_secs.is_finite() && checked.initial_delay_secs > 0.0) {
            warn!(
                "retry.initial_delay_secs = {} is not a positive number, using {}",
                checked.initial_delay_secs, defaults.initial_delay_secs
            );
            checked.initial_delay_secs = defaults.initial_delay_secs;
        }
        if !(checked.multiplier.is_finite() && checked.multiplier >= 1.0) {
            warn!("retry.multiplier = {} is below 1, using {}", checked.multiplier, defaults.multiplier);
            checked.multiplier = defaults.multiplier;
        }
        if !(checked.budget_secs.is_finite() && checked.budget_secs >= 0.0) {
            warn!("retry.budget_secs = {} is invalid, using {}", checked.budget_secs, defaults.budget_secs);
            checked.budget_secs = defaults.budget_secs;
        }

        checked
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.initial_delay_secs.max(0.0)).unwrap_or(Duration::MAX)
    }

    pub fn budget(&self) -> Duration {
        Duration::try_from_secs_f64(self.budget_secs.max(0.0)).unwrap_or(Duration::MAX)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root for organized folders; `None` means a sibling of each input folder
    pub output_dir: Option<PathBuf>,
    pub default_output_name: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub retry: RetrySettings,
    pub catalog_response_groups: String,
    pub opf_template: Option<PathBuf>,
    pub debug_log: PathBuf,
    pub search_site: SearchSite,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: None,
            default_output_name: "_organized_".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            request_timeout_secs: 30,
            retry: RetrySettings::default(),
            catalog_response_groups: "contributors,product_desc,product_extended_attrs,product_attrs,series,category_ladders".to_string(),
            opf_template: None,
            debug_log: PathBuf::from("debug.log"),
            search_site: SearchSite::Audible,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            let config: Config = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", config_path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, json)?;

        Ok(())
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("audiobook-organizer");
        Ok(config_dir.join("config.json"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
