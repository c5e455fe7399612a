use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::extract::salary::SalaryRules;
use crate::extract::ExtractionRules;

const DEFAULT_CONFIG_FILE: &str = "hn_hiring";
const ENV_PREFIX: &str = "HNJ";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Runtime knobs for the crawl and transform stages.
///
/// Layered as: compiled defaults, then `hn_hiring.toml` (or `--config`),
/// then `HNJ_*` environment variables (`__` separates nested keys).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub base_url: String,
    pub submissions_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub rate_limit_delay_ms: u64,
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub max_discovery_pages: usize,
    pub max_consecutive_errors: u32,
    pub error_cooldown_secs: u64,
    /// Threads dated before this are never crawled.
    pub since: NaiveDate,
    pub min_record_length: usize,
    pub company_name_max_len: usize,
    pub salary: SalaryRules,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            data_dir: PathBuf::from("data"),
            base_url: "https://news.ycombinator.com".to_string(),
            submissions_url: "https://news.ycombinator.com/submitted?id=whoishiring".to_string(),
            user_agent: USER_AGENT.to_string(),
            request_timeout_secs: 10,
            rate_limit_delay_ms: 3000,
            jitter_min_ms: 500,
            jitter_max_ms: 1500,
            max_retries: 5,
            backoff_base_ms: 2000,
            max_discovery_pages: 15,
            max_consecutive_errors: 5,
            error_cooldown_secs: 5,
            since: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            min_record_length: 50,
            company_name_max_len: 50,
            salary: SalaryRules::default(),
        }
    }
}

impl Settings {
    pub fn checkpoint_path(&self) -> PathBuf {
        self.data_dir.join("checkpoint.json")
    }

    pub fn structured_path(&self) -> PathBuf {
        self.data_dir.join("hn_jobs_structured.sqlite")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn error_cooldown(&self) -> Duration {
        Duration::from_secs(self.error_cooldown_secs)
    }

    pub fn extraction_rules(&self) -> ExtractionRules {
        ExtractionRules {
            salary: self.salary.clone(),
            company_name_max_len: self.company_name_max_len,
        }
    }
}

pub fn load(path: Option<&Path>) -> Result<Settings> {
    let defaults = Config::try_from(&Settings::default()).context("Failed to seed defaults")?;
    let mut builder = Config::builder().add_source(defaults);
    builder = match path {
        Some(p) => builder.add_source(File::from(p)),
        None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
    };

    let settings: Settings = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?
        .try_deserialize()
        .context("Invalid configuration")?;

    if settings.jitter_min_ms > settings.jitter_max_ms {
        anyhow::bail!(
            "jitter_min_ms ({}) must not exceed jitter_max_ms ({})",
            settings.jitter_min_ms,
            settings.jitter_max_ms
        );
    }
    Ok(settings)
}

// ── Tests ──
