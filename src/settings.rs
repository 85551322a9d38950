use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::enumerate::{EnumerateOptions, RetryPolicy};
use crate::fetch::FetchConfig;

const CONFIG_FILE: &str = "shnaton";
const ENV_PREFIX: &str = "SHNATON";
const YEAR_PLACEHOLDER: &str = "{year}";

/// Runtime settings: defaults, then `shnaton.toml`, then `SHNATON_*` env vars.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Form URL; `{year}` is replaced with `year`.
    pub endpoint: String,
    pub user_agent: String,
    pub year: String,
    pub snapshot_path: PathBuf,
    pub db_path: PathBuf,
    pub throttle_every: u32,
    pub throttle_ms: u64,
    pub concurrency: usize,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            endpoint: "https://shnaton.huji.ac.il/index.php/default/NextForm/{year}/0".into(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36"
                .into(),
            year: "2026".into(),
            snapshot_path: PathBuf::from("data/raw_courses.json"),
            db_path: PathBuf::from("data/huji_shnaton.db"),
            throttle_every: 500,
            throttle_ms: 300,
            concurrency: 1,
            max_retries: 2,
            base_backoff_ms: 500,
            timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Settings> {
        config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .and_then(|c| c.try_deserialize())
            .context("Failed to load settings")
    }

    /// The Shnaton search form with every filter blank; `course` is filled per request.
    pub fn fetch_config(&self) -> FetchConfig {
        let form = [
            ("year", self.year.as_str()),
            ("faculty", ""),
            ("hug", ""),
            ("maslul", "0"),
            ("peula", "Simple"),
            ("starting", "1"),
            ("system", "1"),
            ("option", "2"),
            ("word", ""),
            ("course", ""),
            ("toar", ""),
            ("shana", ""),
            ("coursetype", ""),
            ("shiur", ""),
            ("language", ""),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        FetchConfig {
            endpoint: self.endpoint.replace(YEAR_PLACEHOLDER, &self.year),
            user_agent: self.user_agent.clone(),
            form,
            id_field: "course".into(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn enumerate_options(&self) -> EnumerateOptions {
        EnumerateOptions {
            throttle_every: self.throttle_every,
            throttle: Duration::from_millis(self.throttle_ms),
            concurrency: self.concurrency.max(1),
            retry: RetryPolicy {
                max_retries: self.max_retries,
                base_backoff: Duration::from_millis(self.base_backoff_ms),
            },
        }
    }
}
