use anyhow::{anyhow, Context, Result};
use dotenv::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::services::charts::WavePolicy;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_RAW_PAGE_SIZE: u32 = 50;
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout: Option<Duration>,
    pub raw_page_size: u32,
    pub max_upload_bytes: u64,
    pub wave_policy: WavePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: None,
            raw_page_size: DEFAULT_RAW_PAGE_SIZE,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            wave_policy: WavePolicy::AllOrNothing,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source; unset keys fall back
    /// to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base_url = lookup("API_BASE_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.api_base_url);

        let request_timeout = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = parse_var("REQUEST_TIMEOUT_SECS", &raw)?;
                // Zero means "no timeout", same as leaving it unset.
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };

        let raw_page_size = match lookup("RAW_PAGE_SIZE") {
            Some(raw) => parse_var("RAW_PAGE_SIZE", &raw)?,
            None => defaults.raw_page_size,
        };
        if raw_page_size == 0 {
            return Err(anyhow!("RAW_PAGE_SIZE must be greater than zero"));
        }

        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(raw) => parse_var("MAX_UPLOAD_BYTES", &raw)?,
            None => defaults.max_upload_bytes,
        };

        let wave_policy = match lookup("CHART_WAVE_POLICY") {
            Some(raw) => raw.parse().map_err(|e: String| anyhow!("CHART_WAVE_POLICY: {}", e))?,
            None => defaults.wave_policy,
        };

        Ok(Self {
            api_base_url,
            request_timeout,
            raw_page_size,
            max_upload_bytes,
            wave_policy,
        })
    }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("{} must be a valid number, got '{}'", name, raw))
}
