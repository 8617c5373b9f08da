//! Configuration loaded from the environment (and `.env` when present).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct StudioConfig {
    /// Initial API key; the credential dialog can replace it at runtime
    pub api_key: Option<String>,
    /// Gemini API root, without trailing slash
    pub base_url: String,
    /// Delay between operation status checks
    pub poll_interval: Duration,
    /// Status checks before a generation is abandoned
    pub max_polls: u32,
    /// Where finished videos are saved
    pub output_dir: PathBuf,
    /// Scratch directory for displayable copies
    pub display_dir: PathBuf,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: Duration::from_secs(10),
            max_polls: 60,
            output_dir: PathBuf::from("./"),
            display_dir: env::temp_dir().join("reelgen"),
        }
    }
}

impl StudioConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            api_key: var("GEMINI_API_KEY").or_else(|| var("API_KEY")),
            base_url: var("GEMINI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            poll_interval: match var("POLL_INTERVAL_SECS") {
                Some(value) => Duration::from_secs(parse_positive("POLL_INTERVAL_SECS", &value)?),
                None => defaults.poll_interval,
            },
            max_polls: match var("MAX_POLLS") {
                Some(value) => parse_positive("MAX_POLLS", &value)?,
                None => defaults.max_polls,
            },
            output_dir: var("OUTPUT_DIR").map(PathBuf::from).unwrap_or(defaults.output_dir),
            display_dir: var("DISPLAY_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.display_dir),
        })
    }
}

fn parse_positive<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    value
        .trim()
        .parse::<T>()
        .ok()
        .filter(|n| *n > T::default())
        .ok_or_else(|| ConfigError::InvalidNumber {
            name,
            value: value.to_string(),
        })
}
