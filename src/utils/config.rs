use std::path::PathBuf;
use std::time::Duration;

/// Environment variable that overrides the target base URL
pub const BASE_URL_ENV: &str = "API_BASE_URL";

pub const DEFAULT_BASE_URL: &str = "https://web-production-8d975.up.railway.app";

pub const DEFAULT_SITE_URL: &str = "https://portafolio-six-sigma-45.vercel.app";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the API under test
    pub base_url: String,

    /// Site registered for monitoring by the site-creation step
    pub site_url: String,

    /// Per-request timeout (ms)
    pub request_timeout_ms: u64,

    /// Retries after the first attempt on transport failure or 5xx
    pub max_retries: u32,

    /// Delay between retries (ms)
    pub retry_delay_ms: u64,

    /// Pause after each step (ms)
    pub step_delay_ms: u64,

    /// Pause after steps that hit heavy endpoints (ms)
    pub slow_step_delay_ms: u64,

    /// Directory the reports are written to
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            site_url: DEFAULT_SITE_URL.to_string(),
            request_timeout_ms: 10_000,
            max_retries: 2,
            retry_delay_ms: 1000,
            step_delay_ms: 1000,
            slow_step_delay_ms: 2000,
            output_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Defaults, with the base URL taken from the environment when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            let url = url.trim();
            if !url.is_empty() {
                config.base_url = url.to_string();
            }
        }
        config
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn slow_step_delay(&self) -> Duration {
        Duration::from_millis(self.slow_step_delay_ms)
    }

    /// Base URL without a trailing slash, ready for path concatenation.
    pub fn normalized_base_url(&self) -> String {
        self.base_url.trim_end_matches('/').to_string()
    }
}
