use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::session::ControllerConfig;

const CONFIG_PATH: &str = "rocket-crash.toml";

pub const DEFAULT_BASE_URL: &str = "https://rocket-backend-62wj.onrender.com";

/// Client configuration from `rocket-crash.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Root URL of the game service.
    pub base_url: String,
    /// How often a running session is polled.
    pub poll_interval_ms: u64,
    /// Per-request timeout for game service calls.
    pub request_timeout_ms: u64,
    /// Stake shown when the client starts.
    pub default_bet: f64,
    /// Consecutive failed polls before a session is abandoned (0 = never).
    pub max_tick_failures: u32,
    /// Where to write logs. Without one, interactive play discards them.
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval_ms: 200,
            request_timeout_ms: 5_000,
            default_bet: 100.0,
            max_tick_failures: 50,
            log_file: None,
        }
    }
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn controller(&self) -> ControllerConfig {
        ControllerConfig {
            poll_interval: self.poll_interval(),
            max_tick_failures: self.max_tick_failures,
        }
    }

    /// Reject settings the client cannot run with.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid base_url {:?}", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("base_url must be http or https, got {}", url.scheme());
        }
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be greater than zero");
        }
        if self.request_timeout_ms == 0 {
            bail!("request_timeout_ms must be greater than zero");
        }
        if !(self.default_bet.is_finite() && self.default_bet > 0.0) {
            bail!("default_bet must be a positive amount, got {}", self.default_bet);
        }
        Ok(())
    }
}

/// Load configuration from `rocket-crash.toml` under `dir`.
///
/// Falls back to defaults if the file is missing.
pub fn load(dir: &Path) -> Result<Config> {
    let path = dir.join(CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    load_from(&path)
}

/// Load configuration from an explicit path, which must exist.
pub fn load_from(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: Config =
        toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(config)
}
