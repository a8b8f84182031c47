use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const COINGECKO_URL: &str =
    "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin&vs_currencies=usd";
const CRYPTOCOMPARE_URL: &str = "https://min-api.cryptocompare.com/data/price?fsym=BTC&tsyms=USD";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: General,
    #[serde(default)]
    pub price: PriceConfig,
    #[serde(default)]
    pub game: GameConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct General {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Attribution for guesses made from this terminal
    #[serde(default = "default_player_id")]
    pub player_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceConfig {
    #[serde(default = "default_primary_url")]
    pub primary_url: String,
    /// Tried when the primary source fails. Set to "" to disable.
    #[serde(default = "default_fallback_url")]
    pub fallback_url: String,
    /// How long a fetched sample is served without a new request
    #[serde(default = "default_cache_secs")]
    pub cache_secs: u64,
    /// Samples older than this are never valid
    #[serde(default = "default_stale_secs")]
    pub stale_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    /// Wait between making a guess and looking for a new price
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,
    /// Minimum gap between price polls once the wait has elapsed
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
    /// Where the file backend keeps its JSON blobs
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from `path`, or use defaults when the file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

impl PriceConfig {
    pub fn cache_duration(&self) -> Duration {
        Duration::from_secs(self.cache_secs)
    }

    pub fn stale_window(&self) -> Duration {
        Duration::from_secs(self.stale_secs)
    }

    pub fn fallback(&self) -> Option<&str> {
        let url = self.fallback_url.trim();
        (!url.is_empty()).then_some(url)
    }
}

impl GameConfig {
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis.max(1))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_secs)
    }
}

impl Default for General {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            player_id: default_player_id(),
        }
    }
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            primary_url: default_primary_url(),
            fallback_url: default_fallback_url(),
            cache_secs: default_cache_secs(),
            stale_secs: default_stale_secs(),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            wait_secs: default_wait_secs(),
            tick_millis: default_tick_millis(),
            poll_secs: default_poll_secs(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_player_id() -> String {
    "player".to_string()
}
fn default_primary_url() -> String {
    COINGECKO_URL.to_string()
}
fn default_fallback_url() -> String {
    CRYPTOCOMPARE_URL.to_string()
}
fn default_cache_secs() -> u64 {
    10
}
fn default_stale_secs() -> u64 {
    60
}
fn default_wait_secs() -> u64 {
    60
}
fn default_tick_millis() -> u64 {
    1000
}
fn default_poll_secs() -> u64 {
    5
}
fn default_data_dir() -> PathBuf {
    PathBuf::from(".horizon")
}
