use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub station: StationConfig,
    pub logging: LoggingConfig,
}

/// Longest poll interval the keep-alive ticker may use
pub const MAX_POLL_INTERVAL_MS: u64 = 10;

/// Shortest gap allowed between termination packets
pub const MIN_TERMINATION_SPACING_MS: u64 = 100;

/// Link timing. Defaults are what the arm controller expects.
///
/// The number of termination packets is fixed by the protocol and is not
/// configurable.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StationConfig {
    pub keep_alive_period_ms: u64,
    pub poll_interval_ms: u64,
    pub startup_grace_ms: u64,
    pub termination_spacing_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {:?}: {}", path, e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let station = &self.station;
        if station.keep_alive_period_ms == 0 {
            anyhow::bail!("station.keep_alive_period_ms must be greater than zero");
        }
        if station.poll_interval_ms == 0 || station.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            anyhow::bail!(
                "station.poll_interval_ms must be between 1 and {}",
                MAX_POLL_INTERVAL_MS
            );
        }
        if station.termination_spacing_ms < MIN_TERMINATION_SPACING_MS {
            anyhow::bail!(
                "station.termination_spacing_ms must be at least {}",
                MIN_TERMINATION_SPACING_MS
            );
        }
        Ok(())
    }
}

impl StationConfig {
    pub fn keep_alive_period(&self) -> Duration {
        Duration::from_millis(self.keep_alive_period_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }

    pub fn termination_spacing(&self) -> Duration {
        Duration::from_millis(self.termination_spacing_ms)
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            keep_alive_period_ms: 500,
            poll_interval_ms: 10,
            startup_grace_ms: 100,
            termination_spacing_ms: 100,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
