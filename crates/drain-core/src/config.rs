//! drainprobe.toml configuration parser.
//!
//! Every field has a default, so an empty file (or no file at all) gives
//! the stock harness: server on `127.0.0.1:3000` serving `./large.json`
//! under 404, probe hitting `/index.json` 1000 times without draining.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{BodyPolicy, MemorySource};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_STATUS: u16 = 404;
pub const DEFAULT_ITERATIONS: u32 = 1000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub server: ServerConfig,
    pub probe: ProbeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// File served as the body of every response. Read on each request.
    pub payload: PathBuf,
    pub status: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            payload: PathBuf::from("./large.json"),
            status: DEFAULT_STATUS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub url: String,
    pub iterations: u32,
    pub policy: BodyPolicy,
    pub memory: MemorySource,
    /// Print the baseline-to-last delta after the loop.
    pub report_delta: bool,
    /// Per-iteration limit such as "5s" or "500ms". Unbounded when unset.
    pub request_timeout: Option<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            url: format!("http://localhost:{DEFAULT_PORT}/index.json"),
            iterations: DEFAULT_ITERATIONS,
            policy: BodyPolicy::default(),
            memory: MemorySource::default(),
            report_delta: true,
            request_timeout: None,
        }
    }
}

impl ProbeConfig {
    /// Parsed `request_timeout`.
    pub fn request_timeout(&self) -> ConfigResult<Option<Duration>> {
        match self.request_timeout.as_deref() {
            None => Ok(None),
            Some(raw) => parse_duration(raw)
                .map(Some)
                .ok_or_else(|| ConfigError::InvalidDuration(raw.to_string())),
        }
    }
}

impl HarnessConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: HarnessConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise fall back to defaults.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !(100..=999).contains(&self.server.status) {
            return Err(ConfigError::InvalidStatus(self.server.status));
        }
        if self.probe.url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl);
        }
        self.probe.request_timeout()?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Parse a duration string like "5s", "500ms", "1m". A bare number is seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim().parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = HarnessConfig::from_toml_str("").unwrap();
        assert_eq!(config, HarnessConfig::default());
        assert_eq!(config.server.bind.port(), 3000);
        assert_eq!(config.server.status, 404);
        assert_eq!(config.probe.url, "http://localhost:3000/index.json");
        assert_eq!(config.probe.iterations, 1000);
        assert_eq!(config.probe.policy, BodyPolicy::Leak);
        assert!(config.probe.report_delta);
        assert_eq!(config.probe.request_timeout().unwrap(), None);
    }

    #[test]
    fn partial_config_merges_with_defaults() {
        let config = HarnessConfig::from_toml_str(
            "[probe]\npolicy = \"drain\"\niterations = 25\nrequest_timeout = \"750ms\"\n",
        )
        .unwrap();
        assert_eq!(config.probe.policy, BodyPolicy::Drain);
        assert_eq!(config.probe.iterations, 25);
        assert_eq!(
            config.probe.request_timeout().unwrap(),
            Some(Duration::from_millis(750))
        );
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn server_section_parses() {
        let config = HarnessConfig::from_toml_str(
            "[server]\nbind = \"0.0.0.0:8080\"\npayload = \"/tmp/big.json\"\nstatus = 500\n",
        )
        .unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.server.payload, PathBuf::from("/tmp/big.json"));
        assert_eq!(config.server.status, 500);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let result = HarnessConfig::from_toml_str("[probe]\npolicy = \"consume\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let result = HarnessConfig::from_toml_str("[probe]\nrequest_timeout = \"soon\"\n");
        assert!(matches!(result, Err(ConfigError::InvalidDuration(_))));
    }

    #[test]
    fn invalid_status_is_rejected() {
        let result = HarnessConfig::from_toml_str("[server]\nstatus = 42\n");
        assert!(matches!(result, Err(ConfigError::InvalidStatus(42))));
    }

    #[test]
    fn empty_url_is_rejected() {
        let result = HarnessConfig::from_toml_str("[probe]\nurl = \"  \"\n");
        assert!(matches!(result, Err(ConfigError::EmptyUrl)));
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drainprobe.toml");
        std::fs::write(&path, "[probe]\nmemory = \"rss\"\nreport_delta = false\n").unwrap();

        let config = HarnessConfig::from_file(&path).unwrap();
        assert_eq!(config.probe.memory, MemorySource::Rss);
        assert!(!config.probe.report_delta);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = HarnessConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn load_without_path_is_default() {
        assert_eq!(HarnessConfig::load(None).unwrap(), HarnessConfig::default());
    }

    #[test]
    fn toml_round_trip_keeps_values() {
        let mut config = HarnessConfig::default();
        config.probe.policy = BodyPolicy::Drain;
        config.probe.request_timeout = Some("2s".to_string());
        let text = config.to_toml_string().unwrap();
        assert_eq!(HarnessConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("10"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("fast"), None);
    }
}
