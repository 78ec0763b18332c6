// src/ingest/config.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "INCIDENT_CONFIG_PATH";
pub const ENV_WATCH_DIR: &str = "INCIDENT_WATCH_DIR";
pub const ENV_POLL_INTERVAL: &str = "INCIDENT_POLL_INTERVAL_SECS";
pub const ENV_HTTP_ADDR: &str = "INCIDENT_HTTP_ADDR";

fn default_watch_dir() -> PathBuf {
    PathBuf::from("data/incoming")
}
fn default_poll_interval_secs() -> u64 {
    2
}
fn default_delimiter() -> char {
    ','
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default = "default_watch_dir")]
    pub watch_dir: PathBuf,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Only pick up files with this extension, e.g. "csv".
    #[serde(default)]
    pub extension: Option<String>,
    /// Write every snapshot to this JSON file.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
    /// Persist processed names + counts here between runs.
    #[serde(default)]
    pub checkpoint_path: Option<PathBuf>,
    /// Serve /snapshot, /health and /metrics on this address.
    #[serde(default)]
    pub http_addr: Option<String>,
    #[serde(default = "default_true")]
    pub log_snapshots: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            watch_dir: default_watch_dir(),
            poll_interval_secs: default_poll_interval_secs(),
            delimiter: default_delimiter(),
            extension: None,
            snapshot_path: None,
            checkpoint_path: None,
            http_addr: None,
            log_snapshots: true,
        }
    }
}

impl PipelineConfig {
    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg: PipelineConfig = match ext.as_str() {
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?,
            _ => toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?,
        };
        cfg.sanitized()
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $INCIDENT_CONFIG_PATH
    /// 2) config/incident_stream.toml
    /// 3) config/incident_stream.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        let base = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let toml_p = PathBuf::from("config/incident_stream.toml");
            let json_p = PathBuf::from("config/incident_stream.json");
            if toml_p.exists() {
                Self::load_from(&toml_p)?
            } else if json_p.exists() {
                Self::load_from(&json_p)?
            } else {
                Self::default()
            }
        };
        base.with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(dir) = std::env::var(ENV_WATCH_DIR) {
            if !dir.trim().is_empty() {
                self.watch_dir = PathBuf::from(dir.trim());
            }
        }
        if let Ok(v) = std::env::var(ENV_POLL_INTERVAL) {
            self.poll_interval_secs = v
                .trim()
                .parse()
                .with_context(|| format!("{ENV_POLL_INTERVAL}={v:?} is not a number"))?;
        }
        if let Ok(addr) = std::env::var(ENV_HTTP_ADDR) {
            self.http_addr = Some(addr).filter(|a| !a.trim().is_empty());
        }
        self.sanitized()
    }

    fn sanitized(mut self) -> Result<Self> {
        self.poll_interval_secs = self.poll_interval_secs.max(1);
        if !self.delimiter.is_ascii() || matches!(self.delimiter, '"' | '\n' | '\r') {
            bail!("delimiter {:?} is not allowed", self.delimiter);
        }
        Ok(self)
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs)
    }
}
