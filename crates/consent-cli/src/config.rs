use anyhow::{anyhow, Context, Result};
use consent_core::SeedData;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_LISTEN: &str = "127.0.0.1:8000";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub log: Log,
    /// Absent → the built-in sample data set.
    pub seed: Option<SeedData>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Server {
    pub listen: String,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Log {
    pub filter: String,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Seed set to load at startup.
    pub fn seed_data(&self) -> SeedData {
        self.seed.clone().unwrap_or_else(SeedData::sample)
    }

    /// Environment overrides win over the file (`CONSENTD_LISTEN`).
    fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var("CONSENTD_LISTEN") {
            if !addr.is_empty() {
                self.server.listen = addr;
            }
        }
    }
}

/// Load config from `path`, or from the default location when `None`.
///
/// A missing file yields defaults; a file that fails to parse is an error.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_path()?,
    };
    let mut cfg = read_config(&path)?.unwrap_or_default();
    cfg.apply_env();
    Ok(cfg)
}

pub fn read_config(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }
    let txt = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let cfg: Config =
        toml::from_str(&txt).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(cfg))
}

pub fn default_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot resolve home dir"))?;
    Ok(home.join(".consentd").join("config.toml"))
}
