use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use takeover::Fingerprint;

pub const DEFAULT_CONFIG: &str = "subrecon.yaml";

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    pub concurrency: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
    pub keepalive_ms: Option<u64>,
    pub redirects: Option<usize>,
    pub qps: Option<u32>,
    pub deadline_secs: Option<u64>,
    pub user_agent: Option<String>,
    pub format: Option<String>,
    pub shuffle: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    /// Extra signatures, checked after the built-in ones.
    #[serde(default)]
    pub fingerprints: Vec<Fingerprint>,
    #[serde(default = "yes")]
    pub builtin_fingerprints: bool,
}

fn yes() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Config { scan: ScanConfig::default(), fingerprints: Vec::new(), builtin_fingerprints: true }
    }
}

impl Config {
    /// Built-ins first so their indices never shift.
    pub fn fingerprints(&self) -> Vec<Fingerprint> {
        let mut fps = if self.builtin_fingerprints { Fingerprint::builtin() } else { Vec::new() };
        fps.extend(self.fingerprints.iter().filter(|f| !f.signature.is_empty()).cloned());
        fps
    }
}

/// Load an explicitly named config, or `./subrecon.yaml` if it exists.
/// A named file that is missing or malformed is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = Path::new(DEFAULT_CONFIG);
            if p.exists() { p.to_path_buf() } else { return Ok(Config::default()); }
        }
    };
    let s = fs::read_to_string(&path).with_context(|| format!("unable to read config {}", path.display()))?;
    parse_config(&s).with_context(|| format!("invalid config {}", path.display()))
}

pub fn parse_config(s: &str) -> Result<Config> {
    if s.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(s)?)
}
