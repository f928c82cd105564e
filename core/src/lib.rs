//! Core utilities and shared types for the subrecon scanner.

pub mod hosts;
pub mod ratelimiter;

pub use hosts::{load_hosts, parse_hosts, HostSourceError};

use std::fmt;

pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// A scan target, always carrying an explicit `http://` or `https://` scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Host(String);

impl Host {
    /// Normalize a raw input line. Returns `None` for blank input.
    ///
    /// Bare names get `http://` prepended; values already starting with
    /// `http://` or `https://` (any case) are kept as written.
    pub fn parse(raw: &str) -> Option<Host> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }
        if has_scheme(s) {
            Some(Host(s.to_string()))
        } else {
            Some(Host(format!("http://{}", s)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn has_scheme(s: &str) -> bool {
    let lower = s.get(..8).unwrap_or(s).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Host {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
