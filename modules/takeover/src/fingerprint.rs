//! Takeover signatures and the classifiers that test fetched pages against them.

use crate::fetch::FetchResult;
use serde::{Deserialize, Serialize};
use subrecon_core::Host;

/// Text found on a hosting provider's "unclaimed resource" page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Fingerprint {
    pub service: String,
    pub signature: String,
    /// Only match responses with this status code.
    #[serde(default)]
    pub status: Option<u16>,
}

impl Fingerprint {
    pub fn new(service: &str, signature: &str) -> Self {
        Fingerprint { service: service.to_string(), signature: signature.to_string(), status: None }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// The canonical set. Order is part of the contract: findings are
    /// reported by fingerprint index.
    pub fn builtin() -> Vec<Fingerprint> {
        vec![
            Fingerprint::new("AWS", "NoSuchBucket"),
            Fingerprint::new("GitHub Pages", "There isn't a GitHub Pages site here."),
            Fingerprint::new("Readme.io", "Project doesnt exist... yet!"),
        ]
    }
}

/// A candidate takeover: one fingerprint matched on one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub service: String,
    #[serde(serialize_with = "host_as_str")]
    pub host: Host,
    pub status: Option<u16>,
}

fn host_as_str<S: serde::Serializer>(host: &Host, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(host.as_str())
}

pub fn classify(fp: &Fingerprint, result: &FetchResult) -> Option<Finding> {
    if !result.is_ok() || fp.signature.is_empty() {
        return None;
    }
    if fp.status.is_some() && fp.status != result.status {
        return None;
    }
    if !contains(&result.body, fp.signature.as_bytes()) {
        return None;
    }
    Some(Finding { service: fp.service.clone(), host: result.host.clone(), status: result.status })
}

/// Run every fingerprint against `result`, returning matches with their index.
pub fn classify_all(fps: &[Fingerprint], result: &FetchResult) -> Vec<(usize, Finding)> {
    fps.iter()
        .enumerate()
        .filter_map(|(i, fp)| classify(fp, result).map(|f| (i, f)))
        .collect()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
