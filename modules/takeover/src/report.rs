//! Per-scan result state, owned by the orchestrator.

use crate::fetch::{FetchError, FetchResult};
use crate::fingerprint::Finding;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use subrecon_core::Host;

/// Append-only findings keyed by (fingerprint index, host index).
#[derive(Debug, Default)]
pub struct Findings {
    by_slot: BTreeMap<(usize, usize), Finding>,
}

impl Findings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if this (fingerprint, host) pair was already recorded;
    /// the earlier finding is kept.
    pub fn record(&mut self, fingerprint: usize, host: usize, finding: Finding) -> bool {
        match self.by_slot.entry((fingerprint, host)) {
            Entry::Vacant(v) => {
                v.insert(finding);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.by_slot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_slot.is_empty()
    }

    /// Ordered by fingerprint, then by host input order.
    pub fn into_vec(self) -> Vec<Finding> {
        self.by_slot.into_values().collect()
    }
}

/// What is kept about a host once its body has been classified and dropped.
#[derive(Debug, Clone)]
pub struct HostOutcome {
    pub host: Host,
    pub status: Option<u16>,
    pub error: Option<FetchError>,
    pub findings: usize,
    pub duration_ms: u128,
}

impl HostOutcome {
    pub fn from_fetch(result: &FetchResult, findings: usize, duration_ms: u128) -> Self {
        HostOutcome {
            host: result.host.clone(),
            status: result.status,
            error: result.error.clone(),
            findings,
            duration_ms,
        }
    }

    pub fn failed(host: Host, error: FetchError) -> Self {
        HostOutcome { host, status: None, error: Some(error), findings: 0, duration_ms: 0 }
    }
}

#[derive(Debug, Clone)]
pub struct ScanReport {
    pub findings: Vec<Finding>,
    /// One entry per input host, in input order.
    pub hosts: Vec<HostOutcome>,
    pub started_at: String,
    pub ended_at: String,
    pub duration_ms: u128,
}

impl ScanReport {
    pub fn failures(&self) -> impl Iterator<Item = &HostOutcome> {
        self.hosts.iter().filter(|h| h.error.is_some())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }
}
