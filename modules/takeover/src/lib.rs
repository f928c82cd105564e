//! Subdomain takeover detection: fetch every host once, concurrently, and
//! match each response body against known "unclaimed resource" pages.

pub mod fetch;
pub mod fingerprint;
pub mod report;

pub use fetch::{build_client, fetch, FetchError, FetchOptions, FetchResult};
pub use fingerprint::{classify, classify_all, Finding, Fingerprint};
pub use report::{Findings, HostOutcome, ScanReport};

use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use subrecon_core::ratelimiter::RateLimiter;
use subrecon_core::Host;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Maximum fetches in flight.
    pub concurrency: usize,
    /// Cap on fetch starts per second; `None` or 0 disables pacing.
    pub qps: Option<u32>,
    /// Scan-wide budget. Hosts still pending when it expires are recorded as failures.
    pub deadline: Option<Duration>,
    pub fetch: FetchOptions,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions { concurrency: 100, qps: None, deadline: None, fetch: FetchOptions::default() }
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| String::new())
}

struct HostMessage {
    index: usize,
    outcome: HostOutcome,
    findings: Vec<(usize, Finding)>,
}

/// Scan `hosts` against `fingerprints` and return every finding.
pub async fn scan(hosts: Vec<Host>, fingerprints: Vec<Fingerprint>, opts: &ScanOptions) -> Result<ScanReport, ScanError> {
    scan_with(hosts, fingerprints, opts, |_| {}).await
}

/// Like [`scan`], calling `on_finding` for each new finding as its host completes.
pub async fn scan_with<F>(
    hosts: Vec<Host>,
    fingerprints: Vec<Fingerprint>,
    opts: &ScanOptions,
    on_finding: F,
) -> Result<ScanReport, ScanError>
where
    F: FnMut(&Finding),
{
    let client = build_client(&opts.fetch)?;
    Ok(run(client, hosts, fingerprints, opts, on_finding).await)
}

async fn run<F>(client: Client, hosts: Vec<Host>, fingerprints: Vec<Fingerprint>, opts: &ScanOptions, mut on_finding: F) -> ScanReport
where
    F: FnMut(&Finding),
{
    let total = hosts.len();
    let started = Instant::now();
    let started_at = now_rfc3339();
    let deadline = opts.deadline.map(|d| tokio::time::Instant::now() + d);
    info!(total, concurrency = opts.concurrency.max(1), fingerprints = fingerprints.len(), "starting takeover scan");

    let fps: Arc<[Fingerprint]> = fingerprints.into();
    let sem = Arc::new(Semaphore::new(opts.concurrency.max(1)));
    let pacer = opts.qps.filter(|q| *q > 0).map(RateLimiter::new);
    let (tx, mut rx) = mpsc::channel::<HostMessage>(total.max(1));

    let mut handles = Vec::with_capacity(total);
    for (index, host) in hosts.iter().cloned().enumerate() {
        let tx = tx.clone();
        let client = client.clone();
        let sem = sem.clone();
        let pacer = pacer.clone();
        let fps = fps.clone();
        handles.push(tokio::spawn(async move {
            let _permit = sem.acquire_owned().await.ok();
            if let Some(p) = pacer {
                p.acquire().await;
            }
            let t0 = Instant::now();
            let result = fetch(&client, host).await;
            let findings = classify_all(&fps, &result);
            let outcome = HostOutcome::from_fetch(&result, findings.len(), t0.elapsed().as_millis());
            let _ = tx.send(HostMessage { index, outcome, findings }).await;
        }));
    }
    drop(tx);

    let mut outcomes: Vec<Option<HostOutcome>> = (0..total).map(|_| None).collect();
    let mut findings = Findings::new();
    let mut completed = 0usize;
    let mut deadline_hit = false;
    loop {
        let next = match deadline {
            Some(at) => match tokio::time::timeout_at(at, rx.recv()).await {
                Ok(m) => m,
                Err(_) => {
                    deadline_hit = true;
                    warn!(completed, total, "scan deadline reached, abandoning pending hosts");
                    break;
                }
            },
            None => rx.recv().await,
        };
        let Some(msg) = next else { break };
        if outcomes[msg.index].is_some() {
            continue;
        }
        completed += 1;
        match &msg.outcome.error {
            Some(e) => debug!(host = %msg.outcome.host, error = %e, "host failed"),
            None => debug!(host = %msg.outcome.host, status = ?msg.outcome.status, "host fetched"),
        }
        for (fp, finding) in msg.findings {
            info!(service = %finding.service, host = %finding.host, status = ?finding.status, "potential takeover");
            if findings.record(fp, msg.index, finding.clone()) {
                on_finding(&finding);
            }
        }
        info!("({}/{}) hosts completed", completed, total);
        outcomes[msg.index] = Some(msg.outcome);
    }

    for h in &handles {
        h.abort();
    }

    let lost = if deadline_hit { FetchError::Deadline } else { FetchError::Aborted };
    let hosts_out: Vec<HostOutcome> = outcomes
        .into_iter()
        .zip(hosts)
        .map(|(o, host)| o.unwrap_or_else(|| HostOutcome::failed(host, lost.clone())))
        .collect();

    let report = ScanReport {
        findings: findings.into_vec(),
        hosts: hosts_out,
        started_at,
        ended_at: now_rfc3339(),
        duration_ms: started.elapsed().as_millis(),
    };
    info!(
        findings = report.findings.len(),
        failures = report.failure_count(),
        duration_ms = report.duration_ms as u64,
        "takeover check completed"
    );
    report
}
