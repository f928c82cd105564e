use anyhow::{anyhow, bail, Result};
use clap::Parser;
use rand::seq::SliceRandom;
use std::path::PathBuf;
use std::time::Duration;
use takeover::{FetchOptions, ScanOptions};
use tracing::{debug, error, info, warn, Level};

mod config;
mod output;

use config::Config;
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "subrecon", version, about = "Subdomain takeover scanner")]
struct Cli {
    /// File with newline-delimited hosts (bare domains or URLs; blanks and # comments ignored)
    #[arg(short = 'i', long, value_name = "FILE")]
    input: PathBuf,
    /// Output file for findings (written once, after the scan)
    #[arg(short = 'o', long, value_name = "FILE")]
    output: PathBuf,
    /// Optional config file (YAML). If omitted, loads ./subrecon.yaml if present.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Max concurrent fetches [default: 100]
    #[arg(long)]
    concurrency: Option<usize>,
    /// Overall timeout per request in milliseconds [default: 10000]
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Connect timeout in milliseconds [default: 15000]
    #[arg(long)]
    connect_timeout_ms: Option<u64>,
    /// Max redirects to follow [default: 10]
    #[arg(long)]
    redirects: Option<usize>,
    /// Cap on requests started per second; 0 disables pacing
    #[arg(long)]
    qps: Option<u32>,
    /// Abandon hosts still pending after this many seconds
    #[arg(long)]
    deadline_secs: Option<u64>,
    /// User-Agent header
    #[arg(long)]
    user_agent: Option<String>,
    /// Output format [default: text]
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
    /// Randomize the order hosts are fetched in
    #[arg(long)]
    shuffle: bool,
    /// Debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug)]
struct Settings {
    scan: ScanOptions,
    format: OutputFormat,
    shuffle: bool,
}

/// Flag > config file > default.
fn resolve(cli: &Cli, cfg: &Config) -> Result<Settings> {
    let s = &cfg.scan;
    let defaults = FetchOptions::default();
    let fetch = FetchOptions {
        timeout_ms: cli.timeout_ms.or(s.timeout_ms).unwrap_or(defaults.timeout_ms),
        connect_timeout_ms: cli.connect_timeout_ms.or(s.connect_timeout_ms).unwrap_or(defaults.connect_timeout_ms),
        keepalive_ms: s.keepalive_ms.unwrap_or(defaults.keepalive_ms),
        redirects: cli.redirects.or(s.redirects).unwrap_or(defaults.redirects),
        user_agent: cli.user_agent.clone().or_else(|| s.user_agent.clone()).unwrap_or(defaults.user_agent),
    };
    if fetch.timeout_ms == 0 {
        bail!("timeout must be > 0");
    }
    let concurrency = cli.concurrency.or(s.concurrency).unwrap_or(ScanOptions::default().concurrency);
    if concurrency == 0 {
        bail!("concurrency must be > 0");
    }
    let format = match (cli.format, s.format.as_deref()) {
        (Some(f), _) => f,
        (None, Some(name)) => OutputFormat::from_name(name).ok_or_else(|| anyhow!("unknown output format in config: {}", name))?,
        (None, None) => OutputFormat::Text,
    };
    Ok(Settings {
        scan: ScanOptions {
            concurrency,
            qps: cli.qps.or(s.qps).filter(|q| *q > 0),
            deadline: cli.deadline_secs.or(s.deadline_secs).map(Duration::from_secs),
            fetch,
        },
        format,
        shuffle: cli.shuffle || s.shuffle.unwrap_or(false),
    })
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        Level::DEBUG
    } else if quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).with_target(false).with_writer(std::io::stderr).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let cfg = config::load_config(cli.config.as_deref())?;
    let settings = resolve(&cli, &cfg)?;
    let fingerprints = cfg.fingerprints();
    if fingerprints.is_empty() {
        bail!("no fingerprints configured");
    }
    debug!(?settings, "resolved settings");

    let mut hosts = subrecon_core::load_hosts(&cli.input)?;
    if hosts.is_empty() {
        warn!(file = %cli.input.display(), "no hosts to scan");
    }
    if settings.shuffle {
        hosts.shuffle(&mut rand::thread_rng());
    }

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(takeover::scan_with(hosts, fingerprints, &settings.scan, |f| {
        println!("{}", output::finding_line(f));
    }))?;

    for h in report.failures() {
        if let Some(e) = &h.error {
            debug!(host = %h.host, error = %e, "unreachable");
        }
    }
    info!(
        hosts = report.hosts.len(),
        findings = report.findings.len(),
        failures = report.failure_count(),
        "scan finished"
    );

    if let Err(e) = output::write_report_file(&cli.output, settings.format, &report) {
        if output::streamed_to_stdout(settings.format) {
            error!("{:#}; findings were printed to stdout above", e);
        } else {
            error!("{:#}; findings follow on stdout", e);
            output::write_report(std::io::stdout().lock(), settings.format, &report)?;
        }
        return Err(e);
    }
    info!(output = %cli.output.display(), "output written");
    Ok(())
}
