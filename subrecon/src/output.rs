//! Result sink: findings written once the scan is over.

use anyhow::{Context, Result};
use clap::ValueEnum;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use takeover::{Finding, ScanReport};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Jsonl,
    Csv,
}

impl OutputFormat {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Some(OutputFormat::Text),
            "jsonl" | "json" => Some(OutputFormat::Jsonl),
            "csv" => Some(OutputFormat::Csv),
            _ => None,
        }
    }
}

/// Formats whose records are already printed to stdout as findings arrive.
pub fn streamed_to_stdout(format: OutputFormat) -> bool {
    format == OutputFormat::Text
}

pub fn finding_line(f: &Finding) -> String {
    format!("[+] {}: {}", f.service, f.host)
}

pub fn write_report<W: Write>(mut w: W, format: OutputFormat, report: &ScanReport) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for f in &report.findings {
                writeln!(w, "{}", finding_line(f))?;
            }
            w.flush()?;
        }
        OutputFormat::Jsonl => {
            for f in &report.findings {
                let mut obj = serde_json::to_value(f)?;
                obj["scan_started_at"] = serde_json::json!(report.started_at);
                obj["scan_ended_at"] = serde_json::json!(report.ended_at);
                writeln!(w, "{}", serde_json::to_string(&obj)?)?;
            }
            w.flush()?;
        }
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(w);
            wtr.write_record(["service", "host", "status"])?;
            for f in &report.findings {
                let status = f.status.map(|v| v.to_string()).unwrap_or_default();
                wtr.write_record([f.service.as_str(), f.host.as_str(), status.as_str()])?;
            }
            wtr.flush()?;
        }
    }
    Ok(())
}

/// Create (or truncate) `path` once and write every finding to it.
pub fn write_report_file(path: &Path, format: OutputFormat, report: &ScanReport) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)
        .with_context(|| format!("unable to create output file {}", path.display()))?;
    write_report(BufWriter::new(file), format, report)
        .with_context(|| format!("error writing output file {}", path.display()))
}
