//! Host source: newline-delimited target files.

use crate::Host;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum HostSourceError {
    #[error("unable to open host file {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("error reading host file {path} at line {line}: {source}")]
    Read { path: PathBuf, line: usize, source: io::Error },
}

/// Read and normalize hosts from `path`.
pub fn load_hosts(path: &Path) -> Result<Vec<Host>, HostSourceError> {
    let file = File::open(path).map_err(|source| HostSourceError::Open { path: path.to_path_buf(), source })?;
    let hosts = parse_hosts(BufReader::new(file)).map_err(|(line, source)| HostSourceError::Read {
        path: path.to_path_buf(),
        line,
        source,
    })?;
    info!(count = hosts.len(), file = %path.display(), "loaded hosts");
    Ok(hosts)
}

/// Parse hosts from any line reader. Blank lines and `#` comments are skipped
/// and repeated hosts keep only their first position. Lines that are not
/// valid UTF-8 are skipped with a warning. On an I/O failure the 1-based line
/// number is returned with the error.
pub fn parse_hosts<R: BufRead>(reader: R) -> Result<Vec<Host>, (usize, io::Error)> {
    let mut seen = HashSet::new();
    let mut hosts = Vec::new();
    for (idx, raw) in reader.split(b'\n').enumerate() {
        let raw = raw.map_err(|e| (idx + 1, e))?;
        let Ok(line) = std::str::from_utf8(&raw) else {
            warn!(line = idx + 1, "skipping host line that is not valid UTF-8");
            continue;
        };
        if line.trim_start().starts_with('#') {
            continue;
        }
        let Some(host) = Host::parse(line) else { continue };
        if seen.insert(host.clone()) {
            hosts.push(host);
        } else {
            debug!(host = %host, line = idx + 1, "duplicate host skipped");
        }
    }
    Ok(hosts)
}
