//! Probe that reads the health log a local node appends to.
//!
//! The node writes one JSON object per line. Only the tail of the file is
//! read; the newest line that parses wins and malformed lines are skipped.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;
use url::Url;

use super::{NodeQuery, ProbeError, ProbeReport, parse_timestamp};

/// Bytes read from the end of the log
const TAIL_BYTES: u64 = 4096;

#[derive(Debug, Deserialize)]
struct HealthEntry {
    #[serde(default)]
    timestamp: Option<String>,
    node: NodeSection,
    chain: ChainSection,
    peers: PeerSection,
}

#[derive(Debug, Deserialize)]
struct NodeSection {
    version: String,
}

#[derive(Debug, Deserialize)]
struct ChainSection {
    block_height: u64,
}

#[derive(Debug, Deserialize)]
struct PeerSection {
    count: u32,
}

impl HealthEntry {
    fn into_report(self, raw: Value) -> ProbeReport {
        let report = ProbeReport::new(self.node.version, self.chain.block_height, self.peers.count).with_raw(raw);
        match self.timestamp.as_deref().and_then(parse_timestamp) {
            Some(at) => report.observed_at(at),
            None => report,
        }
    }
}

/// Reads the most recent entry of a `file://` health log
#[derive(Debug, Default)]
pub struct HealthLogQuery;

impl HealthLogQuery {
    pub fn new() -> Self {
        Self
    }

    fn log_path(address: &str) -> Result<PathBuf, ProbeError> {
        Url::parse(address)
            .ok()
            .filter(|url| url.scheme() == "file")
            .and_then(|url| url.to_file_path().ok())
            .ok_or_else(|| ProbeError::UnsupportedAddress(address.to_string()))
    }

    /// The last `limit` valid entries of the log at `address`, oldest first
    pub async fn history(&self, address: &str, limit: usize) -> Result<Vec<Value>, ProbeError> {
        let path = Self::log_path(address)?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ProbeError::Transport(format!("Health log {} unavailable: {e}", path.display())))?;

        let text = String::from_utf8_lossy(&bytes);
        let mut entries: Vec<Value> = text
            .lines()
            .rev()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .take(limit)
            .collect();
        entries.reverse();

        Ok(entries)
    }

    async fn read_tail(path: &Path) -> Result<(String, bool), ProbeError> {
        let mut file = File::open(path)
            .await
            .map_err(|e| ProbeError::Transport(format!("Health log {} unavailable: {e}", path.display())))?;

        let len = file
            .metadata()
            .await
            .map_err(|e| ProbeError::Transport(e.to_string()))?
            .len();
        let truncated = len > TAIL_BYTES;
        if truncated {
            file.seek(SeekFrom::Start(len - TAIL_BYTES))
                .await
                .map_err(|e| ProbeError::Transport(e.to_string()))?;
        }

        let mut buf = Vec::with_capacity(TAIL_BYTES.min(len) as usize);
        file.read_to_end(&mut buf).await.map_err(|e| ProbeError::Transport(e.to_string()))?;

        Ok((String::from_utf8_lossy(&buf).into_owned(), truncated))
    }
}

/// Parse the newest valid entry out of a chunk of log text
///
/// When the chunk was cut from a larger file its first line is partial and
/// is ignored.
fn latest_entry(tail: &str, truncated: bool) -> Result<ProbeReport, ProbeError> {
    let mut lines: Vec<&str> = tail.lines().collect();
    if truncated && !lines.is_empty() {
        lines.remove(0);
    }

    let mut skipped = 0usize;
    for line in lines.iter().rev().map(|line| line.trim()).filter(|line| !line.is_empty()) {
        let parsed = serde_json::from_str::<Value>(line)
            .and_then(|raw| serde_json::from_value::<HealthEntry>(raw.clone()).map(|entry| (entry, raw)));
        match parsed {
            Ok((entry, raw)) => {
                if skipped > 0 {
                    debug!(skipped, "Skipped malformed health log lines");
                }
                return Ok(entry.into_report(raw));
            }
            Err(_) => skipped += 1,
        }
    }

    Err(ProbeError::InvalidResponse("No valid JSON entries found in health log".into()))
}

#[async_trait::async_trait]
impl NodeQuery for HealthLogQuery {
    async fn probe(&self, address: &str) -> Result<ProbeReport, ProbeError> {
        let path = Self::log_path(address)?;
        let (tail, truncated) = Self::read_tail(&path).await?;
        latest_entry(&tail, truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ENTRY: &str = r#"{"timestamp":"2025-01-01T00:00:00Z","overall_health":"healthy","node":{"version":"v1.2.0","network":"mainnet"},"chain":{"block_height":1234567},"peers":{"count":12},"consensus":{},"errors":{}}"#;

    #[test]
    fn test_latest_entry_skips_malformed_lines() {
        let tail = format!("{ENTRY}\n{{\"node\":\n\n");
        let report = latest_entry(&tail, false).unwrap();

        assert_eq!(report.version, "v1.2.0");
        assert_eq!(report.block_height, 1234567);
        assert_eq!(report.peer_count, 12);
        assert_eq!(report.observed_at, Some("2025-01-01T00:00:00Z".parse().unwrap()));
        assert_eq!(report.raw.unwrap()["overall_health"], "healthy");
    }

    #[test]
    fn test_latest_entry_without_timestamp() {
        let entry = r#"{"node":{"version":"v1.2.0"},"chain":{"block_height":5},"peers":{"count":1}}"#;
        let report = latest_entry(entry, false).unwrap();

        assert_eq!(report.observed_at, None);
        assert_eq!(report.block_height, 5);
    }

    #[test]
    fn test_latest_entry_prefers_newest() {
        let newer = ENTRY.replace("1234567", "1234570");
        let tail = format!("{ENTRY}\n{newer}\n");

        assert_eq!(latest_entry(&tail, false).unwrap().block_height, 1234570);
    }

    #[test]
    fn test_latest_entry_ignores_partial_first_line() {
        let partial = &ENTRY[40..];
        assert!(latest_entry(partial, true).is_err());
        assert!(latest_entry("", false).is_err());
    }

    #[tokio::test]
    async fn test_probe_reads_log_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for _ in 0..50 {
            writeln!(file, "{ENTRY}").unwrap();
        }
        writeln!(file, "{}", ENTRY.replace("v1.2.0", "v1.3.0")).unwrap();
        file.flush().unwrap();

        let address = Url::from_file_path(file.path()).unwrap().to_string();
        let report = HealthLogQuery::new().probe(&address).await.unwrap();

        assert_eq!(report.version, "v1.3.0");
    }

    #[tokio::test]
    async fn test_history_returns_latest_entries_oldest_first() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for height in 1..=5 {
            writeln!(file, "{}", ENTRY.replace("1234567", &height.to_string())).unwrap();
            writeln!(file, "not json").unwrap();
        }
        file.flush().unwrap();
        let address = Url::from_file_path(file.path()).unwrap().to_string();

        let entries = HealthLogQuery::new().history(&address, 3).await.unwrap();
        let heights: Vec<u64> = entries.iter().map(|entry| entry["chain"]["block_height"].as_u64().unwrap()).collect();
        assert_eq!(heights, vec![3, 4, 5]);

        let all = HealthLogQuery::new().history(&address, 100).await.unwrap();
        assert_eq!(all.len(), 5);
        assert!(HealthLogQuery::new().history(&address, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_probe_missing_file_is_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let address = Url::from_file_path(dir.path().join("missing.log")).unwrap().to_string();

        let result = HealthLogQuery::new().probe(&address).await;
        assert!(matches!(result, Err(ProbeError::Transport(_))));
    }
}
