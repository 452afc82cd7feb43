//! HTTP probe against a node's `/health` endpoint.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::{NodeQuery, ProbeError, ProbeReport, parse_timestamp};

/// Body served by a node's `/health` endpoint
#[derive(Debug, Deserialize)]
struct HealthResponse {
    node_version: String,
    block_height: u64,
    peer_count: u32,
    #[serde(default = "default_online")]
    online_status: bool,
    #[serde(default)]
    timestamp: Option<String>,
}

fn default_online() -> bool {
    true
}

/// Probes `GET <address>/health` and reads the node's JSON health summary
pub struct HttpNodeQuery {
    client: reqwest::Client,
}

impl HttpNodeQuery {
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProbeError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    fn health_url(address: &str) -> String {
        format!("{}/health", address.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl NodeQuery for HttpNodeQuery {
    async fn probe(&self, address: &str) -> Result<ProbeReport, ProbeError> {
        let response = self
            .client
            .get(Self::health_url(address))
            .send()
            .await
            .map_err(|e| ProbeError::Transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Transport(format!(
                "Health endpoint returned status code: {}",
                status.as_u16()
            )));
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| ProbeError::InvalidResponse(e.to_string()))?;
        let body: HealthResponse =
            serde_json::from_value(raw.clone()).map_err(|e| ProbeError::InvalidResponse(e.to_string()))?;

        if !body.online_status {
            return Err(ProbeError::Transport("Node reports itself offline".into()));
        }

        let report = ProbeReport::new(body.node_version, body.block_height, body.peer_count).with_raw(raw);
        Ok(match body.timestamp.as_deref().and_then(parse_timestamp) {
            Some(at) => report.observed_at(at),
            None => report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a single canned HTTP response and return the base address
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });

        format!("http://{addr}/")
    }

    #[test]
    fn test_health_url() {
        assert_eq!(HttpNodeQuery::health_url("http://10.0.0.1:3033/"), "http://10.0.0.1:3033/health");
        assert_eq!(HttpNodeQuery::health_url("http://10.0.0.1:3033"), "http://10.0.0.1:3033/health");
    }

    #[tokio::test]
    async fn test_probe_parses_health_body() {
        let address = serve_once(
            "200 OK",
            r#"{"node_version":"v1.2.0","block_height":1234567,"peer_count":12,"online_status":true}"#,
        )
        .await;
        let query = HttpNodeQuery::new(Duration::from_secs(5)).unwrap();

        let report = query.probe(&address).await.unwrap();
        assert_eq!(report.version, "v1.2.0");
        assert_eq!(report.block_height, 1234567);
        assert_eq!(report.peer_count, 12);
        assert_eq!(report.observed_at, None);
        assert_eq!(report.raw.unwrap()["online_status"], true);
    }

    #[tokio::test]
    async fn test_probe_reads_node_timestamp() {
        let address = serve_once(
            "200 OK",
            r#"{"node_version":"v1.2.0","block_height":7,"peer_count":4,"timestamp":"2024-06-01T08:00:00Z"}"#,
        )
        .await;
        let query = HttpNodeQuery::new(Duration::from_secs(5)).unwrap();

        let report = query.probe(&address).await.unwrap();
        assert_eq!(report.observed_at, Some("2024-06-01T08:00:00Z".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_probe_rejects_error_status() {
        let address = serve_once("503 Service Unavailable", r#"{"detail":"starting"}"#).await;
        let query = HttpNodeQuery::new(Duration::from_secs(5)).unwrap();

        assert!(matches!(query.probe(&address).await, Err(ProbeError::Transport(_))));
    }

    #[tokio::test]
    async fn test_probe_rejects_malformed_body() {
        let address = serve_once("200 OK", r#"{"node_version":"v1.2.0"}"#).await;
        let query = HttpNodeQuery::new(Duration::from_secs(5)).unwrap();

        assert!(matches!(query.probe(&address).await, Err(ProbeError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_probe_reports_self_declared_offline() {
        let address = serve_once(
            "200 OK",
            r#"{"node_version":"v1.2.0","block_height":1,"peer_count":0,"online_status":false}"#,
        )
        .await;
        let query = HttpNodeQuery::new(Duration::from_secs(5)).unwrap();

        assert!(matches!(query.probe(&address).await, Err(ProbeError::Transport(_))));
    }
}
