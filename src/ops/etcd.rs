// file: src/ops/etcd.rs
// version: 1.0.0
// guid: 0b8e4f62-7a19-4d3c-85e6-c1f9a2d7b430

//! Waiting for etcd to report healthy

use crate::error::InstallError;
use crate::Result;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_ETCD_ENDPOINT: &str = "https://localhost:2379";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Poll settings for [`wait_for_etcd`]
#[derive(Debug, Clone)]
pub struct EtcdWaitOptions {
    /// Base URL of the etcd client endpoint; `/health` is appended
    pub endpoint: String,
    pub interval: Duration,
    pub timeout: Duration,
    /// Skip TLS verification, for the bootstrap member's self-signed certificate
    pub accept_invalid_certs: bool,
}

impl Default for EtcdWaitOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ETCD_ENDPOINT.to_string(),
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_WAIT_TIMEOUT,
            accept_invalid_certs: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    health: String,
}

/// `<endpoint>/health`, keeping any path prefix on the endpoint
fn health_url(endpoint: &str) -> Result<url::Url> {
    let invalid = |e: url::ParseError| {
        InstallError::config(format!("Invalid etcd endpoint {}: {}", endpoint, e))
    };
    let mut base = url::Url::parse(endpoint).map_err(invalid)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("health").map_err(invalid)
}

/// One health probe; `Ok(false)` means etcd answered but is not healthy yet
async fn probe(client: &reqwest::Client, url: &url::Url) -> Result<bool> {
    let response = client.get(url.clone()).send().await?;
    if response.status() != reqwest::StatusCode::OK {
        debug!("etcd health returned HTTP {}", response.status());
        return Ok(false);
    }
    let body: HealthResponse = response.json().await?;
    Ok(body.health == "true")
}

/// Poll `<endpoint>/health` on a fixed interval until etcd is healthy or `timeout` elapses
///
/// A zero `interval` is rejected.
pub async fn wait_for_etcd(opts: &EtcdWaitOptions) -> Result<()> {
    if opts.interval.is_zero() {
        return Err(InstallError::config("etcd poll interval must be greater than zero"));
    }
    let url = health_url(&opts.endpoint)?;
    let client = reqwest::Client::builder()
        .timeout(opts.interval.max(Duration::from_secs(1)))
        .danger_accept_invalid_certs(opts.accept_invalid_certs)
        .build()?;

    info!("Waiting up to {:?} for etcd at {}", opts.timeout, url);

    let poll = async {
        let mut ticker = tokio::time::interval(opts.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut attempt = 0u32;
        loop {
            ticker.tick().await;
            attempt += 1;
            match probe(&client, &url).await {
                Ok(true) => return attempt,
                Ok(false) => debug!(attempt, "etcd not healthy yet"),
                Err(e) => debug!(attempt, error = %e, "etcd health probe failed"),
            }
        }
    };

    match tokio::time::timeout(opts.timeout, poll).await {
        Ok(attempts) => {
            info!("etcd is healthy after {} probe(s)", attempts);
            Ok(())
        }
        Err(_) => Err(InstallError::timeout(format!(
            "etcd at {} did not become healthy within {:?}",
            opts.endpoint, opts.timeout
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `/health`, unhealthy for the first `unhealthy_for` requests
    async fn health_server(unhealthy_for: u32) -> (String, Arc<AtomicU32>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let body = if n < unhealthy_for {
                    r#"{"health":"false"}"#
                } else {
                    r#"{"health":"true"}"#
                };
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}", addr), hits)
    }

    fn opts(endpoint: String, timeout: Duration) -> EtcdWaitOptions {
        EtcdWaitOptions {
            endpoint,
            interval: Duration::from_millis(20),
            timeout,
            accept_invalid_certs: false,
        }
    }

    #[tokio::test]
    async fn test_waits_until_healthy() {
        // Arrange
        let (endpoint, hits) = health_server(2).await;

        // Act
        let result = wait_for_etcd(&opts(endpoint, Duration::from_secs(5))).await;

        // Assert
        assert!(result.is_ok());
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_times_out_when_never_healthy() {
        let (endpoint, _) = health_server(u32::MAX).await;

        let err = wait_for_etcd(&opts(endpoint, Duration::from_millis(200)))
            .await
            .unwrap_err();

        assert!(matches!(err, InstallError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_times_out_when_unreachable() {
        // bind then drop to get a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = wait_for_etcd(&opts(format!("http://{}", addr), Duration::from_millis(200)))
            .await
            .unwrap_err();

        assert!(matches!(err, InstallError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_invalid_endpoint() {
        let err = wait_for_etcd(&opts("not a url".to_string(), Duration::from_secs(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, InstallError::Config(_)));
    }

    #[test]
    fn test_health_url() {
        assert_eq!(
            health_url("https://localhost:2379").unwrap().as_str(),
            "https://localhost:2379/health"
        );
        assert_eq!(
            health_url("https://10.0.0.1:2379/etcd").unwrap().as_str(),
            "https://10.0.0.1:2379/etcd/health"
        );
        assert_eq!(
            health_url("https://10.0.0.1:2379/etcd/").unwrap().as_str(),
            "https://10.0.0.1:2379/etcd/health"
        );
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let mut options = opts(DEFAULT_ETCD_ENDPOINT.to_string(), Duration::from_secs(1));
        options.interval = Duration::ZERO;

        let err = wait_for_etcd(&options).await.unwrap_err();

        assert!(matches!(err, InstallError::Config(_)));
    }

    #[tokio::test]
    async fn test_sub_second_interval_polls_repeatedly() {
        // Arrange
        let (endpoint, hits) = health_server(4).await;
        let mut options = opts(endpoint, Duration::from_secs(5));
        options.interval = Duration::from_millis(5);

        // Act
        wait_for_etcd(&options).await.unwrap();

        // Assert
        assert_eq!(hits.load(Ordering::SeqCst), 5);
    }
}
