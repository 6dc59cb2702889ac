//! HTTP probe implementation.

use std::time::{Duration, Instant};

use super::{ProbeError, ProbeOutcome, Prober, PROBE_TIMEOUT};

/// Probes URLs with a single GET per call.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProber {
    pub fn new() -> Result<Self, ProbeError> {
        Self::with_timeout(PROBE_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProbeError::Client(e.to_string()))?;
        Ok(Self::with_client(client, timeout))
    }

    /// Wrap a preconfigured client. `timeout` should match the client's.
    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Run a GET against the given address.
    ///
    /// Returns the status code and the time until the response head arrived.
    pub async fn get(&self, address: &str) -> Result<(u16, Duration), ProbeError> {
        let url = normalize_url(address);

        let start = Instant::now();
        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout(self.timeout)
            } else {
                ProbeError::Network(e.to_string())
            }
        })?;
        let elapsed = start.elapsed();

        Ok((response.status().as_u16(), elapsed))
    }
}

impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        match self.get(url).await {
            Ok((status, elapsed)) => ProbeOutcome::Ok { status, elapsed },
            Err(e) => ProbeOutcome::Failed(e),
        }
    }
}

/// Prefix scheme-less addresses with `http://`.
pub fn normalize_url(address: &str) -> String {
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use std::net::SocketAddr;

    /// Local servers must not be reached through an ambient proxy.
    fn local_prober(timeout: Duration) -> HttpProber {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .unwrap();
        HttpProber::with_client(client, timeout)
    }

    async fn spawn_server() -> SocketAddr {
        let router = Router::new()
            .route("/", get(|| async { "ok" }))
            .route("/broken", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    "late"
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    #[test]
    fn test_default_client_builds() {
        assert!(HttpProber::new().is_ok());
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("example.com"), "http://example.com");
        assert_eq!(normalize_url("https://example.com/x"), "https://example.com/x");
        assert_eq!(normalize_url("http://localhost:8000"), "http://localhost:8000");
    }

    #[tokio::test]
    async fn test_http_probe_ok() {
        let addr = spawn_server().await;
        let prober = local_prober(PROBE_TIMEOUT);

        match prober.probe(&format!("http://{}/", addr)).await {
            ProbeOutcome::Ok { status, elapsed } => {
                assert_eq!(status, 200);
                assert!(elapsed < PROBE_TIMEOUT);
            }
            ProbeOutcome::Failed(e) => panic!("unexpected failure: {}", e),
        }
    }

    #[tokio::test]
    async fn test_http_probe_error_status_is_not_a_failure() {
        let addr = spawn_server().await;
        let prober = local_prober(PROBE_TIMEOUT);

        let outcome = prober.probe(&format!("{}/broken", addr)).await;
        assert!(matches!(outcome, ProbeOutcome::Ok { status: 500, .. }));

        let outcome = prober.probe(&format!("http://{}/missing", addr)).await;
        assert!(matches!(outcome, ProbeOutcome::Ok { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_http_probe_timeout() {
        let addr = spawn_server().await;
        let prober = local_prober(Duration::from_millis(100));

        let outcome = prober.probe(&format!("http://{}/slow", addr)).await;
        assert!(matches!(outcome, ProbeOutcome::Failed(ProbeError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_http_probe_connection_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let prober = local_prober(Duration::from_millis(500));
        let outcome = prober.probe(&format!("http://{}/", addr)).await;
        assert!(matches!(outcome, ProbeOutcome::Failed(_)));
    }
}
