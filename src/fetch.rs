//! Bounded HTTP fetching with user-agent rotation.
//!
//! Every outbound GET gets a random user agent from a fixed pool, browser-like
//! headers, a hard 60-second deadline, and a streaming size cap. Transient
//! failures (5xx, connection reset, 429) retry with exponential backoff;
//! other 4xx failures (notably 403) do not retry here, the strategy layer
//! decides what to do next.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use backoff::ExponentialBackoffBuilder;
use futures::StreamExt;
use rand::RngExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::config::PipelineConfig;
use crate::core::error::AuditError;

/// Realistic desktop/mobile user agents, rotated per call.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1",
];

pub fn random_user_agent() -> &'static str {
    let index = rand::rng().random_range(0..USER_AGENTS.len());
    USER_AGENTS[index]
}

/// Browser-like request headers sent alongside the rotated user agent.
fn stealth_headers() -> [(&'static str, &'static str); 5] {
    [
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("DNT", "1"),
        ("Upgrade-Insecure-Requests", "1"),
        ("Cache-Control", "max-age=0"),
    ]
}

/// A fetched response body with its resolved content type.
#[derive(Debug, Clone)]
pub struct FetchedBody {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub status: u16,
    pub final_url: String,
}

impl FetchedBody {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub fn is_html(&self) -> bool {
        self.mime.starts_with("text/html")
            || self.mime.starts_with("application/xhtml")
            || looks_like_html(&self.bytes)
    }
}

fn looks_like_html(bytes: &[u8]) -> bool {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]).to_ascii_lowercase();
    head.trim_start().starts_with("<!doctype html") || head.contains("<html")
}

#[derive(Clone)]
pub struct Fetcher {
    http: reqwest::Client,
    config: Arc<PipelineConfig>,
}

impl Fetcher {
    pub fn new(http: reqwest::Client, config: Arc<PipelineConfig>) -> Self {
        Self { http, config }
    }

    /// GET `url` within the fetch deadline, capped at `max_media_size` bytes.
    ///
    /// HTTP status ≥ 400 surfaces as `FetchHttp`; 5xx and 429 are retried
    /// with exponential backoff (base 800 ms, factor 2) up to `max_retries`
    /// times. Cancellation aborts the in-flight request immediately.
    pub async fn get(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<FetchedBody, AuditError> {
        let deadline = self.config.fetch_timeout;
        let fetch = self.get_with_retry(url);

        tokio::select! {
            res = tokio::time::timeout(deadline, fetch) => match res {
                Ok(inner) => inner,
                Err(_) => Err(AuditError::FetchTimeout(deadline)),
            },
            _ = cancel.cancelled() => Err(AuditError::Cancelled),
        }
    }

    async fn get_with_retry(&self, url: &str) -> Result<FetchedBody, AuditError> {
        let max_retries = self.config.max_retries;
        let attempts = AtomicU32::new(0);

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.config.backoff_base)
            .with_multiplier(2.0)
            .with_max_elapsed_time(Some(self.config.fetch_timeout))
            .build();

        backoff::future::retry(policy, || async {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed);
            match self.get_once(url).await {
                Ok(body) => Ok(body),
                Err(e) => {
                    let retriable = match &e {
                        AuditError::FetchHttp { status } => *status >= 500 || *status == 429,
                        AuditError::FetchNetwork(_) => true,
                        _ => false,
                    };
                    if retriable && attempt < max_retries {
                        warn!(url, attempt, error = %e, "fetch failed, will retry");
                        Err(backoff::Error::transient(e))
                    } else {
                        Err(backoff::Error::permanent(e))
                    }
                }
            }
        })
        .await
    }

    async fn get_once(&self, url: &str) -> Result<FetchedBody, AuditError> {
        let mut request = self
            .http
            .get(url)
            .header("User-Agent", random_user_agent());
        for (name, value) in stealth_headers() {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AuditError::FetchTimeout(self.config.fetch_timeout)
            } else {
                AuditError::FetchNetwork(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(AuditError::FetchHttp { status });
        }

        let final_url = response.url().to_string();
        let header_mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase());

        // Reject oversized bodies before reading them when the server is honest.
        let limit = self.config.max_media_size;
        if let Some(len) = response.content_length() {
            if len > limit {
                return Err(AuditError::PayloadTooLarge { limit });
            }
        }

        let mut bytes: Vec<u8> = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| AuditError::FetchNetwork(e.to_string()))?;
            if bytes.len() as u64 + chunk.len() as u64 > limit {
                return Err(AuditError::PayloadTooLarge { limit });
            }
            bytes.extend_from_slice(&chunk);
        }

        let mime = header_mime
            .filter(|m| !m.is_empty() && m != "application/octet-stream")
            .or_else(|| {
                mime_guess::from_path(url::Url::parse(&final_url).ok()?.path())
                    .first_raw()
                    .map(|m| m.to_string())
            })
            .unwrap_or_else(|| {
                if looks_like_html(&bytes) {
                    "text/html".to_string()
                } else {
                    "application/octet-stream".to_string()
                }
            });

        debug!(url, status, mime, size = bytes.len(), "fetched");

        Ok(FetchedBody {
            bytes,
            mime,
            status,
            final_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(config: PipelineConfig) -> Fetcher {
        Fetcher::new(reqwest::Client::new(), Arc::new(config))
    }

    #[test]
    fn user_agent_pool_is_nonempty() {
        assert!(random_user_agent().contains("Mozilla"));
    }

    #[tokio::test]
    async fn fetches_body_and_mime() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(
                        "<html><body>hi</body></html>".as_bytes().to_vec(),
                        "text/html; charset=utf-8",
                    ),
            )
            .mount(&server)
            .await;

        let body = fetcher(PipelineConfig::defaults())
            .get(&format!("{}/page", server.uri()), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(body.mime, "text/html");
        assert!(body.is_html());
        assert_eq!(body.status, 200);
    }

    #[tokio::test]
    async fn http_403_surfaces_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blocked"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let err = fetcher(PipelineConfig::defaults())
            .get(
                &format!("{}/blocked", server.uri()),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::FetchHttp { status: 403 }));
    }

    #[tokio::test]
    async fn server_errors_retry_then_succeed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
            .mount(&server)
            .await;

        let mut config = PipelineConfig::defaults();
        config.backoff_base = std::time::Duration::from_millis(10);
        let body = fetcher(config)
            .get(
                &format!("{}/flaky", server.uri()),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(body.text(), "recovered");
    }

    #[tokio::test]
    async fn oversized_body_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/big"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 4096]))
            .mount(&server)
            .await;

        let mut config = PipelineConfig::defaults();
        config.max_media_size = 1024;
        let err = fetcher(config)
            .get(&format!("{}/big", server.uri()), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::PayloadTooLarge { .. }));
    }
}
