//! HttpSender - JSON PUT delivery with rate-limit observation

use std::time::Duration;

use contracts::{CommandSender, RateLimitSnapshot, SendOutcome};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::error::DispatcherError;

/// Sender that PUTs each payload to the endpoint as JSON
///
/// One request per call, no retry. Rate-limit headers are logged, never enforced.
#[derive(Debug, Clone)]
pub struct HttpSender {
    name: String,
    client: Client,
}

impl HttpSender {
    /// Create a sender using the client's default timeout
    pub fn new(name: impl Into<String>) -> Result<Self, DispatcherError> {
        Self::with_timeout(name, None)
    }

    /// Create a sender with an optional request timeout
    pub fn with_timeout(
        name: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, DispatcherError> {
        let name = name.into();
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| DispatcherError::sender_creation(&name, e))?;

        Ok(Self { name, client })
    }

    fn log_rate_limits(&self, rate_limits: &RateLimitSnapshot) {
        for (header, value) in rate_limits.iter() {
            debug!(sender = %self.name, header, value, "Rate limit info");
        }
    }
}

/// Read the rate-limit headers present on a response
///
/// Values that are not valid UTF-8 are skipped.
pub fn read_rate_limits(headers: &HeaderMap) -> RateLimitSnapshot {
    RateLimitSnapshot::from_lookup(|name| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    })
}

impl CommandSender for HttpSender {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "http_sender_send",
        skip(self, payload),
        fields(sender = %self.name, endpoint = %endpoint)
    )]
    async fn send(&self, endpoint: &str, payload: &Value) -> SendOutcome {
        let response = match self.client.put(endpoint).json(payload).send().await {
            Ok(response) => response,
            Err(e) => {
                error!(sender = %self.name, error = %e, "Failed to send payload");
                return SendOutcome::Failed {
                    message: e.to_string(),
                };
            }
        };

        let status = response.status();
        let rate_limits = read_rate_limits(response.headers());
        self.log_rate_limits(&rate_limits);

        if status == StatusCode::OK {
            debug!(sender = %self.name, payload = %payload, "Payload delivered");
            SendOutcome::Delivered { rate_limits }
        } else {
            error!(
                sender = %self.name,
                status = status.as_u16(),
                "Endpoint rejected payload"
            );
            SendOutcome::Rejected {
                status: status.as_u16(),
                rate_limits,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::RATE_LIMIT_BURST_CALLS;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accept one request, answer with `status_line`, return the raw request
    async fn serve_once(
        status_line: &'static str,
        headers: &'static str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/api", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\n{headers}content-length: 0\r\nconnection: close\r\n\r\n"
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
            request
        });

        (url, handle)
    }

    async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[tokio::test]
    async fn test_delivered_with_rate_limits() {
        let (url, server) = serve_once(
            "200 OK",
            "X-Singular-Ratelimit-Burst-Calls: 42\r\nx-singular-ratelimit-daily-data: 1000\r\n",
        )
        .await;

        let sender = HttpSender::new("test_http").unwrap();
        let outcome = sender.send(&url, &json!({"command": "score", "value": 3})).await;

        let request = server.await.unwrap();
        assert!(request.starts_with("PUT /api HTTP/1.1"), "got: {request}");
        assert!(request.contains(r#"{"command":"score","value":3}"#));

        match outcome {
            SendOutcome::Delivered { rate_limits } => {
                assert_eq!(rate_limits.burst_calls.as_deref(), Some("42"));
                assert_eq!(rate_limits.daily_data.as_deref(), Some("1000"));
                assert_eq!(rate_limits.daily_calls, None);
                assert_eq!(rate_limits.iter().next(), Some((RATE_LIMIT_BURST_CALLS, "42")));
            }
            other => panic!("expected delivery, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_200_is_rejected() {
        let (url, server) = serve_once("500 Internal Server Error", "").await;

        let sender = HttpSender::new("test_http").unwrap();
        let outcome = sender.send(&url, &json!({"v": 1})).await;
        server.await.unwrap();

        assert_eq!(
            outcome,
            SendOutcome::Rejected {
                status: 500,
                rate_limits: RateLimitSnapshot::default(),
            }
        );
    }

    #[tokio::test]
    async fn test_other_2xx_is_rejected() {
        let (url, server) = serve_once("204 No Content", "").await;

        let sender = HttpSender::new("test_http").unwrap();
        let outcome = sender.send(&url, &json!({"v": 1})).await;
        server.await.unwrap();

        assert!(matches!(outcome, SendOutcome::Rejected { status: 204, .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_is_failed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/api", listener.local_addr().unwrap());
        drop(listener);

        let sender = HttpSender::new("test_http").unwrap();
        let outcome = sender.send(&url, &json!({"v": 1})).await;

        assert!(matches!(outcome, SendOutcome::Failed { .. }), "got {outcome:?}");
    }

    #[tokio::test]
    async fn test_invalid_url_is_failed() {
        let sender = HttpSender::new("test_http").unwrap();
        let outcome = sender.send("not a url", &json!({"v": 1})).await;

        assert!(matches!(outcome, SendOutcome::Failed { .. }));
        assert!(outcome.rate_limits().is_none());
    }

    #[tokio::test]
    async fn test_timeout_is_failed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/api", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
            drop(stream);
        });

        let sender =
            HttpSender::with_timeout("test_http", Some(Duration::from_millis(100))).unwrap();
        let outcome = sender.send(&url, &json!({"v": 1})).await;

        assert!(matches!(outcome, SendOutcome::Failed { .. }));
        server.abort();
    }
}
