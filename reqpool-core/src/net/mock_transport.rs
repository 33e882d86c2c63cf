//! In-memory [`Transport`] used by tests and dry runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::Url;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::net::transport::{OutboundRequest, RawResponse, Transport};
use crate::net::transport_config::TransportConfig;
use crate::upload::UploadFile;

/// canned outcome for a mocked call
#[derive(Debug, Clone)]
enum MockResponse {
    Respond(RawResponse),
    Fail(String),
}

/// record of a call made to the mock
#[derive(Debug, Clone)]
pub struct MockCall {
    pub method: String,
    pub url: String,
    /// path plus query, the same string used to look up responses
    pub path: String,
    pub body: Option<String>,
    pub headers: Vec<(String, String)>,
    pub started: Instant,
    pub finished: Option<Instant>,
}

/// returns predetermined responses keyed by `"{METHOD} {path}"`.
///
/// multiple responses for the same key are handed out in FIFO order. when a
/// queue runs dry the call fails with a transport error, like an unreachable
/// host would
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    responses: Arc<Mutex<HashMap<String, Vec<MockResponse>>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    in_flight: Arc<AtomicUsize>,
    latency: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// every call sleeps for `latency` before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn add_response(&self, key: &str, response: RawResponse) {
        self.push(key, MockResponse::Respond(response));
    }

    pub fn add_json(&self, key: &str, body: serde_json::Value) {
        self.add_response(key, RawResponse::new(200, body.to_string()));
    }

    /// queues a network level failure
    pub fn add_failure(&self, key: &str, message: &str) {
        self.push(key, MockResponse::Fail(message.to_string()));
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn push(&self, key: &str, response: MockResponse) {
        self.responses
            .lock()
            .entry(key.to_string())
            .or_default()
            .push(response);
    }

    async fn respond(
        &self,
        method: &str,
        url: &Url,
        body: Option<String>,
        config: &TransportConfig,
    ) -> Result<RawResponse> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlightGuard {
            in_flight: self.in_flight.clone(),
        };

        let path = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        let index = {
            let mut calls = self.calls.lock();
            calls.push(MockCall {
                method: method.to_string(),
                url: url.to_string(),
                path: path.clone(),
                body,
                headers: config
                    .headers()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                started: Instant::now(),
                finished: None,
            });
            calls.len() - 1
        };

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let key = format!("{method} {path}");
        let response = {
            let mut responses = self.responses.lock();
            responses
                .get_mut(&key)
                .filter(|queue| !queue.is_empty())
                .map(|queue| queue.remove(0))
        };

        if let Some(call) = self.calls.lock().get_mut(index) {
            call.finished = Some(Instant::now());
        }

        match response {
            Some(MockResponse::Respond(response)) => Ok(response),
            Some(MockResponse::Fail(message)) => Err(Error::Transport(message)),
            None => Err(Error::Transport(format!("no mock response configured for {key}"))),
        }
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<RawResponse> {
        self.respond(
            request.method.as_str(),
            &request.url,
            request.body.clone(),
            &request.config,
        )
        .await
    }

    async fn send_multipart(
        &self,
        url: &Url,
        file: &UploadFile,
        config: &TransportConfig,
    ) -> Result<RawResponse> {
        let body = format!("file={};type={}", file.file_name, file.content_type);
        self.respond("POST", url, Some(body), config).await
    }
}

struct InFlightGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    fn request(method: Method, url: &str) -> OutboundRequest {
        OutboundRequest {
            method,
            url: Url::parse(url).unwrap(),
            body: None,
            config: TransportConfig::new().with_header("api-key", "xTD4s3d9j3"),
        }
    }

    #[tokio::test]
    async fn test_responses_are_fifo() {
        let mock = MockTransport::new();
        mock.add_response("GET /status", RawResponse::new(200, "first"));
        mock.add_response("GET /status", RawResponse::new(200, "second"));

        let req = request(Method::GET, "https://example.com/status");
        assert_eq!(mock.send(&req).await.unwrap().body, "first");
        assert_eq!(mock.send(&req).await.unwrap().body, "second");
        assert!(mock.send(&req).await.is_err());
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_records_query_and_headers() {
        let mock = MockTransport::new();
        mock.add_failure("GET /blogs?blogId=2", "connection reset");

        let req = request(Method::GET, "https://example.com/blogs?blogId=2");
        let err = mock.send(&req).await.unwrap_err();
        assert!(matches!(err, Error::Transport(ref msg) if msg == "connection reset"));

        let calls = mock.calls();
        assert_eq!(calls[0].path, "/blogs?blogId=2");
        assert_eq!(calls[0].headers, vec![("api-key".to_string(), "xTD4s3d9j3".to_string())]);
        assert!(calls[0].finished.is_some());
        assert_eq!(mock.in_flight_count(), 0);
    }
}
