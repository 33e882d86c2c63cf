use reqwest::{Method, Url};
use serde::de::DeserializeOwned;

use crate::envelope::Attempt;
use crate::error::{Error, Result};
use crate::net::response_decoder;
use crate::net::transport_config::TransportConfig;
use crate::upload::UploadFile;

/// a fully resolved request, ready to be handed to a [`Transport`]
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<String>,
    pub config: TransportConfig,
}

/// the bits of a response the orchestration layer cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// performs the actual network I/O.
///
/// implementations only move bytes around and report network level failures
/// as `Err`. deciding whether a response counts as a success, and parsing it,
/// happens in [`perform`]
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Result<RawResponse>;

    /// posts `file` as a multipart form under the `file` field
    async fn send_multipart(
        &self,
        url: &Url,
        file: &UploadFile,
        config: &TransportConfig,
    ) -> Result<RawResponse>;
}

/// parses `target` into an absolute http(s) url
pub fn parse_target(target: &str) -> Result<Url> {
    let url = Url::parse(target)
        .map_err(|e| Error::configuration(format!("invalid target url `{target}`: {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::configuration(format!(
            "unsupported scheme `{scheme}` in `{target}`, expected http or https"
        ))),
    }
}

/// runs a single attempt of `request` against `transport`, timing it and
/// normalizing whatever came back
pub async fn perform<T, X>(transport: &X, request: &OutboundRequest) -> Attempt<T>
where
    T: DeserializeOwned,
    X: Transport + ?Sized,
{
    let started_at = chrono::Utc::now().timestamp();
    let start = tokio::time::Instant::now();

    let (body, error) = match transport.send(request).await {
        Ok(response) => response_decoder::decode(response),
        Err(e) => (None, Some(e)),
    };
    let round_trip = start.elapsed();

    match error {
        Some(ref e) => tracing::warn!(
            method = %request.method,
            url = %request.url,
            error = %e,
            "attempt failed"
        ),
        None => tracing::debug!(
            method = %request.method,
            url = %request.url,
            round_trip_ms = round_trip.as_millis() as u64,
            "attempt succeeded"
        ),
    }

    Attempt {
        started_at,
        round_trip,
        body,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target_accepts_http_and_https() {
        assert!(parse_target("http://localhost:8080/health").is_ok());
        assert!(parse_target("https://example.com").is_ok());
    }

    #[test]
    fn test_parse_target_rejects_garbage() {
        assert!(matches!(parse_target("not a url"), Err(Error::Configuration(_))));
        assert!(matches!(
            parse_target("ftp://example.com/file"),
            Err(Error::Configuration(_))
        ));
    }
}
