use std::sync::Arc;

use reqwest::Url;
use tokio::sync::OnceCell;

use crate::error::Result;
use crate::net::transport::{OutboundRequest, RawResponse, Transport};
use crate::net::transport_config::TransportConfig;
use crate::upload::UploadFile;

/// production transport backed by `reqwest`. the scheme of the url decides
/// between plain HTTP and HTTPS.
///
/// requests asking for `accept_invalid_certs` go through a second client. it
/// is built on first use with default settings, unless one was given through
/// [`ReqwestTransport::with_clients`]
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    insecure_client: Arc<OnceCell<reqwest::Client>>,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// uses a pre-configured client, e.g. one with proxies or extra root certificates
    pub fn with_client(client: reqwest::Client) -> Self {
        ReqwestTransport {
            client,
            insecure_client: Arc::new(OnceCell::new()),
        }
    }

    /// like [`ReqwestTransport::with_client`], also supplying the client used
    /// for requests that accept invalid certificates
    pub fn with_clients(client: reqwest::Client, insecure_client: reqwest::Client) -> Self {
        ReqwestTransport {
            client,
            insecure_client: Arc::new(OnceCell::new_with(Some(insecure_client))),
        }
    }

    async fn client_for(&self, config: &TransportConfig) -> Result<reqwest::Client> {
        if !config.insecure() {
            return Ok(self.client.clone());
        }

        let client = self
            .insecure_client
            .get_or_try_init(|| async {
                tracing::debug!("building client that accepts invalid certificates");
                reqwest::Client::builder()
                    .danger_accept_invalid_certs(true)
                    .build()
            })
            .await?;

        Ok(client.clone())
    }

    fn append_headers(
        &self,
        config: &TransportConfig,
        mut request_builder: reqwest::RequestBuilder,
    ) -> reqwest::RequestBuilder {
        for (name, value) in config.headers() {
            request_builder = request_builder.header(name, value);
        }

        if let Some(timeout) = config.timeout {
            request_builder = request_builder.timeout(timeout);
        }

        request_builder
    }

    async fn finish(
        &self,
        request_builder: reqwest::RequestBuilder,
        url: &Url,
    ) -> Result<RawResponse> {
        let response = request_builder.send().await.map_err(|e| {
            tracing::error!(url = %url, error = %e, "HTTP request failed");
            e
        })?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::debug!(
            url = %url,
            status = status,
            response_len = body.len(),
            "HTTP request completed"
        );

        Ok(RawResponse { status, body })
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    #[tracing::instrument(skip_all, fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: &OutboundRequest) -> Result<RawResponse> {
        let client = self.client_for(&request.config).await?;
        let mut request_builder = self.append_headers(
            &request.config,
            client.request(request.method.clone(), request.url.clone()),
        );

        if let Some(body) = &request.body {
            request_builder = request_builder.body(body.clone());
        }

        self.finish(request_builder, &request.url).await
    }

    #[tracing::instrument(skip_all, fields(url = %url, file = %file.file_name))]
    async fn send_multipart(
        &self,
        url: &Url,
        file: &UploadFile,
        config: &TransportConfig,
    ) -> Result<RawResponse> {
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let client = self.client_for(config).await?;
        let request_builder = self
            .append_headers(config, client.post(url.clone()))
            .multipart(form);

        self.finish(request_builder, url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insecure_client_is_built_once() {
        let transport = ReqwestTransport::new();
        let insecure = TransportConfig::new().with_invalid_certs(true);
        assert!(!transport.insecure_client.initialized());

        transport.client_for(&TransportConfig::new()).await.unwrap();
        assert!(!transport.insecure_client.initialized());

        transport.client_for(&insecure).await.unwrap();
        transport.client_for(&insecure).await.unwrap();
        assert!(transport.insecure_client.initialized());
    }

    #[tokio::test]
    async fn test_injected_insecure_client_is_kept() {
        let transport = ReqwestTransport::with_clients(
            reqwest::Client::builder().no_proxy().build().unwrap(),
            reqwest::Client::builder()
                .no_proxy()
                .danger_accept_invalid_certs(true)
                .build()
                .unwrap(),
        );

        assert!(transport.insecure_client.initialized());
        let clone = transport.clone();
        assert!(Arc::ptr_eq(&transport.insecure_client, &clone.insecure_client));
        clone
            .client_for(&TransportConfig::new().with_invalid_certs(true))
            .await
            .unwrap();
    }
}
