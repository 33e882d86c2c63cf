use reqwest::{Method, Url};
use serde::de::DeserializeOwned;

use crate::descriptor::{RequestDescriptor, ResultMapping};
use crate::envelope::{Attempt, ResultEnvelope};
use crate::error::{Error, Result};
use crate::net::transport::{parse_target, perform, OutboundRequest, Transport};
use crate::net::transport_config::TransportConfig;

/// runs batches of requests against a single base target, strictly one after
/// the other
#[derive(Debug)]
pub struct Dispatcher<X> {
    base_target: String,
    defaults: TransportConfig,
    transport: X,
}

impl<X: Transport> Dispatcher<X> {
    pub fn new(base_target: &str, defaults: TransportConfig, transport: X) -> Result<Self> {
        parse_target(base_target)?;
        Ok(Dispatcher {
            base_target: base_target.trim_end_matches('/').to_string(),
            defaults,
            transport,
        })
    }

    /// dispatches every descriptor in order, awaiting each call before
    /// starting the next one.
    ///
    /// a failing call never aborts the batch, its failure is recorded in its
    /// own envelope. the only error returned is for an empty batch
    #[tracing::instrument(skip_all, fields(base = %self.base_target, total = descriptors.len()))]
    pub async fn dispatch_all<T>(
        &self,
        descriptors: Vec<RequestDescriptor<T>>,
    ) -> Result<ResultMapping<T>>
    where
        T: DeserializeOwned,
    {
        if descriptors.is_empty() {
            return Err(Error::configuration("at least one request descriptor required"));
        }

        let mut results = ResultMapping::with_capacity(descriptors.len());

        for mut descriptor in descriptors {
            let callback = descriptor.take_callback();
            let envelope = self
                .request(
                    descriptor.method,
                    &descriptor.path,
                    descriptor.body,
                    descriptor.config.as_ref(),
                )
                .await;

            if results.contains_key(&descriptor.key) {
                tracing::warn!(
                    key = %descriptor.key,
                    "duplicated key, overwriting previous result"
                );
            }
            results.insert(descriptor.key.clone(), envelope);

            if let Some(callback) = callback {
                if let Some(envelope) = results.get(&descriptor.key) {
                    callback(envelope);
                }
            }
        }

        tracing::info!(
            failed = results.values().filter(|envelope| envelope.errored).count(),
            "batch completed"
        );

        Ok(results)
    }

    /// a single request against the base target, with `config` layered on top
    /// of the dispatcher defaults
    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
        config: Option<&TransportConfig>,
    ) -> ResultEnvelope<T>
    where
        T: DeserializeOwned,
    {
        let mut envelope = ResultEnvelope::new();
        let config = match config {
            Some(overrides) => self.defaults.merge(overrides),
            None => self.defaults.clone(),
        };

        let url = match self.resolve(path) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "could not build request url");
                envelope.record(Attempt {
                    started_at: chrono::Utc::now().timestamp(),
                    round_trip: Default::default(),
                    body: None,
                    error: Some(e),
                });
                return envelope;
            }
        };

        let request = OutboundRequest {
            method,
            url,
            body,
            config,
        };
        envelope.record(perform(&self.transport, &request).await);
        envelope
    }

    fn resolve(&self, path: &str) -> Result<Url> {
        let full = match path.chars().next() {
            None => self.base_target.clone(),
            Some('/' | '?' | '#') => format!("{}{}", self.base_target, path),
            Some(_) => format!("{}/{}", self.base_target, path),
        };
        parse_target(&full)
    }
}
