use indexmap::IndexMap;
use reqwest::Method;
use serde::Serialize;

use crate::envelope::ResultEnvelope;
use crate::error::Result;
use crate::net::transport_config::TransportConfig;

/// results of a batch, keyed by descriptor key. iteration follows the order
/// in which descriptors were dispatched, but a repeated key keeps the slot of
/// its first occurrence with the value of its last
pub type ResultMapping<T = serde_json::Value> = IndexMap<String, ResultEnvelope<T>>;

pub type ResultCallback<T> = Box<dyn FnOnce(&ResultEnvelope<T>) + Send>;

/// one entry of a dispatch batch
pub struct RequestDescriptor<T = serde_json::Value> {
    pub key: String,
    pub method: Method,
    /// appended verbatim to the base target, may carry a query string
    pub path: String,
    pub body: Option<String>,
    /// layered on top of the dispatcher defaults for this request only
    pub config: Option<TransportConfig>,
    on_result: Option<ResultCallback<T>>,
}

impl<T> RequestDescriptor<T> {
    pub fn new(key: impl Into<String>, method: Method, path: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            method,
            path: path.into(),
            body: None,
            config: None,
            on_result: None,
        }
    }

    pub fn get(key: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(key, Method::GET, path)
    }

    pub fn post(key: impl Into<String>, path: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(key, Method::POST, path).with_body(body)
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// serializes `payload` as JSON and sets the matching content type
    pub fn with_json<P: Serialize>(mut self, payload: &P) -> Result<Self> {
        self.body = Some(serde_json::to_string(payload)?);
        let config = self.config.take().unwrap_or_default();
        self.config = Some(config.with_header("content-type", "application/json"));
        Ok(self)
    }

    pub fn with_config(mut self, config: TransportConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// `callback` runs right after this descriptor's result is known, before
    /// the next descriptor is dispatched
    pub fn on_result<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&ResultEnvelope<T>) + Send + 'static,
    {
        self.on_result = Some(Box::new(callback));
        self
    }

    pub(crate) fn take_callback(&mut self) -> Option<ResultCallback<T>> {
        self.on_result.take()
    }
}

impl<T> std::fmt::Debug for RequestDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("key", &self.key)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("body", &self.body)
            .field("config", &self.config)
            .field("on_result", &self.on_result.is_some())
            .finish()
    }
}
