use std::time::Duration;

use indexmap::IndexMap;

/// headers and connection knobs applied to an outgoing request.
///
/// header names are stored lowercased, so `Content-Type` and `content-type`
/// refer to the same entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportConfig {
    headers: IndexMap<String, String>,
    pub timeout: Option<Duration>,
    pub accept_invalid_certs: Option<bool>,
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert_header(name, value);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = Some(accept);
        self
    }

    /// inserts or replaces a header, returning the value it replaced
    pub fn insert_header(
        &mut self,
        name: impl AsRef<str>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn insecure(&self) -> bool {
        self.accept_invalid_certs.unwrap_or(false)
    }

    /// layers `overrides` on top of `self`. headers are merged key by key with
    /// the override winning, scalar settings are replaced only when set
    pub fn merge(&self, overrides: &TransportConfig) -> TransportConfig {
        let mut merged = self.clone();
        for (name, value) in overrides.headers() {
            merged.insert_header(name, value);
        }
        if overrides.timeout.is_some() {
            merged.timeout = overrides.timeout;
        }
        if overrides.accept_invalid_certs.is_some() {
            merged.accept_invalid_certs = overrides.accept_invalid_certs;
        }
        merged
    }
}

impl<K, V> FromIterator<(K, V)> for TransportConfig
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(TransportConfig::default(), |config, (name, value)| {
                config.with_header(name, value)
            })
    }
}
