//! Reads batch files: a JSON array of request entries turned into
//! [`RequestDescriptor`]s.
//!
//! ```json
//! [
//!   { "key": "todo", "path": "/todos/1" },
//!   { "key": "login", "method": "POST", "path": "/login", "body": { "username": "admin" },
//!     "headers": { "register-api-key": "1AS9823HD378DH437" }, "timeout_ms": 2000 }
//! ]
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use indexmap::IndexMap;
use reqpool_core::{Method, RequestDescriptor};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BatchEntry {
    key: String,
    #[serde(default)]
    method: Option<String>,
    path: String,
    #[serde(default)]
    body: Option<Value>,
    #[serde(default)]
    headers: IndexMap<String, String>,
    #[serde(default)]
    timeout_ms: Option<u64>,
}

impl BatchEntry {
    fn into_descriptor(self) -> anyhow::Result<RequestDescriptor<Value>> {
        let method = match self.method {
            Some(method) => Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .with_context(|| format!("invalid method `{method}` for `{}`", self.key))?,
            None => Method::GET,
        };

        let mut descriptor = RequestDescriptor::new(self.key, method, self.path);

        match self.body {
            None | Some(Value::Null) => {}
            Some(Value::String(raw)) => descriptor = descriptor.with_body(raw),
            Some(payload) => descriptor = descriptor.with_json(&payload)?,
        }

        if !self.headers.is_empty() || self.timeout_ms.is_some() {
            let mut config = descriptor.config.take().unwrap_or_default();
            for (name, value) in self.headers {
                config.insert_header(name, value);
            }
            if let Some(timeout_ms) = self.timeout_ms {
                config = config.with_timeout(Duration::from_millis(timeout_ms));
            }
            descriptor = descriptor.with_config(config);
        }

        Ok(descriptor)
    }
}

pub fn parse_batch(content: &str) -> anyhow::Result<Vec<RequestDescriptor<Value>>> {
    let entries: Vec<BatchEntry> = serde_json::from_str(content).context("malformed batch file")?;
    entries
        .into_iter()
        .map(BatchEntry::into_descriptor)
        .collect()
}

pub fn read_batch_file<P>(file_path: P) -> anyhow::Result<Vec<RequestDescriptor<Value>>>
where
    P: AsRef<Path>,
{
    let file_path = file_path.as_ref();
    let content = std::fs::read_to_string(file_path)
        .with_context(|| format!("failed to read batch file {file_path:?}"))?;
    let descriptors = parse_batch(&content)?;
    tracing::debug!(count = descriptors.len(), "loaded batch file {file_path:?}");
    Ok(descriptors)
}
