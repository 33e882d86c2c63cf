use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// payload of an envelope. when the response could not be parsed into the
/// expected shape we keep the raw text around instead of discarding it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Body<T> {
    Parsed(T),
    Raw(String),
}

impl<T> Body<T> {
    pub fn parsed(&self) -> Option<&T> {
        match self {
            Body::Parsed(inner) => Some(inner),
            Body::Raw(_) => None,
        }
    }

    pub fn raw(&self) -> Option<&str> {
        match self {
            Body::Parsed(_) => None,
            Body::Raw(text) => Some(text),
        }
    }
}

/// uniform outcome of one logical call.
///
/// an envelope is created fresh per call and, for polled targets, updated in
/// place by every retry. `sequence` counts attempts and never goes back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEnvelope<T = serde_json::Value> {
    /// true when the most recent attempt produced a usable body
    pub loaded: bool,
    /// true when the most recent attempt failed for any reason
    pub errored: bool,
    pub error_message: Option<String>,
    /// amount of attempts made so far, zero before the first one completes
    pub sequence: u64,
    pub body: Option<Body<T>>,
    /// unix timestamp, in seconds, of when the most recent attempt started
    pub requested_at: i64,
    pub round_trip_ms: u64,
}

impl<T> Default for ResultEnvelope<T> {
    fn default() -> Self {
        Self {
            loaded: false,
            errored: false,
            error_message: None,
            sequence: 0,
            body: None,
            requested_at: 0,
            round_trip_ms: 0,
        }
    }
}

impl<T> ResultEnvelope<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.loaded && !self.errored
    }

    pub fn parsed(&self) -> Option<&T> {
        self.body.as_ref().and_then(Body::parsed)
    }

    pub fn raw(&self) -> Option<&str> {
        self.body.as_ref().and_then(Body::raw)
    }

    /// folds the outcome of a single attempt into this envelope.
    ///
    /// a failed attempt that produced no body at all (e.g. connection refused)
    /// keeps whatever body a previous attempt left behind
    pub fn record(&mut self, attempt: Attempt<T>) {
        self.requested_at = attempt.started_at;
        self.round_trip_ms = attempt.round_trip.as_millis() as u64;
        self.sequence += 1;

        match attempt.error {
            None => {
                self.loaded = true;
                self.errored = false;
                self.error_message = None;
            }
            Some(err) => {
                self.loaded = false;
                self.errored = true;
                self.error_message = Some(err.to_string());
            }
        }

        if attempt.body.is_some() {
            self.body = attempt.body;
        }
    }
}

/// what a single trip through a transport produced
#[derive(Debug)]
pub struct Attempt<T> {
    pub started_at: i64,
    pub round_trip: Duration,
    pub body: Option<Body<T>>,
    pub error: Option<Error>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attempt(
        body: Option<Body<serde_json::Value>>,
        error: Option<Error>,
    ) -> Attempt<serde_json::Value> {
        Attempt {
            started_at: 1_700_000_000,
            round_trip: Duration::from_millis(42),
            body,
            error,
        }
    }

    #[test]
    fn test_fresh_envelope_is_idle() {
        let envelope = ResultEnvelope::<serde_json::Value>::new();
        assert!(!envelope.loaded);
        assert!(!envelope.errored);
        assert_eq!(envelope.sequence, 0);
        assert!(envelope.body.is_none());
    }

    #[test]
    fn test_success_clears_previous_error() {
        let mut envelope = ResultEnvelope::new();
        envelope.record(attempt(None, Some(Error::Transport("connection refused".into()))));
        assert!(envelope.errored);
        assert!(!envelope.loaded);
        assert_eq!(envelope.sequence, 1);

        envelope.record(attempt(Some(Body::Parsed(json!({"ok": true}))), None));
        assert!(envelope.is_success());
        assert!(envelope.error_message.is_none());
        assert_eq!(envelope.sequence, 2);
        assert_eq!(envelope.parsed(), Some(&json!({"ok": true})));
        assert_eq!(envelope.round_trip_ms, 42);
        assert_eq!(envelope.requested_at, 1_700_000_000);
    }

    #[test]
    fn test_failure_without_body_keeps_last_body() {
        let mut envelope = ResultEnvelope::new();
        envelope.record(attempt(Some(Body::Raw("stale".into())), Some(Error::HttpStatus(500))));
        envelope.record(attempt(None, Some(Error::Transport("timed out".into()))));

        assert_eq!(envelope.raw(), Some("stale"));
        assert_eq!(envelope.error_message.as_deref(), Some("transport error: timed out"));
    }

    #[test]
    fn test_body_serializes_untagged() {
        let parsed: Body<serde_json::Value> = Body::Parsed(json!({"id": 1}));
        let raw: Body<serde_json::Value> = Body::Raw("not-json".into());

        assert_eq!(serde_json::to_string(&parsed).unwrap(), r#"{"id":1}"#);
        assert_eq!(serde_json::to_string(&raw).unwrap(), r#""not-json""#);
    }
}
