//! Poll-until-success fetching.
//!
//! [`Poller::poll`] performs one attempt right away and hands back a
//! [`PollHandle`] holding that first envelope. When the first attempt failed a
//! background task keeps retrying on a fixed interval, publishing every new
//! state of the envelope through a watch channel until an attempt succeeds,
//! the attempt budget runs out, or the handle is stopped or dropped.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::envelope::ResultEnvelope;
use crate::error::{Error, Result};
use crate::net::transport::{parse_target, perform, OutboundRequest, Transport};
use crate::net::transport_config::TransportConfig;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone)]
pub struct PollConfig {
    /// delay between failed attempts, no backoff is applied
    pub interval: Duration,
    /// total attempts, the first one included. `None` retries until success
    pub max_attempts: Option<NonZeroU32>,
    pub method: Method,
    pub body: Option<String>,
    pub transport: TransportConfig,
    /// cancelling this token stops the retries of every poll it was given to
    pub cancellation: Option<CancellationToken>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
            method: Method::GET,
            body: None,
            transport: TransportConfig::default(),
            cancellation: None,
        }
    }
}

impl PollConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// zero means unbounded
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = NonZeroU32::new(max_attempts);
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

#[derive(Debug)]
pub struct Poller<X> {
    transport: Arc<X>,
}

impl<X> Clone for Poller<X> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
        }
    }
}

impl<X: Transport + 'static> Poller<X> {
    pub fn new(transport: X) -> Self {
        Self::from_shared(Arc::new(transport))
    }

    pub fn from_shared(transport: Arc<X>) -> Self {
        Poller { transport }
    }

    #[tracing::instrument(
        skip(self, config),
        fields(interval_ms = config.interval.as_millis() as u64)
    )]
    pub async fn poll<T>(&self, target: &str, config: PollConfig) -> Result<PollHandle<T>>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        if config.interval.is_zero() {
            return Err(Error::configuration("poll interval must be greater than zero"));
        }

        let PollConfig {
            interval,
            max_attempts,
            method,
            body,
            transport,
            cancellation,
        } = config;

        let request = OutboundRequest {
            method,
            url: parse_target(target)?,
            body,
            config: transport,
        };

        let mut envelope = ResultEnvelope::new();
        envelope.record(perform(&*self.transport, &request).await);

        let (update_tx, update_rx) = watch::channel(envelope.clone());
        let token = cancellation
            .map(|parent| parent.child_token())
            .unwrap_or_default();

        let task = if envelope.errored && !budget_spent(&envelope, max_attempts) {
            tracing::info!("first attempt failed, retrying in the background");
            let retry = RetryLoop {
                transport: self.transport.clone(),
                request,
                envelope: envelope.clone(),
                interval,
                max_attempts,
                token: token.clone(),
                update_tx,
            };
            Some(tokio::spawn(retry.run()))
        } else {
            None
        };

        Ok(PollHandle {
            first: envelope,
            updates: update_rx,
            token,
            task,
        })
    }
}

fn budget_spent<T>(envelope: &ResultEnvelope<T>, max_attempts: Option<NonZeroU32>) -> bool {
    max_attempts.is_some_and(|max| envelope.sequence >= u64::from(max.get()))
}

struct RetryLoop<X, T> {
    transport: Arc<X>,
    request: OutboundRequest,
    envelope: ResultEnvelope<T>,
    interval: Duration,
    max_attempts: Option<NonZeroU32>,
    token: CancellationToken,
    update_tx: watch::Sender<ResultEnvelope<T>>,
}

impl<X, T> RetryLoop<X, T>
where
    X: Transport + 'static,
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn run(mut self) {
        let start = tokio::time::Instant::now() + self.interval;
        let mut ticker = tokio::time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = self.token.cancelled() => {
                    self.log_stopped();
                    break;
                }
                _ = ticker.tick() => {
                    let attempt = perform(&*self.transport, &self.request).await;
                    self.envelope.record(attempt);
                    self.update_tx.send_replace(self.envelope.clone());

                    if !self.envelope.errored {
                        tracing::info!(
                            url = %self.request.url,
                            sequence = self.envelope.sequence,
                            "target recovered"
                        );
                        break;
                    }

                    // a stop requested while the attempt was in flight must
                    // win over a tick that became ready in the meantime
                    if self.token.is_cancelled() {
                        self.log_stopped();
                        break;
                    }

                    if budget_spent(&self.envelope, self.max_attempts) {
                        tracing::warn!(
                            url = %self.request.url,
                            sequence = self.envelope.sequence,
                            "giving up, attempt budget spent"
                        );
                        break;
                    }
                }
            }
        }
    }

    fn log_stopped(&self) {
        tracing::info!(
            url = %self.request.url,
            sequence = self.envelope.sequence,
            "polling stopped"
        );
    }
}

/// handle to a poll. dropping it stops any retries still running
#[derive(Debug)]
pub struct PollHandle<T> {
    first: ResultEnvelope<T>,
    updates: watch::Receiver<ResultEnvelope<T>>,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl<T: Clone> PollHandle<T> {
    /// the envelope of the first attempt, never changes
    pub fn first(&self) -> &ResultEnvelope<T> {
        &self.first
    }

    /// the most recent state of the envelope
    pub fn latest(&self) -> ResultEnvelope<T> {
        self.updates.borrow().clone()
    }

    /// waits for the next attempt to complete. returns `None` once no more
    /// attempts will be made
    pub async fn changed(&mut self) -> Option<ResultEnvelope<T>> {
        self.updates.changed().await.ok()?;
        Some(self.updates.borrow_and_update().clone())
    }

    /// an independent receiver of envelope updates
    pub fn subscribe(&self) -> watch::Receiver<ResultEnvelope<T>> {
        self.updates.clone()
    }

    /// stops retrying. an attempt already in flight is allowed to finish
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// waits until retries are over and returns the final envelope
    pub async fn settled(mut self) -> ResultEnvelope<T> {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "retry task panicked");
            }
        }
        self.latest()
    }
}

impl<T> Drop for PollHandle<T> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::mock_transport::MockTransport;
    use crate::net::transport::RawResponse;
    use serde_json::{json, Value};

    const TARGET: &str = "https://example.com/health";

    #[tokio::test]
    async fn test_rejects_zero_interval() {
        let poller = Poller::new(MockTransport::new());
        let config = PollConfig::default().with_interval(Duration::ZERO);

        let result = poller.poll::<Value>(TARGET, config).await;
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_rejects_bad_target_without_calling_transport() {
        let mock = MockTransport::new();
        let poller = Poller::new(mock.clone());

        let result = poller.poll::<Value>("::nope::", PollConfig::default()).await;
        assert!(matches!(result, Err(Error::Configuration(_))));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_arms_no_retry() {
        let mock = MockTransport::new();
        mock.add_json("GET /health", json!({"status": "up"}));
        let poller = Poller::new(mock.clone());

        let handle = poller.poll::<Value>(TARGET, PollConfig::default()).await.unwrap();

        assert!(handle.first().is_success());
        assert_eq!(handle.first().sequence, 1);
        assert!(!handle.is_running());

        tokio::time::sleep(DEFAULT_POLL_INTERVAL * 3).await;
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let mock = MockTransport::new();
        mock.add_failure("GET /health", "connection refused");
        mock.add_response("GET /health", RawResponse::new(503, "unavailable"));
        mock.add_json("GET /health", json!({"status": "up"}));
        let poller = Poller::new(mock.clone());

        let started = tokio::time::Instant::now();
        let mut handle = poller.poll::<Value>(TARGET, PollConfig::default()).await.unwrap();
        assert!(handle.first().errored);
        assert_eq!(handle.first().sequence, 1);

        let second = handle.changed().await.unwrap();
        assert!(second.errored);
        assert!(second.error_message.as_deref().unwrap().contains("503"));
        assert_eq!(second.sequence, 2);

        let third = handle.changed().await.unwrap();
        assert!(third.is_success());
        assert_eq!(third.sequence, 3);
        assert!(started.elapsed() >= DEFAULT_POLL_INTERVAL * 2);

        assert!(handle.changed().await.is_none());
        assert_eq!(mock.call_count(), 3);
        assert_eq!(handle.first().sequence, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_attempts_bounds_retries() {
        let mock = MockTransport::new();
        let poller = Poller::new(mock.clone());
        let config = PollConfig::default()
            .with_interval(Duration::from_millis(100))
            .with_max_attempts(3);

        let handle = poller.poll::<Value>(TARGET, config).await.unwrap();
        let last = handle.settled().await;

        assert!(last.errored);
        assert_eq!(last.sequence, 3);
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_retries() {
        let mock = MockTransport::new();
        let poller = Poller::new(mock.clone());

        let mut handle = poller.poll::<Value>(TARGET, PollConfig::default()).await.unwrap();
        assert!(handle.changed().await.unwrap().errored);
        handle.stop();

        assert!(handle.changed().await.is_none());
        assert!(!handle.latest().is_success());
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_attempts_never_overlap_and_stop_wins_over_missed_tick() {
        let interval = Duration::from_secs(1);
        let mock = MockTransport::new().with_latency(interval * 3);
        let poller = Poller::new(mock.clone());
        let config = PollConfig::default().with_interval(interval);

        // first attempt runs 0s..3s, the second starts at 4s and ends at 7s
        let handle = poller.poll::<Value>(TARGET, config).await.unwrap();
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.in_flight_count(), 0);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(mock.in_flight_count(), 0);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(mock.in_flight_count(), 1);
        assert_eq!(mock.call_count(), 2);

        // ticks at 5s and 6s are missed while the attempt is in flight
        handle.stop();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(mock.in_flight_count() <= 1);

        let last = handle.settled().await;
        assert_eq!(last.sequence, 2);
        assert_eq!(mock.call_count(), 2);
        assert_eq!(mock.in_flight_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_token_stops_every_poll() {
        let mock = MockTransport::new();
        let poller = Poller::new(mock.clone());
        let token = CancellationToken::new();
        let config = PollConfig::default().with_cancellation(token.clone());

        let first = poller.poll::<Value>("https://example.com/a", config.clone()).await.unwrap();
        let second = poller.poll::<Value>("https://example.com/b", config).await.unwrap();
        token.cancel();

        assert_eq!(first.settled().await.sequence, 1);
        assert_eq!(second.settled().await.sequence, 1);
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_retries() {
        let mock = MockTransport::new();
        let poller = Poller::new(mock.clone());

        let handle = poller.poll::<Value>(TARGET, PollConfig::default()).await.unwrap();
        let mut updates = handle.subscribe();
        drop(handle);

        assert!(updates.changed().await.is_err());
        assert_eq!(mock.call_count(), 1);
    }
}
