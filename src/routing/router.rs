use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::future::join_all;
use uuid::Uuid;

use crate::metrics::Metrics;
use super::emission::{Emission, EventBatch, Stream};

/// Owner of one or more streams; applies a batch atomically and in order
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn append(&self, batch: EventBatch, correlation_id: Uuid) -> Result<()>;
}

/// Delivers a workflow's batches to the sinks owning their streams.
///
/// The phonePassword batch is the commit point and is delivered first. The
/// remaining batches go out only after it succeeded, concurrently and with no
/// ordering among them. A failed foreign batch is reported but nothing that
/// was already appended is rolled back.
pub struct EventRouter {
    sinks: HashMap<Stream, Arc<dyn EventSink>>,
    metrics: Option<Arc<Metrics>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self {
            sinks: HashMap::new(),
            metrics: None,
        }
    }

    /// Router sending every stream to the same sink
    pub fn uniform(sink: Arc<dyn EventSink>) -> Self {
        Stream::ALL
            .into_iter()
            .fold(Self::new(), |router, stream| router.with_sink(stream, sink.clone()))
    }

    pub fn with_sink(mut self, stream: Stream, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.insert(stream, sink);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn sink(&self, stream: Stream) -> Result<&Arc<dyn EventSink>> {
        self.sinks
            .get(&stream)
            .with_context(|| format!("No sink registered for stream {}", stream))
    }

    async fn deliver(&self, batch: EventBatch, correlation_id: Uuid) -> Result<()> {
        let stream = batch.stream();
        let count = batch.len();
        let sink = self.sink(stream)?;

        sink.append(batch, correlation_id).await?;

        if let Some(metrics) = &self.metrics {
            metrics.record_events(stream.as_str(), count);
        }
        tracing::debug!(%correlation_id, stream = %stream, events = count, "Batch delivered");
        Ok(())
    }

    pub async fn route(&self, emission: Emission, correlation_id: Uuid) -> Result<()> {
        let mut batches = emission.into_batches();
        if batches.is_empty() {
            return Ok(());
        }

        // Fail before any append when a target has no owner
        for batch in &batches {
            self.sink(batch.stream())?;
        }

        if batches[0].stream() == Stream::PhonePassword {
            let own = batches.remove(0);
            self.deliver(own, correlation_id).await?;
        }

        let results = join_all(
            batches
                .into_iter()
                .map(|batch| {
                    let stream = batch.stream();
                    async move { (stream, self.deliver(batch, correlation_id).await) }
                }),
        )
        .await;

        let mut first_error = None;
        for (stream, result) in results {
            if let Err(e) = result {
                tracing::error!(
                    %correlation_id,
                    stream = %stream,
                    error = %e,
                    "Foreign stream batch failed after commit; left for reconciliation"
                );
                first_error.get_or_insert(e.context(format!("Delivery to stream {} failed", stream)));
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::credential::{CredentialDeleted, CredentialEvent, DeletionReason, PhoneNumber};
    use crate::domain::notification::NotificationEvent;
    use crate::domain::user::{LoginMethod, UserEvent, UserId};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        seen: Mutex<Vec<Stream>>,
        fail_on: Option<Stream>,
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn append(&self, batch: EventBatch, _correlation_id: Uuid) -> Result<()> {
            let stream = batch.stream();
            if self.fail_on == Some(stream) {
                anyhow::bail!("{} unavailable", stream);
            }
            self.seen.lock().await.push(stream);
            Ok(())
        }
    }

    fn swap_emission() -> Emission {
        let phone = PhoneNumber::parse("+1555").unwrap();
        let user = UserId::generate();
        Emission::new()
            .sms(NotificationEvent::sent(&phone, "bye"))
            .user(UserEvent::LoginMethodRemoved { user, method: LoginMethod::phone_password(&phone) })
            .credential(&phone, CredentialEvent::Deleted(CredentialDeleted { reason: DeletionReason::Explicit }))
    }

    #[tokio::test]
    async fn test_own_stream_delivered_first() {
        let sink = Arc::new(RecordingSink::default());
        let metrics = Arc::new(Metrics::new().unwrap());
        let router = EventRouter::uniform(sink.clone()).with_metrics(metrics.clone());

        router.route(swap_emission(), Uuid::new_v4()).await.unwrap();

        let seen = sink.seen.lock().await.clone();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], Stream::PhonePassword);
        assert!(seen.contains(&Stream::Users));
        assert!(seen.contains(&Stream::Sms));
        assert_eq!(metrics.events_emitted.with_label_values(&["users"]).get(), 1);
    }

    #[tokio::test]
    async fn test_failed_commit_blocks_foreign_streams() {
        let sink = Arc::new(RecordingSink { fail_on: Some(Stream::PhonePassword), ..Default::default() });
        let router = EventRouter::uniform(sink.clone());

        assert!(router.route(swap_emission(), Uuid::new_v4()).await.is_err());
        assert!(sink.seen.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_foreign_failure_reported_without_rollback() {
        let sink = Arc::new(RecordingSink { fail_on: Some(Stream::Users), ..Default::default() });
        let router = EventRouter::uniform(sink.clone());

        let err = router.route(swap_emission(), Uuid::new_v4()).await.unwrap_err();
        assert!(err.to_string().contains("users"));

        let seen = sink.seen.lock().await.clone();
        assert_eq!(seen, vec![Stream::PhonePassword, Stream::Sms]);
    }

    #[tokio::test]
    async fn test_missing_sink_fails_before_append() {
        let sink = Arc::new(RecordingSink::default());
        let router = EventRouter::new().with_sink(Stream::PhonePassword, sink.clone());

        assert!(router.route(swap_emission(), Uuid::new_v4()).await.is_err());
        assert!(sink.seen.lock().await.is_empty());
    }
}
