use std::collections::HashMap;
use anyhow::{Result, bail};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::event_sourcing::core::{DomainEvent, EventEnvelope, Aggregate, serialize_event};

// ============================================================================
// Generic Event Store - Repository for Events
// ============================================================================
//
// Type Parameter:
// - `E`: The domain event type (must implement DomainEvent trait)
//
// Responsibilities:
// 1. Append events to a stream (append-only, all-or-nothing per call)
// 2. Load event history for a stream
// 3. Optional optimistic concurrency control
// 4. Export a stream as JSON lines for audit and replay
//
// ============================================================================

pub struct EventStore<E: DomainEvent> {
    stream_type_name: String,  // e.g., "credential", "code", "user"
    streams: RwLock<HashMap<String, Vec<EventEnvelope<E>>>>,
}

impl<E: DomainEvent> EventStore<E> {
    pub fn new(stream_type_name: &str) -> Self {
        Self {
            stream_type_name: stream_type_name.to_string(),
            streams: RwLock::new(HashMap::new()),
        }
    }

    pub fn stream_type_name(&self) -> &str {
        &self.stream_type_name
    }

    /// Append events to a stream.
    /// Returns the new version number after appending.
    pub async fn append_events(
        &self,
        stream_id: &str,
        expected_version: Option<i64>,
        events: Vec<E>,
        correlation_id: Uuid,
    ) -> Result<i64> {
        if events.is_empty() {
            bail!("Cannot append empty event list");
        }

        let mut streams = self.streams.write().await;
        let stream = streams.entry(stream_id.to_string()).or_default();
        let current_version = stream.last().map(|e| e.sequence_number).unwrap_or(0);

        if let Some(expected) = expected_version {
            if current_version != expected {
                bail!(
                    "Concurrency conflict on {} {}: expected version {}, but current is {}",
                    self.stream_type_name,
                    stream_id,
                    expected,
                    current_version
                );
            }
        }

        let event_count = events.len();
        let mut new_version = current_version;
        for event in events {
            new_version += 1;
            stream.push(EventEnvelope::new(stream_id, new_version, event, correlation_id));
        }

        tracing::debug!(
            stream_id = %stream_id,
            stream_type = %self.stream_type_name,
            new_version = new_version,
            event_count = event_count,
            "Appended events to event store"
        );

        Ok(new_version)
    }

    /// Load all events for a stream, oldest first
    pub async fn load_events(&self, stream_id: &str) -> Result<Vec<EventEnvelope<E>>> {
        let streams = self.streams.read().await;
        let events = streams.get(stream_id).cloned().unwrap_or_default();

        tracing::debug!("Loaded {} events for {} {}", events.len(), self.stream_type_name, stream_id);
        Ok(events)
    }

    /// Get current version of a stream (0 when it has no events)
    pub async fn get_current_version(&self, stream_id: &str) -> Result<i64> {
        let streams = self.streams.read().await;
        Ok(streams
            .get(stream_id)
            .and_then(|stream| stream.last())
            .map(|e| e.sequence_number)
            .unwrap_or(0))
    }

    /// Load aggregate from events
    pub async fn load_aggregate<A>(&self, stream_id: &str) -> Result<A>
    where
        A: Aggregate<Event = E>,
        <A as Aggregate>::Error: std::fmt::Display,
    {
        let events = self.load_events(stream_id).await?;

        if events.is_empty() {
            bail!("Aggregate not found: {} {}", self.stream_type_name, stream_id);
        }

        let expected = events.len() as i64;
        let aggregate = A::load_from_events(events)?;
        if aggregate.aggregate_id() != stream_id || aggregate.version() != expected {
            bail!(
                "Replay of {} {} diverged: rebuilt {} at version {}, stream has {} events",
                self.stream_type_name,
                stream_id,
                aggregate.aggregate_id(),
                aggregate.version(),
                expected
            );
        }
        Ok(aggregate)
    }

    /// Check if a stream has any events
    pub async fn aggregate_exists(&self, stream_id: &str) -> Result<bool> {
        let version = self.get_current_version(stream_id).await?;
        Ok(version > 0)
    }

    /// Serialize a stream's envelopes, one JSON document per event
    pub async fn export_json(&self, stream_id: &str) -> Result<Vec<String>> {
        self.load_events(stream_id)
            .await?
            .iter()
            .map(serialize_event)
            .collect()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
