use anyhow::Result;
use super::event::EventEnvelope;

// ============================================================================
// Aggregate Root Pattern - Event Sourcing Core
// ============================================================================
//
// Credentials and verification codes are both folded from their own
// streams; the projections and the store replay share this trait.
//
// A stream may have no history yet; `handle_new` decides commands for that
// case so callers never fabricate a placeholder aggregate.
//
// ============================================================================

/// Generic Aggregate trait - all event-sourced aggregates implement this
///
/// Type Parameters:
/// - `Event`: The domain event type for this aggregate
/// - `Command`: The command type for this aggregate
/// - `Error`: The error type for business rule violations
pub trait Aggregate: Sized + Send + Sync {
    type Event;
    type Command;
    type Error;

    /// Create new aggregate from first event
    fn apply_first_event(event: &Self::Event) -> Result<Self, Self::Error>;

    /// Apply subsequent events to update state
    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error>;

    /// Handle a command addressed to a stream without history
    fn handle_new(command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Handle command and emit events (business logic)
    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Get aggregate ID (the stream id)
    fn aggregate_id(&self) -> &str;

    /// Get current version (sequence number)
    fn version(&self) -> i64;

    /// Decide a command against the current state of a stream, if any
    fn decide(current: Option<&Self>, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match current {
            Some(aggregate) => aggregate.handle_command(command),
            None => Self::handle_new(command),
        }
    }

    /// Fold one event into the current state of a stream, if any
    fn evolve(current: Option<Self>, event: &Self::Event) -> Result<Self, Self::Error> {
        match current {
            Some(mut aggregate) => {
                aggregate.apply_event(event)?;
                Ok(aggregate)
            }
            None => Self::apply_first_event(event),
        }
    }

    /// Load aggregate from event history (reconstruct from events)
    fn load_from_events(events: Vec<EventEnvelope<Self::Event>>) -> Result<Self>
    where
        Self::Error: std::fmt::Display,
    {
        if events.is_empty() {
            anyhow::bail!("No events to load");
        }

        let mut aggregate = Self::apply_first_event(&events[0].event_data)
            .map_err(|e| anyhow::anyhow!("Failed to apply first event: {}", e))?;

        for envelope in events.iter().skip(1) {
            aggregate.apply_event(&envelope.event_data)
                .map_err(|e| anyhow::anyhow!("Failed to apply event: {}", e))?;
        }

        Ok(aggregate)
    }
}
