// ============================================================================
// Event Sourcing Store - Generic Persistence Layer
// ============================================================================
//
// Append-only per-stream event log. Works with any DomainEvent type.
//
// ============================================================================

pub mod event_store;

pub use event_store::EventStore;
