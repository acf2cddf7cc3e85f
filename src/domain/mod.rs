// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Aggregates owned by this service (credential, verification code) have their
// own subdirectory with:
// - Value objects
// - Events
// - Commands
// - Errors
// - Aggregate implementation
//
// Foreign streams (users, session, sms) only carry the events this service
// addresses to them.
//
// This layer is completely separate from the event sourcing infrastructure.
//
// ============================================================================

pub mod credential;
pub mod verification;
pub mod user;
pub mod session;
pub mod notification;
