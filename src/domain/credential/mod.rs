// ============================================================================
// Credential Domain - phone + password bound to a user
// ============================================================================
//
// - Value objects (PhoneNumber, PasswordHash, CredentialStatus)
// - Events (CredentialCreated, CredentialPasswordUpdated, CredentialDeleted)
// - Commands (Create, UpdatePassword, Delete)
// - Errors (CredentialError enum)
// - Aggregate (CredentialAggregate)
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;

pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
