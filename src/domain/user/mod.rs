// ============================================================================
// User Domain - foreign aggregate owned by the identity service
// ============================================================================
//
// Only the parts this service touches: user ids, the phonePassword login
// method entry, the events appended to the users stream and a read-only
// directory client.
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod directory;

pub use value_objects::*;
pub use events::*;
pub use directory::*;
