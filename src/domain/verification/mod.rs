// ============================================================================
// Verification Code Domain - single-use, time-limited phone codes
// ============================================================================
//
// - Value objects (ActionKind, CodeKey, CodePayload)
// - Events (codeGenerated, codeProlonged, codeUsed)
// - Commands (Redeem, Prolong)
// - Errors (CodeError enum)
// - Aggregate (VerificationCode, the redemption guard)
// - Issuer (code derivation)
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod issuer;

pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
