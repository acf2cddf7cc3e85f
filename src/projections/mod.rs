// ============================================================================
// Projections - read models materialized from routed batches
// ============================================================================

pub mod phone_password;
pub mod users;

pub use phone_password::PhonePasswordProjection;
pub use users::UserProjection;
