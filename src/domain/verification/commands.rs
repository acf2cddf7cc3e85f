use chrono::{DateTime, Utc};

use super::value_objects::ActionKind;

// ============================================================================
// Verification Code Commands
// ============================================================================

#[derive(Debug, Clone)]
pub enum CodeCommand {
    Redeem {
        expected: ActionKind,
        now: DateTime<Utc>,
    },
    Prolong {
        expire: DateTime<Utc>,
        now: DateTime<Utc>,
    },
}
