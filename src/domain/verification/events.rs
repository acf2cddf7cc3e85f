use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::credential::PhoneNumber;
use crate::event_sourcing::DomainEvent;
use super::value_objects::CodePayload;

// ============================================================================
// Verification Code Events
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CodeEvent {
    Generated(CodeGenerated),
    Prolonged(CodeProlonged),
    Used(CodeUsed),
}

impl DomainEvent for CodeEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CodeEvent::Generated(_) => "codeGenerated",
            CodeEvent::Prolonged(_) => "codeProlonged",
            CodeEvent::Used(_) => "codeUsed",
        }
    }
}

/// Code Generated - a fresh, unused code record
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CodeGenerated {
    pub phone: PhoneNumber,
    pub code: String,
    pub expire: DateTime<Utc>,
    pub payload: CodePayload,
}

/// Code Prolonged - expiry moved forward on resend
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CodeProlonged {
    pub expire: DateTime<Utc>,
}

/// Code Used - redeemed; never reopened
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CodeUsed {
    pub used_at: DateTime<Utc>,
}
