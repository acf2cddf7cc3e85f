use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::CredentialError;

// ============================================================================
// Credential Value Objects
// ============================================================================

/// E.164-like phone number; the identity key of a credential
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub const MIN_DIGITS: usize = 3;
    pub const MAX_DIGITS: usize = 15;

    /// Accepts an optional leading `+` followed by 3 to 15 ASCII digits.
    /// Surrounding whitespace is trimmed.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, CredentialError> {
        let raw = raw.as_ref();
        let trimmed = raw.trim();
        let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);

        let valid = (Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits.len())
            && digits.bytes().all(|b| b.is_ascii_digit());
        if !valid {
            return Err(CredentialError::InvalidPhone(raw.to_string()));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pre-computed password hash. Opaque to this service; compared verbatim.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(***)")
    }
}

impl From<&str> for PasswordHash {
    fn from(hash: &str) -> Self {
        Self::new(hash)
    }
}

impl From<String> for PasswordHash {
    fn from(hash: String) -> Self {
        Self(hash)
    }
}

/// Lifecycle of a credential stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialStatus {
    Active,
    Deleted,
}

/// Why a credential was deleted, kept for audit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeletionReason {
    Explicit,
    PhoneChanged,
    UserDeleted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_parse_accepts_e164_like() {
        assert_eq!(PhoneNumber::parse("+1555").unwrap().as_str(), "+1555");
        assert_eq!(PhoneNumber::parse(" 48123456789 ").unwrap().as_str(), "48123456789");
        assert_eq!(PhoneNumber::parse("+123456789012345").unwrap().as_str(), "+123456789012345");
    }

    #[test]
    fn test_phone_parse_rejects_garbage() {
        for raw in ["", "+", "+12", "12a45", "+1 555 0100", "+1234567890123456", "++1555"] {
            let result = PhoneNumber::parse(raw);
            assert!(
                matches!(result, Err(CredentialError::InvalidPhone(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_password_hash_debug_is_redacted() {
        let hash = PasswordHash::new("s3cr3t-hash");
        assert_eq!(format!("{hash:?}"), "PasswordHash(***)");
        assert_eq!(serde_json::to_string(&hash).unwrap(), "\"s3cr3t-hash\"");
    }
}
