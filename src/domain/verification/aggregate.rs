use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::credential::PhoneNumber;
use crate::event_sourcing::Aggregate;
use super::value_objects::{ActionKind, CodeKey, CodePayload};
use super::commands::CodeCommand;
use super::events::*;
use super::errors::CodeError;

// ============================================================================
// Verification Code Aggregate
// ============================================================================
//
// A code is redeemable only while unused and `now < expire`. Redemption and
// the workflow's effects commit in the same batch; the `Used` event is what
// the redemption guard hands back to the caller.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationCode {
    pub key: CodeKey,
    pub phone: PhoneNumber,
    pub code: String,
    pub payload: CodePayload,
    pub used: bool,
    pub expire: DateTime<Utc>,
    pub version: i64,
}

impl VerificationCode {
    pub fn action_kind(&self) -> ActionKind {
        self.payload.action_kind()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expire
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.used && !self.is_expired(now)
    }

    /// Redemption guard: returns the mark-used event for the caller's batch
    pub fn redeem(&self, expected: ActionKind, now: DateTime<Utc>) -> Result<CodeEvent, CodeError> {
        let mut events = self.handle_command(&CodeCommand::Redeem { expected, now })?;
        events.pop().ok_or(CodeError::NotInitialized)
    }
}

impl Aggregate for VerificationCode {
    type Event = CodeEvent;
    type Command = CodeCommand;
    type Error = CodeError;

    fn apply_first_event(event: &Self::Event) -> Result<Self, Self::Error> {
        match event {
            CodeEvent::Generated(e) => Ok(Self {
                key: CodeKey::new(&e.phone, &e.code),
                phone: e.phone.clone(),
                code: e.code.clone(),
                payload: e.payload.clone(),
                used: false,
                expire: e.expire,
                version: 1,
            }),
            _ => Err(CodeError::NotInitialized),
        }
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            CodeEvent::Generated(_) => {
                return Err(CodeError::KeyCollision(self.key.to_string()));
            }
            CodeEvent::Prolonged(e) => {
                self.expire = e.expire;
            }
            CodeEvent::Used(_) => {
                // Second redemption of the same key must not commit
                if self.used {
                    return Err(CodeError::AlreadyUsed);
                }
                self.used = true;
            }
        }

        self.version += 1;
        Ok(())
    }

    fn handle_new(_command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        Err(CodeError::NotFound)
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CodeCommand::Redeem { expected, now } => {
                if self.action_kind() != *expected {
                    return Err(CodeError::NotFound);
                }
                // Expiry wins over the used flag
                if self.is_expired(*now) {
                    return Err(CodeError::Expired);
                }
                if self.used {
                    return Err(CodeError::AlreadyUsed);
                }

                Ok(vec![CodeEvent::Used(CodeUsed { used_at: *now })])
            }

            CodeCommand::Prolong { expire, now } => {
                if self.is_expired(*now) {
                    return Err(CodeError::Expired);
                }
                if self.used {
                    return Err(CodeError::AlreadyUsed);
                }

                Ok(vec![CodeEvent::Prolonged(CodeProlonged { expire: *expire })])
            }
        }
    }

    fn aggregate_id(&self) -> &str {
        self.key.as_str()
    }

    fn version(&self) -> i64 {
        self.version
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::credential::PasswordHash;
    use crate::domain::user::UserId;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn register_code() -> VerificationCode {
        let event = CodeEvent::Generated(CodeGenerated {
            phone: PhoneNumber::parse("+1555").unwrap(),
            code: "123456".to_string(),
            expire: t0() + Duration::minutes(10),
            payload: CodePayload::Register {
                user: UserId::generate(),
                password_hash: PasswordHash::new("hashA"),
                user_data: serde_json::json!({}),
            },
        });
        VerificationCode::apply_first_event(&event).unwrap()
    }

    #[test]
    fn test_generated_code_is_live() {
        let code = register_code();
        assert_eq!(code.aggregate_id(), "+1555_123456");
        assert!(!code.used);
        assert!(code.is_live(t0()));
        assert!(!code.is_live(t0() + Duration::minutes(10)));
    }

    #[test]
    fn test_redeem_success_emits_used() {
        let code = register_code();
        let event = code.redeem(ActionKind::Register, t0() + Duration::minutes(1)).unwrap();
        assert!(matches!(event, CodeEvent::Used(_)));
    }

    #[test]
    fn test_redeem_wrong_action_is_not_found() {
        let code = register_code();
        let result = code.redeem(ActionKind::ResetPassword, t0());
        assert!(matches!(result, Err(CodeError::NotFound)));
    }

    #[test]
    fn test_second_redeem_fails_already_used() {
        let mut code = register_code();
        let used = code.redeem(ActionKind::Register, t0()).unwrap();
        code.apply_event(&used).unwrap();

        let result = code.redeem(ActionKind::Register, t0());
        assert!(matches!(result, Err(CodeError::AlreadyUsed)));
    }

    #[test]
    fn test_expired_regardless_of_used() {
        let mut code = register_code();
        let at_expiry = t0() + Duration::minutes(10);
        assert!(matches!(code.redeem(ActionKind::Register, at_expiry), Err(CodeError::Expired)));

        let used = code.redeem(ActionKind::Register, t0()).unwrap();
        code.apply_event(&used).unwrap();
        assert!(matches!(
            code.redeem(ActionKind::Register, at_expiry + Duration::seconds(1)),
            Err(CodeError::Expired)
        ));
    }

    #[test]
    fn test_applying_used_twice_is_refused() {
        let mut code = register_code();
        let used = CodeEvent::Used(CodeUsed { used_at: t0() });
        code.apply_event(&used).unwrap();
        assert!(matches!(code.apply_event(&used), Err(CodeError::AlreadyUsed)));
        assert_eq!(code.version, 2);
    }

    #[test]
    fn test_prolong_extends_live_code() {
        let mut code = register_code();
        let new_expire = t0() + Duration::hours(10);
        let events = code
            .handle_command(&CodeCommand::Prolong { expire: new_expire, now: t0() })
            .unwrap();
        code.apply_event(&events[0]).unwrap();

        assert_eq!(code.expire, new_expire);
        assert!(code.is_live(t0() + Duration::hours(9)));
    }

    #[test]
    fn test_prolong_refuses_dead_codes() {
        let mut code = register_code();
        let late = t0() + Duration::minutes(11);
        let result = code.handle_command(&CodeCommand::Prolong { expire: late + Duration::hours(1), now: late });
        assert!(matches!(result, Err(CodeError::Expired)));

        code.apply_event(&CodeEvent::Used(CodeUsed { used_at: t0() })).unwrap();
        let result = code.handle_command(&CodeCommand::Prolong { expire: t0() + Duration::hours(1), now: t0() });
        assert!(matches!(result, Err(CodeError::AlreadyUsed)));
    }

    #[test]
    fn test_regenerating_existing_key_is_a_collision() {
        let mut code = register_code();
        let again = CodeEvent::Generated(CodeGenerated {
            phone: code.phone.clone(),
            code: code.code.clone(),
            expire: t0() + Duration::hours(1),
            payload: CodePayload::ResetPassword { user: UserId::generate() },
        });
        assert!(matches!(code.apply_event(&again), Err(CodeError::KeyCollision(_))));
        assert_eq!(code.action_kind(), ActionKind::Register);
    }

    #[test]
    fn test_missing_record_is_not_found() {
        let result = VerificationCode::decide(None, &CodeCommand::Redeem { expected: ActionKind::Register, now: t0() });
        assert!(matches!(result, Err(CodeError::NotFound)));
    }
}
