use std::sync::Arc;

use chrono::Duration;

use crate::domain::credential::PhoneNumber;
use crate::domain::verification::{issuer, ActionKind, CodeEvent, CodeKey, CodePayload, VerificationCode};
use crate::errors::{ErrorKind, WorkflowError, WorkflowResult};
use crate::routing::Emission;
use super::PhonePasswordService;

/// Produces a candidate code for a phone
pub type CodeSource = Arc<dyn Fn(&PhoneNumber) -> String + Send + Sync>;

/// Redraws allowed when a fresh code lands on an existing key
const MAX_CODE_DRAWS: usize = 5;

/// A drawn code and the event that persists it
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedCode {
    pub code: String,
    pub key: CodeKey,
    pub event: CodeEvent,
}

/// Result of a successful redemption check. `used` must travel in the same
/// batch as the effects it unlocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Redemption {
    pub record: VerificationCode,
    pub used: CodeEvent,
}

impl Redemption {
    pub fn key(&self) -> &CodeKey {
        &self.record.key
    }
}

impl PhonePasswordService {
    /// Draws a code whose key is not taken yet
    pub(crate) async fn draw_code(
        &self,
        phone: &PhoneNumber,
        payload: CodePayload,
        ttl: Duration,
    ) -> WorkflowResult<IssuedCode> {
        for attempt in 1..=MAX_CODE_DRAWS {
            let code = (self.codes)(phone);
            let key = CodeKey::new(phone, &code);

            if self.reads.code(&key).await?.is_some() {
                tracing::debug!(%key, attempt, "Code key already taken, drawing again");
                continue;
            }

            let generated = issuer::issue(phone, code.clone(), payload, ttl, self.now());
            return Ok(IssuedCode { code, key, event: CodeEvent::Generated(generated) });
        }

        Err(WorkflowError::Runtime(anyhow::anyhow!(
            "No free verification code for {} after {} draws",
            phone,
            MAX_CODE_DRAWS
        )))
    }

    /// IssueCode: persists a fresh, unused code for `phone`. Sending the
    /// notification is up to the caller.
    pub async fn issue_code(
        &self,
        phone: &PhoneNumber,
        payload: CodePayload,
        ttl: Duration,
    ) -> WorkflowResult<IssuedCode> {
        self.observe("issueCode", async {
            let action = payload.action_kind();
            let issued = self.draw_code(phone, payload, ttl).await?;

            self.commit(Emission::new().code(&issued.key, issued.event.clone())).await?;
            self.metrics.record_code_issued(action.as_str());
            Ok(issued)
        })
        .await
    }

    /// Redeem: checks the (phone, code) record against `expected` and the
    /// clock. Nothing is written; the caller commits `Redemption::used`.
    pub async fn redeem_code(
        &self,
        phone: &PhoneNumber,
        code: &str,
        expected: ActionKind,
    ) -> WorkflowResult<Redemption> {
        let key = CodeKey::new(phone, code);
        let record = match self.reads.code(&key).await? {
            Some(record) => record,
            None => return Err(WorkflowError::Rejected(ErrorKind::NotFound)),
        };

        let used = record.redeem(expected, self.now())?;
        Ok(Redemption { record, used })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::UserId;
    use crate::workflows::test_support::Harness;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_issue_then_redeem() {
        let h = Harness::new().await;
        let phone = h.phone("+1555");

        let issued = h
            .service
            .issue_code(&phone, CodePayload::ResetPassword { user: UserId::generate() }, Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(issued.code.len(), 6);

        let redemption = h.service.redeem_code(&phone, &issued.code, ActionKind::ResetPassword).await.unwrap();
        assert_eq!(redemption.key(), &issued.key);
        assert!(matches!(redemption.used, CodeEvent::Used(_)));
    }

    #[tokio::test]
    async fn test_redeem_failures() {
        let h = Harness::new().await;
        let phone = h.phone("+1555");
        let issued = h
            .service
            .issue_code(&phone, CodePayload::ResetPassword { user: UserId::generate() }, Duration::hours(1))
            .await
            .unwrap();

        let err = h.service.redeem_code(&phone, "000000x", ActionKind::ResetPassword).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = h.service.redeem_code(&phone, &issued.code, ActionKind::Register).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        h.clock.advance(Duration::hours(1));
        let err = h.service.redeem_code(&phone, &issued.code, ActionKind::ResetPassword).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Expired);
    }

    fn scripted(codes: &[&str]) -> CodeSource {
        let codes: Vec<String> = codes.iter().map(|c| c.to_string()).collect();
        let next = AtomicUsize::new(0);
        Arc::new(move |_: &PhoneNumber| {
            let i = next.fetch_add(1, Ordering::SeqCst).min(codes.len() - 1);
            codes[i].clone()
        })
    }

    #[tokio::test]
    async fn test_colliding_draw_is_redrawn() {
        let mut h = Harness::new().await;
        let phone = h.phone("+1555");
        let payload = CodePayload::ResetPassword { user: UserId::generate() };

        h.service = h.service.with_code_source(scripted(&["111111"]));
        h.service.issue_code(&phone, payload.clone(), Duration::hours(1)).await.unwrap();

        h.service = h.service.with_code_source(scripted(&["111111", "222222"]));
        let issued = h.service.issue_code(&phone, payload, Duration::hours(1)).await.unwrap();

        assert_eq!(issued.code, "222222");
        assert_eq!(issued.key.as_str(), "+1555_222222");
        assert_eq!(h.live_codes(&phone, ActionKind::ResetPassword).await.len(), 2);
    }

    #[tokio::test]
    async fn test_issue_fails_when_every_draw_collides() {
        let mut h = Harness::new().await;
        let phone = h.phone("+1555");
        let payload = CodePayload::ResetPassword { user: UserId::generate() };

        h.service = h.service.with_code_source(scripted(&["111111"]));
        h.service.issue_code(&phone, payload.clone(), Duration::hours(1)).await.unwrap();

        let err = h.service.issue_code(&phone, payload, Duration::hours(1)).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Runtime(_)));
        assert_eq!(err.kind(), ErrorKind::InternalServerError);

        let live = h.live_codes(&phone, ActionKind::ResetPassword).await;
        assert_eq!(live.len(), 1);
        assert_eq!(h.runtime.export_code(&live[0].key).await.unwrap().len(), 1);
        assert_eq!(h.metrics.codes_issued.with_label_values(&["resetPassword"]).get(), 1);
    }

    #[tokio::test]
    async fn test_multiple_live_codes_per_phone_are_allowed() {
        let h = Harness::new().await;
        let phone = h.phone("+1555");
        let user = UserId::generate();

        for _ in 0..3 {
            h.service
                .issue_code(&phone, CodePayload::ResetPassword { user }, Duration::hours(1))
                .await
                .unwrap();
        }

        let live = h.live_codes(&phone, ActionKind::ResetPassword).await;
        assert_eq!(live.len(), 3);
        assert_eq!(h.metrics.codes_issued.with_label_values(&["resetPassword"]).get(), 3);
    }
}
