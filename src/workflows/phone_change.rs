use crate::domain::credential::{
    CredentialCommand, CredentialCreated, CredentialEvent, DeletionReason, PasswordHash,
};
use crate::domain::notification::{MessageParams, NotificationEvent};
use crate::domain::user::{LoginMethod, UserEvent};
use crate::domain::verification::{ActionKind, CodePayload};
use crate::errors::{ErrorKind, WorkflowError, WorkflowResult};
use crate::event_sourcing::Aggregate;
use crate::routing::Emission;
use super::{parse_phone, reject, ClientContext, PhonePasswordService};

// ============================================================================
// Phone Change
// ============================================================================
//
// Requested -> CodeIssued -> Confirmed | Expired | RejectedTaken
//
// The swap (new credential, old credential deleted) commits on the
// phonePassword stream together with the code. The matching login-method
// swap on the users stream is a separate batch and may lag behind.
//
// ============================================================================

impl PhonePasswordService {
    /// StartPhoneChange: the authenticated caller proves the password of
    /// its current credential and receives a code on the new phone
    pub async fn start_phone_change(
        &self,
        new_phone: &str,
        password_hash: impl Into<PasswordHash>,
        client: &ClientContext,
    ) -> WorkflowResult<()> {
        let password_hash = password_hash.into();
        self.observe("startPhoneChange", async {
            let Some(user) = client.user else {
                return reject(ErrorKind::NotAuthorized);
            };
            let new_phone = parse_phone(new_phone, "newPhone")?;

            let (owned, taken) = tokio::try_join!(
                self.reads.credentials_by_user(&user),
                self.reads.credential(&new_phone),
            )?;
            let Some(current) = owned.into_iter().next() else {
                return reject(ErrorKind::NotFound);
            };
            if taken.is_some() {
                return reject(ErrorKind::Taken);
            }
            if !current.is_owned_by(&user) {
                return reject(ErrorKind::NotAuthorized);
            }
            if !current.password_matches(&password_hash) {
                return reject(ErrorKind::WrongPassword);
            }

            let payload = CodePayload::PhoneChange {
                old_phone: current.phone.clone(),
                new_phone: new_phone.clone(),
                user,
            };
            let issued = self.draw_code(&new_phone, payload, self.config.phone_change_code_ttl).await?;

            let text = self.templates.render(
                ActionKind::PhoneChange,
                &MessageParams {
                    code: &issued.code,
                    phone: Some(&new_phone),
                    old_phone: Some(&current.phone),
                    new_phone: Some(&new_phone),
                },
            );
            let emission = Emission::new()
                .code(&issued.key, issued.event)
                .sms(NotificationEvent::sent(&new_phone, text));
            self.commit(emission).await?;

            self.metrics.record_code_issued(ActionKind::PhoneChange.as_str());
            Ok(())
        })
        .await
    }

    /// FinishPhoneChange: moves the credential from the old phone to the new
    /// one, keeping its hash and owner
    pub async fn finish_phone_change(&self, new_phone: &str, code: &str) -> WorkflowResult<()> {
        self.observe("finishPhoneChange", async {
            let new_phone = parse_phone(new_phone, "newPhone")?;
            let redemption = self.redeem_code(&new_phone, code, ActionKind::PhoneChange).await?;

            let CodePayload::PhoneChange { old_phone, new_phone, user } = redemption.record.payload.clone() else {
                return reject(ErrorKind::NotFound);
            };

            let (old, taken) = tokio::try_join!(
                self.reads.credential(&old_phone),
                self.reads.credential(&new_phone),
            )?;
            if taken.is_some() {
                return reject(ErrorKind::Taken);
            }
            let Some(old) = old else {
                return reject(ErrorKind::NotFound);
            };

            let deleted = old.handle_command(&CredentialCommand::Delete { reason: DeletionReason::PhoneChanged })?;
            let created = CredentialEvent::Created(CredentialCreated {
                phone: new_phone.clone(),
                password_hash: old.password_hash.clone(),
                user,
            });

            let emission = Emission::new()
                .code(redemption.key(), redemption.used.clone())
                .credential(&new_phone, created)
                .credentials(&old_phone, deleted)
                .user(UserEvent::LoginMethodAdded { user, method: LoginMethod::phone_password(&new_phone) })
                .user(UserEvent::LoginMethodRemoved { user, method: LoginMethod::phone_password(&old_phone) });

            // A credential created on the new phone since the check is the same race
            self.commit(emission).await.map_err(|e| match e.kind() {
                ErrorKind::AlreadyAdded => WorkflowError::Rejected(ErrorKind::Taken),
                _ => e,
            })?;

            self.metrics.record_code_redeemed(ActionKind::PhoneChange.as_str());
            tracing::info!(%user, from = %old_phone, to = %new_phone, "Phone changed");
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::domain::credential::PasswordHash;
    use crate::domain::user::{UserId, PHONE_PASSWORD_METHOD};
    use crate::domain::verification::ActionKind;
    use crate::errors::ErrorKind;
    use crate::runtime::PhonePasswordReads;
    use crate::workflows::test_support::Harness;
    use crate::workflows::ClientContext;

    async fn owner(h: &Harness, phone: &str, hash: &str) -> (UserId, ClientContext) {
        let user = h.service.create_user_with_credential(phone, hash).await.unwrap();
        (user, ClientContext::authenticated(user, "s1"))
    }

    #[tokio::test]
    async fn test_phone_change_scenario() {
        let h = Harness::new().await;
        let (user, client) = owner(&h, "+1555", "hash").await;

        h.service.start_phone_change("+1777", "hash", &client).await.unwrap();
        let code = h.live_code("+1777", ActionKind::PhoneChange).await;
        let texts = h.runtime.sent_messages(&h.phone("+1777")).await.unwrap();
        assert!(texts[0].contains("+1555") && texts[0].contains(&code));

        h.service.finish_phone_change("+1777", &code).await.unwrap();

        let moved = h.runtime.credential(&h.phone("+1777")).await.unwrap().unwrap();
        assert_eq!(moved.password_hash, PasswordHash::new("hash"));
        assert!(moved.is_owned_by(&user));
        assert!(h.runtime.credential(&h.phone("+1555")).await.unwrap().is_none());

        let record = h.runtime.user(&user).await.unwrap();
        assert!(record.has_login_method(PHONE_PASSWORD_METHOD, "+1777"));
        assert!(!record.has_login_method(PHONE_PASSWORD_METHOD, "+1555"));

        let err = h.service.finish_phone_change("+1777", &code).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyUsed);
    }

    #[tokio::test]
    async fn test_start_phone_change_rejections() {
        let h = Harness::new().await;

        let err = h.service.start_phone_change("+1777", "hash", &ClientContext::anonymous()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAuthorized);

        let stranger = ClientContext::authenticated(UserId::generate(), "s2");
        let err = h.service.start_phone_change("+1777", "hash", &stranger).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let (_, client) = owner(&h, "+1555", "hash").await;
        h.service.create_user_with_credential("+1666", "x").await.unwrap();

        let err = h.service.start_phone_change("+1666", "hash", &client).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Taken);

        let err = h.service.start_phone_change("+1777", "wrong", &client).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WrongPassword);

        let err = h.service.start_phone_change("abc", "hash", &client).await.unwrap_err();
        assert_eq!(err.field_name(), Some("newPhone"));
    }

    #[tokio::test]
    async fn test_finish_phone_change_when_new_phone_taken_meanwhile() {
        let h = Harness::new().await;
        let (_, client) = owner(&h, "+1555", "hash").await;

        h.service.start_phone_change("+1777", "hash", &client).await.unwrap();
        let code = h.live_code("+1777", ActionKind::PhoneChange).await;
        h.service.create_user_with_credential("+1777", "other").await.unwrap();

        let err = h.service.finish_phone_change("+1777", &code).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Taken);
        assert!(h.runtime.credential(&h.phone("+1555")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_finish_phone_change_after_old_credential_vanished() {
        let h = Harness::new().await;
        let (_, client) = owner(&h, "+1555", "hash").await;

        h.service.start_phone_change("+1777", "hash", &client).await.unwrap();
        let code = h.live_code("+1777", ActionKind::PhoneChange).await;
        h.service.delete_credential("+1555").await.unwrap();

        let err = h.service.finish_phone_change("+1777", &code).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_phone_change_code_expires_after_a_day() {
        let h = Harness::new().await;
        let (_, client) = owner(&h, "+1555", "hash").await;

        h.service.start_phone_change("+1777", "hash", &client).await.unwrap();
        let code = h.live_code("+1777", ActionKind::PhoneChange).await;

        h.clock.advance(Duration::hours(24));
        let err = h.service.finish_phone_change("+1777", &code).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Expired);
    }
}
