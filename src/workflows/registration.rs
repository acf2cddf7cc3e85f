use serde_json::Value;

use crate::domain::credential::{CredentialAggregate, CredentialCommand, PasswordHash};
use crate::domain::notification::{MessageParams, NotificationEvent};
use crate::domain::session::SessionEvent;
use crate::domain::user::{LoginMethod, UserEvent, UserId};
use crate::domain::verification::{ActionKind, CodeCommand, CodePayload};
use crate::errors::{ErrorKind, WorkflowError, WorkflowResult};
use crate::event_sourcing::Aggregate;
use crate::routing::Emission;
use super::{parse_phone, reject, ClientContext, PhonePasswordService};

// ============================================================================
// Registration
// ============================================================================
//
// NoPendingCode -> CodeIssued -> Confirmed | Expired | SupersededByCredential
//
// Unlike the other code flows, registration allows at most one live code per
// phone. Concurrent starts are only caught by the recheck in finishRegister.
//
// ============================================================================

impl PhonePasswordService {
    /// StartRegister: issues a register code carrying a freshly minted user
    /// id and the pending user data, and texts it to the phone
    pub async fn start_register(
        &self,
        phone: &str,
        password_hash: impl Into<PasswordHash>,
        user_data: Value,
    ) -> WorkflowResult<()> {
        let password_hash = password_hash.into();
        self.observe("startRegister", async {
            let phone = parse_phone(phone, "phone")?;
            let user_data = match user_data {
                Value::Null => Value::Object(Default::default()),
                Value::Object(map) => Value::Object(map),
                _ => return Err(WorkflowError::field("userData", ErrorKind::Invalid)),
            };

            let now = self.now();
            let (credential, pending) = tokio::try_join!(
                self.reads.credential(&phone),
                self.reads.live_codes(&phone, ActionKind::Register, now),
            )?;
            if credential.is_some() {
                return reject(ErrorKind::AlreadyAdded);
            }
            if !pending.is_empty() {
                return reject(ErrorKind::RegistrationNotConfirmed);
            }

            let user = UserId::generate();
            let payload = CodePayload::Register { user, password_hash, user_data };
            let issued = self.draw_code(&phone, payload, self.config.register_code_ttl).await?;

            let text = self.templates.render(
                ActionKind::Register,
                &MessageParams { code: &issued.code, phone: Some(&phone), ..Default::default() },
            );
            let emission = Emission::new()
                .code(&issued.key, issued.event)
                .sms(NotificationEvent::sent(&phone, text));
            self.commit(emission).await?;

            self.metrics.record_code_issued(ActionKind::Register.as_str());
            tracing::debug!(%phone, %user, "Registration pending confirmation");
            Ok(())
        })
        .await
    }

    /// ResendRegisterCode: extends the live code and texts it again. The
    /// code and the pending user id stay the same.
    pub async fn resend_register_code(&self, phone: &str) -> WorkflowResult<()> {
        self.observe("resendRegisterCode", async {
            let phone = parse_phone(phone, "phone")?;
            let now = self.now();

            let pending = self.reads.live_codes(&phone, ActionKind::Register, now).await?;
            let Some(record) = pending.into_iter().next() else {
                return reject(ErrorKind::NotFound);
            };

            let events = record.handle_command(&CodeCommand::Prolong {
                expire: now + self.config.register_code_prolong,
                now,
            })?;

            let text = self.templates.render(
                ActionKind::Register,
                &MessageParams { code: &record.code, phone: Some(&phone), ..Default::default() },
            );
            let mut emission = Emission::new();
            for event in events {
                emission = emission.code(&record.key, event);
            }
            self.commit(emission.sms(NotificationEvent::sent(&phone, text))).await
        })
        .await
    }

    /// FinishRegister: redeems the register code and creates the credential
    /// and the user in one step. Logs the client in when it has a session.
    pub async fn finish_register(&self, phone: &str, code: &str, client: &ClientContext) -> WorkflowResult<UserId> {
        self.observe("finishRegister", async {
            let phone = parse_phone(phone, "phone")?;

            let redemption = self
                .redeem_code(&phone, code, ActionKind::Register)
                .await
                .map_err(|e| match e.kind() {
                    ErrorKind::NotFound => WorkflowError::field("code", ErrorKind::NotFound),
                    _ => e,
                })?;

            let CodePayload::Register { user, password_hash, user_data } = redemption.record.payload.clone() else {
                return Err(WorkflowError::field("code", ErrorKind::NotFound));
            };

            // Late recheck: a credential may have been created since the start
            let current = self.reads.credential(&phone).await?;
            let created = CredentialAggregate::decide(
                current.as_ref(),
                &CredentialCommand::Create { phone: phone.clone(), password_hash, user },
            )?;

            let mut user_data = user_data;
            if let Value::Object(map) = &mut user_data {
                map.insert("phone".to_string(), Value::String(phone.to_string()));
            }

            let mut emission = Emission::new()
                .code(redemption.key(), redemption.used.clone())
                .credentials(&phone, created)
                .user(UserEvent::Created { user, data: user_data })
                .user(UserEvent::LoginMethodAdded { user, method: LoginMethod::phone_password(&phone) });
            if let Some(session) = &client.session_id {
                emission = emission.session(SessionEvent::logged_in(user, session.clone(), Vec::new()));
            }
            self.commit(emission).await?;

            self.metrics.record_code_redeemed(ActionKind::Register.as_str());
            Ok(user)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use serde_json::json;

    use crate::clock::Clock;
    use crate::domain::credential::PasswordHash;
    use crate::domain::session::SessionEvent;
    use crate::domain::user::PHONE_PASSWORD_METHOD;
    use crate::domain::verification::ActionKind;
    use crate::errors::ErrorKind;
    use crate::runtime::PhonePasswordReads;
    use crate::workflows::test_support::Harness;
    use crate::workflows::ClientContext;

    #[tokio::test]
    async fn test_register_scenario() {
        let h = Harness::new().await;
        let phone = h.phone("+1555");

        h.service.start_register("+1555", "hashA", json!({})).await.unwrap();
        let live = h.live_codes(&phone, ActionKind::Register).await;
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].expire, h.clock.now() + Duration::seconds(600));
        let code = live[0].code.clone();

        let texts = h.runtime.sent_messages(&phone).await.unwrap();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains(&code));

        h.clock.advance(Duration::minutes(5));
        let user = h.service.finish_register("+1555", &code, &ClientContext::anonymous()).await.unwrap();

        let credential = h.runtime.credential(&phone).await.unwrap().unwrap();
        assert_eq!(credential.password_hash, PasswordHash::new("hashA"));
        assert!(credential.is_owned_by(&user));

        let record = h.runtime.user(&user).await.unwrap();
        assert_eq!(record.login_methods.len(), 1);
        assert!(record.has_login_method(PHONE_PASSWORD_METHOD, "+1555"));
        assert_eq!(record.data["phone"], "+1555");

        let err = h.service.finish_register("+1555", &code, &ClientContext::anonymous()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyUsed);
    }

    #[tokio::test]
    async fn test_start_register_rejections() {
        let h = Harness::new().await;
        h.service.start_register("+1555", "h", json!({"name": "Ada"})).await.unwrap();

        let err = h.service.start_register("+1555", "h", json!({})).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RegistrationNotConfirmed);

        h.service.create_user_with_credential("+1777", "h").await.unwrap();
        let err = h.service.start_register("+1777", "h", json!({})).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyAdded);

        let err = h.service.start_register("+1888", "h", json!([1, 2])).await.unwrap_err();
        assert_eq!(err.field_name(), Some("userData"));
    }

    #[tokio::test]
    async fn test_expired_register_code_allows_new_start() {
        let h = Harness::new().await;
        h.service.start_register("+1555", "h", json!({})).await.unwrap();
        let code = h.live_code("+1555", ActionKind::Register).await;

        h.clock.advance(Duration::minutes(10));
        let err = h.service.finish_register("+1555", &code, &ClientContext::anonymous()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Expired);

        h.service.start_register("+1555", "h", json!({})).await.unwrap();
    }

    #[tokio::test]
    async fn test_finish_register_with_unknown_code_is_field_scoped() {
        let h = Harness::new().await;
        let err = h.service.finish_register("+1555", "123456", &ClientContext::anonymous()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.field_name(), Some("code"));
    }

    #[tokio::test]
    async fn test_finish_register_loses_race_to_existing_credential() {
        let h = Harness::new().await;
        h.service.start_register("+1555", "h", json!({})).await.unwrap();
        let code = h.live_code("+1555", ActionKind::Register).await;

        h.service.create_user_with_credential("+1555", "other").await.unwrap();

        let err = h.service.finish_register("+1555", &code, &ClientContext::anonymous()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyAdded);
        // Nothing was emitted, so the code is still unused
        assert_eq!(h.live_codes(&h.phone("+1555"), ActionKind::Register).await.len(), 1);
    }

    #[tokio::test]
    async fn test_finish_register_logs_in_client_session() {
        let h = Harness::new().await;
        h.service.start_register("+1555", "h", json!({})).await.unwrap();
        let code = h.live_code("+1555", ActionKind::Register).await;

        let user = h.service.finish_register("+1555", &code, &ClientContext::with_session("sess-1")).await.unwrap();

        let events = h.runtime.session_events("sess-1").await.unwrap();
        assert_eq!(events, vec![SessionEvent::logged_in(user, "sess-1", vec![])]);
    }

    #[tokio::test]
    async fn test_resend_prolongs_same_code() {
        let h = Harness::new().await;
        let phone = h.phone("+1555");
        h.service.start_register("+1555", "h", json!({})).await.unwrap();
        let code = h.live_code("+1555", ActionKind::Register).await;

        h.clock.advance(Duration::minutes(9));
        h.service.resend_register_code("+1555").await.unwrap();

        let live = h.live_codes(&phone, ActionKind::Register).await;
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].code, code);
        assert_eq!(live[0].expire, h.clock.now() + Duration::hours(10));
        assert_eq!(h.runtime.sent_messages(&phone).await.unwrap().len(), 2);

        h.clock.advance(Duration::hours(2));
        h.service.finish_register("+1555", &code, &ClientContext::anonymous()).await.unwrap();
    }

    #[tokio::test]
    async fn test_resend_without_live_code_is_not_found() {
        let h = Harness::new().await;
        let err = h.service.resend_register_code("+1555").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
