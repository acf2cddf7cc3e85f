use crate::domain::credential::{CredentialCommand, PasswordHash};
use crate::domain::notification::{MessageParams, NotificationEvent};
use crate::domain::user::UserId;
use crate::domain::verification::{ActionKind, CodePayload};
use crate::errors::{ErrorKind, WorkflowResult};
use crate::event_sourcing::Aggregate;
use crate::routing::Emission;
use crate::triggers::Trigger;
use super::{parse_phone, reject, PhonePasswordService};

// ============================================================================
// Password Change / Reset
// ============================================================================
//
// Changes made by the owner go through the password-changed trigger so every
// credential of the user ends up with the same hash. A reset only touches the
// credential of the phone the code was sent to.
//
// ============================================================================

impl PhonePasswordService {
    pub async fn update_password_by_user(
        &self,
        user: UserId,
        phone: &str,
        old_password_hash: impl Into<PasswordHash>,
        new_password_hash: impl Into<PasswordHash>,
    ) -> WorkflowResult<()> {
        let (old, new) = (old_password_hash.into(), new_password_hash.into());
        self.observe("updatePasswordByUser", async {
            let phone = parse_phone(phone, "phone")?;

            let Some(credential) = self.reads.credential(&phone).await? else {
                return reject(ErrorKind::NotFound);
            };
            if !credential.is_owned_by(&user) {
                return reject(ErrorKind::NotAuthorized);
            }
            if !credential.password_matches(&old) {
                return reject(ErrorKind::WrongPassword);
            }

            self.raise(Trigger::PasswordChanged { user, password_hash: new }).await
        })
        .await
    }

    /// Validates the old hash against every credential of the user before
    /// raising a single trigger; one mismatch rejects them all
    pub async fn update_all_passwords_by_user(
        &self,
        user: UserId,
        old_password_hash: impl Into<PasswordHash>,
        new_password_hash: impl Into<PasswordHash>,
    ) -> WorkflowResult<()> {
        let (old, new) = (old_password_hash.into(), new_password_hash.into());
        self.observe("updateAllPasswordsByUser", async {
            let credentials = self.reads.credentials_by_user(&user).await?;
            if credentials.is_empty() {
                return reject(ErrorKind::NotFound);
            }

            for credential in &credentials {
                if !credential.is_owned_by(&user) {
                    return reject(ErrorKind::NotAuthorized);
                }
                if !credential.password_matches(&old) {
                    return reject(ErrorKind::WrongPassword);
                }
            }

            self.raise(Trigger::PasswordChanged { user, password_hash: new }).await
        })
        .await
    }

    /// StartPasswordReset: texts a reset code to a phone with a credential
    pub async fn start_password_reset(&self, phone: &str) -> WorkflowResult<()> {
        self.observe("startPasswordReset", async {
            let phone = parse_phone(phone, "phone")?;

            let Some(credential) = self.reads.credential(&phone).await? else {
                return reject(ErrorKind::NotFound);
            };

            let payload = CodePayload::ResetPassword { user: credential.user };
            let issued = self.draw_code(&phone, payload, self.config.reset_code_ttl).await?;

            let text = self.templates.render(
                ActionKind::ResetPassword,
                &MessageParams { code: &issued.code, phone: Some(&phone), ..Default::default() },
            );
            let emission = Emission::new()
                .code(&issued.key, issued.event)
                .sms(NotificationEvent::sent(&phone, text));
            self.commit(emission).await?;

            self.metrics.record_code_issued(ActionKind::ResetPassword.as_str());
            Ok(())
        })
        .await
    }

    /// FinishPasswordReset: marks the code used and sets the new hash in the
    /// same batch
    pub async fn finish_password_reset(
        &self,
        phone: &str,
        code: &str,
        new_password_hash: impl Into<PasswordHash>,
    ) -> WorkflowResult<()> {
        let new = new_password_hash.into();
        self.observe("finishPasswordReset", async {
            let phone = parse_phone(phone, "phone")?;
            let redemption = self.redeem_code(&phone, code, ActionKind::ResetPassword).await?;

            let Some(credential) = self.reads.credential(&redemption.record.phone).await? else {
                return reject(ErrorKind::NotFound);
            };
            let updated = credential.handle_command(&CredentialCommand::UpdatePassword { password_hash: new })?;

            let emission = Emission::new()
                .code(redemption.key(), redemption.used.clone())
                .credentials(&credential.phone, updated);
            self.commit(emission).await?;

            self.metrics.record_code_redeemed(ActionKind::ResetPassword.as_str());
            Ok(())
        })
        .await
    }
}
