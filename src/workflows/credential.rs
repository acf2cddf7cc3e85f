use crate::domain::credential::{
    CredentialAggregate, CredentialCommand, DeletionReason, PasswordHash, PhoneNumber,
};
use crate::domain::user::{LoginMethod, UserEvent, UserId};
use crate::errors::{ErrorKind, WorkflowResult};
use crate::event_sourcing::Aggregate;
use crate::routing::Emission;
use crate::triggers::Trigger;
use super::{parse_phone, reject, PhonePasswordService};

impl PhonePasswordService {
    /// Create: binds `phone` to an existing user
    pub async fn create_credential(
        &self,
        phone: &str,
        password_hash: impl Into<PasswordHash>,
        user: UserId,
    ) -> WorkflowResult<PhoneNumber> {
        let password_hash = password_hash.into();
        self.observe("createCredential", async {
            let phone = parse_phone(phone, "phone")?;

            let current = self.reads.credential(&phone).await?;
            let events = CredentialAggregate::decide(
                current.as_ref(),
                &CredentialCommand::Create { phone: phone.clone(), password_hash, user },
            )?;
            self.users.get_user(&user).await?;

            let emission = Emission::new()
                .credentials(&phone, events)
                .user(UserEvent::LoginMethodAdded { user, method: LoginMethod::phone_password(&phone) });
            self.commit(emission).await?;
            Ok(phone)
        })
        .await
    }

    /// Creates a brand new user owning a single phonePassword credential
    pub async fn create_user_with_credential(
        &self,
        phone: &str,
        password_hash: impl Into<PasswordHash>,
    ) -> WorkflowResult<UserId> {
        let password_hash = password_hash.into();
        self.observe("createUserWithCredential", async {
            let phone = parse_phone(phone, "phone")?;
            let user = UserId::generate();

            let current = self.reads.credential(&phone).await?;
            let events = CredentialAggregate::decide(
                current.as_ref(),
                &CredentialCommand::Create { phone: phone.clone(), password_hash, user },
            )?;

            let emission = Emission::new()
                .credentials(&phone, events)
                .user(UserEvent::Created { user, data: serde_json::json!({}) })
                .user(UserEvent::LoginMethodAdded { user, method: LoginMethod::phone_password(&phone) });
            self.commit(emission).await?;
            Ok(user)
        })
        .await
    }

    /// Update: every credential of the owner converges on the new hash
    /// through the password-changed trigger
    pub async fn update_credential(
        &self,
        phone: &str,
        password_hash: impl Into<PasswordHash>,
    ) -> WorkflowResult<PhoneNumber> {
        let password_hash = password_hash.into();
        self.observe("updateCredential", async {
            let phone = parse_phone(phone, "phone")?;
            let Some(credential) = self.reads.credential(&phone).await? else {
                return reject(ErrorKind::NotFound);
            };

            self.raise(Trigger::PasswordChanged { user: credential.user, password_hash }).await?;
            Ok(phone)
        })
        .await
    }

    /// Delete: releases the phone and drops the owner's login method. The
    /// user-stream removal may land after the credential deletion.
    pub async fn delete_credential(&self, phone: &str) -> WorkflowResult<PhoneNumber> {
        self.observe("deleteCredential", async {
            let phone = parse_phone(phone, "phone")?;

            let Some(credential) = self.reads.credential(&phone).await? else {
                return reject(ErrorKind::NotFound);
            };
            let events =
                credential.handle_command(&CredentialCommand::Delete { reason: DeletionReason::Explicit })?;

            let emission = Emission::new()
                .credentials(&phone, events)
                .user(UserEvent::LoginMethodRemoved {
                    user: credential.user,
                    method: LoginMethod::phone_password(&phone),
                });
            self.commit(emission).await?;
            Ok(phone)
        })
        .await
    }

    /// Reaction to a `UserDeleted` event of the identity service
    pub async fn on_user_deleted(&self, user: UserId) -> WorkflowResult<()> {
        self.observe("onUserDeleted", self.raise(Trigger::UserDeleted { user })).await
    }
}
