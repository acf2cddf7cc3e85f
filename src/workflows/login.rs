use crate::domain::credential::PasswordHash;
use crate::domain::session::SessionEvent;
use crate::domain::user::{UserDirectoryError, UserId};
use crate::domain::verification::ActionKind;
use crate::errors::{ErrorKind, WorkflowError, WorkflowResult};
use crate::routing::Emission;
use super::{parse_phone, reject, ClientContext, PhonePasswordService};

impl PhonePasswordService {
    /// Login: binds the client session to the credential's owner, with the
    /// owner's roles as of now and no expiry
    pub async fn login(
        &self,
        phone: &str,
        password_hash: impl Into<PasswordHash>,
        client: &ClientContext,
    ) -> WorkflowResult<UserId> {
        let password_hash = password_hash.into();
        self.observe("login", async {
            let phone = parse_phone(phone, "phone")?;

            let (credential, pending) = tokio::try_join!(
                self.reads.credential(&phone),
                self.reads.live_codes(&phone, ActionKind::Register, self.now()),
            )?;

            let Some(credential) = credential else {
                if !pending.is_empty() {
                    return reject(ErrorKind::RegistrationNotConfirmed);
                }
                return Err(WorkflowError::field("phone", ErrorKind::NotFound));
            };
            if !credential.password_matches(&password_hash) {
                return Err(WorkflowError::field("passwordHash", ErrorKind::WrongPassword));
            }

            let user = match self.users.get_user(&credential.user).await {
                Ok(user) => user,
                Err(UserDirectoryError::UserNotFound(id)) => {
                    tracing::error!(user = %id, %phone, "Credential owner missing from identity service");
                    return reject(ErrorKind::InternalServerError);
                }
                Err(e) => return Err(e.into()),
            };

            let Some(session) = &client.session_id else {
                return reject(ErrorKind::NotAuthorized);
            };

            self.commit(Emission::new().session(SessionEvent::logged_in(user.id, session.clone(), user.roles)))
                .await?;
            Ok(user.id)
        })
        .await
    }
}
