// ============================================================================
// Triggers - typed intents handled outside the originating command
// ============================================================================
//
// A workflow that wants a secondary effect ("password changed for user X")
// places an intent on the queue and returns. The worker re-derives concrete
// per-credential events from current state and routes them.
//
// ============================================================================

pub mod worker;

pub use worker::TriggerWorker;

use std::fmt;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::domain::credential::PasswordHash;
use crate::domain::user::UserId;

#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// Every credential of the user converges on this hash
    PasswordChanged { user: UserId, password_hash: PasswordHash },
    /// The identity service deleted the user; drop its credentials
    UserDeleted { user: UserId },
}

impl Trigger {
    pub fn name(&self) -> &'static str {
        match self {
            Trigger::PasswordChanged { .. } => "passwordChanged",
            Trigger::UserDeleted { .. } => "userDeleted",
        }
    }

    pub fn user(&self) -> UserId {
        match self {
            Trigger::PasswordChanged { user, .. } | Trigger::UserDeleted { user } => *user,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.user())
    }
}

/// Sending half of the trigger channel
#[derive(Debug, Clone)]
pub struct TriggerQueue {
    sender: mpsc::Sender<Trigger>,
}

impl TriggerQueue {
    /// Bounded queue; senders wait when `capacity` triggers are pending
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Trigger>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    pub async fn trigger(&self, trigger: Trigger) -> Result<()> {
        tracing::debug!(trigger = %trigger, "Trigger raised");
        self.sender
            .send(trigger)
            .await
            .map_err(|e| anyhow::anyhow!("Trigger queue closed, dropped {}", e.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_delivers_in_order() {
        let (queue, mut receiver) = TriggerQueue::channel(4);
        let user = UserId::generate();

        queue.trigger(Trigger::UserDeleted { user }).await.unwrap();
        queue
            .trigger(Trigger::PasswordChanged { user, password_hash: PasswordHash::new("h") })
            .await
            .unwrap();

        assert_eq!(receiver.recv().await.unwrap().name(), "userDeleted");
        assert_eq!(receiver.recv().await.unwrap().name(), "passwordChanged");
    }

    #[tokio::test]
    async fn test_closed_queue_is_an_error() {
        let (queue, receiver) = TriggerQueue::channel(1);
        drop(receiver);
        assert!(queue.trigger(Trigger::UserDeleted { user: UserId::generate() }).await.is_err());
    }
}
