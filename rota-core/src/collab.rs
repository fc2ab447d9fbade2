use async_trait::async_trait;
use uuid::Uuid;

use crate::model::NotificationKind;

pub type CollabError = Box<dyn std::error::Error + Send + Sync>;

/// Per-category delivery switches for one user.
#[derive(Debug, Clone, Copy)]
pub struct ChannelPreferences {
    pub reservation: bool,
    pub payment: bool,
    pub cancellation: bool,
    pub reminder: bool,
}

impl ChannelPreferences {
    pub fn all_enabled() -> Self {
        Self {
            reservation: true,
            payment: true,
            cancellation: true,
            reminder: true,
        }
    }

    pub fn allows(&self, kind: NotificationKind) -> bool {
        match kind {
            NotificationKind::Reservation => self.reservation,
            NotificationKind::Payment => self.payment,
            NotificationKind::Cancellation => self.cancellation,
            NotificationKind::Reminder => self.reminder,
        }
    }
}

/// External ticket artifact renderer, used only for payment notifications.
#[async_trait]
pub trait TicketRenderer: Send + Sync {
    async fn render_ticket(&self, reservation_id: Uuid) -> Result<Vec<u8>, CollabError>;
}

/// Email/SMS transport collaborator.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send(
        &self,
        user_id: Uuid,
        subject: &str,
        body: &str,
        attachment: Option<&[u8]>,
    ) -> Result<(), CollabError>;
}

/// User notification preference lookup.
#[async_trait]
pub trait NotificationPreferences: Send + Sync {
    async fn preferences_for(&self, user_id: Uuid) -> Result<ChannelPreferences, CollabError>;
}
