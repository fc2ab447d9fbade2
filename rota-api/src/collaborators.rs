//! Default wiring for the external collaborators. Real deployments plug in
//! an SMTP/SMS gateway and a PDF renderer; these stand-ins keep the binary
//! runnable end to end.

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use rota_core::collab::{
    ChannelPreferences, CollabError, MessageTransport, NotificationPreferences, TicketRenderer,
};

/// Logs outgoing messages instead of sending them.
pub struct LogTransport;

#[async_trait]
impl MessageTransport for LogTransport {
    async fn send(
        &self,
        user_id: Uuid,
        subject: &str,
        body: &str,
        attachment: Option<&[u8]>,
    ) -> Result<(), CollabError> {
        info!(
            user_id = %user_id,
            subject,
            body,
            attachment_bytes = attachment.map(|a| a.len()).unwrap_or(0),
            "notification delivered (log transport)"
        );
        Ok(())
    }
}

/// Produces a plain-text ticket artifact.
pub struct PlainTicketRenderer;

#[async_trait]
impl TicketRenderer for PlainTicketRenderer {
    async fn render_ticket(&self, reservation_id: Uuid) -> Result<Vec<u8>, CollabError> {
        Ok(format!("TICKET {}\n", reservation_id).into_bytes())
    }
}

/// Every category enabled for every user.
pub struct AllowAllPreferences;

#[async_trait]
impl NotificationPreferences for AllowAllPreferences {
    async fn preferences_for(&self, _user_id: Uuid) -> Result<ChannelPreferences, CollabError> {
        Ok(ChannelPreferences::all_enabled())
    }
}
