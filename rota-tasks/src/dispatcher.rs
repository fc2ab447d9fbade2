use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use rota_core::collab::{MessageTransport, NotificationPreferences, TicketRenderer};
use rota_core::model::{Notification, NotificationKind, NotificationStatus};
use rota_core::store::NotificationStore;

use crate::runner::PeriodicTask;

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub batch_size: i64,
    pub max_retries: i32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: 20,
            max_retries: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    pub claimed: u64,
    pub sent: u64,
    /// Category disabled by the user; marked Sent without a transport call.
    pub suppressed: u64,
    /// Attempt failed, retry budget remaining.
    pub retried: u64,
    /// Attempt failed and the retry budget is spent.
    pub exhausted: u64,
}

enum Delivery {
    Sent,
    Suppressed,
}

/// Background worker draining the durable notification queue.
///
/// At-least-once: a crash after send but before `mark_sent` produces a
/// duplicate delivery on the next cycle, never a lost one. Per-item failures
/// only bump the retry counter; the backoff is the poll interval itself.
pub struct NotificationDispatcher {
    queue: Arc<dyn NotificationStore>,
    preferences: Arc<dyn NotificationPreferences>,
    renderer: Arc<dyn TicketRenderer>,
    transport: Arc<dyn MessageTransport>,
    config: DispatcherConfig,
}

impl NotificationDispatcher {
    pub fn new(
        queue: Arc<dyn NotificationStore>,
        preferences: Arc<dyn NotificationPreferences>,
        renderer: Arc<dyn TicketRenderer>,
        transport: Arc<dyn MessageTransport>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            queue,
            preferences,
            renderer,
            transport,
            config,
        }
    }

    pub async fn run_cycle(&self) -> DispatchReport {
        let mut report = DispatchReport::default();

        let batch = match self
            .queue
            .claim_pending(self.config.batch_size, self.config.max_retries)
            .await
        {
            Ok(batch) => batch,
            Err(e) => {
                warn!(error = %e, "dispatcher cycle aborted: claim failed");
                return report;
            }
        };
        report.claimed = batch.len() as u64;

        for notification in batch {
            match self.deliver(&notification).await {
                Ok(Delivery::Sent) => {
                    if let Err(e) = self.queue.mark_sent(notification.id, Utc::now()).await {
                        warn!(notification_id = %notification.id, error = %e, "mark_sent failed");
                    } else {
                        report.sent += 1;
                    }
                }
                Ok(Delivery::Suppressed) => {
                    debug!(
                        notification_id = %notification.id,
                        kind = ?notification.kind,
                        "delivery suppressed by user preference"
                    );
                    if let Err(e) = self.queue.mark_sent(notification.id, Utc::now()).await {
                        warn!(notification_id = %notification.id, error = %e, "mark_sent failed");
                    } else {
                        report.suppressed += 1;
                    }
                }
                Err(reason) => {
                    match self
                        .queue
                        .mark_attempt_failed(notification.id, &reason, self.config.max_retries)
                        .await
                    {
                        Ok(NotificationStatus::Failed) => {
                            warn!(
                                notification_id = %notification.id,
                                reason = %reason,
                                "notification failed permanently"
                            );
                            report.exhausted += 1;
                        }
                        Ok(_) => {
                            debug!(
                                notification_id = %notification.id,
                                reason = %reason,
                                "delivery failed, will retry"
                            );
                            report.retried += 1;
                        }
                        Err(e) => {
                            warn!(notification_id = %notification.id, error = %e, "retry bookkeeping failed");
                        }
                    }
                }
            }
        }

        if report.claimed > 0 {
            info!(
                claimed = report.claimed,
                sent = report.sent,
                suppressed = report.suppressed,
                retried = report.retried,
                exhausted = report.exhausted,
                "dispatch cycle finished"
            );
        }
        report
    }

    async fn deliver(&self, notification: &Notification) -> Result<Delivery, String> {
        let prefs = self
            .preferences
            .preferences_for(notification.user_id)
            .await
            .map_err(|e| format!("preference lookup failed: {}", e))?;

        if !prefs.allows(notification.kind) {
            return Ok(Delivery::Suppressed);
        }

        // Payment messages carry the rendered ticket; a render failure is a
        // delivery failure and retries like any other.
        let attachment = if notification.kind == NotificationKind::Payment {
            let reservation_id = notification
                .reservation_id
                .ok_or_else(|| "payment notification without reservation id".to_string())?;
            Some(
                self.renderer
                    .render_ticket(reservation_id)
                    .await
                    .map_err(|e| format!("ticket render failed: {}", e))?,
            )
        } else {
            None
        };

        let (subject, body) = render_message(notification);
        self.transport
            .send(notification.user_id, &subject, &body, attachment.as_deref())
            .await
            .map_err(|e| format!("transport failed: {}", e))?;

        Ok(Delivery::Sent)
    }
}

fn render_message(notification: &Notification) -> (String, String) {
    let route = match (
        notification.payload.get("origin").and_then(|v| v.as_str()),
        notification
            .payload
            .get("destination")
            .and_then(|v| v.as_str()),
    ) {
        (Some(origin), Some(destination)) => format!("{} → {}", origin, destination),
        _ => "your trip".to_string(),
    };
    let seat = notification
        .payload
        .get("seat_number")
        .and_then(|v| v.as_i64())
        .map(|n| format!("seat {}", n))
        .unwrap_or_else(|| "your seat".to_string());

    match notification.kind {
        NotificationKind::Reservation => (
            "Reservation confirmed".to_string(),
            format!("Your reservation for {} ({}) is confirmed. Complete payment to keep it.", route, seat),
        ),
        NotificationKind::Payment => (
            "Payment received".to_string(),
            format!("Payment received for {} ({}). Your ticket is attached.", route, seat),
        ),
        NotificationKind::Cancellation => (
            "Reservation cancelled".to_string(),
            format!("Your reservation for {} ({}) has been cancelled.", route, seat),
        ),
        NotificationKind::Reminder => (
            "Upcoming departure".to_string(),
            format!("Reminder: {} departs soon ({}).", route, seat),
        ),
    }
}

#[async_trait]
impl PeriodicTask for NotificationDispatcher {
    fn name(&self) -> &'static str {
        "notification-dispatcher"
    }

    async fn tick(&self) {
        self.run_cycle().await;
    }
}
