use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use rota_booking::BookingEngine;
use rota_core::error::BookingError;
use rota_core::model::CancelReason;
use rota_core::store::{AutoCancelAudit, ReservationStore, SettingsStore};

use crate::runner::PeriodicTask;

#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Upper bound on cancellations per sweep run.
    pub max_cancellations: i64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            max_cancellations: 100,
        }
    }
}

/// Aggregate result of one sweep, for observability and the admin endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub timeout_minutes: i64,
    pub examined: u64,
    pub cancelled: u64,
    /// Holds that were paid or cancelled between the query and the cancel
    /// attempt; losing that race is a no-op, not a failure.
    pub skipped: u64,
    pub failed: u64,
    pub status: String,
}

impl SweepReport {
    fn aborted(timeout_minutes: i64, status: String) -> Self {
        Self {
            timeout_minutes,
            examined: 0,
            cancelled: 0,
            skipped: 0,
            failed: 0,
            status,
        }
    }
}

/// Releases holds that were never paid within the timeout window.
///
/// Each hold is cancelled through the engine's atomic cancel, so the sweep
/// is safe to re-run and safe to race against manual cancels and payment
/// commits; a failure mid-batch never rolls back earlier cancellations.
pub struct AutoCancellationSweeper {
    engine: Arc<BookingEngine>,
    reservations: Arc<dyn ReservationStore>,
    settings: Arc<dyn SettingsStore>,
    config: SweepConfig,
}

impl AutoCancellationSweeper {
    pub fn new(
        engine: Arc<BookingEngine>,
        reservations: Arc<dyn ReservationStore>,
        settings: Arc<dyn SettingsStore>,
        config: SweepConfig,
    ) -> Self {
        Self {
            engine,
            reservations,
            settings,
            config,
        }
    }

    /// One sweep pass. The timeout comes from the persisted settings
    /// snapshot taken at the start of the run, unless overridden.
    pub async fn run_sweep(&self, timeout_override: Option<i64>) -> SweepReport {
        let timeout_minutes = match timeout_override {
            Some(minutes) => minutes,
            None => match self.settings.sweep_settings().await {
                Ok(snapshot) => snapshot.timeout_minutes,
                Err(e) => {
                    warn!(error = %e, "sweep aborted: settings unavailable");
                    return SweepReport::aborted(0, format!("settings unavailable: {}", e));
                }
            },
        };

        let cutoff = Utc::now() - Duration::minutes(timeout_minutes);
        let holds = match self
            .reservations
            .expired_holds(cutoff, self.config.max_cancellations)
            .await
        {
            Ok(holds) => holds,
            Err(e) => {
                warn!(error = %e, "sweep aborted: could not list expired holds");
                return SweepReport::aborted(
                    timeout_minutes,
                    format!("expired-hold query failed: {}", e),
                );
            }
        };

        let mut report = SweepReport {
            timeout_minutes,
            examined: holds.len() as u64,
            cancelled: 0,
            skipped: 0,
            failed: 0,
            status: String::new(),
        };

        for hold in holds {
            let audit = AutoCancelAudit { timeout_minutes };
            match self
                .engine
                .cancel_with_audit(hold.id, CancelReason::Timeout, Some(audit))
                .await
            {
                Ok(_) => report.cancelled += 1,
                // Someone else completed the transition first.
                Err(e) if e.is_conflict() => {
                    debug!(reservation_id = %hold.id, outcome = %e, "sweep skipped hold");
                    report.skipped += 1;
                }
                Err(BookingError::TripAlreadyDeparted(_))
                | Err(BookingError::ReservationCompleted(_))
                | Err(BookingError::ReservationNotFound(_)) => {
                    report.skipped += 1;
                }
                // Per-item failure: log and keep going, the hold stays
                // eligible for the next pass.
                Err(e) => {
                    warn!(reservation_id = %hold.id, error = %e, "sweep cancel failed");
                    report.failed += 1;
                }
            }
        }

        report.status = format!(
            "cancelled {}/{} expired holds (timeout {}m, skipped {}, failed {})",
            report.cancelled, report.examined, timeout_minutes, report.skipped, report.failed
        );
        info!(
            cancelled = report.cancelled,
            examined = report.examined,
            skipped = report.skipped,
            failed = report.failed,
            timeout_minutes,
            "sweep finished"
        );
        report
    }
}

#[async_trait]
impl PeriodicTask for AutoCancellationSweeper {
    fn name(&self) -> &'static str {
        "auto-cancellation-sweeper"
    }

    async fn tick(&self) {
        self.run_sweep(None).await;
    }
}
