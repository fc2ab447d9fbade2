use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{
    AutoCancellationLog, CancelReason, Notification, NotificationStatus, Payment, Reservation,
    SweepSettings, Trip,
};
use crate::pricing::{PriceChange, PriceSchedule};

/// Result of the seat-claim conditional write.
#[derive(Debug)]
pub enum ClaimOutcome {
    /// Seat flipped free -> held and the reservation row was inserted.
    Created(Reservation),
    /// Another reservation already holds the seat.
    SeatTaken,
    /// No such (trip, seat) row exists.
    SeatMissing,
}

/// Result of the status-guarded cancel write.
#[derive(Debug)]
pub enum CancelOutcome {
    Cancelled(Reservation),
    AlreadyCancelled,
    Completed,
    /// Timeout cancels additionally require the hold to still be unpaid;
    /// this is the losing side of a sweep racing a payment commit.
    PaidMeanwhile,
    NotFound,
}

/// Result of the status-guarded payment write.
#[derive(Debug)]
pub enum PayOutcome {
    Paid(Reservation),
    AlreadyPaid,
    AlreadyCancelled,
    Completed,
    NotFound,
}

/// Extra audit context recorded when a cancel comes from the sweeper.
#[derive(Debug, Clone, Copy)]
pub struct AutoCancelAudit {
    pub timeout_minutes: i64,
}

/// Durable reservation ledger plus the seat inventory it guards.
///
/// Every method is one atomic unit of work: it either commits fully or
/// leaves the store untouched. Conflicting concurrent callers are serialized
/// by the implementation (row lock or compare-and-swap); exactly one wins
/// and the rest observe the corresponding non-`Created`/non-`Cancelled`
/// outcome. Implementations also append the reservation audit log entry for
/// each transition inside the same unit.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Claim the seat (conditional `is_reserved` false -> true) and insert
    /// the reservation, plus the payment record for immediate purchases.
    async fn create_holding_seat(
        &self,
        reservation: &Reservation,
        payment: Option<&Payment>,
    ) -> Result<ClaimOutcome, StoreError>;

    async fn reservation(&self, id: Uuid) -> Result<Option<Reservation>, StoreError>;

    /// Cancel if still cancellable, releasing the seat in the same unit.
    /// `audit` is present for sweeper-initiated cancels: it produces an
    /// auto-cancellation log row and tightens the guard to unpaid holds
    /// only (`PaidMeanwhile` when a payment commit won the race).
    async fn cancel_releasing_seat(
        &self,
        id: Uuid,
        reason: CancelReason,
        now: DateTime<Utc>,
        audit: Option<AutoCancelAudit>,
    ) -> Result<CancelOutcome, StoreError>;

    /// Mark paid if still pending, recording the payment in the same unit.
    /// Never touches the seat row.
    async fn mark_paid(&self, id: Uuid, payment: &Payment) -> Result<PayOutcome, StoreError>;

    /// Unpaid holds reserved at or before `cutoff`, oldest first, bounded.
    async fn expired_holds(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Reservation>, StoreError>;

    async fn cancellation_logs(
        &self,
        user_id: Option<Uuid>,
    ) -> Result<Vec<AutoCancellationLog>, StoreError>;
}

/// Read access to trips plus the single pricing write the adjuster performs.
#[async_trait]
pub trait TripStore: Send + Sync {
    async fn trip(&self, id: Uuid) -> Result<Option<Trip>, StoreError>;

    /// Active trips departing within `window` from `now`.
    async fn repricing_candidates(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Vec<Uuid>, StoreError>;

    /// Recompute the trip price from current occupancy and the schedule in
    /// one atomic unit, so the write never prices against a stale snapshot.
    /// Returns `None` when the schedule leaves the price unchanged.
    async fn apply_price_step(
        &self,
        trip_id: Uuid,
        schedule: &PriceSchedule,
    ) -> Result<Option<PriceChange>, StoreError>;
}

/// Durable at-least-once notification queue.
///
/// Writers only `enqueue`; the dispatcher owns everything else. `claim_pending`
/// must coordinate concurrent dispatcher workers so a row is handed to at
/// most one of them per cycle (duplicate *delivery* across crashes remains
/// acceptable).
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn enqueue(&self, notification: &Notification) -> Result<(), StoreError>;

    async fn claim_pending(
        &self,
        limit: i64,
        max_retries: i32,
    ) -> Result<Vec<Notification>, StoreError>;

    async fn mark_sent(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Record a failed attempt; flips to `Failed` once the retry budget is
    /// spent. Returns the resulting status.
    async fn mark_attempt_failed(
        &self,
        id: Uuid,
        error: &str,
        max_retries: i32,
    ) -> Result<NotificationStatus, StoreError>;
}

/// Key-value persisted settings, tunable at runtime.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn sweep_settings(&self) -> Result<SweepSettings, StoreError>;
    async fn update_sweep_settings(&self, settings: SweepSettings) -> Result<(), StoreError>;
}
