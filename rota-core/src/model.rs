use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// Trip status as owned by the scheduling subsystem
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    Active,
    Cancelled,
}

/// A scheduled departure. The engine only reads price/status/departure;
/// the pricing adjuster is the one component allowed to raise the price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub origin: String,
    pub destination: String,
    pub departure_at: DateTime<Utc>,
    pub status: TripStatus,
    /// Price as originally scheduled, in minor currency units.
    pub base_price_cents: i32,
    /// Current selling price, in minor currency units.
    pub price_cents: i32,
    pub seat_count: i32,
}

impl Trip {
    pub fn has_departed(&self, now: DateTime<Utc>) -> bool {
        now >= self.departure_at
    }

    /// Reserved seats / total seats, in [0, 1].
    pub fn occupancy(&self, reserved: i64) -> f64 {
        if self.seat_count <= 0 {
            return 0.0;
        }
        (reserved as f64 / self.seat_count as f64).clamp(0.0, 1.0)
    }
}

/// The bookable unit: one seat on one trip. `is_reserved` is the mutex the
/// booking engine protects; nothing else may flip it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripSeat {
    pub trip_id: Uuid,
    pub seat_number: i32,
    pub is_reserved: bool,
    pub reserved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Reserved,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancelReason {
    UserRequest,
    Timeout,
    TripCancelled,
}

/// Entry mode for a reservation: hold the seat and pay later, or pay in the
/// same unit of work.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationMode {
    Hold,
    ImmediatePurchase,
}

/// A seat claim on a trip. Never deleted; cancellation is a state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub seat_number: i32,
    pub user_id: Uuid,
    pub status: ReservationStatus,
    pub payment_status: PaymentStatus,
    pub price_cents: i32,
    pub reserved_at: DateTime<Utc>,
    pub cancel_reason: Option<CancelReason>,
    pub ticket_number: Option<String>,
}

impl Reservation {
    pub fn new(
        trip_id: Uuid,
        seat_number: i32,
        user_id: Uuid,
        price_cents: i32,
        mode: ReservationMode,
    ) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            trip_id,
            seat_number,
            user_id,
            status: ReservationStatus::Reserved,
            payment_status: match mode {
                ReservationMode::Hold => PaymentStatus::Pending,
                ReservationMode::ImmediatePurchase => PaymentStatus::Paid,
            },
            price_cents,
            reserved_at: Utc::now(),
            cancel_reason: None,
            ticket_number: Some(ticket_number_for(id)),
        }
    }

    /// A hold is a reserved seat that has not been paid for yet.
    pub fn is_hold(&self) -> bool {
        self.status == ReservationStatus::Reserved && self.payment_status == PaymentStatus::Pending
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            ReservationStatus::Cancelled | ReservationStatus::Completed
        )
    }
}

fn ticket_number_for(id: Uuid) -> String {
    format!("RT-{}", id.simple().to_string()[..12].to_uppercase())
}

/// Payment record written alongside the reservation transition that earns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub amount_cents: i32,
    pub paid_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(reservation_id: Uuid, amount_cents: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            reservation_id,
            amount_cents,
            paid_at: Utc::now(),
        }
    }
}

/// Append-only audit entry, one per reservation transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationLog {
    pub id: i64,
    pub reservation_id: Uuid,
    pub action: String,
    pub detail: Option<String>,
    pub logged_at: DateTime<Utc>,
}

/// Audit entry written when the sweeper releases an expired hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoCancellationLog {
    pub id: i64,
    pub reservation_id: Uuid,
    pub user_id: Uuid,
    pub reserved_at: DateTime<Utc>,
    pub timeout_minutes: i64,
    pub cancelled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Reservation,
    Payment,
    Cancellation,
    Reminder,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

/// Durable queue entry. Writers only enqueue; the dispatcher owns every
/// other mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub status: NotificationStatus,
    pub retry_count: i32,
    pub payload: serde_json::Value,
    pub reservation_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl Notification {
    pub fn for_reservation(
        kind: NotificationKind,
        reservation: &Reservation,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: reservation.user_id,
            kind,
            status: NotificationStatus::Pending,
            retry_count: 0,
            payload,
            reservation_id: Some(reservation.id),
            created_at: Utc::now(),
            sent_at: None,
            last_error: None,
        }
    }
}

/// Runtime-tunable sweep parameter, persisted as a key-value setting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SweepSettings {
    pub timeout_minutes: i64,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self { timeout_minutes: 15 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn hold_detection_follows_status_pair() {
        let res = Reservation::new(Uuid::new_v4(), 5, Uuid::new_v4(), 100, ReservationMode::Hold);
        assert!(res.is_hold());

        let bought = Reservation::new(
            Uuid::new_v4(),
            5,
            Uuid::new_v4(),
            100,
            ReservationMode::ImmediatePurchase,
        );
        assert!(!bought.is_hold());
        assert_eq!(bought.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn occupancy_is_clamped() {
        let trip = Trip {
            id: Uuid::new_v4(),
            origin: "IST".into(),
            destination: "ANK".into(),
            departure_at: Utc::now() + Duration::hours(4),
            status: TripStatus::Active,
            base_price_cents: 10_000,
            price_cents: 10_000,
            seat_count: 40,
        };
        assert_eq!(trip.occupancy(0), 0.0);
        assert_eq!(trip.occupancy(20), 0.5);
        assert_eq!(trip.occupancy(80), 1.0);
    }

    #[test]
    fn ticket_numbers_are_stable_per_reservation() {
        let res = Reservation::new(Uuid::new_v4(), 1, Uuid::new_v4(), 100, ReservationMode::Hold);
        let ticket = res.ticket_number.clone().unwrap();
        assert!(ticket.starts_with("RT-"));
        assert_eq!(ticket.len(), 15);
    }
}
