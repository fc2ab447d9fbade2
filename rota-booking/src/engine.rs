use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use rota_core::error::BookingError;
use rota_core::model::{
    CancelReason, Notification, NotificationKind, Payment, Reservation, ReservationMode, Trip,
};
use rota_core::store::{
    AutoCancelAudit, CancelOutcome, ClaimOutcome, NotificationStore, PayOutcome,
    ReservationStore, TripStore,
};

use crate::guards;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveRequest {
    pub trip_id: Uuid,
    pub seat_number: i32,
    pub user_id: Uuid,
    pub price_cents: i32,
    pub mode: ReservationMode,
}

/// Owns seat-hold acquisition/release and the reservation state machine.
///
/// Each operation is: pure guards, then one atomic store write, then a
/// best-effort notification enqueue. No partial state is ever visible: the
/// store either commits the whole transition or nothing.
pub struct BookingEngine {
    reservations: Arc<dyn ReservationStore>,
    trips: Arc<dyn TripStore>,
    notifications: Arc<dyn NotificationStore>,
}

impl BookingEngine {
    pub fn new(
        reservations: Arc<dyn ReservationStore>,
        trips: Arc<dyn TripStore>,
        notifications: Arc<dyn NotificationStore>,
    ) -> Self {
        Self {
            reservations,
            trips,
            notifications,
        }
    }

    pub fn reservation_store(&self) -> Arc<dyn ReservationStore> {
        self.reservations.clone()
    }

    /// Claim a seat and create the reservation. `ImmediatePurchase` also
    /// records the payment in the same unit of work.
    pub async fn reserve(&self, req: ReserveRequest) -> Result<Reservation, BookingError> {
        // Validation rejections never touch the store.
        if req.price_cents <= 0 {
            return Err(BookingError::InvalidPrice(req.price_cents));
        }

        let trip = self
            .trips
            .trip(req.trip_id)
            .await?
            .ok_or(BookingError::TripNotFound(req.trip_id))?;

        guards::check_bookable(&trip, req.seat_number, req.price_cents)?;

        let reservation = Reservation::new(
            req.trip_id,
            req.seat_number,
            req.user_id,
            req.price_cents,
            req.mode,
        );
        let payment = match req.mode {
            ReservationMode::ImmediatePurchase => {
                Some(Payment::new(reservation.id, req.price_cents))
            }
            ReservationMode::Hold => None,
        };

        let outcome = self
            .reservations
            .create_holding_seat(&reservation, payment.as_ref())
            .await?;

        match outcome {
            ClaimOutcome::Created(created) => {
                info!(
                    reservation_id = %created.id,
                    trip_id = %created.trip_id,
                    seat = created.seat_number,
                    mode = ?req.mode,
                    "seat reserved"
                );
                let kind = match req.mode {
                    ReservationMode::ImmediatePurchase => NotificationKind::Payment,
                    ReservationMode::Hold => NotificationKind::Reservation,
                };
                self.enqueue(kind, &created, Some(&trip)).await;
                Ok(created)
            }
            ClaimOutcome::SeatTaken => Err(BookingError::SeatUnavailable {
                trip_id: req.trip_id,
                seat_number: req.seat_number,
            }),
            ClaimOutcome::SeatMissing => Err(BookingError::InvalidSeat {
                trip_id: req.trip_id,
                seat_number: req.seat_number,
            }),
        }
    }

    /// User-initiated cancellation.
    pub async fn cancel(
        &self,
        reservation_id: Uuid,
        reason: CancelReason,
    ) -> Result<Reservation, BookingError> {
        self.cancel_with_audit(reservation_id, reason, None).await
    }

    /// Cancellation shared by the user path and the sweeper. The sweeper
    /// passes `audit`, which records the auto-cancellation log entry and
    /// restricts the transition to still-unpaid holds.
    pub async fn cancel_with_audit(
        &self,
        reservation_id: Uuid,
        reason: CancelReason,
        audit: Option<AutoCancelAudit>,
    ) -> Result<Reservation, BookingError> {
        let now = Utc::now();
        let reservation = self
            .reservations
            .reservation(reservation_id)
            .await?
            .ok_or(BookingError::ReservationNotFound(reservation_id))?;

        let trip = self
            .trips
            .trip(reservation.trip_id)
            .await?
            .ok_or(BookingError::TripNotFound(reservation.trip_id))?;

        guards::check_cancellable(&reservation, &trip, now)?;

        let outcome = self
            .reservations
            .cancel_releasing_seat(reservation_id, reason, now, audit)
            .await?;

        match outcome {
            CancelOutcome::Cancelled(cancelled) => {
                info!(
                    reservation_id = %cancelled.id,
                    reason = ?reason,
                    "reservation cancelled, seat released"
                );
                self.enqueue(NotificationKind::Cancellation, &cancelled, Some(&trip))
                    .await;
                Ok(cancelled)
            }
            CancelOutcome::AlreadyCancelled => {
                Err(BookingError::AlreadyCancelled(reservation_id))
            }
            CancelOutcome::Completed => Err(BookingError::ReservationCompleted(reservation_id)),
            CancelOutcome::PaidMeanwhile => Err(BookingError::AlreadyPaid(reservation_id)),
            CancelOutcome::NotFound => Err(BookingError::ReservationNotFound(reservation_id)),
        }
    }

    /// Transition a held reservation to Paid. Never touches the seat row.
    pub async fn complete_payment(
        &self,
        reservation_id: Uuid,
        amount_cents: i32,
    ) -> Result<Reservation, BookingError> {
        if amount_cents <= 0 {
            return Err(BookingError::InvalidPrice(amount_cents));
        }

        let reservation = self
            .reservations
            .reservation(reservation_id)
            .await?
            .ok_or(BookingError::ReservationNotFound(reservation_id))?;

        guards::check_payable(&reservation)?;

        let payment = Payment::new(reservation_id, amount_cents);
        let outcome = self.reservations.mark_paid(reservation_id, &payment).await?;

        match outcome {
            PayOutcome::Paid(paid) => {
                info!(reservation_id = %paid.id, amount_cents, "payment completed");
                let trip = self.trips.trip(paid.trip_id).await.ok().flatten();
                self.enqueue(NotificationKind::Payment, &paid, trip.as_ref())
                    .await;
                Ok(paid)
            }
            PayOutcome::AlreadyPaid => Err(BookingError::AlreadyPaid(reservation_id)),
            PayOutcome::AlreadyCancelled => Err(BookingError::AlreadyCancelled(reservation_id)),
            PayOutcome::Completed => Err(BookingError::ReservationCompleted(reservation_id)),
            PayOutcome::NotFound => Err(BookingError::ReservationNotFound(reservation_id)),
        }
    }

    /// Best-effort enqueue after commit; a queue failure never fails the
    /// booking operation that triggered it.
    async fn enqueue(&self, kind: NotificationKind, reservation: &Reservation, trip: Option<&Trip>) {
        let notification =
            Notification::for_reservation(kind, reservation, notification_payload(reservation, trip));
        if let Err(e) = self.notifications.enqueue(&notification).await {
            warn!(
                reservation_id = %reservation.id,
                kind = ?kind,
                error = %e,
                "failed to enqueue notification"
            );
        }
    }
}

/// Enough trip/seat context for the dispatcher to render a message without
/// re-reading the ledger.
fn notification_payload(reservation: &Reservation, trip: Option<&Trip>) -> serde_json::Value {
    let mut payload = serde_json::json!({
        "reservation_id": reservation.id,
        "trip_id": reservation.trip_id,
        "seat_number": reservation.seat_number,
        "price_cents": reservation.price_cents,
        "ticket_number": reservation.ticket_number,
    });
    if let Some(trip) = trip {
        payload["origin"] = serde_json::json!(trip.origin);
        payload["destination"] = serde_json::json!(trip.destination);
        payload["departure_at"] = serde_json::json!(trip.departure_at);
    }
    payload
}
