//! Pure state-machine guards, shared by the request path and the sweeper.
//!
//! These run before the store's conditional write and give deterministic
//! rejections; the conditional write itself re-checks the same conditions so
//! races between the read and the write still resolve to exactly one winner.

use chrono::{DateTime, Utc};
use rota_core::error::BookingError;
use rota_core::model::{PaymentStatus, Reservation, ReservationStatus, Trip, TripStatus};

/// Reserve preconditions: positive price, active trip, seat in range.
pub fn check_bookable(trip: &Trip, seat_number: i32, price_cents: i32) -> Result<(), BookingError> {
    if price_cents <= 0 {
        return Err(BookingError::InvalidPrice(price_cents));
    }
    if trip.status != TripStatus::Active {
        return Err(BookingError::TripInactive(trip.id));
    }
    if seat_number < 1 || seat_number > trip.seat_count {
        return Err(BookingError::InvalidSeat {
            trip_id: trip.id,
            seat_number,
        });
    }
    Ok(())
}

/// Cancel guards, in order: terminal state, then departure cutoff.
pub fn check_cancellable(
    reservation: &Reservation,
    trip: &Trip,
    now: DateTime<Utc>,
) -> Result<(), BookingError> {
    match reservation.status {
        ReservationStatus::Cancelled => Err(BookingError::AlreadyCancelled(reservation.id)),
        ReservationStatus::Completed => Err(BookingError::ReservationCompleted(reservation.id)),
        ReservationStatus::Reserved => {
            if trip.has_departed(now) {
                Err(BookingError::TripAlreadyDeparted(trip.id))
            } else {
                Ok(())
            }
        }
    }
}

/// Payment guards, in order: already paid, then cancelled/completed.
pub fn check_payable(reservation: &Reservation) -> Result<(), BookingError> {
    if reservation.payment_status == PaymentStatus::Paid {
        return Err(BookingError::AlreadyPaid(reservation.id));
    }
    match reservation.status {
        ReservationStatus::Cancelled => Err(BookingError::AlreadyCancelled(reservation.id)),
        ReservationStatus::Completed => Err(BookingError::ReservationCompleted(reservation.id)),
        ReservationStatus::Reserved => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rota_core::model::ReservationMode;
    use uuid::Uuid;

    fn trip(departs_in: Duration, status: TripStatus) -> Trip {
        Trip {
            id: Uuid::new_v4(),
            origin: "IST".into(),
            destination: "IZM".into(),
            departure_at: Utc::now() + departs_in,
            status,
            base_price_cents: 10_000,
            price_cents: 10_000,
            seat_count: 40,
        }
    }

    #[test]
    fn bookable_rejects_bad_price_before_anything_else() {
        let t = trip(Duration::hours(2), TripStatus::Cancelled);
        assert!(matches!(
            check_bookable(&t, 1, 0),
            Err(BookingError::InvalidPrice(0))
        ));
    }

    #[test]
    fn bookable_rejects_inactive_trip_and_out_of_range_seat() {
        let t = trip(Duration::hours(2), TripStatus::Cancelled);
        assert!(matches!(
            check_bookable(&t, 1, 100),
            Err(BookingError::TripInactive(_))
        ));

        let t = trip(Duration::hours(2), TripStatus::Active);
        assert!(matches!(
            check_bookable(&t, 41, 100),
            Err(BookingError::InvalidSeat { seat_number: 41, .. })
        ));
        assert!(matches!(
            check_bookable(&t, 0, 100),
            Err(BookingError::InvalidSeat { .. })
        ));
        assert!(check_bookable(&t, 40, 100).is_ok());
    }

    #[test]
    fn cancel_rejected_once_trip_departed() {
        let t = trip(Duration::minutes(-5), TripStatus::Active);
        let res = Reservation::new(t.id, 3, Uuid::new_v4(), 100, ReservationMode::Hold);
        assert!(matches!(
            check_cancellable(&res, &t, Utc::now()),
            Err(BookingError::TripAlreadyDeparted(_))
        ));
    }

    #[test]
    fn cancel_rejected_in_terminal_states() {
        let t = trip(Duration::hours(2), TripStatus::Active);
        let mut res = Reservation::new(t.id, 3, Uuid::new_v4(), 100, ReservationMode::Hold);

        res.status = ReservationStatus::Cancelled;
        assert!(matches!(
            check_cancellable(&res, &t, Utc::now()),
            Err(BookingError::AlreadyCancelled(_))
        ));

        res.status = ReservationStatus::Completed;
        assert!(matches!(
            check_cancellable(&res, &t, Utc::now()),
            Err(BookingError::ReservationCompleted(_))
        ));
    }

    #[test]
    fn payable_checks_paid_before_cancelled() {
        let t = trip(Duration::hours(2), TripStatus::Active);
        let mut res = Reservation::new(t.id, 3, Uuid::new_v4(), 100, ReservationMode::Hold);
        assert!(check_payable(&res).is_ok());

        // Paid then cancelled: AlreadyPaid wins the guard order.
        res.payment_status = PaymentStatus::Paid;
        res.status = ReservationStatus::Cancelled;
        assert!(matches!(
            check_payable(&res),
            Err(BookingError::AlreadyPaid(_))
        ));

        res.payment_status = PaymentStatus::Pending;
        assert!(matches!(
            check_payable(&res),
            Err(BookingError::AlreadyCancelled(_))
        ));
    }
}
