use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use rota_core::error::StoreError;
use rota_core::model::{
    AutoCancellationLog, CancelReason, Notification, NotificationStatus, Payment, Reservation,
    ReservationLog, ReservationStatus, PaymentStatus, SweepSettings, Trip, TripSeat, TripStatus,
};
use rota_core::pricing::{PriceChange, PriceSchedule};
use rota_core::store::{
    AutoCancelAudit, CancelOutcome, ClaimOutcome, NotificationStore, PayOutcome,
    ReservationStore, SettingsStore, TripStore,
};

#[derive(Default)]
struct Inner {
    trips: HashMap<Uuid, Trip>,
    seats: HashMap<(Uuid, i32), TripSeat>,
    reservations: HashMap<Uuid, Reservation>,
    payments: Vec<Payment>,
    reservation_logs: Vec<ReservationLog>,
    auto_cancellation_logs: Vec<AutoCancellationLog>,
    notifications: Vec<Notification>,
    settings: Option<SweepSettings>,
    next_log_id: i64,
}

/// In-memory store used by tests and local development.
///
/// Every compound operation runs under one mutex, which gives it the same
/// all-or-nothing semantics the Postgres store gets from transactions.
/// Single dispatcher consumer assumed: `claim_pending` does not mark rows.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a trip together with its free seats.
    pub fn add_trip(&self, trip: Trip) {
        let mut inner = self.inner.lock().unwrap();
        for seat_number in 1..=trip.seat_count {
            inner.seats.insert(
                (trip.id, seat_number),
                TripSeat {
                    trip_id: trip.id,
                    seat_number,
                    is_reserved: false,
                    reserved_at: None,
                },
            );
        }
        inner.trips.insert(trip.id, trip);
    }

    pub fn seat(&self, trip_id: Uuid, seat_number: i32) -> Option<TripSeat> {
        self.inner
            .lock()
            .unwrap()
            .seats
            .get(&(trip_id, seat_number))
            .cloned()
    }

    pub fn trip_snapshot(&self, trip_id: Uuid) -> Option<Trip> {
        self.inner.lock().unwrap().trips.get(&trip_id).cloned()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.lock().unwrap().notifications.clone()
    }

    pub fn payments(&self) -> Vec<Payment> {
        self.inner.lock().unwrap().payments.clone()
    }

    pub fn reservation_logs(&self) -> Vec<ReservationLog> {
        self.inner.lock().unwrap().reservation_logs.clone()
    }

    pub fn auto_cancellation_logs(&self) -> Vec<AutoCancellationLog> {
        self.inner.lock().unwrap().auto_cancellation_logs.clone()
    }

    /// Shift a reservation's creation time backwards, for timeout tests.
    pub fn backdate_reservation(&self, id: Uuid, by: Duration) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(res) = inner.reservations.get_mut(&id) {
            res.reserved_at -= by;
        }
    }

    /// Quiescent-point invariant: every held seat is referenced by exactly
    /// one active reservation, and every active reservation holds its seat.
    pub fn verify_no_orphan_holds(&self) -> Result<(), String> {
        let inner = self.inner.lock().unwrap();
        for (key, seat) in &inner.seats {
            let active = inner
                .reservations
                .values()
                .filter(|r| {
                    r.trip_id == key.0
                        && r.seat_number == key.1
                        && r.status == ReservationStatus::Reserved
                })
                .count();
            if seat.is_reserved && active != 1 {
                return Err(format!(
                    "seat {:?} held but referenced by {} active reservations",
                    key, active
                ));
            }
            if !seat.is_reserved && active != 0 {
                return Err(format!(
                    "seat {:?} free but referenced by {} active reservations",
                    key, active
                ));
            }
        }
        Ok(())
    }
}

impl Inner {
    fn log(&mut self, reservation_id: Uuid, action: &str, detail: Option<String>) {
        self.next_log_id += 1;
        self.reservation_logs.push(ReservationLog {
            id: self.next_log_id,
            reservation_id,
            action: action.to_string(),
            detail,
            logged_at: Utc::now(),
        });
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn create_holding_seat(
        &self,
        reservation: &Reservation,
        payment: Option<&Payment>,
    ) -> Result<ClaimOutcome, StoreError> {
        let mut inner = self.inner.lock().unwrap();

        let key = (reservation.trip_id, reservation.seat_number);
        match inner.seats.get_mut(&key) {
            None => return Ok(ClaimOutcome::SeatMissing),
            Some(seat) if seat.is_reserved => return Ok(ClaimOutcome::SeatTaken),
            Some(seat) => {
                seat.is_reserved = true;
                seat.reserved_at = Some(reservation.reserved_at);
            }
        }

        inner
            .reservations
            .insert(reservation.id, reservation.clone());
        inner.log(reservation.id, "RESERVATION_CREATED", None);
        if let Some(payment) = payment {
            inner.payments.push(payment.clone());
            inner.log(reservation.id, "PAYMENT_COMPLETED", None);
        }

        Ok(ClaimOutcome::Created(reservation.clone()))
    }

    async fn reservation(&self, id: Uuid) -> Result<Option<Reservation>, StoreError> {
        Ok(self.inner.lock().unwrap().reservations.get(&id).cloned())
    }

    async fn cancel_releasing_seat(
        &self,
        id: Uuid,
        reason: CancelReason,
        now: DateTime<Utc>,
        audit: Option<AutoCancelAudit>,
    ) -> Result<CancelOutcome, StoreError> {
        let mut inner = self.inner.lock().unwrap();

        let (trip_id, seat_number, user_id, reserved_at) = {
            let res = match inner.reservations.get_mut(&id) {
                None => return Ok(CancelOutcome::NotFound),
                Some(res) => res,
            };
            match res.status {
                ReservationStatus::Cancelled => return Ok(CancelOutcome::AlreadyCancelled),
                ReservationStatus::Completed => return Ok(CancelOutcome::Completed),
                ReservationStatus::Reserved => {}
            }
            if audit.is_some() && res.payment_status != PaymentStatus::Pending {
                return Ok(CancelOutcome::PaidMeanwhile);
            }
            res.status = ReservationStatus::Cancelled;
            res.cancel_reason = Some(reason);
            // A user cancelling a paid hold gets the payment back.
            if res.payment_status == PaymentStatus::Paid {
                res.payment_status = PaymentStatus::Refunded;
            }
            (res.trip_id, res.seat_number, res.user_id, res.reserved_at)
        };

        if let Some(seat) = inner.seats.get_mut(&(trip_id, seat_number)) {
            seat.is_reserved = false;
            seat.reserved_at = None;
        }

        inner.log(id, "RESERVATION_CANCELLED", Some(format!("{:?}", reason)));
        if let Some(audit) = audit {
            inner.next_log_id += 1;
            let log_id = inner.next_log_id;
            inner.auto_cancellation_logs.push(AutoCancellationLog {
                id: log_id,
                reservation_id: id,
                user_id,
                reserved_at,
                timeout_minutes: audit.timeout_minutes,
                cancelled_at: now,
            });
        }

        let cancelled = inner.reservations.get(&id).cloned().ok_or_else(|| {
            StoreError::Corrupt(format!("reservation {} vanished mid-cancel", id))
        })?;
        Ok(CancelOutcome::Cancelled(cancelled))
    }

    async fn mark_paid(&self, id: Uuid, payment: &Payment) -> Result<PayOutcome, StoreError> {
        let mut inner = self.inner.lock().unwrap();

        {
            let res = match inner.reservations.get_mut(&id) {
                None => return Ok(PayOutcome::NotFound),
                Some(res) => res,
            };
            if res.payment_status == PaymentStatus::Paid {
                return Ok(PayOutcome::AlreadyPaid);
            }
            match res.status {
                ReservationStatus::Cancelled => return Ok(PayOutcome::AlreadyCancelled),
                ReservationStatus::Completed => return Ok(PayOutcome::Completed),
                ReservationStatus::Reserved => {}
            }
            res.payment_status = PaymentStatus::Paid;
        }

        inner.payments.push(payment.clone());
        inner.log(id, "PAYMENT_COMPLETED", None);

        let paid = inner.reservations.get(&id).cloned().ok_or_else(|| {
            StoreError::Corrupt(format!("reservation {} vanished mid-payment", id))
        })?;
        Ok(PayOutcome::Paid(paid))
    }

    async fn expired_holds(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Reservation>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut holds: Vec<Reservation> = inner
            .reservations
            .values()
            .filter(|r| r.is_hold() && r.reserved_at <= cutoff)
            .cloned()
            .collect();
        holds.sort_by_key(|r| r.reserved_at);
        holds.truncate(limit.max(0) as usize);
        Ok(holds)
    }

    async fn cancellation_logs(
        &self,
        user_id: Option<Uuid>,
    ) -> Result<Vec<AutoCancellationLog>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .auto_cancellation_logs
            .iter()
            .filter(|log| user_id.map(|u| log.user_id == u).unwrap_or(true))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TripStore for MemoryStore {
    async fn trip(&self, id: Uuid) -> Result<Option<Trip>, StoreError> {
        Ok(self.inner.lock().unwrap().trips.get(&id).cloned())
    }

    async fn repricing_candidates(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Vec<Uuid>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .trips
            .values()
            .filter(|t| {
                t.status == TripStatus::Active
                    && t.departure_at > now
                    && t.departure_at <= now + window
            })
            .map(|t| t.id)
            .collect())
    }

    async fn apply_price_step(
        &self,
        trip_id: Uuid,
        schedule: &PriceSchedule,
    ) -> Result<Option<PriceChange>, StoreError> {
        let mut inner = self.inner.lock().unwrap();

        let reserved = inner
            .seats
            .values()
            .filter(|s| s.trip_id == trip_id && s.is_reserved)
            .count() as i64;

        let trip = match inner.trips.get_mut(&trip_id) {
            None => return Ok(None),
            Some(trip) => trip,
        };

        let occupancy = trip.occupancy(reserved);
        match schedule.target_price(trip.base_price_cents, trip.price_cents, occupancy) {
            None => Ok(None),
            Some(new_price) => {
                let change = PriceChange {
                    trip_id,
                    old_price_cents: trip.price_cents,
                    new_price_cents: new_price,
                    occupancy,
                };
                trip.price_cents = new_price;
                Ok(Some(change))
            }
        }
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn enqueue(&self, notification: &Notification) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .notifications
            .push(notification.clone());
        Ok(())
    }

    async fn claim_pending(
        &self,
        limit: i64,
        max_retries: i32,
    ) -> Result<Vec<Notification>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut pending: Vec<Notification> = inner
            .notifications
            .iter()
            .filter(|n| n.status == NotificationStatus::Pending && n.retry_count < max_retries)
            .cloned()
            .collect();
        pending.sort_by_key(|n| n.created_at);
        pending.truncate(limit.max(0) as usize);
        Ok(pending)
    }

    async fn mark_sent(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(n) = inner.notifications.iter_mut().find(|n| n.id == id) {
            n.status = NotificationStatus::Sent;
            n.sent_at = Some(at);
        }
        Ok(())
    }

    async fn mark_attempt_failed(
        &self,
        id: Uuid,
        error: &str,
        max_retries: i32,
    ) -> Result<NotificationStatus, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let n = inner
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| StoreError::Corrupt(format!("notification {} not found", id)))?;

        n.retry_count += 1;
        n.last_error = Some(error.to_string());
        if n.retry_count >= max_retries {
            n.status = NotificationStatus::Failed;
        }
        Ok(n.status)
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn sweep_settings(&self) -> Result<SweepSettings, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .settings
            .unwrap_or_default())
    }

    async fn update_sweep_settings(&self, settings: SweepSettings) -> Result<(), StoreError> {
        self.inner.lock().unwrap().settings = Some(settings);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rota_core::model::ReservationMode;

    fn active_trip(seats: i32) -> Trip {
        Trip {
            id: Uuid::new_v4(),
            origin: "IST".into(),
            destination: "ANK".into(),
            departure_at: Utc::now() + Duration::hours(3),
            status: TripStatus::Active,
            base_price_cents: 10_000,
            price_cents: 10_000,
            seat_count: seats,
        }
    }

    #[tokio::test]
    async fn seat_claim_is_exclusive() {
        let store = MemoryStore::new();
        let trip = active_trip(4);
        let trip_id = trip.id;
        store.add_trip(trip);

        let first = Reservation::new(trip_id, 2, Uuid::new_v4(), 100, ReservationMode::Hold);
        let second = Reservation::new(trip_id, 2, Uuid::new_v4(), 100, ReservationMode::Hold);

        assert!(matches!(
            store.create_holding_seat(&first, None).await.unwrap(),
            ClaimOutcome::Created(_)
        ));
        assert!(matches!(
            store.create_holding_seat(&second, None).await.unwrap(),
            ClaimOutcome::SeatTaken
        ));
        store.verify_no_orphan_holds().unwrap();
    }

    #[tokio::test]
    async fn timeout_cancel_refuses_paid_hold() {
        let store = MemoryStore::new();
        let trip = active_trip(4);
        let trip_id = trip.id;
        store.add_trip(trip);

        let res = Reservation::new(trip_id, 1, Uuid::new_v4(), 100, ReservationMode::Hold);
        store.create_holding_seat(&res, None).await.unwrap();
        store
            .mark_paid(res.id, &Payment::new(res.id, 100))
            .await
            .unwrap();

        let outcome = store
            .cancel_releasing_seat(
                res.id,
                CancelReason::Timeout,
                Utc::now(),
                Some(AutoCancelAudit { timeout_minutes: 15 }),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, CancelOutcome::PaidMeanwhile));

        // Seat stays held by the paid reservation.
        assert!(store.seat(trip_id, 1).unwrap().is_reserved);
        store.verify_no_orphan_holds().unwrap();
    }

    #[tokio::test]
    async fn completed_reservation_reports_completed_not_paid() {
        let store = MemoryStore::new();
        let trip = active_trip(4);
        let trip_id = trip.id;
        store.add_trip(trip);

        let res = Reservation::new(trip_id, 1, Uuid::new_v4(), 100, ReservationMode::Hold);
        store.create_holding_seat(&res, None).await.unwrap();
        store
            .inner
            .lock()
            .unwrap()
            .reservations
            .get_mut(&res.id)
            .unwrap()
            .status = ReservationStatus::Completed;

        let outcome = store
            .mark_paid(res.id, &Payment::new(res.id, 100))
            .await
            .unwrap();
        assert!(matches!(outcome, PayOutcome::Completed));

        let outcome = store
            .cancel_releasing_seat(res.id, CancelReason::UserRequest, Utc::now(), None)
            .await
            .unwrap();
        assert!(matches!(outcome, CancelOutcome::Completed));
    }
}
