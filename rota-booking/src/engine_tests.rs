use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use rota_core::error::BookingError;
use rota_core::model::{
    CancelReason, NotificationKind, PaymentStatus, ReservationMode, ReservationStatus, Trip,
    TripStatus,
};
use rota_store::MemoryStore;

use crate::engine::{BookingEngine, ReserveRequest};

fn trip(departs_in: Duration, status: TripStatus, seats: i32) -> Trip {
    Trip {
        id: Uuid::new_v4(),
        origin: "IST".into(),
        destination: "ANK".into(),
        departure_at: Utc::now() + departs_in,
        status,
        base_price_cents: 10_000,
        price_cents: 10_000,
        seat_count: seats,
    }
}

fn engine_with(store: &Arc<MemoryStore>) -> BookingEngine {
    BookingEngine::new(store.clone(), store.clone(), store.clone())
}

fn hold_request(trip_id: Uuid, seat_number: i32) -> ReserveRequest {
    ReserveRequest {
        trip_id,
        seat_number,
        user_id: Uuid::new_v4(),
        price_cents: 10_000,
        mode: ReservationMode::Hold,
    }
}

#[tokio::test]
async fn concurrent_reserves_on_same_seat_have_one_winner() {
    let store = Arc::new(MemoryStore::new());
    let t = trip(Duration::hours(4), TripStatus::Active, 40);
    let trip_id = t.id;
    store.add_trip(t);

    let engine = Arc::new(engine_with(&store));

    let mut handles = Vec::new();
    for _ in 0..12 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.reserve(hold_request(trip_id, 7)).await
        }));
    }

    let mut won = 0;
    let mut lost = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => won += 1,
            Err(BookingError::SeatUnavailable { seat_number: 7, .. }) => lost += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(won, 1);
    assert_eq!(lost, 11);
    assert!(store.seat(trip_id, 7).unwrap().is_reserved);
    store.verify_no_orphan_holds().unwrap();
}

#[tokio::test]
async fn hold_then_pay_scenario() {
    let store = Arc::new(MemoryStore::new());
    let t = trip(Duration::hours(4), TripStatus::Active, 40);
    let trip_id = t.id;
    store.add_trip(t);
    let engine = engine_with(&store);

    let reservation = engine.reserve(hold_request(trip_id, 5)).await.unwrap();
    assert_eq!(reservation.status, ReservationStatus::Reserved);
    assert_eq!(reservation.payment_status, PaymentStatus::Pending);
    assert!(reservation.ticket_number.is_some());

    // Second user targeting the same seat loses.
    let err = engine.reserve(hold_request(trip_id, 5)).await.unwrap_err();
    assert!(matches!(err, BookingError::SeatUnavailable { .. }));

    let paid = engine
        .complete_payment(reservation.id, 10_000)
        .await
        .unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert_eq!(store.payments().len(), 1);

    let kinds: Vec<NotificationKind> = store.notifications().iter().map(|n| n.kind).collect();
    assert_eq!(
        kinds,
        vec![NotificationKind::Reservation, NotificationKind::Payment]
    );
    store.verify_no_orphan_holds().unwrap();
}

#[tokio::test]
async fn immediate_purchase_records_payment_in_same_unit() {
    let store = Arc::new(MemoryStore::new());
    let t = trip(Duration::hours(4), TripStatus::Active, 40);
    let trip_id = t.id;
    store.add_trip(t);
    let engine = engine_with(&store);

    let req = ReserveRequest {
        mode: ReservationMode::ImmediatePurchase,
        ..hold_request(trip_id, 3)
    };
    let reservation = engine.reserve(req).await.unwrap();

    assert_eq!(reservation.payment_status, PaymentStatus::Paid);
    assert_eq!(store.payments().len(), 1);
    assert_eq!(store.notifications().len(), 1);
    assert_eq!(store.notifications()[0].kind, NotificationKind::Payment);
}

#[tokio::test]
async fn reserve_precondition_failures_leave_store_untouched() {
    let store = Arc::new(MemoryStore::new());
    let active = trip(Duration::hours(4), TripStatus::Active, 10);
    let inactive = trip(Duration::hours(4), TripStatus::Cancelled, 10);
    let active_id = active.id;
    let inactive_id = inactive.id;
    store.add_trip(active);
    store.add_trip(inactive);
    let engine = engine_with(&store);

    let err = engine
        .reserve(hold_request(Uuid::new_v4(), 1))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::TripNotFound(_)));

    let err = engine
        .reserve(hold_request(inactive_id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::TripInactive(_)));

    let err = engine
        .reserve(ReserveRequest {
            price_cents: -5,
            ..hold_request(active_id, 1)
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InvalidPrice(-5)));

    let err = engine
        .reserve(hold_request(active_id, 11))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InvalidSeat { .. }));

    assert!(store.notifications().is_empty());
    assert!(!store.seat(active_id, 1).unwrap().is_reserved);
    store.verify_no_orphan_holds().unwrap();
}

#[tokio::test]
async fn cancel_is_idempotent_and_releases_seat_once() {
    let store = Arc::new(MemoryStore::new());
    let t = trip(Duration::hours(4), TripStatus::Active, 10);
    let trip_id = t.id;
    store.add_trip(t);
    let engine = engine_with(&store);

    let reservation = engine.reserve(hold_request(trip_id, 2)).await.unwrap();
    assert!(store.seat(trip_id, 2).unwrap().is_reserved);

    let cancelled = engine
        .cancel(reservation.id, CancelReason::UserRequest)
        .await
        .unwrap();
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    assert_eq!(cancelled.cancel_reason, Some(CancelReason::UserRequest));
    assert!(!store.seat(trip_id, 2).unwrap().is_reserved);

    let err = engine
        .cancel(reservation.id, CancelReason::UserRequest)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::AlreadyCancelled(_)));

    // Seat can be claimed again after release.
    engine.reserve(hold_request(trip_id, 2)).await.unwrap();
    store.verify_no_orphan_holds().unwrap();
}

#[tokio::test]
async fn cancel_rejected_after_departure() {
    let store = Arc::new(MemoryStore::new());
    let t = trip(Duration::hours(1), TripStatus::Active, 10);
    let trip_id = t.id;
    store.add_trip(t);
    let engine = engine_with(&store);

    let reservation = engine.reserve(hold_request(trip_id, 4)).await.unwrap();

    // Departure passes while the hold is open.
    let mut departed = store.trip_snapshot(trip_id).unwrap();
    departed.departure_at = Utc::now() - Duration::minutes(1);
    store.add_trip(departed);

    let err = engine
        .cancel(reservation.id, CancelReason::UserRequest)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::TripAlreadyDeparted(_)));
}

#[tokio::test]
async fn payment_guards_run_in_order() {
    let store = Arc::new(MemoryStore::new());
    let t = trip(Duration::hours(4), TripStatus::Active, 10);
    let trip_id = t.id;
    store.add_trip(t);
    let engine = engine_with(&store);

    let err = engine
        .complete_payment(Uuid::new_v4(), 100)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::ReservationNotFound(_)));

    let reservation = engine.reserve(hold_request(trip_id, 1)).await.unwrap();

    let err = engine.complete_payment(reservation.id, 0).await.unwrap_err();
    assert!(matches!(err, BookingError::InvalidPrice(0)));

    engine.complete_payment(reservation.id, 10_000).await.unwrap();
    let err = engine
        .complete_payment(reservation.id, 10_000)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::AlreadyPaid(_)));

    let other = engine.reserve(hold_request(trip_id, 2)).await.unwrap();
    engine
        .cancel(other.id, CancelReason::UserRequest)
        .await
        .unwrap();
    let err = engine.complete_payment(other.id, 10_000).await.unwrap_err();
    assert!(matches!(err, BookingError::AlreadyCancelled(_)));
}
