use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::{info, warn};

use rota_core::pricing::PriceSchedule;
use rota_core::store::TripStore;

use crate::runner::PeriodicTask;

/// Occupancy-driven repricing for trips nearing departure.
///
/// Much weaker consistency requirements than the booking path: it shares the
/// periodic-task pattern but never touches seat locking. Each trip's
/// occupancy read and price write are one atomic store op, so the price is
/// never computed from a stale occupancy snapshot.
pub struct PricingAdjuster {
    trips: Arc<dyn TripStore>,
    schedule: PriceSchedule,
    /// How close to departure a trip must be to get repriced.
    window: Duration,
}

impl PricingAdjuster {
    pub fn new(trips: Arc<dyn TripStore>, schedule: PriceSchedule, window: Duration) -> Self {
        Self {
            trips,
            schedule,
            window,
        }
    }

    /// Returns the number of trips whose price was raised.
    pub async fn run_cycle(&self) -> u64 {
        let candidates = match self.trips.repricing_candidates(Utc::now(), self.window).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, "pricing cycle aborted: candidate query failed");
                return 0;
            }
        };

        let mut adjusted = 0;
        for trip_id in candidates {
            match self.trips.apply_price_step(trip_id, &self.schedule).await {
                Ok(Some(change)) => {
                    info!(
                        trip_id = %change.trip_id,
                        old = change.old_price_cents,
                        new = change.new_price_cents,
                        occupancy = change.occupancy,
                        "trip repriced"
                    );
                    adjusted += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(trip_id = %trip_id, error = %e, "repricing failed");
                }
            }
        }
        adjusted
    }
}

#[async_trait]
impl PeriodicTask for PricingAdjuster {
    fn name(&self) -> &'static str {
        "pricing-adjuster"
    }

    async fn tick(&self) {
        self.run_cycle().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rota_core::model::{Payment, Reservation, ReservationMode, Trip, TripStatus};
    use rota_core::store::ReservationStore;
    use rota_store::MemoryStore;
    use uuid::Uuid;

    fn seed_trip(store: &MemoryStore, seats: i32, departs_in: Duration) -> Uuid {
        let trip = Trip {
            id: Uuid::new_v4(),
            origin: "IST".into(),
            destination: "ANK".into(),
            departure_at: Utc::now() + departs_in,
            status: TripStatus::Active,
            base_price_cents: 10_000,
            price_cents: 10_000,
            seat_count: seats,
        };
        let id = trip.id;
        store.add_trip(trip);
        id
    }

    async fn fill_seats(store: &MemoryStore, trip_id: Uuid, count: i32) {
        for seat in 1..=count {
            let res = Reservation::new(
                trip_id,
                seat,
                Uuid::new_v4(),
                10_000,
                ReservationMode::ImmediatePurchase,
            );
            let payment = Payment::new(res.id, 10_000);
            store
                .create_holding_seat(&res, Some(&payment))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn price_steps_up_as_occupancy_crosses_thresholds() {
        let store = Arc::new(MemoryStore::new());
        let trip_id = seed_trip(&store, 10, Duration::hours(12));
        let adjuster =
            PricingAdjuster::new(store.clone(), PriceSchedule::default(), Duration::hours(48));

        // 50% occupancy: +10% over base.
        fill_seats(&store, trip_id, 5).await;
        assert_eq!(adjuster.run_cycle().await, 1);
        assert_eq!(store.trip_snapshot(trip_id).unwrap().price_cents, 11_000);

        // Same occupancy again: idempotent, no change.
        assert_eq!(adjuster.run_cycle().await, 0);

        // 80% occupancy: +25% over base, applied from base not current.
        fill_seats(&store, trip_id, 8).await;
        assert_eq!(adjuster.run_cycle().await, 1);
        assert_eq!(store.trip_snapshot(trip_id).unwrap().price_cents, 12_500);
    }

    #[tokio::test]
    async fn trips_outside_the_window_are_left_alone() {
        let store = Arc::new(MemoryStore::new());
        let far_trip = seed_trip(&store, 10, Duration::hours(200));
        let adjuster =
            PricingAdjuster::new(store.clone(), PriceSchedule::default(), Duration::hours(48));

        fill_seats(&store, far_trip, 9).await;
        assert_eq!(adjuster.run_cycle().await, 0);
        assert_eq!(store.trip_snapshot(far_trip).unwrap().price_cents, 10_000);
    }
}
