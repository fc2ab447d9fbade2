use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One occupancy threshold and the multiplier applied over the base price
/// once occupancy reaches it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceStep {
    pub occupancy: f64,
    pub multiplier: f64,
}

/// Monotonic step schedule for occupancy-driven repricing.
///
/// The target is always computed from the trip's base price, and a trip's
/// current price is never lowered, so repeated application converges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSchedule {
    steps: Vec<PriceStep>,
}

impl PriceSchedule {
    /// Steps are sorted by occupancy; multipliers below 1.0 are clamped up
    /// so the schedule can only raise prices.
    pub fn new(mut steps: Vec<PriceStep>) -> Self {
        for step in &mut steps {
            step.multiplier = step.multiplier.max(1.0);
        }
        steps.sort_by(|a, b| a.occupancy.total_cmp(&b.occupancy));
        Self { steps }
    }

    /// Multiplier for the highest step at or below `occupancy`.
    pub fn multiplier_for(&self, occupancy: f64) -> f64 {
        self.steps
            .iter()
            .rev()
            .find(|s| occupancy >= s.occupancy)
            .map(|s| s.multiplier)
            .unwrap_or(1.0)
    }

    /// New price for the trip, or `None` when the schedule would not raise
    /// the current price.
    pub fn target_price(
        &self,
        base_price_cents: i32,
        current_price_cents: i32,
        occupancy: f64,
    ) -> Option<i32> {
        let target = (base_price_cents as f64 * self.multiplier_for(occupancy)).round() as i32;
        if target > current_price_cents {
            Some(target)
        } else {
            None
        }
    }
}

impl Default for PriceSchedule {
    fn default() -> Self {
        Self::new(vec![
            PriceStep { occupancy: 0.50, multiplier: 1.10 },
            PriceStep { occupancy: 0.75, multiplier: 1.25 },
            PriceStep { occupancy: 0.90, multiplier: 1.40 },
        ])
    }
}

/// Committed price adjustment, reported for observability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceChange {
    pub trip_id: Uuid,
    pub old_price_cents: i32,
    pub new_price_cents: i32,
    pub occupancy: f64,
}
