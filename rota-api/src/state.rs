use std::sync::Arc;

use rota_booking::BookingEngine;
use rota_core::store::{ReservationStore, SettingsStore};
use rota_tasks::AutoCancellationSweeper;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BookingEngine>,
    pub sweeper: Arc<AutoCancellationSweeper>,
    pub reservations: Arc<dyn ReservationStore>,
    pub settings: Arc<dyn SettingsStore>,
}
