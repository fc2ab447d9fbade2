pub mod collab;
pub mod error;
pub mod model;
pub mod pricing;
pub mod store;

pub use error::{BookingError, StoreError};
pub use model::{
    AutoCancellationLog, CancelReason, Notification, NotificationKind, NotificationStatus,
    Payment, PaymentStatus, Reservation, ReservationLog, ReservationMode, ReservationStatus,
    SweepSettings, Trip, TripSeat, TripStatus,
};
