use uuid::Uuid;

/// Failure surfaced by a store implementation.
///
/// `Unavailable` covers connectivity/timeout style failures where retrying
/// the whole atomic operation from scratch is safe; `Corrupt` is for data the
/// store handed back that violates the model and is never retried.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store data corrupt: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Outcome taxonomy for the booking operations.
///
/// Validation errors never reach the store. Conflict errors are expected
/// contention outcomes and are not logged as failures. Precondition errors
/// are business-rule rejections. Only `Store(Unavailable)` is retryable.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    // -- validation --------------------------------------------------------
    #[error("price must be positive, got {0}")]
    InvalidPrice(i32),

    #[error("seat {seat_number} does not exist on trip {trip_id}")]
    InvalidSeat { trip_id: Uuid, seat_number: i32 },

    // -- conflict ----------------------------------------------------------
    #[error("seat {seat_number} on trip {trip_id} is already held")]
    SeatUnavailable { trip_id: Uuid, seat_number: i32 },

    #[error("reservation {0} is already cancelled")]
    AlreadyCancelled(Uuid),

    #[error("reservation {0} is already paid")]
    AlreadyPaid(Uuid),

    // -- precondition ------------------------------------------------------
    #[error("trip {0} not found")]
    TripNotFound(Uuid),

    #[error("trip {0} is not open for sale")]
    TripInactive(Uuid),

    #[error("trip {0} has already departed")]
    TripAlreadyDeparted(Uuid),

    #[error("reservation {0} not found")]
    ReservationNotFound(Uuid),

    #[error("reservation {0} is completed and can no longer change")]
    ReservationCompleted(Uuid),

    // -- store -------------------------------------------------------------
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BookingError {
    /// True only for transient store failures; everything else is terminal
    /// for the attempted operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::Store(e) if e.is_retryable())
    }

    /// Expected contention outcome rather than a fault.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            BookingError::SeatUnavailable { .. }
                | BookingError::AlreadyCancelled(_)
                | BookingError::AlreadyPaid(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailable_store_errors_retry() {
        let transient = BookingError::Store(StoreError::Unavailable("timeout".into()));
        assert!(transient.is_retryable());

        let corrupt = BookingError::Store(StoreError::Corrupt("bad row".into()));
        assert!(!corrupt.is_retryable());

        let conflict = BookingError::AlreadyPaid(Uuid::new_v4());
        assert!(!conflict.is_retryable());
        assert!(conflict.is_conflict());
    }
}
