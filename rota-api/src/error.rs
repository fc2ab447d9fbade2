use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use rota_core::error::{BookingError, StoreError};

#[derive(Debug)]
pub enum ApiError {
    Booking(BookingError),
    Store(StoreError),
    Validation(String),
    Internal(anyhow::Error),
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        Self::Booking(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

fn booking_status(err: &BookingError) -> StatusCode {
    match err {
        BookingError::InvalidPrice(_) | BookingError::InvalidSeat { .. } => {
            StatusCode::BAD_REQUEST
        }
        BookingError::SeatUnavailable { .. }
        | BookingError::AlreadyCancelled(_)
        | BookingError::AlreadyPaid(_) => StatusCode::CONFLICT,
        BookingError::TripNotFound(_) | BookingError::ReservationNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        BookingError::TripInactive(_)
        | BookingError::TripAlreadyDeparted(_)
        | BookingError::ReservationCompleted(_) => StatusCode::UNPROCESSABLE_ENTITY,
        BookingError::Store(e) => store_status(e),
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    if err.is_retryable() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Booking(err) => {
                let status = booking_status(&err);
                if status.is_server_error() {
                    tracing::error!("booking store failure: {}", err);
                    (status, "Internal Server Error".to_string())
                } else {
                    (status, err.to_string())
                }
            }
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Store(err) => {
                tracing::error!("store failure: {}", err);
                (store_status(&err), "Internal Server Error".to_string())
            }
            ApiError::Internal(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
