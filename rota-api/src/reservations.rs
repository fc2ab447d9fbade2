use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rota_booking::ReserveRequest;
use rota_core::model::{
    CancelReason, PaymentStatus, Reservation, ReservationMode, ReservationStatus,
};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    pub trip_id: Uuid,
    pub seat_number: i32,
    pub user_id: Uuid,
    pub price_cents: i32,
    #[serde(default = "default_mode")]
    pub mode: ReservationMode,
}

fn default_mode() -> ReservationMode {
    ReservationMode::Hold
}

#[derive(Debug, Deserialize, Default)]
pub struct CancelReservationRequest {
    pub reason: Option<CancelReason>,
}

#[derive(Debug, Deserialize)]
pub struct CompletePaymentRequest {
    pub amount_cents: i32,
}

#[derive(Debug, Serialize)]
pub struct ReservationResponse {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub seat_number: i32,
    pub user_id: Uuid,
    pub status: ReservationStatus,
    pub payment_status: PaymentStatus,
    pub price_cents: i32,
    pub reserved_at: DateTime<Utc>,
    pub cancel_reason: Option<CancelReason>,
    pub ticket_number: Option<String>,
}

impl From<Reservation> for ReservationResponse {
    fn from(r: Reservation) -> Self {
        Self {
            id: r.id,
            trip_id: r.trip_id,
            seat_number: r.seat_number,
            user_id: r.user_id,
            status: r.status,
            payment_status: r.payment_status,
            price_cents: r.price_cents,
            reserved_at: r.reserved_at,
            cancel_reason: r.cancel_reason,
            ticket_number: r.ticket_number,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/reservations", post(create_reservation))
        .route("/v1/reservations/{id}/cancel", post(cancel_reservation))
        .route("/v1/reservations/{id}/payment", post(complete_payment))
}

async fn create_reservation(
    State(state): State<AppState>,
    Json(req): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ReservationResponse>), ApiError> {
    let reservation = state
        .engine
        .reserve(ReserveRequest {
            trip_id: req.trip_id,
            seat_number: req.seat_number,
            user_id: req.user_id,
            price_cents: req.price_cents,
            mode: req.mode,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(reservation.into())))
}

async fn cancel_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<CancelReservationRequest>>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let reason = body
        .and_then(|Json(req)| req.reason)
        .unwrap_or(CancelReason::UserRequest);

    let cancelled = state.engine.cancel(id, reason).await?;
    Ok(Json(cancelled.into()))
}

async fn complete_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CompletePaymentRequest>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let paid = state.engine.complete_payment(id, req.amount_cents).await?;
    Ok(Json(paid.into()))
}
