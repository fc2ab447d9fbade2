use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use rota_core::error::StoreError;
use rota_core::model::{
    AutoCancellationLog, CancelReason, Notification, NotificationKind, NotificationStatus,
    Payment, PaymentStatus, Reservation, ReservationStatus, SweepSettings, Trip, TripStatus,
};
use rota_core::pricing::{PriceChange, PriceSchedule};
use rota_core::store::{
    AutoCancelAudit, CancelOutcome, ClaimOutcome, NotificationStore, PayOutcome,
    ReservationStore, SettingsStore, TripStore,
};

const SWEEP_TIMEOUT_KEY: &str = "sweep.timeout_minutes";

/// How long a claimed notification row stays invisible to other dispatcher
/// workers before it is considered abandoned.
const CLAIM_LEASE_SECONDS: i64 = 120;

/// Postgres-backed store. Every compound operation is one transaction; the
/// seat claim and the reservation transitions are serialized by conditional
/// `UPDATE`s (and `FOR UPDATE` row locks where a read precedes the write).
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_err(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::TypeNotFound { .. } => {
            StoreError::Corrupt(e.to_string())
        }
        other => StoreError::Unavailable(other.to_string()),
    }
}

fn reservation_status_str(s: ReservationStatus) -> &'static str {
    match s {
        ReservationStatus::Reserved => "RESERVED",
        ReservationStatus::Cancelled => "CANCELLED",
        ReservationStatus::Completed => "COMPLETED",
    }
}

fn payment_status_str(s: PaymentStatus) -> &'static str {
    match s {
        PaymentStatus::Pending => "PENDING",
        PaymentStatus::Paid => "PAID",
        PaymentStatus::Refunded => "REFUNDED",
    }
}

fn cancel_reason_str(r: CancelReason) -> &'static str {
    match r {
        CancelReason::UserRequest => "USER_REQUEST",
        CancelReason::Timeout => "TIMEOUT",
        CancelReason::TripCancelled => "TRIP_CANCELLED",
    }
}

fn notification_kind_str(k: NotificationKind) -> &'static str {
    match k {
        NotificationKind::Reservation => "RESERVATION",
        NotificationKind::Payment => "PAYMENT",
        NotificationKind::Cancellation => "CANCELLATION",
        NotificationKind::Reminder => "REMINDER",
    }
}

fn notification_status_str(s: NotificationStatus) -> &'static str {
    match s {
        NotificationStatus::Pending => "PENDING",
        NotificationStatus::Sent => "SENT",
        NotificationStatus::Failed => "FAILED",
    }
}

fn parse_reservation_status(s: &str) -> Result<ReservationStatus, StoreError> {
    match s {
        "RESERVED" => Ok(ReservationStatus::Reserved),
        "CANCELLED" => Ok(ReservationStatus::Cancelled),
        "COMPLETED" => Ok(ReservationStatus::Completed),
        other => Err(StoreError::Corrupt(format!(
            "unknown reservation status '{}'",
            other
        ))),
    }
}

fn parse_payment_status(s: &str) -> Result<PaymentStatus, StoreError> {
    match s {
        "PENDING" => Ok(PaymentStatus::Pending),
        "PAID" => Ok(PaymentStatus::Paid),
        "REFUNDED" => Ok(PaymentStatus::Refunded),
        other => Err(StoreError::Corrupt(format!(
            "unknown payment status '{}'",
            other
        ))),
    }
}

fn parse_cancel_reason(s: &str) -> Result<CancelReason, StoreError> {
    match s {
        "USER_REQUEST" => Ok(CancelReason::UserRequest),
        "TIMEOUT" => Ok(CancelReason::Timeout),
        "TRIP_CANCELLED" => Ok(CancelReason::TripCancelled),
        other => Err(StoreError::Corrupt(format!(
            "unknown cancel reason '{}'",
            other
        ))),
    }
}

fn parse_notification_kind(s: &str) -> Result<NotificationKind, StoreError> {
    match s {
        "RESERVATION" => Ok(NotificationKind::Reservation),
        "PAYMENT" => Ok(NotificationKind::Payment),
        "CANCELLATION" => Ok(NotificationKind::Cancellation),
        "REMINDER" => Ok(NotificationKind::Reminder),
        other => Err(StoreError::Corrupt(format!(
            "unknown notification kind '{}'",
            other
        ))),
    }
}

fn parse_notification_status(s: &str) -> Result<NotificationStatus, StoreError> {
    match s {
        "PENDING" => Ok(NotificationStatus::Pending),
        "SENT" => Ok(NotificationStatus::Sent),
        "FAILED" => Ok(NotificationStatus::Failed),
        other => Err(StoreError::Corrupt(format!(
            "unknown notification status '{}'",
            other
        ))),
    }
}

const RESERVATION_COLUMNS: &str =
    "id, trip_id, seat_number, user_id, status, payment_status, price_cents, reserved_at, cancel_reason, ticket_number";

fn reservation_from_row(row: &PgRow) -> Result<Reservation, StoreError> {
    let status: String = row.try_get("status").map_err(store_err)?;
    let payment_status: String = row.try_get("payment_status").map_err(store_err)?;
    let cancel_reason: Option<String> = row.try_get("cancel_reason").map_err(store_err)?;
    Ok(Reservation {
        id: row.try_get("id").map_err(store_err)?,
        trip_id: row.try_get("trip_id").map_err(store_err)?,
        seat_number: row.try_get("seat_number").map_err(store_err)?,
        user_id: row.try_get("user_id").map_err(store_err)?,
        status: parse_reservation_status(&status)?,
        payment_status: parse_payment_status(&payment_status)?,
        price_cents: row.try_get("price_cents").map_err(store_err)?,
        reserved_at: row.try_get("reserved_at").map_err(store_err)?,
        cancel_reason: cancel_reason.as_deref().map(parse_cancel_reason).transpose()?,
        ticket_number: row.try_get("ticket_number").map_err(store_err)?,
    })
}

fn trip_from_row(row: &PgRow) -> Result<Trip, StoreError> {
    let status: String = row.try_get("status").map_err(store_err)?;
    Ok(Trip {
        id: row.try_get("id").map_err(store_err)?,
        origin: row.try_get("origin").map_err(store_err)?,
        destination: row.try_get("destination").map_err(store_err)?,
        departure_at: row.try_get("departure_at").map_err(store_err)?,
        status: match status.as_str() {
            "ACTIVE" => TripStatus::Active,
            "CANCELLED" => TripStatus::Cancelled,
            other => {
                return Err(StoreError::Corrupt(format!("unknown trip status '{}'", other)))
            }
        },
        base_price_cents: row.try_get("base_price_cents").map_err(store_err)?,
        price_cents: row.try_get("price_cents").map_err(store_err)?,
        seat_count: row.try_get("seat_count").map_err(store_err)?,
    })
}

fn notification_from_row(row: &PgRow) -> Result<Notification, StoreError> {
    let kind: String = row.try_get("kind").map_err(store_err)?;
    let status: String = row.try_get("status").map_err(store_err)?;
    let payload: String = row.try_get("payload").map_err(store_err)?;
    Ok(Notification {
        id: row.try_get("id").map_err(store_err)?,
        user_id: row.try_get("user_id").map_err(store_err)?,
        kind: parse_notification_kind(&kind)?,
        status: parse_notification_status(&status)?,
        retry_count: row.try_get("retry_count").map_err(store_err)?,
        payload: serde_json::from_str(&payload)
            .map_err(|e| StoreError::Corrupt(format!("bad notification payload: {}", e)))?,
        reservation_id: row.try_get("reservation_id").map_err(store_err)?,
        created_at: row.try_get("created_at").map_err(store_err)?,
        sent_at: row.try_get("sent_at").map_err(store_err)?,
        last_error: row.try_get("last_error").map_err(store_err)?,
    })
}

fn auto_cancellation_log_from_row(row: &PgRow) -> Result<AutoCancellationLog, StoreError> {
    Ok(AutoCancellationLog {
        id: row.try_get("id").map_err(store_err)?,
        reservation_id: row.try_get("reservation_id").map_err(store_err)?,
        user_id: row.try_get("user_id").map_err(store_err)?,
        reserved_at: row.try_get("reserved_at").map_err(store_err)?,
        timeout_minutes: row.try_get("timeout_minutes").map_err(store_err)?,
        cancelled_at: row.try_get("cancelled_at").map_err(store_err)?,
    })
}

#[async_trait]
impl ReservationStore for PgStore {
    async fn create_holding_seat(
        &self,
        reservation: &Reservation,
        payment: Option<&Payment>,
    ) -> Result<ClaimOutcome, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        // The single serialization point: compare-and-swap on is_reserved.
        let claimed = sqlx::query(
            "UPDATE trip_seats SET is_reserved = TRUE, reserved_at = $3 \
             WHERE trip_id = $1 AND seat_number = $2 AND is_reserved = FALSE",
        )
        .bind(reservation.trip_id)
        .bind(reservation.seat_number)
        .bind(reservation.reserved_at)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        if claimed.rows_affected() == 0 {
            let exists = sqlx::query(
                "SELECT 1 AS present FROM trip_seats WHERE trip_id = $1 AND seat_number = $2",
            )
            .bind(reservation.trip_id)
            .bind(reservation.seat_number)
            .fetch_optional(&mut *tx)
            .await
            .map_err(store_err)?;
            // Dropping tx rolls the (empty) transaction back.
            return Ok(if exists.is_some() {
                ClaimOutcome::SeatTaken
            } else {
                ClaimOutcome::SeatMissing
            });
        }

        sqlx::query(
            "INSERT INTO reservations \
             (id, trip_id, seat_number, user_id, status, payment_status, price_cents, reserved_at, ticket_number) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(reservation.id)
        .bind(reservation.trip_id)
        .bind(reservation.seat_number)
        .bind(reservation.user_id)
        .bind(reservation_status_str(reservation.status))
        .bind(payment_status_str(reservation.payment_status))
        .bind(reservation.price_cents)
        .bind(reservation.reserved_at)
        .bind(&reservation.ticket_number)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        sqlx::query(
            "INSERT INTO reservation_logs (reservation_id, action, logged_at) VALUES ($1, $2, $3)",
        )
        .bind(reservation.id)
        .bind("RESERVATION_CREATED")
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        if let Some(payment) = payment {
            insert_payment(&mut tx, payment).await?;
        }

        tx.commit().await.map_err(store_err)?;
        Ok(ClaimOutcome::Created(reservation.clone()))
    }

    async fn reservation(&self, id: Uuid) -> Result<Option<Reservation>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM reservations WHERE id = $1",
            RESERVATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.as_ref().map(reservation_from_row).transpose()
    }

    async fn cancel_releasing_seat(
        &self,
        id: Uuid,
        reason: CancelReason,
        now: DateTime<Utc>,
        audit: Option<AutoCancelAudit>,
    ) -> Result<CancelOutcome, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM reservations WHERE id = $1 FOR UPDATE",
            RESERVATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(store_err)?;

        let current = match row.as_ref().map(reservation_from_row).transpose()? {
            None => return Ok(CancelOutcome::NotFound),
            Some(current) => current,
        };

        match current.status {
            ReservationStatus::Cancelled => return Ok(CancelOutcome::AlreadyCancelled),
            ReservationStatus::Completed => return Ok(CancelOutcome::Completed),
            ReservationStatus::Reserved => {}
        }
        if audit.is_some() && current.payment_status != PaymentStatus::Pending {
            return Ok(CancelOutcome::PaidMeanwhile);
        }

        // A paid hold cancelled by the user gets its payment refunded in the
        // same write; timeout cancels never reach this point once paid.
        sqlx::query(
            "UPDATE reservations SET status = 'CANCELLED', cancel_reason = $2, \
             payment_status = CASE WHEN payment_status = 'PAID' THEN 'REFUNDED' ELSE payment_status END \
             WHERE id = $1",
        )
        .bind(id)
        .bind(cancel_reason_str(reason))
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        sqlx::query(
            "UPDATE trip_seats SET is_reserved = FALSE, reserved_at = NULL \
             WHERE trip_id = $1 AND seat_number = $2",
        )
        .bind(current.trip_id)
        .bind(current.seat_number)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        sqlx::query(
            "INSERT INTO reservation_logs (reservation_id, action, detail, logged_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind("RESERVATION_CANCELLED")
        .bind(cancel_reason_str(reason))
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        if let Some(audit) = audit {
            sqlx::query(
                "INSERT INTO auto_cancellation_logs \
                 (reservation_id, user_id, reserved_at, timeout_minutes, cancelled_at) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(id)
            .bind(current.user_id)
            .bind(current.reserved_at)
            .bind(audit.timeout_minutes)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        }

        tx.commit().await.map_err(store_err)?;

        let mut cancelled = current;
        cancelled.status = ReservationStatus::Cancelled;
        cancelled.cancel_reason = Some(reason);
        if cancelled.payment_status == PaymentStatus::Paid {
            cancelled.payment_status = PaymentStatus::Refunded;
        }
        Ok(CancelOutcome::Cancelled(cancelled))
    }

    async fn mark_paid(&self, id: Uuid, payment: &Payment) -> Result<PayOutcome, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM reservations WHERE id = $1 FOR UPDATE",
            RESERVATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(store_err)?;

        let current = match row.as_ref().map(reservation_from_row).transpose()? {
            None => return Ok(PayOutcome::NotFound),
            Some(current) => current,
        };

        if current.payment_status == PaymentStatus::Paid {
            return Ok(PayOutcome::AlreadyPaid);
        }
        match current.status {
            ReservationStatus::Cancelled => return Ok(PayOutcome::AlreadyCancelled),
            ReservationStatus::Completed => return Ok(PayOutcome::Completed),
            ReservationStatus::Reserved => {}
        }

        sqlx::query("UPDATE reservations SET payment_status = 'PAID' WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;

        insert_payment(&mut tx, payment).await?;

        tx.commit().await.map_err(store_err)?;

        let mut paid = current;
        paid.payment_status = PaymentStatus::Paid;
        Ok(PayOutcome::Paid(paid))
    }

    async fn expired_holds(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Reservation>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM reservations \
             WHERE status = 'RESERVED' AND payment_status = 'PENDING' AND reserved_at <= $1 \
             ORDER BY reserved_at ASC LIMIT $2",
            RESERVATION_COLUMNS
        ))
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.iter().map(reservation_from_row).collect()
    }

    async fn cancellation_logs(
        &self,
        user_id: Option<Uuid>,
    ) -> Result<Vec<AutoCancellationLog>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, reservation_id, user_id, reserved_at, timeout_minutes, cancelled_at \
             FROM auto_cancellation_logs \
             WHERE ($1::uuid IS NULL OR user_id = $1) \
             ORDER BY cancelled_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.iter().map(auto_cancellation_log_from_row).collect()
    }
}

async fn insert_payment(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    payment: &Payment,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO payments (id, reservation_id, amount_cents, paid_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(payment.id)
    .bind(payment.reservation_id)
    .bind(payment.amount_cents)
    .bind(payment.paid_at)
    .execute(&mut **tx)
    .await
    .map_err(store_err)?;

    sqlx::query(
        "INSERT INTO reservation_logs (reservation_id, action, logged_at) VALUES ($1, $2, $3)",
    )
    .bind(payment.reservation_id)
    .bind("PAYMENT_COMPLETED")
    .bind(Utc::now())
    .execute(&mut **tx)
    .await
    .map_err(store_err)?;

    Ok(())
}

#[async_trait]
impl TripStore for PgStore {
    async fn trip(&self, id: Uuid) -> Result<Option<Trip>, StoreError> {
        let row = sqlx::query(
            "SELECT id, origin, destination, departure_at, status, base_price_cents, price_cents, seat_count \
             FROM trips WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.as_ref().map(trip_from_row).transpose()
    }

    async fn repricing_candidates(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Vec<Uuid>, StoreError> {
        let rows = sqlx::query(
            "SELECT id FROM trips \
             WHERE status = 'ACTIVE' AND departure_at > $1 AND departure_at <= $2",
        )
        .bind(now)
        .bind(now + window)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.iter()
            .map(|row| row.try_get("id").map_err(store_err))
            .collect()
    }

    async fn apply_price_step(
        &self,
        trip_id: Uuid,
        schedule: &PriceSchedule,
    ) -> Result<Option<PriceChange>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        // Lock the trip row so occupancy is read and the price written
        // against the same snapshot.
        let row = sqlx::query(
            "SELECT id, origin, destination, departure_at, status, base_price_cents, price_cents, seat_count \
             FROM trips WHERE id = $1 FOR UPDATE",
        )
        .bind(trip_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(store_err)?;

        let trip = match row.as_ref().map(trip_from_row).transpose()? {
            None => return Ok(None),
            Some(trip) => trip,
        };

        let reserved: i64 = sqlx::query(
            "SELECT COUNT(*) AS reserved FROM trip_seats WHERE trip_id = $1 AND is_reserved = TRUE",
        )
        .bind(trip_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(store_err)?
        .try_get("reserved")
        .map_err(store_err)?;

        let occupancy = trip.occupancy(reserved);
        let new_price = match schedule.target_price(trip.base_price_cents, trip.price_cents, occupancy)
        {
            None => return Ok(None),
            Some(new_price) => new_price,
        };

        sqlx::query("UPDATE trips SET price_cents = $2 WHERE id = $1")
            .bind(trip_id)
            .bind(new_price)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;

        tx.commit().await.map_err(store_err)?;

        Ok(Some(PriceChange {
            trip_id,
            old_price_cents: trip.price_cents,
            new_price_cents: new_price,
            occupancy,
        }))
    }
}

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, kind, status, retry_count, payload, reservation_id, created_at, sent_at, last_error";

#[async_trait]
impl NotificationStore for PgStore {
    async fn enqueue(&self, notification: &Notification) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO notifications \
             (id, user_id, kind, status, retry_count, payload, reservation_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(notification_kind_str(notification.kind))
        .bind(notification_status_str(notification.status))
        .bind(notification.retry_count)
        .bind(notification.payload.to_string())
        .bind(notification.reservation_id)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn claim_pending(
        &self,
        limit: i64,
        max_retries: i32,
    ) -> Result<Vec<Notification>, StoreError> {
        // Claim step: lease the rows so concurrent dispatcher workers never
        // pick up the same notification in one cycle. Abandoned leases
        // expire and the rows become claimable again (at-least-once).
        let lease_floor = Utc::now() - Duration::seconds(CLAIM_LEASE_SECONDS);
        let rows = sqlx::query(&format!(
            "WITH claimable AS ( \
                SELECT id FROM notifications \
                WHERE status = 'PENDING' AND retry_count < $2 \
                  AND (claimed_at IS NULL OR claimed_at < $3) \
                ORDER BY created_at ASC \
                LIMIT $1 \
                FOR UPDATE SKIP LOCKED \
             ) \
             UPDATE notifications n SET claimed_at = NOW() \
             FROM claimable c WHERE n.id = c.id \
             RETURNING {}",
            NOTIFICATION_COLUMNS
        ))
        .bind(limit)
        .bind(max_retries)
        .bind(lease_floor)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.iter().map(notification_from_row).collect()
    }

    async fn mark_sent(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE notifications SET status = 'SENT', sent_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn mark_attempt_failed(
        &self,
        id: Uuid,
        error: &str,
        max_retries: i32,
    ) -> Result<NotificationStatus, StoreError> {
        let row = sqlx::query(
            "UPDATE notifications \
             SET retry_count = retry_count + 1, \
                 last_error = $2, \
                 claimed_at = NULL, \
                 status = CASE WHEN retry_count + 1 >= $3 THEN 'FAILED' ELSE 'PENDING' END \
             WHERE id = $1 \
             RETURNING status",
        )
        .bind(id)
        .bind(error)
        .bind(max_retries)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;

        let status: String = row.try_get("status").map_err(store_err)?;
        parse_notification_status(&status)
    }
}

#[async_trait]
impl SettingsStore for PgStore {
    async fn sweep_settings(&self) -> Result<SweepSettings, StoreError> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = $1")
            .bind(SWEEP_TIMEOUT_KEY)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;

        match row {
            None => Ok(SweepSettings::default()),
            Some(row) => {
                let value: String = row.try_get("value").map_err(store_err)?;
                let timeout_minutes = value.parse::<i64>().map_err(|_| {
                    StoreError::Corrupt(format!("non-numeric sweep timeout setting '{}'", value))
                })?;
                Ok(SweepSettings { timeout_minutes })
            }
        }
    }

    async fn update_sweep_settings(&self, settings: SweepSettings) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(SWEEP_TIMEOUT_KEY)
        .bind(settings.timeout_minutes.to_string())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }
}
