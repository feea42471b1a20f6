use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{NewPayoutRequest, PayoutRequest, PayoutRequestStatus, UserId};

pub async fn insert_payout_request(
    request: NewPayoutRequest,
    conn: &mut SqliteConnection,
) -> Result<PayoutRequest, sqlx::Error> {
    let request: PayoutRequest = sqlx::query_as(
        r#"
            INSERT INTO payout_requests (seller_id, amount, method, phone) VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(request.seller_id)
    .bind(request.amount)
    .bind(request.method)
    .bind(request.phone)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Payout request #{} of {} saved for {}", request.id, request.amount, request.seller_id);
    Ok(request)
}

pub async fn fetch_payout_request(id: i64, conn: &mut SqliteConnection) -> Result<Option<PayoutRequest>, sqlx::Error> {
    let request = sqlx::query_as("SELECT * FROM payout_requests WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(request)
}

pub async fn fetch_payout_requests(
    status: Option<PayoutRequestStatus>,
    conn: &mut SqliteConnection,
) -> Result<Vec<PayoutRequest>, sqlx::Error> {
    let requests = match status {
        Some(status) => {
            sqlx::query_as("SELECT * FROM payout_requests WHERE status = $1 ORDER BY id ASC")
                .bind(status)
                .fetch_all(conn)
                .await?
        },
        None => sqlx::query_as("SELECT * FROM payout_requests ORDER BY id ASC").fetch_all(conn).await?,
    };
    Ok(requests)
}

pub async fn fetch_payout_requests_for_seller(
    seller: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<PayoutRequest>, sqlx::Error> {
    let requests = sqlx::query_as("SELECT * FROM payout_requests WHERE seller_id = $1 ORDER BY id ASC")
        .bind(seller)
        .fetch_all(conn)
        .await?;
    Ok(requests)
}

/// Resolves a pending request. Returns `None` if the request does not exist or has already been resolved.
pub async fn resolve_payout_request(
    id: i64,
    status: PayoutRequestStatus,
    admin: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Option<PayoutRequest>, sqlx::Error> {
    let request = sqlx::query_as(
        r#"
            UPDATE payout_requests SET status = $1, resolved_by = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND status = 'PENDING'
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(admin)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(request)
}
