use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{Cfa, GatewayPayment, NewGatewayPayment};

/// Stores the payment unless one with the same processor transaction id already exists. Returns the stored row and
/// whether this call inserted it.
pub async fn idempotent_insert(
    payment: NewGatewayPayment,
    conn: &mut SqliteConnection,
) -> Result<(GatewayPayment, bool), sqlx::Error> {
    if let Some(existing) = fetch_by_transaction_id(&payment.transaction_id, conn).await? {
        debug!("🗃️ Gateway payment {} already recorded", existing.transaction_id);
        return Ok((existing, false));
    }
    let payment: GatewayPayment = sqlx::query_as(
        r#"
            INSERT INTO gateway_payments (transaction_id, reference, amount, phone) VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(payment.transaction_id)
    .bind(payment.reference)
    .bind(payment.amount)
    .bind(payment.phone)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Gateway payment {} recorded for [{}]", payment.transaction_id, payment.reference);
    Ok((payment, true))
}

pub async fn fetch_by_transaction_id(
    transaction_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<GatewayPayment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM gateway_payments WHERE transaction_id = $1")
        .bind(transaction_id)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

pub async fn fetch_for_reference(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<GatewayPayment>, sqlx::Error> {
    let payments = sqlx::query_as("SELECT * FROM gateway_payments WHERE reference = $1 ORDER BY id ASC")
        .bind(reference)
        .fetch_all(conn)
        .await?;
    Ok(payments)
}

/// Flips the payment for `transaction_id` from pending to confirmed. Returns `None` if there is no such payment or
/// it was already confirmed.
pub async fn confirm(transaction_id: &str, conn: &mut SqliteConnection) -> Result<Option<GatewayPayment>, sqlx::Error> {
    let payment = sqlx::query_as(
        r#"
            UPDATE gateway_payments SET status = 'CONFIRMED', updated_at = CURRENT_TIMESTAMP
            WHERE transaction_id = $1 AND status = 'PENDING'
            RETURNING *;
        "#,
    )
    .bind(transaction_id)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

/// The sum of every confirmed payment made against `reference`.
pub async fn confirmed_total(reference: &str, conn: &mut SqliteConnection) -> Result<Cfa, sqlx::Error> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0) FROM gateway_payments WHERE reference = $1 AND status = 'CONFIRMED'",
    )
    .bind(reference)
    .fetch_one(conn)
    .await?;
    Ok(Cfa::from(total))
}
