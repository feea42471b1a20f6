use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{Cfa, NewWalletTransaction, TransactionType, UserId, WalletTransaction};

/// Appends a row to the ledger. Balances are not touched.
pub async fn insert_transaction(
    tx: NewWalletTransaction,
    conn: &mut SqliteConnection,
) -> Result<WalletTransaction, sqlx::Error> {
    let meta = tx.meta.map(|m| m.to_string());
    let row: WalletTransaction = sqlx::query_as(
        r#"
            INSERT INTO wallet_transactions (user_id, tx_type, amount, status, reference, meta)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(tx.user_id)
    .bind(tx.tx_type)
    .bind(tx.amount)
    .bind(tx.status)
    .bind(tx.reference)
    .bind(meta)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Ledger row #{} recorded: {} {} for {} ({})", row.id, row.tx_type, row.amount, row.user_id, row.status);
    Ok(row)
}

pub async fn fetch_transactions_for_user(
    user: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<WalletTransaction>, sqlx::Error> {
    let rows = sqlx::query_as("SELECT * FROM wallet_transactions WHERE user_id = $1 ORDER BY id ASC")
        .bind(user)
        .fetch_all(conn)
        .await?;
    Ok(rows)
}

pub async fn fetch_transactions_by_reference(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<WalletTransaction>, sqlx::Error> {
    let rows = sqlx::query_as("SELECT * FROM wallet_transactions WHERE reference = $1 ORDER BY id ASC")
        .bind(reference)
        .fetch_all(conn)
        .await?;
    Ok(rows)
}

/// Moves every pending row of the given type and reference to `COMPLETED`, returning the rows that changed.
pub async fn complete_pending(
    reference: &str,
    tx_type: TransactionType,
    conn: &mut SqliteConnection,
) -> Result<Vec<WalletTransaction>, sqlx::Error> {
    let rows = sqlx::query_as(
        r#"
            UPDATE wallet_transactions SET status = 'COMPLETED', updated_at = CURRENT_TIMESTAMP
            WHERE reference = $1 AND tx_type = $2 AND status = 'PENDING'
            RETURNING *;
        "#,
    )
    .bind(reference)
    .bind(tx_type)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// Completes the pending top-up that was initiated as `transaction_id` under `reference`.
pub async fn complete_recharge(
    reference: &str,
    transaction_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<WalletTransaction>, sqlx::Error> {
    let row = sqlx::query_as(
        r#"
            UPDATE wallet_transactions SET status = 'COMPLETED', updated_at = CURRENT_TIMESTAMP
            WHERE reference = $1 AND tx_type = 'RECHARGE' AND status = 'PENDING'
              AND json_extract(meta, '$.transaction_id') = $2
            RETURNING *;
        "#,
    )
    .bind(reference)
    .bind(transaction_id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

/// Sum of the rows that count towards the balance: completed rows, and debits that are still pending.
pub async fn ledger_balance(user: &UserId, conn: &mut SqliteConnection) -> Result<Cfa, sqlx::Error> {
    let total: i64 = sqlx::query_scalar(
        r#"
            SELECT COALESCE(SUM(amount), 0) FROM wallet_transactions
            WHERE user_id = $1 AND (status = 'COMPLETED' OR amount < 0);
        "#,
    )
    .bind(user)
    .fetch_one(conn)
    .await?;
    Ok(Cfa::from(total))
}
