use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{Cfa, NewProfile, Profile, UserId},
    traits::SettlementError,
};

pub async fn fetch_profile(id: &UserId, conn: &mut SqliteConnection) -> Result<Option<Profile>, sqlx::Error> {
    let profile = sqlx::query_as("SELECT * FROM profiles WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(profile)
}

/// Inserts the profile, or updates the role and commission override if it already exists.
pub async fn upsert_profile(profile: NewProfile, conn: &mut SqliteConnection) -> Result<Profile, sqlx::Error> {
    let profile: Profile = sqlx::query_as(
        r#"
            INSERT INTO profiles (id, role, commission_rate) VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                role = excluded.role,
                commission_rate = excluded.commission_rate,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(profile.id)
    .bind(profile.role)
    .bind(profile.commission_rate)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Profile {} saved as {}", profile.id, profile.role);
    Ok(profile)
}

/// Adds `delta` to the wallet balance in a single statement and returns the new balance, or `None` if the profile
/// does not exist.
///
/// A delta that would take the balance below zero is refused by the table constraint. Use [`guarded_debit`] for
/// debits, which reports that case as insufficient funds.
pub async fn increment_balance(
    id: &UserId,
    delta: Cfa,
    conn: &mut SqliteConnection,
) -> Result<Option<Cfa>, sqlx::Error> {
    let balance: Option<Cfa> = sqlx::query_scalar(
        r#"
            UPDATE profiles SET wallet_balance = wallet_balance + $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
            RETURNING wallet_balance;
        "#,
    )
    .bind(delta)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    trace!("🗃️ Balance of {id} adjusted by {delta}. New balance: {balance:?}");
    Ok(balance)
}

/// Like [`increment_balance`], but a missing profile is an error.
pub async fn credit_balance(id: &UserId, amount: Cfa, conn: &mut SqliteConnection) -> Result<Cfa, SettlementError> {
    increment_balance(id, amount, conn).await?.ok_or_else(|| SettlementError::ProfileNotFound(id.clone()))
}

/// Debits `amount` only if the current balance covers it. The check and the update are one statement.
pub async fn guarded_debit(id: &UserId, amount: Cfa, conn: &mut SqliteConnection) -> Result<Cfa, SettlementError> {
    let balance: Option<Cfa> = sqlx::query_scalar(
        r#"
            UPDATE profiles SET wallet_balance = wallet_balance - $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND wallet_balance >= $1
            RETURNING wallet_balance;
        "#,
    )
    .bind(amount)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    match balance {
        Some(b) => {
            trace!("🗃️ Debited {amount} from {id}. New balance: {b}");
            Ok(b)
        },
        None => match fetch_profile(id, conn).await? {
            Some(_) => Err(SettlementError::InsufficientFunds(id.clone(), amount)),
            None => Err(SettlementError::ProfileNotFound(id.clone())),
        },
    }
}
