use sqlx::SqliteConnection;

use crate::db_types::{AuditLogEntry, NewAuditLogEntry};

pub async fn insert_entry(entry: NewAuditLogEntry, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO audit_log (actor, action, entity, entity_id, detail) VALUES ($1, $2, $3, $4, $5)")
        .bind(entry.actor)
        .bind(entry.action)
        .bind(entry.entity)
        .bind(entry.entity_id)
        .bind(entry.detail)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn fetch_entries(
    entity: &str,
    entity_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<AuditLogEntry>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT * FROM audit_log WHERE entity = $1 AND entity_id = $2 ORDER BY id ASC")
        .bind(entity)
        .bind(entity_id)
        .fetch_all(conn)
        .await?;
    Ok(entries)
}
