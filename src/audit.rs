use serde_json::Value;
use uuid::Uuid;

use crate::db::DbPool;

/// Appends a row to `audit_logs` for a staff mutation.
///
/// The mutation has already committed by the time this runs, so a failed
/// write is logged and swallowed rather than surfaced to the caller.
pub async fn record(pool: &DbPool, actor: Uuid, action: &str, resource: &str, metadata: Value) {
    let inserted = sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(actor)
    .bind(action)
    .bind(resource)
    .bind(metadata)
    .execute(pool)
    .await;

    if let Err(err) = inserted {
        tracing::warn!(error = %err, action, resource, "audit log write failed");
    }
}
