//! PostgreSQL-backed audit trail.

use async_trait::async_trait;
use sqlx::PgPool;

use clearance_application::{AuditEvent, AuditRepository};
use clearance_core::{AppError, AppResult};

/// Append-only audit sink writing to the `audit_events` table.
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    /// Creates an audit sink with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO audit_events (subject, action, resource_type, resource_id, detail)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(&event.subject)
        .bind(event.action.as_str())
        .bind(&event.resource_type)
        .bind(&event.resource_id)
        .bind(&event.detail)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to append audit event: {error}")))?;
        Ok(())
    }
}
