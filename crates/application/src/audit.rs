//! Audit trail port shared by administrative use-cases.

use async_trait::async_trait;
use clearance_core::AppResult;
use clearance_domain::AuditAction;

/// One administrative event appended to the audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Actor subject identifier.
    pub subject: String,
    /// Stable action identifier.
    pub action: AuditAction,
    /// Kind of resource the event concerns.
    pub resource_type: String,
    /// Identifier of the affected resource.
    pub resource_id: String,
    /// Optional human-readable detail.
    pub detail: Option<String>,
}

/// Repository port for appending audit events.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Appends one event to the audit trail.
    async fn append_event(&self, event: AuditEvent) -> AppResult<()>;
}
