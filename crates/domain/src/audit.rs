//! Stable audit actions emitted by administrative use-cases.

use serde::{Deserialize, Serialize};

/// Identifiers recorded with every administrative mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a role is created.
    RoleCreated,
    /// Emitted when a role definition or its permission set changes.
    RoleUpdated,
    /// Emitted when a role is deleted.
    RoleDeleted,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoleCreated => "role.created",
            Self::RoleUpdated => "role.updated",
            Self::RoleDeleted => "role.deleted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AuditAction;

    #[test]
    fn actions_have_distinct_storage_values() {
        assert_ne!(
            AuditAction::RoleCreated.as_str(),
            AuditAction::RoleUpdated.as_str()
        );
    }
}
