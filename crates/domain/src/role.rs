//! Role definitions: named, ranked bundles of catalog permissions.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Permission;

/// Unique identifier for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleId(Uuid);

impl RoleId {
    /// Creates a new random role identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a role identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RoleId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A named bundle of permissions with an integer authority rank.
///
/// There is no role-to-role inheritance; the only cross-role privilege
/// amplification is the level-bypass rule applied by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Stable role identifier.
    pub id: RoleId,
    /// Unique role name (case-insensitive among live roles).
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Integer authority rank driving the privileged-bypass rule.
    pub level: i32,
    /// Marks a built-in role that must never be deleted or renamed.
    pub is_system_role: bool,
    /// Effective permission set, eagerly loaded.
    pub permissions: Vec<Permission>,
}

impl Role {
    /// Returns whether the role's rank meets the given threshold.
    #[must_use]
    pub fn has_level_at_least(&self, threshold: i32) -> bool {
        self.level >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::{Role, RoleId};

    #[test]
    fn level_threshold_is_inclusive() {
        let role = Role {
            id: RoleId::new(),
            name: "SuperAdmin".to_owned(),
            description: String::new(),
            level: 90,
            is_system_role: true,
            permissions: Vec::new(),
        };
        assert!(role.has_level_at_least(90));
        assert!(!role.has_level_at_least(91));
    }
}
