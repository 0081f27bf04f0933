//! Ephemeral claims decoded from a caller's signed access token.
//!
//! Claims are a fast-path cache of the store, never the authority. They may
//! lag a just-changed role until token reissue, which is why the resolver
//! unions them with live data instead of picking one source.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Action, DepartmentId, ResolvedPermission, RoleId};

/// Decoded token payload snapshot. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Claims {
    /// Stable subject identifier, when the token carried one.
    pub subject_id: Option<String>,
    /// Role names embedded at token issue time.
    pub role_names: Vec<String>,
    /// Permission strings, each `"resource:action"`.
    pub permission_strings: Vec<String>,
    /// Role identifiers embedded at token issue time.
    pub role_ids: Vec<RoleId>,
    /// Department membership at issue time.
    pub department_id: Option<DepartmentId>,
    /// Department name at issue time.
    pub department_name: Option<String>,
    /// Token expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Claims {
    /// Returns an empty claim set, the degraded form for malformed tokens.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns whether the claim set carries no useful data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subject_id.is_none()
            && self.role_names.is_empty()
            && self.permission_strings.is_empty()
            && self.role_ids.is_empty()
    }

    /// Parses one `"resource:action"` string.
    ///
    /// Returns `None` for anything malformed; claim parsing is best-effort
    /// and never fatal.
    #[must_use]
    pub fn parse_permission(value: &str) -> Option<ResolvedPermission> {
        let (resource, action) = value.split_once(':')?;
        let resource = resource.trim().to_lowercase();
        if resource.is_empty() {
            return None;
        }
        let action = Action::parse(action).ok()?;
        Some(ResolvedPermission::new(resource, action))
    }

    /// Returns the well-formed permission pairs embedded in the claims.
    #[must_use]
    pub fn resolved_permissions(&self) -> BTreeSet<ResolvedPermission> {
        self.permission_strings
            .iter()
            .filter_map(|value| Self::parse_permission(value))
            .collect()
    }

    /// Case-insensitively matches the claim role names against a name list.
    #[must_use]
    pub fn has_any_role_named(&self, names: &[String]) -> bool {
        self.role_names.iter().any(|role_name| {
            names
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(role_name))
        })
    }
}
