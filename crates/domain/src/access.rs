//! Resolved permissions and the feature access mapper.
//!
//! The mapper folds a resolved permission set into per-resource access
//! levels for UI gating. Levels only ever escalate within one computation.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{Action, Permission};

/// One granted `(resource, action)` pair, deduplicated by value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResolvedPermission {
    /// Resource the grant applies to, lowercase.
    pub resource: String,
    /// Granted action.
    pub action: Action,
}

impl ResolvedPermission {
    /// Creates a resolved pair with a normalized resource name.
    #[must_use]
    pub fn new(resource: impl Into<String>, action: Action) -> Self {
        Self {
            resource: resource.into().trim().to_lowercase(),
            action,
        }
    }

    /// Returns the `resource:action` form.
    #[must_use]
    pub fn permission_string(&self) -> String {
        format!("{}:{}", self.resource, self.action)
    }
}

impl From<&Permission> for ResolvedPermission {
    fn from(permission: &Permission) -> Self {
        Self {
            resource: permission.resource.clone(),
            action: permission.action.clone(),
        }
    }
}

/// Coarse per-resource access summary, ordered by privilege.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// No access.
    #[default]
    None,
    /// Read-only access.
    Read,
    /// Create/update/delete access.
    Write,
    /// Full control via `manage`.
    Admin,
}

impl AccessLevel {
    /// Returns the level a single action escalates a resource to.
    ///
    /// Custom actions accumulate in the action set but do not move the
    /// None/Read/Write/Admin ladder.
    #[must_use]
    pub fn for_action(action: &Action) -> Self {
        match action {
            Action::Manage => Self::Admin,
            Action::Create | Action::Update | Action::Delete => Self::Write,
            Action::Read => Self::Read,
            Action::Custom(_) => Self::None,
        }
    }
}

/// Access summary for one feature (resource).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureAccess {
    /// Feature name; matches the resource name.
    pub feature: String,
    /// Highest access level reached by the permission set.
    pub access_level: AccessLevel,
    /// Every granted action, regardless of level.
    pub actions: BTreeSet<Action>,
}

/// Folds a resolved permission set into per-feature access levels.
///
/// Monotonic: the level for a resource is the maximum over its granted
/// actions and never decreases as permissions are added.
#[must_use]
pub fn map_to_features(
    permissions: &BTreeSet<ResolvedPermission>,
) -> BTreeMap<String, FeatureAccess> {
    let mut features: BTreeMap<String, FeatureAccess> = BTreeMap::new();

    for permission in permissions {
        let entry = features
            .entry(permission.resource.clone())
            .or_insert_with(|| FeatureAccess {
                feature: permission.resource.clone(),
                access_level: AccessLevel::None,
                actions: BTreeSet::new(),
            });

        entry.access_level = entry
            .access_level
            .max(AccessLevel::for_action(&permission.action));
        entry.actions.insert(permission.action.clone());
    }

    features
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;

    use super::{AccessLevel, ResolvedPermission, map_to_features};
    use crate::Action;

    fn set(pairs: &[(&str, Action)]) -> BTreeSet<ResolvedPermission> {
        pairs
            .iter()
            .map(|(resource, action)| ResolvedPermission::new(*resource, action.clone()))
            .collect()
    }

    #[test]
    fn read_alone_maps_to_read() {
        let features = map_to_features(&set(&[("document", Action::Read)]));
        let access = features.get("document");
        assert!(access.is_some());
        assert_eq!(
            access.map(|value| value.access_level),
            Some(AccessLevel::Read)
        );
    }

    #[test]
    fn write_actions_outrank_read() {
        let features = map_to_features(&set(&[
            ("document", Action::Read),
            ("document", Action::Update),
        ]));
        assert_eq!(
            features.get("document").map(|value| value.access_level),
            Some(AccessLevel::Write)
        );
    }

    #[test]
    fn manage_is_terminal_for_the_resource() {
        let features = map_to_features(&set(&[
            ("reports", Action::Manage),
            ("reports", Action::Read),
            ("reports", Action::Delete),
        ]));
        assert_eq!(
            features.get("reports").map(|value| value.access_level),
            Some(AccessLevel::Admin)
        );
    }

    #[test]
    fn actions_accumulate_regardless_of_level() {
        let features = map_to_features(&set(&[
            ("document", Action::Manage),
            ("document", Action::Custom("export".to_owned())),
        ]));
        let actions = features
            .get("document")
            .map(|value| value.actions.len())
            .unwrap_or_default();
        assert_eq!(actions, 2);
    }

    #[test]
    fn custom_action_alone_does_not_raise_the_level() {
        let features = map_to_features(&set(&[("document", Action::Custom("export".to_owned()))]));
        assert_eq!(
            features.get("document").map(|value| value.access_level),
            Some(AccessLevel::None)
        );
    }

    #[test]
    fn resources_do_not_bleed_into_each_other() {
        let features = map_to_features(&set(&[
            ("document", Action::Manage),
            ("reports", Action::Read),
        ]));
        assert_eq!(
            features.get("reports").map(|value| value.access_level),
            Some(AccessLevel::Read)
        );
    }

    fn arbitrary_action() -> impl Strategy<Value = Action> {
        prop_oneof![
            Just(Action::Create),
            Just(Action::Read),
            Just(Action::Update),
            Just(Action::Delete),
            Just(Action::Manage),
            "[a-z]{1,8}".prop_map(Action::Custom),
        ]
    }

    proptest! {
        #[test]
        fn adding_a_permission_never_lowers_a_level(
            base in prop::collection::vec(("[a-z]{1,6}", arbitrary_action()), 0..12),
            extra_resource in "[a-z]{1,6}",
            extra_action in arbitrary_action(),
        ) {
            let before: BTreeSet<ResolvedPermission> = base
                .iter()
                .map(|(resource, action)| ResolvedPermission::new(resource.as_str(), action.clone()))
                .collect();
            let mut after = before.clone();
            after.insert(ResolvedPermission::new(extra_resource.as_str(), extra_action));

            let mapped_before = map_to_features(&before);
            let mapped_after = map_to_features(&after);

            for (resource, access) in &mapped_before {
                let level_after = mapped_after
                    .get(resource)
                    .map(|value| value.access_level)
                    .unwrap_or(AccessLevel::None);
                prop_assert!(level_after >= access.access_level);
            }
        }
    }
}
