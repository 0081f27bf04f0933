//! Permission resolution and the page/action guard.
//!
//! The resolver merges two sources: live roles from the store (the
//! authority) and the claims snapshot from the caller's token (a cache that
//! may lag a just-changed role until reissue). A request is authorized if
//! either source grants it.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use clearance_core::{AppError, AppResult};
use clearance_domain::{Action, Claims, ResolvedPermission, Role, UserId};

/// Live roles with `level >= threshold` bypass permission checks entirely.
pub const DEFAULT_ADMIN_LEVEL_THRESHOLD: i32 = 90;

/// Repository port for live role lookups.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Lists the roles assigned to a user, with eager permission sets.
    async fn list_roles_for_user(&self, user_id: UserId) -> AppResult<Vec<Role>>;
}

/// The identity a permission question is asked about: a user id plus the
/// best-effort claims decoded from the request's token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    user_id: UserId,
    claims: Claims,
}

impl Subject {
    /// Creates a subject from a user id and decoded claims.
    #[must_use]
    pub fn new(user_id: UserId, claims: Claims) -> Self {
        Self { user_id, claims }
    }

    /// Creates a subject with no token attached.
    #[must_use]
    pub fn without_claims(user_id: UserId) -> Self {
        Self::new(user_id, Claims::empty())
    }

    /// Returns the subject's user id.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the decoded claims snapshot.
    #[must_use]
    pub fn claims(&self) -> &Claims {
        &self.claims
    }
}

/// Outcome of a point-in-time permission check.
///
/// "Not authorized" is a normal result, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    /// Whether the action is allowed.
    pub allowed: bool,
    /// Human-readable denial reason.
    pub reason: Option<String>,
    /// The missing `resource:action` pair on denial.
    pub required_permission: Option<String>,
}

impl AccessDecision {
    /// Returns an allow decision.
    #[must_use]
    pub fn granted() -> Self {
        Self {
            allowed: true,
            reason: None,
            required_permission: None,
        }
    }

    /// Returns a deny decision naming the missing permission.
    #[must_use]
    pub fn denied(resource: &str, action: &Action) -> Self {
        Self {
            allowed: false,
            reason: Some("Permission denied".to_owned()),
            required_permission: Some(format!("{resource}:{action}")),
        }
    }
}

/// Combination mode for multi-permission guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardMode {
    /// At least one required permission must be granted.
    Any,
    /// Every required permission must be granted.
    All,
}

/// Tunables for the resolver's bypass rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationConfig {
    /// Role level at and above which every check is allowed.
    pub admin_level_threshold: i32,
    /// Claim role names that bypass checks, matched case-insensitively.
    pub admin_role_names: Vec<String>,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            admin_level_threshold: DEFAULT_ADMIN_LEVEL_THRESHOLD,
            admin_role_names: vec![
                "admin".to_owned(),
                "super_admin".to_owned(),
                "administrator".to_owned(),
            ],
        }
    }
}

/// Unions live role permissions with the claim snapshot, deduplicated by
/// `(resource, action)` pair.
#[must_use]
pub fn union_permissions(roles: &[Role], claims: &Claims) -> BTreeSet<ResolvedPermission> {
    let mut resolved: BTreeSet<ResolvedPermission> = roles
        .iter()
        .flat_map(|role| role.permissions.iter().map(ResolvedPermission::from))
        .collect();
    resolved.extend(claims.resolved_permissions());
    resolved
}

/// Application service answering allow/deny questions.
#[derive(Clone)]
pub struct AuthorizationService {
    repository: Arc<dyn RoleRepository>,
    config: AuthorizationConfig,
}

impl AuthorizationService {
    /// Creates a service with the default bypass configuration.
    #[must_use]
    pub fn new(repository: Arc<dyn RoleRepository>) -> Self {
        Self::with_config(repository, AuthorizationConfig::default())
    }

    /// Creates a service with explicit bypass configuration.
    #[must_use]
    pub fn with_config(repository: Arc<dyn RoleRepository>, config: AuthorizationConfig) -> Self {
        Self { repository, config }
    }

    /// Answers whether the subject may perform `action` on `resource`.
    ///
    /// Order, first match wins: live-role level bypass, claims role-name
    /// bypass, then the lenient union of live and claim permissions with
    /// `manage` implying every action on its resource. A store failure
    /// propagates as [`AppError::Storage`] after one retry; it never
    /// degrades to a silent allow or deny.
    pub async fn check_permission(
        &self,
        subject: &Subject,
        resource: &str,
        action: &Action,
    ) -> AppResult<AccessDecision> {
        let resource = resource.trim().to_lowercase();
        let roles = self.load_roles(subject.user_id()).await?;

        if roles
            .iter()
            .any(|role| role.has_level_at_least(self.config.admin_level_threshold))
        {
            return Ok(AccessDecision::granted());
        }

        if subject
            .claims()
            .has_any_role_named(&self.config.admin_role_names)
        {
            return Ok(AccessDecision::granted());
        }

        let resolved = union_permissions(&roles, subject.claims());
        let requested = ResolvedPermission::new(resource.as_str(), action.clone());
        let manage = ResolvedPermission::new(resource.as_str(), Action::Manage);

        if resolved.contains(&requested) || resolved.contains(&manage) {
            return Ok(AccessDecision::granted());
        }

        tracing::debug!(
            user_id = %subject.user_id(),
            required = %requested.permission_string(),
            "permission denied"
        );
        Ok(AccessDecision::denied(&resource, action))
    }

    /// Ensures the subject holds the permission, mapping denial to
    /// [`AppError::PermissionDenied`].
    pub async fn require_permission(
        &self,
        subject: &Subject,
        resource: &str,
        action: &Action,
    ) -> AppResult<()> {
        let decision = self.check_permission(subject, resource, action).await?;
        if decision.allowed {
            return Ok(());
        }

        Err(AppError::PermissionDenied(format!(
            "user '{}' is missing permission '{}'",
            subject.user_id(),
            decision
                .required_permission
                .unwrap_or_else(|| format!("{resource}:{action}"))
        )))
    }

    /// Page/action guard: composes [`Self::check_permission`] over a list
    /// of `"resource:action"` strings.
    ///
    /// An empty list always authorizes. Malformed entries count as not
    /// granted.
    pub async fn authorize(
        &self,
        subject: &Subject,
        required_permissions: &[&str],
        mode: GuardMode,
    ) -> AppResult<bool> {
        if required_permissions.is_empty() {
            return Ok(true);
        }

        for entry in required_permissions {
            let allowed = match Claims::parse_permission(entry) {
                Some(required) => {
                    self.check_permission(subject, &required.resource, &required.action)
                        .await?
                        .allowed
                }
                None => false,
            };

            match mode {
                GuardMode::All if !allowed => return Ok(false),
                GuardMode::Any if allowed => return Ok(true),
                _ => {}
            }
        }

        Ok(matches!(mode, GuardMode::All))
    }

    /// Loads live roles, retrying once on a transient storage failure.
    async fn load_roles(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        match self.repository.list_roles_for_user(user_id).await {
            Err(AppError::Storage(error)) => {
                tracing::warn!(%user_id, %error, "role fetch failed, retrying once");
                self.repository.list_roles_for_user(user_id).await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests;
