//! Role and permission administration.
//!
//! All validation happens before any mutation is attempted: duplicate
//! names, unknown permission ids, and system-role protections surface
//! synchronously so the repository never sees a half-valid write.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use clearance_core::{AppError, AppResult, NonEmptyString};
use clearance_domain::{
    Action, AuditAction, Permission, PermissionId, ResourceSelection, Role, RoleId,
};

use crate::audit::{AuditEvent, AuditRepository};
use crate::authorization_service::{AuthorizationService, Subject};

/// Resource guarding the administration surface itself.
const ROLES_RESOURCE: &str = "roles";

/// Input payload for creating a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleInput {
    /// Unique role name (case-insensitive among live roles).
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Integer authority rank.
    pub level: i32,
    /// Catalog permissions to attach.
    pub permission_ids: Vec<PermissionId>,
}

/// Partial update for an existing role.
///
/// A present `permission_ids` field is a full replace of the role's
/// assignment, applied atomically by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateRoleInput {
    /// New role name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New authority rank.
    pub level: Option<i32>,
    /// Full replacement permission set.
    pub permission_ids: Option<Vec<PermissionId>>,
}

/// Repository port for the catalog and the role store.
#[async_trait]
pub trait RoleAdminRepository: Send + Sync {
    /// Lists the permission catalog.
    async fn list_permissions(&self) -> AppResult<Vec<Permission>>;

    /// Lists all roles with eager permission sets.
    async fn list_roles(&self) -> AppResult<Vec<Role>>;

    /// Finds a role by id.
    async fn get_role(&self, role_id: RoleId) -> AppResult<Option<Role>>;

    /// Finds a role by name, case-insensitively.
    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>>;

    /// Inserts a role and its permission links in one transaction.
    async fn insert_role(&self, input: CreateRoleInput) -> AppResult<Role>;

    /// Applies changes to a role. When `permission_ids` is present the
    /// existing links are deleted and the new set inserted atomically;
    /// concurrent readers never observe the role with zero permissions
    /// mid-update.
    async fn apply_role_changes(&self, role_id: RoleId, changes: UpdateRoleInput)
    -> AppResult<Role>;

    /// Deletes a role and its permission links.
    async fn delete_role(&self, role_id: RoleId) -> AppResult<()>;
}

/// Application service orchestrating role and permission administration.
#[derive(Clone)]
pub struct RoleAdminService {
    authorization: AuthorizationService,
    repository: Arc<dyn RoleAdminRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl RoleAdminService {
    /// Creates a service from its dependencies.
    #[must_use]
    pub fn new(
        authorization: AuthorizationService,
        repository: Arc<dyn RoleAdminRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            authorization,
            repository,
            audit_repository,
        }
    }

    /// Returns the permission catalog.
    pub async fn list_permissions(&self, actor: &Subject) -> AppResult<Vec<Permission>> {
        self.require_manage(actor).await?;
        self.repository.list_permissions().await
    }

    /// Returns every role with its permission set.
    pub async fn list_roles(&self, actor: &Subject) -> AppResult<Vec<Role>> {
        self.require_manage(actor).await?;
        self.repository.list_roles().await
    }

    /// Returns one role by id.
    pub async fn get_role(&self, actor: &Subject, role_id: RoleId) -> AppResult<Role> {
        self.require_manage(actor).await?;
        self.repository
            .get_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))
    }

    /// Creates a role after validating name uniqueness and permission ids.
    pub async fn create_role(&self, actor: &Subject, input: CreateRoleInput) -> AppResult<Role> {
        self.require_manage(actor).await?;

        let name = NonEmptyString::new(input.name.clone())?;
        if self
            .repository
            .find_role_by_name(name.as_str())
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "a role named '{}' already exists",
                name.as_str()
            )));
        }
        self.ensure_permission_ids_resolve(&input.permission_ids)
            .await?;

        let role = self.repository.insert_role(input).await?;

        self.append_role_event(
            actor,
            AuditAction::RoleCreated,
            &role,
            format!("created role '{}'", role.name),
        )
        .await?;

        Ok(role)
    }

    /// Updates a role. A present `permission_ids` field fully replaces the
    /// role's assignment.
    pub async fn update_role(
        &self,
        actor: &Subject,
        role_id: RoleId,
        changes: UpdateRoleInput,
    ) -> AppResult<Role> {
        self.require_manage(actor).await?;

        let existing = self
            .repository
            .get_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))?;

        if let Some(new_name) = &changes.name {
            let new_name = NonEmptyString::new(new_name.clone())?;
            // Only the byte-identical name is "not a rename"; a case-only
            // change still renames the role and persists the new casing.
            if new_name.as_str() != existing.name {
                if existing.is_system_role {
                    return Err(AppError::PermissionDenied(format!(
                        "system role '{}' cannot be renamed",
                        existing.name
                    )));
                }
                if let Some(other) = self.repository.find_role_by_name(new_name.as_str()).await?
                    && other.id != role_id
                {
                    return Err(AppError::Conflict(format!(
                        "a role named '{}' already exists",
                        new_name.as_str()
                    )));
                }
            }
        }

        if let Some(permission_ids) = &changes.permission_ids {
            self.ensure_permission_ids_resolve(permission_ids).await?;
        }

        let role = self.repository.apply_role_changes(role_id, changes).await?;

        self.append_role_event(
            actor,
            AuditAction::RoleUpdated,
            &role,
            format!("updated role '{}'", role.name),
        )
        .await?;

        Ok(role)
    }

    /// Replaces a role's permission set from a matrix persistence payload.
    pub async fn apply_matrix_selection(
        &self,
        actor: &Subject,
        role_id: RoleId,
        payload: &[ResourceSelection],
    ) -> AppResult<Role> {
        let permission_ids: Vec<PermissionId> = payload
            .iter()
            .flat_map(|selection| selection.actions.iter().map(|selected| selected.id))
            .collect();

        if permission_ids.is_empty() {
            return Err(AppError::Validation(
                "the matrix has no selected permissions".to_owned(),
            ));
        }

        self.update_role(
            actor,
            role_id,
            UpdateRoleInput {
                permission_ids: Some(permission_ids),
                ..UpdateRoleInput::default()
            },
        )
        .await
    }

    /// Deletes a role. System roles are never deletable.
    pub async fn delete_role(&self, actor: &Subject, role_id: RoleId) -> AppResult<()> {
        self.require_manage(actor).await?;

        let role = self
            .repository
            .get_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))?;

        if role.is_system_role {
            return Err(AppError::PermissionDenied(format!(
                "system role '{}' cannot be deleted",
                role.name
            )));
        }

        self.repository.delete_role(role_id).await?;

        self.append_role_event(
            actor,
            AuditAction::RoleDeleted,
            &role,
            format!("deleted role '{}'", role.name),
        )
        .await
    }

    async fn require_manage(&self, actor: &Subject) -> AppResult<()> {
        self.authorization
            .require_permission(actor, ROLES_RESOURCE, &Action::Manage)
            .await
    }

    async fn ensure_permission_ids_resolve(
        &self,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        if permission_ids.is_empty() {
            return Ok(());
        }

        let catalog: BTreeSet<PermissionId> = self
            .repository
            .list_permissions()
            .await?
            .into_iter()
            .map(|permission| permission.id)
            .collect();

        for id in permission_ids {
            if !catalog.contains(id) {
                return Err(AppError::Validation(format!(
                    "permission '{id}' does not exist in the catalog"
                )));
            }
        }

        Ok(())
    }

    async fn append_role_event(
        &self,
        actor: &Subject,
        action: AuditAction,
        role: &Role,
        detail: String,
    ) -> AppResult<()> {
        self.audit_repository
            .append_event(AuditEvent {
                subject: actor.user_id().to_string(),
                action,
                resource_type: "role".to_owned(),
                resource_id: role.id.to_string(),
                detail: Some(detail),
            })
            .await
    }
}
