//! In-memory adapter backing tests and local development.
//!
//! Mirrors the PostgreSQL adapter's semantics: case-insensitive role
//! name uniqueness, full-replace permission updates, and cascade
//! removal of user assignments on role deletion.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use clearance_application::{
    AuditEvent, AuditRepository, CreateRoleInput, RoleAdminRepository, RoleRepository,
    UpdateRoleInput, UserRepository,
};
use clearance_core::{AppError, AppResult};
use clearance_domain::{Permission, PermissionId, Role, RoleId, User, UserId};


/// In-memory store implementing every repository port.
#[derive(Default)]
pub struct InMemoryAccessStore {
    catalog: RwLock<Vec<Permission>>,
    roles: RwLock<Vec<Role>>,
    users: RwLock<HashMap<UserId, User>>,
    user_roles: RwLock<Vec<(UserId, RoleId)>>,
    events: RwLock<Vec<AuditEvent>>,
}

impl InMemoryAccessStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds permissions to the catalog.
    pub async fn seed_permissions(&self, permissions: Vec<Permission>) {
        self.catalog.write().await.extend(permissions);
    }

    /// Adds a role directly, bypassing admin validation.
    pub async fn seed_role(&self, role: Role) {
        self.roles.write().await.push(role);
    }

    /// Adds a user.
    pub async fn seed_user(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }

    /// Assigns a stored role to a user.
    pub async fn assign_role(&self, user_id: UserId, role_id: RoleId) {
        let mut links = self.user_roles.write().await;
        if !links.contains(&(user_id, role_id)) {
            links.push((user_id, role_id));
        }
    }

    /// Returns a snapshot of the audit trail.
    pub async fn audit_events(&self) -> Vec<AuditEvent> {
        self.events.read().await.clone()
    }

    async fn resolve_permissions(&self, ids: &[PermissionId]) -> AppResult<Vec<Permission>> {
        let catalog = self.catalog.read().await;
        ids.iter()
            .map(|id| {
                catalog
                    .iter()
                    .find(|permission| permission.id == *id)
                    .cloned()
                    .ok_or_else(|| {
                        AppError::Storage(format!("permission '{id}' violates catalog reference"))
                    })
            })
            .collect()
    }
}

#[async_trait]
impl RoleRepository for InMemoryAccessStore {
    async fn list_roles_for_user(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        let links = self.user_roles.read().await;
        let roles = self.roles.read().await;
        Ok(links
            .iter()
            .filter(|(linked_user, _)| *linked_user == user_id)
            .filter_map(|(_, role_id)| roles.iter().find(|role| role.id == *role_id).cloned())
            .collect())
    }
}

#[async_trait]
impl UserRepository for InMemoryAccessStore {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>> {
        let user = self.users.read().await.get(&user_id).cloned();
        let Some(mut user) = user else {
            return Ok(None);
        };
        user.roles = self.list_roles_for_user(user_id).await?;
        Ok(Some(user))
    }
}

#[async_trait]
impl RoleAdminRepository for InMemoryAccessStore {
    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        Ok(self.catalog.read().await.clone())
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let mut roles = self.roles.read().await.clone();
        roles.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(roles)
    }

    async fn get_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self
            .roles
            .read()
            .await
            .iter()
            .find(|role| role.id == role_id)
            .cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        Ok(self
            .roles
            .read()
            .await
            .iter()
            .find(|role| role.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn insert_role(&self, input: CreateRoleInput) -> AppResult<Role> {
        let permissions = self.resolve_permissions(&input.permission_ids).await?;
        let mut roles = self.roles.write().await;
        if roles
            .iter()
            .any(|role| role.name.eq_ignore_ascii_case(input.name.trim()))
        {
            return Err(AppError::Conflict(format!(
                "a role named '{}' already exists",
                input.name
            )));
        }
        let role = Role {
            id: RoleId::new(),
            name: input.name.trim().to_owned(),
            description: input.description,
            level: input.level,
            is_system_role: false,
            permissions,
        };
        roles.push(role.clone());
        Ok(role)
    }

    async fn apply_role_changes(
        &self,
        role_id: RoleId,
        changes: UpdateRoleInput,
    ) -> AppResult<Role> {
        let permissions = match &changes.permission_ids {
            Some(ids) => Some(self.resolve_permissions(ids).await?),
            None => None,
        };

        let mut roles = self.roles.write().await;
        if let Some(new_name) = changes.name.as_deref().map(str::trim)
            && roles
                .iter()
                .any(|role| role.id != role_id && role.name.eq_ignore_ascii_case(new_name))
        {
            return Err(AppError::Conflict(format!(
                "a role named '{new_name}' already exists"
            )));
        }

        let role = roles
            .iter_mut()
            .find(|role| role.id == role_id)
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))?;

        if let Some(name) = changes.name {
            role.name = name.trim().to_owned();
        }
        if let Some(description) = changes.description {
            role.description = description;
        }
        if let Some(level) = changes.level {
            role.level = level;
        }
        if let Some(permissions) = permissions {
            role.permissions = permissions;
        }
        Ok(role.clone())
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        // The roles guard must be released before touching user_roles;
        // list_roles_for_user takes user_roles first, then roles.
        {
            let mut roles = self.roles.write().await;
            let before = roles.len();
            roles.retain(|role| role.id != role_id);
            if roles.len() == before {
                return Err(AppError::NotFound(format!("role '{role_id}' does not exist")));
            }
        }
        self.user_roles
            .write()
            .await
            .retain(|(_, linked_role)| *linked_role != role_id);
        Ok(())
    }
}

#[async_trait]
impl AuditRepository for InMemoryAccessStore {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.events.write().await.push(event);
        Ok(())
    }
}
