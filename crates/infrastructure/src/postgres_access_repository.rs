//! PostgreSQL-backed repository for the permission catalog, the role
//! store, and user lookups.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use clearance_application::{
    CreateRoleInput, RoleAdminRepository, RoleRepository, UpdateRoleInput, UserRepository,
};
use clearance_core::{AppError, AppResult};
use clearance_domain::{Action, Permission, PermissionId, Role, RoleId, User, UserId};

mod catalog;
mod roles;
mod users;

/// PostgreSQL adapter implementing the catalog, role store, and user ports.
#[derive(Clone)]
pub struct PostgresAccessRepository {
    pool: PgPool,
}

impl PostgresAccessRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    id: Uuid,
    resource: String,
    action: String,
    name: String,
    description: String,
}

#[derive(Debug, FromRow)]
struct RoleRow {
    role_id: Uuid,
    role_name: String,
    role_description: String,
    level: i32,
    is_system_role: bool,
    permission_id: Option<Uuid>,
    resource: Option<String>,
    action: Option<String>,
    permission_name: Option<String>,
    permission_description: Option<String>,
}

#[async_trait]
impl RoleRepository for PostgresAccessRepository {
    async fn list_roles_for_user(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        self.roles_for_user_impl(user_id).await
    }
}

#[async_trait]
impl UserRepository for PostgresAccessRepository {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>> {
        self.find_user_impl(user_id).await
    }
}

#[async_trait]
impl RoleAdminRepository for PostgresAccessRepository {
    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        self.list_permissions_impl().await
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        self.list_roles_impl().await
    }

    async fn get_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        self.get_role_impl(role_id).await
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        self.find_role_by_name_impl(name).await
    }

    async fn insert_role(&self, input: CreateRoleInput) -> AppResult<Role> {
        self.insert_role_impl(input).await
    }

    async fn apply_role_changes(
        &self,
        role_id: RoleId,
        changes: UpdateRoleInput,
    ) -> AppResult<Role> {
        self.apply_role_changes_impl(role_id, changes).await
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        self.delete_role_impl(role_id).await
    }
}

/// Maps a driver error to [`AppError::Storage`] with context.
fn storage_error(context: &str, error: sqlx::Error) -> AppError {
    AppError::Storage(format!("{context}: {error}"))
}

/// Maps a unique-violation on the role name index to [`AppError::Conflict`].
fn map_role_conflict(error: sqlx::Error, name: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(format!("a role named '{name}' already exists"));
    }
    storage_error("failed to persist role", error)
}

/// Builds a catalog permission from its stored columns.
fn decode_permission(
    id: Uuid,
    resource: String,
    action: &str,
    name: String,
    description: String,
) -> AppResult<Permission> {
    let action = Action::parse(action)
        .map_err(|error| AppError::Storage(format!("failed to decode action '{action}': {error}")))?;
    Permission::new(PermissionId::from_uuid(id), resource, action, name, description)
        .map_err(|error| AppError::Storage(format!("failed to decode permission '{id}': {error}")))
}

/// Folds joined role/permission rows into roles with eager permission sets.
///
/// Rows must arrive ordered by role so grants group adjacently.
fn aggregate_roles(rows: Vec<RoleRow>) -> AppResult<Vec<Role>> {
    let mut roles: Vec<Role> = Vec::new();

    for row in rows {
        let is_new_role = roles
            .last()
            .map(|role| role.id.as_uuid() != row.role_id)
            .unwrap_or(true);
        if is_new_role {
            roles.push(Role {
                id: RoleId::from_uuid(row.role_id),
                name: row.role_name,
                description: row.role_description,
                level: row.level,
                is_system_role: row.is_system_role,
                permissions: Vec::new(),
            });
        }

        if let (Some(id), Some(resource), Some(action)) =
            (row.permission_id, row.resource, row.action)
        {
            let permission = decode_permission(
                id,
                resource,
                action.as_str(),
                row.permission_name.unwrap_or_default(),
                row.permission_description.unwrap_or_default(),
            )?;
            if let Some(role) = roles.last_mut() {
                role.permissions.push(permission);
            }
        }
    }

    Ok(roles)
}
