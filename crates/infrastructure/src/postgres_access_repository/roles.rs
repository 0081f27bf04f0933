use super::*;

const ROLE_COLUMNS: &str = r"
    roles.id AS role_id,
    roles.name AS role_name,
    roles.description AS role_description,
    roles.level,
    roles.is_system_role,
    permissions.id AS permission_id,
    permissions.resource,
    permissions.action,
    permissions.name AS permission_name,
    permissions.description AS permission_description
";

impl PostgresAccessRepository {
    pub(super) async fn list_roles_impl(&self) -> AppResult<Vec<Role>> {
        let query = format!(
            r"
            SELECT {ROLE_COLUMNS}
            FROM roles
            LEFT JOIN role_permissions ON role_permissions.role_id = roles.id
            LEFT JOIN permissions ON permissions.id = role_permissions.permission_id
            ORDER BY roles.name, roles.id, permissions.resource, permissions.action
            "
        );
        let rows = sqlx::query_as::<_, RoleRow>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| storage_error("failed to list roles", error))?;
        aggregate_roles(rows)
    }

    pub(super) async fn get_role_impl(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        let query = format!(
            r"
            SELECT {ROLE_COLUMNS}
            FROM roles
            LEFT JOIN role_permissions ON role_permissions.role_id = roles.id
            LEFT JOIN permissions ON permissions.id = role_permissions.permission_id
            WHERE roles.id = $1
            ORDER BY permissions.resource, permissions.action
            "
        );
        let rows = sqlx::query_as::<_, RoleRow>(&query)
            .bind(role_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|error| storage_error("failed to load role", error))?;
        Ok(aggregate_roles(rows)?.into_iter().next())
    }

    pub(super) async fn find_role_by_name_impl(&self, name: &str) -> AppResult<Option<Role>> {
        let query = format!(
            r"
            SELECT {ROLE_COLUMNS}
            FROM roles
            LEFT JOIN role_permissions ON role_permissions.role_id = roles.id
            LEFT JOIN permissions ON permissions.id = role_permissions.permission_id
            WHERE LOWER(roles.name) = LOWER($1)
            ORDER BY permissions.resource, permissions.action
            "
        );
        let rows = sqlx::query_as::<_, RoleRow>(&query)
            .bind(name)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| storage_error("failed to look up role by name", error))?;
        Ok(aggregate_roles(rows)?.into_iter().next())
    }

    pub(super) async fn roles_for_user_impl(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        let query = format!(
            r"
            SELECT {ROLE_COLUMNS}
            FROM user_roles
            JOIN roles ON roles.id = user_roles.role_id
            LEFT JOIN role_permissions ON role_permissions.role_id = roles.id
            LEFT JOIN permissions ON permissions.id = role_permissions.permission_id
            WHERE user_roles.user_id = $1
            ORDER BY roles.name, roles.id, permissions.resource, permissions.action
            "
        );
        let rows = sqlx::query_as::<_, RoleRow>(&query)
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|error| storage_error("failed to load roles for user", error))?;
        aggregate_roles(rows)
    }

    pub(super) async fn insert_role_impl(&self, input: CreateRoleInput) -> AppResult<Role> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|error| storage_error("failed to open transaction", error))?;

        let role_id = sqlx::query_scalar::<_, Uuid>(
            r"
            INSERT INTO roles (name, description, level, is_system_role)
            VALUES ($1, $2, $3, false)
            RETURNING id
            ",
        )
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(input.level)
        .fetch_one(&mut *tx)
        .await
        .map_err(|error| map_role_conflict(error, &input.name))?;

        link_permissions(&mut tx, role_id, &input.permission_ids).await?;

        tx.commit()
            .await
            .map_err(|error| storage_error("failed to commit role insert", error))?;

        tracing::debug!(role = %role_id, "role created");
        self.get_role_impl(RoleId::from_uuid(role_id))
            .await?
            .ok_or_else(|| AppError::Storage("role missing after insert".into()))
    }

    pub(super) async fn apply_role_changes_impl(
        &self,
        role_id: RoleId,
        changes: UpdateRoleInput,
    ) -> AppResult<Role> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|error| storage_error("failed to open transaction", error))?;

        let display_name = changes.name.clone().unwrap_or_default();
        let updated = sqlx::query_scalar::<_, Uuid>(
            r"
            UPDATE roles
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                level = COALESCE($4, level),
                updated_at = now()
            WHERE id = $1
            RETURNING id
            ",
        )
        .bind(role_id.as_uuid())
        .bind(changes.name.as_deref().map(str::trim))
        .bind(changes.description.as_deref())
        .bind(changes.level)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|error| map_role_conflict(error, &display_name))?;

        if updated.is_none() {
            return Err(AppError::NotFound(format!("role '{role_id}' does not exist")));
        }

        if let Some(permission_ids) = &changes.permission_ids {
            sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
                .bind(role_id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|error| storage_error("failed to clear role permissions", error))?;
            link_permissions(&mut tx, role_id.as_uuid(), permission_ids).await?;
        }

        tx.commit()
            .await
            .map_err(|error| storage_error("failed to commit role update", error))?;

        tracing::debug!(role = %role_id, "role updated");
        self.get_role_impl(role_id)
            .await?
            .ok_or_else(|| AppError::Storage("role missing after update".into()))
    }

    pub(super) async fn delete_role_impl(&self, role_id: RoleId) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(role_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|error| storage_error("failed to delete role", error))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("role '{role_id}' does not exist")));
        }
        tracing::debug!(role = %role_id, "role deleted");
        Ok(())
    }
}

async fn link_permissions(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    role_id: Uuid,
    permission_ids: &[PermissionId],
) -> AppResult<()> {
    for permission_id in permission_ids {
        sqlx::query(
            r"
            INSERT INTO role_permissions (role_id, permission_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(role_id)
        .bind(permission_id.as_uuid())
        .execute(&mut **tx)
        .await
        .map_err(|error| storage_error("failed to attach role permission", error))?;
    }
    Ok(())
}
