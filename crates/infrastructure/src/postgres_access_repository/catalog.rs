use super::*;

impl PostgresAccessRepository {
    pub(super) async fn list_permissions_impl(&self) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r"
            SELECT id, resource, action, name, description
            FROM permissions
            ORDER BY resource, action
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| storage_error("failed to list permissions", error))?;

        rows.into_iter()
            .map(|row| {
                decode_permission(row.id, row.resource, &row.action, row.name, row.description)
            })
            .collect()
    }
}
