use std::str::FromStr;

use clearance_domain::{Department, DepartmentId, EmailAddress, UserStatus};

use super::*;

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    display_name: String,
    status: String,
    department_id: Option<Uuid>,
    department_name: Option<String>,
    department_is_active: Option<bool>,
}

impl PostgresAccessRepository {
    pub(super) async fn find_user_impl(&self, user_id: UserId) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT
                users.id,
                users.email,
                users.display_name,
                users.status,
                departments.id AS department_id,
                departments.name AS department_name,
                departments.is_active AS department_is_active
            FROM users
            LEFT JOIN departments ON departments.id = users.department_id
            WHERE users.id = $1
            ",
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| storage_error("failed to load user", error))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let roles = self.roles_for_user_impl(user_id).await?;

        let email = EmailAddress::new(row.email)
            .map_err(|error| AppError::Storage(format!("failed to decode user email: {error}")))?;
        let status = UserStatus::from_str(&row.status)
            .map_err(|error| AppError::Storage(format!("failed to decode user status: {error}")))?;

        let department = match (row.department_id, row.department_name) {
            (Some(id), Some(name)) => Some(Department {
                id: DepartmentId::from_uuid(id),
                name,
                is_active: row.department_is_active.unwrap_or(false),
            }),
            _ => None,
        };

        Ok(Some(User {
            id: UserId::from_uuid(row.id),
            email,
            display_name: row.display_name,
            status,
            department,
            roles,
        }))
    }
}
