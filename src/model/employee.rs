use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::model::role::Role;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": "ID001",
        "code": "NV001",
        "name": "Jane Admin",
        "department": "IT",
        "role": "Admin",
        "username": "admin",
        "avatar": "https://picsum.photos/200"
    })
)]
pub struct Employee {
    #[schema(example = "ID001")]
    pub id: String,

    #[schema(example = "NV001")]
    pub code: String,

    #[schema(example = "Jane Admin")]
    pub name: String,

    #[schema(example = "IT")]
    pub department: String,

    pub role: Role,

    #[schema(example = "admin", nullable = true)]
    pub username: Option<String>,

    #[schema(example = "https://picsum.photos/200", nullable = true)]
    pub avatar: Option<String>,
}

/// `employees` row without the password hash.
#[derive(Debug, FromRow)]
pub struct EmployeeRow {
    pub id: String,
    pub code: String,
    pub name: String,
    pub department: String,
    pub role: String,
    pub username: Option<String>,
    pub avatar: Option<String>,
}

impl From<EmployeeRow> for Employee {
    fn from(row: EmployeeRow) -> Self {
        let role = Role::from_str(&row.role).unwrap_or_else(|_| {
            tracing::warn!(employee_id = %row.id, role = %row.role, "Unknown role, treating as User");
            Role::User
        });

        Employee {
            id: row.id,
            code: row.code,
            name: row.name,
            department: row.department,
            role,
            username: row.username,
            avatar: row.avatar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(role: &str) -> EmployeeRow {
        EmployeeRow {
            id: "ID009".into(),
            code: "NV009".into(),
            name: "Sam".into(),
            department: "Sales".into(),
            role: role.into(),
            username: None,
            avatar: None,
        }
    }

    #[test]
    fn row_role_is_parsed() {
        assert_eq!(Employee::from(row("Admin")).role, Role::Admin);
    }

    #[test]
    fn unknown_role_never_grants_admin() {
        assert_eq!(Employee::from(row("root")).role, Role::User);
    }
}
