use crate::{
    auth::{auth::AuthUser, password::hash_password},
    error::{AppError, AppResult},
    model::{employee::Employee, role::Role},
    store::employee as employee_store,
    utils::{
        change_feed::{ChangeFeed, Table},
        db_utils::{SqlValue, build_update_sql, execute_update},
        username_cache,
    },
};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEmployee {
    /// Generated when omitted.
    #[schema(example = "ID004", nullable = true)]
    pub id: Option<String>,
    #[schema(example = "NV004")]
    pub code: String,
    #[schema(example = "Mai Tran")]
    pub name: String,
    #[schema(example = "Sales")]
    pub department: String,
    #[serde(default = "default_role")]
    pub role: Role,
    #[schema(example = "mai", nullable = true)]
    pub username: Option<String>,
    #[schema(example = "secret", nullable = true)]
    pub password: Option<String>,
    #[schema(example = "https://picsum.photos/203", nullable = true)]
    pub avatar: Option<String>,
}

fn default_role() -> Role {
    Role::User
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateEmployee {
    pub code: Option<String>,
    pub name: Option<String>,
    pub department: Option<String>,
    pub role: Option<Role>,
    /// An empty string removes the login.
    pub username: Option<String>,
    pub password: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EmployeeQuery {
    /// Case-insensitive match on name or code
    pub search: Option<String>,
}

fn required(value: &str, field: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

/// Trimmed value, or `None` when blank.
fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn hash(password: &str) -> AppResult<String> {
    hash_password(password).map_err(|e| {
        tracing::error!(error = %e, "Password hashing failed");
        AppError::validation("Password could not be processed")
    })
}

async fn ensure_username_free(
    username: &str,
    employee_id: Option<&str>,
    pool: &MySqlPool,
) -> AppResult<()> {
    if username_cache::is_available(username, employee_id, pool).await? {
        Ok(())
    } else {
        Err(AppError::Conflict(format!("Username '{username}' is already taken")))
    }
}

/// List employees
#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Employees visible to the caller, by name", body = [Employee])
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> AppResult<HttpResponse> {
    let employees =
        employee_store::list(pool.get_ref(), &auth.scope(), query.search.as_deref()).await?;

    debug!(count = employees.len(), "Fetched employees");
    Ok(HttpResponse::Ok().json(employees))
}

/// Get employee by id
#[utoipa::path(
    get,
    path = "/api/employees/{id}",
    params(
        ("id" = String, Path, description = "Employee id")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 403, description = "Not your record"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = auth.resolve_employee(Some(&path.into_inner()))?;

    match employee_store::get(pool.get_ref(), &id).await? {
        Some(employee) => Ok(HttpResponse::Ok().json(employee)),
        None => Err(AppError::NotFound("Employee not found")),
    }
}

/// Create employee (Admin)
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Missing name, code or department"),
        (status = 409, description = "Username taken", body = Object, example = json!({
            "message": "Username 'admin' is already taken"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    feed: web::Data<ChangeFeed>,
    payload: web::Json<CreateEmployee>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let payload = payload.into_inner();
    let employee = Employee {
        id: non_blank(payload.id.as_deref())
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        code: required(&payload.code, "code")?,
        name: required(&payload.name, "name")?,
        department: required(&payload.department, "department")?,
        role: payload.role,
        username: non_blank(payload.username.as_deref()),
        avatar: payload.avatar,
    };

    let password_hash = match (&employee.username, payload.password.as_deref()) {
        (Some(username), Some(password)) => {
            ensure_username_free(username, None, pool.get_ref()).await?;
            Some(hash(password)?)
        }
        (Some(_), None) => return Err(AppError::validation("A login requires a password")),
        (None, _) => None,
    };

    let result = sqlx::query(
        r#"
        INSERT INTO employees (id, code, name, department, role, username, password_hash, avatar)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&employee.id)
    .bind(&employee.code)
    .bind(&employee.name)
    .bind(&employee.department)
    .bind(employee.role.as_ref())
    .bind(&employee.username)
    .bind(password_hash)
    .bind(&employee.avatar)
    .execute(pool.get_ref())
    .await;

    if let Err(sqlx::Error::Database(e)) = &result {
        if e.is_unique_violation() {
            return Err(AppError::Conflict("Employee id or username already exists".into()));
        }
    }
    result?;

    if let Some(username) = &employee.username {
        username_cache::mark_taken(username, &employee.id).await;
    }
    feed.publish(Table::Employees);

    info!(id = %employee.id, by = %auth.username, "Employee created");
    Ok(HttpResponse::Created().json(employee))
}

/// Update employee (Admin)
#[utoipa::path(
    put,
    path = "/api/employees/{id}",
    params(
        ("id" = String, Path, description = "Employee id")
    ),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "Nothing to update"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Username taken")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    feed: web::Data<ChangeFeed>,
    path: web::Path<String>,
    payload: web::Json<UpdateEmployee>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let id = path.into_inner();
    let existing = employee_store::get(pool.get_ref(), &id)
        .await?
        .ok_or(AppError::NotFound("Employee not found"))?;

    let payload = payload.into_inner();
    let mut fields: Vec<(&'static str, SqlValue)> = Vec::new();

    if let Some(code) = &payload.code {
        fields.push(("code", SqlValue::String(required(code, "code")?)));
    }
    if let Some(name) = &payload.name {
        fields.push(("name", SqlValue::String(required(name, "name")?)));
    }
    if let Some(department) = &payload.department {
        fields.push(("department", SqlValue::String(required(department, "department")?)));
    }
    if let Some(role) = payload.role {
        fields.push(("role", SqlValue::String(role.to_string())));
    }
    if let Some(avatar) = payload.avatar {
        fields.push(("avatar", SqlValue::from(Some(avatar).filter(|a| !a.is_empty()))));
    }

    let new_username = payload.username.as_deref().map(|u| non_blank(Some(u)));
    if let Some(Some(username)) = &new_username {
        ensure_username_free(username, Some(&id), pool.get_ref()).await?;
    }
    if let Some(username) = &new_username {
        fields.push(("username", SqlValue::from(username.clone())));
    }
    if let Some(password) = &payload.password {
        fields.push(("password_hash", SqlValue::String(hash(password)?)));
    }

    let update = build_update_sql("employees", fields, "id", &id)
        .ok_or_else(|| AppError::validation("Nothing to update"))?;
    execute_update(pool.get_ref(), update).await?;

    if let Some(username) = new_username {
        if let Some(old) = &existing.username {
            username_cache::release(old).await;
        }
        if let Some(new) = &username {
            username_cache::mark_taken(new, &id).await;
        }
    }
    feed.publish(Table::Employees);

    let employee = employee_store::get(pool.get_ref(), &id)
        .await?
        .ok_or(AppError::NotFound("Employee not found"))?;

    info!(id = %id, by = %auth.username, "Employee updated");
    Ok(HttpResponse::Ok().json(employee))
}

/// Delete employee (Admin)
#[utoipa::path(
    delete,
    path = "/api/employees/{id}",
    params(
        ("id" = String, Path, description = "Employee id")
    ),
    responses(
        (status = 200, description = "Employee deleted", body = Object, example = json!({
            "message": "Employee deleted"
        })),
        (status = 400, description = "Cannot delete yourself"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    feed: web::Data<ChangeFeed>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let id = path.into_inner();
    if id == auth.employee_id {
        return Err(AppError::validation("You cannot delete your own account"));
    }

    let existing = employee_store::get(pool.get_ref(), &id)
        .await?
        .ok_or(AppError::NotFound("Employee not found"))?;

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(&id)
        .execute(&mut *tx)
        .await?;

    // outstanding sessions die with the account
    let revoked = sqlx::query(
        "UPDATE refresh_tokens SET revoked = 1 WHERE employee_id = ? AND revoked = 0",
    )
    .bind(&id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    if let Some(username) = &existing.username {
        username_cache::release(username).await;
    }
    feed.publish(Table::Employees);

    info!(
        id = %id,
        by = %auth.username,
        revoked_sessions = revoked.rows_affected(),
        "Employee deleted"
    );
    Ok(HttpResponse::Ok().json(json!({ "message": "Employee deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_are_rejected() {
        assert!(matches!(required("   ", "name"), Err(AppError::Validation(m)) if m == "name is required"));
        assert_eq!(required(" IT ", "department").unwrap(), "IT");
    }

    #[test]
    fn blank_values_become_none() {
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(Some(" mai ")), Some("mai".to_string()));
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn role_defaults_to_user() {
        let body: CreateEmployee = serde_json::from_value(json!({
            "code": "NV004", "name": "Mai", "department": "Sales"
        }))
        .unwrap();
        assert_eq!(body.role, Role::User);
        assert!(body.username.is_none());
    }
}
