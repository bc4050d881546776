use sqlx::MySqlPool;

use crate::auth::{auth::Scope, password::hash_password};
use crate::model::employee::{Employee, EmployeeRow};
use crate::model::role::Role;

const COLUMNS: &str = "id, code, name, department, role, username, avatar";

/// Employees visible to `scope`, ordered by name.
pub async fn list(
    pool: &MySqlPool,
    scope: &Scope,
    search: Option<&str>,
) -> Result<Vec<Employee>, sqlx::Error> {
    let mut sql = format!("SELECT {COLUMNS} FROM employees WHERE 1=1");
    let mut args: Vec<String> = Vec::new();

    if let Some(id) = scope.employee_id() {
        sql.push_str(" AND id = ?");
        args.push(id.to_string());
    }

    if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
        sql.push_str(" AND (LOWER(name) LIKE ? OR LOWER(code) LIKE ?)");
        let pattern = format!("%{}%", term.to_lowercase());
        args.push(pattern.clone());
        args.push(pattern);
    }

    sql.push_str(" ORDER BY name ASC");

    let mut query = sqlx::query_as::<_, EmployeeRow>(&sql);
    for arg in args {
        query = query.bind(arg);
    }

    let rows = query.fetch_all(pool).await?;
    Ok(rows.into_iter().map(Employee::from).collect())
}

pub async fn get(pool: &MySqlPool, id: &str) -> Result<Option<Employee>, sqlx::Error> {
    let sql = format!("SELECT {COLUMNS} FROM employees WHERE id = ?");
    let row = sqlx::query_as::<_, EmployeeRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(Employee::from))
}

struct Seed {
    id: &'static str,
    code: &'static str,
    name: &'static str,
    department: &'static str,
    role: Role,
    username: Option<&'static str>,
    avatar: &'static str,
}

const SEED_PASSWORD: &str = "123";

const SEEDS: [Seed; 3] = [
    Seed {
        id: "ID001",
        code: "NV001",
        name: "Jane Admin",
        department: "IT",
        role: Role::Admin,
        username: Some("admin"),
        avatar: "https://picsum.photos/200",
    },
    Seed {
        id: "ID002",
        code: "NV002",
        name: "John User",
        department: "HR",
        role: Role::User,
        username: Some("user"),
        avatar: "https://picsum.photos/201",
    },
    Seed {
        id: "ID003",
        code: "NV003",
        name: "Lee Sales",
        department: "Sales",
        role: Role::User,
        username: None,
        avatar: "https://picsum.photos/202",
    },
];

/// Inserts the demo employees when the table is empty. Returns whether
/// anything was inserted.
pub async fn seed_if_empty(pool: &MySqlPool) -> anyhow::Result<bool> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees")
        .fetch_one(pool)
        .await?;

    if count > 0 {
        return Ok(false);
    }

    let mut tx = pool.begin().await?;
    for seed in &SEEDS {
        let password_hash = match seed.username {
            Some(_) => Some(hash_password(SEED_PASSWORD).map_err(|e| anyhow::anyhow!("{e}"))?),
            None => None,
        };

        sqlx::query(
            r#"
            INSERT INTO employees (id, code, name, department, role, username, password_hash, avatar)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(seed.id)
        .bind(seed.code)
        .bind(seed.name)
        .bind(seed.department)
        .bind(seed.role.as_ref())
        .bind(seed.username)
        .bind(password_hash)
        .bind(seed.avatar)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    tracing::info!(count = SEEDS.len(), "Seeded demo employees");
    Ok(true)
}
