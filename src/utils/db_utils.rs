/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    Null,
}

impl From<Option<String>> for SqlValue {
    fn from(value: Option<String>) -> Self {
        value.map(SqlValue::String).unwrap_or(SqlValue::Null)
    }
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
///
/// Column names are compile-time constants; only values are bound.
/// Returns `None` when there is nothing to update.
pub fn build_update_sql(
    table: &'static str,
    fields: Vec<(&'static str, SqlValue)>,
    id_column: &'static str,
    id_value: &str,
) -> Option<SqlUpdate> {
    if fields.is_empty() {
        return None;
    }

    let set_clause = fields
        .iter()
        .map(|(column, _)| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {table} SET {set_clause} WHERE {id_column} = ?");

    let mut values: Vec<SqlValue> = fields.into_iter().map(|(_, v)| v).collect();
    values.push(SqlValue::String(id_value.to_string()));

    Some(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update<'c, E>(executor: E, update: SqlUpdate) -> Result<u64, sqlx::Error>
where
    E: sqlx::Executor<'c, Database = sqlx::MySql>,
{
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(executor).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_set_clause_in_field_order() {
        let update = build_update_sql(
            "employees",
            vec![
                ("name", SqlValue::String("Ann".into())),
                ("avatar", SqlValue::Null),
            ],
            "id",
            "ID001",
        )
        .unwrap();

        assert_eq!(update.sql, "UPDATE employees SET name = ?, avatar = ? WHERE id = ?");
        assert_eq!(update.values.len(), 3);
        assert_eq!(update.values[2], SqlValue::String("ID001".into()));
    }

    #[test]
    fn nothing_to_update() {
        assert!(build_update_sql("employees", Vec::new(), "id", "ID001").is_none());
    }
}
