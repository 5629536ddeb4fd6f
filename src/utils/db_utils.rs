use actix_web::error::ErrorBadRequest;
use chrono::NaiveDate;
use sqlx::MySqlPool;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    Date(NaiveDate),
    Null,
}

impl From<Option<String>> for SqlValue {
    fn from(value: Option<String>) -> Self {
        value.map(SqlValue::String).unwrap_or(SqlValue::Null)
    }
}

impl From<Option<NaiveDate>> for SqlValue {
    fn from(value: Option<NaiveDate>) -> Self {
        value.map(SqlValue::Date).unwrap_or(SqlValue::Null)
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
/// Build UPDATE SQL from validated columns
/// ===============================
///
/// Column names come from the caller's own whitelist, never from the request
/// body, so they can be spliced into the statement.
pub fn build_update_sql(
    table: &str,
    columns: Vec<(&'static str, SqlValue)>,
    id_column: &str,
    id_value: SqlValue,
) -> Result<SqlUpdate, actix_web::Error> {
    if columns.is_empty() {
        return Err(ErrorBadRequest("No fields provided for update"));
    }

    let set_clause = columns
        .iter()
        .map(|(k, _)| format!("{} = ?", k))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table, set_clause, id_column
    );

    let mut values: Vec<SqlValue> = columns.into_iter().map(|(_, v)| v).collect();

    // WHERE id = ?
    values.push(id_value);

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Build INSERT SQL from validated columns
/// ===============================
pub fn build_insert_sql(
    table: &str,
    columns: Vec<(&'static str, SqlValue)>,
) -> Result<SqlUpdate, actix_web::Error> {
    if columns.is_empty() {
        return Err(ErrorBadRequest("No fields provided"));
    }

    let names = columns.iter().map(|(k, _)| *k).collect::<Vec<_>>();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        names.join(", "),
        vec!["?"; names.len()].join(", ")
    );

    Ok(SqlUpdate {
        sql,
        values: columns.into_iter().map(|(_, v)| v).collect(),
    })
}

/// ===============================
/// Execute the statement
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_set_clause_in_column_order() {
        let update = build_update_sql(
            "employees",
            vec![
                ("full_name", SqlValue::String("Lê Văn C".into())),
                ("dob", SqlValue::Date(NaiveDate::from_ymd_opt(1990, 2, 3).unwrap())),
                ("avatar_url", SqlValue::Null),
            ],
            "employee_id",
            SqlValue::String("E1".into()),
        )
        .unwrap();

        assert_eq!(
            update.sql,
            "UPDATE employees SET full_name = ?, dob = ?, avatar_url = ? WHERE employee_id = ?"
        );
        assert_eq!(update.values.len(), 4);
        assert_eq!(update.values[3], SqlValue::String("E1".into()));
    }

    #[test]
    fn rejects_empty_updates() {
        let err = build_update_sql(
            "departments",
            vec![],
            "department_id",
            SqlValue::String("D1".into()),
        );
        assert!(err.is_err());
    }

    #[test]
    fn insert_lists_columns_and_placeholders() {
        let insert = build_insert_sql(
            "employees",
            vec![
                ("employee_id", SqlValue::String("E1".into())),
                ("full_name", SqlValue::String("An".into())),
                ("religion", SqlValue::Null),
            ],
        )
        .unwrap();

        assert_eq!(
            insert.sql,
            "INSERT INTO employees (employee_id, full_name, religion) VALUES (?, ?, ?)"
        );
        assert_eq!(insert.values[2], SqlValue::Null);
    }

    #[test]
    fn optional_values_bind_as_null() {
        assert_eq!(SqlValue::from(None::<String>), SqlValue::Null);
        assert_eq!(
            SqlValue::from(Some("x".to_string())),
            SqlValue::String("x".into())
        );
    }
}
