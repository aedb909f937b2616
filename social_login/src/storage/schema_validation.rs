use sqlx::{Pool, Postgres, Row, Sqlite};

use super::errors::StorageError;

/// Validates that a SQLite table schema matches what we expect
pub(super) async fn validate_sqlite_table_schema(
    pool: &Pool<Sqlite>,
    table_name: &str,
    expected_columns: &[(&str, &str)],
) -> Result<(), StorageError> {
    let rows = sqlx::query(&format!("PRAGMA table_info({table_name})"))
        .fetch_all(pool)
        .await
        .map_err(|e| StorageError::Storage(e.to_string()))?;

    if rows.is_empty() {
        return Err(StorageError::Storage(format!(
            "Schema validation failed: Table '{table_name}' does not exist"
        )));
    }

    let actual_columns: Vec<(String, String)> = rows
        .iter()
        .map(|row| (row.get::<String, _>("name"), row.get::<String, _>("type")))
        .collect();

    compare_columns(table_name, expected_columns, &actual_columns)
}

/// Validates that a PostgreSQL table schema matches what we expect
pub(super) async fn validate_postgres_table_schema(
    pool: &Pool<Postgres>,
    table_name: &str,
    expected_columns: &[(&str, &str)],
) -> Result<(), StorageError> {
    let rows = sqlx::query(
        "SELECT column_name, data_type FROM information_schema.columns
         WHERE table_name = $1 ORDER BY column_name",
    )
    .bind(table_name)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Storage(e.to_string()))?;

    if rows.is_empty() {
        return Err(StorageError::Storage(format!(
            "Schema validation failed: Table '{table_name}' does not exist"
        )));
    }

    let actual_columns: Vec<(String, String)> = rows
        .iter()
        .map(|row| {
            (
                row.get::<String, _>("column_name"),
                row.get::<String, _>("data_type"),
            )
        })
        .collect();

    compare_columns(table_name, expected_columns, &actual_columns)
}

fn compare_columns(
    table_name: &str,
    expected_columns: &[(&str, &str)],
    actual_columns: &[(String, String)],
) -> Result<(), StorageError> {
    for (expected_name, expected_type) in expected_columns {
        match actual_columns.iter().find(|(name, _)| name == expected_name) {
            Some((_, actual_type)) if actual_type.eq_ignore_ascii_case(expected_type) => {}
            Some((_, actual_type)) => {
                return Err(StorageError::Storage(format!(
                    "Schema validation failed: Column '{expected_name}' has type '{actual_type}' but expected '{expected_type}'"
                )));
            }
            None => {
                return Err(StorageError::Storage(format!(
                    "Schema validation failed: Missing column '{expected_name}'"
                )));
            }
        }
    }

    for (actual_name, _) in actual_columns {
        if !expected_columns.iter().any(|(name, _)| name == actual_name) {
            tracing::warn!("Extra column '{}' found in table '{}'", actual_name, table_name);
        }
    }

    Ok(())
}
