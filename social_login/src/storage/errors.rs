use std::fmt;
use thiserror::Error;

use super::config::{DB_TABLE_ACCOUNTS, DB_TABLE_CREDENTIALS};

/// Unique constraint that rejected a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictField {
    Login,
    Email,
    /// The account already holds a credential for this provider
    CredentialProvider,
    /// The provider identity is already linked somewhere
    CredentialRemoteId,
}

impl fmt::Display for ConflictField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Login => "login",
            Self::Email => "email",
            Self::CredentialProvider => "credential (account, provider)",
            Self::CredentialRemoteId => "credential (provider, remote id)",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Uniqueness conflict on {0}")]
    Conflict(ConflictField),

    #[error("Json conversion(Serde) error: {0}")]
    Serde(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let field = match db_err.constraint() {
                    Some(constraint) => conflict_field_from_constraint(
                        constraint,
                        &[DB_TABLE_ACCOUNTS.as_str(), DB_TABLE_CREDENTIALS.as_str()],
                    ),
                    None => conflict_field_from_sqlite_message(db_err.message()),
                };
                if let Some(field) = field {
                    return Self::Conflict(field);
                }
            }
        }
        Self::Storage(err.to_string())
    }
}

fn conflict_field_from_columns(columns: &[&str]) -> Option<ConflictField> {
    match columns {
        ["login"] => Some(ConflictField::Login),
        ["email"] => Some(ConflictField::Email),
        ["account_id", "provider"] => Some(ConflictField::CredentialProvider),
        ["provider", "remote_id"] => Some(ConflictField::CredentialRemoteId),
        _ => None,
    }
}

/// SQLite reports `UNIQUE constraint failed: <table>.<col>, <table>.<col>`.
fn conflict_field_from_sqlite_message(message: &str) -> Option<ConflictField> {
    let (_, columns) = message.split_once("constraint failed:")?;
    let columns: Vec<&str> = columns
        .split(',')
        .map(|qualified| qualified.rsplit('.').next().unwrap_or(qualified).trim())
        .collect();
    conflict_field_from_columns(&columns)
}

/// Postgres names unnamed unique constraints `<table>_<col>_<col>_key`.
fn conflict_field_from_constraint(
    constraint: &str,
    tables: &[&str],
) -> Option<ConflictField> {
    let body = constraint.strip_suffix("_key")?;
    tables.iter().find_map(|table| {
        let columns = body.strip_prefix(table)?.strip_prefix('_')?;
        match columns {
            "login" => Some(ConflictField::Login),
            "email" => Some(ConflictField::Email),
            "account_id_provider" => Some(ConflictField::CredentialProvider),
            "provider_remote_id" => Some(ConflictField::CredentialRemoteId),
            _ => None,
        }
    })
}
