//! Data store configuration

use std::{env, sync::LazyLock};

pub(crate) static GENERIC_DATA_STORE_TYPE: LazyLock<String> = LazyLock::new(|| {
    env::var("GENERIC_DATA_STORE_TYPE").expect("GENERIC_DATA_STORE_TYPE must be set")
});

pub(crate) static GENERIC_DATA_STORE_URL: LazyLock<String> = LazyLock::new(|| {
    env::var("GENERIC_DATA_STORE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string())
});

/// Table prefix from environment variable
pub(crate) static DB_TABLE_PREFIX: LazyLock<String> =
    LazyLock::new(|| env::var("DB_TABLE_PREFIX").unwrap_or_else(|_| "sl_".to_string()));

/// Accounts table name
pub static DB_TABLE_ACCOUNTS: LazyLock<String> = LazyLock::new(|| {
    env::var("DB_TABLE_ACCOUNTS").unwrap_or_else(|_| format!("{}{}", *DB_TABLE_PREFIX, "accounts"))
});

/// Credentials table name
pub static DB_TABLE_CREDENTIALS: LazyLock<String> = LazyLock::new(|| {
    env::var("DB_TABLE_CREDENTIALS")
        .unwrap_or_else(|_| format!("{}{}", *DB_TABLE_PREFIX, "credentials"))
});
