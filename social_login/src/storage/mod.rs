//! Account and credential persistence
//!
//! The reconciliation core only talks to [`AccountRepository`]. Three back ends
//! are provided: an in-memory store and sqlx-based SQLite / PostgreSQL stores.

mod config;
mod errors;
mod memory;
mod postgres;
mod schema_validation;
mod sqlite;
mod traits;
mod types;

use std::sync::Arc;

pub use config::{DB_TABLE_ACCOUNTS, DB_TABLE_CREDENTIALS};
pub use errors::{ConflictField, StorageError};
pub use memory::InMemoryAccountStore;
pub use postgres::PostgresAccountStore;
pub use sqlite::SqliteAccountStore;
pub use traits::AccountRepository;

/// Build and initialize the store selected by `GENERIC_DATA_STORE_TYPE`.
///
/// Supported types are `sqlite`, `postgres` and `memory`; the connection string
/// comes from `GENERIC_DATA_STORE_URL`.
pub async fn store_from_env() -> Result<Arc<dyn AccountRepository>, StorageError> {
    let store_type = config::GENERIC_DATA_STORE_TYPE.as_str();
    let store_url = config::GENERIC_DATA_STORE_URL.as_str();

    tracing::info!(
        "Initializing account store with type: {}, url: {}",
        store_type,
        store_url
    );

    let store: Arc<dyn AccountRepository> = match store_type {
        "sqlite" => Arc::new(SqliteAccountStore::connect_lazy(store_url)?),
        "postgres" => Arc::new(PostgresAccountStore::connect_lazy(store_url)?),
        "memory" => Arc::new(InMemoryAccountStore::new()),
        t => {
            return Err(StorageError::Storage(format!(
                "Unsupported store type: {t}. Supported types are 'sqlite', 'postgres' and 'memory'"
            )));
        }
    };

    store.init().await?;
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Account;
    use crate::test_utils::init_test_environment;
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn test_store_from_env_builds_working_store() {
        init_test_environment();

        let store = store_from_env().await.expect("store from test environment");

        let mut account = Account::new();
        account.login = Some("env-user".to_string());
        account.email = Some("env-user@example.com".to_string());
        let saved = store.save_account(&account).await.expect("save");

        let found = store
            .find_account_by_login("env-user")
            .await
            .expect("lookup")
            .expect("account exists");
        assert_eq!(found.id, saved.id);
    }
}
