use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;

use crate::account::Account;
use crate::credential::{Credential, CredentialSearchField};
use crate::provider::Provider;

use super::config::{DB_TABLE_ACCOUNTS, DB_TABLE_CREDENTIALS};
use super::errors::StorageError;
use super::schema_validation::validate_sqlite_table_schema;
use super::traits::AccountRepository;
use super::types::{CredentialRow, into_credentials};

/// Account store backed by a SQLite pool
#[derive(Clone, Debug)]
pub struct SqliteAccountStore {
    pool: Pool<Sqlite>,
}

impl SqliteAccountStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Lazily connect to `url`. In-memory databases get a single connection so
    /// every query sees the same database.
    pub fn connect_lazy(url: &str) -> Result<Self, StorageError> {
        let opts = SqliteConnectOptions::from_str(url)
            .map_err(|e| StorageError::Storage(e.to_string()))?
            .create_if_missing(true);
        let pool_options = if url.contains(":memory:") || url.contains("mode=memory") {
            // Closing the only connection would drop the database
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(8)
        };

        Ok(Self::new(pool_options.connect_lazy_with(opts)))
    }

    async fn create_tables(&self) -> Result<(), StorageError> {
        let accounts_table = DB_TABLE_ACCOUNTS.as_str();
        let credentials_table = DB_TABLE_CREDENTIALS.as_str();

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {accounts_table} (
                id TEXT PRIMARY KEY NOT NULL,
                login TEXT UNIQUE,
                email TEXT UNIQUE,
                password TEXT,
                username TEXT,
                avatar_url TEXT,
                gp_addr TEXT,
                fb_addr TEXT,
                vk_addr TEXT,
                tw_addr TEXT,
                ok_addr TEXT,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL
            )
            "#
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Storage(e.to_string()))?;

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {credentials_table} (
                id TEXT PRIMARY KEY NOT NULL,
                account_id TEXT NOT NULL REFERENCES {accounts_table}(id),
                remote_id TEXT NOT NULL,
                provider TEXT NOT NULL,
                access_token TEXT NOT NULL,
                access_token_secret TEXT,
                expires_at TIMESTAMP,
                created_at TIMESTAMP NOT NULL,
                UNIQUE(account_id, provider),
                UNIQUE(provider, remote_id)
            )
            "#
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn find_account_by(
        &self,
        column: &str,
        value: &str,
    ) -> Result<Option<Account>, StorageError> {
        let table_name = DB_TABLE_ACCOUNTS.as_str();

        sqlx::query_as::<_, Account>(&format!(
            "SELECT * FROM {table_name} WHERE {column} = ?"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Storage(e.to_string()))
    }

    async fn find_credentials_by(
        &self,
        field: &CredentialSearchField,
    ) -> Result<Vec<Credential>, StorageError> {
        let table_name = DB_TABLE_CREDENTIALS.as_str();

        let (condition, values) = match field {
            CredentialSearchField::AccountAndProvider(account_id, provider) => (
                "account_id = ? AND provider = ?",
                vec![account_id.as_str(), provider.as_str()],
            ),
            CredentialSearchField::RemoteIdAndProvider(remote_id, provider) => (
                "remote_id = ? AND provider = ?",
                vec![remote_id.as_str(), provider.as_str()],
            ),
            CredentialSearchField::AccountId(account_id) => {
                ("account_id = ?", vec![account_id.as_str()])
            }
        };

        let sql = format!("SELECT * FROM {table_name} WHERE {condition} ORDER BY created_at ASC");
        let mut query = sqlx::query_as::<_, CredentialRow>(&sql);
        for value in values {
            query = query.bind(value);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Storage(e.to_string()))?;
        into_credentials(rows)
    }
}

#[async_trait]
impl AccountRepository for SqliteAccountStore {
    async fn init(&self) -> Result<(), StorageError> {
        self.create_tables().await?;

        validate_sqlite_table_schema(
            &self.pool,
            DB_TABLE_ACCOUNTS.as_str(),
            &[
                ("id", "TEXT"),
                ("login", "TEXT"),
                ("email", "TEXT"),
                ("password", "TEXT"),
                ("username", "TEXT"),
                ("avatar_url", "TEXT"),
                ("gp_addr", "TEXT"),
                ("fb_addr", "TEXT"),
                ("vk_addr", "TEXT"),
                ("tw_addr", "TEXT"),
                ("ok_addr", "TEXT"),
                ("created_at", "TIMESTAMP"),
                ("updated_at", "TIMESTAMP"),
            ],
        )
        .await?;

        validate_sqlite_table_schema(
            &self.pool,
            DB_TABLE_CREDENTIALS.as_str(),
            &[
                ("id", "TEXT"),
                ("account_id", "TEXT"),
                ("remote_id", "TEXT"),
                ("provider", "TEXT"),
                ("access_token", "TEXT"),
                ("access_token_secret", "TEXT"),
                ("expires_at", "TIMESTAMP"),
                ("created_at", "TIMESTAMP"),
            ],
        )
        .await
    }

    async fn find_account_by_id(&self, id: &str) -> Result<Option<Account>, StorageError> {
        self.find_account_by("id", id).await
    }

    async fn find_account_by_login(&self, login: &str) -> Result<Option<Account>, StorageError> {
        self.find_account_by("login", login).await
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StorageError> {
        self.find_account_by("email", email).await
    }

    async fn save_account(&self, account: &Account) -> Result<Account, StorageError> {
        let table_name = DB_TABLE_ACCOUNTS.as_str();
        let mut stored = account.clone();
        stored.updated_at = Utc::now();

        if stored.id.is_empty() {
            stored.id = uuid::Uuid::new_v4().to_string();
            stored.created_at = stored.updated_at;

            sqlx::query(&format!(
                r#"
                INSERT INTO {table_name}
                (id, login, email, password, username, avatar_url,
                 gp_addr, fb_addr, vk_addr, tw_addr, ok_addr, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#
            ))
            .bind(&stored.id)
            .bind(&stored.login)
            .bind(&stored.email)
            .bind(&stored.password)
            .bind(&stored.username)
            .bind(&stored.avatar_url)
            .bind(&stored.gp_addr)
            .bind(&stored.fb_addr)
            .bind(&stored.vk_addr)
            .bind(&stored.tw_addr)
            .bind(&stored.ok_addr)
            .bind(stored.created_at)
            .bind(stored.updated_at)
            .execute(&self.pool)
            .await?;
        } else {
            let result = sqlx::query(&format!(
                r#"
                UPDATE {table_name} SET
                    login = ?, email = ?, password = ?, username = ?, avatar_url = ?,
                    gp_addr = ?, fb_addr = ?, vk_addr = ?, tw_addr = ?, ok_addr = ?,
                    updated_at = ?
                WHERE id = ?
                "#
            ))
            .bind(&stored.login)
            .bind(&stored.email)
            .bind(&stored.password)
            .bind(&stored.username)
            .bind(&stored.avatar_url)
            .bind(&stored.gp_addr)
            .bind(&stored.fb_addr)
            .bind(&stored.vk_addr)
            .bind(&stored.tw_addr)
            .bind(&stored.ok_addr)
            .bind(stored.updated_at)
            .bind(&stored.id)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(StorageError::Storage(format!(
                    "Account {} does not exist",
                    stored.id
                )));
            }
        }

        Ok(stored)
    }

    async fn delete_account(&self, id: &str) -> Result<(), StorageError> {
        let accounts_table = DB_TABLE_ACCOUNTS.as_str();
        let credentials_table = DB_TABLE_CREDENTIALS.as_str();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Storage(e.to_string()))?;

        sqlx::query(&format!("DELETE FROM {credentials_table} WHERE account_id = ?"))
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Storage(e.to_string()))?;

        sqlx::query(&format!("DELETE FROM {accounts_table} WHERE id = ?"))
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Storage(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Storage(e.to_string()))
    }

    async fn find_credential_by_account_and_provider(
        &self,
        account_id: &str,
        provider: Provider,
    ) -> Result<Option<Credential>, StorageError> {
        let field = CredentialSearchField::AccountAndProvider(account_id.to_string(), provider);
        Ok(self.find_credentials_by(&field).await?.into_iter().next())
    }

    async fn find_credential_by_remote_id_and_provider(
        &self,
        remote_id: &str,
        provider: Provider,
    ) -> Result<Option<Credential>, StorageError> {
        let field = CredentialSearchField::RemoteIdAndProvider(remote_id.to_string(), provider);
        Ok(self.find_credentials_by(&field).await?.into_iter().next())
    }

    async fn list_credentials(&self, account_id: &str) -> Result<Vec<Credential>, StorageError> {
        self.find_credentials_by(&CredentialSearchField::AccountId(account_id.to_string()))
            .await
    }

    async fn create_credential(&self, credential: &Credential) -> Result<Credential, StorageError> {
        let table_name = DB_TABLE_CREDENTIALS.as_str();
        let mut stored = credential.clone();
        if stored.id.is_empty() {
            stored.id = uuid::Uuid::new_v4().to_string();
        }

        sqlx::query(&format!(
            r#"
            INSERT INTO {table_name}
            (id, account_id, remote_id, provider, access_token, access_token_secret, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#
        ))
        .bind(&stored.id)
        .bind(&stored.account_id)
        .bind(&stored.remote_id)
        .bind(stored.provider.as_str())
        .bind(&stored.access_token)
        .bind(&stored.access_token_secret)
        .bind(stored.expires_at)
        .bind(stored.created_at)
        .execute(&self.pool)
        .await?;

        Ok(stored)
    }
}
