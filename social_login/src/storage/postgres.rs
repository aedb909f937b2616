use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

use crate::account::Account;
use crate::credential::{Credential, CredentialSearchField};
use crate::provider::Provider;

use super::config::{DB_TABLE_ACCOUNTS, DB_TABLE_CREDENTIALS};
use super::errors::StorageError;
use super::schema_validation::validate_postgres_table_schema;
use super::traits::AccountRepository;
use super::types::{CredentialRow, into_credentials};

/// Account store backed by a PostgreSQL pool
#[derive(Clone, Debug)]
pub struct PostgresAccountStore {
    pool: Pool<Postgres>,
}

impl PostgresAccountStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub fn connect_lazy(url: &str) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect_lazy(url)
            .map_err(|e| StorageError::Storage(e.to_string()))?;
        Ok(Self::new(pool))
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
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
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
                expires_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL,
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
            "SELECT * FROM {table_name} WHERE {column} = $1"
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
                "account_id = $1 AND provider = $2",
                vec![account_id.as_str(), provider.as_str()],
            ),
            CredentialSearchField::RemoteIdAndProvider(remote_id, provider) => (
                "remote_id = $1 AND provider = $2",
                vec![remote_id.as_str(), provider.as_str()],
            ),
            CredentialSearchField::AccountId(account_id) => {
                ("account_id = $1", vec![account_id.as_str()])
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
impl AccountRepository for PostgresAccountStore {
    async fn init(&self) -> Result<(), StorageError> {
        self.create_tables().await?;

        validate_postgres_table_schema(
            &self.pool,
            DB_TABLE_ACCOUNTS.as_str(),
            &[
                ("id", "text"),
                ("login", "text"),
                ("email", "text"),
                ("password", "text"),
                ("username", "text"),
                ("avatar_url", "text"),
                ("gp_addr", "text"),
                ("fb_addr", "text"),
                ("vk_addr", "text"),
                ("tw_addr", "text"),
                ("ok_addr", "text"),
                ("created_at", "timestamp with time zone"),
                ("updated_at", "timestamp with time zone"),
            ],
        )
        .await?;

        validate_postgres_table_schema(
            &self.pool,
            DB_TABLE_CREDENTIALS.as_str(),
            &[
                ("id", "text"),
                ("account_id", "text"),
                ("remote_id", "text"),
                ("provider", "text"),
                ("access_token", "text"),
                ("access_token_secret", "text"),
                ("expires_at", "timestamp with time zone"),
                ("created_at", "timestamp with time zone"),
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
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
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
                    login = $1, email = $2, password = $3, username = $4, avatar_url = $5,
                    gp_addr = $6, fb_addr = $7, vk_addr = $8, tw_addr = $9, ok_addr = $10,
                    updated_at = $11
                WHERE id = $12
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

        sqlx::query(&format!("DELETE FROM {credentials_table} WHERE account_id = $1"))
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Storage(e.to_string()))?;

        sqlx::query(&format!("DELETE FROM {accounts_table} WHERE id = $1"))
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
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
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
