use async_trait::async_trait;

use crate::account::Account;
use crate::credential::Credential;
use crate::provider::Provider;

use super::errors::StorageError;

/// Persistence for accounts and their provider credentials.
///
/// Uniqueness of `login`, `email`, `(account, provider)` and
/// `(provider, remote id)` is enforced here; violations come back as
/// [`StorageError::Conflict`].
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Create tables or other backing structures.
    async fn init(&self) -> Result<(), StorageError>;

    async fn find_account_by_id(&self, id: &str) -> Result<Option<Account>, StorageError>;

    async fn find_account_by_login(&self, login: &str) -> Result<Option<Account>, StorageError>;

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StorageError>;

    /// Insert when `account.id` is empty (assigning a new id), update otherwise.
    async fn save_account(&self, account: &Account) -> Result<Account, StorageError>;

    /// Delete the account together with all of its credentials.
    async fn delete_account(&self, id: &str) -> Result<(), StorageError>;

    async fn find_credential_by_account_and_provider(
        &self,
        account_id: &str,
        provider: Provider,
    ) -> Result<Option<Credential>, StorageError>;

    async fn find_credential_by_remote_id_and_provider(
        &self,
        remote_id: &str,
        provider: Provider,
    ) -> Result<Option<Credential>, StorageError>;

    async fn list_credentials(&self, account_id: &str) -> Result<Vec<Credential>, StorageError>;

    /// Insert a credential, assigning an id when empty.
    async fn create_credential(&self, credential: &Credential) -> Result<Credential, StorageError>;
}
