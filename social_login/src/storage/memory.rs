use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::account::Account;
use crate::credential::{Credential, CredentialSearchField};
use crate::provider::Provider;

use super::errors::{ConflictField, StorageError};
use super::traits::AccountRepository;

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<String, Account>,
    credentials: HashMap<String, Credential>,
}

impl MemoryState {
    fn find_credential(&self, field: &CredentialSearchField) -> Vec<&Credential> {
        self.credentials
            .values()
            .filter(|c| match field {
                CredentialSearchField::AccountAndProvider(account_id, provider) => {
                    c.account_id == *account_id && c.provider == *provider
                }
                CredentialSearchField::RemoteIdAndProvider(remote_id, provider) => {
                    c.remote_id == *remote_id && c.provider == *provider
                }
                CredentialSearchField::AccountId(account_id) => c.account_id == *account_id,
            })
            .collect()
    }
}

/// Process-local store, used by tests and the `memory` store type
#[derive(Default)]
pub struct InMemoryAccountStore {
    state: Mutex<MemoryState>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory account store");
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountStore {
    async fn init(&self) -> Result<(), StorageError> {
        Ok(()) // Nothing to initialize for in-memory store
    }

    async fn find_account_by_id(&self, id: &str) -> Result<Option<Account>, StorageError> {
        Ok(self.state.lock().await.accounts.get(id).cloned())
    }

    async fn find_account_by_login(&self, login: &str) -> Result<Option<Account>, StorageError> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .values()
            .find(|a| a.login.as_deref() == Some(login))
            .cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StorageError> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .values()
            .find(|a| a.email.as_deref() == Some(email))
            .cloned())
    }

    async fn save_account(&self, account: &Account) -> Result<Account, StorageError> {
        let mut state = self.state.lock().await;

        let taken = |value: &Option<String>, pick: fn(&Account) -> &Option<String>| {
            value.is_some()
                && state
                    .accounts
                    .values()
                    .any(|other| other.id != account.id && pick(other) == value)
        };
        if taken(&account.login, |a| &a.login) {
            return Err(StorageError::Conflict(ConflictField::Login));
        }
        if taken(&account.email, |a| &a.email) {
            return Err(StorageError::Conflict(ConflictField::Email));
        }

        let mut stored = account.clone();
        if stored.id.is_empty() {
            stored.id = uuid::Uuid::new_v4().to_string();
            stored.created_at = Utc::now();
        } else if !state.accounts.contains_key(&stored.id) {
            return Err(StorageError::Storage(format!(
                "Account {} does not exist",
                stored.id
            )));
        }
        stored.updated_at = Utc::now();
        state.accounts.insert(stored.id.clone(), stored.clone());

        Ok(stored)
    }

    async fn delete_account(&self, id: &str) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        state.credentials.retain(|_, c| c.account_id != id);
        state.accounts.remove(id);
        Ok(())
    }

    async fn find_credential_by_account_and_provider(
        &self,
        account_id: &str,
        provider: Provider,
    ) -> Result<Option<Credential>, StorageError> {
        let state = self.state.lock().await;
        let field = CredentialSearchField::AccountAndProvider(account_id.to_string(), provider);
        Ok(state.find_credential(&field).first().map(|c| (*c).clone()))
    }

    async fn find_credential_by_remote_id_and_provider(
        &self,
        remote_id: &str,
        provider: Provider,
    ) -> Result<Option<Credential>, StorageError> {
        let state = self.state.lock().await;
        let field = CredentialSearchField::RemoteIdAndProvider(remote_id.to_string(), provider);
        Ok(state.find_credential(&field).first().map(|c| (*c).clone()))
    }

    async fn list_credentials(&self, account_id: &str) -> Result<Vec<Credential>, StorageError> {
        let state = self.state.lock().await;
        let mut credentials: Vec<Credential> = state
            .find_credential(&CredentialSearchField::AccountId(account_id.to_string()))
            .into_iter()
            .cloned()
            .collect();
        credentials.sort_by_key(|c| c.created_at);
        Ok(credentials)
    }

    async fn create_credential(&self, credential: &Credential) -> Result<Credential, StorageError> {
        let mut state = self.state.lock().await;

        let by_remote = CredentialSearchField::RemoteIdAndProvider(
            credential.remote_id.clone(),
            credential.provider,
        );
        if !state.find_credential(&by_remote).is_empty() {
            return Err(StorageError::Conflict(ConflictField::CredentialRemoteId));
        }
        let by_account = CredentialSearchField::AccountAndProvider(
            credential.account_id.clone(),
            credential.provider,
        );
        if !state.find_credential(&by_account).is_empty() {
            return Err(StorageError::Conflict(ConflictField::CredentialProvider));
        }
        if !state.accounts.contains_key(&credential.account_id) {
            return Err(StorageError::Storage(format!(
                "Account {} does not exist",
                credential.account_id
            )));
        }

        let mut stored = credential.clone();
        if stored.id.is_empty() {
            stored.id = uuid::Uuid::new_v4().to_string();
        }
        state.credentials.insert(stored.id.clone(), stored.clone());

        Ok(stored)
    }
}
