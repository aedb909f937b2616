use chrono::Utc;

use crate::provider::NormalizedIdentity;
use crate::storage::{AccountRepository, StorageError};

use super::errors::CredentialError;
use super::types::Credential;

/// Result of linking an identity to an account
#[derive(Debug, Clone)]
pub struct CredentialUpsert {
    pub credential: Credential,
    /// `false` when the link already existed
    pub created: bool,
}

/// Link the identity's provider account to `account_id`, at most once.
///
/// Returns `Ok(None)` when the payload carries no remote uid. An existing
/// (account, provider) link is returned unchanged; tokens are not refreshed.
pub async fn upsert_credential(
    repo: &dyn AccountRepository,
    account_id: &str,
    identity: &NormalizedIdentity,
) -> Result<Option<CredentialUpsert>, CredentialError> {
    let provider = identity.provider;
    let Some(remote_id) = identity.remote_id.as_deref() else {
        tracing::warn!("{} payload has no uid, skipping credential link", provider);
        return Ok(None);
    };

    if let Some(existing) = repo
        .find_credential_by_account_and_provider(account_id, provider)
        .await?
    {
        tracing::debug!("Account {} already linked to {}", account_id, provider);
        return Ok(Some(CredentialUpsert {
            credential: existing,
            created: false,
        }));
    }

    if let Some(other) = repo
        .find_credential_by_remote_id_and_provider(remote_id, provider)
        .await?
    {
        if other.account_id != account_id {
            return Err(CredentialError::AlreadyLinked {
                provider,
                remote_id: remote_id.to_string(),
            });
        }
    }

    let credential = Credential::from_identity(account_id, remote_id, identity, Utc::now());
    match repo.create_credential(&credential).await {
        Ok(stored) => {
            tracing::info!("Linked {} account {} to {}", provider, remote_id, account_id);
            Ok(Some(CredentialUpsert {
                credential: stored,
                created: true,
            }))
        }
        Err(StorageError::Conflict(field)) => {
            // Lost a race with a concurrent sign-in; the winner's row is authoritative.
            tracing::debug!("Credential insert conflicted on {}, re-reading", field);
            match repo
                .find_credential_by_account_and_provider(account_id, provider)
                .await?
            {
                Some(existing) if existing.remote_id == remote_id => Ok(Some(CredentialUpsert {
                    credential: existing,
                    created: false,
                })),
                _ => Err(CredentialError::AlreadyLinked {
                    provider,
                    remote_id: remote_id.to_string(),
                }),
            }
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Account;
    use crate::provider::{CredentialPayload, Provider};
    use crate::storage::InMemoryAccountStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn vk_identity(remote_id: Option<&str>) -> NormalizedIdentity {
        let mut identity = NormalizedIdentity::empty(Provider::Vkontakte);
        identity.remote_id = remote_id.map(str::to_string);
        identity.credentials = CredentialPayload {
            token: Some("tok".to_string()),
            secret: None,
            expires_in: None,
        };
        identity
    }

    async fn saved_account(store: &dyn AccountRepository, login: &str) -> Account {
        let mut account = Account::new();
        account.login = Some(login.to_string());
        account.email = Some(format!("{login}@example.com"));
        store.save_account(&account).await.expect("save account")
    }

    #[tokio::test]
    async fn test_creates_then_reuses_link() {
        let store = InMemoryAccountStore::new();
        let account = saved_account(&store, "alice").await;
        let identity = vk_identity(Some("42"));

        let first = upsert_credential(&store, &account.id, &identity)
            .await
            .expect("upsert")
            .expect("linked");
        assert!(first.created);
        assert_eq!(first.credential.remote_id, "42");
        assert_eq!(first.credential.access_token, "tok");
        assert_eq!(first.credential.expires_at, None);

        let mut refreshed = identity.clone();
        refreshed.credentials.token = Some("new-token".to_string());
        let second = upsert_credential(&store, &account.id, &refreshed)
            .await
            .expect("upsert")
            .expect("linked");
        assert!(!second.created);
        assert_eq!(second.credential.id, first.credential.id);
        assert_eq!(second.credential.access_token, "tok");

        assert_eq!(store.list_credentials(&account.id).await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_remote_id_linked_elsewhere() {
        let store = InMemoryAccountStore::new();
        let owner = saved_account(&store, "owner").await;
        let intruder = saved_account(&store, "intruder").await;
        let identity = vk_identity(Some("42"));

        upsert_credential(&store, &owner.id, &identity)
            .await
            .expect("first link");

        let err = upsert_credential(&store, &intruder.id, &identity)
            .await
            .expect_err("remote id belongs to owner");
        assert!(matches!(
            err,
            CredentialError::AlreadyLinked { provider: Provider::Vkontakte, ref remote_id } if remote_id == "42"
        ));
        assert!(store.list_credentials(&intruder.id).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_missing_uid_skips_link() {
        let store = InMemoryAccountStore::new();
        let account = saved_account(&store, "alice").await;

        let result = upsert_credential(&store, &account.id, &vk_identity(None))
            .await
            .expect("upsert");
        assert!(result.is_none());
        assert!(store.list_credentials(&account.id).await.expect("list").is_empty());
    }

    /// Hides the existing link from the first lookup to simulate a concurrent insert.
    struct RacingStore {
        inner: InMemoryAccountStore,
        hide_once: AtomicBool,
    }

    #[async_trait]
    impl AccountRepository for RacingStore {
        async fn init(&self) -> Result<(), StorageError> {
            self.inner.init().await
        }
        async fn find_account_by_id(&self, id: &str) -> Result<Option<Account>, StorageError> {
            self.inner.find_account_by_id(id).await
        }
        async fn find_account_by_login(&self, login: &str) -> Result<Option<Account>, StorageError> {
            self.inner.find_account_by_login(login).await
        }
        async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StorageError> {
            self.inner.find_account_by_email(email).await
        }
        async fn save_account(&self, account: &Account) -> Result<Account, StorageError> {
            self.inner.save_account(account).await
        }
        async fn delete_account(&self, id: &str) -> Result<(), StorageError> {
            self.inner.delete_account(id).await
        }
        async fn find_credential_by_account_and_provider(
            &self,
            account_id: &str,
            provider: Provider,
        ) -> Result<Option<Credential>, StorageError> {
            if self.hide_once.swap(false, Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner
                .find_credential_by_account_and_provider(account_id, provider)
                .await
        }
        async fn find_credential_by_remote_id_and_provider(
            &self,
            remote_id: &str,
            provider: Provider,
        ) -> Result<Option<Credential>, StorageError> {
            self.inner
                .find_credential_by_remote_id_and_provider(remote_id, provider)
                .await
        }
        async fn list_credentials(&self, account_id: &str) -> Result<Vec<Credential>, StorageError> {
            self.inner.list_credentials(account_id).await
        }
        async fn create_credential(&self, credential: &Credential) -> Result<Credential, StorageError> {
            self.inner.create_credential(credential).await
        }
    }

    #[tokio::test]
    async fn test_conflict_on_insert_returns_winning_row() {
        let store = RacingStore {
            inner: InMemoryAccountStore::new(),
            hide_once: AtomicBool::new(false),
        };
        let account = saved_account(&store, "alice").await;
        let identity = vk_identity(Some("42"));

        let winner = upsert_credential(&store, &account.id, &identity)
            .await
            .expect("upsert")
            .expect("linked");

        store.hide_once.store(true, Ordering::SeqCst);
        let loser = upsert_credential(&store, &account.id, &identity)
            .await
            .expect("upsert after race")
            .expect("linked");

        assert!(!loser.created);
        assert_eq!(loser.credential.id, winner.credential.id);
        assert_eq!(store.list_credentials(&account.id).await.expect("list").len(), 1);
    }
}
