use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::time::{Instant, timeout};

use crate::account::{Account, AccountFieldResolver};
use crate::avatar::{JsonFetcher, resolve_avatar};
use crate::config::ReconcileConfig;
use crate::credential::{Credential, CredentialError, upsert_credential};
use crate::notify::CredentialNotifier;
use crate::provider::{NormalizedIdentity, OAuthData, normalize};
use crate::storage::AccountRepository;

use super::errors::{ReconcileError, ValidationError, ValidationField};

/// Stages of one sign-in attempt, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileState {
    Received,
    Normalized,
    FieldsResolved,
    Persisted,
    CredentialLinked,
    AvatarResolved,
    Cleared,
}

impl fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a completed sign-in attempt produced
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    pub account: Account,
    /// `None` when the payload carried no remote uid
    pub credential: Option<Credential>,
    /// `true` only when this attempt inserted the credential
    pub credential_created: bool,
    pub avatar_url: Option<String>,
    pub state: ReconcileState,
}

/// Runs the sign-in pipeline: normalize, resolve fields, persist, link the
/// credential, resolve the avatar, clear the payload.
///
/// Each step is an explicit call; the only side effects are the store writes,
/// the avatar lookup and the credential notification.
#[derive(Clone)]
pub struct Reconciler {
    repo: Arc<dyn AccountRepository>,
    fetcher: Arc<dyn JsonFetcher>,
    notifier: Arc<dyn CredentialNotifier>,
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(
        repo: Arc<dyn AccountRepository>,
        fetcher: Arc<dyn JsonFetcher>,
        notifier: Arc<dyn CredentialNotifier>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            repo,
            fetcher,
            notifier,
            config,
        }
    }

    /// Reconcile the payload attached to `account`.
    ///
    /// Returns `Ok(None)` without touching anything when no payload is attached.
    /// On a validation error the payload stays attached so the caller can fix the
    /// conflicting field and retry.
    pub async fn reconcile(
        &self,
        account: &mut Account,
    ) -> Result<Option<ReconcileOutcome>, ReconcileError> {
        let Some(data) = account.oauth_data().cloned() else {
            tracing::debug!("No OAuth payload attached to account {:?}, nothing to do", account.id);
            return Ok(None);
        };
        self.run(account, &data).await.map(Some)
    }

    /// Sign in with a payload: reuse the account the provider identity is
    /// already linked to, or create a new one.
    pub async fn sign_in(&self, data: OAuthData) -> Result<ReconcileOutcome, ReconcileError> {
        let identity = normalize(&data.raw, data.provider);
        let mut account = self.linked_account(&identity).await?.unwrap_or_default();
        let fresh = account.is_new();

        account.attach_oauth_data(data.clone());
        match self.run(&mut account, &data).await {
            // A concurrent sign-in may have linked the identity after our lookup.
            Err(e) if fresh && e.validation().is_some() => {
                let Some(mut winner) = self.linked_account(&identity).await? else {
                    return Err(e);
                };
                tracing::info!(
                    "{} identity was linked to account {} concurrently, signing in there",
                    data.provider,
                    winner.id
                );
                winner.attach_oauth_data(data.clone());
                self.run(&mut winner, &data).await
            }
            result => result,
        }
    }

    /// Account the identity's credential belongs to, if any
    async fn linked_account(
        &self,
        identity: &NormalizedIdentity,
    ) -> Result<Option<Account>, ReconcileError> {
        let Some(remote_id) = identity.remote_id.as_deref() else {
            return Ok(None);
        };
        let Some(credential) = self
            .repo
            .find_credential_by_remote_id_and_provider(remote_id, identity.provider)
            .await?
        else {
            return Ok(None);
        };

        let account = self.repo.find_account_by_id(&credential.account_id).await?;
        match &account {
            Some(account) => tracing::debug!(
                "{} identity already linked to account {}",
                identity.provider,
                account.id
            ),
            None => tracing::warn!(
                "Credential {} points at missing account {}",
                credential.id,
                credential.account_id
            ),
        }
        Ok(account)
    }

    async fn run(
        &self,
        account: &mut Account,
        data: &OAuthData,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let started = Instant::now();
        let mut state = ReconcileState::Received;
        tracing::debug!("Reconciling {} payload for account {:?}", data.provider, account.id);

        let identity = normalize(&data.raw, data.provider);
        advance(&mut state, ReconcileState::Normalized);

        self.ensure_not_linked_elsewhere(account, &identity).await?;
        AccountFieldResolver::new(self.repo.as_ref(), &self.config)
            .resolve_fields(account, &identity)
            .await?;
        advance(&mut state, ReconcileState::FieldsResolved);

        let created = account.is_new();
        let saved = self.repo.save_account(account).await?;
        account.apply_saved(saved);
        if created {
            tracing::info!("Created account {} from {} sign-in", account.id, data.provider);
        }
        advance(&mut state, ReconcileState::Persisted);

        let link = match upsert_credential(self.repo.as_ref(), &account.id, &identity).await {
            Err(CredentialError::AlreadyLinked { provider, remote_id }) if created => {
                tracing::warn!(
                    "{} identity {} was linked concurrently, removing account {}",
                    provider,
                    remote_id,
                    account.id
                );
                self.repo.delete_account(&account.id).await?;
                account.id.clear();
                return Err(ValidationError::uniqueness(ValidationField::Credentials).into());
            }
            link => link?,
        };
        let (credential, credential_created) = match link {
            Some(link) => {
                if link.created {
                    self.notify(account, &link.credential, started).await;
                }
                (Some(link.credential), link.created)
            }
            None => (None, false),
        };
        advance(&mut state, ReconcileState::CredentialLinked);

        let avatar_url = self.lookup_avatar(&identity, started).await;
        if let Some(url) = &avatar_url {
            account.avatar_url = Some(url.clone());
            let saved = self.repo.save_account(account).await?;
            account.apply_saved(saved);
        }
        advance(&mut state, ReconcileState::AvatarResolved);

        account.reset_oauth_data();
        advance(&mut state, ReconcileState::Cleared);

        Ok(ReconcileOutcome {
            account: account.clone(),
            credential,
            credential_created,
            avatar_url,
            state,
        })
    }

    /// Reject a provider identity that already belongs to a different account
    /// before anything is written.
    async fn ensure_not_linked_elsewhere(
        &self,
        account: &Account,
        identity: &NormalizedIdentity,
    ) -> Result<(), ReconcileError> {
        let Some(remote_id) = identity.remote_id.as_deref() else {
            return Ok(());
        };

        match self
            .repo
            .find_credential_by_remote_id_and_provider(remote_id, identity.provider)
            .await?
        {
            Some(linked) if account.is_new() || linked.account_id != account.id => {
                tracing::warn!(
                    "{} identity {} is already linked to account {}",
                    identity.provider,
                    remote_id,
                    linked.account_id
                );
                Err(ValidationError::uniqueness(ValidationField::Credentials).into())
            }
            _ => Ok(()),
        }
    }

    /// Notification is bounded by what is left of the attempt budget.
    async fn notify(&self, account: &Account, credential: &Credential, started: Instant) {
        let limit = self.config.attempt_timeout.saturating_sub(started.elapsed());
        let sent = self.notifier.notify_credential_created(account, credential);

        match timeout(limit, sent).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!("Credential notification for account {} failed: {}", account.id, e)
            }
            Err(_) => tracing::warn!(
                "Credential notification for account {} timed out after {:?}",
                account.id,
                limit
            ),
        }
    }

    /// Avatar phase, bounded by the avatar timeout and what is left of the
    /// attempt budget.
    async fn lookup_avatar(&self, identity: &NormalizedIdentity, started: Instant) -> Option<String> {
        let remaining = self.config.attempt_timeout.saturating_sub(started.elapsed());
        let limit = self.config.avatar_fetch_timeout.min(remaining);

        match timeout(limit, resolve_avatar(identity, self.fetcher.as_ref())).await {
            Ok(avatar) => avatar,
            Err(_) => {
                tracing::warn!(
                    "Avatar lookup for {} timed out after {:?}",
                    identity.provider,
                    limit
                );
                None
            }
        }
    }
}

fn advance(state: &mut ReconcileState, next: ReconcileState) {
    tracing::debug!("Reconcile state: {} -> {}", state, next);
    *state = next;
}
