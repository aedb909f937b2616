//! social_login - OAuth sign-in payload reconciliation
//!
//! Takes the provider payload handed over by an OAuth transport and turns it
//! into a local [`Account`] plus at most one [`Credential`] per provider,
//! deriving login, email and avatar on the way.
//!
//! ```no_run
//! use std::sync::Arc;
//! use social_login::{
//!     HttpJsonFetcher, OAuthData, ReconcileConfig, Reconciler, TracingNotifier, store_from_env,
//! };
//!
//! # async fn run(raw_payload: String) -> Result<(), Box<dyn std::error::Error>> {
//! let config = ReconcileConfig::from_env();
//! let reconciler = Reconciler::new(
//!     store_from_env().await?,
//!     Arc::new(HttpJsonFetcher::new(config.avatar_fetch_timeout)?),
//!     Arc::new(TracingNotifier),
//!     config,
//! );
//! let outcome = reconciler.sign_in(OAuthData::from_payload(raw_payload)?).await?;
//! println!("signed in as {:?}", outcome.account.login);
//! # Ok(())
//! # }
//! ```

mod account;
mod avatar;
mod config;
mod coordination;
mod credential;
mod notify;
mod provider;
mod storage;
mod utils;

#[cfg(test)]
mod test_utils;

pub use account::{Account, AccountError, AccountFieldResolver};
pub use avatar::{FetchError, HttpJsonFetcher, JsonFetcher, resolve_avatar};
pub use config::ReconcileConfig;
pub use coordination::{
    ReconcileError, ReconcileOutcome, ReconcileState, Reconciler, ValidationError,
    ValidationField, ValidationKind,
};
pub use credential::{Credential, CredentialError, CredentialUpsert, upsert_credential};
pub use notify::{CredentialNotifier, NotifyError, TracingNotifier};
pub use provider::{
    CredentialPayload, NormalizedIdentity, OAuthData, Provider, ProviderError, normalize,
};
pub use storage::{
    AccountRepository, ConflictField, DB_TABLE_ACCOUNTS, DB_TABLE_CREDENTIALS,
    InMemoryAccountStore, PostgresAccountStore, SqliteAccountStore, StorageError, store_from_env,
};
pub use utils::UtilError;
