use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::provider::{NormalizedIdentity, Provider};

/// One (account, provider) link with the provider's access token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credential {
    pub id: String,
    pub account_id: String,
    pub remote_id: String,
    pub provider: Provider,
    #[serde(skip_serializing, default)]
    pub access_token: String,
    /// Only meaningful for Twitter
    #[serde(skip_serializing, default)]
    pub access_token_secret: Option<String>,
    /// `None` means the token does not expire
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Credential {
    /// Build an unsaved credential for `account_id` from a normalized identity.
    ///
    /// The expiry is counted from `now` using the payload's lifetime in seconds.
    pub(crate) fn from_identity(
        account_id: &str,
        remote_id: &str,
        identity: &NormalizedIdentity,
        now: DateTime<Utc>,
    ) -> Self {
        let payload = &identity.credentials;
        Self {
            id: String::new(),
            account_id: account_id.to_string(),
            remote_id: remote_id.to_string(),
            provider: identity.provider,
            access_token: payload.token.clone().unwrap_or_default(),
            access_token_secret: payload.secret.clone(),
            expires_at: payload
                .expires_in
                .and_then(Duration::try_seconds)
                .and_then(|lifetime| now.checked_add_signed(lifetime)),
            created_at: now,
        }
    }
}

/// Search field options for credential lookup
#[derive(Debug, Clone)]
pub(crate) enum CredentialSearchField {
    AccountAndProvider(String, Provider),
    RemoteIdAndProvider(String, Provider),
    AccountId(String),
}
