//! Side effect fired after a new credential link is created

use async_trait::async_trait;
use thiserror::Error;

use crate::account::Account;
use crate::credential::Credential;

#[derive(Debug, Error, Clone)]
pub enum NotifyError {
    #[error("Notification failed: {0}")]
    Delivery(String),
}

/// Receives newly created credential links, e.g. to email the account owner.
///
/// Failures are logged by the caller and never undo the link.
#[async_trait]
pub trait CredentialNotifier: Send + Sync {
    async fn notify_credential_created(
        &self,
        account: &Account,
        credential: &Credential,
    ) -> Result<(), NotifyError>;
}

/// Notifier that only records the event in the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl CredentialNotifier for TracingNotifier {
    async fn notify_credential_created(
        &self,
        account: &Account,
        credential: &Credential,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            account_id = %account.id,
            provider = %credential.provider,
            remote_id = %credential.remote_id,
            "New social network linked to account"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Provider;
    use chrono::Utc;

    #[tokio::test]
    async fn test_tracing_notifier_never_fails() {
        let mut account = Account::new();
        account.id = "acc".to_string();
        let credential = Credential {
            id: "cred".to_string(),
            account_id: "acc".to_string(),
            remote_id: "42".to_string(),
            provider: Provider::Odnoklassniki,
            access_token: "tok".to_string(),
            access_token_secret: None,
            expires_at: None,
            created_at: Utc::now(),
        };

        assert!(
            TracingNotifier
                .notify_credential_created(&account, &credential)
                .await
                .is_ok()
        );
    }
}
