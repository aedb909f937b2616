use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::credential::Credential;

use super::errors::StorageError;

/// Credential as stored; the provider column is plain text
#[derive(Debug, FromRow)]
pub(super) struct CredentialRow {
    id: String,
    account_id: String,
    remote_id: String,
    provider: String,
    access_token: String,
    access_token_secret: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CredentialRow> for Credential {
    type Error = StorageError;

    fn try_from(row: CredentialRow) -> Result<Self, Self::Error> {
        Ok(Self {
            provider: row
                .provider
                .parse()
                .map_err(|e| StorageError::Storage(format!("Corrupt credential {}: {e}", row.id)))?,
            id: row.id,
            account_id: row.account_id,
            remote_id: row.remote_id,
            access_token: row.access_token,
            access_token_secret: row.access_token_secret,
            expires_at: row.expires_at,
            created_at: row.created_at,
        })
    }
}

pub(super) fn into_credentials(rows: Vec<CredentialRow>) -> Result<Vec<Credential>, StorageError> {
    rows.into_iter().map(Credential::try_from).collect()
}
