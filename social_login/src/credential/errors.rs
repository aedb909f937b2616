use thiserror::Error;

use crate::provider::Provider;
use crate::storage::StorageError;

#[derive(Debug, Error, Clone)]
pub enum CredentialError {
    #[error("{provider} account {remote_id} is already linked to another user")]
    AlreadyLinked { provider: Provider, remote_id: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
