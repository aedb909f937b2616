mod errors;
mod types;
mod upsert;

pub use errors::CredentialError;
pub use types::Credential;
pub use upsert::{CredentialUpsert, upsert_credential};

pub(crate) use types::CredentialSearchField;
