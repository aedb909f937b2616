//! Provider payload adapter
//!
//! Turns the loosely-shaped JSON handed over by the OAuth transport into a
//! [`NormalizedIdentity`]. Nothing in here fails on missing data: absent keys
//! at any depth come out as `None`.

mod errors;
mod extract;
mod types;

pub use errors::ProviderError;
pub use extract::normalize;
pub use types::{CredentialPayload, NormalizedIdentity, OAuthData, Provider};
