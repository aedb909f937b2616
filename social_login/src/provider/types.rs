use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::errors::ProviderError;

/// Identity services a payload can come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "google_oauth2", alias = "google")]
    Google,
    #[serde(rename = "facebook")]
    Facebook,
    #[serde(rename = "vkontakte")]
    Vkontakte,
    #[serde(rename = "twitter")]
    Twitter,
    #[serde(rename = "odnoklassniki")]
    Odnoklassniki,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Self::Vkontakte,
        Self::Facebook,
        Self::Twitter,
        Self::Google,
        Self::Odnoklassniki,
    ];

    /// Identifier used on the wire and in storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google_oauth2",
            Self::Facebook => "facebook",
            Self::Vkontakte => "vkontakte",
            Self::Twitter => "twitter",
            Self::Odnoklassniki => "odnoklassniki",
        }
    }

    /// Key used for this provider inside `info.urls`
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Google => "Google",
            Self::Facebook => "Facebook",
            Self::Vkontakte => "Vkontakte",
            Self::Twitter => "Twitter",
            Self::Odnoklassniki => "Odnoklassniki",
        }
    }

    /// Two-letter code used in account profile field names
    pub fn short_code(&self) -> &'static str {
        match self {
            Self::Google => "gp",
            Self::Facebook => "fb",
            Self::Vkontakte => "vk",
            Self::Twitter => "tw",
            Self::Odnoklassniki => "ok",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google_oauth2" | "google" => Ok(Self::Google),
            "facebook" => Ok(Self::Facebook),
            "vkontakte" => Ok(Self::Vkontakte),
            "twitter" => Ok(Self::Twitter),
            "odnoklassniki" => Ok(Self::Odnoklassniki),
            _ => Err(ProviderError::Unsupported(s.to_string())),
        }
    }
}

/// Token data carried in the `credentials` section of a payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPayload {
    pub token: Option<String>,
    /// Only Twitter (OAuth 1.0a) sends a secret
    pub secret: Option<String>,
    /// Lifetime of the token in seconds, counted from the moment of sign-in
    pub expires_in: Option<i64>,
}

/// Provider-independent view of one sign-in payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedIdentity {
    pub provider: Provider,
    pub remote_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub nickname: Option<String>,
    pub profile_urls: BTreeMap<Provider, String>,
    pub avatar_seed: Option<String>,
    /// `extra.raw_info`, kept opaque for the avatar resolver
    pub raw_info: Value,
    pub credentials: CredentialPayload,
}

impl NormalizedIdentity {
    /// Identity carrying nothing but the provider
    pub fn empty(provider: Provider) -> Self {
        Self {
            provider,
            remote_id: None,
            name: None,
            email: None,
            nickname: None,
            profile_urls: BTreeMap::new(),
            avatar_seed: None,
            raw_info: Value::Null,
            credentials: CredentialPayload::default(),
        }
    }
}

/// Raw sign-in payload attached to an account until reconciliation has run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthData {
    pub provider: Provider,
    pub raw: String,
}

impl OAuthData {
    pub fn new(provider: Provider, raw: impl Into<String>) -> Self {
        Self {
            provider,
            raw: raw.into(),
        }
    }

    /// Read the provider from the payload's top-level `provider` key.
    pub fn from_payload(raw: impl Into<String>) -> Result<Self, ProviderError> {
        let raw = raw.into();
        let provider = serde_json::from_str::<Value>(&raw)
            .ok()
            .and_then(|v| v.get("provider").and_then(Value::as_str).map(str::to_string))
            .ok_or(ProviderError::MissingProvider)?;

        Ok(Self {
            provider: provider.parse()?,
            raw,
        })
    }
}
