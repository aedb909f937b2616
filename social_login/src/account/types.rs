use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::provider::{OAuthData, Provider};

/// Local user record the sign-in payload is reconciled into
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Account {
    /// Empty until the account is first saved
    pub id: String,
    pub login: Option<String>,
    pub email: Option<String>,
    /// Placeholder satisfying the password-presence constraint of OAuth-created accounts
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub gp_addr: Option<String>,
    pub fb_addr: Option<String>,
    pub vk_addr: Option<String>,
    pub tw_addr: Option<String>,
    pub ok_addr: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    #[sqlx(skip)]
    oauth_data: Option<OAuthData>,
}

impl Default for Account {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            login: None,
            email: None,
            password: None,
            username: None,
            avatar_url: None,
            gp_addr: None,
            fb_addr: None,
            vk_addr: None,
            tw_addr: None,
            ok_addr: None,
            created_at: now,
            updated_at: now,
            oauth_data: None,
        }
    }
}

impl Account {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh account carrying a sign-in payload
    pub fn with_oauth_data(data: OAuthData) -> Self {
        let mut account = Self::new();
        account.attach_oauth_data(data);
        account
    }

    /// Not yet persisted
    pub fn is_new(&self) -> bool {
        self.id.is_empty()
    }

    pub fn profile_url_mut(&mut self, provider: Provider) -> &mut Option<String> {
        match provider {
            Provider::Google => &mut self.gp_addr,
            Provider::Facebook => &mut self.fb_addr,
            Provider::Vkontakte => &mut self.vk_addr,
            Provider::Twitter => &mut self.tw_addr,
            Provider::Odnoklassniki => &mut self.ok_addr,
        }
    }

    /// Attach a sign-in payload; the next reconciliation run will consume it.
    pub fn attach_oauth_data(&mut self, data: OAuthData) {
        self.oauth_data = Some(data);
    }

    pub fn oauth_data(&self) -> Option<&OAuthData> {
        self.oauth_data.as_ref()
    }

    pub fn has_oauth_data(&self) -> bool {
        self.oauth_data.is_some()
    }

    /// Drop the attached payload so later saves do not reconcile again.
    pub fn reset_oauth_data(&mut self) -> Option<OAuthData> {
        self.oauth_data.take()
    }

    /// Take over the stored representation returned by the repository.
    pub(crate) fn apply_saved(&mut self, saved: Account) {
        let oauth_data = self.oauth_data.take();
        *self = saved;
        self.oauth_data = oauth_data;
    }
}
