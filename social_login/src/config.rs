//! Reconciliation settings
//!
//! The resolver and orchestrator never read the environment themselves; they
//! receive a [`ReconcileConfig`] at construction. [`ReconcileConfig::from_env`]
//! is the bridge for applications that configure everything through env vars.

use std::{env, str::FromStr, time::Duration};

pub(crate) const DEFAULT_EMAIL_DOMAIN: &str = "my-web-site.com";
pub(crate) const DEFAULT_MAX_DISAMBIGUATION_ATTEMPTS: usize = 10;
pub(crate) const DEFAULT_AVATAR_FETCH_TIMEOUT_SECS: u64 = 5;
pub(crate) const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 15;

/// Settings consumed by the account field resolver and the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Domain used for derived and random email addresses
    pub default_email_domain: String,
    /// Number of candidates tried (base value included) before falling back to a random value
    pub max_disambiguation_attempts: usize,
    /// Upper bound for the provider avatar lookup
    pub avatar_fetch_timeout: Duration,
    /// Overall budget for one sign-in attempt; the avatar phase gets whatever is left
    pub attempt_timeout: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            default_email_domain: DEFAULT_EMAIL_DOMAIN.to_string(),
            max_disambiguation_attempts: DEFAULT_MAX_DISAMBIGUATION_ATTEMPTS,
            avatar_fetch_timeout: Duration::from_secs(DEFAULT_AVATAR_FETCH_TIMEOUT_SECS),
            attempt_timeout: Duration::from_secs(DEFAULT_ATTEMPT_TIMEOUT_SECS),
        }
    }
}

impl ReconcileConfig {
    /// Build the configuration from `SOCIAL_LOGIN_*` environment variables.
    ///
    /// Missing or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            default_email_domain: env::var("SOCIAL_LOGIN_DEFAULT_EMAIL_DOMAIN")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.default_email_domain),
            max_disambiguation_attempts: parse_env_or(
                "SOCIAL_LOGIN_MAX_DISAMBIGUATION_ATTEMPTS",
                defaults.max_disambiguation_attempts,
            ),
            avatar_fetch_timeout: Duration::from_secs(parse_env_or(
                "SOCIAL_LOGIN_AVATAR_TIMEOUT_SECS",
                DEFAULT_AVATAR_FETCH_TIMEOUT_SECS,
            )),
            attempt_timeout: Duration::from_secs(parse_env_or(
                "SOCIAL_LOGIN_ATTEMPT_TIMEOUT_SECS",
                DEFAULT_ATTEMPT_TIMEOUT_SECS,
            )),
        }
    }
}

fn parse_env_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value {:?} for {}", raw, key);
            default
        }),
        Err(_) => default,
    }
}
