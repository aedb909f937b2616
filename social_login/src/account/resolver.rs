use crate::config::ReconcileConfig;
use crate::provider::NormalizedIdentity;
use crate::storage::AccountRepository;
use crate::utils::{gen_random_hex, slugify};

use super::errors::AccountError;
use super::types::Account;

const RANDOM_LOGIN_HEX_LEN: usize = 5;
const RANDOM_EMAIL_HEX_LEN: usize = 7;
const PASSWORD_PLACEHOLDER_HEX_LEN: usize = 16;

#[derive(Debug, Clone, Copy)]
enum UniqueField {
    Login,
    Email,
}

/// Fills the empty local-account fields from a normalized identity.
///
/// Values already present on the account are never overwritten. Candidate
/// logins and emails are checked against the store one by one; the store's own
/// unique constraints remain the final word when two sign-ins race.
pub struct AccountFieldResolver<'a> {
    repo: &'a dyn AccountRepository,
    config: &'a ReconcileConfig,
}

impl<'a> AccountFieldResolver<'a> {
    pub fn new(repo: &'a dyn AccountRepository, config: &'a ReconcileConfig) -> Self {
        Self { repo, config }
    }

    pub async fn resolve_fields(
        &self,
        account: &mut Account,
        identity: &NormalizedIdentity,
    ) -> Result<(), AccountError> {
        if is_blank(&account.login) {
            account.login = Some(self.resolve_login(identity).await?);
        }

        if is_blank(&account.email) {
            account.email = Some(self.resolve_email(identity, account.login.as_deref()).await?);
        }

        if account.is_new() && is_blank(&account.password) {
            account.password = Some(gen_random_hex(PASSWORD_PLACEHOLDER_HEX_LEN)?);
        }

        if is_blank(&account.username) {
            account.username = identity.name.clone();
        }

        for (provider, url) in &identity.profile_urls {
            let field = account.profile_url_mut(*provider);
            if is_blank(field) {
                *field = Some(url.clone());
            }
        }

        Ok(())
    }

    /// Nickname first, then a slug of the display name, then `user-<hex>`.
    async fn resolve_login(&self, identity: &NormalizedIdentity) -> Result<String, AccountError> {
        let base = identity.nickname.clone().or_else(|| {
            identity
                .name
                .as_deref()
                .map(slugify)
                .filter(|slug| !slug.is_empty())
        });

        if let Some(base) = base {
            let candidates = (0..self.config.max_disambiguation_attempts).map(|n| suffixed(&base, n));
            if let Some(login) = self.first_available(UniqueField::Login, candidates).await? {
                return Ok(login);
            }
            tracing::debug!("No free login derived from {:?}, using a random one", base);
        }

        Ok(format!("user-{}", gen_random_hex(RANDOM_LOGIN_HEX_LEN)?))
    }

    /// Identity email first, then `<login>@<domain>` variants, then `<hex>@<domain>`.
    async fn resolve_email(
        &self,
        identity: &NormalizedIdentity,
        login: Option<&str>,
    ) -> Result<String, AccountError> {
        if let Some(email) = &identity.email {
            return Ok(email.clone());
        }

        let domain = &self.config.default_email_domain;
        if let Some(login) = login.filter(|l| !l.is_empty()) {
            let candidates = (0..self.config.max_disambiguation_attempts)
                .map(|n| format!("{}@{domain}", suffixed(login, n)));
            if let Some(email) = self.first_available(UniqueField::Email, candidates).await? {
                return Ok(email);
            }
            tracing::debug!("No free email derived from login {:?}, using a random one", login);
        }

        Ok(format!("{}@{domain}", gen_random_hex(RANDOM_EMAIL_HEX_LEN)?))
    }

    async fn first_available(
        &self,
        field: UniqueField,
        candidates: impl Iterator<Item = String>,
    ) -> Result<Option<String>, AccountError> {
        for candidate in candidates {
            if !self.is_taken(field, &candidate).await? {
                return Ok(Some(candidate));
            }
            tracing::debug!("{:?} {:?} is taken", field, candidate);
        }
        Ok(None)
    }

    async fn is_taken(&self, field: UniqueField, value: &str) -> Result<bool, AccountError> {
        let existing = match field {
            UniqueField::Login => self.repo.find_account_by_login(value).await?,
            UniqueField::Email => self.repo.find_account_by_email(value).await?,
        };
        Ok(existing.is_some())
    }
}

fn suffixed(base: &str, n: usize) -> String {
    if n == 0 {
        base.to_string()
    } else {
        format!("{base}-{n}")
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Provider;
    use crate::storage::InMemoryAccountStore;

    async fn seed(store: &InMemoryAccountStore, login: &str) {
        let mut account = Account::new();
        account.login = Some(login.to_string());
        account.email = Some(format!("{login}@seed.test"));
        store.save_account(&account).await.expect("seed account");
    }

    fn identity_with_nickname(nickname: &str) -> NormalizedIdentity {
        let mut identity = NormalizedIdentity::empty(Provider::Vkontakte);
        identity.nickname = Some(nickname.to_string());
        identity
    }

    async fn resolve(store: &InMemoryAccountStore, identity: &NormalizedIdentity) -> Account {
        let config = ReconcileConfig::default();
        let resolver = AccountFieldResolver::new(store, &config);
        let mut account = Account::new();
        resolver
            .resolve_fields(&mut account, identity)
            .await
            .expect("resolution should succeed");
        account
    }

    #[tokio::test]
    async fn test_login_from_nickname() {
        let store = InMemoryAccountStore::new();
        let account = resolve(&store, &identity_with_nickname("vk_nick")).await;

        assert_eq!(account.login.as_deref(), Some("vk_nick"));
        assert_eq!(account.email.as_deref(), Some("vk_nick@my-web-site.com"));
    }

    #[tokio::test]
    async fn test_login_from_display_name_slug() {
        let store = InMemoryAccountStore::new();
        let mut identity = NormalizedIdentity::empty(Provider::Odnoklassniki);
        identity.name = Some("Alice Doe".to_string());

        let account = resolve(&store, &identity).await;
        assert_eq!(account.login.as_deref(), Some("alice-doe"));
        assert_eq!(account.username.as_deref(), Some("Alice Doe"));
    }

    #[tokio::test]
    async fn test_login_disambiguation_suffixes() {
        let store = InMemoryAccountStore::new();
        seed(&store, "alice").await;

        let account = resolve(&store, &identity_with_nickname("alice")).await;
        assert_eq!(account.login.as_deref(), Some("alice-1"));

        seed(&store, "alice-1").await;
        let account = resolve(&store, &identity_with_nickname("alice")).await;
        assert_eq!(account.login.as_deref(), Some("alice-2"));
    }

    #[tokio::test]
    async fn test_login_falls_back_to_random_after_cap() {
        let store = InMemoryAccountStore::new();
        seed(&store, "alice").await;
        for n in 1..10 {
            seed(&store, &format!("alice-{n}")).await;
        }

        let account = resolve(&store, &identity_with_nickname("alice")).await;
        let login = account.login.expect("login should be set");
        let hex = login.strip_prefix("user-").expect("random login form");
        assert_eq!(hex.len(), 5);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_random_login_when_nothing_usable() {
        let store = InMemoryAccountStore::new();
        let mut identity = NormalizedIdentity::empty(Provider::Odnoklassniki);
        identity.name = Some("Иван".to_string());

        let account = resolve(&store, &identity).await;
        assert!(account.login.expect("login").starts_with("user-"));
    }

    #[tokio::test]
    async fn test_email_prefers_identity_email() {
        let store = InMemoryAccountStore::new();
        let mut identity = NormalizedIdentity::empty(Provider::Google);
        identity.email = Some("alice@gmail.com".to_string());
        identity.name = Some("Alice".to_string());

        let account = resolve(&store, &identity).await;
        assert_eq!(account.email.as_deref(), Some("alice@gmail.com"));
    }

    #[tokio::test]
    async fn test_email_disambiguation_and_random_fallback() {
        let store = InMemoryAccountStore::new();
        let mut taken = Account::new();
        taken.login = Some("someone".to_string());
        taken.email = Some("bob@my-web-site.com".to_string());
        store.save_account(&taken).await.expect("seed");

        let account = resolve(&store, &identity_with_nickname("bob")).await;
        assert_eq!(account.email.as_deref(), Some("bob-1@my-web-site.com"));

        let config = ReconcileConfig {
            max_disambiguation_attempts: 1,
            ..ReconcileConfig::default()
        };
        let resolver = AccountFieldResolver::new(&store, &config);
        let mut account = Account::new();
        account.login = Some("bob".to_string());
        resolver
            .resolve_fields(&mut account, &NormalizedIdentity::empty(Provider::Twitter))
            .await
            .expect("resolution should succeed");
        let email = account.email.expect("email");
        let (local, domain) = email.split_once('@').expect("email form");
        assert_eq!(domain, "my-web-site.com");
        assert_eq!(local.len(), 7);
    }

    #[tokio::test]
    async fn test_password_placeholder_only_for_new_accounts() {
        let store = InMemoryAccountStore::new();
        let account = resolve(&store, &identity_with_nickname("carol")).await;
        let password = account.password.expect("placeholder should be set");
        assert!(password.len() >= 10);

        let config = ReconcileConfig::default();
        let resolver = AccountFieldResolver::new(&store, &config);
        let mut existing = Account::new();
        existing.id = "existing".to_string();
        resolver
            .resolve_fields(&mut existing, &identity_with_nickname("dave"))
            .await
            .expect("resolution should succeed");
        assert_eq!(existing.password, None);
    }

    #[tokio::test]
    async fn test_existing_values_are_kept() {
        let store = InMemoryAccountStore::new();
        let config = ReconcileConfig::default();
        let resolver = AccountFieldResolver::new(&store, &config);

        let mut account = Account::new();
        account.login = Some("keep-me".to_string());
        account.email = Some("keep@example.com".to_string());
        account.username = Some("Keeper".to_string());
        account.vk_addr = Some("https://vk.com/old".to_string());

        let mut identity = identity_with_nickname("other");
        identity.name = Some("Other".to_string());
        identity
            .profile_urls
            .insert(Provider::Vkontakte, "https://vk.com/new".to_string());
        identity
            .profile_urls
            .insert(Provider::Twitter, "https://twitter.com/new".to_string());

        resolver
            .resolve_fields(&mut account, &identity)
            .await
            .expect("resolution should succeed");

        assert_eq!(account.login.as_deref(), Some("keep-me"));
        assert_eq!(account.email.as_deref(), Some("keep@example.com"));
        assert_eq!(account.username.as_deref(), Some("Keeper"));
        assert_eq!(account.vk_addr.as_deref(), Some("https://vk.com/old"));
        assert_eq!(account.tw_addr.as_deref(), Some("https://twitter.com/new"));
    }

    #[test]
    fn test_suffixed() {
        assert_eq!(suffixed("name", 0), "name");
        assert_eq!(suffixed("name", 3), "name-3");
    }
}
