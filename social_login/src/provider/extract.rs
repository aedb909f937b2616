use serde_json::Value;
use std::collections::BTreeMap;

use super::types::{CredentialPayload, NormalizedIdentity, Provider};

/// Normalize a raw JSON payload for `provider`.
///
/// An unparseable payload yields [`NormalizedIdentity::empty`]; callers treat that
/// as "no identity information available".
pub fn normalize(raw: &str, provider: Provider) -> NormalizedIdentity {
    match serde_json::from_str::<Value>(raw) {
        Ok(payload) => provider.extract(&payload),
        Err(e) => {
            tracing::warn!("Unparseable {} payload, continuing without identity: {}", provider, e);
            NormalizedIdentity::empty(provider)
        }
    }
}

impl Provider {
    /// Apply this provider's extraction rules to an already parsed payload.
    pub fn extract(&self, payload: &Value) -> NormalizedIdentity {
        let mut identity = NormalizedIdentity::empty(*self);

        identity.remote_id = lookup_string(payload, &["uid"]);
        identity.name = lookup_string(payload, &["info", "name"]);
        identity.avatar_seed = lookup_string(payload, &["info", "image"]);
        identity.profile_urls = profile_urls(payload);
        identity.raw_info = lookup(payload, &["extra", "raw_info"])
            .cloned()
            .unwrap_or(Value::Null);
        identity.credentials = credential_payload(payload);

        match self {
            Self::Google | Self::Facebook => {
                identity.email = lookup_string(payload, &["info", "email"]);
            }
            Self::Vkontakte | Self::Twitter => {
                identity.nickname = lookup_string(payload, &["info", "nickname"]);
            }
            Self::Odnoklassniki => {}
        }

        identity
    }
}

fn profile_urls(payload: &Value) -> BTreeMap<Provider, String> {
    Provider::ALL
        .into_iter()
        .filter_map(|p| {
            lookup_string(payload, &["info", "urls", p.display_name()]).map(|url| (p, url))
        })
        .collect()
}

fn credential_payload(payload: &Value) -> CredentialPayload {
    CredentialPayload {
        token: lookup_string(payload, &["credentials", "token"]),
        secret: lookup_string(payload, &["credentials", "secret"]),
        expires_in: lookup(payload, &["credentials", "expires_at"]).and_then(as_seconds),
    }
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

/// Non-empty string at `path`; numbers are accepted and rendered as decimal
fn lookup_string(value: &Value, path: &[&str]) -> Option<String> {
    match lookup(value, path)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_seconds(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn full_payload(provider: &str) -> String {
        json!({
            "provider": provider,
            "uid": "1001",
            "info": {
                "name": "Alice Doe",
                "email": "alice@example.com",
                "nickname": "alice_d",
                "image": "https://img.example.com/alice_normal.png",
                "urls": {
                    "Google": "https://plus.google.com/1001",
                    "Facebook": "https://facebook.com/alice",
                    "Vkontakte": "https://vk.com/alice_d",
                    "Twitter": "https://twitter.com/alice_d",
                    "Odnoklassniki": "https://ok.ru/profile/1001"
                }
            },
            "extra": { "raw_info": { "photo_200_orig": "https://vk.com/p.jpg", "pic_2": "https://ok.ru/p.jpg" } },
            "credentials": { "token": "tok", "secret": "sec", "expires_at": 3600 }
        })
        .to_string()
    }

    #[test]
    fn test_google_extraction() {
        let identity = normalize(&full_payload("google_oauth2"), Provider::Google);

        assert_eq!(identity.provider, Provider::Google);
        assert_eq!(identity.remote_id.as_deref(), Some("1001"));
        assert_eq!(identity.name.as_deref(), Some("Alice Doe"));
        assert_eq!(identity.email.as_deref(), Some("alice@example.com"));
        assert_eq!(identity.nickname, None);
        assert_eq!(
            identity.profile_urls.get(&Provider::Google).map(String::as_str),
            Some("https://plus.google.com/1001")
        );
    }

    #[test]
    fn test_facebook_extraction() {
        let identity = normalize(&full_payload("facebook"), Provider::Facebook);

        assert_eq!(identity.email.as_deref(), Some("alice@example.com"));
        assert_eq!(identity.nickname, None);
        assert_eq!(
            identity.profile_urls.get(&Provider::Facebook).map(String::as_str),
            Some("https://facebook.com/alice")
        );
    }

    #[test]
    fn test_vkontakte_extraction() {
        let identity = normalize(&full_payload("vkontakte"), Provider::Vkontakte);

        assert_eq!(identity.nickname.as_deref(), Some("alice_d"));
        assert_eq!(identity.email, None);
        assert_eq!(
            identity.profile_urls.get(&Provider::Vkontakte).map(String::as_str),
            Some("https://vk.com/alice_d")
        );
        assert_eq!(identity.raw_info["photo_200_orig"], "https://vk.com/p.jpg");
    }

    #[test]
    fn test_twitter_extraction() {
        let identity = normalize(&full_payload("twitter"), Provider::Twitter);

        assert_eq!(identity.nickname.as_deref(), Some("alice_d"));
        assert_eq!(identity.email, None);
        assert_eq!(
            identity.profile_urls.get(&Provider::Twitter).map(String::as_str),
            Some("https://twitter.com/alice_d")
        );
        assert_eq!(identity.credentials.secret.as_deref(), Some("sec"));
    }

    #[test]
    fn test_odnoklassniki_extraction() {
        let identity = normalize(&full_payload("odnoklassniki"), Provider::Odnoklassniki);

        assert_eq!(identity.nickname, None);
        assert_eq!(identity.email, None);
        assert_eq!(identity.name.as_deref(), Some("Alice Doe"));
        assert_eq!(
            identity.profile_urls.get(&Provider::Odnoklassniki).map(String::as_str),
            Some("https://ok.ru/profile/1001")
        );
    }

    #[test]
    fn test_credentials_extraction() {
        let identity = normalize(&full_payload("facebook"), Provider::Facebook);
        assert_eq!(
            identity.credentials,
            CredentialPayload {
                token: Some("tok".to_string()),
                secret: Some("sec".to_string()),
                expires_in: Some(3600),
            }
        );
    }

    #[test]
    fn test_numeric_uid_and_string_expiry() {
        let raw = json!({
            "uid": 42,
            "credentials": { "token": "t", "expires_at": "120" }
        })
        .to_string();
        let identity = normalize(&raw, Provider::Vkontakte);

        assert_eq!(identity.remote_id.as_deref(), Some("42"));
        assert_eq!(identity.credentials.expires_in, Some(120));
    }

    #[test]
    fn test_unparseable_payload_is_empty() {
        let identity = normalize("{not json", Provider::Twitter);
        assert_eq!(identity, NormalizedIdentity::empty(Provider::Twitter));
    }

    #[test]
    fn test_missing_intermediate_keys() {
        let cases = [
            json!({}),
            json!({ "info": null }),
            json!({ "info": "flat string" }),
            json!({ "info": { "urls": [] } }),
            json!({ "extra": { "raw_info": null }, "credentials": 7 }),
            json!([1, 2, 3]),
        ];

        for payload in cases {
            let identity = Provider::Google.extract(&payload);
            assert_eq!(identity.name, None);
            assert_eq!(identity.email, None);
            assert!(identity.profile_urls.is_empty());
            assert_eq!(identity.credentials, CredentialPayload::default());
        }
    }

    #[test]
    fn test_blank_strings_are_not_provided() {
        let raw = json!({ "info": { "name": "  ", "email": "" } }).to_string();
        let identity = normalize(&raw, Provider::Google);
        assert_eq!(identity.name, None);
        assert_eq!(identity.email, None);
    }

    proptest! {
        #[test]
        fn test_normalize_never_panics(raw in "\\PC{0,200}") {
            for provider in Provider::ALL {
                let identity = normalize(&raw, provider);
                prop_assert_eq!(identity.provider, provider);
            }
        }
    }
}
