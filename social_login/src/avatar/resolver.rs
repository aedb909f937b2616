use serde_json::Value;
use url::Url;

use crate::provider::{NormalizedIdentity, Provider};

use super::fetch::JsonFetcher;

/// Final avatar URL for the identity, or `None` when none is available.
///
/// Only Facebook needs a network round trip; its failures are logged and
/// reported as "no avatar".
pub async fn resolve_avatar(
    identity: &NormalizedIdentity,
    fetcher: &dyn JsonFetcher,
) -> Option<String> {
    match identity.provider {
        Provider::Google => identity.avatar_seed.as_deref().map(enlarge_google_avatar),
        Provider::Facebook => {
            let seed = identity.avatar_seed.as_deref()?;
            resolve_facebook_avatar(seed, fetcher).await
        }
        Provider::Twitter => identity
            .avatar_seed
            .as_deref()
            .map(|seed| seed.replace("_normal", "")),
        Provider::Vkontakte => raw_info_string(&identity.raw_info, "photo_200_orig"),
        Provider::Odnoklassniki => raw_info_string(&identity.raw_info, "pic_2"),
    }
}

fn enlarge_google_avatar(seed: &str) -> String {
    seed.replace("sz=50", "sz=200").replace("s50", "s200")
}

/// Graph endpoint asking for the large picture as JSON instead of a redirect
fn facebook_graph_url(seed: &str) -> Option<String> {
    let mut url = Url::parse(seed).ok()?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "type" && k != "redirect")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.set_query(None);
    {
        let mut query = url.query_pairs_mut();
        for (k, v) in &kept {
            query.append_pair(k, v);
        }
        query.append_pair("type", "large").append_pair("redirect", "false");
    }
    Some(url.into())
}

async fn resolve_facebook_avatar(seed: &str, fetcher: &dyn JsonFetcher) -> Option<String> {
    let Some(graph_url) = facebook_graph_url(seed) else {
        tracing::warn!("Facebook avatar seed is not a valid URL: {}", seed);
        return None;
    };

    let response = match fetcher.fetch_json(&graph_url).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Facebook avatar lookup failed: {}", e);
            return None;
        }
    };

    let data = response.get("data")?;
    if data
        .get("is_silhouette")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        tracing::debug!("Facebook avatar is the default silhouette, skipping");
        return None;
    }

    let avatar = data
        .get("url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_string);
    if avatar.is_none() {
        tracing::warn!("Facebook avatar response has no url: {}", response);
    }
    avatar
}

fn raw_info_string(raw_info: &Value, key: &str) -> Option<String> {
    raw_info
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
