use ring::rand::SecureRandom;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum UtilError {
    #[error("Crypto error: {0}")]
    Crypto(String),
}

/// Generates `len` lowercase hex characters from the system RNG.
pub(crate) fn gen_random_hex(len: usize) -> Result<String, UtilError> {
    let rng = ring::rand::SystemRandom::new();
    let mut bytes = vec![0u8; len.div_ceil(2)];
    rng.fill(&mut bytes)
        .map_err(|_| UtilError::Crypto("Failed to generate random bytes".to_string()))?;

    let mut hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    hex.truncate(len);
    Ok(hex)
}

/// Turns a display name into a lowercase, URL-safe login candidate.
///
/// Runs of anything outside `[a-z0-9]` collapse into a single `-`, and
/// leading/trailing separators are dropped. Names without any ASCII
/// alphanumerics produce an empty string.
pub(crate) fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_gen_random_hex_length_and_charset() {
        for len in [5, 7, 16] {
            let hex = gen_random_hex(len).expect("random source should be available");
            assert_eq!(hex.len(), len);
            assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_gen_random_hex_differs_between_calls() {
        let a = gen_random_hex(16).expect("random source should be available");
        let b = gen_random_hex(16).expect("random source should be available");
        assert_ne!(a, b);
    }

    #[test]
    fn test_slugify_examples() {
        assert_eq!(slugify("Alice"), "alice");
        assert_eq!(slugify("John  Smith"), "john-smith");
        assert_eq!(slugify("  O'Neil, Jr. "), "o-neil-jr");
        assert_eq!(slugify("user_42"), "user-42");
        assert_eq!(slugify("Иван Петров"), "");
        assert_eq!(slugify(""), "");
    }

    proptest! {
        #[test]
        fn test_slugify_is_url_safe(name in "\\PC{0,64}") {
            let slug = slugify(&name);
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
        }
    }
}
