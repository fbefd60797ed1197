//! API key generation and hashing.
//!
//! Keys are shown to the caller exactly once. The database stores only the SHA-256 of the key,
//! which is what bearer tokens are looked up by, and a short display prefix.

use base64::{Engine as _, engine::general_purpose};
use rand::prelude::RngExt;
use rand::rng;
use sha2::{Digest, Sha256};

const KEY_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const KEY_BODY_LEN: usize = 32;
const DISPLAY_PREFIX_LEN: usize = 12;

/// Prefixes accepted by [`is_valid_url_safe_key`].
pub const URL_SAFE_KEY_PREFIXES: &[&str] = &["neura", "test"];

/// Generate an API key: `prefix` followed by 32 characters from `[a-z0-9]`.
///
/// ```ignore
/// let key = generate_api_key("neura_");
/// assert_eq!(key.len(), 38);
/// ```
pub fn generate_api_key(prefix: &str) -> String {
    let mut rng = rng();
    let body: String = (0..KEY_BODY_LEN)
        .map(|_| KEY_ALPHABET[rng.random_range(0..KEY_ALPHABET.len())] as char)
        .collect();

    format!("{prefix}{body}")
}

/// Lowercase hex SHA-256 of the key, used as the lookup column.
pub fn hash_api_key(key: &str) -> String {
    format!("{:x}", Sha256::digest(key.as_bytes()))
}

/// First 12 characters of the key followed by `...`, safe to display.
pub fn key_display_prefix(key: &str) -> String {
    let head: String = key.chars().take(DISPLAY_PREFIX_LEN).collect();
    format!("{head}...")
}

/// Generate a `prefix_` + base64url(32 random bytes) key, 43 characters after the underscore.
pub fn generate_url_safe_key(prefix: &str) -> String {
    let mut key_bytes = [0u8; 32];
    rng().fill(&mut key_bytes);

    format!("{prefix}_{}", general_purpose::URL_SAFE_NO_PAD.encode(key_bytes))
}

/// Check the shape of a key produced by [`generate_url_safe_key`].
pub fn is_valid_url_safe_key(key: &str) -> bool {
    let Some((prefix, body)) = key.split_once('_') else {
        return false;
    };

    URL_SAFE_KEY_PREFIXES.contains(&prefix) && body.len() == 43
}
