//! Persisted API key and bearer token.
//!
//! [`CredentialStore`] owns the two credential slots used by the API
//! client.  The API key is seeded once from page metadata; the bearer
//! token is written by the login flow and cleared by the client when
//! authentication fails.

use std::sync::Arc;

use tracing::{debug, info};

use crate::storage::{KeyValueStorage, MemoryStorage};

/// Name of the page metadata element that carries the API key.
pub const API_KEY_META_NAME: &str = "x-api-key";

/// Storage key names for the two credential slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    /// Key holding the API key sent as `x-api-key`.
    pub api_key: String,
    /// Key holding the JWT sent as `Authorization: Bearer`.
    pub auth_token: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            api_key: "addeva_api_key".to_string(),
            auth_token: "addeva_auth_token".to_string(),
        }
    }
}

/// Credential slots backed by a [`KeyValueStorage`].
///
/// Cheap to clone; clones share the same storage.  Empty values read as
/// absent.
#[derive(Clone)]
pub struct CredentialStore {
    storage: Arc<dyn KeyValueStorage>,
    keys: StorageKeys,
}

impl CredentialStore {
    /// Wrap a storage backend using the given key names.
    pub fn new(storage: Arc<dyn KeyValueStorage>, keys: StorageKeys) -> Self {
        Self { storage, keys }
    }

    /// A store backed by fresh [`MemoryStorage`] with default key names.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), StorageKeys::default())
    }

    /// Storage key names in use.
    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// The stored API key, if any.
    pub fn api_key(&self) -> Option<String> {
        self.read(&self.keys.api_key)
    }

    /// The stored bearer token, if any.
    pub fn auth_token(&self) -> Option<String> {
        self.read(&self.keys.auth_token)
    }

    /// Replace the stored API key.
    pub fn set_api_key(&self, key: &str) {
        self.storage.set(&self.keys.api_key, key);
    }

    /// Replace the stored bearer token.
    pub fn set_auth_token(&self, token: &str) {
        self.storage.set(&self.keys.auth_token, token);
    }

    /// Remove the bearer token.  Safe to call when none is stored.
    pub fn clear_auth(&self) {
        self.storage.remove(&self.keys.auth_token);
        debug!("auth token cleared");
    }

    /// Seed the API key from page metadata on load.
    ///
    /// Stores the trimmed `meta_content` only when no API key is stored
    /// yet and the content is not blank.  Returns whether a key was
    /// written.
    pub fn seed_api_key(&self, meta_content: Option<&str>) -> bool {
        if self.api_key().is_some() {
            return false;
        }
        let Some(key) = meta_content.map(str::trim).filter(|k| !k.is_empty()) else {
            return false;
        };
        self.set_api_key(key);
        info!("API key initialised from page metadata");
        true
    }

    fn read(&self, key: &str) -> Option<String> {
        self.storage.get(key).filter(|v| !v.is_empty())
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("keys", &self.keys)
            .field("has_api_key", &self.api_key().is_some())
            .field("has_auth_token", &self.auth_token().is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Page metadata
// ---------------------------------------------------------------------------

/// Find the `content` of `<meta name="x-api-key" ...>` in an HTML page.
pub fn extract_meta_api_key(html: &str) -> Option<String> {
    extract_meta_content(html, API_KEY_META_NAME)
}

/// Find the `content` attribute of the first `<meta>` whose `name`
/// matches `name` (case-insensitive).
pub fn extract_meta_content(html: &str, name: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let mut offset = 0;

    while let Some(found) = lower[offset..].find("<meta") {
        let start = offset + found + "<meta".len();
        let end = lower[start..].find('>').map_or(html.len(), |e| start + e);
        let attrs = parse_attributes(&html[start..end]);
        offset = end;

        let matches = attrs
            .iter()
            .any(|(k, v)| k == "name" && v.eq_ignore_ascii_case(name));
        if matches {
            return attrs
                .into_iter()
                .find(|(k, _)| k == "content")
                .map(|(_, v)| v);
        }
    }
    None
}

/// Parse `key="value"` / `key='value'` / `key=value` pairs.  Keys are
/// lower-cased.
fn parse_attributes(tag: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut rest = tag.trim_start_matches('/').trim();

    while !rest.is_empty() {
        let key_end = rest
            .find(|c: char| c == '=' || c.is_whitespace() || c == '/')
            .unwrap_or(rest.len());
        let key = rest[..key_end].to_ascii_lowercase();
        rest = rest[key_end..].trim_start();

        let value = if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            match after_eq.chars().next() {
                Some(q @ ('"' | '\'')) => {
                    let body = &after_eq[1..];
                    let close = body.find(q).unwrap_or(body.len());
                    rest = body.get(close + 1..).unwrap_or("");
                    body[..close].to_string()
                }
                _ => {
                    let close = after_eq
                        .find(char::is_whitespace)
                        .unwrap_or(after_eq.len());
                    rest = &after_eq[close..];
                    after_eq[..close].trim_end_matches('/').to_string()
                }
            }
        } else {
            if key.is_empty() {
                // Stray '/' or similar.
                rest = rest.get(1..).unwrap_or("");
            }
            String::new()
        };

        if !key.is_empty() {
            attrs.push((key, value));
        }
        rest = rest.trim_start();
    }
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values_read_as_absent() {
        let store = CredentialStore::in_memory();
        store.set_auth_token("");
        assert_eq!(store.auth_token(), None);
    }

    #[test]
    fn clear_auth_is_idempotent_and_keeps_api_key() {
        let store = CredentialStore::in_memory();
        store.set_api_key("key-1");
        store.set_auth_token("a.b.c");

        store.clear_auth();
        store.clear_auth();

        assert_eq!(store.auth_token(), None);
        assert_eq!(store.api_key().as_deref(), Some("key-1"));
    }

    #[test]
    fn seed_stores_trimmed_meta_value() {
        let store = CredentialStore::in_memory();
        assert!(store.seed_api_key(Some("  page-key \n")));
        assert_eq!(store.api_key().as_deref(), Some("page-key"));
    }

    #[test]
    fn seed_never_overwrites_existing_key() {
        let store = CredentialStore::in_memory();
        store.set_api_key("existing");
        assert!(!store.seed_api_key(Some("page-key")));
        assert_eq!(store.api_key().as_deref(), Some("existing"));
    }

    #[test]
    fn seed_ignores_missing_or_blank_meta() {
        let store = CredentialStore::in_memory();
        assert!(!store.seed_api_key(None));
        assert!(!store.seed_api_key(Some("   ")));
        assert_eq!(store.api_key(), None);
    }

    #[test]
    fn custom_keys_are_used() {
        let storage = Arc::new(MemoryStorage::new());
        let keys = StorageKeys {
            api_key: "k1".into(),
            auth_token: "k2".into(),
        };
        let store = CredentialStore::new(storage.clone(), keys);
        assert_eq!(store.keys().auth_token, "k2");
        store.set_auth_token("tok");
        assert_eq!(storage.get("k2").as_deref(), Some("tok"));
        assert_eq!(storage.get(&StorageKeys::default().auth_token), None);
    }

    #[test]
    fn meta_key_found_among_other_tags() {
        let html = r#"<html><head>
            <meta charset="utf-8">
            <meta name="viewport" content="width=device-width">
            <META NAME="X-API-KEY" CONTENT=" site-key-42 ">
        </head></html>"#;
        assert_eq!(extract_meta_api_key(html).as_deref(), Some(" site-key-42 "));
    }

    #[test]
    fn meta_key_attribute_order_and_quotes() {
        let html = "<meta content='abc' name='x-api-key' />";
        assert_eq!(extract_meta_api_key(html).as_deref(), Some("abc"));

        let html = "<meta name=x-api-key content=unquoted>";
        assert_eq!(extract_meta_api_key(html).as_deref(), Some("unquoted"));
    }

    #[test]
    fn meta_key_missing() {
        assert_eq!(extract_meta_api_key("<meta name=\"other\" content=\"x\">"), None);
        assert_eq!(extract_meta_api_key("<p>no meta here</p>"), None);
    }

    #[test]
    fn seed_from_page_html() {
        let store = CredentialStore::in_memory();
        let html = r#"<meta name="x-api-key" content="from-page">"#;
        assert!(store.seed_api_key(extract_meta_api_key(html).as_deref()));
        assert_eq!(store.api_key().as_deref(), Some("from-page"));
    }
}
