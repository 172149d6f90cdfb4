//! Client configuration.
//!
//! [`ClientConfig`] collects everything the API client needs besides its
//! injected services.  It can be built from environment variables at
//! startup or from [`Default`] in tests.

use crate::credentials::StorageKeys;
use crate::jwt::DEFAULT_SKEW_SECS;

/// Default login-required message.
pub const LOGIN_REQUIRED_MESSAGE: &str = "Login required.";

/// Settings for [`ApiClient`](crate::ApiClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Origin that request paths are resolved against.
    pub base_url: String,
    /// Path of the login page.
    pub login_path: String,
    /// Seconds subtracted from a token's `exp` before comparing it to now.
    pub skew_secs: i64,
    /// Query parameter that switches debug mode on.
    pub debug_param: String,
    /// Header carrying the API key.
    pub api_key_header: String,
    /// Message returned when the user must log in again.
    pub login_required_message: String,
    /// Storage key names for the credential slots.
    pub storage_keys: StorageKeys,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            login_path: "/support/login.html".to_string(),
            skew_secs: DEFAULT_SKEW_SECS,
            debug_param: "debug".to_string(),
            api_key_header: "x-api-key".to_string(),
            login_required_message: LOGIN_REQUIRED_MESSAGE.to_string(),
            storage_keys: StorageKeys::default(),
        }
    }
}

impl ClientConfig {
    /// Build the configuration from environment variables.
    ///
    /// | Variable               | Default                 | Description                          |
    /// |------------------------|-------------------------|--------------------------------------|
    /// | `ADDEVA_BASE_URL`      | `http://localhost:8000` | API origin                           |
    /// | `ADDEVA_LOGIN_PATH`    | `/support/login.html`   | Login page path                      |
    /// | `ADDEVA_JWT_SKEW_SECS` | `30`                    | Clock-skew allowance for `exp`       |
    /// | `ADDEVA_DEBUG_PARAM`   | `debug`                 | Query parameter enabling debug mode  |
    ///
    /// Unset or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            base_url: non_empty("ADDEVA_BASE_URL").unwrap_or(defaults.base_url),
            login_path: non_empty("ADDEVA_LOGIN_PATH").unwrap_or(defaults.login_path),
            skew_secs: non_empty("ADDEVA_JWT_SKEW_SECS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.skew_secs),
            debug_param: non_empty("ADDEVA_DEBUG_PARAM").unwrap_or(defaults.debug_param),
            ..defaults
        }
    }

    /// Override the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the skew allowance.
    #[must_use]
    pub fn with_skew_secs(mut self, skew_secs: i64) -> Self {
        self.skew_secs = skew_secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let cfg = ClientConfig::from_lookup(lookup_from(&[]));
        assert_eq!(cfg.base_url, "http://localhost:8000");
        assert_eq!(cfg.login_path, "/support/login.html");
        assert_eq!(cfg.skew_secs, 30);
        assert_eq!(cfg.debug_param, "debug");
        assert_eq!(cfg.api_key_header, "x-api-key");
    }

    #[test]
    fn env_values_override_defaults() {
        let cfg = ClientConfig::from_lookup(lookup_from(&[
            ("ADDEVA_BASE_URL", "https://addeva.example"),
            ("ADDEVA_LOGIN_PATH", "/login"),
            ("ADDEVA_JWT_SKEW_SECS", "5"),
        ]));
        assert_eq!(cfg.base_url, "https://addeva.example");
        assert_eq!(cfg.login_path, "/login");
        assert_eq!(cfg.skew_secs, 5);
    }

    #[test]
    fn bad_skew_falls_back() {
        let cfg = ClientConfig::from_lookup(lookup_from(&[("ADDEVA_JWT_SKEW_SECS", "soon")]));
        assert_eq!(cfg.skew_secs, DEFAULT_SKEW_SECS);
    }
}
