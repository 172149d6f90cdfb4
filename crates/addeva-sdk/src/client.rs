//! Authenticated HTTP client for the ADDEVA API.
//!
//! [`ApiClient`] injects the stored API key and bearer token into every
//! request, refuses to send a request whose token has already expired,
//! and applies one failure policy to both that case and HTTP 401.
//!
//! # Typical usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use addeva_sdk::{ApiClient, ApiRequest, ClientConfig, CredentialStore, LogNotifier, SimulatedPage};
//!
//! # async fn run() -> Result<(), addeva_sdk::ApiError> {
//! let client = ApiClient::new(
//!     ClientConfig::from_env(),
//!     CredentialStore::in_memory(),
//!     Arc::new(SimulatedPage::at("/products/index.html")),
//!     Arc::new(LogNotifier::new()),
//! );
//!
//! let products = client.request(ApiRequest::new("/api/addeva/products").get()).await?;
//! println!("{products}");
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::error::ApiError;
use crate::jwt;
use crate::location;
use crate::notice::{AuthFailureReason, AuthNotice, Navigator, Notifier};
use crate::request::{assemble_headers, ApiRequest, DerivedHeaders};

/// Client for same-origin API calls carrying the stored credentials.
///
/// Cheap to clone; clones share the HTTP connection pool, the credential
/// store and the page ports.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    credentials: CredentialStore,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
}

impl ApiClient {
    /// Create a client with a default [`reqwest::Client`].
    pub fn new(
        config: ClientConfig,
        credentials: CredentialStore,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            config: Arc::new(config),
            credentials,
            navigator,
            notifier,
        }
    }

    /// Use a preconfigured HTTP client (proxies, TLS roots, timeouts).
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    /// Send `req` and return the parsed JSON response.
    ///
    /// Fails with [`ApiError::LoginRequired`] when the stored token has
    /// expired (no request is sent) or the server answers 401; in both
    /// cases [`handle_auth_failure`](Self::handle_auth_failure) has run.
    /// Other failures leave the credentials and the page untouched.
    pub async fn request(&self, req: ApiRequest) -> Result<Value, ApiError> {
        let (path, method, body, caller_headers) = req.into_parts();
        if path.trim().is_empty() {
            return Err(ApiError::Config("request path must not be empty".into()));
        }

        let api_key = self.credentials.api_key();
        let auth_token = self.credentials.auth_token();

        if let Some(token) = auth_token.as_deref() {
            if jwt::is_expired(token, self.config.skew_secs) {
                warn!(%path, "auth token expired; request not sent");
                self.handle_auth_failure(AuthFailureReason::TokenExpired);
                return Err(self.login_required(AuthFailureReason::TokenExpired, None));
            }
        }

        let headers = assemble_headers(
            DerivedHeaders {
                api_key_header: &self.config.api_key_header,
                api_key: api_key.as_deref(),
                bearer_token: auth_token.as_deref(),
            },
            &caller_headers,
        )?;

        let url = self.resolve_url(&path);
        debug!(%method, %url, "sending API request");

        let mut builder = self.http.request(method.clone(), &url).headers(headers);
        if let Some(bytes) = body.to_bytes() {
            builder = builder.body(bytes);
        }

        let res = builder.send().await.map_err(|e| {
            let err = ApiError::from(e);
            error!(%method, %path, error = %err, "API request failed");
            err
        })?;

        let status = res.status();

        if status == StatusCode::UNAUTHORIZED {
            warn!(%method, %path, "API answered 401");
            self.handle_auth_failure(AuthFailureReason::Unauthorized);

            let text = res.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<Value>(&text)
                .ok()
                .as_ref()
                .and_then(detail_message);
            return Err(self.login_required(AuthFailureReason::Unauthorized, detail));
        }

        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            let message = error_message(status, &text);
            error!(%method, %path, status = status.as_u16(), error = %message, "API request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = res.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            error!(%method, %path, error = %e, "API response is not valid JSON");
            ApiError::Decode(e.to_string())
        })
    }

    /// Send `req` and deserialize the JSON response into `T`.
    pub async fn request_as<T: DeserializeOwned>(&self, req: ApiRequest) -> Result<T, ApiError> {
        let value = self.request(req).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// `GET path`.
    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.request(ApiRequest::new(path).get()).await
    }

    /// `POST path` with a JSON body.
    pub async fn post_json(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.request(ApiRequest::new(path).json(body)).await
    }

    // ------------------------------------------------------------------
    // Authentication failure
    // ------------------------------------------------------------------

    /// Apply the authentication-failure policy.
    ///
    /// In debug mode (the configured query flag is truthy) the token is
    /// kept, the page stays put, and a notice with a manual login link is
    /// shown.  Otherwise the token is cleared and the page is sent to the
    /// login destination, unless it is already there.
    ///
    /// Safe to call repeatedly.
    pub fn handle_auth_failure(&self, reason: AuthFailureReason) {
        let current = self.navigator.current_location();
        let login_url = location::login_url(&self.config.login_path, &current);

        if current.debug_enabled(&self.config.debug_param) {
            warn!(reason = reason.code(), "debug mode: keeping auth token and staying on page");
            self.notifier.show_auth_notice(&AuthNotice {
                reason,
                login_url,
                message: self.config.login_required_message.clone(),
            });
            return;
        }

        self.credentials.clear_auth();

        if current.is_login_page(&self.config.login_path) {
            debug!(reason = reason.code(), "already on login page; not redirecting");
            return;
        }

        info!(reason = reason.code(), url = %login_url, "redirecting to login");
        self.navigator.navigate(&login_url);
    }

    fn login_required(&self, reason: AuthFailureReason, detail: Option<String>) -> ApiError {
        ApiError::LoginRequired {
            message: detail.unwrap_or_else(|| self.config.login_required_message.clone()),
            reason,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The credential store this client reads from.
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn resolve_url(&self, path: &str) -> String {
        let lower = path.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return path.to_string();
        }
        let base = self.config.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }
}

/// The `detail` field of a FastAPI-style error body, if truthy.
fn detail_message(body: &Value) -> Option<String> {
    match body.get("detail")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

/// Message for a non-401 error response: JSON `detail`, else raw text for
/// non-JSON bodies, else `API Error: <status> <reason>`.
fn error_message(status: StatusCode, body: &str) -> String {
    let generic = || {
        format!(
            "API Error: {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or_default()
        )
        .trim_end()
        .to_string()
    };

    match serde_json::from_str::<Value>(body) {
        Ok(json) => detail_message(&json).unwrap_or_else(generic),
        Err(_) if !body.is_empty() => body.to_string(),
        Err(_) => generic(),
    }
}
