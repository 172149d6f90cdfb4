//! Request descriptors and header assembly.
//!
//! An [`ApiRequest`] is built per call and consumed by
//! [`ApiClient::request`](crate::ApiClient::request).
//!
//! ```rust
//! use addeva_sdk::ApiRequest;
//! use serde_json::json;
//!
//! let req = ApiRequest::new("/api/addeva/contact")
//!     .json(json!({ "name": "Sato", "message": "Hello" }))
//!     .header("x-request-source", "contact-form");
//! assert_eq!(req.method_ref(), &reqwest::Method::POST);
//! ```

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;

use crate::error::ApiError;

/// Payload of a request, chosen explicitly by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// Structured value, sent as a JSON string.
    Json(serde_json::Value),
    /// Raw text, sent unmodified.
    Text(String),
    /// Raw bytes, sent unmodified.
    Bytes(Vec<u8>),
}

impl RequestBody {
    /// Wire representation, or `None` for an empty body.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Self::Empty => None,
            Self::Json(value) => Some(value.to_string().into_bytes()),
            Self::Text(text) => Some(text.clone().into_bytes()),
            Self::Bytes(bytes) => Some(bytes.clone()),
        }
    }
}

/// One API call: path, method, body and caller-supplied headers.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    path: String,
    method: Method,
    body: RequestBody,
    headers: Vec<(String, String)>,
}

impl ApiRequest {
    /// A `POST` to `path` with no body.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: Method::POST,
            body: RequestBody::Empty,
            headers: Vec::new(),
        }
    }

    /// Set the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Shorthand for `.method(Method::GET)`.
    #[must_use]
    pub fn get(self) -> Self {
        self.method(Method::GET)
    }

    /// Send `value` as JSON.
    #[must_use]
    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    /// Serialize `value` and send it as JSON.
    pub fn json_value<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, ApiError> {
        Ok(self.json(serde_json::to_value(value)?))
    }

    /// Send `text` as-is.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.body = RequestBody::Text(text.into());
        self
    }

    /// Send `bytes` as-is.
    #[must_use]
    pub fn bytes(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.body = RequestBody::Bytes(bytes.into());
        self
    }

    /// Replace the body.
    #[must_use]
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Add a caller header.  Caller headers override every default.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// HTTP method.
    pub fn method_ref(&self) -> &Method {
        &self.method
    }

    /// Request body.
    pub fn body_ref(&self) -> &RequestBody {
        &self.body
    }

    /// Caller headers in insertion order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub(crate) fn into_parts(self) -> (String, Method, RequestBody, Vec<(String, String)>) {
        (self.path, self.method, self.body, self.headers)
    }
}

/// Credentials and names used to derive the automatic headers.
#[derive(Debug, Clone, Copy)]
pub struct DerivedHeaders<'a> {
    /// Header name for the API key (usually `x-api-key`).
    pub api_key_header: &'a str,
    /// Stored API key.
    pub api_key: Option<&'a str>,
    /// Stored bearer token.
    pub bearer_token: Option<&'a str>,
}

/// Assemble the outgoing headers.
///
/// Precedence, lowest first: `Content-Type: application/json`, the API-key
/// header, `Authorization: Bearer`, then caller headers.  A derived header
/// is only added when the caller did not supply a non-empty header of the
/// same (case-insensitive) name.
pub fn assemble_headers(
    derived: DerivedHeaders<'_>,
    caller: &[(String, String)],
) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for (name, value) in caller {
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|e| ApiError::Config(format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ApiError::Config(format!("invalid value for header {name}: {e}")))?;
        headers.insert(name, value);
    }

    if let Some(api_key) = derived.api_key.filter(|k| !k.is_empty()) {
        let name = HeaderName::from_bytes(derived.api_key_header.as_bytes()).map_err(|e| {
            ApiError::Config(format!(
                "invalid API key header name {:?}: {e}",
                derived.api_key_header
            ))
        })?;
        if !has_value(&headers, &name) {
            let value = HeaderValue::from_str(api_key).map_err(|e| {
                ApiError::Config(format!("stored API key is not a valid header: {e}"))
            })?;
            headers.insert(name, value);
        }
    }

    if let Some(token) = derived.bearer_token.filter(|t| !t.is_empty()) {
        if !has_value(&headers, &AUTHORIZATION) {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                ApiError::Config(format!("stored auth token is not a valid header: {e}"))
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
    }

    Ok(headers)
}

fn has_value(headers: &HeaderMap, name: &HeaderName) -> bool {
    headers.get(name).is_some_and(|v| !v.is_empty())
}
