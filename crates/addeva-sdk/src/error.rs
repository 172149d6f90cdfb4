//! SDK error types.
//!
//! [`ApiError`] is the single error type returned by every fallible
//! operation in the SDK.  Its `Display` output is the human-readable
//! message meant for the end user, so callers can surface it as-is.

use crate::notice::AuthFailureReason;

/// Error type for all SDK operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The bearer token expired before the call, or the server answered 401.
    ///
    /// The authentication-failure policy has already run when this is
    /// returned.
    #[error("{message}")]
    LoginRequired {
        /// Message to show to the user.
        message: String,
        /// What triggered the failure (diagnostic only).
        reason: AuthFailureReason,
    },

    /// The server answered with a non-success status other than 401.
    #[error("{message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Best-effort message extracted from the error body.
        message: String,
    },

    /// The response body could not be parsed as the expected JSON.
    #[error("{0}")]
    Decode(String),

    /// The request never produced a response (DNS, connection, abort).
    #[error("{0}")]
    Transport(String),

    /// Invalid configuration or request (bad URL, bad header).
    #[error("{0}")]
    Config(String),
}

impl ApiError {
    /// Diagnostic reason code when this error came from the
    /// authentication-failure policy.
    pub fn reason(&self) -> Option<AuthFailureReason> {
        match self {
            Self::LoginRequired { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Whether the failure requires the user to log in again.
    pub fn is_login_required(&self) -> bool {
        matches!(self, Self::LoginRequired { .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        let message = error_chain(&e);
        if message.is_empty() {
            ApiError::Transport(NETWORK_ERROR_MESSAGE.to_string())
        } else {
            ApiError::Transport(message)
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}

/// Fallback message for transport failures that carry no description.
pub const NETWORK_ERROR_MESSAGE: &str = "A network error occurred.";

/// `outer: cause: root cause`, skipping causes that repeat the previous text.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut last = message.clone();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !text.is_empty() && text != last {
            if !message.is_empty() {
                message.push_str(": ");
            }
            message.push_str(&text);
            last = text;
        }
        source = cause.source();
    }
    message
}
