//! Page side effects of the authentication-failure policy.
//!
//! The policy either navigates to the login page or, in debug mode,
//! shows a notice instead.  Both effects go through the [`Navigator`] and
//! [`Notifier`] ports so the policy can run without a real page.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tracing::{info, warn};

use crate::location::PageLocation;

/// What triggered the authentication-failure policy.
///
/// Purely diagnostic: both reasons are handled identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailureReason {
    /// The stored bearer token expired before the request was sent.
    TokenExpired,
    /// The server answered HTTP 401.
    Unauthorized,
}

impl AuthFailureReason {
    /// Machine-readable reason code.
    pub fn code(self) -> &'static str {
        match self {
            Self::TokenExpired => "jwt_expired",
            Self::Unauthorized => "http_401",
        }
    }
}

impl fmt::Display for AuthFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Notice shown in debug mode instead of redirecting to the login page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthNotice {
    /// Reason code, for diagnostics.
    pub reason: AuthFailureReason,
    /// Manual link to the login destination.
    pub login_url: String,
    /// User-facing message.
    pub message: String,
}

impl fmt::Display for AuthNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[auth debug] {} (reason: {}) login: {}",
            self.message, self.reason, self.login_url
        )
    }
}

/// Surfaces a persistent on-page notice.
pub trait Notifier: Send + Sync {
    /// Show `notice` until the page is reloaded.
    fn show_auth_notice(&self, notice: &AuthNotice);
}

/// Reads and changes the page location.
pub trait Navigator: Send + Sync {
    /// Where the page currently is.
    fn current_location(&self) -> PageLocation;

    /// Send the page to `url`.
    fn navigate(&self, url: &str);
}

// ---------------------------------------------------------------------------
// LogNotifier
// ---------------------------------------------------------------------------

/// Notifier that logs each notice and keeps the latest one visible.
#[derive(Debug, Default)]
pub struct LogNotifier {
    current: Mutex<Option<AuthNotice>>,
}

impl LogNotifier {
    /// Create a notifier with no notice shown.
    pub fn new() -> Self {
        Self::default()
    }

    /// The notice currently shown, if any.
    pub fn current(&self) -> Option<AuthNotice> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Dismiss the notice, as a page reload would.
    pub fn clear(&self) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl Notifier for LogNotifier {
    fn show_auth_notice(&self, notice: &AuthNotice) {
        warn!(
            reason = notice.reason.code(),
            login_url = %notice.login_url,
            "{}",
            notice.message
        );
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(notice.clone());
    }
}

// ---------------------------------------------------------------------------
// SimulatedPage
// ---------------------------------------------------------------------------

/// In-process page: tracks a location and records every navigation.
#[derive(Debug)]
pub struct SimulatedPage {
    location: Mutex<PageLocation>,
    history: Mutex<Vec<String>>,
}

impl SimulatedPage {
    /// Start at `location`.
    pub fn new(location: PageLocation) -> Self {
        Self {
            location: Mutex::new(location),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Start at the location parsed from `url`.
    pub fn at(url: &str) -> Self {
        Self::new(PageLocation::parse(url))
    }

    /// Every URL navigated to, oldest first.
    pub fn navigations(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for SimulatedPage {
    fn default() -> Self {
        Self::new(PageLocation::default())
    }
}

impl Navigator for SimulatedPage {
    fn current_location(&self) -> PageLocation {
        self.location
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn navigate(&self, url: &str) {
        info!(url, "navigating");
        *self.location.lock().unwrap_or_else(PoisonError::into_inner) = PageLocation::parse(url);
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_codes() {
        assert_eq!(AuthFailureReason::TokenExpired.code(), "jwt_expired");
        assert_eq!(AuthFailureReason::Unauthorized.to_string(), "http_401");
    }

    #[test]
    fn log_notifier_keeps_latest_until_cleared() {
        let notifier = LogNotifier::new();
        assert!(notifier.current().is_none());

        let notice = AuthNotice {
            reason: AuthFailureReason::Unauthorized,
            login_url: "/support/login.html?mode=login&next=%2F".into(),
            message: "Login required.".into(),
        };
        notifier.show_auth_notice(&notice);
        assert_eq!(notifier.current(), Some(notice));

        notifier.clear();
        assert!(notifier.current().is_none());
    }

    #[test]
    fn simulated_page_moves_on_navigate() {
        let page = SimulatedPage::at("/shop?debug=1");
        page.navigate("/support/login.html?mode=login&next=%2Fshop");

        assert_eq!(page.current_location().path(), "/support/login.html");
        assert_eq!(
            page.navigations(),
            vec!["/support/login.html?mode=login&next=%2Fshop".to_string()]
        );
    }

    #[test]
    fn notice_display_includes_reason_and_link() {
        let notice = AuthNotice {
            reason: AuthFailureReason::TokenExpired,
            login_url: "/login".into(),
            message: "Login required.".into(),
        };
        let shown = notice.to_string();
        assert!(shown.contains("jwt_expired"));
        assert!(shown.contains("/login"));
    }
}
