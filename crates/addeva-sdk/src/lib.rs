//! # ADDEVA SDK
//!
//! Client library for the ADDEVA site API.
//!
//! The SDK provides:
//!
//! * [`ApiClient`] — sends JSON requests with the stored API key and
//!   bearer token, and applies the authentication-failure policy on an
//!   expired token or HTTP 401.
//! * [`CredentialStore`] — the two persisted credential slots, over any
//!   [`KeyValueStorage`] ([`MemoryStorage`], [`FileStorage`]).
//! * [`jwt`] — payload decoding and expiry checks (no signature checks).
//! * [`PageLocation`], [`Navigator`], [`Notifier`] — the page the client
//!   runs in, behind ports so the policy is testable.
//! * [`ApiError`] — unified error type whose message is user-facing.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use addeva_sdk::{
//!     ApiClient, ApiRequest, ClientConfig, CredentialStore, FileStorage, LogNotifier,
//!     SimulatedPage,
//! };
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), addeva_sdk::ApiError> {
//! let config = ClientConfig::from_env();
//! let storage = FileStorage::in_config_dir().expect("no config directory");
//! let credentials = CredentialStore::new(Arc::new(storage), config.storage_keys.clone());
//! credentials.seed_api_key(Some("key-from-page-meta"));
//!
//! let client = ApiClient::new(
//!     config,
//!     credentials,
//!     Arc::new(SimulatedPage::at("/support/contact.html")),
//!     Arc::new(LogNotifier::new()),
//! );
//!
//! let reply = client
//!     .request(ApiRequest::new("/api/addeva/contact").json(json!({ "message": "Hello" })))
//!     .await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod jwt;
pub mod location;
pub mod notice;
pub mod request;
pub mod storage;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use credentials::{extract_meta_api_key, CredentialStore, StorageKeys};
pub use error::ApiError;
pub use location::{login_url, PageLocation};
pub use notice::{AuthFailureReason, AuthNotice, LogNotifier, Navigator, Notifier, SimulatedPage};
pub use request::{ApiRequest, RequestBody};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};

// Re-exported so callers can name methods without depending on reqwest.
pub use reqwest::Method;
