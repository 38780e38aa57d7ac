//! Single-flight access token renewal for the medboard admin client
//!
//! An admin session consists of a short-lived access token and, depending on
//! the backend's trust model, a refresh token held either by the client or in
//! an HttpOnly cookie. When the backend rejects the access token, the session
//! is renewed transparently. This crate holds the parts of that process that
//! are independent of any HTTP client:
//!
//! * [`TokenStore`] holds the current [`Credentials`], publishes changes, and
//!   persists them through a [`CredentialStorage`][storage::CredentialStorage]
//!   backend. Storage failures never surface to callers.
//! * [`RefreshCoordinator`] guarantees that at most one refresh call is in
//!   flight. Callers that observe an authentication failure while a refresh is
//!   underway are queued in a [`PendingRequestQueue`] and receive the same
//!   outcome, in arrival order, once the refresh settles.
//! * [`RefreshSource`] is the seam to the issuing authority.
//!
//! ```
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use medboard_tokens::{Credentials, RefreshCoordinator, RefreshError, RefreshSource, TokenStore};
//!
//! struct StaticSource;
//!
//! #[async_trait]
//! impl RefreshSource for StaticSource {
//!     async fn refresh(&self, _: Option<&Credentials>) -> Result<Credentials, RefreshError> {
//!         Ok(Credentials::new("fresh-token"))
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")] async fn main() {
//! let store = Arc::new(TokenStore::in_memory());
//! let coordinator = RefreshCoordinator::new(store.clone(), StaticSource)
//!     .with_redirect(|| eprintln!("please log in again"));
//!
//! let token = coordinator.refresh().await.unwrap();
//! assert_eq!(token.as_str(), "fresh-token");
//! assert_eq!(store.access_token(), Some(token));
//! # }
//! ```
//!
//! # Features
//!
//! * `file` (default): Provides [`FileStorage`][storage::FileStorage], which
//!   persists credentials to a local JSON file.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod braids;
mod coordinator;
mod credentials;
mod queue;
pub mod refresh;
pub mod storage;
mod store;

pub use braids::*;
pub use coordinator::{LogRedirect, LoginRedirect, RefreshCoordinator};
pub use credentials::{CredentialStatus, Credentials, MalformedToken, UntrustedClaims};
pub use queue::{PendingRequestQueue, RefreshOutcome, WaitForRefresh};
pub use refresh::{RefreshError, RefreshSource};
pub use store::TokenStore;
