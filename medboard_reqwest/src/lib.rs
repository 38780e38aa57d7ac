//! Middleware that authenticates outgoing requests and renews expired sessions
//!
//! Two middlewares cooperate in a [`ClientWithMiddleware`](reqwest_middleware::ClientWithMiddleware)
//! stack:
//!
//! * [`TokenRefreshMiddleware`] watches for `401 Unauthorized` responses. It
//!   asks a shared [`RefreshCoordinator`](medboard_tokens::RefreshCoordinator)
//!   for a fresh access token and replays the rejected request once. Concurrent
//!   rejections share a single call to the refresh endpoint.
//! * [`AccessTokenMiddleware`] attaches the current access token from a
//!   [`TokenStore`](medboard_tokens::TokenStore) to every request except those
//!   sent to the login and refresh endpoints.
//!
//! The refresh middleware must come first so that a replayed request picks
//! up the new token on its way back through the authenticator.
//!
//! ```
//! use std::sync::Arc;
//!
//! use medboard_reqwest::{
//!     AccessTokenMiddleware, AuthEndpoints, HttpRefreshSource, RefreshCredentialMode,
//!     TokenRefreshMiddleware,
//! };
//! use medboard_tokens::{RefreshCoordinator, TokenStore};
//! use reqwest::Client;
//! use reqwest_middleware::ClientBuilder;
//!
//! let endpoints = AuthEndpoints::from_base(&"https://clinic.example.com/api/".parse().unwrap()).unwrap();
//! let http = Client::default();
//!
//! let store = Arc::new(TokenStore::in_memory());
//! let source = HttpRefreshSource::new(
//!     ClientBuilder::new(http.clone()).build(),
//!     endpoints.refresh().clone(),
//!     RefreshCredentialMode::Body,
//! );
//! let coordinator = Arc::new(RefreshCoordinator::new(store.clone(), source));
//!
//! let client = ClientBuilder::new(http)
//!     .with(TokenRefreshMiddleware::new(coordinator, endpoints.clone()))
//!     .with(AccessTokenMiddleware::new(store, endpoints))
//!     .build();
//!
//! let req = client.get("https://clinic.example.com/api/directions");
//! # drop(req);
//! ```
//!
//! The authenticator can also be restricted with a custom predicate. These
//! predicates can be composed together to evaluate more complex requirements
//! prior to attaching a token to a request.

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod authenticator;
pub mod dto;
mod endpoints;
mod refresh;
mod source;

#[cfg(test)]
mod test_util;

pub use authenticator::{bearer_header, AccessTokenMiddleware, SkipCredentialEndpoints};
pub use endpoints::{directory_url, AuthEndpoints};
pub use refresh::{Retried, TokenRefreshMiddleware};
pub use source::{HttpRefreshSource, RefreshCredentialMode};
