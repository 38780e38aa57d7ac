//! Admin client for the clinic backend
//!
//! [`AdminClient`] wraps one shared HTTP pipeline that authenticates every
//! request with the current access token and transparently renews the
//! session when the backend rejects it. Concurrent rejections share a single
//! refresh; when the session cannot be renewed, the configured
//! [`LoginRedirect`](medboard_tokens::LoginRedirect) is invoked once and the
//! affected requests fail with [`ApiError::SessionExpired`].
//!
//! ```no_run
//! use medboard::{api::PageRequest, model::Translated, AdminClient, ClientConfig};
//! use medboard_tokens::{Password, Username};
//!
//! # #[tokio::main(flavor = "current_thread")] async fn main() -> Result<(), medboard::ApiError> {
//! let config = ClientConfig::new("http://localhost:8080/api/".parse()?);
//! let client = AdminClient::builder(config)
//!     .with_redirect(|| eprintln!("session expired, please log in again"))
//!     .build()
//!     .await?;
//!
//! client
//!     .login(Username::from_static("admin"), Password::from_static("secret"))
//!     .await?;
//!
//! for direction in client.directions().list(PageRequest::default()).await?.content {
//!     println!("{}", direction.translation("en").title.as_deref().unwrap_or_default());
//! }
//! # Ok(()) }
//! ```

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

pub mod api;
mod client;
mod config;
mod error;
pub mod form;
pub mod model;

#[cfg(test)]
mod test_util;

pub use client::{AdminClient, AdminClientBuilder};
pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
pub use error::ApiError;
