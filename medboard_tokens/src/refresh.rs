//! Sources of fresh credentials

use std::{error, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use crate::Credentials;

/// An asynchronous source of fresh credentials
///
/// A source performs exactly one call to the issuing authority per
/// invocation. It is never invoked concurrently by the
/// [`RefreshCoordinator`][crate::RefreshCoordinator].
#[async_trait]
pub trait RefreshSource: Send + Sync {
    /// Exchanges the current credentials for fresh ones
    ///
    /// `current` is `None` when no session is stored locally; sources that
    /// rely on a cookie managed by the server may still succeed.
    async fn refresh(&self, current: Option<&Credentials>) -> Result<Credentials, RefreshError>;
}

/// An error while attempting to renew the session
///
/// One refresh outcome is shared by every caller waiting on it, so this type
/// is cheap to clone.
#[derive(Clone, Debug, Error)]
pub enum RefreshError {
    /// No refresh token is available to present to the authority
    #[error("no refresh token is available")]
    MissingRefreshToken,
    /// The authority rejected the refresh credential
    #[error("refresh credential was rejected by the authority")]
    Rejected,
    /// The authority responded with an unexpected status
    #[error("refresh request failed with status {status}")]
    Status {
        /// The HTTP status code returned
        status: u16,
    },
    /// The authority's response did not contain usable credentials
    #[error("refresh response was malformed: {0}")]
    MalformedResponse(String),
    /// The refresh request could not be sent or its response not read
    #[error("error sending refresh request")]
    Transport(#[source] Arc<dyn error::Error + Send + Sync + 'static>),
    /// The refresh was dropped before it settled
    #[error("refresh was abandoned before it completed")]
    Abandoned,
}

impl RefreshError {
    /// Wraps a transport failure
    pub fn transport<E>(error: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        Self::Transport(Arc::new(error))
    }
}
