use std::{error, fmt, sync::Arc};

use aliri_clock::{Clock, System};
use tokio::sync::watch;

use crate::{
    storage::{CredentialStorage, InMemoryStorage},
    AccessToken, CredentialStatus, Credentials,
};

/// The process-wide holder of the current session's credentials
///
/// Reads never block and never touch the storage backend: the current
/// credentials are published through a [`watch`] channel and read with a
/// short borrow. Writes publish first and then persist.
///
/// Storage failures are logged and swallowed. A backend that cannot be read
/// is indistinguishable from one holding no credentials.
pub struct TokenStore {
    current: watch::Sender<Option<Arc<Credentials>>>,
    storage: Box<dyn CredentialStorage>,
    clock: Box<dyn Clock + Send + Sync>,
}

impl TokenStore {
    /// Opens a token store, restoring any credentials persisted in `storage`
    pub async fn open(storage: impl CredentialStorage + 'static) -> Self {
        let store = Self::empty(Box::new(storage));

        match store.storage.load().await {
            Ok(Some(credentials)) => {
                tracing::debug!("restored persisted credentials");
                store.current.send_replace(Some(Arc::new(credentials)));
            }
            Ok(None) => {
                tracing::trace!("no persisted credentials");
            }
            Err(error) => {
                tracing::warn!(
                    error = (&*error as &dyn error::Error),
                    "unable to read persisted credentials, starting without a session"
                );
            }
        }

        store
    }

    /// Constructs a token store that does not persist credentials
    pub fn in_memory() -> Self {
        Self::empty(Box::new(InMemoryStorage::new()))
    }

    fn empty(storage: Box<dyn CredentialStorage>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            current,
            storage,
            clock: Box::new(System),
        }
    }

    /// Sets a custom clock used for expiry checks
    ///
    /// Useful for testing purposes
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Gets the current credentials
    pub fn get(&self) -> Option<Arc<Credentials>> {
        self.current.borrow().clone()
    }

    /// Gets the current access token
    pub fn access_token(&self) -> Option<AccessToken> {
        self.current
            .borrow()
            .as_ref()
            .map(|c| c.access_token().to_owned())
    }

    /// Subscribes to changes of the current credentials
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Credentials>>> {
        self.current.subscribe()
    }

    /// Replaces the current credentials
    ///
    /// Credentials with an empty access token are ignored.
    pub async fn set(&self, credentials: Credentials) {
        if credentials.access_token().as_str().is_empty() {
            tracing::warn!("attempted to store an empty access token, ignoring");
            return;
        }

        let credentials = Arc::new(credentials);
        self.current.send_replace(Some(credentials.clone()));
        tracing::debug!(
            has_refresh_token = credentials.refresh_token().is_some(),
            "stored new credentials"
        );

        if let Err(error) = self.storage.save(&credentials).await {
            tracing::warn!(
                error = (&*error as &dyn error::Error),
                "unable to persist credentials"
            );
        }
    }

    /// Removes the current credentials
    pub async fn clear(&self) {
        self.current.send_replace(None);
        tracing::debug!("cleared credentials");

        if let Err(error) = self.storage.remove().await {
            tracing::warn!(
                error = (&*error as &dyn error::Error),
                "unable to remove persisted credentials"
            );
        }
    }

    /// Gets the local status of the current access token, if there is one
    pub fn status(&self) -> Option<CredentialStatus> {
        self.current
            .borrow()
            .as_ref()
            .map(|c| c.status_with_clock(&*self.clock))
    }

    /// Determines whether a usable session exists
    ///
    /// A session is usable when an access token is present, is a well-formed
    /// JWT, and has not expired. A malformed or expired token is cleared.
    pub async fn is_authenticated(&self) -> bool {
        match self.status() {
            None => {
                tracing::debug!("no access token found");
                false
            }
            Some(CredentialStatus::Valid) => true,
            Some(status) => {
                tracing::warn!(?status, "access token is unusable, clearing it");
                self.clear().await;
                false
            }
        }
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("current", &*self.current.borrow())
            .finish_non_exhaustive()
    }
}
