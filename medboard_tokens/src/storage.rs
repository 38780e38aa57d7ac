//! Persistence backends for the token store

use std::error;

use async_trait::async_trait;

use crate::Credentials;

#[cfg(feature = "file")]
pub mod file;
pub mod in_memory;

#[cfg(feature = "file")]
pub use file::FileStorage;
pub use in_memory::InMemoryStorage;

/// A boxed error returned by a storage backend
pub type StorageError = Box<dyn error::Error + Send + Sync + 'static>;

/// Durable storage for the current session's credentials
///
/// Backends report their failures, but the [`TokenStore`][crate::TokenStore]
/// never propagates them: an unreadable backend is treated as holding no
/// credentials.
#[async_trait]
pub trait CredentialStorage: Send + Sync {
    /// Loads the persisted credentials, if any
    async fn load(&self) -> Result<Option<Credentials>, StorageError>;

    /// Persists the credentials, replacing any previously stored
    async fn save(&self, credentials: &Credentials) -> Result<(), StorageError>;

    /// Removes any persisted credentials
    async fn remove(&self) -> Result<(), StorageError>;
}
