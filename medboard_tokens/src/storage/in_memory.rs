//! An in-memory credential storage layer

use std::sync::Mutex;

use async_trait::async_trait;

use super::{CredentialStorage, StorageError};
use crate::Credentials;

/// Credential storage that lives only as long as the process
#[derive(Default, Debug)]
pub struct InMemoryStorage {
    credentials: Mutex<Option<Credentials>>,
}

impl InMemoryStorage {
    /// Constructs a new, empty in-memory storage
    pub const fn new() -> Self {
        Self {
            credentials: Mutex::new(None),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Credentials>> {
        self.credentials
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl CredentialStorage for InMemoryStorage {
    async fn load(&self) -> Result<Option<Credentials>, StorageError> {
        Ok(self.slot().clone())
    }

    async fn save(&self, credentials: &Credentials) -> Result<(), StorageError> {
        *self.slot() = Some(credentials.clone());
        Ok(())
    }

    async fn remove(&self) -> Result<(), StorageError> {
        self.slot().take();
        Ok(())
    }
}
