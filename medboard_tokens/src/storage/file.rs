//! A local file credential storage layer

use std::{io, path::PathBuf};

use async_trait::async_trait;
use tokio::fs::OpenOptions;

use super::{CredentialStorage, StorageError};
use crate::Credentials;

/// Credential storage backed by a JSON file
///
/// A missing file is treated as holding no credentials.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Constructs a new file storage
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_credentials(&self) -> Result<Option<Credentials>, io::Error> {
        use tokio::io::AsyncReadExt;

        let mut file = match OpenOptions::new().read(true).open(&self.path).await {
            Ok(file) => file,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error),
        };
        let mut data = String::new();
        file.read_to_string(&mut data).await?;
        let credentials = serde_json::from_str(&data)?;
        Ok(Some(credentials))
    }

    async fn write_credentials(&self, credentials: &Credentials) -> Result<(), io::Error> {
        use tokio::io::AsyncWriteExt;

        let mut file_opts = OpenOptions::new();

        file_opts.create(true).truncate(true).write(true);

        #[cfg(unix)]
        file_opts.mode(0o600);

        let mut file = file_opts.open(&self.path).await?;
        let data = serde_json::to_string_pretty(credentials)?;
        file.write_all(data.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStorage for FileStorage {
    async fn load(&self) -> Result<Option<Credentials>, StorageError> {
        Ok(self.read_credentials().await?)
    }

    async fn save(&self, credentials: &Credentials) -> Result<(), StorageError> {
        Ok(self.write_credentials(credentials).await?)
    }

    async fn remove(&self) -> Result<(), StorageError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_holds_no_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("credentials.json"));

        assert_eq!(storage.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn saved_credentials_are_loaded_back() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("credentials.json"));
        let creds = Credentials::new("access").with_refresh_token("refresh");

        storage.save(&creds).await.unwrap();

        assert_eq!(storage.load().await.unwrap(), Some(creds));
    }

    #[tokio::test]
    async fn remove_deletes_the_file_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let storage = FileStorage::new(&path);

        storage.save(&Credentials::new("access")).await.unwrap();
        storage.remove().await.unwrap();
        assert!(!path.exists());

        storage.remove().await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(FileStorage::new(path).load().await.is_err());
    }
}
