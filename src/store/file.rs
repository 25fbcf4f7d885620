use std::{io, io::ErrorKind, path::PathBuf};

use async_trait::async_trait;
use fs4::tokio::AsyncFileExt;
use tokio::fs::File;
use tracing::{debug, instrument};

use super::{KeyValueStore, StoreError};

const LOCK_FILE: &str = ".lock";

#[derive(Debug, Clone, Copy)]
enum LockMode {
    Shared,
    Exclusive,
}

/// Directory backed store. Values are replaced through a rename so a reader never sees half of a
/// write, and an advisory lock on `.lock` keeps instances from interleaving.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates the directory if needed and checks that it can be written to.
    pub fn open(dir: PathBuf) -> Result<Self, StoreError> {
        let unavailable = |source| StoreError::Unavailable {
            location: dir.display().to_string(),
            source,
        };
        std::fs::create_dir_all(&dir).map_err(unavailable)?;
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(LOCK_FILE))
            .map_err(unavailable)?;

        Ok(Self { dir })
    }

    /// Opens `.lock` and waits for the advisory lock off the runtime thread.
    async fn acquire(&self, mode: LockMode) -> io::Result<File> {
        let lock = File::options()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.dir.join(LOCK_FILE))
            .await?;

        tokio::task::spawn_blocking(move || -> io::Result<File> {
            match mode {
                LockMode::Shared => lock.lock_shared()?,
                LockMode::Exclusive => lock.lock_exclusive()?,
            }
            Ok(lock)
        })
        .await
        .map_err(io::Error::other)?
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    #[instrument(skip(self))]
    async fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let lock = self.acquire(LockMode::Shared).await?;
        let result = tokio::fs::read_to_string(self.dir.join(key)).await;
        lock.unlock_async().await?;

        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Nothing stored under {key}");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, value), fields(len = value.len()))]
    async fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let target = self.dir.join(key);
        let staging = self.dir.join(format!("{key}.tmp"));

        // Semi-safe acquire-release for the directory
        let lock = self.acquire(LockMode::Exclusive).await?;
        let result = async {
            tokio::fs::write(&staging, value).await?;
            tokio::fs::rename(&staging, &target).await
        }
        .await;
        lock.unlock_async().await?;

        Ok(result?)
    }
}
