use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_stream::wrappers::ReadDirStream;
use tokio_stream::StreamExt;

use super::PasteEntry;
use crate::id::PasteId;

/// Pastes stored as flat files named by id inside one directory.
#[derive(Clone)]
pub struct FileStorage {
    dir: Arc<PathBuf>,
}

impl FileStorage {
    /// Open the store, creating its directory if it does not exist yet.
    pub async fn new(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir: PathBuf = dir.into();

        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create storage directory {}", dir.display()))?;

        if !fs::metadata(&dir).await?.is_dir() {
            bail!("{} is not a directory", dir.display());
        }

        Ok(FileStorage { dir: Arc::new(dir) })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &PasteId) -> PathBuf {
        self.dir.join(key.as_str())
    }

    /// Get a paste's content by id.
    pub async fn get_object(&self, key: &PasteId) -> crate::ApiResult<Bytes> {
        let data = fs::read(self.path(key)).await?;
        Ok(data.into())
    }

    /// Store a new paste. Fails with `IdCollision` rather than overwrite an existing one.
    pub async fn put_object(&self, key: &PasteId, data: Bytes) -> crate::ApiResult<()> {
        let path = self.path(key);
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        let written = async {
            file.write_all(&data).await?;
            file.flush().await
        }
        .await;

        if let Err(err) = written {
            drop(file);
            // don't leave a truncated paste behind
            _ = fs::remove_file(&path).await;
            return Err(err.into());
        }

        Ok(())
    }

    /// List every paste in the store, sorted by name.
    pub async fn list_objects(&self) -> crate::ApiResult<Vec<PasteEntry>> {
        let mut entries = ReadDirStream::new(fs::read_dir(self.dir.as_path()).await?);
        let mut pastes = Vec::new();

        while let Some(entry) = entries.next().await {
            let entry = entry?;
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                // removed between the directory read and the stat
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };
            if !metadata.is_file() {
                continue;
            }

            pastes.push(PasteEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                modified: metadata.modified()?.into(),
                size: metadata.len(),
            });
        }

        pastes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(pastes)
    }
}
