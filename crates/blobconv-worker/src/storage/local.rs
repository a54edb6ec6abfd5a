use async_trait::async_trait;
use blobconv_common::ObjectName;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use super::{ObjectStore, StoreError, StoreResult};

/// A container backed by a directory under a shared root
///
/// Object names are `/`-separated relative paths inside `<root>/<container>`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    container: String,
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(root: &Path, container: &str) -> Self {
        Self {
            container: container.to_string(),
            dir: root.join(container),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Map an object name to a path, refusing anything that escapes the container
    fn object_path(&self, name: &str) -> StoreResult<PathBuf> {
        let relative = Path::new(name);
        let valid = !name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !valid {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(relative))
    }
}

/// Every regular file under `dir`, following symlinks, as `/`-separated names
///
/// Walk errors fail the whole listing. Files whose relative path is not valid
/// UTF-8 cannot be named as objects and are skipped with a warning.
fn collect_files(dir: &Path) -> StoreResult<Vec<ObjectName>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true).min_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(dir).map_err(|err| {
            StoreError::backend(format!(
                "'{}' is outside '{}': {}",
                entry.path().display(),
                dir.display(),
                err
            ))
        })?;
        let parts: Option<Vec<&str>> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect();

        match parts {
            Some(parts) => names.push(parts.join("/")),
            None => warn!(
                path = %entry.path().display(),
                "Skipping file whose name is not valid UTF-8"
            ),
        }
    }
    Ok(names)
}

#[async_trait]
impl ObjectStore for LocalStore {
    fn container(&self) -> &str {
        &self.container
    }

    async fn container_exists(&self) -> StoreResult<bool> {
        match tokio::fs::metadata(&self.dir).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    #[instrument(skip(self), fields(container = %self.container))]
    async fn create_if_missing(&self) -> StoreResult<()> {
        if !self.container_exists().await? {
            tokio::fs::create_dir_all(&self.dir).await?;
            info!("Created container directory {}", self.dir.display());
        }
        Ok(())
    }

    async fn exists(&self, name: &str) -> StoreResult<bool> {
        let path = self.object_path(name)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    #[instrument(skip(self), fields(container = %self.container))]
    async fn list(&self) -> StoreResult<Vec<ObjectName>> {
        if !self.container_exists().await? {
            return Err(StoreError::ContainerNotFound(self.container.clone()));
        }

        let dir = self.dir.clone();
        let names = tokio::task::spawn_blocking(move || collect_files(&dir))
            .await
            .map_err(|err| StoreError::backend(format!("Listing task failed: {}", err)))??;

        debug!("Listed {} objects in {}", names.len(), self.dir.display());
        Ok(names)
    }

    async fn read(&self, name: &str) -> StoreResult<Vec<u8>> {
        let path = self.object_path(name)?;
        tokio::fs::read(&path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StoreError::ObjectNotFound(name.to_string())
            } else {
                StoreError::Io(err)
            }
        })
    }

    async fn write(&self, name: &str, data: Vec<u8>) -> StoreResult<()> {
        let path = self.object_path(name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
        Ok(())
    }
}
