use async_trait::async_trait;
use blobconv_common::ObjectName;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{ObjectStore, StoreError, StoreResult};

#[derive(Default)]
struct Inner {
    exists: AtomicBool,
    fail_list: AtomicBool,
    objects: RwLock<BTreeMap<ObjectName, Vec<u8>>>,
    failing_writes: RwLock<BTreeSet<ObjectName>>,
}

/// In-process container
///
/// Clones share the same contents, so a test can keep a handle while the
/// worker owns another.
#[derive(Clone)]
pub struct MemoryStore {
    container: String,
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// An existing, empty container
    pub fn new(container: &str) -> Self {
        let store = Self::missing(container);
        store.inner.exists.store(true, Ordering::SeqCst);
        store
    }

    /// A container that does not exist until `create_if_missing` is called
    pub fn missing(container: &str) -> Self {
        Self {
            container: container.to_string(),
            inner: Arc::new(Inner::default()),
        }
    }

    /// An existing container pre-filled with `objects`
    pub fn with_objects<I, N>(container: &str, objects: I) -> Self
    where
        I: IntoIterator<Item = (N, Vec<u8>)>,
        N: Into<ObjectName>,
    {
        let objects = objects.into_iter().map(|(n, d)| (n.into(), d)).collect();
        Self {
            container: container.to_string(),
            inner: Arc::new(Inner {
                exists: AtomicBool::new(true),
                objects: RwLock::new(objects),
                ..Inner::default()
            }),
        }
    }

    /// Make writes to `name` fail with a backend error
    pub async fn fail_writes_to(&self, name: &str) {
        self.inner.failing_writes.write().await.insert(name.to_string());
    }

    /// Make `list` fail with a backend error
    pub fn fail_listing(&self) {
        self.inner.fail_list.store(true, Ordering::SeqCst);
    }

    pub async fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.inner.objects.read().await.get(name).cloned()
    }

    pub async fn names(&self) -> Vec<ObjectName> {
        self.inner.objects.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn ensure_exists(&self) -> StoreResult<()> {
        if self.inner.exists.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::ContainerNotFound(self.container.clone()))
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn container(&self) -> &str {
        &self.container
    }

    async fn container_exists(&self) -> StoreResult<bool> {
        Ok(self.inner.exists.load(Ordering::SeqCst))
    }

    async fn create_if_missing(&self) -> StoreResult<()> {
        self.inner.exists.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn exists(&self, name: &str) -> StoreResult<bool> {
        self.ensure_exists()?;
        Ok(self.inner.objects.read().await.contains_key(name))
    }

    async fn list(&self) -> StoreResult<Vec<ObjectName>> {
        self.ensure_exists()?;
        if self.inner.fail_list.load(Ordering::SeqCst) {
            return Err(StoreError::backend("listing disabled"));
        }
        // Reverse order so callers cannot rely on the backend sorting for them
        Ok(self.inner.objects.read().await.keys().rev().cloned().collect())
    }

    async fn read(&self, name: &str) -> StoreResult<Vec<u8>> {
        self.ensure_exists()?;
        self.inner
            .objects
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::ObjectNotFound(name.to_string()))
    }

    async fn write(&self, name: &str, data: Vec<u8>) -> StoreResult<()> {
        self.ensure_exists()?;
        if self.inner.failing_writes.read().await.contains(name) {
            return Err(StoreError::backend(format!("write to '{}' rejected", name)));
        }
        self.inner
            .objects
            .write()
            .await
            .insert(name.to_string(), data);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_container_rejects_io() {
        let store = MemoryStore::missing("converted");
        assert!(!store.container_exists().await.unwrap());
        assert!(matches!(
            store.write("a.png", vec![1]).await,
            Err(StoreError::ContainerNotFound(_))
        ));

        store.create_if_missing().await.unwrap();
        store.write("a.png", vec![1]).await.unwrap();
        assert_eq!(store.get("a.png").await, Some(vec![1]));
    }

    #[tokio::test]
    async fn test_clones_share_contents() {
        let store = MemoryStore::with_objects("images", [("a.jpg", vec![1, 2])]);
        let handle = store.clone();
        store.write("b.jpg", vec![3]).await.unwrap();
        assert_eq!(handle.names().await, vec!["a.jpg", "b.jpg"]);
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let store = MemoryStore::new("converted");
        store.fail_writes_to("bad.png").await;
        assert!(store.write("bad.png", vec![]).await.is_err());
        assert!(store.write("good.png", vec![]).await.is_ok());

        store.fail_listing();
        assert!(matches!(store.list().await, Err(StoreError::Backend(_))));
    }
}
