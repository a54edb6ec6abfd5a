//! Input enumeration

use blobconv_common::{BlobconvError, ObjectName, Result};
use tracing::{debug, instrument};

use crate::storage::ObjectStore;

/// Snapshot of a container's object names, sorted byte-wise and free of duplicates
///
/// Every worker enumerating an unchanged container builds an identical
/// `FileSet`; that is what makes independent partitioning agree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet(Vec<ObjectName>);

impl FileSet {
    pub fn new<I, N>(names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<ObjectName>,
    {
        let mut names: Vec<ObjectName> = names.into_iter().map(Into::into).collect();
        names.sort_unstable();
        names.dedup();
        Self(names)
    }

    pub fn names(&self) -> &[ObjectName] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ObjectName> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a FileSet {
    type Item = &'a ObjectName;
    type IntoIter = std::slice::Iter<'a, ObjectName>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// List every object in `store` and return them in byte order
///
/// Any listing failure is fatal; a partial listing is never returned.
#[instrument(skip(store), fields(container = %store.container()))]
pub async fn list_sorted(store: &dyn ObjectStore) -> Result<FileSet> {
    let names = store
        .list()
        .await
        .map_err(|err| BlobconvError::store_unavailable(store.container(), err.to_string()))?;

    let files = FileSet::new(names);
    debug!(count = files.len(), "Enumerated input container");
    Ok(files)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;

    #[test]
    fn test_file_set_sorts_bytewise() {
        let files = FileSet::new(["b.jpg", "B.jpg", "a.jpg", "a.jpg", "_x.jpg"]);
        assert_eq!(files.names(), ["B.jpg", "_x.jpg", "a.jpg", "b.jpg"]);
    }

    #[tokio::test]
    async fn test_list_sorted_orders_backend_output() {
        let store = MemoryStore::with_objects(
            "images",
            [("c.jpg", vec![]), ("a.jpg", vec![]), ("b/z.jpg", vec![])],
        );
        let files = list_sorted(&store).await.unwrap();
        assert_eq!(files.names(), ["a.jpg", "b/z.jpg", "c.jpg"]);
    }

    #[tokio::test]
    async fn test_list_failure_is_store_unavailable() {
        let missing = MemoryStore::missing("images");
        let err = list_sorted(&missing).await.unwrap_err();
        assert!(matches!(err, BlobconvError::StoreUnavailable { .. }));

        let broken = MemoryStore::new("images");
        broken.fail_listing();
        assert!(matches!(
            list_sorted(&broken).await,
            Err(BlobconvError::StoreUnavailable { .. })
        ));
    }
}
