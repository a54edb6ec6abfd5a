//! Static work partitioning
//!
//! Workers never talk to each other. Each one enumerates the same sorted
//! [`FileSet`], keeps the names accepted by an [`ExtensionFilter`], and takes
//! every `total`-th entry of that eligible list starting at its own ordinal.
//! For `M` eligible names and `T` workers this gives:
//!
//! - every eligible name to exactly one worker
//! - assignment sizes of `M / T` or `M / T + 1`
//! - an empty assignment (not an error) when `ordinal >= M`

use blobconv_common::{BlobconvError, ObjectName, Result, WorkerIdentity};
use std::collections::BTreeMap;

use crate::convert::derive_output_name;
use crate::enumerate::FileSet;

/// Case-insensitive extension predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFilter {
    /// Lower-case suffixes including the leading dot, e.g. ".jpg"
    suffixes: Vec<String>,
}

impl ExtensionFilter {
    /// Build from extensions given with or without a leading dot, any case
    pub fn new<I, S>(extensions: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut suffixes: Vec<String> = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .map(|ext| format!(".{}", ext))
            .collect();
        suffixes.sort();
        suffixes.dedup();

        if suffixes.is_empty() {
            return Err(BlobconvError::config(
                "at least one eligible extension is required",
            ));
        }
        Ok(Self { suffixes })
    }

    /// Extensions without their dots
    pub fn extensions(&self) -> Vec<&str> {
        self.suffixes.iter().map(|s| &s[1..]).collect()
    }

    pub fn matches(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.suffixes.iter().any(|suffix| lower.ends_with(suffix))
    }
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        Self {
            suffixes: vec![".jpeg".to_string(), ".jpg".to_string()],
        }
    }
}

/// Eligible names in enumeration order
pub fn eligible<'a, P>(files: &'a FileSet, predicate: P) -> Vec<&'a ObjectName>
where
    P: Fn(&str) -> bool,
{
    files.iter().filter(|name| predicate(name)).collect()
}

/// Every `total`-th item of `items`, starting at `ordinal`
pub fn stride<T: Clone>(items: &[T], identity: WorkerIdentity) -> Vec<T> {
    items
        .iter()
        .skip(identity.ordinal())
        .step_by(identity.total())
        .cloned()
        .collect()
}

/// Names assigned to `identity` out of `files`
pub fn select<P>(files: &FileSet, predicate: P, identity: WorkerIdentity) -> Vec<ObjectName>
where
    P: Fn(&str) -> bool,
{
    plan(files, predicate, identity).assignment
}

/// Eligible-list size alongside this worker's assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub eligible: usize,
    pub assignment: Vec<ObjectName>,
}

pub fn plan<P>(files: &FileSet, predicate: P, identity: WorkerIdentity) -> Plan
where
    P: Fn(&str) -> bool,
{
    let eligible = eligible(files, predicate);
    let assignment = stride(&eligible, identity)
        .into_iter()
        .cloned()
        .collect();
    Plan {
        eligible: eligible.len(),
        assignment,
    }
}

/// Output names that more than one eligible input maps to
///
/// `a.jpg` and `a.JPEG` both become `a.png`; whichever worker writes last wins.
pub fn find_output_collisions<'a, I>(eligible: I) -> BTreeMap<ObjectName, Vec<ObjectName>>
where
    I: IntoIterator<Item = &'a ObjectName>,
{
    let mut by_output: BTreeMap<ObjectName, Vec<ObjectName>> = BTreeMap::new();
    for name in eligible {
        by_output
            .entry(derive_output_name(name))
            .or_default()
            .push(name.clone());
    }
    by_output.retain(|_, inputs| inputs.len() > 1);
    by_output
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn identity(ordinal: usize, total: usize) -> WorkerIdentity {
        WorkerIdentity::new(ordinal, total).unwrap()
    }

    #[test]
    fn test_filter_normalizes_extensions() {
        let filter = ExtensionFilter::new([".JPG", "jpeg", " Tif ", "jpg"]).unwrap();
        assert_eq!(filter.extensions(), vec!["jpeg", "jpg", "tif"]);
        assert!(filter.matches("holiday/IMG_1.JpG"));
        assert!(filter.matches("scan.TIF"));
        assert!(!filter.matches("notes.txt"));
        assert!(!filter.matches("jpg"));
    }

    #[test]
    fn test_filter_requires_an_extension() {
        assert!(ExtensionFilter::new(Vec::<String>::new()).is_err());
        assert!(ExtensionFilter::new(["", " . "]).is_err());
    }

    #[test]
    fn test_default_filter() {
        let filter = ExtensionFilter::default();
        assert_eq!(filter, ExtensionFilter::new(["jpg", "jpeg"]).unwrap());
        assert!(filter.matches("c.JPEG"));
        assert!(!filter.matches("b.png"));
    }

    #[test]
    fn test_single_worker_takes_everything() {
        let files = FileSet::new(["a.jpg", "b.jpg", "c.png"]);
        let filter = ExtensionFilter::default();
        let plan = plan(&files, |n| filter.matches(n), WorkerIdentity::single());
        assert_eq!(plan.eligible, 2);
        assert_eq!(plan.assignment, vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn test_ordinal_past_eligible_is_empty() {
        let files = FileSet::new(["a.jpg"]);
        let filter = ExtensionFilter::default();
        assert!(select(&files, |n| filter.matches(n), identity(3, 4)).is_empty());
    }

    #[test]
    fn test_stride_offsets() {
        let items: Vec<u32> = (0..10).collect();
        assert_eq!(stride(&items, identity(1, 3)), vec![1, 4, 7]);
        assert_eq!(stride(&items, identity(0, 3)), vec![0, 3, 6, 9]);
    }

    #[test]
    fn test_output_collisions() {
        let names: Vec<ObjectName> = ["a.jpg", "a.JPEG", "b.jpg", "dir/c.jpg", "dir/c.jpeg"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let collisions = find_output_collisions(&names);
        assert_eq!(collisions.len(), 2);
        assert_eq!(collisions["a.png"], vec!["a.jpg", "a.JPEG"]);
        assert_eq!(collisions["dir/c.png"], vec!["dir/c.jpg", "dir/c.jpeg"]);
    }
}
