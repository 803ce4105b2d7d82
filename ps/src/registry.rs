//! Cross-dataset store registry
//!
//! Discovers every template store under a template root and answers
//! count/listing queries across them. A dataset folder containing a
//! `*.yaml` entry holds a single no-subset store; each subfolder holds one
//! named-subset store.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::store::{StoreError, TemplateStore};

/// Key identifying one store: `(dataset_name, subset_name)`
pub type StoreKey = (String, Option<String>);

/// In-memory index of all discovered template stores.
pub struct StoreRegistry {
    root: PathBuf,
    stores: HashMap<StoreKey, TemplateStore>,
}

impl StoreRegistry {
    /// Scan `root` and load every store found there. A missing root is an
    /// empty registry. Dot-entries are skipped.
    pub fn discover(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        let mut stores = HashMap::new();

        if root.exists() {
            for entry in fs::read_dir(&root)? {
                let entry = entry?;
                let dataset = entry.file_name().to_string_lossy().to_string();
                if dataset.starts_with('.') || !entry.path().is_dir() {
                    continue;
                }
                for member in fs::read_dir(entry.path())? {
                    let member = member?;
                    let member_name = member.file_name().to_string_lossy().to_string();
                    if member_name.starts_with('.') {
                        continue;
                    }
                    if member_name.ends_with(".yaml") {
                        stores.insert(
                            (dataset.clone(), None),
                            TemplateStore::open(&root, &dataset, None)?,
                        );
                    } else if member.path().is_dir() {
                        stores.insert(
                            (dataset.clone(), Some(member_name.clone())),
                            TemplateStore::open(&root, &dataset, Some(member_name))?,
                        );
                    }
                }
            }
        }

        debug!(?root, count = stores.len(), "discovered template stores");
        Ok(Self { root, stores })
    }

    /// The store for `(dataset, subset)`, if it was discovered or created
    pub fn get(&self, dataset: &str, subset: Option<&str>) -> Option<&TemplateStore> {
        let key = (dataset.to_string(), subset.map(str::to_string));
        self.stores.get(&key)
    }

    /// The store for `(dataset, subset)`, registering a new empty store if
    /// none exists yet. Nothing is written to disk until that store first
    /// persists.
    pub fn get_or_create(
        &mut self,
        dataset: &str,
        subset: Option<&str>,
    ) -> Result<&mut TemplateStore, StoreError> {
        let key = (dataset.to_string(), subset.map(str::to_string));
        match self.stores.entry(key) {
            Entry::Occupied(occupied) => Ok(occupied.into_mut()),
            Entry::Vacant(vacant) => {
                debug!(dataset, ?subset, "registering new empty store");
                let store =
                    TemplateStore::open(&self.root, dataset, subset.map(str::to_string))?;
                Ok(vacant.insert(store))
            }
        }
    }

    /// All registered `(dataset, subset)` keys, sorted
    pub fn keys(&self) -> Vec<StoreKey> {
        let mut keys: Vec<StoreKey> = self.stores.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn stores(&self) -> impl Iterator<Item = &TemplateStore> {
        self.stores.values()
    }

    /// Template totals per dataset. Subset counts roll up into their
    /// dataset's count and are not reported separately.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for ((dataset, _), store) in &self.stores {
            *counts.entry(dataset.clone()).or_insert(0) += store.len();
        }
        counts
    }

    /// Total number of registered stores
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{Template, TemplateMetadata};
    use tempfile::TempDir;

    fn template(name: &str) -> Template {
        Template::new(
            name,
            "{{ x }} ||| {{ y }}",
            "",
            TemplateMetadata::default(),
            None,
            None,
        )
    }

    fn seed_store(root: &Path, dataset: &str, subset: Option<&str>, names: &[&str]) {
        let mut store =
            TemplateStore::open(root, dataset, subset.map(str::to_string)).unwrap();
        for name in names {
            store.add(template(name)).unwrap();
        }
    }

    #[test]
    fn test_discover_missing_root_is_empty() {
        let temp = TempDir::new().unwrap();
        let registry = StoreRegistry::discover(temp.path().join("nowhere")).unwrap();
        assert!(registry.is_empty());
        assert!(registry.counts().is_empty());
    }

    #[test]
    fn test_discover_finds_plain_and_subset_stores() {
        let temp = TempDir::new().unwrap();
        seed_store(temp.path(), "squad", None, &["a", "b"]);
        seed_store(temp.path(), "glue", Some("mrpc"), &["c"]);
        seed_store(temp.path(), "glue", Some("sst2"), &["d"]);

        let registry = StoreRegistry::discover(temp.path()).unwrap();
        assert_eq!(registry.len(), 3);
        assert!(registry.get("squad", None).is_some());
        assert!(registry.get("glue", Some("mrpc")).is_some());
        assert!(registry.get("glue", Some("sst2")).is_some());
        assert!(registry.get("glue", None).is_none());
    }

    #[test]
    fn test_discover_skips_dot_entries() {
        let temp = TempDir::new().unwrap();
        seed_store(temp.path(), "squad", None, &["a"]);
        fs::create_dir_all(temp.path().join(".cache")).unwrap();
        fs::write(temp.path().join(".DS_Store"), "junk").unwrap();

        let registry = StoreRegistry::discover(temp.path()).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_counts_roll_subsets_into_dataset() {
        let temp = TempDir::new().unwrap();
        seed_store(temp.path(), "glue", None, &["a", "b", "c"]);
        seed_store(temp.path(), "glue", Some("mrpc"), &["d", "e"]);
        seed_store(temp.path(), "squad", None, &["f"]);

        let registry = StoreRegistry::discover(temp.path()).unwrap();
        let counts = registry.counts();
        assert_eq!(counts.get("glue"), Some(&5));
        assert_eq!(counts.get("squad"), Some(&1));
        assert!(!counts.contains_key("mrpc"));
    }

    #[test]
    fn test_get_or_create_registers_empty_store() {
        let temp = TempDir::new().unwrap();
        let mut registry = StoreRegistry::discover(temp.path()).unwrap();
        assert!(registry.get("fresh", None).is_none());

        let store = registry.get_or_create("fresh", None).unwrap();
        assert!(store.is_empty());
        assert!(registry.get("fresh", None).is_some());
        // Nothing written until the store persists.
        assert!(!temp.path().join("fresh").exists());
    }

    #[test]
    fn test_get_or_create_returns_existing_store() {
        let temp = TempDir::new().unwrap();
        seed_store(temp.path(), "squad", None, &["a"]);
        let mut registry = StoreRegistry::discover(temp.path()).unwrap();
        let store = registry.get_or_create("squad", None).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_keys_sorted() {
        let temp = TempDir::new().unwrap();
        seed_store(temp.path(), "zoo", None, &["a"]);
        seed_store(temp.path(), "ant", None, &["b"]);
        let registry = StoreRegistry::discover(temp.path()).unwrap();
        let keys = registry.keys();
        assert_eq!(keys[0].0, "ant");
        assert_eq!(keys[1].0, "zoo");
    }
}
