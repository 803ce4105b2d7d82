//! Per-dataset template store
//!
//! Owns the templates for one dataset (or dataset subset), keyed by id with
//! a derived name index, and keeps the backing YAML file in sync: every
//! mutation persists immediately, and removing the last template deletes the
//! backing folder outright.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::template::{Template, TemplateMetadata, TemplateRecord};

/// File name of a store's backing YAML document
pub const TEMPLATE_FILENAME: &str = "templates.yaml";

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no template named '{name}' for dataset {dataset}")]
    TemplateNotFound { name: String, dataset: String },

    #[error("a template named '{name}' already exists for dataset {dataset}")]
    DuplicateName { name: String, dataset: String },

    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Serialized shape of a store file
#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    dataset: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    subset: Option<String>,

    templates: BTreeMap<String, TemplateRecord>,
}

/// The persisted collection of templates for one dataset or dataset+subset.
///
/// Single-writer: one instance owns the in-memory maps and the backing file;
/// concurrent processes mutating the same store will race.
pub struct TemplateStore {
    root: PathBuf,
    dataset_name: String,
    subset_name: Option<String>,

    /// id → template
    templates: HashMap<String, Template>,

    /// Derived from `templates`; re-synced before every write
    name_to_id: HashMap<String, String>,
}

impl TemplateStore {
    /// Open the store for `(dataset, subset)` under `root`, reading the
    /// backing file if it exists. An absent file is an empty store, not an
    /// error.
    pub fn open(
        root: impl AsRef<Path>,
        dataset: impl Into<String>,
        subset: Option<String>,
    ) -> Result<Self, StoreError> {
        let mut store = Self {
            root: root.as_ref().to_path_buf(),
            dataset_name: dataset.into(),
            subset_name: subset,
            templates: HashMap::new(),
            name_to_id: HashMap::new(),
        };
        store.load()?;
        store.sync_index();
        Ok(store)
    }

    fn load(&mut self) -> Result<(), StoreError> {
        let path = self.file_path();
        if !path.exists() {
            debug!(?path, "no store file, starting empty");
            return Ok(());
        }
        let content = fs::read_to_string(&path)?;
        let file: StoreFile = serde_yaml::from_str(&content)?;
        self.templates = file
            .templates
            .into_values()
            .map(|record| {
                let TemplateRecord::Template(template) = record;
                (template.id().to_string(), template)
            })
            .collect();
        debug!(?path, count = self.templates.len(), "loaded store");
        Ok(())
    }

    /// Folder holding this store's backing file
    pub fn folder_path(&self) -> PathBuf {
        match &self.subset_name {
            Some(subset) => self.root.join(&self.dataset_name).join(subset),
            None => self.root.join(&self.dataset_name),
        }
    }

    /// Path of the backing YAML file
    pub fn file_path(&self) -> PathBuf {
        self.folder_path().join(TEMPLATE_FILENAME)
    }

    pub fn dataset_name(&self) -> &str {
        &self.dataset_name
    }

    pub fn subset_name(&self) -> Option<&str> {
        self.subset_name.as_deref()
    }

    /// "dataset" or "dataset/subset", for error messages and listings
    pub fn label(&self) -> String {
        match &self.subset_name {
            Some(subset) => format!("{}/{}", self.dataset_name, subset),
            None => self.dataset_name.clone(),
        }
    }

    /// Recompute the name → id index from the template map. Must be called
    /// after any out-of-band mutation of a template's name.
    pub fn sync_index(&mut self) {
        self.name_to_id = self
            .templates
            .values()
            .map(|template| (template.name().to_string(), template.id().to_string()))
            .collect();
    }

    /// Insert a template keyed by its id and persist.
    ///
    /// Names are unique per store; adding a second template with an existing
    /// name fails rather than deduplicating silently.
    pub fn add(&mut self, template: Template) -> Result<(), StoreError> {
        if self.name_to_id.contains_key(template.name()) {
            return Err(StoreError::DuplicateName {
                name: template.name().to_string(),
                dataset: self.label(),
            });
        }
        debug!(name = template.name(), id = template.id(), store = %self.label(), "adding template");
        self.templates.insert(template.id().to_string(), template);
        self.persist()
    }

    /// Update the template currently named `current_name`, preserving its id
    /// across a rename, and persist.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        current_name: &str,
        new_name: &str,
        jinja: &str,
        reference: &str,
        metadata: TemplateMetadata,
        answer_choices: Option<Vec<String>>,
        answer_choices_key: Option<String>,
    ) -> Result<(), StoreError> {
        let id = self.lookup(current_name)?;
        if new_name != current_name && self.name_to_id.contains_key(new_name) {
            return Err(StoreError::DuplicateName {
                name: new_name.to_string(),
                dataset: self.label(),
            });
        }
        let label = self.label();
        let template = self
            .templates
            .get_mut(&id)
            .ok_or_else(|| StoreError::TemplateNotFound {
                name: current_name.to_string(),
                dataset: label,
            })?;
        template.name = new_name.to_string();
        template.jinja = jinja.to_string();
        template.reference = reference.to_string();
        template.metadata = crate::template::MetadataRecord::Metadata(metadata);
        template.answer_choices = answer_choices;
        template.answer_choices_key = answer_choices_key;
        info!(id = %id, name = new_name, store = %self.label(), "updated template");
        self.persist()
    }

    /// Delete the template named `name` and persist. Removing the last
    /// template removes the store's backing folder instead (and the parent
    /// dataset folder too, when this is a subset store and the parent is
    /// now empty).
    pub fn remove(&mut self, name: &str) -> Result<(), StoreError> {
        let id = self.lookup(name)?;
        self.templates.remove(&id);
        info!(name, store = %self.label(), "removed template");
        if self.templates.is_empty() {
            self.remove_backing()
        } else {
            self.persist()
        }
    }

    fn remove_backing(&mut self) -> Result<(), StoreError> {
        self.sync_index();
        let folder = self.folder_path();
        if folder.exists() {
            fs::remove_dir_all(&folder)?;
            info!(?folder, "removed empty store folder");
        }
        if self.subset_name.is_some() {
            let dataset_folder = self.root.join(&self.dataset_name);
            if dataset_folder.exists() && fs::read_dir(&dataset_folder)?.next().is_none() {
                fs::remove_dir_all(&dataset_folder)?;
                info!(?dataset_folder, "removed empty dataset folder");
            }
        }
        Ok(())
    }

    /// Write the store file, re-syncing the name index first so a stale
    /// index can never be serialized. Creates the backing folder on first
    /// write.
    pub fn persist(&mut self) -> Result<(), StoreError> {
        self.sync_index();
        let folder = self.folder_path();
        fs::create_dir_all(&folder)?;
        let file = StoreFile {
            dataset: self.dataset_name.clone(),
            subset: self.subset_name.clone(),
            templates: self
                .templates
                .values()
                .map(|template| (template.id().to_string(), TemplateRecord::Template(template.clone())))
                .collect(),
        };
        let content = serde_yaml::to_string(&file)?;
        fs::write(self.file_path(), content)?;
        Ok(())
    }

    /// Resolve a template by name
    pub fn get(&self, name: &str) -> Result<&Template, StoreError> {
        let id = self.lookup(name)?;
        self.templates
            .get(&id)
            .ok_or_else(|| self.not_found(name))
    }

    fn lookup(&self, name: &str) -> Result<String, StoreError> {
        self.name_to_id
            .get(name)
            .cloned()
            .ok_or_else(|| self.not_found(name))
    }

    fn not_found(&self, name: &str) -> StoreError {
        StoreError::TemplateNotFound {
            name: name.to_string(),
            dataset: self.label(),
        }
    }

    /// Sorted template names for this store
    pub fn template_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .templates
            .values()
            .map(|template| template.name().to_string())
            .collect();
        names.sort();
        names
    }

    pub fn templates(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
