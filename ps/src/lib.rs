//! PromptStore - versioned prompt template management
//!
//! Stores text-rendering templates ("prompts") that turn a structured
//! dataset example into an input prompt and a target output. Templates are
//! grouped by dataset and optional subset, persisted to YAML, and addressed
//! by stable ids that survive renames.
//!
//! # Architecture
//!
//! ```text
//! templates/
//! ├── squad/
//! │   └── templates.yaml          # no-subset store
//! └── glue/
//!     ├── mrpc/
//!     │   └── templates.yaml      # one store per subset
//!     └── sst2/
//!         └── templates.yaml
//! ```
//!
//! # Example
//!
//! ```ignore
//! use promptstore::{RenderEnv, RenderOptions, StoreRegistry};
//!
//! let env = RenderEnv::new();
//! let mut registry = StoreRegistry::discover("templates")?;
//! let store = registry.get_or_create("squad", None)?;
//! let segments = store.get("basic")?.apply(&env, &example, &RenderOptions::default())?;
//! ```

pub mod cli;
pub mod config;
pub mod export;
pub mod registry;
pub mod render;
pub mod store;
pub mod template;

pub use config::Config;
pub use export::{TemplateRow, collect_rows, write_csv};
pub use registry::{StoreKey, StoreRegistry};
pub use render::{Example, RenderEnv, RenderError, RenderOptions, SEPARATOR, TEXT_VAR_LENGTH};
pub use store::{StoreError, TEMPLATE_FILENAME, TemplateStore};
pub use template::{Template, TemplateMetadata};
