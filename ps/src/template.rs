//! Prompt template records
//!
//! A template is a named minijinja source containing the `|||` separator that
//! divides its rendered text into an input prompt and a target output. Each
//! template carries a generated id that is stable across renames, tri-state
//! annotations, and optionally a fixed or derived list of answer choices.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::render::{Example, RenderEnv, RenderError, RenderOptions};

/// Tri-state annotations attached to a template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateMetadata {
    /// Whether this prompt asks for the dataset's original task
    #[serde(default)]
    pub original_task: Option<bool>,

    /// Whether the answer choices appear in the prompt text itself
    #[serde(default)]
    pub choices_in_prompt: Option<bool>,

    /// Metric names to evaluate this template with
    #[serde(default)]
    pub metrics: Option<Vec<String>>,
}

/// On-disk form of [`TemplateMetadata`], tagged by a `kind` discriminator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetadataRecord {
    Metadata(TemplateMetadata),
}

/// A named, identified text-rendering rule producing prompt/output text
/// from an example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Generated once at construction; survives renames
    pub(crate) id: String,

    /// Unique within the owning store; the external addressing key
    pub(crate) name: String,

    /// Template source in minijinja syntax, containing the `|||` separator
    pub(crate) jinja: String,

    /// Author or paper provenance
    pub(crate) reference: String,

    pub(crate) metadata: MetadataRecord,

    /// Fixed enumerated completions, when the template is classification-style
    pub(crate) answer_choices: Option<Vec<String>>,

    /// Expression rendering to the answer choices joined by `|||`
    pub(crate) answer_choices_key: Option<String>,
}

/// On-disk form of [`Template`], tagged by a `kind` discriminator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemplateRecord {
    Template(Template),
}

impl Template {
    /// Create a template, minting a fresh id
    pub fn new(
        name: impl Into<String>,
        jinja: impl Into<String>,
        reference: impl Into<String>,
        metadata: TemplateMetadata,
        answer_choices: Option<Vec<String>>,
        answer_choices_key: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            jinja: jinja.into(),
            reference: reference.into(),
            metadata: MetadataRecord::Metadata(metadata),
            answer_choices,
            answer_choices_key,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn jinja(&self) -> &str {
        &self.jinja
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn metadata(&self) -> &TemplateMetadata {
        let MetadataRecord::Metadata(metadata) = &self.metadata;
        metadata
    }

    /// Fixed answer choices, or None for open-ended templates
    pub fn answer_choices(&self) -> Option<&[String]> {
        self.answer_choices.as_deref()
    }

    /// Expression for deriving answer choices from an example
    pub fn answer_choices_key(&self) -> Option<&str> {
        self.answer_choices_key.as_deref()
    }

    /// Answer choices for a given example: the fixed list when present,
    /// otherwise derived from the expression, otherwise None.
    pub fn answer_choices_for(
        &self,
        env: &RenderEnv,
        example: &Example,
    ) -> Result<Option<Vec<String>>, RenderError> {
        if let Some(choices) = &self.answer_choices {
            return Ok(Some(choices.clone()));
        }
        match &self.answer_choices_key {
            Some(expr) => Ok(Some(env.derive_choices(expr, example)?)),
            None => Ok(None),
        }
    }

    /// Apply this template to an example, injecting the answer-choice
    /// binding first. Conventionally returns two segments: prompt and output.
    pub fn apply(
        &self,
        env: &RenderEnv,
        example: &Example,
        options: &RenderOptions,
    ) -> Result<Vec<String>, RenderError> {
        let choices = self.answer_choices_for(env, example)?;
        env.apply(&self.jinja, example, choices.as_deref(), options)
    }
}
