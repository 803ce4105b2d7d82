//! Tabular export
//!
//! Flattens every (dataset, subset, template) triple in a registry into one
//! CSV row. Pure read-only projection over the in-memory registry snapshot.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::registry::StoreRegistry;
use crate::template::Template;

/// One exported row. Field order is the column order.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateRow {
    pub id: String,
    pub dataset: String,
    pub subset: Option<String>,
    pub name: String,
    pub reference: String,
    pub original_task: Option<bool>,
    pub choices_in_prompt: Option<bool>,
    /// Metric names joined with ", "
    pub metrics: Option<String>,
    /// Fixed choices joined with the separator token
    pub answer_choices: Option<String>,
    pub answer_choices_key: Option<String>,
    pub jinja: String,
}

impl TemplateRow {
    fn from_template(dataset: &str, subset: Option<&str>, template: &Template) -> Self {
        let metadata = template.metadata();
        Self {
            id: template.id().to_string(),
            dataset: dataset.to_string(),
            subset: subset.map(str::to_string),
            name: template.name().to_string(),
            reference: template.reference().to_string(),
            original_task: metadata.original_task,
            choices_in_prompt: metadata.choices_in_prompt,
            metrics: metadata.metrics.as_ref().map(|metrics| metrics.join(", ")),
            answer_choices: template
                .answer_choices()
                .map(|choices| choices.join(" ||| ")),
            answer_choices_key: template.answer_choices_key().map(str::to_string),
            jinja: template.jinja().to_string(),
        }
    }
}

/// Flatten the registry into rows, stores in key order and templates in
/// sorted-name order within each store.
pub fn collect_rows(registry: &StoreRegistry) -> Vec<TemplateRow> {
    let mut rows = Vec::new();
    for (dataset, subset) in registry.keys() {
        let Some(store) = registry.get(&dataset, subset.as_deref()) else {
            continue;
        };
        let mut templates: Vec<&Template> = store.templates().collect();
        templates.sort_by(|a, b| a.name().cmp(b.name()));
        for template in templates {
            rows.push(TemplateRow::from_template(&dataset, subset.as_deref(), template));
        }
    }
    rows
}

/// Write every template in the registry to a CSV file. Returns the number
/// of rows written.
pub fn write_csv(registry: &StoreRegistry, path: impl AsRef<Path>) -> Result<usize, csv::Error> {
    let rows = collect_rows(registry);
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!(path = ?path.as_ref(), rows = rows.len(), "exported templates");
    Ok(rows.len())
}
