//! Render environment and custom filters
//!
//! Wraps a minijinja environment with the filters prompt templates rely on
//! (`highlight`, `choice`, `most_frequent`, `truncate`) plus a `zip` template
//! function. Handles the separator-escaping protocol that lets example data
//! safely contain the `|||` delimiter.

use std::sync::{Arc, Mutex};

use minijinja::value::{Rest, Value};
use minijinja::{Environment, ErrorKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::debug;

/// The fixed token splitting a rendered template into prompt and output.
pub const SEPARATOR: &str = "|||";

/// Maximum characters substituted per variable when truncation is enabled,
/// the approximate size of a 300-word passage.
pub const TEXT_VAR_LENGTH: usize = 2048;

/// Stand-in for separator occurrences inside example data while rendering.
/// Swapped back after the rendered text has been split.
const PIPE_PROTECTOR: &str = "3ed2dface8203c4c9dfb1a5dc58e41e0";

/// Key injected into the render context when a template has answer choices.
const ANSWER_CHOICES_KEY: &str = "answer_choices";

/// A render input: field names mapped to string/number/sequence/object values.
pub type Example = serde_json::Map<String, JsonValue>;

/// Errors from template rendering
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("example contains the reserved key 'answer_choices'")]
    ReservedKey,

    #[error("template render failed: {0}")]
    Template(#[from] minijinja::Error),
}

/// Options for applying a template to an example
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Cap every substituted variable at [`TEXT_VAR_LENGTH`] characters
    pub truncate: bool,
    /// Wrap every substituted variable in a highlight span
    pub highlight_variables: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            truncate: true,
            highlight_variables: false,
        }
    }
}

/// Render environment with the prompt filters registered once at startup.
///
/// Construct a single instance and pass it by reference into every render
/// call. `with_seed` makes the `choice` filter deterministic for
/// reproducibility-sensitive callers.
pub struct RenderEnv {
    env: Environment<'static>,
}

impl RenderEnv {
    /// Create an environment with an OS-seeded random source
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Create an environment whose `choice` filter is seeded for
    /// reproducible output
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let mut env = Environment::new();
        let rng = Arc::new(Mutex::new(rng));

        env.add_filter("highlight", highlight);
        env.add_filter("truncate", truncate);
        env.add_filter("most_frequent", most_frequent);
        env.add_filter("choice", move |value: Value| choice(&rng, value));
        env.add_function("zip", zip);

        Self { env }
    }

    /// Render `body` against `example` and split the result on [`SEPARATOR`].
    ///
    /// String-valued fields have literal separators protected before
    /// rendering and restored afterwards, so separators embedded in data
    /// never create spurious splits; only separators written in the template
    /// itself split the output. Each segment is trimmed of the template's
    /// surrounding whitespace.
    ///
    /// `answer_choices` is injected into the render context under the
    /// reserved `answer_choices` key; an example already carrying that key
    /// is rejected regardless of options.
    pub fn apply(
        &self,
        body: &str,
        example: &Example,
        answer_choices: Option<&[String]>,
        options: &RenderOptions,
    ) -> Result<Vec<String>, RenderError> {
        if example.contains_key(ANSWER_CHOICES_KEY) {
            return Err(RenderError::ReservedKey);
        }

        let mut source = body.to_string();
        // Source-level rewrite of every interpolation closer, so long and
        // short fields are each capped independently.
        if options.truncate {
            source = source.replace("}}", &format!(" | truncate({TEXT_VAR_LENGTH}) }}}}"));
        }
        if options.highlight_variables {
            source = source.replace("}}", " | highlight }}");
        }

        let mut ctx = escape_separator(example);
        if let Some(choices) = answer_choices {
            ctx.insert(
                ANSWER_CHOICES_KEY.to_string(),
                JsonValue::from(choices.to_vec()),
            );
        }

        debug!(source_len = source.len(), fields = ctx.len(), "rendering template");
        let rendered = self.env.render_str(&source, &ctx)?;

        Ok(split_segments(&rendered))
    }

    /// Render an answer-choice expression against `example` and split the
    /// result into individual choices.
    pub fn derive_choices(&self, expr: &str, example: &Example) -> Result<Vec<String>, RenderError> {
        let ctx = escape_separator(example);
        let rendered = self.env.render_str(expr, &ctx)?;
        Ok(split_segments(&rendered))
    }
}

impl Default for RenderEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace literal separators in string-valued fields with the protector
/// token. Non-string values pass through untouched.
fn escape_separator(example: &Example) -> Example {
    example
        .iter()
        .map(|(key, value)| {
            let value = match value {
                JsonValue::String(text) => JsonValue::String(text.replace(SEPARATOR, PIPE_PROTECTOR)),
                other => other.clone(),
            };
            (key.clone(), value)
        })
        .collect()
}

/// Split rendered text on the separator, trimming template whitespace and
/// restoring protected separators inside each segment.
fn split_segments(rendered: &str) -> Vec<String> {
    rendered
        .split(SEPARATOR)
        .map(|segment| segment.trim().replace(PIPE_PROTECTOR, SEPARATOR))
        .collect()
}

/// Wrap text in a visual marker for inspection tooling
fn highlight(value: Value) -> String {
    format!("<span style='color: #F08080'>{value}</span>")
}

/// Char-safe prefix of at most `length` characters
fn truncate(value: Value, length: usize) -> String {
    let text = value.to_string();
    if text.chars().count() <= length {
        text
    } else {
        text.chars().take(length).collect()
    }
}

/// Uniformly-random element of a sequence, drawn from the environment's
/// seedable random source
fn choice(rng: &Arc<Mutex<StdRng>>, value: Value) -> Result<Value, minijinja::Error> {
    let items: Vec<Value> = value.try_iter()?.collect();
    if items.is_empty() {
        return Err(minijinja::Error::new(
            ErrorKind::InvalidOperation,
            "choice filter requires a non-empty sequence",
        ));
    }
    let mut rng = rng.lock().map_err(|_| {
        minijinja::Error::new(ErrorKind::InvalidOperation, "render rng lock poisoned")
    })?;
    let index = rng.random_range(0..items.len());
    Ok(items[index].clone())
}

/// Elements tied for the highest occurrence count, in first-seen order.
/// An empty input yields an empty result.
fn most_frequent(value: Value) -> Result<Value, minijinja::Error> {
    let mut counts: Vec<(Value, usize)> = Vec::new();
    for item in value.try_iter()? {
        if let Some(entry) = counts.iter_mut().find(|(seen, _)| *seen == item) {
            entry.1 += 1;
        } else {
            counts.push((item, 1));
        }
    }
    let max_count = counts.iter().map(|(_, count)| *count).max().unwrap_or(0);
    let winners: Vec<Value> = counts
        .into_iter()
        .filter(|(_, count)| *count == max_count)
        .map(|(item, _)| item)
        .collect();
    Ok(Value::from(winners))
}

/// Per-index tuples from the given sequences, stopping at the shortest
fn zip(args: Rest<Value>) -> Result<Value, minijinja::Error> {
    let mut columns: Vec<Vec<Value>> = Vec::with_capacity(args.len());
    for arg in args.iter() {
        columns.push(arg.try_iter()?.collect());
    }
    let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
    let zipped: Vec<Value> = (0..rows)
        .map(|row| Value::from(columns.iter().map(|col| col[row].clone()).collect::<Vec<Value>>()))
        .collect();
    Ok(Value::from(zipped))
}
