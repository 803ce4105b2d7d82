//! CLI argument parsing for promptstore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ps")]
#[command(author, version, about = "Versioned prompt template store", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show per-dataset template counts (subsets roll up into their dataset)
    Counts,

    /// List template names for a dataset
    List {
        /// Dataset name
        #[arg(required = true)]
        dataset: String,

        /// Subset name, for datasets split into subsets
        #[arg(short, long)]
        subset: Option<String>,
    },

    /// Show a template's fields and body
    Show {
        /// Dataset name
        #[arg(required = true)]
        dataset: String,

        /// Template name
        #[arg(required = true)]
        name: String,

        /// Subset name
        #[arg(short, long)]
        subset: Option<String>,
    },

    /// Render a template against a JSON example
    Render {
        /// Dataset name
        #[arg(required = true)]
        dataset: String,

        /// Template name
        #[arg(required = true)]
        name: String,

        /// Example as a JSON object of field values
        #[arg(required = true)]
        example: String,

        /// Subset name
        #[arg(short, long)]
        subset: Option<String>,

        /// Disable per-variable truncation
        #[arg(long)]
        no_truncate: bool,

        /// Wrap substituted variables in highlight markers
        #[arg(long)]
        highlight: bool,

        /// Seed the render RNG for reproducible `choice` output
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Add a new template
    Add {
        /// Dataset name
        #[arg(required = true)]
        dataset: String,

        /// Template name (unique within the dataset)
        #[arg(required = true)]
        name: String,

        /// Template body in minijinja syntax ("prompt ||| output")
        #[arg(required = true)]
        jinja: String,

        /// Subset name
        #[arg(short, long)]
        subset: Option<String>,

        /// Author or paper reference
        #[arg(short, long, default_value = "")]
        reference: String,

        /// Fixed answer choices (comma separated)
        #[arg(long, value_delimiter = ',')]
        answer_choices: Option<Vec<String>>,

        /// Expression deriving answer choices from an example
        #[arg(long)]
        answer_choices_key: Option<String>,
    },

    /// Remove a template (removing the last one deletes the store)
    Remove {
        /// Dataset name
        #[arg(required = true)]
        dataset: String,

        /// Template name
        #[arg(required = true)]
        name: String,

        /// Subset name
        #[arg(short, long)]
        subset: Option<String>,
    },

    /// Export every template to a CSV report
    Export {
        /// Output file path
        #[arg(required = true)]
        output: PathBuf,
    },
}
