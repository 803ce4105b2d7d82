//! PromptStore - CLI entry point
//!
//! Thin wrapper over the library: resolves config, opens the store or
//! registry a command needs, and prints results.

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing_subscriber::EnvFilter;

use promptstore::cli::{Cli, Command};
use promptstore::config::Config;
use promptstore::{
    RenderEnv, RenderOptions, StoreRegistry, Template, TemplateMetadata, TemplateStore,
    write_csv,
};

fn setup_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let root = &config.templates_path;

    match cli.command {
        Command::Counts => {
            let registry = StoreRegistry::discover(root)?;
            let counts = registry.counts();
            if counts.is_empty() {
                println!("No templates found");
            } else {
                for (dataset, count) in counts {
                    println!("{} {}", dataset.cyan(), count);
                }
            }
        }
        Command::List { dataset, subset } => {
            let store = TemplateStore::open(root, &dataset, subset)?;
            if store.is_empty() {
                println!("No templates for {}", store.label());
            } else {
                for name in store.template_names() {
                    println!("{}", name);
                }
            }
        }
        Command::Show {
            dataset,
            name,
            subset,
        } => {
            let store = TemplateStore::open(root, &dataset, subset)?;
            let template = store.get(&name)?;
            let metadata = template.metadata();
            println!("{} {}", template.name().cyan(), template.id().dimmed());
            println!("  reference: {}", template.reference());
            println!("  original_task: {}", tri_state(metadata.original_task));
            println!("  choices_in_prompt: {}", tri_state(metadata.choices_in_prompt));
            println!(
                "  metrics: {}",
                metadata
                    .metrics
                    .as_ref()
                    .map(|metrics| metrics.join(", "))
                    .unwrap_or_else(|| "-".to_string())
            );
            println!(
                "  answer_choices: {}",
                template
                    .answer_choices()
                    .map(|choices| choices.join(" ||| "))
                    .unwrap_or_else(|| "-".to_string())
            );
            println!(
                "  answer_choices_key: {}",
                template.answer_choices_key().unwrap_or("-")
            );
            println!("{}", template.jinja());
        }
        Command::Render {
            dataset,
            name,
            example,
            subset,
            no_truncate,
            highlight,
            seed,
        } => {
            let store = TemplateStore::open(root, &dataset, subset)?;
            let template = store.get(&name)?;
            let example = serde_json::from_str(&example)
                .context("Example must be a JSON object of field values")?;
            let env = match seed {
                Some(seed) => RenderEnv::with_seed(seed),
                None => RenderEnv::new(),
            };
            let options = RenderOptions {
                truncate: !no_truncate,
                highlight_variables: highlight,
            };
            let segments = template.apply(&env, &example, &options)?;
            for (index, segment) in segments.iter().enumerate() {
                if index > 0 {
                    println!("{}", "|||".dimmed());
                }
                println!("{}", segment);
            }
        }
        Command::Add {
            dataset,
            name,
            jinja,
            subset,
            reference,
            answer_choices,
            answer_choices_key,
        } => {
            let mut store = TemplateStore::open(root, &dataset, subset)?;
            let template = Template::new(
                name.clone(),
                jinja,
                reference,
                TemplateMetadata::default(),
                answer_choices,
                answer_choices_key,
            );
            store.add(template)?;
            println!("{} Added template: {}", "✓".green(), name.cyan());
        }
        Command::Remove {
            dataset,
            name,
            subset,
        } => {
            let mut store = TemplateStore::open(root, &dataset, subset)?;
            store.remove(&name)?;
            println!("{} Removed template: {}", "✓".green(), name);
        }
        Command::Export { output } => {
            let registry = StoreRegistry::discover(root)?;
            let rows = write_csv(&registry, &output)?;
            println!(
                "{} Exported {} templates to {}",
                "✓".green(),
                rows,
                output.display().to_string().cyan()
            );
        }
    }

    Ok(())
}

fn tri_state(value: Option<bool>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => "-".to_string(),
    }
}
