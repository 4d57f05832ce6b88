//! `boilerplates generate`: resolve values, render and write a template.

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::CliConfig;
use super::common::{CommandContext, print_warning};
use crate::resolver::ValueLayers;
use crate::templating::{FileAction, OutputPlan, TemplateStatus, plan_output, write_output};

#[derive(Args)]
pub struct GenerateCommand {
    /// Template id
    pub(super) template: String,

    /// Output directory (defaults to ./<template>)
    destination: Option<PathBuf>,

    /// Set a variable (repeatable)
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub(super) vars: Vec<(String, String)>,

    /// YAML file with variable values; `--var` wins over it
    #[arg(long, value_name = "FILE")]
    var_file: Option<PathBuf>,

    /// Show what would be written without writing
    #[arg(long)]
    pub(super) dry_run: bool,

    /// Write into a non-empty directory, replacing rendered files
    #[arg(long)]
    force: bool,

    /// Ignore saved defaults
    #[arg(long)]
    no_defaults: bool,
}

impl GenerateCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let ctx = CommandContext::load(cli).await?;
        let descriptor = ctx.template(&self.template).await?;
        if descriptor.status() == TemplateStatus::Draft {
            bail!("Template '{}' is a draft and cannot be generated", descriptor.id);
        }

        let layers = ValueLayers {
            persisted: ctx.persisted_layer(&descriptor.kind, self.no_defaults)?,
            caller: self.caller_values()?,
        };

        let mut resolved = ctx.resolver().resolve(&descriptor)?;
        resolved.finalize(&layers)?;
        let output = resolved.render()?;

        let destination =
            self.destination.clone().unwrap_or_else(|| PathBuf::from(descriptor.base_id()));

        if self.dry_run {
            let plan = plan_output(&output, &destination)?;
            print_plan(&plan, true);
            if plan.destination_occupied && !self.force {
                print_warning(&format!(
                    "{} is not empty; writing would require --force",
                    destination.display()
                ));
            }
            return Ok(());
        }

        let plan = write_output(&output, &destination, self.force)?;
        print_plan(&plan, false);

        if let Some(next_steps) = resolved.next_steps() {
            println!("\n{}", "Next steps:".bold());
            for line in next_steps.lines() {
                println!("  {line}");
            }
        }
        Ok(())
    }

    /// `--var-file` values overlaid with `--var` values.
    fn caller_values(&self) -> Result<BTreeMap<String, Value>> {
        let mut values = match &self.var_file {
            Some(path) => read_var_file(path)?,
            None => BTreeMap::new(),
        };
        for (name, value) in &self.vars {
            values.insert(name.clone(), Value::String(value.clone()));
        }
        Ok(values)
    }
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let Some((name, value)) = raw.split_once('=') else {
        return Err(format!("expected NAME=VALUE, got '{raw}'"));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing variable name in '{raw}'"));
    }
    Ok((name.to_string(), value.to_string()))
}

fn read_var_file(path: &Path) -> Result<BTreeMap<String, Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read variable file {}", path.display()))?;
    let values: Option<BTreeMap<String, Value>> = serde_yaml::from_str(&content)
        .with_context(|| format!("{} must be a mapping of variable names to values", path.display()))?;
    Ok(values.unwrap_or_default())
}

fn print_plan(plan: &OutputPlan, dry_run: bool) {
    if dry_run {
        println!("{} {}", "Dry run:".bold(), plan.destination.display());
    } else {
        println!("{} {}", "Generated".green().bold(), plan.destination.display());
    }

    let path_width = plan.files.iter().map(|f| f.path.display().to_string().len()).max().unwrap_or(0);
    for file in &plan.files {
        let action = match file.action {
            FileAction::Create => file.action.as_str().green(),
            FileAction::Overwrite => file.action.as_str().yellow(),
            FileAction::Unchanged => file.action.as_str().dimmed(),
        };
        println!(
            "  {:<path_width$}  {:>8}  {}  {}",
            file.path.display().to_string(),
            format_size(file.size),
            file.digest.dimmed(),
            action
        );
    }
    for skipped in &plan.skipped {
        println!("  {}  {}", skipped.display(), "skipped (empty)".dimmed());
    }

    println!(
        "{} file(s), {}: {} new, {} overwritten, {} unchanged",
        plan.files.len(),
        format_size(plan.total_size()),
        plan.count(FileAction::Create),
        plan.count(FileAction::Overwrite),
        plan.count(FileAction::Unchanged)
    );
}

fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    }
}
