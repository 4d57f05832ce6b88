//! `boilerplates show`: metadata and the resolved variable set of one template.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::common::CommandContext;
use super::{CliConfig, OutputFormat};
use crate::templating::TemplateSummary;
use crate::variables::{Origin, SectionView};

#[derive(Args)]
pub struct ShowCommand {
    /// Template id
    template: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Ignore saved defaults
    #[arg(long)]
    no_defaults: bool,
}

#[derive(Serialize)]
struct ShowReport {
    template: TemplateSummary,
    base_schema: String,
    files: Vec<String>,
    sections: Vec<SectionView>,
}

impl ShowCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let ctx = CommandContext::load(cli).await?;
        let descriptor = ctx.template(&self.template).await?;
        let mut resolved = ctx.resolver().resolve(&descriptor)?;

        let persisted = ctx.persisted_layer(&descriptor.kind, self.no_defaults)?;
        resolved.variables.apply_values(&persisted, Origin::Persisted)?;

        let report = ShowReport {
            template: descriptor.summary(),
            base_schema: resolved.base_version.to_string(),
            files: resolved
                .body
                .files()
                .iter()
                .map(|f| f.output_path.display().to_string())
                .collect(),
            sections: resolved.variables.display_order(),
        };

        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&report)
                    .context("Failed to serialize template report")?;
                println!("{json}");
            }
            OutputFormat::Text => {
                print_header(&report);
                if let Some(next_steps) = &descriptor.metadata.next_steps {
                    println!("{}", "Next steps:".bold());
                    for line in next_steps.lines() {
                        println!("  {line}");
                    }
                    println!();
                }
                print_sections(&report.sections);
            }
        }
        Ok(())
    }
}

fn print_header(report: &ShowReport) {
    let t = &report.template;
    println!("{} {}", t.name.bold(), format!("({})", t.id).dimmed());
    println!("{}", t.description);
    println!();
    println!("  Kind:     {} (base spec {})", t.kind, report.base_schema);
    println!("  Version:  {}", t.version);
    println!("  Author:   {}", t.author);
    println!("  Date:     {}", t.date);
    println!("  Library:  {}", t.library);
    if !t.tags.is_empty() {
        println!("  Tags:     {}", t.tags.join(", "));
    }
    if t.status == crate::templating::TemplateStatus::Draft {
        println!("  Status:   {}", "draft".yellow());
    }
    println!();
    println!("{}", "Files:".bold());
    for file in &report.files {
        println!("  {file}");
    }
    println!();
}

fn print_sections(sections: &[SectionView]) {
    for section in sections {
        let mut flags = Vec::new();
        if section.required {
            flags.push("required".to_string());
        }
        if let Some(toggle) = &section.toggle {
            flags.push(format!("toggle: {toggle}"));
        }
        if let Some(needs) = &section.needs {
            flags.push(format!("needs: {needs}"));
        }
        let state = if section.satisfied {
            "enabled".green()
        } else if section.enabled {
            "needs unmet".yellow()
        } else {
            "disabled".dimmed()
        };
        let flags = if flags.is_empty() { String::new() } else { format!(" [{}]", flags.join(", ")) };
        println!("{} {}{} {}", section.title.bold(), format!("({})", section.key).dimmed(), flags, state);
        if let Some(description) = &section.description {
            println!("  {}", description.dimmed());
        }

        let width = section.variables.iter().map(|v| v.name.len()).max().unwrap_or(0);
        for var in &section.variables {
            let value = if var.value.is_empty() { "-".dimmed().to_string() } else { var.value.clone() };
            let mut line = format!(
                "  {}  {:<6}  {}",
                format!("{:<width$}", var.name).cyan(),
                var.type_name,
                value
            );
            if !var.options.is_empty() {
                line.push_str(&format!("  [{}]", var.options.join("|")));
            }
            if !var.origin.is_empty() {
                line.push_str(&format!("  {}", format!("({})", var.origin).dimmed()));
            }
            if !var.active {
                line.push_str(&format!("  {}", "inactive".dimmed()));
            }
            println!("{line}");
        }
        println!();
    }
}
