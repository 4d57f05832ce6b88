//! `boilerplates list`: templates available in the configured libraries.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::common::CommandContext;
use super::{CliConfig, OutputFormat};
use crate::templating::{TemplateStatus, TemplateSummary};

#[derive(Args)]
pub struct ListCommand {
    /// Only list templates of this kind (compose, terraform, kubernetes)
    kind: Option<String>,

    /// Include draft templates
    #[arg(short, long)]
    all: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl ListCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let ctx = CommandContext::load(cli).await?;
        let templates = ctx.templates(self.kind.as_deref()).await?;

        let mut rows: Vec<TemplateSummary> = templates
            .iter()
            .map(|t| t.summary())
            .filter(|s| self.all || s.status != TemplateStatus::Draft)
            .collect();
        rows.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.id.cmp(&b.id)));

        match self.format {
            OutputFormat::Json => {
                let json =
                    serde_json::to_string_pretty(&rows).context("Failed to serialize listing")?;
                println!("{json}");
            }
            OutputFormat::Text => print_table(&rows, self.all),
        }
        Ok(())
    }
}

fn print_table(rows: &[TemplateSummary], show_status: bool) {
    if rows.is_empty() {
        println!("No templates found.");
        return;
    }

    let id_width = rows.iter().map(|r| r.id.len()).max().unwrap_or(0).max(2);
    let kind_width = rows.iter().map(|r| r.kind.len()).max().unwrap_or(0).max(4);
    let version_width = rows.iter().map(|r| r.version.len()).max().unwrap_or(0).max(7);

    let header = format!(
        "{:<id_width$}  {:<kind_width$}  {:<version_width$}  NAME",
        "ID", "KIND", "VERSION"
    );
    println!("{}", header.bold());
    for row in rows {
        let mut name = row.name.clone();
        if show_status && row.status == TemplateStatus::Draft {
            name.push_str(&format!(" {}", "(draft)".yellow()));
        }
        println!(
            "{}  {:<kind_width$}  {:<version_width$}  {}",
            format!("{:<id_width$}", row.id).cyan(),
            row.kind,
            row.version,
            name
        );
    }
    println!("\n{} template(s)", rows.len());
}
