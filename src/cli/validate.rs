//! `boilerplates validate`: load, resolve and render templates without writing.
//!
//! Every selected template is checked on the blocking pool concurrently. A template
//! fails when its spec does not merge, it references undeclared variables, or any
//! file fails to render. Missing required values and malformed rendered YAML are
//! reported as warnings.

use anyhow::{Result, anyhow, bail};
use clap::Args;
use colored::Colorize;
use futures::future::join_all;
use std::collections::BTreeMap;

use super::CliConfig;
use super::common::CommandContext;
use crate::constants::batch_operation_timeout;
use crate::core::{BoilerplateError, user_friendly_error};
use crate::library::find_template;
use crate::resolver::{TemplateResolver, ValueLayers};
use crate::templating::TemplateDescriptor;

#[derive(Args)]
pub struct ValidateCommand {
    /// Only validate this template
    template: Option<String>,

    /// Only validate templates of this kind
    #[arg(short, long)]
    kind: Option<String>,
}

/// Outcome for one template.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub template: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

impl ValidateCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let ctx = CommandContext::load(cli).await?;
        let templates = ctx.templates(self.kind.as_deref()).await?;

        let selected: Vec<TemplateDescriptor> = match &self.template {
            Some(id) => vec![find_template(&templates, id)?.clone()],
            None => templates,
        };
        if selected.is_empty() {
            println!("No templates to validate.");
            return Ok(());
        }

        let mut jobs = Vec::with_capacity(selected.len());
        for descriptor in selected {
            let persisted = ctx.persisted_layer(&descriptor.kind, false)?;
            jobs.push((descriptor, persisted));
        }

        let reports = validate_all(ctx.resolver(), jobs).await?;
        let failed = reports.iter().filter(|r| !r.passed()).count();
        for report in &reports {
            print_report(report);
        }

        println!();
        if failed > 0 {
            bail!("{} of {} template(s) failed validation", failed, reports.len());
        }
        println!("{} {} template(s) valid", "✓".green(), reports.len());
        Ok(())
    }
}

/// Validate templates concurrently, reports in input order.
pub async fn validate_all(
    resolver: &TemplateResolver,
    jobs: Vec<(TemplateDescriptor, BTreeMap<String, serde_yaml::Value>)>,
) -> Result<Vec<ValidationReport>> {
    let tasks = jobs.into_iter().map(|(descriptor, persisted)| {
        let resolver = resolver.clone();
        async move {
            let id = descriptor.id.clone();
            tokio::task::spawn_blocking(move || validate_template(&resolver, &descriptor, persisted))
                .await
                .map_err(|e| anyhow!("Task join error while validating {}: {}", id, e))
        }
    });

    let results = tokio::time::timeout(batch_operation_timeout(), join_all(tasks))
        .await
        .map_err(|_| anyhow!("Timed out validating templates"))?;
    results.into_iter().collect()
}

/// Resolve, fill and render one template, collecting problems.
pub fn validate_template(
    resolver: &TemplateResolver,
    descriptor: &TemplateDescriptor,
    persisted: BTreeMap<String, serde_yaml::Value>,
) -> ValidationReport {
    let mut report = ValidationReport {
        template: descriptor.id.clone(),
        ..ValidationReport::default()
    };

    let mut resolved = match resolver.resolve(descriptor) {
        Ok(resolved) => resolved,
        Err(e) => {
            report.errors.push(describe(e));
            return report;
        }
    };

    let layers = ValueLayers {
        persisted,
        caller: BTreeMap::new(),
    };
    match resolved.finalize(&layers) {
        Ok(()) => {}
        Err(BoilerplateError::ValidationFailed { errors }) => {
            report.warnings.extend(errors.into_iter().map(|e| format!("needs a value at generation: {e}")));
        }
        Err(e) => {
            report.errors.push(describe(e));
            return report;
        }
    }

    match resolved.render() {
        Ok(output) => {
            for (path, problem) in output.yaml_problems() {
                report.warnings.push(format!("{}: invalid YAML: {}", path.display(), problem));
            }
        }
        Err(e) => report.errors.push(describe(e)),
    }
    report
}

fn describe(error: BoilerplateError) -> String {
    let ctx = user_friendly_error(error.into());
    match ctx.details {
        Some(details) => format!("{}{}", ctx.error, details),
        None => ctx.error.to_string(),
    }
}

fn print_report(report: &ValidationReport) {
    if report.passed() {
        println!("{} {}", "✓".green(), report.template);
    } else {
        println!("{} {}", "✗".red(), report.template.bold());
    }
    for error in &report.errors {
        for (i, line) in error.lines().enumerate() {
            if i == 0 {
                println!("    {} {}", "error:".red(), line);
            } else {
                println!("    {line}");
            }
        }
    }
    for warning in &report.warnings {
        println!("    {} {}", "warning:".yellow(), warning);
    }
}
