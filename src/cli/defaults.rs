//! `boilerplates defaults`: saved values applied to every template of a kind.

use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};
use colored::Colorize;

use super::CliConfig;
use super::common::{CommandContext, print_warning};
use crate::config::parse_default_value;

#[derive(Args)]
pub struct DefaultsCommand {
    #[command(subcommand)]
    action: DefaultsAction,
}

#[derive(Subcommand)]
enum DefaultsAction {
    /// Show saved defaults
    List {
        /// Only this kind
        kind: Option<String>,
    },
    /// Save a default value
    Set {
        kind: String,
        name: String,
        value: String,
    },
    /// Remove a saved default
    Remove { kind: String, name: String },
}

impl DefaultsCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let mut ctx = CommandContext::load(cli).await?;

        match self.action {
            DefaultsAction::List { kind } => {
                let kinds: Vec<&String> = ctx
                    .config
                    .defaults
                    .keys()
                    .filter(|k| kind.as_ref().is_none_or(|wanted| wanted == *k))
                    .collect();
                if kinds.is_empty() {
                    println!("No saved defaults.");
                    return Ok(());
                }
                for kind in kinds {
                    println!("{}", format!("[{kind}]").bold());
                    for (name, value) in &ctx.config.defaults[kind] {
                        println!("  {} = {}", name.cyan(), value);
                    }
                }
            }
            DefaultsAction::Set { kind, name, value } => {
                check_known_variable(&ctx, &kind, &name)?;
                let value = parse_default_value(&value);
                let shown = value.to_string();
                ctx.config.set_default(&kind, &name, value);
                ctx.config.save_to(&ctx.config_path).await?;
                println!("Saved {} {} = {}", kind, name.cyan(), shown);
            }
            DefaultsAction::Remove { kind, name } => {
                if ctx.config.remove_default(&kind, &name).is_none() {
                    return Err(anyhow!("No saved default '{name}' for '{kind}'"));
                }
                ctx.config.save_to(&ctx.config_path).await?;
                println!("Removed {} {}", kind, name.cyan());
            }
        }
        Ok(())
    }
}

/// The kind must be a known module; unknown variable names only warn, since
/// templates may declare their own.
fn check_known_variable(ctx: &CommandContext, kind: &str, name: &str) -> Result<()> {
    let module = ctx.resolver().registry().get(kind)?;
    let declared = module.supported().iter().try_fold(false, |found, version| {
        let spec = ctx.resolver().cache().get_or_load(module, version)?;
        Ok::<bool, crate::core::BoilerplateError>(found || spec.variable_names().any(|n| n == name))
    })?;
    if !declared {
        print_warning(&format!(
            "'{name}' is not a {kind} module variable; it only applies to templates declaring it"
        ));
    }
    Ok(())
}
