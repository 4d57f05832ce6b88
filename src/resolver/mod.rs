//! Template resolution: from a descriptor to a validated, renderable variable set.
//!
//! Resolution runs in two phases.
//!
//! ## Phase 1: Load ([`TemplateResolver::resolve`])
//! 1. **Schema gate**: pick the module base version serving the template's declared
//!    schema, or fail with an incompatibility error before anything else runs
//! 2. **Merge**: overlay the template spec on the cached module base spec; the merged
//!    collection is checked for duplicates, bad toggles, unknown references and cycles
//! 3. **Usage check**: scan the dynamic files; a referenced variable that nothing
//!    declares is an error, a template-declared variable nothing references a warning
//! 4. **Filter**: drop module sections and variables the template never touches
//!
//! ## Phase 2: Values ([`ResolvedTemplate::finalize`])
//! Persisted defaults, then caller overrides, are layered over the declared defaults.
//! Booleans of inactive sections are reset, autogenerated secrets are filled in and
//! the whole collection is validated at once.
//!
//! Resolutions share nothing mutable except the [`ModuleSpecCache`], so a resolver can
//! be cloned onto worker threads.

pub mod dependency_graph;

use serde_yaml::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::{BoilerplateError, Result};
use crate::schema::{ModuleRegistry, ModuleSpecCache, SchemaVersion, select_base_version};
use crate::templating::{RenderOutput, TemplateBody, TemplateDescriptor, TemplateRenderer};
use crate::variables::{Origin, VariableCollection, merge_specs};

/// Raw value layers above the declared defaults.
#[derive(Debug, Clone, Default)]
pub struct ValueLayers {
    /// Saved user defaults for the template's kind
    pub persisted: BTreeMap<String, Value>,
    /// Values given for this invocation
    pub caller: BTreeMap<String, Value>,
}

/// A template with its gate passed, spec merged and file tree loaded.
#[derive(Debug)]
pub struct ResolvedTemplate {
    pub descriptor: TemplateDescriptor,
    /// Module spec version the template was merged onto
    pub base_version: SchemaVersion,
    pub variables: VariableCollection,
    pub body: TemplateBody,
    /// Referenced variable to the files that reference it
    pub used: BTreeMap<String, Vec<PathBuf>>,
}

/// Resolves templates against a module registry and a shared spec cache.
#[derive(Debug, Clone)]
pub struct TemplateResolver {
    registry: Arc<ModuleRegistry>,
    cache: Arc<ModuleSpecCache>,
}

impl TemplateResolver {
    pub fn new(registry: Arc<ModuleRegistry>, cache: Arc<ModuleSpecCache>) -> Self {
        Self { registry, cache }
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &ModuleSpecCache {
        &self.cache
    }

    /// Schema gate plus merge, without reading any template file.
    pub fn merged_variables(
        &self,
        descriptor: &TemplateDescriptor,
    ) -> Result<(SchemaVersion, VariableCollection)> {
        let module = self.registry.get(&descriptor.kind)?;
        let base_version = select_base_version(
            &descriptor.id,
            &descriptor.kind,
            descriptor.schema.as_ref(),
            &module.supported(),
        )?;
        debug!(
            "Template {} (schema {}) uses {} base spec {}",
            descriptor.id,
            descriptor.schema.as_ref().map_or_else(|| "default".to_string(), ToString::to_string),
            descriptor.kind,
            base_version
        );

        let base = self.cache.get_or_load(module, &base_version)?;
        let merged = merge_specs(&base, &descriptor.spec)?;
        Ok((base_version, merged))
    }

    /// Full load: gate, merge, usage check and filtering.
    pub fn resolve(&self, descriptor: &TemplateDescriptor) -> Result<ResolvedTemplate> {
        let (base_version, merged) = self.merged_variables(descriptor)?;

        let body = descriptor.load_body()?;
        let used = body.used_variables()?;

        let undeclared: Vec<(String, Vec<String>)> = used
            .iter()
            .filter(|(name, _)| merged.variable(name).is_none())
            .map(|(name, files)| {
                let files = files.iter().map(|f| f.display().to_string()).collect();
                (name.clone(), files)
            })
            .collect();
        if !undeclared.is_empty() {
            return Err(BoilerplateError::UndeclaredVariables {
                template: descriptor.id.clone(),
                usages: undeclared,
            });
        }

        let toggles: HashSet<&str> =
            merged.sections().iter().filter_map(|s| s.toggle.as_deref()).collect();
        for name in descriptor.spec.variable_names() {
            if !used.contains_key(name) && !toggles.contains(name) {
                warn!(
                    "Template '{}' declares variable '{}' but no file uses it",
                    descriptor.id, name
                );
            }
        }

        let keep: HashSet<String> = used
            .keys()
            .cloned()
            .chain(descriptor.spec.variable_names().map(str::to_string))
            .collect();
        let variables = merged.filter_to_used(&keep)?;
        debug!(
            "Template {}: {} of {} variable(s) kept",
            descriptor.id,
            variables.len(),
            merged.len()
        );

        Ok(ResolvedTemplate {
            descriptor: descriptor.clone(),
            base_version,
            variables,
            body,
            used,
        })
    }
}

impl ResolvedTemplate {
    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    /// Layer persisted and caller values, then reset, generate and validate.
    pub fn finalize(&mut self, layers: &ValueLayers) -> Result<()> {
        let applied = self.variables.apply_values(&layers.persisted, Origin::Persisted)?;
        debug!("Applied {} persisted default(s)", applied.len());

        let applied = self.variables.apply_values(&layers.caller, Origin::Caller)?;
        for name in &applied {
            if !self.variables.is_variable_active(name) {
                warn!("Value for '{}' is stored but its section or needs are not satisfied", name);
            }
        }

        let reset = self.variables.reset_disabled_bools();
        if !reset.is_empty() {
            debug!("Reset {} inactive boolean(s)", reset.len());
        }
        let generated = self.variables.fill_autogenerated();
        if !generated.is_empty() {
            debug!("Generated values for: {}", generated.join(", "));
        }

        self.variables.validate_all()
    }

    /// Render the file tree with the active variables.
    pub fn render(&self) -> Result<RenderOutput> {
        TemplateRenderer::new(self.id()).render(&self.body, &self.variables.render_context())
    }

    /// The template's `next_steps`, rendered with the resolved values.
    pub fn next_steps(&self) -> Option<String> {
        let text = self.descriptor.metadata.next_steps.as_deref()?;
        Some(TemplateRenderer::new(self.id()).render_text(text, &self.variables.render_context()))
    }
}
