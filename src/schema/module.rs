//! Module implementations and the schema versions they ship.
//!
//! A module is a template kind (`compose`, `terraform`, `kubernetes`). For every
//! supported schema version it provides a base spec that templates of that kind
//! overlay. The built-in specs are embedded at compile time.

use std::collections::BTreeMap;

use super::version::SchemaVersion;
use crate::core::BoilerplateError;

const COMPOSE_1_0: &str = include_str!("specs/compose-1.0.yaml");
const COMPOSE_1_1: &str = include_str!("specs/compose-1.1.yaml");
const TERRAFORM_1_0: &str = include_str!("specs/terraform-1.0.yaml");
const KUBERNETES_1_0: &str = include_str!("specs/kubernetes-1.0.yaml");

/// One template kind and its versioned base specs.
#[derive(Debug, Clone)]
pub struct ModuleSpec {
    /// Template kind
    pub kind: String,
    /// Human description
    pub description: String,
    versions: BTreeMap<SchemaVersion, String>,
}

impl ModuleSpec {
    /// Empty module with no versions yet.
    pub fn new(kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            description: description.into(),
            versions: BTreeMap::new(),
        }
    }

    /// Register the base spec source of one schema version.
    #[must_use]
    pub fn with_version(mut self, version: SchemaVersion, source: impl Into<String>) -> Self {
        self.versions.insert(version, source.into());
        self
    }

    /// Supported versions, oldest first.
    pub fn supported(&self) -> Vec<SchemaVersion> {
        self.versions.keys().cloned().collect()
    }

    /// Oldest supported version.
    pub fn oldest(&self) -> Option<&SchemaVersion> {
        self.versions.keys().next()
    }

    /// Newest supported version.
    pub fn newest(&self) -> Option<&SchemaVersion> {
        self.versions.keys().next_back()
    }

    /// YAML source of one version's base spec.
    pub fn source(&self, version: &SchemaVersion) -> Option<&str> {
        self.versions.get(version).map(String::as_str)
    }
}

/// Every known module, by kind.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, ModuleSpec>,
}

impl ModuleRegistry {
    /// Registry with no modules.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The modules shipped with this binary.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(
            ModuleSpec::new("compose", "Docker Compose stacks")
                .with_version(SchemaVersion::new(1, 0), COMPOSE_1_0)
                .with_version(SchemaVersion::new(1, 1), COMPOSE_1_1),
        );
        registry.register(
            ModuleSpec::new("terraform", "Terraform modules")
                .with_version(SchemaVersion::new(1, 0), TERRAFORM_1_0),
        );
        registry.register(
            ModuleSpec::new("kubernetes", "Kubernetes manifest sets")
                .with_version(SchemaVersion::new(1, 0), KUBERNETES_1_0),
        );
        registry
    }

    /// Add or replace a module.
    pub fn register(&mut self, module: ModuleSpec) {
        self.modules.insert(module.kind.clone(), module);
    }

    /// Look up a module by kind.
    pub fn get(&self, kind: &str) -> Result<&ModuleSpec, BoilerplateError> {
        self.modules.get(kind).ok_or_else(|| BoilerplateError::UnknownModule {
            kind: kind.to_string(),
        })
    }

    /// Known kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        self.modules.keys().map(String::as_str).collect()
    }

    /// All modules, sorted by kind.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleSpec> {
        self.modules.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SpecDeclaration;
    use crate::variables::merge::sections_from;
    use crate::variables::{Origin, VariableCollection};

    #[test]
    fn test_builtin_kinds() {
        let registry = ModuleRegistry::builtin();
        assert_eq!(registry.kinds(), ["compose", "kubernetes", "terraform"]);
        let compose = registry.get("compose").unwrap();
        assert_eq!(compose.oldest(), Some(&SchemaVersion::new(1, 0)));
        assert_eq!(compose.newest(), Some(&SchemaVersion::new(1, 1)));
        assert!(matches!(registry.get("helm"), Err(BoilerplateError::UnknownModule { .. })));
    }

    #[test]
    fn test_every_builtin_spec_is_a_valid_collection() {
        let registry = ModuleRegistry::builtin();
        for module in registry.modules() {
            for version in module.supported() {
                let source = module.source(&version).unwrap();
                let spec = SpecDeclaration::from_yaml(source).unwrap();
                let sections = sections_from(&spec, Origin::Module).unwrap();
                let collection = VariableCollection::from_sections(sections);
                assert!(collection.is_ok(), "{} {}: {:?}", module.kind, version, collection.err());
            }
        }
    }

    #[test]
    fn test_compose_1_1_tls_needs_traefik_enabled() {
        let registry = ModuleRegistry::builtin();
        let source = registry.get("compose").unwrap().source(&SchemaVersion::new(1, 1)).unwrap();
        let spec = SpecDeclaration::from_yaml(source).unwrap();
        let collection =
            VariableCollection::from_sections(sections_from(&spec, Origin::Module).unwrap()).unwrap();

        assert!(!collection.is_section_satisfied("traefik_tls"));
        assert!(collection.is_section_satisfied("network"));
        assert!(!collection.is_variable_satisfied("network_macvlan_subnet"));
    }
}
