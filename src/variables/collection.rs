//! The merged, validated variable model of one template.
//!
//! A [`VariableCollection`] is only ever built through [`VariableCollection::from_sections`],
//! which rejects broken declarations (duplicate names, bad toggles, unknown references,
//! cycles) and fixes the canonical order. Every query afterwards can assume a sound,
//! acyclic model.

use serde::Serialize;
use serde_yaml::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use super::autogen::generate_secret;
use super::needs::{Need, format_needs};
use super::section::Section;
use super::value::VariableValue;
use super::variable::{Origin, Variable};
use crate::core::BoilerplateError;
use crate::resolver::dependency_graph::{NeedsGraph, NeedsNode};

/// Sections and variables of a template, merged and ordered.
#[derive(Debug, Clone)]
pub struct VariableCollection {
    sections: Vec<Section>,
    index: HashMap<String, (usize, usize)>,
}

/// Satisfaction state of a section, for display.
#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    /// Section key
    pub key: String,
    /// Display title
    pub title: String,
    /// Description
    pub description: Option<String>,
    /// Required section
    pub required: bool,
    /// Toggle variable name
    pub toggle: Option<String>,
    /// Needs in compact form
    pub needs: Option<String>,
    /// Toggle on (or no toggle)
    pub enabled: bool,
    /// Needs met and enabled
    pub satisfied: bool,
    /// Variables in order
    pub variables: Vec<VariableView>,
}

/// A variable as shown to the user.
#[derive(Debug, Clone, Serialize)]
pub struct VariableView {
    /// Variable name
    pub name: String,
    /// Type name
    #[serde(rename = "type")]
    pub type_name: String,
    /// Description
    pub description: Option<String>,
    /// Masked/truncated value
    pub value: String,
    /// Provenance chain
    pub origin: String,
    /// Required flag
    pub required: bool,
    /// Sensitive flag
    pub sensitive: bool,
    /// Enum options
    pub options: Vec<String>,
    /// Needs in compact form
    pub needs: Option<String>,
    /// Included in the render context
    pub active: bool,
}

impl VariableCollection {
    /// Validate sections and compute the canonical order.
    pub fn from_sections(sections: Vec<Section>) -> Result<Self, BoilerplateError> {
        check_unique_names(&sections)?;

        let section_keys: HashSet<&str> = sections.iter().map(|s| s.key.as_str()).collect();
        let owner_of: HashMap<&str, &str> = sections
            .iter()
            .flat_map(|s| s.variables.iter().map(move |v| (v.name.as_str(), s.key.as_str())))
            .collect();

        for section in &sections {
            check_toggle(section, &owner_of)?;
            let owner = format!("Section '{}'", section.key);
            for need in &section.needs {
                check_reference(&owner, need, &section_keys, &owner_of)?;
            }
            for variable in &section.variables {
                let owner = format!("Variable '{}'", variable.name);
                for need in &variable.needs {
                    check_reference(&owner, need, &section_keys, &owner_of)?;
                }
            }
        }

        entity_graph(&sections).detect_cycles()?;

        let order = section_order(&sections, &owner_of);
        let mut by_key: HashMap<String, Section> =
            sections.into_iter().map(|s| (s.key.clone(), s)).collect();
        let sections: Vec<Section> =
            order.iter().filter_map(|key| by_key.remove(key)).map(order_variables).collect();
        let index = build_index(&sections);
        Ok(Self { sections, index })
    }

    /// Sections in canonical order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Look up a section.
    pub fn section(&self, key: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.key == key)
    }

    /// Look up a variable by name.
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.index.get(name).map(|&(s, v)| &self.sections[s].variables[v])
    }

    fn variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        let &(s, v) = self.index.get(name)?;
        Some(&mut self.sections[s].variables[v])
    }

    /// Section owning a variable.
    pub fn owner(&self, name: &str) -> Option<&Section> {
        self.index.get(name).map(|&(s, _)| &self.sections[s])
    }

    /// All variable names in canonical order.
    pub fn variable_names(&self) -> Vec<&str> {
        self.sections
            .iter()
            .flat_map(|s| s.variables.iter().map(|v| v.name.as_str()))
            .collect()
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True when no variables are declared.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Required, toggle on, or no toggle at all.
    pub fn is_section_enabled(&self, key: &str) -> bool {
        self.section(key)
            .is_some_and(|s| s.required || s.toggle_variable().is_none_or(Variable::is_truthy))
    }

    /// Every section-level need holds.
    pub fn section_needs_met(&self, key: &str) -> bool {
        self.section(key).is_some_and(|s| s.needs.iter().all(|n| self.need_holds(n)))
    }

    /// Needs met and enabled.
    pub fn is_section_satisfied(&self, key: &str) -> bool {
        self.section_needs_met(key) && self.is_section_enabled(key)
    }

    /// Every variable-level need holds.
    pub fn is_variable_satisfied(&self, name: &str) -> bool {
        self.variable(name).is_some_and(|v| v.needs.iter().all(|n| self.need_holds(n)))
    }

    /// Included in the render context: required, or satisfied in a satisfied section.
    pub fn is_variable_active(&self, name: &str) -> bool {
        let (Some(variable), Some(section)) = (self.variable(name), self.owner(name)) else {
            return false;
        };
        variable.required || (self.is_section_satisfied(&section.key) && self.is_variable_satisfied(name))
    }

    /// Evaluate a single need against current values.
    pub fn need_holds(&self, need: &Need) -> bool {
        match need {
            Need::SectionRef(key) => self.is_section_satisfied(key),
            Need::VariableEquals {
                name,
                values,
                negated,
            } => {
                let Some(variable) = self.variable(name) else {
                    return false;
                };
                let matched = values.iter().any(|expected| value_matches(variable, expected));
                matched != *negated
            }
        }
    }

    /// Needs of a section or variable that currently fail, as text.
    pub fn unmet_needs(&self, needs: &[Need]) -> Vec<String> {
        needs.iter().filter(|n| !self.need_holds(n)).map(ToString::to_string).collect()
    }

    /// Apply one layer of raw values.
    ///
    /// Unknown names are ignored. A value whose variable was set by a higher layer is
    /// skipped. If any value fails to coerce, nothing is applied.
    pub fn apply_values(
        &mut self,
        values: &BTreeMap<String, Value>,
        origin: Origin,
    ) -> Result<Vec<String>, BoilerplateError> {
        let mut converted = Vec::new();
        let mut errors = Vec::new();

        for (name, raw) in values {
            let Some(variable) = self.variable(name) else {
                debug!("Ignoring {origin} value for undeclared variable '{name}'");
                continue;
            };
            if variable.origin().is_some_and(|current| current > origin) {
                debug!(
                    "Keeping {} value of '{name}' over {origin} value",
                    variable.origin().map(|o| o.to_string()).unwrap_or_default()
                );
                continue;
            }
            match variable.convert(raw) {
                Ok(value) => converted.push((name.clone(), value)),
                Err(e) => errors.push(e.to_string()),
            }
        }

        if !errors.is_empty() {
            return Err(BoilerplateError::InvalidValues {
                origin: origin.to_string(),
                errors,
            });
        }

        let mut applied = Vec::with_capacity(converted.len());
        for (name, value) in converted {
            if let Some(variable) = self.variable_mut(&name) {
                variable.set_value(value, origin);
                applied.push(name);
            }
        }
        Ok(applied)
    }

    /// Force inactive bool variables to false until nothing changes.
    ///
    /// Caller-set values are left alone so [`validate_all`](Self::validate_all) can
    /// report them. Returns the names that were reset.
    pub fn reset_disabled_bools(&mut self) -> Vec<String> {
        let mut reset = Vec::new();
        loop {
            let targets: Vec<String> = self
                .sections
                .iter()
                .flat_map(|s| s.variables.iter())
                .filter(|v| v.is_bool() && v.value != Some(VariableValue::Boolean(false)))
                .filter(|v| v.origin() != Some(Origin::Caller))
                .filter(|v| !self.is_variable_active(&v.name))
                .map(|v| v.name.clone())
                .collect();

            if targets.is_empty() {
                break;
            }
            for name in targets {
                if let Some(variable) = self.variable_mut(&name) {
                    variable.value = Some(VariableValue::Boolean(false));
                    debug!("Reset disabled bool variable '{name}' to false");
                    reset.push(name);
                }
            }
        }
        reset
    }

    /// Generate secrets for active autogenerated variables that are still empty.
    pub fn fill_autogenerated(&mut self) -> Vec<String> {
        let targets: Vec<String> = self
            .sections
            .iter()
            .flat_map(|s| s.variables.iter())
            .filter(|v| v.autogenerate.is_some() && v.is_empty())
            .filter(|v| self.is_variable_active(&v.name))
            .map(|v| v.name.clone())
            .collect();

        for name in &targets {
            let Some(variable) = self.variable_mut(name) else {
                continue;
            };
            if let Some(settings) = variable.autogenerate {
                let secret = generate_secret(&settings);
                variable.set_value(Some(VariableValue::String(secret)), Origin::Generated);
                debug!("Generated value for '{name}'");
            }
        }
        targets
    }

    /// Report every problem with the current values at once.
    pub fn validate_all(&self) -> Result<(), BoilerplateError> {
        let mut errors = Vec::new();

        for section in &self.sections {
            for variable in &section.variables {
                let qualified = format!("{}.{}", section.key, variable.name);
                let active = self.is_variable_active(&variable.name);

                if !active {
                    if variable.is_bool()
                        && variable.origin() == Some(Origin::Caller)
                        && variable.is_truthy()
                    {
                        let mut unmet = self.unmet_needs(&section.needs);
                        match section.toggle.as_deref() {
                            Some(toggle)
                                if toggle != variable.name
                                    && !self.is_section_enabled(&section.key) =>
                            {
                                unmet.push(format!("{toggle}=true"));
                            }
                            _ => {}
                        }
                        unmet.extend(self.unmet_needs(&variable.needs));
                        unmet.sort();
                        unmet.dedup();
                        let requires = if unmet.is_empty() {
                            "dependencies not satisfied".to_string()
                        } else {
                            unmet.join(", ")
                        };
                        errors.push(format!(
                            "{qualified} (set by caller to true but requires: {requires})"
                        ));
                    }
                    continue;
                }

                if variable.optional || variable.is_bool() {
                    continue;
                }
                if variable.autogenerate.is_some() && variable.is_empty() {
                    continue;
                }
                match &variable.value {
                    None => errors.push(format!("{qualified} (required - no default provided)")),
                    Some(value) if value.is_empty() => {
                        if variable.required {
                            errors.push(format!("{qualified} (required - cannot be empty)"));
                        } else {
                            errors.push(format!("{qualified} (empty)"));
                        }
                    }
                    Some(_) => {}
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(BoilerplateError::ValidationFailed { errors })
        }
    }

    /// Variable name to JSON value for every active variable.
    ///
    /// Active variables without a value map to null. Inactive variables are absent,
    /// toggles of dormant sections included; `{% if x_enabled %}` treats them as false.
    pub fn render_context(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut context = serde_json::Map::new();
        for section in &self.sections {
            for variable in &section.variables {
                if self.is_variable_active(&variable.name) {
                    let value =
                        variable.value.as_ref().map_or(serde_json::Value::Null, VariableValue::to_json);
                    context.insert(variable.name.clone(), value);
                }
            }
        }
        context
    }

    /// Names of sensitive variables.
    pub fn sensitive_names(&self) -> Vec<&str> {
        self.sections
            .iter()
            .flat_map(|s| s.variables.iter())
            .filter(|v| v.sensitive)
            .map(|v| v.name.as_str())
            .collect()
    }

    /// Canonical order with satisfaction state attached.
    pub fn annotated(&self) -> Vec<SectionView> {
        self.sections.iter().map(|s| self.section_view(s)).collect()
    }

    /// Display order: satisfied sections first, dormant ones after, each group stable.
    pub fn display_order(&self) -> Vec<SectionView> {
        let (mut live, dormant): (Vec<_>, Vec<_>) =
            self.annotated().into_iter().partition(|s| s.satisfied);
        live.extend(dormant);
        live
    }

    fn section_view(&self, section: &Section) -> SectionView {
        SectionView {
            key: section.key.clone(),
            title: section.title.clone(),
            description: section.description.clone(),
            required: section.required,
            toggle: section.toggle.clone(),
            needs: (!section.needs.is_empty()).then(|| format_needs(&section.needs)),
            enabled: self.is_section_enabled(&section.key),
            satisfied: self.is_section_satisfied(&section.key),
            variables: section
                .variables
                .iter()
                .map(|v| VariableView {
                    name: v.name.clone(),
                    type_name: v.var_type.as_str().to_string(),
                    description: v.description.clone(),
                    value: v.display_value(),
                    origin: v.provenance_display(),
                    required: v.required,
                    sensitive: v.sensitive,
                    options: v.options.clone(),
                    needs: (!v.needs.is_empty()).then(|| format_needs(&v.needs)),
                    active: self.is_variable_active(&v.name),
                })
                .collect(),
        }
    }

    /// Keep only what the template uses, plus everything that keeps it consistent.
    ///
    /// Starts from `keep` and the required variables, then repeatedly adds toggles of
    /// live sections and the targets of their needs until nothing changes. Required
    /// sections always survive; other sections survive only with a kept variable or
    /// when another live entity needs them.
    pub fn filter_to_used(&self, keep: &HashSet<String>) -> Result<Self, BoilerplateError> {
        let mut kept_vars: HashSet<String> = self
            .sections
            .iter()
            .flat_map(|s| s.variables.iter())
            .filter(|v| v.required || keep.contains(&v.name))
            .map(|v| v.name.clone())
            .collect();
        let mut kept_sections: HashSet<String> = HashSet::new();

        loop {
            let before = (kept_vars.len(), kept_sections.len());

            for section in &self.sections {
                let live = section.required
                    || kept_sections.contains(&section.key)
                    || section.variables.iter().any(|v| kept_vars.contains(&v.name));
                if !live {
                    continue;
                }
                kept_sections.insert(section.key.clone());
                if let Some(toggle) = &section.toggle {
                    kept_vars.insert(toggle.clone());
                }

                let var_needs = section
                    .variables
                    .iter()
                    .filter(|v| kept_vars.contains(&v.name))
                    .flat_map(|v| v.needs.iter());
                let mut targets = Vec::new();
                for need in section.needs.iter().chain(var_needs) {
                    targets.push(need.clone());
                }
                for need in targets {
                    match need {
                        Need::SectionRef(key) => {
                            kept_sections.insert(key);
                        }
                        Need::VariableEquals { name, .. } => {
                            kept_vars.insert(name);
                        }
                    }
                }
            }

            if (kept_vars.len(), kept_sections.len()) == before {
                break;
            }
        }

        let sections: Vec<Section> = self
            .sections
            .iter()
            .filter(|s| kept_sections.contains(&s.key))
            .map(|s| {
                let mut section = s.clone();
                section.variables.retain(|v| kept_vars.contains(&v.name));
                section
            })
            .collect();

        Self::from_sections(sections)
    }
}

fn value_matches(variable: &Variable, expected: &str) -> bool {
    let raw = Value::String(expected.to_string());
    let Ok(Some(expected)) = variable.convert(&raw) else {
        return false;
    };
    match &variable.value {
        Some(current) if variable.is_bool() => current.is_truthy() == expected.is_truthy(),
        Some(current) => *current == expected,
        None if variable.is_bool() => !expected.is_truthy(),
        None => false,
    }
}

fn check_unique_names(sections: &[Section]) -> Result<(), BoilerplateError> {
    let mut seen: HashMap<&str, Vec<String>> = HashMap::new();
    for section in sections {
        for variable in &section.variables {
            seen.entry(variable.name.as_str()).or_default().push(section.key.clone());
        }
    }
    for section in sections {
        for variable in &section.variables {
            match seen.get(variable.name.as_str()) {
                Some(owners) if owners.len() > 1 => {
                    return Err(BoilerplateError::DuplicateVariable {
                        name: variable.name.clone(),
                        sections: owners.clone(),
                    });
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn check_toggle(section: &Section, owner_of: &HashMap<&str, &str>) -> Result<(), BoilerplateError> {
    let Some(toggle) = section.toggle.as_deref() else {
        return Ok(());
    };
    let invalid = |reason: String| BoilerplateError::InvalidToggle {
        section: section.key.clone(),
        toggle: toggle.to_string(),
        reason,
    };

    match section.variable(toggle) {
        Some(variable) if variable.is_bool() => Ok(()),
        Some(variable) => Err(invalid(format!("must be a bool variable, found {}", variable.var_type))),
        None => match owner_of.get(toggle) {
            Some(owner) => Err(invalid(format!("declared in section '{owner}', not in this section"))),
            None => Err(invalid("no such variable".to_string())),
        },
    }
}

fn check_reference(
    owner: &str,
    need: &Need,
    section_keys: &HashSet<&str>,
    owner_of: &HashMap<&str, &str>,
) -> Result<(), BoilerplateError> {
    let exists = match need {
        Need::SectionRef(key) => section_keys.contains(key.as_str()),
        Need::VariableEquals { name, .. } => owner_of.contains_key(name.as_str()),
    };
    if exists {
        Ok(())
    } else {
        Err(BoilerplateError::UnknownReference {
            owner: owner.to_string(),
            reference: need.target().to_string(),
        })
    }
}

fn need_node(need: &Need) -> NeedsNode {
    match need {
        Need::SectionRef(key) => NeedsNode::Section(key.clone()),
        Need::VariableEquals { name, .. } => NeedsNode::Variable(name.clone()),
    }
}

fn entity_graph(sections: &[Section]) -> NeedsGraph {
    let mut graph = NeedsGraph::new();
    for section in sections {
        graph.ensure_node(NeedsNode::Section(section.key.clone()));
        for variable in &section.variables {
            graph.ensure_node(NeedsNode::Variable(variable.name.clone()));
        }
    }
    for section in sections {
        let from = NeedsNode::Section(section.key.clone());
        for need in &section.needs {
            graph.add_dependency(from.clone(), need_node(need));
        }
        for variable in &section.variables {
            let from = NeedsNode::Variable(variable.name.clone());
            for need in &variable.needs {
                graph.add_dependency(from.clone(), need_node(need));
            }
        }
    }
    graph
}

/// Section keys ordered so every section follows the sections it needs.
fn section_order(sections: &[Section], owner_of: &HashMap<&str, &str>) -> Vec<String> {
    let mut graph = NeedsGraph::new();
    for section in sections {
        graph.ensure_node(NeedsNode::Section(section.key.clone()));
    }
    for section in sections {
        let var_needs = section.variables.iter().flat_map(|v| v.needs.iter());
        for need in section.needs.iter().chain(var_needs) {
            let target = match need {
                Need::SectionRef(key) => key.as_str(),
                Need::VariableEquals { name, .. } => match owner_of.get(name.as_str()) {
                    Some(&owner) => owner,
                    None => continue,
                },
            };
            if target != section.key {
                graph.add_dependency(
                    NeedsNode::Section(section.key.clone()),
                    NeedsNode::Section(target.to_string()),
                );
            }
        }
    }

    graph.stable_order().into_iter().map(|node| node.name().to_string()).collect()
}

fn order_variables(mut section: Section) -> Section {
    let mut graph = NeedsGraph::new();
    for variable in &section.variables {
        graph.ensure_node(NeedsNode::Variable(variable.name.clone()));
    }
    for variable in &section.variables {
        for need in &variable.needs {
            let Need::VariableEquals { name, .. } = need else {
                continue;
            };
            if name != &variable.name && section.variable(name).is_some() {
                graph.add_dependency(
                    NeedsNode::Variable(variable.name.clone()),
                    NeedsNode::Variable(name.clone()),
                );
            }
        }
    }

    let mut by_name: HashMap<String, Variable> =
        section.variables.drain(..).map(|v| (v.name.clone(), v)).collect();
    section.variables = graph
        .stable_order()
        .into_iter()
        .filter_map(|node| by_name.remove(node.name()))
        .collect();
    section
}

fn build_index(sections: &[Section]) -> HashMap<String, (usize, usize)> {
    let mut index = HashMap::new();
    for (s, section) in sections.iter().enumerate() {
        for (v, variable) in section.variables.iter().enumerate() {
            index.insert(variable.name.clone(), (s, v));
        }
    }
    index
}
