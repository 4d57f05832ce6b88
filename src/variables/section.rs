//! Sections: named, ordered groups of variables with optional toggle and needs.

use super::needs::{Need, parse_needs};
use super::variable::{Origin, Variable};
use crate::constants::GENERAL_SECTION;
use crate::core::BoilerplateError;
use crate::schema::SectionDecl;

/// A group of variables that is enabled, gated and ordered as a unit.
#[derive(Debug, Clone)]
pub struct Section {
    /// Unique key
    pub key: String,
    /// Display title
    pub title: String,
    /// Longer description
    pub description: Option<String>,
    /// Bool variable in this section that gates it
    pub toggle: Option<String>,
    /// Section-level needs
    pub needs: Vec<Need>,
    /// Always active; the general section always is
    pub required: bool,
    /// Variables in presentation order
    pub variables: Vec<Variable>,
}

impl Section {
    /// Build a section from its first declaration.
    pub fn from_decl(key: &str, decl: &SectionDecl, origin: Origin) -> Result<Self, BoilerplateError> {
        let mut section = Self {
            key: key.to_string(),
            title: default_title(key),
            description: None,
            toggle: None,
            needs: Vec::new(),
            required: key == GENERAL_SECTION,
            variables: Vec::new(),
        };
        section.overlay(decl, origin)?;
        Ok(section)
    }

    /// Apply a later declaration: written fields win, variables merge by name.
    pub fn overlay(&mut self, decl: &SectionDecl, origin: Origin) -> Result<(), BoilerplateError> {
        if let Some(title) = &decl.title {
            self.title = title.clone().unwrap_or_else(|| default_title(&self.key));
        }
        if let Some(description) = &decl.description {
            self.description.clone_from(description);
        }
        if let Some(toggle) = &decl.toggle {
            self.toggle.clone_from(toggle);
        }
        if let Some(needs) = &decl.needs {
            let owner = format!("section '{}'", self.key);
            self.needs = match needs {
                Some(needs) => parse_needs(&owner, needs)?,
                None => Vec::new(),
            };
        }
        if let Some(required) = decl.required {
            self.required = required || self.key == GENERAL_SECTION;
        }

        for (name, var_decl) in &decl.vars.entries {
            match self.variables.iter_mut().find(|v| &v.name == name) {
                Some(existing) => existing.overlay(var_decl, origin)?,
                None => self.variables.push(Variable::from_decl(name, var_decl, origin)?),
            }
        }
        Ok(())
    }

    /// Look up a variable of this section.
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Toggle variable, if the section has one and it exists.
    pub fn toggle_variable(&self) -> Option<&Variable> {
        self.toggle.as_deref().and_then(|t| self.variable(t))
    }
}

fn default_title(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
