//! A single resolved variable and where its value came from.

use serde::Serialize;
use std::fmt;

use super::needs::{Need, parse_needs};
use super::value::{VariableType, VariableValue, display_value};
use crate::constants::DEFAULT_AUTOGEN_LENGTH;
use crate::core::BoilerplateError;
use crate::schema::VariableDecl;

/// Layer a value was taken from, lowest precedence first.
///
/// A layer may replace a value set by the same or a lower layer, never a higher one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Filled in by secret autogeneration
    Generated,
    /// Module-wide default
    Module,
    /// Template-specific default
    Template,
    /// Stored user default from the config file
    Persisted,
    /// Direct caller override (`--var`)
    Caller,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Generated => "generated",
            Self::Module => "module",
            Self::Template => "template",
            Self::Persisted => "persisted",
            Self::Caller => "caller",
        })
    }
}

/// Secret generation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Autogenerate {
    /// Characters, or random bytes when `base64` is set
    pub length: usize,
    /// Encode random bytes as base64 instead of drawing alphanumerics
    pub base64: bool,
}

impl Default for Autogenerate {
    fn default() -> Self {
        Self {
            length: DEFAULT_AUTOGEN_LENGTH,
            base64: false,
        }
    }
}

/// A typed variable with its current value and provenance.
#[derive(Debug, Clone)]
pub struct Variable {
    /// Unique name across the collection
    pub name: String,
    /// Declared type
    pub var_type: VariableType,
    /// Allowed values (enums)
    pub options: Vec<String>,
    /// Current value
    pub value: Option<VariableValue>,
    /// Prompt text
    pub description: Option<String>,
    /// Extra help text
    pub extra: Option<String>,
    /// Active regardless of section state
    pub required: bool,
    /// May stay empty
    pub optional: bool,
    /// Masked in displays
    pub sensitive: bool,
    /// Secret generation, when enabled
    pub autogenerate: Option<Autogenerate>,
    /// Variable-level needs
    pub needs: Vec<Need>,
    provenance: Vec<Origin>,
}

impl Variable {
    /// Build a variable from its first declaration.
    pub fn from_decl(name: &str, decl: &VariableDecl, origin: Origin) -> Result<Self, BoilerplateError> {
        let var_type = match decl.type_name.as_deref() {
            Some(type_name) => VariableType::parse(type_name).ok_or_else(|| {
                BoilerplateError::UnknownType {
                    variable: name.to_string(),
                    type_name: type_name.to_string(),
                }
            })?,
            None => VariableType::String,
        };

        let mut variable = Self {
            name: name.to_string(),
            var_type,
            options: Vec::new(),
            value: None,
            description: None,
            extra: None,
            required: false,
            optional: false,
            sensitive: false,
            autogenerate: None,
            needs: Vec::new(),
            provenance: Vec::new(),
        };
        variable.overlay(decl, origin)?;
        Ok(variable)
    }

    /// Apply a later declaration on top of this one, field by field.
    ///
    /// Only fields the declaration actually writes are touched. A written default
    /// is re-coerced with the (possibly changed) type and recorded under `origin`.
    pub fn overlay(&mut self, decl: &VariableDecl, origin: Origin) -> Result<(), BoilerplateError> {
        if let Some(type_name) = decl.type_name.as_deref() {
            self.var_type = VariableType::parse(type_name).ok_or_else(|| {
                BoilerplateError::UnknownType {
                    variable: self.name.clone(),
                    type_name: type_name.to_string(),
                }
            })?;
        }
        if let Some(description) = &decl.description {
            self.description.clone_from(description);
        }
        if let Some(extra) = &decl.extra {
            self.extra.clone_from(extra);
        }
        if let Some(options) = &decl.options {
            self.options = options.clone().unwrap_or_default();
        }
        if let Some(required) = decl.required {
            self.required = required;
        }
        if let Some(optional) = decl.optional {
            self.optional = optional;
        }
        if let Some(sensitive) = decl.sensitive {
            self.sensitive = sensitive;
        }
        if let Some(needs) = &decl.needs {
            let owner = format!("variable '{}'", self.name);
            self.needs = match needs {
                Some(needs) => parse_needs(&owner, needs)?,
                None => Vec::new(),
            };
        }

        let mut autogen = self.autogenerate.unwrap_or_default();
        if let Some(length) = decl.autogenerated_length {
            autogen.length = length;
        }
        if let Some(base64) = decl.autogenerated_base64 {
            autogen.base64 = base64;
        }
        match decl.autogenerated {
            Some(true) => self.autogenerate = Some(autogen),
            Some(false) => self.autogenerate = None,
            None if self.autogenerate.is_some() => self.autogenerate = Some(autogen),
            None => {}
        }

        if self.var_type == VariableType::Enum && self.options.is_empty() {
            return Err(BoilerplateError::InvalidDeclaration {
                entity: format!("variable '{}'", self.name),
                reason: "enum variables need a non-empty `options` list".to_string(),
            });
        }
        if self.autogenerate.is_some() && self.var_type != VariableType::String {
            return Err(BoilerplateError::InvalidDeclaration {
                entity: format!("variable '{}'", self.name),
                reason: format!("only str variables can be autogenerated, found {}", self.var_type),
            });
        }

        if let Some(default) = &decl.default {
            let value = self.convert(default)?;
            self.set_value(value, origin);
        } else if decl.type_name.is_some() || decl.options.is_some() {
            // the existing value must still fit the overlaid type
            if let Some(current) = self.value.take() {
                let raw = serde_yaml::Value::String(current.to_text());
                self.value = self.convert(&raw)?;
            }
        }

        Ok(())
    }

    /// Coerce a raw value to this variable's type.
    pub fn convert(&self, raw: &serde_yaml::Value) -> Result<Option<VariableValue>, BoilerplateError> {
        self.var_type.coerce(&self.name, &self.options, raw)
    }

    /// Replace the value and record the layer it came from.
    pub fn set_value(&mut self, value: Option<VariableValue>, origin: Origin) {
        self.value = value;
        if self.provenance.last() != Some(&origin) {
            self.provenance.push(origin);
        }
    }

    /// Highest-precedence layer that set the current value.
    pub fn origin(&self) -> Option<Origin> {
        self.provenance.last().copied()
    }

    /// Every layer that set a value, in application order.
    pub fn provenance(&self) -> &[Origin] {
        &self.provenance
    }

    /// Provenance as `module -> template -> caller`.
    pub fn provenance_display(&self) -> String {
        self.provenance.iter().map(ToString::to_string).collect::<Vec<_>>().join(" -> ")
    }

    /// True for bool variables.
    pub fn is_bool(&self) -> bool {
        self.var_type == VariableType::Boolean
    }

    /// Truthiness of the current value; no value is false.
    pub fn is_truthy(&self) -> bool {
        self.value.as_ref().is_some_and(VariableValue::is_truthy)
    }

    /// True when there is no value or an empty text value.
    pub fn is_empty(&self) -> bool {
        self.value.as_ref().is_none_or(VariableValue::is_empty)
    }

    /// Value formatted for display (masked and truncated).
    pub fn display_value(&self) -> String {
        display_value(self.value.as_ref(), self.sensitive)
    }
}
