//! Raw section and variable declarations, as written in YAML.
//!
//! Module specs and the `spec` block of a template.yaml share this shape. Section and
//! variable order is significant, so both are read from an ordered YAML mapping.
//!
//! Overlay semantics need to tell "field not written" apart from "field written as
//! null". Fields that can be cleared are therefore `Option<Option<T>>`: the outer
//! `None` means absent, `Some(None)` means an explicit null.

use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::variables::NeedsDecl;

/// Ordered sections of a module spec or template spec.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecDeclaration {
    /// `(section_key, declaration)` in declaration order
    pub sections: Vec<(String, SectionDecl)>,
}

impl SpecDeclaration {
    /// Parse a standalone spec document (module specs).
    pub fn from_yaml(source: &str) -> Result<Self, serde_yaml::Error> {
        if source.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(source)
    }

    /// Look up a section by key.
    pub fn section(&self, key: &str) -> Option<&SectionDecl> {
        self.sections.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    /// Every variable name declared anywhere in this spec.
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().flat_map(|(_, s)| s.vars.entries.iter().map(|(n, _)| n.as_str()))
    }
}

impl<'de> Deserialize<'de> for SpecDeclaration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mapping = Option::<Mapping>::deserialize(deserializer)?.unwrap_or_default();
        Ok(Self {
            sections: ordered_entries(mapping).map_err(D::Error::custom)?,
        })
    }
}

/// One section as declared.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SectionDecl {
    /// Display title
    #[serde(default, deserialize_with = "explicit")]
    pub title: Option<Option<String>>,
    /// Longer description
    #[serde(default, deserialize_with = "explicit")]
    pub description: Option<Option<String>>,
    /// Name of the bool variable gating this section
    #[serde(default, deserialize_with = "explicit")]
    pub toggle: Option<Option<String>>,
    /// Section-level needs
    #[serde(default, deserialize_with = "explicit")]
    pub needs: Option<Option<NeedsDecl>>,
    /// Always-active section
    #[serde(default)]
    pub required: Option<bool>,
    /// Variables in declaration order
    #[serde(default)]
    pub vars: VarsDecl,
}

/// Ordered variable declarations of a section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VarsDecl {
    /// `(variable_name, declaration)` in declaration order
    pub entries: Vec<(String, VariableDecl)>,
}

impl<'de> Deserialize<'de> for VarsDecl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mapping = Option::<Mapping>::deserialize(deserializer)?.unwrap_or_default();
        Ok(Self {
            entries: ordered_entries(mapping).map_err(D::Error::custom)?,
        })
    }
}

/// One variable as declared.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VariableDecl {
    /// Type name (`str`, `int`, `bool`, `enum`, `hostname`, `email`)
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    /// Default value. `Some(Value::Null)` is an explicit "no default".
    #[serde(default, alias = "value", deserialize_with = "explicit")]
    pub default: Option<Value>,
    /// Prompt text
    #[serde(default, deserialize_with = "explicit")]
    pub description: Option<Option<String>>,
    /// Extra help shown below the prompt
    #[serde(default, deserialize_with = "explicit")]
    pub extra: Option<Option<String>>,
    /// Allowed values for enums
    #[serde(default, deserialize_with = "explicit")]
    pub options: Option<Option<Vec<String>>>,
    /// Always active, even inside a disabled section
    #[serde(default)]
    pub required: Option<bool>,
    /// May stay empty without failing validation
    #[serde(default)]
    pub optional: Option<bool>,
    /// Masked in displays
    #[serde(default)]
    pub sensitive: Option<bool>,
    /// Filled with a random secret when left empty
    #[serde(default)]
    pub autogenerated: Option<bool>,
    /// Length of the generated secret (characters, or bytes in base64 mode)
    #[serde(default)]
    pub autogenerated_length: Option<usize>,
    /// Generate random bytes and base64-encode them
    #[serde(default)]
    pub autogenerated_base64: Option<bool>,
    /// Variable-level needs
    #[serde(default, deserialize_with = "explicit")]
    pub needs: Option<Option<NeedsDecl>>,
}

/// Wrap whatever was written, including null, in `Some`.
fn explicit<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn ordered_entries<T: DeserializeOwned + Default>(
    mapping: Mapping,
) -> Result<Vec<(String, T)>, String> {
    let mut entries = Vec::with_capacity(mapping.len());
    for (key, value) in mapping {
        let key = match key {
            Value::String(s) => s,
            other => {
                return Err(format!(
                    "keys must be strings, found '{}'",
                    serde_yaml::to_string(&other).unwrap_or_default().trim()
                ));
            }
        };
        if entries.iter().any(|(k, _)| k == &key) {
            return Err(format!("duplicate key '{key}'"));
        }
        let decl = if value.is_null() {
            T::default()
        } else {
            serde_yaml::from_value(value).map_err(|e| format!("in '{key}': {e}"))?
        };
        entries.push((key, decl));
    }
    Ok(entries)
}
