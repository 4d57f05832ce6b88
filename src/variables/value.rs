//! Variable types and typed values.
//!
//! Raw values arrive as YAML scalars from spec defaults, persisted config or
//! `--var` flags. [`VariableType::coerce`] turns them into a [`VariableValue`] or
//! rejects them with a [`BoilerplateError::TypeCoercion`].

use serde::Serialize;
use std::fmt;
use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::Value;

use crate::constants::{DISPLAY_MAX_CHARS, SENSITIVE_MASK};
use crate::core::BoilerplateError;

const TRUE_TOKENS: &[&str] = &["true", "yes", "y", "1", "on"];
const FALSE_TOKENS: &[&str] = &["false", "no", "n", "0", "off"];

static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

/// Declared type of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    /// Free text
    String,
    /// Signed integer
    Integer,
    /// true/false
    Boolean,
    /// One of a fixed option list
    Enum,
    /// Hostname or IP address
    Host,
    /// Email address
    Email,
}

impl VariableType {
    /// Resolve a declared type name, accepting the usual aliases.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "str" | "string" => Some(Self::String),
            "int" | "integer" => Some(Self::Integer),
            "bool" | "boolean" => Some(Self::Boolean),
            "enum" => Some(Self::Enum),
            "host" | "hostname" => Some(Self::Host),
            "email" => Some(Self::Email),
            _ => None,
        }
    }

    /// Canonical short name, as written in template.yaml.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::String => "str",
            Self::Integer => "int",
            Self::Boolean => "bool",
            Self::Enum => "enum",
            Self::Host => "hostname",
            Self::Email => "email",
        }
    }

    /// Convert a raw value to this type.
    ///
    /// `Ok(None)` means "no value": YAML null, or an empty string for a type that
    /// has no meaningful empty form (int, bool, enum).
    pub fn coerce(
        &self,
        variable: &str,
        options: &[String],
        raw: &Value,
    ) -> Result<Option<VariableValue>, BoilerplateError> {
        let reject = |reason: &str| BoilerplateError::TypeCoercion {
            variable: variable.to_string(),
            expected: self.as_str().to_string(),
            value: raw_text(raw),
            reason: reason.to_string(),
        };

        if raw.is_null() {
            return Ok(None);
        }

        match self {
            Self::Boolean => match raw {
                Value::Bool(b) => Ok(Some(VariableValue::Boolean(*b))),
                Value::Number(n) => match n.as_i64() {
                    Some(0) => Ok(Some(VariableValue::Boolean(false))),
                    Some(1) => Ok(Some(VariableValue::Boolean(true))),
                    _ => Err(reject("only 0 and 1 are accepted as numbers")),
                },
                Value::String(s) => {
                    let token = s.trim().to_ascii_lowercase();
                    if token.is_empty() {
                        Ok(None)
                    } else if TRUE_TOKENS.contains(&token.as_str()) {
                        Ok(Some(VariableValue::Boolean(true)))
                    } else if FALSE_TOKENS.contains(&token.as_str()) {
                        Ok(Some(VariableValue::Boolean(false)))
                    } else {
                        Err(reject("expected true/false, yes/no, y/n, on/off or 1/0"))
                    }
                }
                _ => Err(reject("expected a scalar")),
            },
            Self::Integer => match raw {
                Value::Number(n) => {
                    if let Some(i) = n.as_i64() {
                        Ok(Some(VariableValue::Integer(i)))
                    } else if let Some(f) = n.as_f64().filter(|f| f.fract() == 0.0) {
                        // i64::MAX as f64 is 2^63, itself out of range
                        if f >= i64::MIN as f64 && f < i64::MAX as f64 {
                            Ok(Some(VariableValue::Integer(f as i64)))
                        } else {
                            Err(reject("out of range for a 64-bit integer"))
                        }
                    } else {
                        Err(reject("not a whole number"))
                    }
                }
                Value::String(s) => {
                    let text = s.trim();
                    if text.is_empty() {
                        return Ok(None);
                    }
                    text.parse::<i64>()
                        .map(|i| Some(VariableValue::Integer(i)))
                        .map_err(|_| reject("not an integer"))
                }
                Value::Bool(_) => Err(reject("booleans are not integers")),
                _ => Err(reject("expected a scalar")),
            },
            Self::Enum => {
                let text = scalar_text(raw).ok_or_else(|| reject("expected a scalar"))?;
                let text = text.trim();
                if text.is_empty() {
                    return Ok(None);
                }
                if options.iter().any(|o| o == text) {
                    Ok(Some(VariableValue::Enum(text.to_string())))
                } else {
                    Err(reject(&format!("must be one of [{}]", options.join(", "))))
                }
            }
            Self::Host => {
                let text = scalar_text(raw).ok_or_else(|| reject("expected a scalar"))?;
                let text = text.trim();
                if text.is_empty() || is_valid_host(text) {
                    Ok(Some(VariableValue::Host(text.to_string())))
                } else {
                    Err(reject("not a valid hostname or IP address"))
                }
            }
            Self::Email => {
                let text = scalar_text(raw).ok_or_else(|| reject("expected a scalar"))?;
                let text = text.trim();
                if text.is_empty() || EMAIL_RE.as_ref().is_some_and(|re| re.is_match(text)) {
                    Ok(Some(VariableValue::Email(text.to_string())))
                } else {
                    Err(reject("not a valid email address"))
                }
            }
            Self::String => {
                let text = scalar_text(raw).ok_or_else(|| reject("expected a scalar"))?;
                Ok(Some(VariableValue::String(text)))
            }
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed variable value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableValue {
    /// Free text
    String(String),
    /// Signed integer
    Integer(i64),
    /// Boolean
    Boolean(bool),
    /// Selected enum option
    Enum(String),
    /// Hostname or IP
    Host(String),
    /// Email address
    Email(String),
}

impl VariableValue {
    /// Type this value belongs to.
    pub const fn var_type(&self) -> VariableType {
        match self {
            Self::String(_) => VariableType::String,
            Self::Integer(_) => VariableType::Integer,
            Self::Boolean(_) => VariableType::Boolean,
            Self::Enum(_) => VariableType::Enum,
            Self::Host(_) => VariableType::Host,
            Self::Email(_) => VariableType::Email,
        }
    }

    /// Canonical text form. Coercing it back yields the same value.
    pub fn to_text(&self) -> String {
        match self {
            Self::Integer(i) => i.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::String(s) | Self::Enum(s) | Self::Host(s) | Self::Email(s) => s.clone(),
        }
    }

    /// Truthiness used when a bool is compared inside `needs`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Boolean(b) => *b,
            Self::Integer(i) => *i != 0,
            Self::String(s) | Self::Enum(s) | Self::Host(s) | Self::Email(s) => !s.is_empty(),
        }
    }

    /// True for an empty text value.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::String(s) | Self::Enum(s) | Self::Host(s) | Self::Email(s) => s.is_empty(),
            Self::Integer(_) | Self::Boolean(_) => false,
        }
    }

    /// JSON form handed to the template engine.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            Self::String(s) | Self::Enum(s) | Self::Host(s) | Self::Email(s) => {
                serde_json::Value::String(s.clone())
            }
        }
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// Format a value for display: masked when sensitive, truncated when long.
pub fn display_value(value: Option<&VariableValue>, sensitive: bool) -> String {
    let Some(value) = value else {
        return String::new();
    };
    let text = value.to_text();
    if sensitive && !text.is_empty() {
        return SENSITIVE_MASK.to_string();
    }
    if text.chars().count() > DISPLAY_MAX_CHARS {
        let head: String = text.chars().take(DISPLAY_MAX_CHARS - 3).collect();
        return format!("{head}...");
    }
    text
}

fn scalar_text(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn raw_text(raw: &Value) -> String {
    scalar_text(raw).unwrap_or_else(|| {
        serde_yaml::to_string(raw).map(|s| s.trim().to_string()).unwrap_or_default()
    })
}

fn is_valid_host(text: &str) -> bool {
    if text.parse::<IpAddr>().is_ok() {
        return true;
    }
    let name = text.strip_suffix('.').unwrap_or(text);
    if name.is_empty() || name.len() > 253 {
        return false;
    }
    name.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}
