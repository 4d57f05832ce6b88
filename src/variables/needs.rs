//! `needs` expressions.
//!
//! A declaration's `needs` is either a single string or a list of strings. A single
//! string may pack several expressions separated by `;`. Each expression is one of:
//!
//! - `section_key`: the referenced section must be satisfied
//! - `var=a,b`: the variable's value must be one of the listed values
//! - `var!=a,b`: the variable's value must be none of the listed values
//!
//! Both forms parse into the same [`Need`].

use serde::Deserialize;
use std::fmt;

use crate::core::BoilerplateError;

/// One parsed dependency expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Need {
    /// Another section must be satisfied.
    SectionRef(String),
    /// A variable's value must (or must not) be one of `values`.
    VariableEquals {
        /// Referenced variable
        name: String,
        /// Acceptable values, as written
        values: Vec<String>,
        /// `!=` instead of `=`
        negated: bool,
    },
}

impl Need {
    /// Parse a single expression. `None` when the expression is malformed.
    pub fn parse(expr: &str) -> Option<Self> {
        let expr = expr.trim();
        if expr.is_empty() {
            return None;
        }

        let (lhs, rhs, negated) = if let Some((lhs, rhs)) = expr.split_once("!=") {
            (lhs, rhs, true)
        } else if let Some((lhs, rhs)) = expr.split_once('=') {
            (lhs, rhs, false)
        } else {
            return Some(Self::SectionRef(expr.to_string()));
        };

        let name = lhs.trim();
        let values: Vec<String> = rhs
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
            .collect();

        if name.is_empty() || values.is_empty() {
            return None;
        }

        Some(Self::VariableEquals {
            name: name.to_string(),
            values,
            negated,
        })
    }

    /// Name of the referenced section or variable.
    pub fn target(&self) -> &str {
        match self {
            Self::SectionRef(key) => key,
            Self::VariableEquals { name, .. } => name,
        }
    }
}

impl fmt::Display for Need {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SectionRef(key) => f.write_str(key),
            Self::VariableEquals {
                name,
                values,
                negated,
            } => {
                let op = if *negated { "!=" } else { "=" };
                write!(f, "{name}{op}{}", values.join(","))
            }
        }
    }
}

/// `needs` as written in YAML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum NeedsDecl {
    /// `needs: "a;b=c"`
    One(String),
    /// `needs: [a, "b=c"]`
    Many(Vec<String>),
}

/// Parse a declaration into needs. `owner` names the declaring entity in errors.
pub fn parse_needs(owner: &str, decl: &NeedsDecl) -> Result<Vec<Need>, BoilerplateError> {
    let exprs: Vec<&str> = match decl {
        NeedsDecl::One(text) => text.split(';').collect(),
        NeedsDecl::Many(items) => items.iter().flat_map(|item| item.split(';')).collect(),
    };

    let mut needs = Vec::new();
    for expr in exprs.into_iter().filter(|e| !e.trim().is_empty()) {
        let need = Need::parse(expr).ok_or_else(|| BoilerplateError::InvalidDeclaration {
            entity: owner.to_string(),
            reason: format!("malformed needs expression '{}'", expr.trim()),
        })?;
        if !needs.contains(&need) {
            needs.push(need);
        }
    }
    Ok(needs)
}

/// Render needs back to their compact text form, `;`-separated.
pub fn format_needs(needs: &[Need]) -> String {
    needs.iter().map(ToString::to_string).collect::<Vec<_>>().join(";")
}
