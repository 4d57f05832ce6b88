//! Schema version gate.
//!
//! Templates declare the schema version they were written against, module
//! implementations declare the versions they ship. Versions are `major.minor` and are
//! compared as semantic versions, never as strings ("1.10" is newer than "1.9").

use semver::Version;
use std::fmt;
use std::str::FromStr;

use crate::core::BoilerplateError;

/// A `major.minor` schema version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaVersion(Version);

impl SchemaVersion {
    /// Build from parts.
    pub const fn new(major: u64, minor: u64) -> Self {
        Self(Version::new(major, minor, 0))
    }

    /// Parse `1.1` or `v1.1`.
    pub fn parse(text: &str) -> Result<Self, BoilerplateError> {
        let invalid = || BoilerplateError::InvalidSchemaVersion {
            version: text.to_string(),
        };
        let trimmed = text.trim();
        let bare = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);
        let (major, minor) = bare.split_once('.').ok_or_else(invalid)?;

        let is_number = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
        if !is_number(major) || !is_number(minor) {
            return Err(invalid());
        }

        let major = major.parse().map_err(|_| invalid())?;
        let minor = minor.parse().map_err(|_| invalid())?;
        Ok(Self::new(major, minor))
    }

    /// Major component.
    pub const fn major(&self) -> u64 {
        self.0.major
    }

    /// Minor component.
    pub const fn minor(&self) -> u64 {
        self.0.minor
    }

    /// Underlying semantic version (patch is always 0).
    pub const fn as_semver(&self) -> &Version {
        &self.0
    }
}

impl FromStr for SchemaVersion {
    type Err = BoilerplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0.major, self.0.minor)
    }
}

/// Pick the module version that serves a template.
///
/// A declared version `T` is served by the greatest supported `s` with the same major
/// and `s <= T`. With no declaration, the oldest supported version is used. Anything
/// else is an [`BoilerplateError::IncompatibleSchemaVersion`].
pub fn select_base_version(
    template: &str,
    module: &str,
    declared: Option<&SchemaVersion>,
    supported: &[SchemaVersion],
) -> Result<SchemaVersion, BoilerplateError> {
    let mut sorted = supported.to_vec();
    sorted.sort();

    let Some(declared) = declared else {
        return sorted.first().cloned().ok_or_else(|| BoilerplateError::UnknownModule {
            kind: module.to_string(),
        });
    };

    if let Some(base) =
        sorted.iter().rev().find(|s| s.major() == declared.major() && *s <= declared)
    {
        return Ok(base.clone());
    }

    let newest = sorted.last();
    let remediation = match newest {
        Some(newest) if declared > newest => format!(
            "Upgrade the '{module}' module implementation to one supporting schema {declared}, \
             or downgrade the template declaration to schema: \"{newest}\""
        ),
        Some(newest) => format!(
            "Upgrade the template declaration to schema: \"{newest}\", \
             or use a '{module}' module implementation that still supports {declared}"
        ),
        None => format!("No schema versions are registered for module '{module}'"),
    };

    Err(BoilerplateError::IncompatibleSchemaVersion {
        template: template.to_string(),
        template_schema: declared.to_string(),
        module: module.to_string(),
        supported: sorted.iter().map(ToString::to_string).collect(),
        remediation,
    })
}
