//! Error handling for boilerplates
//!
//! Two layers, the same way the rest of the crate reports failures:
//! - [`BoilerplateError`] is the strongly-typed enum every fallible operation returns
//! - [`ErrorContext`] wraps an error with a suggestion and details for the terminal
//!
//! Library code returns [`BoilerplateError`] (or `anyhow::Result` at the command layer).
//! The binary converts whatever bubbles up with [`user_friendly_error`] and prints it
//! with [`ErrorContext::display`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use boilerplates_cli::core::{BoilerplateError, user_friendly_error};
//!
//! let error = BoilerplateError::TemplateNotFound { id: "nginx".to_string() };
//! let context = user_friendly_error(anyhow::Error::from(error));
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::templating::RenderError;

/// Every failure the resolution engine, the renderer and the CLI can produce.
#[derive(Error, Debug)]
pub enum BoilerplateError {
    /// The same variable name is declared in more than one section.
    #[error("Variable '{name}' is declared in more than one section: {}", sections.join(", "))]
    DuplicateVariable {
        /// Offending variable name
        name: String,
        /// Sections that declare it
        sections: Vec<String>,
    },

    /// A section toggle names a variable that is missing, foreign or not boolean.
    #[error("Section '{section}' has invalid toggle '{toggle}': {reason}")]
    InvalidToggle {
        /// Section key
        section: String,
        /// Toggle variable name
        toggle: String,
        /// What is wrong with it
        reason: String,
    },

    /// The needs graph contains a cycle.
    #[error("Circular dependency detected: {}", cycle.join(" → "))]
    DependencyCycle {
        /// Entities on the cycle, first entity repeated at the end
        cycle: Vec<String>,
    },

    /// A `needs` entry references a section or variable that does not exist.
    #[error("{owner} needs '{reference}', which is not declared")]
    UnknownReference {
        /// Section or variable declaring the need
        owner: String,
        /// The missing target
        reference: String,
    },

    /// A variable declares a type outside the supported set.
    #[error("Variable '{variable}' has unknown type '{type_name}'")]
    UnknownType {
        /// Variable name
        variable: String,
        /// The declared type name
        type_name: String,
    },

    /// A declaration is structurally invalid (enum without options, bad needs syntax...).
    #[error("Invalid declaration for {entity}: {reason}")]
    InvalidDeclaration {
        /// Section or variable the declaration belongs to
        entity: String,
        /// Why it was rejected
        reason: String,
    },

    /// A single value could not be converted to its variable's type.
    #[error("Invalid value '{value}' for variable '{variable}' ({expected}): {reason}")]
    TypeCoercion {
        /// Variable name
        variable: String,
        /// Expected variable type
        expected: String,
        /// The rejected raw value
        value: String,
        /// Why the conversion failed
        reason: String,
    },

    /// One or more values from a single source layer were rejected.
    #[error("Invalid values from {origin}: {}", errors.join("; "))]
    InvalidValues {
        /// Layer the values came from
        origin: String,
        /// One message per rejected value
        errors: Vec<String>,
    },

    /// Active variables are missing values or were set by the caller while inactive.
    #[error("Variable validation failed: {}", errors.join(", "))]
    ValidationFailed {
        /// One entry per problem, e.g. `general.service_name (required - no default provided)`
        errors: Vec<String>,
    },

    /// The template targets a schema the module implementation cannot serve.
    #[error(
        "Template '{template}' declares schema {template_schema}, but module '{module}' supports {}",
        supported.join(", ")
    )]
    IncompatibleSchemaVersion {
        /// Template identifier
        template: String,
        /// Schema version declared by the template
        template_schema: String,
        /// Module kind
        module: String,
        /// Versions the module implementation provides
        supported: Vec<String>,
        /// How to get out of this
        remediation: String,
    },

    /// A schema version string is not `major.minor`.
    #[error("Invalid schema version '{version}': expected 'major.minor' such as '1.0'")]
    InvalidSchemaVersion {
        /// The rejected text
        version: String,
    },

    /// No module implementation exists for the template kind.
    #[error("Unknown module kind '{kind}'")]
    UnknownModule {
        /// Requested kind
        kind: String,
    },

    /// A template directory or its metadata file could not be loaded.
    #[error("Failed to load template from {}: {reason}", path.display())]
    TemplateLoad {
        /// Template directory or metadata file
        path: PathBuf,
        /// Why loading failed
        reason: String,
    },

    /// Template files reference variables that no spec declares.
    #[error(
        "Template '{template}' uses undeclared variables: {}",
        usages.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>().join(", ")
    )]
    UndeclaredVariables {
        /// Template identifier
        template: String,
        /// Variable name with the files that reference it
        usages: Vec<(String, Vec<String>)>,
    },

    /// No template with this identifier exists in the configured libraries.
    #[error("Template '{id}' not found")]
    TemplateNotFound {
        /// Requested identifier
        id: String,
    },

    /// Rendering produced one or more structured errors.
    #[error("Template '{template}' failed to render ({} error(s))", errors.len())]
    RenderFailed {
        /// Template identifier
        template: String,
        /// Every error collected during the render
        errors: Vec<RenderError>,
    },

    /// The destination already contains files and overwriting was not requested.
    #[error("Output directory {} is not empty", path.display())]
    OutputConflict {
        /// Destination directory
        path: PathBuf,
    },

    /// The user configuration file is unreadable or invalid.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// What went wrong
        message: String,
    },

    /// IO error from the standard library
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parse error from a template or module spec
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parse error from the configuration file
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Anything else, already formatted
    #[error("{message}")]
    Other {
        /// Error text
        message: String,
    },
}

/// Convenience alias used throughout the library.
pub type Result<T, E = BoilerplateError> = std::result::Result<T, E>;

/// An error plus the hints shown to the user.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: BoilerplateError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a context with no suggestion or details.
    #[must_use]
    pub const fn new(error: BoilerplateError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Attach an actionable suggestion (rendered green).
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach explanatory details (rendered yellow).
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with suggestions.
///
/// Known [`BoilerplateError`] variants get tailored hints. IO and TOML errors are
/// recognized by kind. Everything else is reported with its full cause chain.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let error = match error.downcast::<BoilerplateError>() {
        Ok(known) => return create_error_context(known),
        Err(other) => other,
    };

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        let hint = match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                Some("Check file ownership and permissions of the template library and destination")
            }
            std::io::ErrorKind::NotFound => {
                Some("Check that the file or directory exists and the path is correct")
            }
            std::io::ErrorKind::AlreadyExists => {
                Some("Remove the existing file or pass --force to overwrite")
            }
            _ => None,
        };
        if let Some(hint) = hint {
            return ErrorContext::new(BoilerplateError::Other {
                message: chain_message(&error),
            })
            .with_suggestion(hint);
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(BoilerplateError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of your config file. Verify quotes, brackets and table headers");
    }

    ErrorContext::new(BoilerplateError::Other {
        message: chain_message(&error),
    })
}

fn chain_message(error: &anyhow::Error) -> String {
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }
    message
}

fn create_error_context(error: BoilerplateError) -> ErrorContext {
    match &error {
        BoilerplateError::DuplicateVariable { .. } => ErrorContext::new(error)
            .with_suggestion("Rename one of the variables or keep it in a single section")
            .with_details("Variable names are unique across all sections of a template"),
        BoilerplateError::InvalidToggle { .. } => ErrorContext::new(error).with_suggestion(
            "Declare the toggle variable inside the same section with `type: bool`",
        ),
        BoilerplateError::DependencyCycle { .. } => ErrorContext::new(error)
            .with_suggestion("Remove one of the `needs` entries that closes the cycle"),
        BoilerplateError::UnknownReference { .. } => ErrorContext::new(error).with_suggestion(
            "Check the spelling of the `needs` entry or declare the referenced section or variable",
        ),
        BoilerplateError::UnknownType { .. } => ErrorContext::new(error)
            .with_suggestion("Use one of: str, int, bool, enum, hostname, email"),
        BoilerplateError::InvalidDeclaration { .. } => ErrorContext::new(error)
            .with_suggestion("Fix the declaration in the template's template.yaml"),
        BoilerplateError::TypeCoercion { .. } | BoilerplateError::InvalidValues { .. } => {
            ErrorContext::new(error).with_suggestion(
                "Check values passed with --var and defaults stored with `boilerplates defaults set`",
            )
        }
        BoilerplateError::ValidationFailed { errors } => {
            let details = errors.iter().map(|e| format!("  - {e}")).collect::<Vec<_>>().join("\n");
            ErrorContext::new(error)
                .with_details(format!("\n{details}"))
                .with_suggestion("Provide missing values with --var name=value or store a default")
        }
        BoilerplateError::IncompatibleSchemaVersion { remediation, .. } => {
            let remediation = remediation.clone();
            ErrorContext::new(error).with_suggestion(remediation)
        }
        BoilerplateError::InvalidSchemaVersion { .. } => ErrorContext::new(error)
            .with_suggestion("Quote the version in template.yaml, e.g. schema: \"1.1\""),
        BoilerplateError::UnknownModule { .. } => ErrorContext::new(error)
            .with_suggestion("Set `kind` in template.yaml to one of: compose, terraform, kubernetes"),
        BoilerplateError::TemplateLoad { .. } => ErrorContext::new(error).with_suggestion(
            "template.yaml needs `kind` plus metadata name, author, version, date and description",
        ),
        BoilerplateError::UndeclaredVariables { usages, .. } => {
            let details = usages
                .iter()
                .map(|(name, files)| format!("  - {name} (used in {})", files.join(", ")))
                .collect::<Vec<_>>()
                .join("\n");
            ErrorContext::new(error)
                .with_details(format!("\n{details}"))
                .with_suggestion("Declare these variables under `spec` in template.yaml with a default value")
        }
        BoilerplateError::TemplateNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Run `boilerplates list --all` to see available templates"),
        BoilerplateError::RenderFailed { errors, .. } => {
            let details =
                errors.iter().map(RenderError::format_with_context).collect::<Vec<_>>().join("\n");
            ErrorContext::new(error).with_details(format!("\n{details}"))
        }
        BoilerplateError::OutputConflict { .. } => ErrorContext::new(error)
            .with_suggestion("Choose an empty directory or pass --force to overwrite")
            .with_details("Nothing was written"),
        BoilerplateError::ConfigError { .. } | BoilerplateError::TomlError(_) => {
            ErrorContext::new(error).with_suggestion(
                "Check the config file, or point --config / BOILERPLATES_CONFIG at another one",
            )
        }
        BoilerplateError::YamlError(_) => ErrorContext::new(error)
            .with_suggestion("Check the YAML syntax: indentation, quotes and list markers"),
        BoilerplateError::IoError(_) | BoilerplateError::Other { .. } => ErrorContext::new(error),
    }
}
