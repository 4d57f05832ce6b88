//! Boilerplates - infrastructure templates from reusable libraries
//!
//! Renders Docker Compose, Terraform and Kubernetes templates. Each template declares
//! the variables it needs on top of a module-wide base spec for its kind; values are
//! layered from module defaults, template defaults, saved user defaults and the
//! command line, then the template's files are rendered into a directory.
//!
//! # Architecture Overview
//!
//! A library is a directory tree `<kind>/<template-id>/` where each template holds a
//! `template.yaml` and its files. Files ending in `.j2` are rendered with Tera, all
//! others are copied verbatim.
//!
//! ```yaml
//! kind: compose
//! schema: "1.1"
//! metadata:
//!   name: Nginx
//!   description: Nginx web server
//!   author: Jane Doe
//!   version: 1.0.0
//!   date: "2025-01-01"
//! spec:
//!   general:
//!     vars:
//!       service_name:
//!         default: nginx
//!   traefik:
//!     vars:
//!       traefik_host:
//!         default: nginx.example.com
//! ```
//!
//! # Core Modules
//!
//! - [`variables`] - Typed variables, sections, `needs` expressions, spec merging,
//!   value layering, validation and secret generation
//! - [`resolver`] - Schema gate, merge, usage check and filtering for one template;
//!   [`resolver::dependency_graph`] orders sections by their `needs`
//! - [`schema`] - Built-in module specs, schema versions and the spec cache
//! - [`templating`] - Template metadata, file trees, the Tera sandbox, render
//!   diagnostics and staged output
//! - [`library`] - Discovering and loading templates from library directories
//!
//! ## Supporting Modules
//! - [`config`] - User config file with libraries and saved defaults
//! - [`cli`] - Command-line interface
//! - [`core`] - Error types and user-facing error formatting
//! - [`utils`] - Filesystem helpers and progress indicators
//!
//! # Value Precedence
//!
//! Lowest to highest: module default, template default, saved default (`[defaults.<kind>]`
//! in the config file), command-line value. Autogenerated secrets only fill variables
//! no layer supplied.

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod library;
pub mod resolver;
pub mod schema;
pub mod templating;
pub mod utils;
pub mod variables;

// test_utils is available for tests and when the test-utils feature is enabled
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
