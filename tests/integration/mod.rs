//! Integration test suite for boilerplates
//!
//! Drives the `boilerplates` binary against temporary libraries.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! - **list**: listing, kind filter, drafts and JSON output
//! - **show**: template report with resolved values
//! - **generate**: rendering, value precedence, dry run and destination handling
//! - **validate**: per-template checks and exit status
//! - **defaults**: saving and removing persisted defaults

#[path = "../common/mod.rs"]
mod common;

mod defaults;
mod generate;
mod list;
mod show;
mod validate;
