//! User configuration: template libraries and persisted defaults.

mod global;

pub use global::{GlobalConfig, LibraryConfig, parse_default_value};
