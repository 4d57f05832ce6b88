//! Core types shared by every layer of boilerplates
//!
//! Right now this is the error system: [`BoilerplateError`] for code,
//! [`ErrorContext`] and [`user_friendly_error`] for the terminal.

pub mod error;

pub use error::{BoilerplateError, ErrorContext, Result, user_friendly_error};
