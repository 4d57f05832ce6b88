//! Test utilities for boilerplates
//!
//! Builders for template directories and throwaway libraries, plus logging setup.
//!
//! # Example
//!
//! ```rust,ignore
//! use boilerplates_cli::test_utils::{LibraryFixture, TemplateFixture};
//!
//! let library = LibraryFixture::new().unwrap();
//! library
//!     .add(
//!         TemplateFixture::new("whoami", "compose")
//!             .spec("general:\n  vars:\n    service_name:\n      default: whoami\n")
//!             .file("compose.yaml.j2", "name: {{ service_name }}\n"),
//!     )
//!     .unwrap();
//! ```

pub mod fixtures;

pub use fixtures::{LibraryFixture, TemplateFixture};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize tracing for tests, once per process.
///
/// With `Some(level)` that level is used; with `None` logging is only enabled when
/// `RUST_LOG` is set.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
