//! Constants shared across modules.
//!
//! Display limits, file names and environment variable names live here so the
//! values that shape user-visible output are easy to find.

use std::time::Duration;

/// Name of the implicit section that is always required.
pub const GENERAL_SECTION: &str = "general";

/// Replacement shown for sensitive values.
pub const SENSITIVE_MASK: &str = "********";

/// Longest value shown before truncating with `...`.
pub const DISPLAY_MAX_CHARS: usize = 30;

/// Length of autogenerated secrets when the declaration gives none.
pub const DEFAULT_AUTOGEN_LENGTH: usize = 32;

/// Metadata file names, in lookup order.
pub const METADATA_FILES: &[&str] = &["template.yaml", "template.yml"];

/// Suffix marking files that are rendered rather than copied.
pub const DYNAMIC_SUFFIX: &str = ".j2";

/// Source lines shown either side of a render error.
pub const CONTEXT_RADIUS: usize = 3;

/// Maximum edit distance, as a percentage of the name length, for "did you mean" hints.
pub const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Prefix of the staging directory created beside the output destination.
pub const STAGING_PREFIX: &str = ".boilerplates-staging-";

/// Overrides the global config file location.
pub const CONFIG_ENV: &str = "BOILERPLATES_CONFIG";

/// Disables progress indicators when set.
pub const NO_PROGRESS_ENV: &str = "BOILERPLATES_NO_PROGRESS";

/// Upper bound for loading a whole library batch.
pub fn batch_operation_timeout() -> Duration {
    Duration::from_secs(300)
}
