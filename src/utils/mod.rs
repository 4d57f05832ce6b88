//! Shared helpers: file system operations and progress display.

pub mod fs;
pub mod progress;

pub use fs::{atomic_write, ensure_dir};
pub use progress::ProgressBar;
