//! File system helpers: atomic writes, directories, digests.

pub mod atomic;
pub mod dirs;
pub mod metadata;

pub use atomic::atomic_write;
pub use dirs::{ensure_dir, is_empty_dir, set_mode};
pub use metadata::{checksum, short_checksum};
