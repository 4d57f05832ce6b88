//! Library-level test suite
//!
//! Exercises the public API without the binary: variable resolution across the value
//! layers, section gating, the schema gate and the rendering pipeline.
//!
//! ```bash
//! cargo test --test unit
//! ```

#[path = "../common/mod.rs"]
mod common;

mod library_loading;
mod rendering;
mod resolution;
