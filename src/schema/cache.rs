//! Parsed base specs, shared across templates.
//!
//! Listing or validating a library resolves many templates of the same kind. Each
//! `(kind, version)` base spec is parsed once and shared behind an [`Arc`]. The map is
//! a [`DashMap`] so batch loads on worker threads can hit it concurrently.

use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use super::declaration::SpecDeclaration;
use super::module::ModuleSpec;
use super::version::SchemaVersion;
use crate::core::BoilerplateError;

/// Cache key: module kind plus schema version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecCacheKey {
    /// Module kind
    pub kind: String,
    /// Schema version
    pub version: SchemaVersion,
}

/// Thread-safe cache of parsed module base specs.
#[derive(Debug, Default)]
pub struct ModuleSpecCache {
    entries: DashMap<SpecCacheKey, Arc<SpecDeclaration>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl ModuleSpecCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parsed base spec for `module` at `version`, parsing on first use.
    pub fn get_or_load(
        &self,
        module: &ModuleSpec,
        version: &SchemaVersion,
    ) -> Result<Arc<SpecDeclaration>, BoilerplateError> {
        let key = SpecCacheKey {
            kind: module.kind.clone(),
            version: version.clone(),
        };

        if let Some(entry) = self.entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(entry.value()));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let source = module.source(version).ok_or_else(|| BoilerplateError::Other {
            message: format!("module '{}' has no spec for schema {version}", module.kind),
        })?;
        let parsed = Arc::new(SpecDeclaration::from_yaml(source)?);
        debug!("Parsed base spec {} {}", module.kind, version);

        let entry = self.entries.entry(key).or_insert(parsed);
        Ok(Arc::clone(entry.value()))
    }

    /// Drop every entry and reset statistics.
    pub fn clear(&self) {
        self.entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Number of cached specs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(hits, misses)`
    pub fn stats(&self) -> (usize, usize) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }

    /// Hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let (hits, misses) = self.stats();
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }
}
