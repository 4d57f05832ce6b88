//! Spec declarations, module implementations and the schema version gate.

pub mod cache;
pub mod declaration;
pub mod module;
pub mod version;

pub use cache::ModuleSpecCache;
pub use declaration::{SectionDecl, SpecDeclaration, VariableDecl, VarsDecl};
pub use module::{ModuleRegistry, ModuleSpec};
pub use version::{SchemaVersion, select_base_version};
