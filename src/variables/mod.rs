//! Variable resolution engine.
//!
//! Declarations from a module spec and a template spec are merged into a
//! [`VariableCollection`]: sections of typed [`Variable`]s with toggles, `needs`
//! dependencies and value provenance. The collection answers satisfaction queries,
//! applies value layers by precedence and produces the render context.
//!
//! Value layers, lowest precedence first:
//!
//! 1. module default ([`Origin::Module`])
//! 2. template default ([`Origin::Template`])
//! 3. persisted user default ([`Origin::Persisted`])
//! 4. caller override ([`Origin::Caller`])
//!
//! A layer never replaces a value set by a higher one, regardless of call order.

pub mod autogen;
pub mod collection;
pub mod merge;
pub mod needs;
pub mod section;
pub mod value;
pub mod variable;

pub use collection::{SectionView, VariableCollection, VariableView};
pub use merge::merge_specs;
pub use needs::{Need, NeedsDecl, parse_needs};
pub use section::Section;
pub use value::{VariableType, VariableValue, display_value};
pub use variable::{Autogenerate, Origin, Variable};
