//! Overlay a template's spec on a module's base spec.
//!
//! The template wins field by field: a section or variable it redeclares keeps every
//! base field the template does not write. New sections and variables are appended
//! after the base ones, in the template's declaration order.

use super::collection::VariableCollection;
use super::section::Section;
use super::variable::Origin;
use crate::core::BoilerplateError;
use crate::schema::SpecDeclaration;

/// Build sections from a declaration, all values tagged with `origin`.
pub fn sections_from(spec: &SpecDeclaration, origin: Origin) -> Result<Vec<Section>, BoilerplateError> {
    spec.sections.iter().map(|(key, decl)| Section::from_decl(key, decl, origin)).collect()
}

/// Merge `overlay` (template) onto `base` (module) and validate the result.
pub fn merge_specs(
    base: &SpecDeclaration,
    overlay: &SpecDeclaration,
) -> Result<VariableCollection, BoilerplateError> {
    let mut sections = sections_from(base, Origin::Module)?;

    for (key, decl) in &overlay.sections {
        match sections.iter_mut().find(|s| &s.key == key) {
            Some(section) => section.overlay(decl, Origin::Template)?,
            None => sections.push(Section::from_decl(key, decl, Origin::Template)?),
        }
    }

    VariableCollection::from_sections(sections)
}
