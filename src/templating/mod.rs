//! Template descriptors, file trees and the rendering pipeline.
//!
//! A template is a directory holding `template.yaml` and a file tree. Files ending in
//! `.j2` are dynamic: they go through the sandboxed Tera renderer and lose the suffix.
//! Everything else is copied byte for byte.
//!
//! ```text
//! TemplateDescriptor::load   metadata only, used for listing
//!   └─ load_body             walk the tree, contents read lazily
//!        └─ TemplateRenderer::render   all files, all errors collected
//!             └─ plan_output / write_output   dry run or staged write
//! ```

pub mod body;
pub mod descriptor;
pub mod error;
pub mod output;
pub mod renderer;
pub mod sanitize;
pub mod scan;

pub use body::{TemplateBody, TemplateFile};
pub use descriptor::{TemplateDescriptor, TemplateMetadata, TemplateStatus, TemplateSummary};
pub use error::{ContextLine, RenderError, RenderErrorKind};
pub use output::{FileAction, OutputPlan, PlannedFile, plan_output, write_output};
pub use renderer::{RenderOutput, RenderedFile, TemplateRenderer};
pub use sanitize::sanitize;
pub use scan::referenced_variables;
