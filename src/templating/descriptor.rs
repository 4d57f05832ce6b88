//! Template metadata, cheap enough to load for every template in a library.
//!
//! A [`TemplateDescriptor`] is read from `template.yaml` alone. The file tree is only
//! touched through [`TemplateDescriptor::load_body`].

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::path::{Path, PathBuf};

use super::body::TemplateBody;
use crate::constants::METADATA_FILES;
use crate::core::{BoilerplateError, Result};
use crate::schema::{SchemaVersion, SpecDeclaration};

/// Publication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStatus {
    Published,
    Draft,
}

/// The `metadata:` block of a template.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateMetadata {
    pub name: String,
    pub description: String,
    pub author: String,
    pub version: String,
    pub date: String,
    pub tags: Vec<String>,
    pub draft: bool,
    /// Shown after generation, rendered with the resolved values
    pub next_steps: Option<String>,
}

/// Everything known about a template without reading its files.
#[derive(Debug, Clone)]
pub struct TemplateDescriptor {
    /// Directory name, or `name.library` when qualified
    pub id: String,
    /// Module kind
    pub kind: String,
    /// Declared schema version
    pub schema: Option<SchemaVersion>,
    pub metadata: TemplateMetadata,
    /// Library the template was found in
    pub library: String,
    /// Template directory
    pub dir: PathBuf,
    /// Template-level section declarations
    pub spec: SpecDeclaration,
}

/// Serializable listing row.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateSummary {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub author: String,
    pub date: String,
    pub tags: Vec<String>,
    pub library: String,
    pub schema: Option<String>,
    pub status: TemplateStatus,
}

#[derive(Debug, Default, Deserialize)]
struct RawDescriptor {
    kind: Option<String>,
    schema: Option<Value>,
    metadata: Option<RawMetadata>,
    #[serde(default)]
    spec: SpecDeclaration,
}

#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    name: Option<Value>,
    description: Option<Value>,
    author: Option<Value>,
    version: Option<Value>,
    date: Option<Value>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    draft: Option<bool>,
    next_steps: Option<String>,
}

impl TemplateDescriptor {
    /// Read the metadata file of the template in `dir`.
    pub fn load(dir: &Path, library: &str) -> Result<Self> {
        let metadata_path = find_metadata_file(dir)?;
        let source = std::fs::read_to_string(&metadata_path)?;
        let load_error = |reason: String| BoilerplateError::TemplateLoad {
            path: metadata_path.clone(),
            reason,
        };

        let document = first_document(&source, &metadata_path)?
            .ok_or_else(|| load_error("file contains no YAML document".into()))?;
        if !document.is_mapping() {
            return Err(load_error("top level must be a mapping".into()));
        }
        let raw: RawDescriptor = serde_yaml::from_value(document)?;

        let kind = raw
            .kind
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| load_error("missing 'kind' field".into()))?;
        let metadata = raw
            .metadata
            .ok_or_else(|| load_error("missing 'metadata' section".into()))
            .and_then(|m| m.validate().map_err(load_error))?;
        let schema = raw.schema.map(|v| parse_schema_field(&v)).transpose()?;

        let id = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| load_error("template directory has no name".into()))?;

        Ok(Self {
            id,
            kind,
            schema,
            metadata,
            library: library.to_string(),
            dir: dir.to_path_buf(),
            spec: raw.spec,
        })
    }

    /// Directory name without any library qualification.
    pub fn base_id(&self) -> String {
        self.dir
            .file_name()
            .map_or_else(|| self.id.clone(), |n| n.to_string_lossy().into_owned())
    }

    /// Rename to `id.library`, used when a higher-priority library has the same id.
    pub fn qualify(&mut self) {
        self.id = format!("{}.{}", self.base_id(), self.library);
    }

    pub fn status(&self) -> TemplateStatus {
        if self.metadata.draft { TemplateStatus::Draft } else { TemplateStatus::Published }
    }

    /// Read the file tree.
    pub fn load_body(&self) -> Result<TemplateBody> {
        TemplateBody::load(&self.dir)
    }

    pub fn summary(&self) -> TemplateSummary {
        TemplateSummary {
            id: self.id.clone(),
            kind: self.kind.clone(),
            name: self.metadata.name.clone(),
            description: self.metadata.description.clone(),
            version: self.metadata.version.clone(),
            author: self.metadata.author.clone(),
            date: self.metadata.date.clone(),
            tags: self.metadata.tags.clone(),
            library: self.library.clone(),
            schema: self.schema.as_ref().map(ToString::to_string),
            status: self.status(),
        }
    }
}

impl RawMetadata {
    fn validate(self) -> std::result::Result<TemplateMetadata, String> {
        let fields = [
            ("name", self.name),
            ("author", self.author),
            ("version", self.version),
            ("date", self.date),
            ("description", self.description),
        ];

        let mut missing = Vec::new();
        let mut values = Vec::new();
        for (field, value) in fields {
            match value.as_ref().and_then(scalar_text) {
                Some(text) if !text.trim().is_empty() => values.push(text),
                _ => {
                    missing.push(field);
                    values.push(String::new());
                }
            }
        }
        if !missing.is_empty() {
            return Err(format!("missing required metadata fields: {}", missing.join(", ")));
        }

        let [name, author, version, date, description]: [String; 5] =
            values.try_into().map_err(|_| "malformed metadata".to_string())?;

        Ok(TemplateMetadata {
            name,
            description: description.trim_end_matches('\n').to_string(),
            author,
            version,
            date,
            tags: self.tags.unwrap_or_default(),
            draft: self.draft.unwrap_or(false),
            next_steps: self
                .next_steps
                .map(|s| s.trim_end_matches('\n').to_string())
                .filter(|s| !s.is_empty()),
        })
    }
}

fn find_metadata_file(dir: &Path) -> Result<PathBuf> {
    METADATA_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| BoilerplateError::TemplateLoad {
            path: dir.to_path_buf(),
            reason: format!("no {} found", METADATA_FILES.join(" or ")),
        })
}

/// First document that is not empty; later documents are ignored.
fn first_document(source: &str, path: &Path) -> Result<Option<Value>> {
    let mut found = None;
    let mut count = 0;
    for document in serde_yaml::Deserializer::from_str(source) {
        let value = Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        count += 1;
        if found.is_none() {
            found = Some(value);
        }
    }
    if count > 1 {
        tracing::warn!(
            "{} contains {} YAML documents, only the first is used",
            path.display(),
            count
        );
    }
    Ok(found)
}

/// `schema: 1.1`, `schema: "1.1"` and `schema: 1` are all accepted.
fn parse_schema_field(value: &Value) -> Result<SchemaVersion> {
    let text = scalar_text(value).unwrap_or_default();
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        return SchemaVersion::parse(&format!("{text}.0"));
    }
    SchemaVersion::parse(&text)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
