//! Sandboxed rendering of a template tree with Tera.
//!
//! All dynamic files are registered in one Tera instance keyed by their relative path,
//! so `include`, `import` and `extends` resolve only inside the same tree. Built-in
//! functions that read the environment or break determinism are replaced with ones
//! that fail. Every file is attempted, and all failures come back together as
//! [`BoilerplateError::RenderFailed`].

use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use strsim::levenshtein;
use tera::{Context as TeraContext, Tera};

use super::body::{TemplateBody, TemplateFile};
use super::error::{RenderError, RenderErrorKind, extract_context_lines};
use super::sanitize::{is_effectively_empty, sanitize};
use crate::constants::{CONTEXT_RADIUS, SIMILARITY_THRESHOLD_PERCENT};
use crate::core::{BoilerplateError, Result};

/// Functions replaced with failing stubs inside templates.
const DISABLED_FUNCTIONS: &[&str] = &["get_env", "now", "get_random"];

/// Tera's built-in filters, for "did you mean" hints.
const BUILTIN_FILTERS: &[&str] = &[
    "abs", "addslashes", "capitalize", "concat", "date", "default", "escape", "escape_xml",
    "filesizeformat", "filter", "first", "float", "get", "group_by", "indent", "int", "join",
    "json_encode", "last", "length", "linebreaksbr", "lower", "map", "nth", "pluralize",
    "replace", "reverse", "round", "safe", "slice", "slugify", "sort", "split", "as_str",
    "spaceless", "striptags", "title", "trim", "trim_end", "trim_end_matches", "trim_start",
    "trim_start_matches", "truncate", "unique", "upper", "urlencode", "urlencode_strict",
    "wordcount",
];

static POSITION_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"-->\s*(\d+):(\d+)").ok());
static VARIABLE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"Variable `([^`]+)` not found").ok());
static RENDERING_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?:rendering|render|parse) ['"]([^'"]+)['"]"#).ok());
static QUOTED_NAME_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?:Filter|Function|Test|Template) [`']([^`']+)[`']").ok());

/// One output file, relative to the output root.
#[derive(Debug, Clone)]
pub struct RenderedFile {
    /// Output path, dynamic suffix stripped
    pub path: PathBuf,
    /// Source path in the template
    pub source: PathBuf,
    pub content: Vec<u8>,
    pub mode: Option<u32>,
}

/// Result of rendering a whole tree.
#[derive(Debug, Clone, Default)]
pub struct RenderOutput {
    pub files: Vec<RenderedFile>,
    /// Dynamic files that rendered to nothing and are not written
    pub skipped: Vec<PathBuf>,
    /// Source directory permission bits, relative to the output root
    pub dir_modes: BTreeMap<PathBuf, u32>,
}

impl RenderOutput {
    /// Rendered YAML files that do not parse, with the parser message.
    pub fn yaml_problems(&self) -> Vec<(PathBuf, String)> {
        self.files
            .iter()
            .filter(|f| {
                f.path.extension().is_some_and(|ext| ext == "yaml" || ext == "yml")
            })
            .filter_map(|f| {
                let text = String::from_utf8_lossy(&f.content);
                serde_yaml::Deserializer::from_str(&text)
                    .map(|doc| serde_yaml::Value::deserialize(doc).map(|_| ()))
                    .find_map(|result| result.err())
                    .map(|e| (f.path.clone(), e.to_string()))
            })
            .collect()
    }
}

/// Renders template trees for one template.
pub struct TemplateRenderer {
    template_id: String,
}

impl TemplateRenderer {
    pub fn new(template_id: impl Into<String>) -> Self {
        Self {
            template_id: template_id.into(),
        }
    }

    /// Render every file of `body` with `variables` as the whole context.
    ///
    /// Dynamic files go through Tera and sanitization; static files are copied. Files
    /// that render empty are skipped. All failures are collected before returning.
    pub fn render(
        &self,
        body: &TemplateBody,
        variables: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<RenderOutput> {
        let context = TeraContext::from_value(serde_json::Value::Object(variables.clone()))
            .map_err(|e| BoilerplateError::Other {
                message: format!("invalid render context: {e}"),
            })?;
        let available: Vec<&str> = variables.keys().map(String::as_str).collect();

        let mut errors = Vec::new();
        let mut sources: HashMap<String, (&TemplateFile, &str)> = HashMap::new();

        for file in body.dynamic_files() {
            match file.content() {
                Ok(content) => {
                    sources.insert(file.template_name(), (file, content));
                }
                Err(e) => errors.push(io_error(&file.relative_path, &e.to_string())),
            }
        }

        let mut tera = sandboxed_engine();
        let broken = probe_syntax(&sources, &available, &mut errors);
        let registrable: Vec<(&str, &str)> = sources
            .iter()
            .filter(|(name, _)| !broken.contains(*name))
            .map(|(name, (_, content))| (name.as_str(), *content))
            .collect();
        if let Err(e) = tera.add_raw_templates(registrable) {
            errors.push(self.classify(&e, &sources, None, &available));
        }

        let mut output = RenderOutput {
            dir_modes: body.dir_modes().clone(),
            ..RenderOutput::default()
        };

        for file in body.files() {
            if !file.is_dynamic {
                match std::fs::read(file.source_path()) {
                    Ok(content) => output.files.push(RenderedFile {
                        path: file.output_path.clone(),
                        source: file.relative_path.clone(),
                        content,
                        mode: file.mode,
                    }),
                    Err(e) => errors.push(io_error(&file.relative_path, &e.to_string())),
                }
                continue;
            }

            let name = file.template_name();
            if broken.contains(&name) || !sources.contains_key(&name) {
                continue;
            }
            if !errors.is_empty() && tera.get_template(&name).is_err() {
                continue;
            }

            match tera.render(&name, &context) {
                Ok(rendered) => {
                    let cleaned = sanitize(&rendered);
                    if is_effectively_empty(&cleaned) {
                        tracing::debug!("Skipping {} (rendered empty)", file.output_path.display());
                        output.skipped.push(file.output_path.clone());
                        continue;
                    }
                    output.files.push(RenderedFile {
                        path: file.output_path.clone(),
                        source: file.relative_path.clone(),
                        content: cleaned.into_bytes(),
                        mode: file.mode,
                    });
                }
                Err(e) => errors.push(self.classify(&e, &sources, Some(&name), &available)),
            }
        }

        if !errors.is_empty() {
            tracing::debug!("{} render error(s) in {}", errors.len(), self.template_id);
            return Err(BoilerplateError::RenderFailed {
                template: self.template_id.clone(),
                errors,
            });
        }

        tracing::debug!(
            "Rendered {} file(s) for {} ({} skipped)",
            output.files.len(),
            self.template_id,
            output.skipped.len()
        );
        Ok(output)
    }

    /// Render free text (a template's `next_steps`) with the same sandbox. Falls back
    /// to the raw text when it does not render.
    pub fn render_text(
        &self,
        text: &str,
        variables: &serde_json::Map<String, serde_json::Value>,
    ) -> String {
        let rendered = TeraContext::from_value(serde_json::Value::Object(variables.clone()))
            .and_then(|context| sandboxed_engine().render_str(text, &context));
        match rendered {
            Ok(rendered) => rendered.trim_end().to_string(),
            Err(e) => {
                tracing::warn!("Could not render next steps: {}", chain_text(&e));
                text.to_string()
            }
        }
    }

    /// Turn a Tera error into a [`RenderError`] attributed to the innermost file.
    fn classify(
        &self,
        error: &tera::Error,
        sources: &HashMap<String, (&TemplateFile, &str)>,
        rendering: Option<&str>,
        available: &[&str],
    ) -> RenderError {
        let text = chain_text(error);

        let file_name = innermost_file(&text, sources)
            .or_else(|| rendering.map(str::to_string))
            .unwrap_or_else(|| self.template_id.clone());
        let (file, content) = match sources.get(&file_name) {
            Some((file, content)) => (file.relative_path.clone(), Some(*content)),
            None => (PathBuf::from(&file_name), None),
        };

        classify_message(&text, file, content, available)
    }
}

/// Fresh Tera with autoescape off and environment-reading functions disabled.
fn sandboxed_engine() -> Tera {
    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    for &name in DISABLED_FUNCTIONS {
        tera.register_function(name, disabled_function(name));
    }
    tera
}

fn disabled_function(name: &'static str) -> impl tera::Function {
    move |_: &HashMap<String, tera::Value>| -> tera::Result<tera::Value> {
        Err(tera::Error::msg(format!(
            "Function '{name}' is disabled in templates; pass the value as a variable instead"
        )))
    }
}

/// Parse each file alone so every syntax error is attributed to its file.
fn probe_syntax(
    sources: &HashMap<String, (&TemplateFile, &str)>,
    available: &[&str],
    errors: &mut Vec<RenderError>,
) -> Vec<String> {
    let mut names: Vec<&String> = sources.keys().collect();
    names.sort();

    let mut broken = Vec::new();
    for name in names {
        let Some((file, content)) = sources.get(name) else {
            continue;
        };
        let mut probe = Tera::default();
        if let Err(e) = probe.add_raw_template(name, content) {
            let text = chain_text(&e);
            if text.contains("Failed to parse") {
                errors.push(classify_message(
                    &text,
                    file.relative_path.clone(),
                    Some(*content),
                    available,
                ));
                broken.push(name.clone());
            }
        }
    }
    broken
}

fn classify_message(
    text: &str,
    file: PathBuf,
    content: Option<&str>,
    available: &[&str],
) -> RenderError {
    let mut line = None;
    let mut column = None;
    if let Some(caps) = POSITION_RE.as_ref().and_then(|re| re.captures(text)) {
        line = caps.get(1).and_then(|m| m.as_str().parse().ok());
        column = caps.get(2).and_then(|m| m.as_str().parse().ok());
    }

    let quoted = QUOTED_NAME_RE
        .as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    let (kind, message, suggestions) = if let Some(variable) = undefined_variable(text) {
        if line.is_none() {
            line = content.and_then(|c| locate_identifier(c, &variable));
        }
        let mut suggestions: Vec<String> = similar_names(&variable, available)
            .into_iter()
            .map(|name| format!("Did you mean '{name}'?"))
            .collect();
        suggestions.push(format!(
            "Declare '{variable}' in the spec block of template.yaml, or check that its \
             section is enabled"
        ));
        suggestions.push(format!(
            "For optional values use {{{{ {variable} | default(value=\"...\") }}}}"
        ));
        (
            RenderErrorKind::UndefinedVariable,
            format!("Variable '{variable}' is not defined"),
            suggestions,
        )
    } else if text.contains("Failed to parse") {
        (
            RenderErrorKind::Syntax,
            syntax_message(text),
            vec![
                "Check that every {% if %}, {% for %} and {% block %} has its closing tag"
                    .to_string(),
                "Make sure all {{ }} and {% %} tags are properly closed".to_string(),
            ],
        )
    } else if text.contains("Filter '") || text.contains("Filter `") {
        let name = quoted.unwrap_or_default();
        let mut suggestions: Vec<String> = similar_names(&name, BUILTIN_FILTERS)
            .into_iter()
            .map(|f| format!("Did you mean the '{f}' filter?"))
            .collect();
        suggestions.push("Only Tera's built-in filters are available".to_string());
        let kind = if text.contains("not found") {
            RenderErrorKind::UnknownFilter
        } else {
            RenderErrorKind::Type
        };
        (kind, last_message(text), suggestions)
    } else if text.contains("is disabled in templates")
        || ((text.contains("Function '") || text.contains("Test '")) && text.contains("not found"))
    {
        (
            RenderErrorKind::UnknownFunction,
            last_message(text),
            vec!["Environment access, time and randomness are not available in templates; \
                  declare a variable instead"
                .to_string()],
        )
    } else if text.contains("isn't loaded")
        || text.contains("isn't present")
        || (text.contains("Template '") && text.contains("not found"))
    {
        (
            RenderErrorKind::MissingInclude,
            last_message(text),
            vec![
                "Includes resolve relative to the template root, with '/' separators"
                    .to_string(),
                "Only .j2 files of the same template can be included".to_string(),
            ],
        )
    } else if text.contains("Tried to") || text.contains("incorrect value") {
        (
            RenderErrorKind::Type,
            last_message(text),
            vec!["Check the variable's declared type; convert with | int or | as_str".to_string()],
        )
    } else {
        (RenderErrorKind::Other, last_message(text), Vec::new())
    };

    let context = match (content, line) {
        (Some(content), Some(line)) => extract_context_lines(content, line, CONTEXT_RADIUS),
        _ => Vec::new(),
    };

    RenderError {
        kind,
        file,
        message,
        line,
        column,
        context,
        suggestions,
    }
}

/// Every message in the error chain, one per line.
fn chain_text(error: &tera::Error) -> String {
    use std::error::Error as _;

    let mut messages = vec![error.to_string()];
    let mut current = error.source();
    while let Some(err) = current {
        messages.push(err.to_string());
        current = err.source();
    }
    messages
        .join("\n")
        .replace("'__tera_one_off'", "text")
        .replace("\"__tera_one_off\"", "text")
}

/// The innermost template named by the chain.
fn innermost_file(text: &str, sources: &HashMap<String, (&TemplateFile, &str)>) -> Option<String> {
    let re = RENDERING_RE.as_ref()?;
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .filter(|name| sources.contains_key(name))
        .last()
}

fn undefined_variable(text: &str) -> Option<String> {
    VARIABLE_RE
        .as_ref()?
        .captures(text)?
        .get(1)
        .map(|m| m.as_str().split('.').next().unwrap_or_default().to_string())
}

/// First line that uses `name` inside a tag.
fn locate_identifier(content: &str, name: &str) -> Option<usize> {
    let pattern = format!(r"\{{[{{%][^}}]*\b{}\b", regex::escape(name));
    let re = Regex::new(&pattern).ok()?;
    content
        .lines()
        .position(|line| re.is_match(line))
        .map(|idx| idx + 1)
}

fn similar_names(target: &str, candidates: &[&str]) -> Vec<String> {
    if target.is_empty() {
        return Vec::new();
    }
    let limit = (target.len() * SIMILARITY_THRESHOLD_PERCENT / 100).max(1);

    let mut scored: Vec<(usize, &str)> = candidates
        .iter()
        .map(|c| (levenshtein(target, c), *c))
        .filter(|(distance, _)| *distance <= limit)
        .collect();
    scored.sort();
    scored.into_iter().take(3).map(|(_, c)| c.to_string()).collect()
}

/// The pest excerpt with Tera's own wrapper lines removed.
fn syntax_message(text: &str) -> String {
    let detail: Vec<&str> = text
        .lines()
        .filter(|line| !line.starts_with("Failed to parse"))
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !line.trim_start().starts_with("-->"))
        .filter(|line| !line.trim_start().starts_with('|') && !line.contains(" | "))
        .map(str::trim)
        .collect();
    match detail.last() {
        Some(last) => (*last).trim_start_matches("= ").to_string(),
        None => "Template syntax error".to_string(),
    }
}

/// The most specific message in the chain.
fn last_message(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with("Failed to render"))
        .last()
        .unwrap_or("Render error")
        .to_string()
}

fn io_error(file: &Path, message: &str) -> RenderError {
    RenderError {
        kind: RenderErrorKind::Io,
        file: file.to_path_buf(),
        message: message.to_string(),
        line: None,
        column: None,
        context: Vec::new(),
        suggestions: vec!["Check that the file is readable UTF-8 text".to_string()],
    }
}
