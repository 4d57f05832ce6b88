//! Structured render diagnostics.
//!
//! Raw engine errors never reach the user. Each failure becomes a [`RenderError`] with
//! the file, the line when it can be determined, a few lines of surrounding source and
//! concrete suggestions.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// What kind of problem the renderer hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderErrorKind {
    /// Reference to a variable missing from the context
    UndefinedVariable,
    /// Malformed tag, unclosed block, bad expression
    Syntax,
    /// Filter that does not exist
    UnknownFilter,
    /// Function or test that does not exist or is disabled
    UnknownFunction,
    /// Include/import of a file that is not part of the template
    MissingInclude,
    /// Operation applied to a value of the wrong type
    Type,
    /// The file could not be read
    Io,
    /// Anything else
    Other,
}

impl RenderErrorKind {
    /// Short heading used in reports.
    pub const fn title(&self) -> &'static str {
        match self {
            Self::UndefinedVariable => "Undefined variable",
            Self::Syntax => "Template syntax error",
            Self::UnknownFilter => "Unknown filter",
            Self::UnknownFunction => "Unknown or disabled function",
            Self::MissingInclude => "Included file not found",
            Self::Type => "Type error",
            Self::Io => "File could not be read",
            Self::Other => "Render error",
        }
    }
}

/// One numbered source line shown around an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextLine {
    /// 1-based line number
    pub number: usize,
    /// Line text
    pub text: String,
    /// This is the offending line
    pub is_error: bool,
}

/// A render failure attributed to one template file.
#[derive(Debug, Clone, Serialize)]
pub struct RenderError {
    /// Category
    pub kind: RenderErrorKind,
    /// File relative to the template directory
    pub file: PathBuf,
    /// Cleaned message
    pub message: String,
    /// 1-based line, when known
    pub line: Option<usize>,
    /// 1-based column, when known
    pub column: Option<usize>,
    /// Source lines around `line`
    pub context: Vec<ContextLine>,
    /// Things to try
    pub suggestions: Vec<String>,
}

impl RenderError {
    /// Multi-line report with source excerpt and suggestions.
    pub fn format_with_context(&self) -> String {
        let mut msg = String::new();

        msg.push_str(&format!("ERROR: {}\n", self.kind.title()));
        msg.push_str(&format!("File: {}\n", self.file.display()));
        match (self.line, self.column) {
            (Some(line), Some(column)) => msg.push_str(&format!("Line: {line}, column {column}\n")),
            (Some(line), None) => msg.push_str(&format!("Line: {line}\n")),
            _ => {}
        }
        msg.push_str(&format!("Message: {}\n", self.message));

        if !self.context.is_empty() {
            msg.push('\n');
            let width = self.context.iter().map(|l| l.number.to_string().len()).max().unwrap_or(1);
            for line in &self.context {
                let marker = if line.is_error { ">>>" } else { "   " };
                msg.push_str(&format!("{marker} {:>width$} | {}\n", line.number, line.text));
            }
        }

        if !self.suggestions.is_empty() {
            msg.push_str("\nSuggestions:\n");
            for suggestion in &self.suggestions {
                msg.push_str(&format!("  - {suggestion}\n"));
            }
        }

        msg
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}: {}", self.file.display(), line, self.message),
            None => write!(f, "{}: {}", self.file.display(), self.message),
        }
    }
}

impl std::error::Error for RenderError {}

/// Up to `radius` lines either side of `line`, the error line marked.
pub fn extract_context_lines(content: &str, line: usize, radius: usize) -> Vec<ContextLine> {
    let lines: Vec<&str> = content.lines().collect();
    if line == 0 || line > lines.len() {
        return Vec::new();
    }

    let start = line.saturating_sub(radius + 1);
    let end = (line + radius).min(lines.len());

    lines[start..end]
        .iter()
        .enumerate()
        .map(|(idx, text)| {
            let number = start + idx + 1;
            ContextLine {
                number,
                text: (*text).to_string(),
                is_error: number == line,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_window_is_clamped() {
        let content = "a\nb\nc\nd\ne\nf\ng\nh";
        let lines = extract_context_lines(content, 2, 3);
        assert_eq!(lines.first().map(|l| l.number), Some(1));
        assert_eq!(lines.last().map(|l| l.number), Some(5));
        assert!(lines[1].is_error);
        assert!(extract_context_lines(content, 99, 3).is_empty());
    }

    #[test]
    fn test_report_marks_error_line() {
        let error = RenderError {
            kind: RenderErrorKind::UndefinedVariable,
            file: PathBuf::from("compose.yaml.j2"),
            message: "Variable `sevice_name` is not defined".into(),
            line: Some(3),
            column: None,
            context: extract_context_lines("services:\n  app:\n    image: {{ sevice_name }}\n", 3, 3),
            suggestions: vec!["Did you mean 'service_name'?".into()],
        };

        let report = error.format_with_context();
        assert!(report.starts_with("ERROR: Undefined variable\n"));
        assert!(report.contains("File: compose.yaml.j2"));
        assert!(report.contains(">>> 3 |     image: {{ sevice_name }}"));
        assert!(report.contains("  - Did you mean 'service_name'?"));
        assert_eq!(error.to_string(), "compose.yaml.j2:3: Variable `sevice_name` is not defined");
    }
}
