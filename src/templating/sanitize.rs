//! Whitespace normalization of rendered text.

/// Normalize rendered output.
///
/// Trailing whitespace is stripped from every line, runs of blank lines collapse to
/// one, leading and trailing blank lines are removed and the result ends with exactly
/// one newline. Applying it twice changes nothing.
pub fn sanitize(content: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut previous_blank = false;

    for line in content.split('\n') {
        let line = line.trim_end();
        let blank = line.is_empty();
        if blank && previous_blank {
            continue;
        }
        lines.push(line);
        previous_blank = blank;
    }

    let joined = lines.join("\n");
    let trimmed = joined.trim_matches('\n');
    if trimmed.is_empty() {
        return String::new();
    }
    format!("{trimmed}\n")
}

/// True when rendered output has nothing worth writing: blank, or only a YAML
/// document marker.
pub fn is_effectively_empty(content: &str) -> bool {
    let trimmed = content.trim();
    trimmed.is_empty() || trimmed == "---"
}
