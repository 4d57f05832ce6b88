//! Static scan of template sources for referenced variables.
//!
//! The renderer needs to know, before rendering, which context variables a template
//! reads: undeclared ones are a load error and unused declarations can be dropped.
//! This is a lexical pass over `{{ }}` and `{% %}` tags. Loop variables, `set`
//! targets, macro names and arguments and import aliases are template-local and
//! excluded, as are attributes, filters, tests, function names and keyword arguments.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static COMMENT_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?s)\{#.*?#\}").ok());
static RAW_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?s)\{%-?\s*raw\s*-?%\}.*?\{%-?\s*endraw\s*-?%\}").ok()
});
static TAG_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)\{\{(.*?)\}\}|\{%(.*?)%\}").ok());

const KEYWORDS: &[&str] = &[
    "and", "or", "not", "in", "is", "if", "else", "true", "false", "True", "False", "none",
    "None", "loop", "super", "self", "as", "with", "context",
];

const SKIPPED_TAGS: &[&str] = &[
    "include", "extends", "block", "endblock", "endif", "else", "raw",
    "endraw", "filter", "endfilter", "break", "continue", "endset",
];

/// How a statement changes the set of template-local names.
enum Binding {
    None,
    /// `for` and `macro` open a scope holding these names
    Open(Vec<String>),
    /// `endfor` and `endmacro`
    Close,
    /// `set` and `import` bind in the innermost scope
    Local(String),
    /// `set_global` binds at file level
    Global(String),
}

/// Variables read by one template source, excluding template-local names.
///
/// Locals only shadow names inside their scope and after their binding, so a loop
/// variable does not hide a same-named context variable used outside the loop.
pub fn referenced_variables(source: &str) -> BTreeSet<String> {
    let (Some(comment_re), Some(raw_re), Some(tag_re)) =
        (COMMENT_RE.as_ref(), RAW_RE.as_ref(), TAG_RE.as_ref())
    else {
        return BTreeSet::new();
    };

    let without_comments = comment_re.replace_all(source, "");
    let cleaned = raw_re.replace_all(&without_comments, "");

    let mut used = BTreeSet::new();
    let mut scopes: Vec<BTreeSet<String>> = vec![BTreeSet::new()];

    for caps in tag_re.captures_iter(&cleaned) {
        let mut names = BTreeSet::new();
        let binding = if let Some(expr) = caps.get(1) {
            scan_expression(trim_tag(expr.as_str()), &mut names);
            Binding::None
        } else if let Some(stmt) = caps.get(2) {
            scan_statement(trim_tag(stmt.as_str()), &mut names)
        } else {
            Binding::None
        };

        used.extend(names.into_iter().filter(|name| !scopes.iter().any(|s| s.contains(name))));

        match binding {
            Binding::None => {}
            Binding::Open(locals) => scopes.push(locals.into_iter().collect()),
            Binding::Close => {
                if scopes.len() > 1 {
                    scopes.pop();
                }
            }
            Binding::Local(name) => {
                if let Some(scope) = scopes.last_mut() {
                    scope.insert(name);
                }
            }
            Binding::Global(name) => {
                scopes[0].insert(name);
            }
        }
    }

    used
}

fn trim_tag(inner: &str) -> &str {
    inner.trim().trim_start_matches('-').trim_end_matches('-').trim()
}

fn scan_statement(stmt: &str, used: &mut BTreeSet<String>) -> Binding {
    let (keyword, rest) = match stmt.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (stmt, ""),
    };

    match keyword {
        "for" => match rest.split_once(" in ") {
            Some((targets, iterable)) => {
                scan_expression(iterable, used);
                Binding::Open(targets.split(',').map(|t| t.trim().to_string()).collect())
            }
            None => {
                scan_expression(rest, used);
                Binding::None
            }
        },
        "set" | "set_global" => match rest.split_once('=') {
            Some((target, value)) => {
                scan_expression(value, used);
                let target = target.trim().to_string();
                if keyword == "set" { Binding::Local(target) } else { Binding::Global(target) }
            }
            None => {
                scan_expression(rest, used);
                Binding::None
            }
        },
        "macro" => {
            let (_, args) = rest.split_once('(').unwrap_or((rest, ""));
            let args = args
                .trim_end_matches(')')
                .split(',')
                .map(|arg| arg.split('=').next().unwrap_or_default().trim().to_string())
                .filter(|arg| !arg.is_empty())
                .collect();
            Binding::Open(args)
        }
        "endfor" | "endmacro" => Binding::Close,
        "import" => match rest.rsplit_once(" as ") {
            Some((_, alias)) => Binding::Local(alias.trim().to_string()),
            None => Binding::None,
        },
        "if" | "elif" => {
            scan_expression(rest, used);
            Binding::None
        }
        keyword if SKIPPED_TAGS.contains(&keyword) => Binding::None,
        _ => {
            scan_expression(stmt, used);
            Binding::None
        }
    }
}

fn scan_expression(expr: &str, used: &mut BTreeSet<String>) {
    let chars: Vec<char> = expr.chars().collect();
    let mut i = 0;
    let mut prev: Option<char> = None;
    let mut after_is = false;

    while i < chars.len() {
        let c = chars[i];

        if c == '"' || c == '\'' || c == '`' {
            i += 1;
            while i < chars.len() && chars[i] != c {
                if chars[i] == '\\' {
                    i += 1;
                }
                i += 1;
            }
            i += 1;
            prev = Some(c);
            continue;
        }

        if c.is_ascii_digit() {
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.') {
                i += 1;
            }
            prev = Some('0');
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let next = next_significant(&chars, i);

            let is_attribute = prev == Some('.');
            let is_filter = prev == Some('|');
            let is_namespace = prev == Some(':');
            let is_call = next.map(|(_, ch)| ch) == Some('(');
            let is_module = next.is_some_and(|(j, ch)| ch == ':' && chars.get(j + 1) == Some(&':'));
            let is_kwarg = next.is_some_and(|(j, ch)| ch == '=' && chars.get(j + 1) != Some(&'='));
            let is_test = after_is && word != "not";

            if word == "is" {
                after_is = true;
            } else if word != "not" {
                after_is = false;
            }

            let skip = is_attribute
                || is_filter
                || is_namespace
                || is_call
                || is_module
                || is_kwarg
                || is_test
                || word.starts_with("__")
                || KEYWORDS.contains(&word.as_str());
            if !skip {
                used.insert(word);
            }
            prev = Some('a');
            continue;
        }

        if !c.is_whitespace() {
            prev = Some(c);
        }
        i += 1;
    }
}

fn next_significant(chars: &[char], from: usize) -> Option<(usize, char)> {
    chars[from..]
        .iter()
        .enumerate()
        .find(|(_, c)| !c.is_whitespace())
        .map(|(offset, &c)| (from + offset, c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(source: &str) -> Vec<String> {
        referenced_variables(source).into_iter().collect()
    }

    #[test]
    fn test_plain_interpolation_and_attributes() {
        assert_eq!(names("image: {{ image_name }}:{{ image.tag }}"), ["image", "image_name"]);
    }

    #[test]
    fn test_filters_and_kwargs_are_not_variables() {
        assert_eq!(
            names(r#"{{ service_name | default(value="web") | upper }}"#),
            ["service_name"]
        );
        assert_eq!(names("{{ items | join(sep=separator) }}"), ["items", "separator"]);
    }

    #[test]
    fn test_tests_and_keywords() {
        assert_eq!(
            names("{% if traefik_enabled and traefik_host is defined and not swarm_enabled %}x{% endif %}"),
            ["swarm_enabled", "traefik_enabled", "traefik_host"]
        );
        assert_eq!(names("{% if x is not defined %}{% endif %}"), ["x"]);
    }

    #[test]
    fn test_loop_and_set_locals_excluded() {
        let source = "{% for port in ports %}{{ port }}{{ loop.index }}{% endfor %}\
                      {% set full = prefix ~ '-' ~ suffix %}{{ full }}";
        assert_eq!(names(source), ["ports", "prefix", "suffix"]);
    }

    #[test]
    fn test_locals_only_shadow_inside_their_scope() {
        assert_eq!(names("{% for item in list %}{{ item }}{% endfor %}{{ item }}"), ["item", "list"]);
        assert_eq!(names("{{ image }}{% set image = base %}{{ image }}"), ["base", "image"]);
        assert_eq!(
            names("{% for p in ports %}{% set label = p %}{% endfor %}{{ label }}"),
            ["label", "ports"]
        );
        assert_eq!(
            names("{% macro row(value) %}{{ value }}{% endmacro %}{{ value }}"),
            ["value"]
        );
    }

    #[test]
    fn test_comments_raw_and_strings_ignored() {
        let source = "{# {{ hidden }} #}{% raw %}{{ literal }}{% endraw %}{{ 'quoted' ~ real }}";
        assert_eq!(names(source), ["real"]);
    }

    #[test]
    fn test_include_and_macros() {
        let source = "{% import \"macros.j2\" as m %}{% include \"partials/env.j2\" %}\
                      {{ m::env(name=service_name) }}\
                      {% macro label(key, value=1) %}{{ key }}{{ value }}{% endmacro %}";
        assert_eq!(names(source), ["service_name"]);
    }

    #[test]
    fn test_whitespace_control_and_comparisons() {
        assert_eq!(
            names("{%- if network_mode == 'bridge' -%}{{- network_name -}}{%- endif %}"),
            ["network_mode", "network_name"]
        );
    }
}
