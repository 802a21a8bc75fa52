//! Scanning text for template placeholders (`{{ ... }}`, `{% ... %}`).

use std::sync::LazyLock;

use regex::Regex;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{\{(.*?)\}\}|\{%(.*?)%\}").expect("placeholder regex is valid")
});

static STRING_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""[^"]*"|'[^']*'"#).expect("string literal regex is valid")
});

/// A dotted identifier chain, optionally preceded by a filter pipe.
static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\|\s*)?([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)")
        .expect("identifier regex is valid")
});

/// Whether any placeholder in `text` references the variable `name`, either
/// as the exact identifier or as the head of a dotted path (`name.field`).
/// Identifiers inside string literals and filter names after `|` are
/// ignored.
pub fn references_variable(text: &str, name: &str) -> bool {
    let name = name.trim();
    if name.is_empty() {
        return false;
    }

    PLACEHOLDER.captures_iter(text).any(|caps| {
        let body = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        let body = STRING_LITERAL.replace_all(body, " ");
        IDENTIFIER.captures_iter(&body).any(|ident| {
            if ident.get(1).is_some() {
                return false;
            }
            let chain = &ident[2];
            chain == name
                || chain
                    .strip_prefix(name)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_dotted_references() {
        assert!(references_variable("Hello {{ user }}!", "user"));
        assert!(references_variable("{{user.name}}", "user"));
        assert!(references_variable("{{ a.b.c }}", "a.b"));
        assert!(!references_variable("{{ username }}", "user"));
        assert!(!references_variable("{{ other.user }}", "user"));
    }

    #[test]
    fn test_statements() {
        assert!(references_variable("{% for item in items %}", "items"));
        assert!(references_variable("{% if flag %}on{% endif %}", "flag"));
    }

    #[test]
    fn test_ignores_literals_and_filters() {
        assert!(!references_variable("{{ 'user' }}", "user"));
        assert!(!references_variable("{{ name | upper }}", "upper"));
        assert!(references_variable("{{ name | upper }}", "name"));
        assert!(!references_variable("user outside braces", "user"));
        assert!(!references_variable("{{ user }}", ""));
    }
}
