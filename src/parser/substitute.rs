use crate::error::ParseError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

// Patterns are compile-time constants; failing to compile one is a bug.
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([^}]*)\}")
        .unwrap_or_else(|e| panic!("BUG: invalid placeholder pattern: {}", e))
});

static UNTERMINATED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{[^}]*\z")
        .unwrap_or_else(|e| panic!("BUG: invalid unterminated-placeholder pattern: {}", e))
});

static NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_.#-]+$")
        .unwrap_or_else(|e| panic!("BUG: invalid placeholder name pattern: {}", e))
});

/// Replace `${name}` placeholders in `text` using `lookup`.
///
/// Names that `lookup` does not know are kept verbatim so a later pass (case
/// properties at execution time) can resolve them. An unterminated `${` or a
/// name outside `[A-Za-z0-9_.#-]` is rejected.
pub fn substitute<F>(text: &str, lookup: F) -> Result<String, ParseError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(m) = UNTERMINATED.find(text) {
        return Err(ParseError::Substitution(format!(
            "unterminated placeholder near '{}'",
            preview(m.as_str())
        )));
    }

    if let Some(caps) = PLACEHOLDER
        .captures_iter(text)
        .find(|caps| !NAME.is_match(&caps[1]))
    {
        return Err(ParseError::Substitution(format!(
            "invalid placeholder name '{}'",
            &caps[1]
        )));
    }

    let result = PLACEHOLDER.replace_all(text, |caps: &Captures| {
        lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    });
    Ok(result.into_owned())
}

fn preview(s: &str) -> String {
    s.chars().take(24).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars() -> HashMap<String, String> {
        let mut v = HashMap::new();
        v.insert("host".to_string(), "localhost".to_string());
        v.insert("port".to_string(), "8088".to_string());
        v
    }

    #[test]
    fn test_known_placeholders_are_replaced() {
        let v = vars();
        let out = substitute("http://${host}:${port}/ws", |n| v.get(n).cloned()).unwrap();
        assert_eq!(out, "http://localhost:8088/ws");
    }

    #[test]
    fn test_unknown_placeholders_are_kept() {
        let v = vars();
        let out = substitute("<id>${#TestCase#id}</id>", |n| v.get(n).cloned()).unwrap();
        assert_eq!(out, "<id>${#TestCase#id}</id>");
    }

    #[test]
    fn test_unterminated_placeholder_fails() {
        let err = substitute("<a>${host</a>", |_| None).unwrap_err();
        assert!(matches!(err, ParseError::Substitution(_)));
    }

    #[test]
    fn test_invalid_name_fails() {
        assert!(substitute("${}", |_| None).is_err());
        assert!(substitute("${a b}", |_| None).is_err());
    }

    #[test]
    fn test_unterminated_after_valid_placeholder_fails() {
        let v = vars();
        let err = substitute("${host} and ${port", |n| v.get(n).cloned()).unwrap_err();
        assert!(matches!(err, ParseError::Substitution(msg) if msg.contains("${port")));
    }

    #[test]
    fn test_replacement_values_are_inserted_literally() {
        let out = substitute("${a}", |_| Some("$1 ${b}".to_string())).unwrap();
        assert_eq!(out, "$1 ${b}");
    }

    #[test]
    fn test_text_without_placeholders_is_unchanged() {
        let text = "<project name=\"p\">$ {not one}</project>";
        assert_eq!(substitute(text, |_| None).unwrap(), text);
    }
}
