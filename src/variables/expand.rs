//! `{{NAME}}` token substitution

use regex::Regex;
use std::sync::OnceLock;

use crate::models::Variables;

enum Piece<'v> {
    Raw(String),
    Value(&'v str),
}

fn token_for(key: &str) -> String {
    format!("{{{{{}}}}}", key)
}

/// Substitutes `{{KEY}}` tokens with values from `variables`.
///
/// Keys are applied in the mapping's iteration order. Text produced by a
/// substitution is never scanned again, so a value containing `{{OTHER}}`
/// comes out verbatim. Unknown tokens are left in place.
pub fn expand(text: &str, variables: &Variables) -> String {
    if text.is_empty() || variables.is_empty() || !text.contains("{{") {
        return text.to_string();
    }

    let mut pieces = vec![Piece::Raw(text.to_string())];
    for (key, value) in variables {
        let token = token_for(key);
        let mut next = Vec::with_capacity(pieces.len());
        for piece in pieces {
            match piece {
                Piece::Raw(raw) if raw.contains(&token) => {
                    let mut parts = raw.split(token.as_str()).peekable();
                    while let Some(part) = parts.next() {
                        if !part.is_empty() {
                            next.push(Piece::Raw(part.to_string()));
                        }
                        if parts.peek().is_some() {
                            next.push(Piece::Value(value.as_str()));
                        }
                    }
                }
                other => next.push(other),
            }
        }
        pieces = next;
    }

    pieces
        .iter()
        .map(|piece| match piece {
            Piece::Raw(raw) => raw.as_str(),
            Piece::Value(value) => *value,
        })
        .collect()
}

/// [`expand`] for optional text fields; `None` stays `None`
pub fn expand_opt(text: Option<&str>, variables: &Variables) -> Option<String> {
    text.map(|t| expand(t, variables))
}

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("token pattern is valid"))
}

/// Names of `{{NAME}}` tokens present in `text`, first occurrence order
pub fn unresolved_tokens(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in token_regex().captures_iter(text) {
        let name = caps[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitutes_known_token() {
        let v = vars(&[("API_URL", "https://example.com")]);
        assert_eq!(expand("{{API_URL}}/users", &v), "https://example.com/users");
    }

    #[test]
    fn test_unknown_token_is_left_verbatim() {
        assert_eq!(expand("{{X}}", &Variables::new()), "{{X}}");
        let v = vars(&[("A", "1")]);
        assert_eq!(expand("{{A}}-{{B}}", &v), "1-{{B}}");
    }

    #[test]
    fn test_every_occurrence_is_replaced() {
        let v = vars(&[("ID", "42")]);
        assert_eq!(expand("/{{ID}}/items/{{ID}}", &v), "/42/items/42");
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        // "A" sorts before "B", so B's token inside A's value must survive.
        let v = vars(&[("A", "{{B}}"), ("B", "x")]);
        assert_eq!(expand("{{A}} {{B}}", &v), "{{B}} x");
    }

    #[test]
    fn test_overlapping_tokens_first_key_wins() {
        // "A" sorts before "A}}{{B", so it claims the span first and the
        // longer token no longer matches anything.
        let v = vars(&[("A}}{{B", "J"), ("A", "a")]);
        assert_eq!(expand("{{A}}{{B}}", &v), "a{{B}}");

        let v = vars(&[("A}}{{B", "J")]);
        assert_eq!(expand("{{A}}{{B}}", &v), "J");
    }

    #[test]
    fn test_expansion_is_idempotent() {
        let v = vars(&[("HOST", "api.local"), ("TOKEN", "abc")]);
        let text = r#"{"Authorization": "Bearer {{TOKEN}}", "Host": "{{HOST}}", "X": "{{MISSING}}"}"#;
        let once = expand(text, &v);
        assert_eq!(expand(&once, &v), once);
    }

    #[test]
    fn test_empty_input_is_unchanged() {
        let v = vars(&[("A", "1")]);
        assert_eq!(expand("", &v), "");
        assert_eq!(expand_opt(None, &v), None);
        assert_eq!(expand_opt(Some("{{A}}"), &v), Some("1".to_string()));
    }

    #[test]
    fn test_unresolved_tokens() {
        assert_eq!(
            unresolved_tokens("{{A}}/{{B}}/{{A}} {{}}"),
            vec!["A".to_string(), "B".to_string()]
        );
        assert!(unresolved_tokens("no tokens").is_empty());
    }
}
