//! Request drafts - what a presentation layer assembles before sending

use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use crate::error::{Error, Result};
use crate::models::{Headers, HistoryEntry, NewRequest, SavedRequest, Template};

/// An unsent request as typed by the user. Header and body text may still
/// hold `{{NAME}}` tokens.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestDraft {
    pub method: String,
    pub url: String,
    /// JSON object text; empty means no headers
    pub headers: String,
    pub body: Option<String>,
    pub params: Option<BTreeMap<String, String>>,
    /// Falls back to the configured timeout when `None`
    pub timeout_seconds: Option<u64>,
}

impl Default for RequestDraft {
    fn default() -> Self {
        RequestDraft::new("GET", "")
    }
}

impl RequestDraft {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        RequestDraft {
            method: method.into(),
            url: url.into(),
            headers: String::new(),
            body: None,
            params: None,
            timeout_seconds: None,
        }
    }

    pub fn with_headers(mut self, headers: impl Into<String>) -> Self {
        self.headers = headers.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Fields for saving this draft as a template or collection entry
    pub fn to_new_request(&self, name: impl Into<String>) -> NewRequest {
        NewRequest {
            name: name.into(),
            method: self.method.clone(),
            url: self.url.clone(),
            headers: Some(self.headers.clone()).filter(|h| !h.trim().is_empty()),
            body: self.body.clone().filter(|b| !b.is_empty()),
        }
    }

    fn from_stored(method: &str, url: &str, headers: &Option<String>, body: &Option<String>) -> Self {
        RequestDraft {
            method: method.to_string(),
            url: url.to_string(),
            headers: headers.clone().unwrap_or_default(),
            body: body.clone().filter(|b| !b.is_empty()),
            params: None,
            timeout_seconds: None,
        }
    }
}

impl From<&Template> for RequestDraft {
    fn from(t: &Template) -> Self {
        RequestDraft::from_stored(&t.method, &t.url, &t.headers, &t.body)
    }
}

impl From<&SavedRequest> for RequestDraft {
    fn from(r: &SavedRequest) -> Self {
        RequestDraft::from_stored(&r.method, &r.url, &r.headers, &r.body)
    }
}

/// Re-running a past request sends what was actually sent
impl From<&HistoryEntry> for RequestDraft {
    fn from(h: &HistoryEntry) -> Self {
        RequestDraft::from_stored(&h.method, &h.url, &h.headers, &h.body)
    }
}

/// Parse header text into a flat mapping.
///
/// Empty text means no headers. Anything but a JSON object of scalar values
/// is `Validation("invalid headers")`, as are names that differ only in case,
/// since only one of them could go on the wire.
pub fn parse_headers(text: &str) -> Result<Headers> {
    if text.trim().is_empty() {
        return Ok(Headers::new());
    }

    let object = match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => object,
        _ => return Err(Error::validation("invalid headers")),
    };

    let mut seen = HashSet::with_capacity(object.len());
    object
        .into_iter()
        .map(|(key, value)| {
            if !seen.insert(key.trim().to_ascii_lowercase()) {
                return Err(Error::validation("invalid headers"));
            }
            match value {
                Value::String(s) => Ok((key, s)),
                Value::Number(n) => Ok((key, n.to_string())),
                Value::Bool(b) => Ok((key, b.to_string())),
                _ => Err(Error::validation("invalid headers")),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_parse_headers() {
        let headers =
            parse_headers(r#"{"Accept": "application/json", "X-Retry": 3, "X-Debug": false}"#)
                .unwrap();
        assert_eq!(headers["Accept"], "application/json");
        assert_eq!(headers["X-Retry"], "3");
        assert_eq!(headers["X-Debug"], "false");
        assert!(parse_headers("  ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_headers_rejects_non_objects() {
        for bad in ["{oops", "[1]", r#""text""#, r#"{"X": {"nested": 1}}"#, r#"{"X": null}"#] {
            let err = parse_headers(bad).unwrap_err();
            assert_eq!(err.to_string(), "validation error: invalid headers", "{}", bad);
        }
    }

    #[test]
    fn test_parse_headers_rejects_names_differing_in_case() {
        let err = parse_headers(r#"{"X-A": "1", "x-a": "2"}"#).unwrap_err();
        assert_eq!(err.to_string(), "validation error: invalid headers");
        assert_eq!(parse_headers(r#"{"X-A": "1", "X-B": "2"}"#).unwrap().len(), 2);
    }

    #[test]
    fn test_draft_from_history_entry() {
        let entry = HistoryEntry {
            id: 1,
            method: "POST".into(),
            url: "https://a/b".into(),
            headers: Some(r#"{"X": "1"}"#.into()),
            body: Some(String::new()),
            response_code: Some(201),
            response_body: None,
            created_at: Utc::now(),
        };
        let draft = RequestDraft::from(&entry);
        assert_eq!(draft.method, "POST");
        assert_eq!(draft.headers, r#"{"X": "1"}"#);
        assert_eq!(draft.body, None);
    }

    #[test]
    fn test_to_new_request_drops_empty_fields() {
        let draft = RequestDraft::new("GET", "https://a").with_param("q", "1");
        let saved = draft.to_new_request("search");
        assert_eq!(saved.name, "search");
        assert_eq!(saved.headers, None);
        assert_eq!(saved.body, None);
        assert_eq!(draft.params.unwrap()["q"], "1");
    }
}
