use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;

/// Flat variable mapping of an environment
pub type Variables = BTreeMap<String, String>;

/// Header mapping as sent on the wire
pub type Headers = BTreeMap<String, String>;

/// HTTP Method enum
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
    HEAD,
    OPTIONS,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::GET,
        HttpMethod::POST,
        HttpMethod::PUT,
        HttpMethod::PATCH,
        HttpMethod::DELETE,
        HttpMethod::HEAD,
        HttpMethod::OPTIONS,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OPTIONS => "OPTIONS",
        }
    }

    /// Whether the verb conventionally carries a payload.
    ///
    /// Only a hint for editors; the dispatcher sends whatever body it is given.
    pub fn has_body(&self) -> bool {
        matches!(
            self,
            HttpMethod::POST | HttpMethod::PUT | HttpMethod::PATCH | HttpMethod::DELETE
        )
    }

    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::GET => reqwest::Method::GET,
            HttpMethod::POST => reqwest::Method::POST,
            HttpMethod::PUT => reqwest::Method::PUT,
            HttpMethod::PATCH => reqwest::Method::PATCH,
            HttpMethod::DELETE => reqwest::Method::DELETE,
            HttpMethod::HEAD => reqwest::Method::HEAD,
            HttpMethod::OPTIONS => reqwest::Method::OPTIONS,
        }
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == upper)
            .ok_or_else(|| Error::validation(format!("unsupported method: {}", s.trim())))
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named set of variables used for `{{NAME}}` substitution.
///
/// `variables_json` is kept exactly as written; [`Environment::variables`]
/// parses it leniently.
#[derive(Clone, Debug, PartialEq)]
pub struct Environment {
    pub id: i64,
    pub name: String,
    pub variables_json: String,
    pub created_at: DateTime<Utc>,
}

impl Environment {
    /// Parsed variable mapping; malformed JSON yields an empty mapping
    pub fn variables(&self) -> Variables {
        crate::variables::parse_variables(&self.variables_json)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.variables().remove(key)
    }
}

/// A reusable request draft, independent of any collection
#[derive(Clone, Debug, PartialEq)]
pub struct Template {
    pub id: i64,
    pub name: String,
    pub method: String,
    pub url: String,
    pub headers: Option<String>,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A named group of saved requests
#[derive(Clone, Debug, PartialEq)]
pub struct Collection {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Resolved by query when the collection is read
    pub requests: Vec<SavedRequest>,
}

/// A request stored inside a collection
#[derive(Clone, Debug, PartialEq)]
pub struct SavedRequest {
    pub id: i64,
    pub collection_id: i64,
    pub name: String,
    pub method: String,
    pub url: String,
    pub headers: Option<String>,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new template or saved request
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewRequest {
    pub name: String,
    pub method: String,
    pub url: String,
    pub headers: Option<String>,
    pub body: Option<String>,
}

impl NewRequest {
    pub fn new(name: impl Into<String>, method: impl Into<String>, url: impl Into<String>) -> Self {
        NewRequest {
            name: name.into(),
            method: method.into(),
            url: url.into(),
            headers: None,
            body: None,
        }
    }

    pub fn with_headers(mut self, headers: impl Into<String>) -> Self {
        self.headers = Some(headers.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Partial update for templates and saved requests; `None` leaves a field alone
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestUpdate {
    pub name: Option<String>,
    pub method: Option<String>,
    pub url: Option<String>,
    pub headers: Option<String>,
    pub body: Option<String>,
}

impl RequestUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.method.is_none()
            && self.url.is_none()
            && self.headers.is_none()
            && self.body.is_none()
    }
}

/// History entry, immutable once written
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub id: i64,
    pub method: String,
    pub url: String,
    pub headers: Option<String>,
    pub body: Option<String>,
    pub response_code: Option<u16>,
    pub response_body: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields of a history entry before it is written
#[derive(Clone, Debug, PartialEq)]
pub struct NewHistoryEntry {
    pub method: String,
    pub url: String,
    pub headers: Option<String>,
    pub body: Option<String>,
    pub response_code: Option<u16>,
    pub response_body: Option<String>,
}

/// A fully resolved outbound request
#[derive(Clone, Debug, PartialEq)]
pub struct RequestSpec {
    pub method: String,
    pub url: String,
    pub headers: Headers,
    pub body: Option<String>,
    pub params: Option<BTreeMap<String, String>>,
    pub timeout_seconds: u64,
}

impl RequestSpec {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        RequestSpec {
            method: method.into(),
            url: url.into(),
            headers: Headers::new(),
            body: None,
            params: None,
            timeout_seconds: crate::constants::DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Response from HTTP request
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseRecord {
    pub status_code: u16,
    pub status_text: String,
    pub headers: Headers,
    pub body_text: String,
    pub elapsed: Duration,
}

impl ResponseRecord {
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// "200 OK", or just the code for non-standard statuses
    pub fn status_line(&self) -> String {
        if self.status_text.is_empty() {
            self.status_code.to_string()
        } else {
            format!("{} {}", self.status_code, self.status_text)
        }
    }

    pub fn headers_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.headers).unwrap_or_else(|_| format!("{:?}", self.headers))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Pretty-print JSON bodies; anything else passes through untouched
pub fn format_body(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => serde_json::to_string_pretty(&json).unwrap_or_else(|_| body.to_string()),
        Err(_) => body.to_string(),
    }
}
