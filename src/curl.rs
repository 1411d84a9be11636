use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value};

use crate::app::{parse_headers, RequestDraft};
use crate::models::HttpMethod;

/// Parse a cURL command into a draft
pub fn parse_curl(input: &str) -> Result<RequestDraft> {
    let mut draft = RequestDraft::default();
    let mut headers = Map::new();
    let mut explicit_method = false;

    // Remove line continuations and normalize
    let normalized = input.replace("\\\r\n", " ").replace("\\\n", " ");

    let mut tokens = tokenize(&normalized)?;

    // Skip 'curl' command if present
    if tokens.first().map(|s| s.as_str()) == Some("curl") {
        tokens.remove(0);
    }

    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];

        match token.as_str() {
            "-X" | "--request" => {
                let value = tokens.get(i + 1).context("-X needs a method")?;
                let method: HttpMethod = value.parse()?;
                draft.method = method.as_str().to_string();
                explicit_method = true;
                i += 1;
            }
            "-H" | "--header" => {
                let value = tokens.get(i + 1).context("-H needs a header")?;
                let (key, value) = parse_header(value)?;
                // Don't add duplicate headers
                if !headers.keys().any(|k| k.eq_ignore_ascii_case(&key)) {
                    headers.insert(key, Value::String(value));
                }
                i += 1;
            }
            "-d" | "--data" | "--data-raw" | "--data-binary" => {
                let value = tokens.get(i + 1).context("-d needs a body")?;
                draft.body = Some(value.clone());
                i += 1;
            }
            "--compressed" | "-k" | "--insecure" | "-L" | "--location" | "-s" | "--silent"
            | "-v" | "--verbose" => {
                // Ignored flags
            }
            _ => {
                if !token.starts_with('-')
                    && (token.starts_with("http://") || token.starts_with("https://") || token.starts_with("{{"))
                {
                    draft.url = token.clone();
                }
            }
        }
        i += 1;
    }

    // Infer POST when data is given without a method
    if draft.body.is_some() && !explicit_method {
        draft.method = HttpMethod::POST.as_str().to_string();
    }
    if draft.url.is_empty() {
        return Err(anyhow!("No URL found in curl command"));
    }
    if !headers.is_empty() {
        draft.headers = serde_json::to_string_pretty(&Value::Object(headers))?;
    }

    Ok(draft)
}

fn parse_header(s: &str) -> Result<(String, String)> {
    match s.split_once(':') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(anyhow!("Invalid header format: {}", s)),
    }
}

/// Tokenize a curl command, respecting quotes
fn tokenize(input: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escape_next = false;

    for c in input.chars() {
        if escape_next {
            current.push(c);
            escape_next = false;
            continue;
        }

        match c {
            '\\' if !in_single_quote => {
                escape_next = true;
            }
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
            }
            ' ' | '\t' | '\n' | '\r' if !in_single_quote && !in_double_quote => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => {
                current.push(c);
            }
        }
    }

    if in_single_quote || in_double_quote {
        return Err(anyhow!("Unterminated quote in curl command"));
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    Ok(tokens)
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Format a draft as a cURL command. Header text that is not a JSON object
/// is left out.
pub fn to_curl(draft: &RequestDraft) -> String {
    let mut parts = vec!["curl".to_string()];

    // Method
    let method = draft.method.trim().to_uppercase();
    if method != "GET" && !method.is_empty() {
        parts.push(format!("-X {}", method));
    }

    // URL, with query params when it parses
    let url = match &draft.params {
        Some(params) if !params.is_empty() => reqwest::Url::parse_with_params(&draft.url, params)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| draft.url.clone()),
        _ => draft.url.clone(),
    };
    parts.push(quote(&url));

    // Headers
    if let Ok(headers) = parse_headers(&draft.headers) {
        for (key, value) in headers {
            parts.push(format!("-H {}", quote(&format!("{}: {}", key, value))));
        }
    }

    // Body
    if let Some(body) = draft.body.as_ref().filter(|b| !b.is_empty()) {
        parts.push(format!("-d {}", quote(body)));
    }

    parts.join(" \\\n  ")
}
