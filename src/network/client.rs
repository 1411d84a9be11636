//! HTTP dispatcher - executes resolved requests over one pooled client

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::models::{Headers, HttpMethod, RequestSpec, ResponseRecord};

/// Create an HTTP client with default configuration.
///
/// Timeouts are applied per request, so the client itself carries none.
pub fn create_client(user_agent: &str) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Executes [`RequestSpec`]s against the network.
///
/// Holds a single connection-pooling client shared by every call; no
/// per-request state lives on it. Cloning is cheap and clones share the pool.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    client: reqwest::Client,
}

impl Dispatcher {
    pub fn new(user_agent: &str) -> Self {
        Dispatcher {
            client: create_client(user_agent),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Dispatcher { client }
    }

    /// Send one request and capture the full response.
    ///
    /// Any HTTP status is a successful call. Only bad input (`Validation`),
    /// transport failures (`Network`) and the wall-clock bound (`Timeout`)
    /// are errors. Nothing is retried.
    pub async fn execute(&self, spec: &RequestSpec) -> Result<ResponseRecord> {
        let method: HttpMethod = spec.method.parse()?;
        let url = reqwest::Url::parse(spec.url.trim())
            .map_err(|e| Error::validation(format!("invalid url: {}", e)))?;
        let headers = build_header_map(&spec.headers)?;

        let mut req_builder = self
            .client
            .request(method.to_reqwest(), url)
            .headers(headers)
            .timeout(spec.timeout());
        if let Some(params) = &spec.params {
            req_builder = req_builder.query(params);
        }
        if let Some(body) = spec.body.as_ref().filter(|b| !b.is_empty()) {
            req_builder = req_builder.body(body.clone());
        }

        tracing::info!(method = %method, url = %spec.url, "Dispatching request");
        let start = Instant::now();
        let outcome = tokio::time::timeout(spec.timeout(), read_response(req_builder)).await;
        let elapsed = start.elapsed();

        let (status, headers, body) = match outcome {
            Ok(Ok(parts)) => parts,
            Ok(Err(e)) if e.is_timeout() => {
                tracing::warn!(url = %spec.url, "Request timed out");
                return Err(Error::Timeout {
                    seconds: spec.timeout_seconds,
                });
            }
            Ok(Err(e)) => {
                tracing::warn!(url = %spec.url, error = %e, "Request failed");
                return Err(Error::Network(e));
            }
            Err(_) => {
                tracing::warn!(url = %spec.url, "Request timed out");
                return Err(Error::Timeout {
                    seconds: spec.timeout_seconds,
                });
            }
        };

        tracing::info!(
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis() as u64,
            bytes = body.len(),
            "Request completed"
        );

        Ok(ResponseRecord {
            status_code: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body_text: body,
            elapsed,
        })
    }
}

/// Send and read the whole body, so elapsed time covers the body too.
/// The body is decoded using the charset in `Content-Type`, UTF-8 otherwise.
async fn read_response(
    req_builder: reqwest::RequestBuilder,
) -> std::result::Result<(reqwest::StatusCode, Headers, String), reqwest::Error> {
    let resp = req_builder.send().await?;
    let status = resp.status();
    let headers = collect_headers(resp.headers());
    let body = resp.text().await?;
    Ok((status, headers, body))
}

fn build_header_map(headers: &Headers) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.trim().as_bytes())
            .map_err(|_| Error::validation(format!("invalid header name: {}", key)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| Error::validation(format!("invalid value for header {}", key)))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Response headers as a flat mapping; repeated names are joined with ", "
fn collect_headers(headers: &HeaderMap) -> Headers {
    let mut out = Headers::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        out.entry(name.as_str().to_string())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_map_rejects_bad_names() {
        let mut headers = Headers::new();
        headers.insert("X-Ok".into(), "1".into());
        assert_eq!(build_header_map(&headers).unwrap().len(), 1);

        headers.insert("bad header".into(), "1".into());
        assert!(build_header_map(&headers).unwrap_err().is_validation());
    }

    #[test]
    fn test_repeated_response_headers_are_joined() {
        let mut map = HeaderMap::new();
        map.append("set-cookie", HeaderValue::from_static("a=1"));
        map.append("set-cookie", HeaderValue::from_static("b=2"));
        map.insert("content-type", HeaderValue::from_static("text/plain"));
        let headers = collect_headers(&map);
        assert_eq!(headers["set-cookie"], "a=1, b=2");
        assert_eq!(headers["content-type"], "text/plain");
    }

    #[tokio::test]
    async fn test_invalid_input_never_dispatches() {
        let dispatcher = Dispatcher::new("test");
        let err = dispatcher
            .execute(&RequestSpec::new("BREW", "http://127.0.0.1:9/"))
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let err = dispatcher
            .execute(&RequestSpec::new("get", "not a url"))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }
}
