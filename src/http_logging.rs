use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossterm::style::Stylize;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use tracing::debug;
use url::Url;

const MAX_BODY_PREVIEW_LENGTH: usize = 4000;

/// HTTP client wrapper that mirrors every request and response into the
/// debug log, and onto stderr when request logging is switched on
#[derive(Clone)]
pub struct LoggingClient {
    client: reqwest::Client,
    echo_to_stderr: bool,
    request_counter: Arc<AtomicU64>,
}

impl LoggingClient {
    pub fn new(echo_to_stderr: bool) -> Self {
        Self {
            client: reqwest::Client::new(),
            echo_to_stderr,
            request_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Issues a GET request and returns the response body as text.
    /// Non-success statuses come back as errors after being logged.
    pub async fn get_text(&self, url: Url) -> Result<String, Box<dyn Error + Send + Sync>> {
        let request_id = self.next_request_id();
        let request = self.client.get(url.clone()).build()?;

        self.emit(&request_id, &format!("→ GET {url}"));
        self.emit(
            &request_id,
            &format!("Request Headers: {}", headers_as_json(request.headers())),
        );

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                self.emit(&request_id, &format!("✖ Request failed: {err}"));
                return Err(err.into());
            }
        };

        let status = response.status();
        let reason = status.canonical_reason().unwrap_or("");
        self.emit(
            &request_id,
            format!("← {} {reason}", status.as_u16()).trim(),
        );
        self.emit(
            &request_id,
            &format!("Response Headers: {}", headers_as_json(response.headers())),
        );

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.text().await?;

        match body_preview(content_type.as_deref(), &body) {
            Some(preview) => self.emit(&request_id, &format!("Response Body:\n{preview}")),
            None => self.emit(&request_id, "Response Body: <not logged>"),
        }

        if !status.is_success() {
            return Err(format!("{url} responded with {status}").into());
        }
        Ok(body)
    }

    fn next_request_id(&self) -> String {
        let id = self
            .request_counter
            .fetch_add(1, Ordering::Relaxed)
            .wrapping_add(1);
        format!("{id:04}")
    }

    fn emit(&self, request_id: &str, message: &str) {
        let prefix = format!("[HTTP {request_id}]");
        debug!("{prefix} {message}");
        if self.echo_to_stderr {
            eprintln!("{} {message}", prefix.as_str().cyan());
        }
    }
}

/// Headers rendered as a pretty-printed JSON object; repeated header names
/// collapse into one comma-separated value
fn headers_as_json(headers: &HeaderMap) -> String {
    let mut map = serde_json::Map::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        match map.get_mut(name.as_str()) {
            Some(serde_json::Value::String(existing)) => {
                existing.push_str(", ");
                existing.push_str(&value);
            }
            _ => {
                map.insert(name.as_str().to_string(), serde_json::Value::String(value));
            }
        }
    }
    serde_json::to_string_pretty(&map).unwrap_or_else(|_| "{}".to_string())
}

/// Preview of a response body for the log: text-like content only, JSON
/// pretty-printed, long bodies truncated
fn body_preview(content_type: Option<&str>, body: &str) -> Option<String> {
    if !is_text_like(content_type) {
        return None;
    }
    if body.is_empty() {
        return Some("<empty>".to_string());
    }
    if content_type.is_some_and(|value| value.contains("application/json"))
        && let Ok(parsed) = serde_json::from_str::<serde_json::Value>(body)
        && let Ok(formatted) = serde_json::to_string_pretty(&parsed)
    {
        return Some(truncate_body(&formatted));
    }
    Some(truncate_body(body))
}

fn is_text_like(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return true;
    };
    let normalized = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    if normalized.is_empty() {
        return true;
    }
    normalized.starts_with("text/")
        || normalized.contains("json")
        || normalized.contains("xml")
        || normalized == "application/x-www-form-urlencoded"
        || normalized == "application/graphql"
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_BODY_PREVIEW_LENGTH {
        return body.to_string();
    }
    let mut cut = MAX_BODY_PREVIEW_LENGTH;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    let hidden = body.len() - cut;
    format!("{}… [truncated {hidden} characters]", &body[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_zero_padded_and_increment() {
        let client = LoggingClient::new(false);
        assert_eq!(client.next_request_id(), "0001");
        assert_eq!(client.next_request_id(), "0002");
    }

    #[test]
    fn test_text_like_content_types() {
        assert!(is_text_like(None));
        assert!(is_text_like(Some("text/plain; charset=utf-8")));
        assert!(is_text_like(Some("application/json")));
        assert!(is_text_like(Some("application/vnd.npm.install-v1+json")));
        assert!(is_text_like(Some("application/xml")));
        assert!(!is_text_like(Some("application/octet-stream")));
        assert!(!is_text_like(Some("image/png")));
    }

    #[test]
    fn test_binary_bodies_are_not_previewed() {
        assert_eq!(body_preview(Some("application/octet-stream"), "data"), None);
    }

    #[test]
    fn test_empty_body_preview() {
        assert_eq!(
            body_preview(Some("application/json"), "").as_deref(),
            Some("<empty>")
        );
    }

    #[test]
    fn test_json_bodies_are_pretty_printed() {
        let preview = body_preview(Some("application/json"), r#"{"version":"1.2.3"}"#).unwrap();
        assert_eq!(preview, "{\n  \"version\": \"1.2.3\"\n}");
    }

    #[test]
    fn test_malformed_json_falls_back_to_raw_text() {
        let preview = body_preview(Some("application/json"), "{not json").unwrap();
        assert_eq!(preview, "{not json");
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "x".repeat(MAX_BODY_PREVIEW_LENGTH + 123);
        let preview = truncate_body(&body);
        assert!(preview.ends_with("… [truncated 123 characters]"));
        assert!(preview.starts_with(&"x".repeat(64)));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        // 'é' is two bytes; an odd limit would split it without the guard
        let body = "é".repeat(MAX_BODY_PREVIEW_LENGTH);
        let preview = truncate_body(&body);
        assert!(preview.contains("[truncated"));
    }

    #[test]
    fn test_headers_merge_repeated_names() {
        let mut headers = HeaderMap::new();
        headers.append("x-trace", "a".parse().unwrap());
        headers.append("x-trace", "b".parse().unwrap());
        let rendered = headers_as_json(&headers);
        assert!(rendered.contains("\"x-trace\": \"a, b\""));
    }
}
