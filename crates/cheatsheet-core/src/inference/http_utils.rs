//! HTTP utilities for inference clients
//!
//! Provides common HTTP request/response handling shared by the
//! completion and recognition clients.

use crate::config::{get_inference_http_timeout_secs, InferenceCredentials};
use crate::inference::InferenceError;
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::time::Duration;

/// Maximum number of characters of an error body kept in `ApiError`
const ERROR_BODY_LIMIT: usize = 500;

/// Creates an HTTP client configured with the standard inference timeout.
///
/// Uses `INFERENCE_HTTP_TIMEOUT_SECS` environment variable or 30s default.
///
/// # Errors
///
/// Returns `InferenceError::NetworkError` if the client cannot be built.
pub fn create_http_client() -> Result<HttpClient, InferenceError> {
    create_http_client_with_timeout(Duration::from_secs(get_inference_http_timeout_secs()))
}

/// Creates an HTTP client with an explicit request timeout.
///
/// # Errors
///
/// Returns `InferenceError::NetworkError` if the client cannot be built.
pub fn create_http_client_with_timeout(timeout: Duration) -> Result<HttpClient, InferenceError> {
    HttpClient::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| InferenceError::NetworkError(format!("failed to build HTTP client: {e}")))
}

/// Authorization and folder headers expected by the inference services
#[must_use]
pub fn auth_headers(credentials: &InferenceCredentials) -> [(&'static str, String); 2] {
    [
        ("Authorization", format!("Api-Key {}", credentials.api_key)),
        ("x-folder-id", credentials.folder_id.clone()),
    ]
}

/// Sends an HTTP POST request with JSON body and returns parsed JSON response.
///
/// # Errors
///
/// Returns `InferenceError::Timeout` when the client timeout expires,
/// `InferenceError::NetworkError` on other connectivity issues,
/// `InferenceError::ApiError` on non-success status codes,
/// or `InferenceError::JsonError` if parsing fails.
pub async fn send_json_request(
    client: &HttpClient,
    url: &str,
    body: &Value,
    headers: &[(&str, String)],
) -> Result<Value, InferenceError> {
    let mut request = client.post(url).json(body);

    for (key, value) in headers {
        request = request.header(*key, value.as_str());
    }

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            InferenceError::Timeout(e.to_string())
        } else {
            InferenceError::NetworkError(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(InferenceError::ApiError(describe_error_body(
            status,
            &error_text,
        )));
    }

    response
        .json()
        .await
        .map_err(|e| InferenceError::JsonError(e.to_string()))
}

fn describe_error_body(status: reqwest::StatusCode, error_text: &str) -> String {
    let trimmed = error_text.trim_start();
    // Proxies in front of the API answer with HTML pages
    let is_html = trimmed.starts_with("<!DOCTYPE")
        || trimmed.starts_with("<html")
        || trimmed.starts_with("<HTML");

    if is_html {
        return format!("{status} (Server returned HTML error page)");
    }

    if error_text.chars().count() > ERROR_BODY_LIMIT {
        let cut: String = error_text.chars().take(ERROR_BODY_LIMIT).collect();
        format!("{status} - {cut}... (truncated)")
    } else {
        format!("{status} - {error_text}")
    }
}

/// Extracts text content from a JSON response by navigating a path.
///
/// Numeric segments index into arrays, other segments are object keys.
///
/// ```ignore
/// let text = extract_text_content(&response, &["result", "alternatives", "0", "message", "text"])?;
/// ```
///
/// # Errors
///
/// Returns `InferenceError::MalformedResponse` if the path is missing or the
/// target is not a string.
pub fn extract_text_content(response: &Value, path: &[&str]) -> Result<String, InferenceError> {
    let mut current = response;

    for segment in path {
        let next = match segment.parse::<usize>() {
            Ok(index) => current.get(index),
            Err(_) => current.get(*segment),
        };
        current = next.ok_or_else(|| {
            InferenceError::MalformedResponse(format!(
                "missing `{segment}` in path {}",
                path.join(".")
            ))
        })?;
    }

    current.as_str().map(ToString::to_string).ok_or_else(|| {
        InferenceError::MalformedResponse(format!(
            "expected string at {}, got: {current}",
            path.join(".")
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_text_content_walks_arrays() {
        let response = json!({
            "result": {"alternatives": [{"message": {"role": "assistant", "text": "42"}}]}
        });
        let text = extract_text_content(
            &response,
            &["result", "alternatives", "0", "message", "text"],
        )
        .expect("path exists");
        assert_eq!(text, "42");
    }

    #[test]
    fn test_extract_text_content_missing_index() {
        let response = json!({"result": {"alternatives": []}});
        let err = extract_text_content(
            &response,
            &["result", "alternatives", "0", "message", "text"],
        )
        .expect_err("empty alternatives");
        assert!(matches!(err, InferenceError::MalformedResponse(msg) if msg.contains("`0`")));
    }

    #[test]
    fn test_extract_text_content_non_string() {
        let response = json!({"result": {"textAnnotation": {"fullText": 7}}});
        let err = extract_text_content(&response, &["result", "textAnnotation", "fullText"])
            .expect_err("number is not text");
        assert!(matches!(err, InferenceError::MalformedResponse(_)));
    }

    #[test]
    fn test_describe_error_body_hides_html() {
        let msg = describe_error_body(
            reqwest::StatusCode::BAD_GATEWAY,
            "<html><body>bad gateway</body></html>",
        );
        assert!(msg.contains("HTML error page"));
        assert!(!msg.contains("<body>"));
    }

    #[test]
    fn test_describe_error_body_truncates() {
        let long = "x".repeat(ERROR_BODY_LIMIT + 10);
        let msg = describe_error_body(reqwest::StatusCode::BAD_REQUEST, &long);
        assert!(msg.ends_with("(truncated)"));
    }

    #[test]
    fn test_auth_headers() {
        let headers = auth_headers(&InferenceCredentials {
            api_key: "k".to_string(),
            folder_id: "f".to_string(),
        });
        assert_eq!(headers[0], ("Authorization", "Api-Key k".to_string()));
        assert_eq!(headers[1], ("x-folder-id", "f".to_string()));
    }
}
