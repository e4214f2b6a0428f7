//! Gemini adapter for the review port.
//!
//! Talks to the `generateContent` REST endpoint with structured-output mode:
//! temperature 0, a JSON response MIME type, and a response schema matching
//! the diagnostics array. That combination eliminates markdown-wrapped and
//! conversational replies, so the response body parses directly.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::report::Diagnostic;

use super::{ReviewClient, ReviewError};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-3-pro";

const MAX_ATTEMPTS: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Production [`ReviewClient`] for the Gemini API.
pub struct GeminiClient {
    api_key: SecretString,
    model: String,
    base_url: String,
    http: reqwest::Client,
}

impl GeminiClient {
    /// Create a client. An empty model selects the default. The key must be
    /// non-empty; callers validate before construction.
    #[must_use]
    pub fn new(api_key: SecretString, model: &str) -> Self {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    /// Create a client against an explicit API base URL (tests point this at
    /// a local server).
    #[must_use]
    pub fn with_base_url(api_key: SecretString, model: &str, base_url: &str) -> Self {
        let model = if model.is_empty() { DEFAULT_MODEL } else { model };
        Self {
            api_key,
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    /// The model identifier used for requests and stamped into diagnostics.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn attempt(&self, prompt: &str) -> Result<String, String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {
                "temperature": 0,
                "responseMimeType": "application/json",
                "responseSchema": diagnostic_schema(),
            },
        });

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|err| err.to_string())?
            .error_for_status()
            .map_err(|err| err.to_string())?;

        response.text().await.map_err(|err| err.to_string())
    }
}

#[async_trait]
impl ReviewClient for GeminiClient {
    async fn review(
        &self,
        cancel: &CancellationToken,
        prompt: &str,
    ) -> Result<Vec<Diagnostic>, ReviewError> {
        tracing::info!(model = %self.model, "starting LLM review");
        let start = std::time::Instant::now();

        let mut backoff = INITIAL_BACKOFF;
        let mut last_err = String::new();

        for attempt in 1..=MAX_ATTEMPTS {
            tracing::debug!(attempt, model = %self.model, "LLM request attempt");

            match self.attempt(prompt).await {
                Ok(body) => {
                    let mut diagnostics = parse_review_response(&body)?;
                    for diag in &mut diagnostics {
                        diag.tool = self.model.clone();
                    }

                    tracing::info!(
                        model = %self.model,
                        issues = diagnostics.len(),
                        duration_ms = start.elapsed().as_millis() as u64,
                        "LLM review complete"
                    );
                    return Ok(diagnostics);
                }
                Err(err) => {
                    tracing::warn!(
                        attempt,
                        error = %err,
                        backoff_secs = backoff.as_secs(),
                        "LLM request failed, retrying"
                    );
                    last_err = err;
                }
            }

            if attempt < MAX_ATTEMPTS {
                tokio::select! {
                    () = cancel.cancelled() => return Err(ReviewError::Cancelled),
                    () = tokio::time::sleep(backoff) => {}
                }
                backoff *= 2;
            }
        }

        Err(ReviewError::Exhausted {
            attempts: MAX_ATTEMPTS,
            last: last_err,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

/// Pull the diagnostics array out of a `generateContent` response body.
fn parse_review_response(body: &str) -> Result<Vec<Diagnostic>, ReviewError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(ReviewError::MalformedResponse)?;

    let text = response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .and_then(|c| c.parts.first())
        .map(|p| p.text.as_str())
        .filter(|t| !t.is_empty())
        .ok_or(ReviewError::EmptyResponse)?;

    serde_json::from_str(text).map_err(ReviewError::MalformedResponse)
}

/// JSON schema for the diagnostics array, sent as the structured-output
/// response schema.
fn diagnostic_schema() -> serde_json::Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "file": {"type": "STRING", "description": "File path relative to project root"},
                "line": {"type": "INTEGER", "description": "Line number (1-based)"},
                "severity": {"type": "STRING", "enum": ["error", "warning", "info"]},
                "message": {"type": "STRING", "description": "Issue description"},
                "hint": {"type": "STRING", "description": "Actionable fix suggestion"},
            },
            "required": ["file", "line", "severity", "message"],
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Severity;

    fn wrap(text: &str) -> String {
        json!({
            "candidates": [{"content": {"parts": [{"text": text}]}}]
        })
        .to_string()
    }

    #[test]
    fn parses_diagnostics_from_response_text() {
        let text = r#"[{"file":"a.go","line":3,"severity":"warning","message":"shadowed var"}]"#;
        let diags = parse_review_response(&wrap(text)).unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].file, "a.go");
        assert_eq!(diags[0].line, 3);
        assert_eq!(diags[0].severity, Severity::Warning);
    }

    #[test]
    fn clean_review_is_empty_array() {
        let diags = parse_review_response(&wrap("[]")).unwrap();
        assert!(diags.is_empty());
    }

    #[test]
    fn missing_candidates_is_empty_response() {
        let err = parse_review_response(r#"{"candidates": []}"#).unwrap_err();
        assert!(matches!(err, ReviewError::EmptyResponse));
    }

    #[test]
    fn conversational_text_is_malformed() {
        let err = parse_review_response(&wrap("Sure! Here are the issues I found:")).unwrap_err();
        assert!(matches!(err, ReviewError::MalformedResponse(_)));
    }

    #[test]
    fn schema_requires_core_fields() {
        let schema = diagnostic_schema();
        let required = schema["items"]["required"].as_array().unwrap();
        for field in ["file", "line", "severity", "message"] {
            assert!(required.iter().any(|v| v == field), "{field} must be required");
        }
        assert_eq!(schema["items"]["properties"]["severity"]["enum"][0], "error");
    }

    #[test]
    fn empty_model_uses_default() {
        let client = GeminiClient::new(SecretString::new("k".into()), "");
        assert_eq!(client.model(), DEFAULT_MODEL);
    }

    /// Minimal HTTP server answering one request with a canned response.
    /// Returns the base URL and the received request body.
    async fn serve_once(
        status_line: &'static str,
        body: String,
    ) -> (String, tokio::sync::oneshot::Receiver<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (req_tx, req_rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            let request = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length: ").or_else(|| l.strip_prefix("Content-Length: ")))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= header_end + 4 + content_length {
                        break text.into_owned();
                    }
                }
            };
            let _ = req_tx.send(request);

            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        (format!("http://{addr}"), req_rx)
    }

    #[tokio::test]
    async fn review_round_trips_against_a_server() {
        let text = r#"[{"file":"a.go","line":3,"severity":"warning","message":"shadowed var"}]"#;
        let (base_url, req_rx) = serve_once("200 OK", wrap(text)).await;

        let client = GeminiClient::with_base_url(SecretString::new("test-key".into()), "", &base_url);
        let diags = client
            .review(&CancellationToken::new(), "review this diff")
            .await
            .unwrap();

        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].tool, DEFAULT_MODEL, "tool stamped with the model");

        let request = req_rx.await.unwrap();
        assert!(request.contains(&format!("/v1beta/models/{DEFAULT_MODEL}:generateContent")));
        assert!(request.contains("x-goog-api-key: test-key"));
        assert!(request.contains("\"temperature\":0"));
        assert!(request.contains("responseSchema"));
        assert!(request.contains("review this diff"));
    }

    #[tokio::test]
    async fn cancellation_between_retries_aborts_the_review() {
        let (base_url, _req_rx) = serve_once("500 Internal Server Error", String::new()).await;

        let client = GeminiClient::with_base_url(SecretString::new("k".into()), "", &base_url);
        let cancel = CancellationToken::new();
        cancel.cancel();

        // First attempt fails against the server; the cancelled token is
        // observed before the first backoff sleep.
        let err = client.review(&cancel, "prompt").await.unwrap_err();
        assert!(matches!(err, ReviewError::Cancelled));
    }
}
