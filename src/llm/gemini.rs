//! Google Gemini `generateContent` driver.
//!
//! Calls `POST {base}/v1beta/models/{model}:generateContent` and returns the
//! text of the first candidate.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::LlmError;

use super::{GenerationRequest, LlmSettings, TextGenerator};

/// Header carrying the API key. Kept out of the query string so keys do not
/// end up in access logs.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Driver for the Gemini REST API.
#[derive(Clone)]
pub struct GeminiDriver {
    http: reqwest::Client,
    base: Url,
    settings: LlmSettings,
}

impl std::fmt::Debug for GeminiDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiDriver")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl GeminiDriver {
    /// Create a driver with the given settings.
    ///
    /// Fails if the base URL does not parse or the HTTP client cannot be built.
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        let base = Url::parse(&format!("{}/", settings.base_url.trim_end_matches('/')))?;
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base,
            settings,
        })
    }

    /// Endpoint URL for a model.
    pub fn endpoint(&self, model: &str) -> Result<Url, LlmError> {
        Ok(self
            .base
            .join(&format!("v1beta/models/{model}:generateContent"))?)
    }
}

#[async_trait::async_trait]
impl TextGenerator for GeminiDriver {
    async fn generate(&self, req: &GenerationRequest) -> Result<String, LlmError> {
        let url = self.endpoint(req.model.as_str())?;

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: &req.prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: req.temperature,
            },
        };

        tracing::debug!(
            model = %req.model,
            temperature = req.temperature,
            prompt_length = req.prompt.len(),
            "Sending generateContent request"
        );

        let mut rb = self.http.post(url).json(&body);
        if let Some(key) = &self.settings.api_key {
            rb = rb.header(API_KEY_HEADER, key);
        }

        let resp = rb.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(map_http_error(status, &text));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| LlmError::MalformedResponse(format!("invalid JSON body: {e}")))?;
        let reply = extract_text(parsed)?;

        tracing::debug!(
            model = %req.model,
            reply_length = reply.len(),
            "generateContent request completed"
        );

        Ok(reply)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn extract_text(response: GenerateContentResponse) -> Result<String, LlmError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(LlmError::MalformedResponse(format!(
            "prompt blocked: {reason}"
        )));
    }

    let text: String = response
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(LlmError::MalformedResponse(
            "no text in response candidates".to_string(),
        ));
    }
    Ok(text)
}

fn map_http_error(status: StatusCode, body: &str) -> LlmError {
    let message = serde_json::from_str::<ErrorWrapper>(body).map_or_else(
        |_| body.to_string(),
        |wrapper| {
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            match wrapper.error.status {
                Some(s) if !s.is_empty() => format!("{s}: {msg}"),
                _ => msg,
            }
        },
    );

    LlmError::Api {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(base_url: &str) -> GeminiDriver {
        GeminiDriver::new(LlmSettings {
            base_url: base_url.to_string(),
            ..LlmSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_default_base() {
        let url = driver("https://generativelanguage.googleapis.com")
            .endpoint("gemini-1.5-pro")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-pro:generateContent"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let url = driver("http://127.0.0.1:8080/proxy/")
            .endpoint("gemini-1.5-flash")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8080/proxy/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = GeminiDriver::new(LlmSettings {
            base_url: "not a url".to_string(),
            ..LlmSettings::default()
        });
        assert!(matches!(result, Err(LlmError::InvalidUrl(_))));
    }

    #[test]
    fn test_request_body_shape() {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: "Hello" }],
            }],
            generation_config: GenerationConfig { temperature: 0.5 },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "Hello" }] }],
                "generationConfig": { "temperature": 0.5 }
            })
        );
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [
                { "content": { "role": "model", "parts": [{ "text": "Hi " }, { "text": "there" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        }))
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "Hi there");
    }

    #[test]
    fn test_extract_text_empty_is_malformed() {
        let response: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({ "candidates": [] })).unwrap();
        assert!(matches!(
            extract_text(response),
            Err(LlmError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_extract_text_blocked_prompt() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        let err = extract_text(response).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_map_http_error_uses_api_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        match map_http_error(StatusCode::BAD_REQUEST, body) {
            LlmError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "INVALID_ARGUMENT: API key not valid.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_map_http_error_raw_body() {
        match map_http_error(StatusCode::BAD_GATEWAY, "upstream down") {
            LlmError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_debug_redacts_key() {
        let d = GeminiDriver::new(LlmSettings {
            api_key: Some("secret-key".to_string()),
            ..LlmSettings::default()
        })
        .unwrap();
        let dbg = format!("{d:?}");
        assert!(!dbg.contains("secret-key"));
        assert!(dbg.contains("<redacted>"));
    }
}
