//! Text-generation drivers.
//!
//! The [`TextGenerator`] trait is the seam between the chat component and the
//! hosted model: one prompt in, one complete text reply out. There is no
//! streaming and no tool loop.
//!
//! # Drivers
//!
//! - [`GeminiDriver`]: Google Gemini `generateContent` REST endpoint
//!
//! # Example
//!
//! ```rust,ignore
//! use gemini_chat::llm::{GeminiDriver, GenerationRequest, LlmSettings, ModelId, TextGenerator};
//!
//! let driver = GeminiDriver::new(LlmSettings::default())?;
//! let reply = driver
//!     .generate(&GenerationRequest::new("Hello", ModelId::Gemini15Flash, 0.7))
//!     .await?;
//! ```

pub mod gemini;
pub mod model;

use std::time::Duration;

pub use gemini::GeminiDriver;
pub use model::ModelId;

use crate::error::LlmError;

/// Default public endpoint of the Gemini API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// LLM connection settings.
#[derive(Clone)]
pub struct LlmSettings {
    /// Base URL for the API (e.g., `https://generativelanguage.googleapis.com`).
    pub base_url: String,
    /// Optional API key. Without one, requests go out unauthenticated and fail.
    pub api_key: Option<String>,
    /// Upper bound for a single generation call.
    pub request_timeout: Duration,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// A single generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// User prompt, sent as typed.
    pub prompt: String,
    /// Model serving the request.
    pub model: ModelId,
    /// Sampling temperature, already clamped for `model`.
    pub temperature: f64,
}

impl GenerationRequest {
    /// Build a request.
    #[must_use]
    pub fn new(prompt: impl Into<String>, model: ModelId, temperature: f64) -> Self {
        Self {
            prompt: prompt.into(),
            model,
            temperature,
        }
    }
}

/// Trait for text-generation backends.
///
/// Implementations perform exactly one outbound call per invocation and
/// return the complete reply text.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a reply for the request.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success API status, or a
    /// response without text.
    async fn generate(&self, req: &GenerationRequest) -> Result<String, LlmError>;
}
