//! Error types shared across the crate.

use thiserror::Error;

/// Banner text shown to the user whenever a generation request fails.
///
/// Every [`LlmError`] variant collapses into this one message at the dispatch
/// boundary; the structured cause only reaches the logs.
pub const REQUEST_FAILED_MESSAGE: &str =
    "Failed to fetch data from the API. Please try again later.";

/// Errors raised while calling the text-generation API.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Transport failure: connect, TLS, timeout, or body decoding.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The configured base URL could not be combined into an endpoint.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The API answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the API body, or the raw body.
        message: String,
    },

    /// The API answered 2xx but carried no usable text.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Errors raised when the user edits the chat configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatError {
    /// The model identifier is not one of the supported models.
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// The temperature is NaN or infinite.
    #[error("Invalid temperature: {0}")]
    InvalidTemperature(f64),
}
