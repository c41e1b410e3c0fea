//! Gemini Chat
//!
//! A minimal chat interface that forwards prompts to a hosted Gemini model and
//! renders each complete reply as markdown.
//!
//! # Architecture
//!
//! - **Server**: Axum HTTP server rendering HTML, enhanced with HTMX
//! - **Chat**: per-browser-session transcript, settings and error banner
//! - **LLM**: one `generateContent` call per send action
//!
//! # Modules
//!
//! - [`chat`]: chat state, session store and request dispatch
//! - [`llm`]: text-generation trait and the Gemini driver
//! - [`ui`]: HTML pages, fragments and markdown rendering
//! - [`server`]: router and handlers

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::unused_async)]

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod server;
pub mod telemetry;
pub mod ui;

use std::sync::Arc;

use chat::{Dispatcher, SessionStore};
use llm::TextGenerator;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Live chat sessions.
    pub sessions: SessionStore,
    /// Sends prompts to the model.
    pub dispatcher: Dispatcher,
}

impl AppState {
    /// Build state around a generator and a session store.
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>, sessions: SessionStore) -> Self {
        Self {
            sessions,
            dispatcher: Dispatcher::new(generator),
        }
    }
}
