//! Request dispatch: one prompt, one generation call, one transcript update.

use std::sync::Arc;

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::REQUEST_FAILED_MESSAGE;
use crate::llm::{GenerationRequest, TextGenerator};

use super::message::Message;
use super::session::{ChatSession, InFlight};

/// Result of a send action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A bot message was appended.
    Replied,
    /// The call failed; the banner was set and nothing was appended.
    Failed,
}

/// Sends prompts to a [`TextGenerator`] on behalf of chat sessions.
#[derive(Clone)]
pub struct Dispatcher {
    generator: Arc<dyn TextGenerator>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("generator", &"dyn TextGenerator")
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher over the given generator.
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Perform one send action.
    ///
    /// The user message is appended before the call. Settings are read once,
    /// before the call; later edits do not affect an in-flight request. No
    /// session lock is held across the await, so overlapping sends proceed
    /// independently and replies land in completion order.
    pub async fn send(&self, session: &ChatSession, prompt: &str) -> DispatchOutcome {
        self.complete(Turn::begin(session, prompt)).await
    }

    /// Append the user message now and run the generation call on a
    /// spawned task.
    ///
    /// The session reports the call through [`ChatSession::pending`] until the
    /// reply or the error banner has been recorded.
    pub fn send_in_background(
        &self,
        session: &ChatSession,
        prompt: &str,
    ) -> JoinHandle<DispatchOutcome> {
        let turn = Turn::begin(session, prompt);
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.complete(turn).await })
    }

    async fn complete(&self, turn: Turn) -> DispatchOutcome {
        let Turn {
            session,
            req,
            request_id,
            _in_flight,
        } = turn;

        match self.generator.generate(&req).await {
            Ok(text) => {
                tracing::info!(
                    request_id = %request_id,
                    session_id = %session.id(),
                    reply_length = text.len(),
                    "Reply received"
                );
                session.push_message(Message::bot(text));
                session.clear_error();
                DispatchOutcome::Replied
            }
            Err(e) => {
                tracing::error!(
                    request_id = %request_id,
                    session_id = %session.id(),
                    error = %e,
                    "Error fetching data"
                );
                session.set_error(REQUEST_FAILED_MESSAGE);
                DispatchOutcome::Failed
            }
        }
    }
}

/// A send action between appending the user message and recording the
/// outcome.
struct Turn {
    session: ChatSession,
    req: GenerationRequest,
    request_id: String,
    _in_flight: InFlight,
}

impl Turn {
    fn begin(session: &ChatSession, prompt: &str) -> Self {
        session.push_message(Message::user(prompt));
        let in_flight = session.begin_request();

        let settings = session.settings();
        let req = GenerationRequest::new(prompt, settings.model(), settings.temperature());
        let request_id = Uuid::new_v4().to_string();

        tracing::info!(
            request_id = %request_id,
            session_id = %session.id(),
            model = %req.model,
            temperature = req.temperature,
            prompt_length = req.prompt.len(),
            "Dispatching prompt"
        );

        Self {
            session: session.clone(),
            req,
            request_id,
            _in_flight: in_flight,
        }
    }
}
