//! Chat session state and in-memory session storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ChatError;
use crate::llm::ModelId;

use super::message::Message;
use super::settings::ChatSettings;

/// State of one chat: transcript, settings and the last error.
///
/// Cloning is cheap and yields a handle to the same state.
#[derive(Debug, Clone)]
pub struct ChatSession {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    id: String,
    messages: RwLock<Vec<Message>>,
    settings: RwLock<ChatSettings>,
    error: RwLock<Option<String>>,
    in_flight: AtomicUsize,
    last_activity: RwLock<DateTime<Utc>>,
}

/// Point-in-time copy of a session, used for rendering and the JSON API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatSnapshot {
    /// Session identifier.
    pub id: String,
    /// Generation settings.
    pub settings: ChatSettings,
    /// Transcript in insertion order.
    pub messages: Vec<Message>,
    /// Banner text of the last failed request, if any.
    pub error: Option<String>,
    /// Generation calls still awaiting a reply.
    pub pending: usize,
}

// Writers never leave partial state behind, so a poisoned lock still holds
// consistent data.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl ChatSession {
    /// Create a session with the given ID and initial settings.
    #[must_use]
    pub fn new(id: impl Into<String>, settings: ChatSettings) -> Self {
        let now = Utc::now();
        Self {
            inner: Arc::new(SessionInner {
                id: id.into(),
                messages: RwLock::new(Vec::new()),
                settings: RwLock::new(settings),
                error: RwLock::new(None),
                in_flight: AtomicUsize::new(0),
                last_activity: RwLock::new(now),
            }),
        }
    }

    /// Get the session ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Append a message to the transcript.
    pub fn push_message(&self, message: Message) {
        write(&self.inner.messages).push(message);
        self.touch();
    }

    /// Get all messages in insertion order.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        read(&self.inner.messages).clone()
    }

    /// Get the number of messages in the transcript.
    #[must_use]
    pub fn message_count(&self) -> usize {
        read(&self.inner.messages).len()
    }

    /// Current settings.
    #[must_use]
    pub fn settings(&self) -> ChatSettings {
        *read(&self.inner.settings)
    }

    /// Switch model, re-clamping the temperature.
    pub fn set_model(&self, model: ModelId) -> ChatSettings {
        let mut guard = write(&self.inner.settings);
        guard.set_model(model);
        let settings = *guard;
        drop(guard);
        self.touch();
        settings
    }

    /// Store a clamped temperature and return the stored value.
    pub fn set_temperature(&self, value: f64) -> Result<f64, ChatError> {
        let stored = write(&self.inner.settings).set_temperature(value)?;
        self.touch();
        Ok(stored)
    }

    /// Banner text of the last failed request.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        read(&self.inner.error).clone()
    }

    /// Replace the banner text.
    pub fn set_error(&self, message: impl Into<String>) {
        *write(&self.inner.error) = Some(message.into());
    }

    /// Remove the banner.
    pub fn clear_error(&self) {
        *write(&self.inner.error) = None;
    }

    /// Copy the whole state out.
    #[must_use]
    pub fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            id: self.inner.id.clone(),
            settings: self.settings(),
            messages: self.messages(),
            error: self.error(),
            pending: self.pending(),
        }
    }

    /// Number of generation calls still in flight.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Mark a generation call as in flight until the guard is dropped.
    pub(crate) fn begin_request(&self) -> InFlight {
        self.inner.in_flight.fetch_add(1, Ordering::AcqRel);
        InFlight(self.clone())
    }

    /// Update the last activity timestamp.
    pub fn touch(&self) {
        *write(&self.inner.last_activity) = Utc::now();
    }

    /// Check if the session has been idle longer than `timeout`.
    #[must_use]
    pub fn is_expired_with_timeout(&self, timeout: Duration) -> bool {
        let last = *read(&self.inner.last_activity);
        // Negative duration means clock skew; treat as fresh.
        (Utc::now() - last)
            .to_std()
            .is_ok_and(|idle| idle > timeout)
    }

    #[cfg(test)]
    fn backdate(&self, by: Duration) {
        let delta = chrono::Duration::from_std(by).unwrap();
        *write(&self.inner.last_activity) = Utc::now() - delta;
    }
}

/// Decrements the in-flight count when dropped, including when the request
/// future is cancelled.
#[derive(Debug)]
pub(crate) struct InFlight(ChatSession);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.inner.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Thread-safe store for sessions.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

#[derive(Debug)]
struct SessionStoreInner {
    sessions: RwLock<HashMap<String, ChatSession>>,
    defaults: ChatSettings,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(ChatSettings::default())
    }
}

impl SessionStore {
    /// Create a store whose new sessions start with `defaults`.
    #[must_use]
    pub fn new(defaults: ChatSettings) -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(HashMap::new()),
                defaults,
            }),
        }
    }

    /// Create a new session and return it.
    #[must_use]
    pub fn create(&self) -> ChatSession {
        let session = ChatSession::new(Uuid::new_v4().to_string(), self.inner.defaults);
        write(&self.inner.sessions).insert(session.id().to_string(), session.clone());
        tracing::debug!(session_id = %session.id(), "Created chat session");
        session
    }

    /// Get a session by ID. Any lookup counts as activity.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<ChatSession> {
        let session = read(&self.inner.sessions).get(id).cloned();
        if let Some(session) = &session {
            session.touch();
        }
        session
    }

    /// Remove a session by ID.
    pub fn remove(&self, id: &str) -> Option<ChatSession> {
        write(&self.inner.sessions).remove(id)
    }

    /// Get the number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        read(&self.inner.sessions).len()
    }

    /// Check if there are no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove sessions that have been inactive longer than the timeout.
    ///
    /// Returns the number of sessions removed.
    pub fn cleanup_expired_with_timeout(&self, timeout: Duration) -> usize {
        let mut guard = write(&self.inner.sessions);
        let before = guard.len();
        guard.retain(|_, session| !session.is_expired_with_timeout(timeout));
        before - guard.len()
    }
}
