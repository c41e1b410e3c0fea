//! Chat component state and request dispatch.
//!
//! # Architecture
//!
//! - [`Message`]: immutable transcript entry
//! - [`ChatSettings`]: model and clamped temperature
//! - [`ChatSession`]: transcript, settings and error banner of one chat
//! - [`SessionStore`]: thread-safe store for all live sessions
//! - [`Dispatcher`]: turns a prompt into one generation call
//!
//! # Example
//!
//! ```rust
//! use gemini_chat::chat::{Message, SessionStore};
//!
//! let store = SessionStore::default();
//! let session = store.create();
//! session.push_message(Message::user("Hello!"));
//!
//! assert_eq!(session.messages().len(), 1);
//! ```

mod dispatch;
mod message;
mod session;
mod settings;

pub use dispatch::{DispatchOutcome, Dispatcher};
pub use message::{Message, Sender};
pub use session::{ChatSession, ChatSnapshot, SessionStore};
pub use settings::{ChatSettings, DEFAULT_TEMPERATURE};
