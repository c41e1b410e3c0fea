//! Transcript entries.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Author of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The person typing prompts.
    User,
    /// The model reply.
    Bot,
}

/// One immutable transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote it.
    pub sender: Sender,
    /// Raw text. Bot text is markdown.
    pub text: String,
    /// Local wall-clock time at creation, formatted for display.
    pub timestamp: String,
}

impl Message {
    /// A user message stamped with the current local time.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::at(Sender::User, text, Local::now())
    }

    /// A bot message stamped with the current local time.
    #[must_use]
    pub fn bot(text: impl Into<String>) -> Self {
        Self::at(Sender::Bot, text, Local::now())
    }

    /// A message stamped with an explicit time.
    #[must_use]
    pub fn at(sender: Sender, text: impl Into<String>, time: DateTime<Local>) -> Self {
        Self {
            sender,
            text: text.into(),
            timestamp: display_time(time),
        }
    }
}

/// `3:07:09 PM` style clock time.
fn display_time(time: DateTime<Local>) -> String {
    time.format("%-I:%M:%S %p").to_string()
}
