//! Server-rendered chat page and its htmx fragments.
//!
//! The page is split into the chat panel (header, controls, transcript),
//! which every state change re-renders and swaps in place, and the composer
//! form below it, which is rendered once per page load.

use std::fmt::Write;

use crate::chat::{ChatSnapshot, Message, Sender};
use crate::llm::ModelId;

use super::markdown::{escape_text, render_markdown};

/// Seconds between reloads while a reply is outstanding.
const PENDING_REFRESH_SECS: u32 = 2;

/// Generate the HTML shell for the application. `head` is extra markup for
/// the document head.
pub fn html_shell(title: &str, head: &str, content: &str) -> String {
    let title = escape_text(title);
    format!(r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="Chat with Google Gemini models">
    <title>{title}</title>

    <!-- HTMX (local). Forms still work as plain posts without it. -->
    <script src="/static/vendor/htmx.min.js"></script>
    <script>if (window.htmx) document.documentElement.classList.add("htmx-ready");</script>
    <link rel="stylesheet" href="/static/app.css">
    {head}
</head>
<body>
    <div id="app-shell" class="app-shell">
        <main id="app" class="chat-card">
            {content}
        </main>
        <footer class="site-footer">
            <p>This site uses the Google Gemini API</p>
        </footer>
    </div>
</body>
</html>"#)
}

/// Full chat page for a session.
pub fn chat_page(snapshot: &ChatSnapshot) -> String {
    let content = format!(
        "{}\n{}",
        chat_panel(snapshot),
        composer(&snapshot.id)
    );
    let head = if snapshot.pending > 0 {
        format!(r#"<meta http-equiv="refresh" content="{PENDING_REFRESH_SECS}">"#)
    } else {
        String::new()
    };
    html_shell(snapshot.settings.model().as_str(), &head, &content)
}

/// The swappable panel: header, controls and transcript.
pub fn chat_panel(snapshot: &ChatSnapshot) -> String {
    let id = escape_text(&snapshot.id);
    let model = snapshot.settings.model();
    format!(
        r#"<section id="chat-panel" class="chat-panel">
    <div class="chat-header">
        <div class="model-heading">
            <img src="/static/gemini-logo.svg" alt="gemini-logo" class="model-logo">
            <h1 class="model-title">{title}</h1>
        </div>
        {controls}
    </div>
    {transcript}
</section>"#,
        title = model.as_str(),
        controls = settings_form(&id, snapshot),
        transcript = transcript(snapshot),
    )
}

/// Model selector and temperature input. Changes post immediately; without
/// htmx the form submits itself, and the Apply button covers disabled
/// scripting.
fn settings_form(id: &str, snapshot: &ChatSnapshot) -> String {
    let selected = snapshot.settings.model();
    let options = ModelId::ALL
        .iter()
        .fold(String::new(), |mut out, model| {
            let _ = write!(
                out,
                r#"<option value="{value}"{sel}>{label}</option>"#,
                value = model.as_str(),
                sel = if *model == selected { " selected" } else { "" },
                label = model.label(),
            );
            out
        });

    format!(
        r##"<form id="settings-form" class="settings-form" action="/chat/{id}/settings" method="post"
            hx-post="/chat/{id}/settings" hx-trigger="change" hx-target="#chat-panel" hx-swap="outerHTML"
            onchange="if (!window.htmx) this.requestSubmit()">
            <label for="model">Select Model Type:</label>
            <select id="model" name="model">{options}</select>
            <label for="temperature">Set Temperature:</label>
            <input type="number" id="temperature" name="temperature"
                value="{temperature}" step="0.1" min="0" max="{max}">
            <button type="submit" class="settings-apply">Apply</button>
        </form>"##,
        temperature = snapshot.settings.temperature(),
        max = snapshot.settings.max_temperature(),
    )
}

/// Transcript pane: error banner, then either the welcome text or the rows.
pub fn transcript(snapshot: &ChatSnapshot) -> String {
    let mut out = String::from(r#"<div id="transcript" class="transcript" aria-live="polite">"#);

    if let Some(error) = &snapshot.error {
        let _ = write!(
            out,
            r#"<div class="error-banner" role="alert">{}</div>"#,
            escape_text(error)
        );
    }

    if snapshot.messages.is_empty() && snapshot.error.is_none() {
        let _ = write!(
            out,
            r#"<div id="welcome" class="welcome">
                <p class="welcome-title">Welcome to the {} Chat!</p>
                <p>Type a message to start the conversation.</p>
            </div>"#,
            snapshot.settings.model().as_str()
        );
    } else {
        for message in &snapshot.messages {
            out.push_str(&message_row(message));
        }
    }

    if snapshot.pending > 0 {
        out.push_str(r#"<div class="pending-reply" role="status">Waiting for reply&hellip;</div>"#);
    }

    out.push_str("</div>");
    out
}

/// One transcript row. User text is escaped; bot text is markdown.
pub fn message_row(message: &Message) -> String {
    let (class, body) = match message.sender {
        Sender::User => ("message message-user", format!("<p>{}</p>", escape_text(&message.text))),
        Sender::Bot => (
            "message message-bot",
            format!(r#"<div class="markdown">{}</div>"#, render_markdown(&message.text)),
        ),
    };
    format!(
        r#"<div class="{class}">{body}<span class="timestamp">{}</span></div>"#,
        escape_text(&message.timestamp)
    )
}

/// Prompt textarea and send button.
///
/// With htmx loaded, the user's text is echoed into the transcript before
/// the request leaves, and submissions from one page are queued.
fn composer(id: &str) -> String {
    let id = escape_text(id);
    format!(
        r##"<form id="composer" class="composer" action="/chat/{id}/send" method="post"
    hx-post="/chat/{id}/send" hx-target="#chat-panel" hx-swap="outerHTML"
    hx-sync="this:queue all" hx-indicator="#send-indicator"
    hx-on::before-request="
        const text = this.querySelector('[name=prompt]').value;
        const welcome = document.getElementById('welcome');
        if (welcome) welcome.remove();
        const row = document.createElement('div');
        row.className = 'message message-user pending';
        const p = document.createElement('p');
        p.textContent = text;
        row.appendChild(p);
        document.getElementById('transcript').appendChild(row);
        this.reset();
    ">
    <textarea name="prompt" placeholder="Enter your prompt" rows="3"></textarea>
    <button type="submit" class="send-button">Send</button>
    <span id="send-indicator" class="htmx-indicator">Sending&hellip;</span>
</form>"##
    )
}
