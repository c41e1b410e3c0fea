use std::path::Path;
use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{DefaultBodyLimit, Path as UrlPath, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::chat::{ChatSession, ChatSettings, ChatSnapshot, SessionStore};
use crate::config::AppConfig;
use crate::error::ChatError;
use crate::llm::{GeminiDriver, ModelId};
use crate::ui::page;

/// Request bodies are prompts and settings; anything larger is a mistake.
const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let settings = config.llm_settings();
    info!(
        name: "llm.config.loaded",
        base_url = %settings.base_url,
        default_model = %config.chat.default_model,
        has_api_key = settings.api_key.is_some(),
        "LLM configuration loaded"
    );
    if settings.api_key.is_none() {
        tracing::warn!("No Gemini API key configured; every request will be rejected by the API");
    }

    let driver = GeminiDriver::new(settings)?;
    let sessions = SessionStore::new(config.default_chat_settings());
    let state = AppState::new(Arc::new(driver), sessions.clone());

    spawn_session_sweeper(sessions, &config);

    let app = build_router(state, &config.server.static_dir);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Periodically drop sessions whose browser has gone away.
fn spawn_session_sweeper(sessions: SessionStore, config: &AppConfig) {
    let idle = config.idle_timeout();
    let mut ticker = tokio::time::interval(config.sweep_interval());
    tokio::spawn(async move {
        loop {
            ticker.tick().await;
            let removed = sessions.cleanup_expired_with_timeout(idle);
            if removed > 0 {
                info!(
                    name: "session.swept",
                    removed = removed,
                    remaining = sessions.len(),
                    "Expired chat sessions removed"
                );
            }
        }
    });
}

/// Build the application router.
pub fn build_router(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    Router::new()
        // HTML pages and htmx fragments
        .route("/", get(index_handler))
        .route("/chat/{id}", get(chat_page_handler))
        .route("/chat/{id}/send", post(send_handler))
        .route("/chat/{id}/settings", post(settings_handler))
        // JSON API
        .route("/api/models", get(api_list_models))
        .route("/api/sessions", post(api_create_session))
        .route(
            "/api/sessions/{id}",
            get(api_get_session).delete(api_delete_session),
        )
        .route("/api/sessions/{id}/settings", put(api_update_settings))
        .route("/api/sessions/{id}/messages", post(api_send_message))
        // Static assets
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Form body of a send action.
#[derive(Debug, Deserialize)]
struct SendForm {
    #[serde(default)]
    prompt: String,
}

/// Form body of the settings controls. Fields arrive as raw strings.
#[derive(Debug, Deserialize)]
struct SettingsForm {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    temperature: Option<String>,
}

fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("HX-Request")
        .is_some_and(|v| v.as_bytes() == b"true")
}

/// Reply to a state change: htmx gets the re-rendered panel, plain forms are
/// redirected back to the page.
fn panel_or_redirect(headers: &HeaderMap, session: &ChatSession) -> Response {
    if is_htmx(headers) {
        Html(page::chat_panel(&session.snapshot())).into_response()
    } else {
        Redirect::to(&format!("/chat/{}", session.id())).into_response()
    }
}

/// Send the browser to a fresh chat when its session is gone.
fn restart(headers: &HeaderMap) -> Response {
    if is_htmx(headers) {
        (StatusCode::OK, [("HX-Redirect", "/")]).into_response()
    } else {
        Redirect::to("/").into_response()
    }
}

/// GET / - Open a new chat.
async fn index_handler(State(state): State<AppState>) -> Redirect {
    let session = state.sessions.create();
    Redirect::to(&format!("/chat/{}", session.id()))
}

/// GET /chat/{id} - Render the chat page.
async fn chat_page_handler(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<String>,
) -> Response {
    match state.sessions.get(&id) {
        Some(session) => Html(page::chat_page(&session.snapshot())).into_response(),
        None => Redirect::to("/").into_response(),
    }
}

/// POST /chat/{id}/send - Dispatch a prompt.
async fn send_handler(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<String>,
    headers: HeaderMap,
    Form(form): Form<SendForm>,
) -> Response {
    let Some(session) = state.sessions.get(&id) else {
        tracing::warn!(session_id = %id, "Send for unknown session");
        return restart(&headers);
    };

    if is_htmx(&headers) {
        state.dispatcher.send(&session, &form.prompt).await;
    } else {
        // Plain forms get the page back at once; it refreshes until the
        // reply lands.
        state.dispatcher.send_in_background(&session, &form.prompt);
    }
    panel_or_redirect(&headers, &session)
}

/// POST /chat/{id}/settings - Apply model and temperature controls.
async fn settings_handler(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<String>,
    headers: HeaderMap,
    Form(form): Form<SettingsForm>,
) -> Response {
    let Some(session) = state.sessions.get(&id) else {
        return restart(&headers);
    };

    // Model first, so the temperature is clamped against the new maximum.
    if let Some(raw) = form.model.as_deref().filter(|s| !s.trim().is_empty()) {
        match raw.parse::<ModelId>() {
            Ok(model) => {
                session.set_model(model);
            }
            Err(e) => tracing::warn!(session_id = %id, error = %e, "Ignoring model change"),
        }
    }

    if let Some(raw) = form.temperature.as_deref().filter(|s| !s.trim().is_empty()) {
        match raw.trim().parse::<f64>() {
            Ok(t) => {
                if let Err(e) = session.set_temperature(t) {
                    tracing::warn!(session_id = %id, error = %e, "Ignoring temperature change");
                }
            }
            Err(e) => {
                tracing::warn!(session_id = %id, input = %raw, error = %e, "Unparseable temperature");
            }
        }
    }

    panel_or_redirect(&headers, &session)
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Model DTO for the selector.
#[derive(Debug, Serialize)]
struct ModelInfo {
    id: ModelId,
    label: &'static str,
    max_temperature: f64,
}

/// Partial settings update.
#[derive(Debug, Deserialize)]
struct SettingsUpdate {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    temperature: Option<f64>,
}

/// Request body for sending a prompt.
#[derive(Debug, Deserialize)]
struct MessageRequest {
    prompt: String,
}

fn not_found(id: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("Session not found: {id}"))
}

fn find_session(state: &AppState, id: &str) -> Result<ChatSession, (StatusCode, String)> {
    state.sessions.get(id).ok_or_else(|| not_found(id))
}

/// GET /api/models - List supported models.
async fn api_list_models() -> Json<Vec<ModelInfo>> {
    Json(
        ModelId::ALL
            .into_iter()
            .map(|m| ModelInfo {
                id: m,
                label: m.label(),
                max_temperature: m.max_temperature(),
            })
            .collect(),
    )
}

/// POST /api/sessions - Create a new session.
async fn api_create_session(State(state): State<AppState>) -> (StatusCode, Json<ChatSnapshot>) {
    let session = state.sessions.create();
    (StatusCode::CREATED, Json(session.snapshot()))
}

/// GET /api/sessions/{id} - Get session state.
async fn api_get_session(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<String>,
) -> Result<Json<ChatSnapshot>, (StatusCode, String)> {
    Ok(Json(find_session(&state, &id)?.snapshot()))
}

/// DELETE /api/sessions/{id} - Delete a session.
async fn api_delete_session(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<String>,
) -> StatusCode {
    match state.sessions.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

/// PUT /api/sessions/{id}/settings - Change model and/or temperature.
async fn api_update_settings(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<String>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<ChatSettings>, (StatusCode, String)> {
    let session = find_session(&state, &id)?;
    let unprocessable = |e: ChatError| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string());

    // Validate everything before touching the session.
    let model = update
        .model
        .as_deref()
        .map(str::parse::<ModelId>)
        .transpose()
        .map_err(unprocessable)?;
    if let Some(t) = update.temperature.filter(|t| !t.is_finite()) {
        return Err(unprocessable(ChatError::InvalidTemperature(t)));
    }

    if let Some(model) = model {
        session.set_model(model);
    }
    if let Some(t) = update.temperature {
        session.set_temperature(t).map_err(unprocessable)?;
    }

    Ok(Json(session.settings()))
}

/// POST /api/sessions/{id}/messages - Send a prompt and wait for the reply.
///
/// A failed generation is reported in the snapshot's `error`, not as an
/// HTTP error.
async fn api_send_message(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<String>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<ChatSnapshot>, (StatusCode, String)> {
    let session = find_session(&state, &id)?;
    state.dispatcher.send(&session, &req.prompt).await;
    Ok(Json(session.snapshot()))
}
