use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use gemini_chat::chat::{ChatSession, ChatSettings, DispatchOutcome, Dispatcher};
use gemini_chat::error::{LlmError, REQUEST_FAILED_MESSAGE};
use gemini_chat::llm::{GeminiDriver, GenerationRequest, LlmSettings, ModelId, TextGenerator};
use serde_json::{Value, json};

/// What the fake API saw on its last call.
#[derive(Debug, Default, Clone)]
struct Captured {
    path: String,
    api_key: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct Fake {
    status: StatusCode,
    reply: Value,
    captured: Arc<Mutex<Option<Captured>>>,
}

async fn generate_content(
    State(fake): State<Fake>,
    Path(model_call): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    *fake.captured.lock().unwrap() = Some(Captured {
        path: model_call,
        api_key: headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
    (fake.status, Json(fake.reply.clone())).into_response()
}

/// Serve a fake `generateContent` endpoint on an ephemeral port.
async fn spawn_fake(status: StatusCode, reply: Value) -> (String, Arc<Mutex<Option<Captured>>>) {
    let captured = Arc::new(Mutex::new(None));
    let fake = Fake {
        status,
        reply,
        captured: Arc::clone(&captured),
    };
    let app = Router::new()
        .route("/v1beta/models/{model_call}", post(generate_content))
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), captured)
}

fn driver(base_url: String, api_key: Option<&str>) -> GeminiDriver {
    GeminiDriver::new(LlmSettings {
        base_url,
        api_key: api_key.map(str::to_string),
        request_timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn test_generate_success() {
    let (base, captured) = spawn_fake(
        StatusCode::OK,
        json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello, "}, {"text": "world"}]},
                "finishReason": "STOP"
            }]
        }),
    )
    .await;

    let reply = driver(base, Some("test-key"))
        .generate(&GenerationRequest::new("Hi", ModelId::Gemini15Flash, 0.4))
        .await
        .unwrap();

    assert_eq!(reply, "Hello, world");

    let seen = captured.lock().unwrap().clone().expect("request captured");
    assert_eq!(seen.path, "gemini-1.5-flash:generateContent");
    assert_eq!(seen.api_key.as_deref(), Some("test-key"));
    assert_eq!(
        seen.body,
        json!({
            "contents": [{"role": "user", "parts": [{"text": "Hi"}]}],
            "generationConfig": {"temperature": 0.4}
        })
    );
}

#[tokio::test]
async fn test_generate_without_key_sends_no_header() {
    let (base, captured) = spawn_fake(
        StatusCode::OK,
        json!({"candidates": [{"content": {"parts": [{"text": "ok"}]}}]}),
    )
    .await;

    driver(base, None)
        .generate(&GenerationRequest::new("Hi", ModelId::Gemini15Pro, 1.0))
        .await
        .unwrap();

    let seen = captured.lock().unwrap().clone().expect("request captured");
    assert_eq!(seen.path, "gemini-1.5-pro:generateContent");
    assert!(seen.api_key.is_none());
}

#[tokio::test]
async fn test_generate_maps_api_error() {
    let (base, _captured) = spawn_fake(
        StatusCode::BAD_REQUEST,
        json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT"
            }
        }),
    )
    .await;

    let err = driver(base, Some("bad-key"))
        .generate(&GenerationRequest::new("Hi", ModelId::Gemini15Pro, 0.7))
        .await
        .unwrap_err();

    match err {
        LlmError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(
                message,
                "INVALID_ARGUMENT: API key not valid. Please pass a valid API key."
            );
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_generate_blocked_prompt_is_malformed() {
    let (base, _captured) = spawn_fake(
        StatusCode::OK,
        json!({"promptFeedback": {"blockReason": "SAFETY"}}),
    )
    .await;

    let err = driver(base, None)
        .generate(&GenerationRequest::new("Hi", ModelId::Gemini15Pro, 0.7))
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::MalformedResponse(ref m) if m.contains("SAFETY")));
}

#[tokio::test]
async fn test_generate_connection_refused_is_http_error() {
    // Bind then drop to get a port with nothing listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = driver(format!("http://{addr}"), None)
        .generate(&GenerationRequest::new("Hi", ModelId::Gemini15Pro, 0.7))
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::Http(_)));
}

#[tokio::test]
async fn test_hung_call_times_out_into_banner() {
    let app = Router::new().route(
        "/v1beta/models/{model_call}",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StatusCode::OK
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let driver = GeminiDriver::new(LlmSettings {
        base_url: format!("http://{addr}"),
        api_key: None,
        request_timeout: Duration::from_millis(100),
    })
    .unwrap();

    let err = driver
        .generate(&GenerationRequest::new("Hi", ModelId::Gemini15Pro, 0.7))
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::Http(ref e) if e.is_timeout()));

    let session = ChatSession::new("hung", ChatSettings::default());
    let outcome = Dispatcher::new(Arc::new(driver)).send(&session, "Hi").await;

    assert_eq!(outcome, DispatchOutcome::Failed);
    assert_eq!(session.message_count(), 1);
    assert_eq!(session.error().as_deref(), Some(REQUEST_FAILED_MESSAGE));
}
