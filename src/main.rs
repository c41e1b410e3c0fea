//! Gemini Chat server
//!
//! Entry point for the chat web application.

use std::sync::Arc;

use dotenvy::dotenv;
use mimalloc::MiMalloc;

use gemini_chat::config::AppConfig;
use gemini_chat::{server, telemetry};

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() {
    // Load .env (if present) before config so its values feed every layer
    let _ = dotenv();

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing (M-LOG-STRUCTURED)
    telemetry::init(config.telemetry.log_format);

    if let Err(e) = server::start_server(Arc::new(config)).await {
        tracing::error!(error = %e, "Server exited with error");
        std::process::exit(1);
    }
}
