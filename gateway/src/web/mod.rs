//! Web server module
//!
//! Serves the readiness endpoint, the prompt endpoint, and a small chat page.

pub mod api;
pub mod state;

use std::net::SocketAddr;

use anyhow::Result;
use axum::{
    response::Html,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Start the web server and run until it stops
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let app = create_router(state);

    tracing::info!("Starting web server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/status", get(api::status))
        .route("/send", post(api::send))
        .route("/health", get(api::health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Backend Gateway</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
            max-width: 720px;
            margin: 40px auto;
            padding: 20px;
            background: #1a1a2e;
            color: #eee;
        }
        #status { color: #facc15; }
        #status.ready { color: #22c55e; }
        #status.failed { color: #ef4444; }
        #log {
            background: #16213e;
            padding: 16px;
            border-radius: 8px;
            min-height: 200px;
            white-space: pre-wrap;
        }
        textarea { width: 100%; min-height: 80px; }
    </style>
</head>
<body>
    <h1>Backend Gateway</h1>
    <p id="status">Checking backend...</p>
    <div id="log"></div>
    <textarea id="prompt" placeholder="Say something..."></textarea>
    <button id="send" disabled>Send</button>
    <script>
        const statusEl = document.getElementById('status');
        const sendBtn = document.getElementById('send');
        const log = document.getElementById('log');

        async function poll() {
            try {
                const res = await fetch('/status');
                const s = await res.json();
                sendBtn.disabled = !s.allowSend;
                statusEl.className = s.ready ? 'ready' : (s.error ? 'failed' : '');
                statusEl.textContent = s.ready
                    ? 'Backend ready'
                    : (s.error ? 'Warm-up failed: ' + s.error : s.message) + ' (' + s.elapsedSeconds + 's)';
                if (s.ready) return;
            } catch (e) {
                statusEl.textContent = 'Status unavailable';
            }
            setTimeout(poll, 2000);
        }

        sendBtn.onclick = async () => {
            const prompt = document.getElementById('prompt').value;
            log.textContent += '> ' + prompt + '\n';
            sendBtn.disabled = true;
            const res = await fetch('/send', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({ prompt }),
            });
            const body = await res.json();
            log.textContent += (body.response ?? ('Error: ' + body.error)) + '\n\n';
            sendBtn.disabled = false;
        };

        poll();
    </script>
</body>
</html>"#;
