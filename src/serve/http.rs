use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, error, info, warn};

use crate::errors::{Result, TypeLensError};
use crate::mcp::McpServer;

/// Builds the HTTP routes:
///
/// - `POST /` takes a JSON-RPC request body and answers with the response
///   envelope; bodies that are not a request envelope get a plain-text 400.
/// - `GET /health` answers `{"status": "ok", "service": <name>}`.
/// - `OPTIONS` on any path answers 200 with permissive CORS headers.
pub fn router(server: Arc<McpServer>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", post(handle_rpc).options(preflight))
        .route("/health", get(health).options(preflight))
        .fallback(fallback)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

async fn handle_rpc(State(server): State<Arc<McpServer>>, body: String) -> Response {
    match server.handle_body(&body) {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            warn!(error = %e, "rejected request body");
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

async fn health(State(server): State<Arc<McpServer>>) -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": server.service_name() }))
}

async fn preflight() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        ],
    )
}

async fn fallback(method: Method) -> Response {
    if method == Method::OPTIONS {
        preflight().await.into_response()
    } else {
        (StatusCode::NOT_FOUND, "not found").into_response()
    }
}

struct Running {
    local_addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// The HTTP transport. Stopped until [`start`](Self::start) is called;
/// both `start` and `stop` are idempotent.
pub struct HttpServer {
    server: Arc<McpServer>,
    bind_addr: String,
    running: Mutex<Option<Running>>,
}

impl HttpServer {
    /// Creates a stopped transport that will bind to `bind_addr`
    /// (`host:port`; port `0` picks a free port).
    pub fn new(server: Arc<McpServer>, bind_addr: impl Into<String>) -> Self {
        Self {
            server,
            bind_addr: bind_addr.into(),
            running: Mutex::new(None),
        }
    }

    /// Binds the listener and starts accepting requests in a background task.
    /// Returns the bound address; when already running, returns it unchanged.
    pub async fn start(&self) -> Result<SocketAddr> {
        let mut running = self.running.lock().await;
        if let Some(current) = running.as_ref() {
            debug!(addr = %current.local_addr, "http server already running");
            return Ok(current.local_addr);
        }

        let listener = TcpListener::bind(&self.bind_addr)
            .await
            .map_err(|e| TypeLensError::Transport {
                message: format!("failed to bind '{}': {}", self.bind_addr, e),
            })?;
        let local_addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = router(Arc::clone(&self.server));
        let task = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(error = %e, "http server terminated");
            }
        });

        info!(addr = %local_addr, service = self.server.service_name(), "http server listening");
        *running = Some(Running {
            local_addr,
            shutdown_tx,
            task,
        });
        Ok(local_addr)
    }

    /// Stops accepting connections and releases the listener. Requests
    /// already being handled run to completion. Safe to call when stopped.
    pub async fn stop(&self) {
        let Some(current) = self.running.lock().await.take() else {
            debug!("http server not running");
            return;
        };

        let _ = current.shutdown_tx.send(());
        if let Err(e) = current.task.await {
            warn!(error = %e, "http server task did not shut down cleanly");
        }
        info!(
            addr = %current.local_addr,
            stats = %self.server.stats_json(),
            "http server stopped"
        );
    }

    /// Whether the transport is currently accepting requests.
    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// The bound address while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|r| r.local_addr)
    }

    /// Starts the transport and serves until Ctrl-C, then stops gracefully.
    pub async fn run_until_ctrl_c(&self) -> Result<()> {
        self.start().await?;
        tokio::signal::ctrl_c().await?;
        info!("shutdown requested");
        self.stop().await;
        Ok(())
    }
}
