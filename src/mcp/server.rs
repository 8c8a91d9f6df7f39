//! Request dispatcher.
//!
//! Decodes JSON-RPC envelopes, routes them by method name and always
//! produces a well-formed response envelope. The dispatcher keeps no
//! per-request state and can be shared across concurrent requests.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::config::ServerConfig;
use crate::errors::{Result, TypeLensError};
use crate::metadata::MetadataProvider;
use crate::resources::ResourceProvider;

use super::tools::ToolRegistry;
use super::transport::{ErrorCode, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};

/// Protocol version advertised by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Method prefix marking fire-and-forget notifications.
pub const NOTIFICATION_PREFIX: &str = "notifications/";

/// Key under which calls to unregistered tool names are counted.
pub const UNKNOWN_TOOL_KEY: &str = "<unknown>";

/// Runtime statistics for the server.
pub struct ServerStats {
    started_at: Instant,
    total_requests: AtomicU64,
    tool_calls: AtomicU64,
    errors: AtomicU64,
}

impl ServerStats {
    fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_requests: AtomicU64::new(0),
            tool_calls: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }
}

/// The JSON-RPC dispatcher wrapping the tool registry and resource provider.
pub struct McpServer {
    tools: ToolRegistry,
    resources: Arc<dyn ResourceProvider>,
    service_name: String,
    stats: ServerStats,
    tool_call_counts: Mutex<HashMap<String, u64>>,
}

impl McpServer {
    /// Creates a dispatcher from an already built registry.
    pub fn new(
        tools: ToolRegistry,
        resources: Arc<dyn ResourceProvider>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            tools,
            resources,
            service_name: service_name.into(),
            stats: ServerStats::new(),
            tool_call_counts: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a dispatcher over the given collaborators using `config`
    /// for tool defaults and the service name.
    pub fn from_config(
        provider: Arc<dyn MetadataProvider>,
        resources: Arc<dyn ResourceProvider>,
        config: &ServerConfig,
    ) -> Self {
        Self::new(
            ToolRegistry::new(provider, config),
            resources,
            config.service_name.clone(),
        )
    }

    /// Name reported by `initialize` and the health endpoint.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// The tool registry used by this dispatcher.
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Parses a raw request body and dispatches it.
    ///
    /// Returns [`TypeLensError::Framing`] when the body is not a JSON-RPC 2.0
    /// request envelope; transports report that outside the protocol.
    pub fn handle_body(&self, body: &str) -> Result<JsonRpcResponse> {
        let request: JsonRpcRequest =
            serde_json::from_str(body).map_err(|e| TypeLensError::Framing {
                message: e.to_string(),
            })?;
        if request.jsonrpc != JSONRPC_VERSION {
            return Err(TypeLensError::Framing {
                message: format!("unsupported jsonrpc version '{}'", request.jsonrpc),
            });
        }
        Ok(self.handle_request(&request))
    }

    /// Dispatches a parsed request. Every outcome, including a panic inside
    /// a handler, becomes a response envelope.
    pub fn handle_request(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        self.stats.total_requests.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();
        let id = request.id.clone();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.route(request)));
        let response = match outcome {
            Ok(Ok(result)) => JsonRpcResponse::success(id, result),
            Ok(Err(e)) => {
                debug!(method = %request.method, error = %e, "request failed");
                JsonRpcResponse::from_error(id, &e)
            }
            Err(_) => {
                error!(method = %request.method, "handler panicked");
                JsonRpcResponse::error(
                    id,
                    ErrorCode::InternalError,
                    format!("internal error while handling '{}'", request.method),
                )
            }
        };

        if response.is_error() {
            self.stats.errors.fetch_add(1, Ordering::Relaxed);
        }
        debug!(
            method = %request.method,
            elapsed_ms = started.elapsed().as_millis() as u64,
            error = response.is_error(),
            "request handled"
        );
        response
    }

    fn route(&self, request: &JsonRpcRequest) -> Result<Value> {
        let method = request.method.as_str();
        if method.starts_with(NOTIFICATION_PREFIX) {
            debug!(method, with_id = !request.is_notification(), "notification acknowledged");
            return Ok(json!({}));
        }

        match method {
            "initialize" => Ok(self.handle_initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.tools.list_tools() })),
            "tools/call" => self.handle_tools_call(request.params.as_ref()),
            "resources/list" => {
                let resources = self.resources.list()?;
                Ok(json!({ "resources": resources }))
            }
            "resources/read" => self.handle_resources_read(request.params.as_ref()),
            _ => Err(TypeLensError::UnknownMethod {
                method: method.to_string(),
            }),
        }
    }

    /// Handles the `initialize` method, returning server capabilities.
    fn handle_initialize(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {},
                "resources": {}
            },
            "serverInfo": {
                "name": self.service_name,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    /// Handles the `tools/call` method, dispatching to the tool registry.
    fn handle_tools_call(&self, params: Option<&Value>) -> Result<Value> {
        let params = params.ok_or_else(|| TypeLensError::missing("params"))?;
        let tool_name = params
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| TypeLensError::missing("name"))?;
        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

        self.stats.tool_calls.fetch_add(1, Ordering::Relaxed);
        let counted = if self.tools.is_known(tool_name) {
            tool_name
        } else {
            UNKNOWN_TOOL_KEY
        };
        if let Ok(mut counts) = self.tool_call_counts.lock() {
            *counts.entry(counted.to_string()).or_insert(0) += 1;
        }

        let result = self.tools.execute(tool_name, &arguments)?;
        Ok(serde_json::to_value(result)?)
    }

    /// Handles the `resources/read` method. An unknown URI is reported in
    /// the payload, not as a protocol error.
    fn handle_resources_read(&self, params: Option<&Value>) -> Result<Value> {
        let uri = params
            .and_then(|p| p.get("uri"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| TypeLensError::missing("uri"))?;

        match self.resources.read(uri)? {
            Some(contents) => Ok(json!({ "contents": [contents] })),
            None => {
                warn!(uri, "unknown resource");
                Ok(json!({
                    "contents": [{
                        "uri": uri,
                        "mimeType": "text/plain",
                        "text": format!("Resource not found: {}", uri)
                    }],
                    "isError": true
                }))
            }
        }
    }

    /// Returns the current server runtime statistics as a JSON value.
    pub fn stats_json(&self) -> Value {
        let uptime = self.stats.started_at.elapsed();
        let tool_counts: Value = self
            .tool_call_counts
            .lock()
            .map(|counts| json!(*counts))
            .unwrap_or(json!({}));

        json!({
            "uptime_secs": uptime.as_secs(),
            "total_requests": self.stats.total_requests.load(Ordering::Relaxed),
            "tool_calls": self.stats.tool_calls.load(Ordering::Relaxed),
            "errors": self.stats.errors.load(Ordering::Relaxed),
            "tool_call_counts": tool_counts,
        })
    }
}
