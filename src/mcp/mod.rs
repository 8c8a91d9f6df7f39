//! JSON-RPC 2.0 request handling.
//!
//! Exposes the metadata tools over the Model Context Protocol method set
//! (`initialize`, `tools/*`, `resources/*`, `ping`, notifications). The
//! transports in [`crate::serve`] only move request and response bodies.

/// Request dispatcher.
pub mod server;

/// Tool definitions and dispatch.
pub mod tools;

/// JSON-RPC 2.0 envelope types.
pub mod transport;

pub use server::McpServer;
pub use tools::{get_tool_definitions, ToolDefinition, ToolRegistry, ToolResult};
pub use transport::{ErrorCode, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
