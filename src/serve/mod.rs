//! Transports. Each one only receives request bodies and writes back the
//! response bodies produced by [`McpServer`](crate::mcp::McpServer).

/// HTTP transport with a start/stop lifecycle.
pub mod http;

/// Line-delimited stdio transport.
pub mod stdio;

pub use http::{router, HttpServer};
pub use stdio::{run_stdio, serve_lines};
