use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

use crate::errors::Result;
use crate::mcp::{ErrorCode, JsonRpcResponse, McpServer};

/// Serves newline-delimited requests from stdin, writing one response line
/// per request to stdout. Returns when stdin is closed.
pub async fn run_stdio(server: &McpServer) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    info!(service = server.service_name(), "stdio transport ready");
    serve_lines(server, stdin, stdout).await?;
    info!(stats = %server.stats_json(), "stdio transport closed");
    Ok(())
}

/// The line loop behind [`run_stdio`], over any reader and writer.
///
/// Blank lines are skipped. A line that is not a request envelope is
/// answered with a parse error carrying a null id.
pub async fn serve_lines<R, W>(server: &McpServer, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match server.handle_body(line) {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "unparseable request line");
                JsonRpcResponse::error(Value::Null, ErrorCode::ParseError, e.to_string())
            }
        };

        let json_line = match serde_json::to_string(&response) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "failed to serialize response");
                continue;
            }
        };
        writer.write_all(json_line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ServerConfig;
    use crate::metadata::Catalog;
    use crate::resources::StaticResources;

    fn server() -> McpServer {
        McpServer::from_config(
            Arc::new(Catalog::empty()),
            Arc::new(StaticResources::new()),
            &ServerConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_one_response_per_line() {
        let input = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n\n{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"nope\"}\n";
        let mut output = Vec::new();
        serve_lines(&server(), &input[..], &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let responses: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["result"], serde_json::json!({}));
        assert_eq!(responses[1]["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_garbage_line_gets_parse_error() {
        let input = b"not json\n";
        let mut output = Vec::new();
        serve_lines(&server(), &input[..], &mut output).await.unwrap();

        let response: Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(response["error"]["code"], -32700);
        assert!(response["id"].is_null());
    }
}
