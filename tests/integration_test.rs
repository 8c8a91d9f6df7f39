//! End-to-end: a catalog file on disk, a config file, and a client paging
//! through results over the stdio line protocol.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;
use typelens::config::{load_config, save_config, ServerConfig};
use typelens::logging::LogBuffer;
use typelens::mcp::McpServer;
use typelens::metadata::{Catalog, MetadataProvider};
use typelens::resources::{StaticResources, LOGS_URI};
use typelens::serve::serve_lines;

fn write_fixture(dir: &TempDir) -> ServerConfig {
    let types: Vec<Value> = (0..12)
        .map(|i| {
            json!({
                "full_name": format!("Zoo.Animal{i:02}"),
                "fields": [{"name": "keeper", "type_name": "Zoo.Keeper"}]
            })
        })
        .chain(std::iter::once(json!({"full_name": "Zoo.Keeper"})))
        .collect();
    let catalog_path = dir.path().join("zoo.json");
    std::fs::write(
        &catalog_path,
        json!({"assemblies": [{"name": "Zoo", "types": types}]}).to_string(),
    )
    .unwrap();

    let config = ServerConfig {
        catalog_path: Some(catalog_path.display().to_string()),
        default_page_size: 5,
        ..ServerConfig::default()
    };
    let config_path = dir.path().join("config.json");
    save_config(&config_path, &config).unwrap();
    load_config(&config_path).unwrap()
}

fn build(config: &ServerConfig, logs: LogBuffer) -> McpServer {
    let path = config.catalog_path.as_deref().unwrap();
    let catalog: Arc<dyn MetadataProvider> = Arc::new(Catalog::load(Path::new(path)).unwrap());
    McpServer::from_config(catalog, Arc::new(StaticResources::with_logs(logs)), config)
}

async fn exchange(server: &McpServer, requests: &[Value]) -> Vec<Value> {
    let input: String = requests.iter().map(|r| format!("{r}\n")).collect();
    let mut output = Vec::new();
    serve_lines(server, input.as_bytes(), &mut output).await.unwrap();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

fn list_types(id: u64, cursor: Option<&str>) -> Value {
    let mut arguments = json!({"assembly_name": "zoo"});
    if let Some(c) = cursor {
        arguments["cursor"] = json!(c);
    }
    json!({"jsonrpc": "2.0", "id": id, "method": "tools/call",
           "params": {"name": "list_types", "arguments": arguments}})
}

fn tool_payload(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn test_page_through_catalog_over_stdio() {
    let dir = TempDir::new().unwrap();
    let config = write_fixture(&dir);
    let server = build(&config, LogBuffer::default());

    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;
    let mut id = 0;
    loop {
        id += 1;
        let responses = exchange(&server, &[list_types(id, cursor.as_deref())]).await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], id);
        let page = tool_payload(&responses[0]);
        assert_eq!(page["total_count"], 13);
        for item in page["items"].as_array().unwrap() {
            seen.push(item["full_name"].as_str().unwrap().to_string());
        }
        match page.get("nextCursor").and_then(Value::as_str) {
            Some(next) => cursor = Some(next.to_string()),
            None => break,
        }
    }

    assert_eq!(id, 3);
    assert_eq!(seen.len(), 13);
    assert_eq!(seen.first().map(String::as_str), Some("Zoo.Animal00"));
    assert_eq!(seen.last().map(String::as_str), Some("Zoo.Keeper"));
}

#[tokio::test]
async fn test_multi_target_path_and_mixed_batch() {
    let dir = TempDir::new().unwrap();
    let config = write_fixture(&dir);
    let server = build(&config, LogBuffer::default());

    let responses = exchange(
        &server,
        &[
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {
                "name": "find_type_path",
                "arguments": {"start_type": "Zoo.Animal03", "target_type": "Keeper", "max_depth": "2"}
            }}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call", "params": {
                "name": "list_types", "arguments": {"assembly_name": "zoo", "cursor": "bad"}
            }}),
        ],
    )
    .await;

    assert_eq!(responses.len(), 3);
    let paths = tool_payload(&responses[0]);
    assert_eq!(paths["paths"][0]["path"], "Animal03 -> keeper");
    assert_eq!(paths["max_depth"], 2);
    assert_eq!(responses[1]["result"], json!({}));
    assert_eq!(responses[2]["error"]["code"], -32603);
    assert!(responses[2]["error"]["message"]
        .as_str()
        .unwrap()
        .contains("invalid cursor"));
}

#[tokio::test]
async fn test_recent_logs_resource() {
    let dir = TempDir::new().unwrap();
    let config = write_fixture(&dir);
    let logs = LogBuffer::default();
    logs.push("1700000000 INFO typelens: catalog loaded");
    let server = build(&config, logs);

    let responses = exchange(
        &server,
        &[json!({"jsonrpc": "2.0", "id": 1, "method": "resources/read", "params": {"uri": LOGS_URI}})],
    )
    .await;
    let text = responses[0]["result"]["contents"][0]["text"].as_str().unwrap();
    assert!(text.contains("catalog loaded"));
}
