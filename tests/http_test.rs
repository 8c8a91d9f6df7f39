use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use typelens::config::ServerConfig;
use typelens::mcp::McpServer;
use typelens::metadata::Catalog;
use typelens::resources::StaticResources;
use typelens::serve::HttpServer;

struct Reply {
    status: u16,
    content_type: String,
    body: String,
}

fn http_server() -> HttpServer {
    let doc = json!({"assemblies": [{"name": "Lib", "types": [{"full_name": "Lib.Thing"}]}]});
    let server = McpServer::from_config(
        Arc::new(Catalog::from_json(&doc.to_string()).unwrap()),
        Arc::new(StaticResources::new()),
        &ServerConfig::default(),
    );
    HttpServer::new(Arc::new(server), "127.0.0.1:0")
}

fn agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .into()
}

async fn post(addr: SocketAddr, body: String) -> Reply {
    tokio::task::spawn_blocking(move || {
        let mut resp = agent()
            .post(&format!("http://{addr}/"))
            .header("Content-Type", "application/json")
            .send(body.as_str())
            .unwrap();
        Reply {
            status: resp.status().as_u16(),
            content_type: content_type(resp.headers()),
            body: resp.body_mut().read_to_string().unwrap(),
        }
    })
    .await
    .unwrap()
}

async fn get(addr: SocketAddr, path: &str) -> Reply {
    let url = format!("http://{addr}{path}");
    tokio::task::spawn_blocking(move || {
        let mut resp = agent().get(&url).call().unwrap();
        Reply {
            status: resp.status().as_u16(),
            content_type: content_type(resp.headers()),
            body: resp.body_mut().read_to_string().unwrap(),
        }
    })
    .await
    .unwrap()
}

fn content_type(headers: &ureq::http::HeaderMap) -> String {
    headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Sends a raw preflight request and returns the response head, lowercased.
async fn preflight(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "OPTIONS {path} HTTP/1.1\r\nHost: {addr}\r\nOrigin: http://tools.example\r\n\
         Access-Control-Request-Method: POST\r\nConnection: close\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    raw.to_lowercase()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_post_round_trip() {
    let http = http_server();
    let addr = http.start().await.unwrap();

    let reply = post(addr, json!({"jsonrpc": "2.0", "id": 7, "method": "ping"}).to_string()).await;
    assert_eq!(reply.status, 200);
    assert!(reply.content_type.starts_with("application/json"));
    let body: Value = serde_json::from_str(&reply.body).unwrap();
    assert_eq!(body, json!({"jsonrpc": "2.0", "id": 7, "result": {}}));

    let reply = post(
        addr,
        json!({"jsonrpc": "2.0", "id": 8, "method": "tools/call",
               "params": {"name": "search_types", "arguments": {"query": "thing"}}})
        .to_string(),
    )
    .await;
    let body: Value = serde_json::from_str(&reply.body).unwrap();
    let text = body["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("Lib.Thing"));

    http.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_protocol_errors_stay_in_envelope() {
    let http = http_server();
    let addr = http.start().await.unwrap();

    let reply = post(addr, json!({"jsonrpc": "2.0", "id": 1, "method": "bogus/method"}).to_string()).await;
    assert_eq!(reply.status, 200);
    let body: Value = serde_json::from_str(&reply.body).unwrap();
    assert_eq!(body["error"]["code"], -32601);
    assert!(body.get("result").is_none());

    http.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_malformed_body_is_plain_400() {
    let http = http_server();
    let addr = http.start().await.unwrap();

    let reply = post(addr, "{ this is not json".to_string()).await;
    assert_eq!(reply.status, 400);
    assert!(reply.content_type.starts_with("text/plain"));
    assert!(serde_json::from_str::<Value>(&reply.body).is_err());

    http.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_health() {
    let http = http_server();
    let addr = http.start().await.unwrap();

    let reply = get(addr, "/health").await;
    assert_eq!(reply.status, 200);
    let body: Value = serde_json::from_str(&reply.body).unwrap();
    assert_eq!(body, json!({"status": "ok", "service": "typelens"}));

    http.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_options_on_any_path() {
    let http = http_server();
    let addr = http.start().await.unwrap();

    for path in ["/", "/health", "/somewhere/else"] {
        let head = preflight(addr, path).await;
        assert!(head.starts_with("http/1.1 200"), "{path}: {head}");
        assert!(head.contains("access-control-allow-origin: *"), "{path}: {head}");
        assert!(head.contains("access-control-allow-methods:"), "{path}: {head}");
        assert!(head.contains("post"), "{path}: {head}");
        assert!(head.contains("content-type"), "{path}: {head}");
    }

    http.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_start_stop_idempotent() {
    let http = http_server();
    assert!(!http.is_running().await);
    http.stop().await;

    let first = http.start().await.unwrap();
    let second = http.start().await.unwrap();
    assert_eq!(first, second);
    assert!(http.is_running().await);
    assert_eq!(http.local_addr().await, Some(first));

    http.stop().await;
    http.stop().await;
    assert!(!http.is_running().await);
    assert!(TcpStream::connect(first).await.is_err());

    let restarted = http.start().await.unwrap();
    let reply = get(restarted, "/health").await;
    assert_eq!(reply.status, 200);
    http.stop().await;
}
