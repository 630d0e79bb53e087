// crates/rule-convert-core/src/tests/mcp_client.rs
// ============================================================================
// Module: MCP Client Tests
// Description: Unit tests for envelope decoding, SSE parsing, and HTTP calls.
// Purpose: Ensure tool client protocol handling stays deterministic and bounded.
// Dependencies: rule-convert-core mcp_client, test support server
// ============================================================================

//! ## Overview
//! Validates JSON and event-stream replies, headers, request ids, session
//! echoing, error mapping, and linked resource downloads.

use hyper::StatusCode;
use rule_convert_config::Credentials;
use serde_json::Value;
use serde_json::json;

use crate::mcp_client::McpClient;
use crate::mcp_client::McpClientConfig;
use crate::mcp_client::McpClientError;
use crate::mcp_client::decode_json_reply;
use crate::mcp_client::parse_sse_body;
use crate::tests::support::TestHttpServer;
use crate::tests::support::TestResponse;
use crate::tests::support::jsonrpc_error;
use crate::tests::support::jsonrpc_result;

fn client_for(server: &TestHttpServer) -> McpClient {
    let credentials = Credentials::new("org-1", "secret-key").expect("credentials");
    McpClient::new(McpClientConfig::new(format!("{}/mcp", server.url()), credentials))
        .expect("client")
}

#[test]
fn parse_sse_body_returns_first_result() {
    let body = b"event: message\ndata: not-json\ndata: {\"jsonrpc\":\"2.0\"}\n\
data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"ok\":true}}\n\
data: {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{\"ok\":false}}\n";
    let parsed = parse_sse_body(body).expect("parse sse");
    assert_eq!(parsed, json!({"ok": true}));
}

#[test]
fn parse_sse_body_surfaces_first_error() {
    let body = b"data: {\"error\":{\"code\":-32000,\"message\":\"boom\"}}\n\
data: {\"result\":{}}\n";
    let err = parse_sse_body(body).expect_err("expected rpc error");
    assert!(matches!(err, McpClientError::Rpc { code: -32000, .. }));
    assert_eq!(err.to_string(), "MCP error -32000: boom");
}

#[test]
fn parse_sse_body_without_usable_event_is_empty_object() {
    let parsed = parse_sse_body(b"event: ping\n\ndata:{\"result\":1}\n").expect("parse sse");
    assert_eq!(parsed, json!({}));
}

#[test]
fn parse_sse_body_errors_on_invalid_utf8() {
    let err = parse_sse_body(&[0xff, 0xfe]).expect_err("expected utf8 error");
    assert!(matches!(err, McpClientError::Protocol(_)));
}

#[test]
fn decode_json_reply_defaults_missing_result() {
    let parsed = decode_json_reply(br#"{"jsonrpc":"2.0","id":1}"#).expect("decode");
    assert_eq!(parsed, json!({}));
    let err = decode_json_reply(b"[1,2]").expect_err("expected protocol error");
    assert!(matches!(err, McpClientError::Protocol(_)));
}

#[tokio::test]
async fn list_tools_sends_credentials_and_increments_ids() {
    let server = TestHttpServer::start(|_| {
        TestResponse::json(&jsonrpc_result(json!({
            "tools": [
                {"name": "generate_dr_rule_detection", "description": "d", "inputSchema": {"type": "object"}},
                {"name": "generate_dr_rule_respond"}
            ]
        })))
    })
    .await;
    let client = client_for(&server);

    let tools = client.list_tools().await.expect("list tools");
    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0].input_schema, json!({"type": "object"}));
    assert_eq!(tools[1].description, "");
    client.list_tools().await.expect("list tools again");

    let requests = server.requests().await;
    assert_eq!(requests.len(), 2);
    let first = &requests[0];
    assert_eq!(first.method, hyper::Method::POST);
    assert_eq!(first.path, "/mcp");
    assert_eq!(first.header("authorization").as_deref(), Some("Bearer secret-key:org-1"));
    assert_eq!(first.header("x-lc-oid").as_deref(), Some("org-1"));
    assert_eq!(
        first.header("accept").as_deref(),
        Some("application/json, text/event-stream")
    );
    assert!(first.header("mcp-session-id").is_none());
    assert_eq!(first.header("content-type").as_deref(), Some("application/json"));
    let body = first.json();
    assert_eq!(body["jsonrpc"], "2.0");
    assert_eq!(body["method"], "tools/list");
    assert_eq!(body["params"], json!({}));
    assert_eq!(body["id"], 1);
    assert_eq!(requests[1].json()["id"], 2);
    server.shutdown().await;
}

#[tokio::test]
async fn list_tools_without_tools_member_is_empty() {
    let server = TestHttpServer::start(|_| TestResponse::json(&jsonrpc_result(json!({})))).await;
    let client = client_for(&server);
    assert!(client.list_tools().await.expect("list tools").is_empty());
    server.shutdown().await;
}

#[tokio::test]
async fn session_id_is_recorded_once_and_echoed() {
    let mut count = 0;
    let server = TestHttpServer::start(move |_| {
        count += 1;
        TestResponse::json(&jsonrpc_result(json!({})))
            .with_header("mcp-session-id", &format!("session-{count}"))
    })
    .await;
    let client = client_for(&server);

    client.call_tool("generate_dr_rule_detection", json!({"query": "q"})).await.expect("call");
    client.call_tool("generate_dr_rule_detection", json!({"query": "q"})).await.expect("call");
    client.call_tool("generate_dr_rule_detection", json!({"query": "q"})).await.expect("call");

    assert_eq!(client.session_id(), Some("session-1"));
    let requests = server.requests().await;
    assert!(requests[0].header("mcp-session-id").is_none());
    assert_eq!(requests[1].header("mcp-session-id").as_deref(), Some("session-1"));
    assert_eq!(requests[2].header("mcp-session-id").as_deref(), Some("session-1"));
    server.shutdown().await;
}

#[tokio::test]
async fn call_tool_sends_name_and_arguments_and_reads_sse() {
    let server = TestHttpServer::start(|_| {
        TestResponse::sse_json(&jsonrpc_result(json!({
            "structuredContent": {"detection": "event: NEW_PROCESS"}
        })))
    })
    .await;
    let client = client_for(&server);

    let result =
        client.call_tool("generate_dr_rule_detection", json!({"query": "hello"})).await.expect("call");
    assert_eq!(result["structuredContent"]["detection"], "event: NEW_PROCESS");

    let requests = server.requests().await;
    let body = requests[0].json();
    assert_eq!(body["method"], "tools/call");
    assert_eq!(body["params"]["name"], "generate_dr_rule_detection");
    assert_eq!(body["params"]["arguments"]["query"], "hello");
    server.shutdown().await;
}

#[tokio::test]
async fn call_tool_maps_jsonrpc_error() {
    let server =
        TestHttpServer::start(|_| TestResponse::json(&jsonrpc_error(-32601, "unknown tool"))).await;
    let client = client_for(&server);
    let err = client.call_tool("nope", json!({})).await.expect_err("expected rpc error");
    assert_eq!(err.to_string(), "MCP error -32601: unknown tool");
    server.shutdown().await;
}

#[tokio::test]
async fn call_tool_rejects_http_errors_with_preview() {
    let server = TestHttpServer::start(|_| {
        TestResponse::raw(StatusCode::UNAUTHORIZED, "text/plain", "bad credentials")
    })
    .await;
    let client = client_for(&server);
    let err = client.call_tool("x", json!({})).await.expect_err("expected status error");
    assert!(matches!(err, McpClientError::Transport(_)));
    let message = err.to_string();
    assert!(message.contains("http status 401"), "{message}");
    assert!(message.contains("bad credentials"), "{message}");
    server.shutdown().await;
}

#[tokio::test]
async fn call_tool_rejects_unexpected_content_type() {
    let server =
        TestHttpServer::start(|_| TestResponse::raw(StatusCode::OK, "text/html", "<html/>")).await;
    let client = client_for(&server);
    let err = client.call_tool("x", json!({})).await.expect_err("expected content type error");
    assert!(matches!(err, McpClientError::UnexpectedContentType(ref value) if value == "text/html"));
    server.shutdown().await;
}

#[tokio::test]
async fn concurrent_calls_get_unique_ids() {
    let server = TestHttpServer::start(|_| TestResponse::json(&jsonrpc_result(json!({})))).await;
    let client = std::sync::Arc::new(client_for(&server));
    let mut handles = Vec::new();
    for _ in 0 .. 8 {
        let client = std::sync::Arc::clone(&client);
        handles.push(tokio::spawn(async move { client.call_tool("x", json!({})).await }));
    }
    for handle in handles {
        handle.await.expect("join").expect("call");
    }
    let mut ids: Vec<u64> = server
        .requests()
        .await
        .iter()
        .map(|request| request.json()["id"].as_u64().expect("numeric id"))
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (1 ..= 8).collect::<Vec<u64>>());
    server.shutdown().await;
}

#[tokio::test]
async fn fetch_resource_returns_body_and_rejects_errors() {
    let server = TestHttpServer::start(|request| {
        if request.path == "/blob" {
            TestResponse::raw(StatusCode::OK, "application/json", r#"{"detection":"a: 1"}"#)
        } else {
            TestResponse::raw(StatusCode::NOT_FOUND, "text/plain", "missing")
        }
    })
    .await;
    let client = client_for(&server);

    let body = client.fetch_resource(&format!("{}/blob", server.url())).await.expect("fetch");
    let parsed: Value = serde_json::from_str(&body).expect("json body");
    assert_eq!(parsed["detection"], "a: 1");

    let err = client
        .fetch_resource(&format!("{}/gone", server.url()))
        .await
        .expect_err("expected status error");
    assert!(err.to_string().contains("http status 404"));

    let requests = server.requests().await;
    assert_eq!(requests[0].method, hyper::Method::GET);
    assert!(requests[0].header("authorization").is_none());
    server.shutdown().await;
}

#[test]
fn config_debug_redacts_api_key() {
    let credentials = Credentials::new("org-1", "very-secret-key").expect("credentials");
    let rendered = format!("{:?}", McpClientConfig::new("https://example.test/mcp", credentials));
    assert!(!rendered.contains("very-secret-key"));
    assert!(rendered.contains("<redacted>"));
}
