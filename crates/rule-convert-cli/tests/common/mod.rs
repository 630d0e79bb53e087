// crates/rule-convert-cli/tests/common/mod.rs
// ============================================================================
// Module: CLI Test Tool Server
// Description: In-process JSON-RPC server standing in for the rule tools.
// Purpose: Drive the binary end to end without leaving the loopback interface.
// Dependencies: hyper, hyper-util, http-body-util, tokio, serde_json
// ============================================================================

#![allow(dead_code, reason = "Each integration test binary uses a subset of the helpers.")]

use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::process::Command;
use std::process::Output;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::Mutex;

use bytes::Bytes;
use http_body_util::BodyExt;
use http_body_util::Full;
use hyper::Request;
use hyper::Response;
use hyper::body::Incoming;
use hyper::header::CONTENT_TYPE;
use hyper::header::HeaderValue;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde_json::Value;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Detection tool name advertised by the stub server.
pub const DETECTION_TOOL: &str = "generate_dr_rule_detection";
/// Response tool name advertised by the stub server.
pub const RESPOND_TOOL: &str = "generate_dr_rule_respond";

/// Answers one JSON-RPC call: `Ok(result)` or `Err((code, message))`.
pub type Handler = dyn Fn(&str, &Value) -> Result<Value, (i64, String)> + Send + Sync;

/// JSON-RPC tool server bound to an ephemeral loopback port.
pub struct ToolServer {
    addr: SocketAddr,
    methods: Arc<Mutex<Vec<String>>>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl ToolServer {
    /// Starts the server; `handler(method, params)` produces each reply.
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<Value, (i64, String)> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind tool server");
        let addr = listener.local_addr().expect("local addr");
        let handler: Arc<Handler> = Arc::new(handler);
        let methods = Arc::new(Mutex::new(Vec::new()));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let methods_task = Arc::clone(&methods);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    accept = listener.accept() => {
                        let Ok((stream, _)) = accept else { continue };
                        let handler = Arc::clone(&handler);
                        let methods = Arc::clone(&methods_task);
                        tokio::spawn(async move {
                            let service = service_fn(move |req: Request<Incoming>| {
                                let handler = Arc::clone(&handler);
                                let methods = Arc::clone(&methods);
                                async move {
                                    let body = req.into_body().collect().await?.to_bytes();
                                    let reply = dispatch(&body, handler.as_ref(), &methods);
                                    Ok::<_, hyper::Error>(json_response(&reply))
                                }
                            });
                            let _ = http1::Builder::new()
                                .serve_connection(TokioIo::new(stream), service)
                                .await;
                        });
                    }
                }
            }
        });

        Self {
            addr,
            methods,
            shutdown: Some(shutdown_tx),
            handle,
        }
    }

    /// Endpoint URL for `--endpoint`.
    pub fn endpoint(&self) -> String {
        format!("http://{}/mcp", self.addr)
    }

    /// JSON-RPC methods received so far, in arrival order.
    pub fn methods(&self) -> Vec<String> {
        self.methods.lock().expect("methods lock").clone()
    }

    /// Stops accepting connections.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.handle.await;
    }
}

/// Decodes one request and wraps the handler reply in a JSON-RPC envelope.
fn dispatch(body: &[u8], handler: &Handler, methods: &Mutex<Vec<String>>) -> Value {
    let request: Value = serde_json::from_slice(body).expect("json-rpc request");
    let method = request["method"].as_str().unwrap_or_default().to_string();
    methods.lock().expect("methods lock").push(method.clone());
    match handler(&method, &request["params"]) {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": request["id"], "result": result }),
        Err((code, message)) => json!({
            "jsonrpc": "2.0",
            "id": request["id"],
            "error": { "code": code, "message": message }
        }),
    }
}

/// Serializes a JSON-RPC reply.
fn json_response(value: &Value) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(value).expect("serialize reply");
    let mut response = Response::new(Full::new(Bytes::from(body)));
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// `tools/list` result advertising `names`.
pub fn tool_list(names: &[&str]) -> Value {
    let tools: Vec<Value> = names
        .iter()
        .map(|name| json!({ "name": name, "description": "", "inputSchema": {} }))
        .collect();
    json!({ "tools": tools })
}

/// Tool name and query text of a `tools/call` request.
pub fn call_parts(params: &Value) -> (String, String) {
    let name = params["name"].as_str().unwrap_or_default().to_string();
    let query = params["arguments"]["query"].as_str().unwrap_or_default().to_string();
    (name, query)
}

/// Runs the binary with `args`, an isolated home, and `stdin` as input.
///
/// The process runs on the blocking pool so the server keeps serving.
pub async fn run_binary(args: Vec<String>, home: &Path, stdin: &str) -> Output {
    let home = home.to_path_buf();
    let stdin = stdin.to_string();
    tokio::task::spawn_blocking(move || {
        let mut child = Command::new(env!("CARGO_BIN_EXE_rule-convert"))
            .args(&args)
            .env_remove("LC_OID")
            .env_remove("LC_API_KEY")
            .env("HOME", &home)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn rule-convert");
        if let Some(mut input) = child.stdin.take() {
            let _ = input.write_all(stdin.as_bytes());
        }
        child.wait_with_output().expect("wait rule-convert")
    })
    .await
    .expect("join binary run")
}
