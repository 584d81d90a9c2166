//! Mock inference backend for integration tests
//!
//! Serves an OpenAI-compatible API under `/v1` and a Workers-AI-shaped
//! `ai/run` API under `/client/v4`, recording every request it receives.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use futures_util::StreamExt;
use serde_json::{Value, json};
use tokio_util::sync::{CancellationToken, DropGuard};

/// PNG signature, base64-encoded
pub const PNG_B64: &str = "iVBORw0KGgo=";

/// PNG signature bytes
pub const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// URL returned by the OpenAI-shaped image route
pub const IMAGE_URL: &str = "https://images.example.com/generated.png";

/// How long a stalled non-streaming route waits before answering
pub const STALL_DELAY: Duration = Duration::from_secs(30);

/// How the mock answers chat requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Behavior {
    /// Plain text reply with usage
    #[default]
    Normal,
    /// Empty or null content, no tool calls, no usage
    Degenerate,
    /// A single `get_weather` tool call
    ToolCalls,
    /// Fail every request with the given status
    Fail(u16),
    /// Stream one text chunk, then keep the response open without sending more.
    /// Non-streaming routes answer only after [`STALL_DELAY`].
    Stall,
}

/// A request the mock received
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub path: String,
    pub body: Value,
    pub authorization: Option<String>,
    pub request_id: Option<String>,
}

/// Mock backend returning canned replies
pub struct MockBackend {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    behavior: Behavior,
    requests: Mutex<Vec<CapturedRequest>>,
    stream_closed: CancellationToken,
}

impl MockState {
    fn capture(&self, uri: &Uri, headers: &HeaderMap, body: &Value) {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(ToOwned::to_owned);

        self.requests.lock().unwrap().push(CapturedRequest {
            path: uri.path().to_owned(),
            body: body.clone(),
            authorization: header("authorization"),
            request_id: header("x-request-id"),
        });
    }
}

impl MockBackend {
    /// Start a mock answering normally
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with(Behavior::Normal).await
    }

    /// Start a mock with the given reply behavior
    pub async fn start_with(behavior: Behavior) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            behavior,
            requests: Mutex::new(Vec::new()),
            stream_closed: CancellationToken::new(),
        });

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(openai_chat))
            .route("/v1/images/generations", routing::post(openai_images))
            .route("/client/v4/accounts/{account}/ai/run/{*model}", routing::post(workers_ai_run))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for an OpenAI-compatible provider
    pub fn openai_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Base URL for a Workers AI provider
    pub fn workers_ai_url(&self) -> String {
        format!("http://{}/client/v4", self.addr)
    }

    /// All requests received so far
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Most recent request
    pub fn last_request(&self) -> CapturedRequest {
        self.requests().pop().expect("mock received a request")
    }

    /// Number of requests received
    pub fn request_count(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }

    /// Cancelled once a stalled stream body is dropped by the server
    pub fn stream_closed(&self) -> CancellationToken {
        self.state.stream_closed.clone()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn failure(status: u16, body: Value) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(body)).into_response()
}

fn sse(payloads: &[Value]) -> Response {
    let mut body = String::new();
    for payload in payloads {
        body.push_str(&format!("data: {payload}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");

    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

/// One SSE event followed by a body that never ends
///
/// The guard is dropped with the body, which happens when the peer closes
/// the connection.
fn stalled_sse(first: &Value, guard: DropGuard) -> Response {
    let first = futures_util::stream::once(std::future::ready(format!("data: {first}\n\n")));
    let body = first.chain(futures_util::stream::pending()).map(move |frame| {
        let _held = &guard;
        Ok::<_, Infallible>(frame)
    });

    ([(header::CONTENT_TYPE, "text/event-stream")], Body::from_stream(body)).into_response()
}

fn usage() -> Value {
    json!({"prompt_tokens": 5, "completion_tokens": 3, "total_tokens": 8})
}

// -- OpenAI-compatible routes --

async fn openai_chat(
    State(state): State<Arc<MockState>>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.capture(&uri, &headers, &body);

    if let Behavior::Fail(status) = state.behavior {
        return failure(
            status,
            json!({"error": {"message": "mock failure", "type": "server_error"}}),
        );
    }

    let model = body["model"].as_str().unwrap_or_default().to_owned();

    if body["stream"] == json!(true) {
        if state.behavior == Behavior::Stall {
            let first = json!({
                "id": "chatcmpl-upstream",
                "object": "chat.completion.chunk",
                "created": 1_700_000_000,
                "model": model,
                "choices": [{"index": 0, "delta": {"role": "assistant", "content": "Hello"}, "finish_reason": null}],
            });
            return stalled_sse(&first, state.stream_closed.clone().drop_guard());
        }
        return openai_stream(state.behavior, &model);
    }

    let (message, finish_reason, usage) = match state.behavior {
        Behavior::Degenerate => (json!({"role": "assistant", "content": null}), Value::Null, Value::Null),
        Behavior::ToolCalls => (
            json!({
                "role": "assistant",
                "content": "",
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "get_weather", "arguments": "{\"city\":\"Paris\"}"}
                }]
            }),
            json!("tool_calls"),
            usage(),
        ),
        _ => (
            json!({"role": "assistant", "content": "Hello from mock"}),
            json!("stop"),
            usage(),
        ),
    };

    Json(json!({
        "id": "chatcmpl-upstream",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{"index": 0, "message": message, "finish_reason": finish_reason}],
        "usage": usage,
    }))
    .into_response()
}

fn openai_stream(behavior: Behavior, model: &str) -> Response {
    let chunk = |delta: Value, finish: Value| {
        json!({
            "id": "chatcmpl-upstream",
            "object": "chat.completion.chunk",
            "created": 1_700_000_000,
            "model": model,
            "choices": [{"index": 0, "delta": delta, "finish_reason": finish}],
        })
    };

    let payloads = match behavior {
        Behavior::Degenerate => vec![chunk(json!({"role": "assistant"}), json!("stop"))],
        Behavior::ToolCalls => vec![
            chunk(
                json!({"role": "assistant", "tool_calls": [{
                    "index": 0,
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "get_weather", "arguments": ""}
                }]}),
                Value::Null,
            ),
            chunk(
                json!({"tool_calls": [{"index": 0, "function": {"arguments": "{\"city\":\"Paris\"}"}}]}),
                Value::Null,
            ),
            chunk(json!({}), json!("tool_calls")),
        ],
        _ => vec![
            chunk(json!({"role": "assistant", "content": "Hello"}), Value::Null),
            chunk(json!({"content": " from mock"}), Value::Null),
            chunk(json!({}), json!("stop")),
            json!({
                "id": "chatcmpl-upstream",
                "object": "chat.completion.chunk",
                "created": 1_700_000_000,
                "model": model,
                "choices": [],
                "usage": usage(),
            }),
        ],
    };

    sse(&payloads)
}

async fn openai_images(
    State(state): State<Arc<MockState>>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.capture(&uri, &headers, &body);

    if let Behavior::Fail(status) = state.behavior {
        return failure(
            status,
            json!({"error": {"message": "mock failure", "type": "server_error"}}),
        );
    }

    if state.behavior == Behavior::Stall {
        tokio::time::sleep(STALL_DELAY).await;
    }

    let n = body["n"].as_u64().unwrap_or(1);
    let b64 = body["response_format"] == json!("b64_json");

    let data: Vec<Value> = (0..n)
        .map(|_| {
            if b64 {
                json!({"b64_json": PNG_B64})
            } else {
                json!({"url": IMAGE_URL, "revised_prompt": "a revised prompt"})
            }
        })
        .collect();

    Json(json!({"created": 1_700_000_000, "data": data})).into_response()
}

// -- Workers AI routes --

async fn workers_ai_run(
    State(state): State<Arc<MockState>>,
    Path((_account, model)): Path<(String, String)>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.capture(&uri, &headers, &body);

    if let Behavior::Fail(status) = state.behavior {
        return failure(
            status,
            json!({"success": false, "result": null, "errors": [{"code": 7000, "message": "mock failure"}]}),
        );
    }

    if model.contains("flux") {
        return Json(json!({"success": true, "result": {"image": PNG_B64}})).into_response();
    }

    if model.contains("stable-diffusion") {
        return ([(header::CONTENT_TYPE, "image/png")], PNG_BYTES).into_response();
    }

    if model.contains("gpt-oss") {
        let message = match state.behavior {
            Behavior::Degenerate => json!({"type": "message", "content": []}),
            _ => json!({"type": "message", "content": [{"type": "output_text", "text": "Hello!"}]}),
        };

        return Json(json!({
            "success": true,
            "errors": [],
            "result": {
                "output": [
                    {"type": "reasoning", "content": [{"type": "reasoning_text", "text": "The user greets me."}]},
                    message,
                ],
                "usage": usage(),
            }
        }))
        .into_response();
    }

    if body["stream"] == json!(true) {
        let payloads = match state.behavior {
            Behavior::Degenerate => vec![json!({"response": ""})],
            Behavior::ToolCalls => vec![
                json!({"tool_calls": [{"id": "call_a", "name": "search", "arguments": {"q": "a"}}]}),
                json!({"tool_calls": [{"id": "call_b", "name": "lookup", "arguments": {"id": 1}}]}),
                json!({"response": "", "usage": usage()}),
            ],
            _ => vec![
                json!({"response": "Hel"}),
                json!({"response": "lo"}),
                json!({"response": "", "usage": usage()}),
            ],
        };
        return sse(&payloads);
    }

    let result = match state.behavior {
        Behavior::Degenerate => json!({"response": ""}),
        Behavior::ToolCalls => json!({
            "response": null,
            "tool_calls": [{"name": "get_weather", "arguments": {"city": "Paris"}}],
            "usage": usage(),
        }),
        _ => json!({"response": "Hello from workers", "usage": usage()}),
    };

    Json(json!({"success": true, "errors": [], "result": result})).into_response()
}
