use anyhow::Context as _;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse as _, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::net::TcpListener;
use std::process::Child;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct KillOnDrop(pub Child);

impl Drop for KillOnDrop {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

/// Pick an unused TCP port on localhost.
///
/// Note: this does not reserve the port; it's still possible for another process to bind it
/// before you do.
///
/// # Errors
///
/// Returns an error if binding an ephemeral localhost port fails or if the bound socket's
/// local address cannot be read.
pub fn pick_unused_port() -> anyhow::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").context("bind ephemeral port")?;
    Ok(listener.local_addr()?.port())
}

/// Poll an HTTP URL until it returns a success status (2xx/3xx).
///
/// # Errors
///
/// Returns an error if the timeout elapses before the endpoint returns a success status.
pub async fn wait_http_ok(url: &str, timeout_dur: Duration) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let start = Instant::now();
    loop {
        if start.elapsed() > timeout_dur {
            anyhow::bail!("timed out waiting for {url}");
        }

        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => return Ok(()),
            _ => tokio::time::sleep(Duration::from_millis(200)).await,
        }
    }
}

#[derive(Default)]
struct EngineState {
    runtimes: Value,
    listing_failures: VecDeque<u16>,
    execute_failures: VecDeque<u16>,
    execute_response: Option<(u16, Value)>,
    execute_delay: Duration,
    execute_requests: Vec<Value>,
    listing_calls: usize,
}

type SharedState = Arc<Mutex<EngineState>>;

/// In-process stand-in for a Piston-compatible engine.
///
/// `POST /execute` answers with the text of every `print('...')` line of the submitted source
/// unless a canned response is set; unknown `(language, version)` pairs get a 400.
pub struct FakeEngine {
    base_url: String,
    state: SharedState,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl FakeEngine {
    /// Start serving `runtimes` (a `GET /runtimes` body) on an ephemeral port.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start(runtimes: Value) -> anyhow::Result<Self> {
        let state: SharedState = Arc::new(Mutex::new(EngineState {
            runtimes,
            ..EngineState::default()
        }));
        let app = Router::new()
            .route("/runtimes", get(list_runtimes))
            .route("/execute", post(execute))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind fake engine")?;
        let addr = listener.local_addr().context("fake engine local_addr")?;
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        tokio::spawn(async move {
            let _ = server.await;
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            state,
            shutdown: Some(shutdown_tx),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_runtimes(&self, runtimes: Value) {
        self.state.lock().runtimes = runtimes;
    }

    /// Answer the next `count` listings with `status`.
    pub fn fail_next_listings(&self, count: usize, status: u16) {
        self.state
            .lock()
            .listing_failures
            .extend(std::iter::repeat_n(status, count));
    }

    /// Answer the next `count` executions with `status`.
    pub fn fail_next_executes(&self, count: usize, status: u16) {
        self.state
            .lock()
            .execute_failures
            .extend(std::iter::repeat_n(status, count));
    }

    /// Answer every execution with this status and body instead of echoing.
    pub fn set_execute_response(&self, status: u16, body: Value) {
        self.state.lock().execute_response = Some((status, body));
    }

    pub fn set_execute_delay(&self, delay: Duration) {
        self.state.lock().execute_delay = delay;
    }

    /// Bodies of every `POST /execute` received so far.
    #[must_use]
    pub fn execute_requests(&self) -> Vec<Value> {
        self.state.lock().execute_requests.clone()
    }

    #[must_use]
    pub fn execute_calls(&self) -> usize {
        self.state.lock().execute_requests.len()
    }

    #[must_use]
    pub fn listing_calls(&self) -> usize {
        self.state.lock().listing_calls
    }
}

impl Drop for FakeEngine {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

fn failure(status: u16) -> Response {
    let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        code,
        Json(json!({ "message": format!("fake engine failure ({status})") })),
    )
        .into_response()
}

async fn list_runtimes(State(state): State<SharedState>) -> Response {
    let mut s = state.lock();
    s.listing_calls += 1;
    if let Some(status) = s.listing_failures.pop_front() {
        return failure(status);
    }
    Json(s.runtimes.clone()).into_response()
}

async fn execute(State(state): State<SharedState>, Json(body): Json<Value>) -> Response {
    let delay = {
        let mut s = state.lock();
        s.execute_requests.push(body.clone());
        s.execute_delay
    };
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let mut s = state.lock();
    if let Some(status) = s.execute_failures.pop_front() {
        return failure(status);
    }
    if let Some((status, canned)) = s.execute_response.clone() {
        let code = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
        return (code, Json(canned)).into_response();
    }

    let language = body["language"].as_str().unwrap_or_default();
    let version = body["version"].as_str().unwrap_or_default();
    let known = s.runtimes.as_array().is_some_and(|rts| {
        rts.iter()
            .any(|r| r["language"] == language && r["version"] == version)
    });
    if !known {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": format!("{language}-{version} runtime is unknown") })),
        )
            .into_response();
    }

    let source = body["files"][0]["content"].as_str().unwrap_or_default();
    let stdout = echo_prints(source);
    Json(json!({
        "language": language,
        "version": version,
        "run": {
            "stdout": stdout,
            "stderr": "",
            "code": 0,
            "signal": null,
            "output": stdout,
        }
    }))
    .into_response()
}

/// Text of every `print('...')` / `print("...")` line, newline-terminated.
#[must_use]
pub fn echo_prints(source: &str) -> String {
    let mut out = String::new();
    for line in source.lines() {
        let Some(rest) = line.trim().strip_prefix("print(") else {
            continue;
        };
        let mut chars = rest.chars();
        let Some(quote) = chars.next().filter(|c| *c == '\'' || *c == '"') else {
            continue;
        };
        let body = chars.as_str();
        if let Some(end) = body.find(quote) {
            out.push_str(&body[..end]);
            out.push('\n');
        }
    }
    out
}
