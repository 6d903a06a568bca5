//! HTTP surface serving a [`ToolRegistry`].

use crate::descriptor::ToolArgs;
use crate::error::InvocationError;
use crate::registry::ToolRegistry;
use crate::wire::{CallToolRequest, CallToolResponse, ErrorBody, ErrorResponse, ToolListResponse};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse as _, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;

/// Routes: `GET /health`, `GET /tools`, `POST /tools/{name}`.
pub fn router(registry: Arc<ToolRegistry>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tools", get(list_tools))
        .route("/tools/{name}", post(call_tool))
        .with_state(registry)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_tools(State(registry): State<Arc<ToolRegistry>>) -> Json<ToolListResponse> {
    Json(ToolListResponse {
        tools: registry.list().cloned().collect(),
    })
}

async fn call_tool(
    State(registry): State<Arc<ToolRegistry>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    let arguments: ToolArgs = if body.iter().all(u8::is_ascii_whitespace) {
        ToolArgs::new()
    } else {
        match serde_json::from_slice::<CallToolRequest>(&body) {
            Ok(req) => req.arguments,
            Err(e) => {
                let err = InvocationError::invalid_parameter(
                    "arguments",
                    format!("request body is not a valid tool call: {e}"),
                );
                return error_response(&err);
            }
        }
    };

    match registry.invoke(&name, &arguments).await {
        Ok(result) => Json(CallToolResponse { result }).into_response(),
        Err(e) => {
            tracing::info!(tool = %name, error = %e, "tool call failed");
            error_response(&e)
        }
    }
}

fn error_response(e: &InvocationError) -> Response {
    let body = ErrorBody::from(e);
    let status =
        StatusCode::from_u16(body.kind.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse { error: body })).into_response()
}

#[cfg(test)]
mod tests {
    use super::router;
    use crate::descriptor::{ParamSpec, ParamType, ToolArgs, ToolDescriptor};
    use crate::error::ToolError;
    use crate::registry::{ToolRegistry, handler_fn};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tokio::net::TcpListener;

    async fn serve(registry: ToolRegistry) -> (String, tokio::sync::oneshot::Sender<()>) {
        let app = router(Arc::new(registry));
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local_addr");
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        tokio::spawn(async move { server.await });
        (format!("http://{addr}"), shutdown_tx)
    }

    fn echo_registry() -> ToolRegistry {
        let mut reg = ToolRegistry::new();
        reg.register(
            ToolDescriptor::new("echo", "Echo arguments")
                .param(ParamSpec::required("text", ParamType::String, "")),
            handler_fn(|a: ToolArgs| async move { Ok(Value::Object(a)) }),
        )
        .expect("register");
        reg.register(
            ToolDescriptor::new("down", "Always unavailable"),
            handler_fn(|_| async {
                Err(ToolError::Unavailable {
                    message: "engine unreachable".to_string(),
                })
            }),
        )
        .expect("register");
        reg
    }

    #[tokio::test]
    async fn lists_and_calls_tools_over_http() {
        let (base, shutdown) = serve(echo_registry()).await;
        let http = reqwest::Client::new();

        let listed: Value = http
            .get(format!("{base}/tools"))
            .send()
            .await
            .expect("list")
            .json()
            .await
            .expect("list json");
        let names: Vec<&str> = listed["tools"]
            .as_array()
            .expect("tools array")
            .iter()
            .filter_map(|t| t["name"].as_str())
            .collect();
        assert_eq!(names, vec!["echo", "down"]);

        let resp = http
            .post(format!("{base}/tools/echo"))
            .json(&json!({"arguments": {"text": 3}}))
            .send()
            .await
            .expect("call");
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.expect("call json");
        assert_eq!(body, json!({"result": {"text": "3"}}));

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn maps_errors_to_status_codes() {
        let (base, shutdown) = serve(echo_registry()).await;
        let http = reqwest::Client::new();

        let missing = http
            .post(format!("{base}/tools/echo"))
            .send()
            .await
            .expect("call");
        assert_eq!(missing.status(), 422);
        let body: Value = missing.json().await.expect("json");
        assert_eq!(body["error"]["kind"], "invalid_parameter");
        assert_eq!(body["error"]["name"], "text");

        let unknown = http
            .post(format!("{base}/tools/ecko"))
            .json(&json!({}))
            .send()
            .await
            .expect("call");
        assert_eq!(unknown.status(), 404);

        let down = http
            .post(format!("{base}/tools/down"))
            .json(&json!({"arguments": {}}))
            .send()
            .await
            .expect("call");
        assert_eq!(down.status(), 503);

        let _ = shutdown.send(());
    }
}
