//! Name → (descriptor, handler) registry with schema validation on invoke.

use crate::descriptor::{ToolArgs, ToolDescriptor};
use crate::error::{InvocationError, RegistryError, ToolError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

/// Invocation capability shared by every tool, local or remote.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool with coerced, fully-defaulted arguments.
    async fn call(&self, args: ToolArgs) -> Result<Value, ToolError>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(ToolArgs) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ToolError>> + Send,
{
    async fn call(&self, args: ToolArgs) -> Result<Value, ToolError> {
        (self.0)(args).await
    }
}

/// Adapt an async closure into a [`ToolHandler`].
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(ToolArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: Arc<dyn ToolHandler>,
}

/// Registry of tools in registration order.
///
/// Built once at startup and then shared read-only (e.g. behind an `Arc`).
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool name is already taken, if two parameters share a name, or if
    /// a required parameter declares a default.
    pub fn register(
        &mut self,
        descriptor: ToolDescriptor,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), RegistryError> {
        if self.index.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateTool(descriptor.name));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for p in &descriptor.parameters {
            if !seen.insert(p.name.as_str()) {
                return Err(RegistryError::DuplicateParam {
                    tool: descriptor.name.clone(),
                    param: p.name.clone(),
                });
            }
            if p.required && p.default.is_some() {
                return Err(RegistryError::RequiredWithDefault {
                    tool: descriptor.name.clone(),
                    param: p.name.clone(),
                });
            }
        }

        self.index.insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool {
            descriptor,
            handler,
        });
        Ok(())
    }

    #[must_use]
    pub fn describe(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i].descriptor)
    }

    /// Descriptors in registration order.
    pub fn list(&self) -> impl ExactSizeIterator<Item = &ToolDescriptor> {
        self.tools.iter().map(|t| &t.descriptor)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate `raw_args` against the tool's schema and run its handler.
    ///
    /// # Errors
    ///
    /// - [`InvocationError::UnknownTool`] if no tool has this name
    /// - [`InvocationError::InvalidParameter`] for unknown arguments, missing required
    ///   parameters, or values that cannot be coerced; the handler is not called
    /// - [`InvocationError::Tool`] if the handler itself fails
    pub async fn invoke(&self, name: &str, raw_args: &ToolArgs) -> Result<Value, InvocationError> {
        let Some(&i) = self.index.get(name) else {
            let known: Vec<&str> = self.tools.iter().map(|t| t.descriptor.name.as_str()).collect();
            return Err(InvocationError::UnknownTool {
                name: name.to_string(),
                suggestions: find_similar_strings(name, &known),
            });
        };
        let tool = &self.tools[i];

        let args = prepare_arguments(&tool.descriptor, raw_args)?;
        tracing::debug!(tool = %name, "invoking tool");
        tool.handler.call(args).await.map_err(InvocationError::from)
    }
}

/// Apply defaults and coercion; reject unknown or missing parameters.
fn prepare_arguments(
    descriptor: &ToolDescriptor,
    raw_args: &ToolArgs,
) -> Result<ToolArgs, InvocationError> {
    for key in raw_args.keys() {
        if descriptor.parameter(key).is_some() {
            continue;
        }
        let valid: Vec<&str> = descriptor.parameters.iter().map(|p| p.name.as_str()).collect();
        let reason = match find_similar_strings(key, &valid).first() {
            Some(s) => format!("unknown parameter (did you mean '{s}'?)"),
            None => "unknown parameter".to_string(),
        };
        return Err(InvocationError::invalid_parameter(key.clone(), reason));
    }

    let mut out = ToolArgs::new();
    for spec in &descriptor.parameters {
        let supplied = raw_args.get(&spec.name).filter(|v| !v.is_null());
        let value = match (supplied, spec.required) {
            (Some(v), _) => v,
            (None, true) => {
                return Err(InvocationError::invalid_parameter(
                    spec.name.clone(),
                    "missing required parameter",
                ));
            }
            (None, false) => match spec.default.as_ref() {
                Some(d) => d,
                None => continue,
            },
        };

        let coerced = spec
            .coerce(value)
            .map_err(|reason| InvocationError::invalid_parameter(spec.name.clone(), reason))?;
        out.insert(spec.name.clone(), coerced);
    }
    Ok(out)
}

fn find_similar_strings(unknown: &str, known: &[&str]) -> Vec<String> {
    let mut candidates: Vec<(f64, String)> = Vec::new();
    for k in known {
        let score = strsim::jaro(unknown, k);
        if score > 0.7 {
            candidates.push((score, (*k).to_string()));
        }
    }
    candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    candidates.into_iter().map(|(_, s)| s).collect()
}

#[cfg(test)]
mod tests {
    use super::{ToolRegistry, handler_fn};
    use crate::descriptor::{ParamSpec, ParamType, ToolArgs, ToolDescriptor};
    use crate::error::{InvocationError, RegistryError, ToolError};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn args(v: Value) -> ToolArgs {
        v.as_object().cloned().expect("object literal")
    }

    fn counting_registry(calls: Arc<AtomicUsize>) -> ToolRegistry {
        let mut reg = ToolRegistry::new();
        let descriptor = ToolDescriptor::new("search", "Search things")
            .param(ParamSpec::required("query", ParamType::String, "what to find"))
            .param(ParamSpec::optional("limit", ParamType::Integer, "max hits").with_default(json!(5)))
            .param(ParamSpec::optional("tags", ParamType::Array, "filters"))
            .param(ParamSpec::optional("safe", ParamType::Boolean, ""));
        reg.register(
            descriptor,
            handler_fn(move |a: ToolArgs| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Value::Object(a))
                }
            }),
        )
        .expect("register");
        reg
    }

    #[tokio::test]
    async fn invoke_applies_defaults_and_coerces() {
        let calls = Arc::new(AtomicUsize::new(0));
        let reg = counting_registry(calls.clone());

        let out = reg
            .invoke("search", &args(json!({"query": 7, "tags": "a,b", "safe": "yes"})))
            .await
            .expect("invoke");

        assert_eq!(
            out,
            json!({"query": "7", "limit": 5, "tags": ["a", "b"], "safe": true})
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_required_parameter_never_reaches_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let reg = counting_registry(calls.clone());

        for raw in [json!({}), json!({"query": null, "limit": 3})] {
            let err = reg.invoke("search", &args(raw)).await.expect_err("must fail");
            assert_eq!(
                err,
                InvocationError::invalid_parameter("query", "missing required parameter")
            );
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn coercion_failure_aborts_before_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let reg = counting_registry(calls.clone());

        let err = reg
            .invoke("search", &args(json!({"query": "x", "limit": "lots"})))
            .await
            .expect_err("must fail");
        assert!(matches!(err, InvocationError::InvalidParameter { ref name, .. } if name == "limit"));
        assert!(err.is_parameter_error());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_parameter_is_rejected_with_suggestion() {
        let reg = counting_registry(Arc::new(AtomicUsize::new(0)));
        let err = reg
            .invoke("search", &args(json!({"query": "x", "limt": 2})))
            .await
            .expect_err("must fail");
        let InvocationError::InvalidParameter { name, reason } = err else {
            panic!("expected InvalidParameter, got {err:?}");
        };
        assert_eq!(name, "limt");
        assert!(reason.contains("did you mean 'limit'"), "{reason}");
    }

    #[tokio::test]
    async fn unknown_tool_suggests_close_names() {
        let reg = counting_registry(Arc::new(AtomicUsize::new(0)));
        let err = reg.invoke("serch", &ToolArgs::new()).await.expect_err("must fail");
        assert_eq!(
            err,
            InvocationError::UnknownTool {
                name: "serch".to_string(),
                suggestions: vec!["search".to_string()],
            }
        );
    }

    #[tokio::test]
    async fn handler_errors_are_surfaced_as_tool_errors() {
        let mut reg = ToolRegistry::new();
        reg.register(
            ToolDescriptor::new("boom", ""),
            handler_fn(|_| async { Err(ToolError::failed("kaput")) }),
        )
        .expect("register");

        let err = reg.invoke("boom", &ToolArgs::new()).await.expect_err("must fail");
        assert_eq!(err, InvocationError::Tool(ToolError::failed("kaput")));
        assert!(!err.is_parameter_error());
    }

    #[test]
    fn register_rejects_duplicates_and_preserves_order() {
        let mut reg = ToolRegistry::new();
        let noop = || handler_fn(|_| async { Ok(Value::Null) });

        for name in ["b", "a", "c"] {
            reg.register(ToolDescriptor::new(name, ""), noop()).expect("register");
        }
        assert_eq!(
            reg.register(ToolDescriptor::new("a", ""), noop()),
            Err(RegistryError::DuplicateTool("a".to_string()))
        );

        let dup_param = ToolDescriptor::new("d", "")
            .param(ParamSpec::optional("x", ParamType::String, ""))
            .param(ParamSpec::optional("x", ParamType::Integer, ""));
        assert!(matches!(
            reg.register(dup_param, noop()),
            Err(RegistryError::DuplicateParam { .. })
        ));

        let names: Vec<&str> = reg.list().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(reg.len(), 3);
        assert!(reg.describe("a").is_some());
        assert!(reg.describe("zzz").is_none());
    }
}
