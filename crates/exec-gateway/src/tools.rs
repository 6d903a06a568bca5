//! Tools served by the execution gateway.

use crate::dispatcher::{ExecutionDispatcher, ExecutionRequest};
use crate::error::{ExecutionError, ResolutionError};
use serde_json::{Value, json};
use std::sync::Arc;
use toolhub_tool_registry::{
    ParamSpec, ParamType, RegistryError, ToolArgs, ToolDescriptor, ToolError, ToolRegistry,
    handler_fn,
};

impl From<ExecutionError> for ToolError {
    fn from(e: ExecutionError) -> Self {
        let message = e.to_string();
        match e {
            ExecutionError::Resolution(ResolutionError::UnsupportedLanguage { .. }) => {
                ToolError::rejected("unsupported_language", message)
            }
            ExecutionError::Resolution(ResolutionError::VersionNotFound { .. }) => {
                ToolError::rejected("version_not_found", message)
            }
            ExecutionError::UpstreamRejected { .. } => {
                ToolError::rejected("upstream_rejected", message)
            }
            ExecutionError::CatalogUnavailable { .. }
            | ExecutionError::UpstreamUnavailable { .. } => ToolError::Unavailable { message },
            ExecutionError::MalformedResponse { .. } => ToolError::Failed { message },
        }
    }
}

fn str_arg(args: &ToolArgs, name: &str) -> Option<String> {
    args.get(name).and_then(Value::as_str).map(str::to_string)
}

fn non_blank_arg(args: &ToolArgs, name: &str) -> Result<String, ToolError> {
    match str_arg(args, name) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(ToolError::InvalidParameter {
            name: name.to_string(),
            reason: "must not be empty".to_string(),
        }),
    }
}

fn string_list(args: &ToolArgs, name: &str) -> Vec<String> {
    args.get(name)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn to_value<T: serde::Serialize>(v: &T) -> Result<Value, ToolError> {
    serde_json::to_value(v).map_err(|e| ToolError::failed(format!("serialize result: {e}")))
}

/// Register `execute_code`, `list_runtimes`, `get_available_language_versions` and
/// `resolve_language_version`.
///
/// # Errors
///
/// Returns an error if any of these names is already registered.
pub fn register_execution_tools(
    registry: &mut ToolRegistry,
    dispatcher: Arc<ExecutionDispatcher>,
) -> Result<(), RegistryError> {
    let d = dispatcher.clone();
    registry.register(
        ToolDescriptor::new(
            "execute_code",
            "Execute source code on the execution engine. The highest available version is \
             chosen when no version is given; a partial version such as \"3\" or \"3.10\" picks \
             the highest matching release.",
        )
        .param(ParamSpec::required(
            "language",
            ParamType::String,
            "Language name or alias (e.g. python, js)",
        ))
        .param(ParamSpec::required("code", ParamType::String, "Source code to run"))
        .param(ParamSpec::optional(
            "version",
            ParamType::String,
            "Exact or partial version; empty picks the latest",
        ))
        .param(ParamSpec::optional("stdin", ParamType::String, "Standard input for the program"))
        .param(
            ParamSpec::optional("args", ParamType::Array, "Command-line arguments")
                .with_default(json!([])),
        ),
        handler_fn(move |args: ToolArgs| {
            let d = d.clone();
            async move {
                let request = ExecutionRequest {
                    language: non_blank_arg(&args, "language")?,
                    version_constraint: str_arg(&args, "version"),
                    source: non_blank_arg(&args, "code")?,
                    stdin: str_arg(&args, "stdin"),
                    args: string_list(&args, "args"),
                };
                let result = d.execute(request).await?;
                to_value(&result)
            }
        }),
    )?;

    let d = dispatcher.clone();
    registry.register(
        ToolDescriptor::new(
            "list_runtimes",
            "List every language and version installed on the execution engine",
        ),
        handler_fn(move |_args: ToolArgs| {
            let d = d.clone();
            async move {
                let snapshot = d
                    .catalog()
                    .ensure_ready(d.config().startup_timeout)
                    .await
                    .map_err(ExecutionError::from)?;
                let languages: Vec<Value> = snapshot
                    .entries
                    .iter()
                    .map(|(language, versions)| {
                        let aliases: std::collections::BTreeSet<&str> = versions
                            .iter()
                            .flat_map(|v| v.aliases.iter().map(String::as_str))
                            .collect();
                        json!({
                            "language": language,
                            "versions": versions.iter().map(|v| v.version.as_str()).collect::<Vec<_>>(),
                            "aliases": aliases,
                        })
                    })
                    .collect();
                Ok(json!({
                    "fetchedAt": snapshot.fetched_at,
                    "stale": snapshot.stale,
                    "count": snapshot.runtime_count(),
                    "languages": languages,
                }))
            }
        }),
    )?;

    let d = dispatcher.clone();
    registry.register(
        ToolDescriptor::new(
            "get_available_language_versions",
            "List the installed versions of one language, highest first",
        )
        .param(ParamSpec::required(
            "language",
            ParamType::String,
            "Language name or alias",
        )),
        handler_fn(move |args: ToolArgs| {
            let d = d.clone();
            async move {
                let language = non_blank_arg(&args, "language")?;
                let snapshot = d
                    .catalog()
                    .ensure_ready(d.config().startup_timeout)
                    .await
                    .map_err(ExecutionError::from)?;
                let versions: Vec<&str> = snapshot
                    .versions(&language)
                    .iter()
                    .map(|v| v.version.as_str())
                    .collect();
                Ok(json!({
                    "language": snapshot.canonical_language(&language).unwrap_or(language.trim()),
                    "latest": versions.first(),
                    "versions": versions,
                }))
            }
        }),
    )?;

    let d = dispatcher;
    registry.register(
        ToolDescriptor::new(
            "resolve_language_version",
            "Show which runtime execute_code would use for a language and optional version",
        )
        .param(ParamSpec::required(
            "language",
            ParamType::String,
            "Language name or alias",
        ))
        .param(ParamSpec::optional(
            "version",
            ParamType::String,
            "Exact or partial version; empty picks the latest",
        )),
        handler_fn(move |args: ToolArgs| {
            let d = d.clone();
            async move {
                let language = non_blank_arg(&args, "language")?;
                let constraint = str_arg(&args, "version").filter(|v| !v.trim().is_empty());
                let runtime = d.resolve_runtime(&language, constraint.as_deref()).await?;
                Ok(json!({
                    "language": runtime.language,
                    "version": runtime.version,
                    "aliases": runtime.aliases,
                    "runtime": runtime.runtime,
                    "requested": constraint,
                    "autoSelected": constraint.is_none(),
                }))
            }
        }),
    )?;

    Ok(())
}
