//! Canonical argument values for unattended (batch) runs.

use serde_json::{Map, Value, json};
use toolhub_tool_registry::{ParamSpec, ParamType, ToolArgs, ToolDescriptor};

/// Parameter name → value used when a tool is run without user input.
#[derive(Debug, Clone)]
pub struct DefaultTable {
    values: Map<String, Value>,
}

impl DefaultTable {
    #[must_use]
    pub fn builtin() -> Self {
        let values = [
            ("query", json!("test")),
            ("search_term", json!("test")),
            ("search_query", json!("test")),
            ("q", json!("test")),
            ("partial_query", json!("cat")),
            ("limit", json!(5)),
            ("max_results", json!(5)),
            ("count", json!(5)),
            ("user_id", json!("811781544784035881")),
            ("discord_id", json!("811781544784035881")),
            ("days", json!(7)),
            ("language", json!("python")),
            ("code", json!("print('Hello, World!')")),
            ("version", json!("")),
            ("stdin", json!("")),
            ("cve_id", json!("CVE-2024-1234")),
            ("year", json!(2024)),
            ("video_id", json!("dQw4w9WgXcQ")),
            ("url", json!("https://example.com")),
            ("rating", json!("g")),
            ("content_filter", json!("medium")),
            ("locale", json!("en_US")),
            ("category", json!("trending")),
            ("tag", json!("funny")),
            ("offset", json!(0)),
            ("random", json!(false)),
            ("safe_search", json!(true)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self { values }
    }

    /// Entries in `overrides` replace or extend the table.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &Map<String, Value>) -> Self {
        for (k, v) in overrides {
            self.values.insert(k.clone(), v.clone());
        }
        self
    }

    /// Table entry, then the parameter's declared default, then a placeholder for its type.
    #[must_use]
    pub fn value_for(&self, spec: &ParamSpec) -> Value {
        self.values
            .get(&spec.name)
            .or(spec.default.as_ref())
            .cloned()
            .unwrap_or_else(|| placeholder(spec.param_type))
    }

    /// A value for every declared parameter.
    #[must_use]
    pub fn arguments_for(&self, descriptor: &ToolDescriptor) -> ToolArgs {
        descriptor
            .parameters
            .iter()
            .map(|p| (p.name.clone(), self.value_for(p)))
            .collect()
    }
}

impl Default for DefaultTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn placeholder(param_type: ParamType) -> Value {
    match param_type {
        ParamType::String => json!("test"),
        ParamType::Integer => json!(5),
        ParamType::Boolean => json!(false),
        ParamType::Array => json!(["test"]),
    }
}
