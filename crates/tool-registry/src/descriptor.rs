//! Tool and parameter descriptors, plus per-type value coercion.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Coerced, fully-defaulted arguments handed to a tool handler.
pub type ToolArgs = serde_json::Map<String, Value>;

/// Tokens accepted as `true` for boolean parameters (compared case-insensitively).
pub const TRUTHY_TOKENS: &[&str] = &["true", "yes", "y", "1", "on"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Boolean,
    Array,
}

impl ParamType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub description: String,
}

impl ParamSpec {
    #[must_use]
    pub fn required(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: true,
            default: None,
            description: description.into(),
        }
    }

    #[must_use]
    pub fn optional(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: false,
            default: None,
            description: description.into(),
        }
    }

    /// Attach a default. Only honored for optional parameters.
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Coerce a raw value (typed JSON or console text) to this parameter's declared type.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason if the value cannot be represented as the declared type.
    pub fn coerce(&self, raw: &Value) -> Result<Value, String> {
        match self.param_type {
            ParamType::String => coerce_string(raw),
            ParamType::Integer => coerce_integer(raw),
            ParamType::Boolean => coerce_boolean(raw),
            ParamType::Array => coerce_array(raw),
        }
    }
}

/// Declared shape of a callable tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ParamSpec>,
}

impl ToolDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    #[must_use]
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.parameters.push(spec);
        self
    }

    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ParamSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn coerce_string(raw: &Value) -> Result<Value, String> {
    match raw {
        Value::String(_) => Ok(raw.clone()),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        other => Err(format!("expected a string, got {}", kind_of(other))),
    }
}

fn coerce_integer(raw: &Value) -> Result<Value, String> {
    match raw {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(raw.clone()),
        Value::Number(n) => Err(format!("expected an integer, got {n}")),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("expected an integer, got '{s}'")),
        other => Err(format!("expected an integer, got {}", kind_of(other))),
    }
}

fn is_truthy(token: &str) -> bool {
    let token = token.trim();
    TRUTHY_TOKENS.iter().any(|t| t.eq_ignore_ascii_case(token))
}

fn coerce_boolean(raw: &Value) -> Result<Value, String> {
    match raw {
        Value::Bool(_) => Ok(raw.clone()),
        Value::String(s) => Ok(Value::Bool(is_truthy(s))),
        Value::Number(n) => Ok(Value::Bool(is_truthy(&n.to_string()))),
        other => Err(format!("expected a boolean, got {}", kind_of(other))),
    }
}

fn coerce_array(raw: &Value) -> Result<Value, String> {
    match raw {
        Value::Array(_) => Ok(raw.clone()),
        Value::String(s) => Ok(Value::Array(
            s.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_string()))
                .collect(),
        )),
        Value::Number(_) | Value::Bool(_) => Ok(Value::Array(vec![coerce_string(raw)?])),
        other => Err(format!("expected an array, got {}", kind_of(other))),
    }
}

#[cfg(test)]
mod tests {
    use super::{ParamSpec, ParamType, ToolDescriptor};
    use serde_json::{Value, json};

    fn spec(t: ParamType) -> ParamSpec {
        ParamSpec::optional("p", t, "")
    }

    #[test]
    fn integer_accepts_decimal_text_and_rejects_garbage() {
        let p = spec(ParamType::Integer);
        assert_eq!(p.coerce(&json!("42")), Ok(json!(42)));
        assert_eq!(p.coerce(&json!(" -7 ")), Ok(json!(-7)));
        assert_eq!(p.coerce(&json!(5)), Ok(json!(5)));
        assert!(p.coerce(&json!("4x")).is_err());
        assert!(p.coerce(&json!(1.5)).is_err());
        assert!(p.coerce(&json!(true)).is_err());
    }

    #[test]
    fn boolean_uses_fixed_truthy_tokens() {
        let p = spec(ParamType::Boolean);
        for t in ["true", "YES", "y", "1", "On"] {
            assert_eq!(p.coerce(&json!(t)), Ok(Value::Bool(true)), "token {t}");
        }
        for t in ["false", "no", "0", "maybe", ""] {
            assert_eq!(p.coerce(&json!(t)), Ok(Value::Bool(false)), "token {t}");
        }
        assert_eq!(p.coerce(&json!(false)), Ok(Value::Bool(false)));
        assert!(p.coerce(&json!(["x"])).is_err());
    }

    #[test]
    fn array_splits_on_comma_and_trims() {
        let p = spec(ParamType::Array);
        assert_eq!(p.coerce(&json!("a, b ,,c")), Ok(json!(["a", "b", "c"])));
        assert_eq!(p.coerce(&json!("")), Ok(json!([])));
        assert_eq!(p.coerce(&json!(["x", 1])), Ok(json!(["x", 1])));
        assert_eq!(p.coerce(&json!(3)), Ok(json!(["3"])));
        assert!(p.coerce(&json!({"a": 1})).is_err());
    }

    #[test]
    fn string_stringifies_scalars_only() {
        let p = spec(ParamType::String);
        assert_eq!(p.coerce(&json!("hi")), Ok(json!("hi")));
        assert_eq!(p.coerce(&json!(12)), Ok(json!("12")));
        assert_eq!(p.coerce(&json!(true)), Ok(json!("true")));
        assert!(p.coerce(&json!(["a"])).is_err());
        assert!(p.coerce(&Value::Null).is_err());
    }

    #[test]
    fn descriptor_serializes_with_wire_names() {
        let d = ToolDescriptor::new("execute_code", "Run code")
            .param(ParamSpec::required("language", ParamType::String, "lang"))
            .param(ParamSpec::optional("args", ParamType::Array, "").with_default(json!([])));

        let v = serde_json::to_value(&d).expect("descriptor serializes");
        assert_eq!(v["parameters"][0]["type"], "string");
        assert_eq!(v["parameters"][0]["required"], true);
        assert!(v["parameters"][0].get("default").is_none());
        assert_eq!(v["parameters"][1]["default"], json!([]));

        let back: ToolDescriptor = serde_json::from_value(v).expect("descriptor deserializes");
        assert_eq!(back, d);
        assert!(back.parameter("args").is_some());
    }
}
