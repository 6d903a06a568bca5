use serde_json::Value;
use toolhub_tool_registry::ToolArgs;

/// Parse `key=value` pairs; each value is read as JSON, falling back to a plain string.
///
/// Only the first `=` splits, so values may contain `=`.
pub fn parse_tool_args<S: AsRef<str>>(pairs: &[S]) -> anyhow::Result<ToolArgs> {
    let mut args = ToolArgs::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let Some((key, raw)) = pair.split_once('=') else {
            anyhow::bail!("expected key=value, got '{pair}'");
        };
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("missing key in '{pair}'");
        }
        let value =
            serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        args.insert(key.to_string(), value);
    }
    Ok(args)
}
