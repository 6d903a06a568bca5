//! Text styling for console output.

use owo_colors::OwoColorize as _;
use serde_json::Value;

const RULE_WIDTH: usize = 60;

/// Formats headers and status lines, with or without ANSI colors.
#[derive(Debug, Clone, Copy)]
pub struct Ui {
    color: bool,
}

impl Ui {
    #[must_use]
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    #[must_use]
    pub fn plain() -> Self {
        Self { color: false }
    }

    /// Colors unless `NO_COLOR` is set or stdout is not a terminal.
    #[must_use]
    pub fn detect() -> Self {
        use std::io::IsTerminal as _;
        Self::new(std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal())
    }

    #[must_use]
    pub fn header(&self, text: &str) -> String {
        let rule = "=".repeat(RULE_WIDTH);
        let body = format!("{rule}\n{text:^width$}\n{rule}", width = RULE_WIDTH);
        if self.color {
            format!("\n{}", body.magenta().bold())
        } else {
            format!("\n{body}")
        }
    }

    #[must_use]
    pub fn section(&self, text: &str) -> String {
        let underline = "-".repeat(text.chars().count());
        if self.color {
            format!("\n{}\n{}", text.cyan().bold(), underline.cyan())
        } else {
            format!("\n{text}\n{underline}")
        }
    }

    #[must_use]
    pub fn success(&self, text: &str) -> String {
        self.status("✓", text, |s| s.green().to_string())
    }

    #[must_use]
    pub fn error(&self, text: &str) -> String {
        self.status("✗", text, |s| s.red().to_string())
    }

    #[must_use]
    pub fn info(&self, text: &str) -> String {
        self.status("ℹ", text, |s| s.blue().to_string())
    }

    #[must_use]
    pub fn warning(&self, text: &str) -> String {
        self.status("⚠", text, |s| s.yellow().to_string())
    }

    #[must_use]
    pub fn emphasis(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn status(&self, marker: &str, text: &str, paint: impl Fn(&str) -> String) -> String {
        let line = format!("{marker} {text}");
        if self.color { paint(&line) } else { line }
    }
}

/// Decode JSON carried inside strings, recursively.
#[must_use]
pub fn decode_embedded_json(value: &Value) -> Value {
    match value {
        Value::String(s) => {
            let trimmed = s.trim_start();
            if (trimmed.starts_with('{') || trimmed.starts_with('['))
                && let Ok(inner) = serde_json::from_str::<Value>(s)
            {
                return decode_embedded_json(&inner);
            }
            value.clone()
        }
        Value::Array(items) => Value::Array(items.iter().map(decode_embedded_json).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), decode_embedded_json(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Full pretty rendering of a tool result; plain strings print as-is.
#[must_use]
pub fn render_result(value: &Value) -> String {
    match decode_embedded_json(value) {
        Value::String(s) => s,
        decoded => serde_json::to_string_pretty(&decoded).unwrap_or_else(|_| decoded.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::{Ui, decode_embedded_json, render_result};
    use serde_json::json;

    #[test]
    fn header_is_centered_between_rules() {
        let out = Ui::plain().header("Hi");
        let lines: Vec<&str> = out.trim().lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "=".repeat(60));
        assert_eq!(lines[1].trim(), "Hi");
        assert_eq!(lines[1].find('H'), Some(29));
    }

    #[test]
    fn plain_status_lines_have_markers() {
        let ui = Ui::plain();
        assert_eq!(ui.success("ok"), "✓ ok");
        assert_eq!(ui.error("bad"), "✗ bad");
        assert_eq!(ui.section("Tools").trim(), "Tools\n-----");
        assert!(Ui::new(true).success("ok").contains("\u{1b}["));
    }

    #[test]
    fn json_inside_strings_is_decoded() {
        let raw = json!({"content": "{\"a\": [1, \"[2]\"]}", "note": "{not json"});
        assert_eq!(
            decode_embedded_json(&raw),
            json!({"content": {"a": [1, [2]]}, "note": "{not json"})
        );
        assert_eq!(render_result(&json!("plain text")), "plain text");
        assert_eq!(render_result(&json!("[1]")), "[\n  1\n]");
    }
}
