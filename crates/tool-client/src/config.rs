use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 90;

/// Built-in tool servers, in menu order: (name, host, description).
const BUILTIN_SERVERS: &[(&str, &str, &str)] = &[
    ("giphy", "giphymcp", "GIF/sticker search, trending, random"),
    ("youtube", "ytmcp", "Video search, transcripts, trending"),
    ("wolframalpha", "wamcp", "Math, science, conversions"),
    ("piston", "pistonmcp", "Code execution engine"),
    ("cve", "cvemcp", "Vulnerability analysis"),
    ("tenor", "tenormcp", "GIF search engine"),
    ("usercontext", "usersmcp", "User analytics & history"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEntry {
    pub url: String,
    #[serde(default)]
    pub description: String,
}

/// Contents of `client.json`. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Added to, or overriding, the built-in server table.
    #[serde(default)]
    pub servers: BTreeMap<String, ServerEntry>,
    /// Overrides of the canonical batch-run values, by parameter name.
    #[serde(default)]
    pub defaults: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl ClientConfig {
    /// Built-in servers (file entries replace same-named ones) followed by the file's extra
    /// servers in name order.
    #[must_use]
    pub fn resolved_servers(&self) -> Vec<(String, ServerEntry)> {
        let mut out: Vec<(String, ServerEntry)> = BUILTIN_SERVERS
            .iter()
            .map(|(name, host, description)| {
                let entry = self.servers.get(*name).cloned().unwrap_or_else(|| ServerEntry {
                    url: format!("http://{host}:6700"),
                    description: (*description).to_string(),
                });
                ((*name).to_string(), entry)
            })
            .collect();
        out.extend(
            self.servers
                .iter()
                .filter(|(name, _)| !BUILTIN_SERVERS.iter().any(|(b, _, _)| b == name))
                .map(|(name, entry)| (name.clone(), entry.clone())),
        );
        out
    }

    #[must_use]
    pub fn server(&self, name: &str) -> Option<ServerEntry> {
        self.resolved_servers()
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, entry)| entry)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let base = if let Ok(v) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(v)
    } else {
        let home = std::env::var("HOME").context("HOME is not set")?;
        PathBuf::from(home).join(".config")
    };
    Ok(base.join("toolhub").join("client.json"))
}

/// Read the client config; a missing file yields the defaults.
pub fn load_config(path: &Path) -> anyhow::Result<ClientConfig> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ClientConfig::default()),
        Err(e) => return Err(e).with_context(|| format!("read config {}", path.display())),
    };
    let cfg: ClientConfig =
        serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
