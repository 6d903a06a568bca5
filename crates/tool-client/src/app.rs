//! Top-level client flows: server menu, tool listing, single calls and batch runs.

use crate::args::parse_tool_args;
use crate::batch::{BatchRunReport, run_all};
use crate::config::ClientConfig;
use crate::console::Console;
use crate::defaults::DefaultTable;
use crate::executor::{InteractiveExecutor, MenuChoice, choose};
use crate::remote::RemoteToolServer;
use crate::ui::{Ui, render_result};
use anyhow::Context as _;
use serde_json::Value;
use toolhub_tool_registry::{InvocationError, ToolRegistry};

pub struct App {
    config: ClientConfig,
    defaults: DefaultTable,
    ui: Ui,
}

impl App {
    #[must_use]
    pub fn new(config: ClientConfig, ui: Ui) -> Self {
        let defaults = DefaultTable::builtin().with_overrides(&config.defaults);
        Self {
            config,
            defaults,
            ui,
        }
    }

    fn remote(&self, server: &str) -> anyhow::Result<RemoteToolServer> {
        let Some(entry) = self.config.server(server) else {
            let known: Vec<String> = self
                .config
                .resolved_servers()
                .into_iter()
                .map(|(n, _)| n)
                .collect();
            anyhow::bail!("unknown server '{server}' (known: {})", known.join(", "));
        };
        RemoteToolServer::new(&entry.url, self.config.request_timeout())
            .with_context(|| format!("server '{server}'"))
    }

    /// Mirror `server`'s tools into a local registry.
    pub async fn connect(&self, server: &str) -> anyhow::Result<ToolRegistry> {
        self.remote(server)?
            .mirror_registry()
            .await
            .with_context(|| format!("connect to '{server}'"))
    }

    /// Print every configured server's tools; unreachable servers are reported and skipped.
    pub async fn list_tools<C: Console + ?Sized>(&self, console: &mut C) -> anyhow::Result<()> {
        for (name, _) in self.config.resolved_servers() {
            let listed = match self.remote(&name) {
                Ok(remote) => remote.list_tools().await.map_err(anyhow::Error::from),
                Err(e) => Err(e),
            };
            match listed {
                Ok(tools) => {
                    console.write_line(&format!(
                        "\n{} ({} tools):",
                        self.ui.emphasis(&name.to_uppercase()),
                        tools.len()
                    ));
                    for t in tools {
                        console.write_line(&format!("  • {} - {}", t.name, t.description));
                    }
                }
                Err(e) => {
                    tracing::debug!(server = %name, error = %e, "listing failed");
                    console.write_line(&self.ui.error(&format!("{name}: {e:#}")));
                }
            }
        }
        Ok(())
    }

    /// Call one tool with `key=value` arguments. Returns whether the call succeeded.
    pub async fn call_tool<C: Console + ?Sized>(
        &self,
        console: &mut C,
        server: &str,
        tool: &str,
        pairs: &[String],
    ) -> anyhow::Result<bool> {
        let args = parse_tool_args(pairs)?;
        let registry = self.connect(server).await?;

        console.write_line(&self.ui.info(&format!("Calling {tool} on {server}")));
        console.write_line(&format!(
            "Arguments:\n{}",
            render_result(&Value::Object(args.clone()))
        ));
        match registry.invoke(tool, &args).await {
            Ok(result) => {
                console.write_line(&self.ui.section("RESULT"));
                console.write_line(&render_result(&result));
                Ok(true)
            }
            Err(e) => {
                console.write_line(&self.ui.error(&e.to_string()));
                if let InvocationError::UnknownTool { suggestions, .. } = &e
                    && !suggestions.is_empty()
                {
                    console.write_line(&format!("Did you mean: {}?", suggestions.join(", ")));
                }
                Ok(false)
            }
        }
    }

    /// Unattended batch run of every tool on `server`.
    pub async fn run_all<C: Console + ?Sized>(
        &self,
        console: &mut C,
        server: &str,
    ) -> anyhow::Result<BatchRunReport> {
        let registry = self.connect(server).await?;
        let ui = self.ui;
        let report = run_all(&registry, &self.defaults, |i, total, entry| {
            let line = match &entry.outcome {
                Ok(_) => ui.success(&entry.tool),
                Err(e) => ui.error(&format!("{}: {e}", entry.tool)),
            };
            console.write_line(&format!("[{i}/{total}] {line}"));
        })
        .await;
        console.write_line(&self.ui.header(&format!("Execution Summary: {server}")));
        console.write_line(&self.ui.success(&format!("Successful: {}", report.succeeded())));
        console.write_line(&self.ui.error(&format!("Failed: {}", report.failed())));
        Ok(report)
    }

    /// Server menu, or straight into `start`'s tool menu when given.
    pub async fn interactive<C: Console + ?Sized>(
        &self,
        console: &mut C,
        start: Option<&str>,
    ) -> anyhow::Result<()> {
        if let Some(server) = start {
            return self.open_server(console, server).await;
        }

        let servers = self.config.resolved_servers();
        loop {
            console.write_line(&self.ui.header("Toolhub Interactive Client"));
            console.write_line(&self.ui.section("Available Servers"));
            for (i, (name, entry)) in servers.iter().enumerate() {
                console.write_line(&format!(
                    "  {}. {} - {}",
                    i + 1,
                    self.ui.emphasis(name),
                    entry.description
                ));
            }
            console.write_line("  0. Exit");

            match choose(console, self.ui, servers.len()).await? {
                MenuChoice::Back => {
                    console.write_line(&self.ui.info("Goodbye!"));
                    return Ok(());
                }
                MenuChoice::Item(i) => self.open_server(console, &servers[i].0).await?,
            }
        }
    }

    async fn open_server<C: Console + ?Sized>(
        &self,
        console: &mut C,
        server: &str,
    ) -> anyhow::Result<()> {
        console.write_line(&self.ui.info(&format!("Connecting to {server}...")));
        let registry = match self.connect(server).await {
            Ok(r) => r,
            Err(e) => {
                console.write_line(&self.ui.error(&format!("{e:#}")));
                return Ok(());
            }
        };

        console.write_line(&self.ui.success(&format!(
            "Connected to {server}: {} tools",
            registry.len()
        )));
        for d in registry.list() {
            console.write_line(&format!(
                "\n  • {} - {}",
                self.ui.emphasis(&d.name),
                d.description
            ));
            for p in &d.parameters {
                let marker = if p.required { "*" } else { " " };
                console.write_line(&format!(
                    "    {marker} {} ({}): {}",
                    p.name, p.param_type, p.description
                ));
            }
        }

        InteractiveExecutor::new(&registry, &self.defaults, console, self.ui)
            .tool_menu(server)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::App;
    use crate::config::{ClientConfig, ServerEntry};
    use crate::console::ScriptedConsole;
    use crate::ui::Ui;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::net::TcpListener;
    use toolhub_tool_registry::{
        ParamSpec, ParamType, ToolArgs, ToolDescriptor, ToolError, ToolRegistry, handler_fn,
    };

    async fn serve() -> (String, tokio::sync::oneshot::Sender<()>) {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolDescriptor::new("echo", "Echo the message")
                    .param(ParamSpec::required("message", ParamType::String, "text")),
                handler_fn(|args: ToolArgs| async move { Ok(args["message"].clone()) }),
            )
            .expect("register echo");
        registry
            .register(
                ToolDescriptor::new("fail", "Always fails"),
                handler_fn(|_args: ToolArgs| async move {
                    Err(ToolError::Unavailable {
                        message: "engine down".to_string(),
                    })
                }),
            )
            .expect("register fail");

        let app = toolhub_tool_registry::server::router(Arc::new(registry));
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local_addr");
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = rx.await;
        });
        tokio::spawn(async move { server.await });
        (format!("http://{addr}"), tx)
    }

    fn app(url: &str) -> App {
        let mut config = ClientConfig::default();
        config.servers.insert(
            "local".to_string(),
            ServerEntry {
                url: url.to_string(),
                description: "in-process".to_string(),
            },
        );
        App::new(config, Ui::plain())
    }

    #[tokio::test]
    async fn call_tool_prints_result_or_error() {
        let (url, shutdown) = serve().await;
        let app = app(&url);
        let mut console = ScriptedConsole::new(Vec::<String>::new());

        let ok = app
            .call_tool(&mut console, "local", "echo", &["message=hi".to_string()])
            .await
            .expect("call");
        assert!(ok);
        assert!(console.output.contains("Calling echo on local"));
        assert!(console.output.contains("RESULT\n------\nhi\n"));

        let ok = app
            .call_tool(&mut console, "local", "ecoh", &[])
            .await
            .expect("call");
        assert!(!ok);
        assert!(console.output.contains("Did you mean: echo?"));

        assert!(app.call_tool(&mut console, "nowhere", "echo", &[]).await.is_err());
        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn run_all_reports_each_tool() {
        let (url, shutdown) = serve().await;
        let app = app(&url);
        let mut console = ScriptedConsole::new(Vec::<String>::new());

        let report = app.run_all(&mut console, "local").await.expect("run all");
        assert_eq!(report.len(), 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(
            report.get("echo").and_then(|e| e.outcome.clone().ok()),
            Some(json!("test"))
        );
        assert!(console.output.contains("[2/2] ✗ fail: upstream unavailable: engine down"));
        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn server_menu_connects_and_exits() {
        let (url, shutdown) = serve().await;
        let app = app(&url);
        // "local" sorts after the seven built-ins.
        let mut console = ScriptedConsole::new(["8", "1", "hello", "y", "", "0", "0"]);

        app.interactive(&mut console, None).await.expect("interactive");

        let out = &console.output;
        assert!(out.contains("8. local - in-process"));
        assert!(out.contains("Connected to local: 2 tools"));
        assert!(out.contains("    * message (string): text"));
        assert!(out.contains("Tool Result: echo"));
        assert!(out.contains("Goodbye!"));
        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn unreachable_server_returns_to_menu() {
        let app = app("http://127.0.0.1:1");
        let mut console = ScriptedConsole::new(["8", "0"]);

        app.interactive(&mut console, None).await.expect("interactive");
        assert!(console.output.contains("✗ connect to 'local'"));
        assert!(console.output.contains("Goodbye!"));
    }
}
