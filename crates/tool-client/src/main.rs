use anyhow::Context as _;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use toolhub_client::config::{default_config_path, load_config};
use toolhub_client::ui::Ui;
use toolhub_client::{App, StdConsole};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "toolhub-client", version, about = "Browse and run tools on toolhub servers")]
struct Cli {
    /// Client config file (default: $XDG_CONFIG_HOME/toolhub/client.json).
    #[arg(long, env = "TOOLHUB_CLIENT_CONFIG")]
    config: Option<PathBuf>,

    /// Open this server's tool menu directly.
    #[arg(long)]
    server: Option<String>,

    /// List the tools of every configured server and exit.
    #[arg(long, conflicts_with_all = ["call_tool", "run_all"])]
    list_tools: bool,

    /// Call one tool: SERVER TOOL [KEY=VALUE...]
    #[arg(
        long,
        num_args = 2..,
        value_names = ["SERVER", "TOOL", "KEY=VALUE"],
        conflicts_with = "run_all"
    )]
    call_tool: Option<Vec<String>>,

    /// Run every tool of SERVER with default values; exits non-zero if any fails.
    #[arg(long, value_name = "SERVER")]
    run_all: Option<String>,

    #[arg(long)]
    no_color: bool,

    /// Default log filter; `RUST_LOG` takes precedence.
    #[arg(long, env = "TOOLHUB_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let path = match cli.config {
        Some(p) => p,
        None => default_config_path()?,
    };
    let config = load_config(&path).context("load client config")?;
    let ui = if cli.no_color { Ui::plain() } else { Ui::detect() };
    let app = App::new(config, ui);
    let mut console = StdConsole::new();

    if cli.list_tools {
        app.list_tools(&mut console).await?;
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(call) = cli.call_tool {
        let (server, tool, pairs) = match call.as_slice() {
            [server, tool, pairs @ ..] => (server, tool, pairs),
            _ => anyhow::bail!("--call-tool needs SERVER and TOOL"),
        };
        let ok = app.call_tool(&mut console, server, tool, pairs).await?;
        return Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    if let Some(server) = cli.run_all {
        let report = app.run_all(&mut console, &server).await?;
        return Ok(if report.failed() == 0 {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    app.interactive(&mut console, cli.server.as_deref()).await?;
    Ok(ExitCode::SUCCESS)
}
