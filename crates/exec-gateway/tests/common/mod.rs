use anyhow::Context as _;
use std::process::{Child, Command};
use std::time::Duration;

pub use toolhub_test_support::{FakeEngine, KillOnDrop};

pub fn pick_unused_port() -> anyhow::Result<u16> {
    toolhub_test_support::pick_unused_port()
}

pub async fn wait_http_ok(url: &str, timeout_dur: Duration) -> anyhow::Result<()> {
    toolhub_test_support::wait_http_ok(url, timeout_dur).await
}

pub fn spawn_gateway(engine_url: &str, port: u16) -> anyhow::Result<Child> {
    let bin = env!("CARGO_BIN_EXE_toolhub-exec-gateway");
    Command::new(bin)
        .arg("--bind")
        .arg(format!("127.0.0.1:{port}"))
        .arg("--engine-url")
        .arg(engine_url)
        .arg("--retry-initial-interval-ms")
        .arg("10")
        .arg("--log-level")
        .arg("info")
        .spawn()
        .context("spawn gateway")
}
