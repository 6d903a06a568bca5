//! Client for toolhub tool servers.
//!
//! A server's tools are mirrored into a local [`toolhub_tool_registry::ToolRegistry`] by
//! [`remote::RemoteToolServer::mirror_registry`]; the interactive menus in [`executor`] and the
//! batch runner in [`batch`] only ever talk to that registry.

pub mod app;
pub mod args;
pub mod batch;
pub mod config;
pub mod console;
pub mod defaults;
pub mod executor;
pub mod remote;
pub mod ui;

pub use app::App;
pub use batch::{BatchEntry, BatchRunReport};
pub use config::{ClientConfig, ServerEntry};
pub use console::{Console, ConsoleInput, StdConsole};
pub use defaults::DefaultTable;
pub use executor::InteractiveExecutor;
pub use remote::{RemoteError, RemoteToolServer};
