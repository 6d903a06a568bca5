//! Schema-driven tool registry.
//!
//! This crate is intended to be used by:
//! - tool servers (e.g. `toolhub-exec-gateway`), which register local handlers and serve them
//!   over HTTP via [`server::router`]
//! - `toolhub-client`, which mirrors a remote server's tools into a local registry whose
//!   handlers forward calls over the same HTTP surface
//!
//! It intentionally knows nothing about what a handler does.

pub mod descriptor;
pub mod error;
pub mod registry;
pub mod server;
pub mod wire;

pub use descriptor::{ParamSpec, ParamType, ToolArgs, ToolDescriptor};
pub use error::{InvocationError, RegistryError, ToolError};
pub use registry::{ToolHandler, ToolRegistry, handler_fn};
