//! Code-execution tool server.
//!
//! Keeps a [`catalog::RuntimeCatalog`] of the engine's languages and versions, resolves
//! partial version requests with [`resolver::resolve`], and sends programs to the engine
//! through [`dispatcher::ExecutionDispatcher`] with bounded concurrency, timeouts and retry.
//! The operations are exposed as tools via [`tools::register_execution_tools`].

pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod resolver;
pub mod retry;
pub mod server;
pub mod tools;
pub mod version;

pub use catalog::{CatalogSnapshot, RuntimeCatalog, RuntimeSource, RuntimeVersion};
pub use dispatcher::{DispatchConfig, ExecutionDispatcher, ExecutionRequest, ExecutionResult};
pub use error::{CatalogError, EngineError, ExecutionError, ResolutionError};
