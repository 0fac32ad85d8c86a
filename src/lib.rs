//! Cloudprobe: a post-deployment smoke test server.
//!
//! A deliberately thin Axum application whose endpoints forward small JSON payloads to Google
//! Cloud Logging, Monitoring, and Error Reporting, so a freshly pushed runtime can be checked
//! end to end from outside.

pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod platform;
pub mod routes;
pub mod runtime;
pub mod startup;
pub mod state;

pub use crate::config::{ConfigError, RuntimeConfig, RuntimeConfigBuilder, load_env_overrides};
pub use crate::context::RequestContext;
pub use crate::error::{CloudprobeError, HandlerError, Result};
pub use crate::logging::{LogFormat, LoggingConfig, init_logging};
pub use crate::platform::{AppEnginePlatform, CloudRunPlatform, RuntimePlatform};
pub use crate::routes::router;
pub use crate::runtime::{CloudprobeRuntime, run, serve};
pub use crate::state::{AppState, ServiceClients};
pub use cloudprobe_gcp as gcp;
