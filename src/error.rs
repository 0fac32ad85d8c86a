use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::config::ConfigError;
use cloudprobe_gcp::ClientError;

pub type Result<T> = std::result::Result<T, CloudprobeError>;

/// Startup-fatal errors. Nothing is served once one of these surfaces.
#[derive(Debug, Error)]
pub enum CloudprobeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("getting project ID on GCE: {0}")]
    ProjectId(#[source] ClientError),
    #[error("failed to build metadata client: {0}")]
    Metadata(#[source] ClientError),
    #[error("failed to create {client} client: {source}")]
    ClientInit {
        client: &'static str,
        #[source]
        source: ClientError,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Request-scoped failures. Every variant renders as a plain-text 500 carrying its message.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("wrong request method: {0}, requires POST")]
    WrongMethod(Method),
    #[error("decode request body: {0}")]
    Decode(String),
    #[error("{0}")]
    Timezone(String),
    #[error("error lookup host: {0}")]
    LookupHost(String),
    #[error("writing log entry: {0}")]
    Logging(#[source] ClientError),
    #[error("writing time series data: {0}")]
    Monitoring(#[source] ClientError),
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        tracing::debug!(error = %message, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
    }
}
