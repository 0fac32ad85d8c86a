use gcloud_sdk::tonic::{Code, Status};
use thiserror::Error;

/// Errors emitted by the Google Cloud clients in this crate.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("metadata server returned {status} for {path}")]
    Metadata { path: String, status: u16 },
    #[error("failed to connect to {service}: {source}")]
    Connect {
        service: &'static str,
        #[source]
        source: gcloud_sdk::error::Error,
    },
    #[error("{service} returned {code:?}: {message}")]
    Api {
        service: &'static str,
        code: Code,
        message: String,
    },
    #[error("project ID is empty")]
    EmptyProjectId,
}

impl ClientError {
    pub(crate) fn api(service: &'static str) -> impl FnOnce(Status) -> Self {
        move |status| {
            tracing::debug!(service, code = ?status.code(), "api call rejected");
            ClientError::Api {
                service,
                code: status.code(),
                message: status.message().to_owned(),
            }
        }
    }

    pub(crate) fn connect(service: &'static str) -> impl FnOnce(gcloud_sdk::error::Error) -> Self {
        move |source| ClientError::Connect { service, source }
    }
}
