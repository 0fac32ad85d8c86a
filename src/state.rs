use std::sync::Arc;

use cloudprobe_gcp::{
    ErrorReportingClient, ErrorSink, LogSink, LoggingClient, MetricClient, MetricSink,
    ServiceContext,
};

use crate::error::{CloudprobeError, Result};
use crate::platform::RuntimePlatform;

/// The three downstream service handles, built once at startup and shared read-only.
#[derive(Clone)]
pub struct ServiceClients {
    pub logging: Arc<dyn LogSink>,
    pub metrics: Arc<dyn MetricSink>,
    pub errors: Arc<dyn ErrorSink>,
}

impl ServiceClients {
    pub fn new(
        logging: Arc<dyn LogSink>,
        metrics: Arc<dyn MetricSink>,
        errors: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            logging,
            metrics,
            errors,
        }
    }

    /// Builds the Google Cloud clients with Application Default Credentials. The first
    /// failure aborts the whole bundle.
    pub async fn connect(project_id: &str, service_context: ServiceContext) -> Result<Self> {
        let logging = LoggingClient::new(project_id)
            .await
            .map_err(|source| CloudprobeError::ClientInit {
                client: "logging",
                source,
            })?;
        let metrics = MetricClient::new()
            .await
            .map_err(|source| CloudprobeError::ClientInit {
                client: "metric",
                source,
            })?;
        let errors = ErrorReportingClient::new(project_id, service_context)
            .await
            .map_err(|source| CloudprobeError::ClientInit {
                client: "error reporting",
                source,
            })?;

        Ok(Self::new(Arc::new(logging), Arc::new(metrics), Arc::new(errors)))
    }
}

/// Axum state: write-once at startup, read-many thereafter.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    project_id: String,
    platform: RuntimePlatform,
    clients: ServiceClients,
}

impl AppState {
    pub fn new(
        project_id: impl Into<String>,
        platform: RuntimePlatform,
        clients: ServiceClients,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                project_id: project_id.into(),
                platform,
                clients,
            }),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.inner.project_id
    }

    pub fn platform(&self) -> &RuntimePlatform {
        &self.inner.platform
    }

    pub fn clients(&self) -> &ServiceClients {
        &self.inner.clients
    }
}
