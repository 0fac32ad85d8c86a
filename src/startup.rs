use cloudprobe_gcp::MetadataClient;

use crate::config::{ConfigError, RuntimeConfig};
use crate::error::{CloudprobeError, Result};
use crate::state::{AppState, ServiceClients};

/// Resolves the project: from the metadata server when on Google Cloud, otherwise from
/// [`RuntimeConfig::project_id`].
pub async fn resolve_project_id(
    metadata: &MetadataClient,
    config: &RuntimeConfig,
) -> Result<String> {
    if metadata.on_gce().await {
        let project_id = metadata
            .project_id()
            .await
            .map_err(CloudprobeError::ProjectId)?;
        if project_id.is_empty() {
            return Err(ConfigError::MissingProjectId.into());
        }
        return Ok(project_id);
    }

    config
        .project_id
        .clone()
        .filter(|project_id| !project_id.is_empty())
        .ok_or_else(|| ConfigError::MissingProjectId.into())
}

/// Runs the one-time startup sequence: project, then the three clients, which pick up
/// Application Default Credentials on their own.
///
/// Any failure is returned before a listener exists, so a partially initialized client
/// set is never served.
pub async fn initialize(config: &RuntimeConfig) -> Result<AppState> {
    let metadata =
        MetadataClient::new(config.metadata_host.clone()).map_err(CloudprobeError::Metadata)?;

    let project_id = resolve_project_id(&metadata, config).await?;
    tracing::info!(project_id = %project_id, platform = config.platform.name(), "resolved project");

    let clients = ServiceClients::connect(&project_id, config.platform.service_context()).await?;

    Ok(AppState::new(project_id, config.platform.clone(), clients))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::routing::get;
    use tokio::net::TcpListener;

    async fn spawn_metadata(project: &'static str) -> String {
        let router = Router::new().route(
            "/computeMetadata/v1/project/project-id",
            get(move || async move { project }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr.to_string()
    }

    async fn unreachable_host() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().to_string()
    }

    #[tokio::test]
    async fn project_comes_from_metadata_on_gce() {
        let host = spawn_metadata("meta-project").await;
        let metadata = MetadataClient::new(Some(host)).unwrap();
        let config = RuntimeConfig::builder().project_id("env-project").build();

        let project = resolve_project_id(&metadata, &config).await.unwrap();
        assert_eq!(project, "meta-project");
    }

    #[tokio::test]
    async fn project_comes_from_config_off_gce() {
        let metadata = MetadataClient::with_host(unreachable_host().await, false).unwrap();
        let config = RuntimeConfig::builder().project_id("env-project").build();

        let project = resolve_project_id(&metadata, &config).await.unwrap();
        assert_eq!(project, "env-project");
    }

    #[tokio::test]
    async fn missing_project_is_fatal() {
        let metadata = MetadataClient::with_host(unreachable_host().await, false).unwrap();
        let config = RuntimeConfig::builder().project_id("").build();

        let err = resolve_project_id(&metadata, &config).await.unwrap_err();
        assert!(matches!(
            err,
            CloudprobeError::Config(ConfigError::MissingProjectId)
        ));
    }

    #[tokio::test]
    async fn metadata_failure_stops_initialization() {
        let config = RuntimeConfig::builder()
            .metadata_host(unreachable_host().await)
            .project_id("env-project")
            .build();

        let err = initialize(&config).await.err().unwrap();
        assert!(matches!(err, CloudprobeError::ProjectId(_)));
        assert!(err.to_string().starts_with("getting project ID on GCE: "));
    }
}
