use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;

use crate::error::ClientError;

/// Environment variable that overrides the metadata server host. Its presence alone is
/// treated as proof that the process runs on Google-managed infrastructure.
pub const METADATA_HOST_ENV: &str = "GCE_METADATA_HOST";

const DEFAULT_METADATA_HOST: &str = "169.254.169.254";
const METADATA_FLAVOR_HEADER: &str = "Metadata-Flavor";
const METADATA_FLAVOR: &str = "Google";
const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Client for the instance metadata server available on GCE, App Engine, and Cloud Run.
///
/// The "am I on Google Cloud" probe runs at most once per client; clones share the answer.
#[derive(Clone, Debug)]
pub struct MetadataClient {
    inner: Arc<MetadataClientInner>,
}

#[derive(Debug)]
struct MetadataClientInner {
    http: reqwest::Client,
    base_url: String,
    host_overridden: bool,
    on_gce: OnceCell<bool>,
}

impl MetadataClient {
    /// Builds a client for `host`, or for the link-local default when `host` is `None`.
    ///
    /// An explicit host short-circuits [`MetadataClient::on_gce`] to `true`.
    pub fn new(host: Option<String>) -> Result<Self, ClientError> {
        match host.filter(|value| !value.trim().is_empty()) {
            Some(host) => Self::with_host(host.trim(), true),
            None => Self::with_host(DEFAULT_METADATA_HOST, false),
        }
    }

    /// Builds a client for `host` without consulting the environment.
    ///
    /// With `host_overridden == false` the first call to [`MetadataClient::on_gce`] probes the host.
    pub fn with_host(host: impl AsRef<str>, host_overridden: bool) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            inner: Arc::new(MetadataClientInner {
                http,
                base_url: format!("http://{}", host.as_ref()),
                host_overridden,
                on_gce: OnceCell::new(),
            }),
        })
    }

    /// Reports whether the process runs on Google-managed infrastructure.
    pub async fn on_gce(&self) -> bool {
        *self.inner.on_gce.get_or_init(|| self.probe()).await
    }

    /// Fetches the project the instance belongs to.
    pub async fn project_id(&self) -> Result<String, ClientError> {
        self.get("project/project-id").await
    }

    /// Reads a metadata value relative to `/computeMetadata/v1/`.
    pub async fn get(&self, suffix: &str) -> Result<String, ClientError> {
        let url = format!(
            "{}/computeMetadata/v1/{}",
            self.inner.base_url,
            suffix.trim_start_matches('/')
        );
        let response = self
            .inner
            .http
            .get(&url)
            .header(METADATA_FLAVOR_HEADER, METADATA_FLAVOR)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Metadata {
                path: suffix.to_owned(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?.trim().to_owned())
    }

    async fn probe(&self) -> bool {
        if self.inner.host_overridden {
            return true;
        }

        let response = self
            .inner
            .http
            .get(&self.inner.base_url)
            .header(METADATA_FLAVOR_HEADER, METADATA_FLAVOR)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;

        match response {
            Ok(response) => response
                .headers()
                .get(METADATA_FLAVOR_HEADER)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|value| value == METADATA_FLAVOR),
            Err(err) => {
                tracing::debug!(error = %err, "metadata server probe failed");
                false
            }
        }
    }
}
