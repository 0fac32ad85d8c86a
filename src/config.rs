use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use cloudprobe_gcp::METADATA_HOST_ENV;
use dotenvy::Error as DotenvError;
use thiserror::Error;

use crate::platform::RuntimePlatform;

const DEFAULT_PORT: u16 = 8080;
const PORT_ENV: &str = "PORT";
const ADDR_ENV: &str = "CLOUDPROBE_ADDR";
const PROJECT_ID_ENV: &str = "PROJECT_ID";

/// Configuration consumed before the service clients are built and Axum starts listening.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub bind_addr: SocketAddr,
    pub platform: RuntimePlatform,
    /// Project used when no metadata server is reachable.
    pub project_id: Option<String>,
    /// Metadata server host override (`GCE_METADATA_HOST`).
    pub metadata_host: Option<String>,
}

impl RuntimeConfig {
    /// Loads configuration from the process environment.
    ///
    /// Values from a local `.env` file (parsed via [`dotenvy::dotenv_override`]) override whatever is already set in
    /// the process environment, which makes local development workflows predictable.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_env_overrides()?;

        let addr = env::var(ADDR_ENV)
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        Ok(Self {
            bind_addr: SocketAddr::new(addr, resolve_port()),
            platform: RuntimePlatform::detect(),
            project_id: non_empty_var(PROJECT_ID_ENV),
            metadata_host: non_empty_var(METADATA_HOST_ENV),
        })
    }

    /// Returns a builder for programmatic overrides.
    pub fn builder() -> RuntimeConfigBuilder {
        RuntimeConfigBuilder::default()
    }
}

impl Default for RuntimeConfig {
    /// Binds to `0.0.0.0:8080` with no project or credentials configured.
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            platform: RuntimePlatform::default(),
            project_id: None,
            metadata_host: None,
        }
    }
}

/// Builder type for [`RuntimeConfig`].
#[derive(Default, Clone, Debug)]
pub struct RuntimeConfigBuilder {
    bind_addr: Option<SocketAddr>,
    platform: Option<RuntimePlatform>,
    project_id: Option<String>,
    metadata_host: Option<String>,
}

impl RuntimeConfigBuilder {
    /// Sets the address for the embedded Axum listener.
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = Some(addr);
        self
    }

    /// Sets the active runtime platform (App Engine, Cloud Run, etc.).
    pub fn platform(mut self, platform: RuntimePlatform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Sets the fallback project identifier.
    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Points the metadata client at a specific host, e.g. an emulator.
    pub fn metadata_host(mut self, host: impl Into<String>) -> Self {
        self.metadata_host = Some(host.into());
        self
    }

    /// Builds the final configuration.
    pub fn build(self) -> RuntimeConfig {
        let defaults = RuntimeConfig::default();
        RuntimeConfig {
            bind_addr: self.bind_addr.unwrap_or(defaults.bind_addr),
            platform: self.platform.unwrap_or_default(),
            project_id: self.project_id,
            metadata_host: self.metadata_host,
        }
    }
}

/// Errors that can occur while building [`RuntimeConfig`] or resolving the project from it.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PROJECT_ID is not set and no metadata server is reachable")]
    MissingProjectId,
    #[error("failed to load .env overrides: {0}")]
    Dotenv(#[from] DotenvError),
}

/// Applies a local `.env` file on top of the process environment. A missing file is fine.
///
/// Runs before logging is initialized so that `LOG_FORMAT` and `RUST_LOG` can come from `.env`.
pub fn load_env_overrides() -> Result<(), ConfigError> {
    applied(dotenvy::dotenv_override())
}

fn applied<T>(result: Result<T, DotenvError>) -> Result<(), ConfigError> {
    match result {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(ConfigError::Dotenv(err)),
    }
}

fn resolve_port() -> u16 {
    env::var(PORT_ENV)
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT)
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::env_lock;

    const VARS: [&str; 8] = [
        PORT_ENV,
        ADDR_ENV,
        PROJECT_ID_ENV,
        METADATA_HOST_ENV,
        "K_SERVICE",
        "GAE_SERVICE",
        "LOG_FORMAT",
        "RUST_LOG",
    ];

    fn clear_env() {
        for var in VARS {
            unsafe { env::remove_var(var) };
        }
    }

    #[test]
    fn builder_overrides_defaults() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 8)), 9999);
        let config = RuntimeConfig::builder()
            .bind_addr(addr)
            .project_id("probe-project")
            .metadata_host("127.0.0.1:9001")
            .build();

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.project_id.as_deref(), Some("probe-project"));
        assert_eq!(config.metadata_host.as_deref(), Some("127.0.0.1:9001"));
        assert!(matches!(config.platform, RuntimePlatform::Generic));
    }

    #[test]
    fn builder_defaults_to_port_8080() {
        let config = RuntimeConfig::builder().build();
        assert_eq!(
            config.bind_addr,
            SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080)
        );
        assert!(config.project_id.is_none());
    }

    #[test]
    fn reads_env_configuration() {
        let _guard = env_lock().lock().unwrap();
        clear_env();
        unsafe {
            env::set_var(PORT_ENV, "9000");
            env::set_var(ADDR_ENV, "127.0.0.2");
            env::set_var(METADATA_HOST_ENV, "127.0.0.1:9001");
            env::set_var(PROJECT_ID_ENV, "  ");
            env::set_var("K_SERVICE", "probe-run");
        }

        let config = RuntimeConfig::from_env().expect("config");
        assert_eq!(
            config.bind_addr,
            SocketAddr::new("127.0.0.2".parse().unwrap(), 9000)
        );
        assert!(config.project_id.is_none());
        assert_eq!(config.metadata_host.as_deref(), Some("127.0.0.1:9001"));
        assert!(config.platform.as_cloud_run().is_some());

        clear_env();
    }

    #[test]
    fn ignores_unparseable_values() {
        let _guard = env_lock().lock().unwrap();
        clear_env();
        unsafe {
            env::set_var(PORT_ENV, "not-a-port");
            env::set_var(ADDR_ENV, "nowhere");
        }

        let config = RuntimeConfig::from_env().expect("config");
        assert_eq!(
            config.bind_addr,
            SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT)
        );
        assert!(config.project_id.is_none());

        clear_env();
    }

    #[test]
    fn env_file_feeds_logging_config() {
        let _guard = env_lock().lock().unwrap();
        clear_env();
        let path = env::temp_dir().join(format!("cloudprobe-{}.env", std::process::id()));
        std::fs::write(&path, "LOG_FORMAT=text\nRUST_LOG=debug\nPROJECT_ID=from-file\n").unwrap();
        unsafe { env::set_var(PROJECT_ID_ENV, "from-process") };

        applied(dotenvy::from_path_override(&path)).unwrap();
        let logging = crate::logging::LoggingConfig::from_env();
        assert_eq!(logging.format, crate::logging::LogFormat::Text);
        assert_eq!(logging.level, "debug");
        assert_eq!(env::var(PROJECT_ID_ENV).as_deref(), Ok("from-file"));

        std::fs::remove_file(&path).unwrap();
        clear_env();
    }

    #[test]
    fn missing_env_file_is_not_an_error() {
        let path = env::temp_dir().join("cloudprobe-does-not-exist.env");
        assert!(applied(dotenvy::from_path_override(&path)).is_ok());
    }
}
