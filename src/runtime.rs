use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::routes::router;
use crate::startup::initialize;

/// High-level runtime that wires the probe router onto a listener.
pub struct CloudprobeRuntime {
    config: RuntimeConfig,
}

impl CloudprobeRuntime {
    /// Creates a runtime with the provided configuration.
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }

    /// Builds the service clients, then serves the probe routes until a shutdown signal.
    pub async fn start(self) -> Result<()> {
        let state = initialize(&self.config).await?;
        serve(router(state), self.config).await
    }
}

/// Serves `router` on the configured address.
///
/// On SIGTERM or Ctrl-C the server stops at once; in-flight requests are not drained.
pub async fn serve(router: Router, config: RuntimeConfig) -> Result<()> {
    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "cloudprobe listening");

    let service = router.into_make_service_with_connect_info::<SocketAddr>();

    tokio::select! {
        result = axum::serve(listener, service).into_future() => result?,
        _ = shutdown_signal() => tracing::info!("shutdown signal received"),
    }

    Ok(())
}

/// Loads [`RuntimeConfig`] from the environment and runs the probe.
pub async fn run() -> Result<()> {
    let config = RuntimeConfig::from_env()?;
    CloudprobeRuntime::new(config).start().await
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
