use std::env;

use cloudprobe_gcp::ServiceContext;

/// Describes the Google Cloud runtime the probe is executing inside.
#[derive(Clone, Debug, Default)]
pub enum RuntimePlatform {
    AppEngine(AppEnginePlatform),
    CloudRun(CloudRunPlatform),
    #[default]
    Generic,
}

impl RuntimePlatform {
    /// Attempts to infer the current platform from environment variables that App Engine or
    /// Google Cloud Run automatically inject.
    pub fn detect() -> Self {
        if let Some(platform) = AppEnginePlatform::from_env() {
            return Self::AppEngine(platform);
        }

        if let Some(platform) = CloudRunPlatform::from_env() {
            return Self::CloudRun(platform);
        }

        Self::Generic
    }

    /// Short identifier reported by `/version`.
    pub fn name(&self) -> &'static str {
        match self {
            RuntimePlatform::AppEngine(_) => "app_engine",
            RuntimePlatform::CloudRun(_) => "cloud_run",
            RuntimePlatform::Generic => "generic",
        }
    }

    /// Service identity attached to error reports.
    pub fn service_context(&self) -> ServiceContext {
        let (service, version) = match self {
            RuntimePlatform::AppEngine(platform) => (&platform.service, &platform.version),
            RuntimePlatform::CloudRun(platform) => (&platform.service, &platform.revision),
            RuntimePlatform::Generic => return ServiceContext::default(),
        };

        let defaults = ServiceContext::default();
        ServiceContext {
            service: service.clone().unwrap_or(defaults.service),
            version: version.clone().unwrap_or(defaults.version),
        }
    }

    pub fn as_cloud_run(&self) -> Option<&CloudRunPlatform> {
        match self {
            RuntimePlatform::CloudRun(platform) => Some(platform),
            _ => None,
        }
    }
}

/// App Engine (flexible or standard) details gleaned from `GAE_*` variables.
#[derive(Clone, Debug, Default)]
pub struct AppEnginePlatform {
    pub service: Option<String>,
    pub version: Option<String>,
    pub instance: Option<String>,
}

impl AppEnginePlatform {
    fn from_env() -> Option<Self> {
        let service = env::var("GAE_SERVICE").ok();
        let version = env::var("GAE_VERSION").ok();
        let instance = env::var("GAE_INSTANCE").ok();

        if service.is_some() || version.is_some() || instance.is_some() {
            Some(Self {
                service,
                version,
                instance,
            })
        } else {
            None
        }
    }
}

/// Google Cloud Run platform configuration.
#[derive(Clone, Debug, Default)]
pub struct CloudRunPlatform {
    pub service: Option<String>,
    pub revision: Option<String>,
    pub configuration: Option<String>,
}

impl CloudRunPlatform {
    fn from_env() -> Option<Self> {
        let service = env::var("K_SERVICE").ok();
        let revision = env::var("K_REVISION").ok();
        let configuration = env::var("K_CONFIGURATION").ok();

        if service.is_some() || revision.is_some() {
            Some(Self {
                service,
                revision,
                configuration,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::env_lock;

    const VARS: [&str; 6] = [
        "GAE_SERVICE",
        "GAE_VERSION",
        "GAE_INSTANCE",
        "K_SERVICE",
        "K_REVISION",
        "K_CONFIGURATION",
    ];

    fn clear_env() {
        for var in VARS {
            unsafe { env::remove_var(var) };
        }
    }

    #[test]
    fn detects_app_engine_first() {
        let _guard = env_lock().lock().unwrap();
        clear_env();
        unsafe {
            env::set_var("GAE_SERVICE", "probe");
            env::set_var("GAE_VERSION", "20240501t120000");
            env::set_var("K_SERVICE", "ignored");
        }

        let platform = RuntimePlatform::detect();
        assert_eq!(platform.name(), "app_engine");
        let context = platform.service_context();
        assert_eq!(context.service, "probe");
        assert_eq!(context.version, "20240501t120000");

        clear_env();
    }

    #[test]
    fn detects_cloud_run() {
        let _guard = env_lock().lock().unwrap();
        clear_env();
        unsafe {
            env::set_var("K_SERVICE", "probe-run");
            env::set_var("K_REVISION", "probe-run-00001");
        }

        let platform = RuntimePlatform::detect();
        let run = platform.as_cloud_run().expect("cloud run");
        assert_eq!(run.service.as_deref(), Some("probe-run"));
        assert_eq!(platform.service_context().version, "probe-run-00001");

        clear_env();
    }

    #[test]
    fn falls_back_to_generic() {
        let _guard = env_lock().lock().unwrap();
        clear_env();

        let platform = RuntimePlatform::detect();
        assert!(matches!(platform, RuntimePlatform::Generic));
        assert_eq!(platform.service_context(), ServiceContext::default());
    }

    #[test]
    fn partial_app_engine_env_keeps_default_service() {
        let platform = RuntimePlatform::AppEngine(AppEnginePlatform {
            service: None,
            version: Some("v1".into()),
            instance: None,
        });
        let context = platform.service_context();
        assert_eq!(context.service, "default");
        assert_eq!(context.version, "v1");
    }
}
