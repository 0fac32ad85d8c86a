use std::panic::Location;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gcloud_sdk::google::devtools::clouderrorreporting::v1beta1 as proto;
use gcloud_sdk::google::devtools::clouderrorreporting::v1beta1::report_errors_service_client::ReportErrorsServiceClient;
use gcloud_sdk::{GoogleApi, GoogleAuthMiddleware};

use crate::error::ClientError;

pub const ERROR_REPORTING_ENDPOINT: &str = "https://clouderrorreporting.googleapis.com";

/// Identifies the service that raised an error event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceContext {
    pub service: String,
    pub version: String,
}

impl Default for ServiceContext {
    fn default() -> Self {
        Self {
            service: "default".to_owned(),
            version: String::new(),
        }
    }
}

impl From<ServiceContext> for proto::ServiceContext {
    fn from(context: ServiceContext) -> Self {
        Self {
            service: context.service,
            version: context.version,
            ..Default::default()
        }
    }
}

/// HTTP request that was being served when the error happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequestContext {
    pub method: String,
    pub url: String,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub remote_ip: Option<String>,
}

impl From<HttpRequestContext> for proto::HttpRequestContext {
    fn from(request: HttpRequestContext) -> Self {
        Self {
            method: request.method,
            url: request.url,
            user_agent: request.user_agent.unwrap_or_default(),
            referrer: request.referrer.unwrap_or_default(),
            remote_ip: request.remote_ip.unwrap_or_default(),
            ..Default::default()
        }
    }
}

/// Source location the error was reported from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLocation {
    pub file_path: String,
    pub line_number: u32,
    pub function_name: String,
}

impl ReportLocation {
    /// Captures the location of the caller.
    #[track_caller]
    pub fn caller(function_name: impl Into<String>) -> Self {
        let location = Location::caller();
        Self {
            file_path: location.file().to_owned(),
            line_number: location.line(),
            function_name: function_name.into(),
        }
    }
}

impl From<ReportLocation> for proto::SourceLocation {
    fn from(location: ReportLocation) -> Self {
        Self {
            file_path: location.file_path,
            line_number: i32::try_from(location.line_number).unwrap_or(i32::MAX),
            function_name: location.function_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    pub http_request: HttpRequestContext,
    pub report_location: ReportLocation,
}

impl From<ErrorContext> for proto::ErrorContext {
    fn from(context: ErrorContext) -> Self {
        Self {
            http_request: Some(context.http_request.into()),
            report_location: Some(context.report_location.into()),
            ..Default::default()
        }
    }
}

/// Destination for error events.
#[async_trait]
pub trait ErrorSink: Send + Sync {
    /// Reports one event. `message` is sent verbatim, so callers append their own stack trace.
    async fn report(&self, context: ErrorContext, message: String) -> Result<(), ClientError>;
}

/// Error Reporting client bound to one project and service.
///
/// Uses Application Default Credentials for authentication.
#[derive(Clone)]
pub struct ErrorReportingClient {
    inner: Arc<ErrorReportingClientInner>,
}

struct ErrorReportingClientInner {
    client: GoogleApi<ReportErrorsServiceClient<GoogleAuthMiddleware>>,
    project_id: String,
    service_context: ServiceContext,
}

impl ErrorReportingClient {
    pub async fn new(
        project_id: impl Into<String>,
        service_context: ServiceContext,
    ) -> Result<Self, ClientError> {
        let project_id = project_id.into();
        if project_id.is_empty() {
            return Err(ClientError::EmptyProjectId);
        }

        let client = GoogleApi::from_function(
            ReportErrorsServiceClient::new,
            ERROR_REPORTING_ENDPOINT,
            None,
        )
        .await
        .map_err(ClientError::connect("error reporting"))?;

        Ok(Self {
            inner: Arc::new(ErrorReportingClientInner {
                client,
                project_id,
                service_context,
            }),
        })
    }
}

fn report_request(
    project_id: &str,
    service_context: &ServiceContext,
    context: ErrorContext,
    message: String,
    at: DateTime<Utc>,
) -> proto::ReportErrorEventRequest {
    proto::ReportErrorEventRequest {
        project_name: format!("projects/{project_id}"),
        event: Some(proto::ReportedErrorEvent {
            event_time: Some(crate::timestamp(at)),
            service_context: Some(service_context.clone().into()),
            message,
            context: Some(context.into()),
        }),
    }
}

#[async_trait]
impl ErrorSink for ErrorReportingClient {
    async fn report(&self, context: ErrorContext, message: String) -> Result<(), ClientError> {
        let request = report_request(
            &self.inner.project_id,
            &self.inner.service_context,
            context,
            message,
            Utc::now(),
        );

        self.inner
            .client
            .get()
            .report_error_event(request)
            .await
            .map_err(ClientError::api("error reporting"))?;
        Ok(())
    }
}
