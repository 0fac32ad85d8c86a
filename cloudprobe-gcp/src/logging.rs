use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gcloud_sdk::google::logging::v2::logging_service_v2_client::LoggingServiceV2Client;
use gcloud_sdk::google::logging::v2::{LogEntry, WriteLogEntriesRequest, log_entry};
use gcloud_sdk::{GoogleApi, GoogleAuthMiddleware};

use crate::error::ClientError;
use crate::monitoring::MonitoredResource;

pub const LOGGING_ENDPOINT: &str = "https://logging.googleapis.com";

/// Importance of a log entry, mirroring Cloud Logging's `LogSeverity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Default,
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl Severity {
    /// Parses a severity name case-insensitively; unknown names map to [`Severity::Default`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Severity::Debug,
            "INFO" => Severity::Info,
            "NOTICE" => Severity::Notice,
            "WARNING" => Severity::Warning,
            "ERROR" => Severity::Error,
            "CRITICAL" => Severity::Critical,
            "ALERT" => Severity::Alert,
            "EMERGENCY" => Severity::Emergency,
            _ => Severity::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Default => "DEFAULT",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Notice => "NOTICE",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
            Severity::Alert => "ALERT",
            Severity::Emergency => "EMERGENCY",
        }
    }

    /// Numeric value of `google.logging.type.LogSeverity`.
    pub fn code(&self) -> i32 {
        match self {
            Severity::Default => 0,
            Severity::Debug => 100,
            Severity::Info => 200,
            Severity::Notice => 300,
            Severity::Warning => 400,
            Severity::Error => 500,
            Severity::Critical => 600,
            Severity::Alert => 700,
            Severity::Emergency => 800,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination for log entries.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Writes a single text entry with `severity` to the log called `log_name`.
    async fn write(&self, log_name: &str, severity: Severity, message: &str)
    -> Result<(), ClientError>;
}

/// Cloud Logging client bound to one project.
///
/// Uses Application Default Credentials for authentication.
#[derive(Clone)]
pub struct LoggingClient {
    inner: Arc<LoggingClientInner>,
}

struct LoggingClientInner {
    client: GoogleApi<LoggingServiceV2Client<GoogleAuthMiddleware>>,
    project_id: String,
}

impl LoggingClient {
    pub async fn new(project_id: impl Into<String>) -> Result<Self, ClientError> {
        let project_id = project_id.into();
        if project_id.is_empty() {
            return Err(ClientError::EmptyProjectId);
        }

        tracing::debug!(%project_id, "initializing logging client");
        let client = GoogleApi::from_function(LoggingServiceV2Client::new, LOGGING_ENDPOINT, None)
            .await
            .map_err(ClientError::connect("logging"))?;

        Ok(Self {
            inner: Arc::new(LoggingClientInner { client, project_id }),
        })
    }
}

/// Full resource name of `log_id`, URL-encoding the id as the API requires.
pub fn log_path(project_id: &str, log_id: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(log_id.as_bytes()).collect();
    format!("projects/{project_id}/logs/{encoded}")
}

fn write_request(
    project_id: &str,
    log_name: &str,
    severity: Severity,
    message: &str,
    at: DateTime<Utc>,
) -> WriteLogEntriesRequest {
    WriteLogEntriesRequest {
        log_name: log_path(project_id, log_name),
        resource: Some(MonitoredResource::global(project_id).into()),
        entries: vec![LogEntry {
            severity: severity.code(),
            timestamp: Some(crate::timestamp(at)),
            payload: Some(log_entry::Payload::TextPayload(message.to_owned())),
            ..Default::default()
        }],
        ..Default::default()
    }
}

#[async_trait]
impl LogSink for LoggingClient {
    async fn write(
        &self,
        log_name: &str,
        severity: Severity,
        message: &str,
    ) -> Result<(), ClientError> {
        let request = write_request(&self.inner.project_id, log_name, severity, message, Utc::now());

        self.inner
            .client
            .get()
            .write_log_entries(request)
            .await
            .map_err(ClientError::api("logging"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_severity_names() {
        assert_eq!(Severity::parse("INFO"), Severity::Info);
        assert_eq!(Severity::parse("warning"), Severity::Warning);
        assert_eq!(Severity::parse(" Emergency "), Severity::Emergency);
        assert_eq!(Severity::parse("verbose"), Severity::Default);
        assert_eq!(Severity::parse(""), Severity::Default);
    }

    #[test]
    fn severity_codes_follow_log_severity() {
        assert_eq!(Severity::Default.code(), 0);
        assert_eq!(Severity::Info.code(), 200);
        assert_eq!(Severity::Emergency.code(), 800);
    }

    #[test]
    fn log_path_encodes_log_id() {
        assert_eq!(log_path("proj", "x"), "projects/proj/logs/x");
        assert_eq!(log_path("proj", "a/b"), "projects/proj/logs/a%2Fb");
    }

    #[tokio::test]
    async fn rejects_empty_project() {
        let err = LoggingClient::new("").await.err().unwrap();
        assert!(matches!(err, ClientError::EmptyProjectId));
    }

    #[test]
    fn builds_a_single_text_entry() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let request = write_request("proj", "x", Severity::Info, "t1", at);

        assert_eq!(request.log_name, "projects/proj/logs/x");
        let resource = request.resource.unwrap();
        assert_eq!(resource.r#type, "global");
        assert_eq!(resource.labels.get("project_id").map(String::as_str), Some("proj"));

        assert_eq!(request.entries.len(), 1);
        let entry = &request.entries[0];
        assert_eq!(entry.severity, 200);
        assert_eq!(entry.timestamp.as_ref().map(|ts| ts.seconds), Some(at.timestamp()));
        assert_eq!(
            entry.payload,
            Some(log_entry::Payload::TextPayload("t1".to_owned()))
        );
    }
}
