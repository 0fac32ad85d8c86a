//! Google Cloud clients for the handful of APIs `cloudprobe` exercises.
//!
//! Logging, Monitoring, and Error Reporting go through `gcloud-sdk` gRPC clients
//! authenticated with Application Default Credentials. The instance metadata server is
//! queried directly for the project. The handler layer only sees the [`LogSink`],
//! [`MetricSink`], and [`ErrorSink`] traits, so tests can swap in recording fakes.

pub mod error;
pub mod error_reporting;
pub mod logging;
pub mod metadata;
pub mod monitoring;

use chrono::{DateTime, Utc};
use gcloud_sdk::prost_types::Timestamp;

pub use crate::error::ClientError;
pub use crate::error_reporting::{
    ErrorContext, ErrorReportingClient, ErrorSink, HttpRequestContext, ReportLocation,
    ServiceContext,
};
pub use crate::logging::{LogSink, LoggingClient, Severity};
pub use crate::metadata::{METADATA_HOST_ENV, MetadataClient};
pub use crate::monitoring::{
    CreateTimeSeriesRequest, Metric, MetricClient, MetricSink, MonitoredResource, Point,
    TimeInterval, TimeSeries, TypedValue, metric_project_path,
};
pub use gcloud_sdk::tonic::Code;

pub(crate) fn timestamp(at: DateTime<Utc>) -> Timestamp {
    Timestamp {
        seconds: at.timestamp(),
        nanos: at.timestamp_subsec_nanos() as i32,
    }
}
