use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gcloud_sdk::google::api;
use gcloud_sdk::google::monitoring::v3 as proto;
use gcloud_sdk::google::monitoring::v3::metric_service_client::MetricServiceClient;
use gcloud_sdk::{GoogleApi, GoogleAuthMiddleware};

use crate::error::ClientError;

pub const MONITORING_ENDPOINT: &str = "https://monitoring.googleapis.com";

/// Returns the `projects/{project}` path time series are written under.
pub fn metric_project_path(project_id: &str) -> String {
    format!("projects/{project_id}")
}

/// The monitored resource a metric or log entry is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoredResource {
    pub resource_type: String,
    pub labels: BTreeMap<String, String>,
}

impl MonitoredResource {
    /// The project-wide `global` resource.
    pub fn global(project_id: &str) -> Self {
        Self {
            resource_type: "global".to_owned(),
            labels: BTreeMap::from([("project_id".to_owned(), project_id.to_owned())]),
        }
    }
}

impl From<MonitoredResource> for api::MonitoredResource {
    fn from(resource: MonitoredResource) -> Self {
        Self {
            r#type: resource.resource_type,
            labels: resource.labels.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    pub metric_type: String,
    pub labels: BTreeMap<String, String>,
}

impl Metric {
    pub fn new(metric_type: impl Into<String>) -> Self {
        Self {
            metric_type: metric_type.into(),
            labels: BTreeMap::new(),
        }
    }
}

impl From<Metric> for api::Metric {
    fn from(metric: Metric) -> Self {
        Self {
            r#type: metric.metric_type,
            labels: metric.labels.into_iter().collect(),
        }
    }
}

/// Sample value; probes only ever write integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    Int64Value(i64),
}

impl From<TypedValue> for proto::TypedValue {
    fn from(value: TypedValue) -> Self {
        let value = match value {
            TypedValue::Int64Value(value) => proto::typed_value::Value::Int64Value(value),
        };
        Self { value: Some(value) }
    }
}

/// A gauge interval, which is a single instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeInterval {
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Point {
    pub interval: TimeInterval,
    pub value: TypedValue,
}

impl Point {
    /// A gauge sample with an integer value taken at `end_time`.
    pub fn int64(end_time: DateTime<Utc>, value: i64) -> Self {
        Self {
            interval: TimeInterval { end_time },
            value: TypedValue::Int64Value(value),
        }
    }
}

impl From<Point> for proto::Point {
    fn from(point: Point) -> Self {
        Self {
            interval: Some(proto::TimeInterval {
                end_time: Some(crate::timestamp(point.interval.end_time)),
                start_time: None,
            }),
            value: Some(point.value.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeries {
    pub metric: Metric,
    pub resource: MonitoredResource,
    pub points: Vec<Point>,
}

impl From<TimeSeries> for proto::TimeSeries {
    fn from(series: TimeSeries) -> Self {
        Self {
            metric: Some(series.metric.into()),
            resource: Some(series.resource.into()),
            points: series.points.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

/// `projects.timeSeries.create`; `name` selects the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTimeSeriesRequest {
    pub name: String,
    pub time_series: Vec<TimeSeries>,
}

impl From<CreateTimeSeriesRequest> for proto::CreateTimeSeriesRequest {
    fn from(request: CreateTimeSeriesRequest) -> Self {
        Self {
            name: request.name,
            time_series: request.time_series.into_iter().map(Into::into).collect(),
        }
    }
}

/// Destination for metric samples.
#[async_trait]
pub trait MetricSink: Send + Sync {
    async fn create_time_series(&self, request: CreateTimeSeriesRequest)
    -> Result<(), ClientError>;
}

/// Cloud Monitoring client. The project is chosen per request through
/// [`CreateTimeSeriesRequest::name`].
#[derive(Clone)]
pub struct MetricClient {
    client: Arc<GoogleApi<MetricServiceClient<GoogleAuthMiddleware>>>,
}

impl MetricClient {
    /// Uses Application Default Credentials for authentication.
    pub async fn new() -> Result<Self, ClientError> {
        let client = GoogleApi::from_function(MetricServiceClient::new, MONITORING_ENDPOINT, None)
            .await
            .map_err(ClientError::connect("monitoring"))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }
}

#[async_trait]
impl MetricSink for MetricClient {
    async fn create_time_series(
        &self,
        request: CreateTimeSeriesRequest,
    ) -> Result<(), ClientError> {
        self.client
            .get()
            .create_time_series(proto::CreateTimeSeriesRequest::from(request))
            .await
            .map_err(ClientError::api("monitoring"))?;
        Ok(())
    }
}
