//! Endpoint handlers.
//!
//! The data-driven handlers share one shape: reject anything but `POST`, decode the body,
//! make a single downstream call, answer `OK`. Failures travel as [`HandlerError`] and are
//! rendered in exactly one place.

use std::backtrace::Backtrace;
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use chrono::Utc;
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use cloudprobe_gcp::{
    CreateTimeSeriesRequest, ErrorContext, Metric, MonitoredResource, Point, ReportLocation,
    Severity, TimeSeries, metric_project_path,
};

use crate::context::RequestContext;
use crate::error::HandlerError;
use crate::state::AppState;

/// Zone resolved by `/tzinfo`.
pub const TIMEZONE: &str = "US/Pacific";

const GREETING: &str = "Hello World!";
const RUSTC_VERSION: &str = env!("CLOUDPROBE_RUSTC_VERSION");

/// Body of `/logging_custom`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LogRequest {
    pub log_name: String,
    pub token: String,
    pub level: String,
}

/// Body of `/monitoring`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MetricRequest {
    pub name: String,
    pub token: i64,
}

/// Body of `/exception`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExceptionRequest {
    pub token: i64,
}

/// One entry of the `/custom` listing consumed by the external test driver.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProbeTarget {
    pub name: &'static str,
    pub path: &'static str,
    #[serde(skip_serializing_if = "is_zero")]
    pub timeout: u32,
}

pub const PROBE_TARGETS: [ProbeTarget; 3] = [
    ProbeTarget {
        name: "Version",
        path: "/version",
        timeout: 0,
    },
    ProbeTarget {
        name: "Lookup Host",
        path: "/lookup_host",
        timeout: 0,
    },
    ProbeTarget {
        name: "TimeZone",
        path: "/tzinfo",
        timeout: 0,
    },
];

fn is_zero(value: &u32) -> bool {
    *value == 0
}

pub async fn hello() -> &'static str {
    GREETING
}

pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "404 page not found\n")
}

pub async fn health() -> &'static str {
    "OK"
}

pub async fn version(State(state): State<AppState>) -> String {
    format!(
        "Rust version={RUSTC_VERSION}\nARCH={}\nOS={}\nPLATFORM={}\n",
        std::env::consts::ARCH,
        std::env::consts::OS,
        state.platform().name(),
    )
}

pub async fn tzinfo() -> Result<String, HandlerError> {
    let zone: Tz = TIMEZONE
        .parse()
        .map_err(|err| HandlerError::Timezone(format!("unknown time zone {TIMEZONE}: {err}")))?;
    Ok(format!("{}\n", zone.name()))
}

pub async fn lookup_host(context: RequestContext) -> Result<String, HandlerError> {
    let hostname = context
        .hostname()
        .ok_or_else(|| HandlerError::LookupHost("request has no host".to_owned()))?;

    let resolved = tokio::net::lookup_host((hostname.as_str(), 0))
        .await
        .map_err(|err| HandlerError::LookupHost(err.to_string()))?;

    let mut addrs: Vec<String> = Vec::new();
    for addr in resolved {
        let ip = addr.ip().to_string();
        if !addrs.contains(&ip) {
            addrs.push(ip);
        }
    }

    Ok(addrs.join("\n"))
}

pub async fn logging_custom(
    State(state): State<AppState>,
    method: Method,
    body: Bytes,
) -> Result<&'static str, HandlerError> {
    require_post(&method)?;
    let request: LogRequest = decode_body(&body)?;

    let severity = Severity::parse(&request.level);
    state
        .clients()
        .logging
        .write(&request.log_name, severity, &request.token)
        .await
        .map_err(HandlerError::Logging)?;

    tracing::debug!(log_name = %request.log_name, %severity, "wrote custom log entry");
    Ok("OK")
}

pub async fn monitoring(
    State(state): State<AppState>,
    method: Method,
    body: Bytes,
) -> Result<&'static str, HandlerError> {
    require_post(&method)?;
    let request: MetricRequest = decode_body(&body)?;

    let project_id = state.project_id();
    let series = TimeSeries {
        metric: Metric::new(request.name),
        resource: MonitoredResource::global(project_id),
        points: vec![Point::int64(Utc::now(), request.token)],
    };

    state
        .clients()
        .metrics
        .create_time_series(CreateTimeSeriesRequest {
            name: metric_project_path(project_id),
            time_series: vec![series],
        })
        .await
        .map_err(HandlerError::Monitoring)?;

    Ok("OK")
}

pub async fn exception(
    State(state): State<AppState>,
    method: Method,
    context: RequestContext,
    body: Bytes,
) -> Result<&'static str, HandlerError> {
    require_post(&method)?;
    let request: ExceptionRequest = decode_body(&body)?;

    let error_context = ErrorContext {
        http_request: context.into_http_request(),
        report_location: ReportLocation::caller("exception"),
    };
    // Captured here so the trace shows the handler, not the reporting task.
    let message = format!("{}\n{}", request.token, Backtrace::force_capture());

    // Fire and forget: delivery failures are logged, never returned to the caller.
    let sink = Arc::clone(&state.clients().errors);
    tokio::spawn(async move {
        if let Err(err) = sink.report(error_context, message).await {
            tracing::warn!(error = %err, "error report was not delivered");
        }
    });

    Ok("OK")
}

pub async fn custom() -> Json<[ProbeTarget; 3]> {
    Json(PROBE_TARGETS)
}

fn require_post(method: &Method) -> Result<(), HandlerError> {
    if *method == Method::POST {
        Ok(())
    } else {
        Err(HandlerError::WrongMethod(method.clone()))
    }
}

/// Decodes the first JSON value in `body`; trailing bytes are ignored and `null` yields the
/// all-defaults request.
fn decode_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, HandlerError> {
    let mut values = serde_json::Deserializer::from_slice(body).into_iter::<Option<T>>();
    match values.next() {
        Some(Ok(value)) => Ok(value.unwrap_or_default()),
        Some(Err(err)) => Err(HandlerError::Decode(err.to_string())),
        None => Err(HandlerError::Decode("EOF".to_owned())),
    }
}
