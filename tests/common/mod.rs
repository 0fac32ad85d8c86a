//! Recording stand-ins for the Google Cloud clients.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cloudprobe::gcp::{
    ClientError, Code, CreateTimeSeriesRequest, ErrorContext, ErrorSink, LogSink, MetricSink,
    Severity,
};
use cloudprobe::{AppState, RuntimePlatform, ServiceClients, router};
use tokio::sync::mpsc;

pub const PROJECT_ID: &str = "probe-project";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogWrite {
    pub log_name: String,
    pub severity: Severity,
    pub message: String,
}

#[derive(Default)]
pub struct RecordingLogSink {
    pub writes: Mutex<Vec<LogWrite>>,
    pub fail: bool,
}

#[async_trait]
impl LogSink for RecordingLogSink {
    async fn write(
        &self,
        log_name: &str,
        severity: Severity,
        message: &str,
    ) -> Result<(), ClientError> {
        self.writes.lock().unwrap().push(LogWrite {
            log_name: log_name.to_owned(),
            severity,
            message: message.to_owned(),
        });
        if self.fail {
            return Err(api_error("logging"));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMetricSink {
    pub requests: Mutex<Vec<CreateTimeSeriesRequest>>,
    pub fail: bool,
}

#[async_trait]
impl MetricSink for RecordingMetricSink {
    async fn create_time_series(
        &self,
        request: CreateTimeSeriesRequest,
    ) -> Result<(), ClientError> {
        self.requests.lock().unwrap().push(request);
        if self.fail {
            return Err(api_error("monitoring"));
        }
        Ok(())
    }
}

pub struct RecordingErrorSink {
    pub reports: mpsc::UnboundedSender<(ErrorContext, String)>,
    pub fail: bool,
}

#[async_trait]
impl ErrorSink for RecordingErrorSink {
    async fn report(&self, context: ErrorContext, message: String) -> Result<(), ClientError> {
        let _ = self.reports.send((context, message));
        if self.fail {
            return Err(api_error("error reporting"));
        }
        Ok(())
    }
}

fn api_error(service: &'static str) -> ClientError {
    ClientError::Api {
        service,
        code: Code::Unavailable,
        message: "backend unavailable".to_owned(),
    }
}

/// A router wired to recording sinks, plus handles to inspect what reached them.
pub struct Harness {
    pub app: axum::Router,
    pub logs: Arc<RecordingLogSink>,
    pub metrics: Arc<RecordingMetricSink>,
    pub reports: mpsc::UnboundedReceiver<(ErrorContext, String)>,
}

pub fn harness() -> Harness {
    build(false)
}

pub fn failing_harness() -> Harness {
    build(true)
}

fn build(fail: bool) -> Harness {
    let logs = Arc::new(RecordingLogSink {
        fail,
        ..Default::default()
    });
    let metrics = Arc::new(RecordingMetricSink {
        fail,
        ..Default::default()
    });
    let (tx, reports) = mpsc::unbounded_channel();
    let errors = Arc::new(RecordingErrorSink { reports: tx, fail });

    let clients = ServiceClients::new(logs.clone(), metrics.clone(), errors);
    let state = AppState::new(PROJECT_ID, RuntimePlatform::Generic, clients);

    Harness {
        app: router(state),
        logs,
        metrics,
        reports,
    }
}
