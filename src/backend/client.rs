use std::time::{Duration, Instant};

use opentelemetry::KeyValue;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Instrument;

use super::ReportSource;
use crate::config::Config;
use crate::telemetry::metrics::{
    BACKEND_ERROR_COUNT, BACKEND_REQUEST_DURATION, BACKEND_RETRY_COUNT,
};

pub const NO_REPORT_CONTENT: &str = "No report content was returned by the server.";

const GENERATE_PATH: &str = "/api/reports/generate";
pub const DEFAULT_RETRY_BASE: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    file_paths: &'a [String],
}

#[derive(Debug, Deserialize)]
struct GenerateEnvelope {
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_base: Duration,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration, max_retries: u32) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: max_retries.max(1),
            retry_base: DEFAULT_RETRY_BASE,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(
            &config.backend_base_url,
            config.backend_timeout,
            config.backend_max_retries,
        )
    }

    /// Overrides the first backoff delay; later attempts double it.
    pub fn with_retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }

    pub fn generate_url(&self) -> String {
        format!("{}{}", self.base_url, GENERATE_PATH)
    }

    pub async fn generate_once(&self, file_paths: &[String]) -> anyhow::Result<String> {
        let url = self.generate_url();
        let start = Instant::now();

        let span = tracing::info_span!(
            "backend.generate",
            otel.name = "POST /api/reports/generate",
            http.request.method = "POST",
            url.full = %url,
            server.address = %server_address(&self.base_url),
            report.file_paths = file_paths.len(),
            http.response.status_code = tracing::field::Empty,
            report.length = tracing::field::Empty,
            otel.status_code = tracing::field::Empty,
            error.type = tracing::field::Empty,
        );

        let result: anyhow::Result<String> = async {
            let response = self
                .http
                .post(&url)
                .header(reqwest::header::ACCEPT, "application/json")
                .json(&GenerateBody { file_paths })
                .send()
                .await
                .map_err(describe_transport_error)?;

            let status = response.status();
            tracing::Span::current()
                .record("http.response.status_code", status.as_u16() as i64);

            let body = response.text().await.map_err(describe_transport_error)?;
            Ok(extract_report(status, &body)?)
        }
        .instrument(span.clone())
        .await;

        let duration = start.elapsed().as_secs_f64();

        match result {
            Ok(report) => {
                span.record("report.length", report.len() as i64);
                BACKEND_REQUEST_DURATION.record(duration, &[KeyValue::new("outcome", "ok")]);
                Ok(report)
            }
            Err(err) => {
                let kind = classify_error(&err);
                span.record("otel.status_code", "ERROR");
                span.record("error.type", kind);

                BACKEND_REQUEST_DURATION.record(duration, &[KeyValue::new("outcome", "error")]);
                BACKEND_ERROR_COUNT.add(1, &[KeyValue::new("error.type", kind)]);

                Err(err)
            }
        }
    }

    pub async fn generate_with_retry(&self, file_paths: &[String]) -> anyhow::Result<String> {
        let mut last_err = None;

        for attempt in 0..self.max_retries {
            match self.generate_once(file_paths).await {
                Ok(report) => return Ok(report),
                Err(err) => {
                    let kind = classify_error(&err);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        error.type = kind,
                        error = %err,
                        "Report generation failed"
                    );

                    if !is_retryable(kind) {
                        return Err(err);
                    }
                    last_err = Some(err);

                    if attempt < self.max_retries - 1 {
                        BACKEND_RETRY_COUNT.add(1, &[KeyValue::new("error.type", kind)]);
                        tokio::time::sleep(backoff(self.retry_base, attempt)).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("all retries exhausted")))
    }
}

#[async_trait::async_trait]
impl ReportSource for BackendClient {
    async fn generate(&self, file_paths: &[String]) -> anyhow::Result<String> {
        self.generate_with_retry(file_paths).await
    }

    fn name(&self) -> &str {
        "reassessment-backend"
    }
}

/// Failures the client can attribute precisely; classified without
/// inspecting message text.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("backend returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("No report content was returned by the server.")]
    EmptyReport,

    #[error("invalid JSON from backend: {0}")]
    InvalidJson(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),
}

impl BackendError {
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::Status { status, .. } => classify_status(*status),
            BackendError::EmptyReport => "empty_report",
            BackendError::InvalidJson(_) => "invalid_response",
            BackendError::Timeout(_) => "timeout",
            BackendError::Connect(_) => "network_error",
        }
    }
}

/// Accepts only a 2xx response whose `data` field is a non-blank string.
pub(crate) fn extract_report(status: StatusCode, body: &str) -> Result<String, BackendError> {
    let envelope = serde_json::from_str::<GenerateEnvelope>(body);

    if !status.is_success() {
        let message = envelope
            .ok()
            .and_then(|e| e.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| truncate(body.trim(), 200));
        return Err(BackendError::Status { status, message });
    }

    let envelope = envelope.map_err(|e| BackendError::InvalidJson(e.to_string()))?;
    match envelope.data {
        Some(serde_json::Value::String(report)) if !report.trim().is_empty() => Ok(report),
        _ => Err(BackendError::EmptyReport),
    }
}

fn describe_transport_error(err: reqwest::Error) -> anyhow::Error {
    let err = err.without_url();
    if err.is_timeout() {
        BackendError::Timeout(err.to_string()).into()
    } else if err.is_connect() {
        BackendError::Connect(err.to_string()).into()
    } else {
        anyhow::Error::new(err)
    }
}

fn classify_status(status: StatusCode) -> &'static str {
    match status.as_u16() {
        429 => "rate_limit",
        408 | 504 => "timeout",
        401 | 403 => "auth_error",
        400..=499 => "invalid_request",
        500..=599 => "server_error",
        _ => "unknown_error",
    }
}

pub(crate) fn classify_error(err: &anyhow::Error) -> &'static str {
    if let Some(backend) = err.downcast_ref::<BackendError>() {
        return backend.kind();
    }
    if let Some(transport) = err.downcast_ref::<reqwest::Error>() {
        if transport.is_timeout() {
            return "timeout";
        }
        if transport.is_connect() || transport.is_request() {
            return "network_error";
        }
    }

    // Untyped transport failures only.
    let msg = err.to_string().to_lowercase();
    if msg.contains("timeout") || msg.contains("timed out") || msg.contains("deadline") {
        "timeout"
    } else if msg.contains("connect")
        || msg.contains("dns")
        || msg.contains("network")
        || msg.contains("reset")
    {
        "network_error"
    } else {
        "unknown_error"
    }
}

fn is_retryable(kind: &str) -> bool {
    !matches!(
        kind,
        "auth_error" | "invalid_request" | "invalid_response" | "empty_report"
    )
}

fn base_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt)).min(MAX_BACKOFF)
}

fn backoff(base: Duration, attempt: u32) -> Duration {
    let delay = base_delay(base, attempt);
    // up to 25% jitter
    let jitter_ms = fastrand::u64(0..=delay.as_millis() as u64 / 4);
    delay + Duration::from_millis(jitter_ms)
}

/// Upper bound on the wall time of `generate_with_retry`: every attempt
/// running into `timeout` plus the longest possible backoffs between them.
pub fn retry_budget(timeout: Duration, max_retries: u32, retry_base: Duration) -> Duration {
    let attempts = max_retries.max(1);
    let sleeps = (0..attempts - 1)
        .map(|attempt| {
            let delay = base_delay(retry_base, attempt);
            delay + delay / 4
        })
        .fold(Duration::ZERO, Duration::saturating_add);
    timeout.saturating_mul(attempts).saturating_add(sleeps)
}

fn server_address(base_url: &str) -> &str {
    let without_scheme = base_url.split_once("://").map_or(base_url, |(_, rest)| rest);
    without_scheme.split(['/', ':']).next().unwrap_or(without_scheme)
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s.char_indices()
            .take_while(|&(i, _)| i < max)
            .map(|(_, c)| c)
            .collect()
    }
}
