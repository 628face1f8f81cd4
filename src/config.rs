use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::backend::client::{DEFAULT_RETRY_BASE, retry_budget};

pub const DEFAULT_BACKEND_BASE_URL: &str =
    "https://ahsan462agk-reassesment-agent-backend.hf.space/api/v1";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a number, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },

    #[error(
        "REQUEST_TIMEOUT_SECS ({request_secs}s) must exceed the backend retry budget ({budget_secs}s)"
    )]
    TimeoutBudget { request_secs: u64, budget_secs: u64 },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub backend_base_url: String,
    pub backend_timeout: Duration,
    pub backend_max_retries: u32,
    pub request_timeout: Duration,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let backend_max_retries: u32 = parse_number(&lookup, "BACKEND_MAX_RETRIES", 3)?;
        if backend_max_retries == 0 {
            return Err(ConfigError::Zero {
                key: "BACKEND_MAX_RETRIES",
            });
        }

        let backend_timeout =
            Duration::from_secs(parse_number(&lookup, "BACKEND_TIMEOUT_SECS", 90)?);
        let request_timeout =
            Duration::from_secs(parse_number(&lookup, "REQUEST_TIMEOUT_SECS", 300)?);

        // The HTTP layer must not cut off a request the client is still retrying.
        let budget = retry_budget(backend_timeout, backend_max_retries, DEFAULT_RETRY_BASE);
        if request_timeout <= budget {
            return Err(ConfigError::TimeoutBudget {
                request_secs: request_timeout.as_secs(),
                budget_secs: budget.as_secs_f64().ceil() as u64,
            });
        }

        Ok(Self {
            port: parse_number(&lookup, "APP_PORT", 8080)?,
            environment: string("APP_ENVIRONMENT", "development"),
            backend_base_url: string("BACKEND_BASE_URL", DEFAULT_BACKEND_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            backend_timeout,
            backend_max_retries,
            request_timeout,
            otel_service_name: string("OTEL_SERVICE_NAME", "reassessment-report"),
            otel_exporter_endpoint: string("OTEL_EXPORTER_OTLP_ENDPOINT", "http://localhost:4317"),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_number<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
    }
}
