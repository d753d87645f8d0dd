//! Service configuration
//!
//! Layered with the `config` crate: compiled defaults, then an optional
//! `config.{yaml,toml,json}` file (or the file passed on the command line),
//! then `PETNET__SECTION__KEY` environment variables.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::queue::RetryPolicy;

pub const ENV_PREFIX: &str = "PETNET";

/// Longest retry backoff accepted from configuration (one week)
pub const MAX_RETRY_DELAY_MS: u64 = 7 * 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub workers: WorkerConfig,
    pub handlers: HandlerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_request_body_size: usize,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_request_body_size: 1024 * 1024,
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Run the worker loop inside the server process
    pub enabled: bool,
    pub poll_interval_ms: u64,
    /// Upper bound on jobs drained per tick
    pub batch_size: usize,
    pub default_max_attempts: u32,
    /// 0 disables the handler timeout
    pub handler_timeout_seconds: u64,
    pub retry_initial_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub retry_backoff_multiplier: f64,
    pub wake_on_enqueue: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: 5_000,
            batch_size: 1,
            default_max_attempts: crate::queue::DEFAULT_MAX_ATTEMPTS,
            handler_timeout_seconds: 300,
            retry_initial_delay_ms: 0,
            retry_max_delay_ms: 60_000,
            retry_backoff_multiplier: 2.0,
            wake_on_enqueue: true,
        }
    }
}

impl WorkerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn handler_timeout(&self) -> Option<Duration> {
        (self.handler_timeout_seconds > 0)
            .then(|| Duration::from_secs(self.handler_timeout_seconds))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            backoff_multiplier: self.retry_backoff_multiplier,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    pub link_check_timeout_seconds: u64,
    pub link_check_user_agent: String,
    /// Simulated delivery latency for notifications
    pub notification_delay_ms: u64,
    /// Simulated transcoder latency
    pub transcode_delay_ms: u64,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            link_check_timeout_seconds: 10,
            link_check_user_agent: "PetSocialNetwork/1.0".to_string(),
            notification_delay_ms: 500,
            transcode_delay_ms: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub file_enabled: bool,
    pub file_directory: String,
    pub file_prefix: String,
    /// daily, hourly, minutely or never
    pub file_rotation: String,
    pub opentelemetry_enabled: bool,
    pub otlp_endpoint: String,
    pub otlp_timeout_seconds: u64,
    pub trace_sample_ratio: f64,
    pub service_name: String,
    pub service_version: Option<String>,
    pub deployment_environment: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file_enabled: false,
            file_directory: "./logs".to_string(),
            file_prefix: "petnet-jobs".to_string(),
            file_rotation: "daily".to_string(),
            opentelemetry_enabled: false,
            otlp_endpoint: "http://localhost:4317".to_string(),
            otlp_timeout_seconds: 10,
            trace_sample_ratio: 1.0,
            service_name: "petnet-jobs".to_string(),
            service_version: None,
            deployment_environment: "development".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `config.*` in the working directory and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, reading the given file instead of the default `config.*`
    pub fn load_from(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();

        let defaults = config::Config::try_from(&Config::default())?;
        let mut builder = config::Config::builder().add_source(defaults);

        builder = match path {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name("config").required(false)),
        };

        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            )
            .build()?
            .try_deserialize()
    }

    /// Reject settings the worker loop cannot run with
    pub fn validate(&self) -> Result<(), String> {
        if self.workers.poll_interval_ms == 0 {
            return Err("workers.poll_interval_ms must be greater than 0".to_string());
        }
        if self.workers.batch_size == 0 {
            return Err("workers.batch_size must be greater than 0".to_string());
        }
        if self.workers.default_max_attempts == 0 {
            return Err("workers.default_max_attempts must be greater than 0".to_string());
        }
        if !(self.workers.retry_backoff_multiplier >= 1.0
            && self.workers.retry_backoff_multiplier.is_finite())
        {
            return Err(
                "workers.retry_backoff_multiplier must be a finite number of at least 1.0"
                    .to_string(),
            );
        }
        if self.workers.retry_max_delay_ms > MAX_RETRY_DELAY_MS {
            return Err(format!(
                "workers.retry_max_delay_ms must be at most {MAX_RETRY_DELAY_MS}"
            ));
        }
        if self.workers.retry_initial_delay_ms > self.workers.retry_max_delay_ms {
            return Err(
                "workers.retry_initial_delay_ms must not exceed workers.retry_max_delay_ms"
                    .to_string(),
            );
        }
        if crate::logging::parse_rotation(&self.logging.file_rotation).is_none() {
            return Err(format!(
                "logging.file_rotation must be one of daily, hourly, minutely, never (got {})",
                self.logging.file_rotation
            ));
        }
        if !(0.0..=1.0).contains(&self.logging.trace_sample_ratio) {
            return Err("logging.trace_sample_ratio must be between 0.0 and 1.0".to_string());
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
