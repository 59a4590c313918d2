use crate::adapter::DEFAULT_TRAINER_COMMAND;
use crate::error::LearnerError;
use crate::handler::IdentityPolicy;
use crate::lifecycle::DEFAULT_SHUTDOWN_TIMEOUT;
use crate::queue::DEFAULT_QUEUE_SIZE;
use axum::http::HeaderName;
use clap::{Parser, ValueEnum};
use std::time::Duration;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 2015;

/// Default cap on a whole upload request (256 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 256 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Text,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Settings {
    /// Listen address
    #[arg(long, env = "MCTSD_ADDR", default_value = "127.0.0.1")]
    pub addr: String,

    /// Listen port
    #[arg(long, env = "MCTSD_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Write per-request and per-job trace output
    #[arg(long, env = "MCTSD_VERBOSE")]
    pub verbose: bool,

    /// Trusted local mode: accept uploads without a client identity header
    #[arg(long, env = "MCTSD_DEBUG")]
    pub debug: bool,

    /// Number of queue slots between the HTTP handlers and the trainer
    #[arg(long, env = "MCTSD_QUEUE_SIZE", default_value_t = DEFAULT_QUEUE_SIZE)]
    pub queue_size: usize,

    /// Seconds to wait for in-flight HTTP connections on shutdown
    #[arg(
        long,
        env = "MCTSD_SHUTDOWN_TIMEOUT_SECS",
        default_value_t = DEFAULT_SHUTDOWN_TIMEOUT.as_secs()
    )]
    pub shutdown_timeout_secs: u64,

    /// Maximum size of an upload request body in bytes
    #[arg(long, env = "MCTSD_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// Header carrying the verified client certificate subject
    #[arg(long, env = "MCTSD_IDENTITY_HEADER", default_value = "x-client-cert-dn")]
    pub identity_header: String,

    /// Prefix the identity header value must carry before the user name
    #[arg(long, env = "MCTSD_IDENTITY_PREFIX", default_value = "CN=")]
    pub identity_prefix: String,

    /// Trainer executable
    #[arg(long, env = "MCTSD_TRAINER_COMMAND", default_value = DEFAULT_TRAINER_COMMAND)]
    pub trainer_command: String,

    /// Extra arguments passed to the trainer before the per-sample ones
    #[arg(
        long = "trainer-arg",
        env = "MCTSD_TRAINER_ARGS",
        value_delimiter = ',',
        allow_hyphen_values = true
    )]
    pub trainer_args: Vec<String>,

    /// Recipient domains; when set, each sample is trained once per domain
    #[arg(long = "domain", env = "MCTSD_DOMAINS", value_delimiter = ',')]
    pub domains: Vec<String>,

    /// Log output format
    #[arg(long, env = "RUST_LOG_FORMAT", value_enum, default_value = "json")]
    pub log_format: LogFormat,
}

impl Settings {
    /// Validates the settings and returns an error if invalid.
    pub fn validate(&self) -> Result<(), LearnerError> {
        validate_non_empty("addr", &self.addr)?;
        validate_port(self.port)?;
        validate_positive("queue_size", self.queue_size as u64)?;
        validate_positive("shutdown_timeout_secs", self.shutdown_timeout_secs)?;
        validate_positive("max_upload_bytes", self.max_upload_bytes as u64)?;
        validate_header_name(&self.identity_header)?;
        validate_non_empty("identity_prefix", &self.identity_prefix)?;
        validate_non_empty("trainer_command", &self.trainer_command)?;
        for domain in &self.domains {
            validate_non_empty("domain", domain)?;
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Identity check applied by the ingestion endpoint.
    pub fn identity_policy(&self) -> Result<IdentityPolicy, LearnerError> {
        if self.debug {
            return Ok(IdentityPolicy::Trusted);
        }
        Ok(IdentityPolicy::Header {
            name: parse_header_name(&self.identity_header)?,
            prefix: self.identity_prefix.clone(),
        })
    }
}

/// Parse and validate settings from the command line and environment.
pub fn get_configuration() -> Result<Settings, LearnerError> {
    let settings = Settings::parse();
    settings.validate()?;
    Ok(settings)
}

fn validate_non_empty(field: &str, value: &str) -> Result<(), LearnerError> {
    if value.trim().is_empty() {
        return Err(LearnerError::Config(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Validates that the port is in valid range (1-65535).
fn validate_port(port: u16) -> Result<(), LearnerError> {
    if port == 0 {
        return Err(LearnerError::Config("Port cannot be 0".into()));
    }
    Ok(())
}

fn validate_positive(field: &str, value: u64) -> Result<(), LearnerError> {
    if value == 0 {
        return Err(LearnerError::Config(format!("{field} must be greater than 0")));
    }
    Ok(())
}

fn validate_header_name(name: &str) -> Result<(), LearnerError> {
    parse_header_name(name).map(|_| ())
}

fn parse_header_name(name: &str) -> Result<HeaderName, LearnerError> {
    HeaderName::try_from(name)
        .map_err(|e| LearnerError::Config(format!("invalid identity header {name:?}: {e}")))
}
