use std::path::PathBuf;

use crate::types::AccessKeys;

pub mod args;

#[derive(Debug, Clone)]
pub struct Config {
    pub manifest_path: PathBuf,
    pub error_log_path: PathBuf,
    pub strip_prefix: String,
    pub skip_lines: u64,
    pub concurrency: u16,
    pub silent: bool,
    pub enable_profiling: bool,
    pub create_bucket: bool,
    pub mime_from_extension: bool,
    pub source_is_remote: bool,
    pub destination_bucket: String,
    pub source_bucket: String,
    pub destination_client_config: ClientConfig,
    pub source_client_config: ClientConfig,
    pub tracing_config: Option<TracingConfig>,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub access_keys: AccessKeys,
    pub endpoint_url: String,
    pub region: String,
    pub cli_timeout_config: CLITimeoutConfig,
}

#[derive(Debug, Clone, Copy)]
pub struct CLITimeoutConfig {
    pub operation_timeout_milliseconds: Option<u64>,
    pub connect_timeout_milliseconds: Option<u64>,
}

#[derive(Debug, Clone, Copy)]
pub struct TracingConfig {
    pub tracing_level: log::Level,
    pub json_tracing: bool,
    pub aws_sdk_tracing: bool,
}
