use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

use crate::Config;
use crate::config::{CLITimeoutConfig, ClientConfig, TracingConfig};
use crate::types::AccessKeys;

const DEFAULT_CONCURRENCY: u16 = 20;
const DEFAULT_OFFSET: u64 = 0;
const DEFAULT_ERROR_LOG: &str = "error.log";
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_USE_HTTP: bool = false;
const DEFAULT_CREATE_BUCKET: bool = false;
const DEFAULT_SILENT: bool = false;
const DEFAULT_ENABLE_PROFILING: bool = false;
const DEFAULT_MIME_FROM_EXTENSION: bool = false;
const DEFAULT_JSON_TRACING: bool = false;
const DEFAULT_AWS_SDK_TRACING: bool = false;

const INPUT_FILE_REQUIRED: &str = "--input-file is required\n";
const DESTINATION_BUCKET_REQUIRED: &str = "--destination-bucket is required\n";
const DESTINATION_ACCESS_KEY_REQUIRED: &str = "--destination-access-key is required\n";
const DESTINATION_SECRET_KEY_REQUIRED: &str = "--destination-secret-key is required\n";
const DESTINATION_ENDPOINT_REQUIRED: &str = "--destination-endpoint is required\n";
const CONCURRENCY_INVALID: &str = "--concurrency must be 1 or greater\n";

#[derive(Parser, Clone, Debug)]
#[command(version, about = "Bulk object transfer tool for S3-compatible storage.")]
pub struct CLIArgs {
    /// manifest file, one transfer source per line
    #[arg(short = 'i', long, env, value_name = "FILE", help_heading = "General")]
    input_file: Option<PathBuf>,

    /// removes this string from the manifest line when forming the destination key
    #[arg(short = 'p', long, env, default_value = "", help_heading = "General")]
    strip_prefix: String,

    /// count of manifest lines to skip before starting the transfer
    #[arg(long, env, default_value_t = DEFAULT_OFFSET, help_heading = "General")]
    offset: u64,

    /// maximum number of concurrent transfers
    #[arg(short = 'c', long, env, default_value_t = DEFAULT_CONCURRENCY, help_heading = "General")]
    concurrency: u16,

    /// suppress per-transfer success logging
    #[arg(long, env, default_value_t = DEFAULT_SILENT, help_heading = "General")]
    silent: bool,

    /// log periodic runtime diagnostics
    #[arg(long, env, default_value_t = DEFAULT_ENABLE_PROFILING, help_heading = "General")]
    enable_profiling: bool,

    /// append failed transfers to this file
    #[arg(long, env, value_name = "FILE", default_value = DEFAULT_ERROR_LOG, help_heading = "General")]
    error_log: PathBuf,

    /// destination bucket name
    #[arg(long, env, help_heading = "Destination")]
    destination_bucket: Option<String>,

    /// destination access key
    #[arg(long, env, help_heading = "Destination")]
    destination_access_key: Option<String>,

    /// destination secret key
    #[arg(long, env, help_heading = "Destination")]
    destination_secret_key: Option<String>,

    /// destination endpoint host, e.g. s3.example.local
    #[arg(long, env, help_heading = "Destination")]
    destination_endpoint: Option<String>,

    /// create the destination bucket if it does not exist
    #[arg(long, env, default_value_t = DEFAULT_CREATE_BUCKET, help_heading = "Destination")]
    create_bucket: bool,

    /// source bucket name. destination bucket is used if empty
    #[arg(long, env, help_heading = "Source")]
    source_bucket: Option<String>,

    /// source access key. destination access key is used if empty
    #[arg(long, env, help_heading = "Source")]
    source_access_key: Option<String>,

    /// source secret key. destination secret key is used if empty
    #[arg(long, env, help_heading = "Source")]
    source_secret_key: Option<String>,

    /// source endpoint host. if set, S3 to S3 copy mode is used instead of local files
    #[arg(long, env, help_heading = "Source")]
    source_endpoint: Option<String>,

    /// detect content type of local files by file extension instead of byte sniffing
    #[arg(long, env, default_value_t = DEFAULT_MIME_FROM_EXTENSION, help_heading = "Source")]
    mime_from_extension: bool,

    /// use http instead of https for endpoint URLs
    #[arg(long, env, default_value_t = DEFAULT_USE_HTTP, help_heading = "Connection")]
    use_http: bool,

    /// region passed to the S3 client
    #[arg(long, env, default_value = DEFAULT_REGION, help_heading = "Connection")]
    region: String,

    #[arg(long, env, value_name = "MILLISECONDS", help_heading = "Connection")]
    connect_timeout_milliseconds: Option<u64>,

    #[arg(long, env, value_name = "MILLISECONDS", help_heading = "Connection")]
    operation_timeout_milliseconds: Option<u64>,

    /// enable JSON log output
    #[arg(long, env, default_value_t = DEFAULT_JSON_TRACING, help_heading = "Tracing")]
    json_tracing: bool,

    /// enable AWS SDK tracing at the same level
    #[arg(long, env, default_value_t = DEFAULT_AWS_SDK_TRACING, help_heading = "Tracing")]
    aws_sdk_tracing: bool,

    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,
}

pub fn parse_from_args<I, T>(args: I) -> Result<CLIArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    CLIArgs::try_parse_from(args)
}

impl TryFrom<CLIArgs> for Config {
    type Error = String;

    fn try_from(args: CLIArgs) -> Result<Self, Self::Error> {
        let manifest_path = args.input_file.ok_or(INPUT_FILE_REQUIRED)?;
        let destination_bucket = args.destination_bucket.ok_or(DESTINATION_BUCKET_REQUIRED)?;
        let destination_access_key = args
            .destination_access_key
            .ok_or(DESTINATION_ACCESS_KEY_REQUIRED)?;
        let destination_secret_key = args
            .destination_secret_key
            .ok_or(DESTINATION_SECRET_KEY_REQUIRED)?;
        let destination_endpoint = args
            .destination_endpoint
            .ok_or(DESTINATION_ENDPOINT_REQUIRED)?;

        if args.concurrency == 0 {
            return Err(CONCURRENCY_INVALID.to_string());
        }

        let cli_timeout_config = CLITimeoutConfig {
            operation_timeout_milliseconds: args.operation_timeout_milliseconds,
            connect_timeout_milliseconds: args.connect_timeout_milliseconds,
        };

        let destination_client_config = ClientConfig {
            access_keys: AccessKeys {
                access_key: destination_access_key.clone(),
                secret_access_key: destination_secret_key.clone(),
            },
            endpoint_url: build_endpoint_url(&destination_endpoint, args.use_http),
            region: args.region.clone(),
            cli_timeout_config,
        };

        let source_is_remote = args.source_endpoint.is_some();
        let source_endpoint = args
            .source_endpoint
            .unwrap_or_else(|| destination_endpoint.clone());

        let source_client_config = ClientConfig {
            access_keys: AccessKeys {
                access_key: args.source_access_key.unwrap_or(destination_access_key),
                secret_access_key: args.source_secret_key.unwrap_or(destination_secret_key),
            },
            endpoint_url: build_endpoint_url(&source_endpoint, args.use_http),
            region: args.region,
            cli_timeout_config,
        };

        let tracing_config = args.verbosity.log_level().map(|level| TracingConfig {
            tracing_level: level,
            json_tracing: args.json_tracing,
            aws_sdk_tracing: args.aws_sdk_tracing,
        });

        Ok(Config {
            manifest_path,
            error_log_path: args.error_log,
            strip_prefix: args.strip_prefix,
            skip_lines: args.offset,
            concurrency: args.concurrency,
            silent: args.silent,
            enable_profiling: args.enable_profiling,
            create_bucket: args.create_bucket,
            mime_from_extension: args.mime_from_extension,
            source_is_remote,
            source_bucket: args
                .source_bucket
                .unwrap_or_else(|| destination_bucket.clone()),
            destination_bucket,
            destination_client_config,
            source_client_config,
            tracing_config,
        })
    }
}

fn build_endpoint_url(endpoint: &str, use_http: bool) -> String {
    let scheme = if use_http { "http" } else { "https" };
    format!("{scheme}://{endpoint}")
}
