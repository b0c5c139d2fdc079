use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{Credentials, Region};

use crate::config::ClientConfig;

impl ClientConfig {
    pub async fn create_client(&self) -> aws_sdk_s3::Client {
        let credentials = Credentials::new(
            &self.access_keys.access_key,
            &self.access_keys.secret_access_key,
            None,
            None,
            "s3bulk",
        );

        let config_loader = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(self.region.clone()))
            .endpoint_url(&self.endpoint_url)
            .retry_config(RetryConfig::disabled())
            .timeout_config(self.build_timeout_config());

        let sdk_config = config_loader.load().await;

        let config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        aws_sdk_s3::Client::from_conf(config)
    }

    fn build_timeout_config(&self) -> TimeoutConfig {
        let mut builder = TimeoutConfig::builder();

        if let Some(operation_timeout_milliseconds) =
            self.cli_timeout_config.operation_timeout_milliseconds
        {
            builder =
                builder.operation_timeout(Duration::from_millis(operation_timeout_milliseconds));
        }

        if let Some(connect_timeout_milliseconds) =
            self.cli_timeout_config.connect_timeout_milliseconds
        {
            builder = builder.connect_timeout(Duration::from_millis(connect_timeout_milliseconds));
        }

        builder.build()
    }
}
