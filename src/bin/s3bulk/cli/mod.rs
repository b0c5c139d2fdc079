use tokio::time::Instant;
use tracing::{error, info};

use s3bulk::Config;
use s3bulk::pipeline::Pipeline;
use s3bulk::types::error::S3bulkError;

pub const EXIT_CODE_SUCCESS: i32 = 0;
pub const EXIT_CODE_INVALID_CONFIG: i32 = 1;
pub const EXIT_CODE_FATAL: i32 = 2;

pub async fn run(config: Config) -> i32 {
    let start_time = Instant::now();

    let mut pipeline = match Pipeline::new(config).await {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("s3bulk failed to start: {:#}.", e);
            return exit_code_for(&e);
        }
    };

    if let Err(e) = pipeline.run().await {
        error!("s3bulk failed: {:#}.", e);
        return EXIT_CODE_FATAL;
    }

    let duration_sec = format!("{:.3}", start_time.elapsed().as_secs_f32());
    info!(duration_sec = duration_sec, "s3bulk has been completed.");

    EXIT_CODE_SUCCESS
}

/// A missing bucket is a configuration problem, not a transfer failure.
fn exit_code_for(e: &anyhow::Error) -> i32 {
    let bucket_not_found = e
        .chain()
        .any(|cause| matches!(cause.downcast_ref(), Some(S3bulkError::BucketNotFound(_))));

    if bucket_not_found {
        EXIT_CODE_INVALID_CONFIG
    } else {
        EXIT_CODE_FATAL
    }
}
