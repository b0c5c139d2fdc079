/*!
# Overview
s3bulk is a bulk object transfer tool for S3-compatible storage.

It reads a manifest file that lists one transfer source per line and streams
each object into a destination bucket through a bounded pool of concurrent
workers. Sources are either local files or objects in a source bucket
(S3 to S3 copy mode), in which case the source object's access control list
is translated to the destination's canned ACL representation.

## Features
- Bounded concurrency with backpressure: an arbitrarily large manifest never
  creates more than `--concurrency` in-flight transfers.
- Resume from a line offset (`--offset`) after an interrupted run.
- Content-type resolution by byte sniffing or file-extension lookup.
- ACL translation for S3 to S3 copies, with an explicit failure for grants
  that have no destination equivalent.
- Durable error log: every failed transfer is appended to `--error-log`
  together with its manifest line, so a follow-up run can be built from it.

## As a library
The s3bulk CLI is a thin wrapper of this library. Construct a [`Config`] from
CLI-style arguments and run the pipeline:

```no_run
use s3bulk::Config;
use s3bulk::config::args::parse_from_args;
use s3bulk::pipeline::Pipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = vec![
        "s3bulk",
        "-i",
        "./manifest.txt",
        "--destination-bucket",
        "my-bucket",
        "--destination-access-key",
        "key",
        "--destination-secret-key",
        "secret",
        "--destination-endpoint",
        "s3.example.local",
    ];

    let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();

    let mut pipeline = Pipeline::new(config).await?;
    pipeline.run().await
}
```
*/

pub use config::Config;
pub use config::args::CLIArgs;

pub mod config;
pub mod pipeline;
pub mod storage;
pub mod types;
