use std::sync::Arc;

use anyhow::{Context, Result};

use crate::Config;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::monitor::TransferMonitor;
use crate::pipeline::producer::ManifestProducer;
use crate::storage::local::LocalFileResolver;
use crate::storage::s3::{RemoteObjectResolver, S3Uploader, ensure_bucket};
use crate::storage::{Resolver, Uploader};

pub mod context;
pub mod monitor;
pub mod producer;
pub mod worker;

/// Wires the producer, the workers and the monitor together for one run.
pub struct Pipeline {
    config: Config,
    ctx: Arc<PipelineContext>,
    resolver: Resolver,
    uploader: Uploader,
    has_run: bool,
}

impl Pipeline {
    /// Builds the S3 clients and verifies the buckets. The source bucket is
    /// only checked in S3 to S3 copy mode.
    pub async fn new(config: Config) -> Result<Self> {
        let destination_client =
            Arc::new(config.destination_client_config.create_client().await);

        ensure_bucket(
            &destination_client,
            &config.destination_bucket,
            config.create_bucket,
        )
        .await?;

        let resolver: Resolver = if config.source_is_remote {
            let source_client = Arc::new(config.source_client_config.create_client().await);
            ensure_bucket(&source_client, &config.source_bucket, false).await?;

            Arc::new(RemoteObjectResolver::new(
                source_client,
                config.source_bucket.clone(),
            ))
        } else {
            Arc::new(LocalFileResolver::new(config.mime_from_extension))
        };

        let uploader: Uploader = Arc::new(S3Uploader::new(
            destination_client,
            config.destination_bucket.clone(),
        ));

        Ok(Self::with_parts(config, resolver, uploader))
    }

    fn with_parts(config: Config, resolver: Resolver, uploader: Uploader) -> Self {
        let ctx = Arc::new(PipelineContext::new(config.concurrency));

        Self {
            config,
            ctx,
            resolver,
            uploader,
            has_run: false,
        }
    }

    /// Transfers everything the manifest lists. An unreadable manifest or
    /// error log fails before any transfer starts. Individual transfer
    /// failures are recorded in the error log and do not fail the run.
    pub async fn run(&mut self) -> Result<()> {
        if self.has_run {
            panic!("a pipeline cannot run twice.");
        }
        self.has_run = true;

        // Appended, never truncated. A rerun with --offset must keep the
        // previous run's error records.
        let error_log = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.config.error_log_path)
            .await
            .with_context(|| {
                format!(
                    "failed to open the error log \"{}\".",
                    self.config.error_log_path.display()
                )
            })?;

        let manifest = producer::open_manifest(&self.config).await?;

        let producer = ManifestProducer::new(
            self.ctx.clone(),
            self.config.clone(),
            self.resolver.clone(),
            self.uploader.clone(),
        );
        tokio::spawn(producer.run(manifest));

        let monitor = TransferMonitor::new(self.ctx.clone(), self.config.enable_profiling);
        monitor.run(error_log).await
    }

    pub fn ctx(&self) -> &PipelineContext {
        &self.ctx
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::Path;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use aws_sdk_s3::primitives::ByteStream;

    use super::*;
    use crate::config::args::parse_from_args;
    use crate::storage::{MetaResolver, ObjectUploader};
    use crate::types::{AccessPolicy, SourceMeta};

    struct StaticMetaResolver {
        delay: Duration,
    }

    #[async_trait]
    impl MetaResolver for StaticMetaResolver {
        async fn resolve(&self, _source_line: &str) -> anyhow::Result<SourceMeta> {
            tokio::time::sleep(self.delay).await;

            Ok(SourceMeta {
                body: ByteStream::from_static(b"payload"),
                size: 7,
                content_type: "application/octet-stream".to_string(),
                access_policy: AccessPolicy::Private,
            })
        }
    }

    #[derive(Default)]
    struct CountingUploader {
        current: AtomicU64,
        max_observed: AtomicU64,
        uploads: AtomicU64,
    }

    #[async_trait]
    impl ObjectUploader for CountingUploader {
        async fn upload(&self, _key: &str, _meta: SourceMeta) -> anyhow::Result<()> {
            let current = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_observed.fetch_max(current, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_millis(10)).await;

            self.current.fetch_sub(1, Ordering::SeqCst);
            self.uploads.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn write_manifest(dir: &Path, lines: &[&str]) -> std::path::PathBuf {
        let path = dir.join("manifest.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        path
    }

    fn test_config(dir: &Path, manifest: &Path, concurrency: &str, offset: &str) -> Config {
        let error_log = dir.join("error.log");
        let args = vec![
            "s3bulk",
            "-i",
            manifest.to_str().unwrap(),
            "--destination-bucket",
            "dest-bucket",
            "--destination-access-key",
            "key",
            "--destination-secret-key",
            "secret",
            "--destination-endpoint",
            "s3.example.local",
            "--error-log",
            error_log.to_str().unwrap(),
            "-c",
            concurrency,
            "--offset",
            offset,
            "-q",
        ];

        Config::try_from(parse_from_args(args).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn transfers_every_manifest_line() {
        init_dummy_tracing_subscriber();

        let dir = tempfile::tempdir().unwrap();
        let manifest = write_manifest(dir.path(), &["/data/a.jpg", "/data/b.jpg", "/data/c.jpg"]);
        let config = test_config(dir.path(), &manifest, "2", "0");
        let error_log = config.error_log_path.clone();

        let uploader = Arc::new(CountingUploader::default());
        let mut pipeline = Pipeline::with_parts(
            config,
            Arc::new(StaticMetaResolver {
                delay: Duration::from_millis(1),
            }),
            uploader.clone(),
        );

        tokio::time::timeout(Duration::from_secs(10), pipeline.run())
            .await
            .unwrap()
            .unwrap();

        let counters = &pipeline.ctx().counters;
        assert_eq!(counters.total_lines.load(Ordering::SeqCst), 3);
        assert_eq!(counters.processed_lines.load(Ordering::SeqCst), 3);
        assert_eq!(counters.in_flight.load(Ordering::SeqCst), 0);
        assert_eq!(counters.bytes_transferred.load(Ordering::SeqCst), 21);
        assert_eq!(uploader.uploads.load(Ordering::SeqCst), 3);
        assert!(std::fs::read_to_string(&error_log).unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_the_pool_size() {
        init_dummy_tracing_subscriber();

        for concurrency in ["1", "2", "4"] {
            let dir = tempfile::tempdir().unwrap();
            let lines: Vec<String> = (0..20).map(|i| format!("/data/{i}.jpg")).collect();
            let line_refs: Vec<&str> = lines.iter().map(String::as_str).collect();
            let manifest = write_manifest(dir.path(), &line_refs);
            let config = test_config(dir.path(), &manifest, concurrency, "0");

            let uploader = Arc::new(CountingUploader::default());
            let mut pipeline = Pipeline::with_parts(
                config,
                Arc::new(StaticMetaResolver {
                    delay: Duration::from_millis(1),
                }),
                uploader.clone(),
            );

            tokio::time::timeout(Duration::from_secs(10), pipeline.run())
                .await
                .unwrap()
                .unwrap();

            assert_eq!(uploader.uploads.load(Ordering::SeqCst), 20);
            assert!(
                uploader.max_observed.load(Ordering::SeqCst)
                    <= concurrency.parse::<u64>().unwrap()
            );
        }
    }

    #[tokio::test]
    async fn offset_skips_already_transferred_lines() {
        init_dummy_tracing_subscriber();

        let dir = tempfile::tempdir().unwrap();
        let manifest = write_manifest(dir.path(), &["/data/a.jpg", "/data/b.jpg", "/data/c.jpg"]);
        let config = test_config(dir.path(), &manifest, "2", "2");

        let uploader = Arc::new(CountingUploader::default());
        let mut pipeline = Pipeline::with_parts(
            config,
            Arc::new(StaticMetaResolver {
                delay: Duration::from_millis(1),
            }),
            uploader.clone(),
        );

        tokio::time::timeout(Duration::from_secs(10), pipeline.run())
            .await
            .unwrap()
            .unwrap();

        let counters = &pipeline.ctx().counters;
        assert_eq!(counters.total_lines.load(Ordering::SeqCst), 3);
        assert_eq!(counters.processed_lines.load(Ordering::SeqCst), 3);
        assert_eq!(counters.remaining_skip.load(Ordering::SeqCst), 0);
        assert_eq!(uploader.uploads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_transfers_are_logged_and_do_not_fail_the_run() {
        init_dummy_tracing_subscriber();

        let dir = tempfile::tempdir().unwrap();
        let manifest = write_manifest(dir.path(), &["/no/such/file.bin"]);
        let config = test_config(dir.path(), &manifest, "2", "0");
        let error_log = config.error_log_path.clone();

        let uploader = Arc::new(CountingUploader::default());
        let mut pipeline = Pipeline::with_parts(
            config,
            Arc::new(LocalFileResolver::new(false)),
            uploader.clone(),
        );

        tokio::time::timeout(Duration::from_secs(10), pipeline.run())
            .await
            .unwrap()
            .unwrap();

        let counters = &pipeline.ctx().counters;
        assert_eq!(counters.processed_lines.load(Ordering::SeqCst), 1);
        assert_eq!(counters.errors.load(Ordering::SeqCst), 1);
        assert_eq!(uploader.uploads.load(Ordering::SeqCst), 0);

        let contents = std::fs::read_to_string(&error_log).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("/no/such/file.bin"));
        assert!(contents.contains("open"));
    }

    #[tokio::test]
    async fn empty_manifest_lines_are_counted_but_not_dispatched() {
        init_dummy_tracing_subscriber();

        let dir = tempfile::tempdir().unwrap();
        let manifest = write_manifest(dir.path(), &["/data/a.jpg", "", "/data/b.jpg"]);
        let config = test_config(dir.path(), &manifest, "2", "0");
        let error_log = config.error_log_path.clone();

        let uploader = Arc::new(CountingUploader::default());
        let mut pipeline = Pipeline::with_parts(
            config,
            Arc::new(StaticMetaResolver {
                delay: Duration::from_millis(1),
            }),
            uploader.clone(),
        );

        tokio::time::timeout(Duration::from_secs(10), pipeline.run())
            .await
            .unwrap()
            .unwrap();

        let counters = &pipeline.ctx().counters;
        assert_eq!(counters.total_lines.load(Ordering::SeqCst), 3);
        assert_eq!(counters.processed_lines.load(Ordering::SeqCst), 3);
        assert_eq!(uploader.uploads.load(Ordering::SeqCst), 2);
        assert!(std::fs::read_to_string(&error_log).unwrap().is_empty());
    }

    #[tokio::test]
    async fn error_log_survives_a_rerun() {
        init_dummy_tracing_subscriber();

        let dir = tempfile::tempdir().unwrap();
        let manifest = write_manifest(dir.path(), &["/no/such/file.bin"]);
        let config = test_config(dir.path(), &manifest, "2", "0");
        let error_log = config.error_log_path.clone();

        for _ in 0..2 {
            let mut pipeline = Pipeline::with_parts(
                config.clone(),
                Arc::new(LocalFileResolver::new(false)),
                Arc::new(CountingUploader::default()),
            );

            tokio::time::timeout(Duration::from_secs(10), pipeline.run())
                .await
                .unwrap()
                .unwrap();
        }

        let contents = std::fs::read_to_string(&error_log).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[tokio::test]
    async fn missing_manifest_is_fatal() {
        init_dummy_tracing_subscriber();

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), &dir.path().join("missing.txt"), "2", "0");

        let mut pipeline = Pipeline::with_parts(
            config,
            Arc::new(StaticMetaResolver {
                delay: Duration::from_millis(1),
            }),
            Arc::new(CountingUploader::default()),
        );

        assert!(pipeline.run().await.is_err());
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
