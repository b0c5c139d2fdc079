use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::{Context, anyhow};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::Config;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::worker::TransferWorker;
use crate::storage::{Resolver, Uploader};
use crate::types::{Task, TransferMessage};

/// Reads the manifest line by line and dispatches one worker per line,
/// throttled by the transfer pool.
pub struct ManifestProducer {
    ctx: Arc<PipelineContext>,
    config: Config,
    resolver: Resolver,
    uploader: Uploader,
}

impl ManifestProducer {
    pub fn new(
        ctx: Arc<PipelineContext>,
        config: Config,
        resolver: Resolver,
        uploader: Uploader,
    ) -> Self {
        Self {
            ctx,
            config,
            resolver,
            uploader,
        }
    }

    pub async fn run(self, manifest: File) {
        let mut lines = BufReader::new(manifest).lines();
        self.ctx
            .counters
            .remaining_skip
            .store(self.config.skip_lines, Ordering::SeqCst);

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    let _ = self
                        .ctx
                        .send_message(TransferMessage::info(format!(
                            "manifest \"{}\" read.",
                            self.config.manifest_path.display()
                        )))
                        .await;
                    break;
                }
                Err(e) => {
                    let _ = self
                        .ctx
                        .send_message(TransferMessage::error(
                            String::new(),
                            anyhow!(e).context("failed to read the manifest."),
                        ))
                        .await;
                    break;
                }
            };

            self.ctx.counters.total_lines.fetch_add(1, Ordering::SeqCst);

            let remaining_skip = self.ctx.counters.remaining_skip.load(Ordering::SeqCst);
            if line.is_empty() || remaining_skip > 0 {
                if remaining_skip > 0 {
                    self.ctx
                        .counters
                        .remaining_skip
                        .fetch_sub(1, Ordering::SeqCst);
                }
                self.ctx
                    .counters
                    .processed_lines
                    .fetch_add(1, Ordering::SeqCst);
                continue;
            }

            let task = Task {
                destination_key: derive_destination_key(&line, &self.config.strip_prefix),
                source_line: line,
            };

            // Blocks here on a full pool, so the manifest is only read as
            // fast as transfers complete.
            let permit = match self.ctx.acquire_transfer_slot().await {
                Ok(permit) => permit,
                Err(e) => {
                    let _ = self
                        .ctx
                        .send_message(TransferMessage::error(task.source_line, e))
                        .await;
                    break;
                }
            };
            self.ctx.counters.in_flight.fetch_add(1, Ordering::SeqCst);

            let worker = TransferWorker::new(
                self.ctx.clone(),
                self.resolver.clone(),
                self.uploader.clone(),
                self.config.silent,
            );
            tokio::spawn(worker.transfer(task, permit));
        }

        self.ctx
            .counters
            .producer_finished
            .store(true, Ordering::SeqCst);
    }
}

/// The destination key is the manifest line with every occurrence of the
/// configured prefix removed, nothing more.
pub fn derive_destination_key(source_line: &str, strip_prefix: &str) -> String {
    if strip_prefix.is_empty() {
        return source_line.to_string();
    }

    source_line.replace(strip_prefix, "")
}

pub async fn open_manifest(config: &Config) -> anyhow::Result<File> {
    File::open(&config.manifest_path)
        .await
        .with_context(|| {
            format!(
                "failed to open the manifest \"{}\".",
                config.manifest_path.display()
            )
        })
}
