use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use anyhow::Result;
use tokio::sync::OwnedSemaphorePermit;

use crate::pipeline::context::PipelineContext;
use crate::storage::{Resolver, Uploader};
use crate::types::{Task, TransferMessage};

/// Performs one transfer. The semaphore permit is held until the transfer
/// has been reported, keeping the in-flight count within the pool size.
pub struct TransferWorker {
    ctx: Arc<PipelineContext>,
    resolver: Resolver,
    uploader: Uploader,
    silent: bool,
}

impl TransferWorker {
    pub fn new(
        ctx: Arc<PipelineContext>,
        resolver: Resolver,
        uploader: Uploader,
        silent: bool,
    ) -> Self {
        Self {
            ctx,
            resolver,
            uploader,
            silent,
        }
    }

    pub async fn transfer(self, task: Task, permit: OwnedSemaphorePermit) {
        let started_at = Instant::now();

        match self.execute(&task).await {
            Ok(size) => {
                self.ctx
                    .counters
                    .bytes_transferred
                    .fetch_add(size, Ordering::SeqCst);

                if !self.silent {
                    let message = TransferMessage::info(format!(
                        "{} transferred to \"{}\" in {:?}.",
                        task.source_line,
                        task.destination_key,
                        started_at.elapsed()
                    ));
                    let _ = self.ctx.send_message(message).await;
                }
            }
            Err(e) => {
                self.ctx.counters.errors.fetch_add(1, Ordering::SeqCst);

                let _ = self
                    .ctx
                    .send_message(TransferMessage::error(task.source_line, e))
                    .await;
            }
        }

        self.ctx
            .counters
            .processed_lines
            .fetch_add(1, Ordering::SeqCst);
        self.ctx.counters.in_flight.fetch_sub(1, Ordering::SeqCst);

        drop(permit);
    }

    async fn execute(&self, task: &Task) -> Result<u64> {
        let meta = self.resolver.resolve(&task.source_line).await?;
        let size = meta.size as u64;

        self.uploader.upload(&task.destination_key, meta).await?;

        Ok(size)
    }
}
