use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::{Context, Result};
use byte_unit::{Byte, UnitType};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::pipeline::context::PipelineContext;
use crate::types::TransferMessage;

const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);
const DIAGNOSTIC_INTERVAL: Duration = Duration::from_secs(30);

/// Consumes worker and producer messages, reports progress once a second,
/// and decides when the run is over.
pub struct TransferMonitor {
    ctx: Arc<PipelineContext>,
    enable_profiling: bool,
    progress_interval: Duration,
    diagnostic_interval: Duration,
}

impl TransferMonitor {
    pub fn new(ctx: Arc<PipelineContext>, enable_profiling: bool) -> Self {
        Self {
            ctx,
            enable_profiling,
            progress_interval: PROGRESS_INTERVAL,
            diagnostic_interval: DIAGNOSTIC_INTERVAL,
        }
    }

    /// Runs until the producer has finished and every dispatched transfer has
    /// been reported. Failing to record an error is fatal since a rerun
    /// manifest could no longer be built from the error log.
    pub async fn run(self, mut error_log: File) -> Result<()> {
        let receiver = self.ctx.message_receiver();
        let mut progress_tick = tokio::time::interval(self.progress_interval);
        let mut diagnostic_tick = tokio::time::interval(self.diagnostic_interval);

        loop {
            tokio::select! {
                message = receiver.recv() => {
                    if let Ok(message) = message {
                        self.handle_message(message, &mut error_log).await?;
                    }
                }
                _ = progress_tick.tick() => {
                    if self.ctx.is_quiescent() {
                        // Every report was sent before its transfer counted
                        // as processed, so the queue holds all of them now.
                        while let Ok(message) = receiver.try_recv() {
                            self.handle_message(message, &mut error_log).await?;
                        }
                        break;
                    }

                    self.log_progress();
                }
                _ = diagnostic_tick.tick() => {
                    if self.enable_profiling {
                        self.log_diagnostics();
                    }
                }
            }
        }

        error_log
            .flush()
            .await
            .context("failed to flush the error log.")?;

        self.log_progress();

        Ok(())
    }

    async fn handle_message(&self, message: TransferMessage, error_log: &mut File) -> Result<()> {
        match message.error {
            Some(error) => {
                tracing::warn!(
                    source_line = message.source_line,
                    "transfer failed: {:#}.",
                    error
                );

                let line = format!(
                    "{} ### {} ### {:#}\n",
                    chrono::Utc::now().to_rfc3339(),
                    message.source_line,
                    error
                );
                error_log
                    .write_all(line.as_bytes())
                    .await
                    .context("failed to write to the error log.")?;
            }
            None => {
                tracing::info!("{}", message.info_text);
            }
        }

        Ok(())
    }

    fn log_progress(&self) {
        let transferred = Byte::from_u64(
            self.ctx
                .counters
                .bytes_transferred
                .load(Ordering::SeqCst),
        )
        .get_appropriate_unit(UnitType::Binary);

        tracing::info!(
            "{} / {} lines processed, {} in flight, {} errors, {:.2} transferred.",
            self.ctx.counters.processed_lines.load(Ordering::SeqCst),
            self.ctx.counters.total_lines.load(Ordering::SeqCst),
            self.ctx.counters.in_flight.load(Ordering::SeqCst),
            self.ctx.counters.errors.load(Ordering::SeqCst),
            transferred,
        );
    }

    fn log_diagnostics(&self) {
        let metrics = tokio::runtime::Handle::current().metrics();

        tracing::info!(
            alive_tasks = metrics.num_alive_tasks(),
            workers = metrics.num_workers(),
            "runtime diagnostics."
        );
    }
}
