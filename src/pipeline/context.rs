use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use anyhow::{Context, Result};
use async_channel::{Receiver, Sender};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::types::TransferMessage;

/// Counters shared by the producer, the workers and the monitor.
///
/// A manifest line counts as processed when it has been skipped by the
/// resume offset or when its worker has finished, successfully or not.
#[derive(Debug, Default)]
pub struct TransferCounters {
    pub total_lines: AtomicU64,
    pub processed_lines: AtomicU64,
    pub in_flight: AtomicU64,
    pub bytes_transferred: AtomicU64,
    pub remaining_skip: AtomicU64,
    pub errors: AtomicU64,
    pub producer_finished: AtomicBool,
}

pub struct PipelineContext {
    pub counters: TransferCounters,
    transfer_pool: Arc<Semaphore>,
    sender: Sender<TransferMessage>,
    receiver: Receiver<TransferMessage>,
}

impl PipelineContext {
    pub fn new(concurrency: u16) -> Self {
        let (sender, receiver) = async_channel::bounded(usize::from(concurrency) * 2);

        Self {
            counters: TransferCounters::default(),
            transfer_pool: Arc::new(Semaphore::new(usize::from(concurrency))),
            sender,
            receiver,
        }
    }

    pub async fn send_message(&self, message: TransferMessage) -> Result<()> {
        self.sender
            .send(message)
            .await
            .context("async_channel::Sender::send() failed.")
    }

    pub fn message_receiver(&self) -> Receiver<TransferMessage> {
        self.receiver.clone()
    }

    /// Blocks until a transfer slot is free. The permit is held for the whole
    /// transfer, so at most `concurrency` transfers are in flight.
    pub async fn acquire_transfer_slot(&self) -> Result<OwnedSemaphorePermit> {
        self.transfer_pool
            .clone()
            .acquire_owned()
            .await
            .context("tokio::sync::Semaphore::acquire_owned() failed.")
    }

    pub fn is_quiescent(&self) -> bool {
        self.counters.producer_finished.load(Ordering::SeqCst)
            && self.counters.in_flight.load(Ordering::SeqCst) == 0
            && self.counters.processed_lines.load(Ordering::SeqCst)
                == self.counters.total_lines.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn quiescent_only_after_producer_finishes() {
        init_dummy_tracing_subscriber();

        let ctx = PipelineContext::new(2);
        assert!(!ctx.is_quiescent());

        ctx.counters.total_lines.store(3, Ordering::SeqCst);
        ctx.counters.processed_lines.store(3, Ordering::SeqCst);
        assert!(!ctx.is_quiescent());

        ctx.counters.producer_finished.store(true, Ordering::SeqCst);
        assert!(ctx.is_quiescent());
    }

    #[tokio::test]
    async fn in_flight_transfers_block_quiescence() {
        init_dummy_tracing_subscriber();

        let ctx = PipelineContext::new(2);
        ctx.counters.total_lines.store(1, Ordering::SeqCst);
        ctx.counters.processed_lines.store(1, Ordering::SeqCst);
        ctx.counters.producer_finished.store(true, Ordering::SeqCst);
        ctx.counters.in_flight.store(1, Ordering::SeqCst);

        assert!(!ctx.is_quiescent());
    }

    #[tokio::test]
    async fn transfer_pool_caps_out_at_concurrency() {
        init_dummy_tracing_subscriber();

        let ctx = PipelineContext::new(2);
        let _first = ctx.acquire_transfer_slot().await.unwrap();
        let second = ctx.acquire_transfer_slot().await.unwrap();

        let third = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            ctx.acquire_transfer_slot(),
        )
        .await;
        assert!(third.is_err());

        drop(second);
        let third = ctx.acquire_transfer_slot().await;
        assert!(third.is_ok());
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
