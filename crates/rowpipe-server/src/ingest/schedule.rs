//! Cooperative scheduling between batches

use async_trait::async_trait;

/// Where the pipeline hands control back to the runtime after each batch
#[async_trait]
pub trait YieldPoint: Send + Sync {
    async fn yield_now(&self);
}

/// Yields to the tokio scheduler
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioYield;

#[async_trait]
impl YieldPoint for TokioYield {
    async fn yield_now(&self) {
        tokio::task::yield_now().await;
    }
}
