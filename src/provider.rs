//! The compute seam: turning a block region of an array leaf into data.
//!
//! Handlers never compute inline. They go through an [`ArrayProvider`] so the
//! work runs on a bounded pool off the async executor, under a timeout.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::array::{all_blocks, ArrayData, BlockRegion};
use crate::catalog::ArrayNode;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComputeError {
    #[error("block computation failed: {0}")]
    Failed(String),
    #[error("block computation exceeded {0:?}")]
    TimedOut(Duration),
    #[error("compute pool is shut down")]
    Closed,
}

impl From<ComputeError> for AppError {
    fn from(e: ComputeError) -> Self {
        match e {
            ComputeError::TimedOut(_) => AppError::Timeout { message: e.to_string() },
            other => AppError::Compute { message: other.to_string() },
        }
    }
}

#[async_trait]
pub trait ArrayProvider: Send + Sync {
    /// Materialize one block region of `array`.
    async fn materialize(&self, array: &ArrayNode, region: &BlockRegion) -> Result<ArrayData, ComputeError>;
}

/// Evaluate the generator for every element of `region`, in C order.
pub fn compute_block(array: &ArrayNode, region: &BlockRegion) -> Result<ArrayData, ComputeError> {
    let shape = &array.structure.shape;
    let total = array.structure.len();
    let n = region.len();
    let ndim = region.shape.len();
    let mut values = Vec::with_capacity(n);
    let mut local = vec![0usize; ndim];
    for _ in 0..n {
        let mut flat = 0usize;
        for d in 0..ndim {
            flat = flat * shape[d] + region.offsets[d] + local[d];
        }
        values.push(array.generator.value_at(flat, total));
        for d in (0..ndim).rev() {
            local[d] += 1;
            if local[d] < region.shape[d] {
                break;
            }
            local[d] = 0;
        }
    }
    ArrayData::from_f64(array.structure.dtype, &region.shape, values).map_err(|e| ComputeError::Failed(e.to_string()))
}

/// Runs [`compute_block`] on tokio's blocking pool, at most `permits` at a
/// time. A computation that outlives `timeout` is abandoned: the caller gets
/// `TimedOut` and the result, when it arrives, is dropped.
#[derive(Clone)]
pub struct WorkerPoolProvider {
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl WorkerPoolProvider {
    pub fn new(max_concurrent: usize, timeout: Duration) -> Self {
        Self { permits: Arc::new(Semaphore::new(max_concurrent.max(1))), timeout }
    }

    pub fn timeout(&self) -> Duration { self.timeout }
}

#[async_trait]
impl ArrayProvider for WorkerPoolProvider {
    async fn materialize(&self, array: &ArrayNode, region: &BlockRegion) -> Result<ArrayData, ComputeError> {
        let array = array.clone();
        let region = region.clone();
        let permits = Arc::clone(&self.permits);
        let work = async move {
            let permit = permits.acquire_owned().await.map_err(|_| ComputeError::Closed)?;
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                compute_block(&array, &region)
            });
            handle.await.map_err(|e| ComputeError::Failed(e.to_string()))?
        };
        match tokio::time::timeout(self.timeout, work).await {
            Ok(res) => res,
            Err(_) => {
                warn!(target: "array", timeout = ?self.timeout, "block computation abandoned");
                Err(ComputeError::TimedOut(self.timeout))
            }
        }
    }
}

/// Materialize every block of `array` concurrently and stitch them into one
/// full-size region.
pub async fn materialize_all(provider: &dyn ArrayProvider, array: &ArrayNode) -> Result<ArrayData, ComputeError> {
    let regions = all_blocks(&array.structure);
    debug!(target: "array", blocks = regions.len(), "materializing full array");
    let blocks = try_join_all(regions.iter().map(|r| provider.materialize(array, r))).await?;
    let mut full = ArrayData::zeros(array.structure.dtype, &array.structure.shape);
    for (region, block) in regions.iter().zip(&blocks) {
        full.assign_block(&region.offsets, block).map_err(ComputeError::Failed)?;
    }
    Ok(full)
}
