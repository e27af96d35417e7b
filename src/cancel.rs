//! Cooperative cancellation for long-running mutating operations (spec §5).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, VectorLiteError};

#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self { cancelled: Arc::new(AtomicBool::new(false)) }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(Cancelled)` if the token has been cancelled, `Ok(())`
    /// otherwise. Called before acquiring the collection lock, immediately
    /// after, and at batch-loop iteration boundaries.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(VectorLiteError::Cancelled)
        } else {
            Ok(())
        }
    }
}
