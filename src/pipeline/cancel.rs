use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::foundation::error::{ReelError, ReelResult};

/// Shared stop flag checked between frames and between pages.
///
/// Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that all work stops at the next check.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> ReelResult<()> {
        if self.is_cancelled() {
            Err(ReelError::Cancelled)
        } else {
            Ok(())
        }
    }
}
