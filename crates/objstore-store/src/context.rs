use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};

/// Cancellation signal shared between a caller and an in-flight operation.
///
/// Engines check the flag between steps; a cancelled write rolls back.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-call context: who is calling, for which tenant, and whether the
/// caller has given up.
#[derive(Clone, Debug)]
pub struct StoreContext {
    pub tenant_id: i64,
    /// Actor recorded as `created_by` / `updated_by`.
    pub user: String,
    cancel: CancelFlag,
}

impl StoreContext {
    pub fn new(tenant_id: i64, user: impl Into<String>) -> Self {
        Self {
            tenant_id,
            user: user.into(),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Fail with [`StoreError::Cancelled`] once the caller has cancelled.
    pub fn check_cancelled(&self) -> StoreResult<()> {
        if self.cancel.is_cancelled() {
            Err(StoreError::Cancelled)
        } else {
            Ok(())
        }
    }
}
