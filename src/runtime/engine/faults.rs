//! Fault log
//!
//! Threads retired because a primitive failed are recorded here for the host. The log
//! is a cheap handle around a shared buffer, so the host can keep a clone and drain it
//! from wherever it reports errors.

use crate::primitives::PrimitiveError;
use crate::runtime::engine::TargetId;
use crate::runtime::thread::ThreadId;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

/// A thread retired by a primitive fault
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadFault {
    pub thread: ThreadId,
    pub target: TargetId,
    /// Opcode of the block that was executing
    pub opcode: String,
    pub error: PrimitiveError,
}

/// Shared, append-only record of thread faults
#[derive(Debug, Clone, Default)]
pub struct FaultLog {
    inner: Arc<Mutex<Vec<ThreadFault>>>,
}

impl FaultLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fault and echo it to the log
    pub fn record(
        &self,
        fault: ThreadFault,
    ) {
        warn!(
            thread = %fault.thread,
            target = %fault.target,
            opcode = %fault.opcode,
            "thread retired: {}",
            fault.error
        );
        self.inner.lock().push(fault);
    }

    /// Remove and return every recorded fault
    pub fn take(&self) -> Vec<ThreadFault> {
        std::mem::take(&mut *self.inner.lock())
    }

    /// Copy of the recorded faults
    pub fn snapshot(&self) -> Vec<ThreadFault> {
        self.inner.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
