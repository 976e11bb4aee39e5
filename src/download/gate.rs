//! Fixed-capacity admission gate for transfers.
//!
//! A [`ConcurrencyGate`] wraps a Tokio semaphore. Holding a [`GatePermit`]
//! entitles a worker to run one transfer; dropping the permit returns the
//! slot, so release happens on every exit path including errors, panics and
//! cancellation.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::constants::{MAX_CONCURRENCY, MIN_CONCURRENCY};
use super::engine::EngineError;

/// Bounds how many transfers run at once.
///
/// Cloning is cheap and every clone shares the same slots. Admission order
/// among waiters is whatever the semaphore provides; only the capacity bound
/// is guaranteed.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// A held slot. The slot is returned when this value is dropped.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyGate {
    /// Creates a gate with `capacity` slots.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if `capacity` is outside
    /// the valid range (1-100).
    pub fn new(capacity: usize) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&capacity) {
            return Err(EngineError::InvalidConcurrency { value: capacity });
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    /// Returns the configured number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of slots currently free.
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Waits for a free slot.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SemaphoreClosed`] if the gate was closed.
    pub async fn acquire(&self) -> Result<GatePermit, EngineError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| EngineError::SemaphoreClosed)?;
        debug!(available = self.available(), "gate slot acquired");
        Ok(GatePermit { _permit: permit })
    }

    /// Waits for a free slot unless `cancel` fires first.
    ///
    /// Returns `Ok(None)` when cancelled while waiting; no slot is held in
    /// that case. A cancelled token always wins over a free slot.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SemaphoreClosed`] if the gate was closed.
    pub async fn acquire_or_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<GatePermit>, EngineError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Ok(None),
            permit = self.acquire() => permit.map(Some),
        }
    }

    /// Closes the gate; pending and future acquisitions fail.
    #[cfg(test)]
    pub(crate) fn close(&self) {
        self.semaphore.close();
    }
}
