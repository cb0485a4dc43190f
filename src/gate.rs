//! Admission gate bounding concurrent archive pipelines

use crate::error::{Error, Result};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

/// Fixed-capacity counting gate
///
/// Cloning shares the same slots.
#[derive(Clone, Debug)]
pub struct AdmissionGate {
    slots: Arc<Semaphore>,
    capacity: usize,
}

/// A held processing slot, returned to the gate when dropped
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionPermit {
    /// Give the slot back to the gate
    pub fn release(self) {}
}

impl AdmissionGate {
    /// Create a gate with `capacity` slots
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Take a slot without waiting
    ///
    /// Fails with [`Error::Busy`] when every slot is held.
    pub fn try_acquire(&self) -> Result<AdmissionPermit> {
        match self.slots.clone().try_acquire_owned() {
            Ok(permit) => Ok(AdmissionPermit { _permit: permit }),
            Err(TryAcquireError::NoPermits) => Err(Error::Busy),
            Err(TryAcquireError::Closed) => Err(Error::ShuttingDown),
        }
    }

    /// Wait until a slot is free and take it
    pub async fn acquire(&self) -> Result<AdmissionPermit> {
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::ShuttingDown)?;
        Ok(AdmissionPermit { _permit: permit })
    }

    /// Number of free slots right now
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
