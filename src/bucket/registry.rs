//! The operation registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, trace};

use super::operation::OperationId;
use super::registration::Registration;
use super::replenisher;
use crate::config::BucketConfig;
use crate::error::{BucketError, Result};

/// Counter slot of a registered operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Slot {
    /// Calls still admitted in the current window
    pub remaining: u64,
    /// Registration this slot belongs to; owned by exactly one replenisher
    pub generation: u64,
}

/// Shared registry state, guarded as a whole by a single lock.
#[derive(Debug, Default)]
pub(super) struct Counters {
    slots: HashMap<OperationId, Slot>,
    next_generation: u64,
}

impl Counters {
    /// Insert a full slot for `id`, returning its generation.
    pub(super) fn insert(&mut self, id: &OperationId, rate: u64) -> Result<u64> {
        if self.slots.contains_key(id) {
            return Err(BucketError::AlreadyRegistered(id.clone()));
        }

        let generation = self.next_generation;
        self.next_generation += 1;
        self.slots.insert(
            id.clone(),
            Slot {
                remaining: rate,
                generation,
            },
        );
        Ok(generation)
    }

    pub(super) fn remove(&mut self, id: &str) -> bool {
        self.slots.remove(id).is_some()
    }

    fn try_acquire(&mut self, id: &str) -> Option<bool> {
        let slot = self.slots.get_mut(id)?;
        if slot.remaining == 0 {
            return Some(false);
        }
        slot.remaining -= 1;
        Some(true)
    }

    /// Reset the slot back to `rate` if it still belongs to `generation`.
    ///
    /// Returns `false` once the registration is gone, which is the
    /// replenisher's signal to stop.
    pub(super) fn refill(&mut self, id: &OperationId, generation: u64, rate: u64) -> bool {
        match self.slots.get_mut(id) {
            Some(slot) if slot.generation == generation => {
                slot.remaining = rate;
                true
            }
            _ => false,
        }
    }
}

/// A registry of independently throttled operations.
///
/// Every registered operation gets a counter of remaining calls and a
/// background task on the bucket's tokio runtime that resets the counter to
/// its full rate at every window boundary. Resets are all-at-once: a caller
/// timing calls around a boundary may see up to twice the rate in quick
/// succession.
///
/// The bucket is thread-safe and can be shared across threads and tasks,
/// typically behind an `Arc`. Dropping it stops all of its background tasks
/// within one window.
pub struct Bucket {
    /// Remaining calls indexed by operation
    counters: Arc<Mutex<Counters>>,
    /// Runtime the replenisher tasks are spawned on
    runtime: Handle,
}

impl Bucket {
    /// Create an empty bucket on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside the context of a tokio runtime. Use
    /// [`Bucket::with_handle`] to create a bucket from elsewhere.
    pub fn new() -> Self {
        Self::with_handle(Handle::current())
    }

    /// Create an empty bucket whose replenishers run on `runtime`.
    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            counters: Arc::new(Mutex::new(Counters::default())),
            runtime,
        }
    }

    /// Create a bucket on the current tokio runtime and register every
    /// operation in `config`.
    ///
    /// # Panics
    ///
    /// Panics if called outside the context of a tokio runtime. Use
    /// [`Bucket::from_config_with_handle`] to create a bucket from elsewhere.
    pub fn from_config(config: &BucketConfig) -> Result<Self> {
        Self::from_config_with_handle(config, Handle::current())
    }

    /// Create a bucket whose replenishers run on `runtime` and register
    /// every operation in `config`.
    pub fn from_config_with_handle(config: &BucketConfig, runtime: Handle) -> Result<Self> {
        let bucket = Self::with_handle(runtime);
        bucket.register_all(config)?;
        Ok(bucket)
    }

    /// Register an operation allowing `rate` calls every `window_secs` seconds.
    ///
    /// On success the counter starts full and a replenisher task is spawned
    /// for the operation. A failed registration leaves the bucket unchanged.
    pub fn register(
        &self,
        id: impl Into<OperationId>,
        rate: u64,
        window_secs: u64,
    ) -> Result<()> {
        let id = id.into();
        if id.is_unspecified() {
            return Err(BucketError::InvalidOperation);
        }
        let registration = Registration::new(rate, window_secs)?;

        let generation = self.counters.lock().insert(&id, registration.rate)?;

        debug!(
            operation = %id,
            rate = registration.rate,
            window_secs = registration.window_secs,
            "Registered operation"
        );

        replenisher::spawn(
            &self.runtime,
            Arc::downgrade(&self.counters),
            id,
            generation,
            registration,
        );
        Ok(())
    }

    /// Register every operation in `config`, in order.
    ///
    /// Stops at the first failure; operations registered before it stay
    /// registered.
    pub fn register_all(&self, config: &BucketConfig) -> Result<()> {
        for op in &config.operations {
            self.register(op.name.as_str(), op.rate, op.window_secs)?;
        }
        Ok(())
    }

    /// Unregister an operation. Unknown operations are ignored.
    ///
    /// The counter is removed immediately; the replenisher notices on its
    /// next tick and exits.
    pub fn unregister(&self, id: impl AsRef<str>) {
        let id = id.as_ref();
        if self.counters.lock().remove(id) {
            debug!(operation = %id, "Unregistered operation");
        }
    }

    /// Check whether the operation may be called right now.
    ///
    /// Consumes one call from the operation's quota and returns `true`, or
    /// returns `false` without side effects if the quota is exhausted for the
    /// current window.
    pub fn try_acquire(&self, id: impl AsRef<str>) -> Result<bool> {
        let id = id.as_ref();
        let admitted = self
            .counters
            .lock()
            .try_acquire(id)
            .ok_or_else(|| BucketError::NotRegistered(OperationId::new(id)))?;

        trace!(operation = %id, admitted, "Checked operation");
        Ok(admitted)
    }

    /// Get the calls still admitted in the current window.
    ///
    /// Returns `None` if the operation is not registered.
    pub fn remaining(&self, id: impl AsRef<str>) -> Option<u64> {
        let counters = self.counters.lock();
        counters.slots.get(id.as_ref()).map(|slot| slot.remaining)
    }

    /// Whether the operation is currently registered.
    pub fn is_registered(&self, id: impl AsRef<str>) -> bool {
        self.counters.lock().slots.contains_key(id.as_ref())
    }

    /// Get the number of registered operations.
    pub fn len(&self) -> usize {
        self.counters.lock().slots.len()
    }

    /// Whether no operation is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Bucket {
    /// Same as [`Bucket::new`].
    ///
    /// # Panics
    ///
    /// Panics if called outside the context of a tokio runtime.
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket")
            .field("operations", &self.len())
            .finish()
    }
}
