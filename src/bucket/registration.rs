//! Quota and window parameters of a registered operation.

use std::time::Duration;

use crate::error::{BucketError, Result};

/// The quota an operation is registered with.
///
/// `rate` calls are admitted per window of `window_secs` seconds. These
/// values are fixed for the lifetime of a registration; only the
/// replenisher task keeps them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Registration {
    /// Maximum admitted calls per window
    pub rate: u64,
    /// Length of the window in seconds
    pub window_secs: u64,
}

impl Registration {
    /// Create a registration, rejecting a zero rate or a zero window.
    pub fn new(rate: u64, window_secs: u64) -> Result<Self> {
        if rate == 0 {
            return Err(BucketError::InvalidRate);
        }
        if window_secs == 0 {
            return Err(BucketError::InvalidWindow);
        }
        Ok(Self { rate, window_secs })
    }

    /// Get the duration of the window.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}
