//! Configuration for preloading a bucket.
//!
//! A configuration lists the operations to register up front, in YAML:
//!
//! ```yaml
//! operations:
//!   - name: send_mail
//!     rate: 5
//!     window_secs: 60
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{BucketError, Result};

/// Operations to register when a bucket is created.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Operations, registered in the order listed
    #[serde(default)]
    pub operations: Vec<OperationConfig>,
}

/// A single operation and its quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationConfig {
    /// Name the operation is registered under
    pub name: String,
    /// Calls allowed per window
    pub rate: u64,
    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_window_secs() -> u64 {
    1
}

impl BucketConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading bucket configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| BucketError::Config(format!("Failed to parse bucket config: {}", e)))
    }
}
