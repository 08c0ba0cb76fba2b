//! Lazybucket - Per-Operation Call Throttling
//!
//! This crate keeps a registry of independently throttled operations. Each
//! operation is registered with a call quota and a fixed time window; a
//! background task refills the quota at every window boundary until the
//! operation is unregistered. The bucket never runs the operations itself,
//! it only decides whether a call may proceed right now.

pub mod bucket;
pub mod config;
pub mod error;

pub use bucket::{Bucket, OperationId, Registration};
pub use config::{BucketConfig, OperationConfig};
pub use error::{BucketError, Result};
