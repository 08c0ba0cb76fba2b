//! Operation identity handling.

use std::borrow::Borrow;
use std::sync::Arc;

/// A key that uniquely identifies a throttled operation.
///
/// Identities are caller-supplied names. Two identities are the same
/// operation exactly when their names are equal. Cloning is cheap, so the
/// registry and its background tasks can each hold a copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(Arc<str>);

impl OperationId {
    /// Create a new operation identity from a name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The name this identity was created from.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this identity names no operation at all.
    ///
    /// Blank names are never accepted by [`Bucket::register`](super::Bucket::register).
    pub fn is_unspecified(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for OperationId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for OperationId {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&OperationId> for OperationId {
    fn from(id: &OperationId) -> Self {
        id.clone()
    }
}

impl Borrow<str> for OperationId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for OperationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
