//! Operation registry, admission checks and quota replenishment.

mod operation;
mod registration;
mod registry;
mod replenisher;

pub use operation::OperationId;
pub use registration::Registration;
pub use registry::Bucket;
