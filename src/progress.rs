mod in_memory;

pub use self::in_memory::*;

use crate::{event_log::Offset, service::ServiceIdRef};
use anyhow::Result;
use std::sync::Arc;

/// Keeps track of the last event each log follower has processed.
///
/// Process-local, like the log it indexes into.
pub trait ProgressTracker {
    fn load(&self, id: ServiceIdRef) -> Result<Option<Offset>>;
    fn store(&self, id: ServiceIdRef, offset: Offset) -> Result<()>;
}

pub type SharedProgressTracker = Arc<dyn ProgressTracker + Send + Sync + 'static>;
