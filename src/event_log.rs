//! In-process event log
//!
//! Ordered, offset-addressed log connecting the event intake to the
//! bidding engine and the settlement committer. Deliberately not
//! durable: in-progress bidding does not survive a restart, only
//! committed sales do (and those live in the record store).
mod in_memory;

pub use self::in_memory::*;

use crate::event::Event;
use anyhow::Result;
use std::{sync::Arc, time::Duration};

pub type Offset = u64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEvent {
    pub offset: Offset,
    pub details: Event,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithOffset<T> {
    pub offset: Offset,
    pub data: T,
}

pub trait Reader {
    /// Offset of the oldest event the log retains.
    fn get_start_offset(&self) -> Result<Offset>;

    /// Read up to `limit` events starting at `start`, waiting up to
    /// `timeout` for new ones when the log is drained. The returned
    /// offset is where the next read should resume.
    fn read(
        &self,
        start: Offset,
        limit: usize,
        timeout: Option<Duration>,
    ) -> Result<WithOffset<Vec<LogEvent>>>;
}

pub trait Writer {
    /// Append events, returning the offset just past them.
    fn write(&self, events: &[Event]) -> Result<Offset>;
}

pub type SharedReader = Arc<dyn Reader + Send + Sync + 'static>;
pub type SharedWriter = Arc<dyn Writer + Send + Sync + 'static>;
