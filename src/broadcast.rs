//! Broadcast Gateway
//!
//! Room-scoped publish/subscribe seam between the engine and whatever
//! transport fans messages out to viewers.
mod in_memory;

pub use self::in_memory::*;

use crate::auction::{AuctionIdRef, RoomSession};
use anyhow::Result;
use serde::Serialize;
use std::sync::{mpsc, Arc};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BroadcastMessage {
    /// Full authoritative snapshot, sent on every accepted transition
    /// and once on join.
    AuctionState { session: RoomSession },
    /// The room's durable records changed; viewers should reload them.
    DataUpdate,
}

pub trait BroadcastGateway {
    /// Subscribe to a room. The receiver sees every message emitted to
    /// that room from this point on.
    fn join(&self, auction: AuctionIdRef) -> mpsc::Receiver<BroadcastMessage>;

    fn emit(&self, auction: AuctionIdRef, message: BroadcastMessage) -> Result<()>;
}

pub type SharedBroadcastGateway = Arc<dyn BroadcastGateway + Send + Sync + 'static>;
