//! Room State Table
//!
//! In-memory map from auction id to its live bidding session. Sessions
//! are installed lazily on first reference and evicted when the owning
//! auction is deleted; nothing here survives a restart.
use crate::auction::{AuctionId, AuctionIdRef, RoomSession};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};

pub type SharedRoomSession = Arc<Mutex<RoomSession>>;

/// Each entry carries its own lock; the table lock is only held long
/// enough to look the entry up, never across a transition.
pub struct RoomStateTable {
    rooms: Mutex<HashMap<AuctionId, SharedRoomSession>>,
}

impl RoomStateTable {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }

    pub fn new_shared() -> SharedRoomStateTable {
        Arc::new(Self::new())
    }

    /// Returns the session for `auction`, installing a fresh idle one
    /// if this is the first reference.
    pub fn get_or_create(&self, auction: AuctionIdRef) -> SharedRoomSession {
        self.rooms
            .lock()
            .entry(auction.to_owned())
            .or_default()
            .clone()
    }

    /// Evicts the session; the next `get_or_create` starts fresh.
    pub fn remove(&self, auction: AuctionIdRef) {
        self.rooms.lock().remove(auction);
    }
}

pub type SharedRoomStateTable = Arc<RoomStateTable>;
