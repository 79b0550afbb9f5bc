use super::*;
use crate::auction::AuctionId;
use parking_lot::Mutex;
use std::collections::HashMap;

/// In-process hub: one subscriber list per room, pruned on emit.
pub struct InMemoryBroadcastGateway {
    subscribers: Mutex<HashMap<AuctionId, Vec<mpsc::Sender<BroadcastMessage>>>>,
}

impl InMemoryBroadcastGateway {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    pub fn new_shared() -> SharedBroadcastGateway {
        Arc::new(Self::new())
    }
}

impl BroadcastGateway for InMemoryBroadcastGateway {
    fn join(&self, auction: AuctionIdRef) -> mpsc::Receiver<BroadcastMessage> {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .entry(auction.to_owned())
            .or_default()
            .push(tx);
        rx
    }

    fn emit(&self, auction: AuctionIdRef, message: BroadcastMessage) -> Result<()> {
        let mut subscribers = self.subscribers.lock();
        if let Some(room) = subscribers.get_mut(auction) {
            room.retain(|tx| tx.send(message.clone()).is_ok());
        }
        Ok(())
    }
}
