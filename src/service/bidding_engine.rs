//! Bidding Engine
//!
//! Applies inbound room events to the live session, broadcasts the
//! authoritative snapshot on every accepted transition, and queues
//! settlement intents for the committer.
use crate::auction::{AuctionIdRef, RoomSession, Settlement, TransitionError};
use crate::broadcast::{BroadcastGateway as _, BroadcastMessage, SharedBroadcastGateway};
use crate::event::{ClientEventDetails, EngineEvent, Event};
use crate::event_log::{self, Writer as _};
use crate::rooms::SharedRoomStateTable;
use crate::service::{LogFollowerService, ServiceId};
use anyhow::Result;
use tracing::debug;

pub const BIDDING_ENGINE_SERVICE_ID: &str = "bidding-engine";

pub struct BiddingEngine {
    rooms: SharedRoomStateTable,
    gateway: SharedBroadcastGateway,
    event_writer: event_log::SharedWriter,
}

impl BiddingEngine {
    pub fn new(
        rooms: SharedRoomStateTable,
        gateway: SharedBroadcastGateway,
        event_writer: event_log::SharedWriter,
    ) -> Self {
        Self {
            rooms,
            gateway,
            event_writer,
        }
    }

    pub fn handle_client_event(
        &self,
        auction: AuctionIdRef,
        event: ClientEventDetails,
    ) -> Result<()> {
        let room = self.rooms.get_or_create(auction);

        // Mutate under the room lock only; broadcasting and queueing the
        // settlement intent happen after it is released.
        let (snapshot, settlement) = {
            let mut session = room.lock();
            match Self::apply(&mut session, event) {
                Ok(settlement) => (session.clone(), settlement),
                Err(rejection) => {
                    debug!(%auction, %rejection, "room event dropped");
                    return Ok(());
                }
            }
        };

        self.gateway.emit(
            auction,
            BroadcastMessage::AuctionState { session: snapshot },
        )?;

        if let Some(settlement) = settlement {
            self.event_writer.write(&[Event::Engine(EngineEvent {
                auction: auction.to_owned(),
                event: settlement.into(),
            })])?;
        }
        Ok(())
    }

    /// Applies one event to the session in place.
    ///
    /// `Ok` means the (possibly unchanged, for a join) state must be
    /// broadcast; `Err` means the event was dropped without a trace.
    fn apply(
        session: &mut RoomSession,
        event: ClientEventDetails,
    ) -> Result<Option<Settlement>, TransitionError> {
        use ClientEventDetails::*;

        let current = session.clone();
        let (next, settlement) = match event {
            // Snapshot-on-join: no transition, just a rebroadcast.
            JoinAuction => (current, None),
            StartPlayer {
                player_id,
                base_price,
            } => (current.start_player(player_id, base_price), None),
            PlaceBid { team_id, amount } => (current.place_bid(team_id, amount)?, None),
            UndoBid => (current.undo_bid()?, None),
            TogglePause => (current.toggle_pause()?, None),
            SellPlayer => {
                let (next, settlement) = current.sell_player()?;
                (next, Some(settlement))
            }
            UnsellPlayer => {
                let (next, settlement) = current.unsell_player()?;
                (next, Some(settlement))
            }
            ResetRound => (current.reset_round(), None),
        };
        *session = next;
        Ok(settlement)
    }
}

impl LogFollowerService for BiddingEngine {
    fn get_log_progress_id(&self) -> ServiceId {
        BIDDING_ENGINE_SERVICE_ID.to_owned()
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Client(event) => self.handle_client_event(&event.auction, event.event),
            _ => Ok(()),
        }
    }
}
