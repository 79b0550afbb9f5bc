//! Settlement Committer
//!
//! Turns settled round outcomes into durable record writes. A sale
//! touches two independent documents with no cross-document
//! transaction: a crash between the writes leaves the store
//! inconsistent until a later write or manual fix reconciles it.
//! Known limitation.
use crate::auction::{Amount, AuctionIdRef, PlayerIdRef, TeamIdRef};
use crate::broadcast::{BroadcastGateway as _, BroadcastMessage, SharedBroadcastGateway};
use crate::event::{EngineEventDetails, Event};
use crate::records::{RecordStore, SharedRecordStore};
use crate::service::{LogFollowerService, ServiceId};
use anyhow::Result;
use tracing::error;

pub const SETTLEMENT_SERVICE_ID: &str = "settlement-committer";

pub struct SettlementCommitter {
    records: SharedRecordStore,
    gateway: SharedBroadcastGateway,
}

impl SettlementCommitter {
    pub fn new(records: SharedRecordStore, gateway: SharedBroadcastGateway) -> Self {
        Self { records, gateway }
    }

    /// Marks the player sold, charges the team and credits it the
    /// player, then tells the room to reload its records.
    pub fn commit_sale(
        &self,
        auction: AuctionIdRef,
        player: PlayerIdRef,
        team: TeamIdRef,
        amount: Amount,
    ) -> Result<()> {
        self.records.mark_player_sold(player, team, amount)?;
        self.records.add_team_spent(team, amount as i64)?;
        self.records.push_team_player(team, player)?;
        self.gateway.emit(auction, BroadcastMessage::DataUpdate)
    }

    pub fn commit_unsell(&self, auction: AuctionIdRef, player: PlayerIdRef) -> Result<()> {
        self.records.mark_player_unsold(player)?;
        self.gateway.emit(auction, BroadcastMessage::DataUpdate)
    }
}

impl LogFollowerService for SettlementCommitter {
    fn get_log_progress_id(&self) -> ServiceId {
        SETTLEMENT_SERVICE_ID.to_owned()
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        let engine_event = match event {
            Event::Engine(event) => event,
            _ => return Ok(()),
        };

        let result = match &engine_event.event {
            EngineEventDetails::CommitSale {
                player_id,
                team_id,
                amount,
            } => self.commit_sale(&engine_event.auction, player_id, team_id, *amount),
            EngineEventDetails::CommitUnsold { player_id } => {
                self.commit_unsell(&engine_event.auction, player_id)
            }
        };

        // A failed write only desynchronizes the durable copy; the room
        // already broadcast its state, and other rooms keep being served.
        // No retry.
        if let Err(e) = result {
            error!(auction = %engine_event.auction, error = ?e, "settlement write failed");
        }
        Ok(())
    }
}

/// Player-deletion path: give the sale back before the record goes away.
pub fn reverse_sale(records: &dyn RecordStore, player: PlayerIdRef) -> Result<()> {
    let record = match records.find_player(player)? {
        Some(record) => record,
        None => return Ok(()),
    };

    if record.is_sold {
        if let Some(team) = record.sold_to {
            records.pull_team_player(&team, player)?;
            records.add_team_spent(&team, -(record.sold_price as i64))?;
        }
    }
    Ok(())
}

/// Team-deletion path: every player the team bought goes back to the
/// pending pool; the player records themselves stay.
pub fn reverse_team(records: &dyn RecordStore, team: TeamIdRef) -> Result<()> {
    records.clear_sales_for_team(team)
}
