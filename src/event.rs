use crate::auction::{Amount, AuctionId, PlayerId, Settlement, TeamId};
use serde::{Deserialize, Serialize};

// TODO: this type couples the services together: everything follows the
// one log, so everything sees everyone's events. Fine at this size;
// split per-service logs if it ever grows real consumers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Client(ClientEvent),
    Engine(EngineEvent),
    #[cfg(test)]
    Test,
}

/// An inbound room event, tagged with the room it belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientEvent {
    pub auction: AuctionId,
    pub event: ClientEventDetails,
}

/// What a viewer or the auctioneer asked the room to do.
///
/// This is the wire shape of the event intake: malformed payloads
/// (missing team, non-numeric amount) never make it past deserialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEventDetails {
    JoinAuction,
    #[serde(rename_all = "camelCase")]
    StartPlayer { player_id: PlayerId, base_price: Amount },
    #[serde(rename_all = "camelCase")]
    PlaceBid { team_id: TeamId, amount: Amount },
    UndoBid,
    TogglePause,
    SellPlayer,
    UnsellPlayer,
    ResetRound,
}

/// A settlement intent emitted by the bidding engine for the committer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineEvent {
    pub auction: AuctionId,
    pub event: EngineEventDetails,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEventDetails {
    CommitSale {
        player_id: PlayerId,
        team_id: TeamId,
        amount: Amount,
    },
    CommitUnsold {
        player_id: PlayerId,
    },
}

impl From<Settlement> for EngineEventDetails {
    fn from(settlement: Settlement) -> Self {
        match settlement {
            Settlement::Sale {
                player,
                team,
                amount,
            } => Self::CommitSale {
                player_id: player,
                team_id: team,
                amount,
            },
            Settlement::Unsold { player } => Self::CommitUnsold { player_id: player },
        }
    }
}
