//! Live bidding round state
//!
//! The pure state machine behind an auction room: a `RoomSession` plus
//! by-value transitions for every inbound room event. Rejections come
//! back as typed errors; callers decide whether to broadcast.
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type AuctionId = String;
pub type AuctionIdRef<'a> = &'a str;
pub type TeamId = String;
pub type TeamIdRef<'a> = &'a str;
pub type PlayerId = String;
pub type PlayerIdRef<'a> = &'a str;
pub type Amount = u64;

/// Why a transition did not apply.
///
/// Covers both outright validation failures (a bid that does not raise
/// the price) and no-ops (undo with nothing to undo). Either way the
/// session is left untouched and nothing is broadcast.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("bid does not raise the current price")]
    BidTooLow,
    #[error("no bid to undo")]
    EmptyHistory,
    #[error("round is not pausable")]
    NotPausable,
    #[error("no player on the block")]
    NoCurrentPlayer,
    #[error("no leading bid")]
    NoLeader,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoomStatus {
    Idle,
    Active,
    Paused,
    Sold,
    Unsold,
}

/// One undo-stack entry: the bid and leader as they were before an
/// accepted `place_bid` replaced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidSnapshot {
    pub bid: Amount,
    pub leader: Option<TeamId>,
}

/// The live bidding state of one auction room.
///
/// `leading_team_id` is `None` exactly until the first accepted bid of
/// the round. Serialized field names match the wire protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSession {
    pub current_bid: Amount,
    pub leading_team_id: Option<TeamId>,
    pub current_player_id: Option<PlayerId>,
    pub status: RoomStatus,
    pub bid_history: Vec<BidSnapshot>,
}

impl Default for RoomSession {
    fn default() -> Self {
        Self {
            current_bid: 0,
            leading_team_id: None,
            current_player_id: None,
            status: RoomStatus::Idle,
            bid_history: Vec::new(),
        }
    }
}

/// The durable outcome a transition wants committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Sale {
        player: PlayerId,
        team: TeamId,
        amount: Amount,
    },
    Unsold {
        player: PlayerId,
    },
}

impl RoomSession {
    /// Opens a new round for `player` at its base price.
    ///
    /// Unconditional: a hard reset of the bid fields, whatever the
    /// previous status was.
    pub fn start_player(self, player: PlayerId, base_price: Amount) -> Self {
        Self {
            current_bid: base_price,
            leading_team_id: None,
            current_player_id: Some(player),
            status: RoomStatus::Active,
            bid_history: Vec::new(),
        }
    }

    /// Accepts `amount` from `team` if it raises the price.
    ///
    /// The opening bid may equal the base price; once a leader exists
    /// every bid must strictly raise it. The previous bid/leader pair is
    /// pushed onto the undo stack.
    pub fn place_bid(mut self, team: TeamId, amount: Amount) -> Result<Self, TransitionError> {
        self.ensure_valid_bid(amount)?;

        self.bid_history.push(BidSnapshot {
            bid: self.current_bid,
            leader: self.leading_team_id.take(),
        });
        self.current_bid = amount;
        self.leading_team_id = Some(team);
        Ok(self)
    }

    fn ensure_valid_bid(&self, amount: Amount) -> Result<(), TransitionError> {
        let accepted = match self.leading_team_id {
            None => amount >= self.current_bid,
            Some(_) => amount > self.current_bid,
        };
        if !accepted {
            return Err(TransitionError::BidTooLow);
        }
        Ok(())
    }

    /// Reverses the most recent accepted bid.
    pub fn undo_bid(mut self) -> Result<Self, TransitionError> {
        let snapshot = self
            .bid_history
            .pop()
            .ok_or(TransitionError::EmptyHistory)?;
        self.current_bid = snapshot.bid;
        self.leading_team_id = snapshot.leader;
        Ok(self)
    }

    /// Flips between `ACTIVE` and `PAUSED` only; any other status is
    /// rejected.
    pub fn toggle_pause(mut self) -> Result<Self, TransitionError> {
        self.status = match self.status {
            RoomStatus::Active => RoomStatus::Paused,
            RoomStatus::Paused => RoomStatus::Active,
            _ => return Err(TransitionError::NotPausable),
        };
        Ok(self)
    }

    /// Closes the round as a sale to the current leader.
    ///
    /// The undo stack is cleared; the caller receives the settlement to
    /// commit durably after broadcasting.
    pub fn sell_player(mut self) -> Result<(Self, Settlement), TransitionError> {
        let player = self
            .current_player_id
            .clone()
            .ok_or(TransitionError::NoCurrentPlayer)?;
        let team = self
            .leading_team_id
            .clone()
            .ok_or(TransitionError::NoLeader)?;

        self.status = RoomStatus::Sold;
        self.bid_history.clear();
        let amount = self.current_bid;
        Ok((
            self,
            Settlement::Sale {
                player,
                team,
                amount,
            },
        ))
    }

    /// Closes the round with the player passed over.
    ///
    /// Player and leader fields stay as they are; only the next
    /// `start_player` or `reset_round` overwrites them.
    pub fn unsell_player(mut self) -> Result<(Self, Settlement), TransitionError> {
        let player = self
            .current_player_id
            .clone()
            .ok_or(TransitionError::NoCurrentPlayer)?;

        self.status = RoomStatus::Unsold;
        Ok((self, Settlement::Unsold { player }))
    }

    /// Restores the session to exactly its freshly-created values.
    pub fn reset_round(self) -> Self {
        Self::default()
    }
}
