//! Durable records
//!
//! Auctions, teams and players as they live in the record store, plus
//! the store contract the rest of the system is written against. Sale
//! fields on these records are mutated only through the settlement
//! committer, never by client-issued CRUD.
mod in_memory;
pub mod postgres;

pub use self::in_memory::*;
pub use self::postgres::PostgresRecordStore;

use crate::auction::{
    Amount, AuctionId, AuctionIdRef, PlayerId, PlayerIdRef, TeamId, TeamIdRef,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Auction {
    pub id: AuctionId,
    pub name: String,
    pub access_code: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: TeamId,
    pub auction_id: AuctionId,
    pub name: String,
    pub budget: Amount,
    pub spent: Amount,
    pub color: String,
    pub players: Vec<PlayerId>,
}

impl Team {
    pub fn new(
        id: TeamId,
        auction_id: AuctionId,
        name: String,
        budget: Amount,
        color: String,
    ) -> Self {
        Self {
            id,
            auction_id,
            name,
            budget,
            spent: 0,
            color,
            players: Vec::new(),
        }
    }
}

/// `is_sold` and `is_unsold` are mutually exclusive; both false means
/// the player is still pending. `order` is the stable display rank,
/// assigned at creation as the then-current player count of the auction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub auction_id: AuctionId,
    pub name: String,
    pub role: String,
    pub category: String,
    pub base_price: Amount,
    pub is_sold: bool,
    pub is_unsold: bool,
    pub sold_to: Option<TeamId>,
    pub sold_price: Amount,
    pub order: u32,
}

impl Player {
    pub fn new(
        id: PlayerId,
        auction_id: AuctionId,
        name: String,
        role: String,
        category: String,
        base_price: Amount,
        order: u32,
    ) -> Self {
        Self {
            id,
            auction_id,
            name,
            role,
            category,
            base_price,
            is_sold: false,
            is_unsold: false,
            sold_to: None,
            sold_price: 0,
            order,
        }
    }
}

/// The durable store collaborator.
///
/// Update methods are the atomic primitives the settlement paths are
/// built on: single-document field updates, counter increments, and
/// array push/pull. There is deliberately no cross-document transaction
/// here (see the committer).
pub trait RecordStore {
    fn create_auction(&self, auction: &Auction) -> Result<()>;
    fn find_auction(&self, id: AuctionIdRef) -> Result<Option<Auction>>;
    /// Deletes the auction and everything under it: teams and players.
    fn delete_auction(&self, id: AuctionIdRef) -> Result<()>;

    fn create_team(&self, team: &Team) -> Result<()>;
    fn find_team(&self, id: TeamIdRef) -> Result<Option<Team>>;
    fn teams_by_auction(&self, auction: AuctionIdRef) -> Result<Vec<Team>>;
    fn delete_team(&self, id: TeamIdRef) -> Result<()>;

    fn create_player(&self, player: &Player) -> Result<()>;
    fn find_player(&self, id: PlayerIdRef) -> Result<Option<Player>>;
    /// Players of one auction in display order.
    fn players_by_auction(&self, auction: AuctionIdRef) -> Result<Vec<Player>>;
    fn count_players(&self, auction: AuctionIdRef) -> Result<u32>;
    fn delete_player(&self, id: PlayerIdRef) -> Result<()>;

    fn mark_player_sold(
        &self,
        player: PlayerIdRef,
        team: TeamIdRef,
        price: Amount,
    ) -> Result<()>;
    fn mark_player_unsold(&self, player: PlayerIdRef) -> Result<()>;

    /// Atomically adds `delta` to the team's running spend, saturating
    /// at zero on the way down.
    fn add_team_spent(&self, team: TeamIdRef, delta: i64) -> Result<()>;
    fn push_team_player(&self, team: TeamIdRef, player: PlayerIdRef) -> Result<()>;
    fn pull_team_player(&self, team: TeamIdRef, player: PlayerIdRef) -> Result<()>;

    /// Returns every player sold to `team` to the pending pool:
    /// `is_sold = false`, `sold_to = None`, `sold_price = 0`.
    fn clear_sales_for_team(&self, team: TeamIdRef) -> Result<()>;
}

pub type SharedRecordStore = Arc<dyn RecordStore + Send + Sync + 'static>;
