use super::*;
use anyhow::format_err;
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Default)]
struct Tables {
    auctions: BTreeMap<AuctionId, Auction>,
    teams: BTreeMap<TeamId, Team>,
    players: BTreeMap<PlayerId, Player>,
}

/// Fake in-memory record store.
///
/// Useful for unit-tests and for running without a database.
pub struct InMemoryRecordStore(Mutex<Tables>);

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self(Mutex::new(Tables::default()))
    }

    pub fn new_shared() -> SharedRecordStore {
        Arc::new(Self::new())
    }
}

impl RecordStore for InMemoryRecordStore {
    fn create_auction(&self, auction: &Auction) -> Result<()> {
        self.0
            .lock()
            .auctions
            .insert(auction.id.clone(), auction.clone());
        Ok(())
    }

    fn find_auction(&self, id: AuctionIdRef) -> Result<Option<Auction>> {
        Ok(self.0.lock().auctions.get(id).cloned())
    }

    fn delete_auction(&self, id: AuctionIdRef) -> Result<()> {
        let mut tables = self.0.lock();
        tables.auctions.remove(id);
        tables.teams.retain(|_, team| team.auction_id != id);
        tables.players.retain(|_, player| player.auction_id != id);
        Ok(())
    }

    fn create_team(&self, team: &Team) -> Result<()> {
        self.0.lock().teams.insert(team.id.clone(), team.clone());
        Ok(())
    }

    fn find_team(&self, id: TeamIdRef) -> Result<Option<Team>> {
        Ok(self.0.lock().teams.get(id).cloned())
    }

    fn teams_by_auction(&self, auction: AuctionIdRef) -> Result<Vec<Team>> {
        Ok(self
            .0
            .lock()
            .teams
            .values()
            .filter(|team| team.auction_id == auction)
            .cloned()
            .collect())
    }

    fn delete_team(&self, id: TeamIdRef) -> Result<()> {
        self.0.lock().teams.remove(id);
        Ok(())
    }

    fn create_player(&self, player: &Player) -> Result<()> {
        self.0
            .lock()
            .players
            .insert(player.id.clone(), player.clone());
        Ok(())
    }

    fn find_player(&self, id: PlayerIdRef) -> Result<Option<Player>> {
        Ok(self.0.lock().players.get(id).cloned())
    }

    fn players_by_auction(&self, auction: AuctionIdRef) -> Result<Vec<Player>> {
        let mut players: Vec<_> = self
            .0
            .lock()
            .players
            .values()
            .filter(|player| player.auction_id == auction)
            .cloned()
            .collect();
        players.sort_by_key(|player| player.order);
        Ok(players)
    }

    fn count_players(&self, auction: AuctionIdRef) -> Result<u32> {
        Ok(self
            .0
            .lock()
            .players
            .values()
            .filter(|player| player.auction_id == auction)
            .count() as u32)
    }

    fn delete_player(&self, id: PlayerIdRef) -> Result<()> {
        self.0.lock().players.remove(id);
        Ok(())
    }

    fn mark_player_sold(
        &self,
        player: PlayerIdRef,
        team: TeamIdRef,
        price: Amount,
    ) -> Result<()> {
        let mut tables = self.0.lock();
        let record = tables
            .players
            .get_mut(player)
            .ok_or_else(|| format_err!("no such player: {player}"))?;
        record.is_sold = true;
        record.is_unsold = false;
        record.sold_to = Some(team.to_owned());
        record.sold_price = price;
        Ok(())
    }

    fn mark_player_unsold(&self, player: PlayerIdRef) -> Result<()> {
        let mut tables = self.0.lock();
        let record = tables
            .players
            .get_mut(player)
            .ok_or_else(|| format_err!("no such player: {player}"))?;
        record.is_sold = false;
        record.is_unsold = true;
        Ok(())
    }

    fn add_team_spent(&self, team: TeamIdRef, delta: i64) -> Result<()> {
        let mut tables = self.0.lock();
        let record = tables
            .teams
            .get_mut(team)
            .ok_or_else(|| format_err!("no such team: {team}"))?;
        record.spent = record.spent.saturating_add_signed(delta);
        Ok(())
    }

    fn push_team_player(&self, team: TeamIdRef, player: PlayerIdRef) -> Result<()> {
        let mut tables = self.0.lock();
        let record = tables
            .teams
            .get_mut(team)
            .ok_or_else(|| format_err!("no such team: {team}"))?;
        if !record.players.iter().any(|p| p == player) {
            record.players.push(player.to_owned());
        }
        Ok(())
    }

    fn pull_team_player(&self, team: TeamIdRef, player: PlayerIdRef) -> Result<()> {
        let mut tables = self.0.lock();
        let record = tables
            .teams
            .get_mut(team)
            .ok_or_else(|| format_err!("no such team: {team}"))?;
        record.players.retain(|p| p != player);
        Ok(())
    }

    fn clear_sales_for_team(&self, team: TeamIdRef) -> Result<()> {
        let mut tables = self.0.lock();
        for player in tables.players.values_mut() {
            if player.sold_to.as_deref() == Some(team) {
                player.is_sold = false;
                player.sold_to = None;
                player.sold_price = 0;
            }
        }
        Ok(())
    }
}
