use super::*;
use anyhow::ensure;
use r2d2_postgres::{postgres::NoTls, PostgresConnectionManager};

type Pool = r2d2::Pool<PostgresConnectionManager<NoTls>>;
type PooledConnection = r2d2::PooledConnection<PostgresConnectionManager<NoTls>>;

/// Record store backed by a pooled Postgres connection.
///
/// Amounts are stored as `BIGINT`; the team's owned set as `TEXT[]`
/// mutated with `array_append`/`array_remove` so the push/pull
/// primitives stay single-statement.
pub struct PostgresRecordStore {
    pool: Pool,
}

impl PostgresRecordStore {
    pub fn connect(url: &str) -> Result<Self> {
        let manager = PostgresConnectionManager::new(url.parse()?, NoTls);
        let pool = r2d2::Pool::new(manager)?;
        let store = Self { pool };
        store.init_schema()?;
        Ok(store)
    }

    pub fn connect_shared(url: &str) -> Result<SharedRecordStore> {
        Ok(Arc::new(Self::connect(url)?))
    }

    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn()?.batch_execute(
            "CREATE TABLE IF NOT EXISTS auctions (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                access_code TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS teams (
                id TEXT PRIMARY KEY,
                auction_id TEXT NOT NULL,
                name TEXT NOT NULL,
                budget BIGINT NOT NULL,
                spent BIGINT NOT NULL DEFAULT 0,
                color TEXT NOT NULL,
                players TEXT[] NOT NULL DEFAULT '{}'
            );
            CREATE TABLE IF NOT EXISTS players (
                id TEXT PRIMARY KEY,
                auction_id TEXT NOT NULL,
                name TEXT NOT NULL,
                role TEXT NOT NULL,
                category TEXT NOT NULL,
                base_price BIGINT NOT NULL,
                is_sold BOOLEAN NOT NULL DEFAULT FALSE,
                is_unsold BOOLEAN NOT NULL DEFAULT FALSE,
                sold_to TEXT,
                sold_price BIGINT NOT NULL DEFAULT 0,
                ord INTEGER NOT NULL
            );",
        )?;
        Ok(())
    }
}

fn team_from_row(row: &::postgres::Row) -> Team {
    Team {
        id: row.get("id"),
        auction_id: row.get("auction_id"),
        name: row.get("name"),
        budget: row.get::<_, i64>("budget") as Amount,
        spent: row.get::<_, i64>("spent") as Amount,
        color: row.get("color"),
        players: row.get("players"),
    }
}

fn player_from_row(row: &::postgres::Row) -> Player {
    Player {
        id: row.get("id"),
        auction_id: row.get("auction_id"),
        name: row.get("name"),
        role: row.get("role"),
        category: row.get("category"),
        base_price: row.get::<_, i64>("base_price") as Amount,
        is_sold: row.get("is_sold"),
        is_unsold: row.get("is_unsold"),
        sold_to: row.get("sold_to"),
        sold_price: row.get::<_, i64>("sold_price") as Amount,
        order: row.get::<_, i32>("ord") as u32,
    }
}

impl RecordStore for PostgresRecordStore {
    fn create_auction(&self, auction: &Auction) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO auctions (id, name, access_code) VALUES ($1, $2, $3)",
            &[&auction.id, &auction.name, &auction.access_code],
        )?;
        Ok(())
    }

    fn find_auction(&self, id: AuctionIdRef) -> Result<Option<Auction>> {
        let row = self
            .conn()?
            .query_opt("SELECT id, name, access_code FROM auctions WHERE id = $1", &[&id])?;
        Ok(row.map(|row| Auction {
            id: row.get("id"),
            name: row.get("name"),
            access_code: row.get("access_code"),
        }))
    }

    fn delete_auction(&self, id: AuctionIdRef) -> Result<()> {
        let mut conn = self.conn()?;
        let mut transaction = conn.transaction()?;
        transaction.execute("DELETE FROM players WHERE auction_id = $1", &[&id])?;
        transaction.execute("DELETE FROM teams WHERE auction_id = $1", &[&id])?;
        transaction.execute("DELETE FROM auctions WHERE id = $1", &[&id])?;
        transaction.commit()?;
        Ok(())
    }

    fn create_team(&self, team: &Team) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO teams (id, auction_id, name, budget, spent, color, players)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
            &[
                &team.id,
                &team.auction_id,
                &team.name,
                &(team.budget as i64),
                &(team.spent as i64),
                &team.color,
                &team.players,
            ],
        )?;
        Ok(())
    }

    fn find_team(&self, id: TeamIdRef) -> Result<Option<Team>> {
        let row = self.conn()?.query_opt(
            "SELECT id, auction_id, name, budget, spent, color, players
             FROM teams WHERE id = $1",
            &[&id],
        )?;
        Ok(row.as_ref().map(team_from_row))
    }

    fn teams_by_auction(&self, auction: AuctionIdRef) -> Result<Vec<Team>> {
        let rows = self.conn()?.query(
            "SELECT id, auction_id, name, budget, spent, color, players
             FROM teams WHERE auction_id = $1 ORDER BY name",
            &[&auction],
        )?;
        Ok(rows.iter().map(team_from_row).collect())
    }

    fn delete_team(&self, id: TeamIdRef) -> Result<()> {
        self.conn()?
            .execute("DELETE FROM teams WHERE id = $1", &[&id])?;
        Ok(())
    }

    fn create_player(&self, player: &Player) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO players
             (id, auction_id, name, role, category, base_price,
              is_sold, is_unsold, sold_to, sold_price, ord)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            &[
                &player.id,
                &player.auction_id,
                &player.name,
                &player.role,
                &player.category,
                &(player.base_price as i64),
                &player.is_sold,
                &player.is_unsold,
                &player.sold_to,
                &(player.sold_price as i64),
                &(player.order as i32),
            ],
        )?;
        Ok(())
    }

    fn find_player(&self, id: PlayerIdRef) -> Result<Option<Player>> {
        let row = self.conn()?.query_opt(
            "SELECT id, auction_id, name, role, category, base_price,
                    is_sold, is_unsold, sold_to, sold_price, ord
             FROM players WHERE id = $1",
            &[&id],
        )?;
        Ok(row.as_ref().map(player_from_row))
    }

    fn players_by_auction(&self, auction: AuctionIdRef) -> Result<Vec<Player>> {
        let rows = self.conn()?.query(
            "SELECT id, auction_id, name, role, category, base_price,
                    is_sold, is_unsold, sold_to, sold_price, ord
             FROM players WHERE auction_id = $1 ORDER BY ord",
            &[&auction],
        )?;
        Ok(rows.iter().map(player_from_row).collect())
    }

    fn count_players(&self, auction: AuctionIdRef) -> Result<u32> {
        let row = self.conn()?.query_one(
            "SELECT COUNT(*) AS n FROM players WHERE auction_id = $1",
            &[&auction],
        )?;
        Ok(row.get::<_, i64>("n") as u32)
    }

    fn delete_player(&self, id: PlayerIdRef) -> Result<()> {
        self.conn()?
            .execute("DELETE FROM players WHERE id = $1", &[&id])?;
        Ok(())
    }

    fn mark_player_sold(
        &self,
        player: PlayerIdRef,
        team: TeamIdRef,
        price: Amount,
    ) -> Result<()> {
        let updated = self.conn()?.execute(
            "UPDATE players
             SET is_sold = TRUE, is_unsold = FALSE, sold_to = $2, sold_price = $3
             WHERE id = $1",
            &[&player, &team, &(price as i64)],
        )?;
        ensure!(updated == 1, "no such player: {player}");
        Ok(())
    }

    fn mark_player_unsold(&self, player: PlayerIdRef) -> Result<()> {
        let updated = self.conn()?.execute(
            "UPDATE players SET is_sold = FALSE, is_unsold = TRUE WHERE id = $1",
            &[&player],
        )?;
        ensure!(updated == 1, "no such player: {player}");
        Ok(())
    }

    fn add_team_spent(&self, team: TeamIdRef, delta: i64) -> Result<()> {
        let updated = self.conn()?.execute(
            "UPDATE teams SET spent = GREATEST(spent + $2, 0) WHERE id = $1",
            &[&team, &delta],
        )?;
        ensure!(updated == 1, "no such team: {team}");
        Ok(())
    }

    fn push_team_player(&self, team: TeamIdRef, player: PlayerIdRef) -> Result<()> {
        let updated = self.conn()?.execute(
            "UPDATE teams
             SET players = array_append(players, $2)
             WHERE id = $1 AND NOT ($2 = ANY (players))",
            &[&team, &player],
        )?;
        // 0 rows means either an unknown team or the player already owned;
        // distinguish so a genuinely missing team still errors.
        if updated == 0 {
            ensure!(
                self.find_team(team)?.is_some(),
                "no such team: {team}"
            );
        }
        Ok(())
    }

    fn pull_team_player(&self, team: TeamIdRef, player: PlayerIdRef) -> Result<()> {
        let updated = self.conn()?.execute(
            "UPDATE teams SET players = array_remove(players, $2) WHERE id = $1",
            &[&team, &player],
        )?;
        ensure!(updated == 1, "no such team: {team}");
        Ok(())
    }

    fn clear_sales_for_team(&self, team: TeamIdRef) -> Result<()> {
        self.conn()?.execute(
            "UPDATE players
             SET is_sold = FALSE, sold_to = NULL, sold_price = 0
             WHERE sold_to = $1",
            &[&team],
        )?;
        Ok(())
    }
}
