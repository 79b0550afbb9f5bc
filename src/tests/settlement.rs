use crate::{
    broadcast::{BroadcastGateway, BroadcastMessage, InMemoryBroadcastGateway},
    event::{EngineEvent, EngineEventDetails, Event},
    records::{InMemoryRecordStore, Player, RecordStore, SharedRecordStore, Team},
    service::{
        settlement::{self, SettlementCommitter},
        LogFollowerService,
    },
};
use anyhow::Result;

fn team(id: &str) -> Team {
    Team::new(
        id.to_owned(),
        "a1".to_owned(),
        id.to_uppercase(),
        100_000,
        "#123456".to_owned(),
    )
}

fn player(id: &str, order: u32) -> Player {
    Player::new(
        id.to_owned(),
        "a1".to_owned(),
        format!("Player {id}"),
        "bowler".to_owned(),
        "capped".to_owned(),
        100,
        order,
    )
}

fn seeded_records() -> Result<SharedRecordStore> {
    let records = InMemoryRecordStore::new_shared();
    records.create_team(&team("t1"))?;
    records.create_team(&team("t2"))?;
    records.create_player(&player("p1", 0))?;
    records.create_player(&player("p2", 1))?;
    records.create_player(&player("p3", 2))?;
    Ok(records)
}

#[test]
fn commit_sale_updates_both_documents() -> Result<()> {
    let records = seeded_records()?;
    let gateway = InMemoryBroadcastGateway::new_shared();
    let committer = SettlementCommitter::new(records.clone(), gateway.clone());

    let viewer = gateway.join("a1");
    committer.commit_sale("a1", "p1", "t1", 700)?;

    let player = records.find_player("p1")?.expect("player exists");
    assert!(player.is_sold);
    assert!(!player.is_unsold);
    assert_eq!(player.sold_to, Some("t1".to_owned()));
    assert_eq!(player.sold_price, 700);

    let team = records.find_team("t1")?.expect("team exists");
    assert_eq!(team.spent, 700);
    assert_eq!(team.players, vec!["p1".to_owned()]);

    assert_eq!(
        viewer.try_iter().collect::<Vec<_>>(),
        vec![BroadcastMessage::DataUpdate]
    );
    Ok(())
}

#[test]
fn commit_unsell_touches_only_the_player() -> Result<()> {
    let records = seeded_records()?;
    let gateway = InMemoryBroadcastGateway::new_shared();
    let committer = SettlementCommitter::new(records.clone(), gateway.clone());

    committer.commit_unsell("a1", "p1")?;

    let player = records.find_player("p1")?.expect("player exists");
    assert!(player.is_unsold);
    assert!(!player.is_sold);

    let team = records.find_team("t1")?.expect("team exists");
    assert_eq!(team.spent, 0);
    assert!(team.players.is_empty());
    Ok(())
}

#[test]
fn failed_settlement_is_swallowed_and_signals_nothing() -> Result<()> {
    let records = seeded_records()?;
    let gateway = InMemoryBroadcastGateway::new_shared();
    let mut committer = SettlementCommitter::new(records, gateway.clone());

    let viewer = gateway.join("a1");

    // unknown player: the write fails, the follower must keep going
    committer.handle_event(Event::Engine(EngineEvent {
        auction: "a1".to_owned(),
        event: EngineEventDetails::CommitSale {
            player_id: "ghost".to_owned(),
            team_id: "t1".to_owned(),
            amount: 100,
        },
    }))?;

    assert_eq!(viewer.try_iter().count(), 0);
    Ok(())
}

#[test]
fn deleting_a_sold_player_refunds_the_team() -> Result<()> {
    let records = seeded_records()?;
    let gateway = InMemoryBroadcastGateway::new_shared();
    let committer = SettlementCommitter::new(records.clone(), gateway);

    committer.commit_sale("a1", "p1", "t1", 700)?;

    settlement::reverse_sale(&*records, "p1")?;
    records.delete_player("p1")?;

    assert!(records.find_player("p1")?.is_none());
    let team = records.find_team("t1")?.expect("team exists");
    assert_eq!(team.spent, 0);
    assert!(team.players.is_empty());
    Ok(())
}

#[test]
fn reverse_sale_on_a_pending_player_changes_nothing() -> Result<()> {
    let records = seeded_records()?;

    settlement::reverse_sale(&*records, "p1")?;

    let team = records.find_team("t1")?.expect("team exists");
    assert_eq!(team.spent, 0);
    assert!(team.players.is_empty());
    Ok(())
}

#[test]
fn deleting_a_team_returns_its_players_to_the_pool() -> Result<()> {
    let records = seeded_records()?;
    let gateway = InMemoryBroadcastGateway::new_shared();
    let committer = SettlementCommitter::new(records.clone(), gateway);

    committer.commit_sale("a1", "p1", "t1", 700)?;
    committer.commit_sale("a1", "p2", "t1", 300)?;
    committer.commit_sale("a1", "p3", "t2", 400)?;

    settlement::reverse_team(&*records, "t1")?;
    records.delete_team("t1")?;

    assert!(records.find_team("t1")?.is_none());

    // t1's players are back in the pool, not deleted
    for id in ["p1", "p2"] {
        let player = records.find_player(id)?.expect("player exists");
        assert!(!player.is_sold);
        assert_eq!(player.sold_to, None);
        assert_eq!(player.sold_price, 0);
    }

    // the other team's purchase is untouched
    let other = records.find_player("p3")?.expect("player exists");
    assert!(other.is_sold);
    assert_eq!(other.sold_to, Some("t2".to_owned()));
    assert_eq!(other.sold_price, 400);
    Ok(())
}
