use crate::{
    auction::{BidSnapshot, RoomSession, RoomStatus, Settlement, TransitionError},
    broadcast::{BroadcastGateway, BroadcastMessage, InMemoryBroadcastGateway},
    event::{ClientEvent, ClientEventDetails, Event},
    event_log::{self, Reader},
    records::{InMemoryRecordStore, Player, RecordStore, Team},
    rooms::RoomStateTable,
    service::{
        bidding_engine::BiddingEngine, settlement::SettlementCommitter, LogFollowerService,
    },
};
use anyhow::Result;
use std::time::Duration;

fn client(auction: &str, event: ClientEventDetails) -> Event {
    Event::Client(ClientEvent {
        auction: auction.to_owned(),
        event,
    })
}

#[test]
fn start_player_opens_a_clean_round() -> Result<()> {
    // start over a dirty session: everything bid-related must reset
    let dirty = RoomSession::default()
        .start_player("p0".into(), 200)
        .place_bid("team-a".into(), 200)?;

    let session = dirty.start_player("p1".into(), 500);
    assert_eq!(session.status, RoomStatus::Active);
    assert_eq!(session.current_bid, 500);
    assert_eq!(session.leading_team_id, None);
    assert_eq!(session.current_player_id, Some("p1".to_owned()));
    assert!(session.bid_history.is_empty());
    Ok(())
}

#[test]
fn opening_bid_may_equal_the_base_price() -> Result<()> {
    let session = RoomSession::default().start_player("p1".into(), 1000);
    let session = session.place_bid("team-a".into(), 1000)?;
    assert_eq!(session.leading_team_id, Some("team-a".to_owned()));

    // once led, matching the price is not enough
    assert_eq!(
        session.place_bid("team-b".into(), 1000),
        Err(TransitionError::BidTooLow)
    );
    Ok(())
}

#[test]
fn accepted_bids_never_lower_the_price() -> Result<()> {
    let mut session = RoomSession::default().start_player("p1".into(), 100);
    for (team, amount) in [("team-a", 100), ("team-b", 150), ("team-c", 275)] {
        let previous = session.current_bid;
        session = session.place_bid(team.into(), amount)?;
        assert!(session.current_bid >= previous);
    }
    assert_eq!(
        session.place_bid("team-d".into(), 50),
        Err(TransitionError::BidTooLow)
    );
    Ok(())
}

#[test]
fn history_snapshots_stack_in_order() -> Result<()> {
    let session = RoomSession::default()
        .start_player("p1".into(), 100)
        .place_bid("team-a".into(), 100)?
        .place_bid("team-b".into(), 150)?;

    assert_eq!(
        session.bid_history,
        vec![
            BidSnapshot {
                bid: 100,
                leader: None
            },
            BidSnapshot {
                bid: 100,
                leader: Some("team-a".to_owned())
            },
        ]
    );
    Ok(())
}

#[test]
fn undo_exactly_reverses_the_last_accepted_bid() -> Result<()> {
    let session = RoomSession::default()
        .start_player("p1".into(), 100)
        .place_bid("team-a".into(), 100)?;

    let before = session.clone();
    let after = session.place_bid("team-b".into(), 200)?.undo_bid()?;
    assert_eq!(after, before);
    Ok(())
}

#[test]
fn undo_with_no_history_changes_nothing() {
    let session = RoomSession::default().start_player("p1".into(), 100);
    assert_eq!(
        session.clone().undo_bid(),
        Err(TransitionError::EmptyHistory)
    );
    // and again, for idempotence
    assert_eq!(session.undo_bid(), Err(TransitionError::EmptyHistory));
}

#[test]
fn reset_round_matches_a_fresh_session() -> Result<()> {
    let session = RoomSession::default()
        .start_player("p1".into(), 100)
        .place_bid("team-a".into(), 120)?
        .reset_round();
    assert_eq!(session, RoomSession::default());
    Ok(())
}

#[test]
fn sell_without_a_leader_is_rejected() {
    let session = RoomSession::default().start_player("p1".into(), 100);
    assert_eq!(session.sell_player(), Err(TransitionError::NoLeader));
}

#[test]
fn pause_toggles_only_a_live_round() -> Result<()> {
    let session = RoomSession::default().start_player("p1".into(), 100);
    let paused = session.toggle_pause()?;
    assert_eq!(paused.status, RoomStatus::Paused);
    let resumed = paused.toggle_pause()?;
    assert_eq!(resumed.status, RoomStatus::Active);

    assert_eq!(
        RoomSession::default().toggle_pause(),
        Err(TransitionError::NotPausable)
    );

    let (sold, _) = resumed.place_bid("team-a".into(), 100)?.sell_player()?;
    assert_eq!(sold.toggle_pause(), Err(TransitionError::NotPausable));
    Ok(())
}

#[test]
fn unsold_round_keeps_player_and_leader() -> Result<()> {
    let session = RoomSession::default()
        .start_player("p1".into(), 100)
        .place_bid("team-a".into(), 100)?;

    let (session, settlement) = session.unsell_player()?;
    assert_eq!(session.status, RoomStatus::Unsold);
    assert_eq!(session.current_player_id, Some("p1".to_owned()));
    assert_eq!(session.leading_team_id, Some("team-a".to_owned()));
    assert_eq!(
        settlement,
        Settlement::Unsold {
            player: "p1".into()
        }
    );
    Ok(())
}

#[test]
fn join_rebroadcasts_the_current_snapshot() -> Result<()> {
    let rooms = RoomStateTable::new_shared();
    let gateway = InMemoryBroadcastGateway::new_shared();
    let (event_writer, _event_reader) = event_log::new_in_memory_shared();
    let mut engine = BiddingEngine::new(rooms, gateway.clone(), event_writer);

    let viewer = gateway.join("a1");
    engine.handle_event(client("a1", ClientEventDetails::JoinAuction))?;

    assert_eq!(
        viewer.try_iter().collect::<Vec<_>>(),
        vec![BroadcastMessage::AuctionState {
            session: RoomSession::default()
        }]
    );
    Ok(())
}

#[test]
fn rejected_bids_produce_no_broadcast() -> Result<()> {
    let rooms = RoomStateTable::new_shared();
    let gateway = InMemoryBroadcastGateway::new_shared();
    let (event_writer, _event_reader) = event_log::new_in_memory_shared();
    let mut engine = BiddingEngine::new(rooms, gateway.clone(), event_writer);

    engine.handle_event(client(
        "a1",
        ClientEventDetails::StartPlayer {
            player_id: "p1".into(),
            base_price: 1000,
        },
    ))?;

    let viewer = gateway.join("a1");
    engine.handle_event(client(
        "a1",
        ClientEventDetails::PlaceBid {
            team_id: "team-a".into(),
            amount: 999,
        },
    ))?;

    assert_eq!(viewer.try_iter().count(), 0);
    Ok(())
}

#[test]
fn full_round_scenario_settles_to_the_leader() -> Result<()> {
    let rooms = RoomStateTable::new_shared();
    let gateway = InMemoryBroadcastGateway::new_shared();
    let (event_writer, event_reader) = event_log::new_in_memory_shared();
    let mut engine = BiddingEngine::new(rooms.clone(), gateway.clone(), event_writer);

    let records = InMemoryRecordStore::new_shared();
    records.create_team(&Team::new(
        "team-a".into(),
        "a1".into(),
        "Alpha".into(),
        10_000,
        "#ff0000".into(),
    ))?;
    records.create_team(&Team::new(
        "team-b".into(),
        "a1".into(),
        "Beta".into(),
        10_000,
        "#0000ff".into(),
    ))?;
    records.create_player(&Player::new(
        "p1".into(),
        "a1".into(),
        "Player One".into(),
        "batter".into(),
        "marquee".into(),
        1000,
        0,
    ))?;

    use ClientEventDetails::*;
    for event in [
        StartPlayer {
            player_id: "p1".into(),
            base_price: 1000,
        },
        PlaceBid {
            team_id: "team-a".into(),
            amount: 1000,
        },
        PlaceBid {
            team_id: "team-b".into(),
            amount: 1500,
        },
        // not strictly greater: dropped
        PlaceBid {
            team_id: "team-a".into(),
            amount: 1500,
        },
        UndoBid,
    ] {
        engine.handle_event(client("a1", event))?;
    }

    {
        let room = rooms.get_or_create("a1");
        let session = room.lock();
        assert_eq!(session.current_bid, 1000);
        assert_eq!(session.leading_team_id, Some("team-a".to_owned()));
    }

    let viewer = gateway.join("a1");
    engine.handle_event(client("a1", SellPlayer))?;

    {
        let room = rooms.get_or_create("a1");
        let session = room.lock();
        assert_eq!(session.status, RoomStatus::Sold);
        assert!(session.bid_history.is_empty());
    }

    // drain the queued settlement intent, the way the follower loop would
    let mut committer = SettlementCommitter::new(records.clone(), gateway.clone());
    let batch = event_reader.read(
        event_reader.get_start_offset()?,
        64,
        Some(Duration::ZERO),
    )?;
    for event in batch.data {
        committer.handle_event(event.details)?;
    }

    let player = records.find_player("p1")?.expect("player exists");
    assert!(player.is_sold);
    assert!(!player.is_unsold);
    assert_eq!(player.sold_to, Some("team-a".to_owned()));
    assert_eq!(player.sold_price, 1000);

    let team = records.find_team("team-a")?.expect("team exists");
    assert_eq!(team.spent, 1000);
    assert_eq!(team.players, vec!["p1".to_owned()]);

    // the sold snapshot went out before the data-changed signal
    let sold_session = rooms.get_or_create("a1").lock().clone();
    assert_eq!(
        viewer.try_iter().collect::<Vec<_>>(),
        vec![
            BroadcastMessage::AuctionState {
                session: sold_session
            },
            BroadcastMessage::DataUpdate,
        ]
    );
    Ok(())
}

#[test]
fn unsell_marks_the_player_unsold() -> Result<()> {
    let rooms = RoomStateTable::new_shared();
    let gateway = InMemoryBroadcastGateway::new_shared();
    let (event_writer, event_reader) = event_log::new_in_memory_shared();
    let mut engine = BiddingEngine::new(rooms, gateway.clone(), event_writer);

    let records = InMemoryRecordStore::new_shared();
    records.create_player(&Player::new(
        "p1".into(),
        "a1".into(),
        "Player One".into(),
        "bowler".into(),
        "capped".into(),
        500,
        0,
    ))?;

    engine.handle_event(client(
        "a1",
        ClientEventDetails::StartPlayer {
            player_id: "p1".into(),
            base_price: 500,
        },
    ))?;
    engine.handle_event(client("a1", ClientEventDetails::UnsellPlayer))?;

    let mut committer = SettlementCommitter::new(records.clone(), gateway);
    let batch = event_reader.read(0, 64, Some(Duration::ZERO))?;
    for event in batch.data {
        committer.handle_event(event.details)?;
    }

    let player = records.find_player("p1")?.expect("player exists");
    assert!(player.is_unsold);
    assert!(!player.is_sold);
    assert_eq!(player.sold_to, None);
    Ok(())
}
