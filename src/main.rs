mod auction;
mod broadcast;
mod event;
mod event_log;
mod progress;
mod records;
mod rooms;
mod service;

use anyhow::{Context, Result};
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let listen_addr: std::net::SocketAddr = std::env::var("GAVEL_LISTEN")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_owned())
        .parse()
        .context("invalid GAVEL_LISTEN address")?;

    let records = match std::env::var("GAVEL_POSTGRES") {
        Ok(url) => records::PostgresRecordStore::connect_shared(&url)
            .context("failed to connect to postgres")?,
        Err(_) => records::InMemoryRecordStore::new_shared(),
    };

    let (event_writer, event_reader) = event_log::new_in_memory_shared();
    let progress_store = progress::InMemoryProgressTracker::new_shared();
    let rooms = rooms::RoomStateTable::new_shared();
    let gateway = broadcast::InMemoryBroadcastGateway::new_shared();

    let svc_ctl = service::ServiceControl::new(progress_store);

    ctrlc::set_handler({
        let svc_ctl = svc_ctl.clone();
        move || {
            info!("stopping all services...");
            svc_ctl.stop_all();
        }
    })?;

    info!(%listen_addr, "starting");

    for handle in vec![
        svc_ctl.spawn_log_follower(
            service::bidding_engine::BiddingEngine::new(
                rooms.clone(),
                gateway.clone(),
                event_writer.clone(),
            ),
            event_reader.clone(),
        ),
        svc_ctl.spawn_log_follower(
            service::settlement::SettlementCommitter::new(records.clone(), gateway.clone()),
            event_reader.clone(),
        ),
        svc_ctl.spawn_loop(service::ui::Ui::new(
            listen_addr,
            records.clone(),
            rooms.clone(),
            event_writer.clone(),
        )?),
    ] {
        handle.join()?
    }

    Ok(())
}
