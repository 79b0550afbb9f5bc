//! HTTP surface
//!
//! Record CRUD guarded by the auction's plaintext access code, plus the
//! room event intake and a snapshot read. The real-time fan-out itself
//! is the broadcast gateway's job; this layer only feeds the log.
use crate::auction::{Amount, RoomSession};
use crate::event::{ClientEvent, ClientEventDetails, Event};
use crate::event_log::{self, Writer as _};
use crate::records::{Auction, Player, RecordStore, SharedRecordStore, Team};
use crate::rooms::SharedRoomStateTable;
use crate::service::{settlement, LoopService};
use anyhow::{format_err, Context, Result};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use tokio::{runtime::Runtime, sync::oneshot};
use tracing::warn;
use uuid::Uuid;

const ACCESS_CODE_HEADER: &str = "x-access-code";

pub struct Ui {
    // cancels all server tasks on drop
    _runtime: Runtime,
    server_rx: oneshot::Receiver<Result<()>>,
}

impl Ui {
    pub fn new(
        listen_addr: SocketAddr,
        records: SharedRecordStore,
        rooms: SharedRoomStateTable,
        event_writer: event_log::SharedWriter,
    ) -> Result<Self> {
        let runtime = Runtime::new()?;

        let (tx, rx) = oneshot::channel();

        runtime.spawn(async move {
            tx.send(
                run_http_server(
                    listen_addr,
                    AppState {
                        records,
                        rooms,
                        event_writer,
                    },
                )
                .await
                .context("failed to run http server"),
            )
            .ok();
        });

        Ok(Self {
            _runtime: runtime,
            server_rx: rx,
        })
    }
}

impl LoopService for Ui {
    fn run_iteration(&mut self) -> Result<()> {
        // don't hog the cpu
        std::thread::sleep(std::time::Duration::from_millis(100));

        match self.server_rx.try_recv() {
            Ok(res) => res,
            Err(oneshot::error::TryRecvError::Empty) => Ok(()),
            Err(oneshot::error::TryRecvError::Closed) => {
                Err(format_err!("http server died without a response?!"))
            }
        }
    }
}

#[derive(Clone)]
struct AppState {
    records: SharedRecordStore,
    rooms: SharedRoomStateTable,
    event_writer: event_log::SharedWriter,
}

async fn run_http_server(listen_addr: SocketAddr, state: AppState) -> Result<()> {
    let app = Router::new()
        .route("/auctions", post(create_auction))
        .route("/auctions/:id", get(get_auction).delete(delete_auction))
        .route("/auctions/:id/teams", post(create_team).get(list_teams))
        .route(
            "/auctions/:id/players",
            post(create_player).get(list_players),
        )
        .route("/auctions/:id/events", post(post_room_event))
        .route("/auctions/:id/state", get(room_state))
        .route("/teams/:id", delete(delete_team))
        .route("/players/:id", delete(delete_player))
        .with_state(state);

    axum::Server::try_bind(&listen_addr)?
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

enum ApiError {
    NotFound,
    Unauthorized,
    Internal(anyhow::Error),
}

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(e: E) -> Self {
        Self::Internal(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND.into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Internal(e) => {
                warn!(error = ?e, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

fn access_code(headers: &HeaderMap) -> String {
    headers
        .get(ACCESS_CODE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

fn authorize(records: &dyn RecordStore, auction_id: &str, code: &str) -> ApiResult<()> {
    let auction = records
        .find_auction(auction_id)?
        .ok_or(ApiError::NotFound)?;
    if auction.access_code != code {
        return Err(ApiError::Unauthorized);
    }
    Ok(())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAuctionRequest {
    name: String,
    access_code: String,
}

async fn create_auction(
    State(state): State<AppState>,
    Json(body): Json<CreateAuctionRequest>,
) -> ApiResult<Json<Auction>> {
    let records = state.records.clone();
    let auction = tokio::task::spawn_blocking(move || -> ApiResult<Auction> {
        let auction = Auction {
            id: Uuid::new_v4().to_string(),
            name: body.name,
            access_code: body.access_code,
        };
        records.create_auction(&auction)?;
        Ok(auction)
    })
    .await??;
    Ok(Json(auction))
}

async fn get_auction(
    State(state): State<AppState>,
    Path(auction_id): Path<String>,
) -> ApiResult<Json<Auction>> {
    let records = state.records.clone();
    let auction = tokio::task::spawn_blocking(move || records.find_auction(&auction_id))
        .await??
        .ok_or(ApiError::NotFound)?;
    Ok(Json(auction))
}

async fn delete_auction(
    State(state): State<AppState>,
    Path(auction_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let code = access_code(&headers);
    let records = state.records.clone();
    let rooms = state.rooms.clone();
    tokio::task::spawn_blocking(move || -> ApiResult<()> {
        authorize(&*records, &auction_id, &code)?;
        records.delete_auction(&auction_id)?;
        // the live session goes with the auction
        rooms.remove(&auction_id);
        Ok(())
    })
    .await??;
    Ok(Json(json!({ "deleted": true })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTeamRequest {
    name: String,
    budget: Amount,
    #[serde(default)]
    color: Option<String>,
}

async fn create_team(
    State(state): State<AppState>,
    Path(auction_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<CreateTeamRequest>,
) -> ApiResult<Json<Team>> {
    let code = access_code(&headers);
    let records = state.records.clone();
    let team = tokio::task::spawn_blocking(move || -> ApiResult<Team> {
        authorize(&*records, &auction_id, &code)?;
        let team = Team::new(
            Uuid::new_v4().to_string(),
            auction_id,
            body.name,
            body.budget,
            body.color.unwrap_or_else(|| "#cccccc".to_owned()),
        );
        records.create_team(&team)?;
        Ok(team)
    })
    .await??;
    Ok(Json(team))
}

async fn list_teams(
    State(state): State<AppState>,
    Path(auction_id): Path<String>,
) -> ApiResult<Json<Vec<Team>>> {
    let records = state.records.clone();
    let teams =
        tokio::task::spawn_blocking(move || records.teams_by_auction(&auction_id)).await??;
    Ok(Json(teams))
}

async fn delete_team(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let code = access_code(&headers);
    let records = state.records.clone();
    tokio::task::spawn_blocking(move || -> ApiResult<()> {
        let team = records.find_team(&team_id)?.ok_or(ApiError::NotFound)?;
        authorize(&*records, &team.auction_id, &code)?;
        // sold players go back to the pool before the team disappears
        settlement::reverse_team(&*records, &team_id)?;
        records.delete_team(&team_id)?;
        Ok(())
    })
    .await??;
    Ok(Json(json!({ "deleted": true })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePlayerRequest {
    name: String,
    role: String,
    category: String,
    base_price: Amount,
}

async fn create_player(
    State(state): State<AppState>,
    Path(auction_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<CreatePlayerRequest>,
) -> ApiResult<Json<Player>> {
    let code = access_code(&headers);
    let records = state.records.clone();
    let player = tokio::task::spawn_blocking(move || -> ApiResult<Player> {
        authorize(&*records, &auction_id, &code)?;
        let order = records.count_players(&auction_id)?;
        let player = Player::new(
            Uuid::new_v4().to_string(),
            auction_id,
            body.name,
            body.role,
            body.category,
            body.base_price,
            order,
        );
        records.create_player(&player)?;
        Ok(player)
    })
    .await??;
    Ok(Json(player))
}

async fn list_players(
    State(state): State<AppState>,
    Path(auction_id): Path<String>,
) -> ApiResult<Json<Vec<Player>>> {
    let records = state.records.clone();
    let players =
        tokio::task::spawn_blocking(move || records.players_by_auction(&auction_id)).await??;
    Ok(Json(players))
}

async fn delete_player(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let code = access_code(&headers);
    let records = state.records.clone();
    tokio::task::spawn_blocking(move || -> ApiResult<()> {
        let player = records.find_player(&player_id)?.ok_or(ApiError::NotFound)?;
        authorize(&*records, &player.auction_id, &code)?;
        // refund the owning team before the record goes away
        settlement::reverse_sale(&*records, &player_id)?;
        records.delete_player(&player_id)?;
        Ok(())
    })
    .await??;
    Ok(Json(json!({ "deleted": true })))
}

async fn post_room_event(
    State(state): State<AppState>,
    Path(auction_id): Path<String>,
    Json(event): Json<ClientEventDetails>,
) -> ApiResult<StatusCode> {
    state.event_writer.write(&[Event::Client(ClientEvent {
        auction: auction_id,
        event,
    })])?;
    Ok(StatusCode::ACCEPTED)
}

async fn room_state(
    State(state): State<AppState>,
    Path(auction_id): Path<String>,
) -> ApiResult<Json<RoomSession>> {
    let room = state.rooms.get_or_create(&auction_id);
    let session = room.lock().clone();
    Ok(Json(session))
}
