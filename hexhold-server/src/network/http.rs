//! Admin HTTP endpoints.
//!
//! A tiny axum router beside the game socket: `/playercount` for the load
//! balancer and `/reboot?minutesLeft=M` to arm a restart (joins are refused
//! and everyone gets a countdown alert).

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::network::encode;
use crate::network::server::ServerShared;

pub fn router(shared: Arc<ServerShared>) -> Router {
    Router::new()
        .route("/playercount", get(playercount))
        .route("/reboot", get(reboot))
        .with_state(shared)
}

pub async fn serve(shared: Arc<ServerShared>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("admin endpoints listening on {addr}");
    axum::serve(listener, router(shared)).await
}

async fn playercount(State(shared): State<Arc<ServerShared>>) -> Json<Value> {
    Json(json!({ "player_count": shared.world.player_count() }))
}

#[derive(Deserialize)]
struct RebootParams {
    #[serde(rename = "minutesLeft")]
    minutes_left: Option<u8>,
}

async fn reboot(
    State(shared): State<Arc<ServerShared>>,
    Query(params): Query<RebootParams>,
) -> StatusCode {
    let Some(minutes_left) = params.minutes_left.filter(|&m| m > 0) else {
        return StatusCode::BAD_REQUEST;
    };
    warn!(minutes_left, "server reboot armed");
    shared.set_rebooting();
    shared
        .broadcaster
        .broadcast_all(encode::reboot_alert(minutes_left))
        .await;
    StatusCode::OK
}
