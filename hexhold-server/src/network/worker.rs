//! Event worker pool.
//!
//! Four workers drain the network subscriber queue, serialize events into
//! frames and broadcast them. Workers share one receiver; a panic while
//! handling an event is caught at the worker boundary and the worker keeps
//! going.

use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::{mpsc, Mutex};
use tracing::error;

use crate::game::events::GameEvent;
use crate::network::encode;
use crate::network::server::{report_stats, ServerShared};

pub const WORKER_COUNT: usize = 4;

/// Spawn the pool over one subscriber channel.
pub fn spawn_workers(shared: Arc<ServerShared>, rx: mpsc::Receiver<GameEvent>) {
    let rx = Arc::new(Mutex::new(rx));
    for worker_id in 0..WORKER_COUNT {
        let shared = shared.clone();
        let rx = rx.clone();
        tokio::spawn(async move {
            loop {
                let event = { rx.lock().await.recv().await };
                let Some(event) = event else {
                    break;
                };
                let result = std::panic::AssertUnwindSafe(handle_event(&shared, event))
                    .catch_unwind()
                    .await;
                if result.is_err() {
                    error!(worker = worker_id, "recovered from panic in event worker");
                }
            }
        });
    }
}

async fn handle_event(shared: &Arc<ServerShared>, event: GameEvent) {
    let broadcaster = &shared.broadcaster;
    match event {
        GameEvent::ResourceUpdate { player } => {
            broadcaster
                .send_to(&player, encode::resource_update(player.power.current()))
                .await;
        }
        GameEvent::UnitSpawn {
            owner,
            barracks_id,
            unit,
        } => {
            broadcaster
                .broadcast_all(encode::unit_spawn(owner, barracks_id.raw(), &unit))
                .await;
        }
        GameEvent::UnitPositionUpdates { player_id, units } => {
            broadcaster
                .broadcast_all(encode::unit_position_updates(player_id, &units))
                .await;
        }
        GameEvent::UnitsRotationUpdate { player_id, units } => {
            broadcaster
                .broadcast_all(encode::units_rotation_update(player_id, &units))
                .await;
        }
        GameEvent::TurretRotationUpdate {
            owner,
            turret_id,
            angle,
        } => {
            broadcaster
                .broadcast_all(encode::turret_rotation_update(owner, turret_id, angle))
                .await;
        }
        GameEvent::BaseHealthUpdate { owner, health } => {
            broadcaster
                .broadcast_all(encode::base_health_update(owner, health))
                .await;
        }
        GameEvent::NeutralBaseCaptured { neutral } => {
            broadcaster
                .broadcast_all(encode::neutral_base_captured(&neutral))
                .await;
        }
        GameEvent::UnitRemove { player_id, unit_id } => {
            broadcaster
                .broadcast_all(encode::remove_unit(player_id, unit_id))
                .await;
        }
        GameEvent::BuildingRemoved { owner, building } => {
            broadcaster
                .broadcast_all(encode::buildings_destroyed(owner, &[building.id]))
                .await;
        }
        GameEvent::BulletSpawn {
            owner,
            turret_id,
            bullet_id,
            position,
        } => {
            broadcaster
                .broadcast_all(encode::bullet_spawn(owner, turret_id, bullet_id, position))
                .await;
        }
        GameEvent::UnitBulletSpawn {
            player_id,
            unit_id,
            bullet_id,
            position,
        } => {
            broadcaster
                .broadcast_all(encode::unit_bullet_spawn(player_id, unit_id, bullet_id, position))
                .await;
        }
        GameEvent::BulletRemove { owner, bullet_id } => {
            broadcaster
                .broadcast_all(encode::remove_bullet(owner, bullet_id))
                .await;
        }
        GameEvent::BulletPositionUpdate {
            owner,
            bullet_id,
            position,
        } => {
            broadcaster
                .broadcast_all(encode::bullet_position_update(owner, bullet_id, position))
                .await;
        }
        GameEvent::LeaderboardUpdate { changes } => {
            broadcaster
                .broadcast_all(encode::leaderboard_update(&changes))
                .await;
        }
        GameEvent::RemoveSpawnProtection { player_id } => {
            broadcaster
                .broadcast_all(encode::remove_spawn_protection(player_id))
                .await;
        }
        GameEvent::PlayerKilled { player, killer_id } => {
            broadcaster
                .send_to(
                    &player,
                    encode::killed_notification(
                        killer_id,
                        player.score(),
                        player.kills(),
                        player.play_duration().as_secs() as u32,
                    ),
                )
                .await;
            finalize_removal(shared, &player).await;
        }
        GameEvent::Kick { player, reason } => {
            broadcaster
                .send_to(
                    &player,
                    encode::kick_notification(
                        reason,
                        player.score(),
                        player.kills(),
                        player.play_duration().as_secs() as u32,
                    ),
                )
                .await;
            finalize_removal(shared, &player).await;
        }
    }
}

/// Shared tail of the kill and kick paths: the player leaves the world, the
/// stats go upstream, the fingerprint and chat state are released. The
/// connection itself may stay open (the client sees the notification).
async fn finalize_removal(shared: &Arc<ServerShared>, player: &Arc<crate::game::player::Player>) {
    let conn_id = player.conn_id;
    if let Some(stats) = shared.world.remove_player(player.id) {
        shared
            .broadcaster
            .broadcast_all(encode::player_left(player.id))
            .await;
        shared.registry.remove_chat_state(player.id);
        report_stats(shared, conn_id, stats.score, stats.kills, stats.playtime).await;
        shared.registry.clear_fingerprint(conn_id);
        shared.registry.clear_player(conn_id);
    }
}
