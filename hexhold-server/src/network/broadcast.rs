//! Frame fan-out.
//!
//! The broadcaster walks the live player set and pushes a pre-built frame
//! into each connection's outbound queue. Per-connection writer tasks do the
//! socket I/O, so a slow client never stalls a tick loop or another client.

use std::sync::Arc;

use bytes::Bytes;

use crate::core::ids::EntityId;
use crate::game::catalog::BulletBehavior;
use crate::game::player::Player;
use crate::game::world::World;
use crate::network::encode;

#[derive(Clone)]
pub struct Broadcaster {
    world: Arc<World>,
}

impl Broadcaster {
    pub fn new(world: Arc<World>) -> Self {
        Self { world }
    }

    pub async fn send_to(&self, player: &Player, frame: Bytes) {
        if !player.is_removed() {
            player.conn.send(frame).await;
        }
    }

    pub async fn broadcast_all(&self, frame: Bytes) {
        for player in self.world.players_snapshot() {
            if !player.is_removed() {
                player.conn.send(frame.clone()).await;
            }
        }
    }

    pub async fn broadcast_except(&self, frame: Bytes, except: EntityId) {
        for player in self.world.players_snapshot() {
            if player.id != except && !player.is_removed() {
                player.conn.send(frame.clone()).await;
            }
        }
    }

    // =========================================================================
    // JOIN / RESYNC COMPOSITES
    // =========================================================================

    /// Full world snapshot, optionally excluding the receiver's own block.
    pub async fn send_game_state(&self, player: &Player, exclude: Option<EntityId>) {
        let frame = encode::game_state(&self.world, exclude);
        self.send_to(player, frame).await;
    }

    /// Current facing of every player's units, one frame per owner.
    pub async fn send_units_rotations(&self, player: &Player) {
        for other in self.world.players_snapshot() {
            if other.is_removed() {
                continue;
            }
            let rotations: Vec<(EntityId, f32)> = other
                .units_snapshot()
                .iter()
                .map(|u| (u.id, u.rotation()))
                .collect();
            if rotations.is_empty() {
                continue;
            }
            self.send_to(player, encode::units_rotation_update(other.id, &rotations))
                .await;
        }
    }

    /// Every trapper bullet currently parked somewhere on the map.
    pub async fn send_trapper_bullets(&self, player: &Player) {
        let mut trappers = Vec::new();
        for other in self.world.players_snapshot() {
            if other.is_removed() {
                continue;
            }
            for bullet in other.base.bullets_snapshot() {
                if bullet.behavior == BulletBehavior::Trapper && !bullet.is_removed() {
                    trappers.push((bullet.owner, bullet.id, bullet.position()));
                }
            }
        }
        for neutral in &self.world.neutral_bases {
            for bullet in neutral.base.bullets_snapshot() {
                if bullet.behavior == BulletBehavior::Trapper && !bullet.is_removed() {
                    trappers.push((bullet.owner, bullet.id, bullet.position()));
                }
            }
        }
        if !trappers.is_empty() {
            self.send_to(player, encode::initial_bullet_states(&trappers))
                .await;
        }
    }

    /// Seed the full top-10 snapshot to one player.
    pub async fn send_initial_leaderboard(&self, player: &Player) {
        let entries = self.world.leaderboard.entries();
        self.send_to(player, encode::leaderboard_update(&entries))
            .await;
    }
}
