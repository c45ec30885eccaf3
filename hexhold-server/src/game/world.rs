//! The global entity registry.
//!
//! One `World` lives for the whole process. The player map sits behind a
//! reader-writer lock; players, bases and entities carry their own locks.
//! Lock order is always world → player/neutral → base → entity, and no lock
//! here is ever held across an await point.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tracing::info;

use crate::core::ids::{EntityId, IdPool};
use crate::core::position::TilePos;
use crate::game::config::PLAYER_ID_POOL;
use crate::game::events::{EventBus, GameEvent};
use crate::game::leaderboard::Leaderboard;
use crate::game::map::{self, MapLayout, Rock};
use crate::game::neutral::NeutralBase;
use crate::game::player::{Permission, Player};
use crate::network::registry::{ClientHandle, ConnId};

/// Final stats captured while removing a player, for the kill/kick
/// notifications and the upstream stats report.
pub struct RemovedPlayer {
    pub id: EntityId,
    pub score: u32,
    pub kills: u32,
    pub playtime: Duration,
}

pub struct World {
    players: RwLock<HashMap<EntityId, Arc<Player>>>,
    pub neutral_bases: Vec<Arc<NeutralBase>>,
    pub bushes: Vec<TilePos>,
    pub rocks: Vec<Rock>,
    available_positions: Mutex<HashMap<TilePos, bool>>,
    pub leaderboard: Leaderboard,
    player_ids: IdPool,
    pub events: EventBus,
}

impl World {
    pub fn new(events: EventBus) -> Arc<World> {
        Self::from_layout(map::generate_layout(), events)
    }

    pub fn from_layout(layout: MapLayout, events: EventBus) -> Arc<World> {
        let neutral_bases = layout
            .neutral_positions
            .iter()
            .enumerate()
            .map(|(i, &pos)| NeutralBase::new(EntityId(i as u8), pos))
            .collect();
        let available_positions = layout
            .player_positions
            .iter()
            .map(|&pos| (pos, true))
            .collect();
        Arc::new(World {
            players: RwLock::new(HashMap::new()),
            neutral_bases,
            bushes: layout.bushes,
            rocks: layout.rocks,
            available_positions: Mutex::new(available_positions),
            leaderboard: Leaderboard::new(),
            player_ids: IdPool::new(PLAYER_ID_POOL),
            events,
        })
    }

    // =========================================================================
    // PLAYERS
    // =========================================================================

    /// Admit a new player: claim the spawn anchor closest to the existing
    /// crowd, allocate an ID and register the aggregate.
    #[allow(clippy::too_many_arguments)]
    pub fn add_player(
        &self,
        conn: ClientHandle,
        conn_id: ConnId,
        permission: Permission,
        name: &[u8],
        color: [u8; 3],
        skin_id: u8,
    ) -> Option<Arc<Player>> {
        let position = self.find_free_position()?;

        let Some(id) = self.player_ids.acquire() else {
            self.mark_position_available(position);
            return None;
        };

        let mut fixed_name = [0u8; 12];
        let len = name.len().min(12);
        fixed_name[..len].copy_from_slice(&name[..len]);

        let player = Player::new(id, conn, conn_id, permission, fixed_name, color, skin_id, position);
        self.players.write().unwrap().insert(id, player.clone());
        info!(player = %id, ?position, "player joined the world");
        Some(player)
    }

    /// Tear a player down: free the anchor, decapture their neutral bases,
    /// drop their entities and recycle the ID. Idempotent; a second call
    /// for the same ID returns `None`.
    pub fn remove_player(&self, id: EntityId) -> Option<RemovedPlayer> {
        let player = self.players.write().unwrap().remove(&id)?;
        player.mark_removed();

        let stats = RemovedPlayer {
            id,
            score: player.score(),
            kills: player.kills(),
            playtime: player.play_duration(),
        };

        self.mark_position_available(player.base.position);
        for neutral in player.captured_snapshot() {
            neutral.set_captured(None);
        }
        player.clear_entities();
        self.player_ids.release(id);
        info!(player = %id, score = stats.score, "player removed");
        Some(stats)
    }

    pub fn player(&self, id: EntityId) -> Option<Arc<Player>> {
        self.players.read().unwrap().get(&id).cloned()
    }

    pub fn players_snapshot(&self) -> Vec<Arc<Player>> {
        self.players.read().unwrap().values().cloned().collect()
    }

    /// Live (not mid-removal) players.
    pub fn active_players(&self) -> Vec<Arc<Player>> {
        self.players
            .read()
            .unwrap()
            .values()
            .filter(|p| !p.is_removed())
            .cloned()
            .collect()
    }

    pub fn player_count(&self) -> usize {
        self.players.read().unwrap().len()
    }

    pub fn neutral_base(&self, id: EntityId) -> Option<Arc<NeutralBase>> {
        self.neutral_bases.iter().find(|n| n.id == id).cloned()
    }

    // =========================================================================
    // SPAWN ANCHORS
    // =========================================================================

    pub fn mark_position_available(&self, position: TilePos) {
        self.available_positions
            .lock()
            .unwrap()
            .insert(position, true);
    }

    /// Pick the free anchor closest to any existing player so the map fills
    /// from the inside out; any free anchor when the world is empty.
    fn find_free_position(&self) -> Option<TilePos> {
        let players = self.players_snapshot();
        let mut positions = self.available_positions.lock().unwrap();

        let chosen = if players.is_empty() {
            positions
                .iter()
                .find(|(_, &available)| available)
                .map(|(&pos, _)| pos)
        } else {
            let mut nearest: Option<(TilePos, f32)> = None;
            for (&pos, &available) in positions.iter() {
                if !available {
                    continue;
                }
                for player in &players {
                    let distance = pos.distance_to(player.base.position);
                    if nearest.map(|(_, best)| distance < best).unwrap_or(true) {
                        nearest = Some((pos, distance));
                    }
                }
            }
            nearest.map(|(pos, _)| pos)
        }?;

        positions.insert(chosen, false);
        Some(chosen)
    }

    // =========================================================================
    // SCORE
    // =========================================================================

    /// Credit score and push a leaderboard diff when the top 10 visibly
    /// changes.
    pub fn award_score(&self, player: &Player, amount: u32) {
        player.add_score(amount);
        if let Some(changes) = self.update_leaderboard() {
            self.events.emit(GameEvent::LeaderboardUpdate { changes });
        }
    }

    pub fn update_leaderboard(&self) -> Option<Vec<crate::game::leaderboard::LeaderboardEntry>> {
        let snapshot: Vec<(EntityId, u32)> = self
            .players
            .read()
            .unwrap()
            .values()
            .map(|p| (p.id, p.score()))
            .collect();
        self.leaderboard.update(&snapshot)
    }
}
