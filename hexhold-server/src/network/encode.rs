//! Outbound frame builders.
//!
//! Pure functions from game state to wire frames ([`Bytes`]); the broadcast
//! layer decides who receives them.

use bytes::Bytes;

use crate::core::ids::EntityId;
use crate::core::position::WorldPos;
use crate::game::base::Owner;
use crate::game::building::Building;
use crate::game::catalog::BuildingKind;
use crate::game::config::KickReason;
use crate::game::leaderboard::LeaderboardEntry;
use crate::game::neutral::NeutralBase;
use crate::game::player::Player;
use crate::game::skins::SkinCatalog;
use crate::game::unit::Unit;
use crate::game::world::World;
use crate::network::protocol::{frame, FrameWriter, MAX_CHAT_LEN};

fn put_owner(writer: &mut FrameWriter, owner: Owner) {
    writer.put_u8(owner.wire_kind());
    writer.put_u8(owner.id().raw());
}

pub fn server_version(version: u8) -> Bytes {
    let mut w = FrameWriter::new(frame::SERVER_VERSION);
    w.put_u8(version);
    w.finish()
}

pub fn reboot_alert(minutes_left: u8) -> Bytes {
    let mut w = FrameWriter::new(frame::REBOOT_ALERT);
    w.put_u8(minutes_left);
    w.finish()
}

pub fn error_frame() -> Bytes {
    FrameWriter::new(frame::ERROR).finish()
}

/// Identity record: used both for `PlayerJoined` (to everyone else) and
/// `InitialPlayerData` (to the player themself).
fn identity_record(frame_type: u8, player: &Player) -> Bytes {
    let mut w = FrameWriter::new(frame_type);
    w.put_u8(player.id.raw());
    w.put_slice(&player.base.color);
    w.put_u8(player.skin_id);
    w.put_tile_pos(player.base.position);
    w.put_slice(&player.name);
    w.finish()
}

pub fn player_joined(player: &Player) -> Bytes {
    identity_record(frame::PLAYER_JOINED, player)
}

pub fn initial_player_data(player: &Player) -> Bytes {
    identity_record(frame::INITIAL_PLAYER_DATA, player)
}

pub fn player_left(player_id: EntityId) -> Bytes {
    let mut w = FrameWriter::new(frame::PLAYER_LEFT);
    w.put_u8(player_id.raw());
    w.finish()
}

pub fn base_health_update(owner: Owner, health: u16) -> Bytes {
    let mut w = FrameWriter::new(frame::BASE_HEALTH_UPDATE);
    put_owner(&mut w, owner);
    w.put_u16(health);
    w.finish()
}

pub fn building_placed(owner: Owner, building: &Building, barracks_active: Option<bool>) -> Bytes {
    let mut w = FrameWriter::new(frame::BUILDING_PLACED);
    put_owner(&mut w, owner);
    w.put_u8(building.id.raw());
    w.put_u8(building.kind as u8);
    w.put_world_pos(building.position);
    if building.kind == BuildingKind::Barracks {
        w.put_u8(u8::from(barracks_active.unwrap_or(false)));
    }
    w.finish()
}

pub fn buildings_destroyed(owner: Owner, building_ids: &[EntityId]) -> Bytes {
    let mut w = FrameWriter::new(frame::BUILDINGS_DESTROYED);
    put_owner(&mut w, owner);
    for id in building_ids {
        w.put_u8(id.raw());
    }
    w.finish()
}

pub fn buildings_upgraded(owner: Owner, variant: u8, building_ids: &[EntityId]) -> Bytes {
    let mut w = FrameWriter::new(frame::BUILDINGS_UPGRADED);
    put_owner(&mut w, owner);
    w.put_u8(variant);
    for id in building_ids {
        w.put_u8(id.raw());
    }
    w.finish()
}

pub fn resource_update(power: u16) -> Bytes {
    let mut w = FrameWriter::new(frame::RESOURCE_UPDATE);
    w.put_u16(power);
    w.finish()
}

/// The commander spawn travels with this sentinel instead of a barracks ID.
pub const COMMANDER_BARRACKS_ID: u8 = 255;

pub fn unit_spawn(owner: Owner, barracks_id: u8, unit: &Unit) -> Bytes {
    let mut w = FrameWriter::new(frame::SPAWN_UNIT);
    put_owner(&mut w, owner);
    w.put_u8(barracks_id);
    w.put_u8(unit.id.raw());
    w.put_u8(unit.kind as u8);
    w.put_u8(unit.variant.raw());
    w.put_world_pos(unit.target());
    w.finish()
}

pub fn unit_position_updates(player_id: EntityId, units: &[(EntityId, WorldPos)]) -> Bytes {
    let mut w = FrameWriter::new(frame::UNIT_POSITION_UPDATES);
    w.put_u8(player_id.raw());
    for (id, position) in units {
        w.put_u8(id.raw());
        w.put_world_pos(*position);
    }
    w.finish()
}

pub fn units_rotation_update(player_id: EntityId, units: &[(EntityId, f32)]) -> Bytes {
    let mut w = FrameWriter::new(frame::UNITS_ROTATION_UPDATE);
    w.put_u8(player_id.raw());
    for (id, rotation) in units {
        w.put_u8(id.raw());
        w.put_f32(*rotation);
    }
    w.finish()
}

pub fn remove_unit(player_id: EntityId, unit_id: EntityId) -> Bytes {
    let mut w = FrameWriter::new(frame::REMOVE_UNIT);
    w.put_u8(player_id.raw());
    w.put_u8(unit_id.raw());
    w.finish()
}

/// Score-to-XP conversion used in the end-of-run stats blocks.
pub fn score_to_xp(score: u32) -> u32 {
    score / 1000
}

pub fn killed_notification(killer_id: EntityId, score: u32, kills: u32, playtime_secs: u32) -> Bytes {
    let mut w = FrameWriter::new(frame::KILLED);
    w.put_u8(killer_id.raw());
    w.put_u32(score);
    w.put_u32(score_to_xp(score));
    w.put_u32(kills);
    w.put_u32(playtime_secs);
    w.finish()
}

pub fn kick_notification(reason: KickReason, score: u32, kills: u32, playtime_secs: u32) -> Bytes {
    let mut w = FrameWriter::new(frame::KICK_NOTIFICATION);
    w.put_u8(reason as u8);
    w.put_u32(score);
    w.put_u32(score_to_xp(score));
    w.put_u32(kills);
    w.put_u32(playtime_secs);
    w.finish()
}

pub fn bullet_spawn(owner: Owner, turret_id: EntityId, bullet_id: EntityId, position: WorldPos) -> Bytes {
    let mut w = FrameWriter::new(frame::SPAWN_BULLET);
    put_owner(&mut w, owner);
    w.put_u8(turret_id.raw());
    w.put_u8(bullet_id.raw());
    w.put_world_pos(position);
    w.finish()
}

pub fn unit_bullet_spawn(
    player_id: EntityId,
    unit_id: EntityId,
    bullet_id: EntityId,
    position: WorldPos,
) -> Bytes {
    let mut w = FrameWriter::new(frame::UNIT_SPAWN_BULLET);
    w.put_u8(player_id.raw());
    w.put_u8(unit_id.raw());
    w.put_u8(bullet_id.raw());
    w.put_world_pos(position);
    w.finish()
}

pub fn bullet_position_update(owner: Owner, bullet_id: EntityId, position: WorldPos) -> Bytes {
    let mut w = FrameWriter::new(frame::BULLET_POSITION_UPDATE);
    put_owner(&mut w, owner);
    w.put_u8(bullet_id.raw());
    w.put_world_pos(position);
    w.finish()
}

pub fn remove_bullet(owner: Owner, bullet_id: EntityId) -> Bytes {
    let mut w = FrameWriter::new(frame::REMOVE_BULLET);
    put_owner(&mut w, owner);
    w.put_u8(bullet_id.raw());
    w.finish()
}

pub fn leaderboard_update(entries: &[LeaderboardEntry]) -> Bytes {
    let mut w = FrameWriter::new(frame::LEADERBOARD_UPDATE);
    w.put_u8(entries.len() as u8);
    for entry in entries {
        w.put_u8(entry.player_id.raw());
        w.put_packed_score(&entry.score);
    }
    w.finish()
}

pub fn remove_spawn_protection(player_id: EntityId) -> Bytes {
    let mut w = FrameWriter::new(frame::REMOVE_SPAWN_PROTECTION);
    w.put_u8(player_id.raw());
    w.finish()
}

pub fn chat_message(player_id: EntityId, text: &[u8]) -> Bytes {
    let mut w = FrameWriter::new(frame::CHAT_MESSAGE);
    w.put_u8(player_id.raw());
    w.put_slice(&text[..text.len().min(MAX_CHAT_LEN)]);
    w.finish()
}

pub fn building_placement_failed(kind: u8) -> Bytes {
    let mut w = FrameWriter::new(frame::BUILDING_PLACEMENT_FAILED);
    w.put_u8(kind);
    w.finish()
}

pub fn initial_bullet_states(bullets: &[(Owner, EntityId, WorldPos)]) -> Bytes {
    let mut w = FrameWriter::new(frame::INITIAL_BULLET_STATES);
    for (owner, bullet_id, position) in bullets {
        put_owner(&mut w, *owner);
        w.put_u8(bullet_id.raw());
        w.put_world_pos(*position);
    }
    w.finish()
}

pub fn turret_rotation_update(owner: Owner, turret_id: EntityId, angle: f32) -> Bytes {
    let mut w = FrameWriter::new(frame::TURRET_ROTATION_UPDATE);
    put_owner(&mut w, owner);
    w.put_u8(turret_id.raw());
    w.put_f32(angle);
    w.finish()
}

pub fn barracks_activation_update(owner: Owner, barracks_id: EntityId, active: bool) -> Bytes {
    let mut w = FrameWriter::new(frame::BARRACK_ACTIVATION_UPDATE);
    put_owner(&mut w, owner);
    w.put_u8(barracks_id.raw());
    w.put_u8(u8::from(active));
    w.finish()
}

/// Capture announcement: the neutral ID, then (when captured) the holder and
/// every building of the fresh garrison.
pub fn neutral_base_captured(neutral: &NeutralBase) -> Bytes {
    let mut w = FrameWriter::new(frame::NEUTRAL_BASE_CAPTURED);
    w.put_u8(neutral.id.raw());
    if let Some(capturer) = neutral.captured_by() {
        w.put_u8(capturer.id.raw());
        for building in neutral.base.buildings_snapshot() {
            w.put_u8(building.id.raw());
            w.put_u8(building.kind as u8);
            w.put_u8(building.variant().raw());
            w.put_world_pos(building.position);
        }
    }
    w.finish()
}

pub fn skin_data(catalog: &SkinCatalog) -> Bytes {
    let mut w = FrameWriter::new(frame::SKIN_DATA);

    w.put_u8(catalog.default.len() as u8);
    for skin in &catalog.default {
        w.put_u8(skin.id);
        w.put_name(skin.name.as_bytes());
    }
    w.put_u8(catalog.veteran.len() as u8);
    for skin in &catalog.veteran {
        w.put_u8(skin.id);
        w.put_name(skin.name.as_bytes());
        w.put_u8(skin.required_level as u8);
    }
    w.put_u8(catalog.premium.len() as u8);
    for skin in &catalog.premium {
        w.put_u8(skin.id);
        w.put_name(skin.name.as_bytes());
        w.put_u16(skin.cost as u16);
    }
    w.finish()
}

// =============================================================================
// GAME STATE
// =============================================================================

fn put_building(w: &mut FrameWriter, building: &Building, spawner_owner: Option<&Player>) {
    w.put_u8(building.id.raw());
    w.put_u8(building.kind as u8);
    w.put_u8(building.variant().raw());
    w.put_world_pos(building.position);
    if building.kind == BuildingKind::Barracks {
        let active = spawner_owner
            .and_then(|player| {
                player
                    .unit_spawners_snapshot()
                    .into_iter()
                    .find(|s| s.barracks.id == building.id && s.barracks.owner == building.owner)
            })
            .map(|s| s.is_activated())
            .unwrap_or(false);
        w.put_u8(u8::from(active));
    }
}

fn put_player_block(w: &mut FrameWriter, player: &Player) {
    w.put_u8(player.id.raw());
    w.put_u8(u8::from(player.has_protection()));
    w.put_u16(player.base.health.current());
    w.put_slice(&player.base.color);
    w.put_u8(player.skin_id);
    w.put_tile_pos(player.base.position);
    w.put_slice(&player.name);

    let buildings = player.base.buildings_snapshot();
    w.put_u8(buildings.len() as u8);
    for building in &buildings {
        put_building(w, building, Some(player));
    }

    let units = player.units_snapshot();
    w.put_u8(units.len() as u8);
    for unit in &units {
        w.put_u8(unit.id.raw());
        w.put_u8(unit.kind as u8);
        w.put_u8(unit.variant.raw());
        w.put_world_pos(unit.position());
    }
}

/// The full world snapshot sent on join and on resync. `exclude` omits the
/// receiving player's own block (their identity record follows separately).
pub fn game_state(world: &World, exclude: Option<EntityId>) -> Bytes {
    let mut w = FrameWriter::new(frame::GAME_STATE);

    let players: Vec<_> = world
        .players_snapshot()
        .into_iter()
        .filter(|p| exclude.map(|id| p.id != id).unwrap_or(true))
        .collect();
    w.put_u8(players.len() as u8);
    for player in &players {
        put_player_block(&mut w, player);
    }

    w.put_u8(world.neutral_bases.len() as u8);
    for neutral in &world.neutral_bases {
        w.put_u8(neutral.id.raw());
        let capturer = neutral.captured_by();
        w.put_u8(capturer.as_ref().map(|p| p.id.raw()).unwrap_or(255));
        w.put_tile_pos(neutral.base.position);
        w.put_u16(neutral.base.health.current());

        let buildings = neutral.base.buildings_snapshot();
        w.put_u8(buildings.len() as u8);
        for building in &buildings {
            put_building(&mut w, building, capturer.as_deref());
        }
    }

    w.put_u8(world.bushes.len() as u8);
    for bush in &world.bushes {
        w.put_tile_pos(*bush);
    }

    w.put_u8(world.rocks.len() as u8);
    for rock in &world.rocks {
        w.put_tile_pos(rock.polygon.center.to_tile());
        w.put_u8(rock.size as u8);
        w.put_f32(rock.polygon.rotation as f32);
    }

    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::position::TilePos;
    use crate::game::events::EventBus;
    use crate::game::leaderboard::pack_score;
    use crate::game::map;
    use crate::game::player::Permission;
    use crate::network::registry::ClientHandle;

    fn test_world() -> std::sync::Arc<World> {
        let (bus, _dispatcher) = EventBus::new();
        World::from_layout(map::generate_layout(), bus)
    }

    #[test]
    fn identity_record_layout() {
        let player = Player::for_tests(EntityId(9), TilePos::new(100, -200), Permission::None);
        let bytes = player_joined(&player);
        assert_eq!(bytes[0], frame::PLAYER_JOINED);
        assert_eq!(bytes[1], 9);
        // color (3) + skin (1) + pos (4) + name (12)
        assert_eq!(bytes.len(), 1 + 1 + 3 + 1 + 4 + 12);
        assert_eq!(
            i16::from_be_bytes([bytes[6], bytes[7]]),
            100,
            "anchor x at fixed offset"
        );
    }

    #[test]
    fn owner_prefix_distinguishes_player_and_neutral() {
        let player_frame = base_health_update(Owner::Player(EntityId(4)), 1000);
        assert_eq!(&player_frame[..3], &[frame::BASE_HEALTH_UPDATE, 1, 4]);
        let neutral_frame = base_health_update(Owner::Neutral(EntityId(2)), 500);
        assert_eq!(&neutral_frame[..3], &[frame::BASE_HEALTH_UPDATE, 0, 2]);
    }

    #[test]
    fn barracks_frame_carries_activation_byte() {
        let player = Player::for_tests(EntityId(1), TilePos::new(0, 0), Permission::None);
        let barracks = player
            .base
            .add_building(&player, BuildingKind::Barracks, WorldPos::new(355.0, 0.0))
            .unwrap();
        let bytes = building_placed(player.base.owner, &barracks, Some(true));
        // ownerKind, ownerId, buildingId, type, pos(8), active.
        assert_eq!(bytes.len(), 1 + 2 + 1 + 1 + 8 + 1);
        assert_eq!(bytes[bytes.len() - 1], 1);

        let wall = player
            .base
            .add_building(&player, BuildingKind::Wall, WorldPos::new(200.0, 0.0))
            .unwrap();
        let bytes = building_placed(player.base.owner, &wall, None);
        assert_eq!(bytes.len(), 1 + 2 + 1 + 1 + 8);
    }

    #[test]
    fn leaderboard_frame_counts_entries() {
        let entries = vec![
            LeaderboardEntry { player_id: EntityId(1), score: pack_score(1234) },
            LeaderboardEntry { player_id: EntityId(2), score: pack_score(900) },
        ];
        let bytes = leaderboard_update(&entries);
        assert_eq!(bytes[1], 2);
        // Each entry: id (1) + unit (1) + packed (2).
        assert_eq!(bytes.len(), 2 + 2 * 4);
    }

    #[test]
    fn game_state_counts_blocks() {
        let world = test_world();
        let _player = world
            .add_player(ClientHandle::detached(), crate::network::registry::ConnId(0), Permission::None, b"enc", [1, 2, 3], 0)
            .unwrap();
        let bytes = game_state(&world, None);
        assert_eq!(bytes[0], frame::GAME_STATE);
        assert_eq!(bytes[1], 1, "one player block");

        let excluded = game_state(&world, Some(_player.id));
        assert_eq!(excluded[1], 0, "own block excluded");
    }

    #[test]
    fn kick_frame_carries_stats_block() {
        let bytes = kick_notification(KickReason::Scripting, 123_456, 7, 890);
        assert_eq!(bytes[0], frame::KICK_NOTIFICATION);
        assert_eq!(bytes[1], 1);
        assert_eq!(u32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]), 123_456);
        // xp = score / 1000
        assert_eq!(u32::from_be_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]), 123);
    }

    #[test]
    fn chat_text_is_clamped_to_sixty_four() {
        let long = vec![b'a'; 100];
        let bytes = chat_message(EntityId(1), &long);
        assert_eq!(bytes.len(), 1 + 1 + MAX_CHAT_LEN);
    }

    #[test]
    fn neutral_capture_frame_lists_garrison() {
        let world = test_world();
        let player = world
            .add_player(ClientHandle::detached(), crate::network::registry::ConnId(0), Permission::None, b"cap", [1, 2, 3], 0)
            .unwrap();
        let neutral = world.neutral_bases[0].clone();

        let unowned = neutral_base_captured(&neutral);
        assert_eq!(unowned.len(), 2, "uncaptured frame is just the id");

        neutral.set_captured(Some(&player));
        let owned = neutral_base_captured(&neutral);
        // id + playerId + 22 buildings x (1+1+1+8).
        assert_eq!(owned.len(), 1 + 1 + 1 + 22 * 11);
    }
}
