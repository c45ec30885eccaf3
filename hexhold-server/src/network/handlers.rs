//! Intent handlers.
//!
//! One function per client frame kind. Validation failures are logged and
//! dropped (or answered with a targeted failure frame); only the anti-cheat
//! heuristics escalate to a kick.

use std::f64::consts::PI;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, warn};

use crate::core::ids::EntityId;
use crate::core::position::WorldPos;
use crate::game::base::Base;
use crate::game::catalog::{self, BuildingKind, BuildingVariant};
use crate::game::config::{
    KickReason, COMMANDER_COST, NEUTRAL_BASE_MAX_BUILDING_RADIUS,
    NEUTRAL_BASE_MIN_BUILDING_RADIUS, PLAYER_MAX_BUILDING_RADIUS, PLAYER_MIN_BUILDING_RADIUS,
    REPAIR_COST,
};
use crate::game::events::GameEvent;
use crate::game::player::{MovementPackage, MovementVerdict, Player};
use crate::game::unit::Unit;
use crate::network::encode;
use crate::network::protocol::{self, frame, MAX_CHAT_LEN};
use crate::network::registry::ConnId;
use crate::network::server::ServerShared;

const RESYNC_COOLDOWN: Duration = Duration::from_secs(10);

/// Dispatch one inbound frame.
pub async fn handle_frame(shared: &Arc<ServerShared>, conn_id: ConnId, data: &[u8]) {
    let Some((&frame_type, payload)) = data.split_first() else {
        debug!("empty frame");
        return;
    };
    match frame_type {
        frame::HEARTBEAT => {}
        frame::JOIN => handle_join(shared, conn_id, payload).await,
        frame::CLIENT_PLACE_BUILDING => handle_place_building(shared, conn_id, payload).await,
        frame::CLIENT_UPGRADE_BUILDINGS => handle_upgrade(shared, conn_id, payload).await,
        frame::CLIENT_DESTROY_BUILDINGS => handle_destroy(shared, conn_id, payload).await,
        frame::CLIENT_MOVE_UNITS => handle_move_units(shared, conn_id, payload).await,
        frame::CLIENT_TOGGLE_UNIT_SPAWNING => handle_toggle_spawning(shared, conn_id, payload).await,
        frame::CLIENT_BUY_COMMANDER => handle_buy_commander(shared, conn_id, payload).await,
        frame::CLIENT_BUY_REPAIR => handle_buy_repair(shared, conn_id, payload).await,
        frame::CLIENT_CAMERA_UPDATE => handle_camera_update(shared, conn_id, payload).await,
        frame::CLIENT_REQUEST_RESYNC => handle_resync(shared, conn_id).await,
        frame::CLIENT_REQUEST_SKIN_DATA => handle_skin_request(shared, conn_id).await,
        frame::CLIENT_CHAT_MESSAGE => handle_chat(shared, conn_id, payload).await,
        other => debug!(frame = other, "unsupported frame type"),
    }
}

fn player_for(shared: &ServerShared, conn_id: ConnId) -> Option<Arc<Player>> {
    let player_id = shared.registry.player_id(conn_id)?;
    shared.world.player(player_id).filter(|p| !p.is_removed())
}

async fn send_error(shared: &ServerShared, conn_id: ConnId) {
    if let Some(handle) = shared.registry.handle(conn_id) {
        handle.send(encode::error_frame()).await;
    }
}

// =============================================================================
// JOIN
// =============================================================================

async fn handle_join(shared: &Arc<ServerShared>, conn_id: ConnId, payload: &[u8]) {
    let intent = match protocol::parse_join(payload) {
        Ok(intent) => intent,
        Err(error) => {
            debug!(%error, "bad join payload");
            return;
        }
    };
    if shared.is_rebooting() {
        send_error(shared, conn_id).await;
        return;
    }
    let Some(profile) = shared.registry.profile(conn_id) else {
        send_error(shared, conn_id).await;
        return;
    };
    if shared.registry.player_id(conn_id).is_some() {
        debug!(conn = conn_id.0, "connection already joined");
        return;
    }

    // One join per fingerprint per IP.
    if shared
        .registry
        .is_fingerprint_used(&profile.client_ip, intent.fingerprint)
    {
        send_error(shared, conn_id).await;
        return;
    }
    shared.registry.add_fingerprint(conn_id, intent.fingerprint);

    // One concurrent game per Discord account.
    if let Some(discord_id) = &profile.discord_id {
        if shared.registry.is_discord_playing(discord_id) {
            send_error(shared, conn_id).await;
            return;
        }
        shared.registry.add_playing_discord(discord_id);
    }

    let raw_name = String::from_utf8_lossy(&intent.name).into_owned();
    let clean_name = shared.filter.clean(&raw_name);

    // Default skins are claimed by name; account skins must be unlocked.
    let skin = shared.skins.default_by_name(&clean_name).or_else(|| {
        profile
            .unlocked_skins
            .contains(&i64::from(intent.equipped_skin))
            .then(|| shared.skins.by_id(intent.equipped_skin))
            .flatten()
    });
    let skin_id = skin.map(|s| s.id).unwrap_or(0);
    let color = skin.and_then(|s| s.base_color).unwrap_or_else(|| {
        shared.palette[rand::thread_rng().gen_range(0..shared.palette.len())]
    });

    let permission = crate::network::auth::role_to_permission(&profile.role);
    let Some(handle) = shared.registry.handle(conn_id) else {
        return;
    };
    let Some(player) = shared.world.add_player(
        handle,
        conn_id,
        permission,
        clean_name.as_bytes(),
        color,
        skin_id,
    ) else {
        warn!("failed to admit player (world full)");
        send_error(shared, conn_id).await;
        return;
    };
    shared.registry.set_player(conn_id, player.id);

    // Initial state: the world without us, then everyone's unit facings, any
    // parked trapper bullets, and finally our own identity record.
    shared.broadcaster.send_game_state(&player, Some(player.id)).await;
    shared.broadcaster.send_units_rotations(&player).await;
    shared.broadcaster.send_trapper_bullets(&player).await;
    shared
        .broadcaster
        .send_to(&player, encode::initial_player_data(&player))
        .await;
    shared
        .broadcaster
        .broadcast_except(encode::player_joined(&player), player.id)
        .await;

    let changes = shared.world.update_leaderboard();
    shared.broadcaster.send_initial_leaderboard(&player).await;
    if let Some(changes) = changes {
        shared
            .broadcaster
            .broadcast_except(encode::leaderboard_update(&changes), player.id)
            .await;
    }
}

// =============================================================================
// BUILD / UPGRADE / DESTROY
// =============================================================================

/// Radial placement window for `kind` around a player base and around a
/// captured neutral base, before tolerance.
fn placement_rings(kind: BuildingKind) -> (f64, f64, f64, f64) {
    let size = f64::from(catalog::building_size(kind));
    let (mut min_player, max_player) = (PLAYER_MIN_BUILDING_RADIUS, PLAYER_MAX_BUILDING_RADIUS);
    let (mut min_neutral, max_neutral) = (
        NEUTRAL_BASE_MIN_BUILDING_RADIUS,
        NEUTRAL_BASE_MAX_BUILDING_RADIUS,
    );
    match kind {
        // Barracks sit exactly on the outer ring.
        BuildingKind::Barracks => {
            min_player = PLAYER_MAX_BUILDING_RADIUS;
            min_neutral = NEUTRAL_BASE_MAX_BUILDING_RADIUS;
        }
        BuildingKind::Generator | BuildingKind::House => {
            min_player += size - 6.0;
            min_neutral += size - 6.0;
        }
        _ => {
            min_player += size;
            min_neutral += size;
        }
    }
    (min_player, max_player, min_neutral, max_neutral)
}

/// Any other player's live unit sitting on the footprint blocks placement
/// (wall spam defense).
fn overlaps_enemy_units(shared: &ServerShared, player: &Player, kind: BuildingKind, position: WorldPos) -> bool {
    let building_size = catalog::building_size(kind);
    for other in shared.world.players_snapshot() {
        if other.id == player.id || other.is_removed() {
            continue;
        }
        for unit in other.units_snapshot() {
            if unit.is_removed() {
                continue;
            }
            if position.within_radius(unit.position(), (building_size + unit.size) as f32) {
                return true;
            }
        }
    }
    false
}

async fn handle_place_building(shared: &Arc<ServerShared>, conn_id: ConnId, payload: &[u8]) {
    let intent = match protocol::parse_place_building(payload) {
        Ok(intent) => intent,
        Err(error) => {
            debug!(%error, "bad place-building payload");
            return;
        }
    };
    let Some(player) = player_for(shared, conn_id) else {
        return;
    };
    if !player.can_perform_building_action() {
        shared.world.events.emit(GameEvent::Kick {
            player: player.clone(),
            reason: KickReason::Scripting,
        });
        return;
    }
    let Some(kind) = catalog::validate_building_kind(intent.kind) else {
        debug!(kind = intent.kind, "invalid building type");
        return;
    };

    let position = intent.position;
    let (min_player, max_player, min_neutral, max_neutral) = placement_rings(kind);
    let tolerance = 2.0;

    let anchor = player.base.anchor();
    let distance = f64::from(position.distance_to(anchor));

    let player_ring_ok = if kind == BuildingKind::Barracks {
        distance.floor() >= max_player - tolerance && distance.ceil() <= max_player + tolerance
    } else {
        !(distance.floor() > max_player + tolerance || distance.ceil() < min_player - tolerance)
    };

    // Fall back to any captured neutral base whose ring admits the spot.
    let mut base: Arc<Base> = player.base.clone();
    let mut ring_ok = player_ring_ok;
    if !ring_ok {
        for neutral in player.captured_snapshot() {
            let d = f64::from(position.distance_to(neutral.base.anchor()));
            if d >= min_neutral - tolerance && d <= max_neutral + tolerance {
                base = neutral.base.clone();
                ring_ok = true;
                break;
            }
        }
    }
    if !ring_ok {
        shared
            .broadcaster
            .send_to(&player, encode::building_placement_failed(intent.kind))
            .await;
        return;
    }

    let Some(cost) = catalog::building_cost(kind, BuildingVariant::BASIC) else {
        return;
    };
    if !player.power.decrement(cost) {
        shared
            .broadcaster
            .send_to(&player, encode::building_placement_failed(intent.kind))
            .await;
        return;
    }

    // Post-deduction failures refund the cost.
    if !base.placement_clear(kind, position)
        || overlaps_enemy_units(shared, &player, kind, position)
    {
        player.power.increment(cost);
        shared
            .broadcaster
            .send_to(&player, encode::building_placement_failed(intent.kind))
            .await;
        return;
    }
    let Some(building) = base.add_building(&player, kind, position) else {
        player.power.increment(cost);
        shared
            .broadcaster
            .send_to(&player, encode::building_placement_failed(intent.kind))
            .await;
        return;
    };

    if let Some(power) = catalog::resource_generation(kind, BuildingVariant::BASIC) {
        player.raise_generation(power);
    }
    if let Some(capacity) = catalog::population_capacity(kind, BuildingVariant::BASIC) {
        player.population.increment_capacity(capacity);
    }
    player.touch_activity();

    let active = (kind == BuildingKind::Barracks)
        .then(|| player.unit_spawner_for(&building).map(|s| s.is_activated()))
        .flatten();
    shared
        .broadcaster
        .broadcast_all(encode::building_placed(base.owner, &building, active))
        .await;
}

/// Resolve the base an intent with a neutral-base flag refers to; the
/// neutral base must be captured by the acting player.
fn resolve_base(player: &Arc<Player>, neutral_id: Option<u8>) -> Option<Arc<Base>> {
    match neutral_id {
        None => Some(player.base.clone()),
        Some(id) => player
            .captured_by_id(EntityId(id))
            .map(|neutral| neutral.base.clone()),
    }
}

async fn handle_upgrade(shared: &Arc<ServerShared>, conn_id: ConnId, payload: &[u8]) {
    let intent = match protocol::parse_upgrade(payload) {
        Ok(intent) => intent,
        Err(error) => {
            debug!(%error, "bad upgrade payload");
            return;
        }
    };
    let Some(player) = player_for(shared, conn_id) else {
        return;
    };
    if !player.can_perform_building_action() {
        shared.world.events.emit(GameEvent::Kick {
            player: player.clone(),
            reason: KickReason::Scripting,
        });
        return;
    }
    let Some(base) = resolve_base(&player, intent.neutral_base) else {
        debug!("upgrade on uncaptured neutral base");
        return;
    };
    let variant = BuildingVariant(intent.variant);

    let mut upgraded = Vec::new();
    for &raw_id in &intent.building_ids {
        let building_id = EntityId(raw_id);
        let Some(building) = base.building(building_id) else {
            debug!(building = raw_id, "upgrade target not found");
            break;
        };
        if !catalog::validate_upgrade_path(building.kind, building.variant(), variant) {
            debug!(
                kind = ?building.kind,
                current = building.variant().raw(),
                target = variant.raw(),
                "invalid upgrade path"
            );
            break;
        }
        let Some(cost) = catalog::building_cost(building.kind, variant) else {
            break;
        };
        if !player.power.decrement(cost) {
            break;
        }

        // Yield deltas: retire the old variant's contribution, add the new.
        if let Some(power) = catalog::resource_generation(building.kind, building.variant()) {
            player.reduce_generation(power);
        }
        if let Some(power) = catalog::resource_generation(building.kind, variant) {
            player.raise_generation(power);
        }
        if let Some(capacity) = catalog::population_capacity(building.kind, building.variant()) {
            player.population.decrement_capacity(capacity);
        }
        if let Some(capacity) = catalog::population_capacity(building.kind, variant) {
            player.population.increment_capacity(capacity);
        }

        let mut was_spawning_active = false;
        match building.kind {
            BuildingKind::Barracks => {
                if let Some(spawner) = player.unit_spawner_for(&building) {
                    was_spawning_active = spawner.is_activated();
                }
                player.remove_unit_spawner(&building);
            }
            k if k.is_turret() => base.remove_bullet_spawner(&building),
            _ => {}
        }

        if !base.upgrade_building(building_id, variant) {
            player.power.increment(cost);
            break;
        }

        match building.kind {
            BuildingKind::Barracks => {
                player.add_unit_spawner(building.clone(), was_spawning_active);
            }
            k if k.is_turret() => {
                base.add_bullet_spawner(&building);
            }
            _ => {}
        }
        upgraded.push(building_id);
    }

    player.touch_activity();
    if !upgraded.is_empty() {
        shared
            .broadcaster
            .broadcast_all(encode::buildings_upgraded(base.owner, variant.raw(), &upgraded))
            .await;
    }
}

async fn handle_destroy(shared: &Arc<ServerShared>, conn_id: ConnId, payload: &[u8]) {
    let intent = match protocol::parse_destroy(payload) {
        Ok(intent) => intent,
        Err(error) => {
            debug!(%error, "bad destroy payload");
            return;
        }
    };
    let Some(player) = player_for(shared, conn_id) else {
        return;
    };
    if !player.can_perform_building_action() {
        shared.world.events.emit(GameEvent::Kick {
            player: player.clone(),
            reason: KickReason::Scripting,
        });
        return;
    }
    let Some(base) = resolve_base(&player, intent.neutral_base) else {
        return;
    };

    let mut destroyed = Vec::new();
    for &raw_id in &intent.building_ids {
        let building_id = EntityId(raw_id);
        if base.remove_building(Some(&player), building_id).is_some() {
            destroyed.push(building_id);
        } else {
            debug!(building = raw_id, "destroy target not found");
        }
    }

    player.touch_activity();
    if !destroyed.is_empty() {
        shared
            .broadcaster
            .broadcast_all(encode::buildings_destroyed(base.owner, &destroyed))
            .await;
    }
}

// =============================================================================
// UNIT MOVEMENT
// =============================================================================

/// Minimum time between re-targets of one unit.
const RETARGET_COOLDOWN: Duration = Duration::from_millis(50);
/// Ring spacing of the arrival formation.
const FORMATION_SPACING: f64 = 50.0;
/// Per-axis random jitter applied to formation slots.
const FORMATION_JITTER: f32 = 50.0;

async fn handle_move_units(shared: &Arc<ServerShared>, conn_id: ConnId, payload: &[u8]) {
    let intent = match protocol::parse_move_units(payload) {
        Ok(intent) => intent,
        Err(error) => {
            debug!(%error, "bad move-units payload");
            return;
        }
    };
    let Some(player) = player_for(shared, conn_id) else {
        return;
    };
    player.touch_activity();

    // Filter to units we own, alive, and not re-targeted within the cooldown.
    let mut units: Vec<Arc<Unit>> = Vec::with_capacity(intent.unit_ids.len());
    let mut unit_positions = Vec::with_capacity(intent.unit_ids.len());
    for &raw_id in &intent.unit_ids {
        let Some(unit) = player.unit(EntityId(raw_id)) else {
            continue;
        };
        if unit.is_removed() || unit.last_target_update().elapsed() < RETARGET_COOLDOWN {
            continue;
        }
        unit_positions.push(unit.position().to_tile());
        units.push(unit);
    }

    let package = MovementPackage {
        timestamp: Some(Instant::now()),
        target: intent.target,
        unit_positions,
        unit_ids: intent.unit_ids.clone(),
    };
    match player.register_movement(package) {
        MovementVerdict::Suspicious { kick } => {
            if kick {
                warn!(player = %player.id, "kicking for scripted unit movement");
                shared.world.events.emit(GameEvent::Kick {
                    player: player.clone(),
                    reason: KickReason::Scripting,
                });
            }
            return;
        }
        MovementVerdict::Applied => {}
    }

    if units.is_empty() {
        return;
    }
    let target = WorldPos::new(f32::from(intent.target.x), f32::from(intent.target.y));

    if units.len() == 1 {
        units[0].set_target(target);
    } else {
        distribute_on_rings(&units, target);
    }

    let rotations: Vec<(EntityId, f32)> = units.iter().map(|u| (u.id, u.rotation())).collect();
    shared.world.events.emit(GameEvent::UnitsRotationUpdate {
        player_id: player.id,
        units: rotations,
    });
}

/// Spread units over concentric rings around the target; each slot gets a
/// small random offset, and the unit closest to the target is sent to the
/// exact point.
fn distribute_on_rings(units: &[Arc<Unit>], target: WorldPos) {
    let mut rng = rand::thread_rng();
    let mut radius = FORMATION_SPACING;
    let mut placed = 0usize;
    let mut nearest: (usize, f32) = (0, f32::MAX);

    while placed < units.len() {
        let circumference = 2.0 * PI * radius;
        let slots = (circumference / FORMATION_SPACING) as usize;
        if slots == 0 {
            break;
        }
        for slot in 0..slots {
            if placed >= units.len() {
                break;
            }
            let angle = slot as f64 * (2.0 * PI / slots as f64);
            let x = target.x
                + (radius * angle.cos()) as f32
                + (rng.gen::<f32>() - 0.5) * FORMATION_JITTER;
            let y = target.y
                + (radius * angle.sin()) as f32
                + (rng.gen::<f32>() - 0.5) * FORMATION_JITTER;
            units[placed].set_target(WorldPos::new(x, y));

            let distance = units[placed].position().distance_to(target);
            if distance < nearest.1 {
                nearest = (placed, distance);
            }
            placed += 1;
        }
        radius += FORMATION_SPACING;
    }

    units[nearest.0].set_target(target);
}

// =============================================================================
// TOGGLES AND PURCHASES
// =============================================================================

async fn handle_toggle_spawning(shared: &Arc<ServerShared>, conn_id: ConnId, payload: &[u8]) {
    let intent = match protocol::parse_toggle_spawning(payload) {
        Ok(intent) => intent,
        Err(error) => {
            debug!(%error, "bad toggle payload");
            return;
        }
    };
    let Some(player) = player_for(shared, conn_id) else {
        return;
    };
    let Some(base) = resolve_base(&player, intent.neutral_base) else {
        return;
    };
    let Some(building) = base.building(EntityId(intent.building_id)) else {
        return;
    };
    let Some(spawner) = player.toggle_unit_spawner(&building) else {
        return;
    };
    shared
        .broadcaster
        .broadcast_all(encode::barracks_activation_update(
            base.owner,
            building.id,
            spawner.is_activated(),
        ))
        .await;
}

async fn handle_buy_commander(shared: &Arc<ServerShared>, conn_id: ConnId, payload: &[u8]) {
    if !payload.is_empty() {
        return;
    }
    let Some(player) = player_for(shared, conn_id) else {
        return;
    };
    if player.has_commander() {
        return;
    }
    if !player.power.decrement(COMMANDER_COST) {
        return;
    }
    let Some(commander) = player.add_commander() else {
        player.power.increment(COMMANDER_COST);
        return;
    };
    shared
        .broadcaster
        .broadcast_all(encode::unit_spawn(
            player.base.owner,
            encode::COMMANDER_BARRACKS_ID,
            &commander,
        ))
        .await;
}

async fn handle_buy_repair(shared: &Arc<ServerShared>, conn_id: ConnId, payload: &[u8]) {
    if !payload.is_empty() {
        return;
    }
    let Some(player) = player_for(shared, conn_id) else {
        return;
    };
    if !player.power.decrement(REPAIR_COST) {
        return;
    }
    player.base.repair();
    shared
        .broadcaster
        .broadcast_all(encode::base_health_update(
            player.base.owner,
            player.base.health.current(),
        ))
        .await;
}

// =============================================================================
// CAMERA / RESYNC / SKINS / CHAT
// =============================================================================

async fn handle_camera_update(shared: &Arc<ServerShared>, conn_id: ConnId, payload: &[u8]) {
    let intent = match protocol::parse_camera_update(payload) {
        Ok(intent) => intent,
        Err(error) => {
            debug!(%error, "bad camera payload");
            return;
        }
    };
    let Some(player) = player_for(shared, conn_id) else {
        return;
    };
    {
        let mut camera = player.camera.lock().unwrap();
        if !camera.can_update() {
            return;
        }
        camera.position = intent.position;
        camera.set_zoom(f32::from(intent.zoom_tenths) / 10.0);
        camera.update_bounds();
        camera.touch();
    }
    // The camera-scoped selective resend of unit positions stays disabled
    // until the product decides it wants per-view updates at all.
}

async fn handle_resync(shared: &Arc<ServerShared>, conn_id: ConnId) {
    let Some(player) = player_for(shared, conn_id) else {
        return;
    };
    if !player.try_resync(RESYNC_COOLDOWN) {
        return;
    }
    shared.broadcaster.send_game_state(&player, None).await;
    shared.broadcaster.send_units_rotations(&player).await;
    shared.broadcaster.send_trapper_bullets(&player).await;
    shared.broadcaster.send_initial_leaderboard(&player).await;
}

async fn handle_skin_request(shared: &Arc<ServerShared>, conn_id: ConnId) {
    if let Some(handle) = shared.registry.handle(conn_id) {
        handle.send(encode::skin_data(&shared.skins)).await;
    }
}

async fn handle_chat(shared: &Arc<ServerShared>, conn_id: ConnId, payload: &[u8]) {
    if payload.is_empty() || payload.len() > MAX_CHAT_LEN {
        debug!(len = payload.len(), "bad chat payload length");
        return;
    }
    let Some(player) = player_for(shared, conn_id) else {
        return;
    };
    player.touch_activity();

    let message = String::from_utf8_lossy(payload).into_owned();
    if !shared.registry.admit_chat_message(player.id, &message) {
        return;
    }
    let clean = shared.filter.clean(&message);
    shared
        .broadcaster
        .broadcast_all(encode::chat_message(player.id, clean.as_bytes()))
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::position::TilePos;
    use crate::game::catalog::{UnitKind, UnitVariant};
    use crate::game::player::Permission;

    #[test]
    fn placement_rings_per_kind() {
        // Barracks: outer ring only.
        let (min_p, max_p, min_n, _) = placement_rings(BuildingKind::Barracks);
        assert_eq!(min_p, PLAYER_MAX_BUILDING_RADIUS);
        assert_eq!(max_p, PLAYER_MAX_BUILDING_RADIUS);
        assert_eq!(min_n, NEUTRAL_BASE_MAX_BUILDING_RADIUS);

        // Houses tuck six units closer than their footprint would suggest.
        let (min_p, _, _, _) = placement_rings(BuildingKind::House);
        assert_eq!(min_p, PLAYER_MIN_BUILDING_RADIUS + 35.0 - 6.0);

        // Everything else offsets by the full footprint.
        let (min_p, _, _, _) = placement_rings(BuildingKind::Wall);
        assert_eq!(min_p, PLAYER_MIN_BUILDING_RADIUS + 30.0);
    }

    #[test]
    fn ring_formation_covers_all_units_and_hits_target() {
        let player = Player::for_tests(EntityId(1), TilePos::new(0, 0), Permission::None);
        let barracks = player
            .base
            .add_building(&player, BuildingKind::Barracks, WorldPos::new(355.0, 0.0))
            .unwrap();
        let units: Vec<Arc<Unit>> = (0..8)
            .map(|_| {
                player
                    .add_unit(UnitKind::Soldier, UnitVariant::BASIC, &barracks)
                    .unwrap()
            })
            .collect();

        let target = WorldPos::new(1000.0, 1000.0);
        distribute_on_rings(&units, target);

        let mut exact = 0;
        for unit in &units {
            let d = unit.target().distance_to(target);
            if d == 0.0 {
                exact += 1;
            } else {
                // Ring spacing 50, grows per layer, jitter ±25 per axis.
                assert!(d <= 2.0 * FORMATION_SPACING as f32 + FORMATION_JITTER);
            }
        }
        assert_eq!(exact, 1, "exactly one unit takes the exact target");
    }
}
