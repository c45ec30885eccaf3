//! The periodic simulation loops.
//!
//! Seven independent timers drive the world: regeneration, inactivity,
//! protection expiry, resource/score income, unit production, turret
//! targeting and the entity-update/collision tick. Every loop snapshots the
//! collections it walks while holding the parent read lock, drops the lock,
//! then mutates entities under their own locks.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use crate::game::base::Base;
use crate::game::building::Building;
use crate::game::bullet::BulletSpawner;
use crate::game::catalog::{self, BulletBehavior};
use crate::game::collision;
use crate::game::config::{
    HEALTH_REGENERATION_PERIOD, KickReason, PLAYER_HEALTH_REGENERATION, PLAYER_TIMEOUT,
};
use crate::game::events::GameEvent;
use crate::game::neutral::NeutralBase;
use crate::game::player::Player;
use crate::game::unit::Unit;
use crate::game::world::World;

const TARGETING_PERIOD: Duration = Duration::from_millis(100);
const ENTITY_UPDATE_PERIOD: Duration = Duration::from_millis(50);

/// Spawn all simulation loops onto the runtime.
pub fn spawn_loops(world: Arc<World>) {
    tokio::spawn(regeneration_loop(world.clone()));
    tokio::spawn(inactivity_loop(world.clone()));
    tokio::spawn(protection_loop(world.clone()));
    tokio::spawn(resource_loop(world.clone()));
    tokio::spawn(unit_spawn_loop(world.clone()));
    tokio::spawn(targeting_loop(world.clone()));
    tokio::spawn(entity_update_loop(world));
}

// =============================================================================
// REGENERATION (30 s)
// =============================================================================

async fn regeneration_loop(world: Arc<World>) {
    let mut ticker = interval(HEALTH_REGENERATION_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        for player in world.players_snapshot() {
            regenerate_base(&world, &player.base);
            for neutral in player.captured_snapshot() {
                regenerate_base(&world, &neutral.base);
            }
        }
    }
}

fn regenerate_base(world: &World, base: &Base) {
    if base.health.is_full() {
        return;
    }
    base.health.increment(PLAYER_HEALTH_REGENERATION);
    world.events.emit(GameEvent::BaseHealthUpdate {
        owner: base.owner,
        health: base.health.current(),
    });
}

// =============================================================================
// INACTIVITY (30 s)
// =============================================================================

async fn inactivity_loop(world: Arc<World>) {
    let mut ticker = interval(Duration::from_secs(30));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        for player in world.players_snapshot() {
            if player.last_activity().elapsed() > PLAYER_TIMEOUT {
                debug!(player = %player.id, "idle timeout");
                player.mark_removed();
                world.events.emit(GameEvent::Kick {
                    player: player.clone(),
                    reason: KickReason::Timeout,
                });
            }
        }
    }
}

// =============================================================================
// SPAWN PROTECTION (1 s)
// =============================================================================

async fn protection_loop(world: Arc<World>) {
    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        for player in world.players_snapshot() {
            if player.protection_expired() && player.clear_protection() {
                world.events.emit(GameEvent::RemoveSpawnProtection {
                    player_id: player.id,
                });
            }
        }
    }
}

// =============================================================================
// RESOURCES & SCORE (1 s)
// =============================================================================

async fn resource_loop(world: Arc<World>) {
    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        for player in world.players_snapshot() {
            let generating = player.generation();
            player.power.increment(generating);

            let captured = player.captured_count() as i32;
            let income = i32::from(generating) - 1
                + captured * crate::game::config::NEUTRAL_BASE_CAPTURE_SCORE as i32;
            if income > 0 {
                world.award_score(&player, income as u32);
            }

            world.events.emit(GameEvent::ResourceUpdate {
                player: player.clone(),
            });
        }
    }
}

// =============================================================================
// UNIT PRODUCTION (1 s)
// =============================================================================

async fn unit_spawn_loop(world: Arc<World>) {
    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        for player in world.active_players() {
            run_unit_production(&world, &player);
        }
    }
}

fn run_unit_production(world: &World, player: &Arc<Player>) {
    for spawner in player.unit_spawners_snapshot() {
        if !spawner.is_activated() || spawner.barracks.is_removed() {
            continue;
        }

        spawner.frequency.decrement(1);
        if spawner.frequency.get() != 0 {
            continue;
        }

        let Some(required) = catalog::required_population(spawner.unit_kind) else {
            continue;
        };
        if !player.population.increment_used(required) {
            // Population-capped: the countdown stays pinned at zero.
            continue;
        }

        let Some(unit) = player.add_unit(spawner.unit_kind, spawner.unit_variant, &spawner.barracks)
        else {
            player.population.decrement_used(required);
            continue;
        };
        spawner.frequency.reset();
        player.add_unit_bullet_spawner(&unit);

        world.events.emit(GameEvent::UnitSpawn {
            owner: spawner.barracks.owner,
            barracks_id: spawner.barracks.id,
            unit,
        });
    }
}

// =============================================================================
// TARGETING (100 ms)
// =============================================================================

async fn targeting_loop(world: Arc<World>) {
    let mut ticker = interval(TARGETING_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;

        let players: Arc<Vec<Arc<Player>>> = Arc::new(world.active_players());
        let neutrals = world.neutral_bases.clone();

        // Fan out one task per player and per neutral base; join at tick end.
        let mut tasks = JoinSet::new();
        for player in players.iter().cloned() {
            let world = world.clone();
            let players = players.clone();
            let neutrals = neutrals.clone();
            tasks.spawn(async move {
                process_base_turrets(&world, &player.base, Some(&player), players.as_slice());
                process_unit_turrets(&world, &player, players.as_slice(), &neutrals);
            });
        }
        for neutral in neutrals.iter().cloned() {
            let world = world.clone();
            let players = players.clone();
            tasks.spawn(async move {
                let capturer = neutral.captured_by();
                process_base_turrets(&world, &neutral.base, capturer.as_ref(), players.as_slice());
            });
        }
        while tasks.join_next().await.is_some() {}
    }
}

/// Turrets mounted on a base: tick the countdown and fire at the nearest
/// enemy unit in range.
fn process_base_turrets(
    world: &World,
    base: &Base,
    exclude: Option<&Arc<Player>>,
    players: &[Arc<Player>],
) {
    let decrement = TARGETING_PERIOD.as_millis() as u16;
    for spawner in base.bullet_spawners_snapshot() {
        if spawner.shooter.is_removed() {
            continue;
        }
        spawner.frequency.decrement(decrement);
        if spawner.frequency.get() != 0 {
            continue;
        }

        let Some(target) = find_closest_unit(&spawner, players, exclude) else {
            continue;
        };
        spawner.frequency.reset();
        let target_position = target.position();

        if let Some(bullet) = base.add_bullet(&spawner, target_position, 0.0) {
            let turret_position = spawner.shooter.position();
            let angle = f64::from(target_position.y - turret_position.y)
                .atan2(f64::from(target_position.x - turret_position.x));
            let turret_id = match &spawner.shooter {
                crate::game::bullet::Shooter::Building(b) => b.id,
                crate::game::bullet::Shooter::Unit(u) => u.id,
            };
            world.events.emit(GameEvent::TurretRotationUpdate {
                owner: base.owner,
                turret_id,
                angle: angle as f32,
            });
            world.events.emit(GameEvent::BulletSpawn {
                owner: base.owner,
                turret_id,
                bullet_id: bullet.id,
                position: bullet.position(),
            });
        }
    }
}

/// Cannon units and commanders: prefer enemy units, then enemy buildings,
/// then buildings of uncaptured neutral bases.
fn process_unit_turrets(
    world: &World,
    player: &Arc<Player>,
    players: &[Arc<Player>],
    neutrals: &[Arc<NeutralBase>],
) {
    let decrement = TARGETING_PERIOD.as_millis() as u16;
    for spawner in player.unit_bullet_spawners_snapshot() {
        if spawner.shooter.is_removed() {
            continue;
        }
        spawner.frequency.decrement(decrement);
        if spawner.frequency.get() != 0 {
            continue;
        }

        let unit_id = match &spawner.shooter {
            crate::game::bullet::Shooter::Unit(u) => u.id,
            crate::game::bullet::Shooter::Building(_) => continue,
        };

        let target_position = find_closest_unit(&spawner, players, Some(player))
            .map(|u| u.position())
            .or_else(|| {
                find_closest_enemy_building(&spawner, players, player).map(|b| b.position)
            })
            .or_else(|| {
                find_closest_neutral_building(&spawner, neutrals, player).map(|b| b.position)
            });
        let Some(target_position) = target_position else {
            continue;
        };

        spawner.frequency.reset();
        if let Some(bullet) = player.base.add_bullet(&spawner, target_position, 0.0) {
            world.events.emit(GameEvent::UnitBulletSpawn {
                player_id: player.id,
                unit_id,
                bullet_id: bullet.id,
                position: bullet.position(),
            });
        }
    }
}

fn find_closest_unit(
    spawner: &BulletSpawner,
    players: &[Arc<Player>],
    exclude: Option<&Arc<Player>>,
) -> Option<Arc<Unit>> {
    let origin = spawner.shooter.position();
    let range = spawner.range as f32;
    let mut closest: Option<(Arc<Unit>, f32)> = None;

    for other in players {
        if exclude.map(|p| p.id == other.id).unwrap_or(false)
            || other.is_removed()
            || other.has_protection()
        {
            continue;
        }
        for unit in other.units_snapshot() {
            if unit.is_removed() {
                continue;
            }
            let distance = origin.distance_to(unit.position());
            if distance > range {
                continue;
            }
            if closest.as_ref().map(|(_, d)| distance < *d).unwrap_or(true) {
                closest = Some((unit, distance));
            }
        }
    }
    closest.map(|(unit, _)| unit)
}

fn find_closest_enemy_building(
    spawner: &BulletSpawner,
    players: &[Arc<Player>],
    player: &Arc<Player>,
) -> Option<Arc<Building>> {
    let origin = spawner.shooter.position();
    let range = spawner.range as f32;
    let mut closest: Option<(Arc<Building>, f32)> = None;

    for other in players {
        if other.id == player.id || other.is_removed() || other.has_protection() {
            continue;
        }
        for building in other.base.buildings_snapshot() {
            if building.is_removed() {
                continue;
            }
            let distance = origin.distance_to(building.position);
            if distance > range {
                continue;
            }
            if closest.as_ref().map(|(_, d)| distance < *d).unwrap_or(true) {
                closest = Some((building, distance));
            }
        }
    }
    closest.map(|(building, _)| building)
}

fn find_closest_neutral_building(
    spawner: &BulletSpawner,
    neutrals: &[Arc<NeutralBase>],
    player: &Arc<Player>,
) -> Option<Arc<Building>> {
    let origin = spawner.shooter.position();
    let range = spawner.range as f32;
    let mut closest: Option<(Arc<Building>, f32)> = None;

    for neutral in neutrals {
        if neutral.is_captured_by(player) {
            continue;
        }
        for building in neutral.base.buildings_snapshot() {
            if building.is_removed() {
                continue;
            }
            let distance = origin.distance_to(building.position);
            if distance > range {
                continue;
            }
            if closest.as_ref().map(|(_, d)| distance < *d).unwrap_or(true) {
                closest = Some((building, distance));
            }
        }
    }
    closest.map(|(building, _)| building)
}

// =============================================================================
// ENTITY UPDATE + COLLISIONS (50 ms)
// =============================================================================

async fn entity_update_loop(world: Arc<World>) {
    let mut ticker = interval(ENTITY_UPDATE_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;

        let players = world.active_players();
        let neutrals = &world.neutral_bases;

        for player in &players {
            update_bullets(&world, &player.base, ENTITY_UPDATE_PERIOD);
            update_units(&world, player, ENTITY_UPDATE_PERIOD);
        }
        for neutral in neutrals {
            update_bullets(&world, &neutral.base, ENTITY_UPDATE_PERIOD);
        }

        collision::resolve(&world, &players, neutrals);
    }
}

fn update_bullets(world: &World, base: &Base, dt: Duration) {
    for bullet in base.bullets_snapshot() {
        if bullet.is_removed() {
            continue;
        }

        // A parked trapper just counts down its linger time.
        if bullet.behavior == BulletBehavior::Trapper && bullet.has_reached_target() {
            if bullet.tick_stay(dt) {
                world.events.emit(GameEvent::BulletRemove {
                    owner: base.owner,
                    bullet_id: bullet.id,
                });
                bullet.mark_removed();
                base.remove_bullet(bullet.id);
            }
            continue;
        }

        if !bullet.advance(dt) {
            if bullet.behavior != BulletBehavior::Trapper {
                world.events.emit(GameEvent::BulletRemove {
                    owner: base.owner,
                    bullet_id: bullet.id,
                });
                bullet.mark_removed();
                base.remove_bullet(bullet.id);
            }
            continue;
        }

        world.events.emit(GameEvent::BulletPositionUpdate {
            owner: base.owner,
            bullet_id: bullet.id,
            position: bullet.position(),
        });
    }
}

fn update_units(world: &World, player: &Arc<Player>, dt: Duration) {
    let mut moved = Vec::new();
    for unit in player.units_snapshot() {
        if unit.is_removed() {
            continue;
        }
        if unit.advance(dt) {
            moved.push((unit.id, unit.position()));
        }
    }
    if !moved.is_empty() {
        world.events.emit(GameEvent::UnitPositionUpdates {
            player_id: player.id,
            units: moved,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::position::WorldPos;
    use crate::game::catalog::{BuildingKind, UnitKind, UnitVariant};
    use crate::game::events::EventBus;
    use crate::game::map;
    use crate::game::player::Permission;
    use crate::network::registry::ClientHandle;

    fn world_and_events() -> (Arc<World>, tokio::sync::mpsc::Receiver<GameEvent>) {
        let (bus, mut dispatcher) = EventBus::new();
        let rx = dispatcher.subscribe();
        tokio::spawn(dispatcher.run());
        (World::from_layout(map::generate_layout(), bus), rx)
    }

    fn join(world: &World) -> Arc<Player> {
        world
            .add_player(ClientHandle::detached(), crate::network::registry::ConnId(0), Permission::None, b"tick", [9, 9, 9], 0)
            .unwrap()
    }

    #[tokio::test]
    async fn soldier_production_fills_population() {
        let (world, _rx) = world_and_events();
        let player = join(&world);
        let anchor = player.base.anchor();
        player
            .base
            .add_building(
                &player,
                BuildingKind::Barracks,
                WorldPos::new(anchor.x + 355.0, anchor.y),
            )
            .unwrap();

        // Basic barracks: 4-second cadence, 16 population per soldier.
        for _ in 0..3 {
            run_unit_production(&world, &player);
            assert_eq!(player.unit_count(), 0);
        }
        run_unit_production(&world, &player);
        assert_eq!(player.unit_count(), 1);
        assert_eq!(player.population.used(), 16);

        // Population capacity 64: four soldiers max, then production pins.
        for _ in 0..40 {
            run_unit_production(&world, &player);
        }
        assert_eq!(player.population.used(), 64);
        assert_eq!(player.unit_count(), 4);
        let spawner = player.unit_spawners_snapshot().pop().unwrap();
        assert_eq!(spawner.frequency.get(), 0);
    }

    #[tokio::test]
    async fn deactivated_barracks_produces_nothing() {
        let (world, _rx) = world_and_events();
        let player = join(&world);
        let anchor = player.base.anchor();
        let barracks = player
            .base
            .add_building(
                &player,
                BuildingKind::Barracks,
                WorldPos::new(anchor.x + 355.0, anchor.y),
            )
            .unwrap();
        player.toggle_unit_spawner(&barracks).unwrap();

        for _ in 0..10 {
            run_unit_production(&world, &player);
        }
        assert_eq!(player.unit_count(), 0);
    }

    #[tokio::test]
    async fn turret_fires_at_intruding_unit() {
        let (world, _rx) = world_and_events();
        let defender = join(&world);
        let attacker = join(&world);
        defender.clear_protection();
        attacker.clear_protection();

        let anchor = defender.base.anchor();
        defender
            .base
            .add_building(
                &defender,
                BuildingKind::SimpleTurret,
                WorldPos::new(anchor.x + 150.0, anchor.y),
            )
            .unwrap();

        // Park an enemy commander just inside turret range.
        let intruder = attacker.add_commander().unwrap();
        intruder.set_target(WorldPos::new(anchor.x + 300.0, anchor.y));
        for _ in 0..10_000 {
            if !intruder.advance(Duration::from_millis(50)) {
                break;
            }
        }

        let players: Vec<Arc<Player>> = world.active_players();
        process_base_turrets(&world, &defender.base, Some(&defender), &players);
        assert_eq!(defender.base.bullets_snapshot().len(), 1);
    }

    #[tokio::test]
    async fn turret_ignores_protected_players() {
        let (world, _rx) = world_and_events();
        let defender = join(&world);
        let attacker = join(&world);
        defender.clear_protection();
        // Attacker keeps spawn protection.

        let anchor = defender.base.anchor();
        defender
            .base
            .add_building(
                &defender,
                BuildingKind::SimpleTurret,
                WorldPos::new(anchor.x + 150.0, anchor.y),
            )
            .unwrap();
        let intruder = attacker.add_commander().unwrap();
        intruder.set_target(WorldPos::new(anchor.x + 300.0, anchor.y));
        for _ in 0..10_000 {
            if !intruder.advance(Duration::from_millis(50)) {
                break;
            }
        }

        let players: Vec<Arc<Player>> = world.active_players();
        process_base_turrets(&world, &defender.base, Some(&defender), &players);
        assert!(defender.base.bullets_snapshot().is_empty());
    }

    #[tokio::test]
    async fn bullet_lifecycle_emits_remove_exactly_once() {
        let (world, mut rx) = world_and_events();
        let player = join(&world);
        let anchor = player.base.anchor();
        player
            .base
            .add_building(
                &player,
                BuildingKind::SimpleTurret,
                WorldPos::new(anchor.x + 150.0, anchor.y),
            )
            .unwrap();
        let spawner = player.base.bullet_spawners_snapshot().pop().unwrap();
        let bullet = player
            .base
            .add_bullet(&spawner, WorldPos::new(anchor.x + 300.0, anchor.y), 0.0)
            .unwrap();

        // Drive the bullet until it expires.
        for _ in 0..10_000 {
            update_bullets(&world, &player.base, Duration::from_millis(50));
            if player.base.bullets_snapshot().is_empty() {
                break;
            }
        }
        assert!(bullet.is_removed());

        tokio::task::yield_now().await;
        let mut removes = 0;
        while let Ok(event) = rx.try_recv() {
            if let GameEvent::BulletRemove { bullet_id, .. } = event {
                assert_eq!(bullet_id, bullet.id);
                removes += 1;
            }
        }
        assert_eq!(removes, 1);
    }

    #[tokio::test]
    async fn armed_production_registers_bullet_spawner() {
        let (world, _rx) = world_and_events();
        let player = join(&world);
        let anchor = player.base.anchor();
        let barracks = player
            .base
            .add_building(
                &player,
                BuildingKind::Barracks,
                WorldPos::new(anchor.x + 355.0, anchor.y),
            )
            .unwrap();
        // Promote straight to a cannon factory for the test.
        player.remove_unit_spawner(&barracks);
        player.base.upgrade_building(barracks.id, crate::game::catalog::BuildingVariant::CANNON_TANK_FACTORY);
        player.add_unit_spawner(barracks.clone(), true);

        let spawner = player.unit_spawner_for(&barracks).unwrap();
        assert_eq!(spawner.unit_kind, UnitKind::Tank);
        assert_eq!(spawner.unit_variant, UnitVariant::CANNON);

        for _ in 0..20 {
            run_unit_production(&world, &player);
        }
        assert_eq!(player.unit_count(), 1);
        assert_eq!(player.unit_bullet_spawners_snapshot().len(), 1);
    }
}
