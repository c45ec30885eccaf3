//! Collision detection and damage settlement.
//!
//! Runs at the tail of every entity-update tick. Broad phase is a combined-
//! radius circle test; narrow phase is SAT over the entity polygons. Damage
//! is settled immediately inside the pass, deaths are two-phase (mark, then
//! unlink) so concurrent readers only ever skip a corpse.

use std::sync::Arc;

use crate::core::polygon::polygons_intersect;
use crate::game::base::Base;
use crate::game::building::Building;
use crate::game::bullet::Bullet;
use crate::game::catalog::{self, BulletBehavior, UnitKind};
use crate::game::config::{
    NEUTRAL_BASE_INITIAL_HEALTH, NEUTRAL_BASE_MAX_BUILDING_RADIUS, NEUTRAL_BASE_MAX_CORE_RADIUS,
    PLAYER_INITIAL_HEALTH, PLAYER_MAX_CORE_RADIUS, PLAYER_SPAWN_PROTECTION_RADIUS,
    UNIT_DETECTION_RADIUS,
};
use crate::game::events::GameEvent;
use crate::game::map::Rock;
use crate::game::neutral::NeutralBase;
use crate::game::player::Player;
use crate::game::unit::Unit;
use crate::game::world::World;

/// Resolve one tick's worth of collisions for every player.
pub fn resolve(world: &World, players: &[Arc<Player>], neutrals: &[Arc<NeutralBase>]) {
    for player in players {
        let units = player.units_snapshot();
        let buildings = player.base.buildings_snapshot();

        bullet_collisions(world, player, players, neutrals, &units, &buildings);
        base_collisions(world, player, players, &units);
        neutral_base_collisions(world, player, neutrals, &units);
        unit_collisions(world, player, players, &units);
        rock_collisions(world, player, &units);
    }
}

// =============================================================================
// NARROW-PHASE PREDICATES
// =============================================================================

fn bullet_hits_unit(bullet: &Bullet, unit: &Unit) -> bool {
    if !bullet.is_within_radius(unit.position(), (unit.size + bullet.size) as f32) {
        return false;
    }
    polygons_intersect(&bullet.collision_polygon(), &unit.collision_polygon())
}

fn bullet_hits_building(bullet: &Bullet, building: &Building) -> bool {
    let reach = (catalog::building_size(building.kind) + bullet.size) as f32;
    if !bullet.is_within_radius(building.position, reach) {
        return false;
    }
    polygons_intersect(&bullet.collision_polygon(), building.polygon())
}

fn bullet_hits_rock(bullet: &Bullet, rock: &Rock) -> bool {
    if !bullet.is_within_radius(rock.polygon.center, rock.size as f32) {
        return false;
    }
    polygons_intersect(&bullet.collision_polygon(), &rock.polygon)
}

fn unit_hits_building(unit: &Unit, building: &Building) -> bool {
    let reach = (catalog::building_size(building.kind) + unit.size) as f32;
    if !unit.is_within_radius(building.position, reach) {
        return false;
    }
    polygons_intersect(&unit.collision_polygon(), building.polygon())
}

fn unit_hits_unit(a: &Unit, b: &Unit) -> bool {
    if !a.is_within_radius(b.position(), (a.size + b.size) as f32) {
        return false;
    }
    polygons_intersect(&a.collision_polygon(), &b.collision_polygon())
}

fn unit_hits_rock(unit: &Unit, rock: &Rock) -> bool {
    if !unit.is_within_radius(rock.polygon.center, (rock.size + unit.size) as f32) {
        return false;
    }
    polygons_intersect(&unit.collision_polygon(), &rock.polygon)
}

// =============================================================================
// DEATH HANDLING
// =============================================================================

/// Finish off a marked unit: disarm it, detonate it if explosive, unlink it,
/// give its population back and tell the clients.
pub(crate) fn handle_unit_destroyed(world: &World, owner: &Arc<Player>, unit: &Arc<Unit>) {
    if catalog::unit_bullet_spawning(unit.kind, unit.variant).is_some() {
        owner.remove_unit_bullet_spawner(unit);
    }
    if unit.is_explosive() {
        apply_explosion(world, owner, unit);
    }
    if owner.remove_unit(unit.id).is_some() {
        if let Some(population) = catalog::required_population(unit.kind) {
            owner.population.decrement_used(population);
        }
        world.events.emit(GameEvent::UnitRemove {
            player_id: owner.id,
            unit_id: unit.id,
        });
    }
}

/// Unlink a dead building and broadcast the removal. `owner_player` is the
/// player whose yields the building fed (the capturer for neutral bases).
fn handle_building_destroyed(
    world: &World,
    base: &Base,
    owner_player: Option<&Player>,
    building: &Arc<Building>,
) {
    if base.remove_building(owner_player, building.id).is_some() {
        world.events.emit(GameEvent::BuildingRemoved {
            owner: base.owner,
            building: building.clone(),
        });
    }
}

fn remove_bullet(world: &World, base: &Base, bullet: &Bullet) {
    world.events.emit(GameEvent::BulletRemove {
        owner: base.owner,
        bullet_id: bullet.id,
    });
    bullet.mark_removed();
    base.remove_bullet(bullet.id);
}

/// Damage a bullet deals to a unit: twice its remaining health, scaled by
/// the multiplier for anti-tank rounds against (siege) tanks and for
/// unit-fired rounds.
fn bullet_damage_to_unit(bullet: &Bullet, unit: &Unit) -> u16 {
    let mut damage = bullet.health.current().saturating_mul(2);
    let multiplied = match bullet.behavior {
        BulletBehavior::AntiTank => matches!(unit.kind, UnitKind::Tank | UnitKind::SiegeTank),
        BulletBehavior::Unit => true,
        _ => false,
    };
    if multiplied {
        damage = (f32::from(damage) * bullet.damage_multiplier) as u16;
    }
    damage
}

// =============================================================================
// PASS 1-5: BULLETS
// =============================================================================

fn settle_bullets_against_units(
    world: &World,
    victim_owner: &Arc<Player>,
    bullet_base: &Base,
    bullets: &[Arc<Bullet>],
    units: &[Arc<Unit>],
) {
    for unit in units {
        if unit.is_removed() {
            continue;
        }
        for bullet in bullets {
            if bullet.is_removed() {
                continue;
            }
            if !bullet_hits_unit(bullet, unit) {
                continue;
            }
            let unit_health = unit.health.current();
            let damage = bullet_damage_to_unit(bullet, unit);

            if !bullet.take_damage(unit_health) {
                remove_bullet(world, bullet_base, bullet);
            }
            if !unit.take_damage(damage) {
                unit.mark_removed();
                handle_unit_destroyed(world, victim_owner, unit);
                break;
            }
        }
    }
}

fn settle_bullets_against_buildings(
    world: &World,
    victim_base: &Base,
    victim_owner: Option<&Player>,
    bullet_base: &Base,
    bullets: &[Arc<Bullet>],
    buildings: &[Arc<Building>],
) {
    for building in buildings {
        if building.is_removed() {
            continue;
        }
        for bullet in bullets {
            if bullet.is_removed() || !bullet.fired_by_unit {
                continue;
            }
            if !bullet_hits_building(bullet, building) {
                continue;
            }
            let building_health = building.health.current();
            let bullet_health = bullet.health.current();

            if !bullet.take_damage(building_health) {
                remove_bullet(world, bullet_base, bullet);
            }
            if !building.take_damage(bullet_health) {
                building.mark_removed();
                handle_building_destroyed(world, victim_base, victim_owner, building);
                break;
            }
        }
    }
}

fn bullet_collisions(
    world: &World,
    player: &Arc<Player>,
    players: &[Arc<Player>],
    neutrals: &[Arc<NeutralBase>],
    units: &[Arc<Unit>],
    buildings: &[Arc<Building>],
) {
    // Enemy player bullets vs this player's units and buildings.
    for other in players {
        if other.id == player.id || other.is_removed() {
            continue;
        }
        let bullets = other.base.bullets_snapshot();
        settle_bullets_against_units(world, player, &other.base, &bullets, units);
        settle_bullets_against_buildings(
            world,
            &player.base,
            Some(player),
            &other.base,
            &bullets,
            buildings,
        );
    }

    // This player's unit-fired bullets die on rocks.
    let own_bullets = player.base.bullets_snapshot();
    for rock in &world.rocks {
        for bullet in &own_bullets {
            if bullet.is_removed() || !bullet.fired_by_unit {
                continue;
            }
            if bullet_hits_rock(bullet, rock) {
                remove_bullet(world, &player.base, bullet);
            }
        }
    }

    // Uncaptured neutral bases trade fire with this player.
    for neutral in neutrals {
        if neutral.is_captured_by(player) {
            continue;
        }
        let neutral_bullets = neutral.base.bullets_snapshot();
        settle_bullets_against_units(world, player, &neutral.base, &neutral_bullets, units);

        let neutral_buildings = neutral.base.buildings_snapshot();
        let capturer = neutral.captured_by();
        settle_bullets_against_buildings(
            world,
            &neutral.base,
            capturer.as_deref(),
            &player.base,
            &own_bullets,
            &neutral_buildings,
        );
    }
}

// =============================================================================
// PASS 6: ENEMY BASES
// =============================================================================

fn base_collisions(
    world: &World,
    player: &Arc<Player>,
    players: &[Arc<Player>],
    units: &[Arc<Unit>],
) {
    for other in players {
        if other.is_removed() {
            continue;
        }
        let has_protection = other.has_protection();
        let anchor = other.base.anchor();

        // Own base: leaving the protected circle forfeits protection.
        if other.id == player.id {
            if has_protection {
                for unit in units {
                    let inner = PLAYER_SPAWN_PROTECTION_RADIUS - unit.size as f32;
                    if !unit.is_within_radius(anchor, inner) {
                        if player.clear_protection() {
                            world.events.emit(GameEvent::RemoveSpawnProtection {
                                player_id: player.id,
                            });
                        }
                        break;
                    }
                }
            }
            continue;
        }

        let other_buildings = other.base.buildings_snapshot();

        for unit in units {
            if unit.is_removed() {
                continue;
            }
            let unit_size = unit.size as f32;
            let near_base =
                unit.is_within_radius(anchor, PLAYER_SPAWN_PROTECTION_RADIUS + unit_size);

            // Protection kills intruders outright.
            if has_protection {
                if near_base {
                    unit.mark_removed();
                    handle_unit_destroyed(world, player, unit);
                }
                continue;
            }
            if !near_base {
                continue;
            }

            // Core contact: the core shrinks with the base's health.
            let base_health = other.base.health.current();
            let core_radius = (f32::from(base_health) / f32::from(PLAYER_INITIAL_HEALTH))
                * PLAYER_MAX_CORE_RADIUS
                + unit_size;
            if unit.is_within_radius(anchor, core_radius) {
                let unit_health = unit.health.current();
                let unit_alive = unit.take_damage(base_health);
                let base_alive = other.base.take_damage(unit_health);

                if !base_alive {
                    let score = other.score();
                    world.award_score(player, (score / 100) * 50);
                    player.increment_kills(1);
                    let power = ((f64::from(score) / 100.0) * 10.0).min(6000.0) as u16;
                    player.power.increment(power);

                    other.mark_removed();
                    world.events.emit(GameEvent::PlayerKilled {
                        player: other.clone(),
                        killer_id: player.id,
                    });
                } else {
                    world.events.emit(GameEvent::BaseHealthUpdate {
                        owner: other.base.owner,
                        health: other.base.health.current(),
                    });
                }

                if !unit_alive {
                    unit.mark_removed();
                    handle_unit_destroyed(world, player, unit);
                    continue;
                }
            }

            // Ramming the enemy's buildings.
            for building in &other_buildings {
                if building.is_removed() {
                    continue;
                }
                if !unit_hits_building(unit, building) {
                    continue;
                }
                let unit_health = unit.health.current();
                let building_health = building.health.current();
                let unit_alive = unit.take_damage(building_health);
                let building_alive = building.take_damage(unit_health);

                if !building_alive {
                    world.award_score(player, u32::from(building.health.max()));
                    building.mark_removed();
                    handle_building_destroyed(world, &other.base, Some(other), building);
                }
                if !unit_alive {
                    unit.mark_removed();
                    handle_unit_destroyed(world, player, unit);
                    break;
                }
            }
        }
    }
}

// =============================================================================
// PASS 7: NEUTRAL BASES
// =============================================================================

fn neutral_base_collisions(
    world: &World,
    player: &Arc<Player>,
    neutrals: &[Arc<NeutralBase>],
    units: &[Arc<Unit>],
) {
    for neutral in neutrals {
        if neutral.is_captured_by(player) {
            continue;
        }
        let anchor = neutral.base.anchor();
        let buildings = neutral.base.buildings_snapshot();

        for unit in units {
            if unit.is_removed() {
                continue;
            }
            let unit_size = unit.size as f32;
            let approach = NEUTRAL_BASE_MAX_BUILDING_RADIUS as f32 + 100.0 + unit_size;
            if !unit.is_within_radius(anchor, approach) {
                continue;
            }

            let base_health = neutral.base.health.current();
            let core_radius = (f32::from(base_health) / f32::from(NEUTRAL_BASE_INITIAL_HEALTH))
                * NEUTRAL_BASE_MAX_CORE_RADIUS
                + unit_size;
            if unit.is_within_radius(anchor, core_radius) {
                let unit_health = unit.health.current();
                let unit_alive = unit.take_damage(base_health);
                let base_alive = neutral.base.take_damage(unit_health);

                if !base_alive {
                    capture_neutral_base(world, player, neutral);
                    break;
                }
                world.events.emit(GameEvent::BaseHealthUpdate {
                    owner: neutral.base.owner,
                    health: neutral.base.health.current(),
                });

                if !unit_alive {
                    unit.mark_removed();
                    handle_unit_destroyed(world, player, unit);
                    continue;
                }
            }

            for building in &buildings {
                if building.is_removed() {
                    continue;
                }
                if !unit_hits_building(unit, building) {
                    continue;
                }
                let unit_health = unit.health.current();
                let building_health = building.health.current();
                let unit_alive = unit.take_damage(building_health);
                let building_alive = building.take_damage(unit_health);

                if !building_alive {
                    world.award_score(player, u32::from(building.health.max()));
                    building.mark_removed();
                    let capturer = neutral.captured_by();
                    handle_building_destroyed(world, &neutral.base, capturer.as_deref(), building);
                }
                if !unit_alive {
                    unit.mark_removed();
                    handle_unit_destroyed(world, player, unit);
                    break;
                }
            }
        }
    }
}

/// Ownership transfer: the previous holder loses the base, the attacker
/// gains it (with a fresh spike ring) and everyone hears about it.
pub(crate) fn capture_neutral_base(world: &World, player: &Arc<Player>, neutral: &Arc<NeutralBase>) {
    if let Some(previous) = neutral.captured_by() {
        previous.remove_captured(neutral);
    }
    neutral.set_captured(Some(player));
    player.add_captured(neutral.clone());
    world.events.emit(GameEvent::NeutralBaseCaptured {
        neutral: neutral.clone(),
    });
}

// =============================================================================
// PASS 8: UNIT VS UNIT
// =============================================================================

fn unit_collisions(
    world: &World,
    player: &Arc<Player>,
    players: &[Arc<Player>],
    units: &[Arc<Unit>],
) {
    for other in players {
        if other.id == player.id || other.is_removed() {
            continue;
        }
        let other_units = other.units_snapshot();

        for unit in units {
            if unit.is_removed() {
                continue;
            }
            for other_unit in &other_units {
                if other_unit.is_removed() {
                    continue;
                }
                if !unit_hits_unit(unit, other_unit) {
                    continue;
                }

                // Settle in ascending unit-ID order so concurrent passes
                // over the same pair cannot deadlock or double-settle.
                let (first, second) = if unit.id <= other_unit.id {
                    (unit, other_unit)
                } else {
                    (other_unit, unit)
                };
                let first_health = first.health.current();
                let second_health = second.health.current();
                let first_alive = first.take_damage(second_health);
                let second_alive = second.take_damage(first_health);
                let (unit_alive, other_alive) = if unit.id <= other_unit.id {
                    (first_alive, second_alive)
                } else {
                    (second_alive, first_alive)
                };

                if !other_alive {
                    world.award_score(player, u32::from(other_unit.health.max()) / 10);
                    other_unit.mark_removed();
                    handle_unit_destroyed(world, other, other_unit);
                }
                if !unit_alive {
                    world.award_score(other, u32::from(unit.health.max()) / 10);
                    unit.mark_removed();
                    handle_unit_destroyed(world, player, unit);
                    break;
                }
            }
        }
    }
}

// =============================================================================
// PASS 9: ROCKS
// =============================================================================

fn rock_collisions(world: &World, player: &Arc<Player>, units: &[Arc<Unit>]) {
    for rock in &world.rocks {
        for unit in units {
            if unit.is_removed() {
                continue;
            }
            if unit_hits_rock(unit, rock) {
                unit.mark_removed();
                handle_unit_destroyed(world, player, unit);
            }
        }
    }
}

// =============================================================================
// EXPLOSIONS
// =============================================================================

/// Detonate a dying explosive unit: flat 100 damage to every enemy unit and
/// building within 1.2x the blast radius, plus core damage when the blast
/// happens inside a base's detection range.
fn apply_explosion(world: &World, owner: &Arc<Player>, unit: &Arc<Unit>) {
    const EXPLOSION_DAMAGE: u16 = 100;
    let blast_radius = unit.explosion_radius as f32 * 1.2;

    for other in world.players_snapshot() {
        if other.is_removed() || other.id == owner.id {
            continue;
        }

        for other_unit in other.units_snapshot() {
            if other_unit.is_removed() {
                continue;
            }
            if unit.is_within_radius(other_unit.position(), blast_radius)
                && !other_unit.take_damage(EXPLOSION_DAMAGE)
            {
                world.award_score(owner, u32::from(other_unit.health.max()) / 10);
                other_unit.mark_removed();
                handle_unit_destroyed(world, &other, &other_unit);
            }
        }

        let anchor = other.base.anchor();
        if !unit.is_within_radius(anchor, UNIT_DETECTION_RADIUS) {
            continue;
        }

        for building in other.base.buildings_snapshot() {
            if building.is_removed() {
                continue;
            }
            if unit.is_within_radius(building.position, blast_radius)
                && !building.take_damage(EXPLOSION_DAMAGE)
            {
                world.award_score(owner, u32::from(building.health.max()));
                building.mark_removed();
                handle_building_destroyed(world, &other.base, Some(&other), &building);
            }
        }

        let base_health = other.base.health.current();
        let core_radius = (f32::from(base_health) / f32::from(PLAYER_INITIAL_HEALTH))
            * PLAYER_MAX_CORE_RADIUS
            + unit.explosion_radius as f32;
        if unit.is_within_radius(anchor, core_radius) {
            let base_alive = other.base.take_damage(EXPLOSION_DAMAGE);
            world.events.emit(GameEvent::BaseHealthUpdate {
                owner: other.base.owner,
                health: other.base.health.current(),
            });
            if !base_alive {
                let score = other.score();
                world.award_score(owner, (score / 100) * 50);
                owner.increment_kills(1);
                let power = ((f64::from(score) / 100.0) * 10.0).min(6000.0) as u16;
                owner.power.increment(power);

                other.mark_removed();
                world.events.emit(GameEvent::PlayerKilled {
                    player: other.clone(),
                    killer_id: owner.id,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::EntityId;
    use crate::core::position::WorldPos;
    use crate::game::catalog::{BuildingKind, UnitVariant};
    use crate::game::events::EventBus;
    use crate::game::map;
    use crate::game::player::Permission;
    use crate::game::unit::Unit;
    use crate::game::world::World;

    fn test_world() -> Arc<World> {
        let (bus, _dispatcher) = EventBus::new();
        World::from_layout(map::generate_layout(), bus)
    }

    fn join(world: &World) -> Arc<Player> {
        world
            .add_player(
                crate::network::registry::ClientHandle::detached(),
                crate::network::registry::ConnId(0),
                Permission::None,
                b"tester",
                [1, 2, 3],
                0,
            )
            .unwrap()
    }

    #[test]
    fn intruder_dies_inside_protected_base() {
        let world = test_world();
        let defender = join(&world);
        let attacker = join(&world);
        assert!(defender.has_protection());

        // March one attacker tank onto the defender's anchor.
        let factory = attacker
            .base
            .add_building(
                &attacker,
                BuildingKind::Barracks,
                WorldPos::new(attacker.base.anchor().x + 355.0, attacker.base.anchor().y),
            )
            .unwrap();
        let intruder = attacker
            .add_unit(UnitKind::Tank, UnitVariant::BASIC, &factory)
            .unwrap();
        intruder.set_target(defender.base.anchor());
        for _ in 0..10_000 {
            if !intruder.advance(std::time::Duration::from_millis(50)) {
                break;
            }
        }

        let players = world.players_snapshot();
        resolve(&world, &players, &world.neutral_bases);

        assert!(attacker.unit(intruder.id).is_none(), "intruder must be destroyed");
        // Protection absorbs the hit: the defender's base is untouched.
        assert!(defender.base.health.is_full());
    }

    #[test]
    fn own_unit_leaving_radius_forfeits_protection() {
        let world = test_world();
        let player = join(&world);
        let scout = player.add_commander().unwrap();
        scout.set_target(WorldPos::new(
            player.base.anchor().x + 2000.0,
            player.base.anchor().y,
        ));
        while scout.advance(std::time::Duration::from_millis(50)) {}

        let players = world.players_snapshot();
        resolve(&world, &players, &world.neutral_bases);
        assert!(!player.has_protection());
    }

    #[test]
    fn anti_tank_multiplier_applies_to_both_tank_kinds() {
        let stats =
            catalog::turret_bullet_stats(BuildingKind::SniperTurret, crate::game::catalog::BuildingVariant::ANTI_TANK_GUN)
                .unwrap();
        let bullet = Bullet::new(
            crate::game::base::Owner::Neutral(EntityId(0)),
            EntityId(0),
            stats,
            WorldPos::new(0.0, 0.0),
            WorldPos::new(10.0, 0.0),
            false,
        );
        let tank = Unit::new(
            EntityId(1),
            EntityId(0),
            UnitKind::Tank,
            UnitVariant::BASIC,
            WorldPos::default(),
            WorldPos::default(),
            0.0,
        )
        .unwrap();
        let siege = Unit::new(
            EntityId(1),
            EntityId(1),
            UnitKind::SiegeTank,
            UnitVariant::BASIC,
            WorldPos::default(),
            WorldPos::default(),
            0.0,
        )
        .unwrap();
        let soldier = Unit::new(
            EntityId(1),
            EntityId(2),
            UnitKind::Soldier,
            UnitVariant::BASIC,
            WorldPos::default(),
            WorldPos::default(),
            0.0,
        )
        .unwrap();

        // 60 hp x2 = 120 base; x1.5 against armor = 180.
        assert_eq!(bullet_damage_to_unit(&bullet, &tank), 180);
        assert_eq!(bullet_damage_to_unit(&bullet, &siege), 180);
        assert_eq!(bullet_damage_to_unit(&bullet, &soldier), 120);
    }

    #[test]
    fn unit_bullet_doubles_against_units() {
        let stats = catalog::unit_bullet_stats(UnitKind::Commander, UnitVariant::BASIC).unwrap();
        let bullet = Bullet::new(
            crate::game::base::Owner::Player(EntityId(0)),
            EntityId(0),
            stats,
            WorldPos::new(0.0, 0.0),
            WorldPos::new(10.0, 0.0),
            true,
        );
        let soldier = Unit::new(
            EntityId(1),
            EntityId(0),
            UnitKind::Soldier,
            UnitVariant::BASIC,
            WorldPos::default(),
            WorldPos::default(),
            0.0,
        )
        .unwrap();
        // 100 hp x2 = 200 base, x2.0 multiplier = 400.
        assert_eq!(bullet_damage_to_unit(&bullet, &soldier), 400);
    }

    #[test]
    fn capture_transfers_ownership_and_population() {
        let world = test_world();
        let attacker = join(&world);
        let defender = join(&world);
        let neutral = world.neutral_bases[0].clone();

        neutral.set_captured(Some(&defender));
        defender.add_captured(neutral.clone());
        let defender_cap = defender.population.capacity();

        capture_neutral_base(&world, &attacker, &neutral);

        assert!(neutral.is_captured_by(&attacker));
        assert!(!defender.has_captured(&neutral));
        assert_eq!(
            defender.population.capacity(),
            defender_cap - crate::game::config::NEUTRAL_BASE_POPULATION
        );
        assert_eq!(attacker.captured_count(), 1);
    }
}
