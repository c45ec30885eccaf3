//! Player aggregate: units, resources, protection and anti-cheat state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use crate::core::counters::{Capacity, Population, Resource};
use crate::core::ids::{EntityId, IdPool};
use crate::core::position::{TilePos, WorldPos};
use crate::game::base::{Base, Owner};
use crate::game::building::Building;
use crate::game::bullet::{BulletSpawner, Shooter};
use crate::game::camera::Camera;
use crate::game::catalog::{self, UnitKind, UnitVariant};
use crate::game::config::{
    ADMIN_POWER, PLAYER_INITIAL_HEALTH, PLAYER_INITIAL_POPULATION, PLAYER_INITIAL_POWER,
    PLAYER_MAX_POWER, PLAYER_SPAWN_PROTECTION_TIME, UNIT_ID_POOL, UNIT_SPAWNING_LIMIT,
};
use crate::game::neutral::NeutralBase;
use crate::game::unit::{unit_spawn_position, Unit, UnitSpawner};
use crate::network::registry::{ClientHandle, ConnId};

/// Access level resolved from the upstream identity service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Permission {
    #[default]
    None = 0,
    Moderator = 1,
    Admin = 2,
}

/// Snapshot of one move-units intent, kept for the movement heuristic.
#[derive(Clone, Debug, Default)]
pub struct MovementPackage {
    pub timestamp: Option<Instant>,
    pub target: TilePos,
    pub unit_positions: Vec<TilePos>,
    pub unit_ids: Vec<u8>,
}

/// Outcome of feeding a move into the anti-cheat tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MovementVerdict {
    /// Clean move; apply it.
    Applied,
    /// Looked scripted; the move is dropped. `kick` once the suspicion
    /// counter crosses its threshold.
    Suspicious { kick: bool },
}

struct MovementTracker {
    last: MovementPackage,
    suspicion: f32,
    decay_rate: f32,
    threshold: f32,
}

impl MovementTracker {
    /// A move is suspicious when it re-targets a *different* unit set toward
    /// (almost) the same point, too fast, from (almost) the same formation.
    fn is_suspicious(&self, new: &MovementPackage) -> bool {
        const DISTANCE_THRESHOLD: f32 = 100.0;
        const TARGET_THRESHOLD: f32 = 50.0;
        const TIME_THRESHOLD: Duration = Duration::from_millis(250);

        let all_units_known = new
            .unit_ids
            .iter()
            .all(|id| self.last.unit_ids.contains(id));
        if all_units_known {
            return false;
        }

        let Some(last_stamp) = self.last.timestamp else {
            return false;
        };
        if last_stamp.elapsed() >= TIME_THRESHOLD {
            return false;
        }
        if self.last.target.distance_to(new.target) >= TARGET_THRESHOLD {
            return false;
        }
        new.unit_positions.iter().all(|np| {
            self.last
                .unit_positions
                .iter()
                .all(|lp| lp.distance_to(*np) <= DISTANCE_THRESHOLD)
        })
    }
}

struct ActionWindow {
    window_start: Instant,
    count: u32,
}

struct SpawnProtection {
    active: bool,
    ends_at: Instant,
}

pub struct Player {
    pub id: EntityId,
    pub conn: ClientHandle,
    pub conn_id: ConnId,
    pub permission: Permission,
    pub name: [u8; 12],
    pub skin_id: u8,
    pub start_time: Instant,
    last_activity: Mutex<Instant>,
    last_resync: Mutex<Option<Instant>>,

    kills: AtomicU32,
    score: AtomicU32,

    pub population: Population,
    pub power: Resource,
    generating_power: AtomicU16,
    captured: RwLock<Vec<Arc<NeutralBase>>>,
    pub base: Arc<Base>,
    protection: Mutex<SpawnProtection>,

    pub unit_ids: IdPool,
    units: RwLock<HashMap<EntityId, Arc<Unit>>>,
    unit_spawners: RwLock<Vec<Arc<UnitSpawner>>>,
    unit_bullet_spawners: RwLock<Vec<Arc<BulletSpawner>>>,
    pub unit_spawning_limit: Capacity,
    has_commander: AtomicBool,

    building_actions: Mutex<ActionWindow>,
    movement: Mutex<MovementTracker>,
    pub camera: Mutex<Camera>,

    removed: AtomicBool,
}

impl Player {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: EntityId,
        conn: ClientHandle,
        conn_id: ConnId,
        permission: Permission,
        name: [u8; 12],
        color: [u8; 3],
        skin_id: u8,
        position: TilePos,
    ) -> Arc<Player> {
        let (initial_power, max_power) = if permission == Permission::Admin {
            (ADMIN_POWER, ADMIN_POWER)
        } else {
            (PLAYER_INITIAL_POWER, PLAYER_MAX_POWER)
        };
        let base = Arc::new(Base::new(
            Owner::Player(id),
            color,
            position,
            PLAYER_INITIAL_HEALTH,
        ));
        let mut camera = Camera::new();
        camera.position = position;
        camera.update_bounds();
        Arc::new(Player {
            id,
            conn,
            conn_id,
            permission,
            name,
            skin_id,
            start_time: Instant::now(),
            last_activity: Mutex::new(Instant::now()),
            last_resync: Mutex::new(None),
            kills: AtomicU32::new(0),
            score: AtomicU32::new(0),
            population: Population::new(0, PLAYER_INITIAL_POPULATION),
            power: Resource::new(initial_power, max_power),
            generating_power: AtomicU16::new(1),
            captured: RwLock::new(Vec::new()),
            base,
            protection: Mutex::new(SpawnProtection {
                active: true,
                ends_at: Instant::now() + PLAYER_SPAWN_PROTECTION_TIME,
            }),
            unit_ids: IdPool::new(UNIT_ID_POOL),
            units: RwLock::new(HashMap::new()),
            unit_spawners: RwLock::new(Vec::new()),
            unit_bullet_spawners: RwLock::new(Vec::new()),
            unit_spawning_limit: Capacity::new(0, UNIT_SPAWNING_LIMIT),
            has_commander: AtomicBool::new(false),
            building_actions: Mutex::new(ActionWindow {
                window_start: Instant::now(),
                count: 0,
            }),
            movement: Mutex::new(MovementTracker {
                last: MovementPackage::default(),
                suspicion: 0.0,
                decay_rate: 1.0,
                threshold: 5.0,
            }),
            camera: Mutex::new(camera),
            removed: AtomicBool::new(false),
        })
    }

    /// Bare player wired to a dangling connection, for unit tests.
    #[doc(hidden)]
    pub fn for_tests(id: EntityId, position: TilePos, permission: Permission) -> Arc<Player> {
        Player::new(
            id,
            ClientHandle::detached(),
            ConnId(0),
            permission,
            [0; 12],
            [0xff, 0xff, 0xff],
            0,
            position,
        )
    }

    // =========================================================================
    // SCORE / STATS
    // =========================================================================

    pub fn score(&self) -> u32 {
        self.score.load(Ordering::Acquire)
    }

    pub(crate) fn add_score(&self, amount: u32) {
        self.score.fetch_add(amount, Ordering::AcqRel);
    }

    pub fn kills(&self) -> u32 {
        self.kills.load(Ordering::Acquire)
    }

    pub fn increment_kills(&self, amount: u32) {
        self.kills.fetch_add(amount, Ordering::AcqRel);
    }

    pub fn play_duration(&self) -> Duration {
        self.start_time.elapsed()
    }

    // =========================================================================
    // POWER GENERATION
    // =========================================================================

    pub fn generation(&self) -> u16 {
        self.generating_power.load(Ordering::Acquire)
    }

    pub fn raise_generation(&self, amount: u16) {
        self.generating_power.fetch_add(amount, Ordering::AcqRel);
    }

    pub fn reduce_generation(&self, amount: u16) {
        let _ = self
            .generating_power
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
                Some(v.saturating_sub(amount))
            });
    }

    // =========================================================================
    // ACTIVITY / PROTECTION
    // =========================================================================

    pub fn touch_activity(&self) {
        *self.last_activity.lock().unwrap() = Instant::now();
    }

    pub fn last_activity(&self) -> Instant {
        *self.last_activity.lock().unwrap()
    }

    /// Resync is throttled; returns false while on cooldown.
    pub fn try_resync(&self, cooldown: Duration) -> bool {
        let mut last = self.last_resync.lock().unwrap();
        if last.map(|t| t.elapsed() < cooldown).unwrap_or(false) {
            return false;
        }
        *last = Some(Instant::now());
        true
    }

    pub fn has_protection(&self) -> bool {
        self.protection.lock().unwrap().active
    }

    pub fn protection_expired(&self) -> bool {
        let p = self.protection.lock().unwrap();
        p.active && Instant::now() > p.ends_at
    }

    /// Drop the protection flag; true when it was still set (callers emit
    /// the removal event exactly once).
    pub fn clear_protection(&self) -> bool {
        let mut p = self.protection.lock().unwrap();
        let was_active = p.active;
        p.active = false;
        was_active
    }

    // =========================================================================
    // CAPTURED NEUTRAL BASES
    // =========================================================================

    pub fn add_captured(&self, neutral: Arc<NeutralBase>) {
        self.population
            .increment_capacity(crate::game::config::NEUTRAL_BASE_POPULATION);
        self.captured.write().unwrap().push(neutral);
    }

    pub fn remove_captured(&self, neutral: &Arc<NeutralBase>) {
        self.population
            .decrement_capacity(crate::game::config::NEUTRAL_BASE_POPULATION);
        self.captured
            .write()
            .unwrap()
            .retain(|n| !Arc::ptr_eq(n, neutral));
    }

    pub fn captured_snapshot(&self) -> Vec<Arc<NeutralBase>> {
        self.captured.read().unwrap().clone()
    }

    pub fn captured_count(&self) -> usize {
        self.captured.read().unwrap().len()
    }

    pub fn captured_by_id(&self, id: EntityId) -> Option<Arc<NeutralBase>> {
        self.captured
            .read()
            .unwrap()
            .iter()
            .find(|n| n.id == id)
            .cloned()
    }

    pub fn has_captured(&self, neutral: &Arc<NeutralBase>) -> bool {
        self.captured
            .read()
            .unwrap()
            .iter()
            .any(|n| Arc::ptr_eq(n, neutral))
    }

    // =========================================================================
    // UNITS
    // =========================================================================

    pub fn has_commander(&self) -> bool {
        self.has_commander.load(Ordering::Acquire)
    }

    /// Spawn a unit at the barracks, targeting a random point on the spawn
    /// arc in front of it.
    pub fn add_unit(
        &self,
        kind: UnitKind,
        variant: UnitVariant,
        barracks: &Building,
    ) -> Option<Arc<Unit>> {
        let unit_id = self.unit_ids.acquire()?;
        let target = unit_spawn_position(barracks);
        let dx = f64::from(target.x - barracks.position.x);
        let dy = f64::from(target.y - barracks.position.y);
        let rotation = dy.atan2(dx) as f32;
        let unit = match Unit::new(
            self.id,
            unit_id,
            kind,
            variant,
            barracks.position,
            target,
            rotation,
        ) {
            Some(unit) => Arc::new(unit),
            None => {
                self.unit_ids.release(unit_id);
                return None;
            }
        };
        self.units.write().unwrap().insert(unit_id, unit.clone());
        Some(unit)
    }

    /// The one-per-player commander, spawned on the base anchor. Registers
    /// its bullet spawner immediately.
    pub fn add_commander(&self) -> Option<Arc<Unit>> {
        if self.has_commander() {
            return None;
        }
        let unit_id = self.unit_ids.acquire()?;
        let anchor = self.base.anchor();
        let unit = match Unit::new(
            self.id,
            unit_id,
            UnitKind::Commander,
            UnitVariant::BASIC,
            anchor,
            anchor,
            0.0,
        ) {
            Some(unit) => Arc::new(unit),
            None => {
                self.unit_ids.release(unit_id);
                return None;
            }
        };
        self.units.write().unwrap().insert(unit_id, unit.clone());
        self.has_commander.store(true, Ordering::Release);
        self.add_unit_bullet_spawner(&unit);
        Some(unit)
    }

    /// Unlink a unit and return its ID; clears the commander flag when the
    /// commander falls.
    pub fn remove_unit(&self, id: EntityId) -> Option<Arc<Unit>> {
        let unit = self.units.write().unwrap().remove(&id)?;
        if unit.kind == UnitKind::Commander {
            self.has_commander.store(false, Ordering::Release);
        }
        self.unit_ids.release(id);
        Some(unit)
    }

    pub fn unit(&self, id: EntityId) -> Option<Arc<Unit>> {
        self.units.read().unwrap().get(&id).cloned()
    }

    pub fn units_snapshot(&self) -> Vec<Arc<Unit>> {
        self.units.read().unwrap().values().cloned().collect()
    }

    pub fn unit_count(&self) -> usize {
        self.units.read().unwrap().len()
    }

    // =========================================================================
    // UNIT SPAWNERS
    // =========================================================================

    /// Attach a production schedule to a barracks. When the active-barracks
    /// cap is full the spawner is installed deactivated.
    pub fn add_unit_spawner(&self, barracks: Arc<Building>, set_active: bool) -> bool {
        let Some(production) = catalog::unit_spawning(barracks.variant()) else {
            return false;
        };
        let active = set_active && !self.unit_spawning_limit.is_at_max();
        if active {
            self.unit_spawning_limit.increment(1);
        }
        let spawner = Arc::new(UnitSpawner::new(
            barracks,
            production.unit_kind,
            production.unit_variant,
            production.frequency_secs,
            active,
        ));
        self.unit_spawners.write().unwrap().push(spawner);
        true
    }

    pub fn remove_unit_spawner(&self, barracks: &Arc<Building>) {
        let mut was_active = false;
        self.unit_spawners.write().unwrap().retain(|s| {
            if Arc::ptr_eq(&s.barracks, barracks) {
                was_active |= s.is_activated();
                false
            } else {
                true
            }
        });
        if was_active {
            self.unit_spawning_limit.decrement(1);
        }
    }

    pub fn unit_spawner_for(&self, barracks: &Arc<Building>) -> Option<Arc<UnitSpawner>> {
        self.unit_spawners
            .read()
            .unwrap()
            .iter()
            .find(|s| Arc::ptr_eq(&s.barracks, barracks))
            .cloned()
    }

    /// Flip a barracks on or off, honoring the active cap. Returns the
    /// spawner on success so callers can broadcast its new state.
    pub fn toggle_unit_spawner(&self, barracks: &Arc<Building>) -> Option<Arc<UnitSpawner>> {
        let spawner = self.unit_spawner_for(barracks)?;
        if spawner.is_activated() {
            if self.unit_spawning_limit.get() == 0 {
                return None;
            }
            self.unit_spawning_limit.decrement(1);
            spawner.set_activated(false);
        } else {
            if self.unit_spawning_limit.is_at_max() {
                return None;
            }
            self.unit_spawning_limit.increment(1);
            spawner.set_activated(true);
        }
        Some(spawner)
    }

    pub fn unit_spawners_snapshot(&self) -> Vec<Arc<UnitSpawner>> {
        self.unit_spawners.read().unwrap().clone()
    }

    // =========================================================================
    // UNIT BULLET SPAWNERS
    // =========================================================================

    /// Arm a unit that has a bullet-spawning config (cannon tiers and the
    /// commander).
    pub fn add_unit_bullet_spawner(&self, unit: &Arc<Unit>) -> bool {
        let Some(firing) = catalog::unit_bullet_spawning(unit.kind, unit.variant) else {
            return false;
        };
        let spawner = Arc::new(BulletSpawner::new(
            Shooter::Unit(unit.clone()),
            firing.frequency_ms,
            firing.range,
        ));
        self.unit_bullet_spawners.write().unwrap().push(spawner);
        true
    }

    pub fn remove_unit_bullet_spawner(&self, unit: &Arc<Unit>) {
        self.unit_bullet_spawners
            .write()
            .unwrap()
            .retain(|s| !s.shooter.same_unit(unit));
    }

    pub fn unit_bullet_spawners_snapshot(&self) -> Vec<Arc<BulletSpawner>> {
        self.unit_bullet_spawners.read().unwrap().clone()
    }

    // =========================================================================
    // ANTI-CHEAT
    // =========================================================================

    /// Rolling 1-second window; more than 10 building actions inside it is
    /// treated as scripting.
    pub fn can_perform_building_action(&self) -> bool {
        const MAX_ACTIONS_PER_WINDOW: u32 = 10;
        const WINDOW: Duration = Duration::from_secs(1);

        let mut actions = self.building_actions.lock().unwrap();
        if actions.window_start.elapsed() >= WINDOW {
            actions.window_start = Instant::now();
            actions.count = 0;
        }
        if actions.count >= MAX_ACTIONS_PER_WINDOW {
            return false;
        }
        actions.count += 1;
        true
    }

    /// Feed a move into the suspicion tracker. Suspicious moves are dropped
    /// and bump the counter; clean moves decay it and become the reference
    /// package.
    pub fn register_movement(&self, package: MovementPackage) -> MovementVerdict {
        let mut tracker = self.movement.lock().unwrap();
        if tracker.is_suspicious(&package) {
            tracker.suspicion += 1.0;
            let kick = tracker.suspicion >= tracker.threshold;
            return MovementVerdict::Suspicious { kick };
        }
        tracker.suspicion = (tracker.suspicion - tracker.decay_rate).max(0.0);
        tracker.last = package;
        MovementVerdict::Applied
    }

    // =========================================================================
    // REMOVAL
    // =========================================================================

    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    pub fn mark_removed(&self) {
        self.removed.store(true, Ordering::Release);
    }

    /// Drop all per-player collections during removal; captured bases are
    /// decaptured by the world.
    pub(crate) fn clear_entities(&self) {
        self.units.write().unwrap().clear();
        self.unit_spawners.write().unwrap().clear();
        self.unit_bullet_spawners.write().unwrap().clear();
    }

    pub fn anchor(&self) -> WorldPos {
        self.base.anchor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::catalog::{BuildingKind, BuildingVariant};

    fn player_with_barracks() -> (Arc<Player>, Arc<Building>) {
        let player = Player::for_tests(EntityId(1), TilePos::new(0, 0), Permission::None);
        let barracks = player
            .base
            .add_building(&player, BuildingKind::Barracks, WorldPos::new(355.0, 0.0))
            .unwrap();
        (player, barracks)
    }

    #[test]
    fn admin_gets_expanded_wallet() {
        let admin = Player::for_tests(EntityId(0), TilePos::new(0, 0), Permission::Admin);
        assert_eq!(admin.power.current(), ADMIN_POWER);
        let normal = Player::for_tests(EntityId(1), TilePos::new(0, 0), Permission::None);
        assert_eq!(normal.power.current(), PLAYER_INITIAL_POWER);
    }

    #[test]
    fn barracks_placement_registers_active_spawner() {
        let (player, barracks) = player_with_barracks();
        let spawner = player.unit_spawner_for(&barracks).unwrap();
        assert!(spawner.is_activated());
        assert_eq!(player.unit_spawning_limit.get(), 1);
    }

    #[test]
    fn sixth_barracks_starts_deactivated() {
        let player = Player::for_tests(EntityId(1), TilePos::new(0, 0), Permission::None);
        let mut spawners = Vec::new();
        for i in 0..6 {
            let angle = i as f64;
            let pos = WorldPos::new(
                (355.0 * angle.cos()) as f32,
                (355.0 * angle.sin()) as f32,
            );
            let b = player
                .base
                .add_building(&player, BuildingKind::Barracks, pos)
                .unwrap();
            spawners.push(player.unit_spawner_for(&b).unwrap());
        }
        let active = spawners.iter().filter(|s| s.is_activated()).count();
        assert_eq!(active, usize::from(UNIT_SPAWNING_LIMIT));
        assert!(!spawners[5].is_activated());
    }

    #[test]
    fn toggle_respects_cap() {
        let player = Player::for_tests(EntityId(1), TilePos::new(0, 0), Permission::None);
        let mut all = Vec::new();
        for i in 0..6 {
            let angle = i as f64;
            let pos = WorldPos::new(
                (355.0 * angle.cos()) as f32,
                (355.0 * angle.sin()) as f32,
            );
            all.push(
                player
                    .base
                    .add_building(&player, BuildingKind::Barracks, pos)
                    .unwrap(),
            );
        }
        // Cap reached: the sixth cannot be switched on.
        assert!(player.toggle_unit_spawner(&all[5]).is_none());
        // Turn one off, then the sixth fits.
        assert!(player.toggle_unit_spawner(&all[0]).is_some());
        let spawner = player.toggle_unit_spawner(&all[5]).unwrap();
        assert!(spawner.is_activated());
    }

    #[test]
    fn commander_is_unique() {
        let player = Player::for_tests(EntityId(1), TilePos::new(0, 0), Permission::None);
        let commander = player.add_commander().unwrap();
        assert!(player.has_commander());
        assert!(player.add_commander().is_none());
        // Commander spawns armed.
        assert_eq!(player.unit_bullet_spawners_snapshot().len(), 1);
        player.remove_unit(commander.id);
        assert!(!player.has_commander());
        assert!(player.add_commander().is_some());
    }

    #[test]
    fn unit_spawns_on_barracks_arc() {
        let (player, barracks) = player_with_barracks();
        let unit = player
            .add_unit(UnitKind::Soldier, UnitVariant::BASIC, &barracks)
            .unwrap();
        assert_eq!(unit.position(), barracks.position);
        let d = unit.target().distance_to(barracks.position);
        assert!((f64::from(d) - crate::game::config::BARRACKS_UNIT_SPAWN_RADIUS).abs() < 1.0);
    }

    #[test]
    fn building_action_window_caps_at_ten() {
        let player = Player::for_tests(EntityId(1), TilePos::new(0, 0), Permission::None);
        for _ in 0..10 {
            assert!(player.can_perform_building_action());
        }
        assert!(!player.can_perform_building_action());
    }

    #[test]
    fn upgrade_keeps_spawner_bookkeeping() {
        let (player, barracks) = player_with_barracks();
        player.remove_unit_spawner(&barracks);
        assert_eq!(player.unit_spawning_limit.get(), 0);
        player.base.upgrade_building(barracks.id, BuildingVariant::GREATER_BARRACKS);
        player.add_unit_spawner(barracks.clone(), true);
        let spawner = player.unit_spawner_for(&barracks).unwrap();
        assert_eq!(spawner.unit_kind, UnitKind::Soldier);
        assert!(spawner.is_activated());
        assert_eq!(player.unit_spawning_limit.get(), 1);
    }

    #[test]
    fn scripted_movement_is_flagged_and_kicks() {
        let player = Player::for_tests(EntityId(1), TilePos::new(0, 0), Permission::None);
        let base_package = MovementPackage {
            timestamp: Some(Instant::now()),
            target: TilePos::new(100, 100),
            unit_positions: vec![TilePos::new(0, 0), TilePos::new(10, 0)],
            unit_ids: vec![1, 2],
        };
        assert_eq!(player.register_movement(base_package.clone()), MovementVerdict::Applied);

        // Same spot, same formation, but a different unit set each time.
        let mut kick_seen = false;
        for i in 0..6u8 {
            let package = MovementPackage {
                timestamp: Some(Instant::now()),
                target: TilePos::new(101, 100),
                unit_positions: vec![TilePos::new(1, 0), TilePos::new(11, 0)],
                unit_ids: vec![10 + i],
            };
            match player.register_movement(package) {
                MovementVerdict::Suspicious { kick } => kick_seen |= kick,
                MovementVerdict::Applied => panic!("scripted move slipped through"),
            }
        }
        assert!(kick_seen, "suspicion must cross the threshold");
    }

    #[test]
    fn distant_retarget_is_clean() {
        let player = Player::for_tests(EntityId(1), TilePos::new(0, 0), Permission::None);
        player.register_movement(MovementPackage {
            timestamp: Some(Instant::now()),
            target: TilePos::new(100, 100),
            unit_positions: vec![TilePos::new(0, 0)],
            unit_ids: vec![1],
        });
        // New units but a target far away: not scripting.
        let verdict = player.register_movement(MovementPackage {
            timestamp: Some(Instant::now()),
            target: TilePos::new(2000, 2000),
            unit_positions: vec![TilePos::new(0, 0)],
            unit_ids: vec![2],
        });
        assert_eq!(verdict, MovementVerdict::Applied);
    }
}
