//! Base: the per-owner container of buildings, bullets and their spawners.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::warn;

use crate::core::counters::Health;
use crate::core::ids::{EntityId, IdPool};
use crate::core::polygon::polygons_intersect;
use crate::core::position::{TilePos, WorldPos};
use crate::game::building::Building;
use crate::game::bullet::{bullet_spawn_position, Bullet, BulletSpawner, Shooter, BULLET_SPAWN_DISTANCE};
use crate::game::catalog::{self, BuildingKind, BuildingVariant, BulletBehavior};
use crate::game::config::{BUILDING_ID_POOL, BULLET_ID_POOL};
use crate::game::player::Player;

/// Non-owning handle to whoever a base (or one of its entities) belongs to.
/// The wire protocol mirrors this as the 1-byte `ownerKind` + ID pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Owner {
    Player(EntityId),
    Neutral(EntityId),
}

impl Owner {
    /// 1 = player, 0 = neutral base.
    pub fn wire_kind(self) -> u8 {
        match self {
            Owner::Player(_) => 1,
            Owner::Neutral(_) => 0,
        }
    }

    pub fn id(self) -> EntityId {
        match self {
            Owner::Player(id) | Owner::Neutral(id) => id,
        }
    }
}

/// Live count and ceiling for one building family.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuildingLimit {
    pub current: usize,
    pub max: usize,
}

fn default_limits() -> HashMap<BuildingKind, BuildingLimit> {
    BuildingKind::ALL
        .into_iter()
        .map(|kind| {
            let max = match kind {
                BuildingKind::House => 64,
                _ => 9999,
            };
            (kind, BuildingLimit { current: 0, max })
        })
        .collect()
}

/// The central structure of a player or neutral base: health, anchor,
/// buildings, in-flight bullets, turret spawners and the ID pools feeding
/// them.
pub struct Base {
    pub owner: Owner,
    pub color: [u8; 3],
    pub position: TilePos,
    pub health: Health,
    buildings: RwLock<HashMap<EntityId, Arc<Building>>>,
    building_limits: Mutex<HashMap<BuildingKind, BuildingLimit>>,
    bullets: RwLock<HashMap<EntityId, Arc<Bullet>>>,
    bullet_spawners: RwLock<Vec<Arc<BulletSpawner>>>,
    building_ids: IdPool,
    bullet_ids: IdPool,
}

impl Base {
    pub fn new(owner: Owner, color: [u8; 3], position: TilePos, health: u16) -> Self {
        Self {
            owner,
            color,
            position,
            health: Health::full(health),
            buildings: RwLock::new(HashMap::new()),
            building_limits: Mutex::new(default_limits()),
            bullets: RwLock::new(HashMap::new()),
            bullet_spawners: RwLock::new(Vec::new()),
            building_ids: IdPool::new(BUILDING_ID_POOL),
            bullet_ids: IdPool::new(BULLET_ID_POOL),
        }
    }

    pub fn anchor(&self) -> WorldPos {
        self.position.to_world()
    }

    pub fn take_damage(&self, amount: u16) -> bool {
        self.health.decrement(amount);
        self.health.is_alive()
    }

    /// Restore the core and every standing building to full health.
    pub fn repair(&self) {
        self.health.reset();
        for building in self.buildings_snapshot() {
            building.health.reset();
        }
    }

    // =========================================================================
    // BULLETS
    // =========================================================================

    /// Fire a bullet from `spawner` toward `target`. The bullet materializes
    /// 40 units ahead of the shooter (plus a sideways offset) and flies to
    /// `spawn + dir * range`; trapper rounds fly half the range and park.
    pub fn add_bullet(
        &self,
        spawner: &BulletSpawner,
        target: WorldPos,
        horizontal_offset: f32,
    ) -> Option<Arc<Bullet>> {
        let bullet_id = self.bullet_ids.acquire()?;

        let stats = match spawner.shooter.bullet_stats() {
            Some(stats) => stats,
            None => {
                warn!(owner = ?self.owner, "bullet stats missing for shooter");
                self.bullet_ids.release(bullet_id);
                return None;
            }
        };

        let spawn = bullet_spawn_position(
            spawner.shooter.position(),
            target,
            BULLET_SPAWN_DISTANCE,
            horizontal_offset,
        );

        let dx = f64::from(target.x - spawn.x);
        let dy = f64::from(target.y - spawn.y);
        let distance = (dx * dx + dy * dy).sqrt();
        if distance == 0.0 {
            self.bullet_ids.release(bullet_id);
            return None;
        }

        let mut range = f64::from(spawner.range);
        if stats.behavior == BulletBehavior::Trapper {
            range /= 2.0;
        }
        let flight_target = WorldPos {
            x: spawn.x + ((dx / distance) * range) as f32,
            y: spawn.y + ((dy / distance) * range) as f32,
        };

        let bullet = Arc::new(Bullet::new(
            self.owner,
            bullet_id,
            stats,
            spawn,
            flight_target,
            spawner.shooter.fired_by_unit(),
        ));
        self.bullets.write().unwrap().insert(bullet_id, bullet.clone());
        Some(bullet)
    }

    /// Unlink a bullet and return its ID to the pool.
    pub fn remove_bullet(&self, id: EntityId) -> bool {
        let removed = self.bullets.write().unwrap().remove(&id);
        match removed {
            Some(_) => {
                self.bullet_ids.release(id);
                true
            }
            None => false,
        }
    }

    pub fn bullet(&self, id: EntityId) -> Option<Arc<Bullet>> {
        self.bullets.read().unwrap().get(&id).cloned()
    }

    pub fn bullets_snapshot(&self) -> Vec<Arc<Bullet>> {
        self.bullets.read().unwrap().values().cloned().collect()
    }

    // =========================================================================
    // BUILDINGS
    // =========================================================================

    fn can_add_building(&self, kind: BuildingKind) -> bool {
        let limits = self.building_limits.lock().unwrap();
        limits
            .get(&kind)
            .map(|l| l.current < l.max)
            .unwrap_or(false)
    }

    fn increment_limit(&self, kind: BuildingKind) -> bool {
        let mut limits = self.building_limits.lock().unwrap();
        match limits.get_mut(&kind) {
            Some(l) if l.current < l.max => {
                l.current += 1;
                true
            }
            _ => false,
        }
    }

    fn decrement_limit(&self, kind: BuildingKind) {
        let mut limits = self.building_limits.lock().unwrap();
        if let Some(l) = limits.get_mut(&kind) {
            l.current = l.current.saturating_sub(1);
        }
    }

    pub fn building_limit(&self, kind: BuildingKind) -> BuildingLimit {
        self.building_limits
            .lock()
            .unwrap()
            .get(&kind)
            .copied()
            .unwrap_or_default()
    }

    /// Place a fresh (basic-variant) building for `player`. Registers the
    /// matching spawner: a unit spawner on the player for barracks, a bullet
    /// spawner on this base for turrets. Rolls back on any failure.
    pub fn add_building(
        &self,
        player: &Player,
        kind: BuildingKind,
        position: WorldPos,
    ) -> Option<Arc<Building>> {
        if !self.can_add_building(kind) {
            return None;
        }
        let building_id = self.building_ids.acquire()?;

        let building = Arc::new(Building::new(
            self.owner,
            building_id,
            kind,
            BuildingVariant::BASIC,
            position,
            self.anchor(),
        ));

        {
            let mut buildings = self.buildings.write().unwrap();
            buildings.insert(building_id, building.clone());
            if !self.increment_limit(kind) {
                buildings.remove(&building_id);
                drop(buildings);
                self.building_ids.release(building_id);
                return None;
            }
        }

        match kind {
            BuildingKind::Barracks => {
                player.add_unit_spawner(building.clone(), true);
            }
            k if k.is_turret() => {
                self.add_bullet_spawner(&building);
            }
            _ => {}
        }

        Some(building)
    }

    /// Install a pre-built building without spawner registration; used when
    /// a neutral base lays its spike ring.
    pub fn install_building(&self, building: Arc<Building>) {
        self.buildings
            .write()
            .unwrap()
            .insert(building.id, building.clone());
        self.increment_limit(building.kind);
    }

    pub fn building_ids_pool(&self) -> &IdPool {
        &self.building_ids
    }

    /// Switch a building to `variant`, resetting its health. Spawner
    /// re-registration is the caller's business (the upgrade handler knows
    /// the prior activation state).
    pub fn upgrade_building(&self, id: EntityId, variant: BuildingVariant) -> bool {
        match self.buildings.read().unwrap().get(&id) {
            Some(building) => {
                building.set_variant(variant);
                true
            }
            None => false,
        }
    }

    /// Two-phase removal: mark, detach side effects (yields, spawners), then
    /// unlink and return the ID. Returns the removed building.
    pub fn remove_building(&self, player: Option<&Player>, id: EntityId) -> Option<Arc<Building>> {
        let building = self.buildings.read().unwrap().get(&id).cloned()?;
        building.mark_removed();

        let variant = building.variant();
        match building.kind {
            BuildingKind::Barracks => {
                if let Some(player) = player {
                    player.remove_unit_spawner(&building);
                }
            }
            BuildingKind::Generator | BuildingKind::Wall => {
                if let Some(player) = player {
                    if let Some(power) = catalog::resource_generation(building.kind, variant) {
                        player.reduce_generation(power);
                    }
                }
            }
            BuildingKind::House => {
                if let Some(player) = player {
                    if let Some(capacity) = catalog::population_capacity(building.kind, variant) {
                        player.population.decrement_capacity(capacity);
                    }
                }
            }
            k if k.is_turret() => {
                // Spawner goes before the ID is returned.
                self.remove_bullet_spawner(&building);
            }
            _ => {}
        }

        self.buildings.write().unwrap().remove(&id);
        self.decrement_limit(building.kind);
        self.building_ids.release(id);
        Some(building)
    }

    pub fn building(&self, id: EntityId) -> Option<Arc<Building>> {
        self.buildings.read().unwrap().get(&id).cloned()
    }

    pub fn buildings_snapshot(&self) -> Vec<Arc<Building>> {
        self.buildings.read().unwrap().values().cloned().collect()
    }

    pub fn building_count(&self) -> usize {
        self.buildings.read().unwrap().len()
    }

    /// Would a building of `kind` at `position` stand clear of everything
    /// already built here? Broad-phase radius filter, then SAT.
    pub fn placement_clear(&self, kind: BuildingKind, position: WorldPos) -> bool {
        let mut candidate = catalog::building_polygon(kind);
        candidate.set_center(position);
        let anchor = self.anchor();
        let dx = f64::from(position.x - anchor.x);
        let dy = f64::from(position.y - anchor.y);
        candidate.set_rotation(dy.atan2(dx));
        let candidate_size = catalog::building_size(kind);

        let buildings = self.buildings.read().unwrap();
        for building in buildings.values() {
            if building.is_removed() {
                continue;
            }
            let reach = (candidate_size + catalog::building_size(building.kind)) as f32;
            if !position.within_radius(building.position, reach) {
                continue;
            }
            if polygons_intersect(&candidate, building.polygon()) {
                return false;
            }
        }
        true
    }

    // =========================================================================
    // BULLET SPAWNERS
    // =========================================================================

    pub fn add_bullet_spawner(&self, turret: &Arc<Building>) -> bool {
        let firing = match catalog::turret_bullet_spawning(turret.kind, turret.variant()) {
            Some(firing) => firing,
            None => {
                warn!(kind = ?turret.kind, "no bullet spawning config for turret");
                return false;
            }
        };
        let spawner = Arc::new(BulletSpawner::new(
            Shooter::Building(turret.clone()),
            firing.frequency_ms,
            firing.range,
        ));
        self.bullet_spawners.write().unwrap().push(spawner);
        true
    }

    pub fn remove_bullet_spawner(&self, turret: &Arc<Building>) {
        self.bullet_spawners
            .write()
            .unwrap()
            .retain(|s| !s.shooter.same_building(turret));
    }

    pub fn bullet_spawners_snapshot(&self) -> Vec<Arc<BulletSpawner>> {
        self.bullet_spawners.read().unwrap().clone()
    }

    /// Drop every building and bullet, returning their IDs to the pools.
    /// Used when a neutral base changes hands.
    pub fn clear(&self) {
        let building_ids: Vec<EntityId> = self.buildings.read().unwrap().keys().copied().collect();
        for id in building_ids {
            self.remove_building(None, id);
        }
        let bullet_ids: Vec<EntityId> = self.bullets.read().unwrap().keys().copied().collect();
        for id in bullet_ids {
            if let Some(bullet) = self.bullet(id) {
                bullet.mark_removed();
            }
            self.remove_bullet(id);
        }
    }
}
