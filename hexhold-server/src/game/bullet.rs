//! Bullets and bullet spawners.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::counters::{Health, SpawnFrequency};
use crate::core::ids::EntityId;
use crate::core::polygon::Polygon;
use crate::core::position::WorldPos;
use crate::game::base::Owner;
use crate::game::building::Building;
use crate::game::catalog::{self, BulletBehavior, BulletSpec};
use crate::game::unit::Unit;

/// Distance in front of the shooter where bullets materialize.
pub const BULLET_SPAWN_DISTANCE: f32 = 40.0;

/// Movement easing kicks in inside this distance of the target.
const EASE_THRESHOLD: f64 = 100.0;
/// Below this per-frame distance easing is disabled entirely.
const MIN_MOVEMENT_THRESHOLD: f64 = 0.05;

/// Ease-out curve: fast start, soft landing.
pub(crate) fn ease_out(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

struct BulletState {
    position: WorldPos,
    target: WorldPos,
    polygon: Polygon,
    reached_target: bool,
    stay_left: Duration,
}

/// A projectile owned by a base. Trapper bullets park at their target and
/// linger; everything else dies on arrival or on running out of health.
pub struct Bullet {
    pub owner: Owner,
    pub id: EntityId,
    pub behavior: BulletBehavior,
    pub speed: f64,
    pub size: i32,
    pub fired_by_unit: bool,
    pub damage_multiplier: f32,
    pub health: Health,
    state: Mutex<BulletState>,
    removed: AtomicBool,
}

impl Bullet {
    pub fn new(
        owner: Owner,
        id: EntityId,
        stats: &BulletSpec,
        position: WorldPos,
        target: WorldPos,
        fired_by_unit: bool,
    ) -> Self {
        let mut polygon = catalog::bullet_polygon(stats.size);
        polygon.set_center(position);
        Self {
            owner,
            id,
            behavior: stats.behavior,
            speed: stats.speed,
            size: stats.size,
            fired_by_unit,
            damage_multiplier: stats.damage_multiplier,
            health: Health::full(stats.health),
            state: Mutex::new(BulletState {
                position,
                target,
                polygon,
                reached_target: false,
                stay_left: Duration::from_millis(stats.stay_duration_ms),
            }),
            removed: AtomicBool::new(false),
        }
    }

    pub fn position(&self) -> WorldPos {
        self.state.lock().unwrap().position
    }

    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    pub fn mark_removed(&self) {
        self.removed.store(true, Ordering::Release);
    }

    pub fn has_reached_target(&self) -> bool {
        self.state.lock().unwrap().reached_target
    }

    pub fn mark_reached(&self) {
        self.state.lock().unwrap().reached_target = true;
    }

    /// Count down the trapper linger timer; true once it has expired.
    pub fn tick_stay(&self, dt: Duration) -> bool {
        let mut state = self.state.lock().unwrap();
        state.stay_left = state.stay_left.saturating_sub(dt);
        state.stay_left.is_zero()
    }

    pub fn take_damage(&self, amount: u16) -> bool {
        self.health.decrement(amount);
        self.health.is_alive()
    }

    /// Advance toward the target with ease-out braking near it. Returns
    /// false once the target is reached (position snapped onto it).
    pub fn advance(&self, dt: Duration) -> bool {
        let mut state = self.state.lock().unwrap();
        let dx = f64::from(state.target.x - state.position.x);
        let dy = f64::from(state.target.y - state.position.y);
        let distance = (dx * dx + dy * dy).sqrt();
        if distance == 0.0 {
            state.reached_target = true;
            return false;
        }
        let dir_x = dx / distance;
        let dir_y = dy / distance;

        let mut step = self.speed * dt.as_secs_f64();
        if distance < EASE_THRESHOLD {
            let mut eased = ease_out(distance / EASE_THRESHOLD);
            if eased * step < MIN_MOVEMENT_THRESHOLD {
                eased = 1.0;
            }
            // Speed bottoms out at 30% on final approach.
            step *= 0.3 + 0.7 * eased;
        }

        if step > distance {
            state.position = state.target;
            state.reached_target = true;
            return false;
        }

        state.position.x += (dir_x * step) as f32;
        state.position.y += (dir_y * step) as f32;
        true
    }

    /// Polygon positioned at the current location, for narrow-phase checks.
    pub fn collision_polygon(&self) -> Polygon {
        let state = self.state.lock().unwrap();
        let mut polygon = state.polygon.clone();
        polygon.set_center(state.position);
        polygon
    }

    pub fn is_within_radius(&self, center: WorldPos, radius: f32) -> bool {
        self.position().within_radius(center, radius)
    }
}

/// The thing a bullet spawner is mounted on.
#[derive(Clone)]
pub enum Shooter {
    Building(Arc<Building>),
    Unit(Arc<Unit>),
}

impl Shooter {
    pub fn position(&self) -> WorldPos {
        match self {
            Shooter::Building(b) => b.position,
            Shooter::Unit(u) => u.position(),
        }
    }

    pub fn is_removed(&self) -> bool {
        match self {
            Shooter::Building(b) => b.is_removed(),
            Shooter::Unit(u) => u.is_removed(),
        }
    }

    /// Ballistics for whatever this shooter currently is.
    pub fn bullet_stats(&self) -> Option<&'static BulletSpec> {
        match self {
            Shooter::Building(b) => catalog::turret_bullet_stats(b.kind, b.variant()),
            Shooter::Unit(u) => catalog::unit_bullet_stats(u.kind, u.variant),
        }
    }

    pub fn fired_by_unit(&self) -> bool {
        matches!(self, Shooter::Unit(_))
    }

    pub fn same_building(&self, other: &Arc<Building>) -> bool {
        matches!(self, Shooter::Building(b) if Arc::ptr_eq(b, other))
    }

    pub fn same_unit(&self, other: &Arc<Unit>) -> bool {
        matches!(self, Shooter::Unit(u) if Arc::ptr_eq(u, other))
    }
}

/// Scheduled bullet producer: one per live turret and per armed unit.
pub struct BulletSpawner {
    pub shooter: Shooter,
    pub frequency: SpawnFrequency,
    pub range: i32,
}

impl BulletSpawner {
    pub fn new(shooter: Shooter, frequency_ms: u16, range: i32) -> Self {
        Self {
            shooter,
            frequency: SpawnFrequency::new(0, frequency_ms),
            range,
        }
    }
}

/// Spawn point `spawn_distance` ahead of the shooter toward the target, with
/// a perpendicular offset for multi-barrel turrets. Falls back to the shooter
/// position when the target coincides with it.
pub fn bullet_spawn_position(
    shooter: WorldPos,
    target: WorldPos,
    spawn_distance: f32,
    horizontal_offset: f32,
) -> WorldPos {
    let dx = target.x - shooter.x;
    let dy = target.y - shooter.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return shooter;
    }
    let dir_x = dx / len;
    let dir_y = dy / len;
    WorldPos {
        x: shooter.x + dir_x * spawn_distance + -dir_y * horizontal_offset,
        y: shooter.y + dir_y * spawn_distance + dir_x * horizontal_offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::catalog::{BuildingKind, BuildingVariant};

    fn test_bullet(from: WorldPos, to: WorldPos) -> Bullet {
        let stats = catalog::turret_bullet_stats(BuildingKind::SimpleTurret, BuildingVariant::BASIC)
            .unwrap();
        Bullet::new(Owner::Player(EntityId(0)), EntityId(0), stats, from, to, false)
    }

    #[test]
    fn advances_toward_target() {
        let b = test_bullet(WorldPos::new(0.0, 0.0), WorldPos::new(1000.0, 0.0));
        assert!(b.advance(Duration::from_millis(50)));
        let pos = b.position();
        assert!(pos.x > 0.0 && pos.x < 1000.0);
        assert_eq!(pos.y, 0.0);
    }

    #[test]
    fn snaps_onto_target_when_step_overshoots() {
        let b = test_bullet(WorldPos::new(0.0, 0.0), WorldPos::new(3.0, 0.0));
        // 500 u/s over 1 s easily covers 3 units.
        assert!(!b.advance(Duration::from_secs(1)));
        assert_eq!(b.position(), WorldPos::new(3.0, 0.0));
        assert!(b.has_reached_target());
    }

    #[test]
    fn ease_out_slows_final_approach() {
        let far = test_bullet(WorldPos::new(0.0, 0.0), WorldPos::new(10000.0, 0.0));
        let near = test_bullet(WorldPos::new(0.0, 0.0), WorldPos::new(90.0, 0.0));
        far.advance(Duration::from_millis(50));
        near.advance(Duration::from_millis(50));
        // The close bullet moves a shorter distance than the cruising one.
        assert!(near.position().x < far.position().x);
    }

    #[test]
    fn trapper_stay_duration_expires_once() {
        let stats = catalog::turret_bullet_stats(BuildingKind::SniperTurret, BuildingVariant::TRAPPER)
            .unwrap();
        let b = Bullet::new(
            Owner::Neutral(EntityId(1)),
            EntityId(2),
            stats,
            WorldPos::new(0.0, 0.0),
            WorldPos::new(10.0, 0.0),
            false,
        );
        assert!(!b.tick_stay(Duration::from_millis(4950)));
        assert!(b.tick_stay(Duration::from_millis(50)));
        // Saturates at zero afterwards.
        assert!(b.tick_stay(Duration::from_millis(50)));
    }

    #[test]
    fn spawn_position_is_ahead_of_shooter() {
        let pos = bullet_spawn_position(
            WorldPos::new(0.0, 0.0),
            WorldPos::new(100.0, 0.0),
            BULLET_SPAWN_DISTANCE,
            0.0,
        );
        assert_eq!(pos, WorldPos::new(40.0, 0.0));
    }

    #[test]
    fn spawn_position_applies_perpendicular_offset() {
        let pos = bullet_spawn_position(
            WorldPos::new(0.0, 0.0),
            WorldPos::new(100.0, 0.0),
            40.0,
            10.0,
        );
        assert_eq!(pos, WorldPos::new(40.0, 10.0));
    }

    #[test]
    fn zero_distance_target_keeps_shooter_position() {
        let shooter = WorldPos::new(5.0, 5.0);
        assert_eq!(bullet_spawn_position(shooter, shooter, 40.0, 0.0), shooter);
    }
}
