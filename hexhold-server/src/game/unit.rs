//! Unit entity and barracks production schedules.

use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rand::Rng;

use crate::core::counters::{Health, SpawnFrequency};
use crate::core::ids::EntityId;
use crate::core::polygon::Polygon;
use crate::core::position::WorldPos;
use crate::game::building::Building;
use crate::game::bullet::ease_out;
use crate::game::catalog::{self, UnitKind, UnitVariant};
use crate::game::config::BARRACKS_UNIT_SPAWN_RADIUS;

const EASE_THRESHOLD: f64 = 100.0;
const MIN_MOVEMENT_THRESHOLD: f64 = 0.05;

struct UnitState {
    position: WorldPos,
    target: WorldPos,
    rotation: f32,
    rotation_dirty: bool,
    polygon: Polygon,
    last_target_update: Instant,
}

/// A mobile entity owned by one player. Units move in a straight line toward
/// their target point with ease-out braking on arrival.
pub struct Unit {
    /// Owning player's ID; the back-reference is a handle, not a pointer.
    pub player_id: EntityId,
    pub id: EntityId,
    pub kind: UnitKind,
    pub variant: UnitVariant,
    pub speed: f64,
    pub size: i32,
    pub explosion_radius: i32,
    pub health: Health,
    state: Mutex<UnitState>,
    removed: AtomicBool,
}

impl Unit {
    pub fn new(
        player_id: EntityId,
        id: EntityId,
        kind: UnitKind,
        variant: UnitVariant,
        position: WorldPos,
        target: WorldPos,
        initial_rotation: f32,
    ) -> Option<Self> {
        let stats = catalog::unit_spec(kind, variant)?;
        let mut polygon = catalog::unit_polygon(kind, variant)?;
        polygon.set_center(position);
        polygon.set_rotation(f64::from(initial_rotation));
        Some(Self {
            player_id,
            id,
            kind,
            variant,
            speed: stats.speed,
            size: stats.size,
            explosion_radius: i32::from(stats.explosion_radius),
            health: Health::full(stats.health),
            state: Mutex::new(UnitState {
                position,
                target,
                rotation: initial_rotation,
                rotation_dirty: false,
                polygon,
                last_target_update: Instant::now(),
            }),
            removed: AtomicBool::new(false),
        })
    }

    pub fn position(&self) -> WorldPos {
        self.state.lock().unwrap().position
    }

    pub fn target(&self) -> WorldPos {
        self.state.lock().unwrap().target
    }

    pub fn rotation(&self) -> f32 {
        self.state.lock().unwrap().rotation
    }

    pub fn last_target_update(&self) -> Instant {
        self.state.lock().unwrap().last_target_update
    }

    pub fn is_explosive(&self) -> bool {
        self.explosion_radius > 0
    }

    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    pub fn mark_removed(&self) {
        self.removed.store(true, Ordering::Release);
    }

    pub fn take_damage(&self, amount: u16) -> bool {
        self.health.decrement(amount);
        self.health.is_alive()
    }

    /// Re-target the unit; derives the facing rotation and stamps the update
    /// time used by the move-rate filter.
    pub fn set_target(&self, target: WorldPos) {
        let mut state = self.state.lock().unwrap();
        state.target = target;
        let dx = f64::from(target.x - state.position.x);
        let dy = f64::from(target.y - state.position.y);
        state.rotation = dy.atan2(dx) as f32;
        let rotation = f64::from(state.rotation);
        state.polygon.set_rotation(rotation);
        state.last_target_update = Instant::now();
        state.rotation_dirty = true;
    }

    /// Step toward the target. Returns false when already parked (within one
    /// unit of it); such units are skipped in position broadcasts.
    pub fn advance(&self, dt: Duration) -> bool {
        let mut state = self.state.lock().unwrap();
        let dx = f64::from(state.target.x - state.position.x);
        let dy = f64::from(state.target.y - state.position.y);
        let distance_sq = dx * dx + dy * dy;
        if distance_sq <= 1.0 {
            state.position = state.target;
            return false;
        }
        let distance = distance_sq.sqrt();
        let dir_x = dx / distance;
        let dir_y = dy / distance;

        let mut step = self.speed * dt.as_secs_f64();
        if distance < EASE_THRESHOLD {
            let mut eased = ease_out(distance / EASE_THRESHOLD);
            if eased * step < MIN_MOVEMENT_THRESHOLD {
                eased = 1.0;
            }
            step *= eased;
        }
        if step > distance {
            step = distance;
        }

        state.position.x += (dir_x * step) as f32;
        state.position.y += (dir_y * step) as f32;
        true
    }

    /// Polygon centered on the current location; rotation was already set by
    /// the last re-target.
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

/// Scheduled unit producer attached to one barracks.
pub struct UnitSpawner {
    pub barracks: Arc<Building>,
    pub unit_kind: UnitKind,
    pub unit_variant: UnitVariant,
    pub frequency: SpawnFrequency,
    activated: AtomicBool,
}

impl UnitSpawner {
    pub fn new(
        barracks: Arc<Building>,
        unit_kind: UnitKind,
        unit_variant: UnitVariant,
        frequency_secs: u16,
        activated: bool,
    ) -> Self {
        Self {
            barracks,
            unit_kind,
            unit_variant,
            // Production starts with a full countdown; turret spawners, by
            // contrast, are ready to fire the moment they are built.
            frequency: SpawnFrequency::new(frequency_secs, frequency_secs),
            activated: AtomicBool::new(activated),
        }
    }

    pub fn is_activated(&self) -> bool {
        self.activated.load(Ordering::Acquire)
    }

    pub fn set_activated(&self, active: bool) {
        self.activated.store(active, Ordering::Release);
    }
}

/// Fresh units emerge on a random arc of ±π/8 behind the barracks front, at
/// the spawn radius.
pub fn unit_spawn_position(barracks: &Building) -> WorldPos {
    let random_angle = rand::thread_rng().gen_range(-PI / 8.0..PI / 8.0);
    let angle = barracks.rotation() + random_angle;
    WorldPos {
        x: barracks.position.x - (BARRACKS_UNIT_SPAWN_RADIUS * angle.cos()) as f32,
        y: barracks.position.y - (BARRACKS_UNIT_SPAWN_RADIUS * angle.sin()) as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::base::Owner;
    use crate::game::catalog::{BuildingKind, BuildingVariant};

    fn soldier(position: WorldPos, target: WorldPos) -> Unit {
        Unit::new(
            EntityId(0),
            EntityId(1),
            UnitKind::Soldier,
            UnitVariant::BASIC,
            position,
            target,
            0.0,
        )
        .unwrap()
    }

    #[test]
    fn parked_unit_reports_no_movement() {
        let u = soldier(WorldPos::new(10.0, 10.0), WorldPos::new(10.5, 10.0));
        assert!(!u.advance(Duration::from_millis(50)));
        assert_eq!(u.position(), WorldPos::new(10.5, 10.0));
    }

    #[test]
    fn moves_toward_target_at_unit_speed() {
        let u = soldier(WorldPos::new(0.0, 0.0), WorldPos::new(1000.0, 0.0));
        assert!(u.advance(Duration::from_secs(1)));
        // 140 u/s, no easing this far out.
        assert!((u.position().x - 140.0).abs() < 0.5);
    }

    #[test]
    fn never_overshoots_target() {
        let u = soldier(WorldPos::new(0.0, 0.0), WorldPos::new(30.0, 0.0));
        for _ in 0..100 {
            u.advance(Duration::from_millis(50));
        }
        assert!(u.position().x <= 30.0 + f32::EPSILON);
    }

    #[test]
    fn retarget_updates_rotation() {
        let u = soldier(WorldPos::new(0.0, 0.0), WorldPos::new(100.0, 0.0));
        u.set_target(WorldPos::new(0.0, 100.0));
        assert!((u.rotation() - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn commander_is_explosive() {
        let c = Unit::new(
            EntityId(0),
            EntityId(2),
            UnitKind::Commander,
            UnitVariant::BASIC,
            WorldPos::default(),
            WorldPos::default(),
            0.0,
        )
        .unwrap();
        assert!(c.is_explosive());
    }

    #[test]
    fn spawn_arc_stays_on_radius() {
        let barracks = Building::new(
            Owner::Player(EntityId(0)),
            EntityId(0),
            BuildingKind::Barracks,
            BuildingVariant::BASIC,
            WorldPos::new(355.0, 0.0),
            WorldPos::new(0.0, 0.0),
        );
        for _ in 0..32 {
            let pos = unit_spawn_position(&barracks);
            let d = f64::from(pos.distance_to(barracks.position));
            assert!((d - BARRACKS_UNIT_SPAWN_RADIUS).abs() < 0.5);
        }
    }

    #[test]
    fn spawner_activation_toggles() {
        let barracks = Arc::new(Building::new(
            Owner::Player(EntityId(0)),
            EntityId(0),
            BuildingKind::Barracks,
            BuildingVariant::BASIC,
            WorldPos::new(355.0, 0.0),
            WorldPos::new(0.0, 0.0),
        ));
        let s = UnitSpawner::new(barracks, UnitKind::Soldier, UnitVariant::BASIC, 4, true);
        assert!(s.is_activated());
        s.set_activated(false);
        assert!(!s.is_activated());
    }
}
