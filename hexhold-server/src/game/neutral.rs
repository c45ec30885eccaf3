//! Neutral bases: capturable map strongholds ringed by spike walls.

use std::f64::consts::PI;
use std::sync::{Arc, RwLock, Weak};

use tracing::warn;

use crate::core::ids::EntityId;
use crate::core::position::{TilePos, WorldPos};
use crate::game::base::{Base, Owner};
use crate::game::building::Building;
use crate::game::catalog::{BuildingKind, BuildingVariant};
use crate::game::config::{
    NEUTRAL_BASE_INITIAL_HEALTH, NEUTRAL_BASE_MAX_BUILDING_RADIUS, NEUTRAL_BASE_SPIKE_COUNT,
};
use crate::game::player::Player;

/// A capturable base. `captured_by` is a non-owning handle: when the holder
/// is removed from the world the weak ref dies with it.
pub struct NeutralBase {
    pub id: EntityId,
    captured_by: RwLock<Weak<Player>>,
    pub base: Arc<Base>,
}

impl NeutralBase {
    pub fn new(id: EntityId, position: TilePos) -> Arc<NeutralBase> {
        let neutral = Arc::new(NeutralBase {
            id,
            captured_by: RwLock::new(Weak::new()),
            base: Arc::new(Base::new(
                Owner::Neutral(id),
                [0, 0, 0],
                position,
                NEUTRAL_BASE_INITIAL_HEALTH,
            )),
        });
        neutral.populate();
        neutral
    }

    /// Current holder, if still alive and not mid-removal.
    pub fn captured_by(&self) -> Option<Arc<Player>> {
        self.captured_by
            .read()
            .unwrap()
            .upgrade()
            .filter(|p| !p.is_removed())
    }

    pub fn is_captured_by(&self, player: &Player) -> bool {
        self.captured_by()
            .map(|p| p.id == player.id)
            .unwrap_or(false)
    }

    /// Ownership transfer. A real capture resets health, clears the old
    /// garrison and lays a fresh spike ring; a decapture (holder died) only
    /// drops the handle.
    pub fn set_captured(&self, player: Option<&Arc<Player>>) {
        self.base.health.reset();
        match player {
            Some(player) => {
                // Drop the handle first so clearing does not bill the
                // previous holder.
                *self.captured_by.write().unwrap() = Weak::new();
                self.base.clear();
                self.populate();
                *self.captured_by.write().unwrap() = Arc::downgrade(player);
            }
            None => {
                *self.captured_by.write().unwrap() = Weak::new();
            }
        }
    }

    /// Lay the spike ring: evenly spaced walls on the outer building radius,
    /// each facing outward.
    pub fn populate(&self) {
        let anchor = self.base.anchor();
        let step = 2.0 * PI / NEUTRAL_BASE_SPIKE_COUNT as f64;
        for i in 0..NEUTRAL_BASE_SPIKE_COUNT {
            let angle = step * i as f64;
            let position = WorldPos {
                x: anchor.x + (NEUTRAL_BASE_MAX_BUILDING_RADIUS * angle.cos()).round() as f32,
                y: anchor.y + (NEUTRAL_BASE_MAX_BUILDING_RADIUS * angle.sin()).round() as f32,
            };
            let Some(id) = self.base.building_ids_pool().acquire() else {
                warn!(neutral = %self.id, "spike ring truncated: building IDs exhausted");
                return;
            };
            let spike = Arc::new(Building::new(
                Owner::Neutral(self.id),
                id,
                BuildingKind::Wall,
                BuildingVariant::SPIKE,
                position,
                anchor,
            ));
            self.base.install_building(spike);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::player::Permission;

    #[test]
    fn fresh_base_carries_spike_ring() {
        let neutral = NeutralBase::new(EntityId(0), TilePos::new(0, 0));
        assert_eq!(neutral.base.building_count(), NEUTRAL_BASE_SPIKE_COUNT);
        for building in neutral.base.buildings_snapshot() {
            assert_eq!(building.kind, BuildingKind::Wall);
            assert_eq!(building.variant(), BuildingVariant::SPIKE);
            let d = building.position.distance_to(neutral.base.anchor());
            assert!((f64::from(d) - NEUTRAL_BASE_MAX_BUILDING_RADIUS).abs() < 2.0);
        }
    }

    #[test]
    fn capture_resets_health_and_repopulates() {
        let neutral = NeutralBase::new(EntityId(0), TilePos::new(0, 0));
        let player = Player::for_tests(EntityId(1), TilePos::new(500, 0), Permission::None);
        neutral.base.health.decrement(NEUTRAL_BASE_INITIAL_HEALTH);
        // Knock out part of the ring before the capture.
        let victim = neutral.base.buildings_snapshot().pop().unwrap();
        neutral.base.remove_building(None, victim.id);

        neutral.set_captured(Some(&player));
        assert!(neutral.base.health.is_full());
        assert_eq!(neutral.base.building_count(), NEUTRAL_BASE_SPIKE_COUNT);
        assert!(neutral.is_captured_by(&player));
    }

    #[test]
    fn decapture_clears_holder_only() {
        let neutral = NeutralBase::new(EntityId(0), TilePos::new(0, 0));
        let player = Player::for_tests(EntityId(1), TilePos::new(500, 0), Permission::None);
        neutral.set_captured(Some(&player));
        neutral.set_captured(None);
        assert!(neutral.captured_by().is_none());
        assert_eq!(neutral.base.building_count(), NEUTRAL_BASE_SPIKE_COUNT);
    }

    #[test]
    fn dead_holder_reads_as_uncaptured() {
        let neutral = NeutralBase::new(EntityId(0), TilePos::new(0, 0));
        let player = Player::for_tests(EntityId(1), TilePos::new(500, 0), Permission::None);
        neutral.set_captured(Some(&player));
        player.mark_removed();
        assert!(neutral.captured_by().is_none());
    }
}
