//! Building entity.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::core::counters::Health;
use crate::core::ids::EntityId;
use crate::core::polygon::Polygon;
use crate::core::position::WorldPos;
use crate::game::base::Owner;
use crate::game::catalog::{self, BuildingKind, BuildingVariant};

/// A placed structure. Position and shape are fixed at placement; only the
/// variant and health change over its lifetime (upgrades).
pub struct Building {
    pub owner: Owner,
    pub id: EntityId,
    pub kind: BuildingKind,
    variant: AtomicU8,
    pub position: WorldPos,
    polygon: Polygon,
    pub health: Health,
    removed: AtomicBool,
}

impl Building {
    /// Construct with the polygon oriented along the radial vector from the
    /// base anchor (buildings face outward).
    pub fn new(
        owner: Owner,
        id: EntityId,
        kind: BuildingKind,
        variant: BuildingVariant,
        position: WorldPos,
        base_anchor: WorldPos,
    ) -> Self {
        let mut polygon = catalog::building_polygon(kind);
        polygon.set_center(position);
        let dx = f64::from(position.x - base_anchor.x);
        let dy = f64::from(position.y - base_anchor.y);
        polygon.set_rotation(dy.atan2(dx));
        Self {
            owner,
            id,
            kind,
            variant: AtomicU8::new(variant.raw()),
            position,
            polygon,
            health: Health::full(catalog::initial_health(kind, variant)),
            removed: AtomicBool::new(false),
        }
    }

    pub fn variant(&self) -> BuildingVariant {
        BuildingVariant(self.variant.load(Ordering::Acquire))
    }

    /// Swap to the new variant; health resets to the variant's initial value.
    pub fn set_variant(&self, variant: BuildingVariant) {
        self.variant.store(variant.raw(), Ordering::Release);
        let health = catalog::initial_health(self.kind, variant);
        self.health.rewrite(health, health);
    }

    pub fn rotation(&self) -> f64 {
        self.polygon.rotation
    }

    pub fn polygon(&self) -> &Polygon {
        &self.polygon
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
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall_at(x: f32, y: f32) -> Building {
        Building::new(
            Owner::Player(EntityId(1)),
            EntityId(0),
            BuildingKind::Wall,
            BuildingVariant::BASIC,
            WorldPos::new(x, y),
            WorldPos::new(0.0, 0.0),
        )
    }

    #[test]
    fn starts_at_catalog_health() {
        let b = wall_at(200.0, 0.0);
        assert_eq!(b.health.current(), 800);
        assert!(b.health.is_full());
    }

    #[test]
    fn upgrade_resets_health() {
        let b = wall_at(200.0, 0.0);
        b.health.decrement(500);
        b.set_variant(BuildingVariant::BOULDER);
        assert_eq!(b.variant(), BuildingVariant::BOULDER);
        assert_eq!(b.health.current(), 1000);
    }

    #[test]
    fn faces_away_from_base_anchor() {
        // Building directly east of the anchor faces along +X (plus the
        // circle's shape offset).
        let b = wall_at(200.0, 0.0);
        assert!((b.rotation() - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn damage_until_destroyed() {
        let b = wall_at(200.0, 0.0);
        assert!(b.take_damage(799));
        assert!(!b.take_damage(1));
        assert!(!b.health.is_alive());
    }
}
