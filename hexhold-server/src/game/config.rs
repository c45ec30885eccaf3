//! Gameplay tuning constants.

use std::time::Duration;

// Player configuration.
pub const PLAYER_INITIAL_POPULATION: u16 = 64;
pub const PLAYER_INITIAL_HEALTH: u16 = 2000;
pub const PLAYER_INITIAL_POWER: u16 = 6000;
pub const PLAYER_MAX_POWER: u16 = 8000;
/// Admins play with an effectively bottomless wallet.
pub const ADMIN_POWER: u16 = 60000;

// Timeouts and the spawn-protection window.
pub const PLAYER_TIMEOUT: Duration = Duration::from_secs(10 * 60);
pub const PLAYER_SPAWN_PROTECTION_TIME: Duration = Duration::from_secs(10 * 60);
pub const PLAYER_SPAWN_PROTECTION_RADIUS: f32 = 355.0 + 145.0;

// Base health regeneration.
pub const PLAYER_HEALTH_REGENERATION: u16 = 30;
pub const HEALTH_REGENERATION_PERIOD: Duration = Duration::from_secs(30);

// Build rings around a player base.
pub const PLAYER_MAX_BUILDING_RADIUS: f64 = 355.0;
pub const PLAYER_MIN_BUILDING_RADIUS: f64 = 120.0;
pub const PLAYER_MAX_CORE_RADIUS: f32 = 118.0;

// Neutral bases.
pub const NEUTRAL_BASE_POPULATION: u16 = 32;
pub const NEUTRAL_BASE_INITIAL_HEALTH: u16 = 1000;
pub const NEUTRAL_BASE_MAX_BUILDING_RADIUS: f64 = 260.0;
pub const NEUTRAL_BASE_MIN_BUILDING_RADIUS: f64 = 82.0;
pub const NEUTRAL_BASE_MAX_CORE_RADIUS: f32 = 80.0;
/// Score trickle per captured neutral base, per second.
pub const NEUTRAL_BASE_CAPTURE_SCORE: u32 = 10;
/// Spike walls laid on the perimeter when a base is (re)captured.
pub const NEUTRAL_BASE_SPIKE_COUNT: usize = 22;

// Units.
pub const BARRACKS_UNIT_SPAWN_RADIUS: f64 = 100.0;
pub const UNIT_DETECTION_RADIUS: f32 = 1000.0;
/// Active barracks per player.
pub const UNIT_SPAWNING_LIMIT: u16 = 5;

// Purchases.
pub const COMMANDER_COST: u16 = 7000;
pub const REPAIR_COST: u16 = 6000;

// ID pool sizes.
pub const PLAYER_ID_POOL: usize = 64;
pub const UNIT_ID_POOL: usize = 128;
pub const BUILDING_ID_POOL: usize = 256;
pub const BULLET_ID_POOL: usize = 256;

/// Reason byte carried by a kick notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum KickReason {
    Timeout = 0,
    Scripting = 1,
}
