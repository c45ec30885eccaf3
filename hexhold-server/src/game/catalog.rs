//! Static entity catalogues.
//!
//! Read-only stats tables indexed by `(kind, variant)`: building health,
//! cost and the upgrade DAG; building footprints; resource generation;
//! population capacity; barracks production schedules; turret and unit
//! bullet ballistics; unit stats and shapes. The tables are plain `match`
//! functions over `&'static` entries, so lookups never allocate.

use std::f64::consts::PI;

use crate::core::polygon::{Polygon, Shape};

// =============================================================================
// KINDS AND VARIANTS
// =============================================================================

/// Building families. The wire byte is the discriminant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BuildingKind {
    Wall = 0,
    SimpleTurret = 1,
    SniperTurret = 2,
    Barracks = 4,
    Generator = 5,
    House = 6,
}

impl BuildingKind {
    pub fn from_byte(byte: u8) -> Option<BuildingKind> {
        match byte {
            0 => Some(BuildingKind::Wall),
            1 => Some(BuildingKind::SimpleTurret),
            2 => Some(BuildingKind::SniperTurret),
            4 => Some(BuildingKind::Barracks),
            5 => Some(BuildingKind::Generator),
            6 => Some(BuildingKind::House),
            _ => None,
        }
    }

    /// Does this building family mount a bullet spawner?
    pub fn is_turret(self) -> bool {
        matches!(self, BuildingKind::SimpleTurret | BuildingKind::SniperTurret)
    }

    /// All families, for limit-table construction.
    pub const ALL: [BuildingKind; 6] = [
        BuildingKind::Wall,
        BuildingKind::SimpleTurret,
        BuildingKind::SniperTurret,
        BuildingKind::Barracks,
        BuildingKind::Generator,
        BuildingKind::House,
    ];
}

/// Node in a building family's upgrade graph. Numeric values overlap across
/// families, so a variant only means something next to its kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BuildingVariant(pub u8);

impl BuildingVariant {
    pub const BASIC: Self = Self(0);

    // Wall.
    pub const BOULDER: Self = Self(1);
    pub const SPIKE: Self = Self(2);
    pub const MICRO_GENERATOR: Self = Self(3);

    // Simple turret.
    pub const RAPID_TURRET: Self = Self(1);
    pub const GATLING_TURRET: Self = Self(2);
    pub const HEAVY_TURRET: Self = Self(3);

    // Sniper turret.
    pub const SEMI_AUTOMATIC_SNIPER: Self = Self(1);
    pub const HEAVY_SNIPER: Self = Self(2);
    pub const ANTI_TANK_GUN: Self = Self(3);
    pub const TRAPPER: Self = Self(4);

    // Barracks.
    pub const GREATER_BARRACKS: Self = Self(1);
    pub const TANK_FACTORY: Self = Self(2);
    pub const HEAVY_TANK_FACTORY: Self = Self(3);
    pub const BOOSTER_TANK_FACTORY: Self = Self(4);
    pub const CANNON_TANK_FACTORY: Self = Self(5);
    pub const SIEGE_TANK_FACTORY: Self = Self(6);
    pub const HEAVY_BOOSTER_TANK_FACTORY: Self = Self(7);
    pub const BOOSTER_CANNON_TANK_FACTORY: Self = Self(8);
    pub const HEAVY_SIEGE_TANK_FACTORY: Self = Self(9);
    pub const BOOSTER_SIEGE_TANK_FACTORY: Self = Self(10);
    pub const CANNON_SIEGE_TANK_FACTORY: Self = Self(11);
    pub const HEAVY_BOOSTER_SIEGE_TANK_FACTORY: Self = Self(12);
    pub const BOOSTER_CANNON_SIEGE_TANK_FACTORY: Self = Self(13);

    // Generator.
    pub const POWER_PLANT: Self = Self(1);

    // House.
    pub const LARGE_HOUSE: Self = Self(1);

    pub fn raw(self) -> u8 {
        self.0
    }
}

/// Unit families.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum UnitKind {
    Soldier = 0,
    Tank = 1,
    SiegeTank = 2,
    Commander = 3,
}

impl UnitKind {
    pub fn from_byte(byte: u8) -> Option<UnitKind> {
        match byte {
            0 => Some(UnitKind::Soldier),
            1 => Some(UnitKind::Tank),
            2 => Some(UnitKind::SiegeTank),
            3 => Some(UnitKind::Commander),
            _ => None,
        }
    }
}

/// Unit upgrade-tier node; like [`BuildingVariant`], scoped by its kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct UnitVariant(pub u8);

impl UnitVariant {
    pub const BASIC: Self = Self(0);

    pub const LIGHT_ARMOR_SOLDIER: Self = Self(1);

    pub const HEAVY_ARMOR: Self = Self(1);
    pub const BOOSTER_ENGINE: Self = Self(2);
    pub const CANNON: Self = Self(3);
    pub const HEAVY_ARMOR_BOOSTER_ENGINE: Self = Self(4);
    pub const BOOSTER_ENGINE_CANNON: Self = Self(5);

    pub fn raw(self) -> u8 {
        self.0
    }
}

// =============================================================================
// BUILDINGS
// =============================================================================

/// One node of a building upgrade graph.
pub struct BuildingSpec {
    pub health: u16,
    pub next: &'static [BuildingVariant],
    pub cost: u16,
}

const fn spec(health: u16, next: &'static [BuildingVariant], cost: u16) -> BuildingSpec {
    BuildingSpec { health, next, cost }
}

pub fn building_spec(kind: BuildingKind, variant: BuildingVariant) -> Option<&'static BuildingSpec> {
    use BuildingKind::*;
    static WALL_BASIC: BuildingSpec = spec(
        800,
        &[BuildingVariant::MICRO_GENERATOR, BuildingVariant::BOULDER],
        50,
    );
    static WALL_MICRO: BuildingSpec = spec(800, &[], 100);
    static WALL_BOULDER: BuildingSpec = spec(1000, &[BuildingVariant::SPIKE], 80);
    static WALL_SPIKE: BuildingSpec = spec(1200, &[], 120);

    static ST_BASIC: BuildingSpec = spec(
        100,
        &[BuildingVariant::RAPID_TURRET, BuildingVariant::HEAVY_TURRET],
        150,
    );
    static ST_RAPID: BuildingSpec = spec(100, &[BuildingVariant::GATLING_TURRET], 200);
    static ST_GATLING: BuildingSpec = spec(100, &[], 300);
    static ST_HEAVY: BuildingSpec = spec(100, &[], 500);

    static SN_BASIC: BuildingSpec = spec(
        100,
        &[
            BuildingVariant::SEMI_AUTOMATIC_SNIPER,
            BuildingVariant::HEAVY_SNIPER,
        ],
        200,
    );
    static SN_SEMI: BuildingSpec = spec(100, &[], 250);
    static SN_HEAVY: BuildingSpec = spec(
        100,
        &[BuildingVariant::TRAPPER, BuildingVariant::ANTI_TANK_GUN],
        250,
    );
    static SN_ANTI_TANK: BuildingSpec = spec(100, &[], 400);
    static SN_TRAPPER: BuildingSpec = spec(100, &[], 550);

    static BA_BASIC: BuildingSpec = spec(
        150,
        &[
            BuildingVariant::GREATER_BARRACKS,
            BuildingVariant::TANK_FACTORY,
        ],
        150,
    );
    static BA_GREATER: BuildingSpec = spec(150, &[], 200);
    static BA_TANK: BuildingSpec = spec(
        150,
        &[
            BuildingVariant::HEAVY_TANK_FACTORY,
            BuildingVariant::BOOSTER_TANK_FACTORY,
        ],
        200,
    );
    static BA_HEAVY_TANK: BuildingSpec = spec(
        150,
        &[
            BuildingVariant::CANNON_TANK_FACTORY,
            BuildingVariant::SIEGE_TANK_FACTORY,
        ],
        250,
    );
    static BA_BOOSTER_TANK: BuildingSpec = spec(
        150,
        &[
            BuildingVariant::HEAVY_BOOSTER_TANK_FACTORY,
            BuildingVariant::BOOSTER_CANNON_TANK_FACTORY,
        ],
        250,
    );
    static BA_CANNON_TANK: BuildingSpec = spec(150, &[], 300);
    static BA_SIEGE: BuildingSpec = spec(
        150,
        &[
            BuildingVariant::HEAVY_SIEGE_TANK_FACTORY,
            BuildingVariant::BOOSTER_SIEGE_TANK_FACTORY,
        ],
        300,
    );
    static BA_HEAVY_BOOSTER_TANK: BuildingSpec =
        spec(150, &[BuildingVariant::BOOSTER_SIEGE_TANK_FACTORY], 300);
    static BA_BOOSTER_CANNON_TANK: BuildingSpec = spec(150, &[], 300);
    static BA_HEAVY_SIEGE: BuildingSpec = spec(
        150,
        &[
            BuildingVariant::CANNON_SIEGE_TANK_FACTORY,
            BuildingVariant::HEAVY_BOOSTER_SIEGE_TANK_FACTORY,
        ],
        350,
    );
    static BA_BOOSTER_SIEGE: BuildingSpec = spec(
        150,
        &[
            BuildingVariant::HEAVY_BOOSTER_SIEGE_TANK_FACTORY,
            BuildingVariant::BOOSTER_CANNON_SIEGE_TANK_FACTORY,
        ],
        350,
    );
    static BA_CANNON_SIEGE: BuildingSpec = spec(150, &[], 400);
    static BA_HEAVY_BOOSTER_SIEGE: BuildingSpec = spec(150, &[], 400);
    static BA_BOOSTER_CANNON_SIEGE: BuildingSpec = spec(150, &[], 400);

    static GE_BASIC: BuildingSpec = spec(100, &[BuildingVariant::POWER_PLANT], 100);
    static GE_POWER_PLANT: BuildingSpec = spec(100, &[], 200);

    static HO_BASIC: BuildingSpec = spec(100, &[BuildingVariant::LARGE_HOUSE], 120);
    static HO_LARGE: BuildingSpec = spec(100, &[], 150);

    let entry = match (kind, variant) {
        (Wall, BuildingVariant::BASIC) => &WALL_BASIC,
        (Wall, BuildingVariant::MICRO_GENERATOR) => &WALL_MICRO,
        (Wall, BuildingVariant::BOULDER) => &WALL_BOULDER,
        (Wall, BuildingVariant::SPIKE) => &WALL_SPIKE,

        (SimpleTurret, BuildingVariant::BASIC) => &ST_BASIC,
        (SimpleTurret, BuildingVariant::RAPID_TURRET) => &ST_RAPID,
        (SimpleTurret, BuildingVariant::GATLING_TURRET) => &ST_GATLING,
        (SimpleTurret, BuildingVariant::HEAVY_TURRET) => &ST_HEAVY,

        (SniperTurret, BuildingVariant::BASIC) => &SN_BASIC,
        (SniperTurret, BuildingVariant::SEMI_AUTOMATIC_SNIPER) => &SN_SEMI,
        (SniperTurret, BuildingVariant::HEAVY_SNIPER) => &SN_HEAVY,
        (SniperTurret, BuildingVariant::ANTI_TANK_GUN) => &SN_ANTI_TANK,
        (SniperTurret, BuildingVariant::TRAPPER) => &SN_TRAPPER,

        (Barracks, BuildingVariant::BASIC) => &BA_BASIC,
        (Barracks, BuildingVariant::GREATER_BARRACKS) => &BA_GREATER,
        (Barracks, BuildingVariant::TANK_FACTORY) => &BA_TANK,
        (Barracks, BuildingVariant::HEAVY_TANK_FACTORY) => &BA_HEAVY_TANK,
        (Barracks, BuildingVariant::BOOSTER_TANK_FACTORY) => &BA_BOOSTER_TANK,
        (Barracks, BuildingVariant::CANNON_TANK_FACTORY) => &BA_CANNON_TANK,
        (Barracks, BuildingVariant::SIEGE_TANK_FACTORY) => &BA_SIEGE,
        (Barracks, BuildingVariant::HEAVY_BOOSTER_TANK_FACTORY) => &BA_HEAVY_BOOSTER_TANK,
        (Barracks, BuildingVariant::BOOSTER_CANNON_TANK_FACTORY) => &BA_BOOSTER_CANNON_TANK,
        (Barracks, BuildingVariant::HEAVY_SIEGE_TANK_FACTORY) => &BA_HEAVY_SIEGE,
        (Barracks, BuildingVariant::BOOSTER_SIEGE_TANK_FACTORY) => &BA_BOOSTER_SIEGE,
        (Barracks, BuildingVariant::CANNON_SIEGE_TANK_FACTORY) => &BA_CANNON_SIEGE,
        (Barracks, BuildingVariant::HEAVY_BOOSTER_SIEGE_TANK_FACTORY) => &BA_HEAVY_BOOSTER_SIEGE,
        (Barracks, BuildingVariant::BOOSTER_CANNON_SIEGE_TANK_FACTORY) => &BA_BOOSTER_CANNON_SIEGE,

        (Generator, BuildingVariant::BASIC) => &GE_BASIC,
        (Generator, BuildingVariant::POWER_PLANT) => &GE_POWER_PLANT,

        (House, BuildingVariant::BASIC) => &HO_BASIC,
        (House, BuildingVariant::LARGE_HOUSE) => &HO_LARGE,

        _ => return None,
    };
    Some(entry)
}

/// Footprint radius used for broad-phase collision and placement math.
pub fn building_size(kind: BuildingKind) -> i32 {
    match kind {
        BuildingKind::Wall => 30,
        BuildingKind::SimpleTurret => 30,
        BuildingKind::SniperTurret => 33,
        BuildingKind::Barracks => 60,
        BuildingKind::Generator => 40,
        BuildingKind::House => 35,
    }
}

/// Collision shape for a building family, centered at the origin.
pub fn building_polygon(kind: BuildingKind) -> Polygon {
    let size = building_size(kind);
    match kind {
        BuildingKind::Barracks => Polygon::generate(Shape::Rectangle, size, PI),
        BuildingKind::Generator => Polygon::generate(Shape::Hexagon, size, PI / 2.0),
        BuildingKind::House => Polygon::generate(Shape::Pentagon, size, 0.0),
        BuildingKind::SimpleTurret | BuildingKind::SniperTurret | BuildingKind::Wall => {
            Polygon::generate(Shape::Circle, size, PI / 2.0)
        }
    }
}

pub fn building_cost(kind: BuildingKind, variant: BuildingVariant) -> Option<u16> {
    building_spec(kind, variant).map(|s| s.cost)
}

pub fn initial_health(kind: BuildingKind, variant: BuildingVariant) -> u16 {
    building_spec(kind, variant).map(|s| s.health).unwrap_or(0)
}

/// Power generated per second by the building, if any.
pub fn resource_generation(kind: BuildingKind, variant: BuildingVariant) -> Option<u16> {
    match (kind, variant) {
        (BuildingKind::Wall, BuildingVariant::MICRO_GENERATOR) => Some(2),
        (BuildingKind::Generator, BuildingVariant::BASIC) => Some(2),
        (BuildingKind::Generator, BuildingVariant::POWER_PLANT) => Some(3),
        _ => None,
    }
}

/// Population capacity granted by the building, if any.
pub fn population_capacity(kind: BuildingKind, variant: BuildingVariant) -> Option<u16> {
    match (kind, variant) {
        (BuildingKind::House, BuildingVariant::BASIC) => Some(8),
        (BuildingKind::House, BuildingVariant::LARGE_HOUSE) => Some(12),
        _ => None,
    }
}

pub fn validate_building_kind(byte: u8) -> Option<BuildingKind> {
    BuildingKind::from_byte(byte)
        .filter(|&kind| building_spec(kind, BuildingVariant::BASIC).is_some())
}

/// An upgrade is legal only along an edge of the static graph.
pub fn validate_upgrade_path(
    kind: BuildingKind,
    current: BuildingVariant,
    target: BuildingVariant,
) -> bool {
    building_spec(kind, current)
        .map(|s| s.next.contains(&target))
        .unwrap_or(false)
}

// =============================================================================
// BARRACKS PRODUCTION
// =============================================================================

/// What a barracks variant produces and how often (seconds).
pub struct UnitSpawnSpec {
    pub unit_kind: UnitKind,
    pub unit_variant: UnitVariant,
    pub frequency_secs: u16,
}

pub fn unit_spawning(variant: BuildingVariant) -> Option<&'static UnitSpawnSpec> {
    const fn produce(unit_kind: UnitKind, unit_variant: UnitVariant, frequency_secs: u16) -> UnitSpawnSpec {
        UnitSpawnSpec {
            unit_kind,
            unit_variant,
            frequency_secs,
        }
    }
    static TABLE: [(BuildingVariant, UnitSpawnSpec); 14] = [
        (BuildingVariant::BASIC, produce(UnitKind::Soldier, UnitVariant::BASIC, 4)),
        (BuildingVariant::GREATER_BARRACKS, produce(UnitKind::Soldier, UnitVariant::BASIC, 2)),
        (BuildingVariant::TANK_FACTORY, produce(UnitKind::Tank, UnitVariant::BASIC, 20)),
        (BuildingVariant::HEAVY_TANK_FACTORY, produce(UnitKind::Tank, UnitVariant::HEAVY_ARMOR, 20)),
        (BuildingVariant::BOOSTER_TANK_FACTORY, produce(UnitKind::Tank, UnitVariant::BOOSTER_ENGINE, 20)),
        (BuildingVariant::CANNON_TANK_FACTORY, produce(UnitKind::Tank, UnitVariant::CANNON, 20)),
        (
            BuildingVariant::HEAVY_BOOSTER_TANK_FACTORY,
            produce(UnitKind::Tank, UnitVariant::HEAVY_ARMOR_BOOSTER_ENGINE, 20),
        ),
        (
            BuildingVariant::BOOSTER_CANNON_TANK_FACTORY,
            produce(UnitKind::Tank, UnitVariant::BOOSTER_ENGINE_CANNON, 20),
        ),
        (BuildingVariant::SIEGE_TANK_FACTORY, produce(UnitKind::SiegeTank, UnitVariant::BASIC, 30)),
        (
            BuildingVariant::HEAVY_SIEGE_TANK_FACTORY,
            produce(UnitKind::SiegeTank, UnitVariant::HEAVY_ARMOR, 30),
        ),
        (
            BuildingVariant::BOOSTER_SIEGE_TANK_FACTORY,
            produce(UnitKind::SiegeTank, UnitVariant::BOOSTER_ENGINE, 30),
        ),
        (
            BuildingVariant::CANNON_SIEGE_TANK_FACTORY,
            produce(UnitKind::SiegeTank, UnitVariant::CANNON, 30),
        ),
        (
            BuildingVariant::HEAVY_BOOSTER_SIEGE_TANK_FACTORY,
            produce(UnitKind::SiegeTank, UnitVariant::HEAVY_ARMOR_BOOSTER_ENGINE, 30),
        ),
        (
            BuildingVariant::BOOSTER_CANNON_SIEGE_TANK_FACTORY,
            produce(UnitKind::SiegeTank, UnitVariant::BOOSTER_ENGINE_CANNON, 30),
        ),
    ];
    TABLE.iter().find(|(v, _)| *v == variant).map(|(_, s)| s)
}

// =============================================================================
// BULLETS
// =============================================================================

/// How a bullet settles damage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BulletBehavior {
    #[default]
    Normal,
    /// Damage multiplier against tanks and siege tanks.
    AntiTank,
    /// Parks at its target and lingers for `stay_duration_ms`.
    Trapper,
    /// Fired by a unit; damage multiplier against units.
    Unit,
}

pub struct BulletSpec {
    pub health: u16,
    pub speed: f64,
    pub size: i32,
    pub stay_duration_ms: u64,
    pub damage_multiplier: f32,
    pub behavior: BulletBehavior,
}

const fn bullet(health: u16, speed: f64, size: i32) -> BulletSpec {
    BulletSpec {
        health,
        speed,
        size,
        stay_duration_ms: 0,
        damage_multiplier: 1.0,
        behavior: BulletBehavior::Normal,
    }
}

pub fn turret_bullet_stats(
    kind: BuildingKind,
    variant: BuildingVariant,
) -> Option<&'static BulletSpec> {
    static ST_BASIC: BulletSpec = bullet(15, 500.0, 10);
    static ST_RAPID: BulletSpec = bullet(15, 500.0, 10);
    static ST_GATLING: BulletSpec = bullet(15, 600.0, 8);
    static ST_HEAVY: BulletSpec = bullet(400, 200.0, 20);
    static SN_BASIC: BulletSpec = bullet(50, 800.0, 10);
    static SN_SEMI: BulletSpec = bullet(50, 800.0, 10);
    static SN_HEAVY: BulletSpec = bullet(60, 900.0, 12);
    static SN_ANTI_TANK: BulletSpec = BulletSpec {
        health: 60,
        speed: 1000.0,
        size: 12,
        stay_duration_ms: 0,
        damage_multiplier: 1.5,
        behavior: BulletBehavior::AntiTank,
    };
    static SN_TRAPPER: BulletSpec = BulletSpec {
        health: 300,
        speed: 300.0,
        size: 20,
        stay_duration_ms: 5000,
        damage_multiplier: 1.0,
        behavior: BulletBehavior::Trapper,
    };

    let entry = match (kind, variant) {
        (BuildingKind::SimpleTurret, BuildingVariant::BASIC) => &ST_BASIC,
        (BuildingKind::SimpleTurret, BuildingVariant::RAPID_TURRET) => &ST_RAPID,
        (BuildingKind::SimpleTurret, BuildingVariant::GATLING_TURRET) => &ST_GATLING,
        (BuildingKind::SimpleTurret, BuildingVariant::HEAVY_TURRET) => &ST_HEAVY,
        (BuildingKind::SniperTurret, BuildingVariant::BASIC) => &SN_BASIC,
        (BuildingKind::SniperTurret, BuildingVariant::SEMI_AUTOMATIC_SNIPER) => &SN_SEMI,
        (BuildingKind::SniperTurret, BuildingVariant::HEAVY_SNIPER) => &SN_HEAVY,
        (BuildingKind::SniperTurret, BuildingVariant::ANTI_TANK_GUN) => &SN_ANTI_TANK,
        (BuildingKind::SniperTurret, BuildingVariant::TRAPPER) => &SN_TRAPPER,
        _ => return None,
    };
    Some(entry)
}

pub fn unit_bullet_stats(kind: UnitKind, variant: UnitVariant) -> Option<&'static BulletSpec> {
    static TANK_CANNON: BulletSpec = BulletSpec {
        health: 16,
        speed: 500.0,
        size: 6,
        stay_duration_ms: 0,
        damage_multiplier: 2.0,
        behavior: BulletBehavior::Unit,
    };
    static SIEGE_CANNON: BulletSpec = BulletSpec {
        health: 16,
        speed: 500.0,
        size: 8,
        stay_duration_ms: 0,
        damage_multiplier: 2.0,
        behavior: BulletBehavior::Unit,
    };
    static COMMANDER: BulletSpec = BulletSpec {
        health: 100,
        speed: 700.0,
        size: 12,
        stay_duration_ms: 0,
        damage_multiplier: 2.0,
        behavior: BulletBehavior::Unit,
    };

    let entry = match (kind, variant) {
        (UnitKind::Tank, UnitVariant::CANNON) | (UnitKind::Tank, UnitVariant::BOOSTER_ENGINE_CANNON) => {
            &TANK_CANNON
        }
        (UnitKind::SiegeTank, UnitVariant::CANNON)
        | (UnitKind::SiegeTank, UnitVariant::BOOSTER_ENGINE_CANNON) => &SIEGE_CANNON,
        (UnitKind::Commander, UnitVariant::BASIC) => &COMMANDER,
        _ => return None,
    };
    Some(entry)
}

/// Fire period (milliseconds) and target search range of a spawner.
pub struct BulletSpawnSpec {
    pub frequency_ms: u16,
    pub range: i32,
}

const fn firing(frequency_ms: u16, range: i32) -> BulletSpawnSpec {
    BulletSpawnSpec { frequency_ms, range }
}

pub fn turret_bullet_spawning(
    kind: BuildingKind,
    variant: BuildingVariant,
) -> Option<&'static BulletSpawnSpec> {
    static ST_BASIC: BulletSpawnSpec = firing(750, 350);
    static ST_RAPID: BulletSpawnSpec = firing(300, 350);
    static ST_GATLING: BulletSpawnSpec = firing(200, 350);
    static ST_HEAVY: BulletSpawnSpec = firing(8000, 350);
    static SN_BASIC: BulletSpawnSpec = firing(1500, 400);
    static SN_SEMI: BulletSpawnSpec = firing(1000, 450);
    static SN_HEAVY: BulletSpawnSpec = firing(1500, 450);
    static SN_ANTI_TANK: BulletSpawnSpec = firing(2500, 450);
    static SN_TRAPPER: BulletSpawnSpec = firing(6000, 450);

    let entry = match (kind, variant) {
        (BuildingKind::SimpleTurret, BuildingVariant::BASIC) => &ST_BASIC,
        (BuildingKind::SimpleTurret, BuildingVariant::RAPID_TURRET) => &ST_RAPID,
        (BuildingKind::SimpleTurret, BuildingVariant::GATLING_TURRET) => &ST_GATLING,
        (BuildingKind::SimpleTurret, BuildingVariant::HEAVY_TURRET) => &ST_HEAVY,
        (BuildingKind::SniperTurret, BuildingVariant::BASIC) => &SN_BASIC,
        (BuildingKind::SniperTurret, BuildingVariant::SEMI_AUTOMATIC_SNIPER) => &SN_SEMI,
        (BuildingKind::SniperTurret, BuildingVariant::HEAVY_SNIPER) => &SN_HEAVY,
        (BuildingKind::SniperTurret, BuildingVariant::ANTI_TANK_GUN) => &SN_ANTI_TANK,
        (BuildingKind::SniperTurret, BuildingVariant::TRAPPER) => &SN_TRAPPER,
        _ => return None,
    };
    Some(entry)
}

pub fn unit_bullet_spawning(kind: UnitKind, variant: UnitVariant) -> Option<&'static BulletSpawnSpec> {
    static TANK_CANNON: BulletSpawnSpec = firing(1500, 350);
    static SIEGE_CANNON: BulletSpawnSpec = firing(1600, 400);
    static COMMANDER: BulletSpawnSpec = firing(2000, 600);

    let entry = match (kind, variant) {
        (UnitKind::Tank, UnitVariant::CANNON) | (UnitKind::Tank, UnitVariant::BOOSTER_ENGINE_CANNON) => {
            &TANK_CANNON
        }
        (UnitKind::SiegeTank, UnitVariant::CANNON)
        | (UnitKind::SiegeTank, UnitVariant::BOOSTER_ENGINE_CANNON) => &SIEGE_CANNON,
        (UnitKind::Commander, UnitVariant::BASIC) => &COMMANDER,
        _ => return None,
    };
    Some(entry)
}

/// Shape of every in-flight bullet.
pub fn bullet_polygon(size: i32) -> Polygon {
    Polygon::generate(Shape::Circle, size, 0.0)
}

// =============================================================================
// UNITS
// =============================================================================

pub struct UnitSpec {
    pub health: u16,
    pub speed: f64,
    pub size: i32,
    pub required_population: u16,
    pub explosion_radius: u16,
}

const fn troop(health: u16, speed: f64, size: i32, required_population: u16) -> UnitSpec {
    UnitSpec {
        health,
        speed,
        size,
        required_population,
        explosion_radius: 0,
    }
}

pub fn unit_spec(kind: UnitKind, variant: UnitVariant) -> Option<&'static UnitSpec> {
    static SOLDIER: UnitSpec = troop(180, 140.0, 18, 16);
    static SOLDIER_LIGHT: UnitSpec = troop(225, 140.0, 18, 16);

    static TANK: UnitSpec = troop(800, 70.0, 28, 32);
    static TANK_HEAVY: UnitSpec = troop(1000, 70.0, 28, 32);
    static TANK_CANNON: UnitSpec = troop(1000, 70.0, 28, 32);
    static TANK_BOOSTER: UnitSpec = troop(800, 90.0, 28, 32);
    static TANK_HEAVY_BOOSTER: UnitSpec = troop(1000, 90.0, 28, 32);
    static TANK_BOOSTER_CANNON: UnitSpec = troop(800, 90.0, 28, 32);

    static SIEGE: UnitSpec = troop(2800, 60.0, 38, 80);
    static SIEGE_HEAVY: UnitSpec = troop(3200, 60.0, 38, 80);
    static SIEGE_BOOSTER: UnitSpec = troop(2800, 80.0, 38, 80);
    static SIEGE_CANNON: UnitSpec = troop(3200, 60.0, 38, 80);
    static SIEGE_HEAVY_BOOSTER: UnitSpec = troop(3200, 80.0, 38, 80);
    static SIEGE_BOOSTER_CANNON: UnitSpec = troop(2800, 80.0, 38, 80);

    static COMMANDER: UnitSpec = UnitSpec {
        health: 4000,
        speed: 60.0,
        size: 40,
        required_population: 0,
        explosion_radius: 120,
    };

    let entry = match (kind, variant) {
        (UnitKind::Soldier, UnitVariant::BASIC) => &SOLDIER,
        (UnitKind::Soldier, UnitVariant::LIGHT_ARMOR_SOLDIER) => &SOLDIER_LIGHT,

        (UnitKind::Tank, UnitVariant::BASIC) => &TANK,
        (UnitKind::Tank, UnitVariant::HEAVY_ARMOR) => &TANK_HEAVY,
        (UnitKind::Tank, UnitVariant::CANNON) => &TANK_CANNON,
        (UnitKind::Tank, UnitVariant::BOOSTER_ENGINE) => &TANK_BOOSTER,
        (UnitKind::Tank, UnitVariant::HEAVY_ARMOR_BOOSTER_ENGINE) => &TANK_HEAVY_BOOSTER,
        (UnitKind::Tank, UnitVariant::BOOSTER_ENGINE_CANNON) => &TANK_BOOSTER_CANNON,

        (UnitKind::SiegeTank, UnitVariant::BASIC) => &SIEGE,
        (UnitKind::SiegeTank, UnitVariant::HEAVY_ARMOR) => &SIEGE_HEAVY,
        (UnitKind::SiegeTank, UnitVariant::BOOSTER_ENGINE) => &SIEGE_BOOSTER,
        (UnitKind::SiegeTank, UnitVariant::CANNON) => &SIEGE_CANNON,
        (UnitKind::SiegeTank, UnitVariant::HEAVY_ARMOR_BOOSTER_ENGINE) => &SIEGE_HEAVY_BOOSTER,
        (UnitKind::SiegeTank, UnitVariant::BOOSTER_ENGINE_CANNON) => &SIEGE_BOOSTER_CANNON,

        (UnitKind::Commander, UnitVariant::BASIC) => &COMMANDER,
        _ => return None,
    };
    Some(entry)
}

/// Population claimed at spawn time, looked up on the base tier.
pub fn required_population(kind: UnitKind) -> Option<u16> {
    unit_spec(kind, UnitVariant::BASIC).map(|s| s.required_population)
}

pub fn unit_polygon(kind: UnitKind, variant: UnitVariant) -> Option<Polygon> {
    let size = unit_spec(kind, variant)?.size;
    let shape = match kind {
        UnitKind::Commander => Shape::Hexagon,
        _ => Shape::Triangle,
    };
    Some(Polygon::generate(shape, size, 0.0))
}

pub fn validate_unit_kind(byte: u8) -> Option<UnitKind> {
    UnitKind::from_byte(byte).filter(|&kind| unit_spec(kind, UnitVariant::BASIC).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_variant_exists_for_every_kind() {
        for kind in BuildingKind::ALL {
            assert!(building_spec(kind, BuildingVariant::BASIC).is_some(), "{kind:?}");
        }
    }

    #[test]
    fn upgrade_graph_edges_resolve() {
        for kind in BuildingKind::ALL {
            // Walk every reachable node; all `next` targets must have specs.
            let mut stack = vec![BuildingVariant::BASIC];
            while let Some(v) = stack.pop() {
                let s = building_spec(kind, v).expect("reachable node must exist");
                for &n in s.next {
                    assert!(building_spec(kind, n).is_some(), "{kind:?} {v:?} -> {n:?}");
                    stack.push(n);
                }
            }
        }
    }

    #[test]
    fn upgrade_path_validation() {
        assert!(validate_upgrade_path(
            BuildingKind::SimpleTurret,
            BuildingVariant::BASIC,
            BuildingVariant::RAPID_TURRET,
        ));
        assert!(validate_upgrade_path(
            BuildingKind::SimpleTurret,
            BuildingVariant::RAPID_TURRET,
            BuildingVariant::GATLING_TURRET,
        ));
        // Skipping a tier is not allowed.
        assert!(!validate_upgrade_path(
            BuildingKind::SimpleTurret,
            BuildingVariant::BASIC,
            BuildingVariant::GATLING_TURRET,
        ));
        // Terminal nodes have no outgoing edges.
        assert!(!validate_upgrade_path(
            BuildingKind::Wall,
            BuildingVariant::SPIKE,
            BuildingVariant::BASIC,
        ));
    }

    #[test]
    fn kind_bytes_round_trip() {
        assert_eq!(validate_building_kind(4), Some(BuildingKind::Barracks));
        // 3 was never assigned.
        assert_eq!(validate_building_kind(3), None);
        assert_eq!(validate_unit_kind(2), Some(UnitKind::SiegeTank));
        assert_eq!(validate_unit_kind(7), None);
    }

    #[test]
    fn every_barracks_variant_produces_a_known_unit() {
        let mut stack = vec![BuildingVariant::BASIC];
        while let Some(v) = stack.pop() {
            let s = building_spec(BuildingKind::Barracks, v).unwrap();
            let production = unit_spawning(v).expect("barracks variant must produce");
            assert!(
                unit_spec(production.unit_kind, production.unit_variant).is_some(),
                "production of {v:?} must resolve"
            );
            stack.extend(s.next.iter().copied());
        }
    }

    #[test]
    fn armed_units_have_matching_ballistics() {
        for (kind, variant) in [
            (UnitKind::Tank, UnitVariant::CANNON),
            (UnitKind::Tank, UnitVariant::BOOSTER_ENGINE_CANNON),
            (UnitKind::SiegeTank, UnitVariant::CANNON),
            (UnitKind::SiegeTank, UnitVariant::BOOSTER_ENGINE_CANNON),
            (UnitKind::Commander, UnitVariant::BASIC),
        ] {
            assert!(unit_bullet_stats(kind, variant).is_some());
            assert!(unit_bullet_spawning(kind, variant).is_some());
        }
        assert!(unit_bullet_stats(UnitKind::Soldier, UnitVariant::BASIC).is_none());
    }

    #[test]
    fn commander_is_explosive_and_free() {
        let c = unit_spec(UnitKind::Commander, UnitVariant::BASIC).unwrap();
        assert!(c.explosion_radius > 0);
        assert_eq!(c.required_population, 0);
    }

    #[test]
    fn generators_and_houses_report_yields() {
        assert_eq!(resource_generation(BuildingKind::Generator, BuildingVariant::BASIC), Some(2));
        assert_eq!(
            resource_generation(BuildingKind::Wall, BuildingVariant::MICRO_GENERATOR),
            Some(2)
        );
        assert_eq!(resource_generation(BuildingKind::Wall, BuildingVariant::BASIC), None);
        assert_eq!(population_capacity(BuildingKind::House, BuildingVariant::BASIC), Some(8));
        assert_eq!(
            population_capacity(BuildingKind::House, BuildingVariant::LARGE_HOUSE),
            Some(12)
        );
    }
}
